//! HTTP client for the hosted task service.
//!
//! The service speaks a small JSON REST contract:
//!
//! | call                     | body          | reply                         |
//! |--------------------------|---------------|-------------------------------|
//! | `GET /api/todos`         |               | `{success, todos: [...]}`     |
//! | `POST /api/todos`        | draft         | `{success, todo: {...}}`      |
//! | `PUT /api/todos/:id`     | full record   | `{success, message}`          |
//! | `DELETE /api/todos/:id`  |               | `{success, message}`          |
//!
//! Requests are authenticated with the session cookie from the config. The
//! server scopes every call to the session's user.

use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{HeaderMap, HeaderValue, COOKIE};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::RemoteConfig;
use crate::error::{Error, Result};
use crate::models::{TaskDraft, TaskId, TaskPatch, TaskRecord};
use crate::storage::TaskStore;

const SESSION_COOKIE_NAME: &str = "connect.sid";

/// Reply envelope shared by every endpoint.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    todos: Option<Vec<TaskRecord>>,
    #[serde(default)]
    todo: Option<TaskRecord>,
}

/// Body of `PUT /api/todos/:id`: the whole record minus its id.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateBody<'a> {
    #[serde(flatten)]
    draft: &'a TaskDraft,
    completed: bool,
}

pub struct RemoteStore {
    client: Client,
    base_url: String,
}

impl RemoteStore {
    pub fn new(config: &RemoteConfig) -> Result<Self> {
        let base_url = config
            .base_url
            .as_deref()
            .map(|u| u.trim().trim_end_matches('/').to_string())
            .filter(|u| !u.is_empty())
            .ok_or_else(|| Error::InvalidConfig("remote.base_url is required".into()))?;

        let mut headers = HeaderMap::new();
        if let Some(session) = config.session_cookie.as_deref().filter(|s| !s.is_empty()) {
            let cookie = format!("{SESSION_COOKIE_NAME}={session}");
            let value = HeaderValue::from_str(&cookie)
                .map_err(|_| Error::InvalidConfig("remote.session_cookie is not a valid header value".into()))?;
            headers.insert(COOKIE, value);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| Error::CollaboratorUnavailable(e.to_string()))?;
        Ok(Self { client, base_url })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn send(&self, request: RequestBuilder, id: Option<TaskId>) -> Result<Envelope> {
        let response = request
            .send()
            .map_err(|e| Error::CollaboratorUnavailable(e.to_string()))?;
        read_envelope(response, id)
    }

    fn find(&self, id: TaskId) -> Result<TaskRecord> {
        self.list()?
            .into_iter()
            .find(|t| t.id == id)
            .ok_or(Error::NotFound(id))
    }
}

impl TaskStore for RemoteStore {
    fn list(&self) -> Result<Vec<TaskRecord>> {
        let envelope = self.send(self.client.get(self.url("/api/todos")), None)?;
        let todos = envelope.todos.unwrap_or_default();
        tracing::debug!(count = todos.len(), "fetched remote tasks");
        Ok(todos)
    }

    fn create(&mut self, draft: &TaskDraft) -> Result<TaskRecord> {
        draft.validate()?;
        let envelope = self.send(self.client.post(self.url("/api/todos")).json(draft), None)?;
        let record = envelope
            .todo
            .ok_or_else(|| Error::CollaboratorUnavailable("create reply carried no task".into()))?;
        tracing::info!(id = record.id, "created remote task");
        Ok(record)
    }

    fn update(&mut self, id: TaskId, patch: &TaskPatch) -> Result<TaskRecord> {
        patch.validate()?;
        // The endpoint replaces the whole row, so merge onto the current copy.
        let mut record = self.find(id)?;
        record.apply(patch);
        let draft = TaskDraft {
            text: record.text.clone(),
            category: record.category,
            priority: record.priority,
            repetition: record.repetition,
            emoji: record.emoji.clone(),
            due_date: record.due_date,
            due_time: record.due_time,
        };
        let body = UpdateBody {
            draft: &draft,
            completed: record.completed,
        };
        self.send(
            self.client.put(self.url(&format!("/api/todos/{id}"))).json(&body),
            Some(id),
        )?;
        Ok(record)
    }

    fn delete(&mut self, id: TaskId) -> Result<()> {
        self.send(self.client.delete(self.url(&format!("/api/todos/{id}"))), Some(id))?;
        Ok(())
    }
}

fn read_envelope(response: Response, id: Option<TaskId>) -> Result<Envelope> {
    let status = response.status();
    let body = response
        .text()
        .map_err(|e| Error::CollaboratorUnavailable(e.to_string()))?;
    let envelope: Option<Envelope> = parse_json(&body);
    let message = envelope
        .as_ref()
        .and_then(|e| e.message.clone())
        .unwrap_or_else(|| status.to_string());

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => return Err(Error::NotAuthenticated),
        StatusCode::NOT_FOUND => {
            return Err(match id {
                Some(id) => Error::NotFound(id),
                None => Error::CollaboratorUnavailable(message),
            })
        }
        StatusCode::CONFLICT => return Err(Error::DuplicateIdentifier(message)),
        s if !s.is_success() => {
            tracing::error!(status = %s, message = %message, "task service returned an error");
            return Err(Error::CollaboratorUnavailable(message));
        }
        _ => {}
    }

    match envelope {
        Some(envelope) if envelope.success => Ok(envelope),
        Some(_) => Err(Error::CollaboratorUnavailable(message)),
        None => Err(Error::CollaboratorUnavailable(format!(
            "unexpected reply from task service: {}",
            truncate(&body, 200)
        ))),
    }
}

fn parse_json<T: DeserializeOwned>(body: &str) -> Option<T> {
    match serde_json::from_str(body) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(error = %err, "could not decode task service reply");
            None
        }
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
