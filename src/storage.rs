use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::{TaskDraft, TaskId, TaskPatch, TaskRecord};

const TASKS_FILE: &str = "tasks.json";
const SCHEMA_VERSION: u32 = 1;

/// Identity of the user whose tasks are being read or written.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Owner(String);

impl Owner {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let trimmed = name.trim();
        let valid = !trimmed.is_empty()
            && trimmed
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@'))
            && trimmed != "."
            && trimmed != "..";
        if !valid {
            return Err(Error::InvalidConfig(format!("invalid owner name '{name}'")));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Persistence for one owner's task collection.
///
/// Every call is scoped to the owner the store was opened for; ids that
/// belong to someone else are reported as `NotFound`.
pub trait TaskStore {
    /// All records, in storage order.
    fn list(&self) -> Result<Vec<TaskRecord>>;

    /// Persists one occurrence and returns it with its assigned id.
    fn create(&mut self, draft: &TaskDraft) -> Result<TaskRecord>;

    /// Applies `patch` to the record with `id`.
    fn update(&mut self, id: TaskId, patch: &TaskPatch) -> Result<TaskRecord>;

    fn delete(&mut self, id: TaskId) -> Result<()>;

    /// Creates occurrences one by one. Best effort: the first failure stops
    /// the batch, earlier occurrences stay persisted, and the error reports
    /// how many were created.
    fn create_batch(&mut self, drafts: &[TaskDraft]) -> Result<Vec<TaskRecord>> {
        let mut created = Vec::with_capacity(drafts.len());
        for draft in drafts {
            match self.create(draft) {
                Ok(record) => created.push(record),
                Err(err) if created.is_empty() => return Err(err),
                Err(err) => {
                    tracing::warn!(
                        created = created.len(),
                        requested = drafts.len(),
                        error = %err,
                        "batch creation stopped part way"
                    );
                    return Err(Error::PartialCreation {
                        created: created.len(),
                        requested: drafts.len(),
                        source: Box::new(err),
                    });
                }
            }
        }
        Ok(created)
    }
}

/// Returns the default data directory.
///
/// The path is determined in the following order:
/// 1. `TODOCAL_DB` environment variable.
/// 2. `~/.local/share/todocal` (on Linux).
/// 3. `./todocal` (fallback).
pub fn default_data_dir() -> PathBuf {
    std::env::var("TODOCAL_DB")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            let mut p = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
            p.push("todocal");
            p
        })
}

/// On-disk layout of one owner's task file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TasksFile {
    pub schema_version: u32,
    #[serde(default)]
    pub tasks: Vec<TaskRecord>,
}

impl Default for TasksFile {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            tasks: Vec::new(),
        }
    }
}

/// JSON file store: `<root>/<owner>/tasks.json`.
pub struct JsonFileStore {
    root: PathBuf,
    owner: Owner,
}

impl JsonFileStore {
    pub fn new(root: PathBuf, owner: Owner) -> Self {
        Self { root, owner }
    }

    pub fn owner(&self) -> &Owner {
        &self.owner
    }

    /// Path to this owner's task file.
    pub fn tasks_path(&self) -> PathBuf {
        self.root.join(self.owner.as_str()).join(TASKS_FILE)
    }

    fn load(&self) -> Result<TasksFile> {
        let path = self.tasks_path();
        if !path.exists() {
            return Ok(TasksFile::default());
        }
        let mut file = File::open(&path)?;
        let mut buf = String::new();
        file.read_to_string(&mut buf)?;
        if buf.trim().is_empty() {
            return Ok(TasksFile::default());
        }
        let data: TasksFile = serde_json::from_str(&buf)?;
        check_unique_ids(&data.tasks)?;
        tracing::debug!(path = %path.display(), count = data.tasks.len(), "loaded tasks");
        Ok(data)
    }

    fn save(&self, data: &TasksFile) -> Result<()> {
        let path = self.tasks_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        write_atomic(&path, data)?;
        tracing::debug!(path = %path.display(), count = data.tasks.len(), "saved tasks");
        Ok(())
    }

    /// Deletes this owner's task file.
    pub fn reset(&self) -> Result<()> {
        let path = self.tasks_path();
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}

impl TaskStore for JsonFileStore {
    fn list(&self) -> Result<Vec<TaskRecord>> {
        Ok(self.load()?.tasks)
    }

    fn create(&mut self, draft: &TaskDraft) -> Result<TaskRecord> {
        draft.validate()?;
        let mut data = self.load()?;
        let id = next_id(&data.tasks);
        let record = draft.clone().into_record(id);
        data.tasks.push(record.clone());
        self.save(&data)?;
        Ok(record)
    }

    fn update(&mut self, id: TaskId, patch: &TaskPatch) -> Result<TaskRecord> {
        patch.validate()?;
        let mut data = self.load()?;
        let record = data
            .tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(Error::NotFound(id))?;
        record.apply(patch);
        let updated = record.clone();
        self.save(&data)?;
        Ok(updated)
    }

    fn delete(&mut self, id: TaskId) -> Result<()> {
        let mut data = self.load()?;
        let len_before = data.tasks.len();
        data.tasks.retain(|t| t.id != id);
        if data.tasks.len() == len_before {
            return Err(Error::NotFound(id));
        }
        self.save(&data)
    }
}

/// In-process store holding every owner's records.
///
/// Each `MemoryStore` handle is bound to one owner; `for_owner` opens a
/// handle onto the same data for someone else.
#[derive(Debug, Default)]
pub struct MemoryStore {
    owner: Option<Owner>,
    records: HashMap<Owner, Vec<TaskRecord>>,
    next_id: TaskId,
    fail_after: Option<usize>,
}

impl MemoryStore {
    pub fn new(owner: Owner) -> Self {
        Self {
            owner: Some(owner),
            ..Self::default()
        }
    }

    /// Switches the handle to another owner, keeping all data.
    pub fn for_owner(mut self, owner: Owner) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Makes every `create` after the next `n` fail as if the backend went
    /// away. Used to exercise partial batches.
    pub fn fail_creates_after(mut self, n: usize) -> Self {
        self.fail_after = Some(n);
        self
    }

    fn owner_records(&self) -> &[TaskRecord] {
        self.owner
            .as_ref()
            .and_then(|o| self.records.get(o))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn owner_records_mut(&mut self) -> Result<&mut Vec<TaskRecord>> {
        let owner = self
            .owner
            .clone()
            .ok_or(Error::NotAuthenticated)?;
        Ok(self.records.entry(owner).or_default())
    }
}

impl TaskStore for MemoryStore {
    fn list(&self) -> Result<Vec<TaskRecord>> {
        Ok(self.owner_records().to_vec())
    }

    fn create(&mut self, draft: &TaskDraft) -> Result<TaskRecord> {
        draft.validate()?;
        if let Some(remaining) = self.fail_after.as_mut() {
            if *remaining == 0 {
                return Err(Error::CollaboratorUnavailable("store went away".into()));
            }
            *remaining -= 1;
        }
        // Ids are global so they stay unique across owners.
        self.next_id += 1;
        let record = draft.clone().into_record(self.next_id);
        self.owner_records_mut()?.push(record.clone());
        Ok(record)
    }

    fn update(&mut self, id: TaskId, patch: &TaskPatch) -> Result<TaskRecord> {
        patch.validate()?;
        let record = self
            .owner_records_mut()?
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(Error::NotFound(id))?;
        record.apply(patch);
        Ok(record.clone())
    }

    fn delete(&mut self, id: TaskId) -> Result<()> {
        let records = self.owner_records_mut()?;
        let len_before = records.len();
        records.retain(|t| t.id != id);
        if records.len() == len_before {
            return Err(Error::NotFound(id));
        }
        Ok(())
    }
}

fn next_id(tasks: &[TaskRecord]) -> TaskId {
    tasks.iter().map(|t| t.id).max().unwrap_or(0) + 1
}

fn check_unique_ids(tasks: &[TaskRecord]) -> Result<()> {
    let mut seen = HashSet::with_capacity(tasks.len());
    for task in tasks {
        if !seen.insert(task.id) {
            return Err(Error::DuplicateIdentifier(format!(
                "task id {} appears more than once",
                task.id
            )));
        }
    }
    Ok(())
}

fn write_atomic<T: Serialize>(path: &Path, data: &T) -> Result<()> {
    let temp_path = path.with_extension("tmp");
    let json = serde_json::to_vec_pretty(data)?;
    {
        let mut file = File::create(&temp_path)?;
        file.write_all(&json)?;
        file.sync_all()?;
    }
    fs::rename(temp_path, path)?;
    Ok(())
}
