use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::sync::mpsc;
use std::thread;

use chrono::{NaiveDate, NaiveTime};
use todocal::config::RemoteConfig;
use todocal::error::Error;
use todocal::models::{Priority, TaskDraft, TaskPatch};
use todocal::remote::RemoteStore;
use todocal::storage::TaskStore;

/// A request as seen by the stub server.
struct Seen {
    request_line: String,
    cookie: Option<String>,
    body: String,
}

/// Serves `replies` in order, one connection each, and reports every request.
fn serve(replies: Vec<(u16, &'static str)>) -> (String, mpsc::Receiver<Seen>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        for (status, body) in replies {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());

            let mut request_line = String::new();
            reader.read_line(&mut request_line).unwrap();
            let mut cookie = None;
            let mut content_length = 0usize;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                let line = line.trim_end();
                if line.is_empty() {
                    break;
                }
                let (name, value) = line.split_once(':').unwrap();
                match name.to_ascii_lowercase().as_str() {
                    "cookie" => cookie = Some(value.trim().to_string()),
                    "content-length" => content_length = value.trim().parse().unwrap(),
                    _ => {}
                }
            }
            let mut request_body = vec![0u8; content_length];
            reader.read_exact(&mut request_body).unwrap();

            tx.send(Seen {
                request_line: request_line.trim_end().to_string(),
                cookie,
                body: String::from_utf8(request_body).unwrap(),
            })
            .unwrap();

            let mut stream = stream;
            write!(
                stream,
                "HTTP/1.1 {status} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            )
            .unwrap();
            stream.flush().unwrap();
        }
    });

    (format!("http://{addr}/"), rx)
}

fn store(base_url: String) -> RemoteStore {
    RemoteStore::new(&RemoteConfig {
        base_url: Some(base_url),
        session_cookie: Some("s%3Aabc".into()),
        timeout_secs: 5,
    })
    .unwrap()
}

const ONE_TODO: &str = r#"{"success":true,"todos":[{"id":7,"text":"stretch","category":"exercise","priority":"medium","repetition":"","emoji":"","dueDate":"2024-03-01","dueTime":"09:30:00","completed":false}]}"#;

#[test]
fn list_parses_server_shape_and_sends_session() {
    let (url, seen) = serve(vec![(200, ONE_TODO)]);
    let todos = store(url).list().unwrap();

    assert_eq!(todos.len(), 1);
    assert_eq!(todos[0].id, 7);
    assert_eq!(todos[0].priority, Priority::Medium);
    assert_eq!(todos[0].emoji, None);
    assert_eq!(todos[0].due_date, NaiveDate::from_ymd_opt(2024, 3, 1));
    assert_eq!(todos[0].due_time, NaiveTime::from_hms_opt(9, 30, 0));

    let request = seen.recv().unwrap();
    assert_eq!(request.request_line, "GET /api/todos HTTP/1.1");
    assert_eq!(request.cookie.as_deref(), Some("connect.sid=s%3Aabc"));
}

#[test]
fn create_returns_the_stored_record() {
    let reply = r#"{"success":true,"message":"Todo created","todo":{"id":12,"text":"read","category":"","priority":"","repetition":"","emoji":"","dueDate":"","dueTime":"","completed":false}}"#;
    let (url, seen) = serve(vec![(201, reply)]);
    let record = store(url).create(&TaskDraft::new("read")).unwrap();
    assert_eq!(record.id, 12);
    assert_eq!(record.text, "read");

    let request = seen.recv().unwrap();
    assert_eq!(request.request_line, "POST /api/todos HTTP/1.1");
    assert!(request.body.contains(r#""text":"read""#));
    assert!(request.body.contains(r#""dueDate":"""#));
}

#[test]
fn update_sends_the_merged_record() {
    let (url, seen) = serve(vec![
        (200, ONE_TODO),
        (200, r#"{"success":true,"message":"Todo updated"}"#),
    ]);
    let updated = store(url).update(7, &TaskPatch::completion(true)).unwrap();
    assert!(updated.completed);
    assert_eq!(updated.text, "stretch");

    let _list = seen.recv().unwrap();
    let put = seen.recv().unwrap();
    assert_eq!(put.request_line, "PUT /api/todos/7 HTTP/1.1");
    assert!(put.body.contains(r#""completed":true"#));
    assert!(put.body.contains(r#""dueTime":"09:30""#));
    assert!(put.body.contains(r#""category":"exercise""#));
}

#[test]
fn missing_record_maps_to_not_found() {
    let (url, _seen) = serve(vec![(404, r#"{"success":false,"message":"Todo not found"}"#)]);
    let err = store(url).delete(7).unwrap_err();
    assert!(matches!(err, Error::NotFound(7)));
}

#[test]
fn rejected_session_maps_to_not_authenticated() {
    let (url, _seen) = serve(vec![(401, r#"{"success":false,"message":"Unauthorized"}"#)]);
    assert!(matches!(store(url).list(), Err(Error::NotAuthenticated)));
}

#[test]
fn server_errors_and_garbage_are_unavailable() {
    let (url, _seen) = serve(vec![
        (500, r#"{"success":false,"message":"Failed to fetch todos"}"#),
        (200, "<html>oops</html>"),
    ]);
    let remote = store(url);
    match remote.list() {
        Err(Error::CollaboratorUnavailable(message)) => assert_eq!(message, "Failed to fetch todos"),
        other => panic!("expected unavailable, got {other:?}"),
    }
    assert!(matches!(remote.list(), Err(Error::CollaboratorUnavailable(_))));
}

#[test]
fn update_of_unknown_id_is_not_found_without_put() {
    let (url, seen) = serve(vec![(200, ONE_TODO)]);
    let err = store(url).update(99, &TaskPatch::completion(true)).unwrap_err();
    assert!(matches!(err, Error::NotFound(99)));
    assert!(seen.recv().is_ok());
    assert!(seen.try_recv().is_err());
}

#[test]
fn base_url_is_required() {
    let err = RemoteStore::new(&RemoteConfig::default()).err().unwrap();
    assert!(matches!(err, Error::InvalidConfig(_)));
}
