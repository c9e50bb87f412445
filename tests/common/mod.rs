//! Shared test fixtures: a scripted mock upstream and metric proto helpers.
#![allow(dead_code)]

use prometheus::proto::MetricFamily;
use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;

pub struct MockUpstream {
    pub base_url: String,
    hits: Arc<Mutex<Vec<String>>>,
}

impl MockUpstream {
    /// Paths requested so far, in order.
    pub fn hits(&self) -> Vec<String> {
        self.hits.lock().unwrap().clone()
    }
}

/// Serves `health_status` on `/healthz` and a 200 with `stats_body` on
/// `/stats`, one connection at a time, until the test process exits.
pub fn spawn_upstream(health_status: &'static str, stats_body: &'static str) -> MockUpstream {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind mock upstream");
    let base_url = format!("http://{}", listener.local_addr().expect("local addr"));
    let hits = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&hits);
    thread::spawn(move || {
        for stream in listener.incoming() {
            match stream {
                Ok(stream) => respond(stream, health_status, stats_body, &recorded),
                Err(_) => break,
            }
        }
    });
    MockUpstream { base_url, hits }
}

/// Answers `/healthz` with a 200 but hangs up on `/stats` without replying,
/// simulating an upstream that dies between the two calls.
pub fn spawn_upstream_dropping_stats() -> MockUpstream {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind mock upstream");
    let base_url = format!("http://{}", listener.local_addr().expect("local addr"));
    let hits = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&hits);
    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { break };
            let Some(path) = read_request_path(&stream) else {
                continue;
            };
            recorded.lock().unwrap().push(path.clone());
            if path == "/healthz" {
                let _ = stream.write_all(http_response("200 OK", "ok").as_bytes());
            }
            // any other path: drop the stream, closing the connection
            // before a response line is ever written
        }
    });
    MockUpstream { base_url, hits }
}

/// Accepts connections and holds them open without ever answering.
pub fn spawn_unresponsive_upstream() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind mock upstream");
    let base_url = format!("http://{}", listener.local_addr().expect("local addr"));
    thread::spawn(move || {
        let mut open = Vec::new();
        for stream in listener.incoming() {
            match stream {
                Ok(stream) => open.push(stream),
                Err(_) => break,
            }
        }
    });
    base_url
}

fn respond(
    mut stream: TcpStream,
    health_status: &str,
    stats_body: &str,
    hits: &Mutex<Vec<String>>,
) {
    let Some(path) = read_request_path(&stream) else {
        return;
    };
    hits.lock().unwrap().push(path.clone());

    let response = match path.as_str() {
        "/healthz" => http_response(health_status, "ok"),
        "/stats" => http_response("200 OK", stats_body),
        _ => http_response("404 Not Found", ""),
    };
    let _ = stream.write_all(response.as_bytes());
}

/// Reads the request line and drains the headers so the client sees a clean
/// close, returning the requested path.
fn read_request_path(stream: &TcpStream) -> Option<String> {
    let mut reader = BufReader::new(stream.try_clone().ok()?);
    let mut request_line = String::new();
    reader.read_line(&mut request_line).ok()?;
    loop {
        let mut line = String::new();
        match reader.read_line(&mut line) {
            Ok(0) => break,
            Ok(_) if line == "\r\n" => break,
            Ok(_) => {}
            Err(_) => return None,
        }
    }
    request_line
        .split_whitespace()
        .nth(1)
        .map(str::to_string)
}

fn http_response(status_line: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {status_line}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    )
}

/// Value of an unlabelled gauge family, panicking if it was not emitted.
pub fn gauge_value(families: &[MetricFamily], name: &str) -> f64 {
    let family = families
        .iter()
        .find(|f| f.get_name() == name)
        .unwrap_or_else(|| panic!("family {name} not emitted"));
    assert_eq!(family.get_metric().len(), 1, "{name} should be unlabelled");
    family.get_metric()[0].get_gauge().get_value()
}

/// Value of one labelled child in a gauge family.
pub fn load_value(families: &[MetricFamily], family_name: &str, bucket: &str) -> f64 {
    let family = families
        .iter()
        .find(|f| f.get_name() == family_name)
        .unwrap_or_else(|| panic!("family {family_name} not emitted"));
    family
        .get_metric()
        .iter()
        .find(|m| {
            m.get_label()
                .iter()
                .any(|l| l.get_name() == "bucket" && l.get_value() == bucket)
        })
        .unwrap_or_else(|| panic!("bucket {bucket} not emitted"))
        .get_gauge()
        .get_value()
}
