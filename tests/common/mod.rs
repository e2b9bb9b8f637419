#![allow(dead_code)]

//! Minimal HTTP/1.1 stub for exercising the reqwest clients and the binary.
//! Serves canned responses per request target and records what it received.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub target: String,
    /// Header lines with lowercased names, e.g. `authorization: Bearer x`.
    pub headers: Vec<String>,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        let prefix = format!("{}:", name.to_lowercase());
        self.headers
            .iter()
            .find(|h| h.starts_with(&prefix))
            .map(|h| h[prefix.len()..].trim())
    }
}

type Routes = Arc<Mutex<HashMap<String, (u16, String)>>>;

pub struct StubServer {
    pub base_url: String,
    routes: Routes,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl StubServer {
    pub fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind stub server");
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let routes: Routes = Arc::new(Mutex::new(HashMap::new()));
        let requests = Arc::new(Mutex::new(Vec::new()));

        let (thread_routes, thread_requests) = (routes.clone(), requests.clone());
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                handle(stream, &thread_routes, &thread_requests);
            }
        });

        Self {
            base_url,
            routes,
            requests,
        }
    }

    /// Serve `body` with `status` for requests whose target (path plus query) is `target`.
    pub fn route(&self, target: &str, status: u16, body: impl Into<String>) {
        self.routes
            .lock()
            .unwrap()
            .insert(target.to_string(), (status, body.into()));
    }

    pub fn url(&self, target: &str) -> String {
        format!("{}{}", self.base_url, target)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

fn handle(mut stream: TcpStream, routes: &Routes, requests: &Arc<Mutex<Vec<RecordedRequest>>>) {
    let mut raw = Vec::new();
    let mut buf = [0u8; 1024];
    while !raw.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut buf) {
            Ok(0) | Err(_) => return,
            Ok(n) => raw.extend_from_slice(&buf[..n]),
        }
    }
    let head = String::from_utf8_lossy(&raw).to_string();
    let mut lines = head.split("\r\n");
    let target = lines
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/")
        .to_string();
    let headers = lines
        .take_while(|l| !l.is_empty())
        .map(|l| match l.split_once(':') {
            Some((name, value)) => format!("{}:{}", name.to_lowercase(), value),
            None => l.to_string(),
        })
        .collect();
    requests.lock().unwrap().push(RecordedRequest {
        target: target.clone(),
        headers,
    });

    let (status, body) = routes
        .lock()
        .unwrap()
        .get(&target)
        .cloned()
        .unwrap_or((404, "not found".to_string()));
    let response = format!(
        "HTTP/1.1 {status} STUB\r\nContent-Type: text/plain; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}
