//! In-process stand-in for the prediction service.
//!
//! Serves canned responses per path from a `tiny_http` server on an
//! ephemeral loopback port and records every request it receives, so tests
//! can assert both on what the client rendered and on what it sent.
#![allow(dead_code)]

use std::collections::HashMap;
use std::io::Read;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use serde_json::Value;
use tiny_http::{Header, Response, Server, StatusCode};

/// A request as the backend saw it.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub body: String,
}

impl Recorded {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

#[derive(Debug, Clone)]
struct Canned {
    status: u16,
    content_type: &'static str,
    body: String,
}

#[derive(Default)]
pub struct Routes {
    routes: HashMap<String, Canned>,
}

impl Routes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Respond to `path` with a JSON body.
    pub fn json(mut self, path: &str, status: u16, body: Value) -> Self {
        self.routes.insert(
            path.to_string(),
            Canned {
                status,
                content_type: "application/json",
                body: body.to_string(),
            },
        );
        self
    }

    /// Respond to `path` with a raw event-stream body.
    pub fn stream(mut self, path: &str, body: &str) -> Self {
        self.routes.insert(
            path.to_string(),
            Canned {
                status: 200,
                content_type: "text/event-stream",
                body: body.to_string(),
            },
        );
        self
    }
}

pub struct FakeBackend {
    url: String,
    server: Arc<Server>,
    requests: Arc<Mutex<Vec<Recorded>>>,
    handle: Option<JoinHandle<()>>,
}

impl FakeBackend {
    pub fn start(routes: Routes) -> Self {
        let server = Arc::new(Server::http("127.0.0.1:0").unwrap());
        let port = server.server_addr().to_ip().unwrap().port();
        let requests = Arc::new(Mutex::new(Vec::new()));

        let handle = {
            let server = Arc::clone(&server);
            let requests = Arc::clone(&requests);
            thread::spawn(move || {
                for mut request in server.incoming_requests() {
                    let mut body = String::new();
                    let _ = request.as_reader().read_to_string(&mut body);
                    let path = request.url().split('?').next().unwrap_or("").to_string();
                    requests.lock().unwrap().push(Recorded {
                        method: request.method().to_string(),
                        path: path.clone(),
                        body,
                    });

                    let canned = routes.routes.get(&path).cloned().unwrap_or(Canned {
                        status: 404,
                        content_type: "application/json",
                        body: r#"{"error":"not found"}"#.to_string(),
                    });
                    let header =
                        Header::from_bytes(&b"Content-Type"[..], canned.content_type.as_bytes())
                            .unwrap();
                    let response = Response::from_data(canned.body.into_bytes())
                        .with_header(header)
                        .with_status_code(StatusCode(canned.status));
                    let _ = request.respond(response);
                }
            })
        };

        Self {
            url: format!("http://127.0.0.1:{port}"),
            server,
            requests,
            handle: Some(handle),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub fn paths(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.path).collect()
    }
}

impl Drop for FakeBackend {
    fn drop(&mut self) {
        self.server.unblock();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Build `data: <json>` lines for a streamed reply ending in `done`.
pub fn event_stream(chunks: &[&str]) -> String {
    let mut body = String::new();
    for chunk in chunks {
        body.push_str(&format!(
            "data: {}\n\n",
            serde_json::json!({"chunk": chunk, "done": false})
        ));
    }
    body.push_str("data: {\"done\": true}\n\n");
    body
}

/// A successful quick-prediction payload.
pub fn quick_result() -> Value {
    serde_json::json!({
        "success": true,
        "prediction": {"bmi": 31.2, "predicted_class": "Obesity Type I", "confidence": 64.5},
        "input_data": {"gender": "Female", "age": 41, "height": 160, "weight": 80}
    })
}

/// A successful full-prediction payload with class probabilities.
pub fn full_result() -> Value {
    serde_json::json!({
        "success": true,
        "prediction": {
            "bmi": 24.22,
            "predicted_class": "Normal Weight",
            "confidence": 71.3,
            "all_probabilities": {
                "Normal Weight": 71.3,
                "Overweight Level I": 20.0,
                "Insufficient Weight": 8.7
            }
        },
        "input_data": {"gender": "Male", "age": 25, "height": 175, "weight": 74.2},
        "model_version": "2024-03"
    })
}
