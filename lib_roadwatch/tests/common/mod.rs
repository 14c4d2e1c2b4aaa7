//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use lib_roadwatch::configs::{Credentials, PipelineConfig};
use lib_roadwatch::retrieve::ky_http::{ApiResponse, HttpTransport, TransportError};
use url::Url;

/// Replays canned responses in order. Once the script runs dry every further
/// request fails with a connection error.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    script: Arc<Mutex<VecDeque<Result<ApiResponse, TransportError>>>>,
    calls: Arc<AtomicUsize>,
    last_url: Arc<Mutex<Option<Url>>>,
}

impl ScriptedTransport {
    pub fn new(script: impl IntoIterator<Item = Result<ApiResponse, TransportError>>) -> Self {
        Self {
            script: Arc::new(Mutex::new(script.into_iter().collect())),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_url(&self) -> Option<Url> {
        self.last_url.lock().unwrap().clone()
    }
}

impl HttpTransport for ScriptedTransport {
    async fn get(&self, url: &Url) -> Result<ApiResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_url.lock().unwrap() = Some(url.clone());
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Err(TransportError::Connect("script exhausted".into())))
    }
}

pub fn ok(body: &str) -> Result<ApiResponse, TransportError> {
    Ok(ApiResponse::new(200, body))
}

pub fn status(code: u16) -> Result<ApiResponse, TransportError> {
    Ok(ApiResponse::new(code, ""))
}

pub fn timeout() -> Result<ApiResponse, TransportError> {
    Err(TransportError::Timeout("operation timed out".into()))
}

pub fn config(work_dir: &Path) -> PipelineConfig {
    let credentials = Credentials::new(Some("app-id".into()), "app-key").unwrap();
    PipelineConfig::new(credentials, work_dir)
}

pub const TWO_RECORDS: &str = r#"[
  {"id": "TIMS-1", "severity": "Serious", "severityLevel": 2, "category": "Works",
   "point": "[-0.1,51.5]", "startDateTime": "2024-05-01T08:00:00Z", "corridorIds": ["a2"]},
  {"id": "TIMS-2", "severity": "Minimal", "severityLevel": 5, "comments": "Lane 1 closed"}
]"#;
