use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

use chrono::Utc;
use serde_json::{json, Value};
use tracing::warn;

use crate::diff::diff_json;
use crate::transport::Transport;
use crate::Result;

pub enum ResponseLogMode {
    Full,
    /// First body per endpoint in full, then only the changed leaves.
    Diffed,
}

/// NDJSON trail of upstream responses, one line per fetch.
pub(crate) struct ResponseLogger {
    mode: ResponseLogMode,
    file: File,
    previous: HashMap<&'static str, Value>,
}

impl ResponseLogger {
    pub fn new(mode: ResponseLogMode, path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            mode,
            file,
            previous: HashMap::new(),
        })
    }

    pub fn log_response(&mut self, endpoint: &'static str, body: &str) {
        let body: Value = serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()));
        let ts = Utc::now().to_rfc3339();

        let entry = match (&self.mode, self.previous.get(endpoint)) {
            (ResponseLogMode::Diffed, Some(prev)) => {
                let mut changes = Vec::new();
                diff_json(prev, &body, "", &mut changes);
                let changes: Vec<Value> = changes
                    .into_iter()
                    .map(|c| json!({ "path": c.path, "old": c.old, "new": c.new }))
                    .collect();
                json!({ "ts": ts, "endpoint": endpoint, "changes": changes })
            }
            (ResponseLogMode::Diffed, None) => {
                json!({ "ts": ts, "endpoint": endpoint, "full": true, "body": body.clone() })
            }
            (ResponseLogMode::Full, _) => json!({ "ts": ts, "endpoint": endpoint, "body": body.clone() }),
        };
        self.write_line(&entry);

        if matches!(self.mode, ResponseLogMode::Diffed) {
            self.previous.insert(endpoint, body);
        }
    }

    pub fn log_failure(&mut self, endpoint: &'static str, error: &crate::Error) {
        let entry = json!({
            "ts": Utc::now().to_rfc3339(),
            "endpoint": endpoint,
            "error": error.to_string(),
        });
        self.write_line(&entry);
    }

    fn write_line(&mut self, entry: &Value) {
        if let Ok(line) = serde_json::to_string(entry)
            && let Err(e) = writeln!(self.file, "{line}")
        {
            warn!("failed to write response log entry: {e}");
        }
    }
}

/// GET through `transport`, recording the outcome when a log is open.
pub(crate) async fn logged_get<T: Transport>(
    transport: &T,
    logger: Option<&mut ResponseLogger>,
    endpoint: &'static str,
    url: &str,
) -> Result<String> {
    let result = transport.get(url).await;
    if let Some(logger) = logger {
        match &result {
            Ok(body) => logger.log_response(endpoint, body),
            Err(e) => logger.log_failure(endpoint, e),
        }
    }
    result
}
