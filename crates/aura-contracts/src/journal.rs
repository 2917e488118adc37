use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};

pub type JournalPayload = Map<String, Value>;

/// Append-only diagnostics writer for `journal.jsonl`.
///
/// Failures in the request layer degrade silently at the user surface, so
/// every fallback branch lands here instead. One compact JSON object per
/// line; default fields are `type`, `session`, `ts`, and the caller payload
/// is merged last and may override them.
#[derive(Debug, Clone)]
pub struct Journal {
    inner: Arc<JournalInner>,
}

#[derive(Debug)]
struct JournalInner {
    path: PathBuf,
    session: String,
    lock: Mutex<()>,
}

impl Journal {
    pub fn new(path: impl Into<PathBuf>, session: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(JournalInner {
                path: path.into(),
                session: session.into(),
                lock: Mutex::new(()),
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    pub fn session(&self) -> &str {
        &self.inner.session
    }

    pub fn emit(&self, entry_type: &str, payload: JournalPayload) -> anyhow::Result<Value> {
        let mut entry = Map::new();
        entry.insert("type".to_string(), Value::String(entry_type.to_string()));
        entry.insert(
            "session".to_string(),
            Value::String(self.inner.session.clone()),
        );
        entry.insert(
            "ts".to_string(),
            Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false)),
        );
        for (key, value) in payload {
            entry.insert(key, value);
        }

        if let Some(parent) = self.inner.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let line = serde_json::to_string(&entry)?;
        let _guard = self
            .inner
            .lock
            .lock()
            .map_err(|_| anyhow::anyhow!("journal lock poisoned"))?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.inner.path)?;
        file.write_all(line.as_bytes())?;
        file.write_all(b"\n")?;

        Ok(Value::Object(entry))
    }
}
