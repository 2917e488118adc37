use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// A single to-do entry. Held only in memory; destroyed with the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub text: String,
    pub completed: bool,
}

/// Ordered in-memory task sequence. Insertion order is display order.
#[derive(Debug, Clone, Default)]
pub struct TaskList {
    items: Vec<Task>,
}

impl TaskList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a new task and returns it. Whitespace-only text is a no-op.
    ///
    /// Ids are millisecond timestamps, bumped on collision so they stay
    /// unique within the session even for rapid adds.
    pub fn add(&mut self, text: &str) -> Option<&Task> {
        if text.trim().is_empty() {
            return None;
        }
        let id = self.next_id();
        self.items.push(Task {
            id,
            text: text.to_string(),
            completed: false,
        });
        self.items.last()
    }

    /// Flips `completed` on the matching task. Returns false for unknown ids.
    pub fn toggle(&mut self, id: &str) -> bool {
        match self.items.iter_mut().find(|task| task.id == id) {
            Some(task) => {
                task.completed = !task.completed;
                true
            }
            None => false,
        }
    }

    /// Removes exactly the matching task, preserving the relative order of
    /// the rest. Returns false for unknown ids.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|task| task.id != id);
        self.items.len() != before
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.items.iter().find(|task| task.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn next_id(&self) -> String {
        let mut stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|duration| duration.as_millis())
            .unwrap_or(0);
        while self.items.iter().any(|task| task.id == stamp.to_string()) {
            stamp += 1;
        }
        stamp.to_string()
    }
}
