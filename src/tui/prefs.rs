use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::Category;
use crate::ordering::DateView;

/// Filter choices carried over between TUI sessions.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewPrefs {
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub date_view: DateView,
}

impl ViewPrefs {
    /// Missing or unreadable files give the defaults.
    pub fn load(path: &Path) -> ViewPrefs {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(_) => return ViewPrefs::default(),
        };
        serde_json::from_str(&raw).unwrap_or_else(|err| {
            tracing::warn!(error = %err, path = %path.display(), "ignoring unreadable view preferences");
            ViewPrefs::default()
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_vec_pretty(self)?)?;
        Ok(())
    }
}
