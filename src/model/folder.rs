//! Folder names and the active-folder context.

use std::fmt;

use crate::error::SyncError;

/// Validated name of a folder (one base image plus its features).
///
/// Only ASCII letters, digits, `_` and `-` are accepted, which also rules out
/// path traversal when the name is used in a URL or path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FolderName(String);

impl FolderName {
    pub fn parse(name: &str) -> Result<Self, SyncError> {
        if name.is_empty() {
            return Err(SyncError::validation("Folder name is empty"));
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(SyncError::validation(format!(
                "Invalid folder name '{}'",
                name
            )));
        }
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FolderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of the folder a request was issued for.
///
/// The epoch increases on every folder switch, so reopening the same folder
/// still invalidates responses issued before the switch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderContext {
    pub name: FolderName,
    pub epoch: u64,
}
