//! Descriptive metadata for a kind of processing unit.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Name, description and recognized file extensions of a processor.
///
/// Used for discovery and listing only; it has no effect on execution.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessorMetadata {
    pub name: String,
    pub description: String,
    /// Extensions without the leading dot, e.g. `["pak", "bin"]`.
    #[serde(default)]
    pub extensions: Vec<String>,
}

impl ProcessorMetadata {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            extensions: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions
            .into_iter()
            .map(|e| e.into().trim_start_matches('.').to_string())
            .collect();
        self
    }

    /// Whether `path` has one of the recognized extensions (case-insensitive).
    /// A processor without extensions handles everything.
    #[must_use]
    pub fn handles(&self, path: &Path) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext))
    }
}
