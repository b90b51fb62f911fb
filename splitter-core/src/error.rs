//! Error body shape returned by the API on non-success responses.

use serde::{Deserialize, Serialize};

/// Error payload. Either field may be absent; servers vary in which one they fill.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ErrorBody {
    /// The most specific human-readable text: `message`, then `error`.
    pub fn preferred_text(&self) -> Option<&str> {
        [self.message.as_deref(), self.error.as_deref()]
            .into_iter()
            .flatten()
            .find(|text| !text.trim().is_empty())
    }
}
