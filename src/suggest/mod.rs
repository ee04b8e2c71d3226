pub mod fallback;
pub mod parse;
pub mod prompt;
pub mod requester;
pub mod service;
pub mod upstream;

use serde::{Deserialize, Serialize};

/// Partial submit-form data sent to the suggestion endpoint
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SuggestionRequest {
    pub track: Option<String>,
    pub presenter: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
}

impl SuggestionRequest {
    pub fn track(&self) -> Option<&str> {
        present(&self.track)
    }

    pub fn presenter(&self) -> Option<&str> {
        present(&self.presenter)
    }

    pub fn title(&self) -> Option<&str> {
        present(&self.title)
    }

    pub fn description(&self) -> Option<&str> {
        present(&self.description)
    }

    pub fn is_empty(&self) -> bool {
        self.track().is_none()
            && self.presenter().is_none()
            && self.title().is_none()
            && self.description().is_none()
    }
}

// An empty form field counts as absent.
fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SuggestionResult {
    pub title: String,
    pub description: String,
}

impl SuggestionResult {
    /// Both fields carry text after trimming
    pub fn is_complete(&self) -> bool {
        !self.title.trim().is_empty() && !self.description.trim().is_empty()
    }
}
