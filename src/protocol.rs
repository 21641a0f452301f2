//! Messages exchanged between the page context and the background worker.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Message {
    #[serde(rename_all = "camelCase")]
    GetSelectionContext { selected_text: String },
    ShowExplanation(ShowExplanation),
}

/// Reply to [`Message::GetSelectionContext`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectionContextResponse {
    pub sentence: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShowExplanation {
    pub explanation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loading: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<bool>,
}

impl ShowExplanation {
    pub fn loading() -> Self {
        Self {
            explanation: "Loading...".into(),
            loading: Some(true),
            error: None,
        }
    }

    pub fn success(explanation: impl Into<String>) -> Self {
        Self {
            explanation: explanation.into(),
            loading: None,
            error: None,
        }
    }

    pub fn error(message: impl std::fmt::Display) -> Self {
        Self {
            explanation: format!("Error: {message}"),
            loading: None,
            error: Some(true),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.unwrap_or(false)
    }
}

impl From<ShowExplanation> for Message {
    fn from(message: ShowExplanation) -> Self {
        Message::ShowExplanation(message)
    }
}
