//! Message types exchanged with the page injector running in the web page.

use serde::{Deserialize, Serialize};

/// Text to write into the active page's input field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InjectionRequest {
    pub text: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InjectionFallback {
    Clipboard,
}

/// Injector's reply. `fallback` is set when the text went to the clipboard instead.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InjectionResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<InjectionFallback>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
