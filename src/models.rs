//! Shared data models used across modules

use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether a photo shows a software-related issue. Selects the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Yes,
    No,
}

impl Verdict {
    /// Parse a model reply. Only an exact "yes" (after trim and lowercase) counts.
    pub fn from_reply(reply: &str) -> Self {
        if reply.trim().to_lowercase() == "yes" {
            Verdict::Yes
        } else {
            Verdict::No
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Yes => "yes",
            Verdict::No => "no",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of a successful POST
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessPhotoResponse {
    pub success: bool,
    pub image_url: String,
    pub frame_style: Verdict,
    /// Normalized model reply, or "no" when classification failed
    pub analysis_result: String,
    pub message: String,
}

/// Body of every failed request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
}
