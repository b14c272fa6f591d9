//! Host app lifecycle phases forwarded into the core.

use serde::{Deserialize, Serialize};

/// Foreground/background state reported by the host platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenePhase {
    /// Visible and receiving input.
    Active,
    /// Visible but not receiving input (transitions, system overlays).
    Inactive,
    /// Not visible; the process may be suspended at any moment.
    Background,
}

impl ScenePhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Background => "background",
        }
    }

    /// Parses the lowercase wire name used by the FFI layer.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "active" => Some(Self::Active),
            "inactive" => Some(Self::Inactive),
            "background" => Some(Self::Background),
            _ => None,
        }
    }
}
