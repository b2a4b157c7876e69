//! Conversation modes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Which kind of conversation is active.
///
/// Both modes share one message log. The mode only decides how the next
/// request is assembled and which endpoint receives it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Medication consultation backed by a server-side thread.
    #[default]
    Assistant,
    /// Emotional support, stateless on the server.
    Companion,
}

/// Heading shown when a mode becomes active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Banner {
    pub title: &'static str,
    pub notice: &'static str,
}

impl Mode {
    /// Lowercase name used in config, state files and the CLI.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Assistant => "assistant",
            Self::Companion => "companion",
        }
    }

    /// Endpoint path requests in this mode are posted to.
    #[must_use]
    pub const fn endpoint(self) -> &'static str {
        match self {
            Self::Assistant => "/assistant",
            Self::Companion => "/chat",
        }
    }

    /// Whether drug annotations are offered in this mode.
    #[must_use]
    pub const fn accepts_annotations(self) -> bool {
        matches!(self, Self::Assistant)
    }

    /// The other mode.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Assistant => Self::Companion,
            Self::Companion => Self::Assistant,
        }
    }

    #[must_use]
    pub const fn banner(self) -> Banner {
        match self {
            Self::Assistant => Banner {
                title: "AI Medication Consultation",
                notice: "Ask about the medicines you take. Attach drugs or supplements with /drug \
                         and answers will take your saved profile into account.\n\
                         This service is informational only and does not replace a diagnosis. \
                         Always consult a doctor or pharmacist.",
            },
            Self::Companion => Banner {
                title: "AI Heart-to-Heart",
                notice: "Hello, I'm Maeumi, your counsellor. Tell me anything, at your own pace.",
            },
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "assistant" | "med" | "medication" => Ok(Self::Assistant),
            "companion" | "mind" | "calm" => Ok(Self::Companion),
            other => Err(format!(
                "unknown mode '{other}', expected 'assistant' or 'companion'"
            )),
        }
    }
}

/// Tracks the active mode.
///
/// Switching is a pure state change: no store access, no network call.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModeController {
    active: Mode,
}

impl ModeController {
    pub const fn set_mode(&mut self, mode: Mode) {
        self.active = mode;
    }

    #[must_use]
    pub const fn active_mode(&self) -> Mode {
        self.active
    }

    /// Flip to the other mode and return it.
    pub const fn toggle(&mut self) -> Mode {
        self.active = self.active.toggled();
        self.active
    }
}
