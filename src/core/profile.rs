//! User profile attached to medication questions.

use serde::{Deserialize, Serialize};

/// Value rendered for any profile field left blank.
pub const NONE_SENTINEL: &str = "none";

/// Health profile supplied by the user.
///
/// All fields are free text. Blank fields render as [`NONE_SENTINEL`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub age: String,
    pub gender: String,
    /// Known conditions.
    pub conditions: String,
    /// Medications currently taken.
    pub medications: String,
}

impl Profile {
    /// Render the `[User profile]` block that opens every assistant-mode message.
    #[must_use]
    pub fn render(&self) -> String {
        format!(
            "[User profile]\n- Age: {}\n- Gender: {}\n- Conditions: {}\n- Current medications: {}",
            or_none(&self.age),
            or_none(&self.gender),
            or_none(&self.conditions),
            or_none(&self.medications),
        )
    }

    /// True when every field is blank.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        [&self.age, &self.gender, &self.conditions, &self.medications]
            .iter()
            .all(|f| f.trim().is_empty())
    }
}

fn or_none(value: &str) -> &str {
    let value = value.trim();
    if value.is_empty() { NONE_SENTINEL } else { value }
}
