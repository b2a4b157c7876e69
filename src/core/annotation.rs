//! Drug tags the user attaches to their next question.
//!
//! Tags are session-only state. They are never written to the store and are
//! cleared after every submitted turn, whether it succeeded or not.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A drug or supplement attached to a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrugTag {
    /// Identifier from the lookup provider, used to reject duplicates.
    pub id: String,
    /// Product name.
    pub name: String,
    /// Active ingredient.
    pub ingredient: String,
}

impl DrugTag {
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        ingredient: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ingredient: ingredient.into(),
        }
    }

    /// Form used inside the assistant-mode request body.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{}({})", self.name, self.ingredient)
    }
}

impl fmt::Display for DrugTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.ingredient)
    }
}

/// Parses `name(ingredient)` or `name (ingredient)`.
///
/// Tags typed by hand have no provider id, so the id is derived from the
/// normalised name and ingredient.
impl FromStr for DrugTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (name, ingredient) = match s.find('(') {
            Some(open) if s.ends_with(')') => (&s[..open], &s[open + 1..s.len() - 1]),
            _ => return Err(format!("expected 'name(ingredient)', got '{s}'")),
        };
        let (name, ingredient) = (name.trim(), ingredient.trim());
        if name.is_empty() || ingredient.is_empty() {
            return Err(format!("expected 'name(ingredient)', got '{s}'"));
        }

        let id = format!("{}:{}", name.to_lowercase(), ingredient.to_lowercase());
        Ok(Self::new(id, name, ingredient))
    }
}

/// Ordered list of tags waiting for the next question.
#[derive(Debug, Clone, Default)]
pub struct PendingAnnotations {
    tags: Vec<DrugTag>,
}

impl PendingAnnotations {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a tag. Returns `false` if a tag with the same id is already attached.
    pub fn add(&mut self, tag: DrugTag) -> bool {
        if self.tags.iter().any(|t| t.id == tag.id) {
            return false;
        }
        self.tags.push(tag);
        true
    }

    /// Detach the tag at `index`.
    pub fn remove(&mut self, index: usize) -> Option<DrugTag> {
        (index < self.tags.len()).then(|| self.tags.remove(index))
    }

    /// Take every tag out, leaving the list empty.
    pub fn take(&mut self) -> Vec<DrugTag> {
        std::mem::take(&mut self.tags)
    }

    #[must_use]
    pub fn tags(&self) -> &[DrugTag] {
        &self.tags
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// How a question is echoed back: `[name] [name] text`.
    #[must_use]
    pub fn display_question(&self, text: &str) -> String {
        let names = self
            .tags
            .iter()
            .map(|t| format!("[{}]", t.name))
            .collect::<Vec<_>>()
            .join(" ");
        format!("{names} {text}").trim().to_string()
    }
}
