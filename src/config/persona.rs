//! Companion persona: the voice used in emotional-support mode.

use serde::{Deserialize, Serialize};

/// Who the companion is and how it speaks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Persona {
    /// Display name for the persona.
    pub name: String,

    /// Personality description (e.g., "Warm, patient, never judgemental").
    #[serde(default)]
    pub personality: Option<String>,

    /// Reply language the persona should stick to.
    #[serde(default)]
    pub language: Option<String>,

    /// System prompt content. Replaces the generated preamble when set.
    #[serde(default)]
    pub system_prompt: Option<String>,
}

impl Default for Persona {
    fn default() -> Self {
        Self::maeumi()
    }
}

impl Persona {
    /// The default counsellor persona.
    #[must_use]
    pub fn maeumi() -> Self {
        Self {
            name: "Maeumi".to_string(),
            personality: Some("Warm, gentle and deeply empathetic".to_string()),
            language: None,
            system_prompt: Some(
                "You are Maeumi, a warm counsellor who comforts the user and empathises with them. \
                 Listen closely to what they share and answer in a calm, reassuring tone. \
                 Keep every reply kind and gentle."
                    .to_string(),
            ),
        }
    }

    /// Build the system instruction that opens every companion request.
    #[must_use]
    pub fn build_system_prompt(&self) -> String {
        let mut parts = Vec::new();

        if let Some(ref prompt) = self.system_prompt {
            parts.push(prompt.clone());
        } else {
            parts.push(format!(
                "You are {}, a counsellor who listens and comforts.",
                self.name
            ));
            if let Some(ref personality) = self.personality {
                parts.push(format!("Your personality: {personality}."));
            }
        }

        if let Some(ref language) = self.language {
            parts.push(format!("Always reply in {language}."));
        }

        parts.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_persona_uses_its_prompt() {
        let persona = Persona::default();
        assert_eq!(persona.name, "Maeumi");
        assert!(persona.build_system_prompt().starts_with("You are Maeumi"));
    }

    #[test]
    fn generated_prompt_includes_personality_and_language() {
        let persona = Persona {
            name: "Sol".to_string(),
            personality: Some("Cheerful".to_string()),
            language: Some("Korean".to_string()),
            system_prompt: None,
        };
        let prompt = persona.build_system_prompt();
        assert!(prompt.starts_with("You are Sol"));
        assert!(prompt.contains("Your personality: Cheerful."));
        assert!(prompt.ends_with("Always reply in Korean."));
    }

    #[test]
    fn persona_parses_from_toml() {
        let persona: Persona = toml::from_str(
            r#"
name = "Haru"
system_prompt = "Be brief."
"#,
        )
        .unwrap();
        assert_eq!(persona.build_system_prompt(), "Be brief.");
    }
}
