//! Command scripts for `srun`.

use serde::Deserialize;

/// A command script, one command per line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "ScriptSource")]
pub struct Script {
    text: String,
}

/// A script as it arrives from a host: one string or a sequence of lines.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ScriptSource {
    /// Complete script text.
    Text(String),
    /// Individual lines.
    Lines(Vec<String>),
}

impl Script {
    /// Creates a script from its text.
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Creates a script by joining `lines` with newlines.
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let text = lines
            .into_iter()
            .map(|line| line.as_ref().to_string())
            .collect::<Vec<_>>()
            .join("\n");
        Self { text }
    }

    /// Returns the script text handed to the engine.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns true if the script has no commands.
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

impl From<ScriptSource> for Script {
    fn from(source: ScriptSource) -> Self {
        match source {
            ScriptSource::Text(text) => Script::new(text),
            ScriptSource::Lines(lines) => Script::from_lines(lines),
        }
    }
}

impl From<&str> for Script {
    fn from(text: &str) -> Self {
        Script::new(text)
    }
}

impl From<String> for Script {
    fn from(text: String) -> Self {
        Script::new(text)
    }
}

impl From<Vec<String>> for Script {
    fn from(lines: Vec<String>) -> Self {
        Script::from_lines(lines)
    }
}
