use serde::Serialize;
use serde_json::Value;

/// One decoded YAML document.
///
/// `raw` is the canonical re-serialization of `content` and is only used for
/// display. `source_file` is set when documents from several physical files are
/// compared together, and is what disambiguates colliding identities.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pub content: Value,
    pub raw: String,
    pub source_file: Option<String>,
}

impl Document {
    pub fn new(content: Value) -> Document {
        let raw = serde_yaml::to_string(&content).unwrap_or_else(|_| content.to_string());
        Document {
            content,
            raw,
            source_file: None,
        }
    }

    pub fn with_source(mut self, source_file: impl Into<String>) -> Document {
        self.source_file = Some(source_file.into());
        self
    }
}

impl From<Value> for Document {
    fn from(content: Value) -> Self {
        Document::new(content)
    }
}
