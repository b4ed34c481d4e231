use serde::{Deserialize, Serialize};

use crate::core::Document;
use crate::markup::{parse_markup, plain_text, to_markup};

const DEFAULT_SCHEMA: &str = "manos-rich-editor";
const DEFAULT_VERSION: u32 = 1;

fn default_schema() -> String {
    DEFAULT_SCHEMA.to_string()
}

fn default_version() -> u32 {
    DEFAULT_VERSION
}

/// What the owner receives after every change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditorContent {
    pub markup: String,
    pub plain_text: String,
}

impl EditorContent {
    pub fn from_document(doc: &Document) -> Self {
        Self {
            markup: to_markup(doc),
            plain_text: plain_text(doc),
        }
    }
}

/// Versioned persisted form of an editor document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditorValue {
    #[serde(default = "default_schema")]
    pub schema: String,
    #[serde(default = "default_version")]
    pub version: u32,
    pub markup: String,
}

impl EditorValue {
    pub fn from_document(doc: &Document) -> Self {
        Self {
            schema: default_schema(),
            version: default_version(),
            markup: to_markup(doc),
        }
    }

    pub fn into_document(self) -> Document {
        parse_markup(&self.markup)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json_str(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}
