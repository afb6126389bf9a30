//! Data carried through the enrichment pipeline.
//!
//! Payloads come in from the caller, results go back out. Nothing here is
//! persisted by the pipeline itself.
use serde::{Deserialize, Serialize};

/// Color given to suggested tags when the caller does not configure one.
pub const DEFAULT_TAG_COLOR: &str = "#2196F3";

/// Maximum number of suggested tags returned per request.
pub const MAX_TAGS: usize = 3;

/// Maximum length of a suggested tag name, in characters.
pub const MAX_TAG_NAME_CHARS: usize = 30;

/// Maximum length of a generated description, in characters.
pub const MAX_DESCRIPTION_CHARS: usize = 200;

/// A decoded barcode as handed over by the scanner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BarcodePayload {
    /// Raw decoded text.
    pub content: String,

    /// Semantic class label ("URL", "Wi-Fi", "Contact", "Product", ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    /// Symbology label ("QR Code", "EAN-13", ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl BarcodePayload {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            kind: None,
            format: None,
        }
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }
}

/// A tag proposed by the model. The caller owns `selected`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestedTag {
    pub name: String,
    pub selected: bool,
    pub color: String,
}

impl SuggestedTag {
    pub fn unselected(name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            selected: false,
            color: color.into(),
        }
    }
}

/// Normalized output of one enrichment request.
///
/// Holds at most [`MAX_TAGS`] tags with unique names and a description of at
/// most [`MAX_DESCRIPTION_CHARS`] characters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentResult {
    pub tags: Vec<SuggestedTag>,
    pub description: String,
}

impl EnrichmentResult {
    /// Tag names in order, for display and assertions.
    pub fn tag_names(&self) -> Vec<&str> {
        self.tags.iter().map(|tag| tag.name.as_str()).collect()
    }
}

/// Everything one combined tags + description request needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichRequest {
    pub payload: BarcodePayload,
    /// Tag names already present in the user's library.
    pub existing_tags: Vec<String>,
    /// ISO 639-1 code or the `device` sentinel.
    pub language: String,
    pub humorous: bool,
    pub user_title: Option<String>,
    pub user_description: Option<String>,
}

impl EnrichRequest {
    pub fn new(payload: BarcodePayload) -> Self {
        Self {
            payload,
            existing_tags: Vec::new(),
            language: crate::language::DEVICE_LANGUAGE.to_string(),
            humorous: false,
            user_title: None,
            user_description: None,
        }
    }
}
