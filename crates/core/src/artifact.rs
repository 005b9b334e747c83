//! Tagged artifact and relationship types: a discriminated union on
//! `ArtifactKind`, with each variant's specific fields (callee + confidence
//! for CALL, heading level + slug for MARKDOWN_SECTION, ...) carried in
//! typed `metadata`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ArtifactKind {
    Module,
    Class,
    Function,
    Method,
    Import,
    Call,
    MarkdownModule,
    MarkdownSection,
}

impl ArtifactKind {
    /// Types a DOCUMENTS edge is allowed to target.
    pub fn is_documentable(self) -> bool {
        matches!(self, Self::Class | Self::Function | Self::Method | Self::Module)
    }

    /// Types that receive DEFINES edges from their parent.
    pub fn is_definition(self) -> bool {
        matches!(self, Self::Class | Self::Function | Self::Method | Self::MarkdownSection)
    }

    /// Types indexed into the flat symbol table.
    pub fn is_symbol(self) -> bool {
        matches!(self, Self::Class | Self::Function | Self::Method)
    }
}

/// A single extracted artifact. `id` is always a fully-formed canonical_id
/// by the time the builder has processed it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub id: String,
    pub name: String,
    pub parent_id: Option<String>,
    pub relative_path: String,
    pub text: Option<String>,
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Artifact {
    pub fn new(kind: ArtifactKind, id: impl Into<String>, name: impl Into<String>, relative_path: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
            name: name.into(),
            parent_id: None,
            relative_path: relative_path.into(),
            text: None,
            metadata: HashMap::new(),
        }
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_meta(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationType {
    Defines,
    Call,
    Import,
    Documents,
}

impl RelationType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Defines => "DEFINES",
            Self::Call => "CALL",
            Self::Import => "IMPORT",
            Self::Documents => "DOCUMENTS",
        }
    }
}

impl std::str::FromStr for RelationType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DEFINES" => Ok(Self::Defines),
            "CALL" => Ok(Self::Call),
            "IMPORT" => Ok(Self::Import),
            "DOCUMENTS" => Ok(Self::Documents),
            _ => Err(()),
        }
    }
}

/// A derived relationship between two canonical_ids. `(from, to, type)` is
/// unique within a `RepoGraph`; self-loops are never emitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relationship {
    pub from_canonical_id: String,
    pub to_canonical_id: String,
    pub relation_type: RelationType,
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Relationship {
    pub fn new(from: impl Into<String>, to: impl Into<String>, relation_type: RelationType) -> Self {
        Self {
            from_canonical_id: from.into(),
            to_canonical_id: to.into(),
            relation_type,
            metadata: HashMap::new(),
        }
    }

    pub fn with_meta(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}
