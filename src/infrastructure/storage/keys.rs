use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Objects kept per document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
    Source,
    Text,
    Audio,
    AudioScratch,
    AudioProgress,
    Cover,
}

impl Artifact {
    pub fn as_str(&self) -> &'static str {
        match self {
            Artifact::Source => "source",
            Artifact::Text => "text",
            Artifact::Audio => "audio",
            Artifact::AudioScratch => "audio_scratch",
            Artifact::AudioProgress => "audio_progress",
            Artifact::Cover => "cover",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Artifact::Source => "application/pdf",
            Artifact::Text => "text/plain; charset=utf-8",
            Artifact::Audio | Artifact::AudioScratch => "audio/mpeg",
            Artifact::AudioProgress => "application/json",
            Artifact::Cover => "image/jpeg",
        }
    }
}

/// Identity of a document: the owner plus the document id
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentKey {
    pub owner: String,
    pub document_id: Uuid,
}

impl DocumentKey {
    pub fn new(owner: impl Into<String>, document_id: Uuid) -> Self {
        Self {
            owner: owner.into(),
            document_id,
        }
    }

    /// Prefix shared by every artifact of this document, trailing slash included
    pub fn prefix(&self) -> String {
        format!("{}/{}/", self.owner, self.document_id)
    }

    pub fn artifact(&self, artifact: Artifact) -> String {
        format!("{}{}", self.prefix(), artifact.as_str())
    }
}

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.document_id)
    }
}
