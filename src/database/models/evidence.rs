use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::macros::string_enum;

string_enum! {
    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
    #[serde(rename_all = "snake_case")]
    pub enum EvidenceKind {
        Image => "image",
        Document => "document",
    }
}

impl EvidenceKind {
    pub fn detect(content_type: &str) -> Self {
        if content_type.to_ascii_lowercase().starts_with("image/") {
            EvidenceKind::Image
        } else {
            EvidenceKind::Document
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Evidence {
    pub id: Uuid,             // UUID primary key
    pub explanation_id: Uuid, // UUID for explanations references
    pub original_filename: String,
    pub stored_filename: String,
    pub storage_path: String,
    pub file_url: String,
    pub file_size: i64, // BIGINT, bytes
    pub content_type: String,
    pub kind: EvidenceKind,
    pub description: Option<String>,
    pub is_verified: bool,
    pub verified_by: Option<Uuid>,
    pub verified_at: Option<DateTime<Utc>>,
    pub uploaded_at: DateTime<Utc>, // TIMESTAMPTZ
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEvidence {
    pub explanation_id: Uuid,
    pub original_filename: String,
    pub stored_filename: String,
    pub storage_path: String,
    pub file_url: String,
    pub file_size: i64,
    pub content_type: String,
    pub kind: EvidenceKind,
    pub description: Option<String>,
}

/// A file handed to the evidence store before validation.
#[derive(Debug, Clone)]
pub struct EvidenceUpload {
    pub file_name: String,
    pub content_type: String,
    pub content: Vec<u8>,
    pub description: Option<String>,
    pub kind: Option<EvidenceKind>,
}

impl EvidenceUpload {
    pub fn size(&self) -> i64 {
        self.content.len() as i64
    }

    pub fn extension(&self) -> Option<&str> {
        self.file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext)
            .filter(|ext| !ext.is_empty())
    }
}
