// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Block document: a self-describing persisted configuration object.
//!
//! The `data` mapping carries everything needed to reconstruct a typed
//! infrastructure instance, including its `type` discriminator. Deployment
//! overrides mutate `data` by dot-path before reconstruction, so they can
//! target any field regardless of the eventual variant.

use serde::{Deserialize, Serialize};
use thiserror::Error;

crate::define_uuid_id! {
    /// Server-assigned identifier for a block document.
    pub struct BlockDocumentId;
}

/// Errors applying a deployment override to a block document.
#[derive(Debug, Error)]
pub enum OverrideError {
    #[error("block document data is not a mapping")]
    DataNotAMapping,
    #[error("override path '{path}' references missing attribute '{segment}'")]
    MissingAttribute { path: String, segment: String },
    #[error("override path '{path}' descends into non-mapping attribute '{segment}'")]
    NotAMapping { path: String, segment: String },
}

/// A persisted configuration object reconstructible into a typed
/// infrastructure instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockDocument {
    pub id: BlockDocumentId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub is_anonymous: bool,
    pub data: serde_json::Value,
}

impl BlockDocument {
    /// An unnamed document, as saved when an agent persists its default
    /// infrastructure at startup.
    pub fn anonymous(data: serde_json::Value) -> Self {
        Self {
            id: BlockDocumentId::new(),
            name: None,
            is_anonymous: true,
            data,
        }
    }

    /// Apply one dot-delimited override to the document data.
    ///
    /// Intermediate segments must already exist and be mappings; a missing
    /// segment is a configuration error, never silently created. The final
    /// segment is set unconditionally (it may introduce a new key).
    pub fn apply_override(
        &mut self,
        path: &str,
        value: serde_json::Value,
    ) -> Result<(), OverrideError> {
        let mut segments: Vec<&str> = path.split('.').collect();
        // split() always yields at least one element
        let last = segments.pop().unwrap_or_default();

        let mut node = self
            .data
            .as_object_mut()
            .ok_or(OverrideError::DataNotAMapping)?;

        for segment in segments {
            node = node
                .get_mut(segment)
                .ok_or_else(|| OverrideError::MissingAttribute {
                    path: path.to_string(),
                    segment: segment.to_string(),
                })?
                .as_object_mut()
                .ok_or_else(|| OverrideError::NotAMapping {
                    path: path.to_string(),
                    segment: segment.to_string(),
                })?;
        }

        node.insert(last.to_string(), value);
        Ok(())
    }
}

#[cfg(test)]
#[path = "block_tests.rs"]
mod tests;
