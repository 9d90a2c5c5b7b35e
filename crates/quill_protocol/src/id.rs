/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - QUILL Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use crate::DecodeError;
use serde::{Deserialize, Serialize};

/// Content/object identifier on the Mimei network. Primary key for
/// users, tweets and media blobs. Always 27 chars (mutable object) or
/// 64 chars (content-addressed blob).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
#[serde(into = "String")]
pub struct MimeiId(String);

impl MimeiId {
    pub fn parse(s: &str) -> Result<Self, DecodeError> {
        Self::try_from(s.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Content-addressed blobs carry the long (64-char) form.
    pub fn is_content_addressed(&self) -> bool {
        self.0.len() > 27
    }
}

impl TryFrom<String> for MimeiId {
    type Error = DecodeError;

    fn try_from(s: String) -> Result<Self, DecodeError> {
        match s.len() {
            27 | 64 => Ok(MimeiId(s)),
            len => Err(DecodeError::BadId { len }),
        }
    }
}

impl From<MimeiId> for String {
    fn from(id: MimeiId) -> String {
        id.0
    }
}

impl AsRef<str> for MimeiId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MimeiId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// URL at which a media blob is served. Content-addressed ids live
/// under `/ipfs/`, mutable Mimei objects under `/mm/`.
pub fn media_url(base_url: &str, id: &MimeiId) -> String {
    let base = base_url.trim_end_matches('/');
    if id.is_content_addressed() {
        format!("{base}/ipfs/{id}")
    } else {
        format!("{base}/mm/{id}")
    }
}
