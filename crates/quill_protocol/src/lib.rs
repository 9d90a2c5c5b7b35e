/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - QUILL Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

pub mod id;
pub mod model;

pub use id::{media_url, MimeiId};
pub use model::{ChatMessage, ChatSession, ScoredEntry, Tweet, User};

/// Typed decode failure for remote JSON. The server side is loosely
/// typed, so every shape mismatch surfaces here instead of panicking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// An id string with a length other than 27 or 64.
    BadId { len: usize },
    /// A record body that does not match the expected schema.
    Shape {
        what: &'static str,
        detail: String,
    },
    /// A required field missing from an otherwise well-formed value.
    Missing {
        what: &'static str,
        field: &'static str,
    },
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::BadId { len } => {
                write!(f, "bad mimei id length {len}, expected 27 or 64")
            }
            DecodeError::Shape { what, detail } => write!(f, "malformed {what}: {detail}"),
            DecodeError::Missing { what, field } => {
                write!(f, "{what} is missing required field `{field}`")
            }
        }
    }
}

impl std::error::Error for DecodeError {}
