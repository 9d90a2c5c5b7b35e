/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - QUILL Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use crate::entry::{methods, EntryClient};
use crate::rpc::RpcClient;
use anyhow::{Context, Result};
use bytes::Bytes;
use quill_protocol::MimeiId;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

pub use quill_protocol::media_url;

/// Upload chunk size. Nodes reject bodies past a few hundred KiB, so
/// stay under that.
const CHUNK_BYTES: usize = 256 * 1024;

pub fn sniff_mime(filename: &str) -> String {
    mime_guess::from_path(filename)
        .first()
        .map(|m| m.to_string())
        .unwrap_or_else(|| "application/octet-stream".to_string())
}

/// Chunked upload into content-addressed storage: open a temp file on
/// the node, stream chunks, then seal it into a Mimei id.
pub struct MediaUploader {
    entry: Arc<EntryClient>,
    rpc: Arc<RpcClient>,
}

impl MediaUploader {
    pub fn new(entry: Arc<EntryClient>, rpc: Arc<RpcClient>) -> Self {
        Self { entry, rpc }
    }

    pub async fn upload(
        &self,
        base: &str,
        viewer: &MimeiId,
        filename: &str,
        bytes: Bytes,
    ) -> Result<MimeiId> {
        let v = self
            .entry
            .call(
                base,
                methods::OPEN_TEMP_FILE,
                &[
                    ("userid", viewer.to_string()),
                    ("filename", filename.to_string()),
                    ("type", sniff_mime(filename)),
                ],
                false,
            )
            .await?;
        let handle = v
            .get("handle")
            .and_then(Value::as_str)
            .or_else(|| v.as_str())
            .context("open_temp_file: no handle in response")?
            .to_string();

        let mut offset = 0usize;
        while offset < bytes.len() {
            let end = (offset + CHUNK_BYTES).min(bytes.len());
            self.rpc
                .upload_chunk(base, &handle, offset as u64, &bytes[offset..end])
                .await
                .with_context(|| format!("upload chunk at {offset}"))?;
            offset = end;
        }

        let id = self.rpc.temp_to_mimei(base, &handle).await?;
        debug!("uploaded {filename} ({} bytes) as {id}", bytes.len());
        Ok(id)
    }
}
