/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - QUILL Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use crate::http_retry::send_with_retry;
use crate::net_metrics::NetMetrics;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as B64, Engine as _};
use quill_protocol::{MimeiId, ScoredEntry};
use serde_json::Value;
use std::sync::Arc;

/// Named operations of the node RPC service at `{base}/webapi/`.
pub mod calls {
    pub const GET_VAR: &str = "getvar";
    pub const SET_VAR: &str = "setvar";
    pub const MM_OPEN: &str = "mmopen";
    pub const MM_CREATE: &str = "mmcreate";
    pub const MM_BACKUP: &str = "mmbackup";
    pub const H_GET: &str = "hget";
    pub const H_SET: &str = "hset";
    pub const H_DEL: &str = "hdel";
    pub const Z_ADD: &str = "zadd";
    pub const Z_REV_RANGE: &str = "zrevrange";
    pub const UPLOAD_CHUNK: &str = "uploadchunk";
    pub const TEMP_TO_MIMEI: &str = "tmp2mimei";
}

/// One named call against one node. The production impl posts a JSON
/// envelope; tests substitute scripted fakes.
#[async_trait]
pub trait RpcTransport: Send + Sync {
    async fn invoke(&self, base_url: &str, call: &str, args: Vec<Value>) -> Result<Value>;
}

pub struct HttpRpcTransport {
    http: reqwest::Client,
    metrics: Arc<NetMetrics>,
}

impl HttpRpcTransport {
    pub fn new(http: reqwest::Client, metrics: Arc<NetMetrics>) -> Self {
        Self { http, metrics }
    }
}

#[async_trait]
impl RpcTransport for HttpRpcTransport {
    async fn invoke(&self, base_url: &str, call: &str, args: Vec<Value>) -> Result<Value> {
        self.metrics.rpc_call();
        let url = format!("{}/webapi/", base_url.trim_end_matches('/'));
        let body = serde_json::json!({ "call": call, "args": args });
        let resp = send_with_retry(|| self.http.post(&url).json(&body), 3, &self.metrics).await?;
        let status = resp.status();
        if !status.is_success() {
            self.metrics.http_error();
            bail!("rpc {call}: http {status}");
        }
        let v: Value = resp
            .json()
            .await
            .with_context(|| format!("rpc {call}: malformed response body"))?;
        decode_envelope(call, v)
    }
}

/// Response envelope is `{"ok": bool, "result": ..., "error": ...}`.
pub fn decode_envelope(call: &str, v: Value) -> Result<Value> {
    match v.get("ok").and_then(Value::as_bool) {
        Some(true) => Ok(v.get("result").cloned().unwrap_or(Value::Null)),
        Some(false) => {
            let err = v
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unspecified server error");
            bail!("rpc {call}: {err}")
        }
        None => bail!("rpc {call}: missing `ok` in envelope"),
    }
}

/// Typed wrappers over the named-call transport.
pub struct RpcClient {
    transport: Arc<dyn RpcTransport>,
}

impl RpcClient {
    pub fn new(transport: Arc<dyn RpcTransport>) -> Self {
        Self { transport }
    }

    pub async fn get_var(&self, base: &str, key: &str) -> Result<Option<String>> {
        let v = self
            .transport
            .invoke(base, calls::GET_VAR, vec![key.into()])
            .await?;
        Ok(v.as_str().map(str::to_string))
    }

    pub async fn set_var(&self, base: &str, key: &str, value: &str) -> Result<()> {
        self.transport
            .invoke(base, calls::SET_VAR, vec![key.into(), value.into()])
            .await?;
        Ok(())
    }

    /// Opens a Mimei object and returns the node-local handle used by
    /// the hash/sorted-set operations.
    pub async fn mm_open(&self, base: &str, mid: &MimeiId, writable: bool) -> Result<i64> {
        let v = self
            .transport
            .invoke(
                base,
                calls::MM_OPEN,
                vec![mid.as_str().into(), writable.into()],
            )
            .await?;
        v.as_i64()
            .with_context(|| format!("mmopen {mid}: non-numeric handle"))
    }

    pub async fn mm_create(&self, base: &str, name: &str) -> Result<MimeiId> {
        let v = self
            .transport
            .invoke(base, calls::MM_CREATE, vec![name.into()])
            .await?;
        let s = v
            .as_str()
            .with_context(|| format!("mmcreate {name}: non-string id"))?;
        Ok(MimeiId::parse(s)?)
    }

    pub async fn mm_backup(&self, base: &str, mid: &MimeiId) -> Result<()> {
        self.transport
            .invoke(base, calls::MM_BACKUP, vec![mid.as_str().into()])
            .await?;
        Ok(())
    }

    pub async fn hget(&self, base: &str, handle: i64, field: &str) -> Result<Option<Value>> {
        let v = self
            .transport
            .invoke(base, calls::H_GET, vec![handle.into(), field.into()])
            .await?;
        Ok(if v.is_null() { None } else { Some(v) })
    }

    pub async fn hset(&self, base: &str, handle: i64, field: &str, value: Value) -> Result<()> {
        self.transport
            .invoke(base, calls::H_SET, vec![handle.into(), field.into(), value])
            .await?;
        Ok(())
    }

    pub async fn hdel(&self, base: &str, handle: i64, field: &str) -> Result<()> {
        self.transport
            .invoke(base, calls::H_DEL, vec![handle.into(), field.into()])
            .await?;
        Ok(())
    }

    pub async fn zadd(
        &self,
        base: &str,
        handle: i64,
        key: &str,
        member: &str,
        score: i64,
    ) -> Result<()> {
        self.transport
            .invoke(
                base,
                calls::Z_ADD,
                vec![handle.into(), key.into(), member.into(), score.into()],
            )
            .await?;
        Ok(())
    }

    /// Reverse range with scores, highest score first.
    pub async fn zrevrange(
        &self,
        base: &str,
        handle: i64,
        key: &str,
        start: i64,
        stop: i64,
    ) -> Result<Vec<ScoredEntry>> {
        let v = self
            .transport
            .invoke(
                base,
                calls::Z_REV_RANGE,
                vec![handle.into(), key.into(), start.into(), stop.into()],
            )
            .await?;
        let items = v
            .as_array()
            .with_context(|| format!("zrevrange {key}: non-array result"))?;
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            out.push(ScoredEntry::from_value(item)?);
        }
        Ok(out)
    }

    pub async fn upload_chunk(
        &self,
        base: &str,
        temp_handle: &str,
        offset: u64,
        chunk: &[u8],
    ) -> Result<()> {
        self.transport
            .invoke(
                base,
                calls::UPLOAD_CHUNK,
                vec![
                    temp_handle.into(),
                    offset.into(),
                    B64.encode(chunk).into(),
                ],
            )
            .await?;
        Ok(())
    }

    /// Seals a temp file into content-addressed storage and returns
    /// the assigned id.
    pub async fn temp_to_mimei(&self, base: &str, temp_handle: &str) -> Result<MimeiId> {
        let v = self
            .transport
            .invoke(base, calls::TEMP_TO_MIMEI, vec![temp_handle.into()])
            .await?;
        let s = v
            .as_str()
            .context("tmp2mimei: non-string id")?;
        Ok(MimeiId::parse(s)?)
    }
}
