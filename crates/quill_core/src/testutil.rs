/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - QUILL Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use crate::entry::EntryTransport;
use crate::rpc::RpcTransport;
use anyhow::Result;
use async_trait::async_trait;
use quill_protocol::{MimeiId, Tweet, User};
use serde_json::Value;
use std::sync::Mutex;

pub fn mid(c: char) -> MimeiId {
    MimeiId::parse(&c.to_string().repeat(27)).unwrap()
}

pub fn user(c: char, base: impl Into<String>) -> User {
    User::new(mid(c), base)
}

pub fn tweet(id: Option<char>, author: char, ts: i64) -> Tweet {
    let mut t = Tweet::new(mid(author), Some(format!("tweet-{author}-{ts}")), ts);
    t.mid = id.map(mid);
    t
}

pub fn tweet_value(t: &Tweet) -> Value {
    serde_json::to_value(t).unwrap()
}

pub fn user_value(u: &User) -> Value {
    serde_json::to_value(u).unwrap()
}

pub fn param<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

/// Scripted entry endpoint: the handler maps (base, method, params)
/// to a response; every call is logged for assertions.
pub struct FakeEntry {
    pub log: Mutex<Vec<(String, String, Vec<(String, String)>)>>,
    handler: Box<dyn Fn(&str, &str, &[(String, String)]) -> Result<Value> + Send + Sync>,
}

impl FakeEntry {
    pub fn new(
        handler: impl Fn(&str, &str, &[(String, String)]) -> Result<Value> + Send + Sync + 'static,
    ) -> Self {
        Self {
            log: Mutex::new(Vec::new()),
            handler: Box::new(handler),
        }
    }

    pub fn calls(&self, method: &str) -> usize {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, m, _)| m == method)
            .count()
    }
}

#[async_trait]
impl EntryTransport for FakeEntry {
    async fn entry(
        &self,
        base_url: &str,
        method: &str,
        params: &[(String, String)],
        _retry: bool,
    ) -> Result<Value> {
        self.log.lock().unwrap().push((
            base_url.to_string(),
            method.to_string(),
            params.to_vec(),
        ));
        (self.handler)(base_url, method, params)
    }
}

/// Scripted RPC peer, same shape as [`FakeEntry`].
pub struct FakeRpc {
    pub log: Mutex<Vec<(String, String, Vec<Value>)>>,
    handler: Box<dyn Fn(&str, &str, &[Value]) -> Result<Value> + Send + Sync>,
}

impl FakeRpc {
    pub fn new(
        handler: impl Fn(&str, &str, &[Value]) -> Result<Value> + Send + Sync + 'static,
    ) -> Self {
        Self {
            log: Mutex::new(Vec::new()),
            handler: Box::new(handler),
        }
    }

    pub fn calls(&self, call: &str) -> usize {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, c, _)| c == call)
            .count()
    }
}

#[async_trait]
impl RpcTransport for FakeRpc {
    async fn invoke(&self, base_url: &str, call: &str, args: Vec<Value>) -> Result<Value> {
        self.log
            .lock()
            .unwrap()
            .push((base_url.to_string(), call.to_string(), args.clone()));
        (self.handler)(base_url, call, &args)
    }
}
