/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - QUILL Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use quill_core::graph::LoginOutcome;
use quill_core::session::{Session, SessionConfig};
use std::env;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init();

    let mut args = env::args().skip(1);
    let base_url = args.next().unwrap_or_default();
    let app_id = args.next().unwrap_or_default();
    let phrase = args.next().unwrap_or_default();
    if base_url.is_empty() || app_id.is_empty() || phrase.is_empty() {
        anyhow::bail!("usage: dev_login <base_url> <app_id> <key_phrase>");
    }

    let session = Session::new(SessionConfig {
        base_url,
        app_id,
        key_phrase: Some(phrase),
        ..SessionConfig::default()
    })?;

    match session.login().await {
        LoginOutcome::Success(user) => {
            println!("mid={}", user.mid);
            println!("node={}", user.base_url);
            if let Some(name) = user.username.as_deref() {
                println!("username={name}");
            }
            println!("followings={}", user.following_count);
        }
        LoginOutcome::Failure(reason) => {
            println!("login failed: {reason}");
        }
    }
    Ok(())
}
