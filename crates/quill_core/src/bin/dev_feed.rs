/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - QUILL Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use quill_core::graph::LoginOutcome;
use quill_core::session::{Session, SessionConfig};
use std::env;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init();

    let mut args = env::args().skip(1);
    let base_url = args.next().unwrap_or_default();
    let app_id = args.next().unwrap_or_default();
    let phrase = args.next().unwrap_or_default();
    let hours: i64 = args.next().and_then(|s| s.parse().ok()).unwrap_or(24);
    if base_url.is_empty() || app_id.is_empty() || phrase.is_empty() {
        anyhow::bail!("usage: dev_feed <base_url> <app_id> <key_phrase> [window_hours]");
    }

    let session = Session::new(SessionConfig {
        base_url,
        app_id,
        key_phrase: Some(phrase),
        ..SessionConfig::default()
    })?;

    let viewer = match session.login().await {
        LoginOutcome::Success(user) => user,
        LoginOutcome::Failure(reason) => anyhow::bail!("login failed: {reason}"),
    };

    let now = now_ms();
    let launched = session
        .feed
        .refresh(&viewer, now, Some(now - hours * 3600 * 1000))
        .await?;
    eprintln!("fetched from {launched} followed accounts");

    for tweet in session.feed.snapshot() {
        let when = OffsetDateTime::from_unix_timestamp(tweet.timestamp / 1000)
            .unwrap_or(OffsetDateTime::UNIX_EPOCH)
            .format(&Rfc3339)
            .unwrap_or_default();
        let author = tweet
            .author
            .as_ref()
            .and_then(|u| u.username.clone())
            .unwrap_or_else(|| tweet.author_id.to_string());
        let body = tweet.content.as_deref().unwrap_or("(retweet)");
        println!("{when} <{author}> {body}");
    }
    Ok(())
}
