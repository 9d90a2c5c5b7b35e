/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - QUILL Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use crate::graph::LoginOutcome;
use crate::session::{Session, SessionConfig};
use anyhow::{Context, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::thread;
use tokio::sync::watch;
use tracing::{error, info, warn};

static HANDLE_SEQ: AtomicU64 = AtomicU64::new(1);

/// Backfill window for the first feed refresh after login.
const INITIAL_FEED_WINDOW_MS: i64 = 7 * 24 * 3600 * 1000;

struct RunningSession {
    shutdown_tx: watch::Sender<bool>,
    join: Option<thread::JoinHandle<()>>,
}

static REGISTRY: Mutex<Vec<(u64, RunningSession)>> = Mutex::new(Vec::new());

fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

/// Starts a client session on its own runtime thread and returns a
/// handle for [`stop`]. Called once by the UI shell at startup.
pub fn start(cfg: SessionConfig) -> Result<u64> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("info".parse().unwrap()),
        )
        .try_init()
        .ok();

    let handle = HANDLE_SEQ.fetch_add(1, Ordering::Relaxed);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let join = thread::spawn(move || {
        if let Err(e) = run_session(cfg, shutdown_rx) {
            error!("session runtime failed: {e:#}");
        }
    });

    let mut reg = REGISTRY.lock().unwrap();
    reg.push((
        handle,
        RunningSession {
            shutdown_tx,
            join: Some(join),
        },
    ));

    Ok(handle)
}

pub fn stop(handle: u64) -> Result<()> {
    let running = {
        let mut reg = REGISTRY.lock().unwrap();
        let idx = reg
            .iter()
            .position(|(h, _)| *h == handle)
            .context("invalid handle")?;
        let (_, mut running) = reg.swap_remove(idx);
        let _ = running.shutdown_tx.send(true);
        // Join in background to avoid blocking the UI thread.
        running.join.take()
    };

    if let Some(j) = running {
        thread::spawn(move || {
            let _ = j.join();
        });
    }
    Ok(())
}

fn run_session(cfg: SessionConfig, mut shutdown_rx: watch::Receiver<bool>) -> Result<()> {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("build tokio runtime")?;

    rt.block_on(async move {
        let session = Session::new(cfg)?;
        match session.login().await {
            LoginOutcome::Success(viewer) => {
                info!("session up for {}", viewer.mid);
                let now = now_ms();
                session
                    .feed
                    .spawn_refresh(viewer, now, Some(now - INITIAL_FEED_WINDOW_MS));
            }
            LoginOutcome::Failure(reason) => {
                // Surfaced to the login screen; the session stays up
                // so the user can retry with another phrase.
                warn!("login failed: {reason}");
            }
        }

        let _ = shutdown_rx.changed().await;
        info!("session shutting down");
        Ok(())
    })
}
