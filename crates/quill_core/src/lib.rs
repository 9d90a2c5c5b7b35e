/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - QUILL Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use std::ffi::{c_char, CString};

pub mod chat;
pub mod directory;
pub mod entry;
pub mod feed;
mod ffi;
pub mod graph;
pub mod http_retry;
pub mod media;
pub mod net_metrics;
pub mod rpc;
pub mod runtime;
pub mod session;
pub mod settings;
pub mod tweets;
pub mod ui_events;

#[cfg(test)]
pub(crate) mod testutil;

#[no_mangle]
pub extern "C" fn quill_core_version() -> *mut c_char {
    CString::new(env!("CARGO_PKG_VERSION"))
        .expect("version is valid CString")
        .into_raw()
}

#[no_mangle]
pub extern "C" fn quill_core_string_free(ptr: *mut c_char) {
    if ptr.is_null() {
        return;
    }
    unsafe {
        drop(CString::from_raw(ptr));
    }
}
