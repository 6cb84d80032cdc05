// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Family Sort Client - access-gated front end for the family sorting API
//!
//! This crate serves a small web UI and JSON API that keep the sorting
//! workflow behind an access key, then forward CSV uploads and grouping
//! instructions to the remote sorting service.
//!
//! ## Modules
//!
//! - `api` - HTTP handlers and server-rendered pages (Axum)
//! - `credentials` - Persisted access key and device id
//! - `gate` - Access gate state machine
//! - `workflow` - CSV submission lifecycle and simulated progress
//! - `verifier` / `sorter` - Remote API clients (reqwest)

pub mod api;
pub mod config;
pub mod credentials;
pub mod error;
pub mod gate;
pub mod logging;
pub mod models;
pub mod progress;
pub mod shell;
pub mod sorter;
pub mod state;
pub mod verifier;
pub mod workflow;

#[cfg(test)]
mod testing;
