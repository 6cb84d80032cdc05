// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Simulated Progress
//!
//! The sort call is a single blocking request with no server-reported
//! progress. To keep the user company while it runs, a ticker task walks
//! through a shuffled list of status lines, advancing the bar on a fixed
//! interval. **Everything here is cosmetic** and carries no information
//! about the actual request.
//!
//! ## Behaviour
//!
//! - Each tick advances by `90 / messages.len()` percent, never past 90
//! - The ticker stops on its own once every message has been shown
//! - The owning workflow cancels it through a [`CancellationToken`] as soon
//!   as the real request settles, whatever the outcome

use std::sync::Arc;
use std::time::Duration;

use rand::seq::SliceRandom;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::models::ProgressState;

/// Highest percentage the ticker will ever report.
pub const SIMULATED_CEILING: f32 = 90.0;

pub const STARTED_MESSAGE: &str = "Sorting Started! Please stay on this page!";
pub const COMPLETE_MESSAGE: &str = "Sorting complete! File downloaded.";
pub const FAILED_MESSAGE: &str = "Something went wrong during sorting 😵‍💫";

pub const STATUS_MESSAGES: [&str; 20] = [
    "Uploading CSV to NASA mainframe...",
    "Negotiating with the data overlords...",
    "Distributing energy crystals...",
    "Converting personalities to vectors...",
    "Tuning the vibe algorithm 🔮...",
    "Summoning social chemistry gods...",
    "Balancing chaos & friendship...",
    "Measuring introvert–extrovert force fields...",
    "Hacking Hogwarts Sorting Hat...",
    "Analyzing vibe clusters...",
    "Assembling friend-shaped families...",
    "Spinning up cosmic compatibility checks...",
    "Waiting for the stars to align...",
    "Consulting personality horoscopes...",
    "Rearranging vibes like LEGO bricks...",
    "Defragmenting human souls...",
    "Inferring social gravitation wells...",
    "Compiling new friend ecosystems...",
    "Adjusting resonance frequencies...",
    "Reconstructing friendships from pixels...",
];

/// Status lines in a fresh random order.
pub fn shuffled_messages() -> Vec<&'static str> {
    let mut messages = STATUS_MESSAGES.to_vec();
    messages.shuffle(&mut rand::thread_rng());
    messages
}

/// Background task that steps the progress bar until cancelled.
pub struct ProgressTicker {
    progress: Arc<watch::Sender<ProgressState>>,
    messages: Vec<&'static str>,
    interval: Duration,
}

impl ProgressTicker {
    pub fn new(
        progress: Arc<watch::Sender<ProgressState>>,
        messages: Vec<&'static str>,
        interval: Duration,
    ) -> Self {
        Self {
            progress,
            messages,
            interval,
        }
    }

    /// Percentage added per tick.
    pub fn increment(&self) -> f32 {
        if self.messages.is_empty() {
            0.0
        } else {
            SIMULATED_CEILING / self.messages.len() as f32
        }
    }

    /// Spawn the ticker; it exits when `cancel` fires or messages run out.
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(cancel))
    }

    async fn run(self, cancel: CancellationToken) {
        let increment = self.increment();
        let mut percent = 0.0_f32;

        for message in &self.messages {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!("Progress ticker cancelled");
                    return;
                }
                _ = tokio::time::sleep(self.interval) => {}
            }

            if percent >= SIMULATED_CEILING {
                break;
            }
            percent = (percent + increment).min(SIMULATED_CEILING);
            self.progress
                .send_replace(ProgressState::new(percent, *message));
        }

        debug!("Progress ticker exhausted its messages");
    }
}
