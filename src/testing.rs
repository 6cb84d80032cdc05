// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Test doubles shared by the unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use tokio::sync::Notify;
use url::Url;

use crate::models::{SubmissionPayload, ValidationResult};
use crate::sorter::{SortClient, SortError};
use crate::verifier::{KeyVerifier, VerifierError};

type KeyCall = (String, Option<String>);

/// Serve `router` on a loopback port and return its base URL.
pub async fn spawn_stub_server(router: Router) -> Url {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind loopback listener");
    let addr = listener.local_addr().expect("listener address");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("stub server");
    });
    Url::parse(&format!("http://{addr}")).expect("stub URL")
}

/// Scripted [`KeyVerifier`] that records every call.
///
/// Unscripted calls answer with a transport error. When built with
/// [`FakeVerifier::gated`] each call is recorded, then waits for
/// [`FakeVerifier::release`] before answering.
#[derive(Default)]
pub struct FakeVerifier {
    validate_results: Mutex<VecDeque<Result<ValidationResult, VerifierError>>>,
    verify_results: Mutex<VecDeque<Result<ValidationResult, VerifierError>>>,
    validate_calls: Mutex<Vec<KeyCall>>,
    verify_calls: Mutex<Vec<KeyCall>>,
    gate: Option<Notify>,
}

impl FakeVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gated() -> Self {
        Self {
            gate: Some(Notify::new()),
            ..Self::default()
        }
    }

    /// Let one waiting (or the next) call answer.
    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.notify_one();
        }
    }

    async fn wait_for_release(&self) {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
    }

    pub fn push_validate(&self, result: Result<ValidationResult, VerifierError>) {
        self.validate_results.lock().unwrap().push_back(result);
    }

    pub fn push_verify(&self, result: Result<ValidationResult, VerifierError>) {
        self.verify_results.lock().unwrap().push_back(result);
    }

    pub fn validate_calls(&self) -> Vec<KeyCall> {
        self.validate_calls.lock().unwrap().clone()
    }

    pub fn verify_calls(&self) -> Vec<KeyCall> {
        self.verify_calls.lock().unwrap().clone()
    }
}

fn unscripted() -> Result<ValidationResult, VerifierError> {
    Err(VerifierError::Request("no scripted response".to_string()))
}

#[async_trait]
impl KeyVerifier for FakeVerifier {
    async fn validate(
        &self,
        key: &str,
        device_id: Option<&str>,
    ) -> Result<ValidationResult, VerifierError> {
        self.validate_calls
            .lock()
            .unwrap()
            .push((key.to_string(), device_id.map(str::to_string)));
        self.wait_for_release().await;
        self.validate_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(unscripted)
    }

    async fn verify(
        &self,
        key: &str,
        device_id: Option<&str>,
    ) -> Result<ValidationResult, VerifierError> {
        self.verify_calls
            .lock()
            .unwrap()
            .push((key.to_string(), device_id.map(str::to_string)));
        self.wait_for_release().await;
        self.verify_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(unscripted)
    }
}

/// Scripted [`SortClient`].
///
/// When built with [`FakeSortClient::gated`] every call waits for
/// [`FakeSortClient::release`] before answering, which lets tests observe
/// the workflow while the upload is in flight.
#[derive(Default)]
pub struct FakeSortClient {
    results: Mutex<VecDeque<Result<Vec<u8>, SortError>>>,
    calls: Mutex<Vec<SubmissionPayload>>,
    gate: Option<Notify>,
    delay: Option<Duration>,
}

impl FakeSortClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gated() -> Self {
        Self {
            gate: Some(Notify::new()),
            ..Self::default()
        }
    }

    pub fn delayed(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn push(&self, result: Result<Vec<u8>, SortError>) {
        self.results.lock().unwrap().push_back(result);
    }

    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.notify_one();
        }
    }

    pub fn calls(&self) -> Vec<SubmissionPayload> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SortClient for FakeSortClient {
    async fn sort(&self, payload: SubmissionPayload) -> Result<Vec<u8>, SortError> {
        self.calls.lock().unwrap().push(payload);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(SortError::Request("no scripted response".to_string())))
    }
}
