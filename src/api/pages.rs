// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Server-rendered views: landing, sorting (behind the key gate) and about.

use axum::{
    extract::{Multipart, State},
    response::{Html, IntoResponse, Response},
    Form,
};

use crate::{
    api::sort::{apply_upload_form, csv_attachment, read_upload_form, run_submission},
    gate::GateState,
    models::SubmitKeyRequest,
    shell::NavigationShell,
    state::AppState,
    workflow::WorkflowStatus,
};

const GATE_DESCRIPTION: &str = "This page is protected. Please enter your access key to proceed. \
     Each key is tied to device usage and may expire after set limits.";
const COMMENTS_PLACEHOLDER: &str = "e.g., Try to group based on music taste and personality. \
     Split large friend groups if possible.";

/// Escape text for HTML element and attribute content.
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn nav_bar(shell: &NavigationShell) -> String {
    let mut items = String::new();
    for link in shell.links() {
        let attrs = if link.enabled {
            String::new()
        } else {
            r#" aria-disabled="true" style="pointer-events: none; opacity: 0.5""#.to_string()
        };
        items.push_str(&format!(
            r#"<li><a href="{}" id="{}"{}>{}</a></li>"#,
            link.path, link.id, attrs, link.label
        ));
    }
    format!(r#"<nav id="navbar"><ul id="nav-links">{items}</ul></nav>"#)
}

fn layout(shell: &NavigationShell, title: &str, body: &str) -> Html<String> {
    Html(format!(
        "<!DOCTYPE html>\n<html lang=\"en\"><head><meta charset=\"utf-8\">\
         <title>{}</title></head><body>{}{}</body></html>",
        escape(title),
        nav_bar(shell),
        body
    ))
}

pub async fn landing(State(state): State<AppState>) -> Html<String> {
    let body = r#"<main class="landing-wrapper">
<section class="hero-section"><h1 class="section-title">Family Sorting App</h1>
<p class="hero-subtitle">The GPT-powered social sorting tool your retreat never knew it needed.</p></section>
<section><h2 class="section-title">What This App Does</h2>
<p class="section-text">Upload your CSV of members, add optional grouping instructions,
and this app will form social groups based on form responses, shared values and stated preferences.</p></section>
<section><h2 class="section-title">Terms of Use</h2><ul class="tos-list">
<li>Do not share access keys without permission.</li>
<li>Usage is tracked (e.g., time, IP, file size) for moderation and billing.</li>
<li>Unauthorized abuse may result in revoked access.</li>
</ul></section></main>"#;
    layout(&state.shell, "Family Sorting App", body)
}

pub async fn about(State(state): State<AppState>) -> Html<String> {
    let body = r#"<main id="about-page"><h1>About</h1>
<p>Family Sorting groups retreat members into families. Sorting itself runs on a
remote service; this client handles access keys, uploads and downloads.</p></main>"#;
    layout(&state.shell, "About", body)
}

fn gate_modal(message: Option<&str>) -> String {
    let error = message
        .map(|m| format!(r#"<div id="key-error" style="color: #f88">{}</div>"#, escape(m)))
        .unwrap_or_default();
    format!(
        r#"<div id="blur-overlay"><div id="access-modal">
<p id="modal-description">{GATE_DESCRIPTION}</p>
<form method="post" action="/sorting/key">
<input id="key-input" type="text" name="key" placeholder="Enter your access key here...">
<button id="key-submit" type="submit">Submit Key</button>
</form>{error}</div></div>"#
    )
}

fn sort_form(status: &WorkflowStatus, error: Option<&str>) -> String {
    let disabled = if status.phase.is_in_flight() {
        r#" disabled style="opacity: 0.6; cursor: not-allowed""#
    } else {
        ""
    };
    let warning = status
        .warning
        .as_deref()
        .map(|w| format!(r#"<div id="soft-warning">{}</div>"#, escape(w)))
        .unwrap_or_default();
    let error = error
        .map(|e| format!(r#"<div id="submit-error">{}</div>"#, escape(e)))
        .unwrap_or_default();
    let selected = status
        .selected_file
        .as_deref()
        .map(|f| format!(r#"<span id="selected-file">{}</span>"#, escape(f)))
        .unwrap_or_default();
    let download = if status.download_available {
        r#"<a id="download-link" href="/v1/sort/download">Download sorted_families.csv</a>"#
    } else {
        ""
    };

    format!(
        r#"<div id="content-wrapper"><h1 id="main-title">Family Sorting Application</h1>
<form method="post" action="/sorting/submit" enctype="multipart/form-data">
<textarea id="text-input" name="comments" placeholder="{placeholder}"{disabled}>{comments}</textarea>
<div id="file-upload-section"><label for="csv-upload" id="upload-label">Upload CSV File:</label>
<input type="file" id="csv-upload" name="file" accept=".csv"{disabled}>{selected}</div>
<button id="submit-button" type="submit"{disabled}>Submit for Sorting</button>
</form>{warning}{error}
<div id="progress-container"><div id="progress-bar" style="width: {percent}%">
<span id="progress-text">{message}</span></div></div>{download}</div>"#,
        placeholder = escape(COMMENTS_PLACEHOLDER),
        comments = escape(&status.comments),
        percent = status.progress.percent,
        message = escape(&status.progress.message),
    )
}

async fn render_sorting(state: &AppState, submit_error: Option<&str>) -> Html<String> {
    let body = match state.gate.state().await {
        // Nothing is shown while the stored key is being checked.
        GateState::Checking => String::new(),
        GateState::Denied { message } => gate_modal(message.as_deref()),
        GateState::Granted { .. } => sort_form(&state.workflow.status().await, submit_error),
    };
    layout(
        &state.shell,
        "Family Sorting",
        &format!(r#"<main id="app-container">{body}</main>"#),
    )
}

pub async fn sorting(State(state): State<AppState>) -> Html<String> {
    render_sorting(&state, None).await
}

/// Key entry from the gate modal.
pub async fn sorting_key(
    State(state): State<AppState>,
    Form(request): Form<SubmitKeyRequest>,
) -> Html<String> {
    // Failures are rendered from the gate's Denied message.
    let _ = state.gate.submit_key(&request.key).await;
    render_sorting(&state, None).await
}

/// Form submission: apply the fields, run the sort, answer with the file.
pub async fn sorting_submit(State(state): State<AppState>, multipart: Multipart) -> Response {
    if !state.gate.is_granted().await {
        return render_sorting(&state, None).await.into_response();
    }

    let outcome = async {
        let form = read_upload_form(multipart).await?;
        apply_upload_form(&state, form).await?;
        run_submission(&state).await
    }
    .await;

    match outcome {
        Ok(sorted) => csv_attachment(sorted),
        Err(e) => render_sorting(&state, Some(&e.message))
            .await
            .into_response(),
    }
}
