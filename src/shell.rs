// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Navigation between the landing, sorting and about views.
//!
//! While a submission is in flight the nav links are reported as disabled.
//! This is advisory: nothing stops an actual navigation, and leaving the
//! page does not cancel the running submission.

use serde::Serialize;
use tokio::sync::watch;
use utoipa::ToSchema;

use crate::workflow::WorkflowPhase;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    Landing,
    Sort,
    About,
}

impl Route {
    pub const ALL: [Route; 3] = [Route::Landing, Route::Sort, Route::About];

    pub fn path(self) -> &'static str {
        match self {
            Route::Landing => "/",
            Route::Sort => "/sorting",
            Route::About => "/about",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Route::Landing => "Home",
            Route::Sort => "Sort",
            Route::About => "About",
        }
    }

    pub fn link_id(self) -> &'static str {
        match self {
            Route::Landing => "nav-landing",
            Route::Sort => "nav-sort",
            Route::About => "nav-about",
        }
    }

    /// Whether the view sits behind the access gate.
    pub fn is_protected(self) -> bool {
        matches!(self, Route::Sort)
    }

    pub fn from_path(path: &str) -> Option<Route> {
        let trimmed = path.trim_end_matches('/');
        Route::ALL
            .into_iter()
            .find(|route| route.path().trim_end_matches('/') == trimmed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct NavLink {
    pub id: String,
    pub label: String,
    pub path: String,
    pub enabled: bool,
}

/// Nav bar state derived from the workflow phase.
#[derive(Debug, Clone)]
pub struct NavigationShell {
    phase: watch::Receiver<WorkflowPhase>,
}

impl NavigationShell {
    pub fn new(phase: watch::Receiver<WorkflowPhase>) -> Self {
        Self { phase }
    }

    pub fn links_enabled(&self) -> bool {
        !self.phase.borrow().is_in_flight()
    }

    pub fn links(&self) -> Vec<NavLink> {
        let enabled = self.links_enabled();
        Route::ALL
            .into_iter()
            .map(|route| NavLink {
                id: route.link_id().to_string(),
                label: route.label().to_string(),
                path: route.path().to_string(),
                enabled,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_map_to_paths_and_back() {
        for route in Route::ALL {
            assert_eq!(Route::from_path(route.path()), Some(route));
        }
        assert_eq!(Route::from_path("/sorting/"), Some(Route::Sort));
        assert_eq!(Route::from_path("/missing"), None);
    }

    #[test]
    fn only_sorting_is_protected() {
        assert!(Route::Sort.is_protected());
        assert!(!Route::Landing.is_protected());
        assert!(!Route::About.is_protected());
    }

    #[test]
    fn links_follow_workflow_phase() {
        let (tx, rx) = watch::channel(WorkflowPhase::Idle);
        let shell = NavigationShell::new(rx);

        let links = shell.links();
        assert_eq!(
            links.iter().map(|l| l.id.as_str()).collect::<Vec<_>>(),
            vec!["nav-landing", "nav-sort", "nav-about"]
        );
        assert!(links.iter().all(|l| l.enabled));

        tx.send_replace(WorkflowPhase::Uploading);
        assert!(shell.links().iter().all(|l| !l.enabled));

        tx.send_replace(WorkflowPhase::Validating);
        assert!(!shell.links_enabled());

        tx.send_replace(WorkflowPhase::Idle);
        assert!(shell.links_enabled());
    }
}
