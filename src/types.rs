use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// CSS selector for the elements the environment treats as clickable.
pub const INTERACTABLE_SELECTOR: &str = "button";

/// Max characters of element text kept in an interactable summary.
pub const ELEMENT_TEXT_MAX_CHARS: usize = 80;

/// Owned description of one interactable element, taken from the latest query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementSummary {
    pub index: usize,
    pub tag: String,
    pub text: String,
}

/// Console log entries gathered since the previous fetch, bucketed by severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogCounts {
    pub severe: u64,
    pub warning: u64,
    pub info: u64,
}

/// Console severity buckets used for scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Severe,
    Warning,
    Info,
}

/// How a click on an interactable ended. Session faults are not an outcome;
/// drivers report those as errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    Clicked,
    /// The element could not be clicked (obscured, detached, gone, ...).
    Failed(String),
}

impl LogCounts {
    pub fn record(&mut self, severity: Severity) {
        match severity {
            Severity::Severe => self.severe += 1,
            Severity::Warning => self.warning += 1,
            Severity::Info => self.info += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.severe + self.warning + self.info
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// What the agent sees after `reset` or `step`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    /// Tracked keyword -> number of page elements whose text contains it.
    pub keywords: BTreeMap<String, u64>,
    pub interactables: u64,
    pub actions_since_interaction: u64,
}

/// Auxiliary data returned next to an observation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Info {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interactables: Option<Vec<ElementSummary>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection: Option<usize>,
    /// Set when the episode was truncated, explaining why.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub truncated: Option<String>,
}

impl Info {
    pub fn at(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }
}

/// Result of a single `step`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transition<O, I> {
    pub observation: O,
    pub reward: i64,
    pub terminated: bool,
    pub truncated: bool,
    pub info: I,
}

impl<O, I> Transition<O, I> {
    pub fn is_done(&self) -> bool {
        self.terminated || self.truncated
    }
}
