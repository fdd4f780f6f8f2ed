//! Observation protocol between generated scripts and the runner
//!
//! A script prints one JSON object per line on stdout. Every object carries
//! an `event` tag and `t`, milliseconds since the script started.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Trace,
    Screenshot,
    Video,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Observation {
    Step {
        index: usize,
        name: String,
        t: u64,
    },
    Count {
        label: String,
        value: usize,
        t: u64,
    },
    Visible {
        label: String,
        visible: bool,
        t: u64,
    },
    Enabled {
        label: String,
        enabled: bool,
        t: u64,
    },
    Text {
        label: String,
        value: String,
        t: u64,
    },
    Response {
        key: String,
        url: String,
        method: String,
        status: u16,
        t: u64,
    },
    WsOpen {
        url: String,
        t: u64,
    },
    WsFrame {
        url: String,
        len: usize,
        t: u64,
    },
    Artifact {
        kind: ArtifactKind,
        path: PathBuf,
        t: u64,
    },
    Failure {
        #[serde(default)]
        step: Option<usize>,
        message: String,
        t: u64,
    },
    Done {
        t: u64,
    },
}

impl Observation {
    pub fn t(&self) -> u64 {
        match self {
            Observation::Step { t, .. }
            | Observation::Count { t, .. }
            | Observation::Visible { t, .. }
            | Observation::Enabled { t, .. }
            | Observation::Text { t, .. }
            | Observation::Response { t, .. }
            | Observation::WsOpen { t, .. }
            | Observation::WsFrame { t, .. }
            | Observation::Artifact { t, .. }
            | Observation::Failure { t, .. }
            | Observation::Done { t } => *t,
        }
    }
}

/// A streaming frame seen on a page WebSocket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame<'a> {
    pub url: &'a str,
    pub len: usize,
    pub t: u64,
}

/// Everything a script reported, in order
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    observations: Vec<Observation>,
    stderr: String,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_observations(observations: Vec<Observation>) -> Self {
        Self {
            observations,
            stderr: String::new(),
        }
    }

    /// Feed one stdout line. Lines that are not observations are ignored.
    pub fn push_line(&mut self, line: &str) -> Option<&Observation> {
        let trimmed = line.trim();
        if !trimmed.starts_with('{') {
            if !trimmed.is_empty() {
                debug!("[script] {}", trimmed);
            }
            return None;
        }
        match serde_json::from_str::<Observation>(trimmed) {
            Ok(observation) => {
                self.observations.push(observation);
                self.observations.last()
            }
            Err(e) => {
                debug!("Unparsed script line ({}): {}", e, trimmed);
                None
            }
        }
    }

    pub fn push(&mut self, observation: Observation) {
        self.observations.push(observation);
    }

    pub fn set_stderr(&mut self, stderr: String) {
        self.stderr = stderr;
    }

    pub fn stderr(&self) -> &str {
        &self.stderr
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn completed(&self) -> bool {
        self.observations
            .iter()
            .any(|o| matches!(o, Observation::Done { .. }))
    }

    pub fn failure(&self) -> Option<&str> {
        self.observations.iter().find_map(|o| match o {
            Observation::Failure { message, .. } => Some(message.as_str()),
            _ => None,
        })
    }

    /// Last count recorded under `label`
    pub fn count(&self, label: &str) -> Option<usize> {
        self.observations.iter().rev().find_map(|o| match o {
            Observation::Count { label: l, value, .. } if l == label => Some(*value),
            _ => None,
        })
    }

    pub fn text(&self, label: &str) -> Option<&str> {
        self.observations.iter().rev().find_map(|o| match o {
            Observation::Text { label: l, value, .. } if l == label => Some(value.as_str()),
            _ => None,
        })
    }

    pub fn enabled(&self, label: &str) -> Option<bool> {
        self.observations.iter().rev().find_map(|o| match o {
            Observation::Enabled { label: l, enabled, .. } if l == label => Some(*enabled),
            _ => None,
        })
    }

    pub fn visible(&self, label: &str) -> Option<bool> {
        self.observations.iter().rev().find_map(|o| match o {
            Observation::Visible { label: l, visible, .. } if l == label => Some(*visible),
            _ => None,
        })
    }

    /// Time `label` was first reported visible
    pub fn first_visible_at(&self, label: &str) -> Option<u64> {
        self.observations.iter().find_map(|o| match o {
            Observation::Visible { label: l, visible: true, t } if l == label => Some(*t),
            _ => None,
        })
    }

    /// Status code of the correlated response registered under `key`
    pub fn response(&self, key: &str) -> Option<(u16, &str)> {
        self.observations.iter().find_map(|o| match o {
            Observation::Response { key: k, status, url, .. } if k == key => {
                Some((*status, url.as_str()))
            }
            _ => None,
        })
    }

    pub fn sockets(&self) -> impl Iterator<Item = &str> {
        self.observations.iter().filter_map(|o| match o {
            Observation::WsOpen { url, .. } => Some(url.as_str()),
            _ => None,
        })
    }

    pub fn frames(&self) -> impl Iterator<Item = Frame<'_>> {
        self.observations.iter().filter_map(|o| match o {
            Observation::WsFrame { url, len, t } => Some(Frame {
                url: url.as_str(),
                len: *len,
                t: *t,
            }),
            _ => None,
        })
    }

    pub fn artifacts(&self) -> impl Iterator<Item = (ArtifactKind, &PathBuf)> {
        self.observations.iter().filter_map(|o| match o {
            Observation::Artifact { kind, path, .. } => Some((*kind, path)),
            _ => None,
        })
    }
}
