//! Postcondition checks over a script transcript
//!
//! Each check reads observations recorded under a label and fails with a
//! message naming what was expected and what was seen.

use ragcheck_common::{keyword_match, FileStatus};

use crate::error::{E2eError, E2eResult};
use crate::protocol::Transcript;

fn require<T>(value: Option<T>, what: &str) -> E2eResult<T> {
    value.ok_or_else(|| E2eError::MissingObservation(what.to_string()))
}

/// Count under `after` equals count under `before` plus `delta`
pub fn row_delta(transcript: &Transcript, before: &str, after: &str, delta: i64) -> E2eResult<()> {
    let before_count = require(transcript.count(before), before)? as i64;
    let after_count = require(transcript.count(after), after)? as i64;
    if after_count - before_count != delta {
        return Err(E2eError::assertion(format!(
            "expected row count {} ({} {:+}), found {}",
            before_count + delta,
            before_count,
            delta,
            after_count
        )));
    }
    Ok(())
}

/// Count under `after` exceeds count under `before` by at least `min`
pub fn count_grew(transcript: &Transcript, before: &str, after: &str, min: usize) -> E2eResult<()> {
    let before_count = require(transcript.count(before), before)?;
    let after_count = require(transcript.count(after), after)?;
    if after_count < before_count + min {
        return Err(E2eError::assertion(format!(
            "expected at least {} new element(s) after {} (had {}), found {}",
            min, before, before_count, after_count
        )));
    }
    Ok(())
}

pub fn visible(transcript: &Transcript, label: &str) -> E2eResult<()> {
    match require(transcript.visible(label), label)? {
        true => Ok(()),
        false => Err(E2eError::assertion(format!("{} never became visible", label))),
    }
}

/// Badge text under `label` reads `expected`
pub fn status_is(transcript: &Transcript, label: &str, expected: FileStatus) -> E2eResult<FileStatus> {
    let text = require(transcript.text(label), label)?;
    match FileStatus::from_badge(text) {
        Some(status) if status == expected => Ok(status),
        Some(status) => Err(E2eError::assertion(format!(
            "{}: expected status {}, found {}",
            label, expected, status
        ))),
        None => Err(E2eError::assertion(format!(
            "{}: badge text '{}' carries no known status",
            label, text
        ))),
    }
}

/// Statuses read in order never move backwards
pub fn status_progression(transcript: &Transcript, labels: &[&str]) -> E2eResult<()> {
    let mut previous: Option<FileStatus> = None;
    for label in labels {
        let text = require(transcript.text(label), label)?;
        let status = FileStatus::from_badge(text).ok_or_else(|| {
            E2eError::assertion(format!("{}: badge text '{}' carries no known status", label, text))
        })?;
        if let Some(prev) = previous {
            if !FileStatus::can_transition(prev, status) {
                return Err(E2eError::assertion(format!(
                    "status regressed from {} to {} at {}",
                    prev, status, label
                )));
            }
        }
        previous = Some(status);
    }
    Ok(())
}

/// Correlated backend response under `key` returned 200
pub fn response_ok(transcript: &Transcript, key: &str) -> E2eResult<()> {
    let (status, url) = require(transcript.response(key), &format!("response:{}", key))?;
    if status != 200 {
        return Err(E2eError::assertion(format!(
            "backend {} answered {} (expected 200)",
            url, status
        )));
    }
    Ok(())
}

pub fn enabled_is(transcript: &Transcript, label: &str, expected: bool) -> E2eResult<()> {
    let enabled = require(transcript.enabled(label), label)?;
    if enabled != expected {
        return Err(E2eError::assertion(format!(
            "{}: expected {}, found {}",
            label,
            if expected { "enabled" } else { "disabled" },
            if enabled { "enabled" } else { "disabled" }
        )));
    }
    Ok(())
}

/// Answer text under `label` contains one of `keywords`; returns the match
pub fn answer_matches(transcript: &Transcript, label: &str, keywords: &[String]) -> E2eResult<String> {
    let text = require(transcript.text(label), label)?;
    keyword_match(text, keywords)
        .map(str::to_string)
        .ok_or_else(|| {
            E2eError::assertion(format!(
                "Expected one of {} in bot answer; got: {}",
                keywords.join(", "),
                text.to_lowercase()
            ))
        })
}

/// At least one non-empty WebSocket frame arrived no later than `label`
/// first became visible
pub fn stream_precedes(transcript: &Transcript, label: &str) -> E2eResult<()> {
    let visible_at = require(transcript.first_visible_at(label), label)?;
    if transcript.sockets().next().is_none() {
        return Err(E2eError::assertion("no WebSocket connection was opened"));
    }
    let frames_before = transcript
        .frames()
        .filter(|f| f.len > 0 && f.t <= visible_at)
        .count();
    if frames_before == 0 {
        return Err(E2eError::assertion(format!(
            "Expected to receive WebSocket frames before {} rendered (at {} ms)",
            label, visible_at
        )));
    }
    Ok(())
}
