//! Reusable interaction helpers
//!
//! Multi-step UI gestures (upload, process, ask) composed into an action
//! list so scenario bodies stay declarative.

use ragcheck_common::{FileStatus, Role, SuiteConfig};
use ragcheck_common::fixtures::FileFixture;

use crate::error::{E2eError, E2eResult};
use crate::script::{absolute, Action, Method};

/// Label the row count is recorded under before an interaction
pub const ROWS_BEFORE: &str = "rows_before";
/// Label the row count is recorded under after an interaction settles
pub const ROWS_AFTER: &str = "rows_after";
/// Label the bot bubble count is recorded under before asking
pub const BOTS_BEFORE: &str = "bots_before";

/// Label the bot bubble count is recorded under once `label`'s answer rendered
pub fn answer_count_label(label: &str) -> String {
    format!("{}_count", label)
}

pub struct Interaction<'a> {
    config: &'a SuiteConfig,
    actions: Vec<Action>,
}

impl<'a> Interaction<'a> {
    pub fn new(config: &'a SuiteConfig) -> Self {
        Self {
            config,
            actions: Vec::new(),
        }
    }

    fn push(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    pub fn navigate_home(self) -> Self {
        self.push(Action::Navigate { path: "/".to_string() })
    }

    pub fn count_rows(self, label: &str) -> Self {
        self.push(Action::Count {
            role: Role::FileRow,
            label: label.to_string(),
        })
    }

    /// Wait for the row count to reach `base + delta` and record it
    pub fn expect_rows(self, base: &str, delta: i64, label: &str, timeout_ms: u64) -> Self {
        self.push(Action::AwaitCount {
            role: Role::FileRow,
            base: base.to_string(),
            delta,
            label: label.to_string(),
            timeout_ms,
        })
    }

    /// Attach files to the upload input. Fails before any browser work when
    /// a file is missing locally.
    pub fn input_files(self, files: &[FileFixture]) -> E2eResult<Self> {
        if let Some(missing) = files.iter().find(|f| !f.exists()) {
            return Err(E2eError::FileNotFound {
                path: missing.path.clone(),
            });
        }
        let paths = files
            .iter()
            .map(|f| absolute(&f.path))
            .collect::<E2eResult<Vec<_>>>()?;
        Ok(self.push(Action::AttachFiles { paths }))
    }

    pub fn click_submit(self) -> Self {
        self.push(Action::Click {
            role: Role::SubmitButton,
            optional: false,
        })
    }

    /// Click submit if it becomes clickable; rejected uploads may keep it disabled
    pub fn try_click_submit(self) -> Self {
        self.push(Action::Click {
            role: Role::SubmitButton,
            optional: true,
        })
    }

    pub fn wait_for_upload(self, name: &str, timeout_ms: u64) -> Self {
        self.push(Action::WaitForRow {
            name: name.to_string(),
            timeout_ms,
        })
    }

    /// Register a backend response listener. Call before the triggering action.
    pub fn expect_backend_response(self, key: &str, path: &str, method: Method) -> Self {
        if !self.config.correlate_responses {
            return self;
        }
        let timeout_ms = self.config.timeouts.expect_ms;
        self.push(Action::ExpectResponse {
            key: key.to_string(),
            path: path.to_string(),
            method,
            timeout_ms,
        })
    }

    pub fn await_backend_response(self, key: &str) -> Self {
        if !self.config.correlate_responses {
            return self;
        }
        self.push(Action::AwaitResponse { key: key.to_string() })
    }

    pub fn read_status(self, name: &str, label: &str) -> Self {
        self.push(Action::ReadStatus {
            name: name.to_string(),
            label: label.to_string(),
        })
    }

    pub fn wait_for_status(self, name: &str, status: FileStatus) -> Self {
        let timeout_ms = self.config.timeouts.expect_ms;
        self.push(Action::WaitForStatus {
            name: name.to_string(),
            status,
            timeout_ms,
        })
    }

    pub fn process_row(self, name: &str) -> Self {
        self.push(Action::ClickRowControl {
            name: name.to_string(),
            control: Role::ProcessButton,
        })
    }

    pub fn delete_row(self, name: &str) -> Self {
        self.push(Action::ClickRowControl {
            name: name.to_string(),
            control: Role::DeleteButton,
        })
    }

    pub fn wait_for_progress_to_clear(self, timeout_ms: u64) -> Self {
        self.push(Action::WaitHidden {
            role: Role::UploadProgress,
            timeout_ms,
        })
    }

    pub fn wait_visible(self, role: Role, label: &str) -> Self {
        let timeout_ms = self.config.timeouts.expect_ms;
        self.push(Action::WaitVisible {
            role,
            label: label.to_string(),
            timeout_ms,
        })
    }

    pub fn check_visible(self, role: Role, label: &str, timeout_ms: u64) -> Self {
        self.push(Action::CheckVisible {
            role,
            label: label.to_string(),
            timeout_ms,
        })
    }

    pub fn type_question(self, text: &str) -> Self {
        self.push(Action::Fill {
            role: Role::ChatTextarea,
            text: text.to_string(),
        })
    }

    /// Record whether the ask button is enabled once it reaches `expect`
    pub fn read_ask_enabled(self, label: &str, expect: bool) -> Self {
        self.push(Action::ReadEnabled {
            role: Role::AskButton,
            label: label.to_string(),
            expect: Some(expect),
        })
    }

    pub fn click_ask(self) -> Self {
        self.push(Action::Click {
            role: Role::AskButton,
            optional: false,
        })
    }

    pub fn count_bot_messages(self, label: &str) -> Self {
        self.push(Action::Count {
            role: Role::BotBubble,
            label: label.to_string(),
        })
    }

    /// Type a question and submit it
    pub fn ask(self, question: &str) -> Self {
        self.type_question(question).click_ask()
    }

    /// Start timing the bot bubble beyond the count under `base`. Call
    /// before asking; [`Self::wait_for_bot_answer`] resolves it.
    pub fn expect_bot_answer(self, base: &str, label: &str) -> Self {
        let timeout_ms = self.config.timeouts.bot_answer_ms;
        self.push(Action::WatchNewVisible {
            role: Role::BotBubble,
            base: base.to_string(),
            label: label.to_string(),
            timeout_ms,
        })
    }

    /// Record when the new bot bubble rendered under `label`, then the bubble
    /// count under [`answer_count_label`]
    pub fn wait_for_bot_answer(self, label: &str) -> Self {
        self.push(Action::AwaitNewVisible {
            label: label.to_string(),
        })
        .push(Action::Count {
            role: Role::BotBubble,
            label: answer_count_label(label),
        })
    }

    /// Record the first bot answer beyond the count under `base` once its
    /// text stops changing
    pub fn read_bot_answer(self, base: &str, label: &str) -> Self {
        let timeout_ms = self.config.timeouts.bot_answer_ms;
        self.push(Action::ReadText {
            role: Role::BotBubble,
            label: label.to_string(),
            after: Some(base.to_string()),
            settle_timeout_ms: Some(timeout_ms),
        })
    }

    /// Report WebSocket activity. Call before the action that opens the stream.
    pub fn watch_streams(self) -> Self {
        self.push(Action::WatchWebSockets)
    }

    pub fn pause(self, ms: u64) -> Self {
        self.push(Action::Pause { ms })
    }

    pub fn clear_storage(self) -> Self {
        self.push(Action::ClearStorage)
    }

    pub fn finish(self) -> Vec<Action> {
        self.actions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragcheck_common::fixtures::{FileFixtures, FixtureKind};
    use std::path::PathBuf;

    #[test]
    fn test_missing_file_fails_locally() {
        let config = SuiteConfig::default();
        let fixture = FileFixture {
            name: "ghost.pdf".into(),
            path: PathBuf::from("/nonexistent/ghost.pdf"),
            kind: FixtureKind::Unsupported,
        };
        let err = Interaction::new(&config).input_files(&[fixture]).err().unwrap();
        let message = err.to_string();
        assert!(message.contains("not found"));
        assert!(message.contains("/nonexistent/ghost.pdf"));
    }

    #[test]
    fn test_upload_sequence() {
        let config = SuiteConfig::default();
        let fixtures = FileFixtures::new(concat!(env!("CARGO_MANIFEST_DIR"), "/resources"));
        let actions = Interaction::new(&config)
            .navigate_home()
            .count_rows(ROWS_BEFORE)
            .input_files(&[fixtures.default_file()])
            .unwrap()
            .click_submit()
            .finish();

        assert_eq!(actions.len(), 4);
        assert!(matches!(&actions[2], Action::AttachFiles { paths } if paths.len() == 1));
    }

    #[test]
    fn test_correlation_can_be_disabled() {
        let config = SuiteConfig {
            correlate_responses: false,
            ..Default::default()
        };
        let actions = Interaction::new(&config)
            .expect_backend_response("process", "/documents/process", Method::Post)
            .await_backend_response("process")
            .finish();
        assert!(actions.is_empty());
    }

    #[test]
    fn test_bot_answer_waits_for_new_bubble() {
        let config = SuiteConfig::default();
        let actions = Interaction::new(&config)
            .count_bot_messages(BOTS_BEFORE)
            .expect_bot_answer(BOTS_BEFORE, "bot")
            .ask("Hello?")
            .wait_for_bot_answer("bot")
            .read_bot_answer(BOTS_BEFORE, "answer")
            .finish();
        assert!(matches!(
            &actions[1],
            Action::WatchNewVisible { base, timeout_ms: 60_000, .. } if base == BOTS_BEFORE
        ));
        assert!(matches!(&actions[3], Action::Click { role: Role::AskButton, .. }));
        assert!(matches!(&actions[4], Action::AwaitNewVisible { label } if label == "bot"));
        assert!(matches!(&actions[5], Action::Count { label, .. } if label == "bot_count"));
        assert!(matches!(
            &actions[6],
            Action::ReadText { after: Some(base), .. } if base == BOTS_BEFORE
        ));
    }
}
