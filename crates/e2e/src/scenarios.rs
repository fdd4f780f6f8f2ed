//! Scenario catalog
//!
//! Every scenario is a precondition plus action sequence (its plan) and a
//! set of postconditions checked against the transcript (its verification).

use std::path::Path;
use std::time::Duration;
use tracing::info;

use ragcheck_common::fixtures::generate_large_file;
use ragcheck_common::{Browser, FileFixtures, FileStatus, QuestionSet, Role, SuiteConfig};

use crate::assertions;
use crate::error::{E2eError, E2eResult};
use crate::helpers::{answer_count_label, Interaction, BOTS_BEFORE, ROWS_AFTER, ROWS_BEFORE};
use crate::protocol::Transcript;
use crate::script::{row_label, Action, Method};

const UPLOAD_KEY: &str = "upload";
const DELETE_KEY: &str = "delete";
const PROCESS_KEY: &str = "process";

const BOT_ANSWER: &str = "bot";
const ERROR_INDICATOR: &str = "error_indicator";

const MISSING_FILE: &str = "does-not-exist.pdf";
const READINESS_QUESTION: &str = "Hello, are you ready?";
const STREAM_QUESTION: &str = "Provide a short summary of the uploaded document.";

/// What a scenario needs at plan and verify time
pub struct ScenarioContext<'a> {
    pub config: &'a SuiteConfig,
    pub fixtures: FileFixtures,
    pub questions: &'a QuestionSet,
    pub browser: Browser,
}

impl<'a> ScenarioContext<'a> {
    pub fn new(config: &'a SuiteConfig, questions: &'a QuestionSet, browser: Browser) -> Self {
        Self {
            config,
            fixtures: FileFixtures::new(&config.resources_dir),
            questions,
            browser,
        }
    }
}

/// Outcome of planning
#[derive(Debug)]
pub enum Plan {
    /// Run these actions in a browser, then verify
    Browser(Vec<Action>),
    /// Scenario resolved without a browser
    Settled(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioKind {
    UploadSingle,
    UploadDefaultStatus,
    UploadMultiple,
    UploadOneByOne,
    UploadFormats,
    DeleteUploaded,
    ProcessUploaded,
    UploadLarge,
    ChatReadiness,
    EmptyQuestion,
    RagQuestion(usize),
    UnsupportedFile,
    MissingFile,
    Streaming,
}

#[derive(Debug, Clone)]
pub struct Scenario {
    pub name: String,
    pub description: String,
    pub tags: Vec<&'static str>,
    pub kind: ScenarioKind,
    pub skip_on: Vec<Browser>,
}

impl Scenario {
    fn new(name: &str, description: &str, tags: &[&'static str], kind: ScenarioKind) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            tags: tags.to_vec(),
            kind,
            skip_on: Vec::new(),
        }
    }

    fn skipping(mut self, browser: Browser) -> Self {
        self.skip_on.push(browser);
        self
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| *t == tag)
    }

    pub fn skips(&self, browser: Browser) -> bool {
        self.skip_on.contains(&browser)
    }

    /// Whole-scenario budget
    pub fn timeout(&self, config: &SuiteConfig) -> Duration {
        match self.kind {
            ScenarioKind::UploadLarge => {
                Duration::from_millis(config.timeouts.test_ms + config.timeouts.large_upload_row_ms)
            }
            _ => config.timeouts.test(),
        }
    }

    /// Work done once before planning, off the async executor
    pub async fn prepare(&self, ctx: &ScenarioContext<'_>) -> E2eResult<()> {
        if self.kind == ScenarioKind::UploadLarge {
            let dir = ctx.config.generated_dir();
            tokio::task::spawn_blocking(move || {
                generate_large_file(&dir, FileFixtures::LARGE_FILE, FileFixtures::LARGE_FILE_MB)
            })
            .await
            .map_err(|e| E2eError::Io(std::io::Error::new(std::io::ErrorKind::Other, e.to_string())))??;
        }
        Ok(())
    }

    pub fn plan(&self, ctx: &ScenarioContext<'_>) -> E2eResult<Plan> {
        let config = ctx.config;
        let timeouts = &config.timeouts;
        let endpoints = &config.endpoints;
        let start = || Interaction::new(config).navigate_home();

        let actions = match self.kind {
            ScenarioKind::UploadSingle => {
                let file = ctx.fixtures.default_file();
                start()
                    .count_rows(ROWS_BEFORE)
                    .input_files(std::slice::from_ref(&file))?
                    .expect_backend_response(UPLOAD_KEY, &endpoints.upload_status, Method::Get)
                    .click_submit()
                    .expect_rows(ROWS_BEFORE, 1, ROWS_AFTER, timeouts.expect_ms)
                    .wait_for_upload(&file.name, timeouts.upload_row_ms)
                    .await_backend_response(UPLOAD_KEY)
                    .finish()
            }
            ScenarioKind::UploadDefaultStatus => {
                let file = ctx.fixtures.default_file();
                start()
                    .input_files(std::slice::from_ref(&file))?
                    .click_submit()
                    .wait_for_upload(&file.name, timeouts.upload_row_ms)
                    .read_status(&file.name, "status")
                    .finish()
            }
            ScenarioKind::UploadMultiple | ScenarioKind::UploadFormats => {
                let files = if self.kind == ScenarioKind::UploadMultiple {
                    ctx.fixtures.multi_variety()
                } else {
                    ctx.fixtures.multi_format()
                };
                let mut flow = start()
                    .count_rows(ROWS_BEFORE)
                    .input_files(&files)?
                    .click_submit()
                    .expect_rows(ROWS_BEFORE, files.len() as i64, ROWS_AFTER, timeouts.expect_ms);
                for file in &files {
                    flow = flow.wait_for_upload(&file.name, timeouts.upload_row_ms);
                }
                flow.finish()
            }
            ScenarioKind::UploadOneByOne => {
                let files = ctx.fixtures.multi_variety();
                let mut flow = start().count_rows(ROWS_BEFORE);
                for file in &files {
                    flow = flow
                        .input_files(std::slice::from_ref(file))?
                        .click_submit()
                        .wait_for_upload(&file.name, timeouts.upload_row_ms);
                }
                flow.expect_rows(ROWS_BEFORE, files.len() as i64, ROWS_AFTER, timeouts.expect_ms)
                    .finish()
            }
            ScenarioKind::DeleteUploaded => {
                let file = ctx.fixtures.default_file();
                start()
                    .count_rows(ROWS_BEFORE)
                    .input_files(std::slice::from_ref(&file))?
                    .click_submit()
                    .wait_for_upload(&file.name, timeouts.upload_row_ms)
                    .expect_rows(ROWS_BEFORE, 1, "rows_uploaded", timeouts.expect_ms)
                    .expect_backend_response(DELETE_KEY, &endpoints.delete, Method::Delete)
                    .delete_row(&file.name)
                    .expect_rows(ROWS_BEFORE, 0, ROWS_AFTER, timeouts.expect_ms)
                    .await_backend_response(DELETE_KEY)
                    .finish()
            }
            ScenarioKind::ProcessUploaded => {
                let file = ctx.fixtures.default_file();
                start()
                    .input_files(std::slice::from_ref(&file))?
                    .click_submit()
                    .wait_for_upload(&file.name, timeouts.upload_row_ms)
                    .read_status(&file.name, "status_before")
                    .expect_backend_response(PROCESS_KEY, &endpoints.process, Method::Post)
                    .process_row(&file.name)
                    .wait_for_status(&file.name, FileStatus::Processed)
                    .read_status(&file.name, "status_after")
                    .pause(1_000)
                    .read_status(&file.name, "status_settled")
                    .await_backend_response(PROCESS_KEY)
                    .finish()
            }
            ScenarioKind::UploadLarge => {
                let file = ctx.fixtures.large(&config.generated_dir())?;
                start()
                    .count_rows(ROWS_BEFORE)
                    .input_files(std::slice::from_ref(&file))?
                    .click_submit()
                    .expect_rows(ROWS_BEFORE, 1, ROWS_AFTER, timeouts.expect_ms)
                    .wait_for_progress_to_clear(timeouts.large_upload_row_ms)
                    .wait_for_upload(&file.name, timeouts.large_upload_row_ms)
                    .finish()
            }
            ScenarioKind::ChatReadiness => start()
                .wait_visible(Role::ChatTextarea, "textarea")
                .wait_visible(Role::AskButton, "ask")
                .read_ask_enabled("ask_empty", false)
                .count_bot_messages(BOTS_BEFORE)
                .type_question(READINESS_QUESTION)
                .read_ask_enabled("ask_filled", true)
                .expect_bot_answer(BOTS_BEFORE, BOT_ANSWER)
                .click_ask()
                .wait_for_bot_answer(BOT_ANSWER)
                .finish(),
            ScenarioKind::EmptyQuestion => start()
                .wait_visible(Role::AskButton, "ask")
                .read_ask_enabled("ask_initial", false)
                .type_question("a")
                .read_ask_enabled("ask_typed", true)
                .type_question("")
                .read_ask_enabled("ask_cleared", false)
                .finish(),
            ScenarioKind::RagQuestion(index) => {
                let question = self.question(ctx, index)?;
                start()
                    .count_bot_messages(BOTS_BEFORE)
                    .expect_bot_answer(BOTS_BEFORE, BOT_ANSWER)
                    .ask(&question.text)
                    .wait_visible(Role::ChatMessages, "messages")
                    .wait_for_bot_answer(BOT_ANSWER)
                    .read_bot_answer(BOTS_BEFORE, "answer")
                    .finish()
            }
            ScenarioKind::UnsupportedFile => {
                let file = ctx.fixtures.unsupported();
                if !file.exists() {
                    return settle_local_rejection(Interaction::new(config).input_files(&[file]));
                }
                start()
                    .count_rows(ROWS_BEFORE)
                    .input_files(std::slice::from_ref(&file))?
                    .try_click_submit()
                    .check_visible(Role::ErrorIndicator, ERROR_INDICATOR, timeouts.error_indicator_ms)
                    .pause(1_000)
                    .count_rows(ROWS_AFTER)
                    .finish()
            }
            ScenarioKind::MissingFile => {
                let file = ragcheck_common::FileFixture {
                    name: MISSING_FILE.to_string(),
                    path: ctx.fixtures.resources_dir().join(MISSING_FILE),
                    kind: ragcheck_common::FixtureKind::Unsupported,
                };
                return settle_local_rejection(Interaction::new(config).input_files(&[file]));
            }
            ScenarioKind::Streaming => start()
                .watch_streams()
                .count_bot_messages(BOTS_BEFORE)
                .expect_bot_answer(BOTS_BEFORE, BOT_ANSWER)
                .ask(STREAM_QUESTION)
                .wait_for_bot_answer(BOT_ANSWER)
                .finish(),
        };

        Ok(Plan::Browser(actions))
    }

    pub fn verify(&self, ctx: &ScenarioContext<'_>, transcript: &Transcript) -> E2eResult<()> {
        let correlate = ctx.config.correlate_responses;

        match self.kind {
            ScenarioKind::UploadSingle => {
                let file = ctx.fixtures.default_file();
                assertions::row_delta(transcript, ROWS_BEFORE, ROWS_AFTER, 1)?;
                assertions::visible(transcript, &row_label(&file.name))?;
                if correlate {
                    assertions::response_ok(transcript, UPLOAD_KEY)?;
                }
            }
            ScenarioKind::UploadDefaultStatus => {
                assertions::status_is(transcript, "status", FileStatus::Unprocessed)?;
            }
            ScenarioKind::UploadMultiple | ScenarioKind::UploadOneByOne | ScenarioKind::UploadFormats => {
                let files = if self.kind == ScenarioKind::UploadFormats {
                    ctx.fixtures.multi_format()
                } else {
                    ctx.fixtures.multi_variety()
                };
                assertions::row_delta(transcript, ROWS_BEFORE, ROWS_AFTER, files.len() as i64)?;
                for file in &files {
                    assertions::visible(transcript, &row_label(&file.name))?;
                }
            }
            ScenarioKind::DeleteUploaded => {
                assertions::row_delta(transcript, ROWS_BEFORE, "rows_uploaded", 1)?;
                assertions::row_delta(transcript, ROWS_BEFORE, ROWS_AFTER, 0)?;
                if correlate {
                    assertions::response_ok(transcript, DELETE_KEY)?;
                }
            }
            ScenarioKind::ProcessUploaded => {
                assertions::status_is(transcript, "status_before", FileStatus::Unprocessed)?;
                assertions::status_is(transcript, "status_after", FileStatus::Processed)?;
                assertions::status_is(transcript, "status_settled", FileStatus::Processed)?;
                assertions::status_progression(
                    transcript,
                    &["status_before", "status_after", "status_settled"],
                )?;
                if correlate {
                    assertions::response_ok(transcript, PROCESS_KEY)?;
                }
            }
            ScenarioKind::UploadLarge => {
                assertions::row_delta(transcript, ROWS_BEFORE, ROWS_AFTER, 1)?;
                assertions::visible(transcript, &row_label(FileFixtures::LARGE_FILE))?;
            }
            ScenarioKind::ChatReadiness => {
                assertions::visible(transcript, "textarea")?;
                assertions::visible(transcript, "ask")?;
                assertions::enabled_is(transcript, "ask_empty", false)?;
                assertions::enabled_is(transcript, "ask_filled", true)?;
                self.new_answer(transcript)?;
            }
            ScenarioKind::EmptyQuestion => {
                assertions::enabled_is(transcript, "ask_initial", false)?;
                assertions::enabled_is(transcript, "ask_typed", true)?;
                assertions::enabled_is(transcript, "ask_cleared", false)?;
            }
            ScenarioKind::RagQuestion(index) => {
                let question = self.question(ctx, index)?;
                assertions::visible(transcript, "messages")?;
                self.new_answer(transcript)?;
                let matched = assertions::answer_matches(transcript, "answer", &question.keywords)?;
                info!("{}: answer matched keyword '{}'", self.name, matched);
            }
            ScenarioKind::UnsupportedFile => {
                assertions::row_delta(transcript, ROWS_BEFORE, ROWS_AFTER, 0)?;
                assertions::visible(transcript, ERROR_INDICATOR)?;
            }
            ScenarioKind::MissingFile => {}
            ScenarioKind::Streaming => {
                self.new_answer(transcript)?;
                assertions::stream_precedes(transcript, BOT_ANSWER)?;
            }
        }
        Ok(())
    }

    /// A bot bubble beyond the pre-ask count rendered
    fn new_answer(&self, transcript: &Transcript) -> E2eResult<()> {
        assertions::visible(transcript, BOT_ANSWER)?;
        assertions::count_grew(transcript, BOTS_BEFORE, &answer_count_label(BOT_ANSWER), 1)
    }

    fn question<'q>(&self, ctx: &'q ScenarioContext<'_>, index: usize) -> E2eResult<&'q ragcheck_common::Question> {
        ctx.questions
            .questions
            .get(index)
            .ok_or_else(|| E2eError::ScenarioNotFound(format!("{} (no question #{})", self.name, index + 1)))
    }
}

/// A local attach failure is the expected outcome; check it names the path
fn settle_local_rejection<T>(attempt: E2eResult<T>) -> E2eResult<Plan> {
    match attempt {
        Err(E2eError::FileNotFound { path }) => {
            let message = E2eError::FileNotFound { path: path.clone() }.to_string();
            check_not_found_message(&message, &path)?;
            Ok(Plan::Settled(message))
        }
        Err(other) => Err(other),
        Ok(_) => Err(E2eError::assertion("attaching a missing file unexpectedly succeeded")),
    }
}

fn check_not_found_message(message: &str, path: &Path) -> E2eResult<()> {
    let shown = path.display().to_string();
    if message.to_lowercase().contains("not found") && message.contains(&shown) {
        Ok(())
    } else {
        Err(E2eError::assertion(format!(
            "attach failure should say 'not found' and name {}, got: {}",
            shown, message
        )))
    }
}

/// Every scenario in the suite
pub fn catalog(questions: &QuestionSet) -> Vec<Scenario> {
    use ScenarioKind::*;

    let mut scenarios = vec![
        Scenario::new("upload-single-file", "Uploading a single file adds one row", &["upload", "smoke"], UploadSingle),
        Scenario::new("upload-default-status", "A fresh upload shows the Unprocessed status", &["upload"], UploadDefaultStatus),
        Scenario::new("upload-multiple-files", "Uploading several files at once", &["upload"], UploadMultiple),
        Scenario::new("upload-one-by-one", "Uploading several files one at a time", &["upload"], UploadOneByOne),
        Scenario::new("upload-multiple-formats", "Uploading txt, pdf, docx and png together", &["upload"], UploadFormats),
        Scenario::new("delete-uploaded-file", "Deleting an upload restores the row count", &["upload", "delete"], DeleteUploaded),
        Scenario::new("process-uploaded-file", "Processing moves a row to Processed", &["upload", "process"], ProcessUploaded),
        Scenario::new("upload-large-file", "Uploading a generated 60 MiB file", &["upload", "large"], UploadLarge),
        Scenario::new("chat-readiness", "Ask button enables after typing and yields an answer", &["chat", "smoke"], ChatReadiness),
        Scenario::new("empty-question-disabled", "Ask button stays disabled while the question is empty", &["chat", "errors"], EmptyQuestion),
    ];

    for (index, question) in questions.iter().enumerate() {
        scenarios.push(Scenario::new(
            &format!("rag-q{}", index + 1),
            &question.text,
            &["chat", "rag"],
            RagQuestion(index),
        ));
    }

    scenarios.push(
        Scenario::new("unsupported-file-type", "A disallowed file format adds no row", &["upload", "errors"], UnsupportedFile)
            .skipping(Browser::Webkit),
    );
    scenarios.push(Scenario::new("missing-file-path", "Attaching a missing file fails locally", &["errors"], MissingFile));
    scenarios.push(Scenario::new("websocket-stream", "Answers stream over a WebSocket before rendering", &["chat", "stream"], Streaming));

    scenarios
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Observation;
    use tempfile::TempDir;

    fn config() -> SuiteConfig {
        SuiteConfig {
            resources_dir: concat!(env!("CARGO_MANIFEST_DIR"), "/resources").into(),
            ..Default::default()
        }
    }

    fn find(name: &str, questions: &QuestionSet) -> Scenario {
        catalog(questions).into_iter().find(|s| s.name == name).unwrap()
    }

    #[test]
    fn test_catalog_names_unique() {
        let questions = QuestionSet::builtin().unwrap();
        let scenarios = catalog(&questions);
        let mut names: Vec<&str> = scenarios.iter().map(|s| s.name.as_str()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), scenarios.len());
        assert_eq!(scenarios.iter().filter(|s| s.has_tag("rag")).count(), 5);
    }

    #[test]
    fn test_unsupported_skips_webkit() {
        let questions = QuestionSet::builtin().unwrap();
        let scenario = find("unsupported-file-type", &questions);
        assert!(scenario.skips(Browser::Webkit));
        assert!(!scenario.skips(Browser::Chromium));
    }

    #[test]
    fn test_upload_registers_listener_before_submit() {
        let config = config();
        let questions = QuestionSet::builtin().unwrap();
        let ctx = ScenarioContext::new(&config, &questions, Browser::Chromium);
        let Plan::Browser(actions) = find("upload-single-file", &questions).plan(&ctx).unwrap() else {
            panic!("expected a browser plan");
        };

        let listen = actions
            .iter()
            .position(|a| matches!(a, Action::ExpectResponse { method: Method::Get, .. }))
            .unwrap();
        let submit = actions
            .iter()
            .position(|a| matches!(a, Action::Click { role: Role::SubmitButton, .. }))
            .unwrap();
        assert!(listen < submit);
    }

    #[test]
    fn test_stream_watch_precedes_ask() {
        let config = config();
        let questions = QuestionSet::builtin().unwrap();
        let ctx = ScenarioContext::new(&config, &questions, Browser::Chromium);
        let Plan::Browser(actions) = find("websocket-stream", &questions).plan(&ctx).unwrap() else {
            panic!("expected a browser plan");
        };
        let watch = actions.iter().position(|a| *a == Action::WatchWebSockets).unwrap();
        let ask = actions
            .iter()
            .position(|a| matches!(a, Action::Click { role: Role::AskButton, .. }))
            .unwrap();
        assert!(watch < ask);
    }

    #[test]
    fn test_missing_file_settles_locally() {
        let config = config();
        let questions = QuestionSet::builtin().unwrap();
        let ctx = ScenarioContext::new(&config, &questions, Browser::Firefox);
        match find("missing-file-path", &questions).plan(&ctx).unwrap() {
            Plan::Settled(message) => {
                assert!(message.contains("not found"));
                assert!(message.contains(MISSING_FILE));
            }
            Plan::Browser(_) => panic!("missing file must not reach the browser"),
        }
    }

    #[test]
    fn test_unsupported_branches_on_presence() {
        let questions = QuestionSet::builtin().unwrap();
        let scenario = find("unsupported-file-type", &questions);

        let present = config();
        let ctx = ScenarioContext::new(&present, &questions, Browser::Chromium);
        assert!(matches!(scenario.plan(&ctx).unwrap(), Plan::Browser(_)));

        let empty = TempDir::new().unwrap();
        let absent = SuiteConfig {
            resources_dir: empty.path().to_path_buf(),
            ..Default::default()
        };
        let ctx = ScenarioContext::new(&absent, &questions, Browser::Chromium);
        assert!(matches!(scenario.plan(&ctx).unwrap(), Plan::Settled(_)));
    }

    #[test]
    fn test_upload_fails_when_default_fixture_missing() {
        let empty = TempDir::new().unwrap();
        let config = SuiteConfig {
            resources_dir: empty.path().to_path_buf(),
            ..Default::default()
        };
        let questions = QuestionSet::builtin().unwrap();
        let ctx = ScenarioContext::new(&config, &questions, Browser::Chromium);
        let err = find("upload-single-file", &questions).plan(&ctx).unwrap_err();
        assert!(matches!(err, E2eError::FileNotFound { .. }));
    }

    #[test]
    fn test_verify_process_scenario() {
        let config = config();
        let questions = QuestionSet::builtin().unwrap();
        let ctx = ScenarioContext::new(&config, &questions, Browser::Chromium);
        let scenario = find("process-uploaded-file", &questions);

        let text = |label: &str, value: &str| Observation::Text { label: label.into(), value: value.into(), t: 0 };
        let transcript = Transcript::from_observations(vec![
            text("status_before", "Unprocessed"),
            text("status_after", "Processed"),
            text("status_settled", "Processed"),
            Observation::Response {
                key: PROCESS_KEY.into(),
                url: "http://localhost:8000/documents/process".into(),
                method: "POST".into(),
                status: 200,
                t: 5,
            },
        ]);
        assert!(scenario.verify(&ctx, &transcript).is_ok());

        let regressed = Transcript::from_observations(vec![
            text("status_before", "Unprocessed"),
            text("status_after", "Processed"),
            text("status_settled", "Unprocessed"),
        ]);
        assert!(scenario.verify(&ctx, &regressed).is_err());
    }

    #[test]
    fn test_verify_rag_question() {
        let config = config();
        let questions = QuestionSet::builtin().unwrap();
        let ctx = ScenarioContext::new(&config, &questions, Browser::Chromium);
        let scenario = find("rag-q3", &questions);

        let answered = |bubbles_after: usize| {
            Transcript::from_observations(vec![
                Observation::Count { label: BOTS_BEFORE.into(), value: 1, t: 0 },
                Observation::Visible { label: "messages".into(), visible: true, t: 1 },
                Observation::Visible { label: BOT_ANSWER.into(), visible: true, t: 2 },
                Observation::Count { label: "bot_count".into(), value: bubbles_after, t: 2 },
                Observation::Text {
                    label: "answer".into(),
                    value: "It addresses the Challenge of grounding answers.".into(),
                    t: 3,
                },
            ])
        };
        assert!(scenario.verify(&ctx, &answered(2)).is_ok());

        // An earlier answer on the page does not count as a reply
        assert!(scenario.verify(&ctx, &answered(1)).is_err());
    }

    #[test]
    fn test_large_scenario_gets_extended_budget() {
        let config = SuiteConfig::default();
        let questions = QuestionSet::builtin().unwrap();
        let scenario = find("upload-large-file", &questions);
        assert!(scenario.timeout(&config) > Duration::from_millis(config.timeouts.large_upload_row_ms));
    }
}
