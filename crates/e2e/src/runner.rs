//! Suite runner: waits for the application, fans scenarios out over browsers
//! and workers, retries failures and records results

use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use ragcheck_common::{Browser, QuestionSet, SuiteConfig};

use crate::artifacts::{ArtifactRecord, ArtifactStore};
use crate::driver::PlaywrightDriver;
use crate::error::{E2eError, E2eResult};
use crate::helpers::Interaction;
use crate::health::HealthCheck;
use crate::protocol::Transcript;
use crate::scenarios::{catalog, Plan, Scenario, ScenarioContext};
use crate::script::ScriptBuilder;

/// Result of one scenario on one browser
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub name: String,
    pub browser: Browser,
    pub success: bool,
    pub skipped: bool,
    pub attempts: u32,
    pub duration_ms: u64,
    pub error: Option<String>,
    pub artifacts: Vec<ArtifactRecord>,
}

impl ScenarioResult {
    fn skipped(name: &str, browser: Browser) -> Self {
        Self {
            name: name.to_string(),
            browser,
            success: true,
            skipped: true,
            attempts: 0,
            duration_ms: 0,
            error: None,
            artifacts: Vec::new(),
        }
    }
}

/// Result of the whole run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteResult {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration_ms: u64,
    pub results: Vec<ScenarioResult>,
}

impl SuiteResult {
    pub fn success(&self) -> bool {
        self.failed == 0
    }
}

/// Which scenarios to run
#[derive(Debug, Clone, Default)]
pub struct RunFilter {
    pub tag: Option<String>,
    pub name: Option<String>,
}

impl RunFilter {
    fn admits(&self, scenario: &Scenario) -> bool {
        let tag_ok = self.tag.as_deref().map_or(true, |t| scenario.has_tag(t));
        let name_ok = self.name.as_deref().map_or(true, |n| scenario.name == n);
        tag_ok && name_ok
    }
}

/// Main E2E test runner
pub struct TestRunner {
    config: SuiteConfig,
    questions: QuestionSet,
    node_path: Option<PathBuf>,
    store: ArtifactStore,
    /// How long to wait for the application before giving up
    ready_timeout: Duration,
}

impl TestRunner {
    pub fn new(config: SuiteConfig, questions: QuestionSet) -> Self {
        let store = ArtifactStore::new(config.artifacts_dir(), config.artifacts.clone());
        let ready_timeout = Duration::from_millis(config.timeouts.navigation_ms);
        Self {
            config,
            questions,
            node_path: None,
            store,
            ready_timeout,
        }
    }

    pub fn with_node_path(mut self, node_path: Option<PathBuf>) -> Self {
        self.node_path = PlaywrightDriver::resolve_node_path(node_path);
        self
    }

    pub fn with_ready_timeout(mut self, timeout: Duration) -> Self {
        self.ready_timeout = timeout;
        self
    }

    pub fn config(&self) -> &SuiteConfig {
        &self.config
    }

    /// Scenarios admitted by `filter`
    pub fn list(&self, filter: &RunFilter) -> Vec<Scenario> {
        catalog(&self.questions)
            .into_iter()
            .filter(|s| filter.admits(s))
            .collect()
    }

    fn select(&self, filter: &RunFilter) -> E2eResult<Vec<Scenario>> {
        let selected = self.list(filter);
        if selected.is_empty() {
            if let Some(name) = &filter.name {
                return Err(E2eError::ScenarioNotFound(name.clone()));
            }
        }
        Ok(selected)
    }

    /// Run every admitted scenario on every configured browser
    pub async fn run(&self, filter: &RunFilter) -> E2eResult<SuiteResult> {
        let started_at = Utc::now();
        let start = Instant::now();
        let scenarios = self.select(filter)?;

        HealthCheck::new(&self.config.base_url)?
            .wait_until_reachable(self.ready_timeout)
            .await?;

        let driver = PlaywrightDriver::new(self.node_path.clone())?;
        self.store.clean()?;

        if let Some(first) = self.config.browsers.first() {
            for scenario in &scenarios {
                let ctx = ScenarioContext::new(&self.config, &self.questions, *first);
                scenario.prepare(&ctx).await?;
            }
        }

        let mut cases = Vec::new();
        for scenario in &scenarios {
            for browser in &self.config.browsers {
                cases.push((scenario, *browser));
            }
        }

        info!(
            "Running {} case(s) over {} browser(s) with {} worker(s)...",
            cases.len(),
            self.config.browsers.len(),
            self.config.workers
        );

        let results: Vec<ScenarioResult> = stream::iter(
            cases
                .into_iter()
                .map(|(scenario, browser)| self.run_case(&driver, scenario, browser)),
        )
        .buffered(self.config.workers)
        .collect()
        .await;

        self.teardown(&driver).await;

        let skipped = results.iter().filter(|r| r.skipped).count();
        let passed = results.iter().filter(|r| r.success && !r.skipped).count();
        let failed = results.iter().filter(|r| !r.success).count();
        let duration_ms = start.elapsed().as_millis() as u64;

        info!("");
        info!(
            "Test Results: {} passed, {} failed, {} skipped ({} ms)",
            passed, failed, skipped, duration_ms
        );

        Ok(SuiteResult {
            run_id: uuid::Uuid::new_v4().to_string(),
            started_at,
            total: results.len(),
            passed,
            failed,
            skipped,
            duration_ms,
            results,
        })
    }

    async fn run_case(&self, driver: &PlaywrightDriver, scenario: &Scenario, browser: Browser) -> ScenarioResult {
        if scenario.skips(browser) {
            info!("- {} [{}] skipped", scenario.name, browser);
            return ScenarioResult::skipped(&scenario.name, browser);
        }

        let start = Instant::now();
        let ctx = ScenarioContext::new(&self.config, &self.questions, browser);
        let mut attempts = 0;
        let mut artifacts = Vec::new();
        let mut last_error = None;

        while attempts <= self.config.retries {
            let attempt = attempts;
            attempts += 1;
            if attempt > 0 {
                warn!("Retrying {} [{}] (attempt {})", scenario.name, browser, attempts);
            }

            let (outcome, kept) = self.attempt(driver, scenario, &ctx, attempt).await;
            artifacts.extend(kept);
            match outcome {
                Ok(()) => {
                    last_error = None;
                    break;
                }
                Err(e @ E2eError::FileNotFound { .. }) | Err(e @ E2eError::Config(_)) => {
                    // Local problems do not improve on retry
                    last_error = Some(e.to_string());
                    break;
                }
                Err(e) => last_error = Some(e.to_string()),
            }
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        match &last_error {
            None => info!("✓ {} [{}] ({} ms)", scenario.name, browser, duration_ms),
            Some(e) => error!("✗ {} [{}] - {}", scenario.name, browser, e),
        }

        ScenarioResult {
            name: scenario.name.clone(),
            browser,
            success: last_error.is_none(),
            skipped: false,
            attempts,
            duration_ms,
            error: last_error,
            artifacts,
        }
    }

    async fn attempt(
        &self,
        driver: &PlaywrightDriver,
        scenario: &Scenario,
        ctx: &ScenarioContext<'_>,
        attempt: u32,
    ) -> (E2eResult<()>, Vec<ArtifactRecord>) {
        let actions = match scenario.plan(ctx) {
            Ok(Plan::Browser(actions)) => actions,
            Ok(Plan::Settled(note)) => {
                debug!("{} settled without a browser: {}", scenario.name, note);
                return (Ok(()), Vec::new());
            }
            Err(e) => return (Err(e), Vec::new()),
        };

        let dir = match self.store.attempt_dir(&scenario.name, ctx.browser, attempt) {
            Ok(dir) => dir,
            Err(e) => return (Err(e), Vec::new()),
        };
        let script = match ScriptBuilder::new(&self.config, ctx.browser, &dir) {
            Ok(builder) => builder.build(&actions),
            Err(e) => return (Err(e), Vec::new()),
        };

        let transcript = match driver.run(&script, scenario.timeout(&self.config)).await {
            Ok(transcript) => transcript,
            Err(e) => return (Err(e), Vec::new()),
        };

        let outcome = judge(scenario, ctx, &transcript);
        let kept = match self.store.settle(&transcript, &dir, outcome.is_err()) {
            Ok(kept) => kept,
            Err(e) => {
                warn!("Could not settle artifacts for {}: {}", scenario.name, e);
                Vec::new()
            }
        };
        (outcome, kept)
    }

    /// Clear client-side state once after every scenario has finished
    async fn teardown(&self, driver: &PlaywrightDriver) {
        let Some(browser) = self.config.browsers.first().copied() else {
            return;
        };
        let actions = Interaction::new(&self.config)
            .navigate_home()
            .clear_storage()
            .finish();

        let result = async {
            let dir = self.store.attempt_dir("teardown", browser, 0)?;
            let script = ScriptBuilder::new(&self.config, browser, &dir)?.build(&actions);
            let transcript = driver.run(&script, self.config.timeouts.test()).await?;
            self.store.settle(&transcript, &dir, false)?;
            match transcript.failure() {
                Some(message) => Err(E2eError::Playwright(message.to_string())),
                None => Ok(()),
            }
        }
        .await;

        match result {
            Ok(()) => debug!("Cleared browser storage"),
            Err(e) => warn!("Global teardown failed: {}", e),
        }
    }

    /// Write test results to JSON file
    pub fn write_results(&self, results: &SuiteResult) -> E2eResult<PathBuf> {
        std::fs::create_dir_all(&self.config.output_dir)?;

        let path = self.config.output_dir.join("test-results.json");
        let json = serde_json::to_string_pretty(results)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}

/// A script failure outranks postconditions; an incomplete script is a failure
fn judge(scenario: &Scenario, ctx: &ScenarioContext<'_>, transcript: &Transcript) -> E2eResult<()> {
    if let Some(message) = transcript.failure() {
        return Err(E2eError::StepFailed {
            step: scenario.name.clone(),
            reason: message.to_string(),
        });
    }
    if !transcript.completed() {
        return Err(E2eError::Playwright(format!(
            "{} ended without completing: {}",
            scenario.name,
            transcript.stderr().trim()
        )));
    }
    scenario.verify(ctx, transcript)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Observation;
    use tempfile::TempDir;

    fn runner(output: &TempDir) -> TestRunner {
        let config = SuiteConfig {
            output_dir: output.path().to_path_buf(),
            ..Default::default()
        };
        TestRunner::new(config, QuestionSet::builtin().unwrap())
    }

    #[test]
    fn test_filter_by_tag_and_name() {
        let tmp = TempDir::new().unwrap();
        let runner = runner(&tmp);

        let smoke = runner.list(&RunFilter { tag: Some("smoke".into()), name: None });
        assert!(smoke.iter().all(|s| s.has_tag("smoke")));
        assert!(!smoke.is_empty());

        let one = runner.list(&RunFilter { tag: None, name: Some("rag-q2".into()) });
        assert_eq!(one.len(), 1);
    }

    #[test]
    fn test_unknown_name_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let runner = runner(&tmp);
        let err = runner
            .select(&RunFilter { tag: None, name: Some("no-such-scenario".into()) })
            .unwrap_err();
        assert!(matches!(err, E2eError::ScenarioNotFound(_)));
    }

    #[test]
    fn test_write_results() {
        let tmp = TempDir::new().unwrap();
        let runner = runner(&tmp);
        let results = SuiteResult {
            run_id: "run".into(),
            started_at: Utc::now(),
            total: 1,
            passed: 0,
            failed: 0,
            skipped: 1,
            duration_ms: 0,
            results: vec![ScenarioResult::skipped("unsupported-file-type", Browser::Webkit)],
        };
        let path = runner.write_results(&results).unwrap();
        let written: SuiteResult = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert!(written.success());
        assert_eq!(written.results[0].browser, Browser::Webkit);
    }

    #[test]
    fn test_judge_prefers_script_failure() {
        let config = SuiteConfig::default();
        let questions = QuestionSet::builtin().unwrap();
        let ctx = ScenarioContext::new(&config, &questions, Browser::Chromium);
        let scenario = catalog(&questions).into_iter().find(|s| s.name == "chat-readiness").unwrap();

        let failed = Transcript::from_observations(vec![
            Observation::Failure { step: Some(3), message: "locator.click: Timeout".into(), t: 9 },
            Observation::Done { t: 10 },
        ]);
        assert!(matches!(judge(&scenario, &ctx, &failed), Err(E2eError::StepFailed { .. })));

        let truncated = Transcript::from_observations(vec![]);
        assert!(matches!(judge(&scenario, &ctx, &truncated), Err(E2eError::Playwright(_))));
    }

    #[tokio::test]
    async fn test_run_fails_fast_when_app_unreachable() {
        let tmp = TempDir::new().unwrap();
        let config = SuiteConfig {
            base_url: "http://127.0.0.1:9".into(),
            output_dir: tmp.path().to_path_buf(),
            ..Default::default()
        };
        let runner = TestRunner::new(config, QuestionSet::builtin().unwrap())
            .with_ready_timeout(Duration::from_millis(200));
        let err = runner.run(&RunFilter::default()).await.unwrap_err();
        assert!(matches!(err, E2eError::AppUnreachable(_)));
    }
}
