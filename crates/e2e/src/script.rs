//! Playwright script generation
//!
//! A scenario is a list of [`Action`]s. [`ScriptBuilder`] renders them into a
//! standalone Node program that drives one browser context and reports what
//! it sees as JSON lines (see [`crate::protocol`]). The script never decides
//! pass/fail on its own except when a bounded wait expires.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use ragcheck_common::{ArtifactPolicy, Browser, CaptureMode, FileStatus, Role, SelectorTable, SuiteConfig};

use crate::error::E2eResult;

/// Wait used by clicks that are allowed to fail
pub const OPTIONAL_CLICK_MS: u64 = 5_000;

/// How long answer text must stay unchanged to count as complete
pub const ANSWER_SETTLE_MS: u64 = 1_500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Delete => "DELETE",
        }
    }
}

/// One browser gesture or read-back
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// Load a path relative to the base URL
    Navigate { path: String },

    /// Record how many elements match a role
    Count { role: Role, label: String },

    /// Wait until a role's count equals a recorded count plus `delta`, then
    /// record the final count. Never fails by itself.
    AwaitCount {
        role: Role,
        base: String,
        delta: i64,
        label: String,
        timeout_ms: u64,
    },

    /// Attach files to the upload input
    AttachFiles { paths: Vec<PathBuf> },

    /// Wait until a row naming the file is visible
    WaitForRow { name: String, timeout_ms: u64 },

    /// Record the status badge text of the newest row naming the file
    ReadStatus { name: String, label: String },

    /// Wait until the newest row naming the file shows `status`
    WaitForStatus {
        name: String,
        status: FileStatus,
        timeout_ms: u64,
    },

    /// Click a control inside the newest row naming the file
    ClickRowControl { name: String, control: Role },

    /// Start listening for a backend response. Must precede the trigger.
    ExpectResponse {
        key: String,
        path: String,
        method: Method,
        timeout_ms: u64,
    },

    /// Resolve a listener registered by `ExpectResponse` and record it
    AwaitResponse { key: String },

    Fill { role: Role, text: String },

    /// Record whether a role is enabled, optionally waiting for a state first
    ReadEnabled {
        role: Role,
        label: String,
        expect: Option<bool>,
    },

    Click { role: Role, optional: bool },

    /// Wait for a role to become visible, then record it
    WaitVisible {
        role: Role,
        label: String,
        timeout_ms: u64,
    },

    /// Start timing when the element at index `counts[base]` of a role first
    /// renders. Must precede the action that produces it.
    WatchNewVisible {
        role: Role,
        base: String,
        label: String,
        timeout_ms: u64,
    },

    /// Resolve a `WatchNewVisible` watcher and record the render time
    AwaitNewVisible { label: String },

    /// Record whether a role becomes visible within the wait. Never fails.
    CheckVisible {
        role: Role,
        label: String,
        timeout_ms: u64,
    },

    /// Wait for every element of a role to disappear, if any are present
    WaitHidden { role: Role, timeout_ms: u64 },

    /// Record inner text, optionally waiting for it to stop changing. With
    /// `after` set, reads the element at index `counts[after]`, the first one
    /// beyond a recorded count; otherwise the first match.
    ReadText {
        role: Role,
        label: String,
        after: Option<String>,
        settle_timeout_ms: Option<u64>,
    },

    /// Report WebSocket connections and received frames from now on
    WatchWebSockets,

    Pause { ms: u64 },

    /// Clear cookies plus local and session storage for the current origin
    ClearStorage,
}

impl Action {
    /// Short name used in logs and step events
    pub fn name(&self) -> String {
        match self {
            Action::Navigate { path } => format!("navigate:{}", path),
            Action::Count { label, .. } => format!("count:{}", label),
            Action::AwaitCount { label, .. } => format!("await_count:{}", label),
            Action::AttachFiles { paths } => format!("attach:{} file(s)", paths.len()),
            Action::WaitForRow { name, .. } => format!("wait_row:{}", name),
            Action::ReadStatus { label, .. } => format!("read_status:{}", label),
            Action::WaitForStatus { name, status, .. } => format!("wait_status:{}:{}", name, status),
            Action::ClickRowControl { name, control } => format!("click_row:{}:{}", name, control.key()),
            Action::ExpectResponse { key, .. } => format!("expect_response:{}", key),
            Action::AwaitResponse { key } => format!("await_response:{}", key),
            Action::Fill { role, .. } => format!("fill:{}", role.key()),
            Action::ReadEnabled { label, .. } => format!("read_enabled:{}", label),
            Action::Click { role, .. } => format!("click:{}", role.key()),
            Action::WaitVisible { label, .. } => format!("wait_visible:{}", label),
            Action::WatchNewVisible { label, .. } => format!("watch_new_visible:{}", label),
            Action::AwaitNewVisible { label } => format!("await_new_visible:{}", label),
            Action::CheckVisible { label, .. } => format!("check_visible:{}", label),
            Action::WaitHidden { role, .. } => format!("wait_hidden:{}", role.key()),
            Action::ReadText { label, .. } => format!("read_text:{}", label),
            Action::WatchWebSockets => "watch_websockets".to_string(),
            Action::Pause { ms } => format!("pause:{}ms", ms),
            Action::ClearStorage => "clear_storage".to_string(),
        }
    }
}

/// Renders actions into a Playwright program
#[derive(Debug, Clone)]
pub struct ScriptBuilder {
    base_url: String,
    browser: Browser,
    headless: bool,
    viewport_width: u32,
    viewport_height: u32,
    action_timeout_ms: u64,
    navigation_timeout_ms: u64,
    expect_timeout_ms: u64,
    artifacts: ArtifactPolicy,
    artifact_dir: PathBuf,
    selectors: SelectorTable,
}

impl ScriptBuilder {
    pub fn new(config: &SuiteConfig, browser: Browser, artifact_dir: &Path) -> E2eResult<Self> {
        Ok(Self {
            base_url: config.base_url.clone(),
            browser,
            headless: config.headless,
            viewport_width: config.viewport_width,
            viewport_height: config.viewport_height,
            action_timeout_ms: config.timeouts.action_ms,
            navigation_timeout_ms: config.timeouts.navigation_ms,
            expect_timeout_ms: config.timeouts.expect_ms,
            artifacts: config.artifacts.clone(),
            artifact_dir: absolute(artifact_dir)?,
            selectors: config.selector_table()?,
        })
    }

    pub fn selectors(&self) -> &SelectorTable {
        &self.selectors
    }

    /// Build the complete program for a set of actions
    pub fn build(&self, actions: &[Action]) -> String {
        let mut script = String::new();

        script.push_str(&self.header());

        for (i, action) in actions.iter().enumerate() {
            script.push_str(&format!("\n    // Step {}: {}\n", i + 1, action.name()));
            script.push_str(&format!(
                "    step = {}; emit({{ event: 'step', index: {}, name: {} }});\n",
                i,
                i,
                js(&action.name())
            ));
            script.push_str(&self.action_to_js(action));
            script.push('\n');
        }

        script.push_str(&self.footer());
        script
    }

    fn header(&self) -> String {
        let video = if self.artifacts.video.records() {
            format!(", recordVideo: {{ dir: {} }}", js_path(&self.artifact_dir))
        } else {
            String::new()
        };
        let trace = if self.artifacts.trace.records() {
            "  await context.tracing.start({ screenshots: true, snapshots: true });\n"
        } else {
            ""
        };

        format!(
            r#"
const {{ chromium, firefox, webkit, expect }} = require('@playwright/test');

const T0 = Date.now();
function emit(obj) {{
  if (obj.t === undefined) obj.t = Date.now() - T0;
  process.stdout.write(JSON.stringify(obj) + '\n');
}}

const SEL = {selectors};
const BASE_URL = {base_url};
const ARTIFACT_DIR = {artifact_dir};

function badgeStatus(text) {{
  const lower = (text || '').toLowerCase();
  if (lower.includes('unprocessed')) return 'Unprocessed';
  if (lower.includes('processed')) return 'Processed';
  return null;
}}

(async () => {{
  const browser = await {browser}.launch({{ headless: {headless} }});
  const context = await browser.newContext({{
    viewport: {{ width: {width}, height: {height} }}{video}
  }});
  context.setDefaultTimeout({action_timeout});
  context.setDefaultNavigationTimeout({navigation_timeout});
{trace}  const page = await context.newPage();
  const pending = {{}};
  const watchers = {{}};
  const counts = {{}};
  let step = null;
  let failed = false;

  // Deepest element holding both the named row and `inner`; rows are
  // matched last-first so the newest upload wins.
  function rowScope(name, inner) {{
    return page.locator('*')
      .filter({{ has: page.locator(SEL.file_row, {{ hasText: name }}) }})
      .filter({{ has: page.locator(inner) }})
      .last();
  }}

  async function rowPart(name, inner) {{
    const scope = rowScope(name, inner);
    if (await scope.count()) return scope.locator(inner).first();
    return page.locator(inner).last();
  }}

  // Wall-clock ms at which the nth match first has a layout box, sampled in
  // the page every animation frame. Selectors the DOM cannot parse fall back
  // to a Playwright wait.
  function watchNth(selector, n, timeout) {{
    return page.waitForFunction(([sel, i]) => {{
      const el = document.querySelectorAll(sel)[i];
      if (!el) return false;
      const box = el.getBoundingClientRect();
      return box.width > 0 && box.height > 0 ? Date.now() : false;
    }}, [selector, n], {{ polling: 'raf', timeout }})
      .then((handle) => handle.jsonValue())
      .catch(async (error) => {{
        if (error && error.name === 'TimeoutError') throw error;
        await page.locator(selector).nth(n).waitFor({{ state: 'visible', timeout }});
        return Date.now();
      }});
  }}

  try {{
"#,
            selectors = self.selectors.to_json(),
            base_url = js(&self.base_url),
            artifact_dir = js_path(&self.artifact_dir),
            browser = self.browser.as_str(),
            headless = self.headless,
            width = self.viewport_width,
            height = self.viewport_height,
            video = video,
            action_timeout = self.action_timeout_ms,
            navigation_timeout = self.navigation_timeout_ms,
            trace = trace,
        )
    }

    fn footer(&self) -> String {
        let screenshot_on_failure = self.artifacts.screenshot != CaptureMode::Off;
        let screenshot_always = self.artifacts.screenshot == CaptureMode::On;
        let trace = self.artifacts.trace.records();

        let mut footer = String::from(
            r#"
  } catch (error) {
    failed = true;
    emit({ event: 'failure', step, message: String((error && error.message) || error) });
"#,
        );
        if screenshot_on_failure {
            footer.push_str(
                r#"    try {
      const shot = ARTIFACT_DIR + '/failure.png';
      await page.screenshot({ path: shot, fullPage: true });
      emit({ event: 'artifact', kind: 'screenshot', path: shot });
    } catch (_) {}
"#,
            );
        }
        footer.push_str("  } finally {\n");
        if screenshot_always {
            footer.push_str(
                r#"    if (!failed) {
      try {
        const shot = ARTIFACT_DIR + '/final.png';
        await page.screenshot({ path: shot, fullPage: true });
        emit({ event: 'artifact', kind: 'screenshot', path: shot });
      } catch (_) {}
    }
"#,
            );
        }
        if trace {
            footer.push_str(
                r#"    try {
      const tracePath = ARTIFACT_DIR + '/trace.zip';
      await context.tracing.stop({ path: tracePath });
      emit({ event: 'artifact', kind: 'trace', path: tracePath });
    } catch (_) {}
"#,
            );
        }
        footer.push_str(
            r#"    const video = page.video();
    await context.close();
    if (video) {
      try { emit({ event: 'artifact', kind: 'video', path: await video.path() }); } catch (_) {}
    }
    await browser.close();
  }
  if (!failed) emit({ event: 'done' });
  process.exit(failed ? 1 : 0);
})();
"#,
        );
        footer
    }

    /// Convert an action to JavaScript statements
    fn action_to_js(&self, action: &Action) -> String {
        match action {
            Action::Navigate { path } => format!(
                "    await page.goto(new URL({}, BASE_URL).toString(), {{ waitUntil: 'domcontentloaded' }});",
                js(path)
            ),
            Action::Count { role, label } => format!(
                r#"    counts[{label}] = await page.locator(SEL.{role}).count();
    emit({{ event: 'count', label: {label}, value: counts[{label}] }});"#,
                label = js(label),
                role = role.key()
            ),
            Action::AwaitCount { role, base, delta, label, timeout_ms } => format!(
                r#"    {{
      const loc = page.locator(SEL.{role});
      const expected = (counts[{base}] || 0) + ({delta});
      await expect(loc).toHaveCount(expected, {{ timeout: {timeout} }}).catch(() => {{}});
      counts[{label}] = await loc.count();
      emit({{ event: 'count', label: {label}, value: counts[{label}] }});
    }}"#,
                role = role.key(),
                base = js(base),
                delta = delta,
                label = js(label),
                timeout = timeout_ms
            ),
            Action::AttachFiles { paths } => {
                let list: Vec<String> = paths.iter().map(|p| js_path(p)).collect();
                format!(
                    r#"    {{
      const input = page.locator(SEL.upload_input).first();
      await expect(input).toBeVisible({{ timeout: {timeout} }});
      await expect(input).toBeEnabled({{ timeout: {timeout} }});
      await input.setInputFiles([{files}]);
    }}"#,
                    timeout = self.expect_timeout_ms,
                    files = list.join(", ")
                )
            }
            Action::WaitForRow { name, timeout_ms } => format!(
                r#"    await expect(page.locator({row}).last()).toBeVisible({{ timeout: {timeout} }});
    emit({{ event: 'visible', label: {label}, visible: true }});"#,
                row = js(&self.selectors.row_with_name(name)),
                timeout = timeout_ms,
                label = js(&row_label(name))
            ),
            Action::ReadStatus { name, label } => format!(
                r#"    {{
      const badge = await rowPart({name}, SEL.status_badge);
      emit({{ event: 'text', label: {label}, value: (await badge.innerText()).trim() }});
    }}"#,
                name = js(name),
                label = js(label)
            ),
            Action::WaitForStatus { name, status, timeout_ms } => format!(
                r#"    {{
      const badge = await rowPart({name}, SEL.status_badge);
      await expect.poll(async () => badgeStatus(await badge.innerText()), {{ timeout: {timeout} }}).toBe({status});
    }}"#,
                name = js(name),
                timeout = timeout_ms,
                status = js(status.label())
            ),
            Action::ClickRowControl { name, control } => format!(
                "    await (await rowPart({}, SEL.{})).click();",
                js(name),
                control.key()
            ),
            Action::ExpectResponse { key, path, method, timeout_ms } => format!(
                r#"    pending[{key}] = page.waitForResponse(
      (r) => r.url().includes({path}) && r.request().method() === {method},
      {{ timeout: {timeout} }}
    );
    pending[{key}].catch(() => {{}});"#,
                key = js(key),
                path = js(path),
                method = js(method.as_str()),
                timeout = timeout_ms
            ),
            Action::AwaitResponse { key } => format!(
                r#"    {{
      if (!pending[{key}]) throw new Error('no response listener registered for ' + {key});
      const response = await pending[{key}];
      emit({{ event: 'response', key: {key}, url: response.url(), method: response.request().method(), status: response.status() }});
    }}"#,
                key = js(key)
            ),
            Action::Fill { role, text } => format!(
                "    await page.locator(SEL.{}).first().fill({});",
                role.key(),
                js(text)
            ),
            Action::ReadEnabled { role, label, expect } => {
                let wait = match expect {
                    Some(true) => format!(
                        "      await expect(loc).toBeEnabled({{ timeout: {} }}).catch(() => {{}});\n",
                        self.expect_timeout_ms
                    ),
                    Some(false) => format!(
                        "      await expect(loc).toBeDisabled({{ timeout: {} }}).catch(() => {{}});\n",
                        self.expect_timeout_ms
                    ),
                    None => String::new(),
                };
                format!(
                    r#"    {{
      const loc = page.locator(SEL.{role}).first();
{wait}      emit({{ event: 'enabled', label: {label}, enabled: await loc.isEnabled() }});
    }}"#,
                    role = role.key(),
                    wait = wait,
                    label = js(label)
                )
            }
            Action::Click { role, optional } => {
                if *optional {
                    format!(
                        "    await page.locator(SEL.{}).first().click({{ timeout: {} }}).catch(() => {{}});",
                        role.key(),
                        OPTIONAL_CLICK_MS
                    )
                } else {
                    format!("    await page.locator(SEL.{}).first().click();", role.key())
                }
            }
            Action::WaitVisible { role, label, timeout_ms } => format!(
                r#"    await expect(page.locator(SEL.{role}).first()).toBeVisible({{ timeout: {timeout} }});
    emit({{ event: 'visible', label: {label}, visible: true }});"#,
                role = role.key(),
                timeout = timeout_ms,
                label = js(label)
            ),
            Action::WatchNewVisible { role, base, label, timeout_ms } => format!(
                r#"    watchers[{label}] = watchNth(SEL.{role}, counts[{base}] || 0, {timeout});
    watchers[{label}].catch(() => {{}});"#,
                label = js(label),
                role = role.key(),
                base = js(base),
                timeout = timeout_ms
            ),
            Action::AwaitNewVisible { label } => format!(
                r#"    {{
      if (!watchers[{label}]) throw new Error('no render watcher registered for ' + {label});
      const at = await watchers[{label}];
      emit({{ event: 'visible', label: {label}, visible: true, t: Math.max(0, at - T0) }});
    }}"#,
                label = js(label)
            ),
            Action::CheckVisible { role, label, timeout_ms } => format!(
                r#"    {{
      const seen = await page.locator(SEL.{role}).first()
        .waitFor({{ state: 'visible', timeout: {timeout} }})
        .then(() => true, () => false);
      emit({{ event: 'visible', label: {label}, visible: seen }});
    }}"#,
                role = role.key(),
                timeout = timeout_ms,
                label = js(label)
            ),
            Action::WaitHidden { role, timeout_ms } => format!(
                r#"    {{
      const loc = page.locator(SEL.{role});
      if (await loc.count()) {{
        await expect(loc).toHaveCount(0, {{ timeout: {timeout} }});
      }}
    }}"#,
                role = role.key(),
                timeout = timeout_ms
            ),
            Action::ReadText { role, label, after, settle_timeout_ms } => {
                let settle = match settle_timeout_ms {
                    Some(timeout) => format!(
                        r#"      {{
        const deadline = Date.now() + {timeout};
        let previous = null;
        let since = Date.now();
        while (Date.now() < deadline) {{
          const current = await loc.innerText().catch(() => '');
          if (current.length > 0 && current === previous) {{
            if (Date.now() - since >= {settle}) break;
          }} else {{
            previous = current;
            since = Date.now();
          }}
          await page.waitForTimeout(250);
        }}
      }}
"#,
                        timeout = timeout,
                        settle = ANSWER_SETTLE_MS
                    ),
                    None => String::new(),
                };
                format!(
                    r#"    {{
      const loc = {target};
{settle}      emit({{ event: 'text', label: {label}, value: await loc.innerText() }});
    }}"#,
                    target = match after {
                        Some(base) => format!("page.locator(SEL.{}).nth(counts[{}] || 0)", role.key(), js(base)),
                        None => format!("page.locator(SEL.{}).first()", role.key()),
                    },
                    settle = settle,
                    label = js(label)
                )
            }
            Action::WatchWebSockets => r#"    page.on('websocket', (ws) => {
      emit({ event: 'ws_open', url: ws.url() });
      ws.on('framereceived', (frame) => {
        const payload = frame && frame.payload;
        emit({ event: 'ws_frame', url: ws.url(), len: payload ? payload.length : 0 });
      });
    });"#
                .to_string(),
            Action::Pause { ms } => format!("    await page.waitForTimeout({});", ms),
            Action::ClearStorage => r#"    await context.clearCookies();
    await page.evaluate(() => {
      localStorage.clear();
      sessionStorage.clear();
    });"#
                .to_string(),
        }
    }
}

/// Label under which `WaitForRow` reports a file's row
pub fn row_label(name: &str) -> String {
    format!("row:{}", name)
}

/// Scripts run from a scratch directory, so every path they see is absolute
pub(crate) fn absolute(path: &Path) -> E2eResult<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

/// JavaScript string literal
fn js(text: &str) -> String {
    serde_json::Value::from(text).to_string()
}

fn js_path(path: &Path) -> String {
    js(&path.to_string_lossy())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> ScriptBuilder {
        ScriptBuilder::new(&SuiteConfig::default(), Browser::Firefox, Path::new("/tmp/artifacts")).unwrap()
    }

    #[test]
    fn test_header_uses_config() {
        let script = builder().build(&[]);
        assert!(script.contains("await firefox.launch({ headless: true })"));
        assert!(script.contains(r#"const BASE_URL = "http://localhost:8000";"#));
        assert!(script.contains("viewport: { width: 1280, height: 720 }"));
        assert!(script.contains("context.tracing.start"));
        assert!(script.contains("recordVideo"));
        assert!(script.contains("failure.png"));
        assert!(script.contains("emit({ event: 'done' })"));
    }

    #[test]
    fn test_artifacts_off_drop_recording() {
        let mut config = SuiteConfig::default();
        config.artifacts = ArtifactPolicy {
            trace: CaptureMode::Off,
            screenshot: CaptureMode::Off,
            video: CaptureMode::Off,
        };
        let script = ScriptBuilder::new(&config, Browser::Chromium, Path::new("/tmp/a"))
            .unwrap()
            .build(&[]);
        assert!(!script.contains("tracing.start"));
        assert!(!script.contains("recordVideo"));
        assert!(!script.contains("failure.png"));
    }

    #[test]
    fn test_steps_are_numbered_and_reported() {
        let script = builder().build(&[
            Action::Navigate { path: "/".into() },
            Action::Count { role: Role::FileRow, label: "rows_before".into() },
        ]);
        assert!(script.contains("// Step 1: navigate:/"));
        assert!(script.contains("// Step 2: count:rows_before"));
        assert!(script.contains(r#"emit({ event: 'step', index: 1, name: "count:rows_before" });"#));
        assert!(script.contains("page.locator(SEL.file_row).count()"));
    }

    #[test]
    fn test_strings_are_escaped() {
        let script = builder().build(&[Action::Fill {
            role: Role::ChatTextarea,
            text: "It's a \"quoted\" question\n".into(),
        }]);
        assert!(script.contains(r#"fill("It's a \"quoted\" question\n")"#));
    }

    #[test]
    fn test_response_listener_and_await() {
        let script = builder().build(&[
            Action::ExpectResponse {
                key: "delete".into(),
                path: "/documents".into(),
                method: Method::Delete,
                timeout_ms: 30_000,
            },
            Action::AwaitResponse { key: "delete".into() },
        ]);
        let listen = script.find("pending[\"delete\"] = page.waitForResponse").unwrap();
        let wait = script.find("const response = await pending[\"delete\"]").unwrap();
        assert!(listen < wait);
        assert!(script.contains(r#"r.request().method() === "DELETE""#));
    }

    #[test]
    fn test_wait_for_row_uses_named_selector() {
        let script = builder().build(&[Action::WaitForRow {
            name: "sample1.txt".into(),
            timeout_ms: 30_000,
        }]);
        assert!(script.contains(r#"page.locator("span.text-sm.truncate:has-text(\"sample1.txt\")").last()"#));
        assert!(script.contains(r#"label: "row:sample1.txt""#));
    }

    #[test]
    fn test_attach_requires_enabled_input() {
        let script = builder().build(&[Action::AttachFiles {
            paths: vec![PathBuf::from("/data/sample1.txt")],
        }]);
        let visible = script.find("await expect(input).toBeVisible").unwrap();
        let enabled = script.find("await expect(input).toBeEnabled").unwrap();
        let attach = script.find("await input.setInputFiles").unwrap();
        assert!(visible < enabled && enabled < attach);
    }

    #[test]
    fn test_new_bubble_is_timed_in_page() {
        let script = builder().build(&[
            Action::WatchNewVisible {
                role: Role::BotBubble,
                base: "bots_before".into(),
                label: "bot".into(),
                timeout_ms: 60_000,
            },
            Action::Click { role: Role::AskButton, optional: false },
            Action::AwaitNewVisible { label: "bot".into() },
            Action::ReadText {
                role: Role::BotBubble,
                label: "answer".into(),
                after: Some("bots_before".into()),
                settle_timeout_ms: None,
            },
        ]);
        let watch = script.find(r#"watchers["bot"] = watchNth(SEL.bot_bubble, counts["bots_before"] || 0, 60000)"#).unwrap();
        let click = script.find("page.locator(SEL.ask_button).first().click()").unwrap();
        let wait = script.find(r#"const at = await watchers["bot"]"#).unwrap();
        assert!(watch < click && click < wait);
        assert!(script.contains("t: Math.max(0, at - T0)"));
        assert!(script.contains("polling: 'raf'"));
        assert!(script.contains(r#"page.locator(SEL.bot_bubble).nth(counts["bots_before"] || 0)"#));
        assert!(script.contains("if (obj.t === undefined)"));
    }

    #[test]
    fn test_optional_click_swallows_errors() {
        let script = builder().build(&[Action::Click { role: Role::SubmitButton, optional: true }]);
        assert!(script.contains("click({ timeout: 5000 }).catch(() => {})"));
    }

    #[test]
    fn test_action_serde_tag() {
        let action: Action = serde_json::from_str(
            r#"{"action":"expect_response","key":"k","path":"/p","method":"POST","timeout_ms":10}"#,
        )
        .unwrap();
        assert_eq!(action.name(), "expect_response:k");
    }
}
