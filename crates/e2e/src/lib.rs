//! ragcheck E2E Test Framework
//!
//! Browser-level checks for a document-upload and RAG chat front end:
//! - Waits for the already-running application at the configured base URL
//! - Renders each scenario into a Playwright program and runs it with Node
//! - Reads back JSON-line observations and asserts on them in Rust
//! - Keeps traces, screenshots and videos according to the capture policy
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    E2E Test Runner (Rust)                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  TestRunner                                                 │
//! │    ├── HealthCheck::wait_until_reachable()                  │
//! │    ├── Scenario::plan() -> [Action] via Interaction         │
//! │    ├── ScriptBuilder::build() -> scenario.js                │
//! │    ├── PlaywrightDriver::run() -> Transcript                │
//! │    ├── Scenario::verify(Transcript) via assertions          │
//! │    └── ArtifactStore::settle() -> [ArtifactRecord]          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  scenario.js (Node + @playwright/test)                      │
//! │    ├── navigate / attach files / click / fill               │
//! │    ├── waitForResponse registered before the trigger        │
//! │    ├── page.on('websocket') frame timing                    │
//! │    └── emit({ event, label, ..., t }) per observation       │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod artifacts;
pub mod assertions;
pub mod driver;
pub mod error;
pub mod helpers;
pub mod health;
pub mod protocol;
pub mod runner;
pub mod scenarios;
pub mod script;

pub use driver::PlaywrightDriver;
pub use error::{E2eError, E2eResult};
pub use protocol::{Observation, Transcript};
pub use runner::{RunFilter, ScenarioResult, SuiteResult, TestRunner};
pub use scenarios::{catalog, Plan, Scenario, ScenarioContext, ScenarioKind};
pub use script::{Action, ScriptBuilder};
