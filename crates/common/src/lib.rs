//! ragcheck common library
//!
//! Configuration, the selector table, and test fixtures shared by the
//! browser suite. Nothing in here talks to a browser.

pub mod config;
pub mod error;
pub mod fixtures;
pub mod selectors;
pub mod status;

pub use config::{ArtifactPolicy, Browser, CaptureMode, Endpoints, SuiteConfig, Timeouts};
pub use error::{Error, Result};
pub use fixtures::{keyword_match, FileFixture, FileFixtures, FixtureKind, Question, QuestionSet};
pub use selectors::{Role, SelectorTable};
pub use status::FileStatus;

/// ragcheck version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "ragcheck.toml";
