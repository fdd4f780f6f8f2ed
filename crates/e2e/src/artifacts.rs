//! Failure artifact retention
//!
//! Scripts record traces, screenshots and videos into a per-attempt
//! directory. Once the outcome is known the capture policy decides what
//! stays; whatever stays is hashed into the results manifest.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use ragcheck_common::{ArtifactPolicy, Browser, CaptureMode};

use crate::error::E2eResult;
use crate::protocol::{ArtifactKind, Transcript};

/// A retained artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactRecord {
    pub kind: ArtifactKind,
    pub path: String,
    pub sha256: String,
    pub bytes: u64,
}

pub struct ArtifactStore {
    root: PathBuf,
    policy: ArtifactPolicy,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>, policy: ArtifactPolicy) -> Self {
        Self {
            root: root.into(),
            policy,
        }
    }

    /// Fresh directory for one attempt of one scenario on one browser
    pub fn attempt_dir(&self, scenario: &str, browser: Browser, attempt: u32) -> E2eResult<PathBuf> {
        let dir = self
            .root
            .join(format!("{}-{}-attempt{}", scenario, browser, attempt));
        if dir.exists() {
            std::fs::remove_dir_all(&dir)?;
        }
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    fn mode(&self, kind: ArtifactKind) -> CaptureMode {
        match kind {
            ArtifactKind::Trace => self.policy.trace,
            ArtifactKind::Screenshot => self.policy.screenshot,
            ArtifactKind::Video => self.policy.video,
        }
    }

    /// Apply the capture policy to what a script reported
    pub fn settle(&self, transcript: &Transcript, dir: &Path, failed: bool) -> E2eResult<Vec<ArtifactRecord>> {
        let mut kept = Vec::new();

        for (kind, path) in transcript.artifacts() {
            if !path.exists() {
                continue;
            }
            if self.mode(kind).keep(failed) {
                kept.push(ArtifactRecord {
                    kind,
                    path: path.to_string_lossy().to_string(),
                    sha256: hash_file(path)?,
                    bytes: std::fs::metadata(path)?.len(),
                });
            } else {
                debug!("Discarding {:?} artifact {}", kind, path.display());
                std::fs::remove_file(path)?;
            }
        }

        if kept.is_empty() && dir_is_empty(dir)? {
            std::fs::remove_dir(dir)?;
        } else if !kept.is_empty() {
            info!("Kept {} artifact(s) in {}", kept.len(), dir.display());
        }

        Ok(kept)
    }

    /// Remove every attempt directory from a previous run
    pub fn clean(&self) -> E2eResult<()> {
        if !self.root.exists() {
            return Ok(());
        }
        for entry in walkdir::WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if entry.file_type().is_dir() {
                std::fs::remove_dir_all(entry.path())?;
            } else {
                std::fs::remove_file(entry.path())?;
            }
        }
        Ok(())
    }
}

fn dir_is_empty(dir: &Path) -> E2eResult<bool> {
    if !dir.exists() {
        return Ok(false);
    }
    Ok(std::fs::read_dir(dir)?.next().is_none())
}

/// Hash a file using SHA256
fn hash_file(path: &Path) -> E2eResult<String> {
    let data = std::fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&data);
    Ok(hex::encode(hasher.finalize()))
}
