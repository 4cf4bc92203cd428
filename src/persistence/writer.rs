//! Atomic plan file writer
//!
//! Plans are rendered to a temp file in the target directory and renamed over
//! the destination, so readers only ever see a complete plan. Re-writing an
//! identical plan leaves the existing file untouched.

use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::allocation::AllocationPlan;

/// What a write did to the plan file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// A new or changed plan was written
    Written,
    /// The file already held this exact plan
    Unchanged,
}

/// Canonical on-disk rendering: pretty JSON plus a trailing newline
pub fn render_plan(plan: &AllocationPlan) -> Result<String> {
    let mut json = serde_json::to_string_pretty(plan).context("Failed to serialize plan")?;
    json.push('\n');
    Ok(json)
}

/// Read a previously written plan
pub fn load_plan(path: &Path) -> Result<AllocationPlan> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read plan file {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse plan file {}", path.display()))
}

pub struct PlanWriter {
    path: PathBuf,
}

impl PlanWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn write(&self, plan: &AllocationPlan) -> Result<WriteOutcome> {
        let rendered = render_plan(plan)?;

        if let Ok(existing) = std::fs::read(&self.path) {
            if existing == rendered.as_bytes() {
                debug!(path = %self.path.display(), "Plan unchanged, skipping write");
                return Ok(WriteOutcome::Unchanged);
            }
        }

        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent)
            .with_context(|| format!("Failed to create plan directory {}", parent.display()))?;

        let mut temp = NamedTempFile::new_in(&parent)
            .with_context(|| format!("Failed to create temp file in {}", parent.display()))?;
        temp.write_all(rendered.as_bytes())
            .context("Failed to write plan to temp file")?;
        temp.as_file().sync_all().context("Failed to sync plan temp file")?;
        temp.persist(&self.path)
            .with_context(|| format!("Failed to move plan into place at {}", self.path.display()))?;

        info!(path = %self.path.display(), "Wrote allocation plan");
        Ok(WriteOutcome::Written)
    }
}
