//! Labeler roster

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::path::Path;
use thiserror::Error;

use super::item::{ItemType, Variant};

/// Errors raised while building a worker registry
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("duplicate worker id: {0}")]
    DuplicateWorker(String),

    #[error("worker {worker} has invalid available hours: {hours}")]
    InvalidHours { worker: String, hours: f64 },

    #[error("worker {worker} has unknown focus label {focus:?}")]
    UnknownFocus { worker: String, focus: String },

    #[error("failed to parse roster: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// A labeler with declared hours and the item types they may receive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Worker {
    pub id: String,
    pub name: String,
    pub available_hours: f64,
    pub skills: BTreeSet<ItemType>,
}

impl Worker {
    pub fn new(id: impl Into<String>, available_hours: f64) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            available_hours,
            skills: BTreeSet::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_skills(mut self, skills: impl IntoIterator<Item = ItemType>) -> Self {
        self.skills = skills.into_iter().collect();
        self
    }

    pub fn capacity_minutes(&self) -> f64 {
        self.available_hours * 60.0
    }

    pub fn can_take(&self, item_type: ItemType) -> bool {
        self.skills.contains(&item_type)
    }
}

#[derive(Debug, Deserialize)]
struct RosterFile {
    #[serde(default)]
    labelers: Vec<RosterEntry>,
}

#[derive(Debug, Deserialize)]
struct RosterEntry {
    id: String,
    name: Option<String>,
    #[serde(default)]
    hours_available: f64,
    #[serde(default)]
    focus: Vec<String>,
}

/// Validated set of workers, kept sorted by id
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkerRegistry {
    workers: Vec<Worker>,
}

impl WorkerRegistry {
    /// Build a registry. Zero-hour workers are allowed; negative or
    /// non-finite hours are rejected.
    pub fn new(mut workers: Vec<Worker>) -> Result<Self, RegistryError> {
        let mut seen = HashSet::with_capacity(workers.len());
        for worker in &workers {
            if !seen.insert(worker.id.as_str()) {
                return Err(RegistryError::DuplicateWorker(worker.id.clone()));
            }
            if !worker.available_hours.is_finite() || worker.available_hours < 0.0 {
                return Err(RegistryError::InvalidHours {
                    worker: worker.id.clone(),
                    hours: worker.available_hours,
                });
            }
        }
        workers.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(Self { workers })
    }

    /// Parse the `labelers:` roster YAML
    pub fn from_yaml_str(content: &str) -> Result<Self, RegistryError> {
        let roster: RosterFile = serde_yaml::from_str(content)?;
        let mut workers = Vec::with_capacity(roster.labelers.len());
        for entry in roster.labelers {
            let mut skills = BTreeSet::new();
            for focus in &entry.focus {
                let variant: Variant =
                    focus.parse().map_err(|_| RegistryError::UnknownFocus {
                        worker: entry.id.clone(),
                        focus: focus.clone(),
                    })?;
                skills.insert(variant.item_type);
            }
            workers.push(Worker {
                name: entry.name.unwrap_or_else(|| entry.id.clone()),
                id: entry.id,
                available_hours: entry.hours_available,
                skills,
            });
        }
        Self::new(workers)
    }

    pub async fn load(path: &Path) -> anyhow::Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read labeler roster {}", path.display()))?;
        Self::from_yaml_str(&content)
            .with_context(|| format!("Failed to parse labeler roster {}", path.display()))
    }

    /// Workers in ascending id order
    pub fn workers(&self) -> &[Worker] {
        &self.workers
    }

    pub fn get(&self, id: &str) -> Option<&Worker> {
        self.workers
            .binary_search_by(|w| w.id.as_str().cmp(id))
            .ok()
            .map(|idx| &self.workers[idx])
    }

    /// Workers whose skill set contains `item_type`, ascending id
    pub fn qualified_for(&self, item_type: ItemType) -> impl Iterator<Item = &Worker> {
        self.workers.iter().filter(move |w| w.can_take(item_type))
    }

    pub fn total_capacity_minutes(&self) -> f64 {
        self.workers.iter().map(Worker::capacity_minutes).sum()
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }
}
