//! Expected effort per item variant

use anyhow::Context;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

use super::item::{ItemType, Variant};
use crate::allocation::AllocationError;

#[derive(Debug, Error)]
pub enum TimeModelError {
    #[error("unknown time model key {0:?}")]
    UnknownLabel(String),

    #[error("time model entry {variant} must be positive minutes, got {minutes}")]
    InvalidMinutes { variant: Variant, minutes: f64 },

    #[error("item type {0} does not support an extended variant")]
    NotExtensible(ItemType),

    #[error("time model lists {0} more than once")]
    DuplicateEntry(Variant),

    #[error("failed to parse time model: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Mapping from variant to expected minutes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeModel {
    entries: BTreeMap<Variant, f64>,
}

impl TimeModel {
    pub fn new(
        entries: impl IntoIterator<Item = (Variant, f64)>,
    ) -> Result<Self, TimeModelError> {
        let mut map = BTreeMap::new();
        for (variant, minutes) in entries {
            if variant.extended && !variant.item_type.supports_extension() {
                return Err(TimeModelError::NotExtensible(variant.item_type));
            }
            if !minutes.is_finite() || minutes <= 0.0 {
                return Err(TimeModelError::InvalidMinutes { variant, minutes });
            }
            if map.insert(variant, minutes).is_some() {
                return Err(TimeModelError::DuplicateEntry(variant));
            }
        }
        Ok(Self { entries: map })
    }

    /// Parse a flat YAML mapping such as `{A: 20, B: 35, C: 50, C-Extended: 90}`
    pub fn from_yaml_str(content: &str) -> Result<Self, TimeModelError> {
        let raw: BTreeMap<String, f64> = serde_yaml::from_str(content)?;
        let mut entries = Vec::with_capacity(raw.len());
        for (label, minutes) in raw {
            let variant: Variant = label
                .parse()
                .map_err(|_| TimeModelError::UnknownLabel(label.clone()))?;
            entries.push((variant, minutes));
        }
        Self::new(entries)
    }

    pub async fn load(path: &Path) -> anyhow::Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read time model {}", path.display()))?;
        Self::from_yaml_str(&content)
            .with_context(|| format!("Failed to parse time model {}", path.display()))
    }

    /// Look up the effort for a variant; no fallback for missing entries
    pub fn effort_minutes(&self, item_type: ItemType, extended: bool) -> Result<f64, AllocationError> {
        let variant = Variant::new(item_type, extended);
        self.entries
            .get(&variant)
            .copied()
            .ok_or(AllocationError::UnknownItemType {
                item_id: None,
                variant,
            })
    }

    pub fn entries(&self) -> impl Iterator<Item = (Variant, f64)> + '_ {
        self.entries.iter().map(|(v, m)| (*v, *m))
    }
}
