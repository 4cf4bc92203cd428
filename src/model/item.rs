//! Work item types and the batch handed to the allocator

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Closed set of prompt types produced by prompt generation.
///
/// Declaration order is the processing order used by the allocator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ItemType {
    /// Single-filing grounding question
    A,
    /// Two-filing comparison question
    B,
    /// Multi-filing synthesis question (has an extended variant)
    C,
}

impl ItemType {
    pub const ALL: [ItemType; 3] = [ItemType::A, ItemType::B, ItemType::C];

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::A => "A",
            ItemType::B => "B",
            ItemType::C => "C",
        }
    }

    /// Whether items of this type may carry the extended flag
    pub fn supports_extension(&self) -> bool {
        match self {
            ItemType::A | ItemType::B => false,
            ItemType::C => true,
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A (type, extended) pair. All items of one variant cost the same effort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Variant {
    pub item_type: ItemType,
    pub extended: bool,
}

impl Variant {
    pub fn new(item_type: ItemType, extended: bool) -> Self {
        Self { item_type, extended }
    }

    pub fn standard(item_type: ItemType) -> Self {
        Self::new(item_type, false)
    }

    pub fn label(&self) -> String {
        if self.extended {
            format!("{}-Extended", self.item_type)
        } else {
            self.item_type.to_string()
        }
    }
}

// Type order first, then extended before standard within a type.
impl Ord for Variant {
    fn cmp(&self, other: &Self) -> Ordering {
        self.item_type
            .cmp(&other.item_type)
            .then_with(|| other.extended.cmp(&self.extended))
    }
}

impl PartialOrd for Variant {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

impl FromStr for Variant {
    type Err = ItemError;

    /// Normalize a raw label ("a", "C-EXT", "c-extended", ...) into a variant
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_uppercase();
        let variant = match normalized.as_str() {
            "A" => Variant::standard(ItemType::A),
            "B" => Variant::standard(ItemType::B),
            "C" => Variant::standard(ItemType::C),
            "C-EXT" | "C-EXTENDED" => Variant::new(ItemType::C, true),
            _ => return Err(ItemError::UnknownLabel(raw.to_string())),
        };
        Ok(variant)
    }
}

/// Errors raised while building a work batch
#[derive(Debug, Error)]
pub enum ItemError {
    #[error("duplicate work item id: {0}")]
    DuplicateItem(String),

    #[error("unknown item type label: {0:?}")]
    UnknownLabel(String),

    #[error("malformed prompt record on line {line}: {source}")]
    Malformed {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// One unit of labeling work. Effort is looked up in the time model, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: String,
    pub item_type: ItemType,
    #[serde(default)]
    pub extended: bool,
}

impl WorkItem {
    pub fn new(id: impl Into<String>, item_type: ItemType) -> Self {
        Self {
            id: id.into(),
            item_type,
            extended: false,
        }
    }

    pub fn extended(mut self) -> Self {
        self.extended = true;
        self
    }

    pub fn variant(&self) -> Variant {
        Variant::new(self.item_type, self.extended)
    }
}

/// Raw prompt record as written by prompt generation (one JSON object per line)
#[derive(Debug, Deserialize)]
struct PromptRecord {
    #[serde(alias = "id")]
    prompt_id: String,
    #[serde(rename = "type")]
    label: String,
    #[serde(default)]
    extended: bool,
}

/// Ordered collection of work items with unique ids
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkBatch {
    items: Vec<WorkItem>,
}

impl WorkBatch {
    pub fn new(items: Vec<WorkItem>) -> Result<Self, ItemError> {
        let mut seen = HashSet::with_capacity(items.len());
        for item in &items {
            if !seen.insert(item.id.as_str()) {
                return Err(ItemError::DuplicateItem(item.id.clone()));
            }
        }
        Ok(Self { items })
    }

    /// Parse the JSONL prompt file format. Blank lines are skipped.
    pub fn from_jsonl_str(content: &str) -> Result<Self, ItemError> {
        let mut items = Vec::new();
        for (idx, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let record: PromptRecord = serde_json::from_str(line).map_err(|source| {
                ItemError::Malformed {
                    line: idx + 1,
                    source,
                }
            })?;
            let variant: Variant = record.label.parse()?;
            items.push(WorkItem {
                id: record.prompt_id,
                item_type: variant.item_type,
                extended: variant.extended || record.extended,
            });
        }
        Self::new(items)
    }

    pub async fn load(path: &Path) -> anyhow::Result<Self> {
        use anyhow::Context;

        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read prompts file {}", path.display()))?;
        Self::from_jsonl_str(&content)
            .with_context(|| format!("Failed to parse prompts file {}", path.display()))
    }

    pub fn items(&self) -> &[WorkItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&WorkItem> {
        self.items.iter().find(|item| item.id == id)
    }
}
