use anyhow::Result;
use assert_fs::prelude::*;
use assert_fs::TempDir;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;

/// Two labelers, 10h on A/B and 5h on A only
pub const LABELERS_YAML: &str = "\
labelers:
  - id: lb-01
    name: Labeler One
    hours_available: 10
    focus: [A, B]
  - id: lb-02
    hours_available: 5
    focus: [A]
";

pub const TIME_MODEL_YAML: &str = "\
A: 30
B: 45
C: 50
C-Extended: 90
";

/// Test utilities for integration tests
pub struct TestEnvironment {
    pub temp_dir: TempDir,
    pub project_path: PathBuf,
    pub config_dir: TempDir,
}

impl TestEnvironment {
    /// Create a new test environment with a temporary project directory
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let config_dir = TempDir::new()?;
        let project_path = temp_dir.path().to_path_buf();

        Ok(Self {
            temp_dir,
            project_path,
            config_dir,
        })
    }

    /// Path to the label-allocator binary built for this test run
    pub fn binary(&self) -> PathBuf {
        PathBuf::from(env!("CARGO_BIN_EXE_label-allocator"))
    }

    /// Run label-allocator in the project directory
    pub async fn run(&self, args: &[&str]) -> Result<std::process::Output> {
        Command::new(self.binary())
            .args(args)
            .current_dir(&self.project_path)
            .env("XDG_CONFIG_HOME", self.config_dir.path())
            .env("RUST_LOG", "label_allocator=info")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to run label-allocator: {}", e))
    }

    /// Write roster, time model and prompts at the default locations
    pub fn setup_inputs(&self, prompts: &str) -> Result<()> {
        self.write_labelers(LABELERS_YAML)?;
        self.temp_dir
            .child("config/time_model.yml")
            .write_str(TIME_MODEL_YAML)?;
        self.write_prompts(prompts)?;
        Ok(())
    }

    pub fn write_labelers(&self, yaml: &str) -> Result<()> {
        self.temp_dir.child("config/labelers.yml").write_str(yaml)?;
        Ok(())
    }

    pub fn write_prompts(&self, jsonl: &str) -> Result<()> {
        self.temp_dir
            .child("data/prompts/prompts.jsonl")
            .write_str(jsonl)?;
        Ok(())
    }

    pub fn plan_path(&self) -> PathBuf {
        self.project_path.join("data/allocations/plan.json")
    }
}

/// JSONL batch of `count` prompts of one type
pub fn prompts_jsonl(item_type: &str, count: usize) -> String {
    (1..=count)
        .map(|i| format!("{{\"prompt_id\": \"{}-{:03}\", \"type\": \"{}\"}}\n", item_type, i, item_type))
        .collect()
}

/// Assert that a string contains the given text (case-insensitive)
pub fn assert_contains(text: &str, needle: &str) {
    assert!(
        text.to_lowercase().contains(&needle.to_lowercase()),
        "Expected '{}' to contain '{}'",
        text,
        needle
    );
}

/// Assert that a command output is successful
pub fn assert_success(output: &std::process::Output) {
    if !output.status.success() {
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        panic!(
            "Command failed with exit code {}\nStdout: {}\nStderr: {}",
            output.status.code().unwrap_or(-1),
            stdout,
            stderr
        );
    }
}

/// Convert process output to a string
pub fn output_to_string(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

/// Convert process stderr to a string
pub fn stderr_to_string(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}
