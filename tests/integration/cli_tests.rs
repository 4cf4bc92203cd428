use super::common::*;
use anyhow::Result;
use predicates::prelude::*;
use serial_test::serial;
use std::fs;

#[tokio::test]
#[serial]
async fn test_cli_help() -> Result<()> {
    let env = TestEnvironment::new()?;

    let output = env.run(&["--help"]).await?;

    assert_success(&output);
    let stdout = output_to_string(&output);

    assert_contains(&stdout, "label-allocator");
    assert_contains(&stdout, "Plan labeling work");
    assert_contains(&stdout, "allocate");
    assert_contains(&stdout, "check");
    assert_contains(&stdout, "config");
    assert_contains(&stdout, "init");

    Ok(())
}

#[tokio::test]
#[serial]
async fn test_cli_version() -> Result<()> {
    let env = TestEnvironment::new()?;

    let output = env.run(&["--version"]).await?;

    assert_success(&output);
    let stdout = output_to_string(&output);
    assert!(predicate::str::is_match(r"^label-allocator \d+\.\d+\.\d+").unwrap().eval(stdout.trim()));

    Ok(())
}

#[tokio::test]
#[serial]
async fn test_init_command() -> Result<()> {
    let env = TestEnvironment::new()?;

    let output = env.run(&["init"]).await?;

    assert_success(&output);
    let stdout = output_to_string(&output);
    assert_contains(&stdout, "Initialized label-allocator project");
    assert_contains(&stdout, "Next steps");
    assert!(env.project_path.join("config/labelers.yml").exists());
    assert!(env.project_path.join("config/time_model.yml").exists());

    Ok(())
}

#[tokio::test]
#[serial]
async fn test_init_keeps_existing_roster() -> Result<()> {
    let env = TestEnvironment::new()?;
    env.write_labelers(LABELERS_YAML)?;

    let output = env.run(&["init"]).await?;

    assert_success(&output);
    assert_contains(&output_to_string(&output), "already exists");
    let roster = fs::read_to_string(env.project_path.join("config/labelers.yml"))?;
    assert_eq!(roster, LABELERS_YAML);

    Ok(())
}

#[tokio::test]
#[serial]
async fn test_allocate_writes_plan() -> Result<()> {
    let env = TestEnvironment::new()?;
    env.setup_inputs(&prompts_jsonl("A", 30))?;

    let output = env.run(&["allocate"]).await?;

    assert_success(&output);
    assert_contains(&output_to_string(&output), "Plan written to");

    let plan: serde_json::Value = serde_json::from_str(&fs::read_to_string(env.plan_path())?)?;
    let lb01 = plan["assignments"]["lb-01"]["items"].as_array().unwrap();
    let lb02 = plan["assignments"]["lb-02"]["items"].as_array().unwrap();
    assert_eq!(lb01.len(), 20);
    assert_eq!(lb02.len(), 10);
    assert_eq!(plan["assignments"]["lb-01"]["name"], "Labeler One");

    Ok(())
}

#[tokio::test]
#[serial]
async fn test_allocate_rerun_is_unchanged() -> Result<()> {
    let env = TestEnvironment::new()?;
    env.setup_inputs(&prompts_jsonl("A", 12))?;

    assert_success(&env.run(&["allocate"]).await?);
    let first = fs::read(env.plan_path())?;

    let output = env.run(&["allocate"]).await?;
    assert_success(&output);
    assert_contains(&output_to_string(&output), "Plan unchanged");
    assert_eq!(fs::read(env.plan_path())?, first);

    Ok(())
}

#[tokio::test]
#[serial]
async fn test_allocate_dry_run_prints_plan() -> Result<()> {
    let env = TestEnvironment::new()?;
    env.setup_inputs(&prompts_jsonl("A", 6))?;

    let output = env.run(&["allocate", "--dry-run"]).await?;

    assert_success(&output);
    let plan: serde_json::Value = serde_json::from_str(&output_to_string(&output))?;
    assert_eq!(plan["totals"]["item_count"], 6);
    assert!(!env.plan_path().exists());

    Ok(())
}

#[tokio::test]
#[serial]
async fn test_allocate_custom_out_path() -> Result<()> {
    let env = TestEnvironment::new()?;
    env.setup_inputs(&prompts_jsonl("B", 4))?;

    let output = env.run(&["allocate", "--out", "plans/b.json"]).await?;

    assert_success(&output);
    assert!(env.project_path.join("plans/b.json").exists());
    assert!(!env.plan_path().exists());

    Ok(())
}

#[tokio::test]
#[serial]
async fn test_allocate_capacity_shortfall_fails() -> Result<()> {
    let env = TestEnvironment::new()?;
    // 31 x 30 = 930 minutes against 900
    env.setup_inputs(&prompts_jsonl("A", 31))?;

    let output = env.run(&["allocate"]).await?;

    assert!(!output.status.success());
    let stderr = stderr_to_string(&output);
    assert_contains(&stderr, "Allocation failed");
    assert_contains(&stderr, "capacity exceeded");
    assert_contains(&stderr, "30.0 additional minutes");
    assert!(!env.plan_path().exists());

    Ok(())
}

#[tokio::test]
#[serial]
async fn test_allocate_unqualified_type_fails() -> Result<()> {
    let env = TestEnvironment::new()?;
    env.setup_inputs(&prompts_jsonl("C", 2))?;

    let output = env.run(&["allocate"]).await?;

    assert!(!output.status.success());
    assert_contains(&stderr_to_string(&output), "no qualified worker for item type C");
    assert!(!env.plan_path().exists());

    Ok(())
}

#[tokio::test]
#[serial]
async fn test_check_accepts_current_plan() -> Result<()> {
    let env = TestEnvironment::new()?;
    let mut prompts = prompts_jsonl("A", 8);
    prompts.push_str(&prompts_jsonl("B", 3));
    env.setup_inputs(&prompts)?;

    assert_success(&env.run(&["allocate"]).await?);
    let output = env.run(&["check"]).await?;

    assert_success(&output);
    assert_contains(&output_to_string(&output), "is current and valid");

    Ok(())
}

#[tokio::test]
#[serial]
async fn test_check_rejects_stale_plan() -> Result<()> {
    let env = TestEnvironment::new()?;
    env.setup_inputs(&prompts_jsonl("A", 8))?;

    assert_success(&env.run(&["allocate"]).await?);
    env.write_prompts(&prompts_jsonl("A", 9))?;
    let output = env.run(&["check"]).await?;

    assert!(!output.status.success());
    assert_contains(&stderr_to_string(&output), "is stale");

    Ok(())
}

#[tokio::test]
#[serial]
async fn test_config_show() -> Result<()> {
    let env = TestEnvironment::new()?;

    let output = env.run(&["config", "--show"]).await?;

    assert_success(&output);
    let stdout = output_to_string(&output);
    assert_contains(&stdout, "Current configuration");
    assert_contains(&stdout, "[paths]");
    assert_contains(&stdout, "data/allocations/plan.json");

    Ok(())
}

#[tokio::test]
#[serial]
async fn test_explicit_config_file() -> Result<()> {
    let env = TestEnvironment::new()?;
    env.setup_inputs(&prompts_jsonl("A", 4))?;
    fs::write(
        env.project_path.join("custom.toml"),
        "[paths]\nout = \"out/custom-plan.json\"\n",
    )?;

    let output = env.run(&["--config", "custom.toml", "allocate"]).await?;

    assert_success(&output);
    assert!(env.project_path.join("out/custom-plan.json").exists());

    Ok(())
}

#[tokio::test]
#[serial]
async fn test_check_rejects_plan_after_labeler_rename() -> Result<()> {
    let env = TestEnvironment::new()?;
    env.setup_inputs(&prompts_jsonl("A", 8))?;

    assert_success(&env.run(&["allocate"]).await?);
    env.write_labelers(&LABELERS_YAML.replace("Labeler One", "Labeler Uno"))?;
    let output = env.run(&["check"]).await?;

    assert!(!output.status.success());
    assert_contains(&stderr_to_string(&output), "is stale");

    Ok(())
}
