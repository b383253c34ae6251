/*!
 * Integration tests for application lifecycle
 */

use anyhow::Result;
use indicatif::{MultiProgress, ProgressDrawTarget};
use tokio_test;

use mclt::app_config::Config;
use mclt::app_controller::{Controller, FileOutcome};
use mclt::file_utils::FileManager;
use mclt::pipeline::RunStatus;
use mclt::providers::mock::MockProvider;

use crate::common;

fn hidden_progress() -> MultiProgress {
    MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
}

fn controller() -> Result<Controller> {
    Controller::with_config(Config::default())
}

/// Test the controller initialization with default config
#[test]
fn test_controller_withDefaultConfig_shouldInitialize() -> Result<()> {
    let controller = controller()?;
    assert_eq!(controller.config().target_language, "it");
    assert!(controller.config().backup);
    Ok(())
}

/// Test that a translated file is written with its manifest and no backup
#[tokio::test]
async fn test_translateFile_withCleanInput_shouldWriteOutputAndManifest() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_localization(temp_dir.path(), "messages.yml")?;
    let output = FileManager::generate_output_path(&input, None, "it");
    let pipeline = common::mock_pipeline(vec![MockProvider::working()]);

    let outcome = controller()?
        .translate_file(&pipeline, &input, &output, false, &hidden_progress())
        .await?;

    assert_eq!(
        outcome,
        FileOutcome::Written {
            output: output.clone(),
            status: RunStatus::Success
        }
    );
    assert_eq!(output.file_name().unwrap(), "messages_it.yml");
    assert!(std::fs::read_to_string(&output)?.contains("reload: CONFIGURATION RELOADED"));

    let manifest = std::fs::read_to_string(FileManager::manifest_path(&output))?;
    assert!(manifest.contains("Status: SUCCESS"));
    assert!(manifest.contains("Languages: en -> it"));
    assert!(!FileManager::backup_path(&input).exists());
    Ok(())
}

/// Test that a repaired input gets a backup copy
#[tokio::test]
async fn test_translateFile_withRepairedInput_shouldBackUpSource() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let raw = "title: \"Welcome\n";
    let input = common::create_test_file(temp_dir.path(), "broken.yml", raw)?;
    let output = temp_dir.path().join("broken_it.yml");
    let pipeline = common::mock_pipeline(vec![MockProvider::working()]);

    controller()?
        .translate_file(&pipeline, &input, &output, false, &hidden_progress())
        .await?;

    let backup = FileManager::backup_path(&input);
    assert_eq!(std::fs::read_to_string(backup)?, raw);
    assert_eq!(std::fs::read_to_string(&output)?, "title: \"WELCOME\"\n");
    Ok(())
}

/// Test that an existing output is not overwritten without force
#[tokio::test]
async fn test_translateFile_withExistingOutput_shouldSkip() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_localization(temp_dir.path(), "messages.yml")?;
    let output = common::create_test_file(temp_dir.path(), "messages_it.yml", "keep: me\n")?;
    let provider = MockProvider::working();
    let pipeline = common::mock_pipeline(vec![provider.clone()]);

    let outcome = controller()?
        .translate_file(&pipeline, &input, &output, false, &hidden_progress())
        .await?;

    assert_eq!(outcome, FileOutcome::Skipped { output: output.clone() });
    assert_eq!(std::fs::read_to_string(&output)?, "keep: me\n");
    assert_eq!(provider.request_count(), 0);
    Ok(())
}

/// Test that a degraded run is reported in the written manifest
#[tokio::test]
async fn test_translateFile_withFailingProvider_shouldWriteDegradedManifest() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_localization(temp_dir.path(), "messages.yml")?;
    let output = temp_dir.path().join("messages_it.yml");
    let pipeline = common::mock_pipeline(vec![MockProvider::failing()]);

    let outcome = controller()?
        .translate_file(&pipeline, &input, &output, false, &hidden_progress())
        .await?;

    assert_eq!(outcome.status(), RunStatus::Degraded);
    assert_eq!(std::fs::read_to_string(&output)?, common::SAMPLE_MESSAGES);

    let manifest = std::fs::read_to_string(FileManager::manifest_path(&output))?;
    assert!(manifest.contains("Status: DEGRADED"));
    assert!(manifest.contains("## TranslationFailed (5)"));
    Ok(())
}

/// Test that an unparseable input only produces a failed manifest
#[test]
fn test_translateFile_withUnparseableInput_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "notes.yml", "just prose\nwith no keys\n")?;
    let output = temp_dir.path().join("notes_it.yml");
    let pipeline = common::mock_pipeline(vec![MockProvider::working()]);
    let controller = controller()?;

    let outcome = tokio_test::block_on(controller.translate_file(
        &pipeline,
        &input,
        &output,
        false,
        &hidden_progress(),
    ))?;

    assert_eq!(outcome.status(), RunStatus::Failed);
    assert_eq!(outcome.status().exit_code(), 1);
    assert!(!output.exists());

    let manifest = std::fs::read_to_string(FileManager::manifest_path(&output))?;
    assert!(manifest.contains("Status: FAILED"));
    assert!(manifest.contains("No recognizable"));
    Ok(())
}

/// Test that a missing input is an error
#[tokio::test]
async fn test_run_withMissingInput_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let result = controller()?
        .run(temp_dir.path().join("missing.yml"), None, false)
        .await;
    assert!(result.is_err());
    Ok(())
}
