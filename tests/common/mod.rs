/*!
 * Common test utilities for the mclt test suite
 */

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use mclt::pipeline::{PipelineConfig, TranslationPipeline};
use mclt::providers::mock::MockProvider;
use mclt::shield::TokenShield;
use mclt::translation::{RequestCounter, RetryPolicy, TranslationAdapter};

/// Initialize env_logger once for tests that want log output
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// A small plugin language file exercising placeholders, colour codes,
/// nesting, comments and non-string scalars
pub const SAMPLE_MESSAGES: &str = "# Messages for the spawn plugin
prefix: '&8[&6Spawn&8] '
greeting: \"Hello %s, you have {count} items!\"
messages:
  teleport: '&aTeleported to the Nether in %seconds% seconds.'
  cooldown: 'Please wait {time} before using /spawn again'
  reload: Configuration reloaded
settings:
  enabled: true
  radius: 25
";

/// Creates the sample localization file in the specified directory
pub fn create_test_localization(dir: &Path, filename: &str) -> Result<PathBuf> {
    create_test_file(dir, filename, SAMPLE_MESSAGES)
}

/// Retry policy that keeps tests fast
pub fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        attempts: 2,
        base_backoff: Duration::from_millis(1),
        max_backoff: Duration::from_millis(4),
        attempt_timeout: Duration::from_secs(2),
    }
}

/// Pipeline backed by a chain of mock providers
pub fn mock_pipeline(providers: Vec<MockProvider>) -> TranslationPipeline {
    mock_pipeline_with(PipelineConfig::new("en", "it"), providers)
}

/// Pipeline backed by a chain of mock providers with a custom configuration
pub fn mock_pipeline_with(config: PipelineConfig, providers: Vec<MockProvider>) -> TranslationPipeline {
    let adapter = providers
        .into_iter()
        .fold(TranslationAdapter::new(fast_policy(), RequestCounter::new()), |adapter, provider| {
            adapter.with_provider(Arc::new(provider), 4, None)
        });
    TranslationPipeline::new(config, TokenShield::standard(true, true, &["Nether", "Chunk"]), adapter)
}
