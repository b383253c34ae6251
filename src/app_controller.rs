use anyhow::{Context, Result, anyhow};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::{debug, error, info, warn};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::app_config::Config;
use crate::document::write_document;
use crate::file_utils::FileManager;
use crate::pipeline::{CancellationFlag, Manifest, RunStatus, TranslationPipeline};

// @module: Application controller for localization file processing

// @const: Host resolved by the connectivity check
const CONNECTIVITY_HOST: &str = "google.com:443";

/// Result of processing one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    /// Output and manifest written
    Written { output: PathBuf, status: RunStatus },
    /// Output already existed and overwriting was not forced
    Skipped { output: PathBuf },
    /// The input could not be parsed; only the manifest was written
    Failed { manifest: PathBuf },
}

impl FileOutcome {
    pub fn status(&self) -> RunStatus {
        match self {
            Self::Written { status, .. } => *status,
            Self::Skipped { .. } => RunStatus::Success,
            Self::Failed { .. } => RunStatus::Failed,
        }
    }
}

/// One line of the environment check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckItem {
    pub name: String,
    pub ok: bool,
    pub detail: String,
}

impl CheckItem {
    fn new(name: &str, ok: bool, detail: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            ok,
            detail: detail.into(),
        }
    }
}

/// Main application controller for localization translation
pub struct Controller {
    // @field: App configuration
    config: Config,
    cancel: CancellationFlag,
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate().context("Invalid configuration")?;
        Ok(Self {
            config,
            cancel: CancellationFlag::new(),
        })
    }

    /// Share a cancellation flag with the caller (wired to Ctrl-C by the binary)
    pub fn with_cancellation(mut self, cancel: CancellationFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn build_pipeline(&self) -> Result<TranslationPipeline> {
        Ok(TranslationPipeline::from_config(&self.config)?.with_cancellation(self.cancel.clone()))
    }

    /// Translate a file or every localization file under a directory.
    ///
    /// `output` is the output file in file mode and the output directory in
    /// folder mode. Returns the worst status over all processed files.
    pub async fn run(&self, input: PathBuf, output: Option<PathBuf>, force_overwrite: bool) -> Result<RunStatus> {
        let input = FileManager::locate_input(&input)
            .ok_or_else(|| anyhow!("Input does not exist: {:?}", input))?;

        if input.is_dir() {
            return self.run_folder(input, output, force_overwrite).await;
        }

        let output = output.unwrap_or_else(|| {
            FileManager::generate_output_path(&input, None, &self.config.target_language)
        });
        let pipeline = self.build_pipeline()?;
        let outcome = self
            .translate_file(&pipeline, &input, &output, force_overwrite, &MultiProgress::new())
            .await?;
        Ok(outcome.status())
    }

    /// Translate one file with the given pipeline and write output, backup
    /// and manifest
    pub async fn translate_file(
        &self,
        pipeline: &TranslationPipeline,
        input: &Path,
        output: &Path,
        force_overwrite: bool,
        multi_progress: &MultiProgress,
    ) -> Result<FileOutcome> {
        let start_time = std::time::Instant::now();

        if output.exists() && !force_overwrite && output != input {
            warn!("Skipping {:?}, translation already exists (use -f to force overwrite)", output);
            return Ok(FileOutcome::Skipped {
                output: output.to_path_buf(),
            });
        }

        let raw = FileManager::read_to_string(input)?;
        let manifest_path = FileManager::manifest_path(output);

        let progress_bar = multi_progress.add(ProgressBar::new(0));
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} entries ({percent}%) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(style.progress_chars("=>-"));
        progress_bar.set_message(
            input
                .file_name()
                .map(|f| f.to_string_lossy().to_string())
                .unwrap_or_default(),
        );

        let pb = progress_bar.clone();
        let on_progress = move |done: usize, total: usize| {
            pb.set_length(total as u64);
            pb.set_position(done as u64);
        };

        let result = pipeline.run(&raw, Some(&on_progress)).await;
        progress_bar.finish_and_clear();

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(parse_error) => {
                error!("Cannot translate {:?}: {}", input, parse_error);
                let mut manifest = Manifest::failed(
                    &self.config.source_language,
                    &self.config.target_language,
                    &parse_error,
                );
                manifest.input = Some(input.to_path_buf());
                FileManager::write_to_file(&manifest_path, &manifest.render())?;
                return Ok(FileOutcome::Failed {
                    manifest: manifest_path,
                });
            }
        };

        if self.config.backup && (outcome.was_repaired() || output == input) {
            let backup = FileManager::backup_file(input)?;
            info!("Backup written to {}", backup.display());
        }

        write_document(&outcome.document, output)?;

        let mut manifest = outcome.manifest;
        manifest.input = Some(input.to_path_buf());
        manifest.output = Some(output.to_path_buf());
        FileManager::write_to_file(&manifest_path, &manifest.render())?;
        debug!("Manifest written to {}", manifest_path.display());

        let status = manifest.status();
        match status {
            RunStatus::Success => info!("Success: {}", output.display()),
            _ => warn!(
                "{}: {} (see {})",
                status,
                output.display(),
                manifest_path.display()
            ),
        }
        info!("Finished in {}", Self::format_duration(start_time.elapsed()));

        Ok(FileOutcome::Written {
            output: output.to_path_buf(),
            status,
        })
    }

    /// Translate every localization file under a directory.
    /// Existing outputs are skipped unless `force_overwrite` is set.
    pub async fn run_folder(
        &self,
        input_dir: PathBuf,
        output_dir: Option<PathBuf>,
        force_overwrite: bool,
    ) -> Result<RunStatus> {
        let start_time = std::time::Instant::now();

        let files = FileManager::find_localization_files(&input_dir, &self.config.target_language)?;
        if files.is_empty() {
            return Err(anyhow!("No localization files found in directory: {:?}", input_dir));
        }

        let multi_progress = MultiProgress::new();
        let folder_pb = multi_progress.add(ProgressBar::new(files.len() as u64));
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files ({percent}%) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        folder_pb.set_style(style.progress_chars("=>-"));

        let mut worst = RunStatus::Success;
        let (mut written, mut skipped, mut failed) = (0, 0, 0);

        for file in &files {
            if self.cancel.is_cancelled() {
                warn!("Cancelled, {} file(s) not processed", files.len() - written - skipped - failed);
                worst = worst.worst(RunStatus::Degraded);
                break;
            }

            let file_name = file
                .file_name()
                .map(|f| f.to_string_lossy().to_string())
                .unwrap_or_else(|| "unknown".to_string());
            folder_pb.set_message(format!("Processing: {}", file_name));

            let output = FileManager::generate_output_path(file, output_dir.as_deref(), &self.config.target_language);
            let result = match self.build_pipeline() {
                Ok(pipeline) => {
                    self.translate_file(&pipeline, file, &output, force_overwrite, &multi_progress)
                        .await
                }
                Err(e) => Err(e),
            };

            match result {
                Ok(outcome) => {
                    match outcome {
                        FileOutcome::Written { .. } => written += 1,
                        FileOutcome::Skipped { .. } => skipped += 1,
                        FileOutcome::Failed { .. } => failed += 1,
                    }
                    worst = worst.worst(outcome.status());
                }
                Err(e) => {
                    error!("Error processing file {}: {:#}", file_name, e);
                    failed += 1;
                    worst = RunStatus::Failed;
                }
            }
            folder_pb.inc(1);
        }

        folder_pb.finish_and_clear();
        info!(
            "Folder processing completed: {} written, {} skipped, {} failed in {}",
            written,
            skipped,
            failed,
            Self::format_duration(start_time.elapsed())
        );
        Ok(worst)
    }

    /// Check that the environment can run translations: platform, network
    /// and every configured provider
    pub async fn check_environment(&self) -> Vec<CheckItem> {
        let mut items = vec![CheckItem::new(
            "platform",
            true,
            format!("{} {}", std::env::consts::OS, std::env::consts::ARCH),
        )];

        if is_termux() {
            items.push(CheckItem::new("termux", true, "running inside Termux"));
        }
        if is_wsl() {
            items.push(CheckItem::new("wsl", true, "running inside WSL"));
        }

        let dns = tokio::time::timeout(Duration::from_secs(5), tokio::net::lookup_host(CONNECTIVITY_HOST)).await;
        items.push(match dns {
            Ok(Ok(mut addrs)) => match addrs.next() {
                Some(addr) => CheckItem::new("network", true, format!("resolved {} to {}", CONNECTIVITY_HOST, addr.ip())),
                None => CheckItem::new("network", false, format!("no address for {}", CONNECTIVITY_HOST)),
            },
            Ok(Err(e)) => CheckItem::new("network", false, format!("DNS lookup failed: {}", e)),
            Err(_) => CheckItem::new("network", false, "DNS lookup timed out"),
        });

        match self.build_pipeline() {
            Ok(pipeline) => {
                for provider in pipeline.adapter().providers() {
                    let item = match provider.test_connection().await {
                        Ok(()) => CheckItem::new(provider.name(), true, "connection ok"),
                        Err(e) => CheckItem::new(provider.name(), false, e.to_string()),
                    };
                    items.push(item);
                }
            }
            Err(e) => items.push(CheckItem::new("providers", false, format!("{:#}", e))),
        }

        items
    }

    // Format duration in a human-readable format
    fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}

/// Whether the binary runs inside the Termux Android environment
pub fn is_termux() -> bool {
    let exe_in_termux = std::env::current_exe()
        .map(|p| p.to_string_lossy().contains("com.termux"))
        .unwrap_or(false);
    exe_in_termux
        || std::env::var("PREFIX")
            .map(|p| p.contains("com.termux"))
            .unwrap_or(false)
}

/// Whether the binary runs under Windows Subsystem for Linux
pub fn is_wsl() -> bool {
    std::fs::read_to_string("/proc/version")
        .map(|v| v.to_lowercase().contains("microsoft"))
        .unwrap_or(false)
}
