/*!
 * Pipeline orchestrator for one localization document.
 *
 * Phases run in sequence:
 * 1. Repair: parse the raw text, applying conservative fixes
 * 2. Translate: mask every translatable value and send it through the
 *    adapter, a bounded number of entries at a time
 * 3. Post-fix: clean up the provider's answer and restore tokens
 * 4. Verify: compare source and translation fingerprints
 *
 * Entry-level failures revert the entry to its source value and are
 * recorded in the manifest; only a parse error stops the run.
 */

use anyhow::Result;
use futures::stream::{self, StreamExt};
use log::{debug, info, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use super::manifest::{EntryFailure, Manifest, RunStatus};
use crate::app_config::Config;
use crate::document::{Document, parse};
use crate::errors::ParseError;
use crate::integrity::{IntegrityReport, verify};
use crate::shield::{ShieldedValue, TokenShield};
use crate::translation::{AdapterOutcome, RequestCounter, TranslationAdapter, post_fix};

/// Progress callback: (entries finished, entries to translate)
pub type ProgressCallback<'a> = &'a (dyn Fn(usize, usize) + Send + Sync);

/// Configuration for the translation pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub source_language: String,
    pub target_language: String,
    /// Entries translated concurrently
    pub concurrent_requests: usize,
    /// Keys allowed to become empty
    pub intentionally_blank: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source_language: "en".to_string(),
            target_language: "it".to_string(),
            concurrent_requests: 4,
            intentionally_blank: Vec::new(),
        }
    }
}

impl PipelineConfig {
    pub fn new(source_language: &str, target_language: &str) -> Self {
        Self {
            source_language: source_language.to_string(),
            target_language: target_language.to_string(),
            ..Default::default()
        }
    }

    /// Pipeline settings of an application configuration
    pub fn from_config(config: &Config) -> Self {
        Self {
            source_language: config.source_language.clone(),
            target_language: config.target_language.clone(),
            concurrent_requests: config.translation.common.concurrent_requests,
            intentionally_blank: config.intentionally_blank.clone(),
        }
    }

    pub fn with_concurrency(mut self, concurrent_requests: usize) -> Self {
        self.concurrent_requests = concurrent_requests.max(1);
        self
    }

    pub fn with_intentionally_blank<S: AsRef<str>>(mut self, keys: &[S]) -> Self {
        self.intentionally_blank = keys.iter().map(|k| k.as_ref().to_string()).collect();
        self
    }
}

/// Shared flag that stops new entries from being started
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Result of a completed run
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Repaired source document
    pub source: Document,
    /// Translated document, same keys and order as `source`
    pub document: Document,
    pub report: IntegrityReport,
    pub manifest: Manifest,
}

impl RunOutcome {
    pub fn status(&self) -> RunStatus {
        self.manifest.status()
    }

    /// Whether the parser had to repair the input
    pub fn was_repaired(&self) -> bool {
        !self.manifest.fixes.is_empty()
    }
}

// @struct: One entry queued for translation
struct Job {
    index: usize,
    key: String,
    line: usize,
    shielded: ShieldedValue,
}

enum JobResult {
    Done(AdapterOutcome),
    Cancelled,
}

/// The translation pipeline for a single document.
#[derive(Debug)]
pub struct TranslationPipeline {
    config: PipelineConfig,
    shield: TokenShield,
    adapter: TranslationAdapter,
    cancel: CancellationFlag,
}

impl TranslationPipeline {
    pub fn new(config: PipelineConfig, shield: TokenShield, adapter: TranslationAdapter) -> Self {
        Self {
            config,
            shield,
            adapter,
            cancel: CancellationFlag::new(),
        }
    }

    /// Build shield, providers and throttles from an application configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let adapter = TranslationAdapter::from_config(&config.translation, RequestCounter::new())?;
        Ok(Self::new(
            PipelineConfig::from_config(config),
            config.shield.build_shield(),
            adapter,
        ))
    }

    /// Use an externally controlled cancellation flag
    pub fn with_cancellation(mut self, cancel: CancellationFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation(&self) -> &CancellationFlag {
        &self.cancel
    }

    pub fn shield(&self) -> &TokenShield {
        &self.shield
    }

    pub fn adapter(&self) -> &TranslationAdapter {
        &self.adapter
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Translate a raw document.
    ///
    /// Fails only when the document cannot be parsed.
    pub async fn run(&self, raw: &str, progress: Option<ProgressCallback<'_>>) -> Result<RunOutcome, ParseError> {
        let start_time = Instant::now();

        // Phase 1: repair
        let parsed = parse(raw)?;
        if parsed.was_repaired() {
            info!("Applied {} repair(s) to the input", parsed.fixes.len());
        }
        let mut source = parsed.document;
        source.annotate_tokens(&self.shield);
        source.mark_intentionally_blank(&self.config.intentionally_blank);

        let mut manifest = Manifest::new(&self.config.source_language, &self.config.target_language);
        manifest.fixes = parsed.fixes;
        manifest.review = parsed.review;
        manifest.providers = self.adapter.provider_names();
        manifest.stats.entries = source.len();

        // Phase 2: translate
        let mut jobs = Vec::new();
        for (index, entry) in source.entries.iter().enumerate() {
            if !entry.is_translatable() {
                continue;
            }
            manifest.stats.translatable += 1;

            let shielded = TokenShield::mask_detected(&entry.value, entry.tokens.clone());
            if shielded.is_only_markers() {
                debug!("Skipping token-only value of {}", entry.key);
                manifest.stats.skipped += 1;
                continue;
            }
            jobs.push(Job {
                index,
                key: entry.key.clone(),
                line: entry.line,
                shielded,
            });
        }

        let total = jobs.len();
        info!(
            "Translating {} of {} entries from {} to {}",
            total,
            source.len(),
            self.config.source_language,
            self.config.target_language
        );

        let adapter = &self.adapter;
        let cancel = &self.cancel;
        let source_language = self.config.source_language.as_str();
        let target_language = self.config.target_language.as_str();

        let mut results = stream::iter(jobs)
            .map(|job| async move {
                if cancel.is_cancelled() {
                    return (job, JobResult::Cancelled);
                }
                let outcome = adapter
                    .translate(&job.shielded.masked, source_language, target_language)
                    .await;
                (job, JobResult::Done(outcome))
            })
            .buffer_unordered(self.config.concurrent_requests.max(1));

        // Phase 3: post-fix and unmask
        let mut translated = source.clone();
        let mut finished = 0;
        while let Some((job, result)) = results.next().await {
            finished += 1;
            if let Some(callback) = progress {
                callback(finished, total);
            }

            match result {
                JobResult::Cancelled => manifest.failures.push(EntryFailure::Cancelled {
                    key: job.key,
                    line: job.line,
                }),
                JobResult::Done(AdapterOutcome::Translated { text, provider, .. }) => {
                    let cleaned = post_fix(&job.shielded.masked, &text);
                    match self.shield.unmask(&cleaned, &job.shielded.tokens) {
                        Ok(value) => {
                            debug!("{} translated by {}", job.key, provider);
                            translated.entries[job.index].set_value(&value);
                            manifest.stats.translated += 1;
                        }
                        Err(loss) => {
                            warn!("{}: {}", job.key, loss);
                            manifest.failures.push(EntryFailure::TokenLoss {
                                key: job.key,
                                line: job.line,
                                loss,
                            });
                        }
                    }
                }
                JobResult::Done(outcome @ AdapterOutcome::Failed { .. }) => {
                    let error = outcome.into_result(adapter.provider_count()).err();
                    let error = error.map(|e| e.to_string()).unwrap_or_default();
                    warn!("{}: translation failed: {}", job.key, error);
                    manifest.failures.push(EntryFailure::TranslationFailed {
                        key: job.key,
                        line: job.line,
                        error,
                    });
                }
            }
        }
        drop(results);
        manifest.failures.sort_by_key(|f| f.line());

        if cancel.is_cancelled() {
            warn!("Run cancelled; {} entries kept their source value", manifest.cancelled().count());
        }

        // Phase 4: verify
        let report = verify(&source, &translated, &self.shield);
        manifest.violations = report.violations.clone();
        manifest.stats.requests = adapter.counter().started();
        manifest.stats.failed_requests = adapter.counter().failed();
        manifest.stats.duration = start_time.elapsed();

        info!("{}", manifest.summary());
        Ok(RunOutcome {
            source,
            document: translated,
            report,
            manifest,
        })
    }
}
