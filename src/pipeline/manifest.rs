/*!
 * Run manifest: everything a translation run repaired, skipped, reverted
 * or found suspicious, with the overall status.
 *
 * The manifest is written next to the output as plain text.
 */

use chrono::Local;
use std::fmt;
use std::fmt::Write as _;
use std::path::PathBuf;
use std::time::Duration;

use crate::document::{AppliedFix, ReviewFlag};
use crate::errors::TokenLossError;
use crate::integrity::IntegrityViolation;

/// Worst severity reached by a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RunStatus {
    Success,
    Degraded,
    Failed,
}

impl RunStatus {
    /// Process exit code for the status
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Success => 0,
            Self::Failed => 1,
            Self::Degraded => 2,
        }
    }

    pub fn worst(self, other: Self) -> Self {
        self.max(other)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Success => "SUCCESS",
            Self::Degraded => "DEGRADED",
            Self::Failed => "FAILED",
        })
    }
}

/// Why an entry kept its source value
#[derive(Debug, Clone, PartialEq)]
pub enum EntryFailure {
    /// Every provider failed
    TranslationFailed { key: String, line: usize, error: String },
    /// A protected token did not come back
    TokenLoss { key: String, line: usize, loss: TokenLossError },
    /// The run was cancelled before the entry was started
    Cancelled { key: String, line: usize },
}

impl EntryFailure {
    pub fn key(&self) -> &str {
        match self {
            Self::TranslationFailed { key, .. } | Self::TokenLoss { key, .. } | Self::Cancelled { key, .. } => key,
        }
    }

    pub fn line(&self) -> usize {
        match self {
            Self::TranslationFailed { line, .. } | Self::TokenLoss { line, .. } | Self::Cancelled { line, .. } => *line,
        }
    }
}

impl fmt::Display for EntryFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TranslationFailed { key, line, error } => write!(f, "line {} ({}): {}", line, key, error),
            Self::TokenLoss { key, line, loss } => {
                let lost: Vec<String> = loss.lost.iter().map(|t| t.to_string()).collect();
                write!(f, "line {} ({}): {}", line, key, lost.join("; "))
            }
            Self::Cancelled { key, line } => write!(f, "line {} ({}): not translated, run cancelled", line, key),
        }
    }
}

/// Counters of a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Entries in the document
    pub entries: usize,
    /// Entries eligible for translation
    pub translatable: usize,
    /// Entries whose value was replaced
    pub translated: usize,
    /// Entries made only of protected tokens, left as is
    pub skipped: usize,
    /// Provider requests sent
    pub requests: u64,
    /// Provider requests that failed
    pub failed_requests: u64,
    pub duration: Duration,
}

/// Everything reported about one run
#[derive(Debug, Clone)]
pub struct Manifest {
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub source_language: String,
    pub target_language: String,
    pub providers: Vec<String>,
    pub fixes: Vec<AppliedFix>,
    pub review: Vec<ReviewFlag>,
    pub failures: Vec<EntryFailure>,
    pub violations: Vec<IntegrityViolation>,
    pub stats: RunStats,
    /// Fatal error that stopped the run
    pub fatal: Option<String>,
}

impl Manifest {
    pub fn new(source_language: &str, target_language: &str) -> Self {
        Self {
            input: None,
            output: None,
            source_language: source_language.to_string(),
            target_language: target_language.to_string(),
            providers: Vec::new(),
            fixes: Vec::new(),
            review: Vec::new(),
            failures: Vec::new(),
            violations: Vec::new(),
            stats: RunStats::default(),
            fatal: None,
        }
    }

    /// Manifest of a run stopped by a fatal error
    pub fn failed(source_language: &str, target_language: &str, error: impl fmt::Display) -> Self {
        let mut manifest = Self::new(source_language, target_language);
        manifest.fatal = Some(error.to_string());
        manifest
    }

    /// Worst severity: fatal error, then any reverted entry or violation
    pub fn status(&self) -> RunStatus {
        if self.fatal.is_some() {
            RunStatus::Failed
        } else if !self.failures.is_empty() || !self.violations.is_empty() {
            RunStatus::Degraded
        } else {
            RunStatus::Success
        }
    }

    pub fn translation_failures(&self) -> impl Iterator<Item = &EntryFailure> {
        self.failures
            .iter()
            .filter(|f| matches!(f, EntryFailure::TranslationFailed { .. }))
    }

    pub fn token_losses(&self) -> impl Iterator<Item = &EntryFailure> {
        self.failures.iter().filter(|f| matches!(f, EntryFailure::TokenLoss { .. }))
    }

    pub fn cancelled(&self) -> impl Iterator<Item = &EntryFailure> {
        self.failures.iter().filter(|f| matches!(f, EntryFailure::Cancelled { .. }))
    }

    /// One-line summary for logs
    pub fn summary(&self) -> String {
        format!(
            "{}: {}/{} entries translated, {} fix(es), {} review, {} failed, {} token loss, {} cancelled, {} violation(s)",
            self.status(),
            self.stats.translated,
            self.stats.translatable,
            self.fixes.len(),
            self.review.len(),
            self.translation_failures().count(),
            self.token_losses().count(),
            self.cancelled().count(),
            self.violations.len()
        )
    }

    /// Human-readable manifest text
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# mclt translation manifest");
        let _ = writeln!(out, "Generated: {}", Local::now().format("%Y-%m-%d %H:%M:%S"));
        let _ = writeln!(out, "Status: {}", self.status());
        if let Some(input) = &self.input {
            let _ = writeln!(out, "Input: {}", input.display());
        }
        if let Some(output) = &self.output {
            let _ = writeln!(out, "Output: {}", output.display());
        }
        let _ = writeln!(out, "Languages: {} -> {}", self.source_language, self.target_language);
        if !self.providers.is_empty() {
            let _ = writeln!(out, "Providers: {}", self.providers.join(", "));
        }
        if let Some(fatal) = &self.fatal {
            let _ = writeln!(out, "Fatal error: {}", fatal);
        }
        let _ = writeln!(
            out,
            "Entries: {} total, {} translatable, {} translated, {} token-only",
            self.stats.entries, self.stats.translatable, self.stats.translated, self.stats.skipped
        );
        let _ = writeln!(
            out,
            "Requests: {} sent, {} failed, {:.1}s",
            self.stats.requests,
            self.stats.failed_requests,
            self.stats.duration.as_secs_f32()
        );

        section(&mut out, "Applied fixes", self.fixes.iter());
        section(&mut out, "Manual review", self.review.iter());
        section(&mut out, "TranslationFailed", self.translation_failures());
        section(&mut out, "TokenLoss", self.token_losses());
        section(&mut out, "Cancelled", self.cancelled());
        section(&mut out, "Integrity violations", self.violations.iter());
        out
    }
}

fn section<T: fmt::Display>(out: &mut String, title: &str, items: impl Iterator<Item = T>) {
    let lines: Vec<String> = items.map(|i| format!("  - {}", i)).collect();
    let _ = writeln!(out, "\n## {} ({})", title, lines.len());
    for line in lines {
        let _ = writeln!(out, "{}", line);
    }
}
