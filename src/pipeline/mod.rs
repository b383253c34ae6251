/*!
 * Document-level translation runs.
 *
 * - `orchestrator`: repair, translate, post-fix and verify one document
 * - `manifest`: what a run changed, reverted and found
 */

pub mod manifest;
pub mod orchestrator;

pub use manifest::{EntryFailure, Manifest, RunStats, RunStatus};
pub use orchestrator::{CancellationFlag, PipelineConfig, RunOutcome, TranslationPipeline};
