/*!
 * Translation of masked values through external providers.
 *
 * - `adapter`: fallback chain with retry, backoff and per-attempt timeout
 * - `throttle`: per-provider concurrency and rate limiting, run-wide counter
 * - `cleanup`: post-fix rules applied to provider answers
 */

pub mod adapter;
pub mod cleanup;
pub mod throttle;

pub use adapter::{AdapterOutcome, RetryPolicy, TranslationAdapter};
pub use cleanup::post_fix;
pub use throttle::{ProviderThrottle, RequestCounter};
