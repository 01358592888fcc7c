//! The generic post-condition (CAS) emulator (§4.6).
//!
//! A provider whose native dialect can't express some leaf pairs this with
//! its own version-tokened storage: `step` does one consistent read,
//! evaluates the condition in-memory, and hands back either a verdict or
//! the version to guard the write with; `commit` attempts that guarded
//! write. The loop retries on a lost race with bounded exponential
//! back-off and jitter, exhausting into a write-conflict after
//! `RetryConfig::max_attempts`.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

use polystore_common::config::RetryConfig;
use polystore_common::Result;

/// One read-and-check step's verdict.
pub enum CasStep<T> {
    /// The condition (or an overwrite/existence guard) did not hold; stop
    /// without writing. Carries the HTTP-style status the caller should
    /// surface (412 condition failure, 409 overwrite refused, 404
    /// missing), not always 412 — that distinction is the caller's to make.
    Rejected { status_code: u16, message: String },
    /// The guard holds. `expected_version` is the version the write must
    /// still observe for the commit to apply; `payload` is whatever the
    /// caller needs at commit time to perform the write.
    Proceed { expected_version: u64, payload: T },
}

/// The loop's terminal outcome.
pub enum CasOutcome<T> {
    Committed(T),
    Rejected { status_code: u16, message: String },
    /// The retry budget was exhausted without ever observing a stable
    /// version — surfaces as a 409 write-conflict (§7).
    Exhausted,
}

/// Drives the read-check-write retry loop.
///
/// # Errors
/// Propagates any error `step` or `commit` returns; the loop itself does
/// not fail on contention, only on genuine backend errors.
pub async fn run_cas_loop<T, StepFut, CommitFut>(
    retry: &RetryConfig,
    mut step: impl FnMut() -> StepFut,
    mut commit: impl FnMut(u64, &T) -> CommitFut,
) -> Result<CasOutcome<T>>
where
    StepFut: Future<Output = Result<CasStep<T>>>,
    CommitFut: Future<Output = Result<bool>>,
{
    for attempt in 0..retry.max_attempts {
        match step().await? {
            CasStep::Rejected { status_code, message } => {
                return Ok(CasOutcome::Rejected { status_code, message })
            }
            CasStep::Proceed {
                expected_version,
                payload,
            } => {
                if commit(expected_version, &payload).await? {
                    return Ok(CasOutcome::Committed(payload));
                }
                warn!(attempt, expected_version, "CAS write conflict, retrying");
                tokio::time::sleep(Duration::from_millis(jittered_delay_ms(retry, attempt))).await;
            }
        }
    }
    Ok(CasOutcome::Exhausted)
}

fn jittered_delay_ms(retry: &RetryConfig, attempt: u32) -> u64 {
    let base = retry.backoff_delay_ms(attempt);
    if retry.jitter_fraction <= 0.0 || base == 0 {
        return base;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let jitter_span = (base as f64 * retry.jitter_fraction) as u64;
    if jitter_span == 0 {
        return base;
    }
    let jitter = rand::thread_rng().gen_range(0..=jitter_span);
    base.saturating_sub(jitter_span / 2).saturating_add(jitter)
}
