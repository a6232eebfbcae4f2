//! RetryDriver — wraps a fallible task with the bad-file/retry policy
//! (spec §4.6). Faithful to the original `Runner.automatic_retries`.

use crate::error::RunnerError;

/// Chain substrings that, on the final attempt with `skip_bad_files`, are
/// treated as a transient failure to skip rather than propagate.
const TRANSIENT_MARKERS: &[&str] = &["Invalid redirect URL", "Operation expired", "Socket timeout"];

#[derive(Debug, Clone, Copy)]
pub struct RetryDriver {
    retries: u32,
    skip_bad_files: bool,
}

impl RetryDriver {
    pub fn new(retries: u32, skip_bad_files: bool) -> Self {
        Self {
            retries,
            skip_bad_files,
        }
    }

    /// Run `f`, retrying per the policy. `Ok(None)` means the task was
    /// skipped under the bad-file policy; `Ok(Some(_))` is a successful
    /// result (possibly after retries); `Err` is a fatal, unretried failure.
    pub fn run<T>(&self, mut f: impl FnMut() -> Result<T, RunnerError>) -> Result<Option<T>, RunnerError> {
        let mut retry_count = 0u32;
        loop {
            match f() {
                Ok(v) => return Ok(Some(v)),
                Err(e) => {
                    let is_final_attempt = retry_count == self.retries;

                    if self.skip_bad_files && e.is_bad_file() {
                        tracing::warn!(error = %e, "skipping bad file");
                        return Ok(None);
                    }

                    if e.chain_contains("Auth failed") {
                        return Err(e);
                    }

                    if is_final_attempt {
                        if self.skip_bad_files && TRANSIENT_MARKERS.iter().any(|m| e.chain_contains(m)) {
                            tracing::warn!(error = %e, "skipping after exhausting retries on a transient error");
                            return Ok(None);
                        }
                        return Err(e);
                    }

                    tracing::warn!(
                        attempt = retry_count + 1,
                        max_attempts = self.retries + 1,
                        error = %e,
                        "retrying"
                    );
                    retry_count += 1;
                }
            }
        }
    }
}
