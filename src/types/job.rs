//! Job and result types for the worker pools

use super::error::CoreError;

/// Job identifier
///
/// Chosen by the submitter. Results carry the same id back so callers can
/// correlate them with what they submitted.
pub type JobId = u64;

/// A unit of work submitted to a pool
#[derive(Debug, Clone, PartialEq)]
pub struct Job<P> {
    /// Job identity
    pub id: JobId,

    /// Opaque payload handed to the processing function
    pub payload: P,
}

impl<P> Job<P> {
    /// Create a new job
    pub fn new(id: JobId, payload: P) -> Self {
        Job { id, payload }
    }
}

/// Outcome of processing a single job
///
/// Exactly one `JobResult` is produced per submitted job. A failed or
/// cancelled job still yields a result, with `outcome` holding the error.
#[derive(Debug, Clone, PartialEq)]
pub struct JobResult<O> {
    /// Identity of the job this result belongs to
    pub job: JobId,

    /// The processing output, or why there is none
    pub outcome: Result<O, CoreError>,
}

impl<O> JobResult<O> {
    /// Build a successful result
    pub fn success(job: JobId, output: O) -> Self {
        JobResult {
            job,
            outcome: Ok(output),
        }
    }

    /// Build a failed result
    pub fn failure(job: JobId, error: CoreError) -> Self {
        JobResult {
            job,
            outcome: Err(error),
        }
    }

    /// Whether the job completed successfully
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    /// The output value, if the job succeeded
    pub fn output(&self) -> Option<&O> {
        self.outcome.as_ref().ok()
    }

    /// The failure, if the job did not succeed
    pub fn error(&self) -> Option<&CoreError> {
        self.outcome.as_ref().err()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_result_accessors() {
        let result = JobResult::success(7, 14);

        assert!(result.is_success());
        assert_eq!(result.output(), Some(&14));
        assert_eq!(result.error(), None);
    }

    #[test]
    fn test_failure_result_accessors() {
        let result: JobResult<i64> = JobResult::failure(3, CoreError::job_failed(3, "boom"));

        assert!(!result.is_success());
        assert_eq!(result.output(), None);
        assert_eq!(result.error(), Some(&CoreError::job_failed(3, "boom")));
    }
}
