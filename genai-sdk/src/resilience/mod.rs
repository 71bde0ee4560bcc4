//! Resilience patterns for service clients
//!
//! Calls to the generative service go through a [`RetryExecutor`]: retry with
//! exponential backoff and proportional jitter, an injectable [`Sleeper`],
//! and a per-call [`RetryReport`] listing every attempt.

mod retry;

pub use retry::{
    AttemptOutcome, AttemptRecord, BackoffSchedule, RecordingSleeper, RetryConfig,
    RetryExecutor, RetryPhase, RetryReport, Sleeper, TokioSleeper,
};
