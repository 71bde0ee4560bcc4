//! Retry with exponential backoff for recoverable errors
//!
//! This module provides a retry mechanism with configurable exponential backoff
//! for handling transient failures when interacting with external services.
//!
//! The loop is an explicit state machine:
//!
//! ```text
//! Idle -> Attempting -> Succeeded
//!              |-----> FailedFatal
//!              |-----> FailedRetryable        (budget exhausted)
//!              '-----> Waiting -> Attempting  (budget left)
//! ```
//!
//! The delay between attempts goes through a [`Sleeper`] so that tests can
//! simulate time instead of waiting for it.

use async_trait::async_trait;
use backoff::backoff::Backoff;
use rand::Rng;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::{Result, ServiceError};

/// Retry policy configuration
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Total number of attempts per call, including the first one
    pub max_retries: u32,

    /// Delay after the first failed attempt
    pub initial_interval: Duration,

    /// Upper bound for any single delay
    pub max_interval: Duration,

    /// Multiplier for backoff between retries
    pub multiplier: f64,

    /// Proportional jitter: each delay is stretched by a random factor in `[0, jitter_factor]`
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_interval: Duration::from_millis(1000),
            max_interval: Duration::from_secs(30),
            multiplier: 2.0,
            jitter_factor: 0.1,
        }
    }
}

impl fmt::Display for RetryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RetryConfig {{ max_retries: {}, initial_interval: {:?}, max_interval: {:?}, multiplier: {}, jitter_factor: {} }}",
            self.max_retries,
            self.initial_interval,
            self.max_interval,
            self.multiplier,
            self.jitter_factor
        )
    }
}

impl RetryConfig {
    /// Check that the policy is usable and yields non-decreasing delays
    pub fn validate(&self) -> Result<()> {
        if self.max_retries == 0 {
            return Err(ServiceError::configuration(
                "max_retries must allow at least one attempt",
            ));
        }
        if self.initial_interval > self.max_interval {
            return Err(ServiceError::configuration(format!(
                "initial_interval {:?} exceeds max_interval {:?}",
                self.initial_interval, self.max_interval
            )));
        }
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(ServiceError::configuration(format!(
                "backoff multiplier must be >= 1.0, got {}",
                self.multiplier
            )));
        }
        if !self.jitter_factor.is_finite()
            || self.jitter_factor < 0.0
            || self.jitter_factor > self.multiplier - 1.0
        {
            return Err(ServiceError::configuration(format!(
                "jitter_factor must be within [0, multiplier - 1], got {}",
                self.jitter_factor
            )));
        }
        Ok(())
    }
}

/// Something that can wait for a duration
#[async_trait]
pub trait Sleeper: Send + Sync {
    /// Suspend the current call for `duration`
    async fn sleep(&self, duration: Duration);
}

/// Sleeper backed by the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Sleeper that returns immediately and remembers every requested delay
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    slept: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays requested so far, in order
    pub fn delays(&self) -> Vec<Duration> {
        self.slept
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Sum of all requested delays
    pub fn total(&self) -> Duration {
        self.delays().into_iter().sum()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.slept
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(duration);
    }
}

/// Exponential delay schedule with proportional jitter
///
/// Delay `i` (0-based) is `initial * multiplier^i` capped at `max_interval`,
/// stretched by a random factor in `[0, jitter_factor]` and capped again.
/// As a [`Backoff`] it yields one delay less than the attempt budget, then
/// `None`.
#[derive(Debug, Clone)]
pub struct BackoffSchedule {
    initial_interval: Duration,
    current_interval: Duration,
    max_interval: Duration,
    multiplier: f64,
    jitter_factor: f64,
    delays_left: u32,
    max_delays: u32,
}

impl BackoffSchedule {
    pub fn new(config: &RetryConfig) -> Self {
        let max_delays = config.max_retries.saturating_sub(1);
        Self {
            initial_interval: config.initial_interval,
            current_interval: config.initial_interval.min(config.max_interval),
            max_interval: config.max_interval,
            multiplier: config.multiplier,
            jitter_factor: config.jitter_factor,
            delays_left: max_delays,
            max_delays,
        }
    }

    /// Next delay, advancing the schedule
    pub fn next_delay(&mut self) -> Duration {
        let base = self.current_interval;
        self.current_interval = grow(base, self.multiplier, self.max_interval);

        if self.jitter_factor <= 0.0 {
            return base;
        }
        let r = rand::thread_rng().gen_range(0.0..=self.jitter_factor);
        base.mul_f64(1.0 + r).min(self.max_interval)
    }
}

fn grow(interval: Duration, multiplier: f64, cap: Duration) -> Duration {
    // Stay below the cap without overflowing Duration
    if interval.as_secs_f64() * multiplier >= cap.as_secs_f64() {
        cap
    } else {
        interval.mul_f64(multiplier)
    }
}

impl Backoff for BackoffSchedule {
    fn reset(&mut self) {
        self.current_interval = self.initial_interval.min(self.max_interval);
        self.delays_left = self.max_delays;
    }

    fn next_backoff(&mut self) -> Option<Duration> {
        if self.delays_left == 0 {
            return None;
        }
        self.delays_left -= 1;
        Some(self.next_delay())
    }
}

/// Outcome of a single attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success,
    RetryableFailure,
    FatalFailure,
}

impl fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::RetryableFailure => write!(f, "retryable failure"),
            Self::FatalFailure => write!(f, "fatal failure"),
        }
    }
}

/// One attempt of a retried call
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptRecord {
    /// 1-based attempt number
    pub attempt_number: u32,

    /// Delay waited before this attempt (zero for the first one)
    pub delay: Duration,

    pub outcome: AttemptOutcome,
}

impl AttemptRecord {
    pub fn delay_seconds(&self) -> f64 {
        self.delay.as_secs_f64()
    }
}

/// Result of a retried call together with its attempt history
#[derive(Debug)]
pub struct RetryReport<T> {
    pub outcome: Result<T>,
    pub attempts: Vec<AttemptRecord>,
}

impl<T> RetryReport<T> {
    pub fn attempt_count(&self) -> usize {
        self.attempts.len()
    }

    pub fn into_result(self) -> Result<T> {
        self.outcome
    }
}

/// Phase of the retry state machine, without its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPhase {
    Idle,
    Attempting,
    Waiting,
    Succeeded,
    FailedRetryable,
    FailedFatal,
}

enum RetryState<T> {
    Idle,
    Attempting {
        attempt: u32,
        waited: Duration,
    },
    Waiting {
        attempt: u32,
        delay: Duration,
        error: ServiceError,
    },
    Succeeded {
        attempt: u32,
        value: T,
    },
    FailedRetryable {
        attempt: u32,
        error: ServiceError,
    },
    FailedFatal {
        attempt: u32,
        error: ServiceError,
    },
}

impl<T> RetryState<T> {
    fn phase(&self) -> RetryPhase {
        match self {
            Self::Idle => RetryPhase::Idle,
            Self::Attempting { .. } => RetryPhase::Attempting,
            Self::Waiting { .. } => RetryPhase::Waiting,
            Self::Succeeded { .. } => RetryPhase::Succeeded,
            Self::FailedRetryable { .. } => RetryPhase::FailedRetryable,
            Self::FailedFatal { .. } => RetryPhase::FailedFatal,
        }
    }
}

/// Executor for retry operations with exponential backoff
#[derive(Clone)]
pub struct RetryExecutor {
    /// Retry configuration
    config: RetryConfig,

    sleeper: Arc<dyn Sleeper>,
}

impl fmt::Debug for RetryExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryExecutor")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Default for RetryExecutor {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}

impl RetryExecutor {
    /// Create a new retry executor with the specified configuration
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            sleeper: Arc::new(TokioSleeper),
        }
    }

    /// Replace the sleeper used between attempts
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Get the current retry configuration
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Execute a fallible operation and return only its result
    pub async fn run<F, Fut, T>(&self, operation: &str, op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.execute(operation, op).await.into_result()
    }

    /// Execute a fallible operation with retries according to the configuration
    ///
    /// Attempts are strictly sequential. Non-retryable errors end the call
    /// after the attempt that produced them.
    pub async fn execute<F, Fut, T>(&self, operation: &str, mut op: F) -> RetryReport<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut schedule = BackoffSchedule::new(&self.config);
        let mut attempts: Vec<AttemptRecord> = Vec::new();
        let mut state = RetryState::Idle;

        loop {
            log::trace!("{}: retry state {:?}", operation, state.phase());

            state = match state {
                RetryState::Idle => RetryState::Attempting {
                    attempt: 1,
                    waited: Duration::ZERO,
                },

                RetryState::Attempting { attempt, waited } => {
                    let result = op().await;
                    let (outcome, next) = match result {
                        Ok(value) => (
                            AttemptOutcome::Success,
                            RetryState::Succeeded { attempt, value },
                        ),
                        Err(error) if error.is_retryable() => match schedule.next_backoff() {
                            Some(delay) => (
                                AttemptOutcome::RetryableFailure,
                                RetryState::Waiting {
                                    attempt,
                                    delay,
                                    error,
                                },
                            ),
                            None => (
                                AttemptOutcome::RetryableFailure,
                                RetryState::FailedRetryable { attempt, error },
                            ),
                        },
                        Err(error) => (
                            AttemptOutcome::FatalFailure,
                            RetryState::FailedFatal { attempt, error },
                        ),
                    };

                    log::debug!(
                        "{}: attempt {}/{} after {:.3}s: {}",
                        operation,
                        attempt,
                        self.config.max_retries,
                        waited.as_secs_f64(),
                        outcome
                    );
                    attempts.push(AttemptRecord {
                        attempt_number: attempt,
                        delay: waited,
                        outcome,
                    });
                    next
                }

                RetryState::Waiting {
                    attempt,
                    delay,
                    error,
                } => {
                    log::warn!(
                        "{} failed with retryable error, retrying in {:?} (attempt {}/{}): {}",
                        operation,
                        delay,
                        attempt,
                        self.config.max_retries,
                        error
                    );
                    self.sleeper.sleep(delay).await;
                    RetryState::Attempting {
                        attempt: attempt + 1,
                        waited: delay,
                    }
                }

                RetryState::Succeeded { attempt, value } => {
                    if attempt > 1 {
                        log::info!("{} succeeded after {} attempts", operation, attempt);
                    }
                    return RetryReport {
                        outcome: Ok(value),
                        attempts,
                    };
                }

                RetryState::FailedRetryable { attempt, error } => {
                    log::error!(
                        "{} failed after {} attempts: {}",
                        operation,
                        attempt,
                        error
                    );
                    return RetryReport {
                        outcome: Err(error.with_context_value("attempts", attempt)),
                        attempts,
                    };
                }

                RetryState::FailedFatal { attempt, error } => {
                    log::error!("{} failed with non-retryable error: {}", operation, error);
                    let error = if attempt > 1 {
                        error.with_context_value("attempts", attempt)
                    } else {
                        error
                    };
                    return RetryReport {
                        outcome: Err(error),
                        attempts,
                    };
                }
            };
        }
    }
}
