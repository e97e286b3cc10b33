//! Drives one stage to completion.

use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, error, warn};

use super::PipelineStage;
use crate::error::{SignatureError, StageError};

/// Outcome of a stage that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageReport {
    /// Name of the stage.
    pub name: String,
    /// Number of `do_work` calls that returned `true`.
    pub units: u64,
    /// Wall time from start to stop.
    pub elapsed: Duration,
}

/// Runs a [`PipelineStage`]: start once, work until done, stop once.
///
/// The runner owns the stage and acts as its scope guard: if it is dropped
/// before [`run`](Self::run) finishes (a panic inside a hook, or a thread
/// that failed to spawn), `on_stop` still runs, so queue registrations are
/// always released.
///
/// # Example
///
/// ```
/// use blocksig::{PipelineStage, StageRunner};
///
/// struct Countdown(u32);
///
/// impl PipelineStage for Countdown {
///     fn on_start(&mut self) -> blocksig::Result<()> { Ok(()) }
///     fn do_work(&mut self) -> blocksig::Result<bool> {
///         self.0 -= 1;
///         Ok(self.0 > 0)
///     }
///     fn on_stop(&mut self) -> blocksig::Result<()> { Ok(()) }
/// }
///
/// let report = StageRunner::new("countdown", Countdown(3)).run()?;
/// assert_eq!(report.units, 2);
/// # Ok::<(), blocksig::StageError>(())
/// ```
pub struct StageRunner<S: PipelineStage> {
    name: String,
    stage: S,
    stopped: bool,
}

impl<S: PipelineStage> StageRunner<S> {
    /// Wraps `stage` under the given name.
    pub fn new(name: impl Into<String>, stage: S) -> Self {
        Self {
            name: name.into(),
            stage,
            stopped: false,
        }
    }

    /// Returns the stage name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs the stage on the calling thread.
    ///
    /// Errors from any hook are logged with the stage name and returned; the
    /// first error wins, and `on_stop` runs even when `on_start` or
    /// `do_work` failed.
    pub fn run(mut self) -> Result<StageReport, StageError> {
        let started = Instant::now();
        debug!(stage = %self.name, "Starting stage");

        let outcome = self.drive();
        self.stopped = true;
        let stopped = self.stage.on_stop();

        let result = match (outcome, stopped) {
            (Ok(units), Ok(())) => Ok(units),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(stop_err)) => {
                warn!(stage = %self.name, error = %stop_err, "Stage teardown failed after an earlier error");
                Err(e)
            }
        };

        match result {
            Ok(units) => {
                let elapsed = started.elapsed();
                debug!(stage = %self.name, units, ?elapsed, "Stopped stage");
                Ok(StageReport {
                    name: self.name.clone(),
                    units,
                    elapsed,
                })
            }
            Err(source) => {
                error!(stage = %self.name, error = %source, "Unhandled error during stage execution");
                Err(StageError::new(self.name.clone(), source))
            }
        }
    }

    fn drive(&mut self) -> Result<u64, SignatureError> {
        self.stage.on_start()?;
        let mut units = 0u64;
        while self.stage.do_work()? {
            units += 1;
        }
        Ok(units)
    }
}

impl<S: PipelineStage + Send + 'static> StageRunner<S> {
    /// Runs the stage on a dedicated, named thread.
    ///
    /// If the thread cannot be created the runner is dropped, which stops
    /// the stage.
    pub fn spawn(self) -> Result<JoinHandle<Result<StageReport, StageError>>, SignatureError> {
        let name = self.name.clone();
        thread::Builder::new()
            .name(name.clone())
            .spawn(move || self.run())
            .map_err(|source| SignatureError::SpawnFailed {
                stage: name,
                source,
            })
    }
}

impl<S: PipelineStage> Drop for StageRunner<S> {
    fn drop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        warn!(stage = %self.name, "Stage abandoned before completion, stopping it");
        if let Err(e) = self.stage.on_stop() {
            error!(stage = %self.name, error = %e, "Stage teardown failed");
        }
    }
}
