//! Payment poller state machine.
//!
//! All transitions go through [`Machine`]. Each polling run is tagged with a
//! generation; anything reported for an older generation is discarded, which
//! is how a response arriving after `stop` is kept from touching state.

use thiserror::Error;

use crate::{
    api::models::PaymentStatus,
    domain::payments::errors::PollerError,
};

/// Why a payment did not complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PaymentFailure {
    /// The backend reported the order as cancelled.
    #[error("payment failed")]
    Cancelled,

    /// The status never became terminal within the attempt budget.
    #[error("status check timeout")]
    TimedOut,
}

/// Result of a polling run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Paid(PaymentStatus),
    Failed(PaymentFailure),

    /// Polling was stopped before a terminal status was seen.
    Stopped,
}

/// Classification of a single status check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCheck {
    Succeeded,
    Failed,
    Pending,
}

impl From<&PaymentStatus> for StatusCheck {
    fn from(status: &PaymentStatus) -> Self {
        if status.status.is_settled() {
            Self::Succeeded
        } else if status.status.is_failed() {
            Self::Failed
        } else {
            Self::Pending
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PollerState {
    #[default]
    Idle,
    Initiating,
    Polling {
        attempts: u32,
    },
    Done(PollOutcome),
}

impl PollerState {
    pub fn is_polling(&self) -> bool {
        matches!(self, Self::Polling { .. })
    }
}

#[derive(Debug)]
pub(crate) enum Step {
    Continue,
    Finished(PollOutcome),
    Stale,
}

#[derive(Debug, Default)]
pub(crate) struct Machine {
    state: PollerState,
    generation: u64,
}

impl Machine {
    pub(crate) fn state(&self) -> &PollerState {
        &self.state
    }

    pub(crate) fn is_current(&self, generation: u64) -> bool {
        self.generation == generation && self.state.is_polling()
    }

    fn ensure_free(&self) -> Result<(), PollerError> {
        match self.state {
            PollerState::Idle | PollerState::Done(_) => Ok(()),
            PollerState::Initiating => Err(PollerError::Initiating),
            PollerState::Polling { .. } => Err(PollerError::AlreadyPolling),
        }
    }

    pub(crate) fn begin_initiate(&mut self) -> Result<(), PollerError> {
        self.ensure_free()?;

        self.state = PollerState::Initiating;

        Ok(())
    }

    pub(crate) fn finish_initiate(&mut self) {
        if self.state == PollerState::Initiating {
            self.state = PollerState::Idle;
        }
    }

    /// Enter polling and return the generation of the new run.
    pub(crate) fn begin_polling(&mut self) -> Result<u64, PollerError> {
        self.ensure_free()?;

        self.generation += 1;
        self.state = PollerState::Polling { attempts: 0 };

        Ok(self.generation)
    }

    /// Count one status check. `None` when the run is no longer current.
    pub(crate) fn record_attempt(&mut self, generation: u64) -> Option<u32> {
        if self.generation != generation {
            return None;
        }

        let PollerState::Polling { attempts } = &mut self.state else {
            return None;
        };

        *attempts += 1;

        Some(*attempts)
    }

    /// Apply the result of a status check. `status` is `None` when the
    /// check itself failed, which counts as still pending.
    pub(crate) fn observe(
        &mut self,
        generation: u64,
        status: Option<&PaymentStatus>,
        max_attempts: u32,
    ) -> Step {
        if !self.is_current(generation) {
            return Step::Stale;
        }

        let PollerState::Polling { attempts } = self.state else {
            return Step::Stale;
        };

        let outcome = match status.map(StatusCheck::from) {
            Some(StatusCheck::Succeeded) => status.cloned().map(PollOutcome::Paid),
            Some(StatusCheck::Failed) => Some(PollOutcome::Failed(PaymentFailure::Cancelled)),
            Some(StatusCheck::Pending) | None if attempts >= max_attempts => {
                Some(PollOutcome::Failed(PaymentFailure::TimedOut))
            }
            Some(StatusCheck::Pending) | None => None,
        };

        match outcome {
            Some(outcome) => {
                self.state = PollerState::Done(outcome.clone());

                Step::Finished(outcome)
            }
            None => Step::Continue,
        }
    }

    /// Return to idle if `generation` is still the running poll, e.g. when
    /// its future was dropped before reaching an outcome.
    pub(crate) fn abandon(&mut self, generation: u64) {
        if self.is_current(generation) {
            self.stop();
        }
    }

    /// Return to idle and invalidate the current run.
    pub(crate) fn stop(&mut self) {
        self.generation += 1;
        self.state = PollerState::Idle;
    }
}
