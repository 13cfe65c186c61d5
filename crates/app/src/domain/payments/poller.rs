//! Payment status poller.

use std::{fmt, sync::Arc, time::Duration};

use tokio::{
    sync::{Mutex, Notify},
    time::{self, MissedTickBehavior},
};
use tracing::{debug, info, warn};

use crate::{
    api::{
        StorefrontApi,
        models::{OrderUuid, PaymentRedirect, PaymentRequest, PaymentStatus},
    },
    domain::payments::{
        errors::PollerError,
        machine::{Machine, PollOutcome, PollerState, StatusCheck, Step},
    },
};

/// Delay between status checks unless configured otherwise.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(3_000);

/// Status checks before polling gives up, about five minutes at the default
/// interval.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 100;

const INITIATION_FAILED: &str = "The payment could not be started.";

/// Polling cadence and attempt budget. Both are always non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollerConfig {
    poll_interval: Duration,
    max_attempts: u32,
}

impl PollerConfig {
    pub fn new(poll_interval: Duration, max_attempts: u32) -> Result<Self, PollerError> {
        if poll_interval.is_zero() {
            return Err(PollerError::ZeroInterval);
        }

        if max_attempts == 0 {
            return Err(PollerError::ZeroAttempts);
        }

        Ok(Self {
            poll_interval,
            max_attempts,
        })
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    machine: Machine,
    last_status: Option<PaymentStatus>,
    last_error: Option<String>,
}

#[derive(Debug, Default)]
struct Shared {
    inner: Mutex<Inner>,
    stop: Notify,
}

/// Frees the machine when a polling future is dropped before it finishes.
struct AbandonOnDrop {
    shared: Arc<Shared>,
    generation: u64,
}

impl Drop for AbandonOnDrop {
    fn drop(&mut self) {
        let generation = self.generation;

        if let Ok(mut inner) = self.shared.inner.try_lock() {
            inner.machine.abandon(generation);

            return;
        }

        // The lock is held elsewhere; finish the release once it is free.
        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            let shared = Arc::clone(&self.shared);

            runtime.spawn(async move {
                shared.inner.lock().await.machine.abandon(generation);
            });
        }
    }
}

/// Tracks the payment of one order.
///
/// Cloning yields a handle to the same poller, so one task can await
/// [`start_polling`](Self::start_polling) while another calls
/// [`stop_polling`](Self::stop_polling).
#[derive(Clone)]
pub struct PaymentPoller {
    api: Arc<dyn StorefrontApi>,
    order: OrderUuid,
    config: PollerConfig,
    shared: Arc<Shared>,
}

impl fmt::Debug for PaymentPoller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaymentPoller")
            .field("order", &self.order)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl PaymentPoller {
    #[must_use]
    pub fn new(api: Arc<dyn StorefrontApi>, order: OrderUuid, config: PollerConfig) -> Self {
        Self {
            api,
            order,
            config,
            shared: Arc::default(),
        }
    }

    pub fn order(&self) -> OrderUuid {
        self.order
    }

    pub async fn state(&self) -> PollerState {
        self.shared.inner.lock().await.machine.state().clone()
    }

    /// Status seen by the most recent successful check.
    pub async fn last_status(&self) -> Option<PaymentStatus> {
        self.shared.inner.lock().await.last_status.clone()
    }

    /// Message from the most recent failed call.
    pub async fn last_error(&self) -> Option<String> {
        self.shared.inner.lock().await.last_error.clone()
    }

    /// Start a payment and return the external payment page URL.
    ///
    /// Polling is not started: it only makes sense once the shopper is back
    /// from the payment page. Failures are reported through
    /// [`last_error`](Self::last_error) and a `None` result.
    pub async fn initiate_payment(&self, request: PaymentRequest) -> Option<String> {
        {
            let mut inner = self.shared.inner.lock().await;

            if let Err(error) = inner.machine.begin_initiate() {
                warn!(order = %self.order, %error, "refusing to initiate payment");

                inner.last_error = Some(error.to_string());

                return None;
            }
        }

        let result = self.api.initiate_payment(request).await;

        let mut inner = self.shared.inner.lock().await;

        inner.machine.finish_initiate();

        match result {
            Ok(PaymentRedirect {
                redirect_url: Some(url),
                ..
            }) => {
                info!(order = %self.order, "payment initiated");

                inner.last_error = None;

                Some(url)
            }
            Ok(PaymentRedirect { error, .. }) => {
                let message = error.unwrap_or_else(|| INITIATION_FAILED.to_string());

                warn!(order = %self.order, %message, "payment initiation rejected");

                inner.last_error = Some(message);

                None
            }
            Err(error) => {
                warn!(order = %self.order, %error, "payment initiation failed");

                inner.last_error = Some(error.user_message());

                None
            }
        }
    }

    /// Fetch the status once. A failed fetch counts as pending.
    ///
    /// This does not change the polling state; a running poll observes the
    /// backend on its own schedule.
    pub async fn check_payment_status(&self) -> StatusCheck {
        let response = self.api.get_payment_status(self.order).await;

        let mut inner = self.shared.inner.lock().await;

        match response {
            Ok(status) => {
                let check = StatusCheck::from(&status);

                debug!(order = %self.order, status = ?status.status, "payment status checked");

                inner.last_status = Some(status);
                inner.last_error = None;

                check
            }
            Err(error) => {
                warn!(order = %self.order, %error, "payment status check failed");

                inner.last_error = Some(error.user_message());

                StatusCheck::Pending
            }
        }
    }

    /// Poll until the payment settles, fails, times out or is stopped.
    ///
    /// The first check runs immediately and then once per interval. Only one
    /// run may be active at a time. Dropping the returned future before it
    /// resolves returns the poller to idle.
    pub async fn start_polling(&self) -> Result<PollOutcome, PollerError> {
        let generation = self.shared.inner.lock().await.machine.begin_polling()?;

        let _abandon = AbandonOnDrop {
            shared: Arc::clone(&self.shared),
            generation,
        };

        info!(
            order = %self.order,
            interval = ?self.config.poll_interval,
            max_attempts = self.config.max_attempts,
            "polling payment status"
        );

        let mut ticker = time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                () = self.shared.stop.notified() => {
                    debug!(order = %self.order, "polling stopped");

                    return Ok(PollOutcome::Stopped);
                }
            }

            let Some(attempt) = self
                .shared
                .inner
                .lock()
                .await
                .machine
                .record_attempt(generation)
            else {
                return Ok(PollOutcome::Stopped);
            };

            let response = self.api.get_payment_status(self.order).await;

            let mut inner = self.shared.inner.lock().await;

            if !inner.machine.is_current(generation) {
                debug!(order = %self.order, attempt, "discarding stale payment status");

                return Ok(PollOutcome::Stopped);
            }

            let status = match response {
                Ok(status) => {
                    inner.last_status = Some(status.clone());
                    inner.last_error = None;

                    Some(status)
                }
                Err(error) => {
                    warn!(order = %self.order, attempt, %error, "payment status check failed");

                    inner.last_error = Some(error.user_message());

                    None
                }
            };

            match inner
                .machine
                .observe(generation, status.as_ref(), self.config.max_attempts)
            {
                Step::Continue => {
                    debug!(order = %self.order, attempt, "payment still pending");
                }
                Step::Finished(outcome) => {
                    info!(order = %self.order, attempt, ?outcome, "payment polling finished");

                    return Ok(outcome);
                }
                Step::Stale => return Ok(PollOutcome::Stopped),
            }
        }
    }

    /// Stop polling, return to idle and reset the attempt counter.
    ///
    /// A pending [`start_polling`](Self::start_polling) resolves with
    /// [`PollOutcome::Stopped`].
    pub async fn stop_polling(&self) {
        self.shared.inner.lock().await.machine.stop();
        self.shared.stop.notify_waiters();
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use reqwest::StatusCode;
    use testresult::TestResult;
    use tokio::time::Instant;
    use uuid::Uuid;

    use crate::{
        api::{
            ApiError, MockStorefrontApi,
            models::{LeadUuid, OrderStatus},
        },
        domain::payments::machine::PaymentFailure,
        test::helpers::{make_status, unreachable_error},
    };

    use super::*;

    const INTERVAL: Duration = Duration::from_millis(3_000);

    fn order() -> OrderUuid {
        OrderUuid::from_uuid(Uuid::now_v7())
    }

    fn poller(api: MockStorefrontApi, order: OrderUuid, max_attempts: u32) -> PaymentPoller {
        PaymentPoller::new(
            Arc::new(api),
            order,
            PollerConfig::new(INTERVAL, max_attempts).unwrap_or_default(),
        )
    }

    fn sequence(api: &mut MockStorefrontApi, statuses: &[OrderStatus]) {
        let mut statuses: VecDeque<OrderStatus> = statuses.iter().copied().collect();

        api.expect_get_payment_status()
            .times(statuses.len())
            .returning(move |order| {
                Ok(make_status(
                    order,
                    statuses.pop_front().unwrap_or(OrderStatus::Pending),
                ))
            });
    }

    fn payment_request() -> PaymentRequest {
        PaymentRequest {
            lead: LeadUuid::from_uuid(Uuid::now_v7()),
            return_url: "https://shop.example/checkout/return".to_string(),
        }
    }

    #[test]
    fn defaults_poll_every_three_seconds_for_five_minutes() {
        let config = PollerConfig::default();

        assert_eq!(config.poll_interval, Duration::from_secs(3));
        assert_eq!(config.max_attempts, 100);
        assert_eq!(
            config.poll_interval * config.max_attempts,
            Duration::from_secs(300)
        );
    }

    #[test]
    fn zero_interval_or_budget_is_rejected() {
        assert_eq!(
            PollerConfig::new(Duration::ZERO, 100),
            Err(PollerError::ZeroInterval)
        );
        assert_eq!(
            PollerConfig::new(INTERVAL, 0),
            Err(PollerError::ZeroAttempts)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_poll_frees_the_poller_for_a_restart() -> TestResult {
        let order = order();
        let mut api = MockStorefrontApi::new();
        let mut calls = 0;

        api.expect_get_payment_status()
            .times(5)
            .returning(move |order| {
                calls += 1;

                let status = if calls > 4 {
                    OrderStatus::Paid
                } else {
                    OrderStatus::Pending
                };

                Ok(make_status(order, status))
            });

        let poller = poller(api, order, 100);

        let timed_out = time::timeout(Duration::from_secs(10), poller.start_polling()).await;

        assert!(timed_out.is_err(), "four pending checks should not finish");
        assert_eq!(poller.state().await, PollerState::Idle);

        let outcome = poller.start_polling().await?;

        assert_eq!(
            outcome,
            PollOutcome::Paid(make_status(order, OrderStatus::Paid))
        );

        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn paid_on_third_check_completes_once() -> TestResult {
        let order = order();
        let mut api = MockStorefrontApi::new();

        sequence(
            &mut api,
            &[OrderStatus::Pending, OrderStatus::Pending, OrderStatus::Paid],
        );

        let poller = poller(api, order, 100);
        let started = Instant::now();

        let outcome = poller.start_polling().await?;

        assert_eq!(
            outcome,
            PollOutcome::Paid(make_status(order, OrderStatus::Paid))
        );
        assert_eq!(started.elapsed(), INTERVAL * 2);
        assert!(matches!(
            poller.state().await,
            PollerState::Done(PollOutcome::Paid(_))
        ));

        // No further ticks: the mock only allows three checks.
        time::sleep(INTERVAL * 5).await;

        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_on_first_check_fails_immediately() -> TestResult {
        let mut api = MockStorefrontApi::new();

        sequence(&mut api, &[OrderStatus::Cancelled]);

        let poller = poller(api, order(), 100);
        let started = Instant::now();

        let outcome = poller.start_polling().await?;

        assert_eq!(outcome, PollOutcome::Failed(PaymentFailure::Cancelled));
        assert_eq!(started.elapsed(), Duration::ZERO);
        assert_eq!(outcome_message(&outcome), Some("payment failed".to_string()));

        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn unchanged_status_times_out_within_budget() -> TestResult {
        let max_attempts = 5;
        let mut api = MockStorefrontApi::new();

        sequence(&mut api, &[OrderStatus::Pending; 5]);

        let poller = poller(api, order(), max_attempts);
        let started = Instant::now();

        let outcome = poller.start_polling().await?;

        assert_eq!(outcome, PollOutcome::Failed(PaymentFailure::TimedOut));
        assert!(started.elapsed() <= INTERVAL * max_attempts);
        assert_eq!(
            outcome_message(&outcome),
            Some("status check timeout".to_string())
        );

        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn failing_checks_keep_polling_and_record_error() -> TestResult {
        let order = order();
        let mut api = MockStorefrontApi::new();
        let mut calls = 0;

        api.expect_get_payment_status()
            .times(2)
            .returning(move |order| {
                calls += 1;

                if calls == 1 {
                    Err(unreachable_error())
                } else {
                    Ok(make_status(order, OrderStatus::Delivered))
                }
            });

        let poller = poller(api, order, 100);

        let outcome = poller.start_polling().await?;

        assert!(matches!(outcome, PollOutcome::Paid(_)), "got {outcome:?}");
        assert!(poller.last_error().await.is_none());
        assert_eq!(
            poller.last_status().await.map(|status| status.status),
            Some(OrderStatus::Delivered)
        );

        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn stop_resolves_pending_poll_and_resets() -> TestResult {
        let mut api = MockStorefrontApi::new();

        api.expect_get_payment_status()
            .returning(|order| Ok(make_status(order, OrderStatus::Pending)));

        let poller = poller(api, order(), 100);

        let task = tokio::spawn({
            let poller = poller.clone();

            async move { poller.start_polling().await }
        });

        time::sleep(Duration::from_millis(4_500)).await;

        assert_eq!(poller.state().await, PollerState::Polling { attempts: 2 });

        poller.stop_polling().await;

        let outcome = task.await??;

        assert_eq!(outcome, PollOutcome::Stopped);
        assert_eq!(poller.state().await, PollerState::Idle);

        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn second_start_while_polling_is_refused() -> TestResult {
        let mut api = MockStorefrontApi::new();

        api.expect_get_payment_status()
            .returning(|order| Ok(make_status(order, OrderStatus::Pending)));

        let poller = poller(api, order(), 100);

        let task = tokio::spawn({
            let poller = poller.clone();

            async move { poller.start_polling().await }
        });

        time::sleep(Duration::from_millis(10)).await;

        assert_eq!(poller.start_polling().await, Err(PollerError::AlreadyPolling));

        poller.stop_polling().await;

        assert_eq!(task.await??, PollOutcome::Stopped);

        Ok(())
    }

    #[tokio::test]
    async fn initiation_returns_redirect_without_polling() {
        let mut api = MockStorefrontApi::new();

        api.expect_initiate_payment().once().returning(|_| {
            Ok(PaymentRedirect {
                redirect_url: Some("https://pay.example/session/1".to_string()),
                error: None,
            })
        });
        api.expect_get_payment_status().never();

        let poller = poller(api, order(), 100);

        let url = poller.initiate_payment(payment_request()).await;

        assert_eq!(url.as_deref(), Some("https://pay.example/session/1"));
        assert_eq!(poller.state().await, PollerState::Idle);
    }

    #[tokio::test]
    async fn initiation_error_body_is_recorded() {
        let mut api = MockStorefrontApi::new();

        api.expect_initiate_payment().once().returning(|_| {
            Ok(PaymentRedirect {
                redirect_url: None,
                error: Some("Lead already paid".to_string()),
            })
        });

        let poller = poller(api, order(), 100);

        assert_eq!(poller.initiate_payment(payment_request()).await, None);
        assert_eq!(
            poller.last_error().await.as_deref(),
            Some("Lead already paid")
        );
        assert_eq!(poller.state().await, PollerState::Idle);
    }

    #[tokio::test]
    async fn initiation_transport_failure_is_recorded() {
        let mut api = MockStorefrontApi::new();

        api.expect_initiate_payment().once().returning(|_| {
            Err(ApiError::Rejected {
                status: StatusCode::UNPROCESSABLE_ENTITY,
                message: "Return URL is not allowed".to_string(),
            })
        });

        let poller = poller(api, order(), 100);

        assert_eq!(poller.initiate_payment(payment_request()).await, None);
        assert_eq!(
            poller.last_error().await.as_deref(),
            Some("Return URL is not allowed")
        );
    }

    #[tokio::test]
    async fn single_check_classifies_and_caches() {
        let order = order();
        let mut api = MockStorefrontApi::new();

        sequence(&mut api, &[OrderStatus::Processing, OrderStatus::Paid]);

        let poller = poller(api, order, 100);

        assert_eq!(poller.check_payment_status().await, StatusCheck::Pending);
        assert_eq!(poller.check_payment_status().await, StatusCheck::Succeeded);
        assert_eq!(
            poller.last_status().await,
            Some(make_status(order, OrderStatus::Paid))
        );
        assert_eq!(poller.state().await, PollerState::Idle);
    }

    #[tokio::test]
    async fn single_check_failure_reads_as_pending() {
        let mut api = MockStorefrontApi::new();

        api.expect_get_payment_status()
            .once()
            .returning(|_| Err(unreachable_error()));

        let poller = poller(api, order(), 100);

        assert_eq!(poller.check_payment_status().await, StatusCheck::Pending);
        assert!(poller.last_error().await.is_some());
    }

    fn outcome_message(outcome: &PollOutcome) -> Option<String> {
        match outcome {
            PollOutcome::Failed(failure) => Some(failure.to_string()),
            PollOutcome::Paid(_) | PollOutcome::Stopped => None,
        }
    }
}
