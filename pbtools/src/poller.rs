use std::time::Duration;

use log::*;
use pbg_common::Money;
use pointboard_payment_engine::{
    db_types::{OrderRef, PaymentStatus},
    order_objects::OrderStatusSummary,
};
use thiserror::Error;
use tokio::time::{interval, timeout_at, Instant, MissedTickBehavior};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
/// The wall-clock ceiling on a poll. Bank transfers through slow intermediaries can take hours to land; past this,
/// the customer gets told to contact support instead.
pub const DEFAULT_POLL_CEILING: Duration = Duration::from_secs(3 * 60 * 60);

#[derive(Debug, Error)]
pub enum PollError {
    #[error("Could not verify the payment in time. Contact support and quote your order reference.")]
    Timeout,
    #[error("The payment is {0} and will not complete")]
    PaymentFailed(PaymentStatus),
    #[error("The order does not exist on the server: {0}")]
    UnknownOrder(OrderRef),
    #[error("Could not reach the payment server. {0}")]
    Transport(String),
}

/// Where the poller reads settlement state from. The production implementation calls the payment server over HTTP;
/// tests feed the loop canned sequences.
#[allow(async_fn_in_trait)]
pub trait StatusSource {
    async fn fetch_status(&self, reference: &OrderRef) -> Result<OrderStatusSummary, PollError>;
}

/// A bounded settlement-status poll: ask on a fixed interval until the order is paid with the expected amount, the
/// payment reaches a terminal failure, or the wall-clock ceiling elapses.
///
/// This long-poll compensates for the absence of a push channel between the gateway and the checkout session. The
/// returned future is meant to be owned by the session that cares about the answer: drop it (or abort the task
/// driving it) on teardown and no timers are left behind.
pub struct PaymentPoller<S> {
    source: S,
    reference: OrderRef,
    expected_amount: Money,
    interval: Duration,
    ceiling: Duration,
}

impl<S> PaymentPoller<S> {
    pub fn new(source: S, reference: OrderRef, expected_amount: Money) -> Self {
        Self { source, reference, expected_amount, interval: DEFAULT_POLL_INTERVAL, ceiling: DEFAULT_POLL_CEILING }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_ceiling(mut self, ceiling: Duration) -> Self {
        self.ceiling = ceiling;
        self
    }
}

impl<S: StatusSource> PaymentPoller<S> {
    pub async fn wait_for_settlement(&self) -> Result<OrderStatusSummary, PollError> {
        let deadline = Instant::now() + self.ceiling;
        let mut timer = interval(self.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            if timeout_at(deadline, timer.tick()).await.is_err() {
                info!("🛎️ Gave up waiting for order {} after {:?}", self.reference, self.ceiling);
                return Err(PollError::Timeout);
            }
            match self.source.fetch_status(&self.reference).await {
                Ok(status) if status.payment_verified => {
                    if status.amount_paid == Some(self.expected_amount) {
                        info!("🛎️ Order {} verified as paid", self.reference);
                        return Ok(status);
                    }
                    // Paid with an unexpected amount. Treat it as not-yet-settled rather than rejecting outright:
                    // the matching transfer may still be on its way.
                    warn!(
                        "🛎️ Order {} reports paid with {:?}, expected {}. Waiting for a matching settlement.",
                        self.reference, status.amount_paid, self.expected_amount
                    );
                },
                Ok(status) if matches!(status.payment_status, PaymentStatus::Failed | PaymentStatus::Refunded) => {
                    return Err(PollError::PaymentFailed(status.payment_status));
                },
                Ok(_) => trace!("🛎️ Order {} still pending", self.reference),
                Err(PollError::UnknownOrder(reference)) => return Err(PollError::UnknownOrder(reference)),
                // Transient transport trouble is retried until the ceiling; the server being briefly unreachable
                // is no reason to abandon a three-hour wait.
                Err(e) => warn!("🛎️ Status poll failed ({e}). Retrying."),
            }
        }
    }
}

#[cfg(test)]
mod test {
    use std::{
        collections::VecDeque,
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
            Mutex,
        },
    };

    use super::*;

    #[derive(Clone, Default)]
    struct FakeSource {
        responses: Arc<Mutex<VecDeque<Result<OrderStatusSummary, PollError>>>>,
        fetches: Arc<AtomicUsize>,
    }

    impl FakeSource {
        fn with_responses(responses: Vec<Result<OrderStatusSummary, PollError>>) -> Self {
            Self { responses: Arc::new(Mutex::new(responses.into())), fetches: Arc::new(AtomicUsize::new(0)) }
        }

        fn fetch_count(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    impl StatusSource for FakeSource {
        async fn fetch_status(&self, _reference: &OrderRef) -> Result<OrderStatusSummary, PollError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            // Once the canned responses run out, the order just stays pending.
            self.responses.lock().unwrap().pop_front().unwrap_or_else(|| Ok(summary(PaymentStatus::Pending, None)))
        }
    }

    fn summary(status: PaymentStatus, amount_paid: Option<i64>) -> OrderStatusSummary {
        OrderStatusSummary {
            reference: "ABC123".to_string(),
            payment_status: status,
            payment_verified: status == PaymentStatus::Paid,
            amount_paid: amount_paid.map(Money::from),
        }
    }

    fn poller(source: FakeSource) -> PaymentPoller<FakeSource> {
        PaymentPoller::new(source, OrderRef("ABC123".into()), Money::from(150_000))
    }

    #[tokio::test(start_paused = true)]
    async fn settles_once_payment_is_verified() {
        let source = FakeSource::with_responses(vec![
            Ok(summary(PaymentStatus::Pending, None)),
            Ok(summary(PaymentStatus::Pending, None)),
            Ok(summary(PaymentStatus::Paid, Some(150_000))),
        ]);
        let status = poller(source.clone()).wait_for_settlement().await.expect("Poll should succeed");
        assert!(status.payment_verified);
        assert_eq!(source.fetch_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn mismatched_amounts_are_retried_not_rejected() {
        let source = FakeSource::with_responses(vec![
            Ok(summary(PaymentStatus::Paid, Some(140_000))),
            Ok(summary(PaymentStatus::Paid, Some(140_000))),
            Ok(summary(PaymentStatus::Paid, Some(150_000))),
        ]);
        let status = poller(source.clone()).wait_for_settlement().await.expect("Poll should succeed");
        assert_eq!(status.amount_paid, Some(Money::from(150_000)));
        assert_eq!(source.fetch_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_payment_is_terminal() {
        let source = FakeSource::with_responses(vec![
            Ok(summary(PaymentStatus::Pending, None)),
            Ok(summary(PaymentStatus::Failed, None)),
        ]);
        let err = poller(source).wait_for_settlement().await.expect_err("Poll should fail");
        assert!(matches!(err, PollError::PaymentFailed(PaymentStatus::Failed)));
    }

    #[tokio::test(start_paused = true)]
    async fn transport_errors_are_retried() {
        let source = FakeSource::with_responses(vec![
            Err(PollError::Transport("connection refused".to_string())),
            Ok(summary(PaymentStatus::Paid, Some(150_000))),
        ]);
        poller(source.clone()).wait_for_settlement().await.expect("Poll should recover");
        assert_eq!(source.fetch_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_at_the_ceiling() {
        let source = FakeSource::default();
        let poller = poller(source.clone()).with_ceiling(Duration::from_secs(10));
        let err = poller.wait_for_settlement().await.expect_err("Poll should time out");
        assert!(matches!(err, PollError::Timeout));
        // 10s ceiling at a 2s cadence: the loop polls a handful of times, never unboundedly.
        assert!(source.fetch_count() <= 6);
    }

    #[tokio::test]
    async fn poll_task_can_be_aborted() {
        let source = FakeSource::default();
        let poller = poller(source).with_interval(Duration::from_millis(10));
        let handle = tokio::spawn(async move { poller.wait_for_settlement().await });
        tokio::time::sleep(Duration::from_millis(30)).await;
        handle.abort();
        let join = handle.await;
        assert!(join.expect_err("Task should have been cancelled").is_cancelled());
    }
}
