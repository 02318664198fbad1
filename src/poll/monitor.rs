//! Payment confirmation monitor.
//!
//! Drives a `BackoffPoller` against an injected status probe until the
//! payment settles, the attempt budget runs out, or the owner shuts the loop
//! down. At most one probe call is in flight at a time: the next delay is not
//! scheduled until the current check resolves.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use crate::poll::backoff::{BackoffPoller, NextDelay};

/// One asynchronous status check against the payment backend.
#[async_trait]
pub trait StatusProbe: Send + Sync {
    async fn check(&self) -> Result<PaymentCheck>;
}

/// Result of a single status check.
#[derive(Debug, Clone)]
pub enum PaymentCheck {
    /// Payment not yet confirmed; check again later.
    Pending,
    /// Payment confirmed; payload carries the registration credentials.
    Success(Value),
    /// Terminal failure; payload carries the backend's classification
    /// (callers branch on it, e.g. declined vs. backend timeout).
    Failure(Value),
}

/// Why the monitor stopped.
#[derive(Debug, Clone)]
pub enum PollOutcome {
    Success(Value),
    Failure(Value),
    /// Attempt budget spent while still pending. The owner shows a manual
    /// "refresh" message rather than redirecting: slow is not failed.
    Exhausted,
    /// The owning view shut the loop down; no callbacks were invoked.
    Cancelled,
}

/// Progress event emitted once per consumed attempt, for a coarse
/// "still processing" indicator.
#[derive(Debug, Clone, Copy)]
pub struct PollProgress {
    pub attempt: u32,
    pub max_attempts: u32,
}

pub struct PaymentMonitor {
    probe: Arc<dyn StatusProbe>,
    poller: BackoffPoller,
    progress_tx: Option<mpsc::UnboundedSender<PollProgress>>,
    shutdown_rx: Option<mpsc::Receiver<()>>,
}

impl PaymentMonitor {
    pub fn new(probe: Arc<dyn StatusProbe>, poller: BackoffPoller) -> Self {
        Self {
            probe,
            poller,
            progress_tx: None,
            shutdown_rx: None,
        }
    }

    /// Emit per-attempt progress events on `tx`.
    pub fn with_progress(mut self, tx: mpsc::UnboundedSender<PollProgress>) -> Self {
        self.progress_tx = Some(tx);
        self
    }

    /// Set shutdown receiver; a message cancels the loop, discarding any
    /// in-flight check without surfacing its result.
    pub fn with_shutdown(mut self, rx: mpsc::Receiver<()>) -> Self {
        self.shutdown_rx = Some(rx);
        self
    }

    /// Run until the payment settles, the budget is exhausted, or shutdown.
    ///
    /// The first check runs immediately; backoff only spaces out retries.
    #[instrument(skip(self))]
    pub async fn run(&mut self) -> PollOutcome {
        self.poller.reset();
        info!(
            max_attempts = self.poller.max_attempts(),
            "payment monitor started"
        );

        let probe = Arc::clone(&self.probe);
        loop {
            let check = tokio::select! {
                res = probe.check() => res,
                () = shutdown_signal(&mut self.shutdown_rx) => {
                    info!("payment monitor cancelled");
                    return PollOutcome::Cancelled;
                }
            };

            // Transport errors are indistinguishable from "not confirmed
            // yet" for this poll: a network blip must not read as a payment
            // failure, so they retry against the same budget.
            let status = match check {
                Ok(status) => status,
                Err(e) => {
                    warn!("payment status check failed: {e:#}");
                    PaymentCheck::Pending
                }
            };

            match status {
                PaymentCheck::Success(payload) => {
                    info!(attempts = self.poller.attempt(), "payment confirmed");
                    return PollOutcome::Success(payload);
                }
                PaymentCheck::Failure(payload) => {
                    warn!(attempts = self.poller.attempt(), "payment failed");
                    return PollOutcome::Failure(payload);
                }
                PaymentCheck::Pending => {}
            }

            match self.poller.next_delay() {
                NextDelay::Exhausted => {
                    warn!(
                        attempts = self.poller.attempt(),
                        "payment still pending after attempt budget"
                    );
                    return PollOutcome::Exhausted;
                }
                NextDelay::Wait(delay) => {
                    if let Some(tx) = &self.progress_tx {
                        let _ = tx.send(PollProgress {
                            attempt: self.poller.attempt(),
                            max_attempts: self.poller.max_attempts(),
                        });
                    }
                    debug!(
                        ?delay,
                        attempt = self.poller.attempt(),
                        "payment pending, backing off"
                    );
                    tokio::select! {
                        () = tokio::time::sleep(delay) => {}
                        () = shutdown_signal(&mut self.shutdown_rx) => {
                            info!("payment monitor cancelled");
                            return PollOutcome::Cancelled;
                        }
                    }
                }
            }
        }
    }
}

/// Resolves only when a shutdown message arrives; pends forever without a
/// receiver. A closed channel (every sender dropped) is not a signal: the
/// receiver is discarded and polling continues.
async fn shutdown_signal(rx: &mut Option<mpsc::Receiver<()>>) {
    if let Some(receiver) = rx.as_mut() {
        if receiver.recv().await.is_some() {
            return;
        }
    }
    *rx = None;
    std::future::pending::<()>().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    /// Probe that yields a scripted number of pendings before settling.
    struct ScriptedProbe {
        pending_checks: u32,
        then: PaymentCheck,
        calls: AtomicU32,
    }

    impl ScriptedProbe {
        fn new(pending_checks: u32, then: PaymentCheck) -> Self {
            Self {
                pending_checks,
                then,
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl StatusProbe for ScriptedProbe {
        async fn check(&self) -> Result<PaymentCheck> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.pending_checks {
                Ok(PaymentCheck::Pending)
            } else {
                Ok(self.then.clone())
            }
        }
    }

    struct FailingProbe;

    #[async_trait]
    impl StatusProbe for FailingProbe {
        async fn check(&self) -> Result<PaymentCheck> {
            Err(anyhow::anyhow!("connection refused"))
        }
    }

    struct HangingProbe;

    #[async_trait]
    impl StatusProbe for HangingProbe {
        async fn check(&self) -> Result<PaymentCheck> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_after_three_pendings() {
        let probe = Arc::new(ScriptedProbe::new(
            3,
            PaymentCheck::Success(serde_json::json!({"email": "a@b.c"})),
        ));
        let mut monitor = PaymentMonitor::new(probe.clone(), BackoffPoller::default());

        let started = tokio::time::Instant::now();
        let outcome = monitor.run().await;

        // Three delays were awaited: 5 s + 10 s + 20 s
        assert_eq!(started.elapsed(), Duration::from_secs(35));
        assert_eq!(probe.calls.load(Ordering::SeqCst), 4);
        assert!(matches!(outcome, PollOutcome::Success(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediate_first_check_no_delay() {
        let probe = Arc::new(ScriptedProbe::new(
            0,
            PaymentCheck::Success(serde_json::json!({})),
        ));
        let mut monitor = PaymentMonitor::new(probe, BackoffPoller::default());

        let started = tokio::time::Instant::now();
        let outcome = monitor.run().await;
        assert_eq!(started.elapsed(), Duration::ZERO);
        assert!(matches!(outcome, PollOutcome::Success(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_stops_polling() {
        let probe = Arc::new(ScriptedProbe::new(
            1,
            PaymentCheck::Failure(serde_json::json!({"reason": "declined"})),
        ));
        let mut monitor = PaymentMonitor::new(probe.clone(), BackoffPoller::default());

        let outcome = monitor.run().await;
        assert_eq!(probe.calls.load(Ordering::SeqCst), 2);
        match outcome {
            PollOutcome::Failure(payload) => assert_eq!(payload["reason"], "declined"),
            other => panic!("expected failure outcome, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_after_attempt_budget() {
        let probe = Arc::new(ScriptedProbe::new(
            u32::MAX,
            PaymentCheck::Success(serde_json::json!({})),
        ));
        let mut monitor = PaymentMonitor::new(probe.clone(), BackoffPoller::default());

        let outcome = monitor.run().await;
        // 20 checks: the immediate one plus one per waited delay
        assert_eq!(probe.calls.load(Ordering::SeqCst), 20);
        assert!(matches!(outcome, PollOutcome::Exhausted));
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_errors_retry_as_pending() {
        let mut monitor = PaymentMonitor::new(
            Arc::new(FailingProbe),
            BackoffPoller::new(Duration::from_secs(1), Duration::from_secs(1), 3),
        );
        let outcome = monitor.run().await;
        assert!(matches!(outcome, PollOutcome::Exhausted));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_discards_in_flight_check() {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let mut monitor = PaymentMonitor::new(Arc::new(HangingProbe), BackoffPoller::default())
            .with_shutdown(shutdown_rx);

        shutdown_tx.send(()).await.unwrap();
        let outcome = monitor.run().await;
        assert!(matches!(outcome, PollOutcome::Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_shutdown_sender_is_not_cancellation() {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);
        drop(shutdown_tx);

        let probe = Arc::new(ScriptedProbe::new(
            1,
            PaymentCheck::Success(serde_json::json!({})),
        ));
        let mut monitor =
            PaymentMonitor::new(probe, BackoffPoller::default()).with_shutdown(shutdown_rx);

        let outcome = monitor.run().await;
        assert!(matches!(outcome, PollOutcome::Success(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_progress_events_per_attempt() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let probe = Arc::new(ScriptedProbe::new(
            2,
            PaymentCheck::Success(serde_json::json!({})),
        ));
        let mut monitor =
            PaymentMonitor::new(probe, BackoffPoller::default()).with_progress(tx);

        let _ = monitor.run().await;
        let first = rx.recv().await.unwrap();
        assert_eq!(first.attempt, 1);
        assert_eq!(first.max_attempts, 20);
        let second = rx.recv().await.unwrap();
        assert_eq!(second.attempt, 2);
    }
}
