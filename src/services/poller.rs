use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use futures::FutureExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::domains::envelope::Envelope;
use crate::error::{QimbError, Result};
use crate::services::acknowledger::Acknowledger;
use crate::services::delivery::{panic_message, DeliveryCore, DeliveryOutcome};
use crate::services::gateway::GatewayClient;

/// Counts for one fetch/fan-out round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub received: usize,
    pub delivered: usize,
    pub duplicates: usize,
    pub callback_failures: usize,
    pub acknowledged: usize,
    pub ack_failures: usize,
}

struct MessageReport {
    delivery: Result<DeliveryOutcome>,
    ack: Result<()>,
}

pub struct PollDispatcher {
    gateway: Arc<GatewayClient>,
    core: DeliveryCore,
    acknowledger: Acknowledger,
    interval: Duration,
}

impl PollDispatcher {
    pub fn new(gateway: Arc<GatewayClient>, core: DeliveryCore, interval: Duration) -> Self {
        let acknowledger = Acknowledger::new(gateway.clone());
        Self {
            gateway,
            core,
            acknowledger,
            interval,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Runs one round: fetch, deliver every message concurrently, acknowledge
    /// each one whether or not its handler ran, and wait for all of them.
    /// A panic while processing one message is confined to that message.
    pub async fn tick(&self) -> Result<BatchSummary> {
        let envelopes = self.gateway.receive().await?;
        let reports = join_all(envelopes.into_iter().map(|envelope| self.process(envelope))).await;

        let mut summary = BatchSummary {
            received: reports.len(),
            ..BatchSummary::default()
        };
        for report in reports {
            match report.delivery {
                Ok(DeliveryOutcome::Delivered) => summary.delivered += 1,
                Ok(DeliveryOutcome::Duplicate) => summary.duplicates += 1,
                Err(_) => summary.callback_failures += 1,
            }
            match report.ack {
                Ok(()) => summary.acknowledged += 1,
                Err(_) => summary.ack_failures += 1,
            }
        }
        Ok(summary)
    }

    async fn process(&self, envelope: Envelope) -> MessageReport {
        let message_id = envelope.message_id().to_string();
        let receipt_handle = envelope.receipt_handle().map(str::to_string);
        let delivery = match AssertUnwindSafe(self.core.deliver(envelope))
            .catch_unwind()
            .await
        {
            Ok(delivery) => delivery,
            Err(panic) => Err(QimbError::Callback(format!(
                "delivery panicked: {}",
                panic_message(panic.as_ref())
            ))),
        };
        let ack = match AssertUnwindSafe(self.acknowledger.acknowledge(receipt_handle.as_deref()))
            .catch_unwind()
            .await
        {
            Ok(ack) => ack,
            Err(panic) => Err(QimbError::ack(
                format!("acknowledgement panicked: {}", panic_message(panic.as_ref())),
                None,
            )),
        };
        if let Err(err) = &ack {
            warn!(message_id = %message_id, error = %err, "acknowledgement failed");
        }
        MessageReport { delivery, ack }
    }

    /// Starts the loop on the runtime. The loop lives until the returned handle
    /// is cancelled or dropped.
    pub fn spawn(self) -> PollHandle {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let task = tokio::spawn(self.run(cancel_rx));
        PollHandle { cancel_tx, task }
    }

    async fn run(self, mut cancel_rx: watch::Receiver<bool>) {
        let node_id = self.gateway.node_id();
        info!(node_id = %node_id, interval = ?self.interval, "poll loop started");
        let mut tick: u64 = 0;
        loop {
            tokio::select! {
                biased;
                _ = cancel_rx.changed() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
            if *cancel_rx.borrow() {
                break;
            }
            tick += 1;
            match AssertUnwindSafe(self.tick()).catch_unwind().await {
                Ok(Ok(summary)) => {
                    if summary.received > 0 {
                        debug!(tick, ?summary, "poll tick complete");
                    }
                }
                Ok(Err(err)) => {
                    warn!(tick, error = %err, "poll tick failed");
                }
                Err(panic) => {
                    let err = QimbError::receive(
                        format!("poll tick panicked: {}", panic_message(panic.as_ref())),
                        None,
                    );
                    error!(tick, error = %err, "poll tick failed");
                }
            }
        }
        info!(node_id = %node_id, ticks = tick, "poll loop stopped");
    }
}

/// Owner handle of a running poll loop.
pub struct PollHandle {
    cancel_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl PollHandle {
    /// Stops scheduling further ticks. A tick already fetching or dispatching
    /// runs to completion.
    pub fn cancel(&self) {
        self.cancel_tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancel_tx.borrow()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub async fn join(self) -> Result<()> {
        self.task
            .await
            .map_err(|e| QimbError::Runtime(e.to_string()))
    }

    /// Cancels and waits for any in-flight tick to drain.
    pub async fn stop(self) -> Result<()> {
        self.cancel();
        self.join().await
    }
}
