// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Remote sender monitoring.
//!
//! Tracks the redeemable credit ("max float") of every remote sender that
//! pays the local claimant. Tickets that cannot be redeemed yet sit in
//! per-sender queues until credit recovers; released tickets fan into a
//! single redeemable stream consumed by the external redeemer. Idle sender
//! state is evicted by a periodic cleanup sweep so memory stays bounded
//! under sender churn.

use crate::broker::{RoundsManager, SenderManager};
use crate::clock::Clock;
use crate::config::SenderMonitorConfig;
use crate::error::{PmError, PmResult};
use crate::error_monitor::ErrorMonitor;
use crate::metrics::PmMetrics;
use crate::ticket_queue::{i256_from, TicketQueue};
use crate::types::SignedTicket;
use ethers::types::{Address, I256, U256};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

// Capacity of the fan-in redeemable channel. Kept at 1 so ticket release
// across all senders is paced by the external redeemer.
const REDEEMABLE_CHANNEL_SIZE: usize = 1;

/// Cached state for one remote sender
struct RemoteSender {
    // Sum of the face values of tickets currently pending redemption
    // on-chain
    pending_amount: U256,

    // Shared with the sender's consumer task, which stops the queue on
    // eviction or shutdown
    queue: Arc<TicketQueue>,

    // Cancelled when the cleanup sweep evicts this sender
    done: CancellationToken,

    // Unix seconds of the last operation that touched this sender
    last_access: i64,
}

/// Monitors remote senders and releases their queued tickets for
/// redemption as credit allows.
pub struct SenderMonitor {
    config: SenderMonitorConfig,
    smgr: Arc<dyn SenderManager>,
    rm: Arc<dyn RoundsManager>,
    error_monitor: Arc<dyn ErrorMonitor>,
    clock: Arc<dyn Clock>,
    metrics: Arc<PmMetrics>,

    senders: RwLock<HashMap<Address, RemoteSender>>,

    // Fan-in output over which per-sender consumers surface released
    // tickets
    redeemable_tx: mpsc::Sender<SignedTicket>,

    quit: CancellationToken,
}

impl SenderMonitor {
    /// Creates a monitor and the redeemable stream an external redeemer
    /// should drain.
    pub fn new(
        config: SenderMonitorConfig,
        smgr: Arc<dyn SenderManager>,
        rm: Arc<dyn RoundsManager>,
        error_monitor: Arc<dyn ErrorMonitor>,
        clock: Arc<dyn Clock>,
        metrics: Arc<PmMetrics>,
    ) -> (Arc<Self>, mpsc::Receiver<SignedTicket>) {
        let (redeemable_tx, redeemable_rx) = mpsc::channel(REDEEMABLE_CHANNEL_SIZE);
        let monitor = Arc::new(Self {
            config,
            smgr,
            rm,
            error_monitor,
            clock,
            metrics,
            senders: RwLock::new(HashMap::new()),
            redeemable_tx,
            quit: CancellationToken::new(),
        });
        (monitor, redeemable_rx)
    }

    /// Launches the cleanup worker. Per-sender consumer tasks are spawned
    /// lazily as senders appear.
    pub fn start(self: &Arc<Self>) -> JoinHandle<()> {
        let monitor = self.clone();
        tokio::spawn(async move { monitor.run_cleanup_loop().await })
    }

    /// Signals every background task to exit gracefully. Idempotent.
    pub fn stop(&self) {
        self.quit.cancel();
    }

    /// Adds a ticket to the queue for a remote sender
    pub async fn queue_ticket(&self, addr: Address, ticket: SignedTicket) {
        if self.quit.is_cancelled() {
            return;
        }
        let mut senders = self.senders.write().await;
        let sender = self.ensure_cache(&mut senders, addr);
        sender.queue.add(ticket);
        self.metrics.tickets_queued.inc();
    }

    /// Subtracts from a remote sender's max float by growing its pending
    /// amount. No signal is emitted: reducing float can only delay
    /// redemption.
    pub async fn sub_float(&self, addr: Address, amount: U256) {
        if self.quit.is_cancelled() {
            return;
        }
        let mut senders = self.senders.write().await;
        let sender = self.ensure_cache(&mut senders, addr);
        // Adding to pending_amount = subtracting from max float
        sender.pending_amount = sender.pending_amount.saturating_add(amount);

        // An updated max float results in updated ticket params, so errors
        // tolerated under the previous params no longer apply
        self.error_monitor.clear_err_count(addr);
        self.metrics.float_updates.with_label_values(&["sub"]).inc();
    }

    /// Adds to a remote sender's max float by retiring pending value.
    ///
    /// The retirement is authoritative: if the follow-up max float read
    /// fails, the error is returned but the pending-amount change is kept.
    pub async fn add_float(&self, addr: Address, amount: U256) -> PmResult<()> {
        if self.quit.is_cancelled() {
            return Err(PmError::Shutdown);
        }
        let mut senders = self.senders.write().await;

        {
            let sender = self.ensure_cache(&mut senders, addr);
            // Subtracting from pending_amount = adding to max float
            if sender.pending_amount < amount {
                return Err(PmError::InsufficientPending);
            }
            sender.pending_amount -= amount;
        }

        self.error_monitor.clear_err_count(addr);
        self.metrics.float_updates.with_label_values(&["add"]).inc();

        // Signal the updated max float to the sender's queue in case queued
        // tickets are now covered
        let max_float = match self.max_float_locked(&senders, addr).await {
            Ok(max_float) => max_float,
            Err(err) => {
                warn!(?addr, ?err, "max float unavailable after retiring pending value");
                self.metrics
                    .external_read_errors
                    .with_label_values(&[err.error_type()])
                    .inc();
                return Err(err);
            }
        };
        if let Some(sender) = senders.get(&addr) {
            sender.queue.signal_max_float(max_float);
        }

        Ok(())
    }

    /// Returns a remote sender's max float.
    ///
    /// Takes the write lock even though this is a read: the access stamps
    /// the sender's idle timestamp.
    pub async fn max_float(&self, addr: Address) -> PmResult<I256> {
        if self.quit.is_cancelled() {
            return Err(PmError::Shutdown);
        }
        let mut senders = self.senders.write().await;
        self.ensure_cache(&mut senders, addr);
        match self.max_float_locked(&senders, addr).await {
            Ok(max_float) => Ok(max_float),
            Err(err) => {
                self.metrics
                    .external_read_errors
                    .with_label_values(&[err.error_type()])
                    .inc();
                Err(err)
            }
        }
    }

    // max float = reserve allocation - pending amount.
    // Caller must hold the senders lock and have ensured the record exists.
    async fn max_float_locked(
        &self,
        senders: &HashMap<Address, RemoteSender>,
        addr: Address,
    ) -> PmResult<I256> {
        let reserve_alloc = self.reserve_alloc(addr).await?;
        let pending = senders
            .get(&addr)
            .map(|sender| sender.pending_amount)
            .unwrap_or_default();
        Ok(reserve_alloc.saturating_sub(i256_from(pending)))
    }

    /// The claimant's share of a sender's reserve:
    /// `reserve / pool_size - already_claimed`, floored integer division.
    /// The result is signed; an over-claimed share goes negative.
    async fn reserve_alloc(&self, addr: Address) -> PmResult<I256> {
        let info = self.smgr.get_sender_info(addr).await?;
        // A claimed-reserve failure surfaces even when the pool turns out
        // to be empty; allocation math never runs on a partial read
        let claimed = self
            .smgr
            .claimed_reserve(addr, self.config.claimant)
            .await?;
        let pool_size = self.rm.get_transcoder_pool_size().await;
        if pool_size.is_zero() {
            return Ok(I256::zero());
        }
        Ok(i256_from(info.reserve / pool_size).saturating_sub(i256_from(claimed)))
    }

    // Initializes the record for a remote sender on first reference and
    // stamps its idle timestamp.
    // Caller must hold the senders write lock.
    fn ensure_cache<'a>(
        &self,
        senders: &'a mut HashMap<Address, RemoteSender>,
        addr: Address,
    ) -> &'a mut RemoteSender {
        let sender = senders.entry(addr).or_insert_with(|| {
            debug!(?addr, "tracking new remote sender");
            self.metrics.senders_tracked.inc();
            self.new_remote_sender()
        });
        sender.last_access = self.clock.unix_now();
        sender
    }

    // Starts a ticket queue for a remote sender along with the consumer
    // task that fans its released tickets into the shared redeemable
    // stream. The consumer holds the stream's sender half, not the
    // monitor, so eviction leaves no cycle to break.
    fn new_remote_sender(&self) -> RemoteSender {
        let (queue, redeemable_rx) = TicketQueue::start();
        let queue = Arc::new(queue);
        let done = CancellationToken::new();
        tokio::spawn(run_ticket_consumer(
            redeemable_rx,
            self.redeemable_tx.clone(),
            queue.clone(),
            done.clone(),
            self.quit.clone(),
            self.metrics.clone(),
        ));
        RemoteSender {
            pending_amount: U256::zero(),
            queue,
            done,
            last_access: self.clock.unix_now(),
        }
    }

    async fn run_cleanup_loop(&self) {
        let mut interval = time::interval(self.config.cleanup_interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = self.quit.cancelled() => {
                    info!("sender monitor cleanup loop cancelled");
                    return;
                }
                _ = interval.tick() => {
                    self.cleanup().await;
                }
            }
        }
    }

    // Evicts tracked senders whose ttl has lapsed and drops their cached
    // chain state
    async fn cleanup(&self) {
        let mut senders = self.senders.write().await;
        let now = self.clock.unix_now();
        let ttl = self.config.ttl_secs;

        let expired: Vec<Address> = senders
            .iter()
            .filter(|(_, sender)| now - sender.last_access > ttl)
            .map(|(addr, _)| *addr)
            .collect();

        for addr in expired {
            let Some(sender) = senders.remove(&addr) else {
                continue;
            };
            // Tell the consumer task to exit; cancellation never blocks,
            // so the sweep holds the lock for map work only
            sender.done.cancel();
            self.smgr.clear(addr).await;
            self.metrics.senders_tracked.dec();
            self.metrics.senders_evicted.inc();
            info!(?addr, "evicted idle sender");
        }
    }
}

/// Fan-in consumer: forwards tickets released by one sender's queue into
/// the monitor's shared redeemable stream. Exits, stopping the queue, when
/// the sender is evicted or the monitor shuts down.
async fn run_ticket_consumer(
    mut redeemable_rx: mpsc::Receiver<SignedTicket>,
    out_tx: mpsc::Sender<SignedTicket>,
    queue: Arc<TicketQueue>,
    done: CancellationToken,
    quit: CancellationToken,
    metrics: Arc<PmMetrics>,
) {
    loop {
        tokio::select! {
            _ = done.cancelled() => {
                queue.stop();
                return;
            }
            _ = quit.cancelled() => {
                queue.stop();
                return;
            }
            ticket = redeemable_rx.recv() => {
                let Some(ticket) = ticket else {
                    // Queue stopped on its own; nothing left to forward
                    return;
                };
                // The forward is a blocking rendezvous with the external
                // redeemer, so keep watching the shutdown signals while it
                // is in flight
                tokio::select! {
                    _ = done.cancelled() => {
                        queue.stop();
                        return;
                    }
                    _ = quit.cancelled() => {
                        queue.stop();
                        return;
                    }
                    sent = out_tx.send(ticket) => {
                        if sent.is_err() {
                            warn!("redeemable receiver dropped, stopping ticket consumer");
                            queue.stop();
                            return;
                        }
                        metrics.tickets_released.inc();
                    }
                }
            }
        }
    }
}
