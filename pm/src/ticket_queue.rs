// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Per-sender FIFO ticket queue.
//!
//! Buffers signed tickets for a single remote sender and releases them in
//! insertion order once the sender's max float covers the head ticket's
//! face value. Ticket arrival is decoupled from credit changes: a sender
//! can stream tickets optimistically, the queue absorbs temporary
//! under-float and drains in order when credit recovers.

use crate::types::SignedTicket;
use ethers::types::{I256, U256};
use std::collections::VecDeque;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

// Capacity of the redeemable channel. Kept at 1 so release pacing follows
// the downstream consumer.
const REDEEMABLE_CHANNEL_SIZE: usize = 1;

/// Handle to a running ticket queue task.
///
/// `add` and `signal_max_float` never block: tickets travel over an
/// unbounded channel and max-float updates travel over a watch channel
/// where the latest value wins, so a flood of signals coalesces instead of
/// queueing.
#[derive(Debug)]
pub(crate) struct TicketQueue {
    add_tx: mpsc::UnboundedSender<SignedTicket>,
    signal_tx: watch::Sender<I256>,
    cancel: CancellationToken,
}

impl TicketQueue {
    /// Spawns the queue task and returns the handle plus the redeemable
    /// stream the task emits covered tickets on.
    pub fn start() -> (Self, mpsc::Receiver<SignedTicket>) {
        let (add_tx, add_rx) = mpsc::unbounded_channel();
        let (signal_tx, signal_rx) = watch::channel(I256::zero());
        let (redeemable_tx, redeemable_rx) = mpsc::channel(REDEEMABLE_CHANNEL_SIZE);
        let cancel = CancellationToken::new();
        tokio::spawn(run_queue_task(
            add_rx,
            signal_rx,
            redeemable_tx,
            cancel.clone(),
        ));
        (
            Self {
                add_tx,
                signal_tx,
                cancel,
            },
            redeemable_rx,
        )
    }

    /// Appends a ticket to the tail of the queue. An add racing `stop` is
    /// dropped without surfacing an error to the caller.
    pub fn add(&self, ticket: SignedTicket) {
        if self.add_tx.send(ticket).is_err() {
            debug!("ticket queue stopped, dropping ticket");
        }
    }

    /// Notifies the queue that the owning sender's max float changed.
    pub fn signal_max_float(&self, max_float: I256) {
        // Only fails once the queue task has exited
        let _ = self.signal_tx.send(max_float);
    }

    /// Terminates the queue task. The redeemable channel closes once the
    /// task observes the cancellation.
    pub fn stop(&self) {
        self.cancel.cancel();
    }
}

async fn run_queue_task(
    mut add_rx: mpsc::UnboundedReceiver<SignedTicket>,
    mut signal_rx: watch::Receiver<I256>,
    redeemable_tx: mpsc::Sender<SignedTicket>,
    cancel: CancellationToken,
) {
    let mut tickets: VecDeque<SignedTicket> = VecDeque::new();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!(queued = tickets.len(), "ticket queue exiting");
                return;
            }
            ticket = add_rx.recv() => {
                match ticket {
                    Some(ticket) => tickets.push_back(ticket),
                    // All handles dropped; nothing further can arrive
                    None => return,
                }
            }
            changed = signal_rx.changed() => {
                if changed.is_err() {
                    return;
                }
                // Tickets enqueued before this signal was sent are already
                // buffered; fold them in so the release scan sees the full
                // queue.
                while let Ok(ticket) = add_rx.try_recv() {
                    tickets.push_back(ticket);
                }
                let max_float = *signal_rx.borrow_and_update();
                if !release_covered(&mut tickets, max_float, &redeemable_tx, &cancel).await {
                    return;
                }
            }
        }
    }
}

/// Releases queued tickets in insertion order while the running max float
/// covers the head's face value. Returns false when the task should exit.
async fn release_covered(
    tickets: &mut VecDeque<SignedTicket>,
    mut max_float: I256,
    redeemable_tx: &mpsc::Sender<SignedTicket>,
    cancel: &CancellationToken,
) -> bool {
    while let Some(head) = tickets.front() {
        let face_value = i256_from(head.face_value());
        // Covers the negative max float case too: face values are never
        // negative, so nothing releases until credit recovers
        if face_value > max_float {
            break;
        }
        let Some(ticket) = tickets.pop_front() else {
            break;
        };
        tokio::select! {
            _ = cancel.cancelled() => return false,
            sent = redeemable_tx.send(ticket) => {
                if sent.is_err() {
                    warn!("redeemable consumer gone, stopping ticket queue");
                    return false;
                }
            }
        }
        max_float = max_float.saturating_sub(face_value);
    }
    true
}

/// Converts an unsigned amount to the signed domain used for max float
/// arithmetic, saturating at `I256::MAX` for values with the top bit set.
pub(crate) fn i256_from(value: U256) -> I256 {
    I256::try_from(value).unwrap_or(I256::MAX)
}
