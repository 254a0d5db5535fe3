// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Interfaces to the on-chain side of the micropayment protocol.
//!
//! The monitoring core never talks to a node directly; it consumes these
//! traits and leaves funding, redemption and confirmation to the adapters
//! that implement them.

use crate::error::PmResult;
use crate::types::Ticket;
use async_trait::async_trait;
use ethers::types::{Address, Bytes, TxHash, H256, U256};
use serde::{Deserialize, Serialize};

/// State of a sender's on-chain reserve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReserveState {
    /// The reserve is not frozen
    NotFrozen,
    /// The reserve has been frozen but not yet thawed
    Frozen,
    /// The freeze period is over
    Thawed,
}

/// Snapshot of a sender's on-chain funds as seen by the broker contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenderInfo {
    /// Amount of funds the sender has in its deposit
    pub deposit: U256,
    /// Block at which the sender can withdraw its deposit and reserve if
    /// the reserve has not been frozen
    pub withdraw_block: U256,
    /// Amount of funds the sender has in its reserve
    pub reserve: U256,
    /// State of the sender's reserve
    pub reserve_state: ReserveState,
    /// Round at which the sender can withdraw its deposit and reserve if
    /// the reserve has been frozen
    pub thaw_round: U256,
}

/// Abstraction over the on-chain smart contract that handles the
/// administrative tasks of the micropayment protocol, including deposits
/// and pay outs.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Funds a sender's deposit and reserve
    async fn fund_deposit_and_reserve(
        &self,
        deposit_amount: U256,
        reserve_amount: U256,
    ) -> PmResult<TxHash>;

    /// Funds a sender's deposit
    async fn fund_deposit(&self, amount: U256) -> PmResult<TxHash>;

    /// Funds a sender's reserve
    async fn fund_reserve(&self, amount: U256) -> PmResult<TxHash>;

    /// Initiates the unlock period after which a sender can withdraw its
    /// deposit and reserve
    async fn unlock(&self) -> PmResult<TxHash>;

    /// Stops a sender's active unlock period
    async fn cancel_unlock(&self) -> PmResult<TxHash>;

    /// Credits a sender with its deposit and reserve after the unlock
    /// period has passed
    async fn withdraw(&self) -> PmResult<TxHash>;

    /// Submits a winning ticket for validation; a valid ticket pays its
    /// face value to the ticket's recipient
    async fn redeem_winning_ticket(
        &self,
        ticket: &Ticket,
        sig: &Bytes,
        recipient_rand: U256,
    ) -> PmResult<TxHash>;

    /// Checks whether a ticket has already been redeemed
    async fn is_used_ticket(&self, ticket: &Ticket) -> PmResult<bool>;

    /// Waits for a submitted transaction to confirm on-chain and returns an
    /// error if it failed
    async fn check_tx(&self, tx: TxHash) -> PmResult<()>;
}

/// Source of sender reserve state, typically a caching layer in front of
/// the chain.
#[async_trait]
pub trait SenderManager: Send + Sync {
    /// Returns a sender's deposit and reserve information
    async fn get_sender_info(&self, addr: Address) -> PmResult<SenderInfo>;

    /// Returns the amount a claimant has already claimed from a sender's
    /// reserve
    async fn claimed_reserve(&self, reserve_holder: Address, claimant: Address) -> PmResult<U256>;

    /// Drops any cached state for a sender; the next read fetches fresh
    /// values from the chain
    async fn clear(&self, addr: Address);
}

/// View of protocol round state needed to divide a sender's reserve across
/// the active recipient set.
#[async_trait]
pub trait RoundsManager: Send + Sync {
    /// Returns the last initialized protocol round
    async fn last_initialized_round(&self) -> U256;

    /// Returns the block hash of the block the last round was initialized in
    async fn last_initialized_block_hash(&self) -> H256;

    /// Returns the size of the active transcoder set for the current round
    async fn get_transcoder_pool_size(&self) -> U256;
}
