// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! In-memory mock collaborators used in test environments.

use crate::broker::{Broker, ReserveState, RoundsManager, SenderInfo, SenderManager};
use crate::clock::Clock;
use crate::error::{PmError, PmResult};
use crate::error_monitor::ErrorMonitor;
use crate::types::{SignedTicket, Ticket};
use async_trait::async_trait;
use ethers::types::{Address, Bytes, TxHash, H256, U256};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Mutex;

pub fn sender_info_with_reserve(reserve: U256) -> SenderInfo {
    SenderInfo {
        deposit: U256::from(500u64),
        withdraw_block: U256::zero(),
        reserve,
        reserve_state: ReserveState::NotFrozen,
        thaw_round: U256::zero(),
    }
}

pub fn default_signed_ticket(sender: Address, sender_nonce: u32) -> SignedTicket {
    signed_ticket_with_face_value(sender, sender_nonce, U256::from(5u64))
}

pub fn signed_ticket_with_face_value(
    sender: Address,
    sender_nonce: u32,
    face_value: U256,
) -> SignedTicket {
    SignedTicket {
        ticket: Ticket {
            recipient: Address::random(),
            sender,
            face_value,
            win_prob: U256::MAX,
            sender_nonce,
            recipient_rand_hash: H256::random(),
            creation_round: 5,
            creation_round_block_hash: H256::random(),
        },
        sig: Bytes::from(vec![42u8; 65]),
        recipient_rand: U256::from(7u64),
    }
}

/// Mock SenderManager that caches fetched sender info the way the
/// production chain adapter does: reads hit the cache until `clear` drops
/// the entry, so eviction tests can observe stale-vs-fresh values.
#[derive(Debug, Default)]
pub struct MockSenderManager {
    info: Mutex<HashMap<Address, SenderInfo>>,
    claimed: Mutex<HashMap<Address, U256>>,
    cache: Mutex<HashMap<Address, SenderInfo>>,
    err: Mutex<Option<PmError>>,
    claimed_err: Mutex<Option<PmError>>,
    cleared: Mutex<Vec<Address>>,
}

impl MockSenderManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the on-chain values a cache miss reads from
    pub fn set_info(&self, addr: Address, info: SenderInfo) {
        self.info.lock().unwrap().insert(addr, info);
    }

    pub fn set_reserve(&self, addr: Address, reserve: U256) {
        self.info
            .lock()
            .unwrap()
            .entry(addr)
            .or_insert_with(|| sender_info_with_reserve(reserve))
            .reserve = reserve;
    }

    pub fn set_claimed_reserve(&self, addr: Address, claimed: U256) {
        self.claimed.lock().unwrap().insert(addr, claimed);
    }

    /// Makes every read fail until cleared with `None`
    pub fn set_error(&self, err: Option<PmError>) {
        *self.err.lock().unwrap() = err;
    }

    /// Makes only claimed-reserve reads fail until cleared with `None`
    pub fn set_claimed_error(&self, err: Option<PmError>) {
        *self.claimed_err.lock().unwrap() = err;
    }

    pub fn cleared_addresses(&self) -> Vec<Address> {
        self.cleared.lock().unwrap().clone()
    }
}

#[async_trait]
impl SenderManager for MockSenderManager {
    async fn get_sender_info(&self, addr: Address) -> PmResult<SenderInfo> {
        if let Some(err) = self.err.lock().unwrap().clone() {
            return Err(err);
        }
        if let Some(cached) = self.cache.lock().unwrap().get(&addr) {
            return Ok(cached.clone());
        }
        let info = self
            .info
            .lock()
            .unwrap()
            .get(&addr)
            .cloned()
            .ok_or_else(|| PmError::ExternalRead(format!("no sender info for {:?}", addr)))?;
        self.cache.lock().unwrap().insert(addr, info.clone());
        Ok(info)
    }

    async fn claimed_reserve(
        &self,
        reserve_holder: Address,
        _claimant: Address,
    ) -> PmResult<U256> {
        if let Some(err) = self.err.lock().unwrap().clone() {
            return Err(err);
        }
        if let Some(err) = self.claimed_err.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(self
            .claimed
            .lock()
            .unwrap()
            .get(&reserve_holder)
            .copied()
            .unwrap_or_default())
    }

    async fn clear(&self, addr: Address) {
        self.cache.lock().unwrap().remove(&addr);
        self.cleared.lock().unwrap().push(addr);
    }
}

#[derive(Debug)]
pub struct MockRoundsManager {
    pool_size: Mutex<U256>,
}

impl MockRoundsManager {
    pub fn new(pool_size: u64) -> Self {
        Self {
            pool_size: Mutex::new(U256::from(pool_size)),
        }
    }

    pub fn set_pool_size(&self, pool_size: u64) {
        *self.pool_size.lock().unwrap() = U256::from(pool_size);
    }
}

#[async_trait]
impl RoundsManager for MockRoundsManager {
    async fn last_initialized_round(&self) -> U256 {
        U256::from(100u64)
    }

    async fn last_initialized_block_hash(&self) -> H256 {
        H256::zero()
    }

    async fn get_transcoder_pool_size(&self) -> U256 {
        *self.pool_size.lock().unwrap()
    }
}

/// Mock ErrorMonitor exposing whether the last state change reset the
/// error count: `accept_err` reports the flag, `clear_err_count` raises it.
#[derive(Debug, Default)]
pub struct MockErrorMonitor {
    acceptable: AtomicBool,
    cleared: Mutex<Vec<Address>>,
}

impl MockErrorMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_acceptable(&self, acceptable: bool) {
        self.acceptable.store(acceptable, Ordering::SeqCst);
    }

    pub fn cleared_addresses(&self) -> Vec<Address> {
        self.cleared.lock().unwrap().clone()
    }
}

impl ErrorMonitor for MockErrorMonitor {
    fn accept_err(&self, _sender: Address) -> bool {
        self.acceptable.load(Ordering::SeqCst)
    }

    fn clear_err_count(&self, sender: Address) {
        self.cleared.lock().unwrap().push(sender);
        self.acceptable.store(true, Ordering::SeqCst);
    }
}

/// Manually driven clock for TTL tests
#[derive(Debug)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(start: i64) -> Self {
        Self {
            now: AtomicI64::new(start),
        }
    }

    pub fn set(&self, now: i64) {
        self.now.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, secs: i64) {
        self.now.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn unix_now(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Mock Broker recording redeemed tickets, standing in for the downstream
/// redeemer's on-chain adapter.
#[derive(Debug, Default)]
pub struct MockBroker {
    redeemed: Mutex<Vec<Ticket>>,
}

impl MockBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn redeemed_tickets(&self) -> Vec<Ticket> {
        self.redeemed.lock().unwrap().clone()
    }
}

#[async_trait]
impl Broker for MockBroker {
    async fn fund_deposit_and_reserve(
        &self,
        _deposit_amount: U256,
        _reserve_amount: U256,
    ) -> PmResult<TxHash> {
        Ok(TxHash::random())
    }

    async fn fund_deposit(&self, _amount: U256) -> PmResult<TxHash> {
        Ok(TxHash::random())
    }

    async fn fund_reserve(&self, _amount: U256) -> PmResult<TxHash> {
        Ok(TxHash::random())
    }

    async fn unlock(&self) -> PmResult<TxHash> {
        Ok(TxHash::random())
    }

    async fn cancel_unlock(&self) -> PmResult<TxHash> {
        Ok(TxHash::random())
    }

    async fn withdraw(&self) -> PmResult<TxHash> {
        Ok(TxHash::random())
    }

    async fn redeem_winning_ticket(
        &self,
        ticket: &Ticket,
        _sig: &Bytes,
        _recipient_rand: U256,
    ) -> PmResult<TxHash> {
        self.redeemed.lock().unwrap().push(ticket.clone());
        Ok(TxHash::random())
    }

    async fn is_used_ticket(&self, ticket: &Ticket) -> PmResult<bool> {
        Ok(self
            .redeemed
            .lock()
            .unwrap()
            .iter()
            .any(|redeemed| redeemed == ticket))
    }

    async fn check_tx(&self, _tx: TxHash) -> PmResult<()> {
        Ok(())
    }
}
