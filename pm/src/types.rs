// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

use ethers::types::{Address, Bytes, H256, U256};
use serde::{Deserialize, Serialize};

/// A probabilistic payment ticket.
///
/// Only `face_value` and `sender_nonce` are interpreted by the monitoring
/// core; the remaining fields are carried through for on-chain redemption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    /// Address of the claimant this ticket pays out to
    pub recipient: Address,
    /// Address of the sender whose deposit and reserve back the ticket
    pub sender: Address,
    /// Amount paid out if the ticket wins
    pub face_value: U256,
    /// Probability that the ticket wins, encoded as a fixed-point fraction
    /// of the u256 range
    pub win_prob: U256,
    /// Monotonic counter scoped to the current recipient random value
    pub sender_nonce: u32,
    /// Commitment to the recipient random value used for the winning check
    pub recipient_rand_hash: H256,
    /// Round during which the ticket was created
    pub creation_round: u64,
    /// Block hash associated with the creation round
    pub creation_round_block_hash: H256,
}

/// A ticket paired with the sender's signature and the revealed recipient
/// random value, ready for on-chain redemption once credit allows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTicket {
    pub ticket: Ticket,
    pub sig: Bytes,
    pub recipient_rand: U256,
}

impl SignedTicket {
    pub fn face_value(&self) -> U256 {
        self.ticket.face_value
    }

    pub fn sender_nonce(&self) -> u32 {
        self.ticket.sender_nonce
    }
}
