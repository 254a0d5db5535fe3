// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Per-sender tolerant error accounting.
//!
//! Some ticket errors are expected while a sender converges on fresh ticket
//! parameters, so a bounded number of them is tolerated per sender. The
//! count is reset whenever the sender's max float changes, since updated
//! parameters invalidate previously observed errors.

use ethers::types::Address;
use std::collections::HashMap;
use std::sync::Mutex;

/// Acceptable-error tracking consumed by the sender monitor
pub trait ErrorMonitor: Send + Sync {
    /// Records an error for a sender and reports whether it is still within
    /// the acceptable budget
    fn accept_err(&self, sender: Address) -> bool;

    /// Resets a sender's error count
    fn clear_err_count(&self, sender: Address);
}

/// ErrorMonitor that tolerates a fixed number of errors per sender
#[derive(Debug)]
pub struct MaxErrorsMonitor {
    max_errors: u32,
    counts: Mutex<HashMap<Address, u32>>,
}

impl MaxErrorsMonitor {
    pub fn new(max_errors: u32) -> Self {
        Self {
            max_errors,
            counts: Mutex::new(HashMap::new()),
        }
    }
}

impl ErrorMonitor for MaxErrorsMonitor {
    fn accept_err(&self, sender: Address) -> bool {
        let mut counts = match self.counts.lock() {
            Ok(counts) => counts,
            Err(poisoned) => poisoned.into_inner(),
        };
        let count = counts.entry(sender).or_insert(0);
        if *count >= self.max_errors {
            return false;
        }
        *count += 1;
        true
    }

    fn clear_err_count(&self, sender: Address) {
        let mut counts = match self.counts.lock() {
            Ok(counts) => counts,
            Err(poisoned) => poisoned.into_inner(),
        };
        counts.remove(&sender);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_errors_below_threshold() {
        let monitor = MaxErrorsMonitor::new(3);
        let sender = Address::random();

        assert!(monitor.accept_err(sender));
        assert!(monitor.accept_err(sender));
        assert!(monitor.accept_err(sender));
        // Fourth error exceeds the budget
        assert!(!monitor.accept_err(sender));
        assert!(!monitor.accept_err(sender));
    }

    #[test]
    fn test_counts_are_per_sender() {
        let monitor = MaxErrorsMonitor::new(1);
        let sender_a = Address::random();
        let sender_b = Address::random();

        assert!(monitor.accept_err(sender_a));
        assert!(!monitor.accept_err(sender_a));
        // An exhausted budget for one sender does not affect another
        assert!(monitor.accept_err(sender_b));
    }

    #[test]
    fn test_clear_resets_the_budget() {
        let monitor = MaxErrorsMonitor::new(2);
        let sender = Address::random();

        assert!(monitor.accept_err(sender));
        assert!(monitor.accept_err(sender));
        assert!(!monitor.accept_err(sender));

        monitor.clear_err_count(sender);

        assert!(monitor.accept_err(sender));
    }

    #[test]
    fn test_zero_budget_rejects_everything() {
        let monitor = MaxErrorsMonitor::new(0);
        let sender = Address::random();

        assert!(!monitor.accept_err(sender));
    }
}
