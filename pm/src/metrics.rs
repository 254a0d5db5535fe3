// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

use prometheus::{
    register_int_counter_vec_with_registry, register_int_counter_with_registry,
    register_int_gauge_with_registry, IntCounter, IntCounterVec, IntGauge, Registry,
};

#[derive(Clone, Debug)]
pub struct PmMetrics {
    pub(crate) tickets_queued: IntCounter,
    pub(crate) tickets_released: IntCounter,
    pub(crate) senders_tracked: IntGauge,
    pub(crate) senders_evicted: IntCounter,
    pub(crate) float_updates: IntCounterVec,
    pub(crate) external_read_errors: IntCounterVec,
}

impl PmMetrics {
    pub fn new(registry: &Registry) -> Self {
        Self {
            tickets_queued: register_int_counter_with_registry!(
                "pm_tickets_queued",
                "Total number of tickets queued across all senders",
                registry,
            )
            .unwrap(),
            tickets_released: register_int_counter_with_registry!(
                "pm_tickets_released",
                "Total number of tickets released on the redeemable stream",
                registry,
            )
            .unwrap(),
            senders_tracked: register_int_gauge_with_registry!(
                "pm_senders_tracked",
                "Number of remote senders currently tracked",
                registry,
            )
            .unwrap(),
            senders_evicted: register_int_counter_with_registry!(
                "pm_senders_evicted",
                "Total number of idle senders evicted by the cleanup sweep",
                registry,
            )
            .unwrap(),
            float_updates: register_int_counter_vec_with_registry!(
                "pm_float_updates",
                "Total number of max float updates, by operation",
                &["op"],
                registry,
            )
            .unwrap(),
            external_read_errors: register_int_counter_vec_with_registry!(
                "pm_external_read_errors",
                "Total number of failed reserve state reads, by error type",
                &["error_type"],
                registry,
            )
            .unwrap(),
        }
    }

    pub fn new_for_testing() -> Self {
        Self::new(&Registry::new())
    }
}
