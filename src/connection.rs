// Copyright (c) 2025 The tcp-search Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Capability interface to the owning connection.
//!
//! The estimator never holds a reference to a concrete connection or socket
//! type. Everything it needs from the transport is expressed by the
//! [`ConnectionState`] trait: the cumulative delivered-byte counter and the
//! congestion window fields it may adjust on slow start exit. This keeps the
//! estimator testable against substitutable doubles.

/// Connection state consumed and mutated by the estimator.
///
/// The caller is expected to serialize calls per flow; the estimator keeps no
/// shared state across flows.
pub trait ConnectionState {
    /// Cumulative bytes acknowledged by the receiver since the flow started.
    fn bytes_acked(&self) -> u64;

    /// Maximum segment size in bytes.
    fn max_segment_size(&self) -> u64;

    /// Whether the sender currently has no data queued to send. Delivery
    /// samples taken in this state reflect the application, not the path.
    fn is_app_limited(&self) -> bool;

    /// Congestion window, in segments.
    fn congestion_window(&self) -> u64;

    /// Update the congestion window, in segments.
    fn set_congestion_window(&mut self, cwnd: u64);

    /// Slow start threshold, in segments.
    fn slow_start_threshold(&self) -> u64;

    /// Update the slow start threshold, in segments.
    fn set_slow_start_threshold(&mut self, ssthresh: u64);
}

/// A minimal in-memory [`ConnectionState`], used by tests and benchmarks.
#[derive(Debug, Clone)]
pub struct MockConnection {
    /// Cumulative bytes acknowledged.
    pub bytes_acked: u64,

    /// Maximum segment size in bytes.
    pub max_segment_size: u64,

    /// Whether the sender is application-limited.
    pub app_limited: bool,

    /// Congestion window in segments.
    pub congestion_window: u64,

    /// Slow start threshold in segments.
    pub slow_start_threshold: u64,
}

impl Default for MockConnection {
    fn default() -> Self {
        Self {
            bytes_acked: 0,
            max_segment_size: 1500,
            app_limited: false,
            congestion_window: 10,
            slow_start_threshold: u64::MAX,
        }
    }
}

impl ConnectionState for MockConnection {
    fn bytes_acked(&self) -> u64 {
        self.bytes_acked
    }

    fn max_segment_size(&self) -> u64 {
        self.max_segment_size
    }

    fn is_app_limited(&self) -> bool {
        self.app_limited
    }

    fn congestion_window(&self) -> u64 {
        self.congestion_window
    }

    fn set_congestion_window(&mut self, cwnd: u64) {
        self.congestion_window = cwnd;
    }

    fn slow_start_threshold(&self) -> u64 {
        self.slow_start_threshold
    }

    fn set_slow_start_threshold(&mut self, ssthresh: u64) {
        self.slow_start_threshold = ssthresh;
    }
}
