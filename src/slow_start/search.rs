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

//! SEARCH: Slow start Exit At Right CHokepoint.
//!
//! SEARCH decides when a connection should leave the exponential slow start
//! phase without waiting for a queue-filling loss event. It samples the
//! cumulative delivered-byte counter into fixed-duration time bins and
//! compares the bytes delivered over the most recent window against the
//! bytes delivered over the equivalent window one round trip earlier. While
//! slow start is effective, delivery doubles every round trip; once the
//! bottleneck queue starts to fill, the most recent window stops keeping up
//! and the normalized difference between the two windows crosses a
//! threshold, which is the exit signal.
//!
//! See <https://datatracker.ietf.org/doc/html/draft-chung-ccwg-search>.

use log::*;

use super::bins::BinRing;
use crate::connection::ConnectionState;
use crate::error::Error;
use crate::Result;

/// Tuning constants. Window size as a fraction of the RTT, in tens of
/// percent.
///
/// The delivered-byte window spans `WINDOW_SIZE_FACTOR / 10` percent of one
/// round trip, split over `PRIMARY_BINS` bins. Default to 3.5 round trips
/// per window.
const WINDOW_SIZE_FACTOR: u64 = 35;

/// Tuning constants. Number of bins in one delivered-byte window.
const PRIMARY_BINS: usize = 10;

/// Tuning constants. Additional bins kept beyond the primary window.
///
/// The extra capacity lets the previous-window query reach one round trip
/// into the past without a second buffer. A window evaluation is skipped
/// when the RTT to bin-duration ratio outgrows this capacity.
const EXTRA_BINS: usize = 15;

/// Tuning constants. Exit threshold for the normalized window difference,
/// in percent.
///
/// Smaller values exit earlier under jitter; larger values may not exit
/// until loss is encountered.
const EXIT_THRESHOLD_PERCENT: u64 = 35;

/// Tuning constants. Missed-bin tolerance, in round trips.
///
/// If more than `ALPHA` round trips worth of bins have passed since the last
/// update, the delivered-byte history is considered stale and the estimator
/// is reset.
const ALPHA: u64 = 2;

/// Tuning constants. Initial congestion window in segments, the rollback
/// floor.
const INITIAL_CONGESTION_WINDOW: u64 = 10;

/// SEARCH configuration.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Window size as a fraction of the RTT, in tens of percent.
    window_size_factor: u64,

    /// Number of bins in one delivered-byte window.
    primary_bins: usize,

    /// Additional bins kept beyond the primary window.
    extra_bins: usize,

    /// Exit threshold for the normalized window difference, in percent.
    exit_threshold_percent: u64,

    /// Missed-bin tolerance, in round trips.
    alpha: u64,

    /// Whether to roll the congestion window back on exit, to undo the
    /// overshoot sent past the detected chokepoint.
    rollback_enabled: bool,

    /// Initial congestion window in segments. Rollback never reduces the
    /// congestion window below this value.
    initial_congestion_window: u64,
}

impl SearchConfig {
    /// Update the window size factor.
    pub fn set_window_size_factor(&mut self, factor: u64) -> &mut Self {
        self.window_size_factor = factor;
        self
    }

    /// Update the number of bins per window.
    pub fn set_primary_bins(&mut self, bins: usize) -> &mut Self {
        self.primary_bins = bins;
        self
    }

    /// Update the number of extra bins.
    pub fn set_extra_bins(&mut self, bins: usize) -> &mut Self {
        self.extra_bins = bins;
        self
    }

    /// Update the exit threshold.
    pub fn set_exit_threshold_percent(&mut self, percent: u64) -> &mut Self {
        self.exit_threshold_percent = percent;
        self
    }

    /// Update the missed-bin tolerance.
    pub fn set_alpha(&mut self, alpha: u64) -> &mut Self {
        self.alpha = alpha;
        self
    }

    /// Enable congestion window rollback on exit.
    pub fn enable_rollback(&mut self, enable: bool) -> &mut Self {
        self.rollback_enabled = enable;
        self
    }

    /// Update the initial congestion window.
    pub fn set_initial_congestion_window(&mut self, cwnd: u64) -> &mut Self {
        self.initial_congestion_window = cwnd;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.window_size_factor == 0 {
            return Err(Error::InvalidConfig("zero window size factor".into()));
        }
        if self.primary_bins == 0 {
            return Err(Error::InvalidConfig("zero primary bins".into()));
        }
        if self.extra_bins < 2 {
            return Err(Error::InvalidConfig(
                "extra bins too small for a previous-window lookup".into(),
            ));
        }
        if self.alpha == 0 {
            return Err(Error::InvalidConfig("zero alpha".into()));
        }
        Ok(())
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            window_size_factor: WINDOW_SIZE_FACTOR,
            primary_bins: PRIMARY_BINS,
            extra_bins: EXTRA_BINS,
            exit_threshold_percent: EXIT_THRESHOLD_PERCENT,
            alpha: ALPHA,
            rollback_enabled: false,
            initial_congestion_window: INITIAL_CONGESTION_WINDOW,
        }
    }
}

/// The SEARCH binned delivery estimator.
///
/// One instance tracks one flow. All state fits in the fixed-capacity bin
/// ring; arithmetic is integer-only and every call runs in constant time.
#[derive(Debug)]
pub struct Search {
    /// Configuration.
    config: SearchConfig,

    /// Scaled cumulative delivered-byte counters.
    bins: BinRing,

    /// Duration of each bin in microseconds. Zero means the duration has not
    /// been derived from an RTT sample yet.
    bin_duration_us: u64,

    /// End time of the current bin in microseconds.
    bin_end_us: u64,

    /// Logical index of the current bin. `-1` means no samples yet.
    curr_idx: i64,

    /// Whether the exit condition has fired.
    exited: bool,
}

impl Search {
    pub fn new(config: SearchConfig) -> Result<Self> {
        config.validate()?;
        let total_bins = config.primary_bins + config.extra_bins;
        Ok(Self {
            config,
            bins: BinRing::new(total_bins),
            bin_duration_us: 0,
            bin_end_us: 0,
            curr_idx: -1,
            exited: false,
        })
    }

    /// Logical index of the current bin, `-1` before the first sample.
    pub fn current_index(&self) -> i64 {
        self.curr_idx
    }

    /// Duration of each bin in microseconds, zero while uninitialized.
    pub fn bin_duration_us(&self) -> u64 {
        self.bin_duration_us
    }

    /// Uniform right-shift applied to the stored counters.
    pub fn scale_factor(&self) -> u8 {
        self.bins.scale_factor()
    }

    /// Whether the exit condition has fired.
    pub fn has_exited(&self) -> bool {
        self.exited
    }

    /// Drop all delivered-byte history and start a new episode.
    ///
    /// A full reset (`preserve_bin_duration = false`) also forces the bin
    /// duration to be re-derived from the next RTT sample. A partial reset
    /// keeps the duration, for cases where the flow is still within one RTT
    /// of valid tracking.
    pub fn reset(&mut self, preserve_bin_duration: bool) {
        self.bins.clear();
        self.curr_idx = -1;
        self.bin_end_us = 0;
        self.exited = false;
        if !preserve_bin_duration {
            self.bin_duration_us = 0;
        }
    }

    /// Drive the estimator for one acknowledgment.
    ///
    /// `now_us` is the current timestamp and `rtt_us` the latest RTT sample,
    /// both in microseconds. Effects on slow start exit are applied through
    /// the connection's congestion window fields.
    pub fn update<C: ConnectionState>(&mut self, conn: &mut C, now_us: u64, rtt_us: u64) {
        if self.exited {
            return;
        }
        let rtt_us = rtt_us.max(1);

        // The first acknowledgment seeds bin 0 and derives the bin duration.
        if self.curr_idx < 0 {
            self.init_bins(conn.bytes_acked(), now_us, rtt_us);
            return;
        }

        if now_us > self.bin_end_us {
            self.update_bins(conn, now_us, rtt_us);
            self.evaluate_exit(conn, rtt_us);
        }
    }

    /// Delivered bytes between logical bin indices `left` and `right`, in
    /// scaled units.
    ///
    /// `fraction` expresses, in percent, how far into bin `left`'s interval
    /// the true window boundary falls; the edges are linearly interpolated
    /// between whole-bin samples. This trades exactness for O(1) fixed
    /// memory instead of per-packet timestamps.
    pub fn compute_delivered_window(&self, left: i64, right: i64, fraction: u64) -> u64 {
        let bin = |idx: i64| u64::from(self.bins.get(idx));

        let mut delivered = bin(right - 1).saturating_sub(bin(left));

        if left == 0 {
            // No bin -1 exists; the previous delta is the whole of bin 0.
            delivered += bin(left) * fraction / 100;
        } else {
            delivered += bin(left).saturating_sub(bin(left - 1)) * fraction / 100;
        }

        delivered += bin(right).saturating_sub(bin(right - 1)) * (100 - fraction) / 100;

        delivered
    }

    /// Seed bin 0 from the current cumulative counter, deriving the bin
    /// duration from the RTT sample if it is unset.
    fn init_bins(&mut self, bytes_acked: u64, now_us: u64, rtt_us: u64) {
        if self.bin_duration_us == 0 {
            self.bin_duration_us = (rtt_us * self.config.window_size_factor
                / (self.config.primary_bins as u64 * 10))
                .max(1);
        }
        self.bin_end_us = now_us + self.bin_duration_us;
        self.curr_idx = 0;

        let value = self.bins.scale_value(bytes_acked);
        self.bins.set(0, value);
    }

    /// Advance the current bin past every boundary crossed since the last
    /// update and store the latest cumulative counter.
    fn update_bins<C: ConnectionState>(&mut self, conn: &mut C, now_us: u64, rtt_us: u64) {
        // Delivery samples taken while the sender has no data to send
        // reflect the application, not the path; drop the history but keep
        // the bin duration.
        if conn.is_app_limited() {
            debug!("search: app limited, partial reset");
            self.reset(true);
            return;
        }

        let bin_duration = self.bin_duration_us.max(1);
        let passed_bins = (now_us - self.bin_end_us) / bin_duration + 1;
        let total_bins = (self.config.primary_bins + self.config.extra_bins) as u64;

        // More than alpha round trips without a qualifying ack: the series
        // is no longer temporally synchronized, so restart it from the
        // current sample instead of comparing against stale windows.
        let initial_rtt = self.initial_rtt_estimate(bin_duration);
        if passed_bins > self.config.alpha * (initial_rtt / bin_duration) {
            debug!(
                "search: {} bins missed, {} reset",
                passed_bins,
                if passed_bins > total_bins {
                    "full"
                } else {
                    "partial"
                }
            );
            self.reset(passed_bins <= total_bins);
            self.init_bins(conn.bytes_acked(), now_us, rtt_us);
            return;
        }

        // The series is cumulative, so bins skipped in a silent span simply
        // repeat the last known total.
        let last = self.bins.get(self.curr_idx);
        for index in self.curr_idx + 1..self.curr_idx + passed_bins as i64 {
            self.bins.set(index, last);
        }

        self.bin_end_us += passed_bins * bin_duration;
        self.curr_idx += passed_bins as i64;

        let value = self.bins.scale_value(conn.bytes_acked());
        self.bins.set(self.curr_idx, value);
    }

    /// Compare the most recent window against the window one round trip
    /// earlier and exit slow start if delivery growth has stalled.
    fn evaluate_exit<C: ConnectionState>(&mut self, conn: &mut C, rtt_us: u64) {
        if self.curr_idx < 0 {
            return;
        }
        let bin_duration = self.bin_duration_us.max(1);
        let primary_bins = self.config.primary_bins as i64;

        let prev_idx = self.curr_idx - (rtt_us / bin_duration) as i64;

        // Not decidable yet: either the history since the last reset is too
        // shallow, or the RTT outgrew the extra bin capacity.
        if prev_idx < primary_bins
            || self.curr_idx - prev_idx >= self.config.extra_bins as i64 - 1
        {
            return;
        }

        let curr_delivered =
            self.compute_delivered_window(self.curr_idx - primary_bins, self.curr_idx, 0);
        let fraction = (rtt_us % bin_duration) * 100 / bin_duration;
        let prev_delivered =
            self.compute_delivered_window(prev_idx - primary_bins, prev_idx, fraction);

        if prev_delivered == 0 {
            return;
        }

        let norm_diff = (2 * prev_delivered as i64 - curr_delivered as i64) * 100
            / (2 * prev_delivered as i64);
        trace!(
            "search: curr_delivered={} prev_delivered={} norm_diff={}",
            curr_delivered,
            prev_delivered,
            norm_diff
        );

        if 2 * prev_delivered >= curr_delivered
            && norm_diff >= self.config.exit_threshold_percent as i64
        {
            self.exit_slow_start(conn);
        }
    }

    /// Leave slow start: optionally roll the congestion window back to undo
    /// the overshoot, then pin the slow start threshold to it.
    ///
    /// This is the one point where the estimator mutates external state.
    fn exit_slow_start<C: ConnectionState>(&mut self, conn: &mut C) {
        if self.config.rollback_enabled {
            let bin_duration = self.bin_duration_us.max(1);
            let initial_rtt = self.initial_rtt_estimate(bin_duration);

            // The overshoot is what was delivered in the two round trips it
            // took to detect the stall.
            let cong_idx = (self.curr_idx - (2 * initial_rtt / bin_duration) as i64).max(0);
            let overshoot_bytes = self.compute_delivered_window(cong_idx, self.curr_idx, 0)
                << self.bins.scale_factor();
            let overshoot_cwnd = overshoot_bytes / conn.max_segment_size().max(1);

            let cwnd = conn.congestion_window();
            let floor = self.config.initial_congestion_window;
            if overshoot_cwnd < cwnd {
                conn.set_congestion_window((cwnd - overshoot_cwnd).max(floor));
            } else {
                conn.set_congestion_window(floor);
            }
        }

        conn.set_slow_start_threshold(conn.congestion_window());
        self.exited = true;
        debug!(
            "search: exit slow start, cwnd={} ssthresh={}",
            conn.congestion_window(),
            conn.slow_start_threshold()
        );
    }

    /// Invert the bin-duration derivation to recover the RTT the series was
    /// sized for.
    fn initial_rtt_estimate(&self, bin_duration: u64) -> u64 {
        bin_duration * self.config.primary_bins as u64 * 10 / self.config.window_size_factor
    }
}
