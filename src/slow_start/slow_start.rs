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

//! Slow start exit detection strategies.
//!
//! A congestion controller owns at most one exit detector per flow. The
//! detector is an explicit tagged variant rather than overlaid storage, so a
//! controller can never feed acknowledgments to two detectors at once.

use core::str::FromStr;

use crate::connection::ConnectionState;
use crate::error::Error;
use crate::Result;
pub use search::Search;
pub use search::SearchConfig;

/// Available slow start exit detection algorithm.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Default)]
pub enum SlowStartAlgorithm {
    /// No detector; slow start runs until a loss event.
    Off,

    /// SEARCH compares delivered-byte windows one round trip apart and
    /// exits once delivery growth stalls, before the bottleneck queue
    /// overfills.
    #[default]
    Search,
}

impl FromStr for SlowStartAlgorithm {
    type Err = Error;

    fn from_str(algor: &str) -> Result<SlowStartAlgorithm> {
        if algor.eq_ignore_ascii_case("off") {
            Ok(SlowStartAlgorithm::Off)
        } else if algor.eq_ignore_ascii_case("search") {
            Ok(SlowStartAlgorithm::Search)
        } else {
            Err(Error::InvalidConfig("unknown".into()))
        }
    }
}

/// A slow start exit detector selected per congestion-control strategy.
#[derive(Debug)]
pub enum SlowStartDetector {
    /// No detection.
    Off,

    /// The SEARCH binned delivery estimator.
    Search(Search),
}

impl SlowStartDetector {
    /// Process one acknowledgment.
    pub fn update<C: ConnectionState>(&mut self, conn: &mut C, now_us: u64, rtt_us: u64) {
        match self {
            SlowStartDetector::Off => (),
            SlowStartDetector::Search(search) => search.update(conn, now_us, rtt_us),
        }
    }

    /// Restart detection, e.g. after a loss event or an idle period.
    pub fn reset(&mut self, preserve_bin_duration: bool) {
        match self {
            SlowStartDetector::Off => (),
            SlowStartDetector::Search(search) => search.reset(preserve_bin_duration),
        }
    }

    /// Whether the detector has signaled slow start exit.
    pub fn has_exited(&self) -> bool {
        match self {
            SlowStartDetector::Off => false,
            SlowStartDetector::Search(search) => search.has_exited(),
        }
    }
}

/// Build a slow start exit detector.
pub fn build_slow_start_detector(
    algor: SlowStartAlgorithm,
    conf: SearchConfig,
) -> Result<SlowStartDetector> {
    match algor {
        SlowStartAlgorithm::Off => Ok(SlowStartDetector::Off),
        SlowStartAlgorithm::Search => Ok(SlowStartDetector::Search(Search::new(conf)?)),
    }
}


mod bins;
mod search;
