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

//! tcp-search implements the [SEARCH] slow start exit algorithm for
//! loss-based congestion control.
//!
//! Slow start doubles the congestion window every round trip and, left
//! alone, only stops when the bottleneck queue overflows and packets are
//! lost. SEARCH detects the right exit point earlier: it samples the
//! cumulative delivered-byte counter into fixed-duration time bins and exits
//! when the bytes delivered over the most recent window stop keeping up with
//! twice the window one round trip earlier, the signature of a bottleneck
//! queue filling up.
//!
//! The estimator is deliberately small: fixed memory per flow, integer-only
//! arithmetic, and a constant amount of work per acknowledgment. It reaches
//! the owning transport only through the [`ConnectionState`] capability
//! trait, so it can be embedded in any congestion controller and tested
//! against substitutable doubles.
//!
//! ## Example
//!
//! ```
//! use tcp_search::MockConnection;
//! use tcp_search::Search;
//! use tcp_search::SearchConfig;
//!
//! let mut search = Search::new(SearchConfig::default())?;
//! let mut conn = MockConnection::default();
//!
//! // One call per acknowledgment; timestamps and RTT in microseconds.
//! conn.bytes_acked = 1500;
//! search.update(&mut conn, 1_000_000, 20_000);
//! # Ok::<(), tcp_search::Error>(())
//! ```
//!
//! [SEARCH]: https://datatracker.ietf.org/doc/html/draft-chung-ccwg-search

/// A specialized [`Result`] type for estimator operations.
pub type Result<T> = std::result::Result<T, Error>;

pub use crate::connection::ConnectionState;
pub use crate::connection::MockConnection;
pub use crate::error::Error;
pub use crate::slow_start::build_slow_start_detector;
pub use crate::slow_start::Search;
pub use crate::slow_start::SearchConfig;
pub use crate::slow_start::SlowStartAlgorithm;
pub use crate::slow_start::SlowStartDetector;

pub mod connection;
pub mod error;

#[path = "slow_start/slow_start.rs"]
mod slow_start;
