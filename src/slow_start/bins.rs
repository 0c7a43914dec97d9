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

//! Circular storage for scaled cumulative delivered-byte counters.
//!
//! Each slot holds a cumulative byte count right-shifted by a uniform scale
//! factor so that it fits in 16 bits. Whenever a new value would overflow the
//! counter width, every stored slot is shifted by the same additional amount.
//! A partial rescale would corrupt window differences, so the shift is always
//! applied to the whole series at once.

/// Maximum representable counter value before a rescale is required.
pub(crate) const MAX_BIN_VALUE: u64 = 0xffff;

/// Fixed-capacity circular array of scaled cumulative-byte counters.
///
/// Slots are addressed by logical (unbounded) bin index; the physical slot is
/// the index modulo capacity.
#[derive(Debug)]
pub(crate) struct BinRing {
    /// Scaled cumulative counters.
    bins: Vec<u16>,

    /// Number of bits every stored counter has been right-shifted by.
    scale_factor: u8,
}

impl BinRing {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            bins: vec![0; capacity],
            scale_factor: 0,
        }
    }

    /// Counter at the given logical index.
    pub(crate) fn get(&self, index: i64) -> u16 {
        self.bins[self.slot(index)]
    }

    /// Store a counter at the given logical index.
    pub(crate) fn set(&mut self, index: i64, value: u16) {
        let slot = self.slot(index);
        self.bins[slot] = value;
    }

    /// Uniform right-shift applied to all stored counters.
    pub(crate) fn scale_factor(&self) -> u8 {
        self.scale_factor
    }

    /// Zero all counters and drop the accumulated scale factor.
    pub(crate) fn clear(&mut self) {
        self.bins.fill(0);
        self.scale_factor = 0;
    }

    /// Find the shift that brings `value` within the counter width, apply it
    /// to every stored counter, and return it so the caller can shift the
    /// value it is about to store by the same amount.
    pub(crate) fn rescale(&mut self, mut value: u64) -> u8 {
        let mut shift: u8 = 0;
        while value > MAX_BIN_VALUE {
            shift += 1;
            value >>= 1;
        }

        for bin in self.bins.iter_mut() {
            *bin >>= shift;
        }
        self.scale_factor += shift;

        shift
    }

    /// Scale a raw cumulative byte count down to a storable counter,
    /// rescaling the whole series first if the current scale factor is not
    /// enough.
    pub(crate) fn scale_value(&mut self, raw: u64) -> u16 {
        let mut value = raw >> self.scale_factor;
        if value > MAX_BIN_VALUE {
            let shift = self.rescale(value);
            value >>= shift;
        }
        value as u16
    }

    fn slot(&self, index: i64) -> usize {
        index.rem_euclid(self.bins.len() as i64) as usize
    }
}
