//! Shared types used across modules
//!
//! This module contains types that are used by the ingest loop, the
//! stores, and the query server.

use serde::{Deserialize, Serialize};
use chrono::Utc;

/// A single radar reading as persisted in the store
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Reading {
    /// Sweep angle in degrees
    pub angle: f64,
    /// Measured distance in sensor units
    pub distance: f64,
    /// Wall-clock seconds since the Unix epoch, assigned at insertion time
    pub timestamp: f64,
}

impl Reading {
    pub fn new(angle: f64, distance: f64, timestamp: f64) -> Self {
        Self { angle, distance, timestamp }
    }
}

impl std::fmt::Display for Reading {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{angle: {}, distance: {}, timestamp: {}}}",
            self.angle, self.distance, self.timestamp
        )
    }
}

/// Source of insertion timestamps
pub trait Clock: Send + Sync {
    /// Current time as fractional seconds since the Unix epoch
    fn now(&self) -> f64;
}

/// Wall clock backed by `chrono::Utc`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        Utc::now().timestamp_micros() as f64 / 1_000_000.0
    }
}
