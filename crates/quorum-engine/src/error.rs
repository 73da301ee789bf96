//! Error types for quorum-engine operations.

use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum QuorumError {
    #[error("Invalid slot minutes: {0} (expected a multiple of 30 below 1440)")]
    InvalidMinutes(u32),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Nonexistent local time: {day} at minute {minutes} falls in a DST gap")]
    NonexistentLocalTime { day: NaiveDate, minutes: u32 },

    #[error("Misaligned instant: {0} is not on a 30-minute boundary")]
    MisalignedInstant(DateTime<Utc>),

    #[error("Invalid availability block: {0}")]
    InvalidBlock(String),

    #[error("Invalid event window: {0}")]
    InvalidWindow(String),

    #[error("Invalid scheduler configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, QuorumError>;
