//! Canonical slot instants, local display pairs, and event identifiers.
//!
//! A [`SlotInstant`] is always UTC and always on the half-hour grid, so two
//! slots compare equal exactly when they denote the same interval. A
//! [`LocalSlot`] is what a viewer sees on screen; it is a separate type and can
//! only become a `SlotInstant` through [`crate::codec::SlotCodec`].

use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{QuorumError, Result};

/// Length of one slot in minutes.
pub const SLOT_MINUTES: i64 = 30;

const SLOT_SECONDS: i64 = SLOT_MINUTES * 60;

/// Longest event window accepted, in slots: a leap year of half-hours.
pub const MAX_WINDOW_SLOTS: i64 = 48 * 366;

fn slot_duration() -> Duration {
    Duration::minutes(SLOT_MINUTES)
}

/// The canonical UTC start of a half-open `[t, t + 30min)` slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "DateTime<Utc>", into = "DateTime<Utc>")]
pub struct SlotInstant(DateTime<Utc>);

impl SlotInstant {
    /// Wrap a UTC instant, rejecting anything off the 30-minute grid.
    pub fn new(instant: DateTime<Utc>) -> Result<Self> {
        let aligned = instant.timestamp_subsec_nanos() == 0
            && instant.timestamp().rem_euclid(SLOT_SECONDS) == 0;
        // The slot end must also be representable.
        if !aligned || instant.checked_add_signed(slot_duration()).is_none() {
            return Err(QuorumError::MisalignedInstant(instant));
        }
        Ok(Self(instant))
    }

    /// Build a slot from a Unix timestamp in seconds.
    pub fn from_timestamp(secs: i64) -> Result<Self> {
        let instant = DateTime::from_timestamp(secs, 0).ok_or_else(|| {
            QuorumError::InvalidBlock(format!("timestamp {} out of range", secs))
        })?;
        Self::new(instant)
    }

    pub fn start(self) -> DateTime<Utc> {
        self.0
    }

    pub fn end(self) -> DateTime<Utc> {
        self.0 + slot_duration()
    }

    /// The slot `n` half-hours later (or earlier for negative `n`).
    pub fn checked_offset(self, n: i64) -> Option<Self> {
        let minutes = n.checked_mul(SLOT_MINUTES)?;
        let shifted = self.0.checked_add_signed(Duration::try_minutes(minutes)?)?;
        Self::new(shifted).ok()
    }

    /// The immediately following slot.
    pub fn next(self) -> Option<Self> {
        self.checked_offset(1)
    }

    /// Number of whole slots from `self` up to `other` (negative if `other` is earlier).
    pub fn slots_until(self, other: SlotInstant) -> i64 {
        (other.0 - self.0).num_seconds() / SLOT_SECONDS
    }
}

impl TryFrom<DateTime<Utc>> for SlotInstant {
    type Error = QuorumError;

    fn try_from(value: DateTime<Utc>) -> Result<Self> {
        Self::new(value)
    }
}

impl From<SlotInstant> for DateTime<Utc> {
    fn from(slot: SlotInstant) -> Self {
        slot.0
    }
}

impl fmt::Display for SlotInstant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

/// A slot as a viewer sees it: a civil date plus minutes from local midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LocalSlot {
    /// Civil date in the viewer's zone.
    pub day: NaiveDate,
    /// Minutes from local midnight, a multiple of 30 below 1440.
    pub minutes: u32,
}

impl LocalSlot {
    pub fn hour(&self) -> u32 {
        self.minutes / 60
    }

    pub fn minute(&self) -> u32 {
        self.minutes % 60
    }
}

impl fmt::Display for LocalSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:02}:{:02}", self.day, self.hour(), self.minute())
    }
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(
    /// Opaque participant identifier, stable for the lifetime of an event.
    ParticipantId
);

string_id!(
    /// Opaque event identifier.
    EventId
);

/// The half-open `[start, end)` range in which slots may be selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EventWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl EventWindow {
    /// # Errors
    /// `InvalidWindow` unless `start < end` and the window spans at most
    /// [`MAX_WINDOW_SLOTS`] slots.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if start >= end {
            return Err(QuorumError::InvalidWindow(format!(
                "start {} is not before end {}",
                start.to_rfc3339(),
                end.to_rfc3339()
            )));
        }
        if (end - start).num_seconds() > MAX_WINDOW_SLOTS * SLOT_SECONDS {
            return Err(QuorumError::InvalidWindow(format!(
                "{} to {} is longer than {} slots",
                start.to_rfc3339(),
                end.to_rfc3339(),
                MAX_WINDOW_SLOTS
            )));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// A slot is inside only if the whole half-hour fits in the window.
    pub fn contains(&self, slot: SlotInstant) -> bool {
        self.start <= slot.start() && slot.end() <= self.end
    }

    /// Every grid slot inside the window, ascending.
    pub fn slots(&self) -> impl Iterator<Item = SlotInstant> + '_ {
        let mut secs = self.start.timestamp();
        if self.start.timestamp_subsec_nanos() > 0 {
            secs += 1;
        }
        let rem = secs.rem_euclid(SLOT_SECONDS);
        if rem != 0 {
            secs += SLOT_SECONDS - rem;
        }
        let first = SlotInstant::from_timestamp(secs).ok();
        std::iter::successors(first, |slot| slot.next())
            .take_while(move |slot| self.contains(*slot))
    }

    /// Number of grid slots inside the window.
    pub fn slot_count(&self) -> usize {
        self.slots().count()
    }
}
