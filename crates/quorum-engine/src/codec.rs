//! Local (day, minutes-from-midnight) ↔ canonical UTC slot conversion.
//!
//! The UI works in the viewer's civil time; everything else in the engine works
//! on [`SlotInstant`]. This module is the only place the two meet.

use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;

use crate::dst::DstPolicy;
use crate::error::{QuorumError, Result};
use crate::slot::{EventWindow, LocalSlot, SlotInstant, SLOT_MINUTES};

const MINUTES_PER_DAY: u32 = 24 * 60;

/// Longest DST gap we will step over, in slots (two hours).
const MAX_GAP_SLOTS: i64 = 4;

/// Converts between a civil time zone's slot pairs and canonical UTC slots.
#[derive(Debug, Clone)]
pub struct SlotCodec<Z: TimeZone> {
    zone: Z,
    dst: DstPolicy,
}

impl<Z: TimeZone> SlotCodec<Z> {
    pub fn new(zone: Z) -> Self {
        Self {
            zone,
            dst: DstPolicy::default(),
        }
    }

    pub fn with_dst_policy(mut self, dst: DstPolicy) -> Self {
        self.dst = dst;
        self
    }

    pub fn zone(&self) -> &Z {
        &self.zone
    }

    pub fn dst_policy(&self) -> DstPolicy {
        self.dst
    }

    /// Interpret `(day, minutes_from_midnight)` in this codec's zone.
    ///
    /// [`Self::from_instant`] returns the same pair for every local time that
    /// exists. A gap time accepted under [`DstPolicy::ShiftForward`] reads back
    /// as the first half-hour after the gap.
    ///
    /// # Errors
    /// - `InvalidMinutes` unless `minutes_from_midnight` is a multiple of 30 below 1440.
    /// - `NonexistentLocalTime` for a DST-gap time under [`DstPolicy::Reject`].
    /// - `MisalignedInstant` when the zone's offset puts the result off the UTC grid.
    pub fn to_instant(&self, day: NaiveDate, minutes_from_midnight: u32) -> Result<SlotInstant> {
        if minutes_from_midnight >= MINUTES_PER_DAY
            || minutes_from_midnight % SLOT_MINUTES as u32 != 0
        {
            return Err(QuorumError::InvalidMinutes(minutes_from_midnight));
        }

        let naive = day
            .and_hms_opt(minutes_from_midnight / 60, minutes_from_midnight % 60, 0)
            .ok_or(QuorumError::InvalidMinutes(minutes_from_midnight))?;

        let gap = || QuorumError::NonexistentLocalTime {
            day,
            minutes: minutes_from_midnight,
        };

        let resolved = match self.resolve(naive) {
            Some(instant) => instant,
            None => match self.dst {
                DstPolicy::Reject => return Err(gap()),
                DstPolicy::ShiftForward => (1..=MAX_GAP_SLOTS)
                    .filter_map(|n| naive.checked_add_signed(Duration::minutes(n * SLOT_MINUTES)))
                    .find_map(|candidate| self.resolve(candidate))
                    .ok_or_else(gap)?,
            },
        };

        SlotInstant::new(resolved)
    }

    /// Project a canonical slot into this codec's civil time.
    pub fn from_instant(&self, slot: SlotInstant) -> LocalSlot {
        let local: NaiveDateTime = slot.start().with_timezone(&self.zone).naive_local();
        LocalSlot {
            day: local.date(),
            minutes: local.hour() * 60 + local.minute(),
        }
    }

    /// Window covering the local days `first..=last`, midnight to midnight.
    pub fn window_for_days(&self, first: NaiveDate, last: NaiveDate) -> Result<EventWindow> {
        let after_last = last.succ_opt().ok_or_else(|| {
            QuorumError::InvalidWindow(format!("no day after {}", last))
        })?;
        let start = self.midnight(first)?;
        let end = self.midnight(after_last)?;
        EventWindow::new(start, end)
    }

    /// Local midnight; a midnight lost to DST moves to the first valid half-hour.
    fn midnight(&self, day: NaiveDate) -> Result<DateTime<Utc>> {
        let codec = SlotCodec {
            zone: self.zone.clone(),
            dst: DstPolicy::ShiftForward,
        };
        codec.to_instant(day, 0).map(SlotInstant::start)
    }

    fn resolve(&self, naive: NaiveDateTime) -> Option<DateTime<Utc>> {
        match self.zone.from_local_datetime(&naive) {
            LocalResult::Single(dt) => Some(dt.with_timezone(&Utc)),
            LocalResult::Ambiguous(earliest, _) => Some(earliest.with_timezone(&Utc)),
            LocalResult::None => None,
        }
    }
}

impl SlotCodec<Tz> {
    /// Build a codec from an IANA zone name (e.g., "Europe/Berlin").
    pub fn from_iana(name: &str) -> Result<Self> {
        let zone: Tz = name
            .parse()
            .map_err(|_| QuorumError::InvalidTimezone(name.to_string()))?;
        Ok(Self::new(zone))
    }
}

impl SlotCodec<Utc> {
    pub fn utc() -> Self {
        Self::new(Utc)
    }
}
