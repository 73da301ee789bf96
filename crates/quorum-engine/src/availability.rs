//! Per-participant availability: slot sets, run-length blocks, and the
//! persistence boundary.
//!
//! Storage keeps availability as [`AvailabilityBlock`] rows (one contiguous run
//! per row); computation works on [`AvailabilitySet`]. [`encode_blocks`] and
//! [`expand_blocks`] convert between the two losslessly.
//!
//! Malformed rows are never fatal: [`sanitize_blocks`] drops them with a
//! warning so one bad row cannot block scheduling for everyone else.

use std::collections::{btree_set, BTreeMap, BTreeSet};
use std::convert::Infallible;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{QuorumError, Result};
use crate::slot::{EventId, EventWindow, ParticipantId, SlotInstant, MAX_WINDOW_SLOTS};

/// Upper bound on the length of one stored block; no block outlasts a window.
pub const MAX_SLOTS_PER_BLOCK: i64 = MAX_WINDOW_SLOTS;

/// The set of slots one participant marked as free for one event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AvailabilitySet {
    slots: BTreeSet<SlotInstant>,
}

impl AvailabilitySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the slot was not already present.
    pub fn insert(&mut self, slot: SlotInstant) -> bool {
        self.slots.insert(slot)
    }

    pub fn remove(&mut self, slot: SlotInstant) -> bool {
        self.slots.remove(&slot)
    }

    /// Flip one slot, as a tap in the grid does. Returns the new state.
    pub fn toggle(&mut self, slot: SlotInstant) -> bool {
        if self.slots.remove(&slot) {
            false
        } else {
            self.slots.insert(slot);
            true
        }
    }

    pub fn contains(&self, slot: SlotInstant) -> bool {
        self.slots.contains(&slot)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Slots in ascending order.
    pub fn iter(&self) -> btree_set::Iter<'_, SlotInstant> {
        self.slots.iter()
    }

    /// Copy of this set with every slot outside `window` removed.
    pub fn clipped_to(&self, window: &EventWindow) -> AvailabilitySet {
        self.slots
            .iter()
            .copied()
            .filter(|slot| window.contains(*slot))
            .collect()
    }
}

impl FromIterator<SlotInstant> for AvailabilitySet {
    fn from_iter<I: IntoIterator<Item = SlotInstant>>(iter: I) -> Self {
        Self {
            slots: iter.into_iter().collect(),
        }
    }
}

impl Extend<SlotInstant> for AvailabilitySet {
    fn extend<I: IntoIterator<Item = SlotInstant>>(&mut self, iter: I) {
        self.slots.extend(iter);
    }
}

impl<'a> IntoIterator for &'a AvailabilitySet {
    type Item = &'a SlotInstant;
    type IntoIter = btree_set::Iter<'a, SlotInstant>;

    fn into_iter(self) -> Self::IntoIter {
        self.slots.iter()
    }
}

/// A stored run of consecutive slots for one participant, half-open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityBlock {
    /// Who is free.
    pub participant: ParticipantId,
    /// The event this availability belongs to.
    pub event: EventId,
    /// Start of the first free slot (inclusive).
    pub start_time: DateTime<Utc>,
    /// End of the last free slot (exclusive).
    pub end_time: DateTime<Utc>,
}

impl AvailabilityBlock {
    pub fn new(
        participant: impl Into<ParticipantId>,
        event: impl Into<EventId>,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Self {
        Self {
            participant: participant.into(),
            event: event.into(),
            start_time,
            end_time,
        }
    }

    /// Check the row's shape and return its first slot and slot count.
    ///
    /// # Errors
    /// `MisalignedInstant` if either end is off the grid, `InvalidBlock` if the
    /// block is empty, reversed, or longer than [`MAX_SLOTS_PER_BLOCK`].
    pub fn validate(&self) -> Result<(SlotInstant, usize)> {
        let start = SlotInstant::new(self.start_time)?;
        let end = SlotInstant::new(self.end_time)?;
        let len = start.slots_until(end);
        if len <= 0 {
            return Err(QuorumError::InvalidBlock(format!(
                "end {} is not after start {}",
                end, start
            )));
        }
        if len > MAX_SLOTS_PER_BLOCK {
            return Err(QuorumError::InvalidBlock(format!(
                "{} slots exceeds the per-block limit of {}",
                len, MAX_SLOTS_PER_BLOCK
            )));
        }
        Ok((start, len as usize))
    }

    /// The slots covered by this block, ascending.
    pub fn slots(&self) -> Result<impl Iterator<Item = SlotInstant>> {
        let (start, len) = self.validate()?;
        Ok(std::iter::successors(Some(start), |slot| slot.next()).take(len))
    }

    pub fn slot_count(&self) -> Result<usize> {
        self.validate().map(|(_, len)| len)
    }
}

/// Run-length encode a set into sorted, maximal, non-adjacent blocks.
pub fn encode_blocks(
    participant: &ParticipantId,
    event: &EventId,
    set: &AvailabilitySet,
) -> Vec<AvailabilityBlock> {
    let mut runs: Vec<(SlotInstant, SlotInstant)> = Vec::new();
    for &slot in set {
        if let Some(last) = runs.last_mut() {
            if last.1.next() == Some(slot) {
                last.1 = slot;
                continue;
            }
        }
        runs.push((slot, slot));
    }

    runs.into_iter()
        .map(|(first, last)| AvailabilityBlock {
            participant: participant.clone(),
            event: event.clone(),
            start_time: first.start(),
            end_time: last.end(),
        })
        .collect()
}

/// Expand blocks into the set of slots they cover. Invalid blocks are skipped.
pub fn expand_blocks(blocks: &[AvailabilityBlock]) -> AvailabilitySet {
    let mut set = AvailabilitySet::new();
    for block in blocks {
        match block.slots() {
            Ok(slots) => set.extend(slots),
            Err(err) => warn!(participant = %block.participant, error = %err, "skipping block"),
        }
    }
    set
}

/// Drop malformed blocks and clip the rest to `window`.
///
/// Blocks left empty after clipping are dropped too. Never fails.
pub fn sanitize_blocks(
    blocks: &[AvailabilityBlock],
    window: Option<&EventWindow>,
) -> Vec<AvailabilityBlock> {
    let mut kept = Vec::with_capacity(blocks.len());
    for block in blocks {
        let (start, len) = match block.validate() {
            Ok(shape) => shape,
            Err(err) => {
                warn!(
                    participant = %block.participant,
                    event = %block.event,
                    error = %err,
                    "dropping malformed availability block"
                );
                continue;
            }
        };
        let Some(window) = window else {
            kept.push(block.clone());
            continue;
        };

        let inside: Vec<SlotInstant> = std::iter::successors(Some(start), |slot| slot.next())
            .take(len)
            .filter(|slot| window.contains(*slot))
            .collect();
        match (inside.first(), inside.last()) {
            (Some(first), Some(last)) => kept.push(AvailabilityBlock {
                start_time: first.start(),
                end_time: last.end(),
                ..block.clone()
            }),
            _ => debug!(
                participant = %block.participant,
                start = %block.start_time,
                "block lies outside the event window"
            ),
        }
    }
    kept
}

/// Group block rows into one set per participant, ignoring slots outside `window`.
///
/// Participants whose rows contribute no valid slot are absent from the map.
pub fn group_by_participant(
    blocks: &[AvailabilityBlock],
    window: Option<&EventWindow>,
) -> BTreeMap<ParticipantId, AvailabilitySet> {
    let mut sets: BTreeMap<ParticipantId, AvailabilitySet> = BTreeMap::new();
    for block in sanitize_blocks(blocks, window) {
        if let Ok(slots) = block.slots() {
            sets.entry(block.participant.clone()).or_default().extend(slots);
        }
    }
    sets
}

/// Anything that can produce every availability row for an event.
pub trait AvailabilitySource {
    type Error;

    fn availability_blocks(&self, event: &EventId)
        -> std::result::Result<Vec<AvailabilityBlock>, Self::Error>;
}

/// Anything that can replace one participant's availability for an event.
pub trait AvailabilitySink {
    type Error;

    /// Delete every row for `(participant, event)` and insert `blocks`.
    fn replace_availability(
        &mut self,
        participant: &ParticipantId,
        event: &EventId,
        blocks: Vec<AvailabilityBlock>,
    ) -> std::result::Result<(), Self::Error>;
}

impl AvailabilitySource for [AvailabilityBlock] {
    type Error = Infallible;

    fn availability_blocks(
        &self,
        event: &EventId,
    ) -> std::result::Result<Vec<AvailabilityBlock>, Infallible> {
        Ok(self.iter().filter(|b| &b.event == event).cloned().collect())
    }
}

impl AvailabilitySource for Vec<AvailabilityBlock> {
    type Error = Infallible;

    fn availability_blocks(
        &self,
        event: &EventId,
    ) -> std::result::Result<Vec<AvailabilityBlock>, Infallible> {
        self.as_slice().availability_blocks(event)
    }
}

/// Encode `set` and hand it to `sink` as the participant's full availability.
pub fn save_availability<S: AvailabilitySink + ?Sized>(
    sink: &mut S,
    participant: &ParticipantId,
    event: &EventId,
    set: &AvailabilitySet,
) -> std::result::Result<(), S::Error> {
    let blocks = encode_blocks(participant, event, set);
    debug!(%participant, %event, blocks = blocks.len(), "saving availability");
    sink.replace_availability(participant, event, blocks)
}

/// Fetch an event's rows from `source` and group them per participant.
pub fn load_availability<S: AvailabilitySource + ?Sized>(
    source: &S,
    event: &EventId,
    window: Option<&EventWindow>,
) -> std::result::Result<BTreeMap<ParticipantId, AvailabilitySet>, S::Error> {
    let blocks = source.availability_blocks(event)?;
    Ok(group_by_participant(&blocks, window))
}

/// Row store held in memory, for tests and offline tools.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    rows: Vec<AvailabilityBlock>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: Vec<AvailabilityBlock>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[AvailabilityBlock] {
        &self.rows
    }
}

impl AvailabilitySource for InMemoryStore {
    type Error = Infallible;

    fn availability_blocks(
        &self,
        event: &EventId,
    ) -> std::result::Result<Vec<AvailabilityBlock>, Infallible> {
        self.rows.availability_blocks(event)
    }
}

impl AvailabilitySink for InMemoryStore {
    type Error = Infallible;

    fn replace_availability(
        &mut self,
        participant: &ParticipantId,
        event: &EventId,
        blocks: Vec<AvailabilityBlock>,
    ) -> std::result::Result<(), Infallible> {
        self.rows
            .retain(|row| !(&row.participant == participant && &row.event == event));
        self.rows.extend(
            blocks
                .into_iter()
                .filter(|b| &b.participant == participant && &b.event == event),
        );
        Ok(())
    }
}
