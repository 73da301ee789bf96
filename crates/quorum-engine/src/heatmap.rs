//! Per-slot availability counts for the heat-map view.
//!
//! Only people who selected at least one slot count towards the total; a
//! participant who opened the event and marked nothing is not treated as
//! "busy everywhere".

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::availability::{group_by_participant, AvailabilityBlock, AvailabilitySet};
use crate::slot::{EventWindow, ParticipantId, SlotInstant};

/// How many of the engaged participants are free in one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HeatCell {
    /// The slot this cell describes.
    pub slot: SlotInstant,
    /// Participants free in this slot.
    pub available_count: usize,
    /// Participants with at least one selected slot in the event.
    pub total_participants: usize,
}

impl HeatCell {
    /// Share of participants available, in `0.0..=1.0`. Zero when nobody engaged.
    pub fn ratio(&self) -> f64 {
        if self.total_participants == 0 {
            0.0
        } else {
            self.available_count as f64 / self.total_participants as f64
        }
    }
}

/// Heat map for one event. Stores only slots where someone is available.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeatMap {
    total_participants: usize,
    cells: BTreeMap<SlotInstant, HeatCell>,
}

impl HeatMap {
    pub fn total_participants(&self) -> usize {
        self.total_participants
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn get(&self, slot: SlotInstant) -> Option<&HeatCell> {
        self.cells.get(&slot)
    }

    /// The cell for `slot`, defaulting to a zero count for unseen slots.
    pub fn cell(&self, slot: SlotInstant) -> HeatCell {
        self.cells.get(&slot).copied().unwrap_or(HeatCell {
            slot,
            available_count: 0,
            total_participants: self.total_participants,
        })
    }

    /// Non-zero cells in ascending slot order.
    pub fn cells(&self) -> impl Iterator<Item = &HeatCell> {
        self.cells.values()
    }

    /// One cell for every slot of `window`, zero-filled.
    pub fn grid(&self, window: &EventWindow) -> Vec<HeatCell> {
        window.slots().map(|slot| self.cell(slot)).collect()
    }

    /// Cells sharing the highest count, ascending by slot.
    pub fn peak(&self) -> Vec<HeatCell> {
        let Some(best) = self.cells.values().map(|c| c.available_count).max() else {
            return Vec::new();
        };
        self.cells
            .values()
            .filter(|c| c.available_count == best)
            .copied()
            .collect()
    }
}

/// Count, for every selected slot, how many participants include it.
pub fn aggregate(sets: &BTreeMap<ParticipantId, AvailabilitySet>) -> HeatMap {
    let engaged: Vec<&AvailabilitySet> = sets.values().filter(|s| !s.is_empty()).collect();
    let total_participants = engaged.len();

    let mut counts: BTreeMap<SlotInstant, usize> = BTreeMap::new();
    for set in &engaged {
        for &slot in *set {
            *counts.entry(slot).or_insert(0) += 1;
        }
    }

    let cells = counts
        .into_iter()
        .map(|(slot, available_count)| {
            (
                slot,
                HeatCell {
                    slot,
                    available_count,
                    total_participants,
                },
            )
        })
        .collect::<BTreeMap<_, _>>();

    debug!(
        participants = total_participants,
        slots = cells.len(),
        "aggregated heat map"
    );

    HeatMap {
        total_participants,
        cells,
    }
}

/// [`aggregate`] after discarding slots outside `window`.
///
/// A participant whose every slot falls outside the window is not counted.
pub fn aggregate_within(
    sets: &BTreeMap<ParticipantId, AvailabilitySet>,
    window: &EventWindow,
) -> HeatMap {
    let clipped: BTreeMap<ParticipantId, AvailabilitySet> = sets
        .iter()
        .map(|(id, set)| (id.clone(), set.clipped_to(window)))
        .collect();
    aggregate(&clipped)
}

/// Heat map straight from stored rows; malformed rows are dropped.
pub fn aggregate_blocks(blocks: &[AvailabilityBlock], window: Option<&EventWindow>) -> HeatMap {
    aggregate(&group_by_participant(blocks, window))
}
