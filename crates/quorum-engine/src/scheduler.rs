//! Best common meeting window search.
//!
//! Expands every participant's blocks into a per-slot participant index, then
//! grows a candidate forward from each slot that meets the quorum. While
//! growing, the participant set is narrowed to those free in every slot so far;
//! growth stops as soon as narrowing would drop below the quorum, at a gap, or
//! at the scan cap.
//!
//! The greedy narrowing keeps as many people as possible for as long as
//! possible. It is not a maximum-clique search: a longer block with fewer
//! people can beat a shorter one with more.
//!
//! Candidates are scored `participants × duration_slots`. Every candidate with
//! the top score is returned, ordered by larger participant count, then
//! earliest start, then lexicographically smallest participant set.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::availability::{sanitize_blocks, AvailabilityBlock, AvailabilitySource};
use crate::error::{QuorumError, Result};
use crate::slot::{EventId, EventWindow, ParticipantId, SlotInstant};

/// Quorum and length limits for the search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchedulerConfig {
    /// Minimum participants a block must keep.
    pub min_participants: usize,
    /// Minimum block length in slots.
    pub min_block_slots: usize,
    /// Blocks grow to at most `min_block_slots × max_block_multiplier` slots.
    pub max_block_multiplier: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            min_participants: 2,
            min_block_slots: 2,
            max_block_multiplier: 2,
        }
    }
}

impl SchedulerConfig {
    pub fn new(
        min_participants: usize,
        min_block_slots: usize,
        max_block_multiplier: usize,
    ) -> Result<Self> {
        let config = Self {
            min_participants,
            min_block_slots,
            max_block_multiplier,
        };
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    /// `InvalidConfig` if any limit is zero.
    pub fn validate(&self) -> Result<()> {
        if self.min_participants < 1 {
            return Err(QuorumError::InvalidConfig(
                "min_participants must be at least 1".to_string(),
            ));
        }
        if self.min_block_slots < 1 {
            return Err(QuorumError::InvalidConfig(
                "min_block_slots must be at least 1".to_string(),
            ));
        }
        if self.max_block_multiplier < 1 {
            return Err(QuorumError::InvalidConfig(
                "max_block_multiplier must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Longest block the search will grow, in slots.
    pub fn scan_cap(&self) -> usize {
        self.min_block_slots.saturating_mul(self.max_block_multiplier)
    }
}

/// A candidate or selected meeting window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventBlock {
    /// First slot of the window.
    pub start_time: SlotInstant,
    /// Slot immediately after the window (exclusive end).
    pub end_time: SlotInstant,
    /// Everyone free for the whole window, sorted.
    pub participants: BTreeSet<ParticipantId>,
    /// Window length in 30-minute slots.
    pub duration_slots: usize,
}

impl EventBlock {
    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    pub fn score(&self) -> usize {
        self.participants.len() * self.duration_slots
    }
}

/// Best first: score, then head count, then start, then participant ids.
fn rank(a: &EventBlock, b: &EventBlock) -> Ordering {
    b.score()
        .cmp(&a.score())
        .then_with(|| b.participant_count().cmp(&a.participant_count()))
        .then_with(|| a.start_time.cmp(&b.start_time))
        .then_with(|| a.participants.cmp(&b.participants))
}

type SlotIndex = BTreeMap<SlotInstant, BTreeSet<ParticipantId>>;

/// Stateless best-window search over one event's availability rows.
#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    config: SchedulerConfig,
}

impl Scheduler {
    /// # Errors
    /// `InvalidConfig` if `config` fails [`SchedulerConfig::validate`].
    pub fn new(config: SchedulerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Highest-scoring blocks; empty when nothing meets the minimums.
    pub fn find_best_windows(&self, blocks: &[AvailabilityBlock]) -> Vec<EventBlock> {
        best_of(self.ranked(&build_slot_index(blocks, None)))
    }

    /// [`Self::find_best_windows`] ignoring every slot outside `window`.
    pub fn find_best_windows_within(
        &self,
        blocks: &[AvailabilityBlock],
        window: &EventWindow,
    ) -> Vec<EventBlock> {
        best_of(self.ranked(&build_slot_index(blocks, Some(window))))
    }

    /// Fetch an event's rows from `source` and search them.
    pub fn find_best_windows_from<S: AvailabilitySource + ?Sized>(
        &self,
        source: &S,
        event: &EventId,
    ) -> std::result::Result<Vec<EventBlock>, S::Error> {
        let blocks = source.availability_blocks(event)?;
        Ok(self.find_best_windows(&blocks))
    }

    /// Every valid candidate, best first.
    pub fn ranked_windows(&self, blocks: &[AvailabilityBlock]) -> Vec<EventBlock> {
        self.ranked(&build_slot_index(blocks, None))
    }

    /// [`Self::ranked_windows`] ignoring every slot outside `window`.
    pub fn ranked_windows_within(
        &self,
        blocks: &[AvailabilityBlock],
        window: &EventWindow,
    ) -> Vec<EventBlock> {
        self.ranked(&build_slot_index(blocks, Some(window)))
    }

    fn ranked(&self, index: &SlotIndex) -> Vec<EventBlock> {
        let mut candidates: Vec<EventBlock> = index
            .iter()
            .filter(|(_, members)| members.len() >= self.config.min_participants)
            .filter_map(|(&start, members)| self.grow(index, start, members))
            .filter(|block| self.is_valid(block))
            .collect();
        candidates.sort_by(rank);

        debug!(
            slots = index.len(),
            candidates = candidates.len(),
            best_score = candidates.first().map(EventBlock::score).unwrap_or(0),
            "ranked candidate windows"
        );
        candidates
    }

    /// Grow a block from `start` while the narrowed set keeps the quorum.
    fn grow(
        &self,
        index: &SlotIndex,
        start: SlotInstant,
        members: &BTreeSet<ParticipantId>,
    ) -> Option<EventBlock> {
        let cap = self.config.scan_cap();
        let mut running = members.clone();
        let mut len = 1usize;

        while len < cap {
            let Some(next) = start.checked_offset(len as i64) else {
                break;
            };
            let Some(narrowed) = index
                .get(&next)
                .map(|free| narrow(&running, free))
                .filter(|set| set.len() >= self.config.min_participants)
            else {
                break;
            };
            running = narrowed;
            len += 1;
        }

        if len < self.config.min_block_slots {
            return None;
        }
        Some(EventBlock {
            start_time: start,
            end_time: start.checked_offset(len as i64)?,
            participants: running,
            duration_slots: len,
        })
    }

    fn is_valid(&self, block: &EventBlock) -> bool {
        !block.participants.is_empty()
            && block.participant_count() >= self.config.min_participants
            && block.duration_slots >= self.config.min_block_slots
    }
}

fn narrow(
    running: &BTreeSet<ParticipantId>,
    free: &BTreeSet<ParticipantId>,
) -> BTreeSet<ParticipantId> {
    running.intersection(free).cloned().collect()
}

fn best_of(ranked: Vec<EventBlock>) -> Vec<EventBlock> {
    let Some(top) = ranked.first().map(EventBlock::score) else {
        return Vec::new();
    };
    ranked.into_iter().take_while(|b| b.score() == top).collect()
}

fn build_slot_index(blocks: &[AvailabilityBlock], window: Option<&EventWindow>) -> SlotIndex {
    let mut index = SlotIndex::new();
    for block in sanitize_blocks(blocks, window) {
        let Ok(slots) = block.slots() else {
            continue;
        };
        for slot in slots {
            index
                .entry(slot)
                .or_default()
                .insert(block.participant.clone());
        }
    }
    index
}
