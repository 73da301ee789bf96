//! Tests for heat-map aggregation.

use std::collections::BTreeMap;

use chrono::{DateTime, TimeZone, Utc};
use quorum_engine::availability::{AvailabilityBlock, AvailabilitySet};
use quorum_engine::heatmap::{aggregate, aggregate_blocks, aggregate_within};
use quorum_engine::slot::{EventWindow, ParticipantId, SlotInstant};

// ── Helpers ─────────────────────────────────────────────────────────────────

fn at(hour: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 16, hour, min, 0).unwrap()
}

fn slot(hour: u32, min: u32) -> SlotInstant {
    SlotInstant::new(at(hour, min)).unwrap()
}

fn sets(entries: &[(&str, &[(u32, u32)])]) -> BTreeMap<ParticipantId, AvailabilitySet> {
    entries
        .iter()
        .map(|(who, slots)| {
            (
                ParticipantId::from(*who),
                slots.iter().map(|&(h, m)| slot(h, m)).collect(),
            )
        })
        .collect()
}

// ── Counting ────────────────────────────────────────────────────────────────

#[test]
fn counts_shared_and_single_slots() {
    let map = aggregate(&sets(&[
        ("ana", &[(14, 0), (14, 30)]),
        ("ben", &[(14, 0)]),
    ]));

    assert_eq!(map.total_participants(), 2);

    let shared = map.get(slot(14, 0)).unwrap();
    assert_eq!(shared.available_count, 2);
    assert_eq!(shared.total_participants, 2);

    let single = map.get(slot(14, 30)).unwrap();
    assert_eq!(single.available_count, 1);
    assert_eq!(single.total_participants, 2);
}

#[test]
fn empty_input_is_an_empty_map() {
    let map = aggregate(&BTreeMap::new());
    assert!(map.is_empty());
    assert_eq!(map.total_participants(), 0);
}

#[test]
fn participants_without_selections_are_not_counted() {
    let mut input = sets(&[("ana", &[(9, 0)])]);
    input.insert(ParticipantId::from("lurker"), AvailabilitySet::new());

    let map = aggregate(&input);

    assert_eq!(map.total_participants(), 1);
    assert_eq!(map.cell(slot(9, 0)).available_count, 1);
}

#[test]
fn unseen_slots_default_to_zero() {
    let map = aggregate(&sets(&[("ana", &[(9, 0)]), ("ben", &[(9, 0)])]));

    assert!(map.get(slot(10, 0)).is_none());
    let cell = map.cell(slot(10, 0));
    assert_eq!(cell.available_count, 0);
    assert_eq!(cell.total_participants, 2);
    assert_eq!(cell.ratio(), 0.0);
}

#[test]
fn every_cell_stays_within_bounds() {
    let map = aggregate(&sets(&[
        ("ana", &[(9, 0), (9, 30), (10, 0)]),
        ("ben", &[(9, 30)]),
        ("cy", &[(9, 30), (10, 0), (13, 0)]),
    ]));

    for cell in map.cells() {
        assert!(cell.available_count > 0);
        assert!(cell.available_count <= cell.total_participants);
    }
    assert_eq!(map.cell(slot(9, 30)).ratio(), 1.0);
}

#[test]
fn peak_returns_all_busiest_slots_in_order() {
    let map = aggregate(&sets(&[
        ("ana", &[(9, 0), (11, 0)]),
        ("ben", &[(9, 0), (11, 0), (12, 0)]),
    ]));

    let peak: Vec<SlotInstant> = map.peak().iter().map(|c| c.slot).collect();
    assert_eq!(peak, vec![slot(9, 0), slot(11, 0)]);
    assert!(aggregate(&BTreeMap::new()).peak().is_empty());
}

// ── Windows ─────────────────────────────────────────────────────────────────

#[test]
fn grid_fills_every_window_slot() {
    let window = EventWindow::new(at(9, 0), at(11, 0)).unwrap();
    let map = aggregate(&sets(&[("ana", &[(9, 30)]), ("ben", &[(9, 30), (10, 0)])]));

    let grid = map.grid(&window);

    let counts: Vec<usize> = grid.iter().map(|c| c.available_count).collect();
    assert_eq!(counts, vec![0, 2, 1, 0]);
    assert_eq!(grid[0].slot, slot(9, 0));
    assert!(grid.iter().all(|c| c.total_participants == 2));
}

#[test]
fn slots_outside_the_window_are_ignored() {
    let window = EventWindow::new(at(9, 0), at(12, 0)).unwrap();
    let map = aggregate_within(
        &sets(&[
            ("ana", &[(9, 0), (18, 0)]),
            ("night-owl", &[(23, 0)]),
        ]),
        &window,
    );

    // night-owl has nothing left inside the window.
    assert_eq!(map.total_participants(), 1);
    assert!(map.get(slot(18, 0)).is_none());
    assert_eq!(map.cell(slot(9, 0)).available_count, 1);
}

#[test]
fn aggregates_straight_from_rows() {
    let rows = vec![
        AvailabilityBlock::new("ana", "e", at(14, 0), at(15, 0)),
        AvailabilityBlock::new("ben", "e", at(14, 0), at(14, 30)),
        // Misaligned; dropped.
        AvailabilityBlock::new("cy", "e", at(14, 5), at(15, 0)),
    ];

    let map = aggregate_blocks(&rows, None);

    assert_eq!(map.total_participants(), 2);
    assert_eq!(map.cell(slot(14, 0)).available_count, 2);
    assert_eq!(map.cell(slot(14, 30)).available_count, 1);
}
