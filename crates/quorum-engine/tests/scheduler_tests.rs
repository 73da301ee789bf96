//! Tests for best-window scheduling.

use chrono::{DateTime, TimeZone, Utc};
use quorum_engine::availability::{AvailabilityBlock, AvailabilitySink, InMemoryStore};
use quorum_engine::error::QuorumError;
use quorum_engine::scheduler::{EventBlock, Scheduler, SchedulerConfig};
use quorum_engine::slot::{EventId, EventWindow, ParticipantId, SlotInstant};

// ── Helpers ─────────────────────────────────────────────────────────────────

fn at(hour: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 16, hour, min, 0).unwrap()
}

fn slot(hour: u32, min: u32) -> SlotInstant {
    SlotInstant::new(at(hour, min)).unwrap()
}

fn block(who: &str, from: (u32, u32), to: (u32, u32)) -> AvailabilityBlock {
    AvailabilityBlock::new(who, "standup", at(from.0, from.1), at(to.0, to.1))
}

fn people(names: &[&str]) -> Vec<ParticipantId> {
    names.iter().map(|n| ParticipantId::from(*n)).collect()
}

fn members(block: &EventBlock) -> Vec<ParticipantId> {
    block.participants.iter().cloned().collect()
}

fn scheduler(min_participants: usize, min_block_slots: usize) -> Scheduler {
    Scheduler::new(SchedulerConfig::new(min_participants, min_block_slots, 2).unwrap()).unwrap()
}

/// A 09:00-11:00, B 09:30-11:30, C 10:00-10:30.
fn three_person_rows() -> Vec<AvailabilityBlock> {
    vec![
        block("A", (9, 0), (11, 0)),
        block("B", (9, 30), (11, 30)),
        block("C", (10, 0), (10, 30)),
    ]
}

// ── Empty and insufficient input ────────────────────────────────────────────

#[test]
fn empty_input_yields_no_windows() {
    assert!(Scheduler::default().find_best_windows(&[]).is_empty());
}

#[test]
fn single_participant_never_meets_quorum() {
    let rows = vec![block("A", (9, 0), (17, 0))];
    assert!(Scheduler::default().find_best_windows(&rows).is_empty());
}

#[test]
fn overlap_shorter_than_minimum_is_discarded() {
    // A and B share only 10:00-10:30.
    let rows = vec![block("A", (9, 0), (10, 30)), block("B", (10, 0), (12, 0))];
    assert!(Scheduler::default().find_best_windows(&rows).is_empty());
}

// ── Three-person scenario ───────────────────────────────────────────────────

#[test]
fn three_person_scenario_keeps_the_pair_longest() {
    // Growing from 09:30 keeps {A, B} through 10:30 and stops at 11:00 where
    // only B remains: 09:30-11:00, score 2 x 3 = 6.
    let best = Scheduler::default().find_best_windows(&three_person_rows());

    assert_eq!(best.len(), 1);
    assert_eq!(best[0].start_time, slot(9, 30));
    assert_eq!(best[0].end_time, slot(11, 0));
    assert_eq!(members(&best[0]), people(&["A", "B"]));
    assert_eq!(best[0].duration_slots, 3);
    assert_eq!(best[0].score(), 6);
}

#[test]
fn three_person_scenario_ranks_every_candidate() {
    let ranked = Scheduler::default().ranked_windows(&three_person_rows());

    // 09:30 (score 6) and 10:00 (score 4); 10:30 only reaches one slot.
    assert_eq!(ranked.len(), 2);
    assert_eq!(ranked[1].start_time, slot(10, 0));
    assert_eq!(ranked[1].end_time, slot(11, 0));
    assert_eq!(members(&ranked[1]), people(&["A", "B"]));
    assert_eq!(ranked[1].score(), 4);
}

#[test]
fn pair_block_beats_lone_trio_slot() {
    // B starts at 10:00, so the trio only meets for one slot. Growing from
    // 10:00 narrows to {A, B} and yields 10:00-11:00, score 4.
    let rows = vec![
        block("A", (9, 0), (11, 0)),
        block("B", (10, 0), (11, 30)),
        block("C", (10, 0), (10, 30)),
    ];

    let best = Scheduler::default().find_best_windows(&rows);

    assert_eq!(best.len(), 1);
    assert_eq!(best[0].start_time, slot(10, 0));
    assert_eq!(best[0].end_time, slot(11, 0));
    assert_eq!(members(&best[0]), people(&["A", "B"]));
    assert_eq!(best[0].duration_slots, 2);
    assert_eq!(best[0].score(), 4);
}

#[test]
fn higher_quorum_can_leave_nothing() {
    assert!(scheduler(3, 2)
        .find_best_windows(&three_person_rows())
        .is_empty());
}

#[test]
fn higher_quorum_with_single_slot_blocks_finds_the_trio() {
    let best = scheduler(3, 1).find_best_windows(&three_person_rows());

    assert_eq!(best.len(), 1);
    assert_eq!(best[0].start_time, slot(10, 0));
    assert_eq!(best[0].end_time, slot(10, 30));
    assert_eq!(members(&best[0]), people(&["A", "B", "C"]));
    assert_eq!(best[0].score(), 3);
}

// ── Growth limits ───────────────────────────────────────────────────────────

#[test]
fn growth_stops_at_scan_cap() {
    // Four shared hours, but blocks grow to at most 2 x 2 = 4 slots.
    let rows = vec![block("A", (9, 0), (13, 0)), block("B", (9, 0), (13, 0))];

    let best = Scheduler::default().find_best_windows(&rows);

    // Starts 09:00 through 11:00 all reach four slots and tie at score 8.
    assert_eq!(best.len(), 5);
    for (i, window) in best.iter().enumerate() {
        assert_eq!(window.duration_slots, 4);
        assert_eq!(window.score(), 8);
        assert_eq!(window.start_time, slot(9, 0).checked_offset(i as i64).unwrap());
    }
}

#[test]
fn gap_in_availability_ends_growth() {
    let rows = vec![
        block("A", (9, 0), (10, 0)),
        block("A", (10, 30), (11, 30)),
        block("B", (9, 0), (11, 30)),
    ];

    let best = Scheduler::default().find_best_windows(&rows);

    assert_eq!(best.len(), 2);
    assert_eq!(best[0].start_time, slot(9, 0));
    assert_eq!(best[0].end_time, slot(10, 0));
    assert_eq!(best[1].start_time, slot(10, 30));
    assert_eq!(best[1].end_time, slot(11, 30));
}

// ── Tie-breaking ────────────────────────────────────────────────────────────

#[test]
fn equal_scores_prefer_more_participants() {
    // {A, B} for three slots in the morning and {A, B, C} for two in the
    // afternoon both score 6. The larger group ranks first.
    let rows = vec![
        block("A", (9, 0), (10, 30)),
        block("B", (9, 0), (10, 30)),
        block("A", (14, 0), (15, 0)),
        block("B", (14, 0), (15, 0)),
        block("C", (14, 0), (15, 0)),
    ];

    let best = Scheduler::default().find_best_windows(&rows);

    assert_eq!(best.len(), 2);
    assert_eq!(best[0].start_time, slot(14, 0));
    assert_eq!(members(&best[0]), people(&["A", "B", "C"]));
    assert_eq!(best[1].start_time, slot(9, 0));
    assert_eq!(members(&best[1]), people(&["A", "B"]));
}

#[test]
fn participants_are_sorted() {
    let rows = vec![
        block("zoe", (9, 0), (10, 0)),
        block("adam", (9, 0), (10, 0)),
        block("mia", (9, 0), (10, 0)),
    ];
    let best = Scheduler::default().find_best_windows(&rows);
    assert_eq!(members(&best[0]), people(&["adam", "mia", "zoe"]));
}

// ── Defensive filtering ─────────────────────────────────────────────────────

#[test]
fn malformed_rows_do_not_block_scheduling() {
    let mut rows = three_person_rows();
    // Off the half-hour grid.
    rows.push(block("D", (9, 10), (10, 40)));
    // End before start.
    rows.push(block("E", (11, 0), (9, 0)));

    let best = Scheduler::default().find_best_windows(&rows);

    assert_eq!(best.len(), 1);
    assert_eq!(best[0].start_time, slot(9, 30));
    assert_eq!(members(&best[0]), people(&["A", "B"]));
}

#[test]
fn slots_outside_window_are_ignored() {
    let window = EventWindow::new(at(10, 0), at(11, 0)).unwrap();

    let best = Scheduler::default().find_best_windows_within(&three_person_rows(), &window);

    assert_eq!(best.len(), 1);
    assert_eq!(best[0].start_time, slot(10, 0));
    assert_eq!(best[0].end_time, slot(11, 0));
    assert_eq!(members(&best[0]), people(&["A", "B"]));
    assert_eq!(best[0].score(), 4);
}

#[test]
fn duplicate_rows_collapse() {
    let mut rows = three_person_rows();
    rows.extend(three_person_rows());
    let best = Scheduler::default().find_best_windows(&rows);
    assert_eq!(best, Scheduler::default().find_best_windows(&three_person_rows()));
}

// ── Sources and configuration ───────────────────────────────────────────────

#[test]
fn reads_only_the_requested_event_from_a_source() {
    let mut store = InMemoryStore::new();
    let standup = EventId::from("standup");
    let retro = EventId::from("retro");
    for row in three_person_rows() {
        store
            .replace_availability(&row.participant.clone(), &standup, vec![row])
            .unwrap();
    }
    let other = vec![
        AvailabilityBlock::new("X", "retro", at(15, 0), at(17, 0)),
        AvailabilityBlock::new("Y", "retro", at(15, 0), at(17, 0)),
    ];
    store
        .replace_availability(&ParticipantId::from("X"), &retro, vec![other[0].clone()])
        .unwrap();
    store
        .replace_availability(&ParticipantId::from("Y"), &retro, vec![other[1].clone()])
        .unwrap();

    let scheduler = Scheduler::default();
    let standup_best = scheduler.find_best_windows_from(&store, &standup).unwrap();
    let retro_best = scheduler.find_best_windows_from(&store, &retro).unwrap();

    assert_eq!(standup_best[0].start_time, slot(9, 30));
    assert!(retro_best.iter().all(|b| b.start_time >= slot(15, 0)));
    assert_eq!(members(&retro_best[0]), people(&["X", "Y"]));
}

#[test]
fn invalid_configuration_is_rejected_at_construction() {
    assert!(matches!(
        SchedulerConfig::new(0, 2, 2),
        Err(QuorumError::InvalidConfig(_))
    ));
    assert!(matches!(
        SchedulerConfig::new(2, 2, 0),
        Err(QuorumError::InvalidConfig(_))
    ));
}

#[test]
fn config_deserializes_with_defaults() {
    let config: SchedulerConfig = serde_json::from_str(r#"{"min_participants": 3}"#).unwrap();
    assert_eq!(config.min_participants, 3);
    assert_eq!(config.min_block_slots, 2);
    assert_eq!(config.max_block_multiplier, 2);
}

#[test]
fn config_rejects_unknown_keys() {
    let result = serde_json::from_str::<SchedulerConfig>(r#"{"min_participant": 5}"#);
    assert!(result.is_err());
}

#[test]
fn event_block_serializes_instants_as_rfc3339() {
    let best = Scheduler::default().find_best_windows(&three_person_rows());
    let json = serde_json::to_value(&best[0]).unwrap();

    assert!(json["start_time"]
        .as_str()
        .unwrap()
        .starts_with("2026-03-16T09:30:00"));
    assert_eq!(json["participants"], serde_json::json!(["A", "B"]));
    assert_eq!(json["duration_slots"], 3);
}
