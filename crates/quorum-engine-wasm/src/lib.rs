//! WASM bindings for quorum-engine.
//!
//! Exposes the slot codec, heat-map aggregation, run-length encoding, and
//! best-window scheduling to JavaScript via `wasm-bindgen`. All complex types
//! are passed as JSON strings.
//!
//! ## Build process
//!
//! ```sh
//! cargo build -p quorum-engine-wasm --target wasm32-unknown-unknown --release
//! wasm-bindgen --target web --out-dir web/wasm/ \
//!   target/wasm32-unknown-unknown/release/quorum_engine_wasm.wasm
//! ```

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use quorum_engine::availability::AvailabilityBlock;
use quorum_engine::heatmap::aggregate_blocks;
use quorum_engine::{
    encode_blocks, AvailabilitySet, EventBlock, EventId, EventWindow, ParticipantId, Scheduler,
    SchedulerConfig, SlotCodec, SlotInstant,
};
use serde::Serialize;
use wasm_bindgen::prelude::*;

// ---------------------------------------------------------------------------
// Serde-friendly DTOs for crossing the WASM boundary as JSON
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct LocalSlotDto {
    day: String,
    minutes: u32,
}

#[derive(Serialize)]
struct EventBlockDto {
    start_time: String,
    end_time: String,
    participants: Vec<String>,
    duration_slots: usize,
    score: usize,
}

impl From<&EventBlock> for EventBlockDto {
    fn from(b: &EventBlock) -> Self {
        Self {
            start_time: b.start_time.start().to_rfc3339(),
            end_time: b.end_time.start().to_rfc3339(),
            participants: b.participants.iter().map(|p| p.to_string()).collect(),
            duration_slots: b.duration_slots,
            score: b.score(),
        }
    }
}

#[derive(Serialize)]
struct HeatCellDto {
    slot: String,
    available_count: usize,
    total_participants: usize,
}

#[derive(Serialize)]
struct HeatMapDto {
    total_participants: usize,
    cells: Vec<HeatCellDto>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn js_err(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// Parse an ISO 8601 datetime string into `DateTime<Utc>`.
///
/// Accepts RFC 3339 (with offset) and naive datetimes, which are read as UTC.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>, JsValue> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .map(|ndt| ndt.and_utc())
        .map_err(|e| JsValue::from_str(&format!("Invalid datetime '{}': {}", s, e)))
}

fn parse_blocks_json(json: &str) -> Result<Vec<AvailabilityBlock>, JsValue> {
    serde_json::from_str(json)
        .map_err(|e| JsValue::from_str(&format!("Invalid availability JSON: {}", e)))
}

fn to_json<T: Serialize>(value: &T) -> Result<String, JsValue> {
    serde_json::to_string(value)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

// ---------------------------------------------------------------------------
// WASM exports
// ---------------------------------------------------------------------------

/// Convert a local slot to its canonical UTC instant (RFC 3339).
///
/// `day` is `YYYY-MM-DD`, `minutes` a multiple of 30 below 1440, `timezone` an
/// IANA zone name.
#[wasm_bindgen(js_name = "toInstant")]
pub fn to_instant(day: &str, minutes: u32, timezone: &str) -> Result<String, JsValue> {
    let day: NaiveDate = day
        .parse()
        .map_err(|e| JsValue::from_str(&format!("Invalid day '{}': {}", day, e)))?;
    let codec = SlotCodec::from_iana(timezone).map_err(js_err)?;
    let slot = codec.to_instant(day, minutes).map_err(js_err)?;
    Ok(slot.start().to_rfc3339())
}

/// Project a canonical instant into `timezone`; returns `{day, minutes}` JSON.
#[wasm_bindgen(js_name = "fromInstant")]
pub fn from_instant(instant: &str, timezone: &str) -> Result<String, JsValue> {
    let slot = SlotInstant::new(parse_datetime(instant)?).map_err(js_err)?;
    let codec = SlotCodec::from_iana(timezone).map_err(js_err)?;
    let local = codec.from_instant(slot);
    to_json(&LocalSlotDto {
        day: local.day.to_string(),
        minutes: local.minutes,
    })
}

/// Run-length encode a JSON array of slot instants into availability rows.
///
/// Instants off the half-hour grid are skipped.
#[wasm_bindgen(js_name = "encodeAvailability")]
pub fn encode_availability(
    participant: &str,
    event: &str,
    slots_json: &str,
) -> Result<String, JsValue> {
    let raw: Vec<String> = serde_json::from_str(slots_json)
        .map_err(|e| JsValue::from_str(&format!("Invalid slots JSON: {}", e)))?;
    let mut set = AvailabilitySet::new();
    for s in &raw {
        if let Ok(slot) = SlotInstant::new(parse_datetime(s)?) {
            set.insert(slot);
        }
    }
    let blocks = encode_blocks(&ParticipantId::from(participant), &EventId::from(event), &set);
    to_json(&blocks)
}

/// Per-slot availability counts for an event's rows.
///
/// When both window bounds are given, slots outside are ignored and every slot
/// of the window is returned, zero-filled.
#[wasm_bindgen(js_name = "aggregateHeatMap")]
pub fn aggregate_heat_map(
    blocks_json: &str,
    window_start: Option<String>,
    window_end: Option<String>,
) -> Result<String, JsValue> {
    let blocks = parse_blocks_json(blocks_json)?;
    let window = match (window_start, window_end) {
        (Some(start), Some(end)) => Some(
            EventWindow::new(parse_datetime(&start)?, parse_datetime(&end)?).map_err(js_err)?,
        ),
        _ => None,
    };

    let map = aggregate_blocks(&blocks, window.as_ref());
    let cells = match &window {
        Some(window) => map.grid(window),
        None => map.cells().copied().collect(),
    };

    to_json(&HeatMapDto {
        total_participants: map.total_participants(),
        cells: cells
            .iter()
            .map(|c| HeatCellDto {
                slot: c.slot.start().to_rfc3339(),
                available_count: c.available_count,
                total_participants: c.total_participants,
            })
            .collect(),
    })
}

/// Best meeting window(s) for an event's rows.
///
/// `config_json` optionally overrides `{min_participants, min_block_slots,
/// max_block_multiplier}`; missing keys keep their defaults and unknown keys
/// are rejected.
#[wasm_bindgen(js_name = "findBestWindows")]
pub fn find_best_windows(
    blocks_json: &str,
    config_json: Option<String>,
) -> Result<String, JsValue> {
    let blocks = parse_blocks_json(blocks_json)?;
    let config: SchedulerConfig = match config_json {
        Some(json) => serde_json::from_str(&json)
            .map_err(|e| JsValue::from_str(&format!("Invalid config JSON: {}", e)))?,
        None => SchedulerConfig::default(),
    };
    let scheduler = Scheduler::new(config).map_err(js_err)?;

    let dtos: Vec<EventBlockDto> = scheduler
        .find_best_windows(&blocks)
        .iter()
        .map(EventBlockDto::from)
        .collect();
    to_json(&dtos)
}
