//! Batch descriptors and the typed row schema
//!
//! A batch is one exported game file. Discovery hands out `BatchDescriptor`s,
//! a connection fetches the raw bytes, and `parse_batch` turns them into a
//! `ParsedBatch`: typed `PitchRow`s plus the set of columns the file carried.
//! Extractors check that column set up front instead of probing rows.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

/// One discovered source batch
///
/// Immutable once discovered. `sequence` is the position in the discovery
/// listing and orders first-seen player identifiers deterministically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchDescriptor {
    /// Path relative to the source root (e.g. `2025/04/26/csv/20250426-Field-1.csv`)
    pub path: String,
    /// Final path component
    pub file_name: String,
    /// Size in bytes as reported by the source
    pub size: u64,
    /// Opaque modification token (not necessarily a timestamp)
    pub last_modified: String,
    /// Season the batch's rows are attributed to
    pub season: i32,
    /// Unix timestamp of discovery
    pub discovered_at: i64,
    /// Position in the discovery listing
    pub sequence: u64,
}

impl BatchDescriptor {
    pub fn fingerprint(&self) -> BatchFingerprint {
        BatchFingerprint::of(&self.path, self.size, &self.last_modified)
    }
}

/// Ledger key derived from (path, size, modification token)
///
/// Lowercase hex MD5 of `"{path}|{size}|{last_modified}"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchFingerprint(String);

impl BatchFingerprint {
    pub fn of(path: &str, size: u64, last_modified: &str) -> Self {
        let identifier = format!("{}|{}|{}", path, size, last_modified);
        Self(format!("{:x}", md5::compute(identifier.as_bytes())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BatchFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Columns the extractors know about
///
/// Header names match the export format exactly (case-sensitive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Column {
    Batter,
    BatterId,
    BatterTeam,
    Pitcher,
    PitcherId,
    PitcherTeam,
    PlayResult,
    KorBB,
    PitchCall,
    PlateLocHeight,
    PlateLocSide,
    TaggedHitType,
    Inning,
    Outs,
    Balls,
    Strikes,
    PAofInning,
    OutsOnPlay,
    AutoPitchType,
    TaggedPitchType,
    GameUID,
}

impl Column {
    pub const ALL: [Column; 21] = [
        Column::Batter,
        Column::BatterId,
        Column::BatterTeam,
        Column::Pitcher,
        Column::PitcherId,
        Column::PitcherTeam,
        Column::PlayResult,
        Column::KorBB,
        Column::PitchCall,
        Column::PlateLocHeight,
        Column::PlateLocSide,
        Column::TaggedHitType,
        Column::Inning,
        Column::Outs,
        Column::Balls,
        Column::Strikes,
        Column::PAofInning,
        Column::OutsOnPlay,
        Column::AutoPitchType,
        Column::TaggedPitchType,
        Column::GameUID,
    ];

    pub fn header(&self) -> &'static str {
        match self {
            Column::Batter => "Batter",
            Column::BatterId => "BatterId",
            Column::BatterTeam => "BatterTeam",
            Column::Pitcher => "Pitcher",
            Column::PitcherId => "PitcherId",
            Column::PitcherTeam => "PitcherTeam",
            Column::PlayResult => "PlayResult",
            Column::KorBB => "KorBB",
            Column::PitchCall => "PitchCall",
            Column::PlateLocHeight => "PlateLocHeight",
            Column::PlateLocSide => "PlateLocSide",
            Column::TaggedHitType => "TaggedHitType",
            Column::Inning => "Inning",
            Column::Outs => "Outs",
            Column::Balls => "Balls",
            Column::Strikes => "Strikes",
            Column::PAofInning => "PAofInning",
            Column::OutsOnPlay => "OutsOnPlay",
            Column::AutoPitchType => "AutoPitchType",
            Column::TaggedPitchType => "TaggedPitchType",
            Column::GameUID => "GameUID",
        }
    }

    pub fn from_header(header: &str) -> Option<Column> {
        let header = header.trim();
        Column::ALL.iter().copied().find(|c| c.header() == header)
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header())
    }
}

/// One pitch row with every known column as an optional typed field
///
/// Blank cells and `NaN`-style placeholders are `None`; so are numeric cells
/// that don't parse.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PitchRow {
    pub batter: Option<String>,
    pub batter_id: Option<String>,
    pub batter_team: Option<String>,
    pub pitcher: Option<String>,
    pub pitcher_id: Option<String>,
    pub pitcher_team: Option<String>,
    pub play_result: Option<String>,
    pub kor_bb: Option<String>,
    pub pitch_call: Option<String>,
    pub plate_loc_height: Option<f64>,
    pub plate_loc_side: Option<f64>,
    pub tagged_hit_type: Option<String>,
    pub inning: Option<i64>,
    pub outs: Option<i64>,
    pub balls: Option<i64>,
    pub strikes: Option<i64>,
    pub pa_of_inning: Option<i64>,
    pub outs_on_play: Option<i64>,
    pub auto_pitch_type: Option<String>,
    pub tagged_pitch_type: Option<String>,
    pub game_uid: Option<String>,
}

impl PitchRow {
    fn set(&mut self, column: Column, raw: &str) {
        let text = clean_cell(raw);
        match column {
            Column::Batter => self.batter = text,
            Column::BatterId => self.batter_id = text,
            Column::BatterTeam => self.batter_team = text,
            Column::Pitcher => self.pitcher = text,
            Column::PitcherId => self.pitcher_id = text,
            Column::PitcherTeam => self.pitcher_team = text,
            Column::PlayResult => self.play_result = text,
            Column::KorBB => self.kor_bb = text,
            Column::PitchCall => self.pitch_call = text,
            Column::PlateLocHeight => self.plate_loc_height = text.as_deref().and_then(parse_float),
            Column::PlateLocSide => self.plate_loc_side = text.as_deref().and_then(parse_float),
            Column::TaggedHitType => self.tagged_hit_type = text,
            Column::Inning => self.inning = text.as_deref().and_then(parse_int),
            Column::Outs => self.outs = text.as_deref().and_then(parse_int),
            Column::Balls => self.balls = text.as_deref().and_then(parse_int),
            Column::Strikes => self.strikes = text.as_deref().and_then(parse_int),
            Column::PAofInning => self.pa_of_inning = text.as_deref().and_then(parse_int),
            Column::OutsOnPlay => self.outs_on_play = text.as_deref().and_then(parse_int),
            Column::AutoPitchType => self.auto_pitch_type = text,
            Column::TaggedPitchType => self.tagged_pitch_type = text,
            Column::GameUID => self.game_uid = text,
        }
    }
}

/// Parsed content of one batch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedBatch {
    /// Known columns present in the header
    pub columns: BTreeSet<Column>,
    pub rows: Vec<PitchRow>,
}

impl ParsedBatch {
    pub fn has_column(&self, column: Column) -> bool {
        self.columns.contains(&column)
    }

    pub fn has_all(&self, required: &[Column]) -> bool {
        required.iter().all(|c| self.columns.contains(c))
    }

    /// Required columns absent from this batch, in the order given
    pub fn missing(&self, required: &[Column]) -> Vec<Column> {
        required
            .iter()
            .copied()
            .filter(|c| !self.columns.contains(c))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed batch csv: {0}")]
    Csv(#[from] csv::Error),
}

/// Parse CSV bytes (header row required) into the typed row schema
///
/// Unknown columns are ignored. An empty input yields an empty batch with no
/// columns, which every extractor rejects. Cells that are not valid UTF-8
/// (Latin-1 exports) are decoded lossily rather than failing the batch.
pub fn parse_batch(bytes: &[u8]) -> Result<ParsedBatch, ParseError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(bytes);

    let headers = reader.byte_headers()?.clone();
    let mapping: Vec<(usize, Column)> = headers
        .iter()
        .enumerate()
        .filter_map(|(idx, name)| {
            Column::from_header(&String::from_utf8_lossy(name)).map(|c| (idx, c))
        })
        .collect();

    let mut batch = ParsedBatch {
        columns: mapping.iter().map(|(_, c)| *c).collect(),
        rows: Vec::new(),
    };

    for record in reader.byte_records() {
        let record = record?;
        let mut row = PitchRow::default();
        for (idx, column) in &mapping {
            if let Some(raw) = record.get(*idx) {
                row.set(*column, &String::from_utf8_lossy(raw));
            }
        }
        batch.rows.push(row);
    }

    Ok(batch)
}

const MISSING_MARKERS: [&str; 6] = ["", "NaN", "nan", "NA", "N/A", "null"];

fn clean_cell(raw: &str) -> Option<String> {
    if MISSING_MARKERS.contains(&raw.trim()) {
        None
    } else {
        Some(raw.to_string())
    }
}

fn parse_float(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Integers may be exported as `1` or `1.0`
fn parse_int(text: &str) -> Option<i64> {
    let text = text.trim();
    text.parse::<i64>().ok().or_else(|| {
        text.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && v.fract() == 0.0)
            .map(|v| v as i64)
    })
}
