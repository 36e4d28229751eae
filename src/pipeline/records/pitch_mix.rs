//! Pitch-type mix per pitcher
//!
//! Every pitch lands in exactly one [`PitchType`] bucket, so the bucket counts
//! always sum to `total_pitches`.

use crate::pipeline::merge::Merge;
use crate::pipeline::types::{AggregationKey, GameSet};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PitchType {
    Curveball,
    FourSeam,
    Sinker,
    Slider,
    TwoSeam,
    Changeup,
    Cutter,
    Splitter,
    Other,
}

impl PitchType {
    pub const COUNT: usize = 9;

    pub const ALL: [PitchType; PitchType::COUNT] = [
        PitchType::Curveball,
        PitchType::FourSeam,
        PitchType::Sinker,
        PitchType::Slider,
        PitchType::TwoSeam,
        PitchType::Changeup,
        PitchType::Cutter,
        PitchType::Splitter,
        PitchType::Other,
    ];

    fn index(self) -> usize {
        self as usize
    }

    /// Bucket for one pitch
    ///
    /// A pitch tagged `Fastball` that the classifier did not call `Four-Seam`
    /// is a two-seamer regardless of the classifier label. Anything the
    /// classifier left blank, called `Other`, or labelled with an unknown
    /// name falls into `Other`.
    pub fn classify(auto_pitch_type: Option<&str>, tagged_pitch_type: Option<&str>) -> PitchType {
        let auto = auto_pitch_type.map(str::trim);
        if tagged_pitch_type.map(str::trim) == Some("Fastball") && auto != Some("Four-Seam") {
            return PitchType::TwoSeam;
        }
        match auto {
            Some("Curveball") => PitchType::Curveball,
            Some("Four-Seam") => PitchType::FourSeam,
            Some("Sinker") => PitchType::Sinker,
            Some("Slider") => PitchType::Slider,
            Some("Changeup") => PitchType::Changeup,
            Some("Cutter") => PitchType::Cutter,
            Some("Splitter") => PitchType::Splitter,
            _ => PitchType::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PitchType::Curveball => "curveball",
            PitchType::FourSeam => "fourseam",
            PitchType::Sinker => "sinker",
            PitchType::Slider => "slider",
            PitchType::TwoSeam => "twoseam",
            PitchType::Changeup => "changeup",
            PitchType::Cutter => "cutter",
            PitchType::Splitter => "splitter",
            PitchType::Other => "other",
        }
    }
}

impl fmt::Display for PitchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PitchMix {
    pub total_pitches: u64,
    counts: [u64; PitchType::COUNT],
    pub games: GameSet,
}

impl PitchMix {
    pub fn record(&mut self, pitch_type: PitchType) {
        self.total_pitches += 1;
        self.counts[pitch_type.index()] += 1;
    }

    pub fn count(&self, pitch_type: PitchType) -> u64 {
        self.counts[pitch_type.index()]
    }

    pub fn bucket_sum(&self) -> u64 {
        self.counts.iter().sum()
    }

    pub fn games_played(&self) -> usize {
        self.games.len()
    }

    pub fn to_row(&self, key: &AggregationKey) -> PitchMixRow {
        let count = |t: PitchType| self.count(t) as i64;
        PitchMixRow {
            name: key.name.clone(),
            team: key.team.clone(),
            season: key.season,
            total_pitches: self.total_pitches as i64,
            curveball_count: count(PitchType::Curveball),
            fourseam_count: count(PitchType::FourSeam),
            sinker_count: count(PitchType::Sinker),
            slider_count: count(PitchType::Slider),
            twoseam_count: count(PitchType::TwoSeam),
            changeup_count: count(PitchType::Changeup),
            cutter_count: count(PitchType::Cutter),
            splitter_count: count(PitchType::Splitter),
            other_count: count(PitchType::Other),
            games: self.games_played() as i64,
        }
    }
}

impl Merge for PitchMix {
    fn merge(&mut self, incoming: Self) {
        self.total_pitches += incoming.total_pitches;
        for (slot, add) in self.counts.iter_mut().zip(incoming.counts) {
            *slot += add;
        }
        self.games.extend(incoming.games);
    }
}

/// Persisted pitch-mix row (`pitch_counts` table)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PitchMixRow {
    pub name: String,
    pub team: String,
    pub season: i32,
    pub total_pitches: i64,
    pub curveball_count: i64,
    pub fourseam_count: i64,
    pub sinker_count: i64,
    pub slider_count: i64,
    pub twoseam_count: i64,
    pub changeup_count: i64,
    pub cutter_count: i64,
    pub splitter_count: i64,
    pub other_count: i64,
    pub games: i64,
}
