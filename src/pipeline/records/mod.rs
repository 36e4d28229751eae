//! Aggregate record types, one per statistical domain
//!
//! - `batter` - batting counts, zone discipline, slash-line rates
//! - `pitcher` - strikeouts/walks, outs, batters faced, zone rates
//! - `pitch_mix` - pitch-type buckets per pitcher
//! - `player` - external ids per (name, team, season)

pub mod batter;
pub mod pitch_mix;
pub mod pitcher;
pub mod player;

pub use batter::{BatterRow, BatterStats};
pub use pitch_mix::{PitchMix, PitchMixRow, PitchType};
pub use pitcher::{PitcherRow, PitcherStats};
pub use player::{PlayerIdentity, PlayerRow, SeenId};
