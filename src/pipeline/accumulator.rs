//! Per-domain keyed maps, used both for one batch's partial result and for
//! the run-wide accumulator the merging task folds partials into.

use super::merge::merge_keyed;
use super::records::{
    BatterRow, BatterStats, PitchMix, PitchMixRow, PitcherRow, PitcherStats, PlayerIdentity,
    PlayerRow,
};
use super::types::{Domain, DomainSummary, KeyedRecords};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateSet {
    pub batters: KeyedRecords<BatterStats>,
    pub pitchers: KeyedRecords<PitcherStats>,
    pub pitch_mix: KeyedRecords<PitchMix>,
    pub players: KeyedRecords<PlayerIdentity>,
}

impl AggregateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a partial result into this accumulator
    pub fn absorb(&mut self, partial: AggregateSet) {
        merge_keyed(&mut self.batters, partial.batters);
        merge_keyed(&mut self.pitchers, partial.pitchers);
        merge_keyed(&mut self.pitch_mix, partial.pitch_mix);
        merge_keyed(&mut self.players, partial.players);
    }

    /// Record count per domain (what the ledger stores as a batch's summary)
    pub fn summary(&self) -> DomainSummary {
        Domain::ALL.iter().map(|d| (*d, self.len_of(*d))).collect()
    }

    pub fn len_of(&self, domain: Domain) -> usize {
        match domain {
            Domain::Batter => self.batters.len(),
            Domain::Pitcher => self.pitchers.len(),
            Domain::PitchType => self.pitch_mix.len(),
            Domain::Player => self.players.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        Domain::ALL.iter().all(|d| self.len_of(*d) == 0)
    }

    /// Every season that appears in any domain
    pub fn seasons(&self) -> BTreeSet<i32> {
        self.batters
            .keys()
            .chain(self.pitchers.keys())
            .chain(self.pitch_mix.keys())
            .chain(self.players.keys())
            .map(|k| k.season)
            .collect()
    }

    pub fn batter_rows(&self) -> Vec<BatterRow> {
        self.batters.iter().map(|(k, v)| v.to_row(k)).collect()
    }

    pub fn pitcher_rows(&self) -> Vec<PitcherRow> {
        self.pitchers.iter().map(|(k, v)| v.to_row(k)).collect()
    }

    pub fn pitch_mix_rows(&self) -> Vec<PitchMixRow> {
        self.pitch_mix.iter().map(|(k, v)| v.to_row(k)).collect()
    }

    pub fn player_rows(&self) -> Vec<PlayerRow> {
        self.players.iter().map(|(k, v)| v.to_row(k)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::records::{PitchType, SeenId};
    use crate::pipeline::types::AggregationKey;

    fn key(name: &str) -> AggregationKey {
        AggregationKey::new(name, "TEAM", 2025)
    }

    fn partial(name: &str, hits: u64, game: &str) -> AggregateSet {
        let mut set = AggregateSet::new();
        set.batters.insert(
            key(name),
            BatterStats {
                hits,
                at_bats: hits + 1,
                games: [game.to_string()].into_iter().collect(),
                ..Default::default()
            },
        );
        let mut mix = PitchMix::default();
        mix.record(PitchType::Slider);
        set.pitch_mix.insert(key("Ace"), mix);
        set
    }

    #[test]
    fn test_absorb_order_independent() {
        let parts = vec![partial("Doe", 1, "G1"), partial("Doe", 2, "G2"), partial("Roe", 3, "G2")];

        let mut forward = AggregateSet::new();
        for p in parts.iter().cloned() {
            forward.absorb(p);
        }
        let mut backward = AggregateSet::new();
        for p in parts.into_iter().rev() {
            backward.absorb(p);
        }

        assert_eq!(forward, backward);
        assert_eq!(forward.batters[&key("Doe")].hits, 3);
        assert_eq!(forward.batters[&key("Doe")].games_played(), 2);
        assert_eq!(forward.pitch_mix[&key("Ace")].total_pitches, 3);
    }

    #[test]
    fn test_summary_counts_each_domain() {
        let mut set = partial("Doe", 1, "G1");
        set.players.insert(
            key("Doe"),
            PlayerIdentity {
                pitcher_id: None,
                batter_id: Some(SeenId::new("B1", 0)),
            },
        );
        let summary = set.summary();

        assert_eq!(summary[&Domain::Batter], 1);
        assert_eq!(summary[&Domain::Pitcher], 0);
        assert_eq!(summary[&Domain::PitchType], 1);
        assert_eq!(summary[&Domain::Player], 1);
        assert!(!set.is_empty());
        assert!(AggregateSet::new().is_empty());
    }

    #[test]
    fn test_rows_strip_game_sets() {
        let set = partial("Doe", 1, "G1");
        let rows = set.batter_rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].games, 1);
        assert_eq!(rows[0].batting_average, Some(0.5));
        assert_eq!(set.seasons().into_iter().collect::<Vec<_>>(), vec![2025]);
    }
}
