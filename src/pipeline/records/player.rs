//! Player identity: external ids per (name, team, season)
//!
//! Each role id is first-seen-wins. "First" is the batch's position in the
//! discovery listing, so the winner doesn't depend on which worker finished
//! first.

use crate::pipeline::merge::Merge;
use crate::pipeline::types::AggregationKey;
use serde::Serialize;

/// An id together with the discovery position of the batch that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeenId {
    pub value: String,
    pub first_seen: u64,
}

impl SeenId {
    pub fn new(value: impl Into<String>, first_seen: u64) -> Self {
        Self {
            value: value.into(),
            first_seen,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayerIdentity {
    pub pitcher_id: Option<SeenId>,
    pub batter_id: Option<SeenId>,
}

impl PlayerIdentity {
    /// Set the pitcher id only if none is known yet
    pub fn fill_pitcher_id(&mut self, id: SeenId) {
        if self.pitcher_id.is_none() {
            self.pitcher_id = Some(id);
        }
    }

    /// Set the batter id only if none is known yet
    pub fn fill_batter_id(&mut self, id: SeenId) {
        if self.batter_id.is_none() {
            self.batter_id = Some(id);
        }
    }

    pub fn to_row(&self, key: &AggregationKey) -> PlayerRow {
        PlayerRow {
            name: key.name.clone(),
            team: key.team.clone(),
            season: key.season,
            pitcher_id: self.pitcher_id.as_ref().map(|id| id.value.clone()),
            batter_id: self.batter_id.as_ref().map(|id| id.value.clone()),
        }
    }
}

fn keep_first(existing: &mut Option<SeenId>, incoming: Option<SeenId>) {
    let Some(id) = incoming else {
        return;
    };
    let earlier = existing
        .as_ref()
        .map_or(true, |current| id.first_seen < current.first_seen);
    if earlier {
        *existing = Some(id);
    }
}

impl Merge for PlayerIdentity {
    fn merge(&mut self, incoming: Self) {
        keep_first(&mut self.pitcher_id, incoming.pitcher_id);
        keep_first(&mut self.batter_id, incoming.batter_id);
    }
}

/// Persisted player row (`players` table)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerRow {
    pub name: String,
    pub team: String,
    pub season: i32,
    pub pitcher_id: Option<String>,
    pub batter_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::merge::merge;

    #[test]
    fn test_merge_fills_empty_roles() {
        let pitcher_side = PlayerIdentity {
            pitcher_id: Some(SeenId::new("P-1", 0)),
            batter_id: None,
        };
        let batter_side = PlayerIdentity {
            pitcher_id: None,
            batter_id: Some(SeenId::new("B-1", 1)),
        };

        let merged = merge(pitcher_side, batter_side);
        let row = merged.to_row(&AggregationKey::new("Two Way", "T", 2025));
        assert_eq!(row.pitcher_id.as_deref(), Some("P-1"));
        assert_eq!(row.batter_id.as_deref(), Some("B-1"));
    }

    #[test]
    fn test_existing_value_wins_in_sequential_order() {
        let first = PlayerIdentity {
            pitcher_id: Some(SeenId::new("P-1", 0)),
            batter_id: None,
        };
        let later = PlayerIdentity {
            pitcher_id: Some(SeenId::new("P-2", 1)),
            batter_id: None,
        };
        let merged = merge(first, later);
        assert_eq!(merged.pitcher_id.unwrap().value, "P-1");
    }

    #[test]
    fn test_earliest_batch_wins_regardless_of_merge_order() {
        let early = PlayerIdentity {
            pitcher_id: Some(SeenId::new("P-early", 3)),
            batter_id: None,
        };
        let late = PlayerIdentity {
            pitcher_id: Some(SeenId::new("P-late", 9)),
            batter_id: None,
        };
        assert_eq!(merge(late.clone(), early.clone()), merge(early, late));
    }

    #[test]
    fn test_same_batch_keeps_existing() {
        let mut identity = PlayerIdentity::default();
        identity.fill_batter_id(SeenId::new("B-1", 4));
        identity.fill_batter_id(SeenId::new("B-2", 4));
        assert_eq!(identity.batter_id.unwrap().value, "B-1");
    }
}
