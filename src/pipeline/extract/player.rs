//! Player identity extractor
//!
//! Collects the external pitcher and batter ids seen for each
//! (name, team, season). Either role's column triple is enough; a batch
//! with neither is rejected.

use super::{require_columns, BatchContext, Role};
use crate::batch::{Column, ParsedBatch};
use crate::pipeline::records::{PlayerIdentity, SeenId};
use crate::pipeline::types::{Domain, KeyedRecords};

pub const PITCHER_COLUMNS: [Column; 3] = [Column::Pitcher, Column::PitcherId, Column::PitcherTeam];
pub const BATTER_COLUMNS: [Column; 3] = [Column::Batter, Column::BatterId, Column::BatterTeam];

pub fn extract_players(parsed: &ParsedBatch, ctx: &BatchContext<'_>) -> KeyedRecords<PlayerIdentity> {
    let mut out: KeyedRecords<PlayerIdentity> = KeyedRecords::new();

    let roles: Vec<Role> = [
        (Role::Pitcher, &PITCHER_COLUMNS),
        (Role::Batter, &BATTER_COLUMNS),
    ]
    .into_iter()
    .filter(|(_, cols)| parsed.has_all(*cols))
    .map(|(role, _)| role)
    .collect();

    if roles.is_empty() {
        // Report against the pitcher triple; either triple would satisfy the domain
        require_columns(parsed, Domain::Player, &PITCHER_COLUMNS, ctx);
        return out;
    }

    for role in roles {
        for row in &parsed.rows {
            let (Some(name), Some(id), Some(team)) =
                (role.name_of(row), role.id_of(row), role.team_of(row))
            else {
                continue;
            };

            let identity = out.entry(ctx.key(name, team)).or_default();
            let seen = SeenId::new(id, ctx.sequence);
            match role {
                Role::Pitcher => identity.fill_pitcher_id(seen),
                Role::Batter => identity.fill_batter_id(seen),
            }
        }
    }

    out
}
