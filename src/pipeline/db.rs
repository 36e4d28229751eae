//! Aggregate persistence
//!
//! `AggregateStore` is the persistence seam the engine hands its accumulators
//! to. `SqliteAggregateStore` is the shipped implementation.
//!
//! ## Cross-run semantics
//!
//! One run only sees the batches it merged, so an upsert must not replace the
//! stored row. Counting columns (and `games`) are added to what is stored, then
//! the rate columns of the touched season are recomputed in SQL from the new
//! totals. Player identifiers only fill NULLs.
//!
//! `games` adds across runs: a game whose rows are split over batches that land
//! in different runs is counted once per run.

use super::records::{BatterRow, PitchMixRow, PitcherRow, PlayerRow};
use super::types::Domain;
use async_trait::async_trait;
use rusqlite::{params, Connection, Statement};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

pub const DEFAULT_UPSERT_CHUNK: usize = 100;

/// Schema files, applied in order on open (all `IF NOT EXISTS`)
const MIGRATIONS: [(&str, &str); 4] = [
    ("01_batter_stats.sql", include_str!("../../sql/01_batter_stats.sql")),
    ("02_pitcher_stats.sql", include_str!("../../sql/02_pitcher_stats.sql")),
    ("03_pitch_counts.sql", include_str!("../../sql/03_pitch_counts.sql")),
    ("04_players.sql", include_str!("../../sql/04_players.sql")),
];

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("failed to apply migration {file}: {source}")]
    Migration {
        file: &'static str,
        #[source]
        source: rusqlite::Error,
    },
    #[error("store connection lock poisoned")]
    Poisoned,
}

/// Outcome of one domain's upsert
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertReport {
    pub domain: Domain,
    pub attempted: usize,
    pub written: usize,
    pub failed_chunks: usize,
}

impl UpsertReport {
    fn new(domain: Domain, attempted: usize) -> Self {
        Self {
            domain,
            attempted,
            written: 0,
            failed_chunks: 0,
        }
    }
}

/// Persistence collaborator for the four aggregate domains
///
/// Rows are keyed by (name, team, season). Implementations write in bounded
/// chunks; a failed chunk is reported in `UpsertReport::failed_chunks` and does
/// not stop the remaining chunks. `Err` is reserved for the store being
/// unusable as a whole.
#[async_trait]
pub trait AggregateStore: Send + Sync {
    async fn upsert_batters(&self, rows: Vec<BatterRow>) -> Result<UpsertReport, StoreError>;

    async fn upsert_pitchers(&self, rows: Vec<PitcherRow>) -> Result<UpsertReport, StoreError>;

    async fn upsert_pitch_mix(&self, rows: Vec<PitchMixRow>) -> Result<UpsertReport, StoreError>;

    async fn upsert_players(&self, rows: Vec<PlayerRow>) -> Result<UpsertReport, StoreError>;

    /// Total rows now stored for `season` in `domain`
    async fn season_count(&self, domain: Domain, season: i32) -> Result<u64, StoreError>;
}

/// Table backing each domain
pub fn table_name(domain: Domain) -> &'static str {
    match domain {
        Domain::Batter => "batter_stats",
        Domain::Pitcher => "pitcher_stats",
        Domain::PitchType => "pitch_counts",
        Domain::Player => "players",
    }
}

/// Apply the bundled schema and switch the database to WAL
///
/// Idempotent: every statement uses `IF NOT EXISTS`.
pub fn run_schema_migrations(conn: &mut Connection) -> Result<(), StoreError> {
    let mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    log::info!("📊 SQLite journal mode: {}", mode);

    log::info!("🔧 Running {} schema migrations", MIGRATIONS.len());
    for (file, sql) in MIGRATIONS {
        conn.execute_batch(sql)
            .map_err(|source| StoreError::Migration { file, source })?;
        log::debug!("   ├─ applied {}", file);
    }
    log::info!("✅ Schema migrations complete");

    Ok(())
}

/// SQLite implementation of `AggregateStore`
///
/// A single connection behind a mutex; the engine persists once at the end of
/// a run so there is no write contention to pool for.
pub struct SqliteAggregateStore {
    conn: Arc<Mutex<Connection>>,
    chunk_size: usize,
}

impl SqliteAggregateStore {
    /// Open (or create) the database and apply migrations
    ///
    /// Arguments:
    /// - `db_path`: SQLite file, created when missing
    /// - `chunk_size`: rows per upsert transaction (clamped to at least 1)
    pub fn open(db_path: impl AsRef<Path>, chunk_size: usize) -> Result<Self, StoreError> {
        let mut conn = Connection::open(db_path.as_ref())?;
        run_schema_migrations(&mut conn)?;
        log::info!("💾 Aggregate store ready at {}", db_path.as_ref().display());

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            chunk_size: chunk_size.max(1),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Write `rows` in chunks of `chunk_size`, one transaction per chunk
    ///
    /// `recompute_sql` (bound to `?1 = season`) runs inside each chunk's
    /// transaction for every season the chunk touched.
    fn upsert_chunked<R, S, B>(
        &self,
        domain: Domain,
        rows: &[R],
        upsert_sql: &str,
        recompute_sql: Option<&str>,
        season_of: S,
        bind: B,
    ) -> Result<UpsertReport, StoreError>
    where
        S: Fn(&R) -> i32,
        B: Fn(&mut Statement<'_>, &R, i64) -> rusqlite::Result<usize>,
    {
        let mut report = UpsertReport::new(domain, rows.len());
        if rows.is_empty() {
            return Ok(report);
        }

        let mut conn = self.lock()?;
        let now = chrono::Utc::now().timestamp();

        for (index, chunk) in rows.chunks(self.chunk_size).enumerate() {
            let result = write_chunk(
                &mut conn,
                chunk,
                upsert_sql,
                recompute_sql,
                &season_of,
                &bind,
                now,
            );

            match result {
                Ok(written) => report.written += written,
                Err(e) => {
                    report.failed_chunks += 1;
                    log::error!(
                        "❌ Failed to upsert {} chunk {} ({} rows): {}",
                        domain,
                        index,
                        chunk.len(),
                        e
                    );
                }
            }
        }

        log::info!(
            "💾 Upserted {}/{} {} rows ({} failed chunks)",
            report.written,
            report.attempted,
            domain,
            report.failed_chunks
        );
        Ok(report)
    }
}

/// One chunk in one transaction; any error rolls the whole chunk back
fn write_chunk<R, S, B>(
    conn: &mut Connection,
    chunk: &[R],
    upsert_sql: &str,
    recompute_sql: Option<&str>,
    season_of: &S,
    bind: &B,
    now: i64,
) -> rusqlite::Result<usize>
where
    S: Fn(&R) -> i32,
    B: Fn(&mut Statement<'_>, &R, i64) -> rusqlite::Result<usize>,
{
    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare_cached(upsert_sql)?;
        for row in chunk {
            bind(&mut stmt, row, now)?;
        }
        if let Some(sql) = recompute_sql {
            let seasons: BTreeSet<i32> = chunk.iter().map(season_of).collect();
            let mut recompute = tx.prepare_cached(sql)?;
            for season in seasons {
                recompute.execute([season])?;
            }
        }
    }
    tx.commit()?;
    Ok(chunk.len())
}

const UPSERT_BATTER_SQL: &str = r#"
    INSERT INTO batter_stats (
        name, team, season,
        hits, at_bats, strikes, walks, strikeouts, home_runs, extra_base_hits,
        plate_appearances, hit_by_pitch, sacrifices, total_bases,
        in_zone_pitches, out_of_zone_pitches, in_zone_whiffs, out_of_zone_swings,
        games,
        batting_average, on_base_percentage, slugging_percentage,
        on_base_plus_slugging, isolated_power,
        strikeout_rate, walk_rate, chase_rate, whiff_rate,
        updated_at
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15,
              ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, ?27, ?28, ?29)
    ON CONFLICT(name, team, season) DO UPDATE SET
        hits = hits + excluded.hits,
        at_bats = at_bats + excluded.at_bats,
        strikes = strikes + excluded.strikes,
        walks = walks + excluded.walks,
        strikeouts = strikeouts + excluded.strikeouts,
        home_runs = home_runs + excluded.home_runs,
        extra_base_hits = extra_base_hits + excluded.extra_base_hits,
        plate_appearances = plate_appearances + excluded.plate_appearances,
        hit_by_pitch = hit_by_pitch + excluded.hit_by_pitch,
        sacrifices = sacrifices + excluded.sacrifices,
        total_bases = total_bases + excluded.total_bases,
        in_zone_pitches = in_zone_pitches + excluded.in_zone_pitches,
        out_of_zone_pitches = out_of_zone_pitches + excluded.out_of_zone_pitches,
        in_zone_whiffs = in_zone_whiffs + excluded.in_zone_whiffs,
        out_of_zone_swings = out_of_zone_swings + excluded.out_of_zone_swings,
        games = games + excluded.games,
        updated_at = excluded.updated_at
"#;

const RECOMPUTE_BATTER_SQL: &str = r#"
    UPDATE batter_stats SET
        batting_average = ROUND(CAST(hits AS REAL) / NULLIF(at_bats, 0), 3),
        on_base_percentage = ROUND(
            CAST(hits + walks + hit_by_pitch AS REAL)
                / NULLIF(at_bats + walks + hit_by_pitch + sacrifices, 0), 3),
        slugging_percentage = ROUND(CAST(total_bases AS REAL) / NULLIF(at_bats, 0), 3),
        on_base_plus_slugging = CASE
            WHEN at_bats + walks + hit_by_pitch + sacrifices > 0 THEN ROUND(
                COALESCE(CAST(hits + walks + hit_by_pitch AS REAL)
                    / NULLIF(at_bats + walks + hit_by_pitch + sacrifices, 0), 0)
                + COALESCE(CAST(total_bases AS REAL) / NULLIF(at_bats, 0), 0), 3)
        END,
        isolated_power = ROUND(CAST(total_bases - hits AS REAL) / NULLIF(at_bats, 0), 3),
        strikeout_rate = ROUND(CAST(strikeouts AS REAL) / NULLIF(plate_appearances, 0), 3),
        walk_rate = ROUND(CAST(walks AS REAL) / NULLIF(plate_appearances, 0), 3),
        chase_rate = ROUND(CAST(out_of_zone_swings AS REAL) / NULLIF(out_of_zone_pitches, 0), 3),
        whiff_rate = ROUND(CAST(in_zone_whiffs AS REAL) / NULLIF(in_zone_pitches, 0), 3)
    WHERE season = ?1
"#;

const UPSERT_PITCHER_SQL: &str = r#"
    INSERT INTO pitcher_stats (
        name, team, season,
        strikeouts, walks, pitches, games_started, outs, batters_faced,
        in_zone_pitches, out_of_zone_pitches, in_zone_whiffs, in_zone_swings, chases,
        games,
        innings_pitched, strikeout_rate, walk_rate, whiff_rate, chase_rate,
        updated_at
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15,
              ?16, ?17, ?18, ?19, ?20, ?21)
    ON CONFLICT(name, team, season) DO UPDATE SET
        strikeouts = strikeouts + excluded.strikeouts,
        walks = walks + excluded.walks,
        pitches = pitches + excluded.pitches,
        games_started = games_started + excluded.games_started,
        outs = outs + excluded.outs,
        batters_faced = batters_faced + excluded.batters_faced,
        in_zone_pitches = in_zone_pitches + excluded.in_zone_pitches,
        out_of_zone_pitches = out_of_zone_pitches + excluded.out_of_zone_pitches,
        in_zone_whiffs = in_zone_whiffs + excluded.in_zone_whiffs,
        in_zone_swings = in_zone_swings + excluded.in_zone_swings,
        chases = chases + excluded.chases,
        games = games + excluded.games,
        updated_at = excluded.updated_at
"#;

const RECOMPUTE_PITCHER_SQL: &str = r#"
    UPDATE pitcher_stats SET
        innings_pitched = ((outs / 3) * 10 + (outs % 3)) / 10.0,
        strikeout_rate = ROUND(CAST(strikeouts AS REAL) / NULLIF(batters_faced, 0), 3),
        walk_rate = ROUND(CAST(walks AS REAL) / NULLIF(batters_faced, 0), 3),
        whiff_rate = ROUND(CAST(in_zone_whiffs AS REAL) / NULLIF(in_zone_pitches, 0), 3),
        chase_rate = ROUND(CAST(chases AS REAL) / NULLIF(out_of_zone_pitches, 0), 3)
    WHERE season = ?1
"#;

const UPSERT_PITCH_MIX_SQL: &str = r#"
    INSERT INTO pitch_counts (
        name, team, season,
        total_pitches, curveball_count, fourseam_count, sinker_count, slider_count,
        twoseam_count, changeup_count, cutter_count, splitter_count, other_count,
        games, updated_at
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
    ON CONFLICT(name, team, season) DO UPDATE SET
        total_pitches = total_pitches + excluded.total_pitches,
        curveball_count = curveball_count + excluded.curveball_count,
        fourseam_count = fourseam_count + excluded.fourseam_count,
        sinker_count = sinker_count + excluded.sinker_count,
        slider_count = slider_count + excluded.slider_count,
        twoseam_count = twoseam_count + excluded.twoseam_count,
        changeup_count = changeup_count + excluded.changeup_count,
        cutter_count = cutter_count + excluded.cutter_count,
        splitter_count = splitter_count + excluded.splitter_count,
        other_count = other_count + excluded.other_count,
        games = games + excluded.games,
        updated_at = excluded.updated_at
"#;

const UPSERT_PLAYER_SQL: &str = r#"
    INSERT INTO players (name, team, season, pitcher_id, batter_id, updated_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
    ON CONFLICT(name, team, season) DO UPDATE SET
        pitcher_id = COALESCE(pitcher_id, excluded.pitcher_id),
        batter_id = COALESCE(batter_id, excluded.batter_id),
        updated_at = excluded.updated_at
"#;

#[async_trait]
impl AggregateStore for SqliteAggregateStore {
    async fn upsert_batters(&self, rows: Vec<BatterRow>) -> Result<UpsertReport, StoreError> {
        self.upsert_chunked(
            Domain::Batter,
            &rows,
            UPSERT_BATTER_SQL,
            Some(RECOMPUTE_BATTER_SQL),
            |r| r.season,
            |stmt, r, now| {
                stmt.execute(params![
                    r.name,
                    r.team,
                    r.season,
                    r.hits,
                    r.at_bats,
                    r.strikes,
                    r.walks,
                    r.strikeouts,
                    r.home_runs,
                    r.extra_base_hits,
                    r.plate_appearances,
                    r.hit_by_pitch,
                    r.sacrifices,
                    r.total_bases,
                    r.in_zone_pitches,
                    r.out_of_zone_pitches,
                    r.in_zone_whiffs,
                    r.out_of_zone_swings,
                    r.games,
                    r.batting_average,
                    r.on_base_percentage,
                    r.slugging_percentage,
                    r.on_base_plus_slugging,
                    r.isolated_power,
                    r.strikeout_rate,
                    r.walk_rate,
                    r.chase_rate,
                    r.whiff_rate,
                    now,
                ])
            },
        )
    }

    async fn upsert_pitchers(&self, rows: Vec<PitcherRow>) -> Result<UpsertReport, StoreError> {
        self.upsert_chunked(
            Domain::Pitcher,
            &rows,
            UPSERT_PITCHER_SQL,
            Some(RECOMPUTE_PITCHER_SQL),
            |r| r.season,
            |stmt, r, now| {
                stmt.execute(params![
                    r.name,
                    r.team,
                    r.season,
                    r.strikeouts,
                    r.walks,
                    r.pitches,
                    r.games_started,
                    r.outs,
                    r.batters_faced,
                    r.in_zone_pitches,
                    r.out_of_zone_pitches,
                    r.in_zone_whiffs,
                    r.in_zone_swings,
                    r.chases,
                    r.games,
                    r.innings_pitched,
                    r.strikeout_rate,
                    r.walk_rate,
                    r.whiff_rate,
                    r.chase_rate,
                    now,
                ])
            },
        )
    }

    async fn upsert_pitch_mix(&self, rows: Vec<PitchMixRow>) -> Result<UpsertReport, StoreError> {
        self.upsert_chunked(
            Domain::PitchType,
            &rows,
            UPSERT_PITCH_MIX_SQL,
            None,
            |r| r.season,
            |stmt, r, now| {
                stmt.execute(params![
                    r.name,
                    r.team,
                    r.season,
                    r.total_pitches,
                    r.curveball_count,
                    r.fourseam_count,
                    r.sinker_count,
                    r.slider_count,
                    r.twoseam_count,
                    r.changeup_count,
                    r.cutter_count,
                    r.splitter_count,
                    r.other_count,
                    r.games,
                    now,
                ])
            },
        )
    }

    async fn upsert_players(&self, rows: Vec<PlayerRow>) -> Result<UpsertReport, StoreError> {
        self.upsert_chunked(
            Domain::Player,
            &rows,
            UPSERT_PLAYER_SQL,
            None,
            |r| r.season,
            |stmt, r, now| {
                stmt.execute(params![r.name, r.team, r.season, r.pitcher_id, r.batter_id, now])
            },
        )
    }

    async fn season_count(&self, domain: Domain, season: i32) -> Result<u64, StoreError> {
        let conn = self.lock()?;
        let sql = format!("SELECT COUNT(*) FROM {} WHERE season = ?1", table_name(domain));
        let count: i64 = conn.query_row(&sql, [season], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }
}
