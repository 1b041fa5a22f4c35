//! Authoritative state snapshots and entity mirrors.
//!
//! The write path stores the full serialized [`GameState`] per turn plus a
//! refresh of the per-entity mirror tables, all inside one transaction so
//! a crash never leaves a half-written turn. The read path reconstructs
//! the state from the newest snapshot and re-validates its indices before
//! handing it back.
//!
//! [`GameState`]: ec4x_core::GameState

use sqlx::PgPool;
use uuid::Uuid;

use ec4x_core::GameState;
use ec4x_types::events::GameEvent;

use crate::error::DbError;

/// Operations on the snapshot and entity-mirror tables.
pub struct StateStore<'a> {
    pool: &'a PgPool,
}

impl<'a> StateStore<'a> {
    /// Create a store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Persist a committed turn: the full snapshot, the entity mirrors,
    /// and the turn's event log, atomically.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Serialization`] if the state cannot be
    /// serialized, or [`DbError::Postgres`] if any write fails.
    pub async fn save_turn(
        &self,
        game_id: Uuid,
        state: &GameState,
        events: &[GameEvent],
    ) -> Result<(), DbError> {
        let turn = i64::from(state.turn);
        let blob = serde_json::to_value(state)?;

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r"INSERT INTO state_snapshots (game_id, turn, state)
              VALUES ($1, $2, $3)
              ON CONFLICT (game_id, turn) DO UPDATE SET state = EXCLUDED.state",
        )
        .bind(game_id)
        .bind(turn)
        .bind(&blob)
        .execute(&mut *tx)
        .await?;

        for (seq, event) in events.iter().enumerate() {
            sqlx::query(
                r"INSERT INTO events (game_id, turn, seq, scope, kind)
                  VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(game_id)
            .bind(turn)
            .bind(i64::try_from(seq).unwrap_or(i64::MAX))
            .bind(serde_json::to_value(&event.scope)?)
            .bind(serde_json::to_value(&event.kind)?)
            .execute(&mut *tx)
            .await?;
        }

        refresh_mirrors(&mut tx, game_id, state).await?;

        tx.commit().await?;
        tracing::debug!(%game_id, turn, events = events.len(), "turn persisted");
        Ok(())
    }

    /// Load the newest snapshot of a game and rebuild its state.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NoSnapshot`] if the game has never been saved,
    /// [`DbError::Serialization`] on a bad blob, or
    /// [`DbError::CorruptState`] if the reloaded state fails validation.
    pub async fn load_latest(&self, game_id: Uuid) -> Result<GameState, DbError> {
        let row: Option<(serde_json::Value,)> = sqlx::query_as(
            r"SELECT state FROM state_snapshots
              WHERE game_id = $1 ORDER BY turn DESC LIMIT 1",
        )
        .bind(game_id)
        .fetch_optional(self.pool)
        .await?;
        let (blob,) = row.ok_or(DbError::NoSnapshot(game_id))?;
        let state: GameState = serde_json::from_value(blob)?;
        let violations = state.validate_indices();
        if !violations.is_empty() {
            return Err(DbError::CorruptState(violations.join("; ")));
        }
        Ok(state)
    }

    /// Load a specific turn's snapshot (for rollback inspection).
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NoSnapshot`] if that turn was never saved.
    pub async fn load_turn(&self, game_id: Uuid, turn: u32) -> Result<GameState, DbError> {
        let row: Option<(serde_json::Value,)> = sqlx::query_as(
            r"SELECT state FROM state_snapshots WHERE game_id = $1 AND turn = $2",
        )
        .bind(game_id)
        .bind(i64::from(turn))
        .fetch_optional(self.pool)
        .await?;
        let (blob,) = row.ok_or(DbError::NoSnapshot(game_id))?;
        Ok(serde_json::from_value(blob)?)
    }
}

/// Rewrite the entity mirror tables for a game from the live state.
///
/// Mirrors are a queryable projection, not the source of truth, so a
/// delete-and-insert refresh inside the turn transaction is both simple
/// and correct.
async fn refresh_mirrors(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    game_id: Uuid,
    state: &GameState,
) -> Result<(), DbError> {
    for table in [
        "houses",
        "systems",
        "colonies",
        "fleets",
        "squadrons",
        "ships",
        "ground_units",
        "facilities",
        "projects",
        "transfers",
        "ongoing_effects",
    ] {
        sqlx::query(&format!("DELETE FROM {table} WHERE game_id = $1"))
            .bind(game_id)
            .execute(&mut **tx)
            .await?;
    }

    for (id, house) in &state.houses {
        sqlx::query(
            r"INSERT INTO houses (game_id, id, eliminated, data) VALUES ($1, $2, $3, $4)",
        )
        .bind(game_id)
        .bind(i64::from(id.into_inner()))
        .bind(house.eliminated)
        .bind(serde_json::to_value(house)?)
        .execute(&mut **tx)
        .await?;
    }

    for (id, system) in state.map.systems() {
        sqlx::query(r"INSERT INTO systems (game_id, id, data) VALUES ($1, $2, $3)")
            .bind(game_id)
            .bind(i64::from(id.into_inner()))
            .bind(serde_json::to_value(system)?)
            .execute(&mut **tx)
            .await?;
    }

    for (system, colony) in &state.colonies {
        sqlx::query(
            r"INSERT INTO colonies (game_id, system_id, owner, data) VALUES ($1, $2, $3, $4)",
        )
        .bind(game_id)
        .bind(i64::from(system.into_inner()))
        .bind(i64::from(colony.owner.into_inner()))
        .bind(serde_json::to_value(colony)?)
        .execute(&mut **tx)
        .await?;
    }

    for (id, fleet) in state.fleets.iter() {
        sqlx::query(
            r"INSERT INTO fleets (game_id, id, owner, location, data)
              VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(game_id)
        .bind(i64::from(id.into_inner()))
        .bind(i64::from(fleet.owner.into_inner()))
        .bind(i64::from(fleet.location.into_inner()))
        .bind(serde_json::to_value(fleet)?)
        .execute(&mut **tx)
        .await?;
    }

    for (id, squadron) in state.squadrons.iter() {
        sqlx::query(
            r"INSERT INTO squadrons (game_id, id, owner, data) VALUES ($1, $2, $3, $4)",
        )
        .bind(game_id)
        .bind(i64::from(id.into_inner()))
        .bind(i64::from(squadron.house_id.into_inner()))
        .bind(serde_json::to_value(squadron)?)
        .execute(&mut **tx)
        .await?;
    }

    for (id, ship) in state.ships.iter() {
        sqlx::query(r"INSERT INTO ships (game_id, id, owner, data) VALUES ($1, $2, $3, $4)")
            .bind(game_id)
            .bind(i64::from(id.into_inner()))
            .bind(i64::from(ship.house_id.into_inner()))
            .bind(serde_json::to_value(ship)?)
            .execute(&mut **tx)
            .await?;
    }

    for (id, unit) in state.ground_units.iter() {
        sqlx::query(
            r"INSERT INTO ground_units (game_id, id, owner, data) VALUES ($1, $2, $3, $4)",
        )
        .bind(game_id)
        .bind(i64::from(id.into_inner()))
        .bind(i64::from(unit.owner.into_inner()))
        .bind(serde_json::to_value(unit)?)
        .execute(&mut **tx)
        .await?;
    }

    for (id, facility) in state.facilities.iter() {
        sqlx::query(
            r"INSERT INTO facilities (game_id, id, colony, data) VALUES ($1, $2, $3, $4)",
        )
        .bind(game_id)
        .bind(i64::from(id.into_inner()))
        .bind(i64::from(facility.colony.into_inner()))
        .bind(serde_json::to_value(facility)?)
        .execute(&mut **tx)
        .await?;
    }

    for (id, project) in state.projects.iter() {
        sqlx::query(
            r"INSERT INTO projects (game_id, id, colony, data) VALUES ($1, $2, $3, $4)",
        )
        .bind(game_id)
        .bind(i64::from(id.into_inner()))
        .bind(i64::from(project.colony.into_inner()))
        .bind(serde_json::to_value(project)?)
        .execute(&mut **tx)
        .await?;
    }

    for (id, transfer) in state.transfers.iter() {
        sqlx::query(
            r"INSERT INTO transfers (game_id, id, owner, data) VALUES ($1, $2, $3, $4)",
        )
        .bind(game_id)
        .bind(i64::from(id.into_inner()))
        .bind(i64::from(transfer.house_id.into_inner()))
        .bind(serde_json::to_value(transfer)?)
        .execute(&mut **tx)
        .await?;
    }

    for (id, effect) in state.effects.iter() {
        sqlx::query(
            r"INSERT INTO ongoing_effects (game_id, id, target, data) VALUES ($1, $2, $3, $4)",
        )
        .bind(game_id)
        .bind(i64::from(id.into_inner()))
        .bind(i64::from(effect.target_house.into_inner()))
        .bind(serde_json::to_value(effect)?)
        .execute(&mut **tx)
        .await?;
    }

    Ok(())
}
