//! The `games` and `invites` tables.
//!
//! A game row records metadata plus the materialized setup and rule
//! snapshot JSON; invites map single-use codes to house slots for the
//! join flow.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DbError;

/// Operations on the `games` and `invites` tables.
pub struct GameStore<'a> {
    pool: &'a PgPool,
}

impl<'a> GameStore<'a> {
    /// Create a store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new game row.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the insert fails.
    pub async fn create_game(
        &self,
        id: Uuid,
        name: &str,
        seed: u64,
        setup_json: &serde_json::Value,
        config_json: &serde_json::Value,
    ) -> Result<(), DbError> {
        sqlx::query(
            r"INSERT INTO games (id, name, seed, turn, setup_json, config_json)
              VALUES ($1, $2, $3, 0, $4, $5)",
        )
        .bind(id)
        .bind(name)
        .bind(i64::try_from(seed).unwrap_or(i64::MAX))
        .bind(setup_json)
        .bind(config_json)
        .execute(self.pool)
        .await?;
        tracing::info!(%id, name, "game created");
        Ok(())
    }

    /// Advance a game's recorded turn.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the update fails.
    pub async fn set_turn(&self, id: Uuid, turn: u32) -> Result<(), DbError> {
        sqlx::query(r"UPDATE games SET turn = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(i64::from(turn))
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Fetch a game's metadata row.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::GameNotFound`] if no such game exists, or
    /// [`DbError::Postgres`] on query failure.
    pub async fn get_game(&self, id: Uuid) -> Result<GameRow, DbError> {
        let row = sqlx::query_as::<_, GameRow>(
            r"SELECT id, name, seed, turn, setup_json, config_json, created_at, updated_at
              FROM games WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        row.ok_or(DbError::GameNotFound(id))
    }

    /// List all games, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] on query failure.
    pub async fn list_games(&self) -> Result<Vec<GameRow>, DbError> {
        let rows = sqlx::query_as::<_, GameRow>(
            r"SELECT id, name, seed, turn, setup_json, config_json, created_at, updated_at
              FROM games ORDER BY created_at DESC",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Create one invite code per house slot.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if any insert fails.
    pub async fn create_invites(
        &self,
        game_id: Uuid,
        codes: &[(String, u32)],
    ) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;
        for (code, house_id) in codes {
            sqlx::query(
                r"INSERT INTO invites (code, game_id, house_id) VALUES ($1, $2, $3)",
            )
            .bind(code)
            .bind(game_id)
            .bind(i64::from(*house_id))
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        tracing::info!(%game_id, count = codes.len(), "invites created");
        Ok(())
    }

    /// Claim an invite code, returning the house slot it grants.
    ///
    /// A code can be claimed once; a second claim returns `None`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] on query failure.
    pub async fn claim_invite(&self, code: &str) -> Result<Option<(Uuid, u32)>, DbError> {
        let row = sqlx::query_as::<_, InviteRow>(
            r"UPDATE invites SET claimed = TRUE
              WHERE code = $1 AND claimed = FALSE
              RETURNING code, game_id, house_id, claimed, created_at",
        )
        .bind(code)
        .fetch_optional(self.pool)
        .await?;
        Ok(row.map(|invite| {
            (
                invite.game_id,
                u32::try_from(invite.house_id).unwrap_or(u32::MAX),
            )
        }))
    }
}

/// A row from the `games` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct GameRow {
    /// Game identifier.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Game seed.
    pub seed: i64,
    /// Last committed turn.
    pub turn: i64,
    /// Materialized scenario setup.
    pub setup_json: serde_json::Value,
    /// Materialized rule snapshot.
    pub config_json: serde_json::Value,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// A row from the `invites` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct InviteRow {
    /// The single-use code.
    pub code: String,
    /// The game it joins.
    pub game_id: Uuid,
    /// The house slot it grants.
    pub house_id: i64,
    /// Whether the code has been used.
    pub claimed: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}
