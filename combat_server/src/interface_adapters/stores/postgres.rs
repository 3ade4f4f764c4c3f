use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::errors::StoreError;
use crate::domain::ports::PlayerStore;
use crate::domain::state::{Color, PlayerPatch, PlayerRecord, PlayerStats};
use crate::domain::Vec3;

const SELECT_COLUMNS: &str = "id, name, color_r, color_g, color_b, pos_x, pos_y, pos_z, \
     rotation, mode, health, kills, catches, currency, active, last_update";

// PostgreSQL-backed durable player store.
#[derive(Clone)]
pub struct PostgresPlayerStore {
    pub db: PgPool,
}

#[derive(Debug, sqlx::FromRow)]
struct PlayerRow {
    id: String,
    name: String,
    color_r: f32,
    color_g: f32,
    color_b: f32,
    pos_x: Option<f64>,
    pos_y: Option<f64>,
    pos_z: Option<f64>,
    rotation: f64,
    mode: String,
    health: i32,
    kills: i64,
    catches: i64,
    currency: i64,
    active: bool,
    last_update: f64,
}

impl From<PlayerRow> for PlayerRecord {
    fn from(row: PlayerRow) -> Self {
        let position = match (row.pos_x, row.pos_y, row.pos_z) {
            (Some(x), y, Some(z)) => Some(Vec3::new(x, y.unwrap_or(0.0), z)),
            _ => None,
        };
        Self {
            id: row.id,
            name: row.name,
            color: Color {
                r: row.color_r,
                g: row.color_g,
                b: row.color_b,
            },
            position,
            rotation: row.rotation,
            mode: row.mode,
            health: row.health,
            stats: PlayerStats {
                kills: counter_from_db(row.kills),
                catches: counter_from_db(row.catches),
                currency: counter_from_db(row.currency),
            },
            active: row.active,
            last_update: row.last_update,
        }
    }
}

fn counter_from_db(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

fn counter_to_db(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn unavailable(err: sqlx::Error) -> StoreError {
    StoreError::Unavailable(err.to_string())
}

#[async_trait]
impl PlayerStore for PostgresPlayerStore {
    async fn get_player(&self, id: &str) -> Result<Option<PlayerRecord>, StoreError> {
        let row = sqlx::query_as::<_, PlayerRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM players WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .map_err(unavailable)?;

        Ok(row.map(PlayerRecord::from))
    }

    async fn create_player(&self, record: PlayerRecord) -> Result<PlayerRecord, StoreError> {
        sqlx::query(
            r#"
            INSERT INTO players (
                id, name, color_r, color_g, color_b, pos_x, pos_y, pos_z,
                rotation, mode, health, kills, catches, currency, active, last_update
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(&record.id)
        .bind(&record.name)
        .bind(record.color.r)
        .bind(record.color.g)
        .bind(record.color.b)
        .bind(record.position.map(|p| p.x))
        .bind(record.position.map(|p| p.y))
        .bind(record.position.map(|p| p.z))
        .bind(record.rotation)
        .bind(&record.mode)
        .bind(record.health)
        .bind(counter_to_db(record.stats.kills))
        .bind(counter_to_db(record.stats.catches))
        .bind(counter_to_db(record.stats.currency))
        .bind(record.active)
        .bind(record.last_update)
        .execute(&self.db)
        .await
        .map_err(unavailable)?;

        Ok(record)
    }

    async fn update_player(&self, id: &str, patch: PlayerPatch) -> Result<(), StoreError> {
        // Unset patch fields bind as NULL and keep the stored value.
        let result = sqlx::query(
            r#"
            UPDATE players SET
                name = COALESCE($2, name),
                color_r = COALESCE($3, color_r),
                color_g = COALESCE($4, color_g),
                color_b = COALESCE($5, color_b),
                pos_x = COALESCE($6, pos_x),
                pos_y = COALESCE($7, pos_y),
                pos_z = COALESCE($8, pos_z),
                rotation = COALESCE($9, rotation),
                mode = COALESCE($10, mode),
                health = COALESCE($11, health),
                kills = COALESCE($12, kills),
                catches = COALESCE($13, catches),
                currency = COALESCE($14, currency),
                active = COALESCE($15, active),
                last_update = $16
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(patch.name)
        .bind(patch.color.map(|c| c.r))
        .bind(patch.color.map(|c| c.g))
        .bind(patch.color.map(|c| c.b))
        .bind(patch.position.map(|p| p.x))
        .bind(patch.position.map(|p| p.y))
        .bind(patch.position.map(|p| p.z))
        .bind(patch.rotation)
        .bind(patch.mode)
        .bind(patch.health)
        .bind(patch.stats.map(|s| counter_to_db(s.kills)))
        .bind(patch.stats.map(|s| counter_to_db(s.catches)))
        .bind(patch.stats.map(|s| counter_to_db(s.currency)))
        .bind(patch.active)
        .bind(patch.last_update)
        .execute(&self.db)
        .await
        .map_err(unavailable)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn list_players(&self) -> Result<Vec<PlayerRecord>, StoreError> {
        let rows = sqlx::query_as::<_, PlayerRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM players ORDER BY id"
        ))
        .fetch_all(&self.db)
        .await
        .map_err(unavailable)?;

        Ok(rows.into_iter().map(PlayerRecord::from).collect())
    }
}
