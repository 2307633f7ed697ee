use super::images::{normalize_legacy, not_found, ImageRepository};
use async_trait::async_trait;
use imgstash_core::{AppError, ImageRecord, NewImageRecord};
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

const RECORD_COLUMNS: &str =
    r#"id, filename, path, "type", size, width, height, extra_types, tag"#;

/// PostgreSQL-backed image repository
#[derive(Clone)]
pub struct PgImageRepository {
    pool: PgPool,
}

impl PgImageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn to_i32(field: &str, value: u32) -> Result<i32, AppError> {
    i32::try_from(value)
        .map_err(|_| AppError::InvalidInput(format!("{} {} is out of range", field, value)))
}

#[async_trait]
impl ImageRepository for PgImageRepository {
    #[tracing::instrument(skip(self, record), fields(db.table = "images", db.operation = "insert"))]
    async fn create(&self, record: NewImageRecord) -> Result<ImageRecord, AppError> {
        let id = Uuid::new_v4();
        let extra_types = imgstash_core::merge_extra_types(&[], &record.extra_types);

        let created = sqlx::query_as::<Postgres, ImageRecord>(&format!(
            r#"
            INSERT INTO images (id, filename, "type", size, width, height, extra_types, tag)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            RECORD_COLUMNS
        ))
        .bind(id)
        .bind(&record.filename)
        .bind(&record.image_type)
        .bind(&record.size)
        .bind(to_i32("width", record.width)?)
        .bind(to_i32("height", record.height)?)
        .bind(extra_types)
        .bind(&record.tag)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    #[tracing::instrument(skip(self), fields(db.table = "images", db.operation = "select", db.record_id = %id))]
    async fn get(&self, id: Uuid) -> Result<Option<ImageRecord>, AppError> {
        let record = sqlx::query_as::<Postgres, ImageRecord>(&format!(
            "SELECT {} FROM images WHERE id = $1",
            RECORD_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    #[tracing::instrument(skip(self), fields(db.table = "images", db.operation = "select"))]
    async fn list(&self) -> Result<Vec<ImageRecord>, AppError> {
        let records = sqlx::query_as::<Postgres, ImageRecord>(&format!(
            "SELECT {} FROM images ORDER BY created_at ASC, id ASC",
            RECORD_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    #[tracing::instrument(skip(self), fields(db.table = "images", db.operation = "update", db.record_id = %id))]
    async fn set_path(&self, id: Uuid, path: &str) -> Result<ImageRecord, AppError> {
        sqlx::query_as::<Postgres, ImageRecord>(&format!(
            "UPDATE images SET path = $2 WHERE id = $1 RETURNING {}",
            RECORD_COLUMNS
        ))
        .bind(id)
        .bind(path)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| not_found(id))
    }

    #[tracing::instrument(skip(self), fields(db.table = "images", db.operation = "update", db.record_id = %id))]
    async fn append_extra_types(
        &self,
        id: Uuid,
        additions: &[String],
    ) -> Result<ImageRecord, AppError> {
        // Order-preserving distinct over the concatenated array.
        sqlx::query_as::<Postgres, ImageRecord>(&format!(
            r#"
            UPDATE images
            SET extra_types = ARRAY(
                SELECT e
                FROM unnest(extra_types || $2::TEXT[]) WITH ORDINALITY AS t(e, ord)
                WHERE e <> ''
                GROUP BY e
                ORDER BY MIN(ord)
            )
            WHERE id = $1
            RETURNING {}
            "#,
            RECORD_COLUMNS
        ))
        .bind(id)
        .bind(additions.to_vec())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| not_found(id))
    }

    #[tracing::instrument(skip(self), fields(db.table = "images", db.operation = "update", db.record_id = %id))]
    async fn update_format(
        &self,
        id: Uuid,
        image_type: &str,
        filename: &str,
        size: u64,
    ) -> Result<ImageRecord, AppError> {
        sqlx::query_as::<Postgres, ImageRecord>(&format!(
            r#"UPDATE images SET "type" = $2, filename = $3, size = $4 WHERE id = $1 RETURNING {}"#,
            RECORD_COLUMNS
        ))
        .bind(id)
        .bind(image_type)
        .bind(filename)
        .bind(size.to_string())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| not_found(id))
    }

    #[tracing::instrument(skip(self), fields(db.table = "images", db.operation = "update", db.record_id = %id))]
    async fn update_dimensions(
        &self,
        id: Uuid,
        width: u32,
        height: u32,
        size: u64,
    ) -> Result<ImageRecord, AppError> {
        sqlx::query_as::<Postgres, ImageRecord>(&format!(
            "UPDATE images SET width = $2, height = $3, size = $4 WHERE id = $1 RETURNING {}",
            RECORD_COLUMNS
        ))
        .bind(id)
        .bind(to_i32("width", width)?)
        .bind(to_i32("height", height)?)
        .bind(size.to_string())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| not_found(id))
    }

    #[tracing::instrument(skip(self), fields(db.table = "images", db.operation = "backfill"))]
    async fn backfill_legacy(&self) -> Result<u64, AppError> {
        let candidates = sqlx::query_as::<Postgres, ImageRecord>(&format!(
            r#"
            SELECT {}
            FROM images
            WHERE "type" IS NULL
               OR "type" = ''
               OR cardinality(extra_types) <> (
                    SELECT count(DISTINCT e) FROM unnest(extra_types) AS e WHERE e <> ''
               )
            "#,
            RECORD_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        let mut tx = self.pool.begin().await?;
        let mut changed = 0u64;

        for record in &candidates {
            let Some((image_type, extra_types)) = normalize_legacy(record) else {
                continue;
            };

            sqlx::query(r#"UPDATE images SET "type" = $2, extra_types = $3 WHERE id = $1"#)
                .bind(record.id)
                .bind(image_type)
                .bind(extra_types)
                .execute(&mut *tx)
                .await?;
            changed += 1;
        }

        tx.commit().await?;

        tracing::info!(
            candidates = candidates.len(),
            changed,
            "Legacy image records back-filled"
        );

        Ok(changed)
    }
}
