use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct Rating {
    pub id: Uuid,
    pub recipe_id: Uuid,
    pub user_id: Uuid,
    pub score: i32,
    pub comment: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

const RATING_COLUMNS: &str = "id, recipe_id, user_id, score, comment, created_at, updated_at";

impl Rating {
    pub async fn list_for_recipe(
        db: &PgPool,
        recipe_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Rating>, sqlx::Error> {
        sqlx::query_as::<_, Rating>(&format!(
            r#"
            SELECT {RATING_COLUMNS}
            FROM ratings
            WHERE recipe_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(recipe_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await
    }

    pub async fn count_for_recipe(db: &PgPool, recipe_id: Uuid) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM ratings WHERE recipe_id = $1")
            .bind(recipe_id)
            .fetch_one(db)
            .await?;
        Ok(count)
    }

    pub async fn find_by_id(
        db: &PgPool,
        recipe_id: Uuid,
        rating_id: Uuid,
    ) -> Result<Option<Rating>, sqlx::Error> {
        sqlx::query_as::<_, Rating>(&format!(
            "SELECT {RATING_COLUMNS} FROM ratings WHERE id = $1 AND recipe_id = $2"
        ))
        .bind(rating_id)
        .bind(recipe_id)
        .fetch_optional(db)
        .await
    }

    pub async fn find_by_user_and_recipe(
        db: &PgPool,
        user_id: Uuid,
        recipe_id: Uuid,
    ) -> Result<Option<Rating>, sqlx::Error> {
        sqlx::query_as::<_, Rating>(&format!(
            "SELECT {RATING_COLUMNS} FROM ratings WHERE user_id = $1 AND recipe_id = $2"
        ))
        .bind(user_id)
        .bind(recipe_id)
        .fetch_optional(db)
        .await
    }

    /// The unique (user_id, recipe_id) key makes a second submission an
    /// update of the first; exactly one row per user and recipe survives.
    pub async fn upsert(
        db: &PgPool,
        recipe_id: Uuid,
        user_id: Uuid,
        score: i32,
        comment: Option<&str>,
    ) -> Result<Rating, sqlx::Error> {
        sqlx::query_as::<_, Rating>(&format!(
            r#"
            INSERT INTO ratings (recipe_id, user_id, score, comment)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, recipe_id) DO UPDATE
                SET score = EXCLUDED.score,
                    comment = EXCLUDED.comment,
                    updated_at = now()
            RETURNING {RATING_COLUMNS}
            "#
        ))
        .bind(recipe_id)
        .bind(user_id)
        .bind(score)
        .bind(comment)
        .fetch_one(db)
        .await
    }

    pub async fn delete(db: &PgPool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM ratings WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn score_counts(
        db: &PgPool,
        recipe_id: Uuid,
    ) -> Result<Vec<(i32, i64)>, sqlx::Error> {
        sqlx::query_as::<_, (i32, i64)>(
            "SELECT score, COUNT(*) FROM ratings WHERE recipe_id = $1 GROUP BY score",
        )
        .bind(recipe_id)
        .fetch_all(db)
        .await
    }
}
