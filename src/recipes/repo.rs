use sqlx::{FromRow, PgPool, Postgres, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

use super::dto::{NewRecipe, RecipeFilters, UpdateRecipeRequest};
use crate::ingredients::repo::Ingredient;
use crate::validate::slugify;

#[derive(Debug, Clone, FromRow)]
pub struct Recipe {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub instructions: String,
    pub prep_time: Option<i32>,
    pub cook_time: Option<i32>,
    pub servings: Option<i32>,
    pub difficulty: Option<String>,
    pub image: Option<String>,
    pub is_published: bool,
    pub user_id: Uuid,
    pub category_id: Uuid,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Recipe plus the aggregates every read endpoint reports.
#[derive(Debug, Clone, FromRow)]
pub struct RecipeRow {
    #[sqlx(flatten)]
    pub recipe: Recipe,
    pub average_rating: Option<f64>,
    pub rating_count: i64,
    pub ingredient_count: i64,
}

const RECIPE_COLUMNS: &str = "id, title, slug, description, instructions, prep_time, cook_time, \
     servings, difficulty, image, is_published, user_id, category_id, created_at, updated_at";

const RECIPE_R_COLUMNS: &str =
    "r.id, r.title, r.slug, r.description, r.instructions, r.prep_time, r.cook_time, \
     r.servings, r.difficulty, r.image, r.is_published, r.user_id, r.category_id, \
     r.created_at, r.updated_at";

const STAT_COLUMNS: &str = "(SELECT ROUND(AVG(ra.score)::numeric, 2)::float8 \
        FROM ratings ra WHERE ra.recipe_id = r.id) AS average_rating, \
     (SELECT COUNT(*) FROM ratings ra WHERE ra.recipe_id = r.id) AS rating_count, \
     (SELECT COUNT(*) FROM ingredients i WHERE i.recipe_id = r.id) AS ingredient_count";

const LIST_FILTER: &str = "($1::uuid IS NULL OR r.category_id = $1) \
     AND ($2::uuid IS NULL OR r.user_id = $2) \
     AND ($3::text IS NULL OR r.title ILIKE '%' || $3 || '%') \
     AND ($4::text IS NULL OR r.difficulty = $4) \
     AND r.is_published = COALESCE($5, TRUE) \
     AND ($6::text IS NULL OR EXISTS (SELECT 1 FROM ingredients i \
          WHERE i.recipe_id = r.id AND i.name ILIKE '%' || $6 || '%'))";

impl Recipe {
    pub async fn list(
        db: &PgPool,
        filters: &RecipeFilters,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<RecipeRow>, sqlx::Error> {
        sqlx::query_as::<_, RecipeRow>(&format!(
            r#"
            SELECT {RECIPE_R_COLUMNS}, {STAT_COLUMNS}
            FROM recipes r
            WHERE {LIST_FILTER}
            ORDER BY r.created_at DESC
            LIMIT $7 OFFSET $8
            "#
        ))
        .bind(filters.category_id)
        .bind(filters.user_id)
        .bind(filters.search.as_deref())
        .bind(filters.difficulty.as_deref())
        .bind(filters.is_published)
        .bind(filters.ingredient.as_deref())
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await
    }

    pub async fn count(db: &PgPool, filters: &RecipeFilters) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as(&format!(
            "SELECT COUNT(*) FROM recipes r WHERE {LIST_FILTER}"
        ))
        .bind(filters.category_id)
        .bind(filters.user_id)
        .bind(filters.search.as_deref())
        .bind(filters.difficulty.as_deref())
        .bind(filters.is_published)
        .bind(filters.ingredient.as_deref())
        .fetch_one(db)
        .await?;
        Ok(count)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> Result<Option<Recipe>, sqlx::Error> {
        sqlx::query_as::<_, Recipe>(&format!(
            "SELECT {RECIPE_COLUMNS} FROM recipes WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await
    }

    pub async fn find_detail(db: &PgPool, id: Uuid) -> Result<Option<RecipeRow>, sqlx::Error> {
        sqlx::query_as::<_, RecipeRow>(&format!(
            "SELECT {RECIPE_R_COLUMNS}, {STAT_COLUMNS} FROM recipes r WHERE r.id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await
    }

    /// Insert the recipe and its ingredient lines in one transaction; a
    /// failure on any line rolls everything back.
    pub async fn create(
        db: &PgPool,
        user_id: Uuid,
        new: &NewRecipe,
    ) -> Result<Recipe, sqlx::Error> {
        let mut tx = db.begin().await?;

        let slug = unique_slug(&mut tx, &slugify(&new.title), None).await?;
        let recipe = sqlx::query_as::<_, Recipe>(&format!(
            r#"
            INSERT INTO recipes (title, slug, description, instructions, prep_time, cook_time,
                                 servings, difficulty, image, is_published, user_id, category_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {RECIPE_COLUMNS}
            "#
        ))
        .bind(&new.title)
        .bind(&slug)
        .bind(new.description.as_deref())
        .bind(&new.instructions)
        .bind(new.prep_time)
        .bind(new.cook_time)
        .bind(new.servings)
        .bind(new.difficulty.as_deref())
        .bind(new.image.as_deref())
        .bind(new.is_published)
        .bind(user_id)
        .bind(new.category_id)
        .fetch_one(&mut *tx)
        .await?;

        Ingredient::insert_many(&mut tx, recipe.id, &new.ingredients).await?;

        tx.commit().await?;
        Ok(recipe)
    }

    /// Partial update. A present ingredient list replaces the existing
    /// associations; both writes share the update's transaction.
    pub async fn update(
        db: &PgPool,
        existing: &Recipe,
        changes: &UpdateRecipeRequest,
    ) -> Result<Recipe, sqlx::Error> {
        let mut tx = db.begin().await?;

        let slug = match changes.title.as_deref() {
            Some(title) if title != existing.title => {
                Some(unique_slug(&mut tx, &slugify(title), Some(existing.id)).await?)
            }
            _ => None,
        };

        let recipe = sqlx::query_as::<_, Recipe>(&format!(
            r#"
            UPDATE recipes SET
                title = COALESCE($2, title),
                slug = COALESCE($3, slug),
                description = COALESCE($4, description),
                instructions = COALESCE($5, instructions),
                prep_time = COALESCE($6, prep_time),
                cook_time = COALESCE($7, cook_time),
                servings = COALESCE($8, servings),
                difficulty = COALESCE($9, difficulty),
                image = COALESCE($10, image),
                is_published = COALESCE($11, is_published),
                category_id = COALESCE($12, category_id),
                updated_at = now()
            WHERE id = $1
            RETURNING {RECIPE_COLUMNS}
            "#
        ))
        .bind(existing.id)
        .bind(changes.title.as_deref())
        .bind(slug.as_deref())
        .bind(changes.description.as_deref())
        .bind(changes.instructions.as_deref())
        .bind(changes.prep_time)
        .bind(changes.cook_time)
        .bind(changes.servings)
        .bind(changes.difficulty.as_deref())
        .bind(changes.image.as_deref())
        .bind(changes.is_published)
        .bind(changes.category_id)
        .fetch_one(&mut *tx)
        .await?;

        if let Some(ingredients) = &changes.ingredients {
            Ingredient::delete_for_recipe(&mut tx, existing.id).await?;
            Ingredient::insert_many(&mut tx, existing.id, ingredients).await?;
        }

        tx.commit().await?;
        Ok(recipe)
    }

    pub async fn delete(db: &PgPool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM recipes WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(result.rows_affected())
    }
}

/// Append a counter until the slug is free, mirroring how the slug column's
/// unique index resolves human-readable collisions ("cake", "cake-1", ...).
async fn unique_slug(
    tx: &mut Transaction<'_, Postgres>,
    base: &str,
    exclude: Option<Uuid>,
) -> Result<String, sqlx::Error> {
    let base = if base.is_empty() { "recipe" } else { base };
    let mut slug = base.to_string();
    let mut counter = 1;
    loop {
        let (taken,): (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM recipes WHERE slug = $1 AND ($2::uuid IS NULL OR id <> $2))",
        )
        .bind(&slug)
        .bind(exclude)
        .fetch_one(&mut **tx)
        .await?;
        if !taken {
            return Ok(slug);
        }
        slug = format!("{base}-{counter}");
        counter += 1;
    }
}
