use sqlx::{FromRow, PgPool, Postgres, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

use super::dto::IngredientInput;

#[derive(Debug, Clone, FromRow)]
pub struct Ingredient {
    pub id: Uuid,
    pub recipe_id: Uuid,
    pub name: String,
    pub quantity: String,
    pub unit: Option<String>,
    pub notes: Option<String>,
    pub position: i32,
    pub created_at: OffsetDateTime,
}

const INGREDIENT_COLUMNS: &str = "id, recipe_id, name, quantity, unit, notes, position, created_at";

impl Ingredient {
    pub async fn list_for_recipe(
        db: &PgPool,
        recipe_id: Uuid,
    ) -> Result<Vec<Ingredient>, sqlx::Error> {
        sqlx::query_as::<_, Ingredient>(&format!(
            r#"
            SELECT {INGREDIENT_COLUMNS}
            FROM ingredients
            WHERE recipe_id = $1
            ORDER BY position ASC, created_at ASC
            "#
        ))
        .bind(recipe_id)
        .fetch_all(db)
        .await
    }

    pub async fn find_by_id(
        db: &PgPool,
        recipe_id: Uuid,
        ingredient_id: Uuid,
    ) -> Result<Option<Ingredient>, sqlx::Error> {
        sqlx::query_as::<_, Ingredient>(&format!(
            "SELECT {INGREDIENT_COLUMNS} FROM ingredients WHERE id = $1 AND recipe_id = $2"
        ))
        .bind(ingredient_id)
        .bind(recipe_id)
        .fetch_optional(db)
        .await
    }

    pub async fn create(
        db: &PgPool,
        recipe_id: Uuid,
        input: &IngredientInput,
    ) -> Result<Ingredient, sqlx::Error> {
        sqlx::query_as::<_, Ingredient>(&format!(
            r#"
            INSERT INTO ingredients (recipe_id, name, quantity, unit, notes, position)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {INGREDIENT_COLUMNS}
            "#
        ))
        .bind(recipe_id)
        .bind(&input.name)
        .bind(&input.quantity)
        .bind(input.unit.as_deref())
        .bind(input.notes.as_deref())
        .bind(input.position)
        .fetch_one(db)
        .await
    }

    /// Partial update; absent fields keep their stored value.
    pub async fn update(
        db: &PgPool,
        id: Uuid,
        name: Option<&str>,
        quantity: Option<&str>,
        unit: Option<&str>,
        notes: Option<&str>,
        position: Option<i32>,
    ) -> Result<Ingredient, sqlx::Error> {
        sqlx::query_as::<_, Ingredient>(&format!(
            r#"
            UPDATE ingredients SET
                name = COALESCE($2, name),
                quantity = COALESCE($3, quantity),
                unit = COALESCE($4, unit),
                notes = COALESCE($5, notes),
                position = COALESCE($6, position)
            WHERE id = $1
            RETURNING {INGREDIENT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(name)
        .bind(quantity)
        .bind(unit)
        .bind(notes)
        .bind(position)
        .fetch_one(db)
        .await
    }

    pub async fn delete(db: &PgPool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM ingredients WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(result.rows_affected())
    }

    /// Bulk insert inside a recipe's transaction so a nested-create either
    /// commits all associations or none of them.
    pub async fn insert_many(
        tx: &mut Transaction<'_, Postgres>,
        recipe_id: Uuid,
        items: &[IngredientInput],
    ) -> Result<(), sqlx::Error> {
        for item in items {
            sqlx::query(
                r#"
                INSERT INTO ingredients (recipe_id, name, quantity, unit, notes, position)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(recipe_id)
            .bind(&item.name)
            .bind(&item.quantity)
            .bind(item.unit.as_deref())
            .bind(item.notes.as_deref())
            .bind(item.position)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }

    pub async fn delete_for_recipe(
        tx: &mut Transaction<'_, Postgres>,
        recipe_id: Uuid,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM ingredients WHERE recipe_id = $1")
            .bind(recipe_id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }
}
