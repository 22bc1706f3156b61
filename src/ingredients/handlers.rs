use axum::{
    extract::{Path, State},
    routing::get,
    Router,
};
use sqlx::PgPool;
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    dto::{IngredientDto, IngredientInput, UpdateIngredientRequest},
    repo::Ingredient,
};
use crate::{
    auth::{
        extractors::AuthUser,
        policy::{ensure_can_modify, load_actor},
    },
    error::ApiError,
    recipes::repo::Recipe,
    response::{created, ok, ApiResult},
    state::AppState,
    validate::ValidJson,
};

pub fn ingredient_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/recipes/:id/ingredients",
            get(list_ingredients).post(create_ingredient),
        )
        .route(
            "/recipes/:id/ingredients/:ingredient_id",
            get(get_ingredient)
                .put(update_ingredient)
                .delete(delete_ingredient),
        )
}

async fn recipe_or_404(db: &PgPool, recipe_id: Uuid) -> Result<Recipe, ApiError> {
    Recipe::find_by_id(db, recipe_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Recipe not found"))
}

#[instrument(skip(state))]
pub async fn list_ingredients(
    State(state): State<AppState>,
    Path(recipe_id): Path<Uuid>,
) -> ApiResult<Vec<IngredientDto>> {
    recipe_or_404(&state.db, recipe_id).await?;
    let ingredients = Ingredient::list_for_recipe(&state.db, recipe_id).await?;
    Ok(ok(ingredients.into_iter().map(IngredientDto::from).collect()))
}

#[instrument(skip(state))]
pub async fn get_ingredient(
    State(state): State<AppState>,
    Path((recipe_id, ingredient_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<IngredientDto> {
    recipe_or_404(&state.db, recipe_id).await?;
    let ingredient = Ingredient::find_by_id(&state.db, recipe_id, ingredient_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Ingredient not found"))?;
    Ok(ok(ingredient.into()))
}

#[instrument(skip(state, payload))]
pub async fn create_ingredient(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(recipe_id): Path<Uuid>,
    ValidJson(payload): ValidJson<IngredientInput>,
) -> ApiResult<IngredientDto> {
    let recipe = recipe_or_404(&state.db, recipe_id).await?;
    let actor = load_actor(&state.db, user_id).await?;
    ensure_can_modify(&actor, recipe.user_id, "recipe")?;

    payload.validate()?;

    let ingredient = Ingredient::create(&state.db, recipe_id, &payload).await?;
    info!(recipe_id = %recipe_id, ingredient_id = %ingredient.id, "ingredient added");
    Ok(created(ingredient.into()))
}

#[instrument(skip(state, payload))]
pub async fn update_ingredient(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path((recipe_id, ingredient_id)): Path<(Uuid, Uuid)>,
    ValidJson(payload): ValidJson<UpdateIngredientRequest>,
) -> ApiResult<IngredientDto> {
    let recipe = recipe_or_404(&state.db, recipe_id).await?;
    let actor = load_actor(&state.db, user_id).await?;
    ensure_can_modify(&actor, recipe.user_id, "recipe")?;

    Ingredient::find_by_id(&state.db, recipe_id, ingredient_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Ingredient not found"))?;

    payload.validate()?;

    let ingredient = Ingredient::update(
        &state.db,
        ingredient_id,
        payload.name.as_deref(),
        payload.quantity.as_deref(),
        payload.unit.as_deref(),
        payload.notes.as_deref(),
        payload.position,
    )
    .await?;
    info!(recipe_id = %recipe_id, ingredient_id = %ingredient_id, "ingredient updated");
    Ok(ok(ingredient.into()))
}

#[instrument(skip(state))]
pub async fn delete_ingredient(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path((recipe_id, ingredient_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<()> {
    let recipe = recipe_or_404(&state.db, recipe_id).await?;
    let actor = load_actor(&state.db, user_id).await?;
    ensure_can_modify(&actor, recipe.user_id, "recipe")?;

    Ingredient::find_by_id(&state.db, recipe_id, ingredient_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Ingredient not found"))?;

    Ingredient::delete(&state.db, ingredient_id).await?;
    info!(recipe_id = %recipe_id, ingredient_id = %ingredient_id, "ingredient removed");
    Ok(ok(()))
}
