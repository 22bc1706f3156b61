use axum::{
    extract::{Path, Query, State},
    routing::get,
    Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{
        CreateRecipeRequest, RecipeDetailDto, RecipeDto, RecipeFilters, UpdateRecipeRequest,
        DIFFICULTIES,
    },
    repo::Recipe,
};
use crate::{
    auth::{
        extractors::{AuthUser, MaybeAuthUser},
        policy::{ensure_can_modify, load_actor},
    },
    categories::repo::Category,
    error::ApiError,
    ingredients::{dto::IngredientDto, repo::Ingredient},
    pagination::{PageQuery, Paginated},
    response::{created, ok, ApiResult},
    state::AppState,
    validate::ValidJson,
};

pub fn recipe_routes() -> Router<AppState> {
    Router::new()
        .route("/recipes", get(list_recipes).post(create_recipe))
        .route(
            "/recipes/:id",
            get(get_recipe).put(update_recipe).delete(delete_recipe),
        )
}

#[instrument(skip(state))]
pub async fn list_recipes(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
    Query(mut filters): Query<RecipeFilters>,
) -> ApiResult<Paginated<RecipeDto>> {
    let page = page.clamped();
    // An unknown difficulty can never match; drop it like any other
    // unusable filter instead of erroring.
    if let Some(difficulty) = filters.difficulty.as_deref() {
        if !DIFFICULTIES.contains(&difficulty) {
            filters.difficulty = None;
        }
    }

    let rows = Recipe::list(&state.db, &filters, page.limit(), page.offset()).await?;
    let total = Recipe::count(&state.db, &filters).await?;
    let items = rows.iter().map(RecipeDto::from_row).collect();
    Ok(ok(Paginated::new(items, &page, total)))
}

#[instrument(skip(state))]
pub async fn get_recipe(
    State(state): State<AppState>,
    MaybeAuthUser(viewer): MaybeAuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<RecipeDetailDto> {
    let row = Recipe::find_detail(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Recipe not found"))?;

    if !row.recipe.is_published {
        let authorized = match viewer {
            Some(user_id) => {
                let actor = load_actor(&state.db, user_id).await?;
                actor.can_modify(row.recipe.user_id)
            }
            None => false,
        };
        if !authorized {
            warn!(recipe_id = %id, "unpublished recipe requested");
            return Err(ApiError::forbidden("This recipe is not published"));
        }
    }

    let ingredients = Ingredient::list_for_recipe(&state.db, id)
        .await?
        .into_iter()
        .map(IngredientDto::from)
        .collect();
    Ok(ok(RecipeDetailDto::from_row(&row, ingredients)))
}

#[instrument(skip(state, payload))]
pub async fn create_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ValidJson(payload): ValidJson<CreateRecipeRequest>,
) -> ApiResult<RecipeDto> {
    let new = payload.into_validated()?;

    Category::find_by_id(&state.db, new.category_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Category not found"))?;

    let ingredient_count = new.ingredients.len() as i64;
    let recipe = Recipe::create(&state.db, user_id, &new).await?;

    info!(recipe_id = %recipe.id, user_id = %user_id, "recipe created");
    Ok(created(RecipeDto::from_recipe(
        &recipe,
        None,
        0,
        ingredient_count,
    )))
}

#[instrument(skip(state, payload))]
pub async fn update_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    ValidJson(payload): ValidJson<UpdateRecipeRequest>,
) -> ApiResult<RecipeDto> {
    let recipe = Recipe::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Recipe not found"))?;

    let actor = load_actor(&state.db, user_id).await?;
    ensure_can_modify(&actor, recipe.user_id, "recipe")?;

    payload.validate()?;
    if payload.is_empty() {
        return Err(ApiError::validation("No fields to update"));
    }

    if let Some(category_id) = payload.category_id {
        Category::find_by_id(&state.db, category_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Category not found"))?;
    }

    Recipe::update(&state.db, &recipe, &payload).await?;

    // Re-read with aggregates so the response reflects a replaced
    // ingredient list.
    let row = Recipe::find_detail(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Recipe not found"))?;

    info!(recipe_id = %id, user_id = %user_id, "recipe updated");
    Ok(ok(RecipeDto::from_row(&row)))
}

#[instrument(skip(state))]
pub async fn delete_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    let recipe = Recipe::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Recipe not found"))?;

    let actor = load_actor(&state.db, user_id).await?;
    ensure_can_modify(&actor, recipe.user_id, "recipe")?;

    Recipe::delete(&state.db, id).await?;
    info!(recipe_id = %id, user_id = %user_id, "recipe deleted");
    Ok(ok(()))
}
