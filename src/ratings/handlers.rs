use axum::{
    extract::{Path, Query, State},
    routing::get,
    Router,
};
use sqlx::PgPool;
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    dto::{RatingDto, RatingStatsDto, UpsertRatingRequest},
    repo::Rating,
};
use crate::{
    auth::{
        extractors::AuthUser,
        policy::{ensure_can_modify, load_actor},
    },
    error::ApiError,
    pagination::{PageQuery, Paginated},
    recipes::repo::Recipe,
    response::{created, ok, ApiResult},
    state::AppState,
    validate::ValidJson,
};

pub fn rating_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/recipes/:id/ratings",
            get(list_ratings).post(upsert_rating),
        )
        .route("/recipes/:id/ratings/stats", get(rating_stats))
        .route(
            "/recipes/:id/ratings/:rating_id",
            get(get_rating).delete(delete_rating),
        )
}

async fn recipe_or_404(db: &PgPool, recipe_id: Uuid) -> Result<Recipe, ApiError> {
    Recipe::find_by_id(db, recipe_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Recipe not found"))
}

#[instrument(skip(state))]
pub async fn list_ratings(
    State(state): State<AppState>,
    Path(recipe_id): Path<Uuid>,
    Query(page): Query<PageQuery>,
) -> ApiResult<Paginated<RatingDto>> {
    recipe_or_404(&state.db, recipe_id).await?;
    let page = page.clamped();
    let ratings = Rating::list_for_recipe(&state.db, recipe_id, page.limit(), page.offset()).await?;
    let total = Rating::count_for_recipe(&state.db, recipe_id).await?;
    let items = ratings.into_iter().map(RatingDto::from).collect();
    Ok(ok(Paginated::new(items, &page, total)))
}

#[instrument(skip(state))]
pub async fn get_rating(
    State(state): State<AppState>,
    Path((recipe_id, rating_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<RatingDto> {
    recipe_or_404(&state.db, recipe_id).await?;
    let rating = Rating::find_by_id(&state.db, recipe_id, rating_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Rating not found"))?;
    Ok(ok(rating.into()))
}

#[instrument(skip(state))]
pub async fn rating_stats(
    State(state): State<AppState>,
    Path(recipe_id): Path<Uuid>,
) -> ApiResult<RatingStatsDto> {
    recipe_or_404(&state.db, recipe_id).await?;
    let counts = Rating::score_counts(&state.db, recipe_id).await?;
    Ok(ok(RatingStatsDto::from_counts(recipe_id, &counts)))
}

/// One rating per user and recipe: a repeat submission updates the
/// earlier score and comment instead of adding a row.
#[instrument(skip(state, payload))]
pub async fn upsert_rating(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(recipe_id): Path<Uuid>,
    ValidJson(payload): ValidJson<UpsertRatingRequest>,
) -> ApiResult<RatingDto> {
    recipe_or_404(&state.db, recipe_id).await?;
    let new = payload.into_validated()?;

    let existed = Rating::find_by_user_and_recipe(&state.db, user_id, recipe_id)
        .await?
        .is_some();
    let rating =
        Rating::upsert(&state.db, recipe_id, user_id, new.score, new.comment.as_deref()).await?;

    info!(recipe_id = %recipe_id, user_id = %user_id, score = new.score, existed, "rating upserted");
    if existed {
        Ok(ok(rating.into()))
    } else {
        Ok(created(rating.into()))
    }
}

#[instrument(skip(state))]
pub async fn delete_rating(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path((recipe_id, rating_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<()> {
    recipe_or_404(&state.db, recipe_id).await?;
    let rating = Rating::find_by_id(&state.db, recipe_id, rating_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Rating not found"))?;

    let actor = load_actor(&state.db, user_id).await?;
    ensure_can_modify(&actor, rating.user_id, "rating")?;

    Rating::delete(&state.db, rating_id).await?;
    info!(recipe_id = %recipe_id, rating_id = %rating_id, "rating deleted");
    Ok(ok(()))
}
