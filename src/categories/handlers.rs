use axum::{
    extract::{Path, Query, State},
    routing::get,
    Router,
};
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    dto::{CategoryDto, CreateCategoryRequest, UpdateCategoryRequest},
    repo::Category,
};
use crate::{
    auth::{
        extractors::AuthUser,
        policy::{ensure_admin, load_actor},
    },
    error::ApiError,
    pagination::{PageQuery, Paginated},
    response::{created, ok, ApiResult},
    state::AppState,
    validate::{slugify, ValidJson},
};

pub fn category_routes() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list_categories).post(create_category))
        .route(
            "/categories/:id",
            get(get_category).put(update_category).delete(delete_category),
        )
}

#[derive(Debug, Deserialize)]
pub struct CategoryFilter {
    pub search: Option<String>,
}

#[instrument(skip(state))]
pub async fn list_categories(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
    Query(filter): Query<CategoryFilter>,
) -> ApiResult<Paginated<CategoryDto>> {
    let page = page.clamped();
    let search = filter.search.as_deref();
    let categories = Category::list(&state.db, search, page.limit(), page.offset()).await?;
    let total = Category::count(&state.db, search).await?;
    let items = categories
        .iter()
        .map(|c| CategoryDto::from_category(c, None))
        .collect();
    Ok(ok(Paginated::new(items, &page, total)))
}

#[instrument(skip(state))]
pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<CategoryDto> {
    let category = Category::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Category not found"))?;
    let recipe_count = Category::recipe_count(&state.db, id).await?;
    Ok(ok(CategoryDto::from_category(&category, Some(recipe_count))))
}

#[instrument(skip(state, payload))]
pub async fn create_category(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ValidJson(payload): ValidJson<CreateCategoryRequest>,
) -> ApiResult<CategoryDto> {
    let actor = load_actor(&state.db, user_id).await?;
    ensure_admin(&actor)?;

    payload.validate()?;

    if Category::name_taken(&state.db, &payload.name, None).await? {
        return Err(ApiError::conflict("Category with this name already exists"));
    }

    let slug = slugify(&payload.name);
    let category = Category::create(
        &state.db,
        &payload.name,
        &slug,
        payload.description.as_deref(),
        payload.image.as_deref(),
    )
    .await?;

    info!(category_id = %category.id, name = %category.name, "category created");
    Ok(created(CategoryDto::from_category(&category, Some(0))))
}

#[instrument(skip(state, payload))]
pub async fn update_category(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    ValidJson(payload): ValidJson<UpdateCategoryRequest>,
) -> ApiResult<CategoryDto> {
    let actor = load_actor(&state.db, user_id).await?;
    ensure_admin(&actor)?;

    Category::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Category not found"))?;

    payload.validate()?;

    if let Some(name) = &payload.name {
        if Category::name_taken(&state.db, name, Some(id)).await? {
            return Err(ApiError::conflict(
                "Another category with this name already exists",
            ));
        }
    }

    let slug = payload.name.as_deref().map(slugify);
    let category = Category::update(
        &state.db,
        id,
        payload.name.as_deref(),
        slug.as_deref(),
        payload.description.as_deref(),
        payload.image.as_deref(),
    )
    .await?;

    info!(category_id = %category.id, "category updated");
    let recipe_count = Category::recipe_count(&state.db, id).await?;
    Ok(ok(CategoryDto::from_category(&category, Some(recipe_count))))
}

/// Deletion conflicts while recipes still reference the category; the
/// FK RESTRICT in the schema backs this check against races.
#[instrument(skip(state))]
pub async fn delete_category(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    let actor = load_actor(&state.db, user_id).await?;
    ensure_admin(&actor)?;

    Category::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Category not found"))?;

    let recipe_count = Category::recipe_count(&state.db, id).await?;
    if recipe_count > 0 {
        return Err(ApiError::conflict(format!(
            "Cannot delete category with {recipe_count} recipe(s). Reassign or delete the recipes first"
        )));
    }

    Category::delete(&state.db, id).await?;
    info!(category_id = %id, "category deleted");
    Ok(ok(()))
}
