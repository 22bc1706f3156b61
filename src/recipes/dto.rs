use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo::{Recipe, RecipeRow};
use crate::error::ApiError;
use crate::ingredients::dto::{IngredientDto, IngredientInput};
use crate::validate::{is_blank, Violations};

pub const DIFFICULTIES: &[&str] = &["easy", "medium", "hard"];
pub const MAX_NESTED_INGREDIENTS: usize = 50;

/// Create payload. Required fields are optional at the wire level so their
/// absence is reported as a field-level validation error, not a parse error.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateRecipeRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub instructions: Option<String>,
    pub prep_time: Option<i32>,
    pub cook_time: Option<i32>,
    pub servings: Option<i32>,
    pub difficulty: Option<String>,
    pub category_id: Option<Uuid>,
    pub image: Option<String>,
    #[serde(default)]
    pub is_published: bool,
    pub ingredients: Option<Vec<IngredientInput>>,
}

/// Fully validated recipe creation data.
#[derive(Debug)]
pub struct NewRecipe {
    pub title: String,
    pub description: Option<String>,
    pub instructions: String,
    pub prep_time: Option<i32>,
    pub cook_time: Option<i32>,
    pub servings: Option<i32>,
    pub difficulty: Option<String>,
    pub category_id: Uuid,
    pub image: Option<String>,
    pub is_published: bool,
    pub ingredients: Vec<IngredientInput>,
}

impl CreateRecipeRequest {
    pub fn into_validated(self) -> Result<NewRecipe, ApiError> {
        let mut v = Violations::new();

        match self.title.as_deref() {
            None => v.add("title", "title is required"),
            Some(title) if is_blank(title) => v.add("title", "title cannot be empty"),
            Some(title) => check_title(&mut v, title),
        }
        match self.instructions.as_deref() {
            None => v.add("instructions", "instructions is required"),
            Some(text) if is_blank(text) => v.add("instructions", "instructions cannot be empty"),
            Some(text) => check_instructions(&mut v, text),
        }
        if self.category_id.is_none() {
            v.add("category_id", "category_id is required");
        }
        check_optional_fields(
            &mut v,
            self.prep_time,
            self.cook_time,
            self.servings,
            self.difficulty.as_deref(),
            self.image.as_deref(),
        );
        let ingredients = self.ingredients.unwrap_or_default();
        check_ingredients(&mut v, &ingredients);

        v.into_result()?;

        // The checks above guarantee the required fields are present.
        let (Some(title), Some(instructions), Some(category_id)) =
            (self.title, self.instructions, self.category_id)
        else {
            return Err(ApiError::validation("Validation failed"));
        };

        Ok(NewRecipe {
            title,
            description: self.description,
            instructions,
            prep_time: self.prep_time,
            cook_time: self.cook_time,
            servings: self.servings,
            difficulty: self.difficulty,
            category_id,
            image: self.image,
            is_published: self.is_published,
            ingredients,
        })
    }
}

/// Partial update: only present fields are validated and applied; a present
/// `ingredients` list replaces the recipe's associations wholesale.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateRecipeRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub instructions: Option<String>,
    pub prep_time: Option<i32>,
    pub cook_time: Option<i32>,
    pub servings: Option<i32>,
    pub difficulty: Option<String>,
    pub category_id: Option<Uuid>,
    pub image: Option<String>,
    pub is_published: Option<bool>,
    pub ingredients: Option<Vec<IngredientInput>>,
}

impl UpdateRecipeRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        let mut v = Violations::new();
        if let Some(title) = self.title.as_deref() {
            if is_blank(title) {
                v.add("title", "title cannot be empty");
            } else {
                check_title(&mut v, title);
            }
        }
        if let Some(text) = self.instructions.as_deref() {
            if is_blank(text) {
                v.add("instructions", "instructions cannot be empty");
            } else {
                check_instructions(&mut v, text);
            }
        }
        check_optional_fields(
            &mut v,
            self.prep_time,
            self.cook_time,
            self.servings,
            self.difficulty.as_deref(),
            self.image.as_deref(),
        );
        if let Some(ingredients) = &self.ingredients {
            check_ingredients(&mut v, ingredients);
        }
        v.into_result()
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.instructions.is_none()
            && self.prep_time.is_none()
            && self.cook_time.is_none()
            && self.servings.is_none()
            && self.difficulty.is_none()
            && self.category_id.is_none()
            && self.image.is_none()
            && self.is_published.is_none()
            && self.ingredients.is_none()
    }
}

fn check_title(v: &mut Violations, title: &str) {
    if title.trim().len() < 3 {
        v.add("title", "title must be at least 3 characters long");
    }
    if title.len() > 200 {
        v.add("title", "title must not exceed 200 characters");
    }
}

fn check_instructions(v: &mut Violations, text: &str) {
    if text.trim().len() < 10 {
        v.add("instructions", "instructions must be at least 10 characters long");
    }
}

fn check_optional_fields(
    v: &mut Violations,
    prep_time: Option<i32>,
    cook_time: Option<i32>,
    servings: Option<i32>,
    difficulty: Option<&str>,
    image: Option<&str>,
) {
    if let Some(prep_time) = prep_time {
        if prep_time < 0 {
            v.add("prep_time", "prep_time must not be negative");
        }
    }
    if let Some(cook_time) = cook_time {
        if cook_time < 0 {
            v.add("cook_time", "cook_time must not be negative");
        }
    }
    if let Some(servings) = servings {
        if servings < 1 {
            v.add("servings", "servings must be at least 1");
        }
    }
    if let Some(difficulty) = difficulty {
        if !DIFFICULTIES.contains(&difficulty) {
            v.add("difficulty", "difficulty must be one of: easy, medium, hard");
        }
    }
    if let Some(image) = image {
        if image.len() > 255 {
            v.add("image", "image must not exceed 255 characters");
        }
    }
}

fn check_ingredients(v: &mut Violations, ingredients: &[IngredientInput]) {
    if ingredients.len() > MAX_NESTED_INGREDIENTS {
        v.add("ingredients", "a recipe cannot list more than 50 ingredients");
    }
    for (index, ingredient) in ingredients.iter().enumerate() {
        ingredient.collect_violations(v, &format!("ingredients[{index}]."));
    }
}

/// List/query filters; all optional. Unpublished recipes stay hidden
/// unless explicitly requested.
#[derive(Debug, Default, Deserialize)]
pub struct RecipeFilters {
    pub category_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub search: Option<String>,
    pub difficulty: Option<String>,
    pub ingredient: Option<String>,
    pub is_published: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct RecipeDto {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub prep_time: Option<i32>,
    pub cook_time: Option<i32>,
    pub total_time: Option<i32>,
    pub servings: Option<i32>,
    pub difficulty: Option<String>,
    pub image: Option<String>,
    pub is_published: bool,
    pub user_id: Uuid,
    pub category_id: Uuid,
    pub average_rating: Option<f64>,
    pub rating_count: i64,
    pub ingredient_count: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl RecipeDto {
    pub fn from_recipe(
        recipe: &Recipe,
        average_rating: Option<f64>,
        rating_count: i64,
        ingredient_count: i64,
    ) -> Self {
        Self {
            id: recipe.id,
            title: recipe.title.clone(),
            slug: recipe.slug.clone(),
            description: recipe.description.clone(),
            prep_time: recipe.prep_time,
            cook_time: recipe.cook_time,
            total_time: total_time(recipe.prep_time, recipe.cook_time),
            servings: recipe.servings,
            difficulty: recipe.difficulty.clone(),
            image: recipe.image.clone(),
            is_published: recipe.is_published,
            user_id: recipe.user_id,
            category_id: recipe.category_id,
            average_rating,
            rating_count,
            ingredient_count,
            created_at: recipe.created_at,
            updated_at: recipe.updated_at,
        }
    }

    pub fn from_row(row: &RecipeRow) -> Self {
        Self::from_recipe(
            &row.recipe,
            row.average_rating,
            row.rating_count,
            row.ingredient_count,
        )
    }
}

#[derive(Debug, Serialize)]
pub struct RecipeDetailDto {
    #[serde(flatten)]
    pub summary: RecipeDto,
    pub instructions: String,
    pub ingredients: Vec<IngredientDto>,
}

impl RecipeDetailDto {
    pub fn from_row(row: &RecipeRow, ingredients: Vec<IngredientDto>) -> Self {
        Self {
            summary: RecipeDto::from_row(row),
            instructions: row.recipe.instructions.clone(),
            ingredients,
        }
    }
}

fn total_time(prep: Option<i32>, cook: Option<i32>) -> Option<i32> {
    match (prep, cook) {
        (Some(p), Some(c)) => Some(p + c),
        (Some(p), None) => Some(p),
        (None, Some(c)) => Some(c),
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_create() -> CreateRecipeRequest {
        CreateRecipeRequest {
            title: Some("Chocolate Cake".into()),
            description: None,
            instructions: Some("Mix everything and bake for 40 minutes.".into()),
            prep_time: Some(15),
            cook_time: Some(40),
            servings: Some(8),
            difficulty: Some("easy".into()),
            category_id: Some(Uuid::new_v4()),
            image: None,
            is_published: false,
            ingredients: None,
        }
    }

    #[test]
    fn valid_create_converts() {
        let new = valid_create().into_validated().expect("valid payload");
        assert_eq!(new.title, "Chocolate Cake");
        assert!(new.ingredients.is_empty());
    }

    #[test]
    fn missing_title_lists_exactly_that_field() {
        let mut req = valid_create();
        req.title = None;
        let err = req.into_validated().unwrap_err();
        match err {
            ApiError::Validation { fields, .. } => {
                assert_eq!(fields.keys().collect::<Vec<_>>(), vec!["title"]);
                assert_eq!(fields["title"], vec!["title is required".to_string()]);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn negative_times_are_rejected() {
        let mut req = valid_create();
        req.prep_time = Some(-5);
        req.cook_time = Some(-1);
        let err = req.into_validated().unwrap_err();
        match err {
            ApiError::Validation { fields, .. } => {
                assert!(fields.contains_key("prep_time"));
                assert!(fields.contains_key("cook_time"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn unknown_difficulty_is_rejected() {
        let mut req = valid_create();
        req.difficulty = Some("impossible".into());
        assert!(req.into_validated().is_err());
    }

    #[test]
    fn nested_ingredient_errors_carry_their_index() {
        let mut req = valid_create();
        req.ingredients = Some(vec![
            IngredientInput {
                name: "flour".into(),
                quantity: "200 g".into(),
                unit: None,
                notes: None,
                position: 0,
            },
            IngredientInput {
                name: "".into(),
                quantity: "1".into(),
                unit: None,
                notes: None,
                position: 1,
            },
        ]);
        let err = req.into_validated().unwrap_err();
        match err {
            ApiError::Validation { fields, .. } => {
                assert!(fields.contains_key("ingredients[1].name"));
                assert!(!fields.contains_key("ingredients[0].name"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn update_validates_only_present_fields() {
        let req = UpdateRecipeRequest {
            title: None,
            description: Some("new description".into()),
            instructions: None,
            prep_time: None,
            cook_time: None,
            servings: None,
            difficulty: None,
            category_id: None,
            image: None,
            is_published: Some(true),
            ingredients: None,
        };
        assert!(req.validate().is_ok());
        assert!(!req.is_empty());
    }

    #[test]
    fn update_rejects_blank_title() {
        let req = UpdateRecipeRequest {
            title: Some("  ".into()),
            description: None,
            instructions: None,
            prep_time: None,
            cook_time: None,
            servings: None,
            difficulty: None,
            category_id: None,
            image: None,
            is_published: None,
            ingredients: None,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn unknown_fields_are_rejected_at_deserialization() {
        let raw = serde_json::json!({
            "title": "Cake",
            "instructions": "Mix everything and bake.",
            "category_id": Uuid::new_v4(),
            "owner": "someone-else"
        });
        let parsed: Result<CreateRecipeRequest, _> = serde_json::from_value(raw);
        assert!(parsed.is_err());
    }

    #[test]
    fn total_time_sums_what_is_present() {
        assert_eq!(total_time(Some(10), Some(20)), Some(30));
        assert_eq!(total_time(Some(10), None), Some(10));
        assert_eq!(total_time(None, Some(20)), Some(20));
        assert_eq!(total_time(None, None), None);
    }
}
