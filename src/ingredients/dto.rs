use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo::Ingredient;
use crate::error::ApiError;
use crate::validate::{is_blank, Violations};

/// One ingredient line, either standalone or nested in a recipe payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IngredientInput {
    pub name: String,
    pub quantity: String,
    pub unit: Option<String>,
    pub notes: Option<String>,
    #[serde(default)]
    pub position: i32,
}

impl IngredientInput {
    /// Collects violations under `prefix` so nested payloads can report
    /// field paths like `ingredients[2].name`.
    pub fn collect_violations(&self, v: &mut Violations, prefix: &str) {
        if is_blank(&self.name) {
            v.add(&format!("{prefix}name"), "name is required");
        } else if self.name.len() > 100 {
            v.add(&format!("{prefix}name"), "name must not exceed 100 characters");
        }
        if is_blank(&self.quantity) {
            v.add(&format!("{prefix}quantity"), "quantity is required");
        } else if self.quantity.len() > 50 {
            v.add(
                &format!("{prefix}quantity"),
                "quantity must not exceed 50 characters",
            );
        }
        if let Some(unit) = &self.unit {
            if unit.len() > 20 {
                v.add(&format!("{prefix}unit"), "unit must not exceed 20 characters");
            }
        }
        if self.position < 0 {
            v.add(&format!("{prefix}position"), "position must not be negative");
        }
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        let mut v = Violations::new();
        self.collect_violations(&mut v, "");
        v.into_result()
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateIngredientRequest {
    pub name: Option<String>,
    pub quantity: Option<String>,
    pub unit: Option<String>,
    pub notes: Option<String>,
    pub position: Option<i32>,
}

impl UpdateIngredientRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        let mut v = Violations::new();
        if let Some(name) = &self.name {
            if is_blank(name) {
                v.add("name", "name cannot be empty");
            } else if name.len() > 100 {
                v.add("name", "name must not exceed 100 characters");
            }
        }
        if let Some(quantity) = &self.quantity {
            if is_blank(quantity) {
                v.add("quantity", "quantity cannot be empty");
            } else if quantity.len() > 50 {
                v.add("quantity", "quantity must not exceed 50 characters");
            }
        }
        if let Some(unit) = &self.unit {
            if unit.len() > 20 {
                v.add("unit", "unit must not exceed 20 characters");
            }
        }
        if let Some(position) = self.position {
            if position < 0 {
                v.add("position", "position must not be negative");
            }
        }
        v.into_result()
    }
}

#[derive(Debug, Serialize)]
pub struct IngredientDto {
    pub id: Uuid,
    pub recipe_id: Uuid,
    pub name: String,
    pub quantity: String,
    pub unit: Option<String>,
    pub notes: Option<String>,
    pub position: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<Ingredient> for IngredientDto {
    fn from(i: Ingredient) -> Self {
        Self {
            id: i.id,
            recipe_id: i.recipe_id,
            name: i.name,
            quantity: i.quantity,
            unit: i.unit,
            notes: i.notes,
            position: i.position,
            created_at: i.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flour() -> IngredientInput {
        IngredientInput {
            name: "flour".into(),
            quantity: "200 g".into(),
            unit: Some("g".into()),
            notes: None,
            position: 0,
        }
    }

    #[test]
    fn valid_ingredient_passes() {
        assert!(flour().validate().is_ok());
    }

    #[test]
    fn blank_quantity_is_reported() {
        let mut input = flour();
        input.quantity = " ".into();
        let err = input.validate().unwrap_err();
        match err {
            ApiError::Validation { fields, .. } => assert!(fields.contains_key("quantity")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn nested_prefix_shapes_field_paths() {
        let mut input = flour();
        input.name = "".into();
        let mut v = Violations::new();
        input.collect_violations(&mut v, "ingredients[3].");
        let err = v.into_result().unwrap_err();
        match err {
            ApiError::Validation { fields, .. } => {
                assert!(fields.contains_key("ingredients[3].name"))
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn position_defaults_to_zero() {
        let input: IngredientInput =
            serde_json::from_str(r#"{"name": "salt", "quantity": "1 pinch"}"#).unwrap();
        assert_eq!(input.position, 0);
    }
}
