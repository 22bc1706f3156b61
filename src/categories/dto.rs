use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo::Category;
use crate::error::ApiError;
use crate::validate::{is_blank, Violations};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateCategoryRequest {
    pub name: String,
    pub description: Option<String>,
    pub image: Option<String>,
}

impl CreateCategoryRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        let mut v = Violations::new();
        validate_name(&mut v, Some(self.name.as_str()));
        validate_image(&mut v, self.image.as_deref());
        v.into_result()
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateCategoryRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
}

impl UpdateCategoryRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        let mut v = Violations::new();
        if self.name.is_some() {
            validate_name(&mut v, self.name.as_deref());
        }
        validate_image(&mut v, self.image.as_deref());
        v.into_result()
    }
}

fn validate_name(v: &mut Violations, name: Option<&str>) {
    match name {
        None => v.add("name", "name is required"),
        Some(name) if is_blank(name) => v.add("name", "name cannot be empty"),
        Some(name) if name.len() > 50 => v.add("name", "name must not exceed 50 characters"),
        Some(_) => {}
    }
}

fn validate_image(v: &mut Violations, image: Option<&str>) {
    if let Some(image) = image {
        if image.len() > 255 {
            v.add("image", "image must not exceed 255 characters");
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CategoryDto {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipe_count: Option<i64>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl CategoryDto {
    pub fn from_category(category: &Category, recipe_count: Option<i64>) -> Self {
        Self {
            id: category.id,
            name: category.name.clone(),
            slug: category.slug.clone(),
            description: category.description.clone(),
            image: category.image.clone(),
            recipe_count,
            created_at: category.created_at,
            updated_at: category.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_requires_non_blank_name() {
        let req = CreateCategoryRequest {
            name: "   ".into(),
            description: None,
            image: None,
        };
        let err = req.validate().unwrap_err();
        match err {
            ApiError::Validation { fields, .. } => {
                assert_eq!(fields.keys().collect::<Vec<_>>(), vec!["name"])
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn update_without_name_is_valid() {
        let req = UpdateCategoryRequest {
            name: None,
            description: Some("only the description changes".into()),
            image: None,
        };
        assert!(req.validate().is_ok());
    }

    #[test]
    fn overlong_name_is_rejected() {
        let req = CreateCategoryRequest {
            name: "x".repeat(51),
            description: None,
            image: None,
        };
        assert!(req.validate().is_err());
    }
}
