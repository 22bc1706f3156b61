use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo::Rating;
use crate::error::ApiError;
use crate::validate::Violations;

pub const MIN_SCORE: i32 = 1;
pub const MAX_SCORE: i32 = 5;

/// Submitting a rating twice for the same recipe updates the earlier one,
/// so create and update share this payload.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpsertRatingRequest {
    pub score: Option<i32>,
    pub comment: Option<String>,
}

#[derive(Debug)]
pub struct NewRating {
    pub score: i32,
    pub comment: Option<String>,
}

impl UpsertRatingRequest {
    pub fn into_validated(self) -> Result<NewRating, ApiError> {
        let mut v = Violations::new();
        match self.score {
            None => v.add("score", "score is required"),
            Some(score) if !(MIN_SCORE..=MAX_SCORE).contains(&score) => {
                v.add("score", "score must be between 1 and 5")
            }
            Some(_) => {}
        }
        v.into_result()?;

        let Some(score) = self.score else {
            return Err(ApiError::validation("Validation failed"));
        };
        Ok(NewRating {
            score,
            comment: self.comment,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct RatingDto {
    pub id: Uuid,
    pub recipe_id: Uuid,
    pub user_id: Uuid,
    pub score: i32,
    pub comment: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<Rating> for RatingDto {
    fn from(r: Rating) -> Self {
        Self {
            id: r.id,
            recipe_id: r.recipe_id,
            user_id: r.user_id,
            score: r.score,
            comment: r.comment,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RatingStatsDto {
    pub recipe_id: Uuid,
    pub average_score: Option<f64>,
    pub rating_count: i64,
    pub distribution: BTreeMap<i32, i64>,
}

impl RatingStatsDto {
    /// Derives the stats from per-score counts; every score bucket is
    /// present in the distribution even when empty.
    pub fn from_counts(recipe_id: Uuid, counts: &[(i32, i64)]) -> Self {
        let mut distribution: BTreeMap<i32, i64> =
            (MIN_SCORE..=MAX_SCORE).map(|score| (score, 0)).collect();
        let mut total = 0i64;
        let mut weighted = 0i64;
        for &(score, count) in counts {
            if let Some(bucket) = distribution.get_mut(&score) {
                *bucket = count;
            }
            total += count;
            weighted += i64::from(score) * count;
        }
        let average_score = if total > 0 {
            Some((weighted as f64 / total as f64 * 100.0).round() / 100.0)
        } else {
            None
        };
        Self {
            recipe_id,
            average_score,
            rating_count: total,
            distribution,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_bounds_are_enforced() {
        for score in [0, 6, -1] {
            let req = UpsertRatingRequest {
                score: Some(score),
                comment: None,
            };
            let err = req.into_validated().unwrap_err();
            match err {
                ApiError::Validation { fields, .. } => {
                    assert_eq!(fields.keys().collect::<Vec<_>>(), vec!["score"])
                }
                other => panic!("expected validation error, got {other:?}"),
            }
        }
    }

    #[test]
    fn missing_score_is_a_field_error() {
        let req = UpsertRatingRequest {
            score: None,
            comment: Some("tasty".into()),
        };
        let err = req.into_validated().unwrap_err();
        match err {
            ApiError::Validation { fields, .. } => assert!(fields.contains_key("score")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn boundary_scores_pass() {
        for score in [MIN_SCORE, MAX_SCORE] {
            let req = UpsertRatingRequest {
                score: Some(score),
                comment: None,
            };
            assert_eq!(req.into_validated().unwrap().score, score);
        }
    }

    #[test]
    fn stats_average_rounds_to_two_decimals() {
        let recipe_id = Uuid::new_v4();
        let stats = RatingStatsDto::from_counts(recipe_id, &[(5, 1), (4, 2)]);
        assert_eq!(stats.rating_count, 3);
        assert_eq!(stats.average_score, Some(4.33));
        assert_eq!(stats.distribution[&5], 1);
        assert_eq!(stats.distribution[&4], 2);
        assert_eq!(stats.distribution[&1], 0);
    }

    #[test]
    fn stats_with_no_ratings_have_no_average() {
        let stats = RatingStatsDto::from_counts(Uuid::new_v4(), &[]);
        assert_eq!(stats.rating_count, 0);
        assert_eq!(stats.average_score, None);
        assert_eq!(stats.distribution.len(), 5);
    }
}
