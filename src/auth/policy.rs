use sqlx::PgPool;
use uuid::Uuid;

use crate::error::ApiError;

/// The authenticated identity a mutation is authorized against.
#[derive(Debug, Clone, Copy, sqlx::FromRow)]
pub struct Actor {
    pub id: Uuid,
    pub is_admin: bool,
}

impl Actor {
    /// Owners may mutate their own resources; admins may mutate anything.
    pub fn can_modify(&self, owner_id: Uuid) -> bool {
        self.is_admin || self.id == owner_id
    }
}

/// Resolve a verified token subject to its stored identity. A token whose
/// user row has disappeared does not authenticate.
pub async fn load_actor(db: &PgPool, user_id: Uuid) -> Result<Actor, ApiError> {
    let actor = sqlx::query_as::<_, Actor>("SELECT id, is_admin FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(db)
        .await?;
    actor.ok_or_else(|| ApiError::unauthenticated("User no longer exists"))
}

pub fn ensure_admin(actor: &Actor) -> Result<(), ApiError> {
    if actor.is_admin {
        Ok(())
    } else {
        Err(ApiError::forbidden("Admin privileges required"))
    }
}

pub fn ensure_can_modify(actor: &Actor, owner_id: Uuid, what: &str) -> Result<(), ApiError> {
    if actor.can_modify(owner_id) {
        Ok(())
    } else {
        Err(ApiError::forbidden(format!(
            "You don't have permission to modify this {what}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_may_modify_own_resource() {
        let id = Uuid::new_v4();
        let actor = Actor {
            id,
            is_admin: false,
        };
        assert!(actor.can_modify(id));
    }

    #[test]
    fn non_owner_may_not_modify() {
        let actor = Actor {
            id: Uuid::new_v4(),
            is_admin: false,
        };
        assert!(!actor.can_modify(Uuid::new_v4()));
        assert!(ensure_can_modify(&actor, Uuid::new_v4(), "recipe").is_err());
    }

    #[test]
    fn admin_may_modify_anything() {
        let actor = Actor {
            id: Uuid::new_v4(),
            is_admin: true,
        };
        assert!(actor.can_modify(Uuid::new_v4()));
        assert!(ensure_admin(&actor).is_ok());
    }

    #[test]
    fn non_admin_fails_admin_gate() {
        let actor = Actor {
            id: Uuid::new_v4(),
            is_admin: false,
        };
        let err = ensure_admin(&actor).unwrap_err();
        assert_eq!(err.kind(), "Forbidden");
    }
}
