use uuid::Uuid;

use crate::auth::Claims;
use crate::error::AppError;
use infra::models::{BookingRow, ConnectionRow, TurfRow, UserRole};

/// The authenticated caller, as read from verified JWT claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Uuid,
    pub role: UserRole,
}

impl Actor {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

impl TryFrom<&Claims> for Actor {
    type Error = AppError;

    fn try_from(claims: &Claims) -> Result<Self, Self::Error> {
        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| AppError::Unauthorized("Invalid token subject".to_string()))?;

        Ok(Self {
            user_id,
            role: UserRole::from(claims.role.as_str()),
        })
    }
}

/// Owners manage their own turfs; admins manage all of them.
pub fn can_manage_turf(actor: &Actor, turf: &TurfRow) -> bool {
    actor.is_admin() || turf.owner_id == actor.user_id
}

pub fn owns_booking(actor: &Actor, booking: &BookingRow) -> bool {
    booking.user_id == actor.user_id
}

pub fn can_delete_connection(actor: &Actor, connection: &ConnectionRow) -> bool {
    actor.is_admin() || connection.created_by == actor.user_id
}

/// Check that the caller holds one of `roles`; admins always pass.
pub fn require_role(actor: &Actor, roles: &[UserRole]) -> Result<(), AppError> {
    if actor.is_admin() || roles.contains(&actor.role) {
        return Ok(());
    }
    Err(AppError::Forbidden(format!(
        "Access denied: your current role is {}",
        actor.role.as_str()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use infra::models::ConnectionStatus;

    fn actor(role: UserRole) -> Actor {
        Actor {
            user_id: Uuid::new_v4(),
            role,
        }
    }

    fn turf_owned_by(owner_id: Uuid) -> TurfRow {
        TurfRow {
            id: Uuid::new_v4(),
            owner_id,
            name: "Arena".into(),
            price: 500,
            description: None,
            address: None,
            city: None,
            state: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            slots: vec![],
        }
    }

    #[test]
    fn only_owner_or_admin_manages_turf() {
        let owner = actor(UserRole::Owner);
        let other_owner = actor(UserRole::Owner);
        let admin = actor(UserRole::Admin);
        let turf = turf_owned_by(owner.user_id);

        assert!(can_manage_turf(&owner, &turf));
        assert!(can_manage_turf(&admin, &turf));
        assert!(!can_manage_turf(&other_owner, &turf));
    }

    #[test]
    fn only_creator_or_admin_deletes_connection() {
        let creator = actor(UserRole::Player);
        let connection = ConnectionRow {
            id: Uuid::new_v4(),
            turf: "Arena".into(),
            date: Utc::now().date_naive(),
            created_by: creator.user_id,
            max_players: 4,
            players: vec![creator.user_id],
            sport: "football".into(),
            contact_number: "123".into(),
            email: "c@x.io".into(),
            message: String::new(),
            status: ConnectionStatus::Open,
            created_at: Utc::now(),
        };

        assert!(can_delete_connection(&creator, &connection));
        assert!(can_delete_connection(&actor(UserRole::Admin), &connection));
        assert!(!can_delete_connection(&actor(UserRole::Player), &connection));
    }

    #[test]
    fn role_gate_lets_admins_through() {
        assert!(require_role(&actor(UserRole::Admin), &[UserRole::Owner]).is_ok());
        assert!(require_role(&actor(UserRole::Owner), &[UserRole::Owner]).is_ok());
        assert!(matches!(
            require_role(&actor(UserRole::Player), &[UserRole::Owner]),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn unknown_claim_role_is_least_privileged() {
        let claims = Claims::new(Uuid::new_v4(), "x@y.z".into(), "superuser".into(), 5);
        let actor = Actor::try_from(&claims).unwrap();
        assert_eq!(actor.role, UserRole::Player);
    }
}
