use std::collections::HashSet;

use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::auth::permissions::{can_manage_turf, require_role};
use crate::auth::Actor;
use crate::config::StoreConfig;
use crate::error::AppError;
use crate::services::retry::run_with_retry;
use infra::models::{TurfRow, UserRole};
use infra::repos::{CreateTurf, TurfFilter, UpdateTurf};
use infra::{Store, StoreError, StoreTx};

#[derive(Debug, Clone)]
pub struct NewTurf {
    pub name: String,
    pub price: i32,
    pub description: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub slots: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OwnerSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TurfDetail {
    #[serde(flatten)]
    pub turf: TurfRow,
    pub owner: Option<OwnerSummary>,
}

fn normalize_slots(labels: Vec<String>) -> Result<Vec<String>, AppError> {
    let mut seen = HashSet::new();
    let mut slots = Vec::with_capacity(labels.len());
    for label in labels {
        let label = label.trim().to_string();
        if label.is_empty() {
            return Err(AppError::BadRequest("Slot labels cannot be empty".to_string()));
        }
        if !seen.insert(label.clone()) {
            return Err(AppError::BadRequest(format!("Duplicate slot '{label}'")));
        }
        slots.push(label);
    }
    Ok(slots)
}

fn validate_price(price: i32) -> Result<(), AppError> {
    if price < 0 {
        return Err(AppError::BadRequest("Price cannot be negative".to_string()));
    }
    Ok(())
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Turf listings and their slot sets.
#[derive(Clone)]
pub struct Catalog<S: Store> {
    store: S,
    config: StoreConfig,
}

impl<S: Store> Catalog<S> {
    pub fn new(store: S, config: StoreConfig) -> Self {
        Self { store, config }
    }

    pub async fn create_turf(&self, actor: &Actor, input: NewTurf) -> Result<TurfRow, AppError> {
        require_role(actor, &[UserRole::Owner])?;

        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::BadRequest("Turf name is required".to_string()));
        }
        validate_price(input.price)?;
        let slots = normalize_slots(input.slots)?;

        let turf = self
            .store
            .create_turf(CreateTurf {
                owner_id: actor.user_id,
                name,
                price: input.price,
                description: blank_to_none(input.description),
                address: blank_to_none(input.address),
                city: blank_to_none(input.city),
                state: blank_to_none(input.state),
                slots,
            })
            .await?;

        info!(turf_id = %turf.id, owner_id = %turf.owner_id, "Turf created");
        Ok(turf)
    }

    pub async fn list_turfs(&self, filter: TurfFilter) -> Result<Vec<TurfRow>, AppError> {
        Ok(self.store.list_turfs(filter).await?)
    }

    /// Values for the location dropdowns.
    pub async fn list_states(&self) -> Result<Vec<String>, AppError> {
        Ok(self.store.list_turf_states().await?)
    }

    pub async fn list_cities(&self, state: &str) -> Result<Vec<String>, AppError> {
        let state = state.trim();
        if state.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.store.list_turf_cities(state).await?)
    }

    pub async fn list_my_turfs(&self, actor: &Actor) -> Result<Vec<TurfRow>, AppError> {
        require_role(actor, &[UserRole::Owner])?;
        self.list_turfs(TurfFilter {
            owner_id: Some(actor.user_id),
            ..TurfFilter::default()
        })
        .await
    }

    async fn find_turf(&self, turf_id: Uuid) -> Result<TurfRow, AppError> {
        self.store
            .get_turf(turf_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Turf not found".to_string()))
    }

    /// A turf with its owner's public contact details.
    pub async fn get_turf(&self, turf_id: Uuid) -> Result<TurfDetail, AppError> {
        let turf = self.find_turf(turf_id).await?;
        let owner = self
            .store
            .find_user_by_id(turf.owner_id)
            .await?
            .map(|user| OwnerSummary {
                id: user.id,
                name: user.name,
                email: user.email,
                phone: user.phone,
            });

        Ok(TurfDetail { turf, owner })
    }

    pub async fn update_turf(
        &self,
        actor: &Actor,
        turf_id: Uuid,
        changes: UpdateTurf,
    ) -> Result<TurfRow, AppError> {
        let turf = self.find_turf(turf_id).await?;
        if !can_manage_turf(actor, &turf) {
            return Err(AppError::Forbidden(
                "Only the owner of this turf can edit it".to_string(),
            ));
        }
        if let Some(price) = changes.price {
            validate_price(price)?;
        }

        let changes = UpdateTurf {
            name: blank_to_none(changes.name),
            ..changes
        };

        self.store
            .update_turf(turf_id, changes)
            .await?
            .ok_or_else(|| AppError::NotFound("Turf not found".to_string()))
    }

    /// Bookings on the turf are kept; they simply lose their turf join.
    pub async fn delete_turf(&self, actor: &Actor, turf_id: Uuid) -> Result<(), AppError> {
        let turf = self.find_turf(turf_id).await?;
        if !can_manage_turf(actor, &turf) {
            return Err(AppError::Forbidden(
                "Only the owner of this turf can delete it".to_string(),
            ));
        }

        if !self.store.delete_turf(turf_id).await? {
            return Err(AppError::NotFound("Turf not found".to_string()));
        }
        info!(turf_id = %turf_id, "Turf deleted");
        Ok(())
    }

    pub async fn add_slot(&self, actor: &Actor, turf_id: Uuid, label: &str) -> Result<TurfRow, AppError> {
        let label = label.trim();
        if label.is_empty() {
            return Err(AppError::BadRequest("Slot label is required".to_string()));
        }

        run_with_retry(&self.config, "add_slot", || {
            self.add_slot_once(actor, turf_id, label)
        })
        .await
    }

    async fn add_slot_once(&self, actor: &Actor, turf_id: Uuid, label: &str) -> Result<TurfRow, AppError> {
        let mut tx = self.store.begin().await?;

        let turf = tx
            .lock_turf(turf_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Turf not found".to_string()))?;
        if !can_manage_turf(actor, &turf) {
            return Err(AppError::Forbidden(
                "Only the owner of this turf can change its slots".to_string(),
            ));
        }
        if turf.slot(label).is_some() {
            return Err(AppError::Conflict(format!("Slot '{label}' already exists")));
        }

        // A re-added label may still be held by older bookings.
        let held = tx.count_active_bookings(turf_id, label).await? > 0;
        match tx.insert_slot(turf_id, label, held).await {
            Ok(()) => {}
            Err(StoreError::UniqueViolation(_)) => {
                return Err(AppError::Conflict(format!("Slot '{label}' already exists")))
            }
            Err(e) => return Err(e.into()),
        }

        let updated = tx
            .lock_turf(turf_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Turf not found".to_string()))?;
        tx.commit().await?;
        Ok(updated)
    }

    /// Existing bookings for the label are left untouched.
    pub async fn remove_slot(&self, actor: &Actor, turf_id: Uuid, label: &str) -> Result<TurfRow, AppError> {
        let label = label.trim();
        run_with_retry(&self.config, "remove_slot", || {
            self.remove_slot_once(actor, turf_id, label)
        })
        .await
    }

    async fn remove_slot_once(&self, actor: &Actor, turf_id: Uuid, label: &str) -> Result<TurfRow, AppError> {
        let mut tx = self.store.begin().await?;

        let turf = tx
            .lock_turf(turf_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Turf not found".to_string()))?;
        if !can_manage_turf(actor, &turf) {
            return Err(AppError::Forbidden(
                "Only the owner of this turf can change its slots".to_string(),
            ));
        }
        if !tx.remove_slot(turf_id, label).await? {
            return Err(AppError::NotFound(format!("Slot '{label}' not found")));
        }

        let updated = tx
            .lock_turf(turf_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Turf not found".to_string()))?;
        tx.commit().await?;
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use infra::MemoryStore;

    fn actor(role: UserRole) -> Actor {
        Actor {
            user_id: Uuid::new_v4(),
            role,
        }
    }

    fn catalog() -> Catalog<MemoryStore> {
        Catalog::new(MemoryStore::new(), StoreConfig::default())
    }

    fn new_turf(slots: &[&str]) -> NewTurf {
        NewTurf {
            name: "Green Field".into(),
            price: 800,
            description: None,
            address: Some("  ".into()),
            city: Some("Pune".into()),
            state: Some("MH".into()),
            slots: slots.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn slot_labels_are_trimmed_and_unique() {
        assert_eq!(
            normalize_slots(vec![" 6-7 AM ".into(), "7-8 AM".into()]).unwrap(),
            vec!["6-7 AM".to_string(), "7-8 AM".to_string()]
        );
        assert!(normalize_slots(vec!["6-7 AM".into(), " 6-7 AM".into()]).is_err());
        assert!(normalize_slots(vec![" ".into()]).is_err());
    }

    #[tokio::test]
    async fn players_cannot_list_turfs() {
        let catalog = catalog();
        assert!(matches!(
            catalog.create_turf(&actor(UserRole::Player), new_turf(&["6-7 AM"])).await,
            Err(AppError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn create_validates_and_normalizes() {
        let catalog = catalog();
        let owner = actor(UserRole::Owner);

        let mut negative = new_turf(&["6-7 AM"]);
        negative.price = -1;
        assert!(matches!(
            catalog.create_turf(&owner, negative).await,
            Err(AppError::BadRequest(_))
        ));

        let turf = catalog.create_turf(&owner, new_turf(&[" 6-7 AM"])).await.unwrap();
        assert_eq!(turf.owner_id, owner.user_id);
        assert_eq!(turf.address, None);
        assert_eq!(turf.slots.len(), 1);
        assert_eq!(turf.slots[0].time, "6-7 AM");
        assert!(!turf.slots[0].booked);
    }

    #[tokio::test]
    async fn slots_can_be_added_and_removed_by_owner_only() {
        let catalog = catalog();
        let owner = actor(UserRole::Owner);
        let turf = catalog.create_turf(&owner, new_turf(&["6-7 AM"])).await.unwrap();

        let stranger = actor(UserRole::Owner);
        assert!(matches!(
            catalog.add_slot(&stranger, turf.id, "7-8 AM").await,
            Err(AppError::Forbidden(_))
        ));

        let updated = catalog.add_slot(&owner, turf.id, " 7-8 AM ").await.unwrap();
        assert!(updated.slot("7-8 AM").is_some());
        assert!(matches!(
            catalog.add_slot(&owner, turf.id, "7-8 AM").await,
            Err(AppError::Conflict(_))
        ));

        let updated = catalog.remove_slot(&owner, turf.id, "6-7 AM").await.unwrap();
        assert!(updated.slot("6-7 AM").is_none());
        assert!(matches!(
            catalog.remove_slot(&owner, turf.id, "6-7 AM").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn list_my_turfs_filters_by_owner() {
        let catalog = catalog();
        let owner = actor(UserRole::Owner);
        catalog.create_turf(&owner, new_turf(&["6-7 AM"])).await.unwrap();
        catalog
            .create_turf(&actor(UserRole::Owner), new_turf(&["6-7 AM"]))
            .await
            .unwrap();

        let mine = catalog.list_my_turfs(&owner).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(catalog.list_turfs(TurfFilter::default()).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn update_and_delete_require_ownership() {
        let catalog = catalog();
        let owner = actor(UserRole::Owner);
        let turf = catalog.create_turf(&owner, new_turf(&["6-7 AM"])).await.unwrap();

        let rename = UpdateTurf {
            name: Some("Blue Field".into()),
            price: Some(900),
            ..UpdateTurf::default()
        };
        assert!(matches!(
            catalog.update_turf(&actor(UserRole::Owner), turf.id, rename.clone()).await,
            Err(AppError::Forbidden(_))
        ));

        let updated = catalog.update_turf(&owner, turf.id, rename).await.unwrap();
        assert_eq!(updated.name, "Blue Field");
        assert_eq!(updated.price, 900);
        assert_eq!(updated.city.as_deref(), Some("Pune"));

        catalog.delete_turf(&owner, turf.id).await.unwrap();
        assert!(matches!(
            catalog.get_turf(turf.id).await,
            Err(AppError::NotFound(_))
        ));
    }
}
