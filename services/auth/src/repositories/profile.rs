//! Profile repository for the `users` table

use common::{
    backend::{Filter, TableBackend},
    error::BackendResult,
};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::models::{NewProfile, Profile};

const TABLE: &str = "users";
const COLUMNS: &str = "id, email, full_name, birth_date, subscription_level";

/// Profile repository
#[derive(Clone)]
pub struct ProfileRepository {
    backend: Arc<dyn TableBackend>,
}

impl ProfileRepository {
    /// Create a new profile repository
    pub fn new(backend: Arc<dyn TableBackend>) -> Self {
        Self { backend }
    }

    /// Insert the profile of a new account
    pub async fn create(&self, profile: &NewProfile) -> BackendResult<()> {
        info!("Creating profile for user: {}", profile.id);

        let record = serde_json::to_value(profile)?;
        self.backend.insert(TABLE, vec![record], "id").await?;
        Ok(())
    }

    /// Find the profile of a user
    pub async fn find(&self, user_id: Uuid) -> BackendResult<Option<Profile>> {
        let rows = self
            .backend
            .select(TABLE, COLUMNS, &Filter::eq("id", user_id))
            .await?;

        match rows.into_iter().next() {
            Some(row) => Ok(Some(serde_json::from_value(row)?)),
            None => Ok(None),
        }
    }

    /// Find the full name of a user, ignoring a blank one
    pub async fn find_full_name(&self, user_id: Uuid) -> BackendResult<Option<String>> {
        let full_name = self
            .find(user_id)
            .await?
            .and_then(|profile| profile.full_name)
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty());
        Ok(full_name)
    }
}
