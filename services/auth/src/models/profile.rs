//! Profile model stored in the `users` table

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Subscription level given to every new account
pub const DEFAULT_SUBSCRIPTION_LEVEL: &str = "free";

/// Profile entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub email: Option<String>,
    pub full_name: Option<String>,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub subscription_level: Option<String>,
}

/// New profile creation payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProfile {
    /// Same id as the auth account
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub birth_date: NaiveDate,
    pub subscription_level: String,
}

impl NewProfile {
    /// Profile for a freshly created account
    pub fn new(id: Uuid, email: &str, full_name: &str, birth_date: NaiveDate) -> Self {
        Self {
            id,
            email: email.to_string(),
            full_name: full_name.trim().to_string(),
            birth_date,
            subscription_level: DEFAULT_SUBSCRIPTION_LEVEL.to_string(),
        }
    }
}
