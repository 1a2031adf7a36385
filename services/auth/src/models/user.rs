//! Account creation payload submitted by the user

use chrono::NaiveDate;
use serde::Deserialize;

/// Account creation form
#[derive(Debug, Clone, Deserialize)]
pub struct SignUpRequest {
    pub full_name: String,
    pub birth_date: NaiveDate,
    pub email: String,
    pub password: String,
}
