//! Row types that have no wire counterpart. Notifications, messages and push
//! tokens map straight onto `pulse_types` models.

use chrono::{DateTime, Utc};

pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub password: String,
    pub picture: String,
    pub created_at: DateTime<Utc>,
}
