use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Minimal projection of the external user-profile store, enough to label
/// the leaderboard. The profile store itself is not owned by this service.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserSummary {
    pub id: Uuid,
    pub full_name: String,
}
