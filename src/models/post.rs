use serde::{Serialize, Deserialize};
use chrono::{DateTime, Utc};

use super::user::UserSummary;

#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct Post {
    pub id: String,
    pub content: String,
    pub image_url: Option<String>,
    pub author_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Per-post counters computed at read time.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Interactions {
    pub likes_count: i64,
    pub comments_count: i64,
    pub viewer_has_liked: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PostView {
    #[serde(flatten)]
    pub post: Post,
    pub author: UserSummary,
    #[serde(flatten)]
    pub interactions: Interactions,
}
