use serde::{Serialize, Deserialize};
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

pub const USER_COLUMNS: &str =
    "id, email, username, full_name, bio, password_hash, profile_picture, is_active, created_at, updated_at";

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub email: String,
    pub username: String,
    pub full_name: Option<String>,
    pub bio: Option<String>,
    pub password_hash: String,
    pub profile_picture: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// What a user sees of their own account and what profile lookups return.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PublicUser {
    pub id: String,
    pub email: String,
    pub username: String,
    pub full_name: Option<String>,
    pub bio: Option<String>,
    pub profile_picture: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            username: u.username,
            full_name: u.full_name,
            bio: u.bio,
            profile_picture: u.profile_picture,
            is_active: u.is_active,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct UserWithFollowInfo {
    #[serde(flatten)]
    pub user: PublicUser,
    pub followers_count: i64,
    pub following_count: i64,
}

/// Author block embedded in posts and comments.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct UserSummary {
    pub id: String,
    pub username: String,
    pub full_name: Option<String>,
    pub profile_picture: Option<String>,
}

impl UserSummary {
    /// Reads `author_id`, `author_username`, `author_full_name`, `author_profile_picture`.
    pub fn from_author_columns(r: &SqliteRow) -> Self {
        Self {
            id: r.get("author_id"),
            username: r.get("author_username"),
            full_name: r.get("author_full_name"),
            profile_picture: r.get("author_profile_picture"),
        }
    }
}
