//! Users, credentials and the follow graph.

use chrono::Utc;
use serde::Deserialize;
use sqlx::{Row, SqliteConnection};

use crate::auth;
use crate::db::Db;
use crate::errors::{ApiError, conflict_on_unique, is_unique_violation};
use crate::media;
use crate::models::user::{USER_COLUMNS, User, UserWithFollowInfo};
use crate::patch::Patch;

/// Fields a user may change on their own profile.
#[derive(Deserialize, Debug, Default)]
pub struct ProfilePatch {
    #[serde(default)]
    pub email: Patch<String>,
    #[serde(default)]
    pub username: Patch<String>,
    #[serde(default)]
    pub full_name: Patch<Option<String>>,
    #[serde(default)]
    pub bio: Patch<Option<String>>,
    #[serde(default)]
    pub profile_picture: Patch<Option<String>>,
}

pub fn validate_email(email: &str) -> Result<(), ApiError> {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !domain.contains('@') => Ok(()),
        _ => Err(ApiError::BadRequest("invalid email address".into())),
    }
}

pub fn validate_username(username: &str) -> Result<(), ApiError> {
    if username.trim().is_empty() || username.contains(char::is_whitespace) {
        return Err(ApiError::BadRequest("invalid username".into()));
    }
    Ok(())
}

pub async fn find_by_id(db: &Db, id: &str) -> Result<Option<User>, ApiError> {
    let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
        .bind(id)
        .fetch_optional(&db.0)
        .await?;
    Ok(user)
}

async fn find_by_username(conn: &mut SqliteConnection, username: &str) -> Result<Option<User>, ApiError> {
    let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?"))
        .bind(username)
        .fetch_optional(conn)
        .await?;
    Ok(user)
}

async fn find_by_email(conn: &mut SqliteConnection, email: &str) -> Result<Option<User>, ApiError> {
    let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?"))
        .bind(email)
        .fetch_optional(conn)
        .await?;
    Ok(user)
}

pub async fn register(
    db: &Db,
    email: &str,
    username: &str,
    full_name: Option<&str>,
    password: &str,
) -> Result<User, ApiError> {
    validate_email(email)?;
    validate_username(username)?;
    if password.len() < 8 {
        return Err(ApiError::BadRequest("password must be at least 8 characters".into()));
    }

    let hash = auth::hash_password(password)?;
    let user_id = uuid::Uuid::new_v4().to_string();
    let now = Utc::now();

    let mut tx = db.begin_write().await?;

    // Checked up front only to name the clashing field; the UNIQUE constraints decide races.
    if find_by_email(&mut tx, email).await?.is_some() {
        return Err(ApiError::Conflict("email already registered".into()));
    }
    if find_by_username(&mut tx, username).await?.is_some() {
        return Err(ApiError::Conflict("username already taken".into()));
    }

    sqlx::query("INSERT INTO users(id, email, username, full_name, password_hash, is_active, created_at) VALUES (?, ?, ?, ?, ?, 1, ?)")
        .bind(&user_id)
        .bind(email)
        .bind(username)
        .bind(full_name)
        .bind(&hash)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(conflict_on_unique("username or email already exists"))?;

    let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
        .bind(&user_id)
        .fetch_one(&mut *tx)
        .await?;

    tx.commit().await?;
    log::info!("registered user {} ({})", user.username, user.id);
    Ok(user)
}

/// Resolves `identifier` as an email first, then as a username.
pub async fn authenticate(db: &Db, identifier: &str, password: &str) -> Result<User, ApiError> {
    let mut conn = db.0.acquire().await?;
    let user = match find_by_email(&mut conn, identifier).await? {
        Some(u) => Some(u),
        None => find_by_username(&mut conn, identifier).await?,
    };
    let user = user.ok_or(ApiError::Unauthorized)?;

    if !auth::verify_password(&user.password_hash, password) {
        log::debug!("failed login for {}", user.id);
        return Err(ApiError::Unauthorized);
    }
    Ok(user)
}

/// Applies the present fields. `profile_picture` may only be cleared; returns the user
/// and the picture reference it dropped.
pub async fn update_profile(db: &Db, user_id: &str, patch: ProfilePatch) -> Result<(User, Option<String>), ApiError> {
    if let Some(email) = patch.email.as_set() {
        validate_email(email)?;
    }
    if let Some(username) = patch.username.as_set() {
        validate_username(username)?;
    }
    media::reject_client_reference(&patch.profile_picture, "profile_picture")?;

    let mut tx = db.begin_write().await?;
    let mut user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(ApiError::NotFound)?;

    if let Some(email) = patch.email.as_set() {
        if *email != user.email && find_by_email(&mut tx, email).await?.is_some() {
            return Err(ApiError::Conflict("email already registered".into()));
        }
    }
    if let Some(username) = patch.username.as_set() {
        if *username != user.username && find_by_username(&mut tx, username).await?.is_some() {
            return Err(ApiError::Conflict("username already taken".into()));
        }
    }

    let previous_picture = user.profile_picture.clone();
    let ProfilePatch { email, username, full_name, bio, profile_picture } = patch;
    let mut changed = email.apply_to(&mut user.email);
    changed |= username.apply_to(&mut user.username);
    changed |= full_name.apply_to(&mut user.full_name);
    changed |= bio.apply_to(&mut user.bio);
    changed |= profile_picture.apply_to(&mut user.profile_picture);

    if changed {
        user.updated_at = Some(Utc::now());
        sqlx::query("UPDATE users SET email = ?, username = ?, full_name = ?, bio = ?, profile_picture = ?, updated_at = ? WHERE id = ?")
            .bind(&user.email)
            .bind(&user.username)
            .bind(&user.full_name)
            .bind(&user.bio)
            .bind(&user.profile_picture)
            .bind(user.updated_at)
            .bind(&user.id)
            .execute(&mut *tx)
            .await
            .map_err(conflict_on_unique("username or email already exists"))?;
    }

    tx.commit().await?;
    let dropped = previous_picture.filter(|_| user.profile_picture.is_none());
    Ok((user, dropped))
}

/// Stores a new picture reference and returns the user plus the reference it replaced.
pub async fn set_profile_picture(db: &Db, user_id: &str, image_ref: &str) -> Result<(User, Option<String>), ApiError> {
    let mut tx = db.begin_write().await?;
    let previous: Option<String> = sqlx::query("SELECT profile_picture FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(ApiError::NotFound)?
        .get("profile_picture");

    sqlx::query("UPDATE users SET profile_picture = ?, updated_at = ? WHERE id = ?")
        .bind(image_ref)
        .bind(Utc::now())
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok((user, previous))
}

pub async fn follow(db: &Db, follower: &User, target_username: &str) -> Result<User, ApiError> {
    let mut tx = db.begin_write().await?;
    let target = find_by_username(&mut tx, target_username)
        .await?
        .ok_or(ApiError::NotFound)?;
    if target.id == follower.id {
        return Err(ApiError::InvalidOperation("users cannot follow themselves".into()));
    }

    let res = sqlx::query("INSERT INTO follows(follower_id, followee_id, created_at) VALUES (?, ?, ?)")
        .bind(&follower.id)
        .bind(&target.id)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await;
    if let Err(e) = res {
        if is_unique_violation(&e) {
            return Err(ApiError::Conflict("already following this user".into()));
        }
        return Err(e.into());
    }

    tx.commit().await?;
    Ok(target)
}

pub async fn unfollow(db: &Db, follower: &User, target_username: &str) -> Result<User, ApiError> {
    let mut tx = db.begin_write().await?;
    let target = find_by_username(&mut tx, target_username)
        .await?
        .ok_or(ApiError::NotFound)?;
    if target.id == follower.id {
        return Err(ApiError::InvalidOperation("users cannot unfollow themselves".into()));
    }

    let res = sqlx::query("DELETE FROM follows WHERE follower_id = ? AND followee_id = ?")
        .bind(&follower.id)
        .bind(&target.id)
        .execute(&mut *tx)
        .await?;
    if res.rows_affected() == 0 {
        return Err(ApiError::InvalidOperation("not following this user".into()));
    }

    tx.commit().await?;
    Ok(target)
}

pub async fn get_profile(db: &Db, username: &str) -> Result<UserWithFollowInfo, ApiError> {
    let mut conn = db.0.acquire().await?;
    let user = find_by_username(&mut conn, username)
        .await?
        .ok_or(ApiError::NotFound)?;

    let counts = sqlx::query(
        "SELECT
            (SELECT COUNT(*) FROM follows WHERE followee_id = ?) AS followers_count,
            (SELECT COUNT(*) FROM follows WHERE follower_id = ?) AS following_count",
    )
    .bind(&user.id)
    .bind(&user.id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(UserWithFollowInfo {
        followers_count: counts.get("followers_count"),
        following_count: counts.get("following_count"),
        user: user.into(),
    })
}
