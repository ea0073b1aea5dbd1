//! Posts, comments and likes: ownership checks and cascades.

use chrono::Utc;
use serde::Deserialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use crate::db::Db;
use crate::errors::{ApiError, is_unique_violation};
use crate::media;
use crate::models::comment::{Comment, CommentView};
use crate::models::like::Like;
use crate::models::post::{Post, PostView};
use crate::models::user::{User, UserSummary};
use crate::patch::Patch;
use crate::social::interactions;

pub const DEFAULT_COMMENT_LIMIT: i64 = 50;

/// Post columns joined with the author block read by `UserSummary::from_author_columns`.
pub(crate) const POST_WITH_AUTHOR: &str = "SELECT p.id, p.content, p.image_url, p.author_id, p.created_at, p.updated_at,
        u.username AS author_username, u.full_name AS author_full_name, u.profile_picture AS author_profile_picture
     FROM posts p
     INNER JOIN users u ON u.id = p.author_id";

#[derive(Deserialize, Debug, Default)]
pub struct PostPatch {
    #[serde(default)]
    pub content: Patch<String>,
    #[serde(default)]
    pub image_url: Patch<Option<String>>,
}

pub(crate) fn post_from_row(r: &SqliteRow) -> (Post, UserSummary) {
    let post = Post {
        id: r.get("id"),
        content: r.get("content"),
        image_url: r.get("image_url"),
        author_id: r.get("author_id"),
        created_at: r.get("created_at"),
        updated_at: r.get("updated_at"),
    };
    (post, UserSummary::from_author_columns(r))
}

fn require_content(content: &str) -> Result<(), ApiError> {
    if content.trim().is_empty() {
        return Err(ApiError::BadRequest("content required".into()));
    }
    Ok(())
}

async fn fetch_post(conn: &mut SqliteConnection, post_id: &str) -> Result<Option<Post>, ApiError> {
    let post = sqlx::query_as::<_, Post>(
        "SELECT id, content, image_url, author_id, created_at, updated_at FROM posts WHERE id = ?",
    )
    .bind(post_id)
    .fetch_optional(conn)
    .await?;
    Ok(post)
}

/// A post the caller owns. Missing and foreign posts are indistinguishable.
async fn fetch_owned_post(conn: &mut SqliteConnection, post_id: &str, owner_id: &str) -> Result<Post, ApiError> {
    match fetch_post(conn, post_id).await? {
        Some(post) if post.author_id == owner_id => Ok(post),
        _ => Err(ApiError::NotFound),
    }
}

pub async fn owned_post(db: &Db, post_id: &str, owner: &User) -> Result<Post, ApiError> {
    let mut conn = db.0.acquire().await?;
    fetch_owned_post(&mut conn, post_id, &owner.id).await
}

async fn ensure_post_exists(conn: &mut SqliteConnection, post_id: &str) -> Result<(), ApiError> {
    let row = sqlx::query("SELECT 1 FROM posts WHERE id = ?")
        .bind(post_id)
        .fetch_optional(conn)
        .await?;
    row.map(|_| ()).ok_or(ApiError::NotFound)
}

/// New posts carry no image; one is attached later through `set_post_image`.
pub async fn create_post(db: &Db, author: &User, content: &str) -> Result<Post, ApiError> {
    require_content(content)?;
    let post = Post {
        id: uuid::Uuid::new_v4().to_string(),
        content: content.to_string(),
        image_url: None,
        author_id: author.id.clone(),
        created_at: Utc::now(),
        updated_at: None,
    };
    sqlx::query("INSERT INTO posts(id, content, image_url, author_id, created_at) VALUES (?, ?, ?, ?, ?)")
        .bind(&post.id)
        .bind(&post.content)
        .bind(&post.image_url)
        .bind(&post.author_id)
        .bind(post.created_at)
        .execute(&db.0)
        .await?;
    Ok(post)
}

/// One post with its counters for `viewer_id` (zeroes when anonymous).
pub async fn get_post(db: &Db, post_id: &str, viewer_id: Option<&str>) -> Result<PostView, ApiError> {
    let mut conn = db.0.acquire().await?;
    let row = sqlx::query(&format!("{POST_WITH_AUTHOR} WHERE p.id = ?"))
        .bind(post_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(ApiError::NotFound)?;
    let mut views = interactions::enrich(&mut conn, vec![post_from_row(&row)], viewer_id).await?;
    views.pop().ok_or(ApiError::NotFound)
}

/// Owner-only. `image_url` may only be cleared; returns the post and the image reference it dropped.
pub async fn update_post(db: &Db, post_id: &str, author: &User, patch: PostPatch) -> Result<(Post, Option<String>), ApiError> {
    if let Some(content) = patch.content.as_set() {
        require_content(content)?;
    }
    media::reject_client_reference(&patch.image_url, "image_url")?;

    let mut tx = db.begin_write().await?;
    let mut post = fetch_owned_post(&mut tx, post_id, &author.id).await?;
    let previous_image = post.image_url.clone();

    let mut changed = patch.content.apply_to(&mut post.content);
    changed |= patch.image_url.apply_to(&mut post.image_url);
    if changed {
        post.updated_at = Some(Utc::now());
        sqlx::query("UPDATE posts SET content = ?, image_url = ?, updated_at = ? WHERE id = ?")
            .bind(&post.content)
            .bind(&post.image_url)
            .bind(post.updated_at)
            .bind(&post.id)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;
    let dropped = previous_image.filter(|_| post.image_url.is_none());
    Ok((post, dropped))
}

/// Deletes the post together with its comments and likes.
/// Returns the image reference the caller should hand to the media store.
pub async fn delete_post(db: &Db, post_id: &str, author: &User) -> Result<Option<String>, ApiError> {
    let mut tx = db.begin_write().await?;
    let post = fetch_owned_post(&mut tx, post_id, &author.id).await?;
    sqlx::query("DELETE FROM posts WHERE id = ?")
        .bind(&post.id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    log::info!("post {} deleted by {}", post.id, author.id);
    Ok(post.image_url)
}

/// Owner-only; returns the updated post and the image reference it replaced.
pub async fn set_post_image(db: &Db, post_id: &str, author: &User, image_ref: &str) -> Result<(Post, Option<String>), ApiError> {
    let mut tx = db.begin_write().await?;
    let mut post = fetch_owned_post(&mut tx, post_id, &author.id).await?;
    let previous = post.image_url.replace(image_ref.to_string());
    post.updated_at = Some(Utc::now());
    sqlx::query("UPDATE posts SET image_url = ?, updated_at = ? WHERE id = ?")
        .bind(&post.image_url)
        .bind(post.updated_at)
        .bind(&post.id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok((post, previous))
}

pub async fn create_comment(db: &Db, post_id: &str, author: &User, content: &str) -> Result<CommentView, ApiError> {
    require_content(content)?;
    let mut tx = db.begin_write().await?;
    ensure_post_exists(&mut tx, post_id).await?;

    let comment = Comment {
        id: uuid::Uuid::new_v4().to_string(),
        content: content.to_string(),
        post_id: post_id.to_string(),
        author_id: author.id.clone(),
        created_at: Utc::now(),
        updated_at: None,
    };
    sqlx::query("INSERT INTO comments(id, content, post_id, author_id, created_at) VALUES (?, ?, ?, ?, ?)")
        .bind(&comment.id)
        .bind(&comment.content)
        .bind(&comment.post_id)
        .bind(&comment.author_id)
        .bind(comment.created_at)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    Ok(CommentView {
        comment,
        author: UserSummary {
            id: author.id.clone(),
            username: author.username.clone(),
            full_name: author.full_name.clone(),
            profile_picture: author.profile_picture.clone(),
        },
    })
}

/// Newest first. An unknown post simply has no comments.
pub async fn list_comments(db: &Db, post_id: &str, skip: i64, limit: i64) -> Result<Vec<CommentView>, ApiError> {
    let rows = sqlx::query(
        "SELECT c.id, c.content, c.post_id, c.author_id, c.created_at, c.updated_at,
            u.username AS author_username, u.full_name AS author_full_name, u.profile_picture AS author_profile_picture
         FROM comments c
         INNER JOIN users u ON u.id = c.author_id
         WHERE c.post_id = ?
         ORDER BY c.created_at DESC, c.rowid DESC
         LIMIT ? OFFSET ?",
    )
    .bind(post_id)
    .bind(limit)
    .bind(skip)
    .fetch_all(&db.0)
    .await?;

    Ok(rows
        .iter()
        .map(|r| CommentView {
            comment: Comment {
                id: r.get("id"),
                content: r.get("content"),
                post_id: r.get("post_id"),
                author_id: r.get("author_id"),
                created_at: r.get("created_at"),
                updated_at: r.get("updated_at"),
            },
            author: UserSummary::from_author_columns(r),
        })
        .collect())
}

pub async fn like(db: &Db, post_id: &str, user: &User) -> Result<Like, ApiError> {
    let mut tx = db.begin_write().await?;
    ensure_post_exists(&mut tx, post_id).await?;

    let like = Like {
        id: uuid::Uuid::new_v4().to_string(),
        post_id: post_id.to_string(),
        user_id: user.id.clone(),
        created_at: Utc::now(),
    };
    let res = sqlx::query("INSERT INTO likes(id, post_id, user_id, created_at) VALUES (?, ?, ?, ?)")
        .bind(&like.id)
        .bind(&like.post_id)
        .bind(&like.user_id)
        .bind(like.created_at)
        .execute(&mut *tx)
        .await;
    if let Err(e) = res {
        if is_unique_violation(&e) {
            return Err(ApiError::Conflict("post already liked".into()));
        }
        return Err(e.into());
    }
    tx.commit().await?;
    Ok(like)
}

pub async fn unlike(db: &Db, post_id: &str, user: &User) -> Result<(), ApiError> {
    let mut tx = db.begin_write().await?;
    ensure_post_exists(&mut tx, post_id).await?;

    let res = sqlx::query("DELETE FROM likes WHERE post_id = ? AND user_id = ?")
        .bind(post_id)
        .bind(&user.id)
        .execute(&mut *tx)
        .await?;
    if res.rows_affected() == 0 {
        return Err(ApiError::InvalidOperation("post not liked".into()));
    }
    tx.commit().await?;
    Ok(())
}
