//! Reverse-chronological timelines.

use crate::db::Db;
use crate::errors::ApiError;
use crate::models::post::PostView;
use crate::social::content::{POST_WITH_AUTHOR, post_from_row};
use crate::social::interactions;

pub const DEFAULT_FEED_LIMIT: i64 = 20;

/// Every post, newest first. Counters are filled in only for a known viewer.
pub async fn list_all(db: &Db, viewer_id: Option<&str>, skip: i64, limit: i64) -> Result<Vec<PostView>, ApiError> {
    let mut conn = db.0.acquire().await?;
    let rows = sqlx::query(&format!(
        "{POST_WITH_AUTHOR} ORDER BY p.created_at DESC, p.rowid DESC LIMIT ? OFFSET ?"
    ))
    .bind(limit)
    .bind(skip)
    .fetch_all(&mut *conn)
    .await?;

    let posts = rows.iter().map(post_from_row).collect();
    interactions::enrich(&mut conn, posts, viewer_id).await
}

/// Posts by the viewer and by everyone the viewer follows, newest first.
pub async fn list_following(db: &Db, viewer_id: &str, skip: i64, limit: i64) -> Result<Vec<PostView>, ApiError> {
    let mut conn = db.0.acquire().await?;
    let rows = sqlx::query(&format!(
        "{POST_WITH_AUTHOR}
         WHERE p.author_id = ?
            OR p.author_id IN (SELECT followee_id FROM follows WHERE follower_id = ?)
         ORDER BY p.created_at DESC, p.rowid DESC
         LIMIT ? OFFSET ?"
    ))
    .bind(viewer_id)
    .bind(viewer_id)
    .bind(limit)
    .bind(skip)
    .fetch_all(&mut *conn)
    .await?;

    let posts = rows.iter().map(post_from_row).collect();
    interactions::enrich(&mut conn, posts, Some(viewer_id)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::test_db;
    use crate::models::user::User;
    use crate::social::{content, identity};

    async fn user(db: &Db, name: &str) -> User {
        identity::register(db, &format!("{name}@example.com"), name, None, "password1")
            .await
            .unwrap()
    }

    fn contents(views: &[PostView]) -> Vec<&str> {
        views.iter().map(|v| v.post.content.as_str()).collect()
    }

    #[actix_web::test]
    async fn following_feed_is_scoped_to_self_and_followees() {
        let db = test_db().await;
        let u1 = user(&db, "u1").await;
        let u2 = user(&db, "u2").await;
        let u3 = user(&db, "u3").await;

        content::create_post(&db, &u2, "u2 old").await.unwrap();
        content::create_post(&db, &u3, "u3 noise").await.unwrap();
        content::create_post(&db, &u1, "u1 own").await.unwrap();
        content::create_post(&db, &u2, "u2 new").await.unwrap();

        // Own posts show up even without following anyone.
        let feed = list_following(&db, &u1.id, 0, DEFAULT_FEED_LIMIT).await.unwrap();
        assert_eq!(contents(&feed), ["u1 own"]);

        identity::follow(&db, &u1, "u2").await.unwrap();
        let feed = list_following(&db, &u1.id, 0, DEFAULT_FEED_LIMIT).await.unwrap();
        assert_eq!(contents(&feed), ["u2 new", "u1 own", "u2 old"]);
        assert!(feed.iter().all(|v| v.post.author_id != u3.id));

        identity::unfollow(&db, &u1, "u2").await.unwrap();
        let feed = list_following(&db, &u1.id, 0, DEFAULT_FEED_LIMIT).await.unwrap();
        assert_eq!(contents(&feed), ["u1 own"]);
    }

    #[actix_web::test]
    async fn list_all_windows_newest_first() {
        let db = test_db().await;
        let a = user(&db, "a").await;
        for i in 0..5 {
            content::create_post(&db, &a, &format!("p{i}")).await.unwrap();
        }
        let all = list_all(&db, None, 0, DEFAULT_FEED_LIMIT).await.unwrap();
        assert_eq!(contents(&all), ["p4", "p3", "p2", "p1", "p0"]);

        let page = list_all(&db, None, 2, 2).await.unwrap();
        assert_eq!(contents(&page), ["p2", "p1"]);
        assert!(list_all(&db, None, 10, 5).await.unwrap().is_empty());
    }

    #[actix_web::test]
    async fn feeds_carry_viewer_counters() {
        let db = test_db().await;
        let a = user(&db, "a").await;
        let b = user(&db, "b").await;
        let post = content::create_post(&db, &a, "hello").await.unwrap();
        content::like(&db, &post.id, &b).await.unwrap();
        content::create_comment(&db, &post.id, &b, "hey").await.unwrap();

        let anon = list_all(&db, None, 0, 20).await.unwrap();
        assert_eq!(anon[0].interactions.likes_count, 0);
        assert!(!anon[0].interactions.viewer_has_liked);

        let as_b = list_all(&db, Some(&b.id), 0, 20).await.unwrap();
        assert_eq!(as_b[0].interactions.likes_count, 1);
        assert_eq!(as_b[0].interactions.comments_count, 1);
        assert!(as_b[0].interactions.viewer_has_liked);

        let as_a = list_following(&db, &a.id, 0, 20).await.unwrap();
        assert_eq!(as_a[0].interactions.likes_count, 1);
        assert!(!as_a[0].interactions.viewer_has_liked);
    }
}
