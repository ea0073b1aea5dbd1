//! Like/comment counters and the viewer's own like, computed from live rows.

use std::collections::HashMap;

use sqlx::{Row, SqliteConnection};

use crate::errors::ApiError;
use crate::models::post::{Interactions, Post, PostView};
use crate::models::user::UserSummary;

/// Counts for each post id in one round trip. Ids with no rows get zeroes.
pub async fn interactions_for(
    conn: &mut SqliteConnection,
    post_ids: &[String],
    viewer_id: Option<&str>,
) -> Result<HashMap<String, Interactions>, ApiError> {
    let mut map: HashMap<String, Interactions> = post_ids
        .iter()
        .map(|id| (id.clone(), Interactions::default()))
        .collect();
    if post_ids.is_empty() {
        return Ok(map);
    }

    let placeholders: String = post_ids.iter().map(|_| "?").collect::<Vec<_>>().join(",");
    let query_str = format!(
        "SELECT p.id,
            (SELECT COUNT(*) FROM likes l WHERE l.post_id = p.id) AS likes_count,
            (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id) AS comments_count,
            EXISTS(SELECT 1 FROM likes l WHERE l.post_id = p.id AND l.user_id = ?) AS viewer_has_liked
         FROM posts p WHERE p.id IN ({})",
        placeholders
    );
    let mut q = sqlx::query(&query_str).bind(viewer_id);
    for id in post_ids {
        q = q.bind(id);
    }
    for r in q.fetch_all(&mut *conn).await? {
        let id: String = r.get("id");
        map.insert(
            id,
            Interactions {
                likes_count: r.get("likes_count"),
                comments_count: r.get("comments_count"),
                viewer_has_liked: viewer_id.is_some() && r.get::<i64, _>("viewer_has_liked") != 0,
            },
        );
    }
    Ok(map)
}

/// Attaches counters to posts when there is a viewer. Anonymous reads keep the defaults.
pub async fn enrich(
    conn: &mut SqliteConnection,
    posts: Vec<(Post, UserSummary)>,
    viewer_id: Option<&str>,
) -> Result<Vec<PostView>, ApiError> {
    let mut counts = match viewer_id {
        Some(viewer) => {
            let ids: Vec<String> = posts.iter().map(|(p, _)| p.id.clone()).collect();
            interactions_for(conn, &ids, Some(viewer)).await?
        }
        None => HashMap::new(),
    };

    Ok(posts
        .into_iter()
        .map(|(post, author)| PostView {
            interactions: counts.remove(&post.id).unwrap_or_default(),
            post,
            author,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::test_db;
    use crate::social::{content, identity};

    #[actix_web::test]
    async fn counts_equal_live_cardinality() {
        let db = test_db().await;
        let author = identity::register(&db, "a@example.com", "author", None, "password1").await.unwrap();
        let post = content::create_post(&db, &author, "hello").await.unwrap();
        let quiet = content::create_post(&db, &author, "nobody cares").await.unwrap();

        let mut fans = Vec::new();
        for i in 0..5 {
            let u = identity::register(&db, &format!("f{i}@example.com"), &format!("f{i}"), None, "password1")
                .await
                .unwrap();
            content::like(&db, &post.id, &u).await.unwrap();
            content::create_comment(&db, &post.id, &u, "nice").await.unwrap();
            fans.push(u);
        }
        content::create_comment(&db, &post.id, &fans[0], "again").await.unwrap();
        content::unlike(&db, &post.id, &fans[4]).await.unwrap();

        let mut conn = db.0.acquire().await.unwrap();
        let ids = vec![post.id.clone(), quiet.id.clone(), "missing".to_string()];
        let map = interactions_for(&mut conn, &ids, Some(&fans[1].id)).await.unwrap();
        assert_eq!(
            map[&post.id],
            Interactions { likes_count: 4, comments_count: 6, viewer_has_liked: true }
        );
        assert_eq!(map[&quiet.id], Interactions::default());
        assert_eq!(map["missing"], Interactions::default());

        let map = interactions_for(&mut conn, &ids, Some(&fans[4].id)).await.unwrap();
        assert!(!map[&post.id].viewer_has_liked);
        let map = interactions_for(&mut conn, &ids, None).await.unwrap();
        assert!(!map[&post.id].viewer_has_liked);
        assert_eq!(map[&post.id].likes_count, 4);
    }

    #[actix_web::test]
    async fn anonymous_enrichment_keeps_defaults() {
        let db = test_db().await;
        let author = identity::register(&db, "a@example.com", "author", None, "password1").await.unwrap();
        let post = content::create_post(&db, &author, "hello").await.unwrap();
        content::like(&db, &post.id, &author).await.unwrap();

        let summary = UserSummary {
            id: author.id.clone(),
            username: author.username.clone(),
            full_name: None,
            profile_picture: None,
        };
        let mut conn = db.0.acquire().await.unwrap();
        let anon = enrich(&mut conn, vec![(post.clone(), summary.clone())], None).await.unwrap();
        assert_eq!(anon[0].interactions, Interactions::default());

        let seen = enrich(&mut conn, vec![(post, summary)], Some(&author.id)).await.unwrap();
        assert_eq!(seen[0].interactions.likes_count, 1);
        assert!(seen[0].interactions.viewer_has_liked);
    }
}
