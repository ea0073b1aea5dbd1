use crate::{
    auth::{AuthUser, MaybeUser},
    config::Config,
    db::Db,
    errors::ApiError,
    media::{self, MediaStore},
    social::{
        content::{self, DEFAULT_COMMENT_LIMIT, PostPatch},
        feed::{self, DEFAULT_FEED_LIMIT},
    },
};
use actix_multipart::Multipart;
use actix_web::{HttpResponse, web};
use serde::Deserialize;

#[derive(Deserialize)]
pub struct PageQuery {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

impl PageQuery {
    /// `(skip, limit)` with `skip >= 0` and `limit` clamped to 1..=100.
    pub fn window(&self, default_limit: i64) -> (i64, i64) {
        let skip = self.skip.unwrap_or(0).max(0);
        let limit = self.limit.unwrap_or(default_limit).clamp(1, 100);
        (skip, limit)
    }
}

#[derive(Deserialize)]
pub struct CreatePostReq {
    pub content: String,
    pub image_url: Option<String>,
}

pub async fn create_post(
    db: web::Data<Db>,
    user: AuthUser,
    body: web::Json<CreatePostReq>,
) -> Result<HttpResponse, ApiError> {
    if body.image_url.is_some() {
        return Err(ApiError::BadRequest("image_url can only be set by uploading an image".into()));
    }
    let post = content::create_post(&db, &user.user, &body.content).await?;
    let view = content::get_post(&db, &post.id, Some(&user.user.id)).await?;
    Ok(HttpResponse::Created().json(view))
}

pub async fn list_posts(
    db: web::Data<Db>,
    viewer: MaybeUser,
    q: web::Query<PageQuery>,
) -> Result<HttpResponse, ApiError> {
    let (skip, limit) = q.window(DEFAULT_FEED_LIMIT);
    let viewer_id = viewer.user.as_ref().map(|u| u.id.as_str());
    let posts = feed::list_all(&db, viewer_id, skip, limit).await?;
    Ok(HttpResponse::Ok().json(posts))
}

pub async fn get_feed(
    db: web::Data<Db>,
    user: AuthUser,
    q: web::Query<PageQuery>,
) -> Result<HttpResponse, ApiError> {
    let (skip, limit) = q.window(DEFAULT_FEED_LIMIT);
    let posts = feed::list_following(&db, &user.user.id, skip, limit).await?;
    Ok(HttpResponse::Ok().json(posts))
}

pub async fn get_post(
    db: web::Data<Db>,
    viewer: MaybeUser,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let viewer_id = viewer.user.as_ref().map(|u| u.id.as_str());
    let view = content::get_post(&db, &path.into_inner(), viewer_id).await?;
    Ok(HttpResponse::Ok().json(view))
}

pub async fn update_post(
    db: web::Data<Db>,
    store: web::Data<MediaStore>,
    user: AuthUser,
    path: web::Path<String>,
    body: web::Json<PostPatch>,
) -> Result<HttpResponse, ApiError> {
    let (post, dropped) = content::update_post(&db, &path.into_inner(), &user.user, body.into_inner()).await?;
    if let Some(image) = dropped {
        store.delete(&image);
    }
    let view = content::get_post(&db, &post.id, Some(&user.user.id)).await?;
    Ok(HttpResponse::Ok().json(view))
}

pub async fn delete_post(
    db: web::Data<Db>,
    store: web::Data<MediaStore>,
    user: AuthUser,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let image = content::delete_post(&db, &path.into_inner(), &user.user).await?;
    if let Some(image) = image {
        store.delete(&image);
    }
    Ok(HttpResponse::Ok().json(serde_json::json!({ "status": "success" })))
}

pub async fn upload_post_image(
    cfg: web::Data<Config>,
    db: web::Data<Db>,
    store: web::Data<MediaStore>,
    user: AuthUser,
    path: web::Path<String>,
    payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let post_id = path.into_inner();
    // Checked before reading the upload; set_post_image checks again in its transaction.
    content::owned_post(&db, &post_id, &user.user).await?;

    let upload = media::read_upload(payload, store.max_size).await?;
    let name = media::store_blocking(&store, upload, cfg.post_image_max_dimension).await?;

    let (post, previous) = match content::set_post_image(&db, &post_id, &user.user, &name).await {
        Ok(res) => res,
        Err(e) => {
            store.delete(&name);
            return Err(e);
        }
    };
    if let Some(prev) = previous.filter(|p| *p != name) {
        store.delete(&prev);
    }
    let view = content::get_post(&db, &post.id, Some(&user.user.id)).await?;
    Ok(HttpResponse::Ok().json(view))
}

pub async fn like_post(
    db: web::Data<Db>,
    user: AuthUser,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let post_id = path.into_inner();
    content::like(&db, &post_id, &user.user).await?;
    let view = content::get_post(&db, &post_id, Some(&user.user.id)).await?;
    Ok(HttpResponse::Ok().json(view))
}

pub async fn unlike_post(
    db: web::Data<Db>,
    user: AuthUser,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let post_id = path.into_inner();
    content::unlike(&db, &post_id, &user.user).await?;
    let view = content::get_post(&db, &post_id, Some(&user.user.id)).await?;
    Ok(HttpResponse::Ok().json(view))
}

#[derive(Deserialize)]
pub struct CreateCommentReq {
    pub content: String,
}

pub async fn create_comment(
    db: web::Data<Db>,
    user: AuthUser,
    path: web::Path<String>,
    body: web::Json<CreateCommentReq>,
) -> Result<HttpResponse, ApiError> {
    let comment = content::create_comment(&db, &path.into_inner(), &user.user, &body.content).await?;
    Ok(HttpResponse::Created().json(comment))
}

pub async fn list_comments(
    db: web::Data<Db>,
    path: web::Path<String>,
    q: web::Query<PageQuery>,
) -> Result<HttpResponse, ApiError> {
    let (skip, limit) = q.window(DEFAULT_COMMENT_LIMIT);
    let comments = content::list_comments(&db, &path.into_inner(), skip, limit).await?;
    Ok(HttpResponse::Ok().json(comments))
}
