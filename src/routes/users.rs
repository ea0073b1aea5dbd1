use crate::{
    auth::AuthUser,
    config::Config,
    db::Db,
    errors::ApiError,
    media::{self, MediaStore},
    models::user::PublicUser,
    social::identity::{self, ProfilePatch},
};
use actix_multipart::Multipart;
use actix_web::{HttpResponse, web};

pub async fn me(user: AuthUser) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(PublicUser::from(user.user)))
}

pub async fn update_me(
    db: web::Data<Db>,
    store: web::Data<MediaStore>,
    user: AuthUser,
    body: web::Json<ProfilePatch>,
) -> Result<HttpResponse, ApiError> {
    let (updated, dropped) = identity::update_profile(&db, &user.user.id, body.into_inner()).await?;
    if let Some(picture) = dropped {
        store.delete(&picture);
    }
    Ok(HttpResponse::Ok().json(PublicUser::from(updated)))
}

pub async fn upload_profile_picture(
    cfg: web::Data<Config>,
    db: web::Data<Db>,
    store: web::Data<MediaStore>,
    user: AuthUser,
    payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let upload = media::read_upload(payload, store.max_size).await?;
    let name = media::store_blocking(&store, upload, cfg.profile_picture_max_dimension).await?;

    let (updated, previous) = match identity::set_profile_picture(&db, &user.user.id, &name).await {
        Ok(res) => res,
        Err(e) => {
            store.delete(&name);
            return Err(e);
        }
    };
    if let Some(prev) = previous.filter(|p| *p != name) {
        store.delete(&prev);
    }
    Ok(HttpResponse::Ok().json(PublicUser::from(updated)))
}

pub async fn get_user(
    db: web::Data<Db>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let profile = identity::get_profile(&db, &path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(profile))
}

pub async fn follow(
    db: web::Data<Db>,
    user: AuthUser,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let target = identity::follow(&db, &user.user, &path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(PublicUser::from(target)))
}

pub async fn unfollow(
    db: web::Data<Db>,
    user: AuthUser,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let target = identity::unfollow(&db, &user.user, &path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(PublicUser::from(target)))
}
