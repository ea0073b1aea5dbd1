use crate::{auth, config::Config, db::Db, errors::ApiError, models::user::PublicUser, social::identity};
use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
pub struct RegisterReq {
    pub email: String,
    pub username: String,
    pub full_name: Option<String>,
    pub password: String,
}

#[derive(Serialize, Deserialize)]
pub struct TokenResp {
    pub access_token: String,
    pub token_type: String,
}

pub async fn register(
    db: web::Data<Db>,
    body: web::Json<RegisterReq>,
) -> Result<HttpResponse, ApiError> {
    let user = identity::register(
        &db,
        body.email.trim(),
        body.username.trim(),
        body.full_name.as_deref(),
        &body.password,
    )
    .await?;
    Ok(HttpResponse::Created().json(PublicUser::from(user)))
}

#[derive(Deserialize)]
pub struct LoginReq {
    pub username_or_email: String,
    pub password: String,
}

pub async fn login(
    cfg: web::Data<Config>,
    db: web::Data<Db>,
    body: web::Json<LoginReq>,
) -> Result<HttpResponse, ApiError> {
    let user = identity::authenticate(&db, body.username_or_email.trim(), &body.password).await?;
    let access_token = auth::create_access_token(&user.id, cfg.access_token_ttl(), &cfg)?;
    Ok(HttpResponse::Ok().json(TokenResp {
        access_token,
        token_type: "bearer".into(),
    }))
}
