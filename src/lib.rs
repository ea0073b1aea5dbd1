pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod media;
pub mod models;
pub mod patch;
pub mod routes;
pub mod social;

use actix_web::web;
use crate::routes::{auth as auth_routes, health, media as media_routes, posts as posts_routes, users as users_routes};

/// Registers every route. Expects `Data<Config>`, `Data<Db>` and `Data<MediaStore>` in app data.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health::health_check))
        .route("/media/{name}", web::get().to(media_routes::get_media))
        .service(
            web::scope("/api/v1")
                .service(web::scope("/auth")
                    .route("/register", web::post().to(auth_routes::register))
                    .route("/login", web::post().to(auth_routes::login))
                )
                .service(web::scope("/users")
                    .route("/me", web::get().to(users_routes::me))
                    .route("/me", web::put().to(users_routes::update_me))
                    .route("/me/profile-picture", web::post().to(users_routes::upload_profile_picture))
                    .route("/{username}", web::get().to(users_routes::get_user))
                    .route("/{username}/follow", web::post().to(users_routes::follow))
                    .route("/{username}/unfollow", web::delete().to(users_routes::unfollow))
                )
                .service(web::scope("/posts")
                    .route("", web::post().to(posts_routes::create_post))
                    .route("", web::get().to(posts_routes::list_posts))
                    .route("/feed", web::get().to(posts_routes::get_feed))
                    .route("/{id}", web::get().to(posts_routes::get_post))
                    .route("/{id}", web::put().to(posts_routes::update_post))
                    .route("/{id}", web::delete().to(posts_routes::delete_post))
                    .route("/{id}/image", web::post().to(posts_routes::upload_post_image))
                    .route("/{id}/like", web::post().to(posts_routes::like_post))
                    .route("/{id}/unlike", web::delete().to(posts_routes::unlike_post))
                    .route("/{id}/comments", web::post().to(posts_routes::create_comment))
                    .route("/{id}/comments", web::get().to(posts_routes::list_comments))
                )
        );
}
