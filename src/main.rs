use actix_cors::Cors;
use actix_web::{App, HttpServer};
use actix_web::middleware::Logger;
use actix_web::http::header;
use actix_web::web::Data;
use env_logger::Env;
use murmur::config::Config;
use murmur::db::Db;
use murmur::media::MediaStore;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Init logger to show info by default, but can be overridden by RUST_LOG
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let cfg = Config::from_env_config()?;

    let db = Db::connect_and_migrate(&cfg.database_path).await?;
    let media = Data::new(MediaStore::new(&cfg));
    log::info!("Starting server at {}", cfg.listen);

    let listen_addr = cfg.listen.clone();
    HttpServer::new(move || {
        let mut cors = if cfg.allowed_origins.iter().any(|o| o == "*") {
            Cors::permissive()
        } else {
            Cors::default()
        };
        for origin in cfg.allowed_origins.iter().filter(|o| o.as_str() != "*") {
            cors = cors.allowed_origin(origin);
        }
        let cors = cors
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE"])
            .allowed_headers(vec![header::AUTHORIZATION, header::ACCEPT, header::CONTENT_TYPE])
            .max_age(3600);

        App::new()
            .wrap(Logger::default())
            .wrap(cors)
            .app_data(Data::new(cfg.clone()))
            .app_data(Data::new(db.clone()))
            .app_data(media.clone())
            .configure(murmur::configure)
    })
    .bind(listen_addr)?
    .run()
    .await?;
    Ok(())
}
