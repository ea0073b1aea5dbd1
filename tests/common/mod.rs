#![allow(dead_code)]

use actix_http::Request;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::http::{StatusCode, header};
use actix_web::web::Data;
use actix_web::{App, test};
use image::{ImageFormat, RgbImage};
use murmur::config::Config;
use murmur::db::Db;
use murmur::media::MediaStore;
use serde_json::{Value, json};
use std::io::Cursor;

pub const PASSWORD: &str = "correct horse";
const BOUNDARY: &str = "murmur-test-boundary";

/// Config, database and media dir for one test, all under a temp dir.
pub struct TestEnv {
    pub cfg: Config,
    pub db: Db,
    pub store: MediaStore,
    _dir: tempfile::TempDir,
}

impl TestEnv {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config {
            database_path: dir.path().join("test.sqlite3").to_string_lossy().into_owned(),
            media_dir: dir.path().join("media").to_string_lossy().into_owned(),
            jwt_secret: Some("integration-secret".into()),
            ..Config::default()
        };
        let db = Db::connect_and_migrate(&cfg.database_path).await.unwrap();
        let store = MediaStore::new(&cfg);
        Self { cfg, db, store, _dir: dir }
    }

    pub async fn app(&self) -> impl Service<Request, Response = ServiceResponse, Error = actix_web::Error> {
        test::init_service(
            App::new()
                .app_data(Data::new(self.cfg.clone()))
                .app_data(Data::new(self.db.clone()))
                .app_data(Data::new(self.store.clone()))
                .configure(murmur::configure),
        )
        .await
    }
}

/// Sends `req` and returns the status with the body parsed as JSON (`Null` when empty).
pub async fn send<S>(app: &S, req: test::TestRequest) -> (StatusCode, Value)
where
    S: Service<Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    let resp = test::call_service(app, req.to_request()).await;
    let status = resp.status();
    let body = test::read_body(resp).await;
    let value = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or(Value::Null)
    };
    (status, value)
}

pub fn authed(req: test::TestRequest, token: &str) -> test::TestRequest {
    req.insert_header((header::AUTHORIZATION, format!("Bearer {token}")))
}

pub async fn register<S>(app: &S, username: &str) -> Value
where
    S: Service<Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    let (status, body) = send(
        app,
        test::TestRequest::post().uri("/api/v1/auth/register").set_json(json!({
            "email": format!("{username}@example.com"),
            "username": username,
            "password": PASSWORD,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body
}

pub async fn login<S>(app: &S, identifier: &str) -> String
where
    S: Service<Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    let (status, body) = send(
        app,
        test::TestRequest::post().uri("/api/v1/auth/login").set_json(json!({
            "username_or_email": identifier,
            "password": PASSWORD,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["access_token"].as_str().unwrap().to_string()
}

/// Registers `username` and returns a bearer token for them.
pub async fn signup<S>(app: &S, username: &str) -> String
where
    S: Service<Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    register(app, username).await;
    login(app, username).await
}

pub async fn create_post<S>(app: &S, token: &str, content: &str) -> Value
where
    S: Service<Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    let (status, body) = send(
        app,
        authed(test::TestRequest::post().uri("/api/v1/posts"), token).set_json(json!({ "content": content })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, image::Rgb([10, 120, 200]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

/// A single-file multipart request body.
pub fn multipart(req: test::TestRequest, content_type: &str, data: &[u8]) -> test::TestRequest {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(b"Content-Disposition: form-data; name=\"file\"; filename=\"upload\"\r\n");
    body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    req.insert_header((header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}")))
        .set_payload(body)
}
