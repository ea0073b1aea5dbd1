use crate::config::Config;
use crate::errors::ApiError;
use crate::patch::Patch;
use actix_multipart::Field;
use futures_util::TryStreamExt as _;
use image::ImageFormat;
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// Decodes uploaded images, shrinks them to a bounding box and keeps them on disk as JPEG.
#[derive(Clone)]
pub struct MediaStore {
    pub media_dir: PathBuf,
    pub allowed_types: Vec<String>,
    pub max_size: usize,
}

impl MediaStore {
    pub fn new(cfg: &Config) -> Self {
        Self {
            media_dir: PathBuf::from(&cfg.media_dir),
            allowed_types: cfg.allowed_image_types.clone(),
            max_size: cfg.max_image_size,
        }
    }

    fn is_allowed(&self, mime: &str) -> bool {
        self.allowed_types.iter().any(|t| t.eq_ignore_ascii_case(mime))
    }

    /// Validates, resizes to fit `max_dimension` and writes the image. Returns the stored file name.
    /// Every failure here, disk included, is `InvalidMedia`.
    pub fn store(&self, data: &[u8], declared_type: Option<&str>, max_dimension: u32) -> Result<String, ApiError> {
        let declared = declared_type.ok_or_else(|| ApiError::InvalidMedia("missing content type".into()))?;
        if !self.is_allowed(declared) {
            return Err(ApiError::InvalidMedia(format!("unsupported content type {declared}")));
        }
        if data.len() > self.max_size {
            return Err(ApiError::InvalidMedia("image too large".into()));
        }
        match infer::get(data) {
            Some(kind) if self.is_allowed(kind.mime_type()) => {}
            _ => return Err(ApiError::InvalidMedia("content does not match an allowed image type".into())),
        }

        let img = image::load_from_memory(data)
            .map_err(|_| ApiError::InvalidMedia("could not process image".into()))?;
        let img = if img.width() > max_dimension || img.height() > max_dimension {
            img.thumbnail(max_dimension, max_dimension)
        } else {
            img
        };

        // JPEG has no alpha channel.
        let mut jpeg = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img.to_rgb8())
            .write_to(&mut jpeg, ImageFormat::Jpeg)
            .map_err(|_| ApiError::InvalidMedia("could not process image".into()))?;

        if !self.media_dir.exists() {
            std::fs::create_dir_all(&self.media_dir).map_err(|e| {
                log::error!("create media dir {}: {e}", self.media_dir.display());
                ApiError::InvalidMedia("could not save image".into())
            })?;
        }
        let name = format!("{}.jpg", uuid::Uuid::new_v4());
        std::fs::write(self.media_dir.join(&name), jpeg.into_inner()).map_err(|e| {
            log::error!("write media {name}: {e}");
            ApiError::InvalidMedia("could not save image".into())
        })?;
        Ok(name)
    }

    /// Best-effort removal; failures are logged and otherwise ignored.
    pub fn delete(&self, reference: &str) {
        let Some(path) = self.resolve(reference) else {
            log::warn!("refusing to delete media outside the media dir: {reference}");
            return;
        };
        match std::fs::remove_file(&path) {
            Ok(()) => log::debug!("deleted media {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("could not delete media {}: {e}", path.display()),
        }
    }

    /// Maps a stored reference to its path, rejecting anything that is not a bare file name.
    pub fn resolve(&self, reference: &str) -> Option<PathBuf> {
        let p = Path::new(reference);
        let name = p.file_name()?;
        if p.components().count() != 1 || name != p.as_os_str() {
            return None;
        }
        Some(self.media_dir.join(name))
    }
}

/// Image references are minted only by `MediaStore::store`. A client may clear one, never name one.
pub fn reject_client_reference(patch: &Patch<Option<String>>, field: &str) -> Result<(), ApiError> {
    match patch {
        Patch::Set(Some(_)) => Err(ApiError::BadRequest(format!("{field} can only be set by uploading an image"))),
        _ => Ok(()),
    }
}

pub struct Upload {
    pub data: Vec<u8>,
    pub content_type: Option<String>,
}

/// Reads the first file part of a multipart body, stopping once it exceeds `max_size`.
pub async fn read_upload(mut payload: actix_multipart::Multipart, max_size: usize) -> Result<Upload, ApiError> {
    let field = payload
        .try_next()
        .await
        .map_err(|_| ApiError::BadRequest("invalid multipart".into()))?
        .ok_or(ApiError::BadRequest("no file part".into()))?;
    read_field(field, max_size).await
}

/// Runs `MediaStore::store` on actix's blocking thread pool.
pub async fn store_blocking(
    store: &actix_web::web::Data<MediaStore>,
    upload: Upload,
    max_dimension: u32,
) -> Result<String, ApiError> {
    let store = store.clone();
    actix_web::web::block(move || store.store(&upload.data, upload.content_type.as_deref(), max_dimension))
        .await
        .map_err(|_| ApiError::Internal)?
}

async fn read_field(mut field: Field, max_size: usize) -> Result<Upload, ApiError> {
    let content_type = field.content_type().map(|m| m.essence_str().to_string());
    let mut data: Vec<u8> = Vec::new();
    while let Some(chunk) = field
        .try_next()
        .await
        .map_err(|_| ApiError::BadRequest("upload read error".into()))?
    {
        data.extend_from_slice(&chunk);
        if data.len() > max_size {
            return Err(ApiError::InvalidMedia("image too large".into()));
        }
    }
    Ok(Upload { data, content_type })
}
