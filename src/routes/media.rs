use crate::{errors::ApiError, media::MediaStore};
use actix_web::{HttpRequest, HttpResponse, web};

pub async fn get_media(
    store: web::Data<MediaStore>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let name = path.into_inner();
    let p = store.resolve(&name).ok_or(ApiError::NotFound)?;
    if !p.exists() {
        return Err(ApiError::NotFound);
    }

    let named = actix_files::NamedFile::open_async(p)
        .await
        .map_err(|_| ApiError::Internal)?
        .use_last_modified(true);
    Ok(named.into_response(&req))
}
