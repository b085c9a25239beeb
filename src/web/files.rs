//! Evidence file upload.
//!
//! Staff upload attachments and report documents here before referencing
//! them from answers and decisions. Files land in the storage backend
//! under a generated name and are served back from the public route.

use crate::middleware::ClientCtx;
use crate::storage::StorageBackend;
use actix_multipart::Multipart;
use actix_web::{error, post, web, Error, HttpResponse};
use futures_util::TryStreamExt;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(upload_file);
}

/// Keep the uploaded extension so served files open with the right viewer.
fn extension_of(filename: &str) -> Option<&str> {
    filename.rsplit_once('.').map(|(_, ext)| ext)
}

#[post("/files")]
async fn upload_file(
    client: ClientCtx,
    storage: web::Data<dyn StorageBackend>,
    mut payload: Multipart,
) -> Result<HttpResponse, Error> {
    client.require_actor()?;

    let max_bytes = crate::app_config::limits().max_upload_size_mb as usize * 1024 * 1024;

    while let Some(mut field) = payload.try_next().await? {
        if field.name() != "file" {
            continue;
        }

        let original_name = field
            .content_disposition()
            .get_filename()
            .map(str::to_string)
            .unwrap_or_default();

        let data = super::read_field_bytes(&mut field, max_bytes).await?;
        if data.is_empty() {
            return Err(error::ErrorBadRequest("Uploaded file is empty"));
        }

        let stored_name = match extension_of(&original_name) {
            Some(ext) => format!("{}.{}", uuid::Uuid::new_v4(), ext),
            None => uuid::Uuid::new_v4().to_string(),
        };

        let reference = storage
            .put_object(data, &stored_name)
            .await
            .map_err(error::ErrorInternalServerError)?;

        let public_route = crate::app_config::storage().public_route;

        return Ok(HttpResponse::Ok().json(serde_json::json!({
            "file_path": reference,
            "url": format!("{}/{}", public_route, reference),
        })));
    }

    Err(error::ErrorBadRequest("No file field in upload"))
}
