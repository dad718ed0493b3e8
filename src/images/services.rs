use anyhow::Context;
use bytes::Bytes;
use tracing::warn;
use uuid::Uuid;

use crate::state::AppState;

/// Presigned profile image links stay valid this long.
const PRESIGN_TTL_SECS: u64 = 30 * 60;

pub struct UploadItem {
    pub body: Bytes,
    pub content_type: String,
}

/// File extension for accepted image types; `None` means the upload is refused.
pub fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/heic" => Some("heic"),
        _ => None,
    }
}

/// Store a profile image and return its object key.
pub async fn upload_profile_image(
    st: &AppState,
    user_id: Uuid,
    image: UploadItem,
) -> anyhow::Result<String> {
    let ext = ext_from_mime(&image.content_type)
        .with_context(|| format!("unsupported image type {}", image.content_type))?;
    let key = format!("profiles/{}/{}.{}", user_id, Uuid::new_v4(), ext);
    st.storage
        .put_object(&key, image.body, &image.content_type)
        .await
        .with_context(|| format!("put_object {}", key))?;
    Ok(key)
}

/// Best-effort removal of a stored image.
pub async fn discard_image(st: &AppState, key: &str) {
    if let Err(e) = st.storage.delete_object(key).await {
        warn!(error = %e, key, "failed to delete profile image");
    }
}

/// Link for a stored image; `None` (and a warning) if presigning fails.
pub async fn presign_image(st: &AppState, key: &str) -> Option<String> {
    match st.storage.presign_get(key, PRESIGN_TTL_SECS).await {
        Ok(url) => Some(url),
        Err(e) => {
            warn!(error = %e, key, "presign profile image failed");
            None
        }
    }
}
