//! Object storage for rendered images.
//!
//! Provider image URLs expire within hours, so saved designs copy each render
//! into the bucket under `designs/{design_id}/{view}.png`.

use aws_sdk_s3::primitives::ByteStream;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::openai_client::OpenAiClient;

pub fn image_key(design_id: Uuid, view: &str) -> String {
    format!("designs/{design_id}/{view}.png")
}

/// Path-style public URL for an object in the bucket.
pub fn public_url(endpoint: &str, bucket: &str, key: &str) -> String {
    format!("{}/{bucket}/{key}", endpoint.trim_end_matches('/'))
}

/// Downloads a render from the provider and uploads it to the bucket. Returns the object key.
pub async fn persist_image(
    openai: &OpenAiClient,
    s3: &aws_sdk_s3::Client,
    bucket: &str,
    design_id: Uuid,
    view: &str,
    source_url: &str,
) -> Result<String, AppError> {
    let bytes = openai.fetch_image(source_url).await?;
    let key = image_key(design_id, view);

    s3.put_object()
        .bucket(bucket)
        .key(&key)
        .body(ByteStream::from(bytes))
        .content_type("image/png")
        .send()
        .await
        .map_err(|e| AppError::Storage(format!("upload of {key} failed: {e}")))?;

    info!("Uploaded design image to s3://{}/{}", bucket, key);
    Ok(key)
}

/// Removes stored images. Failures are logged, never returned: the rows are already gone.
pub async fn delete_images(s3: &aws_sdk_s3::Client, bucket: &str, keys: &[String]) {
    for key in keys {
        if let Err(e) = s3.delete_object().bucket(bucket).key(key).send().await {
            warn!("Failed to delete s3://{}/{}: {e}", bucket, key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_key_layout() {
        let id = Uuid::nil();
        assert_eq!(
            image_key(id, "front"),
            "designs/00000000-0000-0000-0000-000000000000/front.png"
        );
    }

    #[test]
    fn test_public_url_trims_trailing_slash() {
        assert_eq!(
            public_url("https://storage.example.com/", "renders", "designs/a/front.png"),
            "https://storage.example.com/renders/designs/a/front.png"
        );
    }
}
