use std::io::Write;

use actix_multipart::Multipart;
use futures::{StreamExt, TryStreamExt};

use crate::error::ApiError;

pub const ALLOWED_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];
pub const MAX_FILE_SIZE: usize = 10 * 1024 * 1024;
pub const MAX_BATCH_FILES: usize = 10;

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid file type for {filename}. Allowed types: jpg, jpeg, png")]
    UnsupportedExtension { filename: String },
    #[error("File too large ({size} bytes). Maximum size: 10MB")]
    FileTooLarge { size: usize },
    #[error("Maximum {max} images allowed per batch request, got {count}", max = MAX_BATCH_FILES)]
    TooManyFiles { count: usize },
    #[error("No file field named `{0}` in the multipart payload")]
    MissingFile(&'static str),
}

/// An upload as received at the HTTP boundary, before any domain logic runs.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl UploadedImage {
    /// Extension check mirrors the declared filename only; the bytes are
    /// validated separately by the decoder.
    pub fn extension(&self) -> String {
        self.filename
            .rsplit('.')
            .next()
            .unwrap_or_default()
            .to_lowercase()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if !ALLOWED_EXTENSIONS.contains(&self.extension().as_str()) {
            return Err(ValidationError::UnsupportedExtension {
                filename: self.filename.clone(),
            });
        }
        if self.bytes.len() > MAX_FILE_SIZE {
            return Err(ValidationError::FileTooLarge {
                size: self.bytes.len(),
            });
        }
        Ok(())
    }
}

/// Drain every multipart field named `field_name` into memory.
pub async fn collect_uploads(
    mut payload: Multipart,
    field_name: &'static str,
) -> Result<Vec<UploadedImage>, ApiError> {
    let mut uploads = Vec::new();

    while let Some(mut field) = payload.try_next().await? {
        if field.name() != Some(field_name) {
            continue;
        }

        let filename = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .unwrap_or("upload")
            .to_string();
        let content_type = field.content_type().map(|mime| mime.to_string());

        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let data = chunk?;
            bytes.write_all(&data)?;
        }

        if !bytes.is_empty() {
            uploads.push(UploadedImage {
                filename,
                content_type,
                bytes,
            });
        }
    }

    Ok(uploads)
}

/// Extract the single upload expected by `POST /predict`.
pub async fn single_upload(
    payload: Multipart,
    field_name: &'static str,
) -> Result<UploadedImage, ApiError> {
    collect_uploads(payload, field_name)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| ValidationError::MissingFile(field_name).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(filename: &str, len: usize) -> UploadedImage {
        UploadedImage {
            filename: filename.to_string(),
            content_type: None,
            bytes: vec![0u8; len],
        }
    }

    #[test]
    fn accepts_allowed_extensions() {
        for name in ["cat.jpg", "dog.jpeg", "pet.png", "PET.PNG", "a.b.JPG"] {
            assert!(upload(name, 16).validate().is_ok(), "{name}");
        }
    }

    #[test]
    fn rejects_unsupported_extension() {
        for name in ["anim.gif", "img.bmp", "archive.tar.gz", "noextension"] {
            assert!(
                matches!(
                    upload(name, 16).validate(),
                    Err(ValidationError::UnsupportedExtension { .. })
                ),
                "{name}"
            );
        }
    }

    #[test]
    fn rejects_oversize_payload() {
        let result = upload("big.jpg", MAX_FILE_SIZE + 1).validate();
        assert!(matches!(result, Err(ValidationError::FileTooLarge { .. })));
    }

    #[test]
    fn exact_limit_is_allowed() {
        assert!(upload("edge.jpg", MAX_FILE_SIZE).validate().is_ok());
    }
}
