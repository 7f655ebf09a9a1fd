use std::fmt;

use snaplearn_utils::formatting::{mime_for_file_name, normalize_mime};
use thiserror::Error;

/// A file as received from the upload control.
#[derive(Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Image bytes tagged with their MIME type, ready to be sent to the model.
#[derive(Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IntakeError {
    #[error("no image was uploaded")]
    MissingImage,
    #[error("`{file_name}` is not a jpg, jpeg or png image")]
    UnsupportedType { file_name: String },
}

impl fmt::Debug for UploadedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadedFile")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl fmt::Debug for ImagePayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImagePayload")
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Package an uploaded image for the model.
///
/// Only the upload control's file-type filter is enforced here; image integrity
/// and size are left to the remote service.
pub fn intake_image(upload: Option<UploadedFile>) -> Result<ImagePayload, IntakeError> {
    let Some(upload) =
        upload.filter(|file| !(file.file_name.trim().is_empty() && file.bytes.is_empty()))
    else {
        return Err(IntakeError::MissingImage);
    };

    let Some(extension_mime) = mime_for_file_name(&upload.file_name) else {
        return Err(IntakeError::UnsupportedType {
            file_name: upload.file_name,
        });
    };

    let mime_type = upload
        .content_type
        .as_deref()
        .map(normalize_mime)
        .filter(|mime| mime.starts_with("image/"))
        .unwrap_or_else(|| extension_mime.to_owned());

    Ok(ImagePayload {
        mime_type,
        bytes: upload.bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::{IntakeError, UploadedFile, intake_image};

    fn upload(file_name: &str, content_type: Option<&str>, bytes: &[u8]) -> UploadedFile {
        UploadedFile {
            file_name: file_name.to_owned(),
            content_type: content_type.map(str::to_owned),
            bytes: bytes.to_vec(),
        }
    }

    #[test]
    fn missing_upload_is_rejected() {
        assert_eq!(intake_image(None), Err(IntakeError::MissingImage));
        assert_eq!(
            intake_image(Some(upload("", Some("application/octet-stream"), b""))),
            Err(IntakeError::MissingImage)
        );
    }

    #[test]
    fn declared_type_and_bytes_are_kept() {
        let payload = intake_image(Some(upload("photo.jpg", Some("image/jpeg"), b"\xff\xd8data")))
            .unwrap();
        assert_eq!(payload.mime_type, "image/jpeg");
        assert_eq!(payload.bytes, b"\xff\xd8data".to_vec());
    }

    #[test]
    fn generic_declared_type_falls_back_to_extension() {
        let payload =
            intake_image(Some(upload("chart.PNG", Some("application/octet-stream"), b"png")))
                .unwrap();
        assert_eq!(payload.mime_type, "image/png");

        let payload = intake_image(Some(upload("photo.jpeg", None, b"jpg"))).unwrap();
        assert_eq!(payload.mime_type, "image/jpeg");
    }

    #[test]
    fn unaccepted_extensions_are_rejected() {
        assert_eq!(
            intake_image(Some(upload("anim.gif", Some("image/gif"), b"gif"))),
            Err(IntakeError::UnsupportedType {
                file_name: "anim.gif".to_owned()
            })
        );
    }

    #[test]
    fn image_integrity_is_not_checked() {
        let payload = intake_image(Some(upload("broken.png", Some("image/png"), b"not a png")));
        assert!(payload.is_ok());
    }
}
