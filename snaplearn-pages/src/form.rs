use axum::extract::Multipart;
use snaplearn_llm::UploadedFile;
use tracing::debug;

use crate::error::PageError;

pub const INPUT_FIELD: &str = "input";
pub const IMAGE_FIELD: &str = "image";

/// Fields of the submit form.
#[derive(Debug, Default)]
pub struct SubmitForm {
    pub input: String,
    pub image: Option<UploadedFile>,
}

pub async fn read_submit_form(mut multipart: Multipart) -> Result<SubmitForm, PageError> {
    let mut form = SubmitForm::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_owned();

        match name.as_str() {
            INPUT_FIELD => form.input = field.text().await?,
            IMAGE_FIELD => {
                let file_name = field.file_name().unwrap_or_default().to_owned();
                let content_type = field.content_type().map(str::to_owned);
                let bytes = field.bytes().await?;
                form.image = Some(UploadedFile {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            other => debug!(field = other, "ignoring unknown form field"),
        }
    }

    Ok(form)
}
