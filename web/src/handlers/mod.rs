//! HTTP request handlers, one module per resource.

pub mod auth;
pub mod files;
pub mod health;
pub mod messages;
pub mod tickets;

use crate::error::AppError;
use axum::extract::Multipart;
use helpdesk_runtime::Upload;

/// Fields of a multipart form the helpdesk accepts.
#[derive(Debug, Default)]
pub(crate) struct UploadForm {
    pub text: Option<String>,
    pub file: Option<Upload>,
}

/// Read `text` and `file` parts, ignoring anything else.
///
/// A `file` part with neither a name nor content (what browsers send for an
/// empty file input) counts as no file.
pub(crate) async fn read_form(mut multipart: Multipart) -> Result<UploadForm, AppError> {
    let mut form = UploadForm::default();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("text") => form.text = Some(field.text().await?),
            Some("file") => {
                let filename = field.file_name().map(str::to_string);
                let bytes = field.bytes().await?;
                if filename.as_deref().is_some_and(|n| !n.is_empty()) || !bytes.is_empty() {
                    form.file = Some(Upload::new(filename, bytes.to_vec()));
                }
            }
            _ => {}
        }
    }
    Ok(form)
}
