//! Multipart form collection for the upload-bearing endpoints.

use axum::extract::Multipart;
use std::collections::HashMap;

use super::error::ApiError;

#[derive(Default)]
pub struct UploadForm {
    texts: HashMap<String, String>,
    files: HashMap<String, Vec<u8>>,
}

impl UploadForm {
    pub async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = UploadForm::default();
        while let Some(field) = multipart.next_field().await.map_err(|err| {
            ApiError::InvalidArgument(format!("Malformed multipart body: {}", err))
        })? {
            let name = match field.name() {
                Some(name) => name.to_string(),
                None => continue,
            };
            if field.file_name().is_some() {
                let bytes = field.bytes().await.map_err(|err| {
                    ApiError::InvalidArgument(format!("Malformed multipart body: {}", err))
                })?;
                form.files.insert(name, bytes.to_vec());
            } else {
                let text = field.text().await.map_err(|err| {
                    ApiError::InvalidArgument(format!("Malformed multipart body: {}", err))
                })?;
                form.texts.insert(name, text);
            }
        }
        Ok(form)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.texts.get(name).map(|s| s.as_str())
    }

    /// A file field's bytes; empty uploads count as absent.
    pub fn file(&self, name: &str) -> Option<&[u8]> {
        self.files
            .get(name)
            .map(|bytes| bytes.as_slice())
            .filter(|bytes| !bytes.is_empty())
    }
}
