//! Form bodies, multipart or urlencoded, flattened into one shape.
//!
//! URL query parameters are collected too and win over body fields of the
//! same name, so `POST /query?top_k=3` works alongside a form body.

use std::collections::HashMap;
use std::str::FromStr;

use axum::extract::{Form, FromRequest, Multipart, Query, Request};
use axum::http::header::CONTENT_TYPE;

use super::error::ApiError;
use crate::services::UploadedFile;

/// Text fields and uploaded files of a form submission.
#[derive(Debug, Default)]
pub struct FormFields {
    params: HashMap<String, String>,
    fields: HashMap<String, String>,
    files: Vec<UploadedFile>,
}

impl FormFields {
    /// Value of a field, URL parameter first, treating blank values as absent.
    pub fn get(&self, name: &str) -> Option<&str> {
        [&self.params, &self.fields].into_iter().find_map(|values| {
            values
                .get(name)
                .map(String::as_str)
                .filter(|v| !v.trim().is_empty())
        })
    }

    pub fn require(&self, name: &str) -> Result<&str, ApiError> {
        self.get(name)
            .ok_or_else(|| ApiError::bad_request(format!("missing required field: {name}")))
    }

    pub fn parse<T: FromStr>(&self, name: &str) -> Result<Option<T>, ApiError> {
        self.get(name)
            .map(|raw| {
                raw.trim()
                    .parse()
                    .map_err(|_| ApiError::bad_request(format!("invalid value for {name}: {raw}")))
            })
            .transpose()
    }

    pub fn files(&self) -> &[UploadedFile] {
        &self.files
    }
}

impl<S> FromRequest<S> for FormFields
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Query(params) = Query::<HashMap<String, String>>::try_from_uri(req.uri())
            .map_err(|e| ApiError::bad_request(e.body_text()))?;

        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("multipart/form-data"));

        if !is_multipart {
            let Form(fields) = Form::<HashMap<String, String>>::from_request(req, state)
                .await
                .map_err(|e| ApiError::bad_request(e.body_text()))?;
            return Ok(Self {
                params,
                fields,
                files: Vec::new(),
            });
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?;

        let mut form = Self {
            params,
            ..Self::default()
        };
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?
        {
            let name = field.name().unwrap_or_default().to_string();
            match field.file_name().map(str::to_string) {
                Some(filename) => {
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| ApiError::bad_request(e.body_text()))?;
                    form.files.push(UploadedFile::new(filename, bytes.to_vec()));
                }
                None => {
                    let text = field
                        .text()
                        .await
                        .map_err(|e| ApiError::bad_request(e.body_text()))?;
                    form.fields.insert(name, text);
                }
            }
        }

        Ok(form)
    }
}
