//! Form payloads and the multipart reader for the post form.

use axum::http::StatusCode;
use axum_extra::extract::Multipart;
use serde::Deserialize;
use tracing::error;

use crate::application::error::HttpError;
use crate::application::posts::{ImageUpload, PostInput};

const SOURCE: &str = "infra::http::forms";

#[derive(Debug, Deserialize)]
pub struct CommentForm {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SignupForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginQuery {
    pub next: Option<String>,
}

#[derive(Debug)]
pub enum PostFormReadError {
    InvalidFormData,
    PayloadTooLarge,
    Read { detail: String },
}

impl From<PostFormReadError> for HttpError {
    fn from(err: PostFormReadError) -> Self {
        match err {
            PostFormReadError::InvalidFormData => HttpError::new(
                SOURCE,
                StatusCode::BAD_REQUEST,
                "Invalid form data",
                "multipart form payload could not be parsed",
            ),
            PostFormReadError::PayloadTooLarge => HttpError::new(
                SOURCE,
                StatusCode::PAYLOAD_TOO_LARGE,
                "Uploaded file is too large",
                "multipart payload exceeded the configured body limit",
            ),
            PostFormReadError::Read { detail } => HttpError::new(
                SOURCE,
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to read form data",
                detail,
            ),
        }
    }
}

/// Drain the multipart stream of the post form into a `PostInput`.
/// Unknown fields are skipped; an image part without a filename or without
/// any bytes counts as "no image".
pub async fn read_post_form(multipart: &mut Multipart) -> Result<PostInput, PostFormReadError> {
    let mut input = PostInput::default();

    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => match field.name() {
                Some("text") => {
                    input.text = field
                        .text()
                        .await
                        .map_err(|_| PostFormReadError::InvalidFormData)?;
                }
                Some("group") => {
                    let value = field
                        .text()
                        .await
                        .map_err(|_| PostFormReadError::InvalidFormData)?
                        .trim()
                        .to_string();
                    if !value.is_empty() {
                        input.group = Some(value);
                    }
                }
                Some("image") => {
                    let filename = field
                        .file_name()
                        .map(|value| value.to_string())
                        .filter(|value| !value.trim().is_empty());
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|_| PostFormReadError::InvalidFormData)?;
                    if let Some(filename) = filename
                        && !bytes.is_empty()
                    {
                        input.image = Some(ImageUpload { filename, bytes });
                    }
                }
                _ => continue,
            },
            Ok(None) => break,
            Err(err) => {
                let status = err.status();
                error!(
                    target = SOURCE,
                    status = status.as_u16(),
                    error = %err,
                    "failed to read multipart payload"
                );
                return Err(match status {
                    StatusCode::PAYLOAD_TOO_LARGE => PostFormReadError::PayloadTooLarge,
                    StatusCode::BAD_REQUEST => PostFormReadError::InvalidFormData,
                    _ => PostFormReadError::Read {
                        detail: err.to_string(),
                    },
                });
            }
        }
    }

    Ok(input)
}
