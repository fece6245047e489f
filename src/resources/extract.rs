use std::marker::PhantomData;

use axum::{
    async_trait,
    extract::{
        rejection::{JsonRejection, PathRejection},
        FromRequest, FromRequestParts, Multipart, Request,
    },
    http::header::CONTENT_TYPE,
};
use serde::de::DeserializeOwned;

use super::upload::Upload;
use crate::error::AppError;

/// `Json<T>` whose rejections render as the 400 error envelope.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

/// `Path<T>`; a malformed id is a 400 envelope instead of a plain-text reply.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

/// Names the multipart part that carries the uploaded file.
pub trait FileField: Send {
    const NAME: &'static str;
}

#[derive(Debug)]
pub struct ImageField;

impl FileField for ImageField {
    const NAME: &'static str = "image";
}

#[derive(Debug)]
pub struct ResumeField;

impl FileField for ResumeField {
    const NAME: &'static str = "resume";
}

/// A request body that is either plain JSON, or `multipart/form-data` with a
/// `data` part holding the JSON document plus at most one file part named
/// by `F`.
#[derive(Debug)]
pub struct WithFile<T, F = ImageField> {
    pub data: T,
    pub file: Option<Upload>,
    field: PhantomData<F>,
}

fn is_multipart(req: &Request) -> bool {
    req.headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map_or(false, |ct| ct.starts_with("multipart/form-data"))
}

#[async_trait]
impl<T, F, S> FromRequest<S> for WithFile<T, F>
where
    T: DeserializeOwned + Send,
    F: FileField,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if !is_multipart(&req) {
            let ApiJson(data) = ApiJson::<T>::from_request(req, state).await?;
            return Ok(Self {
                data,
                file: None,
                field: PhantomData,
            });
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| AppError::validation(e.body_text()))?;

        let mut data: Option<T> = None;
        let mut file: Option<Upload> = None;
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::validation(e.body_text()))?
        {
            let name = field.name().unwrap_or_default().to_string();
            if name == "data" {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::validation(e.body_text()))?;
                let parsed = serde_json::from_str(&text)
                    .map_err(|e| AppError::validation(format!("Invalid data part: {e}")))?;
                data = Some(parsed);
            } else if let Some(file_name) = field.file_name().map(str::to_string) {
                if name != F::NAME {
                    return Err(AppError::validation(format!(
                        "Unexpected file field: {name}, expected {}",
                        F::NAME
                    )));
                }
                if file.is_some() {
                    return Err(AppError::validation(format!(
                        "Only one {} file may be uploaded",
                        F::NAME
                    )));
                }
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::validation(e.body_text()))?;
                file = Some(Upload {
                    field: name,
                    file_name,
                    content_type,
                    bytes,
                });
            }
        }

        let data = match data {
            Some(data) => data,
            None => serde_json::from_str("{}")
                .map_err(|e| AppError::validation(format!("Missing data part: {e}")))?,
        };
        Ok(Self {
            data,
            file,
            field: PhantomData,
        })
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use serde::Deserialize;

    use super::*;

    const BOUNDARY: &str = "folio-boundary";

    #[derive(Debug, Default, Deserialize)]
    #[serde(default)]
    struct Form {
        title: Option<String>,
    }

    fn file_part(name: &str, file_name: &str, body: &str) -> String {
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: image/png\r\n\r\n{body}\r\n"
        )
    }

    fn data_part(json: &str) -> String {
        format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"data\"\r\n\r\n{json}\r\n")
    }

    fn multipart(parts: &[String]) -> Request {
        let body = format!("{}--{BOUNDARY}--\r\n", parts.concat());
        Request::builder()
            .method("POST")
            .uri("/")
            .header(CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn reads_data_and_expected_file() {
        let req = multipart(&[
            data_part(r#"{"title":"Folio"}"#),
            file_part("image", "cover.png", "png-bytes"),
        ]);
        let body = WithFile::<Form>::from_request(req, &()).await.unwrap();
        assert_eq!(body.data.title.as_deref(), Some("Folio"));
        let file = body.file.unwrap();
        assert_eq!(file.field, "image");
        assert_eq!(file.file_name, "cover.png");
        assert_eq!(file.content_type, "image/png");
        assert_eq!(&file.bytes[..], b"png-bytes");
    }

    #[tokio::test]
    async fn rejects_file_under_another_name() {
        let req = multipart(&[file_part("avatar", "me.png", "x")]);
        let err = WithFile::<Form>::from_request(req, &()).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(err.to_string(), "Unexpected file field: avatar, expected image");

        let req = multipart(&[file_part("image", "cv.pdf", "x")]);
        let err = WithFile::<Form, ResumeField>::from_request(req, &())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Unexpected file field: image, expected resume");
    }

    #[tokio::test]
    async fn rejects_a_second_file() {
        let req = multipart(&[
            file_part("image", "a.png", "first"),
            file_part("image", "b.png", "second"),
        ]);
        let err = WithFile::<Form>::from_request(req, &()).await.unwrap_err();
        assert_eq!(err.to_string(), "Only one image file may be uploaded");
    }

    #[tokio::test]
    async fn plain_json_has_no_file() {
        let req = Request::builder()
            .method("POST")
            .uri("/")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"title":"Plain"}"#))
            .unwrap();
        let body = WithFile::<Form>::from_request(req, &()).await.unwrap();
        assert_eq!(body.data.title.as_deref(), Some("Plain"));
        assert!(body.file.is_none());
    }
}
