//! Admin backend transport.
//!
//! The engine talks to the backend only through the [`Transport`] trait.
//! [`HttpTransport`] is the reqwest implementation used in production;
//! tests script a fake.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::CatalogConfig;
use crate::error::TransportError;

// ---------------------------------------------------------------------------
// Multipart payload
// ---------------------------------------------------------------------------

/// One field of an outbound multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormValue {
    Text(String),
    File {
        file_name: String,
        mime: String,
        bytes: Vec<u8>,
    },
}

/// Ordered multipart body, independent of any HTTP library.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormPayload {
    fields: Vec<(String, FormValue)>,
}

impl FormPayload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&mut self, name: &str, value: impl Into<String>) -> &mut Self {
        self.fields
            .push((name.to_string(), FormValue::Text(value.into())));
        self
    }

    pub fn file(&mut self, name: &str, file_name: &str, mime: &str, bytes: Vec<u8>) -> &mut Self {
        self.fields.push((
            name.to_string(),
            FormValue::File {
                file_name: file_name.to_string(),
                mime: mime.to_string(),
                bytes,
            },
        ));
        self
    }

    pub fn get(&self, name: &str) -> Option<&FormValue> {
        self.fields.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn get_text(&self, name: &str) -> Option<&str> {
        match self.get(name)? {
            FormValue::Text(s) => Some(s),
            FormValue::File { .. } => None,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn has_file(&self) -> bool {
        self.fields
            .iter()
            .any(|(_, v)| matches!(v, FormValue::File { .. }))
    }

    pub fn names(&self) -> Vec<&str> {
        self.fields.iter().map(|(k, _)| k.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    fn into_form(self) -> Result<Form, TransportError> {
        let mut form = Form::new();
        for (name, value) in self.fields {
            form = match value {
                FormValue::Text(text) => form.text(name, text),
                FormValue::File {
                    file_name,
                    mime,
                    bytes,
                } => {
                    let part = Part::bytes(bytes)
                        .file_name(file_name)
                        .mime_str(&mime)
                        .map_err(|e| TransportError::Request(format!("invalid mime {mime}: {e}")))?;
                    form.part(name, part)
                }
            };
        }
        Ok(form)
    }
}

// ---------------------------------------------------------------------------
// Transport trait
// ---------------------------------------------------------------------------

/// Backend access used by the mutation coordinator and the store.
///
/// `path` includes the leading slash, e.g. `/category/create`. Each call
/// returns the parsed JSON body (`Value::Null` for an empty body).
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, path: &str) -> Result<Value, TransportError>;

    async fn post(&self, path: &str, body: FormPayload) -> Result<Value, TransportError>;

    async fn patch(&self, path: &str, body: FormPayload) -> Result<Value, TransportError>;

    async fn delete(&self, path: &str) -> Result<Value, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn get(&self, path: &str) -> Result<Value, TransportError> {
        (**self).get(path).await
    }

    async fn post(&self, path: &str, body: FormPayload) -> Result<Value, TransportError> {
        (**self).post(path, body).await
    }

    async fn patch(&self, path: &str, body: FormPayload) -> Result<Value, TransportError> {
        (**self).patch(path, body).await
    }

    async fn delete(&self, path: &str) -> Result<Value, TransportError> {
        (**self).delete(path).await
    }
}

// ---------------------------------------------------------------------------
// URL normalisation
// ---------------------------------------------------------------------------

/// Normalise the backend base URL:
/// - ensure a scheme is present (https, or http for localhost)
/// - strip trailing slashes
pub fn normalize_api_url(url: &str) -> String {
    let mut url = url.trim().to_string();

    if !url.starts_with("http://") && !url.starts_with("https://") {
        if url.starts_with("localhost") || url.starts_with("127.0.0.1") {
            url = format!("http://{url}");
        } else {
            url = format!("https://{url}");
        }
    }

    while url.ends_with('/') {
        url.pop();
    }

    url
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

fn map_reqwest_error(url: &str, err: &reqwest::Error) -> TransportError {
    if err.is_connect() {
        return TransportError::Connect(url.to_string());
    }
    if err.is_timeout() {
        return TransportError::Timeout(url.to_string());
    }
    if err.is_builder() {
        return TransportError::Request(format!("invalid backend URL {url}"));
    }
    TransportError::Request(format!("network error communicating with {url}: {err}"))
}

fn status_message(status: StatusCode) -> String {
    match status.as_u16() {
        400 => "Request rejected by backend".to_string(),
        401 => "Not authenticated".to_string(),
        403 => "Not authorized".to_string(),
        404 => "Backend endpoint not found".to_string(),
        s if s >= 500 => "Backend server error".to_string(),
        _ => "Unexpected response from backend".to_string(),
    }
}

/// Build a status error, preferring the backend's own `message`/`error`.
fn status_error(status: StatusCode, body_text: &str) -> TransportError {
    let message = serde_json::from_str::<Value>(body_text)
        .ok()
        .and_then(|json| {
            json.get("message")
                .or_else(|| json.get("error"))
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(ToString::to_string)
        })
        .unwrap_or_else(|| status_message(status));
    TransportError::Status {
        status: status.as_u16(),
        message,
    }
}

// ---------------------------------------------------------------------------
// HTTP transport
// ---------------------------------------------------------------------------

pub struct HttpTransport {
    client: Client,
    base_url: String,
    auth_token: Option<String>,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Request(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: normalize_api_url(base_url),
            auth_token: None,
        })
    }

    pub fn from_config(config: &CatalogConfig) -> Result<Self, TransportError> {
        let mut transport = Self::new(&config.api_url, config.timeout)?;
        transport.auth_token = config.auth_token.clone();
        Ok(transport)
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let req = self.client.request(method, url);
        match &self.auth_token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn send(&self, method: Method, path: &str, req: RequestBuilder) -> Result<Value, TransportError> {
        debug!(method = %method, path = %path, "backend request");
        let resp = req
            .send()
            .await
            .map_err(|e| map_reqwest_error(&self.base_url, &e))?;
        let status = resp.status();
        let body_text = resp
            .text()
            .await
            .map_err(|e| map_reqwest_error(&self.base_url, &e))?;

        if !status.is_success() {
            let err = status_error(status, &body_text);
            warn!(method = %method, path = %path, status = status.as_u16(), error = %err, "backend request failed");
            return Err(err);
        }

        if body_text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body_text).map_err(|e| TransportError::Body(e.to_string()))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, path: &str) -> Result<Value, TransportError> {
        let req = self.request(Method::GET, path);
        self.send(Method::GET, path, req).await
    }

    async fn post(&self, path: &str, body: FormPayload) -> Result<Value, TransportError> {
        let req = self.request(Method::POST, path).multipart(body.into_form()?);
        self.send(Method::POST, path, req).await
    }

    async fn patch(&self, path: &str, body: FormPayload) -> Result<Value, TransportError> {
        let req = self.request(Method::PATCH, path).multipart(body.into_form()?);
        self.send(Method::PATCH, path, req).await
    }

    async fn delete(&self, path: &str) -> Result<Value, TransportError> {
        let req = self.request(Method::DELETE, path);
        self.send(Method::DELETE, path, req).await
    }
}

// ---------------------------------------------------------------------------
// Scripted transport for tests
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod fake {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    pub struct Call {
        pub method: &'static str,
        pub path: String,
        pub body: Option<FormPayload>,
    }

    /// Replays queued responses in order and records every call.
    #[derive(Default)]
    pub struct FakeTransport {
        responses: Mutex<VecDeque<Result<Value, TransportError>>>,
        calls: Mutex<Vec<Call>>,
    }

    impl FakeTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn respond(&self, value: Value) -> &Self {
            self.responses.lock().unwrap().push_back(Ok(value));
            self
        }

        pub fn fail(&self, err: TransportError) -> &Self {
            self.responses.lock().unwrap().push_back(Err(err));
            self
        }

        pub fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        pub fn last_body(&self) -> FormPayload {
            self.calls()
                .into_iter()
                .rev()
                .find_map(|c| c.body)
                .expect("no call with a body was recorded")
        }

        fn next(&self, method: &'static str, path: &str, body: Option<FormPayload>) -> Result<Value, TransportError> {
            self.calls.lock().unwrap().push(Call {
                method,
                path: path.to_string(),
                body,
            });
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(TransportError::Request(format!("no scripted response for {method} {path}"))))
        }
    }

    #[async_trait]
    impl Transport for FakeTransport {
        async fn get(&self, path: &str) -> Result<Value, TransportError> {
            self.next("GET", path, None)
        }

        async fn post(&self, path: &str, body: FormPayload) -> Result<Value, TransportError> {
            self.next("POST", path, Some(body))
        }

        async fn patch(&self, path: &str, body: FormPayload) -> Result<Value, TransportError> {
            self.next("PATCH", path, Some(body))
        }

        async fn delete(&self, path: &str) -> Result<Value, TransportError> {
            self.next("DELETE", path, None)
        }
    }
}
