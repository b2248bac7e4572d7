use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

use crate::config::ApiConfig;
use crate::error::{PortalError, Result};
use crate::services::session::{AuthTokens, SessionStore};

/// A file picked by the user for a multipart upload.
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub mime: String,
}

impl FileUpload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>, mime: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
            mime: mime.into(),
        }
    }
}

/// HTTP client for the Chama 365 API. Authenticated helpers attach the
/// bearer token from the session and end the session on any 401.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    tokens: AuthTokens,
}

impl ApiClient {
    pub fn new(config: &ApiConfig, store: Arc<dyn SessionStore>) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| PortalError::Config(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            tokens: AuthTokens::new(store),
        })
    }

    pub fn tokens(&self) -> &AuthTokens {
        &self.tokens
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let request = self.request(Method::GET, path)?;
        self.send_authenticated(request).await
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.request(Method::POST, path)?.json(body);
        self.send_authenticated(request).await
    }

    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.request(Method::PUT, path)?.json(body);
        self.send_authenticated(request).await
    }

    pub async fn patch<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.request(Method::PATCH, path)?.json(body);
        self.send_authenticated(request).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let request = self.request(Method::DELETE, path)?;
        self.send_authenticated(request).await
    }

    /// Multipart upload of a single file under `field`.
    pub async fn upload<T: DeserializeOwned>(
        &self,
        path: &str,
        field: &'static str,
        file: FileUpload,
    ) -> Result<T> {
        let part = Part::bytes(file.bytes)
            .file_name(file.file_name)
            .mime_str(&file.mime)
            .map_err(|_| PortalError::Validation(format!("Tipo de arquivo inválido: {}", file.mime)))?;
        let request = self
            .request(Method::POST, path)?
            .multipart(Form::new().part(field, part));
        self.send_authenticated(request).await
    }

    /// Unauthenticated POST used by login and registration. A 401 here means
    /// bad credentials, not an expired session.
    pub async fn post_public<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .client
            .post(self.url(path))
            .header("Accept", "application/json")
            .json(body)
            .send()
            .await?;
        log::debug!("POST {} -> {}", path, response.status());
        read_body(response).await
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let mut request = self
            .client
            .request(method, self.url(path))
            .header("Accept", "application/json");
        match self.tokens.access_token()? {
            Some(token) => request = request.bearer_auth(token),
            None => log::debug!("No access token for {}", path),
        }
        Ok(request)
    }

    async fn send_authenticated<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.send().await?;
        log::debug!("{} -> {}", response.url().path(), response.status());

        if response.status() == StatusCode::UNAUTHORIZED {
            self.end_session();
            return Err(PortalError::session_expired());
        }

        let result = read_body(response).await;
        if matches!(&result, Err(e) if e.is_auth_error()) {
            self.end_session();
        }
        result
    }

    fn end_session(&self) {
        log::warn!("Session rejected by the API, clearing local session");
        if let Err(e) = self.tokens.clear() {
            log::error!("Failed to clear session: {}", e);
        }
    }
}

async fn read_body<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    let bytes = response.bytes().await?;

    if !status.is_success() {
        let err = PortalError::from_response(status.as_u16(), &bytes);
        log::warn!("API error {}: {} ({})", status.as_u16(), err.code(), err);
        return Err(err);
    }

    let body: &[u8] = if bytes.is_empty() { b"null" } else { &bytes };
    Ok(serde_json::from_slice(body)?)
}
