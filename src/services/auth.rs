use serde::de::DeserializeOwned;
use validator::Validate;

use crate::error::{PortalError, Result};
use crate::models::user::{
    ApiDriver, ApiUser, AuthPayload, AuthResponse, DocumentKind, DocumentUploadResponse,
    DriverDocument, LoginRequest, PhotoUploadResponse, ProfileEnvelope, RegisterDriverRequest,
    RegisterUserRequest, Role, UpdateDriverRequest, UpdateUserRequest,
};
use crate::services::http::{ApiClient, FileUpload};

/// Registration, login and profile management for users and drivers.
#[derive(Clone)]
pub struct AuthService {
    api: ApiClient,
}

fn validation_error(errors: validator::ValidationErrors) -> PortalError {
    let message = errors
        .field_errors()
        .values()
        .flat_map(|errors| errors.iter())
        .find_map(|error| error.message.as_ref().map(|m| m.to_string()))
        .unwrap_or_else(|| "Dados inválidos.".to_string());
    PortalError::Validation(message)
}

impl AuthService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Returns the new user when the API signs them in straight away.
    pub async fn register_user(&self, request: &RegisterUserRequest) -> Result<Option<ApiUser>> {
        request.validate().map_err(validation_error)?;
        log::info!("Registering user {}", request.email);
        let response: AuthResponse<ApiUser> =
            self.api.post_public("/api/users/register", request).await?;
        let payload = response.into_payload();
        self.store_tokens(&payload)?;
        match payload.profile {
            Some(user) => self.cache_user(user).map(Some),
            None => {
                log::info!("User {} registered, sign-in required", request.email);
                Ok(None)
            }
        }
    }

    /// New drivers usually go into document review and get no profile back;
    /// `None` means the account exists and the driver must sign in later.
    pub async fn register_driver(
        &self,
        request: &RegisterDriverRequest,
    ) -> Result<Option<ApiDriver>> {
        request.validate().map_err(validation_error)?;
        log::info!("Registering driver {}", request.email);
        let response: AuthResponse<ApiDriver> =
            self.api.post_public("/api/drivers/register", request).await?;
        let payload = response.into_payload();
        self.store_tokens(&payload)?;
        match payload.profile {
            Some(driver) => self.cache_driver(driver).map(Some),
            None => {
                log::info!("Driver {} registered, awaiting review", request.email);
                Ok(None)
            }
        }
    }

    pub async fn login_user(&self, email: &str, password: &str) -> Result<ApiUser> {
        let request = LoginRequest {
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        log::info!("Logging in user {}", request.email);
        let response: AuthResponse<ApiUser> =
            self.api.post_public("/api/users/login", &request).await?;
        self.finish_user_session(response)
    }

    pub async fn login_driver(&self, email: &str, password: &str) -> Result<ApiDriver> {
        let request = LoginRequest {
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        log::info!("Logging in driver {}", request.email);
        let response: AuthResponse<ApiDriver> =
            self.api.post_public("/api/drivers/login", &request).await?;
        self.finish_driver_session(response)
    }

    pub fn logout(&self) -> Result<()> {
        self.api.tokens().clear()
    }

    pub fn current_role(&self) -> Result<Option<Role>> {
        self.api.tokens().role()
    }

    pub async fn user_profile(&self) -> Result<ApiUser> {
        let user: ApiUser = self.fetch_profile("/api/users/me").await?;
        self.api.tokens().cache_user(&user)?;
        Ok(user)
    }

    pub async fn update_user_profile(&self, update: &UpdateUserRequest) -> Result<ApiUser> {
        update.validate().map_err(validation_error)?;
        let envelope: ProfileEnvelope<ApiUser> = self.api.patch("/api/users/me", update).await?;
        let user = envelope.into_inner();
        self.api.tokens().cache_user(&user)?;
        Ok(user)
    }

    pub async fn driver_profile(&self) -> Result<ApiDriver> {
        let driver: ApiDriver = self.fetch_profile("/api/drivers/me").await?;
        self.api.tokens().cache_driver(&driver)?;
        Ok(driver)
    }

    pub async fn update_driver_profile(&self, update: &UpdateDriverRequest) -> Result<ApiDriver> {
        update.validate().map_err(validation_error)?;
        let envelope: ProfileEnvelope<ApiDriver> =
            self.api.patch("/api/drivers/me", update).await?;
        let driver = envelope.into_inner();
        self.api.tokens().cache_driver(&driver)?;
        Ok(driver)
    }

    /// Returns the URL of the stored photo.
    pub async fn upload_user_photo(&self, file: FileUpload) -> Result<String> {
        let response: PhotoUploadResponse =
            self.api.upload("/api/users/me/photo", "photo", file).await?;
        Ok(response.photo_url)
    }

    pub async fn upload_driver_photo(&self, file: FileUpload) -> Result<String> {
        let response: PhotoUploadResponse =
            self.api.upload("/api/drivers/me/photo", "photo", file).await?;
        Ok(response.photo_url)
    }

    /// Sends a CNH, CRLV or selfie for review. New documents start as
    /// pending.
    pub async fn upload_driver_document(
        &self,
        kind: DocumentKind,
        file: FileUpload,
    ) -> Result<DriverDocument> {
        let path = format!("/api/drivers/me/documents/{}", kind.path_segment());
        log::info!("Uploading driver document {}", kind.path_segment());
        let response: DocumentUploadResponse =
            self.api.upload(&path, kind.form_field(), file).await?;
        Ok(response.document)
    }

    async fn fetch_profile<P: DeserializeOwned>(&self, path: &str) -> Result<P> {
        let envelope: ProfileEnvelope<P> = self.api.get(path).await?;
        Ok(envelope.into_inner())
    }

    fn store_tokens<P>(&self, payload: &AuthPayload<P>) -> Result<()> {
        self.api.tokens().store(
            payload.access_token.as_deref(),
            payload.refresh_token.as_deref(),
            payload.token.as_deref(),
        )
    }

    fn cache_user(&self, user: ApiUser) -> Result<ApiUser> {
        self.api.tokens().cache_user(&user)?;
        log::info!("User {} signed in", user.id);
        Ok(user)
    }

    fn cache_driver(&self, driver: ApiDriver) -> Result<ApiDriver> {
        self.api.tokens().cache_driver(&driver)?;
        log::info!("Driver {} signed in", driver.id);
        Ok(driver)
    }

    fn finish_user_session(&self, response: AuthResponse<ApiUser>) -> Result<ApiUser> {
        let payload = response.into_payload();
        self.store_tokens(&payload)?;
        let user = payload
            .profile
            .ok_or_else(|| PortalError::Decode("response without user".to_string()))?;
        self.cache_user(user)
    }

    fn finish_driver_session(&self, response: AuthResponse<ApiDriver>) -> Result<ApiDriver> {
        let payload = response.into_payload();
        self.store_tokens(&payload)?;
        let driver = payload
            .profile
            .ok_or_else(|| PortalError::Decode("response without driver".to_string()))?;
        self.cache_driver(driver)
    }
}
