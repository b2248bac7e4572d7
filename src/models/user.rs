use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::models::common::flexible_date;
use crate::utils::validation::{is_valid_cpf, is_valid_cpf_cnpj};

/// Which kind of account the current session belongs to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Driver,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Driver => "driver",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "user" => Some(Role::User),
            "driver" => Some(Role::Driver),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiUser {
    pub id: i64,
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(default)]
    pub provider: Option<String>,
    pub email: String,
    #[serde(default)]
    pub email_verified: bool,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub cpf_cnpj: Option<String>,
    #[serde(default)]
    pub asaas_customer_id: Option<String>,
    #[serde(default)]
    pub plan_status: Option<String>,
    #[serde(default, deserialize_with = "flexible_date::option_datetime")]
    pub plan_valid_until: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "flexible_date::option_datetime")]
    pub plan_overdue_since: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "flexible_date::option_datetime")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ApiUser {
    /// True when the cached plan is ACTIVE and not past its validity date.
    pub fn is_plan_active(&self, now: DateTime<Utc>) -> bool {
        if self.plan_status.as_deref() != Some("ACTIVE") {
            return false;
        }
        self.plan_valid_until.map_or(true, |valid_until| valid_until > now)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiDriver {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub cpf: Option<String>,
    #[serde(default)]
    pub cnh_number: Option<String>,
    #[serde(default)]
    pub vehicle_plate: Option<String>,
    #[serde(default)]
    pub vehicle_model: Option<String>,
    #[serde(default)]
    pub vehicle_year: Option<i32>,
    #[serde(default)]
    pub vehicle_type: Option<String>,
    #[serde(default)]
    pub vehicle_color: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Serialize, Validate)]
pub struct RegisterUserRequest {
    #[validate(email(message = "E-mail inválido"))]
    pub email: String,

    #[validate(length(min = 6, message = "A senha deve ter pelo menos 6 caracteres"))]
    pub password: String,

    #[validate(length(min = 10, max = 20, message = "Telefone inválido"))]
    pub phone_number: String,

    #[validate(length(min = 3, max = 100, message = "Nome deve ter entre 3 e 100 caracteres"))]
    pub display_name: String,

    #[validate(custom = "validate_cpf_cnpj")]
    pub cpf_cnpj: String,
}

#[derive(Debug, Serialize, Validate)]
pub struct RegisterDriverRequest {
    #[validate(length(min = 3, max = 100, message = "Nome deve ter entre 3 e 100 caracteres"))]
    pub name: String,

    #[validate(email(message = "E-mail inválido"))]
    pub email: String,

    #[validate(length(min = 6, message = "A senha deve ter pelo menos 6 caracteres"))]
    pub password: String,

    #[validate(length(min = 10, max = 20, message = "Telefone inválido"))]
    pub phone: String,

    #[validate(custom = "validate_cpf")]
    pub cpf: String,

    #[validate(length(min = 9, max = 11, message = "Número da CNH inválido"))]
    pub cnh_number: String,

    #[validate(length(min = 7, max = 8, message = "Placa inválida"))]
    pub vehicle_plate: String,

    #[validate(length(min = 2, message = "Modelo do veículo é obrigatório"))]
    pub vehicle_model: String,

    #[validate(range(min = 1950, max = 2100, message = "Ano do veículo inválido"))]
    pub vehicle_year: i32,

    #[validate(length(min = 2, message = "Tipo do guincho é obrigatório"))]
    pub vehicle_type: String,

    #[validate(length(min = 2, message = "Cor do veículo é obrigatória"))]
    pub vehicle_color: String,
}

/// Login body. `Debug` leaves the password out.
#[derive(Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

#[derive(Debug, Default, Serialize, Validate)]
pub struct UpdateUserRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 3, max = 100, message = "Nome deve ter entre 3 e 100 caracteres"))]
    pub display_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 10, max = 20, message = "Telefone inválido"))]
    pub phone_number: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(custom = "validate_cpf_cnpj")]
    pub cpf_cnpj: Option<String>,
}

#[derive(Debug, Default, Serialize, Validate)]
pub struct UpdateDriverRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 3, max = 100, message = "Nome deve ter entre 3 e 100 caracteres"))]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 10, max = 20, message = "Telefone inválido"))]
    pub phone: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 7, max = 8, message = "Placa inválida"))]
    pub vehicle_plate: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle_model: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1950, max = 2100, message = "Ano do veículo inválido"))]
    pub vehicle_year: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle_color: Option<String>,
}

/// Profile and tokens of a login/registration response. Users come back
/// under `user`, drivers under `driver`; the token fields vary between API
/// versions.
#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "P: Deserialize<'de>"))]
pub struct AuthPayload<P> {
    #[serde(default, rename = "user", alias = "driver")]
    pub profile: Option<P>,
    #[serde(default, rename = "accessToken")]
    pub access_token: Option<String>,
    #[serde(default, rename = "refreshToken")]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
}

/// Login/registration response. The payload sits either at the top level or
/// inside a `data` envelope; fields under `data` win.
#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "P: Deserialize<'de>"))]
pub struct AuthResponse<P> {
    #[serde(default)]
    pub data: Option<AuthPayload<P>>,
    #[serde(default, rename = "user", alias = "driver")]
    pub profile: Option<P>,
    #[serde(default, rename = "accessToken")]
    pub access_token: Option<String>,
    #[serde(default, rename = "refreshToken")]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl<P> AuthResponse<P> {
    /// Merges the `data` envelope over the top-level fields.
    pub fn into_payload(self) -> AuthPayload<P> {
        let data = self.data.unwrap_or(AuthPayload {
            profile: None,
            access_token: None,
            refresh_token: None,
            token: None,
        });
        AuthPayload {
            profile: data.profile.or(self.profile),
            access_token: data.access_token.or(self.access_token),
            refresh_token: data.refresh_token.or(self.refresh_token),
            token: data.token.or(self.token),
        }
    }
}

/// `/me` endpoints answer either with the bare profile or wrapped in
/// `{ "user": ... }` / `{ "driver": ... }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ProfileEnvelope<P> {
    Wrapped {
        #[serde(rename = "user", alias = "driver")]
        profile: P,
    },
    Bare(P),
}

impl<P> ProfileEnvelope<P> {
    pub(crate) fn into_inner(self) -> P {
        match self {
            ProfileEnvelope::Wrapped { profile } | ProfileEnvelope::Bare(profile) => profile,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewStatus {
    Pending,
    Approved,
    Rejected,
}

/// Driver documents reviewed by the Chama 365 team.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Cnh,
    Crlv,
    Selfie,
}

impl DocumentKind {
    pub fn path_segment(&self) -> &'static str {
        match self {
            DocumentKind::Cnh => "cnh",
            DocumentKind::Crlv => "crlv",
            DocumentKind::Selfie => "selfie",
        }
    }

    pub fn form_field(&self) -> &'static str {
        match self {
            DocumentKind::Cnh => "cnh_photo",
            DocumentKind::Crlv => "crlv_photo",
            DocumentKind::Selfie => "selfie",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverDocument {
    #[serde(alias = "document_url", alias = "photo_url", alias = "file_url")]
    pub url: String,
    pub status: ReviewStatus,
    #[serde(default)]
    pub rejection_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct DocumentUploadResponse {
    pub document: DriverDocument,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct PhotoUploadResponse {
    pub photo_url: String,
}

fn validate_cpf_cnpj(value: &str) -> Result<(), ValidationError> {
    if is_valid_cpf_cnpj(value) {
        Ok(())
    } else {
        Err(ValidationError::new("cpf_cnpj"))
    }
}

fn validate_cpf(value: &str) -> Result<(), ValidationError> {
    if is_valid_cpf(value) {
        Ok(())
    } else {
        Err(ValidationError::new("cpf"))
    }
}
