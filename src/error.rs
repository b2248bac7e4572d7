use serde::Deserialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PortalError>;

const SESSION_EXPIRED_MESSAGE: &str = "Sessão expirada. Por favor, faça login novamente.";
const GATEWAY_DOWN_MESSAGE: &str =
    "Sistema de pagamento indisponível. Tente novamente em alguns minutos.";
const GENERIC_MESSAGE: &str = "Erro inesperado. Tente novamente.";

/// Machine-readable error codes returned by the Chama 365 API.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    AuthUnauthorized,
    AuthTokenExpired,
    SubscriptionPlanInvalid,
    BillingTypeInvalid,
    CreditCardDataRequired,
    UserNotFound,
    SubscriptionCreateFailed,
    SubscriptionNotFound,
    SubscriptionFetchFailed,
    SubscriptionUpdateFailed,
    SubscriptionCancelFailed,
    SubscriptionPaymentsFetchFailed,
    OneTimePaymentFailed,
    GatewayError,
    Unknown,
    Other(String),
}

impl ErrorCode {
    pub fn parse(code: &str) -> Self {
        match code {
            "AUTH_UNAUTHORIZED" => ErrorCode::AuthUnauthorized,
            "AUTH_TOKEN_EXPIRED" => ErrorCode::AuthTokenExpired,
            "SUBSCRIPTION_PLAN_INVALID" => ErrorCode::SubscriptionPlanInvalid,
            "BILLING_TYPE_INVALID" => ErrorCode::BillingTypeInvalid,
            "CREDIT_CARD_DATA_REQUIRED" => ErrorCode::CreditCardDataRequired,
            "USER_NOT_FOUND" => ErrorCode::UserNotFound,
            "SUBSCRIPTION_CREATE_FAILED" => ErrorCode::SubscriptionCreateFailed,
            "SUBSCRIPTION_NOT_FOUND" => ErrorCode::SubscriptionNotFound,
            "SUBSCRIPTION_FETCH_FAILED" => ErrorCode::SubscriptionFetchFailed,
            "SUBSCRIPTION_UPDATE_FAILED" => ErrorCode::SubscriptionUpdateFailed,
            "SUBSCRIPTION_CANCEL_FAILED" => ErrorCode::SubscriptionCancelFailed,
            "SUBSCRIPTION_PAYMENTS_FETCH_FAILED" => ErrorCode::SubscriptionPaymentsFetchFailed,
            "ONE_TIME_PAYMENT_FAILED" => ErrorCode::OneTimePaymentFailed,
            "GATEWAY_ERROR" => ErrorCode::GatewayError,
            "UNKNOWN" => ErrorCode::Unknown,
            other => ErrorCode::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ErrorCode::AuthUnauthorized => "AUTH_UNAUTHORIZED",
            ErrorCode::AuthTokenExpired => "AUTH_TOKEN_EXPIRED",
            ErrorCode::SubscriptionPlanInvalid => "SUBSCRIPTION_PLAN_INVALID",
            ErrorCode::BillingTypeInvalid => "BILLING_TYPE_INVALID",
            ErrorCode::CreditCardDataRequired => "CREDIT_CARD_DATA_REQUIRED",
            ErrorCode::UserNotFound => "USER_NOT_FOUND",
            ErrorCode::SubscriptionCreateFailed => "SUBSCRIPTION_CREATE_FAILED",
            ErrorCode::SubscriptionNotFound => "SUBSCRIPTION_NOT_FOUND",
            ErrorCode::SubscriptionFetchFailed => "SUBSCRIPTION_FETCH_FAILED",
            ErrorCode::SubscriptionUpdateFailed => "SUBSCRIPTION_UPDATE_FAILED",
            ErrorCode::SubscriptionCancelFailed => "SUBSCRIPTION_CANCEL_FAILED",
            ErrorCode::SubscriptionPaymentsFetchFailed => "SUBSCRIPTION_PAYMENTS_FETCH_FAILED",
            ErrorCode::OneTimePaymentFailed => "ONE_TIME_PAYMENT_FAILED",
            ErrorCode::GatewayError => "GATEWAY_ERROR",
            ErrorCode::Unknown => "UNKNOWN",
            ErrorCode::Other(code) => code,
        }
    }

    /// The two codes that mean the bearer token is no longer accepted.
    pub fn is_auth(&self) -> bool {
        matches!(self, ErrorCode::AuthUnauthorized | ErrorCode::AuthTokenExpired)
    }

    /// Message shown when the server sent neither `details` nor `message`.
    pub fn fallback_message(&self) -> Option<&'static str> {
        let message = match self {
            ErrorCode::AuthUnauthorized | ErrorCode::AuthTokenExpired => {
                "Sessão expirada. Faça login novamente."
            }
            ErrorCode::SubscriptionPlanInvalid => "Plano inválido.",
            ErrorCode::BillingTypeInvalid => "Método de pagamento inválido.",
            ErrorCode::CreditCardDataRequired => "Dados do cartão são obrigatórios.",
            ErrorCode::UserNotFound => "Usuário não encontrado.",
            ErrorCode::SubscriptionCreateFailed => "Erro ao criar assinatura.",
            ErrorCode::SubscriptionNotFound => "Assinatura não encontrada.",
            ErrorCode::SubscriptionFetchFailed => "Erro ao buscar assinatura.",
            ErrorCode::SubscriptionUpdateFailed => "Erro ao atualizar assinatura.",
            ErrorCode::SubscriptionCancelFailed => "Erro ao cancelar assinatura.",
            ErrorCode::SubscriptionPaymentsFetchFailed => "Erro ao buscar cobranças.",
            ErrorCode::OneTimePaymentFailed => "Erro ao criar pagamento.",
            ErrorCode::GatewayError => GATEWAY_DOWN_MESSAGE,
            ErrorCode::Unknown | ErrorCode::Other(_) => return None,
        };
        Some(message)
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Client-side errors, decoded once at the HTTP boundary.
#[derive(Error, Debug)]
pub enum PortalError {
    /// Local form validation failed; the request never left the client.
    #[error("{0}")]
    Validation(String),

    /// Session rejected by the API. The local session is cleared by then.
    #[error("{message}")]
    Auth { code: ErrorCode, message: String },

    /// Payment gateway unreachable behind the API.
    #[error("{0}")]
    Gateway(String),

    /// Typed API error.
    #[error("{message}")]
    Api {
        code: ErrorCode,
        message: String,
        details: Option<String>,
        request_id: Option<String>,
        status: u16,
    },

    /// Transport failure (DNS, refused connection, timeout).
    #[error("network error: {0}")]
    Network(String),

    /// A successful response whose body did not have the expected shape.
    #[error("invalid response body: {0}")]
    Decode(String),

    #[error("session storage error: {0}")]
    Storage(String),

    #[error("configuration error: {0}")]
    Config(String),
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    error: Option<ErrorField>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorField {
    Detailed(ErrorBody),
    Text(String),
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    details: Option<String>,
    #[serde(default, rename = "requestId")]
    request_id: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl PortalError {
    pub fn session_expired() -> Self {
        PortalError::Auth {
            code: ErrorCode::AuthUnauthorized,
            message: SESSION_EXPIRED_MESSAGE.to_string(),
        }
    }

    /// Builds an error for a locally detected API-level problem, using the
    /// code's fallback message.
    pub fn api(code: ErrorCode) -> Self {
        let message = code.fallback_message().unwrap_or(GENERIC_MESSAGE).to_string();
        PortalError::Api {
            code,
            message,
            details: None,
            request_id: None,
            status: 0,
        }
    }

    /// Maps a non-2xx response into the error taxonomy.
    ///
    /// Message precedence: `error.details`, then the server message, then the
    /// per-code fallback table, then a generic "try again".
    pub fn from_response(status: u16, body: &[u8]) -> Self {
        let envelope = match serde_json::from_slice::<ErrorEnvelope>(body) {
            Ok(envelope) => envelope,
            Err(_) => {
                if status == 502 {
                    return PortalError::Gateway(GATEWAY_DOWN_MESSAGE.to_string());
                }
                return PortalError::Api {
                    code: ErrorCode::Unknown,
                    message: format!("Erro no servidor ({}). Tente novamente.", status),
                    details: None,
                    request_id: None,
                    status,
                };
            }
        };

        let (body, text) = match envelope.error {
            Some(ErrorField::Detailed(body)) => (body, None),
            Some(ErrorField::Text(text)) => (ErrorBody::default(), Some(text)),
            None => (ErrorBody::default(), None),
        };

        let code = body
            .code
            .as_deref()
            .map_or(ErrorCode::Unknown, ErrorCode::parse);
        let details = non_empty(body.details);
        let message = details
            .clone()
            .or_else(|| non_empty(body.message))
            .or_else(|| non_empty(text))
            .or_else(|| non_empty(envelope.message))
            .or_else(|| code.fallback_message().map(str::to_string))
            .unwrap_or_else(|| GENERIC_MESSAGE.to_string());

        if code.is_auth() {
            return PortalError::Auth { code, message };
        }

        PortalError::Api {
            code,
            message,
            details,
            request_id: body.request_id,
            status,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            PortalError::Auth { code, .. } | PortalError::Api { code, .. } => code.clone(),
            PortalError::Gateway(_) => ErrorCode::GatewayError,
            PortalError::Validation(_) => ErrorCode::Other("VALIDATION_ERROR".to_string()),
            PortalError::Network(_) => ErrorCode::Other("NETWORK_ERROR".to_string()),
            PortalError::Decode(_) | PortalError::Storage(_) | PortalError::Config(_) => {
                ErrorCode::Unknown
            }
        }
    }

    /// Callers force a re-login instead of showing an inline message.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, PortalError::Auth { .. })
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, PortalError::Gateway(_) | PortalError::Network(_))
    }

    pub fn user_message(&self) -> String {
        match self {
            PortalError::Validation(message)
            | PortalError::Gateway(message)
            | PortalError::Auth { message, .. }
            | PortalError::Api { message, .. } => message.clone(),
            PortalError::Network(_) => {
                "Não foi possível conectar à API. Verifique sua conexão e tente novamente."
                    .to_string()
            }
            PortalError::Decode(_) => "A API retornou uma resposta inválida.".to_string(),
            PortalError::Storage(_) | PortalError::Config(_) => GENERIC_MESSAGE.to_string(),
        }
    }
}

impl From<reqwest::Error> for PortalError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            PortalError::Decode(err.to_string())
        } else {
            PortalError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for PortalError {
    fn from(err: serde_json::Error) -> Self {
        PortalError::Decode(err.to_string())
    }
}
