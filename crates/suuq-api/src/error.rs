/// Unified error type for the HTTP API
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use suuq_types::i18n::{self, Language, Text};
use suuq_types::pricing::PaymentQuote;

#[derive(Error, Debug)]
pub enum ApiError {
    /// Bad or missing input
    #[error("Validation error: {}", .0.en)]
    Validation(Text),

    /// No token, a bad token or a revoked session
    #[error("Authentication required")]
    Unauthorized,

    /// Logged in but not allowed
    #[error("Not authorized: {}", .0.en)]
    Forbidden(Text),

    #[error("Not found")]
    NotFound,

    /// State changed under us, or the record already exists
    #[error("Conflict: {}", .0.en)]
    Conflict(Text),

    /// The post waits for this payment
    #[error("Payment required: {} {}", .0.payment_type, .0.amount)]
    PaymentRequired(PaymentQuote),

    #[error("Payload too large (limit {limit} bytes)")]
    PayloadTooLarge { limit: usize },

    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn validation(so: &'static str, en: &'static str) -> Self {
        Self::Validation(Text::new(so, en))
    }

    pub fn conflict(so: &'static str, en: &'static str) -> Self {
        Self::Conflict(Text::new(so, en))
    }

    fn parts(&self) -> (StatusCode, &'static str, Text) {
        match self {
            Self::Validation(text) => (StatusCode::BAD_REQUEST, "InvalidRequest", text.clone()),
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "AuthenticationRequired",
                i18n::ERROR_LOGIN_REQUIRED,
            ),
            Self::Forbidden(text) => (StatusCode::FORBIDDEN, "Forbidden", text.clone()),
            Self::NotFound => (StatusCode::NOT_FOUND, "NotFound", i18n::ERROR_NOT_FOUND),
            Self::Conflict(text) => (StatusCode::CONFLICT, "Conflict", text.clone()),
            Self::PaymentRequired(_) => (
                StatusCode::PAYMENT_REQUIRED,
                "PaymentRequired",
                Text::new(
                    "Fadlan bixi lacagta si aad u sii wadato",
                    "Please complete the payment to continue",
                ),
            ),
            Self::PayloadTooLarge { limit } => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "PayloadTooLarge",
                Text::owned(
                    format!("Faylka waa inuu ka yaraadaa {}MB", limit / (1024 * 1024)),
                    format!("File must be less than {}MB", limit / (1024 * 1024)),
                ),
            ),
            Self::UnsupportedMediaType(_) => (
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "UnsupportedMediaType",
                Text::new("Nooca faylka lama aqbalo", "This file type is not accepted"),
            ),
            // Don't leak details
            Self::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "InternalServerError",
                i18n::ERROR_GENERIC,
            ),
        }
    }
}

/// Error payload kept on the response so the localisation layer can render
/// it in the caller's language.
#[derive(Debug, Clone)]
pub struct ErrorBody {
    pub code: &'static str,
    pub text: Text,
    pub payment: Option<PaymentQuote>,
}

#[derive(Serialize)]
pub struct ErrorResponse<'a> {
    error: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    payment: Option<&'a PaymentQuote>,
}

impl ErrorBody {
    pub fn render(&self, lang: Language) -> Json<ErrorResponse<'_>> {
        Json(ErrorResponse {
            error: self.code,
            message: self.text.get(lang),
            payment: self.payment.as_ref(),
        })
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Internal(e) = &self {
            error!("Internal error: {:#}", e);
        }

        let (status, code, text) = self.parts();
        let payment = match self {
            Self::PaymentRequired(quote) => Some(quote),
            _ => None,
        };
        let body = ErrorBody { code, text, payment };

        let mut response = (status, body.render(Language::default())).into_response();
        response.extensions_mut().insert(body);
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses() {
        assert_eq!(ApiError::Unauthorized.parts().0, StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::conflict("x", "y").parts().0,
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::PayloadTooLarge { limit: 5 * 1024 * 1024 }.parts().2.en,
            "File must be less than 5MB"
        );
    }

    #[test]
    fn internal_details_stay_hidden() {
        let err = ApiError::Internal(anyhow::anyhow!("disk on fire"));
        let (status, code, text) = err.parts();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(code, "InternalServerError");
        assert!(!text.en.contains("disk"));
    }
}
