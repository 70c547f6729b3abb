use std::convert::Infallible;

use axum::{
    extract::{FromRequestParts, Request},
    http::{HeaderMap, header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};

use suuq_types::i18n::Language;

use crate::error::ErrorBody;

/// The caller's language, read from `Accept-Language`. Somali when absent.
#[derive(Debug, Clone, Copy, Default)]
pub struct Lang(pub Language);

impl Lang {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let lang = headers
            .get(header::ACCEPT_LANGUAGE)
            .and_then(|v| v.to_str().ok())
            .map(Language::from_accept_language)
            .unwrap_or_default();
        Self(lang)
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Lang {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}

/// Re-render error bodies in the caller's language.
pub async fn localize(req: Request, next: Next) -> Response {
    let Lang(lang) = Lang::from_headers(req.headers());
    let response = next.run(req).await;

    let Some(body) = response.extensions().get::<ErrorBody>().cloned() else {
        return response;
    };
    if lang == Language::default() {
        return response;
    }

    let (parts, _) = response.into_parts();
    let mut localized = (parts.status, body.render(lang)).into_response();
    *localized.extensions_mut() = parts.extensions;
    localized
}
