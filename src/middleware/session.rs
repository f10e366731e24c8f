//! Anonymous session tokens
//!
//! Conversations are scoped to the token in `X-Chat-Session-UUID`. A request
//! without one gets a fresh UUID v4, echoed back so the client can keep it.

use crate::error::AppError;
use axum::{
    extract::Request,
    http::HeaderValue,
    middleware::Next,
    response::{IntoResponse, Response},
};
use uuid::Uuid;

pub const SESSION_HEADER: &str = "x-chat-session-uuid";

pub const MAX_SESSION_TOKEN_CHARS: usize = 128;

/// Opaque token identifying an anonymous caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn mint() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Accept a client-supplied token; blank or oversized tokens are refused
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let token = raw.trim();
        if token.is_empty() {
            return Err(AppError::Validation(
                "El identificador de sesión no puede estar vacío".to_string(),
            ));
        }
        if token.chars().count() > MAX_SESSION_TOKEN_CHARS {
            return Err(AppError::Validation(format!(
                "El identificador de sesión no puede superar {} caracteres",
                MAX_SESSION_TOKEN_CHARS
            )));
        }
        Ok(Self(token.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

pub async fn session_middleware(mut request: Request, next: Next) -> Response {
    let token = match request.headers().get(SESSION_HEADER) {
        None => {
            let minted = SessionToken::mint();
            tracing::debug!(session = %minted, "Minted new session token");
            minted
        }
        Some(value) => {
            let parsed = value
                .to_str()
                .map_err(|_| {
                    AppError::Validation(
                        "El identificador de sesión contiene caracteres no válidos".to_string(),
                    )
                })
                .and_then(SessionToken::parse);
            match parsed {
                Ok(token) => token,
                Err(e) => return e.into_response(),
            }
        }
    };

    request.extensions_mut().insert(token.clone());

    let mut response = next.run(request).await;

    if let Ok(header_value) = HeaderValue::from_str(token.as_str()) {
        response.headers_mut().insert(SESSION_HEADER, header_value);
    }

    response
}
