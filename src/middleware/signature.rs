//! HMAC request signing for state-changing requests.
//!
//! Clients send `X-Timestamp` (Unix seconds) and `X-Signature`, the hex
//! HMAC-SHA256 of `body || "." || timestamp` under the shared secret. The
//! signature covers only the body and timestamp, not the method or path, so a
//! signed body can be replayed against another mutating route inside the
//! freshness window.

use axum::{
    body::Body,
    extract::{Request, State},
    http::{HeaderMap, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt;
use thiserror::Error;

use crate::config::Config;
use crate::error::AppError;

type HmacSha256 = Hmac<Sha256>;

pub const TIMESTAMP_HEADER: &str = "x-timestamp";
pub const SIGNATURE_HEADER: &str = "x-signature";
pub const MAX_SIGNED_BODY_BYTES: usize = 1024 * 1024;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SignatureError {
    #[error("missing signature headers")]
    MissingSignatureHeaders,

    #[error("invalid timestamp")]
    InvalidTimestamp,

    #[error("signature expired")]
    SignatureExpired,

    #[error("invalid signature")]
    InvalidSignature,
}

#[derive(Clone)]
pub struct SignatureVerifier {
    mac: HmacSha256,
    max_age_seconds: i64,
}

impl fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignatureVerifier")
            .field("max_age_seconds", &self.max_age_seconds)
            .finish_non_exhaustive()
    }
}

impl SignatureVerifier {
    /// `max_age_seconds <= 0` disables the freshness check.
    pub fn new(secret: &[u8], max_age_seconds: i64) -> Self {
        let mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts keys of any length");
        Self {
            mac,
            max_age_seconds,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.hmac_secret.as_bytes(), config.sig_max_age_seconds)
    }

    /// Hex signature a client must send for `body` at `timestamp`.
    pub fn sign(&self, body: &[u8], timestamp: &str) -> String {
        hex::encode(self.keyed(body, timestamp).finalize().into_bytes())
    }

    /// Checks headers in order: presence, timestamp syntax, freshness, signature.
    pub fn verify(
        &self,
        timestamp: Option<&str>,
        signature: Option<&str>,
        body: &[u8],
        now: i64,
    ) -> Result<(), SignatureError> {
        let (timestamp, signature) = self.check_headers(timestamp, signature, now)?;
        self.verify_body(timestamp, signature, body)
    }

    /// Presence, timestamp syntax and freshness. Needs no body, so the gate can
    /// reject before reading one.
    pub fn check_headers<'a>(
        &self,
        timestamp: Option<&'a str>,
        signature: Option<&'a str>,
        now: i64,
    ) -> Result<(&'a str, &'a str), SignatureError> {
        let (timestamp, signature) = match (timestamp, signature) {
            (Some(ts), Some(sig)) if !ts.is_empty() && !sig.is_empty() => (ts, sig),
            _ => return Err(SignatureError::MissingSignatureHeaders),
        };

        let issued_at: i64 = timestamp
            .parse()
            .map_err(|_| SignatureError::InvalidTimestamp)?;

        if self.max_age_seconds > 0 && now.saturating_sub(issued_at) > self.max_age_seconds {
            return Err(SignatureError::SignatureExpired);
        }

        Ok((timestamp, signature))
    }

    /// MAC check of `body` against headers already accepted by `check_headers`.
    pub fn verify_body(
        &self,
        timestamp: &str,
        signature: &str,
        body: &[u8],
    ) -> Result<(), SignatureError> {
        let supplied = hex::decode(signature).map_err(|_| SignatureError::InvalidSignature)?;

        // verify_slice compares in constant time.
        self.keyed(body, timestamp)
            .verify_slice(&supplied)
            .map_err(|_| SignatureError::InvalidSignature)
    }

    fn keyed(&self, body: &[u8], timestamp: &str) -> HmacSha256 {
        let mut mac = self.mac.clone();
        mac.update(body);
        mac.update(b".");
        mac.update(timestamp.as_bytes());
        mac
    }
}

fn requires_signature(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Rejects unsigned or badly signed mutating requests. The body is buffered
/// for verification and handed on to the handler unchanged.
pub async fn signature_middleware(
    State(verifier): State<SignatureVerifier>,
    req: Request,
    next: Next,
) -> Response {
    if !requires_signature(req.method()) {
        return next.run(req).await;
    }

    let method = req.method().clone();
    let uri = req.uri().clone();
    let (parts, body) = req.into_parts();

    let reject = |e: SignatureError| {
        tracing::warn!(method = %method, uri = %uri, reason = %e, "rejected request signature");
        AppError::from(e).into_response()
    };

    let now = chrono::Utc::now().timestamp();
    let (timestamp, signature) = match verifier.check_headers(
        header_str(&parts.headers, TIMESTAMP_HEADER),
        header_str(&parts.headers, SIGNATURE_HEADER),
        now,
    ) {
        Ok((ts, sig)) => (ts.to_string(), sig.to_string()),
        Err(e) => return reject(e),
    };

    let bytes = match axum::body::to_bytes(body, MAX_SIGNED_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(method = %method, uri = %uri, error = %e, "failed to read signed request body");
            return AppError::MalformedInput("request body unreadable or too large".to_string())
                .into_response();
        }
    };

    if let Err(e) = verifier.verify_body(&timestamp, &signature, &bytes) {
        return reject(e);
    }

    next.run(Request::from_parts(parts, Body::from(bytes))).await
}
