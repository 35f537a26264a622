//! AWS Signature Version 4 request signing
//!
//! Produces the `x-amz-date`, `Authorization` and (for temporary
//! credentials) `x-amz-security-token` headers for one request.
//!
//! Signed headers are `host`, `x-amz-date` and, when present,
//! `x-amz-security-token`. The payload hash covers the exact body bytes.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use crate::credentials::Credentials;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// The parts of a request that take part in the signature
#[derive(Debug, Clone)]
pub struct SignableRequest<'a> {
    /// HTTP method ("GET", "POST")
    pub method: &'a str,
    /// Host header value (with port if non-default)
    pub host: &'a str,
    /// Absolute path, unencoded
    pub path: &'a str,
    /// Canonical query string, as produced by [`canonical_query_string`]
    pub query: &'a str,
    /// Request body
    pub payload: &'a [u8],
    /// Signing time
    pub time: DateTime<Utc>,
}

/// Headers to attach to a signed request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeaders {
    /// `x-amz-date`
    pub amz_date: String,
    /// `Authorization`
    pub authorization: String,
    /// `x-amz-security-token`
    pub security_token: Option<String>,
}

impl SignedHeaders {
    /// Header name/value pairs
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            Some(("x-amz-date", self.amz_date.as_str())),
            Some(("authorization", self.authorization.as_str())),
            self.security_token
                .as_deref()
                .map(|token| ("x-amz-security-token", token)),
        ]
        .into_iter()
        .flatten()
    }
}

/// Sign a request for `service` in `region`
pub fn sign(
    request: &SignableRequest<'_>,
    credentials: &Credentials,
    region: &str,
    service: &str,
) -> SignedHeaders {
    let date = request.time.format("%Y%m%d").to_string();
    let amz_date = request.time.format("%Y%m%dT%H%M%SZ").to_string();

    let mut headers = BTreeMap::new();
    headers.insert("host", request.host.to_string());
    headers.insert("x-amz-date", amz_date.clone());
    if let Some(token) = credentials.session_token() {
        headers.insert("x-amz-security-token", token.to_string());
    }

    let canonical_headers: String = headers
        .iter()
        .map(|(name, value)| format!("{}:{}\n", name, value.trim()))
        .collect();
    let signed_headers = headers.keys().copied().collect::<Vec<_>>().join(";");

    let canonical_request = format!(
        "{}\n{}\n{}\n{}\n{}\n{}",
        request.method,
        uri_encode_path(request.path),
        request.query,
        canonical_headers,
        signed_headers,
        hex_sha256(request.payload)
    );

    let credential_scope = format!("{}/{}/{}/aws4_request", date, region, service);
    let string_to_sign = format!(
        "{}\n{}\n{}\n{}",
        ALGORITHM,
        amz_date,
        credential_scope,
        hex_sha256(canonical_request.as_bytes())
    );

    let signature = calculate_signature(
        credentials.secret_access_key(),
        &date,
        region,
        service,
        &string_to_sign,
    );

    SignedHeaders {
        amz_date,
        authorization: format!(
            "{} Credential={}/{}, SignedHeaders={}, Signature={}",
            ALGORITHM,
            credentials.access_key_id(),
            credential_scope,
            signed_headers,
            signature
        ),
        security_token: credentials.session_token().map(str::to_string),
    }
}

/// Build a canonical query string (sorted, percent-encoded)
///
/// The same string must be used both in the URL and in the signature.
pub fn canonical_query_string(params: &[(&str, &str)]) -> String {
    let sorted: BTreeMap<String, String> = params
        .iter()
        .map(|(k, v)| (uri_encode_value(k), uri_encode_value(v)))
        .collect();
    sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

/// URI-encode a path (preserving slashes)
pub fn uri_encode_path(path: &str) -> String {
    encode(path, true)
}

/// URI-encode a query key or value
pub fn uri_encode_value(value: &str) -> String {
    encode(value, false)
}

fn encode(input: &str, keep_slash: bool) -> String {
    use std::fmt::Write;
    let mut result = String::with_capacity(input.len() * 3);
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                result.push(byte as char);
            }
            b'/' if keep_slash => result.push('/'),
            _ => {
                let _ = write!(result, "%{:02X}", byte);
            }
        }
    }
    result
}

fn hex_sha256(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    // HMAC accepts keys of any length.
    let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(key)
        .unwrap_or_else(|_| unreachable!("HMAC-SHA256 accepts any key length"));
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

fn calculate_signature(
    secret_key: &str,
    date: &str,
    region: &str,
    service: &str,
    string_to_sign: &str,
) -> String {
    let k_date = hmac_sha256(format!("AWS4{}", secret_key).as_bytes(), date.as_bytes());
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, service.as_bytes());
    let k_signing = hmac_sha256(&k_service, b"aws4_request");
    hex::encode(hmac_sha256(&k_signing, string_to_sign.as_bytes()))
}
