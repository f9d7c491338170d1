/*
 * SPDX-FileCopyrightText: Copyright (c) 2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
 * SPDX-License-Identifier: LicenseRef-NvidiaProprietary
 *
 * NVIDIA CORPORATION, its affiliates and licensors retain all intellectual
 * property and proprietary rights in and to this material, related
 * documentation and any modifications thereto. Any use, reproduction,
 * disclosure or distribution of this material and related documentation
 * without an express license agreement from NVIDIA CORPORATION or
 * its affiliates is strictly prohibited.
 */

// OCI HTTP request signatures (draft-cavage-http-signatures, version 1)

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use reqwest::header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, DATE, HOST, HeaderValue};
use reqwest::{Method, Request};
use rsa::RsaPrivateKey;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs1v15::SigningKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::signature::{SignatureEncoding, Signer};
use sha2::{Digest, Sha256};

use crate::OciApiError;

const CONTENT_SHA256: &str = "x-content-sha256";
const DEFAULT_CONTENT_TYPE: &str = "application/json";
const DEFAULT_REALM_DOMAIN: &str = "oraclecloud.com";

/// Tenancy and region a signer's credentials are scoped to
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthContext {
    pub region: String,
    pub tenancy_id: String,
    pub realm_domain: String,
}

impl AuthContext {
    pub fn new(region: &str, tenancy_id: &str) -> Self {
        Self {
            region: region.to_string(),
            tenancy_id: tenancy_id.to_string(),
            realm_domain: DEFAULT_REALM_DOMAIN.to_string(),
        }
    }

    /// Core services (Compute, VirtualNetwork) endpoint for this region
    pub fn iaas_endpoint(&self) -> String {
        format!("https://iaas.{}.{}", self.region, self.realm_domain)
    }

    /// Identity federation endpoint for this region
    pub fn auth_endpoint(&self) -> String {
        format!("https://auth.{}.{}", self.region, self.realm_domain)
    }
}

/// Adds OCI authentication to outgoing requests.
///
/// Service clients receive a signer at construction time, so the credential
/// source can be swapped without touching process state.
#[async_trait]
pub trait RequestSigner: std::fmt::Debug + Send + Sync + 'static {
    fn context(&self) -> AuthContext;
    async fn sign(&self, request: &mut Request) -> Result<(), OciApiError>;
}

/// Signs with a fixed RSA key under a fixed key id
#[derive(Clone)]
pub struct KeyPairSigner {
    key_id: String,
    private_key: RsaPrivateKey,
    context: AuthContext,
}

impl std::fmt::Debug for KeyPairSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPairSigner")
            .field("key_id", &self.key_id)
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

impl KeyPairSigner {
    pub fn new(key_id: &str, private_key: RsaPrivateKey, context: AuthContext) -> Self {
        Self {
            key_id: key_id.to_string(),
            private_key,
            context,
        }
    }

    pub fn from_pem(key_id: &str, pem: &str, context: AuthContext) -> Result<Self, OciApiError> {
        Ok(Self::new(key_id, parse_private_key_pem(pem)?, context))
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }
}

#[async_trait]
impl RequestSigner for KeyPairSigner {
    fn context(&self) -> AuthContext {
        self.context.clone()
    }

    async fn sign(&self, request: &mut Request) -> Result<(), OciApiError> {
        sign_request(&self.key_id, &self.private_key, request)
    }
}

/// Accepts both PKCS#1 (`BEGIN RSA PRIVATE KEY`) and PKCS#8 (`BEGIN PRIVATE KEY`) encodings
pub fn parse_private_key_pem(pem: &str) -> Result<RsaPrivateKey, OciApiError> {
    RsaPrivateKey::from_pkcs1_pem(pem)
        .or_else(|_| RsaPrivateKey::from_pkcs8_pem(pem))
        .map_err(|e| OciApiError::Signing(format!("invalid RSA private key: {e}")))
}

pub fn sign_request(
    key_id: &str,
    key: &RsaPrivateKey,
    request: &mut Request,
) -> Result<(), OciApiError> {
    sign_request_at(key_id, key, request, Utc::now())
}

pub(crate) fn sign_request_at(
    key_id: &str,
    key: &RsaPrivateKey,
    request: &mut Request,
    now: DateTime<Utc>,
) -> Result<(), OciApiError> {
    let url = request.url();
    let host = match (url.host_str(), url.port()) {
        (Some(host), Some(port)) => format!("{host}:{port}"),
        (Some(host), None) => host.to_string(),
        (None, _) => {
            return Err(OciApiError::Signing(format!("no host in {url}")));
        }
    };
    let mut request_target = format!(
        "{} {}",
        request.method().as_str().to_lowercase(),
        url.path()
    );
    if let Some(query) = url.query() {
        request_target.push('?');
        request_target.push_str(query);
    }
    let date = now.format("%a, %d %b %Y %H:%M:%S GMT").to_string();

    let mut signed_headers: Vec<(&str, String)> = vec![
        ("date", date),
        ("(request-target)", request_target),
        ("host", host),
    ];

    if matches!(*request.method(), Method::POST | Method::PUT | Method::PATCH) {
        let body: &[u8] = match request.body() {
            None => &[],
            Some(body) => body.as_bytes().ok_or_else(|| {
                OciApiError::Signing("streaming request bodies cannot be signed".to_string())
            })?,
        };
        let content_sha256 = STANDARD.encode(Sha256::digest(body));
        let content_length = body.len().to_string();
        let content_type = request
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();
        signed_headers.push(("content-length", content_length));
        signed_headers.push(("content-type", content_type));
        signed_headers.push((CONTENT_SHA256, content_sha256));
    }

    let signing_string = signed_headers
        .iter()
        .map(|(name, value)| format!("{name}: {value}"))
        .collect::<Vec<_>>()
        .join("\n");
    let signature = SigningKey::<Sha256>::new(key.clone()).sign(signing_string.as_bytes());
    let header_names = signed_headers
        .iter()
        .map(|(name, _)| *name)
        .collect::<Vec<_>>()
        .join(" ");
    let authorization = format!(
        r#"Signature version="1",headers="{header_names}",keyId="{key_id}",algorithm="rsa-sha256",signature="{}""#,
        STANDARD.encode(signature.to_bytes())
    );

    let headers = request.headers_mut();
    for (name, value) in &signed_headers {
        let header_name = match *name {
            "(request-target)" => continue,
            "date" => DATE,
            "host" => HOST,
            "content-length" => CONTENT_LENGTH,
            "content-type" => CONTENT_TYPE,
            _ => reqwest::header::HeaderName::from_static(CONTENT_SHA256),
        };
        headers.insert(header_name, header_value(value)?);
    }
    headers.insert(AUTHORIZATION, header_value(&authorization)?);
    Ok(())
}

fn header_value(value: &str) -> Result<HeaderValue, OciApiError> {
    HeaderValue::from_str(value)
        .map_err(|e| OciApiError::Signing(format!("invalid header value {value:?}: {e}")))
}
