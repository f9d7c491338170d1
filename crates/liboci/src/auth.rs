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

//! Instance principals: the instance proves its identity with the certificate
//! issued to it through the metadata service, and trades it for a short lived
//! security token bound to a freshly generated session key.

use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::Utc;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderValue};
use reqwest::{Client as HttpClient, Request};
use rsa::RsaPrivateKey;
use rsa::pkcs8::EncodePublicKey;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use x509_parser::pem::Pem;
use x509_parser::prelude::{FromDer, X509Certificate};

use crate::metadata::MetadataClient;
use crate::signer::{AuthContext, RequestSigner, parse_private_key_pem, sign_request};
use crate::{OciApiError, truncate};

const LEAF_CERT_PATH: &str = "identity/cert.pem";
const LEAF_KEY_PATH: &str = "identity/key.pem";
const INTERMEDIATE_CERT_PATH: &str = "identity/intermediate.pem";

const TENANCY_OU_PREFIX: &str = "opc-tenant:";
const IDENTITY_OU_PREFIX: &str = "opc-identity:";

const SESSION_KEY_BITS: usize = 2048;
// refresh the token this long before it expires
const REFRESH_WINDOW_SECS: i64 = 60;

#[derive(Clone, Debug, Default)]
pub struct InstancePrincipalsOptions {
    /// Skip the regionInfo lookup for the region
    pub region: Option<String>,
    /// Skip the regionInfo lookup for the realm domain
    pub realm_domain: Option<String>,
    /// Full URL of the x509 federation endpoint
    pub federation_endpoint: Option<String>,
}

/// Certificate material the metadata service hands out to the instance
struct InstanceIdentity {
    leaf_der: Vec<u8>,
    intermediate_ders: Vec<Vec<u8>>,
    leaf_key: RsaPrivateKey,
    tenancy_id: String,
}

struct SessionCredentials {
    token: String,
    expires_at: Option<i64>,
    key: RsaPrivateKey,
}

impl SessionCredentials {
    fn expires_soon(&self, now: i64) -> bool {
        self.expires_at
            .is_some_and(|exp| exp - REFRESH_WINDOW_SECS <= now)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FederationRequest {
    certificate: String,
    public_key: String,
    intermediate_certificates: Vec<String>,
    purpose: &'static str,
    fingerprint_algorithm: &'static str,
}

#[derive(Deserialize)]
struct FederationResponse {
    token: String,
}

#[derive(Deserialize)]
struct TokenClaims {
    exp: Option<i64>,
}

pub struct InstancePrincipalsSigner {
    metadata: MetadataClient,
    http: HttpClient,
    federation_endpoint: String,
    context: AuthContext,
    session: RwLock<SessionCredentials>,
}

impl std::fmt::Debug for InstancePrincipalsSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstancePrincipalsSigner")
            .field("federation_endpoint", &self.federation_endpoint)
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

impl InstancePrincipalsSigner {
    /// Fetches the instance certificates and federates them into a security token.
    /// Any error here means the instance cannot act as a principal.
    pub async fn new(
        metadata: MetadataClient,
        http: HttpClient,
        options: InstancePrincipalsOptions,
    ) -> Result<Arc<Self>, OciApiError> {
        let (region, realm_domain) = match (options.region, options.realm_domain) {
            (Some(region), Some(realm_domain)) => (region, realm_domain),
            (region, realm_domain) => {
                let info = metadata.get_region_info().await?;
                (
                    region.unwrap_or(info.region_identifier),
                    realm_domain.unwrap_or(info.realm_domain_component),
                )
            }
        };

        let identity = fetch_identity(&metadata).await?;
        let context = AuthContext {
            region,
            tenancy_id: identity.tenancy_id.clone(),
            realm_domain,
        };
        let federation_endpoint = options
            .federation_endpoint
            .unwrap_or_else(|| format!("{}/v1/x509", context.auth_endpoint()));

        let session = federate(&http, &federation_endpoint, &identity).await?;
        tracing::info!(
            region = %context.region,
            tenancy = %context.tenancy_id,
            expires_at = ?session.expires_at,
            "Obtained instance principals security token"
        );

        Ok(Arc::new(Self {
            metadata,
            http,
            federation_endpoint,
            context,
            session: RwLock::new(session),
        }))
    }

    async fn refresh_if_needed(&self) -> Result<(), OciApiError> {
        let now = Utc::now().timestamp();
        if !self.session.read().await.expires_soon(now) {
            return Ok(());
        }

        let mut session = self.session.write().await;
        // another request may have refreshed while we waited for the lock
        if !session.expires_soon(now) {
            return Ok(());
        }
        tracing::info!("Security token about to expire, refreshing");
        let identity = fetch_identity(&self.metadata).await?;
        *session = federate(&self.http, &self.federation_endpoint, &identity).await?;
        Ok(())
    }
}

#[async_trait]
impl RequestSigner for InstancePrincipalsSigner {
    fn context(&self) -> AuthContext {
        self.context.clone()
    }

    async fn sign(&self, request: &mut Request) -> Result<(), OciApiError> {
        self.refresh_if_needed().await?;
        let session = self.session.read().await;
        sign_request(&format!("ST${}", session.token), &session.key, request)
    }
}

async fn fetch_identity(metadata: &MetadataClient) -> Result<InstanceIdentity, OciApiError> {
    let leaf_pem = metadata.get_text(LEAF_CERT_PATH).await?;
    let key_pem = metadata.get_text(LEAF_KEY_PATH).await?;
    let intermediate_pem = metadata.get_text(INTERMEDIATE_CERT_PATH).await?;

    let leaf_der = pem_certificates(&leaf_pem)?
        .into_iter()
        .next()
        .ok_or_else(|| OciApiError::Identity("no certificate in cert.pem".to_string()))?;
    let intermediate_ders = pem_certificates(&intermediate_pem)?;
    let leaf_key = parse_private_key_pem(&key_pem)?;
    let tenancy_id = tenancy_from_certificate(&leaf_der)?;

    Ok(InstanceIdentity {
        leaf_der,
        intermediate_ders,
        leaf_key,
        tenancy_id,
    })
}

async fn federate(
    http: &HttpClient,
    endpoint: &str,
    identity: &InstanceIdentity,
) -> Result<SessionCredentials, OciApiError> {
    let session_key = RsaPrivateKey::new(&mut rsa::rand_core::OsRng, SESSION_KEY_BITS)
        .map_err(|e| OciApiError::Identity(format!("session key generation failed: {e}")))?;
    let public_key = session_key
        .to_public_key()
        .to_public_key_der()
        .map_err(|e| OciApiError::Identity(format!("session key encoding failed: {e}")))?;

    let body = FederationRequest {
        certificate: STANDARD.encode(&identity.leaf_der),
        public_key: STANDARD.encode(public_key.as_bytes()),
        intermediate_certificates: identity
            .intermediate_ders
            .iter()
            .map(|der| STANDARD.encode(der))
            .collect(),
        purpose: "DEFAULT",
        fingerprint_algorithm: "SHA256",
    };
    let body = serde_json::to_vec(&body).map_err(|e| OciApiError::JsonSerializeError {
        url: endpoint.to_string(),
        object_debug: "FederationRequest".to_string(),
        source: e,
    })?;

    let key_id = format!(
        "{}/fed-x509-sha256/{}",
        identity.tenancy_id,
        fingerprint(&identity.leaf_der)
    );
    let mut request = http
        .post(endpoint)
        .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
        .header(ACCEPT, HeaderValue::from_static("application/json"))
        .body(body)
        .build()?;
    sign_request(&key_id, &identity.leaf_key, &mut request)?;

    let response = http
        .execute(request)
        .await
        .map_err(|e| OciApiError::NetworkError {
            url: endpoint.to_string(),
            source: e,
        })?;
    let status = response.status();
    let text = response.text().await.map_err(|e| OciApiError::NoContent {
        url: endpoint.to_string(),
        source: e,
    })?;
    if !status.is_success() {
        return Err(OciApiError::Identity(format!(
            "federation endpoint {endpoint} returned {status}: {}",
            truncate(&text, 500)
        )));
    }

    let FederationResponse { token } =
        serde_json::from_str(&text).map_err(|e| OciApiError::JsonDeserializeError {
            url: endpoint.to_string(),
            body: text,
            source: e,
        })?;

    Ok(SessionCredentials {
        expires_at: token_expiry(&token),
        token,
        key: session_key,
    })
}

/// DER bodies of every CERTIFICATE block in a PEM bundle
fn pem_certificates(pem: &str) -> Result<Vec<Vec<u8>>, OciApiError> {
    let mut certificates = Vec::new();
    for block in Pem::iter_from_buffer(pem.as_bytes()) {
        let block = block.map_err(|e| OciApiError::Identity(format!("invalid PEM: {e}")))?;
        if block.label == "CERTIFICATE" {
            certificates.push(block.contents);
        }
    }
    Ok(certificates)
}

/// The tenancy is carried as an `opc-tenant:` OU in the instance certificate subject
fn tenancy_from_certificate(der: &[u8]) -> Result<String, OciApiError> {
    let (_, certificate) = X509Certificate::from_der(der)
        .map_err(|e| OciApiError::Identity(format!("invalid instance certificate: {e}")))?;

    let mut identity_tenancy = None;
    for ou in certificate.subject().iter_organizational_unit() {
        let Ok(value) = ou.as_str() else {
            continue;
        };
        if let Some(tenancy) = value.strip_prefix(TENANCY_OU_PREFIX) {
            return Ok(tenancy.to_string());
        }
        if let Some(tenancy) = value.strip_prefix(IDENTITY_OU_PREFIX) {
            identity_tenancy.get_or_insert_with(|| tenancy.to_string());
        }
    }
    identity_tenancy.ok_or_else(|| {
        OciApiError::Identity("instance certificate carries no tenancy id".to_string())
    })
}

fn fingerprint(der: &[u8]) -> String {
    Sha256::digest(der)
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(":")
}

fn token_expiry(token: &str) -> Option<i64> {
    match jsonwebtoken::dangerous::insecure_decode::<TokenClaims>(token) {
        Ok(data) => data.claims.exp,
        Err(e) => {
            tracing::warn!("Could not read security token expiry: {e}");
            None
        }
    }
}
