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

//! liboci is a minimal client for the Oracle Cloud Infrastructure REST APIs
//! that hosts need to manage their own networking: request signing, instance
//! principals, the instance metadata service and the Core Compute and
//! VirtualNetwork services.

mod auth;
mod metadata;
mod oci_api;
pub mod oci_model;
mod signer;

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client as HttpClient, ClientBuilder, Method};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

pub use crate::auth::{InstancePrincipalsOptions, InstancePrincipalsSigner};
pub use crate::metadata::{
    DEFAULT_METADATA_AUTHORIZATION, DEFAULT_METADATA_URL, InstanceMetadataSource,
    MetadataClient, MockInstanceMetadataSource,
};
pub use crate::oci_api::{
    CORE_API_VERSION, Compute, ComputeClient, MockCompute, MockVirtualNetwork, VirtualNetwork,
    VirtualNetworkClient,
};
pub use crate::signer::{
    AuthContext, KeyPairSigner, RequestSigner, parse_private_key_pem, sign_request,
};
pub use reqwest::StatusCode;

const DEFAULT_USER_AGENT: &str = "liboci/0.1";
const MAX_RESPONSE_LENGTH: u64 = 20 * 1024 * 1024;
const NEXT_PAGE_HEADER: &str = "opc-next-page";
const REQUEST_ID_HEADER: &str = "opc-request-id";

#[derive(thiserror::Error, Debug)]
pub enum OciApiError {
    #[error("Network error talking to OCI at {url}. {source}")]
    NetworkError { url: String, source: reqwest::Error },

    #[error("HTTP {status_code} at {url}: {response_body}")]
    HTTPErrorCode {
        url: String,
        status_code: StatusCode,
        response_body: String,
    },

    #[error("Service error {status} {code} at {url}: {message} (opc-request-id: {})", .opc_request_id.as_deref().unwrap_or("none"))]
    ServiceError {
        url: String,
        status: StatusCode,
        code: String,
        message: String,
        opc_request_id: Option<String>,
    },

    #[error("API error {status}: {message} at {url}")]
    APIError {
        url: String,
        status: StatusCode,
        message: String,
    },

    #[error("API error {status}: no response at {url}")]
    APINoResponseError { url: String, status: StatusCode },

    #[error("Could not deserialize response from {url}. Body: {body}. {source}")]
    JsonDeserializeError {
        url: String,
        body: String,
        source: serde_json::Error,
    },

    #[error("Could not serialize request body for {url}. Obj: {object_debug}. {source}")]
    JsonSerializeError {
        url: String,
        object_debug: String,
        source: serde_json::Error,
    },

    #[error("Remote returned empty body at {url}, {source}")]
    NoContent { url: String, source: reqwest::Error },

    #[error("Could not sign request: {0}")]
    Signing(String),

    #[error("Instance principals error: {0}")]
    Identity(String),

    #[error("Reqwest error: '{0}'")]
    ReqwestError(#[from] reqwest::Error),
}

impl OciApiError {
    /// HTTP status returned by the remote side, if the request got that far
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            OciApiError::HTTPErrorCode { status_code, .. } => Some(*status_code),
            OciApiError::ServiceError { status, .. }
            | OciApiError::APIError { status, .. }
            | OciApiError::APINoResponseError { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Error document returned by OCI services on non-2xx responses
#[derive(Debug, serde::Deserialize)]
struct ServiceErrorBody {
    code: String,
    message: String,
}

#[derive(Clone, Debug)]
pub struct OciClientPoolBuilder {
    /// None leaves reqwest's default, which never times out
    pub timeout: Option<Duration>,
    pub user_agent: String,
}

impl OciClientPoolBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn build(&self) -> Result<OciClientPool, OciApiError> {
        let mut builder = ClientBuilder::new().user_agent(self.user_agent.clone());
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        Ok(OciClientPool { client })
    }
}

/// Holds the shared HTTP connection pool. Service clients are cheap handles on top of it.
#[derive(Debug, Clone)]
pub struct OciClientPool {
    client: HttpClient,
}

impl OciClientPool {
    pub fn builder() -> OciClientPoolBuilder {
        OciClientPoolBuilder {
            timeout: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    pub fn http_client(&self) -> HttpClient {
        self.client.clone()
    }

    pub fn metadata_client(&self, base_url: &str, authorization: &str) -> MetadataClient {
        MetadataClient::new(self.client.clone(), base_url, authorization)
    }

    pub fn api_client(&self, endpoint: &str, signer: Arc<dyn RequestSigner>) -> OciApiClient {
        OciApiClient::new(self.client.clone(), endpoint, signer)
    }
}

/// One page of a list operation
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_page: Option<String>,
}

#[derive(Debug)]
struct RawResponse {
    url: String,
    status: StatusCode,
    headers: HeaderMap,
    body: String,
}

/// A signed REST client bound to one service endpoint
#[derive(Debug, Clone)]
pub struct OciApiClient {
    endpoint: String,
    client: HttpClient,
    signer: Arc<dyn RequestSigner>,
}

impl OciApiClient {
    pub fn new(client: HttpClient, endpoint: &str, signer: Arc<dyn RequestSigner>) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            client,
            signer,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn get<T>(&self, api: &str) -> Result<T, OciApiError>
    where
        T: DeserializeOwned + ::std::fmt::Debug,
    {
        let response = self.req(Method::GET, api, &[], None).await?;
        decode_required(response)
    }

    pub async fn get_page<T>(
        &self,
        api: &str,
        query: &[(&str, &str)],
    ) -> Result<Page<T>, OciApiError>
    where
        T: DeserializeOwned + ::std::fmt::Debug,
    {
        let response = self.req(Method::GET, api, query, None).await?;
        let next_page = response
            .headers
            .get(NEXT_PAGE_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let items: Vec<T> = decode_required(response)?;
        Ok(Page { items, next_page })
    }

    /// Fetches every page of a list operation, in the order the service returns them
    pub async fn list<T>(&self, api: &str, query: &[(&str, &str)]) -> Result<Vec<T>, OciApiError>
    where
        T: DeserializeOwned + ::std::fmt::Debug,
    {
        let mut result = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut page_query = query.to_vec();
            if let Some(token) = page_token.as_deref() {
                page_query.push(("page", token));
            }
            let page: Page<T> = self.get_page(api, &page_query).await?;
            result.extend(page.items);
            match page.next_page {
                Some(next) if !next.is_empty() => page_token = Some(next),
                _ => break,
            }
        }
        Ok(result)
    }

    pub async fn post<T, B>(&self, api: &str, data: &B) -> Result<T, OciApiError>
    where
        T: DeserializeOwned + ::std::fmt::Debug,
        B: Serialize + ::std::fmt::Debug,
    {
        let body = serde_json::to_vec(data).map_err(|e| OciApiError::JsonSerializeError {
            url: self.url(api),
            object_debug: format!("{data:?}"),
            source: e,
        })?;
        let response = self.req(Method::POST, api, &[], Some(body)).await?;
        decode_required(response)
    }

    pub async fn delete(&self, api: &str) -> Result<(), OciApiError> {
        self.req(Method::DELETE, api, &[], None).await?;
        Ok(())
    }

    fn url(&self, api: &str) -> String {
        format!("{}/{}", self.endpoint, api.trim_start_matches('/'))
    }

    async fn req(
        &self,
        method: Method,
        api: &str,
        query: &[(&str, &str)],
        body: Option<Vec<u8>>,
    ) -> Result<RawResponse, OciApiError> {
        let url = self.url(api);

        let mut req_b = self
            .client
            .request(method, &url)
            .query(query)
            .header(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(b) = body {
            req_b = req_b
                .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
                .body(b);
        }
        let mut request = req_b.build()?;
        self.signer.sign(&mut request).await?;

        let response = self
            .client
            .execute(request)
            .await
            .map_err(|e| OciApiError::NetworkError {
                url: url.clone(),
                source: e,
            })?;
        let status = response.status();
        // check content length in case of junk responses
        if let Some(len) = response.content_length()
            && len > MAX_RESPONSE_LENGTH
        {
            return Err(OciApiError::APIError {
                url,
                status,
                message: format!("Content length {len} exceeds 20MB limit"),
            });
        }
        let headers = response.headers().clone();
        let response_buffer = response
            .bytes()
            .await
            .map_err(|e| OciApiError::NoContent {
                url: url.clone(),
                source: e,
            })?;
        let body = String::from_utf8_lossy(&response_buffer).to_string();
        debug!("RX {status} {url} {}", truncate(&body, 1500));

        if !status.is_success() {
            let opc_request_id = headers
                .get(REQUEST_ID_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            return Err(match serde_json::from_str::<ServiceErrorBody>(&body) {
                Ok(service_error) => OciApiError::ServiceError {
                    url,
                    status,
                    code: service_error.code,
                    message: service_error.message,
                    opc_request_id,
                },
                Err(_) => OciApiError::HTTPErrorCode {
                    url,
                    status_code: status,
                    response_body: body,
                },
            });
        }

        Ok(RawResponse {
            url,
            status,
            headers,
            body,
        })
    }
}

fn decode_required<T>(response: RawResponse) -> Result<T, OciApiError>
where
    T: DeserializeOwned,
{
    if response.body.is_empty() {
        return Err(OciApiError::APINoResponseError {
            url: response.url,
            status: response.status,
        });
    }
    serde_json::from_str(&response.body).map_err(|e| OciApiError::JsonDeserializeError {
        url: response.url,
        body: response.body,
        source: e,
    })
}

pub(crate) fn truncate(s: &str, len: usize) -> &str {
    match s.char_indices().nth(len) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
