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

use async_trait::async_trait;
use mockall::automock;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderValue};
use reqwest::{Client as HttpClient, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::oci_model::{InstanceMetadata, RegionInfo};
use crate::{OciApiError, truncate};

/// Link-local instance metadata service, v2 API
pub const DEFAULT_METADATA_URL: &str = "http://169.254.169.254/opc/v2";
/// IMDS v2 rejects requests without this header
pub const DEFAULT_METADATA_AUTHORIZATION: &str = "Bearer Oracle";

const INSTANCE_PATH: &str = "instance/";
const REGION_INFO_PATH: &str = "instance/regionInfo/";

#[automock]
#[async_trait]
pub trait InstanceMetadataSource: Send + Sync {
    /// Identity of the instance this process runs on
    async fn get_instance_metadata(&self) -> Result<InstanceMetadata, OciApiError>;
}

#[derive(Debug, Clone)]
pub struct MetadataClient {
    base_url: String,
    authorization: String,
    client: HttpClient,
}

impl MetadataClient {
    pub fn new(client: HttpClient, base_url: &str, authorization: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            authorization: authorization.to_string(),
            client,
        }
    }

    pub fn with_defaults(client: HttpClient) -> Self {
        Self::new(client, DEFAULT_METADATA_URL, DEFAULT_METADATA_AUTHORIZATION)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GETs `{base_url}/{path}`. Anything but 200 is an error carrying the status and body.
    pub async fn get_text(&self, path: &str) -> Result<String, OciApiError> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let authorization = HeaderValue::from_str(&self.authorization)
            .map_err(|e| OciApiError::Signing(format!("invalid metadata authorization: {e}")))?;

        let response = self
            .client
            .get(&url)
            .header(AUTHORIZATION, authorization)
            .header(ACCEPT, HeaderValue::from_static("*/*"))
            .send()
            .await
            .map_err(|e| OciApiError::NetworkError {
                url: url.clone(),
                source: e,
            })?;
        let status_code = response.status();
        let response_body = response
            .text()
            .await
            .map_err(|e| OciApiError::NoContent {
                url: url.clone(),
                source: e,
            })?;
        debug!("RX {status_code} {url} {}", truncate(&response_body, 200));

        if status_code != StatusCode::OK {
            return Err(OciApiError::HTTPErrorCode {
                url,
                status_code,
                response_body,
            });
        }
        Ok(response_body)
    }

    pub async fn get_json<T>(&self, path: &str) -> Result<T, OciApiError>
    where
        T: DeserializeOwned,
    {
        let body = self.get_text(path).await?;
        serde_json::from_str(&body).map_err(|e| OciApiError::JsonDeserializeError {
            url: format!("{}/{}", self.base_url, path),
            body,
            source: e,
        })
    }

    pub async fn get_region_info(&self) -> Result<RegionInfo, OciApiError> {
        self.get_json(REGION_INFO_PATH).await
    }
}

#[async_trait]
impl InstanceMetadataSource for MetadataClient {
    async fn get_instance_metadata(&self) -> Result<InstanceMetadata, OciApiError> {
        self.get_json(INSTANCE_PATH).await
    }
}
