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
use std::path::Path;
use std::time::Duration;

use liboci::{DEFAULT_METADATA_AUTHORIZATION, DEFAULT_METADATA_URL, InstancePrincipalsOptions};
use serde::{Deserialize, Serialize};

use crate::errors::ClaimError;

/// Format of the optional claimip configuration file.
///
/// Every field has a default that is correct on an OCI instance; the file only
/// exists to point the tool at other endpoints (testing, other realms).
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimIpConfig {
    #[serde(default)]
    pub metadata: MetadataConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

impl ClaimIpConfig {
    /// Loads the configuration file in toml format from the given path
    pub fn load_from(path: &Path) -> Result<Self, std::io::Error> {
        let data = std::fs::read_to_string(path)?;

        toml::from_str(&data).map_err(|e| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("Invalid ClaimIpConfig toml data: {e}"),
            )
        })
    }

    pub fn load(path: Option<&Path>) -> Result<Self, ClaimError> {
        match path {
            None => Ok(Self::default()),
            Some(path) => Self::load_from(path).map_err(|e| ClaimError::Config {
                path: path.to_path_buf(),
                source: e,
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MetadataConfig {
    #[serde(default = "default_metadata_url")]
    pub base_url: String,
    #[serde(default = "default_metadata_authorization")]
    pub authorization: String,
}

// Called if no `[metadata]` is provided at all.
// The serde defaults above are called if one or more fields are missing.
impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            base_url: default_metadata_url(),
            authorization: default_metadata_authorization(),
        }
    }
}

pub fn default_metadata_url() -> String {
    DEFAULT_METADATA_URL.to_string()
}

pub fn default_metadata_authorization() -> String {
    DEFAULT_METADATA_AUTHORIZATION.to_string()
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct IdentityConfig {
    pub region: Option<String>,
    pub realm_domain: Option<String>,
    pub federation_endpoint: Option<String>,
}

impl IdentityConfig {
    pub fn instance_principals_options(&self) -> InstancePrincipalsOptions {
        InstancePrincipalsOptions {
            region: self.region.clone(),
            realm_domain: self.realm_domain.clone(),
            federation_endpoint: self.federation_endpoint.clone(),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct NetworkConfig {
    /// Overrides `https://iaas.{region}.{realm-domain}`
    pub iaas_endpoint: Option<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Whole-request timeout. Unset leaves the HTTP client's own behavior (no timeout).
    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,
}
