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
use tracing::debug;

use crate::oci_model::*;
use crate::{OciApiClient, OciApiError};

/// Path prefix of the Core services API
pub const CORE_API_VERSION: &str = "20160918";

#[automock]
#[async_trait]
pub trait Compute: Send + Sync {
    /// All VNIC attachments of an instance, in service order
    async fn list_vnic_attachments(
        &self,
        compartment_id: &str,
        instance_id: &str,
    ) -> Result<Vec<VnicAttachment>, OciApiError>;
}

#[automock]
#[async_trait]
pub trait VirtualNetwork: Send + Sync {
    async fn get_vnic(&self, vnic_id: &str) -> Result<Vnic, OciApiError>;
    async fn list_private_ips(&self, subnet_id: &str) -> Result<Vec<PrivateIp>, OciApiError>;
    async fn delete_private_ip(&self, private_ip_id: &str) -> Result<(), OciApiError>;
    async fn create_private_ip(
        &self,
        details: CreatePrivateIpDetails,
    ) -> Result<PrivateIp, OciApiError>;
}

#[derive(Clone, Debug)]
pub struct ComputeClient {
    pub client: OciApiClient,
}

impl ComputeClient {
    pub fn new(client: OciApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Compute for ComputeClient {
    async fn list_vnic_attachments(
        &self,
        compartment_id: &str,
        instance_id: &str,
    ) -> Result<Vec<VnicAttachment>, OciApiError> {
        let url = format!("{CORE_API_VERSION}/vnicAttachments");
        self.client
            .list(
                &url,
                &[
                    ("compartmentId", compartment_id),
                    ("instanceId", instance_id),
                ],
            )
            .await
    }
}

#[derive(Clone, Debug)]
pub struct VirtualNetworkClient {
    pub client: OciApiClient,
}

impl VirtualNetworkClient {
    pub fn new(client: OciApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl VirtualNetwork for VirtualNetworkClient {
    async fn get_vnic(&self, vnic_id: &str) -> Result<Vnic, OciApiError> {
        let url = format!("{CORE_API_VERSION}/vnics/{vnic_id}");
        self.client.get(&url).await
    }

    async fn list_private_ips(&self, subnet_id: &str) -> Result<Vec<PrivateIp>, OciApiError> {
        let url = format!("{CORE_API_VERSION}/privateIps");
        self.client.list(&url, &[("subnetId", subnet_id)]).await
    }

    async fn delete_private_ip(&self, private_ip_id: &str) -> Result<(), OciApiError> {
        let url = format!("{CORE_API_VERSION}/privateIps/{private_ip_id}");
        debug!("Deleting private IP {private_ip_id}");
        self.client.delete(&url).await
    }

    async fn create_private_ip(
        &self,
        details: CreatePrivateIpDetails,
    ) -> Result<PrivateIp, OciApiError> {
        let url = format!("{CORE_API_VERSION}/privateIps");
        self.client.post(&url, &details).await
    }
}
