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
use liboci::oci_model::{CreatePrivateIpDetails, PrivateIp};
use liboci::{OciApiError, VirtualNetwork};

use crate::errors::ClaimError;

/// What a successful claim changed
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimReport {
    pub ip_address: String,
    pub vnic_id: String,
    pub subnet_id: String,
    /// Assignments of the address that were deleted before re-creating it
    pub released: Vec<PrivateIp>,
    pub created: PrivateIp,
}

/// Moves `ip_address` onto `vnic_id` as a secondary private IP.
///
/// Every existing assignment of the address in the VNIC's subnet is deleted
/// first, then the address is created on the VNIC. The steps are not atomic:
/// if a later delete or the create fails after a delete went through, the
/// address is left unassigned and `ClaimError::OrphanedIp` says where it came from.
pub async fn claim_ip_as_secondary(
    network: &dyn VirtualNetwork,
    ip_address: &str,
    vnic_id: &str,
) -> Result<ClaimReport, ClaimError> {
    let oci_error = |source: OciApiError| ClaimError::Oci {
        ip_address: ip_address.to_string(),
        source,
    };

    let vnic = network.get_vnic(vnic_id).await.map_err(oci_error)?;
    let private_ips = network
        .list_private_ips(&vnic.subnet_id)
        .await
        .map_err(oci_error)?;

    let mut released = Vec::new();
    if !ip_address.is_empty() {
        for private_ip in private_ips
            .into_iter()
            .filter(|private_ip| private_ip.ip_address == ip_address)
        {
            tracing::info!(
                private_ip_id = %private_ip.id,
                vnic_id = private_ip.vnic_id.as_deref().unwrap_or("unknown"),
                "Removing {ip_address} from its current VNIC"
            );
            if let Err(source) = network.delete_private_ip(&private_ip.id).await {
                if released.is_empty() {
                    return Err(oci_error(source));
                }
                tracing::error!(error = %source, "{ip_address} was partially released");
                return Err(orphaned(ip_address, &released, source));
            }
            released.push(private_ip);
        }
    }

    let details = CreatePrivateIpDetails {
        ip_address: ip_address.to_string(),
        vnic_id: vnic_id.to_string(),
        display_name: None,
    };
    match network.create_private_ip(details).await {
        Ok(created) => {
            tracing::info!(
                private_ip_id = %created.id,
                vnic_id,
                subnet_id = %vnic.subnet_id,
                released = released.len(),
                "Assigned {ip_address} as secondary private IP"
            );
            Ok(ClaimReport {
                ip_address: ip_address.to_string(),
                vnic_id: vnic_id.to_string(),
                subnet_id: vnic.subnet_id,
                released,
                created,
            })
        }
        Err(source) if !released.is_empty() => {
            tracing::error!(error = %source, "{ip_address} was released but could not be reassigned");
            Err(orphaned(ip_address, &released, source))
        }
        Err(source) => Err(oci_error(source)),
    }
}

fn orphaned(ip_address: &str, released: &[PrivateIp], source: OciApiError) -> ClaimError {
    let released_from = released
        .iter()
        .map(|private_ip| {
            private_ip
                .vnic_id
                .clone()
                .unwrap_or_else(|| private_ip.id.clone())
        })
        .collect();
    ClaimError::OrphanedIp {
        ip_address: ip_address.to_string(),
        released_from,
        source,
    }
}
