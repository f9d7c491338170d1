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
use liboci::oci_model::{AttachmentLifecycleState, Vnic};
use liboci::{Compute, OciApiError, VirtualNetwork};

use crate::errors::ClaimError;

/// Outcome of resolving the VNICs of an instance.
///
/// A service error stops discovery but keeps what was resolved so far; the
/// caller decides whether a partial list is good enough.
#[derive(Debug)]
pub enum VnicDiscovery {
    Complete(Vec<Vnic>),
    Partial { vnics: Vec<Vnic>, error: OciApiError },
}

impl VnicDiscovery {
    pub fn vnics(&self) -> &[Vnic] {
        match self {
            VnicDiscovery::Complete(vnics) | VnicDiscovery::Partial { vnics, .. } => vnics,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, VnicDiscovery::Complete(_))
    }

    pub fn into_parts(self) -> (Vec<Vnic>, Option<OciApiError>) {
        match self {
            VnicDiscovery::Complete(vnics) => (vnics, None),
            VnicDiscovery::Partial { vnics, error } => (vnics, Some(error)),
        }
    }
}

/// Lists the VNIC attachments of the instance and resolves each one into its
/// VNIC, keeping the order the service lists them in. Attachments that are
/// detaching or detached are resolved too unless `skip_detached` is set.
pub async fn get_vnics_from_instance(
    compute: &dyn Compute,
    network: &dyn VirtualNetwork,
    instance_id: &str,
    compartment_id: &str,
    skip_detached: bool,
) -> VnicDiscovery {
    let attachments = match compute
        .list_vnic_attachments(compartment_id, instance_id)
        .await
    {
        Ok(attachments) => attachments,
        Err(error) => {
            tracing::error!(error = %error, "Error retrieving VNICs");
            return VnicDiscovery::Partial {
                vnics: Vec::new(),
                error,
            };
        }
    };

    let mut vnics = Vec::with_capacity(attachments.len());
    for attachment in attachments {
        if skip_detached
            && matches!(
                attachment.lifecycle_state,
                AttachmentLifecycleState::Detaching | AttachmentLifecycleState::Detached
            )
        {
            tracing::debug!(attachment = %attachment.id, "Skipping detached VNIC attachment");
            continue;
        }
        let Some(vnic_id) = attachment.vnic_id.as_deref() else {
            tracing::debug!(attachment = %attachment.id, "Skipping VNIC attachment without VNIC");
            continue;
        };
        match network.get_vnic(vnic_id).await {
            Ok(vnic) => vnics.push(vnic),
            Err(error) => {
                tracing::error!(error = %error, vnic_id, "Error retrieving VNICs");
                return VnicDiscovery::Partial { vnics, error };
            }
        }
    }
    VnicDiscovery::Complete(vnics)
}

/// Picks the VNIC to claim the address on: the requested one, or the first listed
pub fn select_vnic<'a>(
    vnics: &'a [Vnic],
    requested: Option<&str>,
    instance_id: &str,
) -> Result<&'a Vnic, ClaimError> {
    match requested {
        None => vnics.first().ok_or_else(|| ClaimError::NoVnics {
            instance_id: instance_id.to_string(),
        }),
        Some(vnic_id) => vnics
            .iter()
            .find(|vnic| vnic.id == vnic_id)
            .ok_or_else(|| ClaimError::VnicNotAttached {
                vnic_id: vnic_id.to_string(),
                instance_id: instance_id.to_string(),
            }),
    }
}
