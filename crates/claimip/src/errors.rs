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
use std::path::PathBuf;

use liboci::OciApiError;

/// Process exit status for the failures operators script against
pub const FATAL_EXIT_CODE: i32 = -1;
/// Everything else that aborts a run
pub const FAILURE_EXIT_CODE: i32 = 1;

#[derive(thiserror::Error, Debug)]
pub enum ClaimError {
    #[error("Error: No IP address provided.")]
    NoIpAddress,

    #[error("Error loading configuration from {}: {source}", .path.display())]
    Config {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Could not set up the HTTP client: {0}")]
    HttpClient(OciApiError),

    #[error("Error obtaining instance principals certificate, aborting")]
    Identity(#[source] OciApiError),

    #[error("Error retrieving instance metadata: {0}")]
    Metadata(OciApiError),

    #[error("Error retrieving VNICs: {0}")]
    Discovery(OciApiError),

    #[error("No VNIC is attached to instance {instance_id}")]
    NoVnics { instance_id: String },

    #[error("VNIC {vnic_id} is not attached to instance {instance_id}")]
    VnicNotAttached {
        vnic_id: String,
        instance_id: String,
    },

    #[error("Could not claim {ip_address}: {source}")]
    Oci {
        ip_address: String,
        source: OciApiError,
    },

    #[error(
        "Orphaned IP: {ip_address} was deleted from {} but not reassigned: {source}",
        .released_from.join(", ")
    )]
    OrphanedIp {
        ip_address: String,
        /// VNICs (or private IP ids, when the VNIC was unknown) that held the address
        released_from: Vec<String>,
        source: OciApiError,
    },
}

impl ClaimError {
    pub fn exit_code(&self) -> i32 {
        match self {
            ClaimError::NoIpAddress | ClaimError::Identity(_) => FATAL_EXIT_CODE,
            _ => FAILURE_EXIT_CODE,
        }
    }
}
