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

//! claimip moves a floating private IP address onto this instance: it
//! authenticates as the instance, finds its VNICs, removes the address from
//! whichever VNIC holds it in the subnet and re-creates it as a secondary
//! private IP on the first VNIC of this instance.

use liboci::{
    Compute, ComputeClient, InstanceMetadataSource, InstancePrincipalsSigner, OciClientPool,
    RequestSigner, VirtualNetwork, VirtualNetworkClient,
};
use tracing::metadata::LevelFilter;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::prelude::*;

pub use crate::claim::{ClaimReport, claim_ip_as_secondary};
pub use crate::command_line::Options;
pub use crate::config::ClaimIpConfig;
pub use crate::discovery::{VnicDiscovery, get_vnics_from_instance, select_vnic};
pub use crate::errors::{ClaimError, FAILURE_EXIT_CODE, FATAL_EXIT_CODE};

mod claim;
mod command_line;
pub mod config;
mod discovery;
mod errors;

/// Initialize global logging output to STDERR, keeping STDOUT for the result line.
/// Use `export RUST_LOG=trace|debug|info|warn|error` to change log level.
pub fn init_logging() -> eyre::Result<()> {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy()
        .add_directive("hyper=warn".parse()?)
        .add_directive("hyper_util=warn".parse()?)
        .add_directive("rustls=warn".parse()?)
        .add_directive("reqwest=warn".parse()?)
        .add_directive("h2=warn".parse()?);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(env_filter),
        )
        .try_init()?;
    Ok(())
}

/// What to claim, and how strict to be about it
#[derive(Debug, Clone, Default)]
pub struct ClaimRequest {
    pub ip_address: String,
    /// Claim on this VNIC instead of the first one attached
    pub vnic_id: Option<String>,
    /// Fail when some VNICs could not be resolved
    pub strict_discovery: bool,
    /// Leave detaching and detached attachments out of discovery
    pub skip_detached: bool,
}

/// Runs the whole claim against the real services, authenticating as this instance.
pub async fn start(options: Options) -> Result<ClaimReport, ClaimError> {
    let Some(ip_address) = options.ip_address else {
        return Err(ClaimError::NoIpAddress);
    };
    let config = ClaimIpConfig::load(options.config_path.as_deref())?;
    tracing::debug!("Using configuration {config:?}");

    let mut pool_builder = OciClientPool::builder();
    if let Some(timeout) = config.http.timeout {
        pool_builder = pool_builder.timeout(timeout);
    }
    let pool = pool_builder.build().map_err(ClaimError::HttpClient)?;
    let metadata = pool.metadata_client(&config.metadata.base_url, &config.metadata.authorization);

    let signer = InstancePrincipalsSigner::new(
        metadata.clone(),
        pool.http_client(),
        config.identity.instance_principals_options(),
    )
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "Instance principals authentication failed");
        ClaimError::Identity(e)
    })?;

    let iaas_endpoint = config
        .network
        .iaas_endpoint
        .clone()
        .unwrap_or_else(|| signer.context().iaas_endpoint());
    let compute = ComputeClient::new(pool.api_client(&iaas_endpoint, signer.clone()));
    let network = VirtualNetworkClient::new(pool.api_client(&iaas_endpoint, signer));

    let request = ClaimRequest {
        ip_address,
        vnic_id: options.vnic,
        strict_discovery: options.strict_discovery,
        skip_detached: options.skip_detached,
    };
    run(&metadata, &compute, &network, &request).await
}

/// Metadata lookup, VNIC discovery and reassignment, one step after the other.
pub async fn run(
    metadata: &dyn InstanceMetadataSource,
    compute: &dyn Compute,
    network: &dyn VirtualNetwork,
    request: &ClaimRequest,
) -> Result<ClaimReport, ClaimError> {
    let instance = metadata
        .get_instance_metadata()
        .await
        .map_err(ClaimError::Metadata)?;
    tracing::info!(
        instance_id = %instance.id,
        compartment_id = %instance.compartment_id,
        "Claiming {} for this instance",
        request.ip_address
    );

    let vnics = match get_vnics_from_instance(
        compute,
        network,
        &instance.id,
        &instance.compartment_id,
        request.skip_detached,
    )
    .await
    {
        VnicDiscovery::Complete(vnics) => vnics,
        VnicDiscovery::Partial { error, .. } if request.strict_discovery => {
            return Err(ClaimError::Discovery(error));
        }
        VnicDiscovery::Partial { vnics, .. } => {
            tracing::warn!(
                resolved = vnics.len(),
                "Continuing with the VNICs resolved before the error"
            );
            vnics
        }
    };

    let vnic = select_vnic(&vnics, request.vnic_id.as_deref(), &instance.id)?;
    claim_ip_as_secondary(network, &request.ip_address, &vnic.id).await
}
