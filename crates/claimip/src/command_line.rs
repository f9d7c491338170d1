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

use clap::Parser;

#[derive(Parser, Debug, Default)]
#[clap(
    name = "claimip",
    about = "Move a floating private IP address onto a VNIC of this instance"
)]
pub struct Options {
    /// The private IP address to claim. Checked by `start` rather than clap so
    /// a missing address produces the documented message and exit status.
    pub ip_address: Option<String>,

    /// Path to a TOML file overriding the built in endpoints and timeouts
    #[clap(long)]
    pub config_path: Option<PathBuf>,

    #[clap(
        long,
        help = "OCID of the VNIC to claim the address on. Defaults to the first attached VNIC"
    )]
    pub vnic: Option<String>,

    #[clap(
        long,
        help = "Abort instead of continuing when some VNICs of the instance could not be resolved"
    )]
    pub strict_discovery: bool,

    #[clap(
        long,
        help = "Leave detaching and detached VNIC attachments out when choosing the VNIC"
    )]
    pub skip_detached: bool,
}

impl Options {
    pub fn load() -> Self {
        Self::parse()
    }
}
