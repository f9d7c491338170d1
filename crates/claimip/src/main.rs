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

fn main() -> eyre::Result<()> {
    claimip::init_logging()?;

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    match rt.block_on(claimip::start(claimip::Options::load())) {
        Ok(report) => {
            println!("{} has been claimed", report.ip_address);
            Ok(())
        }
        Err(e) if e.exit_code() == claimip::FATAL_EXIT_CODE => {
            println!("{e}");
            std::process::exit(e.exit_code());
        }
        Err(e) => Err(e.into()),
    }
}
