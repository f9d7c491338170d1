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

// Exit status and output of the claimip binary

use std::io::Write;
use std::process::Command;

fn claimip() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_claimip"));
    command.env("RUST_LOG", "error");
    command
}

#[test]
fn missing_address_exits_fatal() {
    let output = claimip().output().unwrap();

    assert_eq!(output.status.code(), Some(255));
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        "Error: No IP address provided."
    );
}

#[test]
fn missing_certificate_exits_fatal() {
    let mut server = mockito::Server::new();
    let certificate = server
        .mock("GET", "/opc/v2/identity/cert.pem")
        .with_status(404)
        .with_body("not found")
        .create();
    let instance = server.mock("GET", "/opc/v2/instance/").expect(0).create();

    let mut config = tempfile::NamedTempFile::new().unwrap();
    write!(
        config,
        r#"
[metadata]
base-url = "{}/opc/v2"

[identity]
region = "us-ashburn-1"
realm-domain = "oraclecloud.com"

[http]
timeout = "5s"
"#,
        server.url()
    )
    .unwrap();

    let output = claimip()
        .arg("10.0.0.50")
        .arg("--config-path")
        .arg(config.path())
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(255));
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        "Error obtaining instance principals certificate, aborting"
    );
    certificate.assert();
    instance.assert();
}

#[test]
fn unreadable_config_is_not_fatal() {
    let output = claimip()
        .arg("10.0.0.50")
        .arg("--config-path")
        .arg("/nonexistent/claimip.toml")
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
}
