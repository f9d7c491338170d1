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

// Shared helpers for the liboci integration tests
#![allow(dead_code)]

use std::sync::Arc;

use liboci::{AuthContext, KeyPairSigner, OciClientPool, RequestSigner};
use rsa::RsaPrivateKey;

pub const TEST_KEY_ID: &str = "ocid1.tenancy.oc1..test/ocid1.user.oc1..test/aa:bb";
pub const COMPARTMENT_ID: &str = "ocid1.compartment.oc1..c";
pub const INSTANCE_ID: &str = "ocid1.instance.oc1.iad.i";

pub fn test_key() -> RsaPrivateKey {
    RsaPrivateKey::new(&mut rsa::rand_core::OsRng, 1024).unwrap()
}

pub fn test_signer() -> Arc<dyn RequestSigner> {
    Arc::new(KeyPairSigner::new(
        TEST_KEY_ID,
        test_key(),
        AuthContext::new("us-ashburn-1", "ocid1.tenancy.oc1..test"),
    ))
}

pub fn test_pool() -> OciClientPool {
    OciClientPool::builder().build().unwrap()
}

/// Matches any OCI signature header made with the given key id
pub fn signature_matcher(key_id: &str) -> mockito::Matcher {
    mockito::Matcher::Regex(format!(
        r#"^Signature version="1",headers="[^"]+",keyId="{}",algorithm="rsa-sha256",signature="[A-Za-z0-9+/=]+"$"#,
        regex_escape(key_id)
    ))
}

fn regex_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if "\\.+*?()|[]{}^$".contains(c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
