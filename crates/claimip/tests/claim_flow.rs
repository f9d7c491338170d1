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

// End to end claim runs against an in-memory model of the Core services

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use claimip::{ClaimError, ClaimRequest, run};
use liboci::oci_model::{
    AttachmentLifecycleState, CreatePrivateIpDetails, InstanceMetadata, PrivateIp, Vnic,
    VnicAttachment,
};
use liboci::{
    Compute, MetadataClient, MockCompute, MockInstanceMetadataSource, OciApiError,
    OciClientPool, StatusCode, VirtualNetwork,
};

const INSTANCE_ID: &str = "ocid1.instance.oc1.iad.this";
const COMPARTMENT_ID: &str = "ocid1.compartment.oc1..c";
const SUBNET_ID: &str = "ocid1.subnet.oc1.iad.s";
const VNIC_A: &str = "ocid1.vnic.oc1.iad.a";
const VNIC_B: &str = "ocid1.vnic.oc1.iad.b";
const FLOATING_IP: &str = "10.0.0.50";

/// Attachments, VNICs and private IPs of one subnet, mutated by the claim
#[derive(Default)]
struct FakeCloud {
    attachments: Vec<VnicAttachment>,
    vnics: HashMap<String, Vnic>,
    private_ips: Mutex<Vec<PrivateIp>>,
    deleted: Mutex<Vec<String>>,
    created: Mutex<Vec<CreatePrivateIpDetails>>,
    listed_for: Mutex<Vec<(String, String)>>,
    fail_vnic: Option<String>,
}

impl FakeCloud {
    fn attach(&mut self, vnic_id: &str) {
        self.attach_in_state(vnic_id, AttachmentLifecycleState::Attached);
    }

    fn attach_in_state(&mut self, vnic_id: &str, lifecycle_state: AttachmentLifecycleState) {
        self.attachments.push(VnicAttachment {
            id: format!("attachment-{vnic_id}"),
            instance_id: INSTANCE_ID.to_string(),
            vnic_id: Some(vnic_id.to_string()),
            subnet_id: Some(SUBNET_ID.to_string()),
            lifecycle_state,
            nic_index: None,
            display_name: None,
        });
        self.vnics.insert(
            vnic_id.to_string(),
            Vnic {
                id: vnic_id.to_string(),
                subnet_id: SUBNET_ID.to_string(),
                private_ip: None,
                is_primary: None,
                lifecycle_state: Some("AVAILABLE".to_string()),
                display_name: None,
                mac_address: None,
            },
        );
    }

    fn assign(&self, ip_address: &str, vnic_id: &str) {
        let mut private_ips = self.private_ips.lock().unwrap();
        let id = format!("ocid1.privateip.oc1.iad.{}", private_ips.len() + self.deleted_count());
        private_ips.push(PrivateIp {
            id,
            ip_address: ip_address.to_string(),
            vnic_id: Some(vnic_id.to_string()),
            subnet_id: Some(SUBNET_ID.to_string()),
            is_primary: Some(false),
            display_name: None,
        });
    }

    fn deleted_count(&self) -> usize {
        self.deleted.lock().unwrap().len()
    }

    fn holders_of(&self, ip_address: &str) -> Vec<String> {
        self.private_ips
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.ip_address == ip_address)
            .filter_map(|p| p.vnic_id.clone())
            .collect()
    }
}

#[async_trait]
impl Compute for FakeCloud {
    async fn list_vnic_attachments(
        &self,
        compartment_id: &str,
        instance_id: &str,
    ) -> Result<Vec<VnicAttachment>, OciApiError> {
        self.listed_for
            .lock()
            .unwrap()
            .push((compartment_id.to_string(), instance_id.to_string()));
        Ok(self.attachments.clone())
    }
}

#[async_trait]
impl VirtualNetwork for FakeCloud {
    async fn get_vnic(&self, vnic_id: &str) -> Result<Vnic, OciApiError> {
        if self.fail_vnic.as_deref() == Some(vnic_id) {
            return Err(not_found(vnic_id));
        }
        self.vnics.get(vnic_id).cloned().ok_or_else(|| not_found(vnic_id))
    }

    async fn list_private_ips(&self, subnet_id: &str) -> Result<Vec<PrivateIp>, OciApiError> {
        Ok(self
            .private_ips
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.subnet_id.as_deref() == Some(subnet_id))
            .cloned()
            .collect())
    }

    async fn delete_private_ip(&self, private_ip_id: &str) -> Result<(), OciApiError> {
        let mut private_ips = self.private_ips.lock().unwrap();
        let before = private_ips.len();
        private_ips.retain(|p| p.id != private_ip_id);
        if private_ips.len() == before {
            return Err(not_found(private_ip_id));
        }
        self.deleted.lock().unwrap().push(private_ip_id.to_string());
        Ok(())
    }

    async fn create_private_ip(
        &self,
        details: CreatePrivateIpDetails,
    ) -> Result<PrivateIp, OciApiError> {
        self.created.lock().unwrap().push(details.clone());
        self.assign(&details.ip_address, &details.vnic_id);
        let created = self
            .private_ips
            .lock()
            .unwrap()
            .last()
            .cloned()
            .ok_or_else(|| not_found(&details.ip_address))?;
        Ok(created)
    }
}

fn not_found(what: &str) -> OciApiError {
    OciApiError::HTTPErrorCode {
        url: format!("https://iaas.example.com/20160918/{what}"),
        status_code: StatusCode::NOT_FOUND,
        response_body: String::new(),
    }
}

fn this_instance() -> MockInstanceMetadataSource {
    let mut metadata = MockInstanceMetadataSource::new();
    metadata.expect_get_instance_metadata().returning(|| {
        Ok(InstanceMetadata {
            id: INSTANCE_ID.to_string(),
            compartment_id: COMPARTMENT_ID.to_string(),
            display_name: None,
            region: None,
            canonical_region_name: None,
            availability_domain: None,
            tenant_id: None,
            extra: HashMap::new(),
        })
    });
    metadata
}

fn two_vnic_cloud() -> FakeCloud {
    let mut cloud = FakeCloud::default();
    cloud.attach(VNIC_A);
    cloud.attach(VNIC_B);
    cloud
}

fn request(ip_address: &str) -> ClaimRequest {
    ClaimRequest {
        ip_address: ip_address.to_string(),
        ..Default::default()
    }
}

#[tokio::test]
async fn moves_address_from_other_vnic_to_first() {
    let cloud = two_vnic_cloud();
    cloud.assign(FLOATING_IP, VNIC_B);
    cloud.assign("10.0.0.51", VNIC_B);

    let report = run(&this_instance(), &cloud, &cloud, &request(FLOATING_IP))
        .await
        .unwrap();

    assert_eq!(report.ip_address, FLOATING_IP);
    assert_eq!(report.vnic_id, VNIC_A);
    assert_eq!(report.subnet_id, SUBNET_ID);
    assert_eq!(report.released.len(), 1);
    assert_eq!(cloud.deleted_count(), 1);
    assert_eq!(cloud.created.lock().unwrap().len(), 1);
    assert_eq!(cloud.holders_of(FLOATING_IP), vec![VNIC_A.to_string()]);
    // other addresses in the subnet are left alone
    assert_eq!(cloud.holders_of("10.0.0.51"), vec![VNIC_B.to_string()]);
}

#[tokio::test]
async fn discovery_uses_metadata_identifiers() {
    let cloud = two_vnic_cloud();

    run(&this_instance(), &cloud, &cloud, &request(FLOATING_IP))
        .await
        .unwrap();

    assert_eq!(
        *cloud.listed_for.lock().unwrap(),
        vec![(COMPARTMENT_ID.to_string(), INSTANCE_ID.to_string())]
    );
    assert_eq!(cloud.deleted_count(), 0);
    assert_eq!(cloud.holders_of(FLOATING_IP), vec![VNIC_A.to_string()]);
}

#[tokio::test]
async fn claiming_again_recreates_own_assignment() {
    let cloud = two_vnic_cloud();
    cloud.assign(FLOATING_IP, VNIC_B);

    run(&this_instance(), &cloud, &cloud, &request(FLOATING_IP))
        .await
        .unwrap();
    let second = run(&this_instance(), &cloud, &cloud, &request(FLOATING_IP))
        .await
        .unwrap();

    assert_eq!(second.released.len(), 1);
    assert_eq!(second.released[0].vnic_id.as_deref(), Some(VNIC_A));
    assert_eq!(cloud.deleted_count(), 2);
    assert_eq!(cloud.holders_of(FLOATING_IP), vec![VNIC_A.to_string()]);
}

#[tokio::test]
async fn requested_vnic_receives_address() {
    let cloud = two_vnic_cloud();
    cloud.assign(FLOATING_IP, VNIC_A);

    let request = ClaimRequest {
        ip_address: FLOATING_IP.to_string(),
        vnic_id: Some(VNIC_B.to_string()),
        ..Default::default()
    };
    let report = run(&this_instance(), &cloud, &cloud, &request).await.unwrap();

    assert_eq!(report.vnic_id, VNIC_B);
    assert_eq!(cloud.holders_of(FLOATING_IP), vec![VNIC_B.to_string()]);
}

#[tokio::test]
async fn detaching_first_vnic_is_still_the_default_target() {
    let mut cloud = FakeCloud::default();
    cloud.attach_in_state(VNIC_A, AttachmentLifecycleState::Detaching);
    cloud.attach(VNIC_B);

    let report = run(&this_instance(), &cloud, &cloud, &request(FLOATING_IP))
        .await
        .unwrap();
    assert_eq!(report.vnic_id, VNIC_A);

    let request = ClaimRequest {
        ip_address: FLOATING_IP.to_string(),
        skip_detached: true,
        ..Default::default()
    };
    let report = run(&this_instance(), &cloud, &cloud, &request).await.unwrap();
    assert_eq!(report.vnic_id, VNIC_B);
    assert_eq!(cloud.holders_of(FLOATING_IP), vec![VNIC_B.to_string()]);
}

#[tokio::test]
async fn instance_without_vnics() {
    let cloud = FakeCloud::default();

    let err = run(&this_instance(), &cloud, &cloud, &request(FLOATING_IP))
        .await
        .unwrap_err();

    assert!(matches!(err, ClaimError::NoVnics { ref instance_id } if instance_id == INSTANCE_ID));
    assert!(cloud.created.lock().unwrap().is_empty());
}

#[tokio::test]
async fn partial_discovery_still_claims_on_first_vnic() {
    let mut cloud = two_vnic_cloud();
    cloud.fail_vnic = Some(VNIC_B.to_string());

    let report = run(&this_instance(), &cloud, &cloud, &request(FLOATING_IP))
        .await
        .unwrap();

    assert_eq!(report.vnic_id, VNIC_A);
}

#[tokio::test]
async fn strict_discovery_refuses_partial_results() {
    let mut cloud = two_vnic_cloud();
    cloud.fail_vnic = Some(VNIC_B.to_string());

    let request = ClaimRequest {
        ip_address: FLOATING_IP.to_string(),
        vnic_id: None,
        strict_discovery: true,
        ..Default::default()
    };
    let err = run(&this_instance(), &cloud, &cloud, &request)
        .await
        .unwrap_err();

    assert!(matches!(err, ClaimError::Discovery(_)));
    assert!(cloud.created.lock().unwrap().is_empty());
}

#[tokio::test]
async fn metadata_failure_stops_before_discovery() {
    let mut server = mockito::Server::new_async().await;
    let instance = server
        .mock("GET", "/opc/v2/instance/")
        .match_header("authorization", "Bearer Oracle")
        .with_status(500)
        .with_body("unavailable")
        .create_async()
        .await;

    let pool = OciClientPool::builder().build().unwrap();
    let metadata: MetadataClient =
        pool.metadata_client(&format!("{}/opc/v2", server.url()), "Bearer Oracle");
    let mut compute = MockCompute::new();
    compute.expect_list_vnic_attachments().never();
    let cloud = FakeCloud::default();

    let err = run(&metadata, &compute, &cloud, &request(FLOATING_IP))
        .await
        .unwrap_err();

    assert!(matches!(err, ClaimError::Metadata(_)));
    assert_eq!(err.exit_code(), 1);
    instance.assert_async().await;
}
