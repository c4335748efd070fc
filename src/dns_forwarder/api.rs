use serde::{Deserialize, Serialize};

use crate::client::model::ObjectRef;
use crate::client::{ApiClient, Error};

const DNS_FORWARDERS: &str = "/networking/v1/dns-forwarders";

pub const KIND_FORWARD_VIA_IP: &str = "ForwardViaIp";

pub const PHASE_PROVISIONING: &str = "PROVISIONING";
pub const PHASE_CREATED: &str = "CREATED";
pub const PHASE_READY: &str = "READY";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DnsForwarder {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default)]
    pub spec: DnsForwarderSpec,
    #[serde(default, skip_serializing)]
    pub status: Option<DnsForwarderStatus>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DnsForwarderSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domains: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<ForwarderConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<ObjectRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway: Option<ObjectRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwarderConfig {
    pub kind: String,
    #[serde(default)]
    pub dns_server_ips: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DnsForwarderStatus {
    pub phase: String,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl DnsForwarder {
    pub fn phase(&self) -> &str {
        self.status
            .as_ref()
            .map(|status| status.phase.as_str())
            .unwrap_or(PHASE_PROVISIONING)
    }
}

pub async fn create(client: &ApiClient, forwarder: &DnsForwarder) -> Result<DnsForwarder, Error> {
    client.post(DNS_FORWARDERS, &[], forwarder).await
}

pub async fn get(client: &ApiClient, environment: &str, id: &str) -> Result<DnsForwarder, Error> {
    client
        .get(&format!("{DNS_FORWARDERS}/{id}"), &[("environment", environment)])
        .await
}

pub async fn update(
    client: &ApiClient,
    id: &str,
    forwarder: &DnsForwarder,
) -> Result<DnsForwarder, Error> {
    client
        .patch(&format!("{DNS_FORWARDERS}/{id}"), &[], forwarder)
        .await
}

pub async fn delete(client: &ApiClient, environment: &str, id: &str) -> Result<(), Error> {
    client
        .delete(&format!("{DNS_FORWARDERS}/{id}"), &[("environment", environment)])
        .await
}
