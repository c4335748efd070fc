use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tf_provider::schema::Schema;
use tf_provider::value::ValueEmpty;
use tf_provider::{map, Diagnostics, DynamicDataSource, DynamicResource, Provider};
use tracing::info;

use crate::api_key::ApiKeyResource;
use crate::client::retry::{RetryPolicy, RetryTransport};
use crate::client::transport::ReqwestTransport;
use crate::config::{ClientHandle, Clients, ProviderConfig, Settings};
use crate::connector::ConnectorResource;
use crate::dns_forwarder::DnsForwarderResource;
use crate::environment::{EnvironmentDataSource, EnvironmentResource, EnvironmentsDataSource};
use crate::flink_compute_pool::{FlinkComputePoolDataSource, FlinkComputePoolResource};
use crate::flink_statement::FlinkStatementResource;
use crate::kafka_acl::KafkaAclResource;
use crate::kafka_cluster::{KafkaClusterDataSource, KafkaClusterResource};
use crate::kafka_topic::{KafkaTopicDataSource, KafkaTopicResource};
use crate::network::{NetworkDataSource, NetworkResource};
use crate::organization::OrganizationDataSource;
use crate::role_binding::{RoleBindingDataSource, RoleBindingResource};
use crate::schema_registry_cluster::SchemaRegistryClusterDataSource;
use crate::service_account::{ServiceAccountDataSource, ServiceAccountResource};
use crate::subject_config::SubjectConfigResource;
use crate::utils::WithSchema;

#[derive(Debug, Default, Clone)]
pub struct ConfluentProvider {
    clients: ClientHandle,
}

#[async_trait]
impl Provider for ConfluentProvider {
    type Config<'a> = ProviderConfig<'a>;
    type MetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(ProviderConfig::schema())
    }

    async fn validate<'a>(&self, diags: &mut Diagnostics, config: Self::Config<'a>) -> Option<()> {
        config.validate(diags);
        if diags.errors.is_empty() {
            Some(())
        } else {
            None
        }
    }

    async fn configure<'a>(
        &self,
        diags: &mut Diagnostics,
        terraform_version: String,
        config: Self::Config<'a>,
    ) -> Option<()> {
        let settings = Settings::resolve(diags, &config, |name| std::env::var(name).ok())?;

        let transport = match ReqwestTransport::new() {
            Ok(transport) => transport,
            Err(err) => {
                diags.root_error("Failed to create the HTTP client", err.to_string());
                return None;
            }
        };
        let transport = RetryTransport::new(
            transport,
            RetryPolicy::with_max_retries(settings.max_retries),
        );
        let user_agent = format!(
            "terraform-provider-confluent/{} (terraform {})",
            env!("CARGO_PKG_VERSION"),
            terraform_version
        );

        info!(
            "Configuring provider for {} (Cloud credentials: {}, default Kafka cluster: {:?}, default Schema Registry cluster: {:?}, Flink defaults: {})",
            settings.endpoint,
            settings.cloud_credentials.is_some(),
            settings.kafka.as_ref().map(|kafka| kafka.cluster_id.as_str()),
            settings.schema_registry.as_ref().map(|registry| registry.cluster_id.as_str()),
            settings.flink.is_some(),
        );
        self.clients
            .set(Clients::new(&settings, Arc::new(transport), user_agent));
        Some(())
    }

    fn get_resources(
        &self,
        _diags: &mut Diagnostics,
    ) -> Option<HashMap<String, Box<dyn DynamicResource>>> {
        let clients = &self.clients;
        Some(map! {
            "environment" => EnvironmentResource::new(clients.clone()),
            "service_account" => ServiceAccountResource::new(clients.clone()),
            "api_key" => ApiKeyResource::new(clients.clone()),
            "role_binding" => RoleBindingResource::new(clients.clone()),
            "kafka_cluster" => KafkaClusterResource::new(clients.clone()),
            "kafka_topic" => KafkaTopicResource::new(clients.clone()),
            "kafka_acl" => KafkaAclResource::new(clients.clone()),
            "flink_compute_pool" => FlinkComputePoolResource::new(clients.clone()),
            "flink_statement" => FlinkStatementResource::new(clients.clone()),
            "subject_config" => SubjectConfigResource::new(clients.clone()),
            "network" => NetworkResource::new(clients.clone()),
            "dns_forwarder" => DnsForwarderResource::new(clients.clone()),
            "connector" => ConnectorResource::new(clients.clone()),
        })
    }

    fn get_data_sources(
        &self,
        _diags: &mut Diagnostics,
    ) -> Option<HashMap<String, Box<dyn DynamicDataSource>>> {
        let clients = &self.clients;
        Some(map! {
            "environment" => EnvironmentDataSource::new(clients.clone()),
            "environments" => EnvironmentsDataSource::new(clients.clone()),
            "service_account" => ServiceAccountDataSource::new(clients.clone()),
            "role_binding" => RoleBindingDataSource::new(clients.clone()),
            "kafka_cluster" => KafkaClusterDataSource::new(clients.clone()),
            "kafka_topic" => KafkaTopicDataSource::new(clients.clone()),
            "flink_compute_pool" => FlinkComputePoolDataSource::new(clients.clone()),
            "network" => NetworkDataSource::new(clients.clone()),
            "schema_registry_cluster" => SchemaRegistryClusterDataSource::new(clients.clone()),
            "organization" => OrganizationDataSource::new(clients.clone()),
        })
    }
}
