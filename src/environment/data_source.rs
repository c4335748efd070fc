use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tf_provider::schema::{
    Attribute, AttributeConstraint, AttributeType, Block, Description, Schema,
};
use tf_provider::value::{ValueEmpty, ValueSet, ValueString};
use tf_provider::{map, DataSource, Diagnostics};
use tracing::debug;

use super::api;
use super::resource::{stream_governance_type, EnvironmentState};
use crate::client::to_json;
use crate::config::ClientHandle;
use crate::utils::{find_by_display_name, report, string_set, validate_id_or_name};

#[derive(Debug, Default, Clone)]
pub struct EnvironmentDataSource {
    clients: ClientHandle,
}

impl EnvironmentDataSource {
    pub fn new(clients: ClientHandle) -> Self {
        Self { clients }
    }
}

#[async_trait]
impl DataSource for EnvironmentDataSource {
    type State<'a> = EnvironmentState<'a>;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(Schema {
            version: 1,
            block: Block {
                attributes: map! {
                    "id" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("The ID of the Environment (e.g. `env-abc123`)"),
                        constraint: AttributeConstraint::OptionalComputed,
                        ..Default::default()
                    },
                    "display_name" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("A human-readable name for the Environment"),
                        constraint: AttributeConstraint::OptionalComputed,
                        ..Default::default()
                    },
                    "resource_name" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("The Confluent Resource Name of the Environment"),
                        constraint: AttributeConstraint::Computed,
                        ..Default::default()
                    },
                    "stream_governance" => Attribute {
                        attr_type: stream_governance_type(),
                        description: Description::plain("Stream Governance package of the Environment"),
                        constraint: AttributeConstraint::Computed,
                        ..Default::default()
                    },
                },
                description: Description::plain("Look up a Confluent Cloud Environment by `id` or `display_name`"),
                ..Default::default()
            },
        })
    }

    async fn validate<'a>(&self, diags: &mut Diagnostics, config: Self::State<'a>) -> Option<()> {
        validate_id_or_name(diags, &config.id, &config.display_name)
    }

    async fn read<'a>(
        &self,
        diags: &mut Diagnostics,
        config: Self::State<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<Self::State<'a>> {
        let client = self.clients.cloud(diags)?;
        let mut state = config;

        let environment = if let Some(id) = state.id.as_deref_option() {
            match api::get(&client, id).await {
                Ok(environment) => environment,
                Err(err) => {
                    report(diags, format!("Error reading Environment {id:?}"), err);
                    return None;
                }
            }
        } else {
            let display_name = state.display_name.as_str().to_owned();
            match api::list(&client).await {
                Ok(environments) => find_by_display_name(
                    diags,
                    "Environment",
                    environments,
                    &display_name,
                    |environment| environment.display_name.as_deref(),
                )?,
                Err(err) => {
                    report(diags, "Error listing Environments", err);
                    return None;
                }
            }
        };

        debug!("Fetched Environment {:?}: {}", environment.id, to_json(&environment));
        state.apply(environment);
        Some(state)
    }
}

#[derive(Debug, Default, Clone)]
pub struct EnvironmentsDataSource {
    clients: ClientHandle,
}

impl EnvironmentsDataSource {
    pub fn new(clients: ClientHandle) -> Self {
        Self { clients }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EnvironmentsState<'a> {
    #[serde(borrow = "'a")]
    pub ids: ValueSet<ValueString<'a>>,
}

#[async_trait]
impl DataSource for EnvironmentsDataSource {
    type State<'a> = EnvironmentsState<'a>;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(Schema {
            version: 1,
            block: Block {
                attributes: map! {
                    "ids" => Attribute {
                        attr_type: AttributeType::Set(Box::new(AttributeType::String)),
                        description: Description::plain("The IDs of every Environment of the organization"),
                        constraint: AttributeConstraint::Computed,
                        ..Default::default()
                    },
                },
                description: Description::plain("List the Confluent Cloud Environments"),
                ..Default::default()
            },
        })
    }

    async fn read<'a>(
        &self,
        diags: &mut Diagnostics,
        _config: Self::State<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<Self::State<'a>> {
        let client = self.clients.cloud(diags)?;
        match api::list(&client).await {
            Ok(environments) => {
                debug!("Fetched {} Environments", environments.len());
                Some(EnvironmentsState {
                    ids: string_set(environments.into_iter().map(|environment| environment.id)),
                })
            }
            Err(err) => {
                report(diags, "Error listing Environments", err);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use reqwest::StatusCode;
    use serde_json::json;
    use tf_provider::value::Value;

    use super::api::Environment;
    use super::*;
    use crate::client::testing::MockTransport;
    use crate::config::testing::handle;
    use crate::utils::string;

    #[tokio::test]
    async fn lookup_by_display_name_pages_through_environments() {
        let mock = Arc::new(MockTransport::default());
        mock.push_json(
            StatusCode::OK,
            json!({
                "data": [{"id": "env-1", "display_name": "dev"}],
                "metadata": {"next": "/org/v2/environments?page_size=99&page_token=t2"}
            }),
        );
        mock.push_json(
            StatusCode::OK,
            json!({
                "data": [{"id": "env-2", "display_name": "prod", "stream_governance_config": {"package": "ADVANCED"}}],
                "metadata": {}
            }),
        );
        let data_source = EnvironmentDataSource::new(handle(&mock, None));

        let mut diags = Diagnostics::default();
        let config = EnvironmentState {
            display_name: string("prod"),
            ..Default::default()
        };
        let state = data_source
            .read(&mut diags, config, Value::Null)
            .await
            .unwrap();
        assert_eq!(state.id.as_str(), "env-2");
        assert_eq!(mock.calls().len(), 2);
    }

    #[test]
    fn ambiguous_display_names_are_errors() {
        let environments = vec![
            Environment {
                id: "env-1".to_owned(),
                display_name: Some("dev".to_owned()),
                ..Default::default()
            },
            Environment {
                id: "env-2".to_owned(),
                display_name: Some("dev".to_owned()),
                ..Default::default()
            },
        ];
        fn name_of(environment: &Environment) -> Option<&str> {
            environment.display_name.as_deref()
        }
        let mut diags = Diagnostics::default();
        assert!(
            find_by_display_name(&mut diags, "Environment", environments.clone(), "dev", name_of)
                .is_none()
        );
        assert!(
            find_by_display_name(&mut diags, "Environment", environments, "prod", name_of).is_none()
        );
        assert_eq!(diags.errors.len(), 2);
    }

    #[tokio::test]
    async fn id_and_display_name_are_exclusive() {
        let data_source = EnvironmentDataSource::default();
        let mut diags = Diagnostics::default();
        let config = EnvironmentState {
            id: string("env-1"),
            display_name: string("dev"),
            ..Default::default()
        };
        assert!(data_source.validate(&mut diags, config).await.is_none());

        let mut diags = Diagnostics::default();
        assert!(data_source
            .validate(&mut diags, EnvironmentState::default())
            .await
            .is_none());
    }

    #[tokio::test]
    async fn environments_lists_every_id() {
        let mock = Arc::new(MockTransport::default());
        mock.push_json(
            StatusCode::OK,
            json!({"data": [{"id": "env-1"}, {"id": "env-2"}], "metadata": {"next": ""}}),
        );
        let data_source = EnvironmentsDataSource::new(handle(&mock, None));

        let mut diags = Diagnostics::default();
        let state = data_source
            .read(&mut diags, EnvironmentsState::default(), Value::Null)
            .await
            .unwrap();
        assert_eq!(
            state.ids,
            string_set(["env-1".to_owned(), "env-2".to_owned()])
        );
    }
}
