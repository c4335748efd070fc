use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tf_provider::schema::{
    Attribute, AttributeConstraint, AttributeType, Block, Description, Schema,
};
use tf_provider::value::{Value, ValueEmpty, ValueString};
use tf_provider::{map, AttributePath, Diagnostics, Resource};
use tracing::{debug, warn};

use super::api::{self, Environment, StreamGovernanceConfig, PACKAGE_ADVANCED, PACKAGE_ESSENTIALS};
use crate::client::to_json;
use crate::config::ClientHandle;
use crate::utils::{
    changed, opt_string, report, string, validate_not_empty, validate_one_of, validate_prefix,
    WithNormalize,
};

#[derive(Debug, Default, Clone)]
pub struct EnvironmentResource {
    clients: ClientHandle,
}

impl EnvironmentResource {
    pub fn new(clients: ClientHandle) -> Self {
        Self { clients }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EnvironmentState<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    pub display_name: ValueString<'a>,
    pub resource_name: ValueString<'a>,
    pub stream_governance: Value<StreamGovernance<'a>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct StreamGovernance<'a> {
    #[serde(borrow = "'a")]
    pub package: ValueString<'a>,
}

pub(super) fn stream_governance_type() -> AttributeType {
    AttributeType::Object(map! {
        "package" => AttributeType::String,
    })
}

impl<'a> EnvironmentState<'a> {
    pub(super) fn apply(&mut self, environment: Environment) {
        self.id = string(environment.id);
        self.display_name = opt_string(environment.display_name);
        self.resource_name = opt_string(environment.metadata.resource_name);
        self.stream_governance = match environment.stream_governance_config {
            Some(config) => Value::Value(StreamGovernance {
                package: string(config.package),
            }),
            None => Value::Null,
        };
    }

    fn package(&self) -> Option<&str> {
        self.stream_governance.as_ref_option()?.package.as_deref_option()
    }
}

impl<'a> WithNormalize for EnvironmentState<'a> {
    fn normalize(&mut self, _diags: &mut Diagnostics) {
        if self.id.is_null() {
            self.id = Value::Unknown;
        }
        if self.resource_name.is_null() {
            self.resource_name = Value::Unknown;
        }
        if self.stream_governance.is_null() {
            self.stream_governance = Value::Unknown;
        }
    }
}

#[async_trait]
impl Resource for EnvironmentResource {
    type State<'a> = EnvironmentState<'a>;
    type PrivateState<'a> = ValueEmpty;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(Schema {
            version: 1,
            block: Block {
                attributes: map! {
                    "id" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("The ID of the Environment (e.g. `env-abc123`)"),
                        constraint: AttributeConstraint::Computed,
                        ..Default::default()
                    },
                    "display_name" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain("A human-readable name for the Environment"),
                        constraint: AttributeConstraint::Required,
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
                        description: Description::plain("Stream Governance package of the Environment (`ESSENTIALS` or `ADVANCED`)"),
                        constraint: AttributeConstraint::OptionalComputed,
                        ..Default::default()
                    },
                },
                description: Description::plain("Confluent Cloud Environment"),
                ..Default::default()
            },
        })
    }

    async fn validate<'a>(&self, diags: &mut Diagnostics, config: Self::State<'a>) -> Option<()> {
        validate_not_empty(diags, &config.display_name, AttributePath::new("display_name"));
        if let Value::Value(stream_governance) = &config.stream_governance {
            validate_one_of(
                diags,
                &stream_governance.package,
                &[PACKAGE_ESSENTIALS, PACKAGE_ADVANCED],
                AttributePath::new("stream_governance").attribute("package"),
            );
        }

        if diags.errors.is_empty() {
            Some(())
        } else {
            None
        }
    }

    async fn read<'a>(
        &self,
        diags: &mut Diagnostics,
        mut state: Self::State<'a>,
        private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let client = self.clients.cloud(diags)?;
        let id = state.id.as_str().to_owned();

        match api::get(&client, &id).await {
            Ok(environment) => {
                debug!("Fetched Environment {:?}: {}", id, to_json(&environment));
                state.apply(environment);
                Some((state, private_state))
            }
            Err(err) if err.is_not_found() => {
                warn!("Removing Environment {:?} in TF state because Environment could not be found on the server", id);
                None
            }
            Err(err) => {
                report(diags, format!("Error reading Environment {id:?}"), err);
                None
            }
        }
    }

    async fn plan_create<'a>(
        &self,
        diags: &mut Diagnostics,
        proposed_state: Self::State<'a>,
        _config_state: Self::State<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let mut state = proposed_state;
        state.normalize(diags);
        Some((state, Default::default()))
    }

    async fn plan_update<'a>(
        &self,
        diags: &mut Diagnostics,
        prior_state: Self::State<'a>,
        proposed_state: Self::State<'a>,
        _config_state: Self::State<'a>,
        prior_private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>, Vec<AttributePath>)> {
        if prior_state.package() == Some(PACKAGE_ADVANCED)
            && proposed_state.package() == Some(PACKAGE_ESSENTIALS)
        {
            diags.error(
                "Invalid `stream_governance`",
                format!(
                    "Downgrading the Stream Governance package of Environment {:?} from {PACKAGE_ADVANCED} to {PACKAGE_ESSENTIALS} is not supported",
                    prior_state.id.as_str()
                ),
                AttributePath::new("stream_governance").attribute("package"),
            );
            return None;
        }

        let mut state = proposed_state;
        if state.stream_governance.is_null() {
            state.stream_governance = prior_state.stream_governance;
        }
        Some((state, prior_private_state, vec![]))
    }

    async fn plan_destroy<'a>(
        &self,
        _diags: &mut Diagnostics,
        _prior_state: Self::State<'a>,
        _prior_private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<Self::PrivateState<'a>> {
        Some(Default::default())
    }

    async fn create<'a>(
        &self,
        diags: &mut Diagnostics,
        planned_state: Self::State<'a>,
        _config_state: Self::State<'a>,
        planned_private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let client = self.clients.cloud(diags)?;
        let mut state = planned_state;

        let request = Environment {
            display_name: state.display_name.as_deref_option().map(str::to_owned),
            stream_governance_config: state.package().map(|package| StreamGovernanceConfig {
                package: package.to_owned(),
            }),
            ..Default::default()
        };
        debug!("Creating new Environment: {}", to_json(&request));

        match api::create(&client, &request).await {
            Ok(environment) => {
                debug!("Finished creating Environment {:?}: {}", environment.id, to_json(&environment));
                state.apply(environment);
                Some((state, planned_private_state))
            }
            Err(err) => {
                report(diags, "Error creating Environment", err);
                None
            }
        }
    }

    async fn update<'a>(
        &self,
        diags: &mut Diagnostics,
        prior_state: Self::State<'a>,
        planned_state: Self::State<'a>,
        _config_state: Self::State<'a>,
        planned_private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let client = self.clients.cloud(diags)?;
        let mut state = planned_state;
        let id = prior_state.id.as_str().to_owned();

        let mut request = Environment::default();
        if changed(&prior_state.display_name, &state.display_name) {
            request.display_name = state.display_name.as_deref_option().map(str::to_owned);
        }
        if state.package().is_some() && state.package() != prior_state.package() {
            request.stream_governance_config = state.package().map(|package| StreamGovernanceConfig {
                package: package.to_owned(),
            });
        }
        debug!("Updating Environment {:?}: {}", id, to_json(&request));

        match api::update(&client, &id, &request).await {
            Ok(environment) => {
                debug!("Finished updating Environment {:?}: {}", id, to_json(&environment));
                state.apply(environment);
                Some((state, planned_private_state))
            }
            Err(err) => {
                report(diags, format!("Error updating Environment {id:?}"), err);
                None
            }
        }
    }

    async fn destroy<'a>(
        &self,
        diags: &mut Diagnostics,
        state: Self::State<'a>,
        _planned_private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<()> {
        let client = self.clients.cloud(diags)?;
        let id = state.id.as_str();
        debug!("Deleting Environment {:?}", id);

        match api::delete(&client, id).await {
            Ok(()) => {
                debug!("Finished deleting Environment {:?}", id);
                Some(())
            }
            Err(err) => {
                report(diags, format!("Error deleting Environment {id:?}"), err);
                None
            }
        }
    }

    async fn import<'a>(
        &self,
        diags: &mut Diagnostics,
        id: String,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let mut state = EnvironmentState::default();
        validate_prefix(diags, &string(id.clone()), "env-", AttributePath::new("id"));
        if !diags.errors.is_empty() {
            return None;
        }

        let client = self.clients.cloud(diags)?;
        match api::get(&client, &id).await {
            Ok(environment) => {
                debug!("Imported Environment {:?}: {}", id, to_json(&environment));
                state.apply(environment);
                Some((state, Default::default()))
            }
            Err(err) => {
                report(diags, format!("Error importing Environment {id:?}"), err);
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

    use super::*;
    use crate::client::testing::MockTransport;
    use crate::config::testing::handle;

    fn environment_json(package: &str) -> serde_json::Value {
        json!({
            "id": "env-abc123",
            "display_name": "staging",
            "stream_governance_config": {"package": package},
            "metadata": {"resource_name": "crn://confluent.cloud/organization=o-1/environment=env-abc123"}
        })
    }

    fn planned(display_name: &str, package: Option<&str>) -> EnvironmentState<'static> {
        EnvironmentState {
            id: Value::Unknown,
            display_name: string(display_name),
            resource_name: Value::Unknown,
            stream_governance: match package {
                Some(package) => Value::Value(StreamGovernance {
                    package: string(package),
                }),
                None => Value::Unknown,
            },
        }
    }

    #[tokio::test]
    async fn create_sends_display_name_and_package() {
        let mock = Arc::new(MockTransport::default());
        mock.push_json(StatusCode::CREATED, environment_json("ADVANCED"));
        let resource = EnvironmentResource::new(handle(&mock, None));

        let mut diags = Diagnostics::default();
        let state = planned("staging", Some("ADVANCED"));
        let (state, _) = resource
            .create(&mut diags, state.clone(), state, Value::Null, Value::Null)
            .await
            .unwrap();

        assert!(diags.errors.is_empty());
        assert_eq!(state.id.as_str(), "env-abc123");
        assert_eq!(state.package(), Some("ADVANCED"));
        assert_eq!(
            state.resource_name.as_str(),
            "crn://confluent.cloud/organization=o-1/environment=env-abc123"
        );
        assert_eq!(mock.calls(), vec!["POST /org/v2/environments"]);
        assert_eq!(
            mock.body(0),
            json!({"display_name": "staging", "stream_governance_config": {"package": "ADVANCED"}})
        );
    }

    #[tokio::test]
    async fn unknown_package_is_left_to_the_server() {
        let mock = Arc::new(MockTransport::default());
        mock.push_json(StatusCode::CREATED, environment_json("ESSENTIALS"));
        let resource = EnvironmentResource::new(handle(&mock, None));

        let mut diags = Diagnostics::default();
        let state = planned("staging", None);
        let (state, _) = resource
            .create(&mut diags, state.clone(), state, Value::Null, Value::Null)
            .await
            .unwrap();
        assert_eq!(mock.body(0), json!({"display_name": "staging"}));
        assert_eq!(state.package(), Some("ESSENTIALS"));
    }

    #[tokio::test]
    async fn read_drops_missing_environment() {
        let mock = Arc::new(MockTransport::default());
        mock.push(StatusCode::NOT_FOUND, r#"{"errors":[{"detail":"Not Found"}]}"#);
        let resource = EnvironmentResource::new(handle(&mock, None));

        let mut diags = Diagnostics::default();
        let mut state = planned("staging", Some("ESSENTIALS"));
        state.id = string("env-gone");
        let read = resource
            .read(&mut diags, state, Value::Null, Value::Null)
            .await;
        assert!(read.is_none());
        assert!(diags.errors.is_empty());
        assert_eq!(mock.calls(), vec!["GET /org/v2/environments/env-gone"]);
    }

    #[tokio::test]
    async fn read_reports_server_errors() {
        let mock = Arc::new(MockTransport::default());
        mock.push(StatusCode::FORBIDDEN, r#"{"errors":[{"detail":"Forbidden Access"}]}"#);
        let resource = EnvironmentResource::new(handle(&mock, None));

        let mut diags = Diagnostics::default();
        let mut state = planned("staging", None);
        state.id = string("env-1");
        assert!(resource
            .read(&mut diags, state, Value::Null, Value::Null)
            .await
            .is_none());
        assert_eq!(diags.errors.len(), 1);
    }

    #[tokio::test]
    async fn package_downgrade_is_rejected() {
        let resource = EnvironmentResource::default();
        let mut prior = planned("staging", Some("ADVANCED"));
        prior.id = string("env-1");
        let mut proposed = prior.clone();
        proposed.stream_governance = Value::Value(StreamGovernance {
            package: string("ESSENTIALS"),
        });

        let mut diags = Diagnostics::default();
        let plan = resource
            .plan_update(
                &mut diags,
                prior,
                proposed.clone(),
                proposed,
                Value::Null,
                Value::Null,
            )
            .await;
        assert!(plan.is_none());
        assert_eq!(
            diags.errors[0].attribute,
            AttributePath::new("stream_governance").attribute("package")
        );
    }

    #[tokio::test]
    async fn update_only_sends_changes() {
        let mock = Arc::new(MockTransport::default());
        mock.push_json(StatusCode::OK, environment_json("ESSENTIALS"));
        let resource = EnvironmentResource::new(handle(&mock, None));

        let mut prior = planned("old", Some("ESSENTIALS"));
        prior.id = string("env-abc123");
        let mut planned = prior.clone();
        planned.display_name = string("staging");

        let mut diags = Diagnostics::default();
        let (state, _) = resource
            .update(
                &mut diags,
                prior,
                planned.clone(),
                planned,
                Value::Null,
                Value::Null,
            )
            .await
            .unwrap();
        assert_eq!(state.display_name.as_str(), "staging");
        assert_eq!(mock.calls(), vec!["PATCH /org/v2/environments/env-abc123"]);
        assert_eq!(mock.body(0), json!({"display_name": "staging"}));
    }

    #[tokio::test]
    async fn import_checks_the_id() {
        let resource = EnvironmentResource::default();
        let mut diags = Diagnostics::default();
        assert!(resource
            .import(&mut diags, "lkc-123".to_owned())
            .await
            .is_none());
        assert_eq!(diags.errors.len(), 1);
    }

    #[tokio::test]
    async fn import_fetches_the_environment() {
        let mock = Arc::new(MockTransport::default());
        mock.push_json(StatusCode::OK, environment_json("ESSENTIALS"));
        let resource = EnvironmentResource::new(handle(&mock, None));

        let mut diags = Diagnostics::default();
        let (state, _) = resource
            .import(&mut diags, "env-abc123".to_owned())
            .await
            .unwrap();
        assert_eq!(state.display_name.as_str(), "staging");
        assert_eq!(state.package(), Some("ESSENTIALS"));
    }
}
