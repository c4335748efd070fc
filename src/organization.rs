use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tf_provider::schema::{
    Attribute, AttributeConstraint, AttributeType, Block, Description, Schema,
};
use tf_provider::value::{ValueEmpty, ValueString};
use tf_provider::{map, DataSource, Diagnostics};
use tracing::debug;

use crate::client::model::ObjectMeta;
use crate::client::{to_json, ApiClient, Error};
use crate::config::ClientHandle;
use crate::utils::{opt_string, report, string};

const ORGANIZATIONS: &str = "/org/v2/organizations";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Organization {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub metadata: ObjectMeta,
}

async fn list(client: &ApiClient) -> Result<Vec<Organization>, Error> {
    client.list_all(ORGANIZATIONS, &[]).await
}

#[derive(Debug, Default, Clone)]
pub struct OrganizationDataSource {
    clients: ClientHandle,
}

impl OrganizationDataSource {
    pub fn new(clients: ClientHandle) -> Self {
        Self { clients }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OrganizationState<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    pub resource_name: ValueString<'a>,
}

#[async_trait]
impl DataSource for OrganizationDataSource {
    type State<'a> = OrganizationState<'a>;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        let computed = |description: &str| Attribute {
            attr_type: AttributeType::String,
            description: Description::plain(description),
            constraint: AttributeConstraint::Computed,
            ..Default::default()
        };
        Some(Schema {
            version: 1,
            block: Block {
                attributes: map! {
                    "id" => computed("The ID of the Organization"),
                    "resource_name" => computed("The Confluent Resource Name of the Organization"),
                },
                description: Description::plain("The Organization owning the Cloud API Key of the provider"),
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

        match list(&client).await {
            Ok(organizations) => {
                let Some(organization) = organizations.into_iter().next() else {
                    diags.root_error_short("The Cloud API Key has no access to any Organization");
                    return None;
                };
                debug!("Fetched Organization: {}", to_json(&organization));
                Some(OrganizationState {
                    id: string(organization.id),
                    resource_name: opt_string(organization.metadata.resource_name),
                })
            }
            Err(err) => {
                report(diags, "Error reading Organization", err);
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

    use super::*;
    use crate::client::testing::MockTransport;
    use crate::config::testing::handle;

    #[tokio::test]
    async fn first_organization_is_returned() {
        let mock = Arc::new(MockTransport::default());
        mock.push_json(
            StatusCode::OK,
            json!({
                "data": [{
                    "id": "1111aaaa-11aa-11aa-11aa-111111aaaaaa",
                    "display_name": "acme",
                    "metadata": {"resource_name": "crn://confluent.cloud/organization=1111aaaa-11aa-11aa-11aa-111111aaaaaa"}
                }],
                "metadata": {}
            }),
        );
        let data_source = OrganizationDataSource::new(handle(&mock, None));

        let mut diags = Diagnostics::default();
        let state = data_source
            .read(&mut diags, Default::default(), Value::Null)
            .await
            .unwrap();
        assert_eq!(state.id.as_str(), "1111aaaa-11aa-11aa-11aa-111111aaaaaa");
        assert!(state.resource_name.as_str().starts_with("crn://confluent.cloud/organization="));
        assert_eq!(mock.calls(), vec!["GET /org/v2/organizations?page_size=99"]);
    }

    #[tokio::test]
    async fn no_organization_is_an_error() {
        let mock = Arc::new(MockTransport::default());
        mock.push_json(StatusCode::OK, json!({"data": [], "metadata": {}}));
        let data_source = OrganizationDataSource::new(handle(&mock, None));

        let mut diags = Diagnostics::default();
        assert!(data_source
            .read(&mut diags, Default::default(), Value::Null)
            .await
            .is_none());
        assert_eq!(diags.errors.len(), 1);
    }
}
