use async_trait::async_trait;
use tf_provider::schema::{Block, Description, Schema};
use tf_provider::value::ValueEmpty;
use tf_provider::{DataSource, Diagnostics};
use tracing::debug;

use super::api;
use super::resource::{attributes, ServiceAccountState};
use crate::client::to_json;
use crate::config::ClientHandle;
use crate::utils::{report, validate_id_or_name};

#[derive(Debug, Default, Clone)]
pub struct ServiceAccountDataSource {
    clients: ClientHandle,
}

impl ServiceAccountDataSource {
    pub fn new(clients: ClientHandle) -> Self {
        Self { clients }
    }
}

#[async_trait]
impl DataSource for ServiceAccountDataSource {
    type State<'a> = ServiceAccountState<'a>;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(Schema {
            version: 1,
            block: Block {
                description: Description::plain(
                    "Look up a Confluent Cloud Service Account by `id` or `display_name`",
                ),
                ..attributes(true)
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

        let account = if let Some(id) = state.id.as_deref_option() {
            match api::get(&client, id).await {
                Ok(account) => account,
                Err(err) => {
                    report(diags, format!("Error reading Service Account {id:?}"), err);
                    return None;
                }
            }
        } else {
            let display_name = state.display_name.as_str().to_owned();
            let accounts = match api::list(&client).await {
                Ok(accounts) => accounts,
                Err(err) => {
                    report(diags, "Error listing Service Accounts", err);
                    return None;
                }
            };
            let mut matching: Vec<_> = accounts
                .into_iter()
                .filter(|account| account.display_name.as_deref() == Some(display_name.as_str()))
                .collect();
            if matching.len() != 1 {
                diags.root_error(
                    "Error reading Service Account",
                    format!(
                        "Expected exactly one Service Account with display_name {display_name:?}, but found {}",
                        matching.len()
                    ),
                );
                return None;
            }
            matching.pop()?
        };

        debug!("Fetched Service Account {:?}: {}", account.id, to_json(&account));
        state.apply(account);
        Some(state)
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
    use crate::utils::string;

    #[tokio::test]
    async fn lookup_by_display_name() {
        let mock = Arc::new(MockTransport::default());
        mock.push_json(
            StatusCode::OK,
            json!({
                "data": [
                    {"id": "sa-1", "display_name": "reader", "description": "reads"},
                    {"id": "sa-2", "display_name": "writer", "description": "writes"},
                ],
                "metadata": {"next": ""}
            }),
        );
        let data_source = ServiceAccountDataSource::new(handle(&mock, None));

        let mut diags = Diagnostics::default();
        let config = ServiceAccountState {
            display_name: string("writer"),
            ..Default::default()
        };
        let state = data_source
            .read(&mut diags, config, Value::Null)
            .await
            .unwrap();
        assert_eq!(state.id.as_str(), "sa-2");
        assert_eq!(state.description.as_str(), "writes");
        assert_eq!(
            mock.calls(),
            vec!["GET /iam/v2/service-accounts?page_size=99"]
        );
    }

    #[tokio::test]
    async fn missing_display_name_is_an_error() {
        let mock = Arc::new(MockTransport::default());
        mock.push_json(StatusCode::OK, json!({"data": [], "metadata": {}}));
        let data_source = ServiceAccountDataSource::new(handle(&mock, None));

        let mut diags = Diagnostics::default();
        let config = ServiceAccountState {
            display_name: string("nobody"),
            ..Default::default()
        };
        assert!(data_source
            .read(&mut diags, config, Value::Null)
            .await
            .is_none());
        assert_eq!(diags.errors.len(), 1);
    }
}
