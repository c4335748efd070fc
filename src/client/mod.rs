//! HTTP plumbing shared by every Confluent Cloud service

use std::fmt::Debug;
use std::sync::Arc;

use base64::Engine;
use reqwest::Method;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, trace};
use url::Url;

mod error;
pub mod model;
pub mod pagination;
pub mod retry;
pub mod transport;
pub mod wait;

#[cfg(test)]
pub mod testing;

pub use error::{ApiError, Error};
pub use transport::{HttpRequest, Transport};

/// HTTP basic credentials (Cloud API key or Kafka API key)
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Credentials {
    pub key: String,
    pub secret: String,
}

impl Credentials {
    pub fn new(key: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            secret: secret.into(),
        }
    }

    fn authorization(&self) -> String {
        let token = base64::engine::general_purpose::STANDARD
            .encode(format!("{}:{}", self.key, self.secret));
        format!("Basic {token}")
    }
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("key", &self.key)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// JSON client bound to one base URL
#[derive(Clone)]
pub struct ApiClient {
    endpoint: Url,
    credentials: Option<Credentials>,
    user_agent: String,
    transport: Arc<dyn Transport>,
}

impl ApiClient {
    pub fn new(
        endpoint: Url,
        credentials: Option<Credentials>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            endpoint,
            credentials,
            user_agent: format!("terraform-provider-confluent/{}", env!("CARGO_PKG_VERSION")),
            transport,
        }
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn url(&self, path: &str, query: &[(&str, &str)]) -> Url {
        let mut url = self.endpoint.clone();
        let prefix = self.endpoint.path().trim_end_matches('/');
        url.set_path(&format!("{prefix}{path}"));
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        url
    }

    /// Send a request and return the body of a successful response
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<Vec<u8>>,
    ) -> Result<Vec<u8>, Error> {
        let url = self.url(path, query);
        let mut headers = vec![
            ("User-Agent", self.user_agent.clone()),
            ("Accept", "application/json".to_owned()),
        ];
        if body.is_some() {
            headers.push(("Content-Type", "application/json".to_owned()));
        }
        if let Some(credentials) = &self.credentials {
            headers.push(("Authorization", credentials.authorization()));
        }

        debug!("{} {}", method, url);
        let response = self
            .transport
            .execute(HttpRequest {
                method: method.clone(),
                url: url.clone(),
                headers,
                body,
            })
            .await?;
        trace!(
            "{} {} answered {}: {}",
            method,
            url,
            response.status,
            String::from_utf8_lossy(&response.body)
        );

        if response.status.is_success() {
            Ok(response.body)
        } else {
            let err = ApiError::from_body(response.status, &response.body);
            if response.status == reqwest::StatusCode::NOT_FOUND {
                Err(Error::NotFound(err))
            } else {
                Err(Error::Api(err))
            }
        }
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, Error> {
        let body = self.send(Method::GET, path, query, None).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    pub async fn post<B, T>(&self, path: &str, query: &[(&str, &str)], body: &B) -> Result<T, Error>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let body = serde_json::to_vec(body)?;
        let body = self.send(Method::POST, path, query, Some(body)).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    pub async fn patch<B, T>(&self, path: &str, query: &[(&str, &str)], body: &B) -> Result<T, Error>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let body = serde_json::to_vec(body)?;
        let body = self.send(Method::PATCH, path, query, Some(body)).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    pub async fn put<B, T>(&self, path: &str, query: &[(&str, &str)], body: &B) -> Result<T, Error>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let body = serde_json::to_vec(body)?;
        let body = self.send(Method::PUT, path, query, Some(body)).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Send a request whose response body is ignored
    pub async fn send_no_content<B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<(), Error>
    where
        B: Serialize + Sync + ?Sized,
    {
        let body = body.map(serde_json::to_vec).transpose()?;
        self.send(method, path, &[], body).await?;
        Ok(())
    }

    pub async fn delete(&self, path: &str, query: &[(&str, &str)]) -> Result<(), Error> {
        self.send(Method::DELETE, path, query, None).await?;
        Ok(())
    }
}

impl Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("endpoint", &self.endpoint.as_str())
            .field("credentials", &self.credentials)
            .finish()
    }
}

/// Serialize an API object for debug logs
pub fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|err| format!("<{err}>"))
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;
    use serde_json::json;

    use super::testing::MockTransport;
    use super::*;

    fn client(mock: &Arc<MockTransport>) -> ApiClient {
        ApiClient::new(
            "https://api.confluent.cloud".parse().unwrap(),
            Some(Credentials::new("KEY", "SECRET")),
            mock.clone(),
        )
    }

    #[test]
    fn url_keeps_endpoint_prefix_and_query() {
        let mock = Arc::new(MockTransport::default());
        let client = ApiClient::new(
            "https://pkc-123.us-east-1.aws.confluent.cloud:443/proxy/"
                .parse()
                .unwrap(),
            None,
            mock,
        );
        let url = client.url(
            "/kafka/v3/clusters/lkc-1/topics",
            &[("page_size", "99"), ("name", "a b")],
        );
        assert_eq!(
            url.as_str(),
            "https://pkc-123.us-east-1.aws.confluent.cloud/proxy/kafka/v3/clusters/lkc-1/topics?page_size=99&name=a+b"
        );
    }

    #[tokio::test]
    async fn requests_carry_basic_auth_and_json() {
        let mock = Arc::new(MockTransport::default());
        mock.push(StatusCode::CREATED, r#"{"id":"env-1"}"#);

        let created: serde_json::Value = client(&mock)
            .post(
                "/org/v2/environments",
                &[],
                &json!({"display_name": "staging"}),
            )
            .await
            .unwrap();
        assert_eq!(created, json!({"id": "env-1"}));

        let requests = mock.requests();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.method, Method::POST);
        assert_eq!(
            request.url.as_str(),
            "https://api.confluent.cloud/org/v2/environments"
        );
        assert!(request
            .headers
            .contains(&("Authorization", "Basic S0VZOlNFQ1JFVA==".to_owned())));
        assert!(request
            .headers
            .contains(&("Content-Type", "application/json".to_owned())));
        assert_eq!(
            serde_json::from_slice::<serde_json::Value>(request.body.as_deref().unwrap()).unwrap(),
            json!({"display_name": "staging"})
        );
    }

    #[tokio::test]
    async fn not_found_is_distinguished() {
        let mock = Arc::new(MockTransport::default());
        mock.push(
            StatusCode::NOT_FOUND,
            r#"{"errors":[{"status":"404","detail":"Not found"}]}"#,
        );
        mock.push(
            StatusCode::FORBIDDEN,
            r#"{"errors":[{"status":"403","detail":"Forbidden Access"}]}"#,
        );

        let client = client(&mock);
        let err = client
            .get::<serde_json::Value>("/org/v2/environments/env-1", &[])
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        let err = client
            .get::<serde_json::Value>("/org/v2/environments/env-1", &[])
            .await
            .unwrap_err();
        assert!(!err.is_not_found());
        assert_eq!(
            err.to_string(),
            "API error: Forbidden Access (status 403 Forbidden)"
        );
    }

    #[test]
    fn credentials_are_redacted() {
        let debug = format!("{:?}", Credentials::new("KEY", "SECRET"));
        assert!(debug.contains("KEY"));
        assert!(!debug.contains("SECRET"));
    }
}
