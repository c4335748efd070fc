//! Cursor based listings (`metadata.next` links)

use std::collections::HashSet;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use super::{ApiClient, Error};

/// Number of items requested per page
pub const PAGE_SIZE: &str = "99";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListPage<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    #[serde(default)]
    pub metadata: ListMetadata,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListMetadata {
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub total_size: Option<i64>,
}

/// Extract the `page_token` of a `next` link
///
/// An empty link means the listing is over.
pub fn extract_page_token(next: &str) -> Result<Option<String>, Error> {
    if next.is_empty() {
        return Ok(None);
    }
    let base = Url::parse("http://localhost/")?;
    let url = base.join(next)?;
    match url.query_pairs().find(|(key, _)| key == "page_token") {
        Some((_, token)) if !token.is_empty() => Ok(Some(token.into_owned())),
        _ => Err(Error::PageToken(next.to_owned())),
    }
}

impl ApiClient {
    /// Fetch every page of a listing
    ///
    /// The listing stops at the first page token already followed.
    pub async fn list_all<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>, Error> {
        let mut items = Vec::new();
        let mut page_token: Option<String> = None;
        let mut seen = HashSet::new();

        loop {
            let mut page_query = query.to_vec();
            page_query.push(("page_size", PAGE_SIZE));
            if let Some(token) = &page_token {
                page_query.push(("page_token", token.as_str()));
            }

            let page: ListPage<T> = self.get(path, &page_query).await?;
            items.extend(page.data);

            match page.metadata.next.as_deref().map(extract_page_token) {
                Some(Ok(Some(token))) if !seen.insert(token.clone()) => {
                    warn!("Listing of {} returned page token {:?} twice", path, token);
                    break;
                }
                Some(Ok(Some(token))) => page_token = Some(token),
                Some(Ok(None)) | None => break,
                Some(Err(err)) => return Err(err),
            }
        }

        debug!("Listed {} items from {}", items.len(), path);
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use reqwest::StatusCode;
    use serde_json::json;

    use super::*;
    use crate::client::testing::MockTransport;

    #[test]
    fn page_token_is_extracted() {
        assert_eq!(
            extract_page_token(
                "https://api.confluent.cloud/org/v2/environments?page_size=99&page_token=UvmDWOB1iwfAIBPj6EYb"
            )
            .unwrap(),
            Some("UvmDWOB1iwfAIBPj6EYb".to_owned())
        );
        assert_eq!(
            extract_page_token("/iam/v2/service-accounts?page_token=abc%3D%3D").unwrap(),
            Some("abc==".to_owned())
        );
    }

    #[test]
    fn empty_next_ends_listing() {
        assert_eq!(extract_page_token("").unwrap(), None);
    }

    #[test]
    fn next_without_token_is_an_error() {
        assert!(matches!(
            extract_page_token("https://api.confluent.cloud/org/v2/environments?page_size=99"),
            Err(Error::PageToken(_))
        ));
        assert!(matches!(
            extract_page_token("https://api.confluent.cloud/org/v2/environments?page_token="),
            Err(Error::PageToken(_))
        ));
    }

    #[tokio::test]
    async fn list_all_follows_next_links() {
        let mock = Arc::new(MockTransport::default());
        mock.push_json(
            StatusCode::OK,
            json!({
                "data": [{"id": "env-1"}, {"id": "env-2"}],
                "metadata": {"next": "https://api.confluent.cloud/org/v2/environments?page_size=99&page_token=p2"}
            }),
        );
        mock.push_json(
            StatusCode::OK,
            json!({
                "data": [{"id": "env-3"}],
                "metadata": {"next": ""}
            }),
        );

        let items: Vec<serde_json::Value> = mock
            .client()
            .list_all("/org/v2/environments", &[])
            .await
            .unwrap();
        let ids: Vec<_> = items.iter().map(|item| item["id"].clone()).collect();
        assert_eq!(ids, vec![json!("env-1"), json!("env-2"), json!("env-3")]);
        assert_eq!(
            mock.calls(),
            vec![
                "GET /org/v2/environments?page_size=99",
                "GET /org/v2/environments?page_size=99&page_token=p2",
            ]
        );
    }

    #[tokio::test]
    async fn list_all_stops_on_repeated_token() {
        let mock = Arc::new(MockTransport::default());
        let page = |id: &str| {
            json!({
                "data": [{"id": id}],
                "metadata": {"next": "/iam/v2/service-accounts?page_size=99&page_token=same"}
            })
        };
        mock.push_json(StatusCode::OK, page("sa-1"));
        mock.push_json(StatusCode::OK, page("sa-2"));
        mock.push_json(StatusCode::OK, page("sa-3"));

        let items: Vec<serde_json::Value> = mock
            .client()
            .list_all("/iam/v2/service-accounts", &[])
            .await
            .unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(
            mock.calls(),
            vec![
                "GET /iam/v2/service-accounts?page_size=99",
                "GET /iam/v2/service-accounts?page_size=99&page_token=same",
            ]
        );
        assert_eq!(mock.remaining(), 1);
    }

    #[tokio::test]
    async fn list_all_keeps_filters() {
        let mock = Arc::new(MockTransport::default());
        mock.push_json(StatusCode::OK, json!({"data": [], "metadata": {}}));

        let items: Vec<serde_json::Value> = mock
            .client()
            .list_all("/cmk/v2/clusters", &[("environment", "env-1")])
            .await
            .unwrap();
        assert!(items.is_empty());
        assert_eq!(
            mock.calls(),
            vec!["GET /cmk/v2/clusters?environment=env-1&page_size=99"]
        );
    }
}
