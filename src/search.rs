use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::timeout;

use crate::error::SearchError;

const SEARCH_ENDPOINT: &str = "https://api.tavily.com/search";

/// One ranked snippet from the web-search collaborator. Hits without a
/// source URL are dropped before they reach any caller.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub content: String,
}

/// Keyed web-search client, shared by the identifier resolver and the
/// supplementary researcher.
#[derive(Debug, Clone)]
pub struct SearchClient {
    http: reqwest::Client,
    api_key: String,
    endpoint: String,
    timeout: Duration,
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    max_results: usize,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<RawHit>,
}

#[derive(Deserialize)]
struct RawHit {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
}

impl SearchClient {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Self {
        SearchClient {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            endpoint: SEARCH_ENDPOINT.to_string(),
            timeout,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchHit>, SearchError> {
        let body = SearchRequest {
            api_key: &self.api_key,
            query,
            max_results,
        };
        let request = self.http.post(&self.endpoint).json(&body).send();
        let response = timeout(self.timeout, request)
            .await
            .map_err(|_| SearchError::Timeout)??;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SearchError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: SearchResponse = response.json().await?;
        let hits = parsed
            .results
            .into_iter()
            .filter(|hit| !hit.url.trim().is_empty())
            .map(|hit| SearchHit {
                title: hit.title,
                url: hit.url,
                content: hit.content,
            })
            .collect();
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SearchError;

    // A listener that accepts and then never answers, so the client's
    // deadline is the only thing that can end the call.
    #[tokio::test]
    async fn stalled_upstream_surfaces_as_timeout() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    break;
                };
                let mut sink = [0u8; 1024];
                use tokio::io::AsyncReadExt;
                while socket.read(&mut sink).await.unwrap_or(0) > 0 {}
            }
        });

        let client = SearchClient::new("key", Duration::from_millis(100))
            .with_endpoint(format!("http://{addr}/search"));
        let err = client.search("anything", 3).await.expect_err("must time out");
        assert!(matches!(err, SearchError::Timeout), "{err:?}");
    }
}
