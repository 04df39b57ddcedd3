use async_trait::async_trait;
use tracing::debug;

use crate::application::ports::{CatalogError, ProfileCatalogClient};
use crate::domain::profiles::ProfileCatalog;

use super::{ApiClient, PRINTERS_PATH};

/// Fetches `GET /api/printers`.
#[derive(Clone, Debug)]
pub struct HttpProfileCatalog {
    api: ApiClient,
}

impl HttpProfileCatalog {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl ProfileCatalogClient for HttpProfileCatalog {
    async fn fetch_all(&self) -> Result<ProfileCatalog, CatalogError> {
        let url = self
            .api
            .url(PRINTERS_PATH)
            .map_err(|err| CatalogError::Network(err.to_string()))?;
        debug!(%url, "fetching profile catalog");

        let resp = self
            .api
            .client()
            .get(url)
            .send()
            .await
            .map_err(|err| CatalogError::Network(err.to_string()))?;
        let status = resp.status();
        if status.as_u16() != 200 {
            return Err(CatalogError::Status(status.as_u16()));
        }
        let bytes = resp
            .bytes()
            .await
            .map_err(|err| CatalogError::Network(err.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|err| CatalogError::Decode(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use httpmock::MockServer;
    use reqwest::Url;

    use super::*;

    fn catalog_client(server: &MockServer) -> HttpProfileCatalog {
        let base = Url::parse(&server.base_url()).expect("url");
        let api = ApiClient::new(&base, Duration::from_secs(5), Duration::from_secs(1))
            .expect("client");
        HttpProfileCatalog::new(api)
    }

    #[tokio::test]
    async fn decodes_the_catalog() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method("GET").path("/api/printers");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"anycubic_m3":{"name":"Anycubic","web_name":"Photon M3","x":0,"y":0,"w":4096,"h":2560,"d_x":0,"d_y":0}}"#);
        });

        let catalog = catalog_client(&server).fetch_all().await.expect("catalog");
        mock.assert();
        assert_eq!(catalog.len(), 1);
        assert_eq!(
            catalog.first_id().map(|id| id.as_str()),
            Some("anycubic_m3")
        );
    }

    #[tokio::test]
    async fn non_200_is_an_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method("GET").path("/api/printers");
            then.status(503);
        });

        let err = catalog_client(&server).fetch_all().await.expect_err("503");
        assert!(matches!(err, CatalogError::Status(503)));
    }

    #[tokio::test]
    async fn malformed_body_is_a_decode_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method("GET").path("/api/printers");
            then.status(200).body("[1, 2, 3]");
        });

        let err = catalog_client(&server).fetch_all().await.expect_err("array");
        assert!(matches!(err, CatalogError::Decode(_)));
    }
}
