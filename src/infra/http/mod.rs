//! HTTP adapters for the conversion service.

mod convert;
mod printers;

pub use convert::{HttpConversionTransport, UPLOAD_CHUNK_BYTES};
pub use printers::HttpProfileCatalog;

use std::time::Duration;

use reqwest::{Client, Url};

use crate::config::ApiSettings;
use crate::infra::error::InfraError;

pub const PRINTERS_PATH: &str = "api/printers";
pub const CONVERT_PATH: &str = "api/convert";

/// Shared reqwest client bound to the service base URL.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base: Url,
}

impl ApiClient {
    pub fn new(base: &Url, timeout: Duration, connect_timeout: Duration) -> Result<Self, InfraError> {
        let base = directory_url(base)?;
        let client = Client::builder()
            .user_agent(Self::user_agent())
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|err| InfraError::http_client(err.to_string()))?;
        Ok(Self { client, base })
    }

    pub fn from_settings(settings: &ApiSettings) -> Result<Self, InfraError> {
        Self::new(&settings.base_url, settings.timeout, settings.connect_timeout)
    }

    pub fn user_agent() -> &'static str {
        concat!("gerber2png/", env!("CARGO_PKG_VERSION"))
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn url(&self, path: &str) -> Result<Url, url::ParseError> {
        self.base.join(path)
    }
}

/// Strip query and fragment and make sure the path ends in `/`, so relative
/// endpoint paths resolve below any prefix.
fn directory_url(base: &Url) -> Result<Url, InfraError> {
    if base.cannot_be_a_base() {
        return Err(InfraError::http_client(format!(
            "invalid base url: `{base}` cannot carry a path"
        )));
    }
    let mut base = base.clone();
    base.set_query(None);
    base.set_fragment(None);
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    Ok(base)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> ApiClient {
        let base = Url::parse(base).expect("url");
        ApiClient::new(&base, Duration::from_secs(5), Duration::from_secs(1)).expect("client")
    }

    #[test]
    fn endpoints_resolve_against_the_origin() {
        let api = client("http://localhost:8000");
        assert_eq!(
            api.url(PRINTERS_PATH).expect("join").as_str(),
            "http://localhost:8000/api/printers"
        );
        assert_eq!(
            api.url(CONVERT_PATH).expect("join").as_str(),
            "http://localhost:8000/api/convert"
        );
    }

    #[test]
    fn endpoints_keep_a_path_prefix() {
        for base in ["http://proxy.local/g2p", "http://proxy.local/g2p/"] {
            let api = client(base);
            assert_eq!(
                api.url(CONVERT_PATH).expect("join").as_str(),
                "http://proxy.local/g2p/api/convert"
            );
            assert_eq!(
                api.url(PRINTERS_PATH).expect("join").as_str(),
                "http://proxy.local/g2p/api/printers"
            );
        }
    }
}
