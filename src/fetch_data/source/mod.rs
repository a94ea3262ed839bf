pub mod nse;

use async_trait::async_trait;
use reqwest::Url;

use super::error::FetchError;
use super::session::SessionCredential;

pub use nse::NseClient;

/// The two-step upstream: a handshake that issues session cookies, then the
/// data query that requires them.
#[async_trait]
pub trait MarketSource: Send + Sync {
    /// GET the reference page and collect its cookies. The body is discarded.
    async fn handshake(&self, reference_url: &Url) -> Result<SessionCredential, FetchError>;

    /// GET the data endpoint with `credential` attached; returns the body verbatim.
    async fn fetch(
        &self,
        data_url: &Url,
        credential: &SessionCredential,
    ) -> Result<Vec<u8>, FetchError>;
}
