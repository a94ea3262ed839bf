use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Response, StatusCode, Url};
use tracing::debug;

use super::MarketSource;
use crate::fetch_data::error::FetchError;
use crate::fetch_data::session::SessionCredential;

// NSE serves an error page (or nothing) to clients that don't look like a browser.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/88.0.4324.182 Safari/537.36 Edg/88.0.705.74";
const ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,\
     image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.9";
const ACCEPT_LANGUAGE: &str = "en-GB,en;q=0.9,en-US;q=0.8";

/// HTTP client for the NSE quote page and historical derivatives API.
///
/// Holds no cookie store: each worker carries its own `SessionCredential`.
#[derive(Debug, Clone)]
pub struct NseClient {
    client: reqwest::Client,
}

impl NseClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(browser_headers())
            .build()
            .context("creating HTTP client")?;
        Ok(NseClient { client })
    }
}

fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::USER_AGENT, HeaderValue::from_static(USER_AGENT));
    headers.insert(header::ACCEPT, HeaderValue::from_static(ACCEPT));
    headers.insert(
        header::ACCEPT_LANGUAGE,
        HeaderValue::from_static(ACCEPT_LANGUAGE),
    );
    headers
}

fn require_ok(resp: &Response) -> Result<(), FetchError> {
    if resp.status() == StatusCode::OK {
        Ok(())
    } else {
        Err(FetchError::UnexpectedStatus {
            status: resp.status().as_u16(),
            url: resp.url().to_string(),
        })
    }
}

#[async_trait]
impl MarketSource for NseClient {
    async fn handshake(&self, reference_url: &Url) -> Result<SessionCredential, FetchError> {
        let resp = self.client.get(reference_url.clone()).send().await?;
        require_ok(&resp)?;

        let credential = SessionCredential::from_set_cookie(
            resp.headers()
                .get_all(header::SET_COOKIE)
                .iter()
                .filter_map(|v| v.to_str().ok()),
        );
        debug!(url = %reference_url, cookies = credential.len(), "handshake ok");
        Ok(credential)
    }

    async fn fetch(
        &self,
        data_url: &Url,
        credential: &SessionCredential,
    ) -> Result<Vec<u8>, FetchError> {
        let mut req = self.client.get(data_url.clone());
        if let Some(cookie) = credential.cookie_header() {
            req = req.header(header::COOKIE, cookie);
        }

        let resp = req.send().await?;
        require_ok(&resp)?;

        let body = resp.bytes().await?;
        debug!(url = %data_url, bytes = body.len(), "fetch ok");
        Ok(body.to_vec())
    }
}
