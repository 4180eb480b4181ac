//! E*Trade market API adapter

#![allow(non_snake_case)]

mod oauth;

use crate::brokers::types::*;
use crate::brokers::{Credentials, MarketDataGateway};
use crate::config::Environment;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

const LIVE_BASE_URL: &str = "https://api.etrade.com";
const SANDBOX_BASE_URL: &str = "https://apisb.etrade.com";

// ============================================================================
// E*Trade API Response Envelopes
// ============================================================================

#[derive(Debug, Deserialize)]
struct QuoteEnvelope {
    QuoteResponse: QuoteResponse,
}

#[derive(Debug, Deserialize)]
struct QuoteResponse {
    #[serde(default)]
    QuoteData: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    All: Option<RawQuote>,
}

#[derive(Debug, Deserialize)]
struct ExpireDateEnvelope {
    OptionExpireDateResponse: ExpireDateResponse,
}

#[derive(Debug, Deserialize)]
struct ExpireDateResponse {
    #[serde(default)]
    ExpirationDate: Vec<RawExpiryDate>,
}

#[derive(Debug, Deserialize)]
struct OptionChainEnvelope {
    OptionChainResponse: OptionChainResponse,
}

#[derive(Debug, Deserialize)]
struct OptionChainResponse {
    #[serde(default)]
    OptionPair: Vec<OptionPair>,
}

/// E*Trade market data gateway
pub struct ETradeGateway {
    client: Client,
    base_url: Url,
    credentials: Credentials,
}

impl ETradeGateway {
    pub fn new(credentials: Credentials, environment: Environment, timeout: Duration) -> Result<Self> {
        if !credentials.is_complete() {
            return Err(AppError::Auth(
                "Consumer key/secret and OAuth token/secret are all required".to_string(),
            ));
        }

        let base = match environment {
            Environment::Live => LIVE_BASE_URL,
            Environment::Sandbox => SANDBOX_BASE_URL,
        };
        let base_url = Url::parse(base)
            .map_err(|e| AppError::Config(format!("Invalid base URL {}: {}", base, e)))?;

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url,
            credentials,
        })
    }

    fn endpoint(&self, path: &str, query: &[(&str, String)]) -> Result<Url> {
        let mut url = self
            .base_url
            .join(path)
            .map_err(|e| AppError::Internal(format!("Invalid endpoint {}: {}", path, e)))?;

        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }

        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let authorization = oauth::authorization_header(&self.credentials, "GET", &url)?;
        debug!("GET {}", url);

        let response = self
            .client
            .get(url.clone())
            .header(AUTHORIZATION, authorization)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| AppError::TransientGateway(format!("{}: {}", url.path(), e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, url.path(), &body));
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Every non-success status is retried, client errors included
fn classify_status(status: StatusCode, path: &str, body: &str) -> AppError {
    AppError::TransientGateway(format!("{} returned {}: {}", path, status, body.trim()))
}

#[async_trait]
impl MarketDataGateway for ETradeGateway {
    fn id(&self) -> &'static str {
        "etrade"
    }

    async fn get_quote(&self, ticker: &str) -> Result<RawQuote> {
        let path = format!("v1/market/quote/{}.json", urlencoding::encode(ticker));
        let url = self.endpoint(&path, &[])?;

        let envelope: QuoteEnvelope = self.get_json(url).await?;

        envelope
            .QuoteResponse
            .QuoteData
            .into_iter()
            .find_map(|data| data.All)
            .ok_or_else(|| AppError::Gateway(format!("No quote data for {}", ticker)))
    }

    async fn get_expiry_dates(&self, ticker: &str) -> Result<Vec<RawExpiryDate>> {
        let url = self.endpoint(
            "v1/market/optionexpiredate.json",
            &[("symbol", ticker.to_string())],
        )?;

        let envelope: ExpireDateEnvelope = self.get_json(url).await?;
        Ok(envelope.OptionExpireDateResponse.ExpirationDate)
    }

    async fn get_option_chain(&self, ticker: &str, expiry: NaiveDate) -> Result<Vec<OptionPair>> {
        let url = self.endpoint(
            "v1/market/optionchains.json",
            &[
                ("symbol", ticker.to_string()),
                ("expiryYear", expiry.year().to_string()),
                ("expiryMonth", expiry.month().to_string()),
                ("expiryDay", expiry.day().to_string()),
            ],
        )?;

        let envelope: OptionChainEnvelope = self.get_json(url).await?;
        Ok(envelope.OptionChainResponse.OptionPair)
    }
}
