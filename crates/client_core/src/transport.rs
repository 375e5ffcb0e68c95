use std::{sync::Arc, time::Duration};

use anyhow::{ensure, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use shared::{
    domain::{ProductId, StoreId},
    protocol::{Order, Product},
};
use tracing::debug;
use url::Url;

use crate::error::FetchError;

/// Read-only view of the ordering API.
#[async_trait]
pub trait StoreApi: Send + Sync {
    /// `GET /orders/store/{store_id}`
    async fn store_orders(&self, store_id: &StoreId) -> Result<Vec<Order>, FetchError>;
    /// `GET /products/{product_id}`
    async fn product(&self, product_id: &ProductId) -> Result<Product, FetchError>;
    /// `GET /products`
    async fn products(&self) -> Result<Vec<Product>, FetchError>;
}

#[async_trait]
impl<T> StoreApi for Arc<T>
where
    T: StoreApi + ?Sized,
{
    async fn store_orders(&self, store_id: &StoreId) -> Result<Vec<Order>, FetchError> {
        self.as_ref().store_orders(store_id).await
    }

    async fn product(&self, product_id: &ProductId) -> Result<Product, FetchError> {
        self.as_ref().product(product_id).await
    }

    async fn products(&self) -> Result<Vec<Product>, FetchError> {
        self.as_ref().products().await
    }
}

pub struct HttpStoreApi {
    http: Client,
    base_url: Url,
}

impl HttpStoreApi {
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, None)
    }

    /// Builds a client whose requests give up after `timeout`.
    /// `None` keeps reqwest's default of waiting indefinitely.
    pub fn with_timeout(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .with_context(|| format!("invalid api base url: {base_url}"))?;
        ensure!(
            matches!(base_url.scheme(), "http" | "https"),
            "api base url must use http or https: {base_url}"
        );
        ensure!(
            !base_url.cannot_be_a_base(),
            "api base url cannot carry a path: {base_url}"
        );

        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().context("failed to build http client")?;

        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, FetchError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| FetchError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, FetchError> {
        let url_text = url.to_string();
        debug!(url = %url_text, "api: GET");

        let res = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|err| FetchError::from_reqwest(&url_text, &err))?;

        let status = res.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url_text,
                status: status.as_u16(),
            });
        }

        let body = res
            .bytes()
            .await
            .map_err(|err| FetchError::from_reqwest(&url_text, &err))?;
        serde_json::from_slice(&body).map_err(|err| FetchError::Decode {
            url: url_text,
            message: err.to_string(),
        })
    }
}

#[async_trait]
impl StoreApi for HttpStoreApi {
    async fn store_orders(&self, store_id: &StoreId) -> Result<Vec<Order>, FetchError> {
        let url = self.endpoint(&["orders", "store", store_id.as_str()])?;
        self.get_json(url).await
    }

    async fn product(&self, product_id: &ProductId) -> Result<Product, FetchError> {
        let url = self.endpoint(&["products", product_id.as_str()])?;
        self.get_json(url).await
    }

    async fn products(&self) -> Result<Vec<Product>, FetchError> {
        let url = self.endpoint(&["products"])?;
        self.get_json(url).await
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
