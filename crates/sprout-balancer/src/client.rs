//! The balancer capability trait and its Data Plane API implementation.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::error::{BalancerError, BalancerResult};
use crate::stats::NativeStats;

/// The commands the controller issues against the balancer.
///
/// The controller treats this as an opaque capability: it never inspects
/// balancer state beyond the stats document, and the roster it keeps is
/// advanced only when a command here succeeds.
#[async_trait]
pub trait BalancerApi: Send + Sync {
    /// Register a server under `backend` at `host:port`.
    async fn bind_server(
        &self,
        backend: &str,
        name: &str,
        host: &str,
        port: u16,
    ) -> BalancerResult<()>;

    /// Remove the named server from `backend`.
    async fn delete_server(&self, backend: &str, name: &str) -> BalancerResult<()>;

    /// Remove every server currently registered under `backend`.
    async fn delete_all_servers(&self, backend: &str) -> BalancerResult<()>;

    /// Fetch the native stats document.
    async fn fetch_stats(&self) -> BalancerResult<NativeStats>;
}

/// A server record as returned by the runtime servers endpoint.
///
/// Only the name is read; it is all `delete_all_servers` needs.
#[derive(Debug, Deserialize)]
struct ServerRecord {
    name: String,
}

/// HTTP client for the HAProxy Data Plane API (v3).
///
/// Uses the runtime server endpoints, so changes take effect without a
/// configuration transaction or reload.
pub struct DataPlaneClient {
    http: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
}

impl DataPlaneClient {
    /// Build a client for the admin API at `base_url`.
    ///
    /// `timeout` bounds every request, including the periodic stats
    /// fetch; the caller is expected to keep it under half its polling
    /// interval.
    pub fn new(
        base_url: &str,
        username: &str,
        password: &str,
        timeout: Duration,
    ) -> BalancerResult<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            username: username.to_string(),
            password: password.to_string(),
        })
    }

    fn servers_url(&self, backend: &str) -> String {
        format!(
            "{}/v3/services/haproxy/runtime/backends/{}/servers",
            self.base_url, backend
        )
    }

    fn request(&self, method: reqwest::Method, url: String) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .basic_auth(&self.username, Some(&self.password))
    }

    /// Turn a non-success response into `BalancerError::Api`.
    async fn check(resp: reqwest::Response) -> BalancerResult<reqwest::Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(BalancerError::Api {
            status: status.as_u16(),
            body,
        })
    }

    async fn list_servers(&self, backend: &str) -> BalancerResult<Vec<ServerRecord>> {
        let resp = self
            .request(reqwest::Method::GET, self.servers_url(backend))
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }
}

#[async_trait]
impl BalancerApi for DataPlaneClient {
    async fn bind_server(
        &self,
        backend: &str,
        name: &str,
        host: &str,
        port: u16,
    ) -> BalancerResult<()> {
        let resp = self
            .request(reqwest::Method::POST, self.servers_url(backend))
            .json(&json!({ "name": name, "address": host, "port": port }))
            .send()
            .await?;
        Self::check(resp).await?;
        debug!(%backend, server = %name, %host, port, "bound server");
        Ok(())
    }

    async fn delete_server(&self, backend: &str, name: &str) -> BalancerResult<()> {
        let url = format!("{}/{}", self.servers_url(backend), name);
        let resp = self.request(reqwest::Method::DELETE, url).send().await?;
        Self::check(resp).await?;
        debug!(%backend, server = %name, "deleted server");
        Ok(())
    }

    async fn delete_all_servers(&self, backend: &str) -> BalancerResult<()> {
        // The admin API has no bulk delete; list and remove one by one.
        let servers = self.list_servers(backend).await?;
        for server in servers {
            self.delete_server(backend, &server.name).await?;
        }
        Ok(())
    }

    async fn fetch_stats(&self) -> BalancerResult<NativeStats> {
        let url = format!("{}/v3/services/haproxy/stats/native", self.base_url);
        let resp = self.request(reqwest::Method::GET, url).send().await?;
        Ok(Self::check(resp).await?.json().await?)
    }
}
