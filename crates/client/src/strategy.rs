//! Cache strategy executor.
//!
//! Each request class maps to one [`Strategy`]:
//!
//! | class     | strategy               | partition |
//! |-----------|------------------------|-----------|
//! | `Static`  | cache-first            | static    |
//! | `Api`     | network-first          | api       |
//! | `Dynamic` | stale-while-revalidate | dynamic   |
//!
//! Network and storage failures never escape the executor. The worst
//! outcome is the synthetic `503 Offline` response, or the offline page for
//! navigations when it is present in the static partition.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use swcache_core::{CacheStorage, Error, ExpiryPolicy, PartitionSet, Request, RequestClass, Response};
use url::Url;

use crate::fetch::Network;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    CacheFirst,
    NetworkFirst,
    StaleWhileRevalidate,
}

impl Strategy {
    pub fn for_class(class: RequestClass) -> Self {
        match class {
            RequestClass::Static => Strategy::CacheFirst,
            RequestClass::Api => Strategy::NetworkFirst,
            RequestClass::Dynamic => Strategy::StaleWhileRevalidate,
        }
    }
}

/// Where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Network,
    Cache,
    /// Synthetic 503 or the offline page.
    Offline,
}

/// A response together with its source.
#[derive(Debug, Clone)]
pub struct Served {
    pub response: Response,
    pub source: Source,
}

impl Served {
    fn new(response: Response, source: Source) -> Self {
        Self { response, source }
    }
}

/// Runs the per-class read/write protocol against storage and network.
///
/// Cloning is cheap; stale-while-revalidate moves a clone into its
/// background refresh task.
#[derive(Clone)]
pub struct Executor {
    storage: CacheStorage,
    network: Arc<dyn Network>,
    partitions: PartitionSet,
    policy: ExpiryPolicy,
    timeout: Duration,
    offline_page: Option<Request>,
}

impl Executor {
    pub fn new(
        storage: CacheStorage, network: Arc<dyn Network>, partitions: PartitionSet, policy: ExpiryPolicy,
        timeout: Duration,
    ) -> Self {
        Self { storage, network, partitions, policy, timeout, offline_page: None }
    }

    /// Serve this page to navigations that miss both network and cache.
    pub fn with_offline_page(mut self, url: Url) -> Self {
        self.offline_page = Some(Request::get(url));
        self
    }

    pub fn storage(&self) -> &CacheStorage {
        &self.storage
    }

    pub fn partitions(&self) -> &PartitionSet {
        &self.partitions
    }

    pub fn policy(&self) -> &ExpiryPolicy {
        &self.policy
    }

    pub async fn execute(&self, strategy: Strategy, class: RequestClass, request: &Request) -> Served {
        match strategy {
            Strategy::CacheFirst => self.cache_first(class, request).await,
            Strategy::NetworkFirst => self.network_first(class, request).await,
            Strategy::StaleWhileRevalidate => self.stale_while_revalidate(class, request).await,
        }
    }

    /// Network fetch bounded by the configured timeout.
    pub async fn fetch_network(&self, request: &Request) -> Result<Response, Error> {
        match tokio::time::timeout(self.timeout, self.network.fetch(request)).await {
            Ok(result) => result,
            Err(_) => Err(Error::FetchTimeout(format!("{} after {}ms", request.url, self.timeout.as_millis()))),
        }
    }

    async fn cache_first(&self, class: RequestClass, request: &Request) -> Served {
        let partition = self.partitions.name(class);
        let cached = self.lookup(&partition, request).await;

        if let Some(hit) = &cached
            && !hit.is_expired(self.policy.max_age(Some(class)), Utc::now())
        {
            tracing::debug!("cache hit for {} in {}", request.url, partition);
            return Served::new(hit.clone(), Source::Cache);
        }

        match self.fetch_network(request).await {
            Ok(response) => {
                if response.ok() {
                    self.store(class, request, &response).await;
                }
                Served::new(response, Source::Network)
            }
            Err(e) => {
                tracing::debug!("network failed for {}: {}", request.url, e);
                match cached {
                    Some(stale) => Served::new(stale, Source::Cache),
                    None => self.offline(request).await,
                }
            }
        }
    }

    async fn network_first(&self, class: RequestClass, request: &Request) -> Served {
        match self.fetch_network(request).await {
            Ok(response) => {
                if response.ok() {
                    self.store(class, request, &response).await;
                }
                Served::new(response, Source::Network)
            }
            Err(e) => {
                let partition = self.partitions.name(class);
                tracing::debug!("network failed for {}, trying {}: {}", request.url, partition, e);
                match self.lookup(&partition, request).await {
                    Some(cached) => Served::new(cached, Source::Cache),
                    None => self.offline(request).await,
                }
            }
        }
    }

    async fn stale_while_revalidate(&self, class: RequestClass, request: &Request) -> Served {
        let partition = self.partitions.name(class);
        let cached = self.lookup(&partition, request).await;

        let executor = self.clone();
        let background = request.clone();
        let refresh = tokio::spawn(async move {
            match executor.fetch_network(&background).await {
                Ok(response) => {
                    if response.ok() {
                        executor.store(class, &background, &response).await;
                    }
                    Some(response)
                }
                Err(e) => {
                    tracing::debug!("background refresh failed for {}: {}", background.url, e);
                    None
                }
            }
        });

        if let Some(hit) = cached {
            tracing::debug!("serving {} from {} while revalidating", request.url, partition);
            return Served::new(hit, Source::Cache);
        }

        match refresh.await {
            Ok(Some(response)) => Served::new(response, Source::Network),
            Ok(None) => self.offline(request).await,
            Err(e) => {
                tracing::warn!("refresh task for {} failed: {}", request.url, e);
                self.offline(request).await
            }
        }
    }

    /// Fallback when neither network nor cache could answer.
    async fn offline(&self, request: &Request) -> Served {
        if request.is_navigation()
            && let Some(page) = &self.offline_page
        {
            let partition = self.partitions.name(RequestClass::Static);
            if let Some(response) = self.lookup(&partition, page).await {
                return Served::new(response, Source::Offline);
            }
        }
        Served::new(Response::offline(), Source::Offline)
    }

    /// Storage read that degrades to a miss on error.
    async fn lookup(&self, partition: &str, request: &Request) -> Option<Response> {
        match self.storage.match_request(partition, request).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!("cache read failed for {} in {}: {}", request.url, partition, e);
                None
            }
        }
    }

    /// Storage write of a clone of `response`; errors are logged and dropped.
    async fn store(&self, class: RequestClass, request: &Request, response: &Response) {
        let partition = self.partitions.name(class);
        let stored = if self.policy.stamps(class) { response.stamped(Utc::now()) } else { response.clone() };
        if let Err(e) = self.storage.put(&partition, request, &stored).await {
            tracing::warn!("cache write failed for {} in {}: {}", request.url, partition, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::mock::ScriptedNetwork;
    use std::time::Instant;
    use swcache_core::{CACHED_AT_HEADER, ExpiryMode};

    const APP: &str = "https://app.test";

    async fn executor(network: Arc<ScriptedNetwork>) -> Executor {
        let storage = CacheStorage::open_in_memory().await.unwrap();
        Executor::new(storage, network, PartitionSet::new("v2"), ExpiryPolicy::default(), Duration::from_secs(5))
            .with_offline_page(Url::parse(&format!("{APP}/offline.html")).unwrap())
    }

    fn get(path: &str) -> Request {
        Request::parse("GET", &format!("{APP}{path}")).unwrap()
    }

    /// Poll storage until `check` holds, for observing background writes.
    async fn eventually<F>(exec: &Executor, partition: &str, request: &Request, check: F) -> bool
    where
        F: Fn(&Response) -> bool,
    {
        for _ in 0..100 {
            if let Ok(Some(found)) = exec.storage().match_request(partition, request).await
                && check(&found)
            {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        false
    }

    #[test]
    fn test_strategy_for_class() {
        assert_eq!(Strategy::for_class(RequestClass::Static), Strategy::CacheFirst);
        assert_eq!(Strategy::for_class(RequestClass::Api), Strategy::NetworkFirst);
        assert_eq!(Strategy::for_class(RequestClass::Dynamic), Strategy::StaleWhileRevalidate);
    }

    #[tokio::test]
    async fn test_cache_first_fresh_hit_skips_network() {
        let network = ScriptedNetwork::new();
        network.respond(&format!("{APP}/app.js"), Response::new(200, "v1"));
        let exec = executor(network.clone()).await;
        let req = get("/app.js");

        let first = exec.execute(Strategy::CacheFirst, RequestClass::Static, &req).await;
        assert_eq!(first.source, Source::Network);

        let second = exec.execute(Strategy::CacheFirst, RequestClass::Static, &req).await;
        assert_eq!(second.source, Source::Cache);
        assert_eq!(second.response.body_text(), "v1");
        assert_eq!(network.calls(), 1);
    }

    #[tokio::test]
    async fn test_cache_first_refetches_expired_entry() {
        let network = ScriptedNetwork::new();
        network.respond(&format!("{APP}/app.css"), Response::new(200, "fresh"));
        let exec = executor(network.clone()).await;
        let req = get("/app.css");

        let old = Response::new(200, "stale").stamped(Utc::now() - chrono::Duration::minutes(10));
        exec.storage().put("static-v2", &req, &old).await.unwrap();

        let served = exec.execute(Strategy::CacheFirst, RequestClass::Static, &req).await;
        assert_eq!(served.source, Source::Network);
        assert_eq!(served.response.body_text(), "fresh");

        let stored = exec.storage().match_request("static-v2", &req).await.unwrap().unwrap();
        assert_eq!(stored.body_text(), "fresh");
    }

    #[tokio::test]
    async fn test_cache_first_serves_stale_when_offline() {
        let network = ScriptedNetwork::new();
        network.set_offline(true);
        let exec = executor(network).await;
        let req = get("/logo.png");

        let old = Response::new(200, "png").stamped(Utc::now() - chrono::Duration::hours(1));
        exec.storage().put("static-v2", &req, &old).await.unwrap();

        let served = exec.execute(Strategy::CacheFirst, RequestClass::Static, &req).await;
        assert_eq!(served.source, Source::Cache);
        assert_eq!(served.response.body_text(), "png");
    }

    #[tokio::test]
    async fn test_cache_first_does_not_store_errors() {
        let network = ScriptedNetwork::new();
        network.respond(&format!("{APP}/missing.js"), Response::new(404, "Not Found"));
        let exec = executor(network).await;
        let req = get("/missing.js");

        let served = exec.execute(Strategy::CacheFirst, RequestClass::Static, &req).await;
        assert_eq!(served.response.status, 404);
        assert_eq!(served.source, Source::Network);
        assert!(exec.storage().match_request("static-v2", &req).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_network_first_prefers_network_and_updates_cache() {
        let network = ScriptedNetwork::new();
        network.respond(&format!("{APP}/rest/v1/pontos"), Response::new(200, "new"));
        let exec = executor(network.clone()).await;
        let req = get("/rest/v1/pontos");

        let old = Response::new(200, "old").stamped(Utc::now() - chrono::Duration::hours(2));
        exec.storage().put("api-v2", &req, &old).await.unwrap();

        let served = exec.execute(Strategy::NetworkFirst, RequestClass::Api, &req).await;
        assert_eq!(served.source, Source::Network);
        assert_eq!(served.response.body_text(), "new");
        assert_eq!(served.response.header(CACHED_AT_HEADER), None);
        assert_eq!(network.calls(), 1);

        let stored = exec.storage().match_request("api-v2", &req).await.unwrap().unwrap();
        assert_eq!(stored.body_text(), "new");
        assert!(stored.cached_at().is_some());
    }

    #[tokio::test]
    async fn test_network_first_falls_back_to_cache() {
        let network = ScriptedNetwork::new();
        network.fail(&format!("{APP}/rest/v1/pontos"));
        let exec = executor(network).await;
        let req = get("/rest/v1/pontos");
        exec.storage().put("api-v2", &req, &Response::new(200, "cached")).await.unwrap();

        let served = exec.execute(Strategy::NetworkFirst, RequestClass::Api, &req).await;
        assert_eq!(served.source, Source::Cache);
        assert_eq!(served.response.body_text(), "cached");
    }

    #[tokio::test]
    async fn test_network_first_returns_error_status_without_storing() {
        let network = ScriptedNetwork::new();
        network.respond(&format!("{APP}/rest/v1/pontos"), Response::new(500, "boom"));
        let exec = executor(network).await;
        let req = get("/rest/v1/pontos");
        exec.storage().put("api-v2", &req, &Response::new(200, "cached")).await.unwrap();

        let served = exec.execute(Strategy::NetworkFirst, RequestClass::Api, &req).await;
        assert_eq!(served.response.status, 500);

        let stored = exec.storage().match_request("api-v2", &req).await.unwrap().unwrap();
        assert_eq!(stored.body_text(), "cached");
    }

    #[tokio::test]
    async fn test_stale_while_revalidate_returns_cached_immediately() {
        let network = ScriptedNetwork::new();
        network.respond_after(&format!("{APP}/dashboard"), Response::new(200, "fresh"), Duration::from_millis(500));
        let exec = executor(network.clone()).await;
        let req = get("/dashboard");
        exec.storage().put("dynamic-v2", &req, &Response::new(200, "cached")).await.unwrap();

        let start = Instant::now();
        let served = exec.execute(Strategy::StaleWhileRevalidate, RequestClass::Dynamic, &req).await;
        assert!(start.elapsed() < Duration::from_millis(400));
        assert_eq!(served.source, Source::Cache);
        assert_eq!(served.response.body_text(), "cached");

        assert!(eventually(&exec, "dynamic-v2", &req, |r| r.body_text() == "fresh").await);
        assert_eq!(network.calls_for(&format!("{APP}/dashboard")), 1);
    }

    #[tokio::test]
    async fn test_stale_while_revalidate_waits_for_network_on_miss() {
        let network = ScriptedNetwork::new();
        network.respond(&format!("{APP}/barbearia/corte"), Response::new(200, "page"));
        let exec = executor(network).await;
        let req = get("/barbearia/corte");

        let served = exec.execute(Strategy::StaleWhileRevalidate, RequestClass::Dynamic, &req).await;
        assert_eq!(served.source, Source::Network);
        assert_eq!(served.response.body_text(), "page");
        assert!(eventually(&exec, "dynamic-v2", &req, |r| r.body_text() == "page").await);
    }

    #[tokio::test]
    async fn test_offline_subresource_gets_503() {
        let network = ScriptedNetwork::new();
        network.set_offline(true);
        let exec = executor(network).await;

        for (strategy, class) in [
            (Strategy::CacheFirst, RequestClass::Static),
            (Strategy::NetworkFirst, RequestClass::Api),
            (Strategy::StaleWhileRevalidate, RequestClass::Dynamic),
        ] {
            let served = exec.execute(strategy, class, &get("/whatever")).await;
            assert_eq!(served.source, Source::Offline);
            assert_eq!(served.response.status, 503);
            assert_eq!(served.response.body_text(), "Offline");
        }
    }

    #[tokio::test]
    async fn test_offline_navigation_gets_offline_page() {
        let network = ScriptedNetwork::new();
        network.set_offline(true);
        let exec = executor(network).await;
        exec.storage()
            .put("static-v2", &get("/offline.html"), &Response::new(200, "<h1>Sem conexão</h1>"))
            .await
            .unwrap();

        let served = exec
            .execute(Strategy::StaleWhileRevalidate, RequestClass::Dynamic, &get("/cliente/42").navigate())
            .await;
        assert_eq!(served.source, Source::Offline);
        assert_eq!(served.response.status, 200);
        assert_eq!(served.response.body_text(), "<h1>Sem conexão</h1>");
    }

    #[tokio::test]
    async fn test_offline_navigation_without_page_gets_503() {
        let network = ScriptedNetwork::new();
        network.set_offline(true);
        let exec = executor(network).await;

        let served = exec.execute(Strategy::CacheFirst, RequestClass::Static, &get("/").navigate()).await;
        assert_eq!(served.response.status, 503);
    }

    #[tokio::test]
    async fn test_fetch_timeout_is_network_failure() {
        let network = ScriptedNetwork::new();
        network.respond_after(&format!("{APP}/rest/v1/slow"), Response::new(200, "late"), Duration::from_secs(30));
        let storage = CacheStorage::open_in_memory().await.unwrap();
        let exec = Executor::new(
            storage,
            network,
            PartitionSet::new("v2"),
            ExpiryPolicy::default(),
            Duration::from_millis(50),
        );
        let req = get("/rest/v1/slow");

        let result = exec.fetch_network(&req).await;
        assert!(matches!(result, Err(Error::FetchTimeout(_))));

        let served = exec.execute(Strategy::NetworkFirst, RequestClass::Api, &req).await;
        assert_eq!(served.response.status, 503);
    }

    #[tokio::test]
    async fn test_per_partition_mode_stamps_every_write() {
        let network = ScriptedNetwork::new();
        network.respond(&format!("{APP}/app.js"), Response::new(200, "js"));
        let storage = CacheStorage::open_in_memory().await.unwrap();
        let policy = ExpiryPolicy { mode: ExpiryMode::PerPartition, ..Default::default() };
        let exec = Executor::new(storage, network, PartitionSet::new("v2"), policy, Duration::from_secs(5));
        let req = get("/app.js");

        exec.execute(Strategy::CacheFirst, RequestClass::Static, &req).await;

        let stored = exec.storage().match_request("static-v2", &req).await.unwrap().unwrap();
        assert!(stored.cached_at().is_some());
    }

    #[tokio::test]
    async fn test_per_partition_mode_keeps_static_entry_past_api_max_age() {
        let network = ScriptedNetwork::new();
        network.respond(&format!("{APP}/app.js"), Response::new(200, "new"));
        let storage = CacheStorage::open_in_memory().await.unwrap();
        let policy = ExpiryPolicy { mode: ExpiryMode::PerPartition, ..Default::default() };
        let exec = Executor::new(storage, network.clone(), PartitionSet::new("v2"), policy, Duration::from_secs(5));
        let req = get("/app.js");

        let older_than_api_max_age = Response::new(200, "old").stamped(Utc::now() - chrono::Duration::hours(1));
        exec.storage().put("static-v2", &req, &older_than_api_max_age).await.unwrap();

        let served = exec.execute(Strategy::CacheFirst, RequestClass::Static, &req).await;
        assert_eq!(served.source, Source::Cache);
        assert_eq!(network.calls(), 0);
    }
}
