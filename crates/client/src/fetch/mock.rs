//! Scripted in-memory network for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use swcache_core::{Error, Request, Response};

use super::Network;

#[derive(Clone)]
enum Reply {
    Respond(Response, Duration),
    Fail,
}

/// Network double that answers from a per-URL script and counts calls.
///
/// Unscripted URLs fail like an unreachable host.
#[derive(Default)]
pub(crate) struct ScriptedNetwork {
    routes: Mutex<HashMap<String, Reply>>,
    calls: Mutex<HashMap<String, usize>>,
    total: AtomicUsize,
    offline: AtomicBool,
}

impl ScriptedNetwork {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn respond(&self, url: &str, response: Response) {
        self.respond_after(url, response, Duration::ZERO);
    }

    pub(crate) fn respond_after(&self, url: &str, response: Response, delay: Duration) {
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), Reply::Respond(response, delay));
    }

    pub(crate) fn fail(&self, url: &str) {
        self.routes.lock().unwrap().insert(url.to_string(), Reply::Fail);
    }

    pub(crate) fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub(crate) fn calls(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }

    pub(crate) fn calls_for(&self, url: &str) -> usize {
        self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }
}

#[async_trait::async_trait]
impl Network for ScriptedNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        let url = request.key_url();
        self.total.fetch_add(1, Ordering::SeqCst);
        *self.calls.lock().unwrap().entry(url.clone()).or_default() += 1;

        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::Network(format!("{url}: offline")));
        }

        let reply = self.routes.lock().unwrap().get(&url).cloned();
        match reply {
            Some(Reply::Respond(response, delay)) => {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                Ok(response)
            }
            Some(Reply::Fail) | None => Err(Error::Network(format!("{url}: connection refused"))),
        }
    }
}
