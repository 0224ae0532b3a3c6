//! Recording balancer mock shared by the scaler and poller tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use sprout_balancer::stats::{StatCounters, StatEntry};
use sprout_balancer::{BalancerApi, BalancerError, BalancerResult, NativeStats};

/// A balancer command as observed by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Command {
    Bind {
        backend: String,
        name: String,
        host: String,
        port: u16,
    },
    Delete {
        backend: String,
        name: String,
    },
    DeleteAll {
        backend: String,
    },
}

impl Command {
    pub(crate) fn bind(backend: &str, name: &str, host: &str, port: u16) -> Self {
        Self::Bind {
            backend: backend.to_string(),
            name: name.to_string(),
            host: host.to_string(),
            port,
        }
    }

    pub(crate) fn delete(backend: &str, name: &str) -> Self {
        Self::Delete {
            backend: backend.to_string(),
            name: name.to_string(),
        }
    }
}

fn api_error() -> BalancerError {
    BalancerError::Api {
        status: 503,
        body: "injected failure".to_string(),
    }
}

/// Records every command and serves scripted stats documents.
#[derive(Default)]
pub(crate) struct MockBalancer {
    commands: Mutex<Vec<Command>>,
    /// Queued `fetch_stats` outcomes, consumed front to back.
    stats_script: Mutex<VecDeque<BalancerResult<NativeStats>>>,
    /// `Some(n)`: allow `n` more successful binds, then fail.
    bind_budget: Mutex<Option<usize>>,
    fail_deletes: Mutex<bool>,
}

impl MockBalancer {
    pub(crate) fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn commands(&self) -> Vec<Command> {
        self.commands.lock().unwrap().clone()
    }

    /// Let `n` more binds succeed, then reject the rest.
    pub(crate) fn fail_binds_after(&self, n: usize) {
        *self.bind_budget.lock().unwrap() = Some(n);
    }

    pub(crate) fn fail_deletes(&self) {
        *self.fail_deletes.lock().unwrap() = true;
    }

    /// Queue a stats document reporting `rtime` for `backend`.
    pub(crate) fn push_rtime(&self, backend: &str, rtime: u64) {
        self.stats_script
            .lock()
            .unwrap()
            .push_back(Ok(stats_doc(backend, rtime)));
    }

    /// Queue a failed fetch.
    pub(crate) fn push_fetch_error(&self) {
        self.stats_script
            .lock()
            .unwrap()
            .push_back(Err(api_error()));
    }

    /// Queue a document that lacks the target backend.
    pub(crate) fn push_missing_backend(&self) {
        self.stats_script
            .lock()
            .unwrap()
            .push_back(Ok(stats_doc("some-other-backend", 50)));
    }
}

/// Build a document with a frontend entry and one backend entry.
pub(crate) fn stats_doc(backend: &str, rtime: u64) -> NativeStats {
    NativeStats {
        stats: vec![
            StatEntry {
                kind: "frontend".to_string(),
                name: "http-in".to_string(),
                stats: StatCounters { rtime: Some(0.0) },
            },
            StatEntry {
                kind: "backend".to_string(),
                name: backend.to_string(),
                stats: StatCounters {
                    rtime: Some(rtime as f64),
                },
            },
        ],
    }
}

#[async_trait]
impl BalancerApi for MockBalancer {
    async fn bind_server(
        &self,
        backend: &str,
        name: &str,
        host: &str,
        port: u16,
    ) -> BalancerResult<()> {
        let mut budget = self.bind_budget.lock().unwrap();
        if let Some(remaining) = budget.as_mut() {
            if *remaining == 0 {
                return Err(api_error());
            }
            *remaining -= 1;
        }
        drop(budget);

        self.commands
            .lock()
            .unwrap()
            .push(Command::bind(backend, name, host, port));
        Ok(())
    }

    async fn delete_server(&self, backend: &str, name: &str) -> BalancerResult<()> {
        if *self.fail_deletes.lock().unwrap() {
            return Err(api_error());
        }
        self.commands
            .lock()
            .unwrap()
            .push(Command::delete(backend, name));
        Ok(())
    }

    async fn delete_all_servers(&self, backend: &str) -> BalancerResult<()> {
        self.commands.lock().unwrap().push(Command::DeleteAll {
            backend: backend.to_string(),
        });
        Ok(())
    }

    async fn fetch_stats(&self) -> BalancerResult<NativeStats> {
        self.stats_script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(NativeStats::default()))
    }
}
