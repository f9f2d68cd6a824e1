// connection pool for realflight. realflight does not accept more than one soap request
// per tcp connection, so connections are opened ahead of demand and used exactly once

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{event, Level};

use crate::error::RfError;

/// A live, not yet used transport to the simulator.
///
/// Consumed by exactly one request/response exchange and closed afterwards,
/// it never goes back into the pool.
#[derive(Debug)]
pub struct Connection {
    id: u64,
    io_timeout: Duration,
    pub(crate) stream: TcpStream,
}

impl Connection {
    pub fn id(&self) -> u64 {
        self.id
    }

    // bound for every single write or read on this connection
    pub fn io_timeout(&self) -> Duration {
        self.io_timeout
    }

    pub async fn close(mut self) {
        let _ = self.stream.shutdown().await;
    }
}

#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub address: String,
    pub target_size: usize,
    pub io_timeout: Duration,
}

impl PoolConfig {
    pub fn new(address: impl Into<String>, target_size: usize) -> Self {
        PoolConfig {
            address: address.into(),
            target_size,
            io_timeout: Duration::from_secs(1),
        }
    }
}

struct PoolShared {
    address: String,
    target_size: usize,
    io_timeout: Duration,
    next_id: AtomicU64,
    ready: Mutex<VecDeque<Connection>>,
}

impl PoolShared {
    // the lock only ever guards the queue mutation, never any i/o
    fn ready(&self) -> MutexGuard<'_, VecDeque<Connection>> {
        match self.ready.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    async fn create_connection(&self) -> Result<Connection, RfError> {
        let stream =
            match tokio::time::timeout(self.io_timeout, TcpStream::connect(&self.address)).await {
                Ok(Ok(stream)) => stream,
                Ok(Err(e)) => {
                    return Err(RfError::ConnectFailed {
                        address: self.address.clone(),
                        source: e,
                    })
                }
                Err(_) => {
                    return Err(RfError::ConnectFailed {
                        address: self.address.clone(),
                        source: std::io::Error::new(
                            std::io::ErrorKind::TimedOut,
                            "connect timed out",
                        ),
                    })
                }
            };

        if let Err(e) = stream.set_nodelay(true) {
            event!(
                Level::DEBUG,
                "Cannot set TCP_NODELAY on connection to {}: {:?}",
                self.address,
                e
            );
        }

        Ok(Connection {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            io_timeout: self.io_timeout,
            stream,
        })
    }
}

pub struct ConnectionPool {
    shared: Arc<PoolShared>,
    stop: CancellationToken,
    maintainer: Mutex<Option<JoinHandle<()>>>,
}

impl ConnectionPool {
    /// Creates the pool and spawns its maintainer task on the current tokio runtime.
    pub fn start(config: PoolConfig) -> Self {
        let shared = Arc::new(PoolShared {
            address: config.address,
            target_size: config.target_size,
            io_timeout: config.io_timeout,
            next_id: AtomicU64::new(0),
            ready: Mutex::new(VecDeque::with_capacity(config.target_size)),
        });

        let stop = CancellationToken::new();
        let maintainer = tokio::spawn(maintain_pool(shared.clone(), stop.clone()));

        ConnectionPool {
            shared,
            stop,
            maintainer: Mutex::new(Some(maintainer)),
        }
    }

    pub fn target_size(&self) -> usize {
        self.shared.target_size
    }

    pub fn ready_count(&self) -> usize {
        self.shared.ready().len()
    }

    // hand out a ready connection, or open one right now if the pool is empty
    pub async fn acquire(&self) -> Result<Connection, RfError> {
        let pooled = self.shared.ready().pop_front();

        match pooled {
            Some(c) => Ok(c),
            None => {
                event!(Level::TRACE, "Pool empty, creating a connection on demand");
                self.shared.create_connection().await
            }
        }
    }

    pub async fn create_connection(&self) -> Result<Connection, RfError> {
        self.shared.create_connection().await
    }

    // stop and join the maintainer, then close every connection still queued
    pub async fn shutdown(&self) {
        self.stop.cancel();

        let handle = match self.maintainer.lock() {
            Ok(mut g) => g.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };

        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                event!(Level::ERROR, "Pool maintainer ended abnormally: {:?}", e);
            }
        }

        let drained: Vec<Connection> = self.shared.ready().drain(..).collect();
        let closed = drained.len();

        for c in drained {
            c.close().await;
        }

        event!(
            Level::DEBUG,
            "Connection pool shut down, closed {} queued connections",
            closed
        );
    }
}

impl Drop for ConnectionPool {
    fn drop(&mut self) {
        self.stop.cancel();
    }
}

// keeps the pool topped up to its target size until stopped
async fn maintain_pool(shared: Arc<PoolShared>, stop: CancellationToken) {
    let mut failing: bool = false;

    event!(
        Level::DEBUG,
        "Pool maintainer started for {} (target size {})",
        shared.address,
        shared.target_size
    );

    while !stop.is_cancelled() {
        let current_size = shared.ready().len();

        if current_size < shared.target_size {
            let created = tokio::select! {
                _ = stop.cancelled() => break,
                c = shared.create_connection() => c,
            };

            match created {
                Ok(c) => {
                    if failing {
                        failing = false;
                        event!(Level::INFO, "Pool maintainer reached {} again", shared.address);
                    }
                    shared.ready().push_back(c);
                }
                Err(e) => {
                    if !failing {
                        failing = true;
                        event!(Level::WARN, "Pool maintainer cannot connect: {}", e);
                    }
                }
            }
        }

        // no sleep here, realflight keeps up better without one
        tokio::task::yield_now().await;
    }

    event!(Level::DEBUG, "Pool maintainer stopped");
}
