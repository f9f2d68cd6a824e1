use std::sync::Arc;

use tracing::{event, Level};

use self::command::CommandStore;
use self::httpserver::ServerState;
use self::session::ControlSession;
use self::soap::SoapClient;
use self::socketpool::ConnectionPool;
use self::utils::Config;

pub mod command;
pub mod error;
pub mod httpserver;
pub mod realflightdatamap;
pub mod session;
pub mod soap;
pub mod socketpool;
pub mod telemetry;
pub mod types;
pub mod utils;

#[cfg(test)]
mod testserver;

// the wired up connector: pool, command snapshot and the session that owns both
pub struct App {
    config: Config,
    commands: Arc<CommandStore>,
    session: Arc<ControlSession>,
}

impl App {
    // needs to be called from within a tokio runtime, the pool starts its maintainer right away
    pub fn new(config: Config) -> Self {
        let pool = Arc::new(ConnectionPool::start(config.pool_config()));
        let commands = Arc::new(CommandStore::default());
        let session = Arc::new(ControlSession::new(
            SoapClient::new(pool),
            commands.clone(),
            config.reply_timeout,
        ));

        App {
            config,
            commands,
            session,
        }
    }

    pub fn session(&self) -> Arc<ControlSession> {
        self.session.clone()
    }

    pub async fn run(&self) -> anyhow::Result<()> {
        event!(
            Level::INFO,
            "Connecting to RealFlight at {} (pool size {})",
            self.config.rf_address(),
            self.config.pool_size
        );

        if self.config.auto_connect {
            // not fatal, control can still be taken later through the http server
            let _ = self.session.connect().await;
        }

        let server_state = ServerState {
            session: self.session.clone(),
            commands: self.commands.clone(),
            axis_range: self.config.axis_range,
        };

        tokio::select! {

            // process that trades the latest command for telemetry whenever we are connected
            _ = self.session.fly() => { }

            // process that runs an http server, to share state and take commands and control inputs
            res = httpserver::run_server(&self.config.http_address, server_state) => { res? }

            // process that forwards the telemetry to a data server, if one is configured
            res = share_state(self.session.clone(), &self.config) => { res? }
        }

        Ok(())
    }

    // hand control back to realflight and close every connection
    pub async fn shutdown(&self) {
        self.session.close().await;
        event!(Level::INFO, "rf_connector closed");
    }
}

async fn share_state(session: Arc<ControlSession>, config: &Config) -> anyhow::Result<()> {
    let url = match &config.dataserver_url {
        Some(url) => url.clone(),
        None => {
            // nothing to share with, park forever
            std::future::pending::<()>().await;
            return Ok(());
        }
    };

    let client = reqwest::Client::new();

    loop {
        let snapshot = session.snapshot();

        if snapshot.last_updated_timestamp.is_some() {
            let json = &serde_json::json!({
                    "plane_state": snapshot,
            });

            if let Err(e) = client.post(&url).json(json).send().await {
                event!(Level::WARN, "Cannot share state with {}: {}", url, e);
            }
        }

        tokio::time::sleep(config.share_interval).await;
    }
}
