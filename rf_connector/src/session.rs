use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{event, Level};

use crate::command::CommandSource;
use crate::error::RfError;
use crate::realflightdatamap::{field_table, FieldTable};
use crate::soap::{self, SoapClient};
use crate::telemetry;
use crate::types::{AircraftState, Command, ConnectionState, NUM_CHANNELS};

/// Value sent on every channel that is not driven by the command.
pub const NEUTRAL_CHANNEL: f64 = 0.5;

// channel 7 selects the stability mode on most models, kept off until it is wired to an input
pub const STABILITY_MODE_CHANNEL: usize = 7;

// map a command onto the 12 realflight channels
pub fn channel_values(command: &Command) -> [f64; NUM_CHANNELS] {
    let mut channels = [NEUTRAL_CHANNEL; NUM_CHANNELS];
    channels[STABILITY_MODE_CHANNEL] = 0.0;

    channels[0] = command.aileron;
    channels[1] = command.elevator;
    channels[2] = command.throttle;
    channels[3] = command.rudder;
    channels[4] = command.flaps;
    channels[5] = command.gear;

    channels
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct Telemetry {
    pub aircraft: AircraftState,
    // utc millis of the last decoded reply, None before the first one
    pub last_updated_timestamp: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub connection: ConnectionState,
    pub aircraft: AircraftState,
    pub last_updated_timestamp: Option<i64>,
    pub exchanges: u64,
    pub failed_exchanges: u64,
}

/// One operator driving one simulated aircraft.
///
/// Owns the connect/disconnect lifecycle on the RealFlight side and the
/// unthrottled control loop that trades the latest command for fresh
/// telemetry as fast as the simulator answers.
pub struct ControlSession {
    soap: SoapClient,
    commands: Arc<dyn CommandSource>,
    table: FieldTable,
    reply_timeout: Duration,
    connection: watch::Sender<ConnectionState>,
    telemetry: RwLock<Telemetry>,
    stop: CancellationToken,
    exchanges: AtomicU64,
    failed_exchanges: AtomicU64,
}

impl ControlSession {
    pub fn new(
        soap: SoapClient,
        commands: Arc<dyn CommandSource>,
        reply_timeout: Duration,
    ) -> Self {
        let (connection, _) = watch::channel(ConnectionState::Disconnected);

        ControlSession {
            soap,
            commands,
            table: field_table(),
            reply_timeout,
            connection,
            telemetry: RwLock::new(Telemetry::default()),
            stop: CancellationToken::new(),
            exchanges: AtomicU64::new(0),
            failed_exchanges: AtomicU64::new(0),
        }
    }

    pub fn connection_state(&self) -> ConnectionState {
        *self.connection.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.connection_state() == ConnectionState::Connected
    }

    // take over control from the internal rc / joystick
    pub async fn connect(&self) -> Result<(), RfError> {
        match self.request_action(soap::ACTION_INJECT_CONTROLLER).await {
            Ok(()) => {
                self.connection.send_replace(ConnectionState::Connected);
                event!(Level::INFO, "External control enabled (RealFlight Link active)");
                Ok(())
            }
            Err(e) => {
                event!(Level::ERROR, "Cannot take control of RealFlight: {}", e);
                Err(e)
            }
        }
    }

    // hand control back to the internal rc / joystick
    pub async fn disconnect(&self) -> Result<(), RfError> {
        match self.request_action(soap::ACTION_RESTORE_CONTROLLER).await {
            Ok(()) => {
                self.connection.send_replace(ConnectionState::Disconnected);
                event!(Level::INFO, "External control disabled (internal RC active)");
                Ok(())
            }
            Err(e) => {
                event!(Level::ERROR, "Cannot restore the original controller: {}", e);
                Err(e)
            }
        }
    }

    // put the aircraft back at its start position, same as the spacebar in realflight
    pub async fn reset_aircraft(&self) -> Result<(), RfError> {
        match self.request_action(soap::ACTION_RESET_AIRCRAFT).await {
            Ok(()) => {
                event!(Level::INFO, "Aircraft reset to initial position");
                Ok(())
            }
            Err(e) => {
                event!(Level::ERROR, "Cannot reset the aircraft: {}", e);
                Err(e)
            }
        }
    }

    async fn request_action(&self, action: &str) -> Result<(), RfError> {
        let reply = self.soap.exchange(action, "", self.reply_timeout).await?;

        if soap::is_success(&reply) {
            Ok(())
        } else {
            Err(RfError::ProtocolRejected {
                action: action.to_string(),
            })
        }
    }

    // one full round trip: send the command, decode the telemetry that comes back
    pub async fn exchange_data(&self, command: &Command) -> Result<(), RfError> {
        let body = soap::control_inputs_body(&channel_values(command));
        let reply = self
            .soap
            .exchange(soap::ACTION_EXCHANGE_DATA, &body, self.reply_timeout)
            .await?;

        let mut aircraft = AircraftState::default();
        telemetry::decode(&reply, &self.table, &mut aircraft);

        {
            // extra scope to make sure we drop the lock
            let mut guard = match self.telemetry.write() {
                Ok(g) => g,
                Err(poisoned) => poisoned.into_inner(),
            };
            guard.aircraft = aircraft;
            guard.last_updated_timestamp = Some(chrono::Utc::now().timestamp_millis());
        }

        self.exchanges.fetch_add(1, Ordering::Relaxed);

        Ok(())
    }

    /// Exchanges data back to back for as long as the session is connected.
    ///
    /// There is no delay between iterations. A failed exchange is logged and
    /// the next iteration simply tries again.
    pub async fn run_loop(&self) {
        let mut failing: bool = false;

        event!(Level::DEBUG, "Control loop started");

        while self.is_connected() && !self.stop.is_cancelled() {
            let command = self.commands.latest();

            match self.exchange_data(&command).await {
                Ok(()) => {
                    if failing {
                        failing = false;
                        event!(Level::INFO, "Data exchange with RealFlight recovered");
                    }
                }
                Err(e) => {
                    self.failed_exchanges.fetch_add(1, Ordering::Relaxed);

                    if !failing {
                        failing = true;
                        event!(Level::ERROR, "Data exchange with RealFlight failed: {}", e);
                    } else {
                        event!(Level::DEBUG, "Data exchange failed again: {}", e);
                    }

                    tokio::task::yield_now().await;
                }
            }
        }

        event!(Level::DEBUG, "Control loop stopped");
    }

    // waits for the session to become connected and runs the loop, again after every reconnect
    pub async fn fly(&self) {
        let mut connection = self.connection.subscribe();

        loop {
            let connected = tokio::select! {
                biased;
                _ = self.stop.cancelled() => false,
                res = connection.wait_for(|s| *s == ConnectionState::Connected) => res.is_ok(),
            };

            if !connected {
                break;
            }

            self.run_loop().await;
        }
    }

    // stop the loop, give control back if we still have it, and close the pool
    pub async fn close(&self) {
        self.stop.cancel();

        if self.is_connected() {
            let _ = self.disconnect().await;
        }

        self.soap.pool().shutdown().await;
    }

    pub fn aircraft_state(&self) -> AircraftState {
        self.telemetry().aircraft
    }

    pub fn telemetry(&self) -> Telemetry {
        match self.telemetry.read() {
            Ok(g) => *g,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let telemetry = self.telemetry();

        SessionSnapshot {
            connection: self.connection_state(),
            aircraft: telemetry.aircraft,
            last_updated_timestamp: telemetry.last_updated_timestamp,
            exchanges: self.exchanges.load(Ordering::Relaxed),
            failed_exchanges: self.failed_exchanges.load(Ordering::Relaxed),
        }
    }
}
