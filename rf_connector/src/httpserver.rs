use std::sync::Arc;

use serde::{Deserialize, Serialize};

use axum::{
    extract::State,
    http::{Method, StatusCode},
    routing::{get, post},
    Json, Router,
};

use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{event, Level};

use crate::command::{AxisRange, CommandSource, CommandStore};
use crate::session::{ControlSession, SessionSnapshot};
use crate::types::{Axis, Command};
use crate::utils;

// everything the handlers need, cloned into every request
#[derive(Clone)]
pub struct ServerState {
    pub session: Arc<ControlSession>,
    pub commands: Arc<CommandStore>,
    pub axis_range: AxisRange,
}

pub fn router(state: ServerState) -> Router {
    let cors = CorsLayer::new()
        // allow `GET` and `POST` when accessing the resource
        .allow_methods([Method::GET, Method::POST])
        // allow requests from any origin
        .allow_origin(Any);

    Router::new()
        .route("/", get(root))
        .route("/api/v1/state", get(get_state))
        .route("/api/v1/command", post(send_command))
        .route("/api/v1/controls", post(set_controls))
        .route("/api/v1/axis", post(set_axis))
        .layer(utils::log::return_trace_layer())
        .layer(cors)
        .with_state(state)
}

// bind the address and serve the routes
pub async fn run_server(address: &str, state: ServerState) -> anyhow::Result<()> {
    let listener = TcpListener::bind(address).await?;
    serve(listener, state).await
}

pub async fn serve(listener: TcpListener, state: ServerState) -> anyhow::Result<()> {
    event!(
        Level::INFO,
        "rf_connector server started to listen on address {:?}",
        listener.local_addr()?
    );

    axum::serve(listener, router(state)).await?;

    Ok(())
}

// basic handler that responds with a static string - can be used as a heart beat
async fn root() -> &'static str {
    "Hello, World!"
}

// copy of the latest session state
async fn get_state(State(state): State<ServerState>) -> Json<SessionSnapshot> {
    Json(state.session.snapshot())
}

#[derive(Debug, Deserialize, Serialize)]
pub struct SendCommand {
    pub command: String,
}

// connect, disconnect or reset, answered once realflight has replied
async fn send_command(
    State(state): State<ServerState>,
    Json(payload): Json<SendCommand>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    let result = match payload.command.as_str() {
        "connect" => state.session.connect().await,
        "disconnect" => state.session.disconnect().await,
        "reset" => state.session.reset_aircraft().await,
        other => {
            return Err((
                StatusCode::NOT_IMPLEMENTED,
                Json(serde_json::json!({ "error": format!("unknown command {}", other) })),
            ));
        }
    };

    match result {
        Ok(()) => Ok(Json(serde_json::json!({
            "connection": state.session.connection_state(),
        }))),
        Err(e) => {
            event!(Level::WARN, "Command {} failed: {}", payload.command, e);
            Err((
                StatusCode::BAD_GATEWAY,
                Json(serde_json::json!({ "error": e.to_string() })),
            ))
        }
    }
}

// any subset of the six channels, already normalized to [0, 1]
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ControlUpdate {
    pub throttle: Option<f64>,
    pub aileron: Option<f64>,
    pub elevator: Option<f64>,
    pub rudder: Option<f64>,
    pub flaps: Option<f64>,
    pub gear: Option<f64>,
}

impl ControlUpdate {
    fn apply(&self, command: &mut Command) {
        let channels = [
            (Axis::Throttle, self.throttle),
            (Axis::Aileron, self.aileron),
            (Axis::Elevator, self.elevator),
            (Axis::Rudder, self.rudder),
            (Axis::Flaps, self.flaps),
            (Axis::Gear, self.gear),
        ];

        for (axis, value) in channels {
            if let Some(v) = value {
                command.set(axis, v);
            }
        }
    }
}

async fn set_controls(
    State(state): State<ServerState>,
    Json(payload): Json<ControlUpdate>,
) -> Json<Command> {
    state.commands.update(|c| payload.apply(c));
    Json(state.commands.latest())
}

// a raw device reading for one axis, mapped through the configured axis range
#[derive(Debug, Deserialize, Serialize)]
pub struct RawAxis {
    pub axis: Axis,
    pub raw: f64,
}

async fn set_axis(State(state): State<ServerState>, Json(payload): Json<RawAxis>) -> Json<Command> {
    state
        .commands
        .set_raw_axis(payload.axis, payload.raw, &state.axis_range);
    Json(state.commands.latest())
}
