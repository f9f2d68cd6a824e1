use tokio::signal;
use tower_http::{
    classify::{ServerErrorsAsFailures, SharedClassifier},
    trace::TraceLayer,
};
use tracing::{event, Level};

// initiate tracing, defaulting to info when RUST_LOG is not set

pub fn start_tracing_subscriber() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }

    tracing_subscriber::fmt::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}

// prepare a trace layer for the http server that will connect the server to tracing

pub fn return_trace_layer() -> TraceLayer<SharedClassifier<ServerErrorsAsFailures>> {
    TraceLayer::new_for_http()
        .make_span_with(tower_http::trace::DefaultMakeSpan::new().include_headers(true))
        .on_request(tower_http::trace::DefaultOnRequest::new().level(Level::TRACE))
        .on_response(
            tower_http::trace::DefaultOnResponse::new()
                .level(Level::TRACE)
                .latency_unit(tower_http::LatencyUnit::Micros),
        )
}

// resolves on ctrl+c or sigterm. a handler that cannot be installed is logged and
// never fires, the other one still does
pub async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                event!(Level::ERROR, "Failed to install Ctrl+C handler: {:?}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                event!(Level::ERROR, "Failed to install SIGTERM handler: {:?}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

pub fn logo() {
    println!(
        r"
                    ___
                 __/   \__
      ___________\_______/___________
                 (_)   (_)
 ___________ ___________.__  .__        __
 \______   \\_   _____/|  | |__| ____ |  | __
  |       _/ |    __)  |  | |  |/    \|  |/ /
  |    |   \ |     \   |  |_|  |   |  \    <
  |____|_  / \___  /   |____/__|___|  /__|_ \
         \/      \/                 \/     \/  v0.1
    "
    );
}
