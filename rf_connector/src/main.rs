use rf_connector::utils;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    utils::log::start_tracing_subscriber();

    let app = rf_connector::App::new(utils::Config::default());

    tokio::select! {
        res = app.run() => {
            if let Err(e) = res {
                tracing::event!(tracing::Level::ERROR, "Error in main program: {}", e);
            }
        }
        _ = utils::log::shutdown_signal() => { }
    }

    app.shutdown().await;
}
