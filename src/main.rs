use std::sync::Arc;

use crossterm::event::{Event, EventStream, KeyCode, KeyEventKind};
use futures::StreamExt;
use tracing::{event, Level};

use rf_connector::session::ControlSession;
use rf_connector::utils;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    utils::log::start_tracing_subscriber();

    utils::log::logo();

    let app = rf_connector::App::new(utils::Config::default());

    tokio::select! {
        // the connector itself: control loop, http server and state sharing
        res = app.run() => {
            if let Err(e) = res {
                event!(Level::ERROR, "Error in main program: {}", e);
            }
        }

        // process that runs a terminal, that looks for input (eg "q" press)
        // this is the process that will run to completion and then the tokio::select will cancel the rest
        _ = run_terminal(app.session()) => { }

        _ = utils::log::shutdown_signal() => { }
    }

    app.shutdown().await;

    event!(Level::INFO, "rflink closed");
}

// listens to terminal inputs: c connects, d disconnects, r resets the aircraft and q quits
async fn run_terminal(session: Arc<ControlSession>) -> Result<(), ()> {
    let mut reader = EventStream::new();

    while let Some(maybe_event) = reader.next().await {
        match maybe_event {
            Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => match key.code {
                KeyCode::Char('q') => break,
                KeyCode::Char('c') => {
                    let _ = session.connect().await;
                }
                KeyCode::Char('d') => {
                    let _ = session.disconnect().await;
                }
                KeyCode::Char('r') => {
                    let _ = session.reset_aircraft().await;
                }
                _ => {}
            },
            Ok(_) => {}
            Err(e) => println!("Error: {:?}\r", e),
        }
    }

    Ok(())
}
