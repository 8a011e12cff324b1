use std::time::Duration;

use anyhow::Result;
use clap::Parser;

mod app;
mod backend;
mod config;
mod handler;
mod tui;
mod ui;

use app::App;
use backend::BackendClient;
use config::Config;

#[derive(Parser)]
#[command(name = "shopchat")]
#[command(about = "Terminal chat client for the shopbot storefront")]
struct Cli {
    /// Backend base URL (overrides the config file, and is remembered)
    #[arg(long)]
    base_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load().unwrap_or_default();
    let base_url = match cli.base_url {
        Some(url) => {
            Config::save_base_url(&url)?;
            url
        }
        None => config.base_url().to_string(),
    };

    let backend = BackendClient::new(&base_url)?;
    let mut app = App::new(backend);

    // Establishes csrftoken/session cookies. A failure is not fatal: the
    // token stays empty and the backend decides what to reject.
    if let Err(err) = app.backend.prime_session().await {
        app.fail_request(&err);
    }

    tui::install_panic_hook();
    let mut terminal = tui::init()?;

    let result = run(&mut terminal, &mut app).await;

    tui::restore()?;
    result
}

async fn run(terminal: &mut tui::Tui, app: &mut App) -> Result<()> {
    let mut events = tui::EventHandler::new(Duration::from_millis(300));

    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        let Some(event) = events.next().await else {
            break;
        };
        handler::handle_event(app, event);

        // Completed requests land here, in the order their responses arrived
        app.reap_requests().await;
    }

    Ok(())
}
