use anyhow::Result;
use tokio::task::JoinError;
use tracing::{error, info};

mod app;
mod handler;
mod logging;
mod tui;
mod ui;

use app::{App, ReplyOutcome, ReplyTask};
use eldermind_core::Config;
use tui::EventHandler;

#[tokio::main]
async fn main() -> Result<()> {
    let (_log_guard, log_path) = logging::init_logging()?;
    info!(log = %log_path.display(), "starting eldermind");

    let config = Config::load().unwrap_or_else(|err| {
        error!(error = %err, "could not read config, using defaults");
        Config::new()
    });
    let mut app = App::new(&config);

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let result = run(&mut terminal, &mut app).await;
    tui::restore()?;

    if let Err(err) = &result {
        error!(error = %err, "eldermind exited with an error");
    }
    result
}

async fn run(terminal: &mut tui::Tui, app: &mut App) -> Result<()> {
    let mut events = EventHandler::new();

    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        tokio::select! {
            event = events.next() => match event {
                Some(event) => handler::handle_event(app, event)?,
                None => break,
            },
            joined = wait_for_reply(&mut app.reply_task) => {
                app.complete_reply(joined);
            }
        }
    }

    Ok(())
}

/// Resolves when the pending chat request finishes; never resolves when idle
async fn wait_for_reply(task: &mut Option<ReplyTask>) -> Result<ReplyOutcome, JoinError> {
    match task {
        Some(handle) => handle.await,
        None => std::future::pending().await,
    }
}
