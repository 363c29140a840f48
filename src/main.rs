use std::time::Duration;

use anyhow::Result;

mod app;
mod config;
mod conversation;
mod handler;
mod openai;
mod params;
mod tui;
mod ui;

use app::App;
use config::Config;
use openai::CompletionError;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load().unwrap_or_default();
    let mut app = App::new(&config);

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = tui::EventHandler::new(Duration::from_millis(300));

    let result = run(&mut terminal, &mut events, &mut app).await;

    tui::restore()?;
    result
}

async fn run(terminal: &mut tui::Tui, events: &mut tui::EventHandler, app: &mut App) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        if let Some(event) = events.next().await {
            handler::handle_event(app, event)?;
        }

        poll_completion(app).await;
    }
    Ok(())
}

/// Settle the in-flight completion once its task finishes. The tick event
/// keeps the loop turning, so a finished task is picked up within one
/// tick even when the user is idle.
async fn poll_completion(app: &mut App) {
    let finished = app
        .completion_task
        .as_ref()
        .map(|task| task.is_finished())
        .unwrap_or(false);
    if !finished {
        return;
    }

    if let Some(task) = app.completion_task.take() {
        let result = match task.await {
            Ok(result) => result,
            Err(err) => Err(CompletionError::Network(format!(
                "completion task failed: {err}"
            ))),
        };

        if let Some(next_request) = app.settle_completion(result) {
            handler::dispatch(app, next_request);
        }
        app.scroll_transcript_to_bottom();
    }
}
