//! Quiz Console - Multiple-choice quizzes with categories and per-player success rates.

mod app;
mod auth;
mod catalog;
mod config;
mod db;
mod error;
mod input;
mod models;
mod sampler;
mod seed;
mod session;
mod stats;
mod ui;

use app::App;
use config::Config;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::sync::Mutex;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let config = Config::load();
    init_logging(&config)?;

    if Config::config_path().is_some_and(|p| !p.exists()) {
        if let Err(e) = config.save() {
            tracing::warn!(error = %e, "could not write default config");
        }
    }

    let app = App::new(config)?;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, app);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = result {
        tracing::error!(error = %err, "quiz console exited with an error");
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }

    Ok(())
}

/// Log to a file; the terminal belongs to the UI while it runs.
fn init_logging(config: &Config) -> anyhow::Result<()> {
    let Some(path) = Config::log_path() else {
        return Ok(());
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::OpenOptions::new().create(true).append(true).open(&path)?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();

    tracing::info!(log = %path.display(), "logging initialised");
    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, mut app: App) -> anyhow::Result<()> {
    loop {
        terminal.draw(|f| ui::draw(f, &app))?;

        // Poll with timeout so answer feedback can time out
        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if key.code == KeyCode::Char('q') && key.modifiers.is_empty() && app.can_quit() {
                    break;
                }
                if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                    break;
                }
                app.handle_key(key);
            }
        }

        if app.should_quit {
            break;
        }

        app.tick();
    }

    tracing::info!("quiz console closed");
    Ok(())
}
