//! factscroll: an endless fact feed for the terminal.
//!
//! ## Architecture overview
//!
//! ```text
//!               ┌──────────────┐   outcomes   ┌──────────┐  draw()  ┌──────────┐
//!  backend ◄──► │ paginator.rs │ ───────────► │  app.rs  │ ───────► │  ui.rs   │
//!     ▲         │preference.rs │  (channels)  │ (state)  │          │ (render) │
//!     │         └──────────────┘              └──────────┘          └──────────┘
//!     │                ▲                        ▲      │
//!  ┌──────────┐        │ proximity signals      │      │ handle_key_event()
//!  │client.rs │        └──────── proximity.rs ◄─┘  ┌──────────┐
//!  │session.rs│                                    │ input.rs │
//!  └──────────┘                                    └──────────┘
//! ```
//!
//! * **`session`**: owns the access token, persists it, broadcasts changes.
//! * **`client`**: attaches the token to requests; a 401 clears the session.
//! * **`source/`**: the feed and preference endpoints behind small traits.
//! * **`paginator`**: one fetch at a time, append-only items, terminal on 401.
//! * **`proximity`**: turns the selection position into "near the end" signals.
//! * **`preference`**: optimistic like/unlike with rollback.
//! * **`app`**: owns all application state (screens, feed view, form, notices).
//! * **`ui`**: pure rendering: reads `App` state and draws widgets.
//! * **`input`**: maps key events to `App` mutations.
//! * **`main`**: wires everything together: parse args, load config, set up
//!   the terminal, and run the event loop.

mod app;
mod client;
mod config;
mod input;
mod logging;
mod paginator;
mod preference;
mod proximity;
mod session;
mod source;
mod ui;

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use crossterm::{
    event::{Event, EventStream},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures_util::StreamExt;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;

use app::App;
use client::AuthenticatedClient;
use config::Config;
use session::{FileBackend, SessionStore};

// ---------------------------------------------------------------------------
// Command line
// ---------------------------------------------------------------------------

#[derive(Debug, Parser)]
#[command(name = "factscroll", version, about)]
struct Cli {
    /// Backend base URL (overrides the config file)
    #[arg(long, env = "FACTSCROLL_API_URL")]
    api_url: Option<String>,

    /// Path to config.toml
    #[arg(long)]
    config: Option<PathBuf>,

    /// Keep the session in memory only
    #[arg(long)]
    ephemeral: bool,
}

// ---------------------------------------------------------------------------
// RAII terminal guard
// ---------------------------------------------------------------------------

/// Manages terminal raw-mode and alternate-screen lifetime via [`Drop`].
///
/// Constructing this struct enters raw mode + alternate screen.  When the
/// value is dropped (normally or during stack unwinding) it restores the
/// terminal.
struct TerminalGuard {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
}

impl TerminalGuard {
    fn new() -> Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;
        Ok(Self { terminal })
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}

/// Install a panic hook that restores the terminal before printing the
/// panic message.
fn install_panic_hook() {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        tracing::error!(%info, "panic");
        original_hook(info);
    }));
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// How often notices are expired and the screen redrawn without input.
const TICK_RATE: Duration = Duration::from_millis(250);

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // -- configuration -------------------------------------------------------
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    }
    .with_api_url(cli.api_url.clone());

    let _log_guard = logging::init(&config)?;
    install_panic_hook();
    tracing::info!(ephemeral = cli.ephemeral, "starting");

    // -- core services -------------------------------------------------------
    let session = if cli.ephemeral {
        SessionStore::in_memory()
    } else {
        let backend = FileBackend::new(config.session_dir());
        tracing::debug!(path = %backend.path().display(), "session record");
        SessionStore::open(backend)
    };
    let client = AuthenticatedClient::new(config.api_url.clone(), session.clone());
    tracing::info!(
        api_url = client.base_url(),
        authenticated = session.is_authenticated(),
        "client ready"
    );

    let (outbox, mut inbox) = app::channels();
    let mut app = App::new(client, outbox, &config);
    app.mount_feed();

    // -- terminal setup (RAII, Drop restores on exit or panic) ---------------
    let mut guard = TerminalGuard::new()?;
    let mut events = EventStream::new();
    let mut session_changes = session.subscribe();
    let mut tick = tokio::time::interval(TICK_RATE);

    // -- main event loop -----------------------------------------------------
    // Each iteration renders once, then waits for whichever comes first:
    // a key press, a component result, a session change, or the tick.
    loop {
        guard.terminal.draw(|f| ui::draw(&mut app, f))?;

        tokio::select! {
            event = events.next() => match event {
                Some(Ok(Event::Key(key))) => input::handle_key_event(&mut app, key),
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
                None => break,
            },
            Some(outcome) = inbox.feed.recv() => app.on_fetch(outcome),
            Some(signal) = inbox.proximity.recv() => app.on_proximity(signal),
            Some(outcome) = inbox.preference.recv() => app.on_preference(outcome),
            Some(outcome) = inbox.auth.recv() => app.on_auth(outcome),
            Ok(()) = session_changes.changed() => {
                let authenticated = session_changes.borrow_and_update().is_some();
                app.on_session_changed(authenticated);
            }
            _ = tick.tick() => app.on_tick(),
        }

        if app.quit {
            break;
        }
    }

    tracing::info!("exiting");
    // `guard` is dropped here, restoring the terminal.
    Ok(())
}
