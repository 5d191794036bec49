//! Application state.
//!
//! [`App`] owns everything the UI shows: the current screen, the mounted feed
//! view, the login/register form and the status-bar notice.  It never awaits
//! anything itself.  Network work is spawned by the components, and their
//! results come back through the [`Inbox`] channels that `main.rs` drains
//! into the `on_*` handlers below.

use std::time::{Duration, Instant};

use ratatui::widgets::ListState;
use tokio::sync::mpsc;

use crate::client::{AuthenticatedClient, ClientError};
use crate::config::Config;
use crate::paginator::{FeedPaginator, FeedSignal, FetchOutcome, ViewId};
use crate::preference::{
    PreferenceMutator, PreferenceOutcome, PreferenceState, Settled, ToggleRejected,
};
use crate::proximity::{ProximityObserver, ProximitySignal};
use crate::source::{FactSource, FeedItem, RecommendationSink};

// ---------------------------------------------------------------------------
// Channels
// ---------------------------------------------------------------------------

/// Sending halves handed to the components.
#[derive(Clone)]
pub struct Outbox {
    pub feed: mpsc::UnboundedSender<FetchOutcome>,
    pub proximity: mpsc::UnboundedSender<ProximitySignal>,
    pub preference: mpsc::UnboundedSender<PreferenceOutcome>,
    pub auth: mpsc::UnboundedSender<AuthOutcome>,
}

/// Receiving halves, drained by the event loop.
pub struct Inbox {
    pub feed: mpsc::UnboundedReceiver<FetchOutcome>,
    pub proximity: mpsc::UnboundedReceiver<ProximitySignal>,
    pub preference: mpsc::UnboundedReceiver<PreferenceOutcome>,
    pub auth: mpsc::UnboundedReceiver<AuthOutcome>,
}

pub fn channels() -> (Outbox, Inbox) {
    let (feed_tx, feed_rx) = mpsc::unbounded_channel();
    let (proximity_tx, proximity_rx) = mpsc::unbounded_channel();
    let (preference_tx, preference_rx) = mpsc::unbounded_channel();
    let (auth_tx, auth_rx) = mpsc::unbounded_channel();
    (
        Outbox {
            feed: feed_tx,
            proximity: proximity_tx,
            preference: preference_tx,
            auth: auth_tx,
        },
        Inbox {
            feed: feed_rx,
            proximity: proximity_rx,
            preference: preference_rx,
            auth: auth_rx,
        },
    )
}

// ---------------------------------------------------------------------------
// Notices
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

/// A transient status-bar message.
#[derive(Debug, Clone)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
    shown_at: Instant,
}

// ---------------------------------------------------------------------------
// Auth form
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Feed,
    Auth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    Login,
    Register,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Username,
    Password,
}

#[derive(Debug)]
pub struct AuthOutcome {
    pub mode: AuthMode,
    pub result: Result<(), ClientError>,
}

#[derive(Debug)]
pub struct AuthForm {
    pub mode: AuthMode,
    pub username: String,
    pub password: String,
    pub focus: Field,
    /// Inline failure message from the last submit.
    pub error: Option<String>,
    pub submitting: bool,
}

impl Default for AuthForm {
    fn default() -> Self {
        Self {
            mode: AuthMode::Login,
            username: String::new(),
            password: String::new(),
            focus: Field::Username,
            error: None,
            submitting: false,
        }
    }
}

impl AuthForm {
    fn focused_mut(&mut self) -> &mut String {
        match self.focus {
            Field::Username => &mut self.username,
            Field::Password => &mut self.password,
        }
    }
}

// ---------------------------------------------------------------------------
// Feed view
// ---------------------------------------------------------------------------

/// One mounted instance of the feed screen.
pub struct FeedView {
    pub paginator: FeedPaginator<FactSource>,
    pub observer: ProximityObserver,
    pub preferences: PreferenceMutator<RecommendationSink>,
    pub list_state: ListState,
}

impl FeedView {
    pub fn id(&self) -> ViewId {
        self.paginator.view()
    }

    pub fn selected_item(&self) -> Option<(usize, &FeedItem)> {
        let index = self.list_state.selected()?;
        let entry = self.paginator.items().get(index)?;
        Some((index, &entry.item))
    }

    pub fn preference(&self, index: usize) -> PreferenceState {
        self.preferences.state(index)
    }

    fn observe(&mut self) {
        self.observer
            .observe(self.list_state.selected(), self.paginator.len());
    }
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

pub struct App {
    client: AuthenticatedClient,
    outbox: Outbox,
    lookahead: usize,
    notice_ttl: Duration,
    next_view: ViewId,
    pub screen: Screen,
    pub feed: Option<FeedView>,
    pub form: AuthForm,
    pub notice: Option<Notice>,
    /// Whether the user has requested to quit.
    pub quit: bool,
}

impl App {
    pub fn new(client: AuthenticatedClient, outbox: Outbox, config: &Config) -> Self {
        Self {
            client,
            outbox,
            lookahead: config.lookahead,
            notice_ttl: Duration::from_secs(config.notice_secs),
            next_view: 1,
            screen: Screen::Feed,
            feed: None,
            form: AuthForm::default(),
            notice: None,
            quit: false,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.client.session().is_authenticated()
    }

    pub fn notify(&mut self, level: NoticeLevel, text: impl Into<String>) {
        let text = text.into();
        tracing::debug!(?level, %text, "notice");
        self.notice = Some(Notice {
            level,
            text,
            shown_at: Instant::now(),
        });
    }

    // -- feed lifecycle ------------------------------------------------------

    /// Show the feed screen with a fresh view and seed it with one fetch.
    pub fn mount_feed(&mut self) {
        self.teardown_feed();

        let view = self.next_view;
        self.next_view += 1;

        let mut paginator = FeedPaginator::new(
            view,
            FactSource::new(self.client.clone()),
            self.outbox.feed.clone(),
        );
        paginator.request_next();

        let observer = ProximityObserver::new(view, self.lookahead, self.outbox.proximity.clone());
        let preferences = PreferenceMutator::new(
            view,
            RecommendationSink::new(self.client.clone()),
            self.client.session().clone(),
            self.outbox.preference.clone(),
        );

        tracing::info!(view, "feed view mounted");
        self.feed = Some(FeedView {
            paginator,
            observer,
            preferences,
            list_state: ListState::default(),
        });
        self.screen = Screen::Feed;
    }

    /// Drop the feed view.  In-flight requests keep running; their results
    /// no longer match any view and are discarded on arrival.
    pub fn teardown_feed(&mut self) {
        if let Some(mut view) = self.feed.take() {
            view.observer.disconnect();
            tracing::info!(view = view.id(), items = view.paginator.len(), "feed view torn down");
        }
    }

    fn redirect_to_login(&mut self) {
        self.teardown_feed();
        self.form = AuthForm::default();
        self.screen = Screen::Auth;
    }

    // -- inbox handlers ------------------------------------------------------

    pub fn on_fetch(&mut self, outcome: FetchOutcome) {
        let Some(view) = self.feed.as_mut().filter(|v| v.id() == outcome.view) else {
            tracing::debug!(view = outcome.view, "fetch result for a detached view discarded");
            return;
        };

        match view.paginator.apply(outcome) {
            FeedSignal::Appended => {
                if view.list_state.selected().is_none() {
                    view.list_state.select(Some(0));
                }
                view.observe();
            }
            FeedSignal::RedirectToLogin => {
                self.redirect_to_login();
                self.notify(NoticeLevel::Info, "Please sign in");
            }
            // The next key press counts as a new approach to the end.
            FeedSignal::Dropped => view.observer.rearm(),
            FeedSignal::Stale => {}
        }
    }

    pub fn on_proximity(&mut self, signal: ProximitySignal) {
        if let Some(view) = self
            .feed
            .as_mut()
            .filter(|v| v.id() == signal.view && v.observer.is_connected())
        {
            view.paginator.request_next();
        }
    }

    pub fn on_preference(&mut self, outcome: PreferenceOutcome) {
        let Some(view) = self.feed.as_mut().filter(|v| v.id() == outcome.view) else {
            return;
        };
        if let Some(settled) = view.preferences.settle(outcome) {
            let level = match settled {
                Settled::Committed { .. } => NoticeLevel::Success,
                Settled::RolledBack { .. } => NoticeLevel::Error,
            };
            self.notify(level, settled.message());
        }
    }

    pub fn on_auth(&mut self, outcome: AuthOutcome) {
        self.form.submitting = false;
        match (outcome.mode, outcome.result) {
            (AuthMode::Login, Ok(())) => {
                self.form = AuthForm::default();
                self.notify(NoticeLevel::Success, "Signed in");
                self.mount_feed();
            }
            (AuthMode::Register, Ok(())) => {
                self.form.mode = AuthMode::Login;
                self.form.password.clear();
                self.form.focus = Field::Password;
                self.form.error = None;
                self.notify(NoticeLevel::Success, "Registration complete, sign in");
            }
            (mode, Err(e)) => {
                tracing::info!(?mode, error = %e, "authentication request failed");
                let fallback = match mode {
                    AuthMode::Login => "Login failed",
                    AuthMode::Register => "Registration failed",
                };
                self.form.error = Some(e.server_message().unwrap_or(fallback).to_string());
            }
        }
    }

    /// A session lost while the feed is shown sends the user to the login
    /// screen.  The feed's own 401 may arrive before or after this; whichever
    /// comes second finds the view gone and changes nothing.
    pub fn on_session_changed(&mut self, authenticated: bool) {
        tracing::debug!(authenticated, "session changed");
        if !authenticated && self.screen == Screen::Feed {
            self.redirect_to_login();
            self.notify(NoticeLevel::Info, "Please sign in");
        }
    }

    pub fn on_tick(&mut self) {
        if self
            .notice
            .as_ref()
            .is_some_and(|n| n.shown_at.elapsed() >= self.notice_ttl)
        {
            self.notice = None;
        }
    }

    // -- feed actions --------------------------------------------------------

    pub fn toggle_like(&mut self) {
        let Some(view) = self.feed.as_mut() else {
            return;
        };
        let Some((index, item)) = view.selected_item() else {
            return;
        };
        let category = item.category.clone();

        match view.preferences.toggle(index, &category) {
            Ok(_) => {}
            Err(ToggleRejected::Anonymous) => {
                self.notify(NoticeLevel::Info, "Sign in to like items");
            }
            Err(ToggleRejected::Pending) => {}
        }
    }

    pub fn open_selected(&mut self) {
        let Some(url) = self
            .feed
            .as_ref()
            .and_then(FeedView::selected_item)
            .map(|(_, item)| item.external_url.clone())
            .filter(|url| !url.is_empty())
        else {
            return;
        };

        if let Err(e) = open::that_detached(&url) {
            tracing::warn!(%url, error = %e, "failed to open link");
            self.notify(NoticeLevel::Error, "Could not open link");
        }
    }

    pub fn logout(&mut self) {
        self.client.logout();
        self.redirect_to_login();
        self.notify(NoticeLevel::Info, "Signed out");
    }

    // -- navigation ----------------------------------------------------------

    fn navigate(&mut self, pick: impl FnOnce(Option<usize>, usize) -> usize) {
        let Some(view) = self.feed.as_mut() else {
            return;
        };
        let len = view.paginator.len();
        if len == 0 {
            view.observe();
            return;
        }
        let i = pick(view.list_state.selected(), len);
        view.list_state.select(Some(i));
        view.observe();
    }

    pub fn select_next(&mut self) {
        self.navigate(|selected, len| match selected {
            Some(i) => (i + 1).min(len - 1),
            None => 0,
        });
    }

    pub fn select_previous(&mut self) {
        self.navigate(|selected, _| match selected {
            Some(i) => i.saturating_sub(1),
            None => 0,
        });
    }

    pub fn select_first(&mut self) {
        self.navigate(|_, _| 0);
    }

    pub fn select_last(&mut self) {
        self.navigate(|_, len| len - 1);
    }

    // -- auth form -----------------------------------------------------------

    pub fn form_input(&mut self, c: char) {
        self.form.focused_mut().push(c);
    }

    pub fn form_backspace(&mut self) {
        self.form.focused_mut().pop();
    }

    pub fn form_next_field(&mut self) {
        self.form.focus = match self.form.focus {
            Field::Username => Field::Password,
            Field::Password => Field::Username,
        };
    }

    pub fn form_toggle_mode(&mut self) {
        self.form.mode = match self.form.mode {
            AuthMode::Login => AuthMode::Register,
            AuthMode::Register => AuthMode::Login,
        };
        self.form.error = None;
    }

    /// Send the form.  Must be called from within a tokio runtime.
    pub fn submit_form(&mut self) {
        if self.form.submitting {
            return;
        }
        self.form.submitting = true;
        self.form.error = None;

        let client = self.client.clone();
        let tx = self.outbox.auth.clone();
        let mode = self.form.mode;
        let username = self.form.username.clone();
        let password = self.form.password.clone();
        tracing::debug!(?mode, %username, "submitting auth form");

        tokio::spawn(async move {
            let result = match mode {
                AuthMode::Login => client.login(&username, &password).await,
                AuthMode::Register => client.register(&username, &password).await,
            };
            let _ = tx.send(AuthOutcome { mode, result });
        });
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
