//! Terminal UI rendering.
//!
//! All drawing lives here, separated from application state ([`App`]) and
//! input handling ([`crate::input`]).  Nothing in this module mutates state
//! other than the list widget's scroll offset.
//!
//! ## For contributors
//!
//! * The layout is three rows: a one-line header, the screen body, and a
//!   one-line status bar.
//! * The feed body is split into the item list and a detail pane for the
//!   selected item.
//! * Colours and styles are defined inline.

use ratatui::{
    layout::{Constraint, Flex, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, AuthMode, Field, FeedView, NoticeLevel, Screen};

/// Draw the complete UI for one frame.
pub fn draw(app: &mut App, frame: &mut Frame) {
    let [header_area, body_area, status_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(1),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    draw_header(app, frame, header_area);
    match app.screen {
        Screen::Feed => draw_feed(app, frame, body_area),
        Screen::Auth => draw_auth_form(app, frame, body_area),
    }
    draw_status_bar(app, frame, status_area);
}

fn draw_header(app: &App, frame: &mut Frame, area: Rect) {
    let session = if app.is_authenticated() {
        Span::styled("signed in", Style::default().fg(Color::Green))
    } else {
        Span::styled("anonymous", Style::default().fg(Color::DarkGray))
    };
    let header = Line::from(vec![
        Span::styled(
            " Story ",
            Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
        session,
    ]);
    frame.render_widget(Paragraph::new(header), area);
}

// ---------------------------------------------------------------------------
// Feed screen
// ---------------------------------------------------------------------------

fn draw_feed(app: &mut App, frame: &mut Frame, area: Rect) {
    let Some(view) = app.feed.as_mut() else {
        frame.render_widget(
            Paragraph::new("No feed").block(Block::default().borders(Borders::ALL)),
            area,
        );
        return;
    };

    let [list_area, detail_area] =
        Layout::horizontal([Constraint::Percentage(45), Constraint::Percentage(55)]).areas(area);

    draw_feed_list(view, frame, list_area);
    draw_detail(view, frame, detail_area);
}

/// Render the scrollable item list, with a loading row while fetching.
fn draw_feed_list(view: &mut FeedView, frame: &mut Frame, area: Rect) {
    let mut list_items: Vec<ListItem> = view
        .paginator
        .items()
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let pref = view.preferences.state(index);
            let heart = match (pref.liked, pref.pending()) {
                (_, true) => Span::styled("… ", Style::default().fg(Color::DarkGray)),
                (true, false) => Span::styled("♥ ", Style::default().fg(Color::Red)),
                (false, false) => Span::styled("♡ ", Style::default().fg(Color::Gray)),
            };

            let line = Line::from(vec![
                Span::styled(
                    entry.received_at.format("%H:%M:%S ").to_string(),
                    Style::default().fg(Color::DarkGray),
                ),
                heart,
                Span::styled(entry.item.title.as_str(), Style::default().fg(Color::White)),
                Span::raw("  "),
                Span::styled(
                    format!("[{}]", entry.item.category),
                    Style::default().fg(Color::Cyan),
                ),
            ]);
            ListItem::new(line)
        })
        .collect();

    if view.paginator.state().fetch_in_flight {
        list_items.push(ListItem::new(Span::styled(
            "Loading…",
            Style::default().fg(Color::Yellow),
        )));
    } else if view.paginator.is_empty() {
        list_items.push(ListItem::new(Span::styled(
            "Nothing here yet",
            Style::default().fg(Color::DarkGray),
        )));
    }

    let list = List::new(list_items)
        .block(Block::default().title(" Feed ").borders(Borders::ALL))
        .highlight_style(
            Style::default()
                .add_modifier(Modifier::BOLD)
                .bg(Color::DarkGray),
        )
        .highlight_symbol("▸ ");

    frame.render_stateful_widget(list, area, &mut view.list_state);
}

/// Render the selected item's full text and links.
fn draw_detail(view: &FeedView, frame: &mut Frame, area: Rect) {
    let block = Block::default().title(" Article ").borders(Borders::ALL);
    let Some((index, item)) = view.selected_item() else {
        frame.render_widget(Paragraph::new("").block(block), area);
        return;
    };

    let pref = view.preference(index);
    let like = if pref.pending() {
        Span::styled("[ … ]", Style::default().fg(Color::DarkGray))
    } else if pref.liked {
        Span::styled("[ ♥ Liked ]", Style::default().fg(Color::Red))
    } else {
        Span::styled("[ ♡ Like ]", Style::default().fg(Color::Gray))
    };

    let mut lines = vec![
        Line::from(Span::styled(
            item.title.as_str(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            item.category.as_str(),
            Style::default().fg(Color::Cyan),
        )),
        Line::raw(""),
        Line::raw(item.summary.as_str()),
        Line::raw(""),
        Line::from(like),
    ];
    if item.has_link() {
        lines.push(Line::from(Span::styled(
            item.external_url.as_str(),
            Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::UNDERLINED),
        )));
    }
    if item.has_image() {
        lines.push(Line::from(Span::styled(
            format!("image: {}", item.image_url),
            Style::default().fg(Color::DarkGray),
        )));
    }

    frame.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: true }),
        area,
    );
}

// ---------------------------------------------------------------------------
// Auth screen
// ---------------------------------------------------------------------------

fn draw_auth_form(app: &App, frame: &mut Frame, area: Rect) {
    let form = &app.form;
    let title = match form.mode {
        AuthMode::Login => " Sign in ",
        AuthMode::Register => " Register ",
    };

    let [column] = Layout::horizontal([Constraint::Length(50)])
        .flex(Flex::Center)
        .areas(area);
    let [form_area] = Layout::vertical([Constraint::Length(9)])
        .flex(Flex::Center)
        .areas(column);

    let field = |label: &str, value: String, focused: bool| {
        let style = if focused {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        };
        let cursor = if focused { "_" } else { "" };
        Line::from(vec![
            Span::styled(format!("{label:<10}"), style),
            Span::raw(value),
            Span::styled(cursor, style),
        ])
    };

    let mut lines = vec![
        field("Username", form.username.clone(), form.focus == Field::Username),
        field(
            "Password",
            "•".repeat(form.password.chars().count()),
            form.focus == Field::Password,
        ),
        Line::raw(""),
    ];
    if form.submitting {
        lines.push(Line::styled("Sending…", Style::default().fg(Color::Yellow)));
    } else if let Some(error) = &form.error {
        lines.push(Line::styled(error.as_str(), Style::default().fg(Color::Red)));
    } else {
        lines.push(Line::raw(""));
    }
    let switch = match form.mode {
        AuthMode::Login => "No account? Ctrl-R to register",
        AuthMode::Register => "Have an account? Ctrl-R to sign in",
    };
    lines.push(Line::styled(switch, Style::default().fg(Color::DarkGray)));

    frame.render_widget(
        Paragraph::new(lines).block(Block::default().title(title).borders(Borders::ALL)),
        form_area,
    );
}

// ---------------------------------------------------------------------------
// Status bar
// ---------------------------------------------------------------------------

fn draw_status_bar(app: &App, frame: &mut Frame, area: Rect) {
    let mut spans = vec![Span::raw(" ")];

    if let Some(notice) = &app.notice {
        let color = match notice.level {
            NoticeLevel::Info => Color::Yellow,
            NoticeLevel::Success => Color::Green,
            NoticeLevel::Error => Color::Red,
        };
        spans.push(Span::styled(notice.text.as_str(), Style::default().fg(color)));
        spans.push(Span::raw("  "));
    }

    match app.screen {
        Screen::Feed => {
            let count = app.feed.as_ref().map_or(0, |v| v.paginator.len());
            spans.push(Span::styled(
                format!("{count} items"),
                Style::default().fg(Color::Green),
            ));
            spans.push(Span::raw(
                "  q: quit  ↑/↓: scroll  space: like  o: open  X: logout",
            ));
        }
        Screen::Auth => {
            spans.push(Span::raw("Tab: next field  Enter: submit  Esc: quit"));
        }
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
