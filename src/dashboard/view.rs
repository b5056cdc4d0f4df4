use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph, Row, Table};

use crate::query::{MutationState, QueryState};
use crate::users::{Field, UserListResult};

use super::{Dashboard, Section};

pub(super) fn render(app: &Dashboard, frame: &mut Frame<'_>) {
    let rows = Layout::vertical([
        Constraint::Length(3),
        Constraint::Min(5),
        Constraint::Length(3),
    ])
    .split(frame.area());

    render_header(app, frame, rows[0]);

    let columns = Layout::horizontal([Constraint::Length(20), Constraint::Min(20)]).split(rows[1]);
    render_sidebar(app, frame, columns[0]);
    match app.section {
        Section::Dashboard => render_home(app, frame, columns[1]),
        Section::Users => render_users(app, frame, columns[1]),
        Section::CreateUser => render_form(app, frame, columns[1]),
    }

    render_footer(app, frame, rows[2]);
}

fn render_header(app: &Dashboard, frame: &mut Frame<'_>, area: Rect) {
    let line = Line::from(vec![
        Span::styled("Roster", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        Span::raw("  "),
        Span::styled(&app.api_url, Style::default().fg(Color::DarkGray)),
        Span::raw("  | "),
        Span::styled(&app.profile_name, Style::default().fg(Color::Yellow)),
    ]);
    let header = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
    frame.render_widget(header, area);
}

fn render_sidebar(app: &Dashboard, frame: &mut Frame<'_>, area: Rect) {
    let items: Vec<ListItem> = Section::ALL
        .iter()
        .enumerate()
        .map(|(i, section)| {
            let style = if *section == app.section {
                Style::default().fg(Color::Black).bg(Color::Cyan)
            } else {
                Style::default()
            };
            ListItem::new(format!("{} {}", i + 1, section.title())).style(style)
        })
        .collect();

    let list = List::new(items).block(Block::default().borders(Borders::ALL).title("Menu"));
    frame.render_widget(list, area);
}

fn render_home(app: &Dashboard, frame: &mut Frame<'_>, area: Rect) {
    let total = app
        .total_users
        .map_or_else(|| "...".to_string(), |n| n.to_string());
    let text = vec![
        Line::from(format!("Welcome, {}.", app.profile_name)),
        Line::from(""),
        Line::from(vec![
            Span::raw("Registered users: "),
            Span::styled(total, Style::default().fg(Color::Green)),
        ]),
    ];
    let home = Paragraph::new(text).block(Block::default().borders(Borders::ALL).title("Dashboard"));
    frame.render_widget(home, area);
}

fn render_users(app: &Dashboard, frame: &mut Frame<'_>, area: Rect) {
    match &app.list {
        QueryState::Loading => {
            let loading = Paragraph::new("Loading users...")
                .block(Block::default().borders(Borders::ALL).title("Users"));
            frame.render_widget(loading, area);
        }
        QueryState::Success { data, is_stale } => render_table(app, data, *is_stale, frame, area),
        QueryState::Error(e) => {
            let error = Paragraph::new(format!("Error loading users: {e}"))
                .style(Style::default().fg(Color::Red))
                .block(Block::default().borders(Borders::ALL).title("Users"));
            frame.render_widget(error, area);
        }
    }
}

fn render_table(
    app: &Dashboard,
    data: &UserListResult,
    is_stale: bool,
    frame: &mut Frame<'_>,
    area: Rect,
) {
    let pages = data.total_pages(app.page_size).max(1);
    let mut title = format!("Users ({}) - page {} of {pages}", data.total_count, app.page);
    if is_stale {
        title.push_str(" (refreshing)");
    }

    if data.users.is_empty() {
        let empty = Paragraph::new("No users yet.")
            .block(Block::default().borders(Borders::ALL).title(title));
        frame.render_widget(empty, area);
        return;
    }

    let header = Row::new(["Name", "Email", "Created"])
        .style(Style::default().add_modifier(Modifier::BOLD));
    let rows = data.users.iter().map(|user| {
        Row::new([
            user.name.clone(),
            user.email.clone(),
            user.created_at.clone(),
        ])
    });
    let table = Table::new(
        rows,
        [
            Constraint::Percentage(35),
            Constraint::Percentage(45),
            Constraint::Percentage(20),
        ],
    )
    .header(header)
    .block(Block::default().borders(Borders::ALL).title(title));

    frame.render_widget(table, area);
}

fn render_form(app: &Dashboard, frame: &mut Frame<'_>, area: Rect) {
    let mut constraints = vec![Constraint::Length(4); Field::ALL.len()];
    constraints.push(Constraint::Min(2));
    let rows = Layout::vertical(constraints).split(area);

    for (field, row) in Field::ALL.into_iter().zip(rows.iter()) {
        let value = app.form.value(field);
        let shown = if field.is_secret() {
            "*".repeat(value.chars().count())
        } else {
            value.to_string()
        };

        let mut lines = vec![Line::from(shown)];
        if let Some(message) = app.form.error(field) {
            lines.push(Line::styled(message, Style::default().fg(Color::Red)));
        }

        let border = if field == app.focus {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default()
        };
        let input = Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border)
                .title(field.label()),
        );
        frame.render_widget(input, *row);
    }

    let (label, style) = if app.form.is_submitting() {
        ("Saving...", Style::default().fg(Color::Yellow))
    } else {
        ("[Enter] Save   [Esc] Cancel", Style::default().fg(Color::Gray))
    };
    let mut lines = vec![Line::styled(label, style)];
    if let Some(e) = app.form.submit_error() {
        lines.push(Line::styled(e.to_string(), Style::default().fg(Color::Red)));
    } else if let MutationState::Success(user) = &app.creation {
        lines.push(Line::styled(
            format!("Last created: {}", user.name),
            Style::default().fg(Color::Green),
        ));
    }
    if let Some(last) = rows.last() {
        frame.render_widget(Paragraph::new(lines), *last);
    }
}

fn render_footer(app: &Dashboard, frame: &mut Frame<'_>, area: Rect) {
    let keys = match app.section {
        Section::CreateUser => "Tab/Shift-Tab: field | Enter: save | Esc: cancel",
        Section::Users => "←/→: page | r: refresh | 1-3: menu | q: quit",
        Section::Dashboard => "1-3: menu | r: refresh | q: quit",
    };
    let text = if app.status.is_empty() {
        keys.to_string()
    } else {
        format!("{} | {keys}", app.status)
    };
    let footer = Paragraph::new(text)
        .style(Style::default().fg(Color::Gray))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(footer, area);
}
