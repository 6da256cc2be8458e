use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use crate::app::App;

/// Height of one country card, borders included
pub const CARD_HEIGHT: u16 = 5;

const TITLE: &str = "Country Search";

/// Status lines shown between the search box and the grid
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Error(String),
    Loading,
    NoResults,
}

/// Which notices the current state calls for.
///
/// Error and Loading can show together: the error is set before the
/// loading flag is cleared.
pub fn notices(app: &App) -> Vec<Notice> {
    let mut notices = Vec::new();

    if !app.error.is_empty() {
        notices.push(Notice::Error(app.error.clone()));
    }
    if app.loading {
        notices.push(Notice::Loading);
    }
    if !app.loading && app.error.is_empty() && app.filtered_countries.is_empty() {
        notices.push(Notice::NoResults);
    }

    notices
}

struct Areas {
    title: Rect,
    search: Rect,
    notices: Rect,
    grid: Rect,
    footer: Rect,
}

fn split(area: Rect, notice_count: usize) -> Areas {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),                    // Title
            Constraint::Length(3),                    // Search box
            Constraint::Length(notice_count as u16),  // Notices
            Constraint::Min(0),                       // Card grid
            Constraint::Length(1),                    // Footer
        ])
        .split(area);

    Areas {
        title: chunks[0],
        search: chunks[1],
        notices: chunks[2],
        grid: chunks[3],
        footer: chunks[4],
    }
}

fn columns_for(width: u16, card_width: u16) -> usize {
    (width / card_width.max(1)).max(1) as usize
}

/// Grid size in cards (columns, visible rows) for a terminal area
pub fn grid_viewport(app: &App, area: Rect) -> (usize, usize) {
    let grid = split(area, notices(app).len()).grid;
    let columns = columns_for(grid.width, app.card_width);
    let rows = (grid.height / CARD_HEIGHT).max(1) as usize;
    (columns, rows)
}

pub fn draw(f: &mut Frame, app: &App) {
    let notices = notices(app);
    let areas = split(f.area(), notices.len());

    draw_title(f, app, areas.title);
    draw_search_box(f, app, areas.search);
    draw_notices(f, app, &notices, areas.notices);

    // No cards until the load has settled
    if !app.loading {
        draw_grid(f, app, areas.grid);
    }

    draw_footer(f, app, areas.footer);

    if app.show_help {
        draw_help_popup(f, app);
    }
}

fn draw_title(f: &mut Frame, app: &App, area: Rect) {
    let title = Paragraph::new(Line::from(Span::styled(
        TITLE,
        Style::default().fg(app.theme.accent).add_modifier(Modifier::BOLD),
    )))
    .alignment(Alignment::Center);

    f.render_widget(title, area);
}

fn draw_search_box(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(Span::styled(" Search ", Style::default().fg(app.theme.accent)))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(app.theme.accent));

    let line = if app.search_term.is_empty() {
        Line::from(Span::styled(
            app.placeholder.as_str(),
            Style::default().fg(app.theme.text_dim).add_modifier(Modifier::ITALIC),
        ))
    } else {
        Line::from(vec![
            Span::styled(app.search_term.as_str(), Style::default().fg(app.theme.text)),
            Span::styled("▏", Style::default().fg(app.theme.accent)),
        ])
    };

    f.render_widget(Paragraph::new(line).block(block), area);
}

fn draw_notices(f: &mut Frame, app: &App, notices: &[Notice], area: Rect) {
    let lines: Vec<Line> = notices
        .iter()
        .map(|notice| match notice {
            Notice::Error(message) => Line::from(Span::styled(
                message.as_str(),
                Style::default().fg(app.theme.danger).add_modifier(Modifier::BOLD),
            )),
            Notice::Loading => Line::from(Span::styled(
                "Loading countries...",
                Style::default().fg(app.theme.text_dim),
            )),
            Notice::NoResults => Line::from(Span::styled(
                "No countries found.",
                Style::default().fg(app.theme.text),
            )),
        })
        .collect();

    f.render_widget(Paragraph::new(lines).alignment(Alignment::Center), area);
}

fn draw_grid(f: &mut Frame, app: &App, area: Rect) {
    if area.height < CARD_HEIGHT || area.width == 0 {
        return;
    }

    let columns = columns_for(area.width, app.card_width);
    let rows = (area.height / CARD_HEIGHT) as usize;
    // Center the grid horizontally
    let grid_width = (columns as u16 * app.card_width).min(area.width);
    let left = area.x + (area.width - grid_width) / 2;

    let visible = app
        .filtered_countries
        .chunks(columns)
        .skip(app.scroll)
        .take(rows);

    for (row, countries) in visible.enumerate() {
        for (col, country) in countries.iter().enumerate() {
            let x = left + col as u16 * app.card_width;
            let card = Rect {
                x,
                y: area.y + row as u16 * CARD_HEIGHT,
                width: app.card_width.min(area.x + area.width - x),
                height: CARD_HEIGHT,
            };

            let block = Block::default()
                .title(Span::styled(
                    format!(" {} ", country.abbr),
                    Style::default().fg(app.theme.text_dim),
                ))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(app.theme.inactive));

            // Terminals can't show the image, so the alt text stands in for it
            let content = Paragraph::new(vec![
                Line::from(Span::styled(
                    country.name.as_str(),
                    Style::default().fg(app.theme.accent).add_modifier(Modifier::BOLD),
                )),
                Line::from(Span::styled(
                    format!("[{}]", country.alt_text()),
                    Style::default().fg(app.theme.text),
                )),
                Line::from(Span::styled(
                    country.flag.as_str(),
                    Style::default().fg(app.theme.text_dim),
                )),
            ])
            .alignment(Alignment::Center)
            .block(block);

            f.render_widget(content, card);
        }
    }
}

fn draw_footer(f: &mut Frame, app: &App, area: Rect) {
    let hints = [
        ("type", "Search"),
        ("^U", "Clear"),
        ("↑↓", "Scroll"),
        ("F1", "Help"),
        ("Esc", "Quit"),
    ];

    let mut spans: Vec<Span> = hints
        .iter()
        .flat_map(|(key, action)| {
            vec![
                Span::styled(*key, Style::default().fg(app.theme.accent)),
                Span::styled(format!(" {} │ ", action), Style::default().fg(app.theme.text_dim)),
            ]
        })
        .collect();

    if !app.loading && app.error.is_empty() {
        spans.push(Span::styled(
            format!("{}/{}", app.filtered_countries.len(), app.countries.len()),
            Style::default().fg(app.theme.text),
        ));
    }

    let footer = Paragraph::new(Line::from(spans)).alignment(Alignment::Center);
    f.render_widget(footer, area);
}

fn draw_help_popup(f: &mut Frame, app: &App) {
    let popup_area = centered_rect(60, 60, f.area());
    f.render_widget(Clear, popup_area);

    let key_style = Style::default().fg(app.theme.accent).add_modifier(Modifier::BOLD);
    let text_style = Style::default().fg(app.theme.text);
    let entry = |key: &'static str, text: &'static str| {
        Line::from(vec![
            Span::styled(format!("  {:<10}", key), key_style),
            Span::styled(text, text_style),
        ])
    };

    let help = Paragraph::new(vec![
        Line::from(""),
        entry("any key", "Type to filter countries by name"),
        entry("Backspace", "Delete last character"),
        entry("Ctrl+U", "Clear the search"),
        entry("↑ ↓", "Scroll one row"),
        entry("PgUp PgDn", "Scroll one page"),
        entry("Home End", "Jump to top / bottom"),
        entry("Esc", "Close help, or quit"),
        entry("Ctrl+C", "Quit"),
    ])
    .block(
        Block::default()
            .title(Span::styled(" Help ", key_style))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(app.theme.accent)),
    );

    f.render_widget(help, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
