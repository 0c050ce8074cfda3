use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
};
use sifriya_core::navigation::POPULAR_TEXTS;
use sifriya_core::tree::{self, DEFAULT_MAX_DEPTH};
use sifriya_core::verses::VerseRow;
use sifriya_core::{Language, RenderedText, Screen};

use crate::app::{App, InputMode, View};

const SPINNER: [&str; 3] = [".", "..", "..."];

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    match app.view {
        View::Browse if app.nav.screen() == Screen::Reading => render_reading(app, frame, body_area),
        View::Browse => render_browse_screen(app, frame, body_area),
        View::Outline => render_outline(app, frame, body_area),
        View::Search => render_search_screen(app, frame, body_area),
    }

    render_footer(app, frame, footer_area);

    if app.view == View::Browse {
        if let Some(translation) = app.reader.popup() {
            render_popup(frame, area, &translation);
        }
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let mut crumbs = app.nav.breadcrumb(app.language).join(" › ");
    if let Some(book) = app.nav.selected_book() {
        if !crumbs.is_empty() {
            crumbs.push_str(" › ");
        }
        crumbs.push_str(book);
    }

    let busy = if app.is_busy() {
        SPINNER[app.spinner_frame as usize % SPINNER.len()]
    } else {
        ""
    };

    let language = match app.language {
        Language::En => "EN",
        Language::He => "עב",
    };

    let title = Line::from(vec![
        Span::styled(" Sifriya ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(crumbs, Style::default().fg(Color::White)),
        Span::raw(" "),
        Span::styled(busy, Style::default().fg(Color::Yellow)),
        Span::raw(" "),
        Span::styled(
            format!("[{}] v{}", language, env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    if let Some(status) = &app.status {
        let footer = Paragraph::new(Line::from(vec![
            Span::styled(" ! ", Style::default().bg(Color::Red).fg(Color::White)),
            Span::styled(format!(" {}", status), Style::default().fg(Color::Red)),
        ]))
        .style(Style::default().bg(Color::Black));
        frame.render_widget(footer, area);
        return;
    }

    let (mode_text, mode_style) = match (app.view, app.input_mode) {
        (_, InputMode::Editing) => (" TYPE ", Style::default().bg(Color::Yellow).fg(Color::Black)),
        (View::Outline, _) => (" OUTLINE ", Style::default().bg(Color::Magenta).fg(Color::White)),
        (View::Search, _) => (" SEARCH ", Style::default().bg(Color::Green).fg(Color::Black)),
        (View::Browse, _) if app.nav.screen() == Screen::Reading => {
            (" READ ", Style::default().bg(Color::Cyan).fg(Color::Black))
        }
        (View::Browse, _) => (" BROWSE ", Style::default().bg(Color::Blue).fg(Color::White)),
    };

    let pairs: &[(&str, &str)] = match (app.view, app.input_mode) {
        (_, InputMode::Editing) => &[("Enter", "results"), ("Esc", "stop typing")],
        (View::Browse, _) if app.nav.screen() == Screen::Reading => &[
            ("j/k", "verse"),
            ("Space", "select"),
            ("n/p", "section"),
            ("[/]", "chapter"),
            ("m", "layout"),
            ("v", "vowels"),
            ("+/-", "size"),
            ("h", "back"),
        ],
        (View::Browse, _) => &[
            ("j/k", "nav"),
            ("Enter", "select"),
            ("h", "back"),
            ("1-5", "recent"),
            ("F1-F8", "popular"),
            ("o", "outline"),
            ("/", "search"),
        ],
        (View::Outline, _) => &[
            ("j/k", "nav"),
            ("Enter", "toggle/open"),
            ("E", "expand all"),
            ("C", "collapse"),
            ("o", "browse"),
        ],
        (View::Search, _) => &[("j/k", "nav"), ("Enter", "open"), ("i", "edit"), ("Esc", "browse")],
    };

    let mut spans = vec![
        Span::styled(mode_text, mode_style),
        Span::styled(" ", label_style),
    ];
    for (key, label) in pairs {
        spans.push(Span::styled(format!(" {} ", key), key_style));
        spans.push(Span::styled(format!(" {} ", label), label_style));
    }
    spans.push(Span::styled(" H ", key_style));
    spans.push(Span::styled(" home ", label_style));
    spans.push(Span::styled(" q ", key_style));
    spans.push(Span::styled(" quit ", label_style));

    let footer = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}

fn focused_block(title: String) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(format!(" {} ", title))
}

fn highlight_style() -> Style {
    Style::default()
        .bg(Color::Blue)
        .fg(Color::White)
        .add_modifier(Modifier::BOLD)
}

fn render_browse_screen(app: &mut App, frame: &mut Frame, area: Rect) {
    // Split into navigation (left) and details (right)
    let [nav_area, detail_area] = Layout::horizontal([
        Constraint::Length(34),
        Constraint::Min(0),
    ])
    .areas(area);

    render_navigation(app, frame, nav_area);
    render_details(app, frame, detail_area);
}

fn render_navigation(app: &mut App, frame: &mut Frame, area: Rect) {
    let (title, items): (String, Vec<ListItem>) = match app.nav.screen() {
        Screen::ChapterSelect => {
            let book = app.nav.selected_book().unwrap_or_default().to_string();
            let items = app
                .nav
                .chapters()
                .iter()
                .map(|c| ListItem::new(format!(" Chapter {} ", c)))
                .collect();
            (book, items)
        }
        _ => {
            let title = match app.nav.path().last() {
                Some(node) => node.display_title(app.language).to_string(),
                None => "Library".to_string(),
            };
            let items = app
                .nav
                .current_items()
                .iter()
                .map(|node| {
                    let marker = if node.is_leaf() { " " } else { "›" };
                    ListItem::new(format!(" {} {} ", marker, node.display_title(app.language)))
                })
                .collect();
            (title, items)
        }
    };

    if items.is_empty() {
        let message = if app.library_loading {
            "Loading the library..."
        } else if app.nav.is_loading_chapters() {
            "Loading chapters..."
        } else if app.nav.library().is_empty() {
            "Library unavailable, press r to retry"
        } else {
            "Nothing here"
        };
        let placeholder = Paragraph::new(message)
            .style(Style::default().fg(Color::DarkGray))
            .block(focused_block(title));
        frame.render_widget(placeholder, area);
        return;
    }

    let list = List::new(items)
        .block(focused_block(title))
        .highlight_style(highlight_style())
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut app.list_state);
}

fn render_details(app: &App, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Details ");

    let mut lines: Vec<Line> = Vec::new();

    if let Some(node) = app.highlighted_item() {
        lines.push(Line::from(Span::styled(
            node.display_title(app.language).to_string(),
            Style::default().fg(Color::Yellow).bold(),
        )));
        if let Some(description) = node.description(app.language) {
            lines.push(Line::default());
            lines.push(Line::from(description.to_string()));
        }
        if !node.is_leaf() {
            lines.push(Line::from(Span::styled(
                format!("{} entries", node.children().len()),
                Style::default().fg(Color::DarkGray),
            )));
        }
        lines.push(Line::default());
    }

    lines.push(Line::from(Span::styled(
        "Recently viewed",
        Style::default().fg(Color::Cyan).bold(),
    )));
    for (i, reference) in app.nav.recently_viewed().iter().enumerate() {
        lines.push(Line::from(vec![
            Span::styled(format!(" {} ", i + 1), Style::default().fg(Color::Yellow)),
            Span::raw(reference.clone()),
        ]));
    }

    lines.push(Line::default());
    lines.push(Line::from(Span::styled(
        "Popular texts",
        Style::default().fg(Color::Cyan).bold(),
    )));
    for (i, (title, _)) in POPULAR_TEXTS.iter().enumerate() {
        lines.push(Line::from(vec![
            Span::styled(format!(" F{} ", i + 1), Style::default().fg(Color::Yellow)),
            Span::raw(*title),
        ]));
    }

    let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

fn verse_lines(app: &App, rows: &[VerseRow], cursor_line: &mut Option<usize>) -> Vec<Line<'static>> {
    let selected = app.reader.selected_verse();
    let mut lines = Vec::new();

    for row in rows {
        let is_cursor = row.index == app.verse_cursor;
        let is_selected = selected == Some(row.index);
        if is_cursor {
            *cursor_line = Some(lines.len());
        }

        let number_style = if is_cursor {
            Style::default().fg(Color::Black).bg(Color::Yellow).bold()
        } else if is_selected {
            Style::default().fg(Color::Black).bg(Color::Cyan).bold()
        } else {
            Style::default().fg(Color::Yellow).bold()
        };
        let text_style = if is_selected {
            Style::default().bg(Color::DarkGray)
        } else {
            Style::default()
        };

        let number = Span::styled(format!("{:>3} ", row.index + 1), number_style);
        match (&row.source, &row.translation) {
            (Some(source), Some(translation)) => {
                lines.push(Line::from(vec![
                    number,
                    Span::styled(source.clone(), text_style.add_modifier(Modifier::BOLD)),
                ]));
                lines.push(Line::from(vec![
                    Span::raw("    "),
                    Span::styled(translation.clone(), text_style),
                ]));
            }
            (Some(source), None) => {
                lines.push(Line::from(vec![
                    number,
                    Span::styled(source.clone(), text_style.add_modifier(Modifier::BOLD)),
                ]));
            }
            (None, Some(translation)) => {
                lines.push(Line::from(vec![number, Span::styled(translation.clone(), text_style)]));
            }
            (None, None) => lines.push(Line::from(number)),
        }
        lines.push(Line::default());
    }

    lines
}

/// Keep the cursor line inside the visible window
fn follow_cursor(scroll: u16, cursor_line: Option<usize>, height: u16) -> u16 {
    let Some(line) = cursor_line else {
        return scroll;
    };
    let line = line as u16;
    if line < scroll {
        line
    } else if height > 2 && line >= scroll + height - 2 {
        line + 3 - height
    } else {
        scroll
    }
}

fn render_reading(app: &mut App, frame: &mut Frame, area: Rect) {
    let settings = app.reader.settings;
    let reference = match (app.language, app.reader.payload()) {
        (Language::He, Some(payload)) => payload.he_ref.clone().unwrap_or_else(|| payload.reference.clone()),
        (_, Some(payload)) => payload.reference.clone(),
        (_, None) => app.reader.requested().unwrap_or_default().to_string(),
    };
    let vowels = if settings.show_vowels { "vowels" } else { "no vowels" };
    let title = format!(
        "{} · {} · {}/{}pt · {}",
        reference,
        settings.layout.label(),
        settings.font_size,
        settings.source_font_size(),
        vowels
    );
    let block = focused_block(title);
    let inner = block.inner(area);

    let Some(rendered) = app.reader.rendered() else {
        let message = match app.reader.error() {
            Some(error) => error.to_string(),
            None => "Loading...".to_string(),
        };
        let placeholder = Paragraph::new(message)
            .style(Style::default().fg(Color::DarkGray))
            .block(block)
            .wrap(Wrap { trim: true });
        frame.render_widget(placeholder, area);
        return;
    };

    match rendered {
        RenderedText::Rows(rows) => {
            let mut cursor_line = None;
            let lines = verse_lines(app, &rows, &mut cursor_line);
            app.content_scroll = follow_cursor(app.content_scroll, cursor_line, inner.height);
            let paragraph = Paragraph::new(lines)
                .block(block)
                .wrap(Wrap { trim: true })
                .scroll((app.content_scroll, 0));
            frame.render_widget(paragraph, area);
        }
        RenderedText::Columns { source, translation } => {
            frame.render_widget(block, area);
            let [left, right] = Layout::horizontal([
                Constraint::Percentage(50),
                Constraint::Percentage(50),
            ])
            .areas(inner);

            let mut cursor_line = None;
            let source_lines = verse_lines(app, &source, &mut cursor_line);
            app.content_scroll = follow_cursor(app.content_scroll, cursor_line, inner.height);
            let mut translation_cursor = None;
            let translation_lines = verse_lines(app, &translation, &mut translation_cursor);
            app.translation_scroll = follow_cursor(app.translation_scroll, translation_cursor, inner.height);

            let source_column = Paragraph::new(source_lines)
                .alignment(Alignment::Right)
                .block(Block::default().borders(Borders::RIGHT).border_style(Style::default().fg(Color::DarkGray)))
                .wrap(Wrap { trim: true })
                .scroll((app.content_scroll, 0));
            let translation_column = Paragraph::new(translation_lines)
                .wrap(Wrap { trim: true })
                .scroll((app.translation_scroll, 0));
            frame.render_widget(source_column, left);
            frame.render_widget(translation_column, right);
        }
    }
}

fn centered(area: Rect, width_percent: u16, height: u16) -> Rect {
    let [_, row, _] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(height),
        Constraint::Min(0),
    ])
    .areas(area);
    let [_, cell, _] = Layout::horizontal([
        Constraint::Percentage((100 - width_percent) / 2),
        Constraint::Percentage(width_percent),
        Constraint::Percentage((100 - width_percent) / 2),
    ])
    .areas(row);
    cell
}

fn render_popup(frame: &mut Frame, area: Rect, translation: &str) {
    let popup_area = centered(area, 60, 8);
    frame.render_widget(Clear, popup_area);

    let text = if translation.is_empty() { "(no translation)" } else { translation };
    let popup = Paragraph::new(text.to_string())
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Yellow))
                .title(" Translation "),
        )
        .wrap(Wrap { trim: true });
    frame.render_widget(popup, popup_area);
}

fn render_outline(app: &mut App, frame: &mut Frame, area: Rect) {
    let rows = tree::outline(&app.tree, &app.expansion, DEFAULT_MAX_DEPTH);

    let items: Vec<ListItem> = rows
        .iter()
        .map(|row| {
            let marker = if row.node.is_leaf {
                "  "
            } else if app.expansion.is_expanded(&row.key) {
                "▾ "
            } else {
                "▸ "
            };
            let style = if row.node.is_leaf {
                Style::default()
            } else {
                Style::default().fg(Color::Cyan)
            };
            ListItem::new(Line::from(vec![
                Span::raw("  ".repeat(row.depth)),
                Span::styled(marker, style),
                Span::styled(row.node.display_title(app.language).to_string(), style),
            ]))
        })
        .collect();

    let title = format!("Library outline ({} works)", tree::leaf_count(&app.tree));
    let list = List::new(items)
        .block(focused_block(title))
        .highlight_style(highlight_style())
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut app.outline_state);
}

fn render_search_screen(app: &mut App, frame: &mut Frame, area: Rect) {
    let [input_area, results_area] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Min(0),
    ])
    .areas(area);

    let input_style = if app.input_mode == InputMode::Editing {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let input = Paragraph::new(app.search_input.as_str()).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(input_style)
            .title(" Search "),
    );
    frame.render_widget(input, input_area);
    if app.input_mode == InputMode::Editing {
        frame.set_cursor_position((
            input_area.x + 1 + app.search_input.chars().count() as u16,
            input_area.y + 1,
        ));
    }

    let title = match (app.search.is_pending(), app.search.results()) {
        (true, _) => "Searching...".to_string(),
        (false, Some(results)) => format!("{} results", results.total),
        (false, None) => "Results".to_string(),
    };
    let block = focused_block(title);

    if let Some(error) = app.search.error() {
        let message = Paragraph::new(error.to_string())
            .style(Style::default().fg(Color::Red))
            .block(block)
            .wrap(Wrap { trim: true });
        frame.render_widget(message, results_area);
        return;
    }

    let items: Vec<ListItem> = app
        .search
        .results()
        .map(|results| {
            results
                .hits
                .iter()
                .map(|hit| {
                    let reference = match (app.language, &hit.he_ref) {
                        (Language::He, Some(he_ref)) => he_ref.clone(),
                        _ => hit.reference.clone(),
                    };
                    let mut lines = vec![Line::from(Span::styled(
                        reference,
                        Style::default().fg(Color::Yellow).bold(),
                    ))];
                    if let Some(snippet) = &hit.snippet {
                        let plain = snippet.replace("<b>", "").replace("</b>", "");
                        lines.push(Line::from(Span::styled(
                            format!("  {}", plain),
                            Style::default().fg(Color::Gray),
                        )));
                    }
                    ListItem::new(lines)
                })
                .collect()
        })
        .unwrap_or_default();

    let list = List::new(items)
        .block(block)
        .highlight_style(highlight_style())
        .highlight_symbol("> ");
    frame.render_stateful_widget(list, results_area, &mut app.search_state);
}
