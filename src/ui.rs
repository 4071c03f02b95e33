use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};

use crate::app::{App, AppMode};
use crate::diff::{DiffKind, DiffViewer};
use crate::format::truncate;
use crate::logs::{LogStyle, LogViewer, highlight_line, split_timestamp};
use crate::modal::{ConfirmModal, InputModal, Modal, Picker, Toast, ToastTone, help_lines};
use crate::model::StatusTone;
use crate::panel::{DetailView, PanelState};
use crate::search::SearchState;
use crate::yaml::{YamlToken, YamlViewer, tokenize_line};

const BG: Color = Color::Rgb(9, 15, 25);
const PANEL: Color = Color::Rgb(16, 27, 44);
const ACCENT: Color = Color::Rgb(52, 211, 153);
const MUTED: Color = Color::Rgb(140, 156, 178);
const WARN: Color = Color::Rgb(251, 191, 36);
const ERROR: Color = Color::Rgb(248, 113, 113);
const PL_A: Color = Color::Rgb(17, 94, 89);
const PL_B: Color = Color::Rgb(30, 64, 175);
const PL_C: Color = Color::Rgb(55, 48, 163);
const SELECTED: Color = Color::Rgb(24, 36, 58);
const YAML_KEY: Color = Color::Rgb(103, 232, 249);

pub fn render(frame: &mut Frame, app: &mut App) {
    let size = frame.area();
    app.resize(size.width, size.height);
    let app = &*app;

    let root = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(size);

    render_header(frame, root[0], app);
    render_body(frame, root[1], app);
    render_footer(frame, root[2], app);

    if let Some(modal) = app.modal() {
        render_modal(frame, modal, app);
    }
    if let Some(toast) = app.toast() {
        render_toast(frame, size, toast);
    }
}

fn render_header(frame: &mut Frame, area: Rect, app: &App) {
    let left_line = build_header_line(app);
    let right_line = Line::from(vec![
        Span::styled("?", Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)),
        Span::styled(" help ", Style::default().fg(MUTED)),
    ]);
    let right_width = spans_width(&right_line.spans) as u16;
    if area.width < 42 || right_width >= area.width {
        frame.render_widget(
            Paragraph::new(left_line).style(Style::default().bg(BG).fg(Color::White)),
            area,
        );
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(1), Constraint::Length(right_width)])
        .split(area);
    frame.render_widget(
        Paragraph::new(left_line).style(Style::default().bg(BG).fg(Color::White)),
        chunks[0],
    );
    frame.render_widget(
        Paragraph::new(right_line).style(Style::default().bg(BG)),
        chunks[1],
    );
}

fn build_header_line(app: &App) -> Line<'static> {
    let mut spans = Vec::new();
    push_powerline_segment(&mut spans, " kubedash ", Color::White, PL_A, PL_B);
    push_powerline_segment(
        &mut spans,
        format!(" ctx {} ", truncate(app.context(), 32)),
        Color::White,
        PL_B,
        PANEL,
    );
    push_powerline_segment(
        &mut spans,
        format!(" ns {} ", truncate(&app.namespace_label(), 24)),
        ACCENT,
        PANEL,
        BG,
    );

    let forwards = app.port_forwards();
    if !forwards.is_empty() {
        let labels = forwards
            .iter()
            .map(|session| format!("{} {}:{}", session.pod, session.local, session.remote))
            .collect::<Vec<_>>()
            .join(", ");
        spans.push(Span::styled(
            format!(" ⇄ {} ", truncate(&labels, 48)),
            Style::default().fg(WARN),
        ));
    }
    Line::from(spans)
}

fn render_body(frame: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(app.left_column_percent()),
            Constraint::Min(10),
        ])
        .split(area);

    render_panel_column(frame, chunks[0], app);
    render_detail(frame, chunks[1], app);
}

fn render_panel_column(frame: &mut Frame, area: Rect, app: &App) {
    let constraints = app
        .panels()
        .iter()
        .map(|panel| {
            if panel.focused() {
                Constraint::Min(3)
            } else {
                Constraint::Length(1)
            }
        })
        .collect::<Vec<_>>();
    let areas = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    for (index, panel) in app.panels().iter().enumerate() {
        if panel.focused() {
            render_focused_panel(frame, areas[index], app, panel, index);
        } else {
            render_panel_summary(frame, areas[index], panel, index);
        }
    }
}

fn digit_label(index: usize) -> String {
    if index < 9 {
        (index + 1).to_string()
    } else {
        " ".to_string()
    }
}

fn render_panel_summary(frame: &mut Frame, area: Rect, panel: &PanelState, index: usize) {
    let mut spans = vec![
        Span::styled(
            format!(" {} ", digit_label(index)),
            Style::default().fg(ACCENT),
        ),
        Span::styled(panel.kind().title(), Style::default().fg(Color::White)),
    ];
    if panel.loaded() {
        spans.push(Span::styled(
            format!(" {}", panel.rows().len()),
            Style::default().fg(MUTED),
        ));
    }
    if panel.loading() {
        spans.push(Span::styled(" …", Style::default().fg(MUTED)));
    }
    if panel.last_error().is_some() {
        spans.push(Span::styled(" !", Style::default().fg(ERROR)));
    }
    frame.render_widget(
        Paragraph::new(Line::from(spans)).style(Style::default().bg(BG)),
        area,
    );
}

fn panel_title(panel: &PanelState, index: usize) -> String {
    let mut title = format!(
        " {} {} ({}/{})",
        digit_label(index),
        panel.kind().title(),
        panel.filtered_len(),
        panel.rows().len()
    );
    if !panel.filter().is_empty() {
        title.push_str(&format!(" /{}", panel.filter()));
    }
    if panel.loading() {
        title.push_str(" …");
    }
    title.push(' ');
    title
}

fn render_focused_panel(
    frame: &mut Frame,
    area: Rect,
    app: &App,
    panel: &PanelState,
    index: usize,
) {
    let block = Block::default()
        .title(panel_title(panel, index))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(ACCENT))
        .style(Style::default().bg(PANEL));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let view = panel.view_rows(app.metrics());
    let list_area = match &view.header {
        Some(header) if inner.height > 1 => {
            let parts = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Length(1), Constraint::Min(0)])
                .split(inner);
            frame.render_widget(
                Paragraph::new(header.clone()).style(
                    Style::default()
                        .fg(ACCENT)
                        .add_modifier(Modifier::BOLD),
                ),
                parts[0],
            );
            parts[1]
        }
        _ => inner,
    };

    if view.rows.is_empty() {
        let message = if panel.loading() && !panel.loaded() {
            "Loading…".to_string()
        } else if !panel.filter().is_empty() {
            format!("No matches for /{}", panel.filter())
        } else {
            format!("No {}", panel.kind().title().to_lowercase())
        };
        frame.render_widget(
            Paragraph::new(message).style(Style::default().fg(MUTED)),
            list_area,
        );
        return;
    }

    let selected = view.rows.iter().position(|row| row.selected);
    let items = view
        .rows
        .into_iter()
        .map(|row| {
            let mut spans = vec![
                Span::styled(row.lead, Style::default().fg(Color::White)),
                Span::styled(row.status, Style::default().fg(tone_color(row.tone))),
            ];
            if !row.trail.is_empty() {
                spans.push(Span::styled(row.trail, Style::default().fg(MUTED)));
            }
            ListItem::new(Line::from(spans))
        })
        .collect::<Vec<_>>();

    let list = List::new(items).highlight_style(
        Style::default()
            .bg(SELECTED)
            .add_modifier(Modifier::BOLD),
    );
    let mut state = ListState::default();
    state.select(selected);
    frame.render_stateful_widget(list, list_area, &mut state);
}

fn tone_color(tone: StatusTone) -> Color {
    match tone {
        StatusTone::Good => ACCENT,
        StatusTone::Warn => WARN,
        StatusTone::Bad => ERROR,
        StatusTone::Neutral => MUTED,
    }
}

fn render_detail(frame: &mut Frame, area: Rect, app: &App) {
    let Some(panel) = app.focused_panel() else {
        return;
    };
    let detail = panel.detail_view(app.metrics());
    let title = detail
        .as_ref()
        .map(|detail| format!(" {} ", detail.title))
        .unwrap_or_else(|| format!(" {} ", panel.kind().title()));
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(MUTED))
        .style(Style::default().bg(PANEL));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let parts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(inner);

    let mut lines = Vec::new();
    if let Some(error) = panel.last_error() {
        lines.push(Line::from(Span::styled(
            format!("Error: {error}"),
            Style::default().fg(ERROR),
        )));
        lines.push(Line::from(""));
    }
    if let Some(refreshed) = panel.last_refreshed() {
        lines.push(Line::from(Span::styled(
            format!("refreshed {}", refreshed.format("%H:%M:%S")),
            Style::default().fg(MUTED),
        )));
    }

    match &detail {
        Some(detail) => lines.extend(detail_lines(detail)),
        None if panel.loading() => lines.push(Line::from(Span::styled(
            "Loading…",
            Style::default().fg(MUTED),
        ))),
        None => lines.push(Line::from(Span::styled(
            "Nothing selected",
            Style::default().fg(MUTED),
        ))),
    }

    frame.render_widget(
        Paragraph::new(Text::from(lines))
            .style(Style::default().fg(Color::White))
            .wrap(Wrap { trim: false }),
        parts[0],
    );

    if let Some(detail) = &detail {
        frame.render_widget(Paragraph::new(hint_line(&detail.hints)), parts[1]);
    }
}

fn detail_lines(detail: &DetailView) -> Vec<Line<'static>> {
    let label_width = detail
        .fields
        .iter()
        .map(|(label, _)| label.chars().count())
        .max()
        .unwrap_or(0)
        + 2;

    let mut lines = detail
        .fields
        .iter()
        .map(|(label, value)| {
            Line::from(vec![
                Span::styled(
                    format!("{:<label_width$}", format!("{label}:")),
                    Style::default().fg(YAML_KEY),
                ),
                Span::raw(value.clone()),
            ])
        })
        .collect::<Vec<_>>();

    if !detail.containers.is_empty() {
        lines.push(Line::from(""));
        lines.push(section_line("Containers"));
        lines.push(Line::from(Span::styled(
            format!("{:<24}{:<7}{:<20}{}", "NAME", "READY", "STATUS", "RESTARTS"),
            Style::default().fg(MUTED),
        )));
        for container in &detail.containers {
            let ready = if container.ready { "yes" } else { "no" };
            let tone = if container.ready {
                StatusTone::Good
            } else {
                StatusTone::of(&container.status)
            };
            lines.push(Line::from(vec![
                Span::raw(format!("{:<24}", truncate(&container.name, 23))),
                Span::raw(format!("{ready:<7}")),
                Span::styled(
                    format!("{:<20}", truncate(&container.status, 19)),
                    Style::default().fg(tone_color(tone)),
                ),
                Span::raw(container.restarts.to_string()),
            ]));
        }
    }

    if !detail.images.is_empty() {
        lines.push(Line::from(""));
        lines.push(section_line("Images"));
        for image in &detail.images {
            lines.push(Line::from(format!("  • {image}")));
        }
    }
    lines
}

fn section_line(title: &str) -> Line<'static> {
    Line::from(Span::styled(
        title.to_string(),
        Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
    ))
}

fn hint_line(hints: &[(&'static str, &'static str)]) -> Line<'static> {
    let mut spans = Vec::new();
    for (key, label) in hints {
        spans.push(Span::styled(
            key.to_string(),
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        ));
        spans.push(Span::styled(format!(" {label}  "), Style::default().fg(MUTED)));
    }
    Line::from(spans)
}

fn render_footer(frame: &mut Frame, area: Rect, app: &App) {
    let mut spans = Vec::new();
    let status = app.status();

    if let Some(query) = app.panel_search() {
        push_powerline_segment(&mut spans, " / ", Color::Black, WARN, PANEL);
        spans.push(Span::styled(
            format!(" {query}▏"),
            Style::default().fg(Color::White).bg(PANEL),
        ));
        frame.render_widget(
            Paragraph::new(Line::from(spans)).style(Style::default().bg(PANEL)),
            area,
        );
        return;
    }

    let status_bg = if status.error { BG } else { PL_B };
    push_powerline_segment(
        &mut spans,
        format!(" {} ", mode_label(app.mode())),
        Color::White,
        PL_A,
        status_bg,
    );
    let width_hint = area.width.saturating_sub(16).max(24) as usize;
    if status.error {
        spans.push(Span::styled(
            format!(" Error: {} ", truncate(&status.text, width_hint)),
            Style::default()
                .fg(ERROR)
                .bg(BG)
                .add_modifier(Modifier::BOLD),
        ));
    } else {
        push_powerline_segment(
            &mut spans,
            format!(" {} ", truncate(&status.text, width_hint)),
            Color::White,
            status_bg,
            BG,
        );
    }
    frame.render_widget(
        Paragraph::new(Line::from(spans)).style(Style::default().bg(BG)),
        area,
    );
}

fn mode_label(mode: AppMode) -> &'static str {
    match mode {
        AppMode::Normal => "NRM",
        AppMode::SearchInput => "SEARCH",
        AppMode::ConfirmModal => "CONFIRM",
        AppMode::InputModal => "INPUT",
        AppMode::YamlView => "YAML",
        AppMode::DiffView => "DIFF",
        AppMode::LogView => "LOGS",
        AppMode::HelpView => "HELP",
        AppMode::ContextPicker => "CTX",
        AppMode::NamespacePicker => "NS",
    }
}

fn render_modal(frame: &mut Frame, modal: &Modal, app: &App) {
    let screen = frame.area();
    match modal {
        Modal::Confirm(confirm) => render_confirm(frame, screen, confirm),
        Modal::Input(input) => render_input(frame, screen, input),
        Modal::Yaml(viewer) => render_yaml(frame, screen, viewer),
        Modal::Diff(viewer) => render_diff(frame, screen, viewer),
        Modal::Log(viewer) => render_logs(frame, screen, viewer),
        Modal::Help => render_help_modal(frame, screen, app),
        Modal::ContextPicker(picker) | Modal::NamespacePicker(picker) => {
            render_picker(frame, screen, picker)
        }
    }
}

fn modal_block(title: impl Into<String>, border: Color) -> Block<'static> {
    Block::default()
        .title(title.into())
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
        .style(Style::default().bg(PANEL))
}

fn render_confirm(frame: &mut Frame, screen: Rect, confirm: &ConfirmModal) {
    let width = (confirm.prompt().chars().count() as u16 + 6).clamp(30, screen.width);
    let area = fixed_rect(width, 6, screen);
    frame.render_widget(Clear, area);

    let button = |label: &'static str, selected: bool| {
        let style = if selected {
            Style::default()
                .fg(Color::Black)
                .bg(ACCENT)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(MUTED)
        };
        Span::styled(label, style)
    };
    let lines = vec![
        Line::from(confirm.prompt().to_string()),
        Line::from(""),
        Line::from(vec![
            button("[ No ]", !confirm.yes_selected()),
            Span::raw("  "),
            button("[ Yes ]", confirm.yes_selected()),
        ]),
    ];
    frame.render_widget(
        Paragraph::new(lines)
            .block(modal_block(" Confirm ", WARN))
            .style(Style::default().fg(Color::White)),
        area,
    );
}

fn render_input(frame: &mut Frame, screen: Rect, input: &InputModal) {
    let area = fixed_rect(56.min(screen.width), 7, screen);
    frame.render_widget(Clear, area);

    let chars = input.value().chars().collect::<Vec<_>>();
    let cursor = input.cursor().min(chars.len());
    let before = chars[..cursor].iter().collect::<String>();
    let at = chars.get(cursor).map_or(" ".to_string(), char::to_string);
    let after = chars.get(cursor + 1..).map_or(String::new(), |rest| rest.iter().collect());

    let mut lines = vec![
        Line::from(vec![
            Span::styled("> ", Style::default().fg(ACCENT)),
            Span::raw(before),
            Span::styled(at, Style::default().add_modifier(Modifier::REVERSED)),
            Span::raw(after),
        ]),
        Line::from(""),
    ];
    match input.error() {
        Some(error) => lines.push(Line::from(Span::styled(
            error.to_string(),
            Style::default().fg(ERROR),
        ))),
        None => lines.push(Line::from(Span::styled(
            "enter submit  esc cancel",
            Style::default().fg(MUTED),
        ))),
    }
    frame.render_widget(
        Paragraph::new(lines)
            .block(modal_block(format!(" {} ", input.title()), ACCENT))
            .style(Style::default().fg(Color::White)),
        area,
    );
}

fn viewer_area(frame: &mut Frame, screen: Rect) -> Rect {
    let area = centered_rect(90, 85, screen);
    frame.render_widget(Clear, area);
    area
}

fn split_status_row(inner: Rect) -> (Rect, Rect) {
    let parts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(inner);
    (parts[0], parts[1])
}

fn render_yaml(frame: &mut Frame, screen: Rect, viewer: &YamlViewer) {
    let area = viewer_area(frame, screen);
    let title = format!(
        " {}  [{}/{}] ",
        viewer.title(),
        (viewer.offset() + 1).min(viewer.lines().len()),
        viewer.lines().len()
    );
    let block = modal_block(title, ACCENT);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let lines = viewer
        .visible_lines(inner.width as usize)
        .into_iter()
        .map(|line| {
            if viewer.highlight() {
                highlight_yaml_line(&line)
            } else {
                Line::from(line)
            }
        })
        .collect::<Vec<_>>();
    frame.render_widget(
        Paragraph::new(Text::from(lines)).style(Style::default().fg(Color::White)),
        inner,
    );
}

fn highlight_yaml_line(line: &str) -> Line<'static> {
    let spans = tokenize_line(line)
        .into_iter()
        .map(|(token, text)| Span::styled(text.to_string(), yaml_token_style(token)))
        .collect::<Vec<_>>();
    Line::from(spans)
}

fn yaml_token_style(token: YamlToken) -> Style {
    let color = match token {
        YamlToken::Indent | YamlToken::Text => Color::White,
        YamlToken::Comment | YamlToken::Colon | YamlToken::Flow => MUTED,
        YamlToken::ListMarker => ACCENT,
        YamlToken::Key => YAML_KEY,
        YamlToken::Quoted => Color::Rgb(125, 211, 252),
        YamlToken::Literal => WARN,
        YamlToken::Number => Color::Rgb(251, 146, 60),
        YamlToken::Value => Color::Rgb(147, 197, 253),
    };
    Style::default().fg(color)
}

fn render_diff(frame: &mut Frame, screen: Rect, viewer: &DiffViewer) {
    let area = viewer_area(frame, screen);
    let (added, removed) = viewer.summary();
    let block = modal_block(format!(" {}  +{added} -{removed} ", viewer.title()), ACCENT);
    let inner = block.inner(area);
    frame.render_widget(block, area);
    let (body, status) = split_status_row(inner);

    let width = body.width as usize;
    let lines = viewer
        .lines()
        .iter()
        .enumerate()
        .skip(viewer.offset())
        .take(body.height as usize)
        .map(|(index, line)| {
            let color = match line.kind {
                DiffKind::Added => ACCENT,
                DiffKind::Removed => ERROR,
                DiffKind::Header => MUTED,
                DiffKind::Context => Color::White,
            };
            let text = truncate(
                &format!("{}{}", line.kind.prefix(), line.text),
                width.saturating_sub(2),
            );
            search_line(viewer.search(), index, text, Style::default().fg(color))
        })
        .collect::<Vec<_>>();
    frame.render_widget(Paragraph::new(Text::from(lines)), body);
    frame.render_widget(
        Paragraph::new(search_status(viewer.search(), "/ search  n N next/prev  esc close")),
        status,
    );
}

fn search_line(search: &SearchState, index: usize, text: String, style: Style) -> Line<'static> {
    if search.is_current(index) {
        Line::from(vec![
            Span::styled("► ", Style::default().fg(WARN)),
            Span::styled(text, style.bg(PL_B).add_modifier(Modifier::BOLD)),
        ])
    } else if search.is_match(index) {
        Line::from(vec![Span::raw("  "), Span::styled(text, style.bg(PL_C))])
    } else {
        Line::from(vec![Span::raw("  "), Span::styled(text, style)])
    }
}

fn search_status(search: &SearchState, idle: &str) -> Line<'static> {
    match search.status_label() {
        Some(label) if search.typing() => Line::from(Span::styled(
            format!("{label}▏"),
            Style::default().fg(Color::White),
        )),
        Some(label) => Line::from(Span::styled(label, Style::default().fg(WARN))),
        None => Line::from(Span::styled(idle.to_string(), Style::default().fg(MUTED))),
    }
}

fn render_logs(frame: &mut Frame, screen: Rect, viewer: &LogViewer) {
    let area = viewer_area(frame, screen);
    let block = modal_block(format!(" {} ", viewer.title()), ACCENT);
    let inner = block.inner(area);
    frame.render_widget(block, area);
    let (body, status) = split_status_row(inner);

    let width = body.width as usize;
    let lines = viewer
        .lines()
        .iter()
        .enumerate()
        .skip(viewer.offset())
        .take(body.height as usize)
        .map(|(index, line)| {
            let text = truncate(line, width.saturating_sub(2));
            if viewer.search().is_match(index) {
                return search_line(viewer.search(), index, text, Style::default().fg(Color::White));
            }
            log_line(text)
        })
        .collect::<Vec<_>>();
    frame.render_widget(Paragraph::new(Text::from(lines)), body);

    let mut idle = format!("{} lines", viewer.len());
    if viewer.containers().len() > 1 {
        idle.push_str("  c container");
    }
    idle.push_str("  p previous  / search  G follow  esc close");
    frame.render_widget(Paragraph::new(search_status(viewer.search(), &idle)), status);
}

fn log_line(text: String) -> Line<'static> {
    let gutter = Span::raw("  ");
    match highlight_line(&text) {
        LogStyle::Error => Line::from(vec![gutter, Span::styled(text, Style::default().fg(ERROR))]),
        LogStyle::Warn => Line::from(vec![gutter, Span::styled(text, Style::default().fg(WARN))]),
        LogStyle::Timestamp => {
            let (stamp, rest) = split_timestamp(&text);
            Line::from(vec![
                gutter,
                Span::styled(stamp.to_string(), Style::default().fg(MUTED)),
                Span::styled(rest.to_string(), Style::default().fg(Color::White)),
            ])
        }
        LogStyle::Plain => Line::from(vec![gutter, Span::styled(text, Style::default().fg(Color::White))]),
    }
}

fn render_help_modal(frame: &mut Frame, screen: Rect, app: &App) {
    let area = centered_rect(70, 80, screen);
    frame.render_widget(Clear, area);

    let mut lines = vec![
        Line::from(format!(
            "kubedash help  context:{}  namespace:{}",
            app.context(),
            app.namespace_label()
        )),
        Line::from(""),
    ];
    if let Some(error) = app.last_error() {
        lines.push(Line::from(Span::styled(
            format!("last error: {error}"),
            Style::default().fg(ERROR),
        )));
        lines.push(Line::from(""));
    }
    for (keys, description) in help_lines() {
        lines.push(Line::from(vec![
            Span::styled(
                format!("{keys:<20}"),
                Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
            ),
            Span::raw(description),
        ]));
    }

    let modal = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(modal_block(" Help ", ACCENT))
        .style(Style::default().fg(Color::White));
    frame.render_widget(modal, area);
}

fn render_picker(frame: &mut Frame, screen: Rect, picker: &Picker) {
    let area = centered_rect(50, 60, screen);
    frame.render_widget(Clear, area);
    let block = modal_block(format!(" {} ", picker.title()), ACCENT);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let parts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(0)])
        .split(inner);
    frame.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled("> ", Style::default().fg(ACCENT)),
            Span::styled(format!("{}▏", picker.filter()), Style::default().fg(Color::White)),
        ])),
        parts[0],
    );

    let items = picker
        .filtered()
        .into_iter()
        .map(|item| {
            let marker = if picker.current() == Some(item) { "• " } else { "  " };
            ListItem::new(Line::from(vec![
                Span::styled(marker, Style::default().fg(ACCENT)),
                Span::styled(item.to_string(), Style::default().fg(Color::White)),
            ]))
        })
        .collect::<Vec<_>>();
    if items.is_empty() {
        frame.render_widget(
            Paragraph::new("No matches").style(Style::default().fg(MUTED)),
            parts[1],
        );
        return;
    }
    let list = List::new(items).highlight_style(
        Style::default()
            .bg(SELECTED)
            .add_modifier(Modifier::BOLD),
    );
    let mut state = ListState::default();
    state.select(Some(picker.selected()));
    frame.render_stateful_widget(list, parts[1], &mut state);
}

fn render_toast(frame: &mut Frame, screen: Rect, toast: &Toast) {
    let width = (toast.message.chars().count() as u16 + 4)
        .min(60)
        .min(screen.width);
    if width < 6 || screen.height < 5 {
        return;
    }
    let area = Rect {
        x: screen.x + screen.width - width,
        y: screen.y + 1,
        width,
        height: 3,
    };
    let color = match toast.tone {
        ToastTone::Info => ACCENT,
        ToastTone::Error => ERROR,
    };
    frame.render_widget(Clear, area);
    frame.render_widget(
        Paragraph::new(truncate(&toast.message, width.saturating_sub(4) as usize))
            .block(modal_block("", color))
            .style(Style::default().fg(color)),
        area,
    );
}

fn push_powerline_segment(
    spans: &mut Vec<Span<'static>>,
    content: impl Into<String>,
    fg: Color,
    bg: Color,
    next_bg: Color,
) {
    spans.push(Span::styled(
        content.into(),
        Style::default().fg(fg).bg(bg).add_modifier(Modifier::BOLD),
    ));
    spans.push(Span::styled("", Style::default().fg(bg).bg(next_bg)));
}

fn spans_width(spans: &[Span<'_>]) -> usize {
    spans.iter().map(|span| span.content.chars().count()).sum()
}

fn fixed_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
