use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph, Row, Table, Wrap},
    Frame,
};
use taskchain_core::{TaskStatus, ToastKind};
use unicode_width::UnicodeWidthStr;

use crate::tui::app::{App, EditStep, FormField, InputMode, TextInput};

const APP_TITLE: &str = "Blockchain Task Manager";

pub fn draw(f: &mut Frame, app: &mut App) {
    if app.is_connected() {
        draw_main(f, app);
    } else {
        draw_connect(f, app);
    }
    draw_toasts(f, app);
}

fn draw_connect(f: &mut Frame, app: &App) {
    let area = centered_rect(60, 11, f.area());

    let action = if app.is_connecting() {
        Span::styled("Connecting...", Style::default().fg(Color::DarkGray))
    } else {
        Span::styled(
            "[c] Connect Wallet",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )
    };

    let text = vec![
        Line::from(""),
        Line::from(Span::styled(
            format!("Welcome to {}", APP_TITLE),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from("Connect your wallet to start managing your tasks on the blockchain."),
        Line::from(""),
        Line::from(action),
        Line::from(""),
        Line::from(Span::styled(
            format!("network: {}  |  q: Quit", app.network),
            Style::default().fg(Color::DarkGray),
        )),
    ];

    let card = Paragraph::new(text)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).border_type(BorderType::Rounded));
    f.render_widget(card, area);
}

fn draw_main(f: &mut Frame, app: &mut App) {
    let form_height = match app.input_mode {
        InputMode::Adding(_) => 4,
        _ => 0,
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),           // Header
            Constraint::Length(form_height), // Task form
            Constraint::Min(1),              // Task list
            Constraint::Length(1),           // Footer/Help
        ])
        .split(f.area());

    let account = app
        .snapshot
        .account
        .as_ref()
        .map(|a| a.short())
        .unwrap_or_default();
    let header = Paragraph::new(Line::from(vec![
        Span::styled(APP_TITLE, Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        Span::raw("   "),
        Span::styled(format!("Connected: {}", account), Style::default().fg(Color::DarkGray)),
    ]))
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::ALL).border_type(BorderType::Rounded));
    f.render_widget(header, chunks[0]);

    if let InputMode::Adding(field) = app.input_mode {
        draw_form(f, app, field, chunks[1]);
    }

    draw_task_list(f, app, chunks[2]);

    let help = match app.input_mode {
        InputMode::Normal => match app.selected_task() {
            Some(task) if task.status == TaskStatus::Completed => {
                "j/k: Navigate | a: Add | d: Delete | s: Switch account | x: Disconnect | q: Quit"
            }
            _ => concat!(
                "j/k: Navigate | a: Add | space: Complete | e: Edit | d: Delete | ",
                "s: Switch account | x: Disconnect | q: Quit"
            ),
        },
        InputMode::Adding(_) => "Tab: Next field | Enter: Add Task | Esc: Cancel",
        InputMode::Editing { .. } => "Enter: Next | Esc: Cancel",
    };
    let footer = Paragraph::new(help)
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center);
    f.render_widget(footer, chunks[3]);

    if let InputMode::Editing { step, .. } = app.input_mode {
        draw_edit_prompt(f, app, step);
    }
}

fn input_line<'a>(label: &'a str, input: &'a TextInput, focused: bool) -> Line<'a> {
    let label_style = if focused {
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Blue)
    };
    Line::from(vec![
        Span::styled(label, label_style),
        Span::raw(input.value.as_str()),
    ])
}

fn place_cursor(f: &mut Frame, area: Rect, row: u16, label: &str, input: &TextInput) {
    let before: String = input.value.chars().take(input.cursor).collect();
    let x = area.x + 1 + label.width() as u16 + before.width() as u16;
    f.set_cursor_position((x.min(area.right().saturating_sub(2)), area.y + 1 + row));
}

fn draw_form(f: &mut Frame, app: &App, field: FormField, area: Rect) {
    let lines = vec![
        input_line("Title: ", &app.title, field == FormField::Title),
        input_line("Description: ", &app.description, field == FormField::Description),
    ];
    let form = Paragraph::new(lines).block(rounded_block(" New Task "));
    f.render_widget(form, area);

    match field {
        FormField::Title => place_cursor(f, area, 0, "Title: ", &app.title),
        FormField::Description => place_cursor(f, area, 1, "Description: ", &app.description),
    }
}

fn draw_edit_prompt(f: &mut Frame, app: &App, step: EditStep) {
    let area = centered_rect(60, 3, f.area());
    let (label, input) = match step {
        EditStep::Title => ("Enter new title: ", &app.title),
        EditStep::Description => ("Enter new description: ", &app.description),
    };
    let prompt = Paragraph::new(input_line(label, input, true)).block(rounded_block(" Edit Task "));
    f.render_widget(Clear, area);
    f.render_widget(prompt, area);
    place_cursor(f, area, 0, label, input);
}

fn draw_task_list(f: &mut Frame, app: &mut App, area: Rect) {
    let block = rounded_block(" Tasks ");

    if app.tasks().is_empty() {
        let empty = Paragraph::new("No tasks found. Add a new task to get started!")
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center)
            .block(block);
        f.render_widget(empty, area);
        return;
    }

    let rows: Vec<Row> = app
        .tasks()
        .iter()
        .map(|task| {
            let (icon, style) = match task.status {
                TaskStatus::Completed => (
                    "✔",
                    Style::default()
                        .fg(Color::DarkGray)
                        .add_modifier(Modifier::CROSSED_OUT),
                ),
                TaskStatus::Pending => ("☐", Style::default()),
            };

            Row::new(vec![
                Span::raw(icon),
                Span::raw(task.id.to_string()),
                Span::styled(task.title.clone(), style.add_modifier(Modifier::BOLD)),
                Span::styled(task.description.clone(), style),
                Span::styled(task.owner.short(), Style::default().fg(Color::DarkGray)),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(3),      // Status
            Constraint::Length(5),      // Id
            Constraint::Percentage(30), // Title
            Constraint::Min(10),        // Description
            Constraint::Length(14),     // Owner
        ],
    )
    .header(
        Row::new(vec!["St", "Id", "Title", "Description", "Owner"])
            .style(Style::default().fg(Color::Yellow)),
    )
    .block(block)
    .row_highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
    .highlight_symbol(">> ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn draw_toasts(f: &mut Frame, app: &App) {
    let screen = f.area();
    let mut y = screen.y + 1;

    for toast in app.visible_toasts.iter().rev().take(4) {
        let (icon, color) = match toast.kind {
            ToastKind::Loading => ("…", Color::Yellow),
            ToastKind::Success => ("✔", Color::Green),
            ToastKind::Error => ("✖", Color::Red),
        };
        let text = format!("{} {}", icon, toast.message);
        let width = (text.width() as u16 + 4).min(screen.width.saturating_sub(2)).max(10);
        if y + 3 > screen.bottom() {
            break;
        }
        let area = Rect::new(screen.right().saturating_sub(width + 1), y, width, 3);

        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(color));
        let widget = Paragraph::new(Span::styled(text, Style::default().fg(color))).block(block);
        f.render_widget(Clear, area);
        f.render_widget(widget, area);
        y += 3;
    }
}

fn rounded_block(title: &str) -> Block<'_> {
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
}

fn centered_rect(percent_x: u16, height: u16, r: Rect) -> Rect {
    let width = r.width * percent_x / 100;
    let height = height.min(r.height);
    Rect::new(
        r.x + (r.width.saturating_sub(width)) / 2,
        r.y + (r.height.saturating_sub(height)) / 2,
        width,
        height,
    )
}
