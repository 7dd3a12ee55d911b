use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Row, Table, TableState, Wrap},
};

use super::input::InputState;
use super::progress_modal::{ProgressModal, centered_rect};
use crate::wizard::view::{
    ApiDialogView, Body, DialogView, FileDialogView, ONBOARDING_INTRO, ONBOARDING_STEPS,
    ONBOARDING_TITLE, SummaryView, WizardView,
};

pub fn render(f: &mut Frame, view: &WizardView, input: &InputState, modal: &ProgressModal) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([Constraint::Length(3), Constraint::Min(0), Constraint::Length(3)])
        .split(f.area());

    render_header(f, chunks[0], view, modal);
    render_body(f, chunks[1], view, input);
    render_footer(f, chunks[2], view);

    if let Some(dialog) = &view.dialog {
        render_dialog(f, f.area(), view, dialog);
    }
    if let Some(progress) = view.progress.filter(|p| p.open) {
        modal.render(f, f.area(), &progress);
    }
    if let Some(editor) = &input.editor {
        let area = centered_rect(60, 15, f.area());
        f.render_widget(Clear, area);
        let shown = if editor.field.is_secret() {
            "*".repeat(editor.buffer.chars().count())
        } else {
            editor.buffer.clone()
        };
        let paragraph = Paragraph::new(format!("{}█", shown))
            .block(Block::default().borders(Borders::ALL).title(editor.field.label()))
            .style(Style::default().fg(Color::Yellow));
        f.render_widget(paragraph, area);
    }
}

fn render_header(f: &mut Frame, area: Rect, view: &WizardView, modal: &ProgressModal) {
    let mut spans = vec![
        Span::styled("DHIS2 Import Wizard", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        Span::raw(format!("  user: {}", view.user)),
    ];
    if let Some(mapping) = &view.active_mapping {
        spans.push(Span::styled(format!("  mapping: {}", mapping), Style::default().fg(Color::Green)));
    }
    if view.list_loading {
        spans.push(Span::styled(format!("  {} loading mappings", modal.spinner()), Style::default().fg(Color::Gray)));
    }
    let header = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL));
    f.render_widget(header, area);
}

fn render_body(f: &mut Frame, area: Rect, view: &WizardView, input: &InputState) {
    match &view.body {
        Body::Onboarding => {
            let mut lines = vec![
                Line::from(Span::styled(ONBOARDING_TITLE, Style::default().add_modifier(Modifier::BOLD))),
                Line::from(""),
                Line::from(ONBOARDING_INTRO),
                Line::from(""),
            ];
            lines.extend(ONBOARDING_STEPS.iter().map(|step| Line::from(format!("  • {}", step))));
            if let Some(error) = &view.list_error {
                lines.push(Line::from(""));
                lines.push(Line::from(Span::styled(error.clone(), Style::default().fg(Color::Red))));
            }

            let paragraph = Paragraph::new(lines)
                .block(Block::default().borders(Borders::ALL).title("Getting started"))
                .wrap(Wrap { trim: true });
            f.render_widget(paragraph, area);
        }
        Body::Mappings(rows) => {
            let table_rows = rows.iter().map(|row| {
                let style = if row.selected {
                    Style::default().fg(Color::Green)
                } else {
                    Style::default()
                };
                Row::new(vec![
                    row.name.clone(),
                    row.description.clone(),
                    row.program.clone(),
                    row.id.clone(),
                ])
                .style(style)
            });
            let title = match &view.list_error {
                Some(error) => format!("Mappings ({})", error),
                None => "Mappings".to_string(),
            };

            let table = Table::new(
                table_rows,
                [
                    Constraint::Percentage(25),
                    Constraint::Percentage(35),
                    Constraint::Percentage(20),
                    Constraint::Percentage(20),
                ],
            )
            .header(Row::new(vec!["Name", "Description", "Program", "Id"]).style(Style::default().add_modifier(Modifier::BOLD)))
            .block(Block::default().borders(Borders::ALL).title(title))
            .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
            .highlight_symbol("► ");

            let mut state = TableState::default();
            state.select(Some(input.selected_row.min(rows.len().saturating_sub(1))));
            f.render_stateful_widget(table, area, &mut state);
        }
    }
}

fn render_footer(f: &mut Frame, area: Rect, view: &WizardView) {
    let (text, style) = match &view.notice {
        Some(notice) => (notice.clone(), Style::default().fg(Color::Yellow)),
        None if view.dialog.is_some() => (
            "Enter: import  s: switch source  r: retry  p: show progress  Esc: close".to_string(),
            Style::default().fg(Color::Gray),
        ),
        None => (
            "↑/↓: move  Enter: use mapping  f: file import  a: API import  e: export  i: import template  d: delete  r: reload  q: quit".to_string(),
            Style::default().fg(Color::Gray),
        ),
    };
    let footer = Paragraph::new(text)
        .style(style)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(footer, area);
}

fn render_dialog(f: &mut Frame, area: Rect, view: &WizardView, dialog: &DialogView) {
    let popup = centered_rect(80, 70, area);
    f.render_widget(Clear, popup);
    let block = Block::default().borders(Borders::ALL).title(dialog.title());
    let inner = block.inner(popup);
    f.render_widget(block, popup);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(6), Constraint::Length(8), Constraint::Length(2)])
        .split(inner);

    match dialog {
        DialogView::File(file) => render_file_source(f, chunks[0], file),
        DialogView::Api(api) => render_api_source(f, chunks[0], api),
    }

    render_status(f, chunks[1], view);

    let import_style = if view.import_enabled {
        Style::default().fg(Color::Black).bg(Color::Green).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let actions = Paragraph::new(Line::from(vec![
        Span::styled(" Import (Enter) ", import_style),
        Span::raw("  "),
        Span::styled("Cancel (Esc)", Style::default().fg(Color::Gray)),
    ]))
    .alignment(Alignment::Right);
    f.render_widget(actions, chunks[2]);
}

fn render_file_source(f: &mut Frame, area: Rect, file: &FileDialogView) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(area);

    let path = file.path.clone().unwrap_or_else(|| "press o to choose a .csv, .xls or .xlsx file".to_string());
    f.render_widget(
        Paragraph::new(path).block(Block::default().borders(Borders::ALL).title("File")),
        chunks[0],
    );

    let items: Vec<ListItem> = file
        .sheets
        .iter()
        .map(|sheet| {
            let selected = file.selected_sheet.as_deref() == Some(sheet.as_str());
            let (marker, style) = if selected {
                ("● ", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD))
            } else {
                ("  ", Style::default())
            };
            ListItem::new(Line::from(Span::styled(format!("{}{}", marker, sheet), style)))
        })
        .collect();
    let list = List::new(items).block(Block::default().borders(Borders::ALL).title("Select sheet (←/→)"));
    f.render_widget(list, chunks[1]);
}

fn render_api_source(f: &mut Frame, area: Rect, api: &ApiDialogView) {
    let mut lines = vec![
        Line::from(vec![Span::styled("URL (u): ", Style::default().fg(Color::Gray)), Span::raw(api.url.clone())]),
        Line::from(vec![
            Span::styled("Username (n): ", Style::default().fg(Color::Gray)),
            Span::raw(api.username.clone()),
            Span::styled("   Password (w): ", Style::default().fg(Color::Gray)),
            Span::raw(if api.has_password { "********" } else { "" }),
        ]),
        Line::from(Span::styled("Parameters (k: add, x: remove last):", Style::default().fg(Color::Gray))),
    ];
    lines.extend(api.parameters.iter().map(|(k, v)| Line::from(format!("  {} = {}", k, v))));

    let pull = if api.pull_enabled {
        Span::styled("l: pull data", Style::default().fg(Color::Cyan))
    } else {
        Span::styled("l: pull data (enter a URL)", Style::default().fg(Color::DarkGray))
    };
    lines.push(Line::from(""));
    lines.push(Line::from(pull));

    f.render_widget(
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL)).wrap(Wrap { trim: false }),
        area,
    );
}

fn render_status(f: &mut Frame, area: Rect, view: &WizardView) {
    let mut lines = Vec::new();

    if let Some(error) = &view.error {
        lines.push(Line::from(Span::styled(error.clone(), Style::default().fg(Color::Red))));
        lines.push(Line::from(Span::styled("r: retry", Style::default().fg(Color::Gray))));
    } else if let Some(summary) = &view.summary {
        lines.extend(summary_lines(summary));
    } else {
        let unit = if view.tracker { "tracked entities" } else { "events" };
        lines.push(Line::from(format!("Status: {}", view.state)));
        lines.push(Line::from(format!("{} {} to import", view.entity_count, unit)));
    }

    f.render_widget(
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Summary")).wrap(Wrap { trim: true }),
        area,
    );
}

fn summary_lines(summary: &SummaryView) -> Vec<Line<'static>> {
    let mut lines = vec![Line::from(Span::styled(
        summary.title.clone(),
        Style::default().add_modifier(Modifier::BOLD),
    ))];
    let counts = summary
        .rows
        .iter()
        .map(|(label, count)| format!("{}: {}", label, count))
        .collect::<Vec<_>>()
        .join("   ");
    lines.push(Line::from(counts));
    lines.extend(
        summary
            .conflicts
            .iter()
            .take(3)
            .map(|c| Line::from(Span::styled(c.clone(), Style::default().fg(Color::Yellow)))),
    );
    if summary.conflicts.len() > 3 {
        lines.push(Line::from(format!("... and {} more (see log)", summary.conflicts.len() - 3)));
    }
    lines
}
