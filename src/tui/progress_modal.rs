use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Gauge, Paragraph, Wrap},
};

use crate::wizard::{Progress, ProgressView};

/// Spinner state for the progress modal; the value itself comes from the view
#[derive(Debug, Default)]
pub struct ProgressModal {
    spinner_state: usize,
}

impl ProgressModal {
    const SPINNER_FRAMES: &'static [&'static str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

    pub fn new() -> Self {
        Self::default()
    }

    pub fn tick(&mut self) {
        self.spinner_state = (self.spinner_state + 1) % Self::SPINNER_FRAMES.len();
    }

    pub fn spinner(&self) -> &'static str {
        Self::SPINNER_FRAMES[self.spinner_state]
    }

    pub fn render(&self, f: &mut Frame, area: Rect, view: &ProgressView) {
        let popup_area = centered_rect(60, 25, area);
        f.render_widget(Clear, popup_area);

        let block = Block::default().title("Progress").borders(Borders::ALL);
        let inner_area = block.inner(popup_area);
        f.render_widget(block, popup_area);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(2), Constraint::Length(1), Constraint::Min(0)])
            .split(inner_area);

        let header = Paragraph::new(Line::from(vec![
            Span::styled(
                self.spinner(),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ),
            Span::styled(format!(" {}", view.label()), Style::default().fg(Color::Cyan)),
        ]))
        .alignment(Alignment::Center);
        f.render_widget(header, chunks[0]);

        if let Progress::Percent(pct) = view.progress {
            let gauge = Gauge::default()
                .gauge_style(Style::default().fg(Color::Green))
                .percent(u16::from(pct.min(100)));
            f.render_widget(gauge, chunks[1]);
        }

        let hint = Paragraph::new(Span::styled(
            "h: hide (work continues)",
            Style::default().fg(Color::Gray),
        ))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
        f.render_widget(hint, chunks[2]);
    }
}

pub fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
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
