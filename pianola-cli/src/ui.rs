use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph, Wrap},
    Frame, Terminal,
};

use crate::controls::{KeyCell, StatusSnapshot};

const HELP: &str = "space=play/pause  ←/→=seek 5s  -/= speed  q=quit";

pub fn draw_status(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    source: &str,
    status: &StatusSnapshot,
    log_lines: &[String],
) {
    let _ = terminal.draw(|f| {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(3),
                Constraint::Length(4),
                Constraint::Length(3),
                Constraint::Min(3),
                Constraint::Length(1),
            ])
            .split(f.size());

        let title = Line::from(vec![
            Span::styled(
                " Pianola ",
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(" "),
            Span::styled(source.to_string(), Style::default().fg(Color::Cyan)),
        ]);
        f.render_widget(Paragraph::new(title), rows[0]);

        let gauge = Gauge::default()
            .block(Block::default().borders(Borders::ALL).title("Position"))
            .gauge_style(Style::default().fg(Color::Green).bg(Color::Black))
            .ratio(status.ratio.clamp(0.0, 1.0))
            .label(status.position.clone());
        f.render_widget(gauge, rows[1]);

        let state = Paragraph::new(status.text.as_str())
            .style(Style::default().fg(Color::Green).add_modifier(Modifier::BOLD))
            .block(Block::default().borders(Borders::ALL).title("Playback"));
        f.render_widget(state, rows[2]);

        draw_keys(f, rows[3], &status.keys);
        draw_log(f, rows[4], log_lines);

        f.render_widget(
            Paragraph::new(HELP).style(Style::default().fg(Color::Blue)),
            rows[5],
        );
    });
}

/// One cell per mapped key; held keys are drawn inverted.
fn draw_keys(f: &mut Frame, area: Rect, keys: &[KeyCell]) {
    let spans: Vec<Span> = keys
        .iter()
        .flat_map(|cell| {
            let style = if cell.held {
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Yellow)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::Gray)
            };
            [Span::styled(format!(" {} ", cell.name), style), Span::raw(" ")]
        })
        .collect();

    let keyboard = Paragraph::new(Line::from(spans))
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title("Keys"));
    f.render_widget(keyboard, area);
}

fn draw_log(f: &mut Frame, area: Rect, log_lines: &[String]) {
    let visible = area.height.saturating_sub(2) as usize;
    let start = log_lines.len().saturating_sub(visible);
    let text = if log_lines.is_empty() {
        "No logs yet.".to_string()
    } else {
        log_lines[start..].join("\n")
    };

    let log = Paragraph::new(text)
        .style(Style::default().fg(Color::DarkGray))
        .block(Block::default().borders(Borders::ALL).title("Log"));
    f.render_widget(log, area);
}
