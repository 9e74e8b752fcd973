use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Paragraph, Wrap};

use super::super::grid::{CellKind, cell_label, fitted_columns, grid_rows};
use super::super::playback::Phase;
use super::{FrameView, ViewerModel};

pub(super) fn draw_player(frame: &mut Frame, model: &ViewerModel) {
    let bg = Block::default().style(Style::default().bg(Color::Black));
    frame.render_widget(bg, frame.area());

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(6),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(3),
        ])
        .split(frame.area());

    frame.render_widget(header(model), chunks[0]);
    draw_table(frame, model.frame.as_ref(), chunks[1]);

    let stats_text = model
        .frame
        .as_ref()
        .map(|view| view.summary.clone())
        .unwrap_or_else(|| "No frame rendered yet.".to_string());
    let stats = Paragraph::new(stats_text)
        .style(Style::default().fg(Color::Rgb(230, 230, 230)))
        .block(panel_block("Stats"));
    frame.render_widget(stats, chunks[2]);

    let command_bar = Paragraph::new(controls_line(model.status.phase))
        .alignment(Alignment::Center)
        .block(panel_block("Controls"));
    frame.render_widget(command_bar, chunks[3]);

    let message = &model.status.message;
    let status_widget = Paragraph::new(message.clone())
        .style(status_style(message))
        .block(panel_block("Status"));
    frame.render_widget(status_widget, chunks[4]);
}

fn header(model: &ViewerModel) -> Paragraph<'static> {
    let status = &model.status;
    let subtle = Style::default().fg(Color::Rgb(185, 195, 210));
    let last_frame = model
        .frame
        .as_ref()
        .map(|view| view.received_at.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string());

    Paragraph::new(Line::from(vec![
        Span::styled(
            "HTPLAY",
            Style::default()
                .fg(Color::Rgb(110, 170, 255))
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled("   ", Style::default()),
        Span::styled(format!("frame {}/{}", status.position, status.known), subtle),
        Span::styled("   ", Style::default()),
        Span::styled(format!("{} ms", status.interval.as_millis()), subtle),
        Span::styled("   ", Style::default()),
        Span::styled(format!("last {last_frame}"), subtle),
        Span::styled("   ", Style::default()),
        Span::styled(status.phase.label(), phase_style(status.phase)),
    ]))
    .alignment(Alignment::Center)
    .block(panel_block(format!("Source: {}", model.source)))
}

fn draw_table(frame: &mut Frame, view: Option<&FrameView>, area: Rect) {
    let Some(view) = view else {
        let waiting = Paragraph::new("Waiting for the first snapshot...\n\nPress p to play.")
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::Rgb(185, 195, 210)))
            .wrap(Wrap { trim: true })
            .block(panel_block("Table"));
        frame.render_widget(waiting, area);
        return;
    };

    let snapshot = &view.snapshot;
    let inner_width = area.width.saturating_sub(2) as usize;
    let columns = fitted_columns(snapshot.buckets.len(), inner_width);
    let lines: Vec<Line> = grid_rows(snapshot, columns)
        .iter()
        .map(|row| {
            let mut spans = Vec::with_capacity(row.len() * 2);
            for cell in row {
                spans.push(Span::styled(cell_label(cell), cell_style(cell.kind)));
                spans.push(Span::raw(" "));
            }
            Line::from(spans)
        })
        .collect();

    let title = format!(
        "Table {} ({} buckets)",
        snapshot.strategy,
        snapshot.buckets.len()
    );
    let table = Paragraph::new(lines).block(panel_block(title));
    frame.render_widget(table, area);
}

fn cell_style(kind: CellKind) -> Style {
    match kind {
        CellKind::Empty => Style::default()
            .bg(Color::Rgb(40, 44, 52))
            .fg(Color::Rgb(90, 96, 110)),
        CellKind::Chain => Style::default()
            .bg(Color::Rgb(110, 170, 255))
            .fg(Color::Black)
            .add_modifier(Modifier::BOLD),
        CellKind::Occupied => Style::default()
            .bg(Color::Rgb(130, 200, 150))
            .fg(Color::Black)
            .add_modifier(Modifier::BOLD),
        CellKind::Deleted => Style::default()
            .bg(Color::Rgb(255, 145, 120))
            .fg(Color::Black),
    }
}

fn phase_style(phase: Phase) -> Style {
    let color = match phase {
        Phase::Playing => Color::Rgb(130, 200, 150),
        Phase::Paused => Color::Yellow,
        Phase::Halted => Color::Rgb(205, 165, 255),
        Phase::Idle | Phase::Loading => Color::Rgb(185, 195, 210),
    };
    Style::default().fg(color).add_modifier(Modifier::BOLD)
}

fn panel_block(title: impl Into<String>) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(Color::Rgb(125, 135, 150)))
        .title(title.into())
}

fn pill_active() -> Style {
    Style::default()
        .bg(Color::Rgb(110, 170, 255))
        .fg(Color::Black)
        .add_modifier(Modifier::BOLD)
}

fn pill_inactive() -> Style {
    Style::default()
        .bg(Color::Rgb(72, 82, 96))
        .fg(Color::Rgb(230, 235, 242))
}

fn pill(label: &'static str, active: bool) -> Span<'static> {
    Span::styled(
        label,
        if active {
            pill_active()
        } else {
            pill_inactive()
        },
    )
}

fn controls_line(phase: Phase) -> Line<'static> {
    Line::from(vec![
        pill(" PLAY ", phase == Phase::Playing),
        Span::styled(" ", Style::default()),
        pill(" PAUSE ", phase == Phase::Paused),
        Span::styled(
            "   p play  s pause  space toggle  +/- interval  r rewind  q quit",
            Style::default().fg(Color::Rgb(185, 195, 210)),
        ),
    ])
}

fn status_style(status: &str) -> Style {
    if status.starts_with("ERROR:") {
        Style::default()
            .fg(Color::Rgb(255, 145, 120))
            .add_modifier(Modifier::BOLD)
    } else if status.starts_with("INFO:") {
        Style::default().fg(Color::Rgb(205, 165, 255))
    } else {
        Style::default().fg(Color::Rgb(230, 235, 242))
    }
}
