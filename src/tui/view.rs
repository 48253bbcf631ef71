use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::shared::{DisplayState, NUM_TRACKS, STEPS, TRACKS};

use super::mode::TuiState;

pub fn render(frame: &mut Frame, area: Rect, state: &DisplayState, ts: &TuiState) {
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),                    // transport line
            Constraint::Length(NUM_TRACKS as u16 + 2), // the grid
            Constraint::Length(3),                    // status
            Constraint::Min(0),
        ])
        .split(area);

    draw_transport(frame, sections[0], state);
    draw_grid(frame, sections[1], state, ts);
    draw_status(frame, sections[2], state);
}

fn draw_transport(frame: &mut Frame, area: Rect, state: &DisplayState) {
    let line = format!(
        " {}  {} BPM  swing {}%  audio: {}  {}",
        if state.playing { "▶" } else { "■" },
        state.bpm,
        state.swing,
        state.output_state.label(),
        state.beat_name,
    );
    let widget = Paragraph::new(line).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" kidbeat "),
    );
    frame.render_widget(widget, area);
}

fn draw_grid(frame: &mut Frame, area: Rect, state: &DisplayState, ts: &TuiState) {
    let outer = Block::default().borders(Borders::ALL);
    let inner = outer.inner(area);
    frame.render_widget(outer, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1); NUM_TRACKS])
        .split(inner);

    for (row, row_area) in rows.iter().enumerate() {
        let mut constraints = vec![Constraint::Length(12)]; // label + volume
        constraints.extend([Constraint::Length(3); STEPS]);
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(constraints)
            .split(*row_area);

        let track = &TRACKS[row];
        let label = format!(
            "{:<7}{:>3}",
            track.label,
            (state.volumes[row] * 100.0).round() as u32
        );
        frame.render_widget(
            Paragraph::new(label).style(Style::default().fg(track_color(row))),
            cols[0],
        );

        for step in 0..STEPS {
            let active = state.pattern[row][step];
            let is_now = state.playing && step == state.current_step;
            let is_cursor = ts.cursor_track == row && ts.cursor_step == step;

            let mut style = if active {
                Style::default().fg(track_color(row)).add_modifier(Modifier::BOLD)
            } else if step % 4 == 0 {
                Style::default().fg(Color::Gray)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            if is_now {
                style = style.add_modifier(Modifier::REVERSED);
            }

            let glyph = match (active, is_cursor) {
                (true, true) => "[█]",
                (true, false) => " █ ",
                (false, true) => "[·]",
                (false, false) => " · ",
            };
            frame.render_widget(Paragraph::new(glyph).style(style), cols[step + 1]);
        }
    }
}

fn draw_status(frame: &mut Frame, area: Rect, state: &DisplayState) {
    let widget = Paragraph::new(state.status.clone())
        .style(Style::default().fg(Color::Gray))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" arrows+enter edit · 1-0/q-y steps · +/- bpm · [/] swing · ,/. vol · f/d row · g random · c clear · x export · p preview · s save "),
        );
    frame.render_widget(widget, area);
}

fn track_color(row: usize) -> Color {
    let (r, g, b) = TRACKS[row].color;
    Color::Rgb(r, g, b)
}
