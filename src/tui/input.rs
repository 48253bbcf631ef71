use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind};

use crate::shared::InputEvent;

use super::mode::TuiState;

// Poll for input, move the grid cursor locally, and resolve everything else
// into semantic InputEvents for the middle layer.
//
// Keys:
//   arrows        move the cursor
//   Enter         toggle the cell under the cursor
//   1..0 q..y     toggle step 0-15 on the cursor's track
//   + / -         tempo up/down
//   ] / [         swing up/down (5% steps)
//   . / ,         cursor track volume up/down
//   f / d         fill / empty the cursor's row
//   g             surprise beat
//   c             clear the grid
//   x             export WAV (4 bars)   p: 2-bar preview render
//   s / l / D     save / load / delete the named beat
//   Space         play/stop     Esc: quit
pub fn poll_input(timeout: Duration, ts: &mut TuiState) -> anyhow::Result<Vec<InputEvent>> {
    if !event::poll(timeout)? {
        return Ok(vec![]);
    }

    if let Event::Key(key) = event::read()? {
        if key.kind != KeyEventKind::Press {
            return Ok(vec![]);
        }
        return Ok(handle_key(key.code, ts));
    }
    Ok(vec![])
}

fn handle_key(code: KeyCode, ts: &mut TuiState) -> Vec<InputEvent> {
    match code {
        KeyCode::Esc => vec![InputEvent::Quit],
        KeyCode::Char(' ') => vec![InputEvent::PlayPress],

        KeyCode::Up => { ts.move_cursor(-1, 0); vec![] }
        KeyCode::Down => { ts.move_cursor(1, 0); vec![] }
        KeyCode::Left => { ts.move_cursor(0, -1); vec![] }
        KeyCode::Right => { ts.move_cursor(0, 1); vec![] }

        KeyCode::Enter => vec![InputEvent::ToggleCell {
            track: ts.cursor_track,
            step: ts.cursor_step,
        }],

        // step keys laid out like the grid, one row of 16
        KeyCode::Char(c) if char_to_step(c).is_some() => {
            let step = char_to_step(c).unwrap();
            vec![InputEvent::ToggleCell { track: ts.cursor_track, step }]
        }

        KeyCode::Char('+') | KeyCode::Char('=') => vec![InputEvent::BumpBpm(1)],
        KeyCode::Char('-') => vec![InputEvent::BumpBpm(-1)],
        KeyCode::Char(']') => vec![InputEvent::BumpSwing(1)],
        KeyCode::Char('[') => vec![InputEvent::BumpSwing(-1)],
        KeyCode::Char('.') => vec![InputEvent::BumpVolume { track: ts.cursor_track, delta: 0.1 }],
        KeyCode::Char(',') => vec![InputEvent::BumpVolume { track: ts.cursor_track, delta: -0.1 }],

        KeyCode::Char('f') => vec![InputEvent::FillRow { track: ts.cursor_track, on: true }],
        KeyCode::Char('d') => vec![InputEvent::FillRow { track: ts.cursor_track, on: false }],
        KeyCode::Char('g') => vec![InputEvent::Randomize],
        KeyCode::Char('c') => vec![InputEvent::ClearAll],
        KeyCode::Char('x') => vec![InputEvent::ExportWav],
        KeyCode::Char('p') => vec![InputEvent::PreviewWav],
        KeyCode::Char('s') => vec![InputEvent::SaveBeat],
        KeyCode::Char('l') => vec![InputEvent::LoadBeat],
        KeyCode::Char('D') => vec![InputEvent::DeleteBeat],

        _ => vec![],
    }
}

fn char_to_step(c: char) -> Option<usize> {
    // one row of 16 keys matching the 16 columns
    let idx = match c {
        '1' => 0, '2' => 1, '3' => 2, '4' => 3,
        '5' => 4, '6' => 5, '7' => 6, '8' => 7,
        '9' => 8, '0' => 9, 'q' => 10, 'w' => 11,
        'e' => 12, 'r' => 13, 't' => 14, 'y' => 15,
        _ => return None,
    };
    Some(idx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_keys_toggle_on_the_cursor_track() {
        let mut ts = TuiState::default();
        ts.cursor_track = 2;
        let evs = handle_key(KeyCode::Char('q'), &mut ts);
        assert_eq!(evs, vec![InputEvent::ToggleCell { track: 2, step: 10 }]);
    }

    #[test]
    fn arrows_only_move_the_cursor() {
        let mut ts = TuiState::default();
        assert!(handle_key(KeyCode::Down, &mut ts).is_empty());
        assert_eq!(ts.cursor_track, 1);
    }
}
