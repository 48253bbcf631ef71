use crate::shared::{NUM_TRACKS, STEPS};

// State local to the TUI: where the grid cursor sits. Everything else the
// view needs arrives in DisplayState each frame.
#[derive(Clone, Copy, Debug, Default)]
pub struct TuiState {
    pub cursor_track: usize,
    pub cursor_step: usize,
}

impl TuiState {
    pub fn move_cursor(&mut self, d_track: isize, d_step: isize) {
        self.cursor_track = (self.cursor_track as isize + d_track)
            .rem_euclid(NUM_TRACKS as isize) as usize;
        self.cursor_step =
            (self.cursor_step as isize + d_step).rem_euclid(STEPS as isize) as usize;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_wraps_both_ways() {
        let mut ts = TuiState::default();
        ts.move_cursor(-1, -1);
        assert_eq!(ts.cursor_track, NUM_TRACKS - 1);
        assert_eq!(ts.cursor_step, STEPS - 1);
        ts.move_cursor(1, 1);
        assert_eq!(ts.cursor_track, 0);
        assert_eq!(ts.cursor_step, 0);
    }
}
