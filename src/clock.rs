// Tempo math. Pure functions; range clamping is the editing surface's job.

/// Duration of one sixteenth-note step in seconds: (60 / bpm) / 4.
pub fn step_duration(bpm: u32) -> f64 {
    60.0 / bpm as f64 / 4.0
}

/// Swing delay for odd-indexed steps. At 100% swing the step lands a third
/// of the way toward the next step, so the offset can never cross it.
pub fn swing_offset(step_dur: f64, swing: u32) -> f64 {
    (swing as f64 / 100.0) * (step_dur / 3.0)
}
