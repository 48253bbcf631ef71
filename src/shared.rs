// Project-wide constants and the small types that cross layer boundaries.
//
// The idea of the rendering process:
//   - Only the middle layer holds sequencer and parameter state; the TUI just
//     renders the DisplayState object on every frame and resolves keypresses
//     into semantic InputEvents for the middle layer to handle.

pub const STEPS: usize = 16;
pub const NUM_TRACKS: usize = 4;

pub const BPM_MIN: u32 = 60;
pub const BPM_MAX: u32 = 160;
pub const SWING_MAX: u32 = 100;
pub const SWING_STEP: u32 = 5;

/// What synthesis recipe a track triggers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Instrument {
    Kick,
    Snare,
    Hat,
    Clap,
}

/// Immutable track descriptor. The four tracks are fixed for the process
/// lifetime; row order in the pattern grid matches this table 1:1.
#[derive(Clone, Copy, Debug)]
pub struct TrackDef {
    pub id: &'static str,
    pub label: &'static str,
    pub color: (u8, u8, u8),
    pub instrument: Instrument,
}

pub const TRACKS: [TrackDef; NUM_TRACKS] = [
    TrackDef { id: "kick",  label: "Kick",   color: (0xef, 0x44, 0x44), instrument: Instrument::Kick },
    TrackDef { id: "snare", label: "Snare",  color: (0x3b, 0x82, 0xf6), instrument: Instrument::Snare },
    TrackDef { id: "hat",   label: "Hi-Hat", color: (0x10, 0xb9, 0x81), instrument: Instrument::Hat },
    TrackDef { id: "clap",  label: "Clap",   color: (0xf5, 0x9e, 0x0b), instrument: Instrument::Clap },
];

/// Engine tuning knobs, constructed once in main and passed down instead of
/// living as ambient globals.
#[derive(Clone, Copy, Debug)]
pub struct EngineConfig {
    pub default_bpm: u32,
    /// How far ahead of the output clock a poll may commit steps, seconds.
    pub lookahead: f64,
    /// Poll interval for the scheduler thread, milliseconds. Kept at roughly
    /// a third of the lookahead window so a late poll can't miss a step.
    pub poll_interval_ms: u64,
    /// Gap between pressing play and the first step, seconds.
    pub start_offset: f64,
    /// Head-room before the first step of an offline render, seconds.
    pub export_start_offset: f64,
    pub export_sample_rate: u32,
    pub export_bars: usize,
    pub preview_bars: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_bpm: 100,
            lookahead: 0.08,
            poll_interval_ms: 25,
            start_offset: 0.05,
            export_start_offset: 0.02,
            export_sample_rate: 44_100,
            export_bars: 4,
            preview_bars: 2,
        }
    }
}

/// Lifecycle of the live output, mirrored into the status line. The stream
/// starts suspended and is resumed on the first play press.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputState {
    Running,
    Suspended,
}

impl OutputState {
    pub fn label(self) -> &'static str {
        match self {
            OutputState::Running => "running",
            OutputState::Suspended => "suspended",
        }
    }
}

/// Semantic input events resolved by the TUI from raw keypresses. Cursor
/// movement stays inside the TUI; only edits and commands cross over.
#[derive(Clone, Debug, PartialEq)]
pub enum InputEvent {
    Quit,
    PlayPress,

    // pattern edits, already resolved to a cell by the TUI cursor state
    ToggleCell { track: usize, step: usize },
    FillRow { track: usize, on: bool },
    Randomize,
    ClearAll,

    // parameter nudges
    BumpBpm(i32),
    BumpSwing(i32),
    BumpVolume { track: usize, delta: f32 },

    ExportWav,
    /// Short 2-bar render for a quick listen before the real export.
    PreviewWav,
    SaveBeat,
    /// Reload the saved beat with the current name, if any.
    LoadBeat,
    DeleteBeat,
}

/// Everything the TUI needs to draw one frame. Built by the middle layer;
/// the view never reaches into live state.
#[derive(Clone, Debug)]
pub struct DisplayState {
    pub pattern: [[bool; STEPS]; NUM_TRACKS],
    pub volumes: [f32; NUM_TRACKS],
    pub bpm: u32,
    pub swing: u32,
    pub playing: bool,
    /// Step currently highlighted while playing, 0..15.
    pub current_step: usize,
    pub output_state: OutputState,
    pub beat_name: String,
    /// One-line feedback from the last command (export path, save result, ...).
    pub status: String,
}
