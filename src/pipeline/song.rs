// The global beat state: the 4x16 grid plus the knobs around it. Owned by
// the middle layer behind an Arc<RwLock> so the scheduler thread can take a
// read snapshot per poll while the UI edits in place.

use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use crate::shared::{BPM_MAX, BPM_MIN, NUM_TRACKS, STEPS, SWING_MAX};

pub type SharedSong = Arc<RwLock<Song>>;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Song {
    pub name: String,
    pub bpm: u32,
    pub swing: u32,
    /// Row order matches shared::TRACKS; every row is exactly STEPS long.
    pub pattern: [[bool; STEPS]; NUM_TRACKS],
    pub volumes: [f32; NUM_TRACKS],
}

impl Default for Song {
    fn default() -> Self {
        // starter beat: kick on 1 and 9, snare on 5 and 13, hats on the
        // off-steps, so the first play press makes a sound
        let mut pattern = [[false; STEPS]; NUM_TRACKS];
        pattern[0][0] = true;
        pattern[0][8] = true;
        pattern[1][4] = true;
        pattern[1][12] = true;
        for step in (0..STEPS).step_by(2) {
            pattern[2][step] = true;
        }
        Self {
            name: String::from("My First Beat"),
            bpm: 100,
            swing: 0,
            pattern,
            volumes: [1.0; NUM_TRACKS],
        }
    }
}

impl Song {
    pub fn new_shared() -> SharedSong {
        Arc::new(RwLock::new(Song::default()))
    }

    pub fn toggle_cell(&mut self, track: usize, step: usize) {
        if track < NUM_TRACKS && step < STEPS {
            self.pattern[track][step] = !self.pattern[track][step];
        }
    }

    pub fn fill_row(&mut self, track: usize, on: bool) {
        if track < NUM_TRACKS {
            self.pattern[track] = [on; STEPS];
        }
    }

    pub fn clear(&mut self) {
        self.pattern = [[false; STEPS]; NUM_TRACKS];
    }

    /// Random beat with a denser hat row, sparse everything else.
    pub fn randomize(&mut self) {
        for (row, cells) in self.pattern.iter_mut().enumerate() {
            let density = if row == 2 { 0.6 } else { 0.3 };
            for cell in cells.iter_mut() {
                *cell = fastrand::f32() < density;
            }
        }
    }

    pub fn set_bpm(&mut self, bpm: i64) {
        self.bpm = bpm.clamp(BPM_MIN as i64, BPM_MAX as i64) as u32;
    }

    pub fn set_swing(&mut self, swing: i64) {
        self.swing = swing.clamp(0, SWING_MAX as i64) as u32;
    }

    pub fn set_volume(&mut self, track: usize, volume: f32) {
        if track < NUM_TRACKS {
            self.volumes[track] = volume.clamp(0.0, 1.0);
        }
    }
}
