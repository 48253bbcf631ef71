// The middle layer: owns the song state and the transport, routes semantic
// input events from the TUI, and hands back a DisplayState snapshot each
// frame. The TUI never touches audio or the scheduler directly.

use std::path::PathBuf;
use std::sync::Arc;

use crate::audio::AudioHandle;
use crate::export;
use crate::pipeline::persistence;
use crate::pipeline::song::{SharedSong, Song};
use crate::sequencer::Scheduler;
use crate::shared::{DisplayState, EngineConfig, InputEvent, SWING_STEP, TRACKS};

pub struct Middle {
    pub song: SharedSong,
    audio: AudioHandle,
    scheduler: Scheduler,
    config: EngineConfig,
    project_dir: PathBuf,
    status: String,
}

impl Middle {
    pub fn new(audio: AudioHandle, config: EngineConfig, project_dir: PathBuf) -> Self {
        let song = Song::new_shared();
        {
            let mut g = song.write().unwrap();
            g.bpm = config.default_bpm;
        }
        let scheduler = Scheduler::new(
            audio.command_sender(),
            audio.clock(),
            audio.sample_rate(),
            config,
            Arc::clone(&song),
        );
        Self {
            song,
            audio,
            scheduler,
            config,
            project_dir,
            status: String::from("space: play  x: export  s: save  (see footer for the rest)"),
        }
    }

    pub fn handle_input(&mut self, event: InputEvent) {
        match event {
            InputEvent::PlayPress => {
                if self.scheduler.is_playing() {
                    self.stop();
                } else {
                    self.play();
                }
            }
            InputEvent::ToggleCell { track, step } => {
                self.song.write().unwrap().toggle_cell(track, step);
            }
            InputEvent::FillRow { track, on } => {
                self.song.write().unwrap().fill_row(track, on);
            }
            InputEvent::Randomize => {
                self.song.write().unwrap().randomize();
                self.status = String::from("surprise beat!");
            }
            InputEvent::ClearAll => {
                self.song.write().unwrap().clear();
            }
            InputEvent::BumpBpm(delta) => {
                let mut g = self.song.write().unwrap();
                let bpm = g.bpm as i64 + delta as i64;
                g.set_bpm(bpm);
            }
            InputEvent::BumpSwing(delta) => {
                let mut g = self.song.write().unwrap();
                let swing = g.swing as i64 + (delta as i64 * SWING_STEP as i64);
                g.set_swing(swing);
            }
            InputEvent::BumpVolume { track, delta } => {
                let mut g = self.song.write().unwrap();
                let v = g.volumes.get(track).copied().unwrap_or(0.0) + delta;
                g.set_volume(track, v);
                if let Some(def) = TRACKS.get(track) {
                    self.status =
                        format!("{} vol {:.0}%", def.id, g.volumes[track] * 100.0);
                }
            }
            InputEvent::ExportWav => self.export(self.config.export_bars, ""),
            InputEvent::PreviewWav => self.export(self.config.preview_bars, "_preview"),
            InputEvent::SaveBeat => self.save(),
            InputEvent::LoadBeat => self.load(),
            InputEvent::DeleteBeat => self.delete(),
            // quit is the main loop's business
            InputEvent::Quit => {}
        }
    }

    fn play(&mut self) {
        // unlock/resume first; a dead output leaves the transport stopped
        if let Err(e) = self.audio.resume() {
            self.status = format!("can't start playback: {e:#}");
            return;
        }
        self.scheduler.start();
        self.status = String::from("playing");
    }

    fn stop(&mut self) {
        self.scheduler.stop();
        self.status = String::from("stopped");
    }

    fn export(&mut self, bars: usize, suffix: &str) {
        let (name, bpm, pattern) = {
            let g = self.song.read().unwrap();
            (format!("{}{}", g.name, suffix), g.bpm, g.pattern)
        };
        match export::export_wav(
            &name,
            bpm,
            &pattern,
            bars,
            &self.config,
            &self.project_dir,
        ) {
            Ok(path) => self.status = format!("exported {}", path.display()),
            Err(e) => self.status = format!("export failed: {e:#}"),
        }
    }

    fn save(&mut self) {
        let song = self.song.read().unwrap().clone();
        match persistence::save_beat(&self.project_dir, &song) {
            Ok(()) => self.status = format!("saved '{}'", song.name),
            Err(e) => self.status = format!("save failed: {e:#}"),
        }
    }

    fn load(&mut self) {
        let name = self.song.read().unwrap().name.clone();
        match persistence::load_beat(&self.project_dir, &name) {
            Some(saved) => {
                *self.song.write().unwrap() = saved;
                self.status = format!("loaded '{name}'");
            }
            None => self.status = format!("no saved beat named '{name}'"),
        }
    }

    fn delete(&mut self) {
        let name = self.song.read().unwrap().name.clone();
        match persistence::delete_beat(&self.project_dir, &name) {
            Ok(()) => self.status = format!("deleted '{name}'"),
            Err(e) => self.status = format!("delete failed: {e:#}"),
        }
    }

    pub fn display_state(&self) -> DisplayState {
        let g = self.song.read().unwrap();
        DisplayState {
            pattern: g.pattern,
            volumes: g.volumes,
            bpm: g.bpm,
            swing: g.swing,
            playing: self.scheduler.is_playing(),
            current_step: self.scheduler.current_step(),
            output_state: self.audio.state(),
            beat_name: g.name.clone(),
            status: self.status.clone(),
        }
    }
}
