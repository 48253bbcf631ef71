use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::audio_api::AudioCommand;
use crate::synth::Voice;

const MAX_VOICES: usize = 64; // preallocated so the callback won't malloc
const MASTER_GAIN: f32 = 0.9;

/// Realtime mixer living inside the cpal callback. Keeps its own frame
/// clock; voices fire when the clock reaches their start frame, regardless
/// of when the scheduler poll that committed them actually ran.
pub struct Engine {
    voices: Vec<Voice>,
    scratch: Vec<f32>,
    clock: Arc<AtomicU64>,
}

impl Engine {
    pub fn new(clock: Arc<AtomicU64>) -> Self {
        Self {
            voices: Vec::with_capacity(MAX_VOICES),
            scratch: Vec::new(),
            clock,
        }
    }

    pub fn handle_cmd(&mut self, cmd: AudioCommand) {
        match cmd {
            AudioCommand::Play(voices) => {
                for v in voices {
                    if self.voices.len() < MAX_VOICES {
                        self.voices.push(v);
                    }
                }
            }
        }
    }

    /// Fill one interleaved output block and advance the clock.
    pub fn render_block(&mut self, out: &mut [f32], channels: usize) {
        let frames = out.len() / channels;
        let block_start = self.clock.load(Ordering::Relaxed);

        self.scratch.clear();
        self.scratch.resize(frames, 0.0);
        for v in &mut self.voices {
            v.render_into(block_start, &mut self.scratch);
        }
        self.voices.retain(|v| v.active());

        // mono mix, same signal on every channel
        for (frame, chunk) in out.chunks_mut(channels).enumerate() {
            let s = self.scratch[frame] * MASTER_GAIN;
            for slot in chunk {
                *slot = s;
            }
        }

        self.clock.fetch_add(frames as u64, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth;

    #[test]
    fn voice_fires_at_its_start_frame_across_blocks() {
        let clock = Arc::new(AtomicU64::new(0));
        let mut engine = Engine::new(Arc::clone(&clock));
        // kick due half a second in
        engine.handle_cmd(AudioCommand::Play(vec![synth::build_hit(
            crate::shared::Instrument::Kick,
            0.5,
            1.0,
            &(0..8820).map(|_| 0.0).collect(),
            44_100,
        )
        .remove(0)]));

        let mut heard_at = None;
        let mut out = vec![0.0f32; 512 * 2];
        for block in 0..100 {
            out.fill(0.0);
            engine.render_block(&mut out, 2);
            if heard_at.is_none() && out.iter().any(|&s| s != 0.0) {
                heard_at = Some(block);
            }
        }
        // 0.5s at 44.1kHz = frame 22050, block 43 of 512 frames
        assert_eq!(heard_at, Some(43));
        assert_eq!(clock.load(Ordering::Relaxed), 100 * 512);
    }

    #[test]
    fn dead_voices_are_reaped() {
        let clock = Arc::new(AtomicU64::new(0));
        let mut engine = Engine::new(clock);
        let noise: Arc<[f32]> = (0..8820).map(|_| 0.5).collect();
        engine.handle_cmd(AudioCommand::Play(synth::build_hit(
            crate::shared::Instrument::Hat,
            0.0,
            1.0,
            &noise,
            44_100,
        )));
        assert_eq!(engine.voices.len(), 1);
        let mut out = vec![0.0f32; 4096 * 2];
        engine.render_block(&mut out, 2); // hat lives 50ms = 2205 frames
        assert!(engine.voices.is_empty());
    }
}
