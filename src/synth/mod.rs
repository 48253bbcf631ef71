// Percussion synthesis. Pure: (instrument, trigger time, velocity, shared
// noise buffer) -> voices. The same voices render against the live engine
// and the offline export target, which is what makes the exported WAV match
// what playback sounds like.

mod noise;
mod voice;

pub use noise::NoiseCache;
pub use voice::Voice;

use std::sync::Arc;

use crate::shared::Instrument;

/// Build the voices for one hit. `when` is absolute seconds in the target's
/// clock, `velocity` the track volume sampled at commit time.
pub fn build_hit(
    instrument: Instrument,
    when: f64,
    velocity: f32,
    noise: &Arc<[f32]>,
    sample_rate: u32,
) -> Vec<Voice> {
    match instrument {
        Instrument::Kick => vec![voice::kick(when, velocity, sample_rate)],
        Instrument::Snare => voice::snare(when, velocity, noise, sample_rate).to_vec(),
        Instrument::Hat => vec![voice::hat(when, velocity, noise, sample_rate)],
        Instrument::Clap => voice::clap(when, velocity, noise, sample_rate).to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn voice_counts_per_instrument() {
        let noise: Arc<[f32]> = (0..8820).map(|_| 0.1).collect();
        assert_eq!(build_hit(Instrument::Kick, 0.0, 1.0, &noise, 44_100).len(), 1);
        assert_eq!(build_hit(Instrument::Snare, 0.0, 1.0, &noise, 44_100).len(), 2);
        assert_eq!(build_hit(Instrument::Hat, 0.0, 1.0, &noise, 44_100).len(), 1);
        assert_eq!(build_hit(Instrument::Clap, 0.0, 1.0, &noise, 44_100).len(), 3);
    }
}
