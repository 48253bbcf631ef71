// Offline rendering and WAV export. The render replays the whole pattern a
// fixed number of bars into an in-memory stereo buffer at 44.1kHz using the
// exact same voices as live playback, then encodes 16-bit PCM.
//
// Known divergence from live playback, kept on purpose: exports always use
// velocity 1.0 and no swing offset. Live playback honors per-track volume
// and swing; the exported file will not. This mirrors the product's
// established behavior and is not a bug to quietly unify.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::clock;
use crate::shared::{EngineConfig, NUM_TRACKS, STEPS, TRACKS};
use crate::synth::{self, NoiseCache};

pub struct RenderedAudio {
    pub left: Vec<f32>,
    pub right: Vec<f32>,
    pub sample_rate: u32,
}

impl RenderedAudio {
    /// Frame count per channel.
    pub fn frames(&self) -> usize {
        self.left.len()
    }
}

/// Render `bars` repeats of the pattern. Blocks until the buffer is fully
/// computed. One noise buffer serves the entire render.
pub fn render_pattern(
    bpm: u32,
    pattern: &[[bool; STEPS]; NUM_TRACKS],
    bars: usize,
    config: &EngineConfig,
) -> RenderedAudio {
    let sample_rate = config.export_sample_rate;
    let step_dur = clock::step_duration(bpm);
    let total_secs = step_dur * STEPS as f64 * bars as f64;
    let frames = (total_secs * sample_rate as f64).ceil() as usize;

    let noise = NoiseCache::new();
    let noise_buf = noise.get_or_create(sample_rate);

    let mut voices = Vec::new();
    for bar in 0..bars {
        for step in 0..STEPS {
            let when =
                (bar * STEPS + step) as f64 * step_dur + config.export_start_offset;
            for (row, track) in TRACKS.iter().enumerate() {
                if pattern[row][step] {
                    voices.extend(synth::build_hit(
                        track.instrument,
                        when,
                        1.0,
                        &noise_buf,
                        sample_rate,
                    ));
                }
            }
        }
    }

    // mono graph into a stereo target: both channels carry the same mix
    let mut mono = vec![0.0f32; frames];
    for voice in &mut voices {
        voice.render_into(0, &mut mono);
    }

    RenderedAudio {
        left: mono.clone(),
        right: mono,
        sample_rate,
    }
}

/// Clamp to [-1,1] and scale asymmetrically so -1.0 maps to i16::MIN and
/// +1.0 to i16::MAX.
fn to_i16(sample: f32) -> i16 {
    let s = sample.clamp(-1.0, 1.0);
    if s < 0.0 {
        (s * 32768.0) as i16
    } else {
        (s * 32767.0) as i16
    }
}

/// Encode as a canonical 44-byte-header PCM16 WAV, interleaved stereo,
/// little-endian.
pub fn encode_wav(audio: &RenderedAudio) -> anyhow::Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: audio.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
        for i in 0..audio.frames() {
            writer.write_sample(to_i16(audio.left[i]))?;
            writer.write_sample(to_i16(audio.right[i]))?;
        }
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}

/// Beat name -> safe file name, the way the download button labels it.
pub fn wav_file_name(beat_name: &str) -> String {
    let mut stem: String = beat_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    if stem.is_empty() {
        stem.push_str("beat");
    }
    stem + ".wav"
}

/// Render, encode, and write the file. Writes through a temp name so a
/// failure partway leaves no half-written WAV behind.
pub fn export_wav(
    beat_name: &str,
    bpm: u32,
    pattern: &[[bool; STEPS]; NUM_TRACKS],
    bars: usize,
    config: &EngineConfig,
    out_dir: &Path,
) -> anyhow::Result<PathBuf> {
    let audio = render_pattern(bpm, pattern, bars, config);
    let bytes = encode_wav(&audio)?;

    let path = out_dir.join(wav_file_name(beat_name));
    let tmp = path.with_extension("wav.part");
    std::fs::write(&tmp, &bytes)
        .with_context(|| format!("could not write {}", tmp.display()))?;
    std::fs::rename(&tmp, &path)
        .with_context(|| format!("could not finish {}", path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn silent_pattern() -> [[bool; STEPS]; NUM_TRACKS] {
        [[false; STEPS]; NUM_TRACKS]
    }

    fn u32_at(bytes: &[u8], at: usize) -> u32 {
        u32::from_le_bytes(bytes[at..at + 4].try_into().unwrap())
    }

    fn u16_at(bytes: &[u8], at: usize) -> u16 {
        u16::from_le_bytes(bytes[at..at + 2].try_into().unwrap())
    }

    #[test]
    fn wav_header_is_bit_exact() {
        let audio = RenderedAudio {
            left: vec![0.0; 44_100],
            right: vec![0.0; 44_100],
            sample_rate: 44_100,
        };
        let bytes = encode_wav(&audio).unwrap();
        let data_bytes = 44_100u32 * 2 * 2;

        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(u32_at(&bytes, 4), 36 + data_bytes);
        assert_eq!(&bytes[8..12], b"WAVE");
        assert_eq!(&bytes[12..16], b"fmt ");
        assert_eq!(u32_at(&bytes, 16), 16);
        assert_eq!(u16_at(&bytes, 20), 1); // PCM
        assert_eq!(u16_at(&bytes, 22), 2); // channels
        assert_eq!(u32_at(&bytes, 24), 44_100);
        assert_eq!(u32_at(&bytes, 28), 44_100 * 2 * 2); // byte rate
        assert_eq!(u16_at(&bytes, 32), 4); // block align
        assert_eq!(u16_at(&bytes, 34), 16); // bits per sample
        assert_eq!(&bytes[36..40], b"data");
        assert_eq!(u32_at(&bytes, 40), data_bytes);
        assert_eq!(bytes.len(), 44 + data_bytes as usize);
    }

    #[test]
    fn sample_scaling_is_asymmetric() {
        assert_eq!(to_i16(-1.0), -32768);
        assert_eq!(to_i16(1.0), 32767);
        assert_eq!(to_i16(0.0), 0);
        assert_eq!(to_i16(-2.0), -32768); // clamped
        assert_eq!(to_i16(2.0), 32767);
    }

    #[test]
    fn single_kick_lands_at_the_start_offset() {
        let mut pattern = silent_pattern();
        pattern[0][0] = true;
        let config = EngineConfig::default();
        let audio = render_pattern(120, &pattern, 1, &config);

        // 16 steps at 0.125s = 2.0s
        assert_eq!(audio.frames(), (2.0f64 * 44_100.0).ceil() as usize);
        assert_eq!(audio.left, audio.right);

        let offset_frame = (0.02 * 44_100.0) as usize; // 882
        assert!(audio.left[..offset_frame].iter().all(|&s| s == 0.0));
        assert!(audio.left[offset_frame..offset_frame + 4410]
            .iter()
            .any(|&s| s != 0.0));
        // silent again once the 320ms voice has rung out
        let tail = offset_frame + (0.32f64 * 44_100.0).ceil() as usize + 1;
        assert!(audio.left[tail..].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn tone_only_renders_are_byte_identical() {
        let mut pattern = silent_pattern();
        pattern[0][0] = true;
        pattern[0][10] = true;
        let config = EngineConfig::default();
        let a = encode_wav(&render_pattern(100, &pattern, 2, &config)).unwrap();
        let b = encode_wav(&render_pattern(100, &pattern, 2, &config)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn noise_renders_keep_identical_length_and_header() {
        let mut pattern = silent_pattern();
        pattern[2][0] = true; // hat
        pattern[3][8] = true; // clap
        let config = EngineConfig::default();
        let a = encode_wav(&render_pattern(100, &pattern, 1, &config)).unwrap();
        let b = encode_wav(&render_pattern(100, &pattern, 1, &config)).unwrap();
        assert_eq!(a.len(), b.len());
        assert_eq!(&a[..44], &b[..44]);
    }

    #[test]
    fn export_covers_the_requested_bars() {
        let mut pattern = silent_pattern();
        pattern[0][0] = true;
        let config = EngineConfig::default();
        // 4 bars at 60bpm: 0.25 * 16 * 4 = 16s
        let audio = render_pattern(60, &pattern, 4, &config);
        assert_eq!(audio.frames(), 16 * 44_100);
        // the kick repeats every bar, check bar 3's downbeat
        let bar3 = (3.0 * 16.0 * 0.25 * 44_100.0) as usize + 882;
        assert!(audio.left[bar3..bar3 + 4410].iter().any(|&s| s != 0.0));
    }

    #[test]
    fn file_name_is_sanitized() {
        assert_eq!(wav_file_name("My First Beat"), "my_first_beat.wav");
        assert_eq!(wav_file_name("***"), "___.wav");
        assert_eq!(wav_file_name(""), "beat.wav");
    }

    #[test]
    fn export_writes_a_playable_file() {
        let dir = std::env::temp_dir().join(format!("kidbeat-export-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let mut pattern = silent_pattern();
        pattern[0][0] = true;
        let config = EngineConfig::default();
        let path = export_wav("demo", 120, &pattern, 1, &config, &dir).unwrap();
        assert_eq!(path.file_name().unwrap(), "demo.wav");

        let reader = hound::WavReader::open(&path).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 2);
        assert_eq!(spec.sample_rate, 44_100);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(reader.len(), 2 * 88_200); // interleaved samples
        let _ = std::fs::remove_dir_all(&dir);
    }
}
