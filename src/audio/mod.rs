use std::sync::Arc;
use std::sync::atomic::AtomicU64;

use anyhow::Context;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::Sender;

use crate::audio_api::AudioCommand;
use crate::shared::OutputState;

mod engine;

use engine::Engine;

/// Handle to the live output. Owns the cpal stream; exposes the output
/// clock (seconds since stream creation) and a resume/pause lifecycle. The
/// stream starts suspended and is resumed on the first play press, which is
/// also where platforms that gate audio behind a user action get unlocked.
pub struct AudioHandle {
    tx: Sender<AudioCommand>,
    clock: Arc<AtomicU64>,
    sample_rate: u32,
    state: OutputState,
    _output_stream: cpal::Stream,
}

impl AudioHandle {
    pub fn command_sender(&self) -> Sender<AudioCommand> {
        self.tx.clone()
    }

    /// Frames-rendered counter, the output's own clock. Divide by the
    /// sample rate for seconds; starts at 0 when the stream is created.
    pub fn clock(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.clock)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn state(&self) -> OutputState {
        self.state
    }

    pub fn resume(&mut self) -> anyhow::Result<()> {
        self._output_stream
            .play()
            .context("could not resume audio output")?;
        self.state = OutputState::Running;
        Ok(())
    }
}

/// Bring up the default output device. Failure here is fatal to playback
/// for the whole session; the caller surfaces it and exits.
pub fn start_audio() -> anyhow::Result<AudioHandle> {
    let (tx, rx) = crossbeam_channel::bounded::<AudioCommand>(1024);

    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .context("no default output device")?;
    let config = device
        .default_output_config()
        .context("no default output config")?;

    let sample_rate = config.sample_rate();
    let channels = config.channels() as usize;
    let clock = Arc::new(AtomicU64::new(0));

    match config.sample_format() {
        cpal::SampleFormat::F32 => {
            let stream_config: cpal::StreamConfig = config.into();
            let mut engine = Engine::new(Arc::clone(&clock));
            let err_fn = |err| eprintln!("audio output stream error: {err}");

            let output_stream = device.build_output_stream(
                &stream_config,
                move |data: &mut [f32], _info| {
                    while let Ok(cmd) = rx.try_recv() {
                        engine.handle_cmd(cmd);
                    }
                    engine.render_block(data, channels);
                },
                err_fn,
                None,
            )?;

            Ok(AudioHandle {
                tx,
                clock,
                sample_rate,
                state: OutputState::Suspended,
                _output_stream: output_stream,
            })
        }
        _ => anyhow::bail!("unsupported sample format (only f32 supported for now)"),
    }
}
