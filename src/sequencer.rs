// Lookahead playback scheduling.
//
// OS timers are nowhere near sample-accurate, so we never schedule sounds
// against wall-clock delay. A coarse poll (25ms) looks a short window ahead
// of the output clock and commits any step whose trigger time falls inside
// it; the committed voices carry absolute frame stamps and the audio engine
// fires them on its own precise clock. Poll jitter inside the lookahead
// margin is inaudible.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::Sender;

use crate::audio_api::AudioCommand;
use crate::clock;
use crate::pipeline::song::SharedSong;
use crate::shared::{EngineConfig, STEPS, TRACKS};
use crate::synth::{self, NoiseCache};

/// One step the transport decided to commit: which step, and the absolute
/// output-clock time (swing already applied) its hits must fire at.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepCommit {
    pub step: usize,
    pub time: f64,
}

/// The pure tick core. Holds the step cursor and the monotonically
/// advancing next-trigger time; knows nothing about threads or audio, so
/// tests can drive it with any clock they like.
#[derive(Clone, Debug)]
pub struct Transport {
    step: usize,
    next_trigger: f64,
    lookahead: f64,
}

impl Transport {
    pub fn new(lookahead: f64) -> Self {
        Self { step: 0, next_trigger: 0.0, lookahead }
    }

    /// Reset for a fresh run: step 0, first trigger a little after `now` so
    /// the first hit never lands in the past.
    pub fn arm(&mut self, now: f64, start_offset: f64) {
        self.step = 0;
        self.next_trigger = now + start_offset;
    }

    /// One poll. Commits at most one step, and only when its trigger time
    /// has entered the lookahead window. `next_trigger` advances by exactly
    /// one step duration per commit, so drift never accumulates no matter
    /// how unevenly the polls arrive. Tempo applies from the next commit
    /// on; already-stamped triggers are never revised.
    pub fn tick(&mut self, now: f64, bpm: u32, swing: u32) -> Option<StepCommit> {
        if self.next_trigger > now + self.lookahead {
            return None;
        }
        let step_dur = clock::step_duration(bpm);
        let mut time = self.next_trigger;
        if swing > 0 && self.step % 2 == 1 {
            time += clock::swing_offset(step_dur, swing);
        }
        let commit = StepCommit { step: self.step, time };
        self.next_trigger += step_dur;
        self.step = (self.step + 1) % STEPS;
        Some(commit)
    }
}

/// Drives a Transport from a poll thread against the live output clock,
/// turning commits into voices for the engine.
pub struct Scheduler {
    tx: Sender<AudioCommand>,
    out_clock: Arc<AtomicU64>,
    sample_rate: u32,
    config: EngineConfig,
    song: SharedSong,
    noise: Arc<NoiseCache>,
    running: Arc<AtomicBool>,
    current_step: Arc<AtomicUsize>,
    worker: Option<JoinHandle<()>>,
}

impl Scheduler {
    pub fn new(
        tx: Sender<AudioCommand>,
        out_clock: Arc<AtomicU64>,
        sample_rate: u32,
        config: EngineConfig,
        song: SharedSong,
    ) -> Self {
        Self {
            tx,
            out_clock,
            sample_rate,
            config,
            song,
            noise: Arc::new(NoiseCache::new()),
            running: Arc::new(AtomicBool::new(false)),
            current_step: Arc::new(AtomicUsize::new(0)),
            worker: None,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.worker.is_some()
    }

    /// Step to highlight in the grid, 0..15.
    pub fn current_step(&self) -> usize {
        self.current_step.load(Ordering::Relaxed)
    }

    /// Arm the transport and spawn the poll thread. Calling while already
    /// playing tears the old thread down first, so there is never more than
    /// one poll loop alive.
    pub fn start(&mut self) {
        self.stop();

        self.running.store(true, Ordering::Relaxed);
        self.current_step.store(0, Ordering::Relaxed);

        let tx = self.tx.clone();
        let out_clock = Arc::clone(&self.out_clock);
        let running = Arc::clone(&self.running);
        let current_step = Arc::clone(&self.current_step);
        let song = Arc::clone(&self.song);
        let noise = Arc::clone(&self.noise);
        let sample_rate = self.sample_rate;
        let config = self.config;

        let handle = thread::spawn(move || {
            let now = out_clock.load(Ordering::Relaxed) as f64 / sample_rate as f64;
            let mut transport = Transport::new(config.lookahead);
            transport.arm(now, config.start_offset);

            // first pass runs immediately, then the poll cadence takes over
            while running.load(Ordering::Relaxed) {
                let (pattern, volumes, bpm, swing) = {
                    let g = song.read().unwrap();
                    (g.pattern, g.volumes, g.bpm, g.swing)
                };
                let now = out_clock.load(Ordering::Relaxed) as f64 / sample_rate as f64;

                if let Some(commit) = transport.tick(now, bpm, swing) {
                    let noise_buf = noise.get_or_create(sample_rate);
                    let mut voices = Vec::new();
                    for (row, track) in TRACKS.iter().enumerate() {
                        if pattern[row][commit.step] {
                            voices.extend(synth::build_hit(
                                track.instrument,
                                commit.time,
                                volumes[row],
                                &noise_buf,
                                sample_rate,
                            ));
                        }
                    }
                    if !voices.is_empty() {
                        let _ = tx.try_send(AudioCommand::Play(voices));
                    }
                    current_step.store(commit.step, Ordering::Relaxed);
                }

                thread::sleep(Duration::from_millis(config.poll_interval_ms));
            }
        });
        self.worker = Some(handle);
    }

    /// Stop scheduling. Idempotent; hits already handed to the engine ring
    /// out on their own.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
        self.current_step.store(0, Ordering::Relaxed);
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::song::Song;

    #[test]
    fn triggers_advance_by_exactly_one_step_duration() {
        let mut t = Transport::new(0.08);
        t.arm(0.0, 0.05);
        let dur = clock::step_duration(120); // 0.125

        // drive with a deliberately jittery poll clock
        let mut commits = Vec::new();
        let mut now = 0.0;
        let jitter = [0.021, 0.031, 0.019, 0.028, 0.025, 0.035, 0.015];
        let mut j = 0;
        while commits.len() < 64 {
            if let Some(c) = t.tick(now, 120, 0) {
                commits.push(c);
            }
            now += jitter[j % jitter.len()];
            j += 1;
        }

        for (n, c) in commits.iter().enumerate() {
            let ideal = 0.05 + n as f64 * dur;
            assert!(
                (c.time - ideal).abs() < 1e-9,
                "step {n} drifted: {} vs {}",
                c.time,
                ideal
            );
            assert_eq!(c.step, n % STEPS);
        }
    }

    #[test]
    fn nothing_commits_outside_the_lookahead_window() {
        let mut t = Transport::new(0.08);
        t.arm(0.0, 0.05);
        // trigger at 0.05 is inside now+0.08
        assert!(t.tick(0.0, 120, 0).is_some());
        // next trigger at 0.175 is not inside 0.0+0.08
        assert!(t.tick(0.0, 120, 0).is_none());
        // ...but is inside 0.1+0.08
        assert!(t.tick(0.1, 120, 0).is_some());
    }

    #[test]
    fn at_most_one_step_per_tick() {
        let mut t = Transport::new(0.08);
        t.arm(0.0, 0.0);
        // even far behind, a single tick commits a single step
        let c = t.tick(10.0, 120, 0).unwrap();
        assert_eq!(c.step, 0);
        let c = t.tick(10.0, 120, 0).unwrap();
        assert_eq!(c.step, 1);
    }

    #[test]
    fn swing_delays_odd_steps_only() {
        let mut t = Transport::new(10.0); // window wide open
        t.arm(0.0, 0.0);
        let dur = clock::step_duration(100); // 0.15
        let offset = clock::swing_offset(dur, 100); // 0.05

        for n in 0..16 {
            let c = t.tick(0.0, 100, 100).unwrap();
            let base = n as f64 * dur;
            let expect = if n % 2 == 1 { base + offset } else { base };
            assert!((c.time - expect).abs() < 1e-9);
            // swung trigger still lands before the next nominal step
            assert!(c.time < base + dur);
        }
    }

    #[test]
    fn tempo_change_applies_from_the_next_step() {
        let mut t = Transport::new(10.0);
        t.arm(0.0, 0.0);
        let a = t.tick(0.0, 120, 0).unwrap();
        // bpm changes between polls; the already-computed trigger stands
        let b = t.tick(0.0, 60, 0).unwrap();
        let c = t.tick(0.0, 60, 0).unwrap();
        assert_eq!(a.time, 0.0);
        assert!((b.time - 0.125).abs() < 1e-9); // spaced by the old tempo
        assert!((c.time - 0.375).abs() < 1e-9); // now spaced by the new one
    }

    fn test_scheduler() -> (Scheduler, crossbeam_channel::Receiver<AudioCommand>) {
        let (tx, rx) = crossbeam_channel::bounded(256);
        let clock = Arc::new(AtomicU64::new(0));
        let song = Song::new_shared();
        {
            let mut g = song.write().unwrap();
            g.clear();
            g.pattern[0][0] = true; // one kick on the downbeat
        }
        let sched = Scheduler::new(tx, clock, 44_100, EngineConfig::default(), song);
        (sched, rx)
    }

    #[test]
    fn restart_never_doubles_the_poll_loop() {
        let (mut sched, rx) = test_scheduler();
        // with a frozen clock only step 0 ever enters the window
        sched.start();
        thread::sleep(Duration::from_millis(60)); // let the first pass land
        sched.start();
        thread::sleep(Duration::from_millis(120));
        sched.stop();

        let commits: Vec<_> = rx.try_iter().collect();
        // two starts, one commit each; a duplicated timer would have sent more
        assert_eq!(commits.len(), 2);
    }

    #[test]
    fn stop_is_idempotent() {
        let (mut sched, _rx) = test_scheduler();
        sched.start();
        assert!(sched.is_playing());
        sched.stop();
        sched.stop();
        assert!(!sched.is_playing());
        assert_eq!(sched.current_step(), 0);
    }

    #[test]
    fn stopped_scheduler_commits_nothing() {
        let (mut sched, rx) = test_scheduler();
        sched.start();
        thread::sleep(Duration::from_millis(60));
        sched.stop();
        while rx.try_recv().is_ok() {}
        thread::sleep(Duration::from_millis(80));
        assert!(rx.try_recv().is_err());
    }
}
