// One voice = one percussive hit, alive for the length of its envelope.
// Voices are built on the scheduler (or export) thread and only rendered by
// the audio target, so the render path never allocates.

use std::f32::consts::TAU;
use std::sync::Arc;

/// Exponential ramps to exactly zero are undefined (the curve never gets
/// there), so every envelope bottoms out here instead.
const ENV_FLOOR: f32 = 0.001;

/// Piecewise-exponential gain envelope over a handful of breakpoints.
/// Between points the value follows v0 * (v1/v0)^(frac), before the first
/// point it holds the first value, after the last it holds the last.
#[derive(Clone, Debug)]
struct ExpEnv {
    points: Vec<(f64, f32)>,
}

impl ExpEnv {
    fn new(points: &[(f64, f32)]) -> Self {
        let points = points
            .iter()
            .map(|&(t, v)| (t, v.max(ENV_FLOOR)))
            .collect();
        Self { points }
    }

    fn value(&self, t: f64) -> f32 {
        let first = self.points[0];
        if t <= first.0 {
            return first.1;
        }
        for pair in self.points.windows(2) {
            let (t0, v0) = pair[0];
            let (t1, v1) = pair[1];
            if t < t1 {
                let frac = ((t - t0) / (t1 - t0)) as f32;
                return v0 * (v1 / v0).powf(frac);
            }
        }
        self.points[self.points.len() - 1].1
    }
}

/// RBJ biquad, direct form I. Coefficients fixed at voice build time.
#[derive(Clone, Copy, Debug)]
struct Biquad {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

impl Biquad {
    fn highpass(sample_rate: f32, cutoff: f32, q: f32) -> Self {
        let w0 = TAU * cutoff / sample_rate;
        let (sin, cos) = w0.sin_cos();
        let alpha = sin / (2.0 * q);
        let a0 = 1.0 + alpha;
        Self {
            b0: (1.0 + cos) / 2.0 / a0,
            b1: -(1.0 + cos) / a0,
            b2: (1.0 + cos) / 2.0 / a0,
            a1: -2.0 * cos / a0,
            a2: (1.0 - alpha) / a0,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        }
    }

    fn bandpass(sample_rate: f32, center: f32, q: f32) -> Self {
        let w0 = TAU * center / sample_rate;
        let (sin, cos) = w0.sin_cos();
        let alpha = sin / (2.0 * q);
        let a0 = 1.0 + alpha;
        Self {
            b0: alpha / a0,
            b1: 0.0,
            b2: -alpha / a0,
            a1: -2.0 * cos / a0,
            a2: (1.0 - alpha) / a0,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        }
    }

    fn process(&mut self, x: f32) -> f32 {
        let y = self.b0 * x + self.b1 * self.x1 + self.b2 * self.x2
            - self.a1 * self.y1
            - self.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = x;
        self.y2 = self.y1;
        self.y1 = y;
        y
    }
}

/// Exponential pitch glide, then hold the target.
#[derive(Clone, Copy, Debug)]
struct PitchSweep {
    from: f32,
    to: f32,
    dur: f64,
}

impl PitchSweep {
    fn freq_at(&self, t: f64) -> f32 {
        if t >= self.dur {
            self.to
        } else {
            self.from * (self.to / self.from).powf((t / self.dur) as f32)
        }
    }
}

#[derive(Clone, Debug)]
enum Source {
    Sine { phase: f32, freq: f32, sweep: Option<PitchSweep> },
    Triangle { phase: f32, freq: f32 },
    Noise { buf: Arc<[f32]>, idx: usize, filter: Biquad },
}

impl Source {
    // advances internal state; call exactly once per produced sample
    fn next(&mut self, t: f64, sample_rate: f32) -> f32 {
        match self {
            Source::Sine { phase, freq, sweep } => {
                let f = sweep.map_or(*freq, |s| s.freq_at(t));
                let out = (TAU * *phase).sin();
                *phase = (*phase + f / sample_rate).fract();
                out
            }
            Source::Triangle { phase, freq } => {
                let p = *phase;
                // starts at 0 rising, like an oscillator phase origin
                let out = if p < 0.25 {
                    4.0 * p
                } else if p < 0.75 {
                    2.0 - 4.0 * p
                } else {
                    4.0 * p - 4.0
                };
                *phase = (p + *freq / sample_rate).fract();
                out
            }
            Source::Noise { buf, idx, filter } => {
                let raw = buf[*idx % buf.len()];
                *idx += 1;
                filter.process(raw)
            }
        }
    }
}

#[derive(Clone, Debug)]
pub struct Voice {
    /// Absolute frame in the target's clock at which this voice begins.
    start_frame: u64,
    /// Frames produced so far.
    pos: u64,
    /// Total lifetime in frames.
    len: u64,
    sample_rate: f32,
    env: ExpEnv,
    source: Source,
    active: bool,
}

impl Voice {
    fn new(when: f64, lifetime: f64, sample_rate: u32, env: ExpEnv, source: Source) -> Self {
        let sr = sample_rate as f64;
        Self {
            start_frame: (when * sr).round() as u64,
            pos: 0,
            len: (lifetime * sr).ceil() as u64,
            sample_rate: sample_rate as f32,
            env,
            source,
            active: true,
        }
    }

    pub fn active(&self) -> bool {
        self.active
    }

    pub fn start_frame(&self) -> u64 {
        self.start_frame
    }

    /// Mix this voice into a mono block starting at absolute frame
    /// `block_start`. Blocks must be fed sequentially; the oscillator phase
    /// and filter state advance one sample at a time.
    pub fn render_into(&mut self, block_start: u64, out: &mut [f32]) {
        if !self.active {
            return;
        }
        for (i, slot) in out.iter_mut().enumerate() {
            let frame = block_start + i as u64;
            if frame < self.start_frame {
                continue;
            }
            if self.pos >= self.len {
                self.active = false;
                return;
            }
            let t = self.pos as f64 / self.sample_rate as f64;
            let sample = self.source.next(t, self.sample_rate);
            *slot += sample * self.env.value(t);
            self.pos += 1;
        }
        if self.pos >= self.len {
            self.active = false;
        }
    }
}

// ── Recipes ───────────────────────────────────────────────────────
//
// Trigger times are absolute seconds in the target's own clock; velocity is
// the track volume sampled at commit time. Lifetimes and envelope constants
// follow the classic analog-style recipes: a swept sine for the kick,
// filtered noise plus a tonal layer for the snare, short bright noise for
// the hat, and three overlapping bursts for the clap.

pub fn kick(when: f64, velocity: f32, sample_rate: u32) -> Voice {
    Voice::new(
        when,
        0.32,
        sample_rate,
        ExpEnv::new(&[(0.0, ENV_FLOOR), (0.005, velocity), (0.25, ENV_FLOOR)]),
        Source::Sine {
            phase: 0.0,
            freq: 150.0,
            sweep: Some(PitchSweep { from: 150.0, to: 45.0, dur: 0.12 }),
        },
    )
}

pub fn snare(when: f64, velocity: f32, noise: &Arc<[f32]>, sample_rate: u32) -> [Voice; 2] {
    let rattle = Voice::new(
        when,
        0.2,
        sample_rate,
        ExpEnv::new(&[(0.0, velocity * 0.7), (0.15, ENV_FLOOR)]),
        Source::Noise {
            buf: Arc::clone(noise),
            idx: 0,
            filter: Biquad::highpass(sample_rate as f32, 1000.0, HIGHPASS_Q),
        },
    );
    let body = Voice::new(
        when,
        0.21,
        sample_rate,
        ExpEnv::new(&[(0.0, velocity * 0.3), (0.2, ENV_FLOOR)]),
        Source::Triangle { phase: 0.0, freq: 200.0 },
    );
    [rattle, body]
}

pub fn hat(when: f64, velocity: f32, noise: &Arc<[f32]>, sample_rate: u32) -> Voice {
    Voice::new(
        when,
        0.05,
        sample_rate,
        ExpEnv::new(&[(0.0, velocity * 0.25), (0.05, ENV_FLOOR)]),
        Source::Noise {
            buf: Arc::clone(noise),
            idx: 0,
            filter: Biquad::highpass(sample_rate as f32, 6000.0, HIGHPASS_Q),
        },
    )
}

pub fn clap(when: f64, velocity: f32, noise: &Arc<[f32]>, sample_rate: u32) -> [Voice; 3] {
    // three bursts 10ms apart read like multiple hands clapping
    [0.0, 0.01, 0.02].map(|offset| {
        Voice::new(
            when + offset,
            0.12,
            sample_rate,
            ExpEnv::new(&[(0.0, velocity * 0.35), (0.12, ENV_FLOOR)]),
            Source::Noise {
                buf: Arc::clone(noise),
                idx: 0,
                filter: Biquad::bandpass(sample_rate as f32, 2000.0, BANDPASS_Q),
            },
        )
    })
}

const HIGHPASS_Q: f32 = std::f32::consts::FRAC_1_SQRT_2;
const BANDPASS_Q: f32 = 1.0;
