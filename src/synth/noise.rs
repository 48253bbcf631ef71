use std::sync::{Arc, OnceLock};

/// Length of the shared noise buffer in seconds.
pub const NOISE_SECONDS: f64 = 0.2;

/// Memoized white-noise buffer, one per audio target. Every noise-based hit
/// scheduled against a target reads from the same buffer, so all hats and
/// claps in a session share one spectral fingerprint and no per-hit
/// allocation happens. The live engine keeps one cache for its lifetime;
/// each offline render builds its own.
pub struct NoiseCache {
    buf: OnceLock<Arc<[f32]>>,
}

impl NoiseCache {
    pub fn new() -> Self {
        Self { buf: OnceLock::new() }
    }

    pub fn get_or_create(&self, sample_rate: u32) -> Arc<[f32]> {
        self.buf.get_or_init(|| generate(sample_rate)).clone()
    }
}

impl Default for NoiseCache {
    fn default() -> Self {
        Self::new()
    }
}

fn generate(sample_rate: u32) -> Arc<[f32]> {
    let len = ((sample_rate as f64 * NOISE_SECONDS).round() as usize).max(1);
    (0..len).map(|_| fastrand::f32() * 2.0 - 1.0).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_is_memoized_per_cache() {
        let cache = NoiseCache::new();
        let a = cache.get_or_create(44_100);
        let b = cache.get_or_create(44_100);
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn buffer_length_and_range() {
        let cache = NoiseCache::new();
        let buf = cache.get_or_create(44_100);
        assert_eq!(buf.len(), 8820); // 0.2s at 44.1kHz
        assert!(buf.iter().all(|s| (-1.0..=1.0).contains(s)));
    }
}
