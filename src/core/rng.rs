// Copyright @yucwang 2026

use crate::math::constants::{Float, Vector2f};

/// 64-bit LCG; the high 32 bits are returned.
#[derive(Debug, Clone)]
pub struct LcgRng {
    state: u64,
}

impl LcgRng {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Seeds an independent stream for one worker thread of one render run.
    pub fn for_thread(base_seed: u64, run: u64, thread_id: usize) -> Self {
        let mut rng = Self::new(mix64(base_seed ^ mix64(run.wrapping_add(0x9E37_79B9_7F4A_7C15))
                                      ^ ((thread_id as u64) << 32)));
        rng.next_u32();
        rng
    }

    pub fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_mul(6364136223846793005).wrapping_add(1);
        (self.state >> 32) as u32
    }

    /// Uniform in `[0, 1)`.
    pub fn next_f32(&mut self) -> Float {
        (self.next_u32() >> 8) as Float * (1.0 / (1u32 << 24) as Float)
    }

    pub fn next_vec2(&mut self) -> Vector2f {
        let x = self.next_f32();
        Vector2f::new(x, self.next_f32())
    }
}

fn mix64(mut v: u64) -> u64 {
    v ^= v >> 31;
    v = v.wrapping_mul(0x7fb5_d329_728e_a185);
    v ^= v >> 27;
    v = v.wrapping_mul(0x81da_def4_bc2d_d44d);
    v ^ (v >> 33)
}

#[cfg(test)]
mod tests {
    use super::LcgRng;

    #[test]
    fn test_next_f32_in_unit_interval() {
        let mut rng = LcgRng::new(7);
        for _ in 0..10_000 {
            let v = rng.next_f32();
            assert!(v >= 0.0 && v < 1.0);
        }
    }

    #[test]
    fn test_thread_streams_differ() {
        let mut a = LcgRng::for_thread(1, 0, 0);
        let mut b = LcgRng::for_thread(1, 0, 1);
        let sa: Vec<u32> = (0..4).map(|_| a.next_u32()).collect();
        let sb: Vec<u32> = (0..4).map(|_| b.next_u32()).collect();
        assert_ne!(sa, sb);
    }
}
