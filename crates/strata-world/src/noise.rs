//! Seeded gradient noise.
//!
//! Every lattice node owns a gradient drawn from a `ChaCha8Rng` stream whose
//! seed is a hash of `(seed, node)`, so samples are reproducible across
//! platforms and independent of evaluation order.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Deserialize;

use std::f64::consts::TAU;

/// Peak magnitude of unscaled 2D gradient noise with unit gradients is `sqrt(1/2)`.
const SCALE_2D: f64 = std::f64::consts::SQRT_2;
/// Peak magnitude of unscaled 3D gradient noise with unit gradients is `sqrt(3/4)`.
const SCALE_3D: f64 = 1.154_700_538_379_251_5;

#[inline]
pub fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[inline]
pub fn hash2(seed: u64, x: i32, z: i32) -> u64 {
    let mut h = splitmix64(seed);
    h ^= (x as i64 as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    h ^= (z as i64 as u64).wrapping_mul(0x1656_67B1_9E37_79F9);
    splitmix64(h)
}

#[inline]
pub fn hash3(seed: u64, x: i32, y: i32, z: i32) -> u64 {
    let mut h = splitmix64(seed);
    h ^= (x as i64 as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    h ^= (y as i64 as u64).wrapping_mul(0xC2B2_AE3D_27D4_EB4F);
    h ^= (z as i64 as u64).wrapping_mul(0x1656_67B1_9E37_79F9);
    splitmix64(h)
}

#[inline]
fn fade(t: f64) -> f64 {
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

#[inline]
fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

fn gradient_2d(seed: u64, ix: i32, iz: i32) -> (f64, f64) {
    let mut rng = ChaCha8Rng::seed_from_u64(hash2(seed, ix, iz));
    let angle: f64 = rng.gen_range(0.0..TAU);
    (angle.cos(), angle.sin())
}

// Uniform on the unit sphere: z uniform in [-1, 1], azimuth uniform.
fn gradient_3d(seed: u64, ix: i32, iy: i32, iz: i32) -> (f64, f64, f64) {
    let mut rng = ChaCha8Rng::seed_from_u64(hash3(seed, ix, iy, iz));
    let z: f64 = rng.gen_range(-1.0..=1.0);
    let theta: f64 = rng.gen_range(0.0..TAU);
    let r = (1.0 - z * z).max(0.0).sqrt();
    (r * theta.cos(), r * theta.sin(), z)
}

/// 2D gradient noise, roughly in `[-1, 1]`. Zero at every lattice node.
pub fn gradient_noise_2d(seed: u64, x: f64, z: f64) -> f32 {
    let x0 = x.floor();
    let z0 = z.floor();
    let (ix, iz) = (x0 as i32, z0 as i32);
    let (fx, fz) = (x - x0, z - z0);

    let dot = |dx: i32, dz: i32| {
        let (gx, gz) = gradient_2d(seed, ix + dx, iz + dz);
        gx * (fx - f64::from(dx)) + gz * (fz - f64::from(dz))
    };

    let u = fade(fx);
    let v = fade(fz);
    let a = lerp(dot(0, 0), dot(1, 0), u);
    let b = lerp(dot(0, 1), dot(1, 1), u);
    (lerp(a, b, v) * SCALE_2D) as f32
}

/// 3D gradient noise, roughly in `[-1, 1]`. Zero at every lattice node.
pub fn gradient_noise_3d(seed: u64, x: f64, y: f64, z: f64) -> f32 {
    let x0 = x.floor();
    let y0 = y.floor();
    let z0 = z.floor();
    let (ix, iy, iz) = (x0 as i32, y0 as i32, z0 as i32);
    let (fx, fy, fz) = (x - x0, y - y0, z - z0);

    let dot = |dx: i32, dy: i32, dz: i32| {
        let (gx, gy, gz) = gradient_3d(seed, ix + dx, iy + dy, iz + dz);
        gx * (fx - f64::from(dx)) + gy * (fy - f64::from(dy)) + gz * (fz - f64::from(dz))
    };

    let u = fade(fx);
    let v = fade(fy);
    let w = fade(fz);
    let x00 = lerp(dot(0, 0, 0), dot(1, 0, 0), u);
    let x10 = lerp(dot(0, 1, 0), dot(1, 1, 0), u);
    let x01 = lerp(dot(0, 0, 1), dot(1, 0, 1), u);
    let x11 = lerp(dot(0, 1, 1), dot(1, 1, 1), u);
    let y0 = lerp(x00, x10, v);
    let y1 = lerp(x01, x11, v);
    (lerp(y0, y1, w) * SCALE_3D) as f32
}

/// Octave sum of gradient noise.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct Fractal {
    #[serde(default = "default_frequency")]
    pub frequency: f32,
    #[serde(default = "default_amplitude")]
    pub amplitude: f32,
    #[serde(default = "default_lacunarity")]
    pub lacunarity: f32,
    #[serde(default = "default_persistence")]
    pub persistence: f32,
    #[serde(default = "default_octaves")]
    pub octaves: u32,
}
fn default_frequency() -> f32 {
    0.01
}
fn default_amplitude() -> f32 {
    1.0
}
fn default_lacunarity() -> f32 {
    2.0
}
fn default_persistence() -> f32 {
    0.5
}
fn default_octaves() -> u32 {
    4
}
impl Default for Fractal {
    fn default() -> Self {
        Self {
            frequency: default_frequency(),
            amplitude: default_amplitude(),
            lacunarity: default_lacunarity(),
            persistence: default_persistence(),
            octaves: default_octaves(),
        }
    }
}

impl Fractal {
    #[inline]
    fn octave_seed(seed: u64, octave: u32) -> u64 {
        seed.wrapping_add(u64::from(octave))
    }

    pub fn sample_2d(&self, seed: u64, x: f64, z: f64) -> f32 {
        let mut freq = f64::from(self.frequency);
        let mut amp = self.amplitude;
        let mut sum = 0.0f32;
        for o in 0..self.octaves {
            sum += amp * gradient_noise_2d(Self::octave_seed(seed, o), x * freq, z * freq);
            freq *= f64::from(self.lacunarity);
            amp *= self.persistence;
        }
        sum
    }

    pub fn sample_3d(&self, seed: u64, x: f64, y: f64, z: f64) -> f32 {
        let mut freq = f64::from(self.frequency);
        let mut amp = self.amplitude;
        let mut sum = 0.0f32;
        for o in 0..self.octaves {
            sum += amp
                * gradient_noise_3d(Self::octave_seed(seed, o), x * freq, y * freq, z * freq);
            freq *= f64::from(self.lacunarity);
            amp *= self.persistence;
        }
        sum
    }

    /// Upper bound on `|sample|`.
    pub fn max_amplitude(&self) -> f32 {
        let mut amp = self.amplitude.abs();
        let mut total = 0.0;
        for _ in 0..self.octaves {
            total += amp;
            amp *= self.persistence.abs();
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_at_lattice_nodes() {
        for (x, z) in [(0.0, 0.0), (3.0, -7.0), (-12.0, 40.0)] {
            assert!(gradient_noise_2d(9, x, z).abs() < 1e-6);
            assert!(gradient_noise_3d(9, x, 5.0, z).abs() < 1e-6);
        }
    }

    #[test]
    fn same_seed_same_value() {
        let a = gradient_noise_3d(42, 1.25, -3.5, 7.75);
        let b = gradient_noise_3d(42, 1.25, -3.5, 7.75);
        assert_eq!(a.to_bits(), b.to_bits());
        let c = gradient_noise_3d(43, 1.25, -3.5, 7.75);
        assert_ne!(a.to_bits(), c.to_bits());
    }

    #[test]
    fn continuous_across_cell_edges() {
        let eps = 1e-6;
        let l = gradient_noise_2d(5, 2.0 - eps, 0.3);
        let r = gradient_noise_2d(5, 2.0 + eps, 0.3);
        assert!((l - r).abs() < 1e-3);
    }

    #[test]
    fn zero_octaves_is_zero() {
        let f = Fractal {
            octaves: 0,
            ..Fractal::default()
        };
        assert_eq!(f.sample_2d(1, 10.3, 4.1), 0.0);
        assert_eq!(f.sample_3d(1, 10.3, 2.0, 4.1), 0.0);
        assert_eq!(f.max_amplitude(), 0.0);
    }

    #[test]
    fn single_octave_matches_base_noise() {
        let f = Fractal {
            frequency: 0.5,
            amplitude: 3.0,
            octaves: 1,
            ..Fractal::default()
        };
        let expected = 3.0 * gradient_noise_2d(77, 1.7 * 0.5, -2.2 * 0.5);
        assert!((f.sample_2d(77, 1.7, -2.2) - expected).abs() < 1e-6);
    }
}
