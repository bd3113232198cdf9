//! Random helpers for gameplay tuning ranges.

use glam::Vec3;
use rand::Rng;

/// `-1.0` or `1.0` with equal probability.
pub fn random_sign<R: Rng + ?Sized>(rng: &mut R) -> f32 {
    if rng.gen_bool(0.5) { -1.0 } else { 1.0 }
}

/// A vector whose components are each drawn uniformly between the matching
/// components of `min` and `max`.
pub fn random_between<R: Rng + ?Sized>(rng: &mut R, min: Vec3, max: Vec3) -> Vec3 {
    let t = Vec3::new(rng.r#gen(), rng.r#gen(), rng.r#gen());
    min + (max - min) * t
}

/// Like [`random_between`], with each component's sign flipped at random.
pub fn random_signed_between<R: Rng + ?Sized>(rng: &mut R, min: Vec3, max: Vec3) -> Vec3 {
    let magnitude = random_between(rng, min, max);
    let sign = Vec3::new(random_sign(rng), random_sign(rng), random_sign(rng));
    magnitude * sign
}
