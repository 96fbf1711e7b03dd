use std::f64::consts::PI;

use nalgebra::Vector3;
use rand::Rng;
use rand_distr::{Distribution, Uniform};

use super::traits::SpinModel;

/// Classical Heisenberg spins: unit vectors in R^3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Heisenberg;

impl SpinModel for Heisenberg {
    type Spin = Vector3<f64>;

    const NAME: &'static str = "heisenberg";
    const COMPONENTS: &'static [&'static str] = &["sx", "sy", "sz"];

    /// Uniform on the sphere: azimuth in [0, 2π), cos(polar) in [-1, 1].
    fn random_spin<R: Rng + ?Sized>(rng: &mut R) -> Vector3<f64> {
        let phi: f64 = Uniform::new(0.0, 2.0 * PI).sample(rng);
        let cos_theta: f64 = Uniform::new_inclusive(-1.0, 1.0).sample(rng);
        let sin_theta = (1.0 - cos_theta * cos_theta).sqrt();
        Vector3::new(sin_theta * phi.cos(), sin_theta * phi.sin(), cos_theta)
    }

    /// A fresh, independent direction; the current spin is not perturbed.
    fn sample_trial<R: Rng + ?Sized>(_current: &Vector3<f64>, rng: &mut R) -> Vector3<f64> {
        Self::random_spin(rng)
    }

    fn dot(a: &Vector3<f64>, b: &Vector3<f64>) -> f64 {
        a.dot(b)
    }

    fn moment(spin: &Vector3<f64>) -> Vector3<f64> {
        *spin
    }

    /// Length of the summed moment.
    fn project(moment: &Vector3<f64>) -> f64 {
        moment.norm()
    }

    fn extend_components(spin: &Vector3<f64>, out: &mut Vec<f64>) {
        out.extend(spin.iter().copied());
    }
}
