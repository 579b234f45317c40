//! The traits that define the function to be integrated.
//!
//! The adaptive grid hands the integrand all pending points of an iteration
//! in one call, so the central trait is [`BatchIntegrand`]. Point-wise and
//! SIMD integrands are turned into batched ones with the [`Parallel`] and
//! [`Simd`] adapters, and any batched closure with [`BatchFn`].

use std::fmt::Debug;
use std::marker::PhantomData;
use std::ops::{Add, AddAssign, Mul};

use num_complex::Complex64;
use num_traits::Zero;
use rayon::prelude::*;
use wide::f64x4;

/// A value an integrand can return: `f64` or `Complex64`.
pub trait Scalar:
    Copy
    + Debug
    + PartialEq
    + Zero
    + Add<Output = Self>
    + AddAssign
    + Mul<f64, Output = Self>
    + Send
    + Sync
    + 'static
{
    /// Absolute value (modulus for complex values).
    fn modulus(self) -> f64;

    /// Returns `true` if no component is NaN or infinite.
    fn is_finite(self) -> bool;
}

impl Scalar for f64 {
    fn modulus(self) -> f64 {
        self.abs()
    }

    fn is_finite(self) -> bool {
        f64::is_finite(self)
    }
}

impl Scalar for Complex64 {
    fn modulus(self) -> f64 {
        self.norm()
    }

    fn is_finite(self) -> bool {
        Complex64::is_finite(self)
    }
}

/// A function evaluated on many points at once.
///
/// `points` is a flat row-major buffer holding `points.len() / dim()`
/// points of `dim()` coordinates each. The returned vector must hold one
/// value per point, in the same order. Implementations must be free of
/// side effects.
pub trait BatchIntegrand<T: Scalar> {
    /// Returns the number of dimensions of the integration space.
    fn dim(&self) -> usize;

    /// Evaluates the function on every point of `points`.
    fn eval_batch(&self, points: &[f64]) -> Vec<T>;
}

/// A trait representing a function to be integrated point by point.
///
/// Users of the library must implement this trait for their function.
pub trait Integrand {
    /// Returns the number of dimensions of the integration space.
    fn dim(&self) -> usize;

    /// Evaluates the function at a given point `x`.
    ///
    /// # Arguments
    ///
    /// * `x`: A slice of `f64` representing the point in the integration space.
    ///
    /// # Returns
    ///
    /// The value of the function `f(x)`.
    fn eval(&self, x: &[f64]) -> f64;
}

/// A trait representing a function to be integrated using SIMD.
pub trait SimdIntegrand {
    /// Returns the number of dimensions of the integration space.
    fn dim(&self) -> usize;

    /// Evaluates the function on a packet of 4 points.
    ///
    /// `points[d]` holds coordinate `d` of all four points.
    fn eval_simd(&self, points: &[f64x4]) -> f64x4;
}

/// Evaluates a point-wise [`Integrand`] over a batch in parallel with Rayon.
#[derive(Debug, Clone, Copy)]
pub struct Parallel<F>(pub F);

impl<F: Integrand + Sync> BatchIntegrand<f64> for Parallel<F> {
    fn dim(&self) -> usize {
        self.0.dim()
    }

    fn eval_batch(&self, points: &[f64]) -> Vec<f64> {
        let dim = self.0.dim();
        points
            .par_chunks_exact(dim)
            .map(|x| self.0.eval(x))
            .collect()
    }
}

/// Evaluates a [`SimdIntegrand`] over a batch, four points per call.
///
/// A trailing batch of fewer than four points is padded by repeating the
/// last point; the padded results are dropped.
#[derive(Debug, Clone, Copy)]
pub struct Simd<F>(pub F);

impl<F: SimdIntegrand + Sync> BatchIntegrand<f64> for Simd<F> {
    fn dim(&self) -> usize {
        self.0.dim()
    }

    fn eval_batch(&self, points: &[f64]) -> Vec<f64> {
        let dim = self.0.dim();
        let n_points = points.len() / dim;
        let packets: Vec<[f64; 4]> = points
            .par_chunks(4 * dim)
            .map(|chunk| {
                let n_lanes = chunk.len() / dim;
                let mut packet = vec![f64x4::splat(0.0); dim];
                for (d, lane) in packet.iter_mut().enumerate() {
                    let mut coords = [0.0; 4];
                    for (i, c) in coords.iter_mut().enumerate() {
                        let p = i.min(n_lanes - 1);
                        *c = chunk[p * dim + d];
                    }
                    *lane = f64x4::from(coords);
                }
                self.0.eval_simd(&packet).to_array()
            })
            .collect();

        packets.into_iter().flatten().take(n_points).collect()
    }
}

/// Wraps a batched closure `Fn(&[f64]) -> Vec<T>` as a [`BatchIntegrand`].
pub struct BatchFn<F, T> {
    dim: usize,
    func: F,
    _value: PhantomData<fn() -> T>,
}

impl<F, T> BatchFn<F, T>
where
    F: Fn(&[f64]) -> Vec<T>,
    T: Scalar,
{
    /// Wraps `func` as a `dim`-dimensional integrand.
    pub fn new(dim: usize, func: F) -> Self {
        BatchFn {
            dim,
            func,
            _value: PhantomData,
        }
    }
}

impl<F, T> BatchIntegrand<T> for BatchFn<F, T>
where
    F: Fn(&[f64]) -> Vec<T>,
    T: Scalar,
{
    fn dim(&self) -> usize {
        self.dim
    }

    fn eval_batch(&self, points: &[f64]) -> Vec<T> {
        (self.func)(points)
    }
}

impl<F, T> Debug for BatchFn<F, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchFn").field("dim", &self.dim).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Sum;

    impl Integrand for Sum {
        fn dim(&self) -> usize {
            2
        }

        fn eval(&self, x: &[f64]) -> f64 {
            x[0] + 10.0 * x[1]
        }
    }

    impl SimdIntegrand for Sum {
        fn dim(&self) -> usize {
            2
        }

        fn eval_simd(&self, points: &[f64x4]) -> f64x4 {
            points[0] + f64x4::splat(10.0) * points[1]
        }
    }

    fn points(n: usize) -> Vec<f64> {
        (0..n).flat_map(|i| [i as f64, 0.5 * i as f64]).collect()
    }

    #[test]
    fn test_parallel_preserves_order() {
        let values = Parallel(Sum).eval_batch(&points(7));
        let expected: Vec<f64> = (0..7).map(|i| 6.0 * i as f64).collect();
        assert_eq!(values, expected);
    }

    #[test]
    fn test_simd_handles_partial_packet() {
        let values = Simd(Sum).eval_batch(&points(7));
        let expected: Vec<f64> = (0..7).map(|i| 6.0 * i as f64).collect();
        assert_eq!(values, expected);
        assert!(Simd(Sum).eval_batch(&[]).is_empty());
    }

    #[test]
    fn test_batch_fn_complex() {
        let f = BatchFn::new(1, |pts: &[f64]| {
            pts.iter().map(|&x| Complex64::new(x, -x)).collect()
        });
        assert_eq!(f.dim(), 1);
        let values = f.eval_batch(&[1.0, 2.0]);
        assert_eq!(values[1], Complex64::new(2.0, -2.0));
        assert_eq!(values[1].modulus(), 8.0_f64.sqrt());
    }
}
