//! Response curves mapping a distance to a desirability in `[-1, 1]`
//!
//! `-1` is the infeasible sentinel: it is returned only outside the allowed
//! range, never for an admissible distance.

/// Infeasible sentinel.
pub const INFEASIBLE: f32 = -1.0;

/// Lowest value an admissible distance can score.
pub const MIN_FEASIBLE: f32 = -1.0 + f32::EPSILON;

/// Shape constant of the bump; the curve reaches -1 at the range limits.
const SHAPE: f64 = -1.1;

/// `(λmin, λ0, λmax)`: admissible range and ideal distance
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CurveParams {
    pub lambda_min: f32,
    pub lambda_0: f32,
    pub lambda_max: f32,
}

impl CurveParams {
    pub const fn new(lambda_min: f32, lambda_0: f32, lambda_max: f32) -> Self {
        Self { lambda_min, lambda_0, lambda_max }
    }

    pub fn scaled(self, factor: f32) -> Self {
        Self::new(self.lambda_min * factor, self.lambda_0 * factor, self.lambda_max * factor)
    }

    pub fn balance(&self, d: f32) -> f32 {
        balance(d, self.lambda_min, self.lambda_0, self.lambda_max)
    }

    pub fn attraction_repulsion(&self, d: f32) -> f32 {
        attraction_repulsion(d, self.lambda_min, self.lambda_0, self.lambda_max)
    }
}

/// Gaussian-like bump equal to 1 at `lambda_0` and falling to -1 at `lambda_edge`.
fn bump(d: f64, lambda_0: f64, lambda_edge: f64) -> f64 {
    if d == lambda_0 || lambda_edge == lambda_0 {
        return 1.0;
    }
    let x = (d - lambda_0) / (lambda_edge - lambda_0);
    let k = ((SHAPE - 1.0) / (SHAPE + 1.0)).ln();
    (1.0 - SHAPE) * (-(x * x) * k).exp() + SHAPE
}

/// Too close below `lambda_min`, ideal at `lambda_0`, too far above `lambda_max`.
pub fn balance(d: f32, lambda_min: f32, lambda_0: f32, lambda_max: f32) -> f32 {
    if d.is_nan() || d < lambda_min || d > lambda_max {
        return INFEASIBLE;
    }
    let edge = if d < lambda_0 { lambda_min } else { lambda_max };
    let value = bump(d as f64, lambda_0 as f64, edge as f64) as f32;
    value.clamp(MIN_FEASIBLE, 1.0)
}

/// Repulsive (infeasible) below `lambda_min`, rising to 1 at `lambda_0`,
/// then fading smoothly to indifference (0) at `lambda_max` and beyond.
pub fn attraction_repulsion(d: f32, lambda_min: f32, lambda_0: f32, lambda_max: f32) -> f32 {
    if d.is_nan() || d < lambda_min {
        return INFEASIBLE;
    }
    if d > lambda_max {
        return 0.0;
    }
    if d <= lambda_0 {
        let value = bump(d as f64, lambda_0 as f64, lambda_min as f64) as f32;
        return value.clamp(MIN_FEASIBLE, 1.0);
    }
    let t = ((d - lambda_0) / (lambda_max - lambda_0)) as f64;
    (0.5 * (1.0 + (std::f64::consts::PI * t).cos())) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_balance_outside_range_is_infeasible() {
        assert_eq!(balance(1.9, 2.0, 5.0, 10.0), INFEASIBLE);
        assert_eq!(balance(10.1, 2.0, 5.0, 10.0), INFEASIBLE);
        assert_eq!(balance(f32::INFINITY, 2.0, 5.0, 10.0), INFEASIBLE);
        assert_eq!(balance(f32::NAN, 2.0, 5.0, 10.0), INFEASIBLE);
    }

    #[test]
    fn test_balance_inside_range() {
        let (lo, ideal, hi) = (2.0, 5.0, 10.0);
        let mut d = lo;
        while d <= hi {
            let v = balance(d, lo, ideal, hi);
            assert!(v > -1.0 && v <= 1.0, "balance({}) = {}", d, v);
            d += 0.25;
        }
        assert_eq!(balance(ideal, lo, ideal, hi), 1.0);
        assert!(balance(lo, lo, ideal, hi) < -0.99);
        assert!(balance(hi, lo, ideal, hi) < -0.99);
    }

    #[test]
    fn test_balance_peaks_at_ideal() {
        let (lo, ideal, hi) = (2.0, 5.0, 10.0);
        assert!(balance(4.0, lo, ideal, hi) < balance(5.0, lo, ideal, hi));
        assert!(balance(6.0, lo, ideal, hi) < balance(5.0, lo, ideal, hi));
        assert!(balance(3.0, lo, ideal, hi) < balance(4.0, lo, ideal, hi));
        assert!(balance(9.0, lo, ideal, hi) < balance(7.0, lo, ideal, hi));
    }

    #[test]
    fn test_balance_closed_form() {
        // Halfway between ideal and edge: 2.1 * 21^(-1/4) - 1.1
        let expected = 2.1 * 21f64.powf(-0.25) - 1.1;
        let v = balance(7.5, 2.0, 5.0, 10.0) as f64;
        assert!((v - expected).abs() < 1e-5);
    }

    #[test]
    fn test_balance_degenerate_ideal_at_minimum() {
        assert_eq!(balance(3.0, 3.0, 3.0, 8.0), 1.0);
        assert!(balance(5.0, 3.0, 3.0, 8.0) > -1.0);
    }

    #[test]
    fn test_attraction_repulsion() {
        let (lo, ideal, hi) = (3.0, 8.0, 20.0);
        assert_eq!(attraction_repulsion(2.0, lo, ideal, hi), INFEASIBLE);
        assert_eq!(attraction_repulsion(25.0, lo, ideal, hi), 0.0);
        assert_eq!(attraction_repulsion(8.0, lo, ideal, hi), 1.0);
        assert!(attraction_repulsion(20.0, lo, ideal, hi).abs() < 1e-6);
        assert!((attraction_repulsion(14.0, lo, ideal, hi) - 0.5).abs() < 1e-5);
        assert!(attraction_repulsion(3.0, lo, ideal, hi) > -1.0);
    }
}
