//! Cubic Smoothing Spline
//!
//! Natural cubic smoothing spline in the Reinsch formulation. For knots
//! `t_0 < ... < t_{n-1}` with observations `y_i`, the fitted curve `f` minimizes
//!
//! ```text
//! Σ (y_i - f(t_i))² + λ ∫ f''(t)² dt
//! ```
//!
//! The caller does not pick λ directly. It gives a residual budget `s` (the
//! smoothing factor) and λ is chosen so that `Σ (y_i - f(t_i))² = s`:
//! - `s = 0` interpolates every point exactly
//! - if the least-squares line already fits within `s`, that line is returned
//! - otherwise λ is found by geometric bisection; the residual is monotone in λ
//!
//! The default budget is `s = n`, matching the usual FITPACK convention for
//! unit weights, so even noiseless data is smoothed.
//!
//! Each trial λ solves one symmetric pentadiagonal system `(R + λQᵀQ)γ = Qᵀy`
//! by banded LDLᵀ, so a fit costs O(n) per bisection step.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Smallest number of points the Reinsch system can be built from.
pub const MIN_SPLINE_POINTS: usize = 3;

/// Decades searched on either side of the initial λ guess when bracketing.
const MAX_BRACKET_STEPS: usize = 40;

/// Bisection iterations on log λ.
const MAX_BISECTION_STEPS: usize = 200;

/// Relative tolerance on the residual budget.
const RESIDUAL_TOLERANCE: f64 = 1e-9;

// ============================================================================
// Errors
// ============================================================================

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SplineError {
    #[error("Insufficient data: need {needed}, have {available}")]
    InsufficientData { needed: usize, available: usize },

    #[error("Length mismatch: {times} times, {values} values")]
    LengthMismatch { times: usize, values: usize },

    #[error("Knots must strictly increase (index {index}: {previous} then {current})")]
    UnorderedKnots {
        index: usize,
        previous: f64,
        current: f64,
    },

    #[error("Non-finite input at index {0}")]
    NonFinite(usize),

    #[error("Spline system is not positive definite (pivot {0})")]
    Singular(usize),

    #[error("Invalid smoothing factor: {0}")]
    InvalidSmoothing(f64),

    #[error("Invalid smoothing value {0:?}: expected a number or \"auto\"")]
    UnparsableSmoothing(String),
}

// ============================================================================
// Smoothing Factor
// ============================================================================

/// Residual budget for the smoothing spline.
///
/// In TOML this is either a number or the string `"auto"`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "SmoothingRepr", into = "SmoothingRepr")]
pub enum Smoothing {
    /// Budget equal to the number of fitted points
    #[default]
    Auto,
    /// Explicit residual sum-of-squares budget (ft²)
    Factor(f64),
}

impl Smoothing {
    /// Residual budget for a fit over `n` points.
    pub fn budget(self, n: usize) -> f64 {
        match self {
            Smoothing::Auto => n as f64,
            Smoothing::Factor(s) => s,
        }
    }

    pub fn validate(self) -> Result<(), SplineError> {
        match self {
            Smoothing::Factor(s) if !s.is_finite() || s < 0.0 => {
                Err(SplineError::InvalidSmoothing(s))
            }
            _ => Ok(()),
        }
    }
}

impl std::fmt::Display for Smoothing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Smoothing::Auto => write!(f, "auto"),
            Smoothing::Factor(s) => write!(f, "{s}"),
        }
    }
}

impl std::str::FromStr for Smoothing {
    type Err = SplineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("auto") || s.eq_ignore_ascii_case("default") {
            return Ok(Smoothing::Auto);
        }
        let factor: f64 = s
            .parse()
            .map_err(|_| SplineError::UnparsableSmoothing(s.to_string()))?;
        let smoothing = Smoothing::Factor(factor);
        smoothing.validate()?;
        Ok(smoothing)
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum SmoothingRepr {
    Factor(f64),
    Keyword(String),
}

impl TryFrom<SmoothingRepr> for Smoothing {
    type Error = String;

    fn try_from(repr: SmoothingRepr) -> Result<Self, Self::Error> {
        match repr {
            SmoothingRepr::Factor(s) => Ok(Smoothing::Factor(s)),
            SmoothingRepr::Keyword(k) => k
                .parse()
                .map_err(|_| format!("expected a number or \"auto\", got {k:?}")),
        }
    }
}

impl From<Smoothing> for SmoothingRepr {
    fn from(s: Smoothing) -> Self {
        match s {
            Smoothing::Auto => SmoothingRepr::Keyword("auto".to_string()),
            Smoothing::Factor(f) => SmoothingRepr::Factor(f),
        }
    }
}

// ============================================================================
// Fitted Spline
// ============================================================================

/// A fitted natural cubic spline, stored as knot values and second derivatives.
#[derive(Debug, Clone)]
pub struct SmoothingSpline {
    knots: Vec<f64>,
    values: Vec<f64>,
    second: Vec<f64>,
    lambda: f64,
    rss: f64,
}

impl SmoothingSpline {
    /// Fit a smoothing spline through `(times[i], values[i])`.
    pub fn fit(times: &[f64], values: &[f64], smoothing: Smoothing) -> Result<Self, SplineError> {
        check_inputs(times, values)?;
        smoothing.validate()?;

        let n = times.len();
        let budget = smoothing.budget(n);
        let system = ReinschSystem::new(times, values);

        if budget <= 0.0 {
            return system.solve(0.0);
        }

        let line = least_squares_line(times, values);
        if line.rss <= budget {
            return Ok(Self {
                knots: times.to_vec(),
                values: line.fitted,
                second: vec![0.0; n],
                lambda: f64::INFINITY,
                rss: line.rss,
            });
        }

        // λ scales like h³ for a unit change in residual behaviour
        let mean_h = (times[n - 1] - times[0]) / (n - 1) as f64;
        let guess = mean_h.powi(3).max(f64::MIN_POSITIVE);

        let mut hi = guess;
        let mut hi_fit = system.solve(hi)?;
        let mut steps = 0;
        while hi_fit.rss < budget {
            steps += 1;
            if steps > MAX_BRACKET_STEPS {
                return Ok(hi_fit);
            }
            hi *= 10.0;
            hi_fit = system.solve(hi)?;
        }

        let mut lo = hi / 10.0;
        let mut lo_fit = system.solve(lo)?;
        steps = 0;
        while lo_fit.rss > budget {
            steps += 1;
            if steps > MAX_BRACKET_STEPS {
                return Ok(lo_fit);
            }
            lo /= 10.0;
            lo_fit = system.solve(lo)?;
        }

        let mut best = if (hi_fit.rss - budget).abs() < (budget - lo_fit.rss).abs() {
            hi_fit
        } else {
            lo_fit
        };
        for _ in 0..MAX_BISECTION_STEPS {
            if (best.rss - budget).abs() <= RESIDUAL_TOLERANCE * budget {
                break;
            }
            let mid = (lo * hi).sqrt();
            if mid <= lo || mid >= hi {
                break;
            }
            let fit = system.solve(mid)?;
            if fit.rss > budget {
                hi = mid;
            } else {
                lo = mid;
            }
            best = fit;
        }

        tracing::debug!(
            points = n,
            budget,
            lambda = best.lambda,
            rss = best.rss,
            "smoothing spline fitted"
        );
        Ok(best)
    }

    /// Value and first derivative at `x`.
    ///
    /// Outside the knot range the spline continues as a straight line, which is
    /// the natural boundary condition.
    pub fn evaluate(&self, x: f64) -> (f64, f64) {
        let n = self.knots.len();
        let first = self.knots[0];
        let last = self.knots[n - 1];

        if x < first {
            let (v, d) = self.evaluate_interval(0, first);
            return (v + d * (x - first), d);
        }
        if x > last {
            let (v, d) = self.evaluate_interval(n - 2, last);
            return (v + d * (x - last), d);
        }

        let i = self.knots.partition_point(|&k| k <= x).saturating_sub(1).min(n - 2);
        self.evaluate_interval(i, x)
    }

    pub fn value(&self, x: f64) -> f64 {
        self.evaluate(x).0
    }

    pub fn derivative(&self, x: f64) -> f64 {
        self.evaluate(x).1
    }

    /// Smoothing parameter actually used (`INFINITY` for the straight-line fit).
    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    /// Residual sum of squares at the knots.
    pub fn rss(&self) -> f64 {
        self.rss
    }

    /// Fitted values at the knots.
    pub fn fitted(&self) -> &[f64] {
        &self.values
    }

    fn evaluate_interval(&self, i: usize, x: f64) -> (f64, f64) {
        let h = self.knots[i + 1] - self.knots[i];
        let a = (self.knots[i + 1] - x) / h;
        let b = 1.0 - a;
        let (g0, g1) = (self.values[i], self.values[i + 1]);
        let (c0, c1) = (self.second[i], self.second[i + 1]);

        let value = a * g0 + b * g1 + ((a * a * a - a) * c0 + (b * b * b - b) * c1) * h * h / 6.0;
        let slope = (g1 - g0) / h - (3.0 * a * a - 1.0) / 6.0 * h * c0
            + (3.0 * b * b - 1.0) / 6.0 * h * c1;
        (value, slope)
    }
}

fn check_inputs(times: &[f64], values: &[f64]) -> Result<(), SplineError> {
    if times.len() != values.len() {
        return Err(SplineError::LengthMismatch {
            times: times.len(),
            values: values.len(),
        });
    }
    if times.len() < MIN_SPLINE_POINTS {
        return Err(SplineError::InsufficientData {
            needed: MIN_SPLINE_POINTS,
            available: times.len(),
        });
    }
    for (i, (t, y)) in times.iter().zip(values).enumerate() {
        if !t.is_finite() || !y.is_finite() {
            return Err(SplineError::NonFinite(i));
        }
    }
    for i in 1..times.len() {
        if times[i] <= times[i - 1] {
            return Err(SplineError::UnorderedKnots {
                index: i,
                previous: times[i - 1],
                current: times[i],
            });
        }
    }
    Ok(())
}

// ============================================================================
// Least-Squares Line (λ → ∞ limit)
// ============================================================================

struct LineFit {
    fitted: Vec<f64>,
    rss: f64,
}

fn least_squares_line(times: &[f64], values: &[f64]) -> LineFit {
    let n = times.len() as f64;
    let t_mean = times.iter().sum::<f64>() / n;
    let y_mean = values.iter().sum::<f64>() / n;

    let (sxx, sxy) = times
        .iter()
        .zip(values)
        .fold((0.0, 0.0), |(sxx, sxy), (t, y)| {
            let dt = t - t_mean;
            (sxx + dt * dt, sxy + dt * (y - y_mean))
        });
    let slope = if sxx > 0.0 { sxy / sxx } else { 0.0 };

    let fitted: Vec<f64> = times.iter().map(|t| y_mean + slope * (t - t_mean)).collect();
    let rss = values
        .iter()
        .zip(&fitted)
        .map(|(y, g)| (y - g) * (y - g))
        .sum();
    LineFit { fitted, rss }
}

// ============================================================================
// Reinsch System
// ============================================================================

/// Column `m` of Q holds three non-zeros, at rows `m`, `m+1`, `m+2`.
#[derive(Debug, Clone, Copy)]
struct QColumn([f64; 3]);

/// Precomputed band matrices for one set of knots and observations.
struct ReinschSystem<'a> {
    knots: &'a [f64],
    observed: &'a [f64],
    q: Vec<QColumn>,
    r_diag: Vec<f64>,
    r_off: Vec<f64>,
    qtq_diag: Vec<f64>,
    qtq_off1: Vec<f64>,
    qtq_off2: Vec<f64>,
    qty: Vec<f64>,
}

impl<'a> ReinschSystem<'a> {
    fn new(knots: &'a [f64], observed: &'a [f64]) -> Self {
        let n = knots.len();
        let m = n - 2;
        let h: Vec<f64> = knots.windows(2).map(|w| w[1] - w[0]).collect();

        let q: Vec<QColumn> = (0..m)
            .map(|j| {
                QColumn([
                    1.0 / h[j],
                    -1.0 / h[j] - 1.0 / h[j + 1],
                    1.0 / h[j + 1],
                ])
            })
            .collect();

        let r_diag = (0..m).map(|j| (h[j] + h[j + 1]) / 3.0).collect();
        let r_off = (0..m.saturating_sub(1)).map(|j| h[j + 1] / 6.0).collect();

        let qtq_diag = q.iter().map(|c| c.0.iter().map(|v| v * v).sum()).collect();
        let qtq_off1 = (0..m.saturating_sub(1))
            .map(|j| q[j].0[1] * q[j + 1].0[0] + q[j].0[2] * q[j + 1].0[1])
            .collect();
        let qtq_off2 = (0..m.saturating_sub(2))
            .map(|j| q[j].0[2] * q[j + 2].0[0])
            .collect();

        let qty = q
            .iter()
            .enumerate()
            .map(|(j, c)| c.0[0] * observed[j] + c.0[1] * observed[j + 1] + c.0[2] * observed[j + 2])
            .collect();

        Self {
            knots,
            observed,
            q,
            r_diag,
            r_off,
            qtq_diag,
            qtq_off1,
            qtq_off2,
            qty,
        }
    }

    /// Fit for a fixed λ.
    fn solve(&self, lambda: f64) -> Result<SmoothingSpline, SplineError> {
        let m = self.q.len();

        let diag: Vec<f64> = (0..m)
            .map(|j| self.r_diag[j] + lambda * self.qtq_diag[j])
            .collect();
        let off1: Vec<f64> = (0..m.saturating_sub(1))
            .map(|j| self.r_off[j] + lambda * self.qtq_off1[j])
            .collect();
        let off2: Vec<f64> = self.qtq_off2.iter().map(|v| lambda * v).collect();

        let gamma = solve_pentadiagonal(&diag, &off1, &off2, &self.qty)?;

        // g = y - λQγ
        let n = self.knots.len();
        let mut values = self.observed.to_vec();
        let mut rss = 0.0;
        for (i, value) in values.iter_mut().enumerate() {
            // Row i of Q touches columns i-2, i-1 and i
            let q_gamma: f64 = (i.saturating_sub(2)..=i)
                .filter(|&j| j < m)
                .map(|j| self.q[j].0[i - j] * gamma[j])
                .sum();
            let residual = lambda * q_gamma;
            *value -= residual;
            rss += residual * residual;
        }

        let mut second = Vec::with_capacity(n);
        second.push(0.0);
        second.extend_from_slice(&gamma);
        second.push(0.0);

        Ok(SmoothingSpline {
            knots: self.knots.to_vec(),
            values,
            second,
            lambda,
            rss,
        })
    }
}

/// Solve a symmetric positive-definite pentadiagonal system by banded LDLᵀ.
///
/// `diag` has length m, `off1` holds entries (i, i+1), `off2` holds (i, i+2).
fn solve_pentadiagonal(
    diag: &[f64],
    off1: &[f64],
    off2: &[f64],
    rhs: &[f64],
) -> Result<Vec<f64>, SplineError> {
    let m = diag.len();
    let mut d = vec![0.0; m];
    let mut l1 = vec![0.0; m];
    let mut l2 = vec![0.0; m];

    for i in 0..m {
        if i >= 2 {
            l2[i] = off2[i - 2] / d[i - 2];
        }
        if i >= 1 {
            let coupling = if i >= 2 { l2[i] * d[i - 2] * l1[i - 1] } else { 0.0 };
            l1[i] = (off1[i - 1] - coupling) / d[i - 1];
        }
        let mut pivot = diag[i];
        if i >= 1 {
            pivot -= l1[i] * l1[i] * d[i - 1];
        }
        if i >= 2 {
            pivot -= l2[i] * l2[i] * d[i - 2];
        }
        if !(pivot > 0.0) || !pivot.is_finite() {
            return Err(SplineError::Singular(i));
        }
        d[i] = pivot;
    }

    // L z = rhs
    let mut x = rhs.to_vec();
    for i in 0..m {
        if i >= 1 {
            x[i] -= l1[i] * x[i - 1];
        }
        if i >= 2 {
            x[i] -= l2[i] * x[i - 2];
        }
    }
    for i in 0..m {
        x[i] /= d[i];
    }
    // Lᵀ x = z / d
    for i in (0..m).rev() {
        if i + 1 < m {
            x[i] -= l1[i + 1] * x[i + 1];
        }
        if i + 2 < m {
            x[i] -= l2[i + 2] * x[i + 2];
        }
    }
    Ok(x)
}
