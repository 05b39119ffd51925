use std::ops::Range;

use log::debug;
use serde::Serialize;

use crate::{InterpolatorErr, Result};

const N: usize = 4;
const MAX_ITERS: usize = 500;
const MAX_DAMPING: f64 = 1e16;

/// Fractions of the `b` range used as extra starting points.
const RATE_STARTS: [f64; 6] = [0.005, 0.01, 0.02, 0.05, 0.1, 0.2];

/// The parameters of `a * exp(-b * (x - c)) + d`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DecayFit {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
}

impl DecayFit {
    fn from_params(p: [f64; N]) -> Self {
        let [a, b, c, d] = p;
        Self { a, b, c, d }
    }

    pub fn eval(&self, x: f64) -> f64 {
        self.a * (-self.b * (x - self.c)).exp() + self.d
    }
}

/// Box constraints on `[a, b, c, d]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub lower: [f64; N],
    pub upper: [f64; N],
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            lower: [0.; N],
            upper: [1., 100., 0.5, 0.1],
        }
    }
}

impl Bounds {
    fn midpoint(&self) -> [f64; N] {
        std::array::from_fn(|i| (self.lower[i] + self.upper[i]) / 2.)
    }

    fn clamp(&self, p: [f64; N]) -> [f64; N] {
        std::array::from_fn(|i| p[i].clamp(self.lower[i], self.upper[i]))
    }
}

/// Least squares fit of `a * exp(-b * (x - c)) + d` to `(xs, ys)` within `bounds`.
///
/// Levenberg-Marquardt steps projected onto the bounds, started from the bounds' midpoint and
/// from a few other decay rates, the best of all runs wins.
pub fn fit_decay(xs: &[f64], ys: &[f64], bounds: &Bounds) -> Result<DecayFit> {
    if xs.len() != ys.len() {
        return Err(InterpolatorErr::InvalidInput(format!(
            "{} abscissas for {} ordinates",
            xs.len(),
            ys.len()
        )));
    }

    if xs.len() < N {
        return Err(InterpolatorErr::InvalidInput(format!(
            "at least {N} points are needed to fit a decay, got {}",
            xs.len()
        )));
    }

    if (0..N).any(|i| !(bounds.lower[i] <= bounds.upper[i])) {
        return Err(InterpolatorErr::InvalidInput(format!("invalid bounds {bounds:?}")));
    }

    let mid = bounds.midpoint();
    let starts = std::iter::once(mid).chain(RATE_STARTS.iter().map(|f| {
        let mut start = mid;
        start[1] = bounds.lower[1] + (bounds.upper[1] - bounds.lower[1]) * f;
        start
    }));

    let (p, cost) = starts
        .map(|start| levenberg_marquardt(start, xs, ys, bounds))
        .min_by(|(_, a), (_, b)| a.total_cmp(b))
        .unwrap_or((mid, f64::INFINITY));

    if !cost.is_finite() {
        return Err(InterpolatorErr::InvalidInput(
            "the decay fit did not converge".into(),
        ));
    }

    debug!(cost = cost; "fitted decay {p:?}");
    Ok(DecayFit::from_params(p))
}

/// Fits the decay to `log10(loss)` against `log10(epoch)` over the rows of `window` of the
/// history's positive epochs.
pub fn fit_loss_curve(
    history: &[(usize, f64)],
    window: Range<usize>,
    bounds: &Bounds,
) -> Result<DecayFit> {
    let points: Vec<(f64, f64)> = history
        .iter()
        .filter(|(epoch, _)| *epoch > 0)
        .skip(window.start)
        .take(window.len())
        .map(|&(epoch, loss)| ((epoch as f64).log10(), loss.log10()))
        .collect();

    let (xs, ys): (Vec<f64>, Vec<f64>) = points.into_iter().unzip();
    fit_decay(&xs, &ys, bounds)
}

fn model(p: &[f64; N], x: f64) -> f64 {
    p[0] * (-p[1] * (x - p[2])).exp() + p[3]
}

fn jacobian(p: &[f64; N], x: f64) -> [f64; N] {
    let e = (-p[1] * (x - p[2])).exp();
    [e, -p[0] * (x - p[2]) * e, p[0] * p[1] * e, 1.]
}

fn cost(p: &[f64; N], xs: &[f64], ys: &[f64]) -> f64 {
    let sum: f64 = xs
        .iter()
        .zip(ys)
        .map(|(&x, &y)| (model(p, x) - y).powi(2))
        .sum();

    0.5 * sum
}

fn levenberg_marquardt(start: [f64; N], xs: &[f64], ys: &[f64], bounds: &Bounds) -> ([f64; N], f64) {
    let mut p = bounds.clamp(start);
    let mut c = cost(&p, xs, ys);
    let mut damping = 1e-3;

    for _ in 0..MAX_ITERS {
        let mut jtj = [[0.; N]; N];
        let mut jtr = [0.; N];

        for (&x, &y) in xs.iter().zip(ys) {
            let j = jacobian(&p, x);
            let r = model(&p, x) - y;

            for row in 0..N {
                jtr[row] += j[row] * r;
                for col in 0..N {
                    jtj[row][col] += j[row] * j[col];
                }
            }
        }

        loop {
            let mut m = jtj;
            for i in 0..N {
                m[i][i] += damping * (jtj[i][i] + 1e-12);
            }

            let Some(delta) = solve(m, jtr.map(|g| -g)) else {
                damping *= 10.;
                if damping > MAX_DAMPING {
                    return (p, c);
                }
                continue;
            };

            let q = bounds.clamp(std::array::from_fn(|i| p[i] + delta[i]));
            let cq = cost(&q, xs, ys);

            if cq < c {
                let done = c - cq <= 1e-15 * c;
                p = q;
                c = cq;
                damping = (damping / 10.).max(1e-12);

                if done || c < 1e-30 {
                    return (p, c);
                }
                break;
            }

            damping *= 10.;
            if damping > MAX_DAMPING {
                return (p, c);
            }
        }
    }

    (p, c)
}

/// Gaussian elimination with partial pivoting.
fn solve(mut m: [[f64; N]; N], mut v: [f64; N]) -> Option<[f64; N]> {
    for k in 0..N {
        let pivot = (k..N).max_by(|&a, &b| m[a][k].abs().total_cmp(&m[b][k].abs()))?;
        if !(m[pivot][k].abs() > 1e-300) {
            return None;
        }

        m.swap(k, pivot);
        v.swap(k, pivot);

        for i in k + 1..N {
            let factor = m[i][k] / m[k][k];
            for j in k..N {
                m[i][j] -= factor * m[k][j];
            }
            v[i] -= factor * v[k];
        }
    }

    let mut x = [0.; N];
    for i in (0..N).rev() {
        let tail: f64 = (i + 1..N).map(|j| m[i][j] * x[j]).sum();
        x[i] = (v[i] - tail) / m[i][i];
    }

    x.iter().all(|v| v.is_finite()).then_some(x)
}
