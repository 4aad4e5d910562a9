// ============================================================
// Layer 5 — SMO Solver for Epsilon-SVR
// ============================================================
// Sequential Minimal Optimisation over the epsilon-SVR dual.
//
// The l training rows are doubled into 2l variables:
//
//   t <  l : αₜ  with sign +1, linear term p = ε − yₜ
//   t >= l : αₜ* with sign −1, linear term p = ε + yₜ₋ₗ
//
// Every variable lies in [0, C]. Each step picks a pair (i, j):
//   i → the maximal violator of the KKT conditions
//   j → the partner giving the largest second-order decrease
//       of the objective, using quad = Kᵢᵢ + Kⱼⱼ − 2Kᵢⱼ
// and solves the two-variable subproblem analytically, clipping
// back into the box. The gradient is then updated in O(l).
//
// Optimisation stops when the violation gap falls below `tol`
// or after `max_iter` steps (logged as a warning).
//
// Kernel rows are computed on demand and kept in an LRU cache
// whose capacity is derived from `kernel_cache_mb`.

use lru::LruCache;
use std::num::NonZeroUsize;
use std::rc::Rc;

use crate::domain::features::FeatureVector;
use crate::ml::model::{rbf_kernel, SvrSettings};

/// Lower bound on quad to keep the step finite
const TAU: f64 = 1e-12;

/// Dual solution mapped back to one coefficient per training row
pub(crate) struct Solution {
    /// αᵢ − αᵢ*
    pub coef:       Vec<f64>,
    pub intercept:  f64,
    pub iterations: usize,
}

pub(crate) fn solve_epsilon_svr(
    x:        &[FeatureVector],
    y:        &[f64],
    c:        f64,
    gamma:    f64,
    settings: &SvrSettings,
) -> Solution {
    let l = x.len();
    let mut smo = Smo::new(x, y, c, gamma, settings);
    let iterations = smo.optimise(settings.tol, settings.max_iter);
    let rho = smo.rho();

    let coef = (0..l).map(|t| smo.alpha[t] - smo.alpha[t + l]).collect();
    Solution { coef, intercept: -rho, iterations }
}

// ─── Kernel row cache ─────────────────────────────────────────────────────────
struct KernelRows<'a> {
    x:     &'a [FeatureVector],
    gamma: f64,
    cache: LruCache<usize, Rc<[f64]>>,
}

impl<'a> KernelRows<'a> {
    fn new(x: &'a [FeatureVector], gamma: f64, cache_mb: usize) -> Self {
        let row_bytes = x.len().max(1) * std::mem::size_of::<f64>();
        let rows      = (cache_mb.saturating_mul(1 << 20) / row_bytes).max(2);
        let capacity  = NonZeroUsize::new(rows).unwrap_or(NonZeroUsize::MIN);
        Self { x, gamma, cache: LruCache::new(capacity) }
    }

    /// K(xᵢ, ·) over all training rows
    fn row(&mut self, i: usize) -> Rc<[f64]> {
        if let Some(row) = self.cache.get(&i) {
            return Rc::clone(row);
        }
        let xi = &self.x[i];
        let row: Rc<[f64]> = self.x.iter().map(|xt| rbf_kernel(xi, xt, self.gamma)).collect();
        self.cache.put(i, Rc::clone(&row));
        row
    }
}

// ─── Solver state ─────────────────────────────────────────────────────────────
struct Smo<'a> {
    l:      usize,
    c:      f64,
    alpha:  Vec<f64>,
    grad:   Vec<f64>,
    kernel: KernelRows<'a>,
}

impl<'a> Smo<'a> {
    fn new(x: &'a [FeatureVector], y: &[f64], c: f64, gamma: f64, settings: &SvrSettings) -> Self {
        let l = x.len();

        // α = 0 so the gradient starts at the linear term
        let mut grad = Vec::with_capacity(2 * l);
        grad.extend(y.iter().map(|&yt| settings.epsilon - yt));
        grad.extend(y.iter().map(|&yt| settings.epsilon + yt));

        Self {
            l,
            c,
            alpha:  vec![0.0; 2 * l],
            grad,
            kernel: KernelRows::new(x, gamma, settings.kernel_cache_mb),
        }
    }

    fn sign(&self, t: usize) -> f64 {
        if t < self.l { 1.0 } else { -1.0 }
    }

    fn at_upper(&self, t: usize) -> bool {
        self.alpha[t] >= self.c
    }

    fn at_lower(&self, t: usize) -> bool {
        self.alpha[t] <= 0.0
    }

    fn optimise(&mut self, tol: f64, max_iter: usize) -> usize {
        let mut iter = 0;
        while iter < max_iter {
            let Some((i, j)) = self.select_working_set(tol) else {
                return iter;
            };
            self.update_pair(i, j);
            iter += 1;
        }
        tracing::warn!(
            "SVR solver stopped at the iteration cap ({}) before converging",
            max_iter
        );
        iter
    }

    /// Maximal violating i, second-order j. `None` once the gap is below `tol`.
    fn select_working_set(&mut self, tol: f64) -> Option<(usize, usize)> {
        let l2 = 2 * self.l;

        // ── Step 1: i maximises −sᵢ·Gᵢ over variables that can move up ──
        let mut gmax = f64::NEG_INFINITY;
        let mut gmax_idx = None;
        for t in 0..l2 {
            let candidate = if t < self.l {
                (!self.at_upper(t)).then(|| -self.grad[t])
            } else {
                (!self.at_lower(t)).then(|| self.grad[t])
            };
            if let Some(g) = candidate {
                if g >= gmax {
                    gmax = g;
                    gmax_idx = Some(t);
                }
            }
        }

        let i = gmax_idx?;
        let k_i = self.kernel.row(i % self.l);

        // ── Step 2: j minimises −(grad_diff²)/quad over movable partners ──
        let mut gmax2 = f64::NEG_INFINITY;
        let mut best_j = None;
        let mut obj_diff_min = f64::INFINITY;

        for t in 0..l2 {
            let g = if t < self.l {
                if self.at_lower(t) {
                    continue;
                }
                self.grad[t]
            } else {
                if self.at_upper(t) {
                    continue;
                }
                -self.grad[t]
            };

            gmax2 = gmax2.max(g);
            let grad_diff = gmax + g;
            if grad_diff > 0.0 {
                // RBF diagonal is 1
                let mut quad = 2.0 - 2.0 * k_i[t % self.l];
                if quad <= 0.0 {
                    quad = TAU;
                }
                let obj_diff = -(grad_diff * grad_diff) / quad;
                if obj_diff <= obj_diff_min {
                    obj_diff_min = obj_diff;
                    best_j = Some(t);
                }
            }
        }

        if gmax + gmax2 < tol {
            return None;
        }
        best_j.map(|j| (i, j))
    }

    /// Analytic two-variable step with clipping into [0, C]
    fn update_pair(&mut self, i: usize, j: usize) {
        let l = self.l;
        let c = self.c;
        let k_i = self.kernel.row(i % l);
        let k_j = self.kernel.row(j % l);

        let (s_i, s_j) = (self.sign(i), self.sign(j));
        // Signed entry Q_ij = sᵢ·sⱼ·K(xᵢ, xⱼ)
        let q_ij = s_i * s_j * k_i[j % l];

        let old_ai = self.alpha[i];
        let old_aj = self.alpha[j];
        let (mut ai, mut aj) = (old_ai, old_aj);

        if s_i != s_j {
            let mut quad = 2.0 + 2.0 * q_ij;
            if quad <= 0.0 {
                quad = TAU;
            }
            let delta = (-self.grad[i] - self.grad[j]) / quad;
            let diff = ai - aj;
            ai += delta;
            aj += delta;

            if diff > 0.0 {
                if aj < 0.0 {
                    aj = 0.0;
                    ai = diff;
                }
            } else if ai < 0.0 {
                ai = 0.0;
                aj = -diff;
            }
            if diff > 0.0 {
                if ai > c {
                    ai = c;
                    aj = c - diff;
                }
            } else if aj > c {
                aj = c;
                ai = c + diff;
            }
        } else {
            let mut quad = 2.0 - 2.0 * q_ij;
            if quad <= 0.0 {
                quad = TAU;
            }
            let delta = (self.grad[i] - self.grad[j]) / quad;
            let sum = ai + aj;
            ai -= delta;
            aj += delta;

            if sum > c {
                if ai > c {
                    ai = c;
                    aj = sum - c;
                }
            } else if aj < 0.0 {
                aj = 0.0;
                ai = sum;
            }
            if sum > c {
                if aj > c {
                    aj = c;
                    ai = sum - c;
                }
            } else if ai < 0.0 {
                ai = 0.0;
                aj = sum;
            }
        }

        self.alpha[i] = ai;
        self.alpha[j] = aj;

        // ── Gradient update: Gₜ += Q_ti·Δαᵢ + Q_tj·Δαⱼ ──
        let a = s_i * (ai - old_ai);
        let b = s_j * (aj - old_aj);
        for t in 0..l {
            let u = k_i[t] * a + k_j[t] * b;
            self.grad[t]     += u;
            self.grad[t + l] -= u;
        }
    }

    /// Offset from free variables, or the midpoint of the bounds if none are free
    fn rho(&self) -> f64 {
        let mut ub = f64::INFINITY;
        let mut lb = f64::NEG_INFINITY;
        let mut sum_free = 0.0;
        let mut n_free = 0usize;

        for t in 0..2 * self.l {
            let s = self.sign(t);
            let yg = s * self.grad[t];
            if self.at_upper(t) {
                if s < 0.0 { ub = ub.min(yg) } else { lb = lb.max(yg) }
            } else if self.at_lower(t) {
                if s > 0.0 { ub = ub.min(yg) } else { lb = lb.max(yg) }
            } else {
                n_free += 1;
                sum_free += yg;
            }
        }

        if n_free > 0 {
            sum_free / n_free as f64
        } else {
            (ub + lb) / 2.0
        }
    }
}
