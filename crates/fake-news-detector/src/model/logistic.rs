use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;
use sprs::{CsMat, CsVecView};
use tracing::{debug, info, warn};

use crate::error::{FakeNewsError, Result};

/// Optimizer settings for [`LogisticRegression::fit`].
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct FitOptions {
    /// Inverse regularization strength. Smaller values regularize more.
    pub regularization: f64,
    pub max_iter: usize,
    /// Stop once the gradient norm falls below this value.
    pub tolerance: f64,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            regularization: 1.0,
            max_iter: 1000,
            tolerance: 1e-6,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FitSummary {
    pub iterations: usize,
    pub converged: bool,
    /// Regularized mean log-loss at the returned parameters.
    pub final_loss: f64,
}

/// Binary logistic regression over sparse features. Class 1 is "fake".
#[derive(Debug, Clone, PartialEq, bincode::Encode, bincode::Decode)]
pub struct LogisticRegression {
    weights: Vec<f64>,
    bias: f64,
}

impl LogisticRegression {
    #[must_use]
    pub fn new(weights: Vec<f64>, bias: f64) -> Self {
        Self { weights, bias }
    }

    #[must_use]
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    #[must_use]
    pub fn bias(&self) -> f64 {
        self.bias
    }

    #[must_use]
    pub fn num_features(&self) -> usize {
        self.weights.len()
    }

    /// Linear score `w·x + b` of one sparse row.
    #[inline]
    pub fn decision_function(&self, x: &CsVecView<'_, f64>) -> f64 {
        sparse_dot(x, &self.weights) + self.bias
    }

    /// Fit by minimizing `mean(logloss) + ½λ‖w‖²` with `λ = 1 / (C·n)`, which
    /// has the same minimizer as `½‖w‖² + C·Σ logloss`. The bias is not
    /// penalized.
    ///
    /// Uses Nesterov-accelerated gradient descent with a fixed `1/L` step,
    /// where `L` bounds the curvature of the loss, and restarts the momentum
    /// whenever it points uphill. `labels` holds 1.0 for fake and 0.0 for real.
    /// When `cancel` is set between iterations the fit stops with
    /// [`FakeNewsError::Cancelled`].
    pub fn fit(
        x: &CsMat<f64>,
        labels: &[f64],
        options: &FitOptions,
        cancel: Option<&AtomicBool>,
    ) -> Result<(Self, FitSummary)> {
        let n = x.rows();
        let dim = x.cols();
        if n == 0 {
            return Err(FakeNewsError::data("cannot fit a classifier on zero documents"));
        }
        if labels.len() != n {
            return Err(FakeNewsError::Internal(format!(
                "{} labels for {n} feature rows",
                labels.len()
            )));
        }
        if !x.is_csr() {
            return Err(FakeNewsError::Internal(
                "feature matrix must be in CSR layout".to_string(),
            ));
        }
        if !(options.regularization > 0.0 && options.regularization.is_finite()) {
            return Err(FakeNewsError::invalid_input(format!(
                "regularization must be a positive number, got {}",
                options.regularization
            )));
        }

        let lambda = 1.0 / (options.regularization * n as f64);
        let max_row_norm_sq = x
            .outer_iterator()
            .map(|row| row.data().iter().map(|v| v * v).sum::<f64>())
            .fold(0.0, f64::max);
        let lipschitz = 0.25 * (max_row_norm_sq + 1.0) + lambda;
        let step = 1.0 / lipschitz;
        info!(
            n_samples = n,
            n_features = dim,
            lambda,
            step,
            max_iter = options.max_iter,
            "Fitting logistic regression"
        );

        let mut current = Params::zeros(dim);
        let mut lookahead = current.clone();
        let mut momentum = 1.0_f64;
        let mut summary = FitSummary {
            iterations: 0,
            converged: false,
            final_loss: f64::NAN,
        };

        for iteration in 1..=options.max_iter {
            if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                warn!(iterations = iteration - 1, "Training cancelled");
                return Err(FakeNewsError::Cancelled {
                    iterations: iteration - 1,
                });
            }

            let gradient = objective_gradient(x, labels, &lookahead, lambda);
            if !gradient.is_finite() {
                return Err(FakeNewsError::Internal(format!(
                    "optimizer diverged at iteration {iteration}"
                )));
            }
            summary.iterations = iteration;
            summary.final_loss = gradient.loss;

            let grad_norm = gradient.norm();
            if iteration % 100 == 0 {
                debug!(iteration, loss = gradient.loss, grad_norm, "Optimizer progress");
            }
            if grad_norm <= options.tolerance {
                current = lookahead;
                summary.converged = true;
                break;
            }

            let next = lookahead.step(&gradient, step);
            let next_momentum = (1.0 + (1.0 + 4.0 * momentum * momentum).sqrt()) / 2.0;
            if gradient.dot_displacement(&next, &current) > 0.0 {
                // Momentum points uphill; restart from the plain gradient step.
                momentum = 1.0;
                lookahead = next.clone();
            } else {
                lookahead = next.extrapolate(&current, (momentum - 1.0) / next_momentum);
                momentum = next_momentum;
            }
            current = next;
        }

        if summary.converged {
            info!(
                iterations = summary.iterations,
                loss = summary.final_loss,
                "Logistic regression converged"
            );
        } else {
            let loss = objective_gradient(x, labels, &current, lambda).loss;
            summary.final_loss = loss;
            warn!(
                iterations = summary.iterations,
                loss, "Logistic regression stopped before reaching tolerance"
            );
        }

        Ok((
            Self {
                weights: current.weights,
                bias: current.bias,
            },
            summary,
        ))
    }
}

/// Dot product of a sparse row with a dense vector. Indices outside the dense
/// vector contribute nothing.
#[inline]
pub fn sparse_dot(x: &CsVecView<'_, f64>, dense: &[f64]) -> f64 {
    x.iter()
        .filter_map(|(idx, value)| dense.get(idx).map(|w| w * value))
        .sum()
}

/// Stable `ln(1 + e^z)`.
#[inline]
fn softplus(z: f64) -> f64 {
    if z > 0.0 {
        z + (-z).exp().ln_1p()
    } else {
        z.exp().ln_1p()
    }
}

#[derive(Debug, Clone)]
struct Params {
    weights: Vec<f64>,
    bias: f64,
}

impl Params {
    fn zeros(dim: usize) -> Self {
        Self {
            weights: vec![0.0; dim],
            bias: 0.0,
        }
    }

    fn step(&self, gradient: &Gradient, step: f64) -> Self {
        Self {
            weights: self
                .weights
                .iter()
                .zip(&gradient.weights)
                .map(|(w, g)| w - step * g)
                .collect(),
            bias: self.bias - step * gradient.bias,
        }
    }

    /// `self + beta * (self - previous)`.
    fn extrapolate(&self, previous: &Self, beta: f64) -> Self {
        Self {
            weights: self
                .weights
                .iter()
                .zip(&previous.weights)
                .map(|(w, p)| w + beta * (w - p))
                .collect(),
            bias: self.bias + beta * (self.bias - previous.bias),
        }
    }
}

struct Gradient {
    weights: Vec<f64>,
    bias: f64,
    loss: f64,
}

impl Gradient {
    fn norm(&self) -> f64 {
        (self.weights.iter().map(|g| g * g).sum::<f64>() + self.bias * self.bias).sqrt()
    }

    fn is_finite(&self) -> bool {
        self.loss.is_finite() && self.bias.is_finite() && self.weights.iter().all(|g| g.is_finite())
    }

    /// `g · (next - current)`.
    fn dot_displacement(&self, next: &Params, current: &Params) -> f64 {
        let weights = self
            .weights
            .iter()
            .zip(next.weights.iter().zip(&current.weights))
            .map(|(g, (a, b))| g * (a - b))
            .sum::<f64>();
        weights + self.bias * (next.bias - current.bias)
    }
}

/// Objective value and gradient at `params`, summed over rows in parallel.
fn objective_gradient(x: &CsMat<f64>, labels: &[f64], params: &Params, lambda: f64) -> Gradient {
    let n = x.rows();
    let dim = x.cols();

    let (mut weights, bias, loss) = (0..n)
        .into_par_iter()
        .fold(
            || (vec![0.0; dim], 0.0, 0.0),
            |(mut grad, mut grad_bias, mut loss), i| {
                if let Some(row) = x.outer_view(i) {
                    let z = sparse_dot(&row, &params.weights) + params.bias;
                    let y = labels[i];
                    let residual = sigmoid(z) - y;
                    for (idx, value) in row.iter() {
                        grad[idx] += residual * value;
                    }
                    grad_bias += residual;
                    loss += softplus(z) - y * z;
                }
                (grad, grad_bias, loss)
            },
        )
        .reduce(
            || (vec![0.0; dim], 0.0, 0.0),
            |(mut a, a_bias, a_loss), (b, b_bias, b_loss)| {
                for (acc, value) in a.iter_mut().zip(b) {
                    *acc += value;
                }
                (a, a_bias + b_bias, a_loss + b_loss)
            },
        );

    let scale = 1.0 / n as f64;
    let mut penalty = 0.0;
    for (g, w) in weights.iter_mut().zip(&params.weights) {
        *g = *g * scale + lambda * w;
        penalty += w * w;
    }

    Gradient {
        weights,
        bias: bias * scale,
        loss: loss * scale + 0.5 * lambda * penalty,
    }
}

/// Numerically stable logistic function.
#[inline]
#[must_use]
pub fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}
