//! Probabilistic surrogate model contract and the shipped Gaussian process.
//!
//! The surrogate-gated evaluation policy only needs a narrow contract from
//! its model: accumulate real samples, fit, and predict a mean and standard
//! deviation at a query point. [`GaussianProcess`] implements it with a
//! Matérn 5/2 kernel (ARD lengthscales), standardized targets and a
//! Cholesky factorization; nothing in the engine inspects the kernel or
//! its hyperparameters, so any regression model satisfying the trait can
//! be injected instead.

use nalgebra::{DMatrix, DVector};

use crate::error::{Error, Result};

/// A posterior prediction at a single point.
#[derive(Clone, Copy, Debug)]
pub struct Prediction {
    /// Predictive mean.
    pub mean: f64,
    /// Predictive standard deviation.
    pub std: f64,
}

/// Trait for the external probabilistic surrogate collaborator.
///
/// The engine feeds every real `(point, value)` observation through
/// [`add_sample`](SurrogateModel::add_sample), calls
/// [`fit`](SurrogateModel::fit) before each batch of gated evaluations once
/// [`is_valid`](SurrogateModel::is_valid) reports enough data, and queries
/// [`predict`](SurrogateModel::predict) at node centers.
pub trait SurrogateModel: Send {
    /// Adds one real observation to the training set.
    fn add_sample(&mut self, point: &[f64], value: f64);

    /// Number of training samples accumulated so far.
    fn num_samples(&self) -> usize;

    /// Whether enough samples exist to fit and predict (at least two).
    fn is_valid(&self) -> bool {
        self.num_samples() >= 2
    }

    /// Fits the model to the accumulated samples.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SurrogateUnavailable`] with fewer than two samples.
    fn fit(&mut self) -> Result<()>;

    /// Predicts mean and standard deviation at a point.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SurrogateUnavailable`] before a successful
    /// [`fit`](SurrogateModel::fit).
    fn predict(&self, point: &[f64]) -> Result<Prediction>;
}

/// Precomputed √5 for the Matérn 5/2 kernel.
const SQRT_5: f64 = 2.236_067_977_499_79;

/// Minimum ARD lengthscale, guarding against collapsed dimensions.
const MIN_LENGTHSCALE: f64 = 0.01;

/// Default observation noise variance added to the kernel diagonal.
const DEFAULT_NOISE_VAR: f64 = 1e-6;

/// Matérn 5/2 kernel with ARD lengthscales.
///
/// `k(x1, x2) = σ² (1 + √5 r + 5/3 r²) exp(-√5 r)`
/// where `r = sqrt(Σ ((x1_i - x2_i) / l_i)²)`
fn matern52(x1: &[f64], x2: &[f64], lengthscales: &[f64], signal_var: f64) -> f64 {
    let mut r_sq = 0.0;
    for i in 0..x1.len() {
        let diff = (x1[i] - x2[i]) / lengthscales[i];
        r_sq += diff * diff;
    }
    let r = r_sq.sqrt();
    let sqrt5_r = SQRT_5 * r;
    signal_var * (1.0 + sqrt5_r + 5.0 / 3.0 * r_sq) * (-sqrt5_r).exp()
}

/// Build the kernel matrix `K + σ²I`.
fn kernel_matrix(
    x: &[Vec<f64>],
    lengthscales: &[f64],
    signal_var: f64,
    noise_var: f64,
) -> DMatrix<f64> {
    let n = x.len();
    DMatrix::from_fn(n, n, |i, j| {
        let k = matern52(&x[i], &x[j], lengthscales, signal_var);
        if i == j {
            k + noise_var
        } else {
            k
        }
    })
}

/// Compute the kernel vector k(x*, X) for a test point.
fn kernel_vector(
    x_star: &[f64],
    x_train: &[Vec<f64>],
    lengthscales: &[f64],
    signal_var: f64,
) -> DVector<f64> {
    DVector::from_fn(x_train.len(), |i, _| {
        matern52(x_star, &x_train[i], lengthscales, signal_var)
    })
}

/// A fitted posterior, rebuilt on every [`GaussianProcess::fit`].
struct FittedGp {
    /// Cholesky factor of K + σ²I.
    cholesky: nalgebra::linalg::Cholesky<f64, nalgebra::Dyn>,
    /// α = (K + σ²I)^{-1} y (standardized targets).
    alpha: DVector<f64>,
    /// Training inputs at fit time.
    x_train: Vec<Vec<f64>>,
    /// ARD lengthscales per dimension.
    lengthscales: Vec<f64>,
    /// Signal variance (1.0 for standardized targets).
    signal_var: f64,
    /// Mean of the original targets, for un-standardizing predictions.
    y_mean: f64,
    /// Std dev of the original targets.
    y_std: f64,
}

/// Gaussian-process surrogate with a Matérn 5/2 ARD kernel.
///
/// Targets are standardized to zero mean and unit variance before fitting;
/// predictions are mapped back to the original scale. ARD lengthscales are
/// set from the per-dimension standard deviation of the training inputs.
///
/// # Examples
///
/// ```
/// use optimistic::surrogate::{GaussianProcess, SurrogateModel};
///
/// let mut gp = GaussianProcess::new();
/// gp.add_sample(&[0.1], -0.16);
/// gp.add_sample(&[0.9], -0.16);
/// gp.add_sample(&[0.5], 0.0);
/// gp.fit().unwrap();
///
/// let p = gp.predict(&[0.5]).unwrap();
/// assert!((p.mean - 0.0).abs() < 0.1);
/// ```
pub struct GaussianProcess {
    xs: Vec<Vec<f64>>,
    ys: Vec<f64>,
    noise_var: f64,
    fitted: Option<FittedGp>,
}

impl GaussianProcess {
    /// Creates an empty model with the default noise variance.
    #[must_use]
    pub fn new() -> Self {
        Self::with_noise(DEFAULT_NOISE_VAR)
    }

    /// Creates an empty model with a custom observation-noise variance.
    #[must_use]
    pub fn with_noise(noise_var: f64) -> Self {
        Self {
            xs: Vec::new(),
            ys: Vec::new(),
            noise_var,
            fitted: None,
        }
    }
}

impl Default for GaussianProcess {
    fn default() -> Self {
        Self::new()
    }
}

impl SurrogateModel for GaussianProcess {
    fn add_sample(&mut self, point: &[f64], value: f64) {
        self.xs.push(point.to_vec());
        self.ys.push(value);
    }

    fn num_samples(&self) -> usize {
        self.ys.len()
    }

    #[allow(clippy::cast_precision_loss)]
    fn fit(&mut self) -> Result<()> {
        let n = self.ys.len();
        if n < 2 {
            return Err(Error::SurrogateUnavailable);
        }

        // Standardize y
        let y_mean = self.ys.iter().sum::<f64>() / n as f64;
        let y_var =
            self.ys.iter().map(|&y| (y - y_mean).powi(2)).sum::<f64>() / (n - 1) as f64;
        let y_std = y_var.sqrt().max(1e-10);
        let y_standardized: Vec<f64> = self.ys.iter().map(|&y| (y - y_mean) / y_std).collect();

        // ARD lengthscales: per-dimension std dev of training X, clamped
        let d = self.xs[0].len();
        let lengthscales: Vec<f64> = (0..d)
            .map(|j| {
                let mean_j = self.xs.iter().map(|x| x[j]).sum::<f64>() / n as f64;
                let var_j =
                    self.xs.iter().map(|x| (x[j] - mean_j).powi(2)).sum::<f64>() / n as f64;
                var_j.sqrt().max(MIN_LENGTHSCALE)
            })
            .collect();

        // Signal variance = 1.0 (targets are standardized)
        let signal_var = 1.0;

        let k = kernel_matrix(&self.xs, &lengthscales, signal_var, self.noise_var);
        let cholesky = nalgebra::linalg::Cholesky::new(k)
            .ok_or(Error::Internal("kernel matrix is not positive definite"))?;

        let y_vec = DVector::from_column_slice(&y_standardized);
        let alpha = cholesky.solve(&y_vec);

        self.fitted = Some(FittedGp {
            cholesky,
            alpha,
            x_train: self.xs.clone(),
            lengthscales,
            signal_var,
            y_mean,
            y_std,
        });
        Ok(())
    }

    fn predict(&self, point: &[f64]) -> Result<Prediction> {
        let model = self.fitted.as_ref().ok_or(Error::SurrogateUnavailable)?;
        let k_star = kernel_vector(point, &model.x_train, &model.lengthscales, model.signal_var);

        // Mean: k*^T α
        let mean = k_star.dot(&model.alpha);

        // Variance: k(x*, x*) - k*^T (K + σ²I)^{-1} k*
        let v = model.cholesky.solve(&k_star);
        let var = (model.signal_var - k_star.dot(&v)).max(0.0);

        Ok(Prediction {
            mean: mean * model.y_std + model.y_mean,
            std: var.sqrt() * model.y_std,
        })
    }
}
