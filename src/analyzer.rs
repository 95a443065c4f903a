//! Main `SpmAnalyzer` entry point and builder.

use tracing::debug;

use crate::config::{Config, SmoothnessEstimator};
use crate::constants::DEFAULT_SEED;
use crate::error::SpmResult;
use crate::inference::{run_permutation_inference, run_rft_inference, PermutationInput, RftInput};
use crate::posthoc::run_posthoc;
use crate::result::{Analysis, NormalityReport, PosthocResult};
use crate::screening::screen_with_config;
use crate::statistics::{compute_design, Design, DesignOptions};
use crate::types::{Group, Method, Mu, TestKind};

/// Main entry point for curve analyses.
///
/// Use the builder pattern to configure and run a test:
///
/// ```ignore
/// use curve_spm::{Group, Method, SpmAnalyzer, TestKind};
///
/// let analysis = SpmAnalyzer::new()
///     .alpha(0.01)
///     .method(Method::Nonparametric)
///     .iterations(1_000)
///     .seed(7)
///     .run(TestKind::TwoSampleT, &[control, treated])?;
///
/// println!("zstar = {:.3}, clusters = {}", analysis.inference.zstar, analysis.inference.n_clusters);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SpmAnalyzer {
    config: Config,
    method: Method,
    options: DesignOptions,
}

impl Default for SpmAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl SpmAnalyzer {
    /// Create with default configuration and parametric inference.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Create with reduced permutation counts for fast exploratory runs.
    ///
    /// Settings:
    /// - 200 permutations (vs 500 default)
    /// - 200 permutations per post-hoc pair (vs 1,000 default)
    pub fn quick() -> Self {
        Self::with_config(Config {
            iterations: 200,
            posthoc_iterations: 200,
            ..Config::default()
        })
    }

    /// Create from an explicit configuration.
    pub fn with_config(config: Config) -> Self {
        Self {
            config,
            method: Method::Parametric,
            options: DesignOptions::default(),
        }
    }

    /// Set the family-wise significance level.
    pub fn alpha(mut self, alpha: f64) -> Self {
        self.config.alpha = alpha;
        self
    }

    /// Set the significance level used by normality screening.
    pub fn normality_alpha(mut self, alpha: f64) -> Self {
        self.config.normality_alpha = alpha;
        self
    }

    /// Test both tails of t-type fields.
    pub fn two_tailed(mut self, two_tailed: bool) -> Self {
        self.config.two_tailed = two_tailed;
        self
    }

    /// Set the inference method.
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Set permutations for main-effect nonparametric inference.
    pub fn iterations(mut self, n: usize) -> Self {
        self.config.iterations = n;
        self
    }

    /// Set permutations per post-hoc pair.
    pub fn posthoc_iterations(mut self, n: usize) -> Self {
        self.config.posthoc_iterations = n;
        self
    }

    /// Set deterministic permutation seed.
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    /// Interpolate cluster endpoints to the threshold crossing.
    pub fn interp(mut self, interp: bool) -> Self {
        self.config.interp = interp;
        self
    }

    /// Choose the residual smoothness estimator.
    pub fn smoothness(mut self, estimator: SmoothnessEstimator) -> Self {
        self.config.smoothness = estimator;
        self
    }

    /// Set the RFT threshold solver tolerance and iteration cap.
    pub fn solver(mut self, tolerance: f64, max_iterations: usize) -> Self {
        self.config.tolerance = tolerance;
        self.config.max_solver_iterations = max_iterations;
        self
    }

    /// Reference for one-sample tests.
    pub fn mu(mut self, mu: Mu) -> Self {
        self.options.mu = mu;
        self
    }

    /// Scalar predictor for regression, one value per curve.
    pub fn predictor(mut self, x: Vec<f64>) -> Self {
        self.options.x = Some(x);
        self
    }

    /// Get the current configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the selected inference method.
    pub fn selected_method(&self) -> Method {
        self.method
    }

    /// Compute the statistic field for `kind` and run inference on it.
    ///
    /// # Errors
    ///
    /// Any [`SpmError`](crate::SpmError) from design assembly, the statistic,
    /// or the selected inference engine. Nonparametric regression and K²
    /// return `UnsupportedCombination`.
    pub fn run(&self, kind: TestKind, groups: &[Group]) -> SpmResult<Analysis> {
        let design = Design::from_groups(kind, groups, &self.options)?;
        debug!(
            test = kind.name(),
            method = self.method.name(),
            alpha = self.config.alpha,
            two_tailed = self.config.two_tailed,
            "running analysis"
        );

        let statistic = compute_design(&design)?;
        let inference = match self.method {
            Method::Parametric => run_rft_inference(
                &statistic,
                &RftInput::from_config(&self.config, self.config.alpha, self.config.two_tailed),
            )?,
            Method::Nonparametric => run_permutation_inference(
                &design,
                &PermutationInput {
                    alpha: self.config.alpha,
                    two_tailed: self.config.two_tailed,
                    iterations: self.config.iterations,
                    seed: self.config.seed.unwrap_or(DEFAULT_SEED),
                    interp: self.config.interp,
                },
            )?,
        };

        Ok(Analysis { statistic, inference })
    }

    /// Pairwise comparisons at the corrected alpha.
    ///
    /// # Errors
    ///
    /// See [`run_posthoc`].
    pub fn run_posthoc(&self, groups: &[Group]) -> SpmResult<PosthocResult> {
        run_posthoc(
            groups,
            self.method,
            self.config.alpha,
            self.config.posthoc_iterations,
            &self.config,
        )
    }

    /// Screen every group for pointwise normality.
    ///
    /// # Errors
    ///
    /// See [`screen`](crate::screening::screen).
    pub fn screen(&self, groups: &[Group]) -> SpmResult<NormalityReport> {
        screen_with_config(groups, self.config.normality_alpha, &self.config)
    }
}
