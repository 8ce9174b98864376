//! Gauss-Legendre quadrature on the reference interval [-1, 1].
//!
//! The n Gauss-Legendre nodes are the roots of P_n(x). An n-point rule
//! integrates polynomials up to degree 2n-1 exactly, so two points already
//! cover every product of two P1 basis functions.

use std::f64::consts::PI;

/// Evaluate P_n(x) and P'_n(x) with the three-term recurrence.
///
/// (k+1) P_{k+1}(x) = (2k+1) x P_k(x) - k P_{k-1}(x)
pub fn legendre_and_derivative(n: usize, x: f64) -> (f64, f64) {
    if n == 0 {
        return (1.0, 0.0);
    }

    let mut p_prev = 1.0;
    let mut p_curr = x;
    for k in 1..n {
        let p_next = ((2 * k + 1) as f64 * x * p_curr - k as f64 * p_prev) / (k + 1) as f64;
        p_prev = p_curr;
        p_curr = p_next;
    }

    // P'_n(x) = n (x P_n - P_{n-1}) / (x² - 1); nodes are interior so x² != 1
    let dp = if (x * x - 1.0).abs() < 1e-14 {
        let sign = if x > 0.0 || n % 2 == 1 { 1.0 } else { -1.0 };
        sign * (n * (n + 1)) as f64 / 2.0
    } else {
        n as f64 * (x * p_curr - p_prev) / (x * x - 1.0)
    };

    (p_curr, dp)
}

/// Gauss-Legendre rule with `n_points` nodes on [-1, 1].
#[derive(Clone, Debug)]
pub struct GaussLegendre {
    /// Nodes in ascending order
    pub nodes: Vec<f64>,
    /// Weights, summing to 2
    pub weights: Vec<f64>,
}

impl GaussLegendre {
    /// Build the rule by Newton iteration from Chebyshev initial guesses.
    pub fn new(n_points: usize) -> Self {
        assert!(n_points > 0, "Need at least one quadrature point");

        let n = n_points;
        let mut nodes = vec![0.0; n];
        let mut weights = vec![0.0; n];

        for i in 0..n {
            // Roots come out descending; store mirrored so nodes ascend
            let mut x = (PI * (i as f64 + 0.75) / (n as f64 + 0.5)).cos();
            for _ in 0..100 {
                let (p, dp) = legendre_and_derivative(n, x);
                let update = p / dp;
                x -= update;
                if update.abs() < 1e-15 {
                    break;
                }
            }
            let (_, dp) = legendre_and_derivative(n, x);
            nodes[n - 1 - i] = x;
            weights[n - 1 - i] = 2.0 / ((1.0 - x * x) * dp * dp);
        }

        Self { nodes, weights }
    }

    /// Number of quadrature points.
    pub fn n_points(&self) -> usize {
        self.nodes.len()
    }

    /// Nodes mapped to the unit interval [0, 1], with weights scaled to sum to 1.
    pub fn unit_interval(&self) -> (Vec<f64>, Vec<f64>) {
        let xi = self.nodes.iter().map(|&r| 0.5 * (1.0 + r)).collect();
        let w = self.weights.iter().map(|&w| 0.5 * w).collect();
        (xi, w)
    }
}

impl Default for GaussLegendre {
    fn default() -> Self {
        Self::new(2)
    }
}
