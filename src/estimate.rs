//! Logistic regression of the murder flag on the lagged murder flag.
//!
//! This is a demonstration fit: there is no train/test split and no
//! calibration check, and the only supported query is the probability for a
//! single hypothetical lag value. Callers must not read the output as a
//! calibrated risk estimate.

use serde::Serialize;
use tracing::{debug, info};

use crate::error::{AnalysisError, Result};
use crate::models::DerivedRecord;

const MAX_ITERATIONS: usize = 50;
const TOLERANCE: f64 = 1e-10;
pub const MIN_OBSERVATIONS: usize = 2;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogisticFit {
    pub intercept: f64,
    pub slope: f64,
    pub intercept_std_error: f64,
    pub slope_std_error: f64,
    pub log_likelihood: f64,
    pub iterations: usize,
    pub observations: usize,
}

impl LogisticFit {
    /// Predicted probability of a murder given the previous incident's flag.
    pub fn predict(&self, lag_outcome: bool) -> f64 {
        let x = if lag_outcome { 1.0 } else { 0.0 };
        sigmoid(self.intercept + self.slope * x)
    }

    pub fn intercept_z(&self) -> f64 {
        self.intercept / self.intercept_std_error
    }

    pub fn slope_z(&self) -> f64 {
        self.slope / self.slope_std_error
    }
}

/// Sufficient statistics for a binary predictor: trials and successes at
/// x = 0 and x = 1.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Cells {
    n0: f64,
    y0: f64,
    n1: f64,
    y1: f64,
}

impl Cells {
    fn tally(records: &[DerivedRecord]) -> Self {
        let mut cells = Cells::default();
        for record in records {
            let Some(lag) = record.lag_outcome else {
                continue;
            };
            let y = if record.is_murder { 1.0 } else { 0.0 };
            if lag {
                cells.n1 += 1.0;
                cells.y1 += y;
            } else {
                cells.n0 += 1.0;
                cells.y0 += y;
            }
        }
        cells
    }

    fn observations(&self) -> usize {
        (self.n0 + self.n1) as usize
    }

    fn check_identifiable(&self) -> Result<()> {
        let observations = self.observations();
        if observations < MIN_OBSERVATIONS {
            return Err(AnalysisError::insufficient(format!(
                "{observations} records with a lagged outcome, need at least {MIN_OBSERVATIONS}"
            )));
        }
        let positives = self.y0 + self.y1;
        if positives == 0.0 || positives == self.n0 + self.n1 {
            return Err(AnalysisError::insufficient(
                "outcome takes a single value, so the fit is perfectly separated",
            ));
        }
        if self.n0 == 0.0 || self.n1 == 0.0 {
            return Err(AnalysisError::insufficient(
                "lagged outcome takes a single value, so the slope is not identifiable",
            ));
        }
        for (lag, n, y) in [(false, self.n0, self.y0), (true, self.n1, self.y1)] {
            if y == 0.0 || y == n {
                return Err(AnalysisError::insufficient(format!(
                    "every record with lagged outcome {lag} has the same outcome (quasi-separation)"
                )));
            }
        }
        Ok(())
    }

    fn log_likelihood(&self, intercept: f64, slope: f64) -> f64 {
        let p0 = sigmoid(intercept);
        let p1 = sigmoid(intercept + slope);
        self.y0 * p0.ln()
            + (self.n0 - self.y0) * (1.0 - p0).ln()
            + self.y1 * p1.ln()
            + (self.n1 - self.y1) * (1.0 - p1).ln()
    }
}

/// Fisher information matrix `[[a, b], [b, b]]` for the two-cell design.
fn information(cells: &Cells, intercept: f64, slope: f64) -> (f64, f64) {
    let p0 = sigmoid(intercept);
    let p1 = sigmoid(intercept + slope);
    let w0 = cells.n0 * p0 * (1.0 - p0);
    let w1 = cells.n1 * p1 * (1.0 - p1);
    (w0 + w1, w1)
}

/// Fits `is_murder ~ lag_outcome` by Newton-Raphson maximum likelihood over
/// records that have a lagged outcome.
pub fn fit_lag_model(records: &[DerivedRecord]) -> Result<LogisticFit> {
    let cells = Cells::tally(records);
    cells.check_identifiable()?;

    let mut intercept = 0.0;
    let mut slope = 0.0;

    for iteration in 1..=MAX_ITERATIONS {
        let p0 = sigmoid(intercept);
        let p1 = sigmoid(intercept + slope);
        let grad_slope = cells.y1 - cells.n1 * p1;
        let grad_intercept = cells.y0 - cells.n0 * p0 + grad_slope;

        let (a, b) = information(&cells, intercept, slope);
        let det = a * b - b * b;
        if det <= f64::EPSILON {
            return Err(AnalysisError::insufficient(
                "information matrix is singular",
            ));
        }

        let step_intercept = (b * grad_intercept - b * grad_slope) / det;
        let step_slope = (a * grad_slope - b * grad_intercept) / det;
        intercept += step_intercept;
        slope += step_slope;
        debug!(iteration, intercept, slope, "newton step");

        if step_intercept.abs().max(step_slope.abs()) < TOLERANCE {
            let (a, b) = information(&cells, intercept, slope);
            let det = a * b - b * b;
            let fit = LogisticFit {
                intercept,
                slope,
                intercept_std_error: (b / det).sqrt(),
                slope_std_error: (a / det).sqrt(),
                log_likelihood: cells.log_likelihood(intercept, slope),
                iterations: iteration,
                observations: cells.observations(),
            };
            info!(
                intercept = fit.intercept,
                slope = fit.slope,
                observations = fit.observations,
                "fitted lag model"
            );
            return Ok(fit);
        }
    }

    Err(AnalysisError::insufficient(format!(
        "maximum likelihood did not converge within {MAX_ITERATIONS} iterations"
    )))
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}
