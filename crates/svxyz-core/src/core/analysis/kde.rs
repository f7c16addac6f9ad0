use std::f64::consts::PI;
use thiserror::Error;

/// Number of grid points used to locate the density peak.
pub const GRID_POINTS: usize = 1000;

#[derive(Debug, Error, PartialEq)]
pub enum KdeError {
    #[error("A density estimate needs at least 2 values, got {0}")]
    TooFewPoints(usize),
    #[error("All {0} values are identical; the density is degenerate")]
    ZeroVariance(usize),
    #[error("Series contains a non-finite value at position {0}")]
    NonFinite(usize),
}

/// One-dimensional Gaussian kernel density estimate with Scott's rule bandwidth.
#[derive(Debug, Clone)]
pub struct GaussianKde {
    points: Vec<f64>,
    bandwidth: f64,
    norm: f64,
}

impl GaussianKde {
    pub fn new(points: &[f64]) -> Result<Self, KdeError> {
        if let Some(pos) = points.iter().position(|v| !v.is_finite()) {
            return Err(KdeError::NonFinite(pos));
        }
        let n = points.len();
        if n < 2 {
            return Err(KdeError::TooFewPoints(n));
        }
        let sample_std = variance(points, 1).sqrt();
        if sample_std == 0.0 {
            return Err(KdeError::ZeroVariance(n));
        }
        let bandwidth = sample_std * (n as f64).powf(-0.2);
        Ok(Self {
            points: points.to_vec(),
            bandwidth,
            norm: 1.0 / (n as f64 * bandwidth * (2.0 * PI).sqrt()),
        })
    }

    pub fn bandwidth(&self) -> f64 {
        self.bandwidth
    }

    pub fn evaluate(&self, x: f64) -> f64 {
        let inv = 1.0 / (2.0 * self.bandwidth * self.bandwidth);
        self.norm
            * self
                .points
                .iter()
                .map(|p| (-(x - p) * (x - p) * inv).exp())
                .sum::<f64>()
    }

    pub fn evaluate_many(&self, xs: &[f64]) -> Vec<f64> {
        xs.iter().map(|&x| self.evaluate(x)).collect()
    }
}

/// `n` evenly spaced values from `start` to `end` inclusive.
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n)
                .map(|i| if i == n - 1 { end } else { start + step * i as f64 })
                .collect()
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn variance(values: &[f64], ddof: usize) -> f64 {
    let m = mean(values);
    values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / (values.len() - ddof) as f64
}

/// Summary of a series: mean, population standard deviation and density peak.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesStats {
    pub count: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    /// Location of the density maximum on the evaluation grid.
    pub peak: f64,
}

/// A series with its density curve evaluated on a grid spanning its range.
#[derive(Debug, Clone)]
pub struct SeriesDensity {
    pub stats: SeriesStats,
    pub grid: Vec<f64>,
    pub density: Vec<f64>,
    pub kde: GaussianKde,
}

impl SeriesDensity {
    pub fn new(values: &[f64]) -> Result<Self, KdeError> {
        let kde = GaussianKde::new(values)?;
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let grid = linspace(min, max, GRID_POINTS);
        let density = kde.evaluate_many(&grid);
        let peak_idx = density
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map_or(0, |(i, _)| i);

        Ok(Self {
            stats: SeriesStats {
                count: values.len(),
                mean: mean(values),
                std_dev: variance(values, 0).sqrt(),
                min,
                max,
                peak: grid[peak_idx],
            },
            grid,
            density,
            kde,
        })
    }
}
