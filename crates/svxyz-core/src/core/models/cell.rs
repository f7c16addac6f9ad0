use nalgebra::{Matrix3, Point3, Vector3};

/// A periodic simulation cell.
///
/// The three lattice vectors are stored as the rows of a 3x3 matrix (Å), the same layout
/// used by POSCAR files and the extended XYZ `Lattice` key.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell {
    matrix: Matrix3<f64>,
    inverse_transpose: Option<Matrix3<f64>>,
}

/// Lattice lengths (Å) and angles (degrees).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatticeParameters {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
}

impl Cell {
    /// Creates a cell from a matrix whose rows are the lattice vectors.
    pub fn new(matrix: Matrix3<f64>) -> Self {
        Self {
            matrix,
            inverse_transpose: matrix.transpose().try_inverse(),
        }
    }

    /// Creates a cell from three lattice vectors.
    pub fn from_vectors(a: Vector3<f64>, b: Vector3<f64>, c: Vector3<f64>) -> Self {
        Self::new(Matrix3::from_rows(&[a.transpose(), b.transpose(), c.transpose()]))
    }

    /// Creates a cell from nine numbers in row order (`a1 a2 a3 b1 b2 b3 c1 c2 c3`).
    pub fn from_flat(values: &[f64; 9]) -> Self {
        Self::new(Matrix3::from_row_slice(values))
    }

    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.matrix
    }

    /// Returns the lattice vector `i` (0, 1 or 2).
    pub fn vector(&self, i: usize) -> Vector3<f64> {
        self.matrix.row(i).transpose()
    }

    /// Row-order flattening, inverse of [`Cell::from_flat`].
    pub fn to_flat(&self) -> [f64; 9] {
        let m = &self.matrix;
        [
            m[(0, 0)],
            m[(0, 1)],
            m[(0, 2)],
            m[(1, 0)],
            m[(1, 1)],
            m[(1, 2)],
            m[(2, 0)],
            m[(2, 1)],
            m[(2, 2)],
        ]
    }

    /// Cell volume in Å³ (always non-negative).
    pub fn volume(&self) -> f64 {
        self.matrix.determinant().abs()
    }

    /// A cell with zero volume cannot map between coordinate systems.
    pub fn is_degenerate(&self) -> bool {
        self.inverse_transpose.is_none() || self.volume() < 1e-12
    }

    pub fn parameters(&self) -> LatticeParameters {
        let (a, b, c) = (self.vector(0), self.vector(1), self.vector(2));
        LatticeParameters {
            a: a.norm(),
            b: b.norm(),
            c: c.norm(),
            alpha: angle_degrees(&b, &c),
            beta: angle_degrees(&a, &c),
            gamma: angle_degrees(&a, &b),
        }
    }

    pub fn to_cartesian(&self, fractional: &Vector3<f64>) -> Vector3<f64> {
        self.matrix.transpose() * fractional
    }

    pub fn to_fractional(&self, cartesian: &Vector3<f64>) -> Option<Vector3<f64>> {
        self.inverse_transpose.map(|inv| inv * cartesian)
    }

    /// Returns the shortest periodic image of the displacement `from -> to`.
    ///
    /// Only the axes flagged in `pbc` are periodic: their fractional displacement is
    /// wrapped into `[-0.5, 0.5)` and the neighbouring images along them are searched,
    /// which yields the true minimum for skewed cells as well. Non-periodic axes keep the
    /// direct displacement. A degenerate cell falls back to the plain Cartesian
    /// displacement.
    pub fn minimum_image(&self, from: &Point3<f64>, to: &Point3<f64>, pbc: [bool; 3]) -> Vector3<f64> {
        let direct = to - from;
        if !pbc.iter().any(|&p| p) {
            return direct;
        }
        let Some(frac) = self.to_fractional(&direct) else {
            return direct;
        };
        let wrapped = Vector3::from_fn(|axis, _| {
            if pbc[axis] { frac[axis] - frac[axis].round() } else { frac[axis] }
        });
        let base = self.to_cartesian(&wrapped);
        let span = |axis: usize| if pbc[axis] { -1..=1 } else { 0..=0 };

        let mut best = base;
        let mut best_norm = base.norm_squared();
        for i in span(0) {
            for j in span(1) {
                for k in span(2) {
                    if i == 0 && j == 0 && k == 0 {
                        continue;
                    }
                    let shift = self.to_cartesian(&Vector3::new(i as f64, j as f64, k as f64));
                    let candidate = base + shift;
                    let norm = candidate.norm_squared();
                    if norm < best_norm {
                        best = candidate;
                        best_norm = norm;
                    }
                }
            }
        }
        best
    }

    /// Scales the cell (and nothing else) by a uniform factor.
    pub fn scaled(&self, factor: f64) -> Self {
        Self::new(self.matrix * factor)
    }
}

fn angle_degrees(u: &Vector3<f64>, v: &Vector3<f64>) -> f64 {
    let denom = u.norm() * v.norm();
    if denom == 0.0 {
        return 0.0;
    }
    (u.dot(v) / denom).clamp(-1.0, 1.0).acos().to_degrees()
}
