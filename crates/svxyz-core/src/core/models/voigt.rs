use nalgebra::Matrix3;
use std::fmt;
use std::ops::{Index, Mul, Neg};
use std::str::FromStr;

/// One of the six independent components of a symmetric 3x3 tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VoigtComponent {
    Xx,
    Yy,
    Zz,
    Yz,
    Xz,
    Xy,
}

impl VoigtComponent {
    pub const ALL: [VoigtComponent; 6] = [
        VoigtComponent::Xx,
        VoigtComponent::Yy,
        VoigtComponent::Zz,
        VoigtComponent::Yz,
        VoigtComponent::Xz,
        VoigtComponent::Xy,
    ];

    pub fn index(self) -> usize {
        match self {
            VoigtComponent::Xx => 0,
            VoigtComponent::Yy => 1,
            VoigtComponent::Zz => 2,
            VoigtComponent::Yz => 3,
            VoigtComponent::Xz => 4,
            VoigtComponent::Xy => 5,
        }
    }

    pub fn suffix(self) -> &'static str {
        match self {
            VoigtComponent::Xx => "xx",
            VoigtComponent::Yy => "yy",
            VoigtComponent::Zz => "zz",
            VoigtComponent::Yz => "yz",
            VoigtComponent::Xz => "xz",
            VoigtComponent::Xy => "xy",
        }
    }

    /// Parses the component part of keys such as `S_xx`, `V_yz` or a bare `zx`.
    pub fn from_key(key: &str) -> Option<Self> {
        let suffix = key.rsplit('_').next().unwrap_or(key);
        suffix.parse().ok()
    }
}

impl FromStr for VoigtComponent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "xx" => Ok(VoigtComponent::Xx),
            "yy" => Ok(VoigtComponent::Yy),
            "zz" => Ok(VoigtComponent::Zz),
            "yz" | "zy" => Ok(VoigtComponent::Yz),
            "xz" | "zx" => Ok(VoigtComponent::Xz),
            "xy" | "yx" => Ok(VoigtComponent::Xy),
            other => Err(format!("'{}' is not a tensor component", other)),
        }
    }
}

impl fmt::Display for VoigtComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// A symmetric tensor in Voigt notation, ordered `xx yy zz yz xz xy`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Voigt(pub [f64; 6]);

impl Voigt {
    pub fn new(values: [f64; 6]) -> Self {
        Self(values)
    }

    pub fn from_matrix(m: &Matrix3<f64>) -> Self {
        Self([
            m[(0, 0)],
            m[(1, 1)],
            m[(2, 2)],
            m[(1, 2)],
            m[(0, 2)],
            m[(0, 1)],
        ])
    }

    pub fn to_matrix(&self) -> Matrix3<f64> {
        let [xx, yy, zz, yz, xz, xy] = self.0;
        Matrix3::new(xx, xy, xz, xy, yy, yz, xz, yz, zz)
    }

    /// Reorders the VASP output convention `xx yy zz xy yz zx` into Voigt order.
    pub fn from_vasp_order(values: [f64; 6]) -> Self {
        Self([
            values[0], values[1], values[2], values[4], values[5], values[3],
        ])
    }

    pub fn get(&self, component: VoigtComponent) -> f64 {
        self.0[component.index()]
    }

    /// Mean of the three diagonal components.
    pub fn trace_mean(&self) -> f64 {
        (self.0[0] + self.0[1] + self.0[2]) / 3.0
    }

    pub fn values(&self) -> &[f64; 6] {
        &self.0
    }

    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|v| v.is_finite())
    }
}

impl Index<VoigtComponent> for Voigt {
    type Output = f64;

    fn index(&self, component: VoigtComponent) -> &f64 {
        &self.0[component.index()]
    }
}

impl Mul<f64> for Voigt {
    type Output = Voigt;

    fn mul(self, rhs: f64) -> Voigt {
        Voigt(self.0.map(|v| v * rhs))
    }
}

impl Neg for Voigt {
    type Output = Voigt;

    fn neg(self) -> Voigt {
        self * -1.0
    }
}
