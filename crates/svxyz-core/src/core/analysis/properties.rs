use crate::core::models::frame::Frame;
use crate::core::models::voigt::Voigt;
use crate::core::units::EV_PER_A3_TO_GPA;

/// Norm of each per-atom force vector.
pub fn force_norms(frame: &Frame) -> Option<Vec<f64>> {
    frame
        .forces
        .as_ref()
        .map(|forces| forces.iter().map(|f| f.norm()).collect())
}

/// Largest per-atom force norm (eV/Å).
pub fn max_force(frame: &Frame) -> Option<f64> {
    force_norms(frame)?.into_iter().reduce(f64::max)
}

/// Mean per-atom force norm (eV/Å).
pub fn mean_force(frame: &Frame) -> Option<f64> {
    let norms = force_norms(frame)?;
    if norms.is_empty() {
        return None;
    }
    Some(norms.iter().sum::<f64>() / norms.len() as f64)
}

/// Converts a stored (tensile positive, eV/Å³) stress into GPa, compressive positive.
pub fn stress_to_gpa(stress: &Voigt) -> Voigt {
    -(*stress * EV_PER_A3_TO_GPA)
}

/// The frame's stress in GPa, compressive positive.
pub fn stress_gpa(frame: &Frame) -> Option<Voigt> {
    frame.stress.as_ref().map(stress_to_gpa)
}

/// Pressure (GPa) as the mean of the normal stress components.
pub fn pressure(stress_gpa: &Voigt) -> f64 {
    stress_gpa.trace_mean()
}

/// Virial (eV) of a compressive-positive GPa stress acting on `volume` Å³.
pub fn virial(stress_gpa: &Voigt, volume: f64) -> Voigt {
    *stress_gpa * (volume / EV_PER_A3_TO_GPA)
}

/// Interatomic distance between atoms `i` and `j`.
///
/// With `minimum_image` set and a periodic frame the shortest periodic image is used,
/// wrapping only along the axes the frame's `pbc` flags mark periodic.
pub fn pair_distance(frame: &Frame, i: usize, j: usize, minimum_image: bool) -> f64 {
    let (a, b) = (&frame.positions[i], &frame.positions[j]);
    match &frame.cell {
        Some(cell) if minimum_image && frame.is_periodic() => {
            cell.minimum_image(a, b, frame.pbc).norm()
        }
        _ => (b - a).norm(),
    }
}

/// Smallest distance over all atom pairs, `None` for frames with fewer than two atoms.
pub fn min_pair_distance(frame: &Frame, minimum_image: bool) -> Option<f64> {
    let n = frame.len();
    let mut best: Option<f64> = None;
    for i in 0..n {
        for j in (i + 1)..n {
            let d = pair_distance(frame, i, j, minimum_image);
            best = Some(best.map_or(d, |b| b.min(d)));
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::cell::Cell;
    use nalgebra::{Matrix3, Point3, Vector3};

    fn dimer() -> Frame {
        let mut f = Frame::new(
            vec!["H".into(), "H".into()],
            vec![Point3::new(0.5, 0.0, 0.0), Point3::new(9.5, 0.0, 0.0)],
        );
        f.forces = Some(vec![Vector3::new(3.0, 4.0, 0.0), Vector3::new(0.0, 0.0, 1.0)]);
        f
    }

    #[test]
    fn force_statistics_use_per_atom_norms() {
        let f = dimer();
        assert_eq!(max_force(&f), Some(5.0));
        assert_eq!(mean_force(&f), Some(3.0));
        let mut bare = f.clone();
        bare.forces = None;
        assert_eq!(max_force(&bare), None);
        assert_eq!(mean_force(&bare), None);
    }

    #[test]
    fn stress_conversion_flips_sign_to_compressive() {
        let tensile = Voigt::new([1.0 / EV_PER_A3_TO_GPA, 0.0, 0.0, 0.0, 0.0, 0.0]);
        let gpa = stress_to_gpa(&tensile);
        assert!((gpa.values()[0] + 1.0).abs() < 1e-12);
        assert!((pressure(&gpa) + 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn virial_scales_with_volume() {
        let gpa = Voigt::new([EV_PER_A3_TO_GPA, 0.0, 0.0, 0.0, 0.0, 0.0]);
        let v = virial(&gpa, 10.0);
        assert!((v.values()[0] - 10.0).abs() < 1e-12);
    }

    #[test]
    fn min_distance_respects_minimum_image_flag() {
        let mut f = dimer();
        assert!((min_pair_distance(&f, true).unwrap() - 9.0).abs() < 1e-12);
        f.set_cell(Cell::new(Matrix3::identity() * 10.0));
        assert!((min_pair_distance(&f, true).unwrap() - 1.0).abs() < 1e-12);
        assert!((min_pair_distance(&f, false).unwrap() - 9.0).abs() < 1e-12);
        f.pbc = [false; 3];
        assert!((min_pair_distance(&f, true).unwrap() - 9.0).abs() < 1e-12);
    }

    #[test]
    fn slab_vacuum_gap_is_not_wrapped() {
        let mut f = Frame::new(
            vec!["H".into(), "H".into()],
            vec![Point3::new(1.0, 1.0, 0.1), Point3::new(1.0, 1.0, 19.9)],
        );
        f.set_cell(Cell::new(Matrix3::from_diagonal(&Vector3::new(10.0, 10.0, 20.0))));
        f.pbc = [true, true, false];
        assert!((min_pair_distance(&f, true).unwrap() - 19.8).abs() < 1e-9);
        f.pbc = [true; 3];
        assert!((min_pair_distance(&f, true).unwrap() - 0.2).abs() < 1e-9);
    }

    #[test]
    fn single_atom_has_no_pair_distance() {
        let f = Frame::new(vec!["He".into()], vec![Point3::origin()]);
        assert_eq!(min_pair_distance(&f, true), None);
    }
}
