/// eV/Å³ to GPa.
pub const EV_PER_A3_TO_GPA: f64 = 160.21766208;

/// kBar (VASP stress output) to GPa.
pub const KBAR_TO_GPA: f64 = 0.1;
