use phf::{Map, phf_map};

/// Standard atomic weights (g/mol), keyed by element symbol.
static ATOMIC_MASSES: Map<&'static str, f64> = phf_map! {
    "H" => 1.008, "He" => 4.0026, "Li" => 6.94, "Be" => 9.0122, "B" => 10.81,
    "C" => 12.011, "N" => 14.007, "O" => 15.999, "F" => 18.998, "Ne" => 20.180,
    "Na" => 22.990, "Mg" => 24.305, "Al" => 26.982, "Si" => 28.085, "P" => 30.974,
    "S" => 32.06, "Cl" => 35.45, "Ar" => 39.948, "K" => 39.098, "Ca" => 40.078,
    "Sc" => 44.956, "Ti" => 47.867, "V" => 50.942, "Cr" => 51.996, "Mn" => 54.938,
    "Fe" => 55.845, "Co" => 58.933, "Ni" => 58.693, "Cu" => 63.546, "Zn" => 65.38,
    "Ga" => 69.723, "Ge" => 72.630, "As" => 74.922, "Se" => 78.971, "Br" => 79.904,
    "Kr" => 83.798, "Rb" => 85.468, "Sr" => 87.62, "Y" => 88.906, "Zr" => 91.224,
    "Nb" => 92.906, "Mo" => 95.95, "Tc" => 98.0, "Ru" => 101.07, "Rh" => 102.91,
    "Pd" => 106.42, "Ag" => 107.87, "Cd" => 112.41, "In" => 114.82, "Sn" => 118.71,
    "Sb" => 121.76, "Te" => 127.60, "I" => 126.90, "Xe" => 131.29, "Cs" => 132.91,
    "Ba" => 137.33, "La" => 138.91, "Ce" => 140.12, "Pr" => 140.91, "Nd" => 144.24,
    "Pm" => 145.0, "Sm" => 150.36, "Eu" => 151.96, "Gd" => 157.25, "Tb" => 158.93,
    "Dy" => 162.50, "Ho" => 164.93, "Er" => 167.26, "Tm" => 168.93, "Yb" => 173.05,
    "Lu" => 174.97, "Hf" => 178.49, "Ta" => 180.95, "W" => 183.84, "Re" => 186.21,
    "Os" => 190.23, "Ir" => 192.22, "Pt" => 195.08, "Au" => 196.97, "Hg" => 200.59,
    "Tl" => 204.38, "Pb" => 207.2, "Bi" => 208.98, "Po" => 209.0, "At" => 210.0,
    "Rn" => 222.0, "Fr" => 223.0, "Ra" => 226.0, "Ac" => 227.0, "Th" => 232.04,
    "Pa" => 231.04, "U" => 238.03, "Np" => 237.0, "Pu" => 244.0, "Am" => 243.0,
    "Cm" => 247.0, "Bk" => 247.0, "Cf" => 251.0, "Es" => 252.0, "Fm" => 257.0,
    "Md" => 258.0, "No" => 259.0, "Lr" => 262.0, "Rf" => 267.0, "Db" => 270.0,
    "Sg" => 269.0, "Bh" => 270.0, "Hs" => 270.0, "Mt" => 278.0, "Ds" => 281.0,
    "Rg" => 281.0, "Cn" => 285.0, "Nh" => 286.0, "Fl" => 289.0, "Mc" => 289.0,
    "Lv" => 293.0, "Ts" => 293.0, "Og" => 294.0,
    "X" => 0.0,
};

/// Converts (g/mol) / Å³ into g/cm³, i.e. 1e24 / N_A.
const AMU_PER_A3_TO_G_PER_CM3: f64 = 1.660_539_066_60;

pub fn is_valid_symbol(symbol: &str) -> bool {
    ATOMIC_MASSES.contains_key(symbol)
}

pub fn atomic_mass(symbol: &str) -> Option<f64> {
    ATOMIC_MASSES.get(symbol).copied()
}

/// Brings a symbol into canonical case (`FE` / `fe` -> `Fe`).
///
/// Labels with trailing digits or suffixes (`Fe1`, `O_s`, `Fe_pv`) are reduced to the
/// leading alphabetic part, which is how VASP potential labels and many XYZ writers
/// decorate species names.
pub fn normalize_symbol(raw: &str) -> String {
    let letters: String = raw
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect();
    let mut chars = letters.chars();
    match chars.next() {
        Some(first) => {
            let mut out = first.to_ascii_uppercase().to_string();
            out.extend(chars.map(|c| c.to_ascii_lowercase()));
            out
        }
        None => String::new(),
    }
}

/// Mass density (g/cm³) of the given symbols in `volume` Å³.
pub fn mass_density<'a>(symbols: impl IntoIterator<Item = &'a str>, volume: f64) -> Option<f64> {
    if volume <= 0.0 {
        return None;
    }
    let mut total = 0.0;
    for symbol in symbols {
        total += atomic_mass(symbol)?;
    }
    Some(total * AMU_PER_A3_TO_G_PER_CM3 / volume)
}
