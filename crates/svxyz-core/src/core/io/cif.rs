use crate::core::io::traits::TrajectoryWriter;
use crate::core::models::frame::Frame;
use std::collections::HashMap;
use std::io::{self, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CifError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Cannot write frame {frame} as CIF: {reason}")]
    Unwritable { frame: usize, reason: String },
}

/// Crystallographic Information File writer.
///
/// Every frame becomes one `data_image<i>` block in space group P 1, holding the cell
/// parameters and the fractional coordinates of every site.
pub struct CifFile;

impl CifFile {
    fn write_block(index: usize, frame: &Frame, writer: &mut impl Write) -> Result<(), CifError> {
        let unwritable = |reason: String| CifError::Unwritable {
            frame: index,
            reason,
        };
        frame.validate().map_err(unwritable)?;
        let cell = frame
            .cell
            .as_ref()
            .filter(|c| !c.is_degenerate())
            .ok_or_else(|| unwritable("frame has no usable cell".to_string()))?;
        let p = cell.parameters();

        writeln!(writer, "data_image{}", index)?;
        writeln!(writer, "_chemical_formula_structural       {}", frame.formula())?;
        writeln!(writer, "_cell_length_a       {:.6}", p.a)?;
        writeln!(writer, "_cell_length_b       {:.6}", p.b)?;
        writeln!(writer, "_cell_length_c       {:.6}", p.c)?;
        writeln!(writer, "_cell_angle_alpha    {:.6}", p.alpha)?;
        writeln!(writer, "_cell_angle_beta     {:.6}", p.beta)?;
        writeln!(writer, "_cell_angle_gamma    {:.6}", p.gamma)?;
        writeln!(writer, "_cell_volume         {:.6}", cell.volume())?;
        writeln!(writer)?;
        writeln!(writer, "_space_group_name_H-M_alt    \"P 1\"")?;
        writeln!(writer, "_space_group_IT_number       1")?;
        writeln!(writer)?;
        writeln!(writer, "loop_")?;
        writeln!(writer, "  _space_group_symop_operation_xyz")?;
        writeln!(writer, "  'x, y, z'")?;
        writeln!(writer)?;
        writeln!(writer, "loop_")?;
        for tag in [
            "_atom_site_type_symbol",
            "_atom_site_label",
            "_atom_site_symmetry_multiplicity",
            "_atom_site_fract_x",
            "_atom_site_fract_y",
            "_atom_site_fract_z",
            "_atom_site_occupancy",
        ] {
            writeln!(writer, "  {}", tag)?;
        }

        let mut per_species: HashMap<&str, usize> = HashMap::new();
        for (symbol, position) in frame.symbols.iter().zip(&frame.positions) {
            let n = per_species.entry(symbol.as_str()).or_insert(0);
            *n += 1;
            let f = cell
                .to_fractional(&position.coords)
                .ok_or_else(|| unwritable("frame has no usable cell".to_string()))?;
            writeln!(
                writer,
                "  {:<3} {:<7} 1.0  {:>10.7}  {:>10.7}  {:>10.7}  1.0000",
                symbol,
                format!("{}{}", symbol, n),
                f.x,
                f.y,
                f.z
            )?;
        }
        writeln!(writer)?;
        Ok(())
    }
}

impl TrajectoryWriter for CifFile {
    type Error = CifError;
    const MULTI_FRAME: bool = true;

    fn write_frames(frames: &[Frame], writer: &mut impl Write) -> Result<(), Self::Error> {
        for (index, frame) in frames.iter().enumerate() {
            Self::write_block(index, frame, writer)?;
        }
        Ok(())
    }
}
