use super::properties::pair_distance;
use crate::core::models::frame::Frame;
use std::io::{self, Write};

/// One interatomic distance, atoms identified by 0-based index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairDistance {
    pub i: usize,
    pub j: usize,
    pub distance: f64,
}

/// All distances between atoms of one species pair, shortest first.
#[derive(Debug, Clone, PartialEq)]
pub struct PairClass {
    /// `A-B`, with `A` the species that appears first in the frame.
    pub label: String,
    pub distances: Vec<PairDistance>,
}

impl PairClass {
    pub fn shortest(&self) -> Option<&PairDistance> {
        self.distances.first()
    }
}

/// The shortest distance of one pair class.
#[derive(Debug, Clone, PartialEq)]
pub struct PairSummary {
    pub rank: usize,
    pub label: String,
    pub min_distance: f64,
    /// Atom labels with 1-based indices, e.g. `Fe1-O5`.
    pub atom_pair: String,
}

/// Groups every `i < j` distance by species pair.
///
/// Classes come out in the order their species first appear, so `Fe` then `O` yields
/// `Fe-Fe`, `Fe-O`, `O-O`.
pub fn pair_classes(frame: &Frame, minimum_image: bool) -> Vec<PairClass> {
    let order: Vec<String> = frame.composition().into_iter().map(|(s, _)| s).collect();
    let rank = |s: &str| order.iter().position(|o| o == s).unwrap_or(usize::MAX);

    let mut classes: Vec<((usize, usize), PairClass)> = Vec::new();
    let n = frame.len();
    for i in 0..n {
        for j in (i + 1)..n {
            let (ri, rj) = (rank(&frame.symbols[i]), rank(&frame.symbols[j]));
            let key = (ri.min(rj), ri.max(rj));
            let entry = PairDistance {
                i,
                j,
                distance: pair_distance(frame, i, j, minimum_image),
            };
            match classes.iter_mut().find(|(k, _)| *k == key) {
                Some((_, class)) => class.distances.push(entry),
                None => classes.push((
                    key,
                    PairClass {
                        label: format!("{}-{}", order[key.0], order[key.1]),
                        distances: vec![entry],
                    },
                )),
            }
        }
    }

    classes.sort_by_key(|(k, _)| *k);
    classes
        .into_iter()
        .map(|(_, mut class)| {
            class
                .distances
                .sort_by(|a, b| a.distance.total_cmp(&b.distance));
            class
        })
        .collect()
}

/// Ranks the classes by their shortest distance.
pub fn summarize(frame: &Frame, classes: &[PairClass]) -> Vec<PairSummary> {
    let mut rows: Vec<PairSummary> = classes
        .iter()
        .filter_map(|class| {
            let d = class.shortest()?;
            // Order the atoms the same way as the class label.
            let (first, second) = if class.label.starts_with(&format!("{}-", frame.symbols[d.i])) {
                (d.i, d.j)
            } else {
                (d.j, d.i)
            };
            Some(PairSummary {
                rank: 0,
                label: class.label.clone(),
                min_distance: d.distance,
                atom_pair: format!(
                    "{}{}-{}{}",
                    frame.symbols[first],
                    first + 1,
                    frame.symbols[second],
                    second + 1
                ),
            })
        })
        .collect();
    rows.sort_by(|a, b| a.min_distance.total_cmp(&b.min_distance));
    for (k, row) in rows.iter_mut().enumerate() {
        row.rank = k + 1;
    }
    rows
}

/// Writes the ranked summary as a fixed-width table.
pub fn write_summary_table(writer: &mut impl Write, rows: &[PairSummary]) -> io::Result<()> {
    writeln!(
        writer,
        "{:<8}{:<12}{:<20}{:<20}",
        "Rank", "Pair", "Min Distance (Å)", "Atom Pair"
    )?;
    writeln!(writer, "{}", "=".repeat(60))?;
    for row in rows {
        writeln!(
            writer,
            "{:<8}{:<12}{:<20.4}{:<20}",
            row.rank, row.label, row.min_distance, row.atom_pair
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    fn feo() -> Frame {
        Frame::new(
            vec!["O".into(), "Fe".into(), "O".into(), "Fe".into()],
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(2.0, 0.0, 0.0),
                Point3::new(0.0, 3.0, 0.0),
                Point3::new(0.0, 0.0, 1.5),
            ],
        )
    }

    #[test]
    fn classes_follow_first_appearance_order() {
        let classes = pair_classes(&feo(), true);
        let labels: Vec<&str> = classes.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["O-O", "O-Fe", "Fe-Fe"]);
        let o_fe = &classes[1];
        assert_eq!(o_fe.distances.len(), 4);
        assert!(o_fe.distances.windows(2).all(|w| w[0].distance <= w[1].distance));
    }

    #[test]
    fn summary_ranks_minima_and_labels_atoms_one_based() {
        let frame = feo();
        let rows = summarize(&frame, &pair_classes(&frame, true));
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].rank, 1);
        assert_eq!(rows[0].label, "O-Fe");
        assert!((rows[0].min_distance - 1.5).abs() < 1e-12);
        assert_eq!(rows[0].atom_pair, "O1-Fe4");
        assert_eq!(rows[2].label, "O-O");
    }

    #[test]
    fn summary_table_is_fixed_width() {
        let frame = feo();
        let rows = summarize(&frame, &pair_classes(&frame, true));
        let mut out = Vec::new();
        write_summary_table(&mut out, &rows).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].starts_with("Rank    Pair        Min Distance (Å)"));
        assert_eq!(lines[1], "=".repeat(60));
        assert!(lines[2].starts_with("1       O-Fe        1.5000"));
    }
}
