//! Geometric assignment between tracked identities and new detections.

use lapjv::LapJVError;
use ndarray::{Array2, Axis};

use crate::error::ContractViolation;
use crate::tracker::detection::Observation;

/// Build the cost matrix: one row per tracked observation, one column per
/// detection. `+inf` cells are allowed and mean "never pair these".
pub fn distance_matrix<D: Observation>(
    tracked: &[&D],
    detections: &[D],
) -> Result<Array2<f64>, ContractViolation> {
    let mut dists = Array2::zeros((tracked.len(), detections.len()));
    for (i, t) in tracked.iter().enumerate() {
        for (j, d) in detections.iter().enumerate() {
            let value = t.distance_to(d);
            if value.is_nan() || value < 0.0 {
                return Err(ContractViolation::InvalidDistance {
                    row: i,
                    col: j,
                    value,
                });
            }
            dists[[i, j]] = value;
        }
    }
    Ok(dists)
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentResult {
    pub matches: Vec<(usize, usize)>,
    pub unmatched_tracks: Vec<usize>,
    pub unmatched_detections: Vec<usize>,
}

/// Minimum-cost rectangular assignment.
///
/// The matrix is padded to a square with a constant fill so that every
/// solution uses the same number of padding cells, which keeps the optimum
/// over real cells intact. Non-finite cells get a cost larger than any
/// feasible total and are reported unmatched if the solver still has to
/// pick them.
///
/// Among equally cheap solutions the result is the row-major first one:
/// rows are fixed in order, each to the lowest column that still admits an
/// optimal completion. A tracked face exactly as far from two detections
/// therefore takes the earlier one.
pub fn linear_assignment(cost_matrix: &Array2<f64>) -> AssignmentResult {
    let (num_rows, num_cols) = cost_matrix.dim();

    if num_rows == 0 {
        return AssignmentResult {
            matches: vec![],
            unmatched_tracks: vec![],
            unmatched_detections: (0..num_cols).collect(),
        };
    }

    if num_cols == 0 {
        return AssignmentResult {
            matches: vec![],
            unmatched_tracks: (0..num_rows).collect(),
            unmatched_detections: vec![],
        };
    }

    let size = num_rows.max(num_cols);
    let max_finite = cost_matrix
        .iter()
        .copied()
        .filter(|c| c.is_finite())
        .fold(0.0_f64, f64::max);
    let fill = max_finite * size as f64 + 1.0;

    let mut padded = Array2::<f64>::from_elem((size, size), fill);
    for ((i, j), &c) in cost_matrix.indexed_iter() {
        padded[[i, j]] = if c.is_finite() { c } else { fill };
    }

    let mut matches = vec![];
    let mut unmatched_tracks = vec![];
    let mut unmatched_detections_mask: Vec<bool> = vec![true; num_cols];

    match row_major_optimum(&padded, num_rows) {
        Ok(row_to_col) => {
            for (row_idx, &col_idx) in row_to_col.iter().enumerate() {
                if col_idx >= num_cols || !cost_matrix[[row_idx, col_idx]].is_finite() {
                    unmatched_tracks.push(row_idx);
                } else {
                    matches.push((row_idx, col_idx));
                    unmatched_detections_mask[col_idx] = false;
                }
            }
        }
        Err(err) => {
            log::warn!("assignment solver failed, leaving all tracks unmatched: {err:?}");
            unmatched_tracks = (0..num_rows).collect();
        }
    }

    let unmatched_detections: Vec<usize> = unmatched_detections_mask
        .iter()
        .enumerate()
        .filter_map(|(i, &u)| if u { Some(i) } else { None })
        .collect();

    AssignmentResult {
        matches,
        unmatched_tracks,
        unmatched_detections,
    }
}

/// Solve a square matrix, returning the column of every row and the total.
fn solve(cost: &Array2<f64>) -> Result<(Vec<usize>, f64), LapJVError> {
    if cost.is_empty() {
        return Ok((vec![], 0.0));
    }
    let (row_to_col, _) = lapjv::lapjv(cost)?;
    let total = lapjv::cost(cost, &row_to_col);
    Ok((row_to_col, total))
}

fn same_total(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
}

/// Columns for the first `rows` rows of the row-major first optimal
/// assignment of a square matrix.
fn row_major_optimum(padded: &Array2<f64>, rows: usize) -> Result<Vec<usize>, LapJVError> {
    let size = padded.nrows();
    // Optimal assignment consistent with every choice made so far.
    let (mut witness, _) = solve(padded)?;
    let mut used = vec![false; size];
    let mut chosen = Vec::with_capacity(rows);

    for row in 0..rows {
        let rest: Vec<usize> = (row + 1..size).collect();
        let remaining: f64 = (row..size).map(|r| padded[[r, witness[r]]]).sum();

        for col in (0..size).filter(|&c| !used[c]) {
            if witness[row] == col {
                break;
            }
            let free: Vec<usize> = (0..size).filter(|&c| !used[c] && c != col).collect();
            let sub = padded.select(Axis(0), &rest).select(Axis(1), &free);
            let (sub_cols, sub_total) = solve(&sub)?;
            if same_total(padded[[row, col]] + sub_total, remaining) {
                witness[row] = col;
                for (k, &c) in sub_cols.iter().enumerate() {
                    witness[rest[k]] = free[c];
                }
                break;
            }
        }

        used[witness[row]] = true;
        chosen.push(witness[row]);
    }

    Ok(chosen)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::detection::{EYE_LANDMARKS, FaceDetection};
    use nalgebra::Point2;
    use ndarray::{Array3, array};

    fn total_cost(cost: &Array2<f64>, matches: &[(usize, usize)]) -> f64 {
        matches.iter().map(|&(i, j)| cost[[i, j]]).sum()
    }

    #[test]
    fn test_prefers_diagonal_over_crossed() {
        let cost = array![[1.0, 9.0], [9.0, 1.0]];
        let result = linear_assignment(&cost);
        assert_eq!(result.matches, vec![(0, 0), (1, 1)]);
        assert_eq!(total_cost(&cost, &result.matches), 2.0);
        assert!(result.unmatched_tracks.is_empty());
        assert!(result.unmatched_detections.is_empty());
    }

    #[test]
    fn test_more_detections_than_tracks() {
        let cost = array![[5.0, 1.0, 7.0]];
        let result = linear_assignment(&cost);
        assert_eq!(result.matches, vec![(0, 1)]);
        assert_eq!(result.unmatched_detections, vec![0, 2]);
    }

    #[test]
    fn test_more_tracks_than_detections() {
        let cost = array![[4.0], [2.0], [3.0]];
        let result = linear_assignment(&cost);
        assert_eq!(result.matches, vec![(1, 0)]);
        assert_eq!(result.unmatched_tracks, vec![0, 2]);
        assert!(result.unmatched_detections.is_empty());
    }

    #[test]
    fn test_global_optimum_beats_greedy() {
        // Greedy on row 0 would take column 0 (cost 1) and force 10 + 1.
        let cost = array![[1.0, 2.0], [1.5, 10.0]];
        let result = linear_assignment(&cost);
        assert_eq!(result.matches, vec![(0, 1), (1, 0)]);
        assert_eq!(total_cost(&cost, &result.matches), 3.5);
    }

    #[test]
    fn test_infinite_cells_are_never_matched() {
        let cost = array![[f64::INFINITY, f64::INFINITY], [3.0, f64::INFINITY]];
        let result = linear_assignment(&cost);
        assert_eq!(result.matches, vec![(1, 0)]);
        assert_eq!(result.unmatched_tracks, vec![0]);
        assert_eq!(result.unmatched_detections, vec![1]);
    }

    #[test]
    fn test_empty_inputs() {
        let no_rows = Array2::<f64>::zeros((0, 2));
        assert_eq!(linear_assignment(&no_rows).unmatched_detections, vec![0, 1]);

        let no_cols = Array2::<f64>::zeros((3, 0));
        assert_eq!(linear_assignment(&no_cols).unmatched_tracks, vec![0, 1, 2]);
    }

    #[test]
    fn test_ties_resolve_row_major() {
        let square = array![[2.0, 2.0], [2.0, 2.0]];
        assert_eq!(linear_assignment(&square).matches, vec![(0, 0), (1, 1)]);

        let tall = array![[1.0], [1.0], [1.0]];
        let result = linear_assignment(&tall);
        assert_eq!(result.matches, vec![(0, 0)]);
        assert_eq!(result.unmatched_tracks, vec![1, 2]);

        let wide = Array2::<f64>::zeros((2, 3));
        let result = linear_assignment(&wide);
        assert_eq!(result.matches, vec![(0, 0), (1, 1)]);
        assert_eq!(result.unmatched_detections, vec![2]);
    }

    #[test]
    fn test_ties_never_cost_optimality() {
        // Row 0 is indifferent, row 1 only fits column 0.
        let cost = array![[3.0, 3.0, 3.0], [1.0, 8.0, 8.0], [5.0, 5.0, 5.0]];
        let result = linear_assignment(&cost);
        assert_eq!(result.matches, vec![(0, 1), (1, 0), (2, 2)]);
        assert_eq!(total_cost(&cost, &result.matches), 9.0);
    }

    fn at(x: f32) -> FaceDetection {
        let landmarks = (0..EYE_LANDMARKS).map(|i| Point2::new(x + i as f32, 0.0)).collect();
        FaceDetection::new(landmarks, Array3::zeros((2, 2, 3)))
    }

    #[test]
    fn test_distance_matrix_layout() {
        let tracked = [at(0.0), at(10.0)];
        let previous: Vec<&FaceDetection> = tracked.iter().collect();
        let dists = distance_matrix(&previous, &[at(1.0), at(4.0), at(10.0)]).unwrap();
        assert_eq!(dists, array![[1.0, 4.0, 10.0], [9.0, 6.0, 0.0]]);
    }

    #[test]
    fn test_distance_matrix_rejects_nan() {
        let mut broken = at(3.0);
        broken.landmarks[0].x = f32::NAN;
        let tracked = [at(0.0)];
        let previous: Vec<&FaceDetection> = tracked.iter().collect();
        let err = distance_matrix(&previous, &[at(1.0), broken]).unwrap_err();
        assert!(matches!(
            err,
            ContractViolation::InvalidDistance { row: 0, col: 1, value } if value.is_nan()
        ));
    }
}
