//! Property tests for the matrix graph.
//!
//! Random insertion sequences must keep every row strictly ascending and
//! inside the column range, and the three lookup paths (`position`,
//! `position_test`, `positions_sorted`) must agree with the stored rows.

use blocksparse::matrix::{MatrixGraph, UNUSED};
use blocksparse::SparseError;
use proptest::prelude::*;

const ROWS: usize = 8;
const COLS: usize = 10;
const CAPACITY: usize = 5;

/// Insert `(row, col)` pairs, ignoring those that hit a full row.
fn build(inserts: &[(usize, usize)]) -> MatrixGraph {
    let mut g = MatrixGraph::with_row_capacities(&[CAPACITY; ROWS], COLS);
    for &(i, j) in inserts {
        match g.create_position(i, j) {
            Ok(_) | Err(SparseError::CapacityExceeded { .. }) => {}
            Err(e) => panic!("unexpected error {e}"),
        }
    }
    g
}

fn inserts() -> impl Strategy<Value = Vec<(usize, usize)>> {
    prop::collection::vec((0..ROWS, 0..COLS), 0..60)
}

proptest! {
    #[test]
    fn rows_stay_sorted_and_in_range(ins in inserts()) {
        let g = build(&ins);
        let offsets = g.row_offsets();
        prop_assert_eq!(offsets[0], 0);
        prop_assert_eq!(offsets[ROWS], g.nze());
        for i in 0..ROWS {
            let row = g.row_indices(i);
            prop_assert!(row.windows(2).all(|w| w[0] < w[1]));
            prop_assert!(row.iter().all(|&c| c < COLS));
            prop_assert!(row.len() <= g.capacity(i));
            let free = &g.col_indices()[offsets[i] + row.len()..offsets[i + 1]];
            prop_assert!(free.iter().all(|&c| c == UNUSED));
        }
    }

    #[test]
    fn position_found_iff_stored(ins in inserts(), i in 0..ROWS, j in 0..COLS) {
        let g = build(&ins);
        let stored = g.row_indices(i).contains(&j);
        prop_assert_eq!(g.position_test(i, j).is_some(), stored);
        match g.position(i, j) {
            Ok(p) => prop_assert_eq!(g.col_indices()[p], j),
            Err(e) => prop_assert_eq!(e, SparseError::StructuralNotFound { row: i, col: j }),
        }
    }

    #[test]
    fn sorted_lookup_matches_single_lookups(ins in inserts(), i in 0..ROWS, mask in any::<u8>()) {
        let g = build(&ins);
        let cols: Vec<usize> = g
            .row_indices(i)
            .iter()
            .enumerate()
            .filter(|(k, _)| mask & (1 << (k % 8)) != 0)
            .map(|(_, &c)| c)
            .collect();
        let mut pos = vec![0; cols.len()];
        g.positions_sorted(i, &cols, &mut pos).unwrap();
        for (&c, &p) in cols.iter().zip(&pos) {
            prop_assert_eq!(p, g.position(i, c).unwrap());
        }
    }

    #[test]
    fn raw_parts_round_trip(ins in inserts()) {
        let g = build(&ins);
        let h = MatrixGraph::from_raw_parts(
            g.size(),
            g.width(),
            g.row_offsets().to_vec(),
            g.col_indices().to_vec(),
        )
        .unwrap();
        for i in 0..ROWS {
            prop_assert_eq!(h.row_indices(i), g.row_indices(i));
            prop_assert_eq!(h.capacity(i), g.capacity(i));
        }
    }

    #[test]
    fn balancing_covers_all_rows(ins in inserts(), parts in 1usize..6) {
        let mut g = build(&ins);
        g.calc_balancing_with(parts);
        let b = g.balancing();
        prop_assert_eq!(b.size(), ROWS);
        let mut next = 0;
        for r in b.ranges() {
            prop_assert_eq!(r.start, next);
            next = r.end;
        }
        prop_assert_eq!(next, ROWS);
    }
}

#[test]
fn capacity_exhaustion_names_the_row() {
    let mut g = MatrixGraph::with_row_capacities(&[1, 2], 3);
    g.create_position(0, 2).unwrap();
    let err = g.create_position(0, 0).unwrap_err();
    assert_eq!(err, SparseError::CapacityExceeded { row: 0, col: 0, capacity: 1 });
    assert!(err.to_string().contains("row 0"));
}
