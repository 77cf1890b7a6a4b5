//! Minimum cost bipartite assignment.
//!
//! The solver is the shortest augmenting path variant of the Kuhn-Munkres algorithm
//! (Crouse, "On implementing 2D rectangular assignment algorithms", 2016), the same one
//! `scipy.optimize.linear_sum_assignment` uses, with the same tie-breaking: among equally cheap
//! augmentations the free column found last in the reversed column scan wins, so a constant
//! matrix binds row `i` to column `i`.
//!
use crate::Errors;
use anyhow::Result;
use itertools::Itertools;
use pathfinding::matrix::Matrix;

/// Cost assigned to the pairs that must never be matched. The value is finite so that the
/// solver always produces `min(rows, columns)` pairs; the pairs carrying it are dropped by
/// [`assign`].
///
pub const UNASSIGNABLE_COST: f32 = 1.0e5;

/// Result of the gated assignment
///
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Assignment {
    /// `(row, column)` pairs sorted by row
    pub matches: Vec<(usize, usize)>,
    /// rows without a match, ascending
    pub unmatched_rows: Vec<usize>,
    /// columns without a match, ascending
    pub unmatched_columns: Vec<usize>,
}

impl Assignment {
    fn unmatched(rows: usize, columns: usize) -> Self {
        Self {
            matches: Vec::default(),
            unmatched_rows: (0..rows).collect(),
            unmatched_columns: (0..columns).collect(),
        }
    }
}

/// Working memory of the solver. The matrix is always oriented so that `rows <= columns`.
///
struct ShortestPathSolver {
    rows: usize,
    columns: usize,
    u: Vec<f64>,
    v: Vec<f64>,
    shortest_path_costs: Vec<f64>,
    path: Vec<usize>,
    col4row: Vec<Option<usize>>,
    row4col: Vec<Option<usize>>,
    visited_rows: Vec<bool>,
    visited_columns: Vec<bool>,
    remaining: Vec<usize>,
}

impl ShortestPathSolver {
    fn new(rows: usize, columns: usize) -> Self {
        debug_assert!(rows <= columns);
        Self {
            rows,
            columns,
            u: vec![0.0; rows],
            v: vec![0.0; columns],
            shortest_path_costs: vec![f64::INFINITY; columns],
            path: vec![0; columns],
            col4row: vec![None; rows],
            row4col: vec![None; columns],
            visited_rows: vec![false; rows],
            visited_columns: vec![false; columns],
            remaining: vec![0; columns],
        }
    }

    /// Finds the cheapest augmenting path starting at `start_row`.
    /// Returns the free column the path ends in and the path length.
    ///
    fn augmenting_path<F>(&mut self, cost: &F, start_row: usize) -> Option<(usize, f64)>
    where
        F: Fn(usize, usize) -> f64,
    {
        let mut min_val = 0.0;
        let mut num_remaining = self.columns;

        // columns are scanned in reverse order
        for (it, r) in self.remaining.iter_mut().enumerate() {
            *r = self.columns - it - 1;
        }

        self.visited_rows.fill(false);
        self.visited_columns.fill(false);
        self.shortest_path_costs.fill(f64::INFINITY);

        let mut i = start_row;
        loop {
            let mut index = None;
            let mut lowest = f64::INFINITY;
            self.visited_rows[i] = true;

            for it in 0..num_remaining {
                let j = self.remaining[it];
                let r = min_val + cost(i, j) - self.u[i] - self.v[j];
                if r < self.shortest_path_costs[j] {
                    self.path[j] = i;
                    self.shortest_path_costs[j] = r;
                }

                let spc = self.shortest_path_costs[j];
                if spc < lowest || (spc == lowest && self.row4col[j].is_none()) {
                    lowest = spc;
                    index = Some(it);
                }
            }

            min_val = lowest;
            let index = index?;
            if !min_val.is_finite() {
                return None;
            }

            let j = self.remaining[index];
            self.visited_columns[j] = true;
            num_remaining -= 1;
            self.remaining[index] = self.remaining[num_remaining];

            match self.row4col[j] {
                None => return Some((j, min_val)),
                Some(next) => i = next,
            }
        }
    }

    fn solve<F>(mut self, cost: F) -> Vec<Option<usize>>
    where
        F: Fn(usize, usize) -> f64,
    {
        for cur_row in 0..self.rows {
            let Some((sink, min_val)) = self.augmenting_path(&cost, cur_row) else {
                // finite costs always admit a complete assignment of the shorter side
                debug_assert!(false, "No augmenting path for row {cur_row}");
                break;
            };

            self.u[cur_row] += min_val;
            for i in 0..self.rows {
                if self.visited_rows[i] && i != cur_row {
                    if let Some(j) = self.col4row[i] {
                        self.u[i] += min_val - self.shortest_path_costs[j];
                    }
                }
            }

            for j in 0..self.columns {
                if self.visited_columns[j] {
                    self.v[j] -= min_val - self.shortest_path_costs[j];
                }
            }

            let mut j = sink;
            loop {
                let i = self.path[j];
                self.row4col[j] = Some(i);
                let previous = self.col4row[i].replace(j);
                match previous {
                    Some(p) if i != cur_row => j = p,
                    _ => break,
                }
            }
        }

        self.col4row
    }
}

/// Solves the rectangular linear sum assignment problem.
///
/// Returns exactly `min(rows, columns)` pairs `(row, column)` sorted by row that minimize the
/// sum of the selected costs. When the matrix has more rows than columns it is solved
/// transposed, so the surplus rows stay unmatched.
///
/// # Parameters
/// * `cost` - the cost matrix, every value must be finite
///
pub fn linear_sum_assignment(cost: &Matrix<f32>) -> Result<Vec<(usize, usize)>> {
    let (rows, columns) = (cost.rows, cost.columns);
    if rows == 0 || columns == 0 {
        return Ok(Vec::default());
    }

    for r in 0..rows {
        for c in 0..columns {
            if !cost[(r, c)].is_finite() {
                return Err(Errors::InvalidCostValue(r, c).into());
            }
        }
    }

    let transposed = columns < rows;
    let solution = if transposed {
        ShortestPathSolver::new(columns, rows).solve(|i, j| f64::from(cost[(j, i)]))
    } else {
        ShortestPathSolver::new(rows, columns).solve(|i, j| f64::from(cost[(i, j)]))
    };

    let pairs = solution
        .into_iter()
        .enumerate()
        .filter_map(|(i, j)| j.map(|j| if transposed { (j, i) } else { (i, j) }))
        .sorted_by_key(|(row, _)| *row)
        .collect::<Vec<_>>();

    debug_assert_eq!(pairs.len(), rows.min(columns));
    Ok(pairs)
}

/// Solves the assignment and drops the pairs that carry [`UNASSIGNABLE_COST`].
///
/// A matrix where every entry is unassignable is a valid input, all the rows and columns are
/// reported as unmatched.
///
pub fn assign(cost: &Matrix<f32>) -> Result<Assignment> {
    let (rows, columns) = (cost.rows, cost.columns);
    if rows == 0 || columns == 0 {
        return Ok(Assignment::unmatched(rows, columns));
    }

    let matches = linear_sum_assignment(cost)?
        .into_iter()
        .filter(|&(r, c)| cost[(r, c)] < UNASSIGNABLE_COST)
        .collect::<Vec<_>>();

    let mut matched_rows = vec![false; rows];
    let mut matched_columns = vec![false; columns];
    for &(r, c) in &matches {
        matched_rows[r] = true;
        matched_columns[c] = true;
    }

    Ok(Assignment {
        unmatched_rows: (0..rows).filter(|r| !matched_rows[*r]).collect(),
        unmatched_columns: (0..columns).filter(|c| !matched_columns[*c]).collect(),
        matches,
    })
}

#[cfg(feature = "python")]
pub mod python {
    use super::linear_sum_assignment;
    use pathfinding::matrix::Matrix;
    use pyo3::exceptions::PyValueError;
    use pyo3::prelude::*;

    /// Solves the assignment for a row-major cost matrix, returns `(row, column)` pairs
    ///
    #[pyfunction]
    #[pyo3(name = "linear_sum_assignment")]
    pub fn linear_sum_assignment_py(cost: Vec<Vec<f32>>) -> PyResult<Vec<(usize, usize)>> {
        if cost.is_empty() {
            return Ok(Vec::default());
        }
        let cost =
            Matrix::from_rows(cost).map_err(|e| PyValueError::new_err(format!("{e:?}")))?;
        linear_sum_assignment(&cost).map_err(|e| PyValueError::new_err(e.to_string()))
    }
}
