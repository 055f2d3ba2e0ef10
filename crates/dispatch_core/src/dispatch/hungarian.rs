//! Hungarian (Kuhn-Munkres) solver for sparse minimum-cost bipartite assignment.
//!
//! Maximizes the number of assigned pairs first, then minimizes their summed
//! cost. Pairs not listed as edges are never assigned.

use pathfinding::kuhn_munkres::{kuhn_munkres, Weights};

/// Costs are clamped to one day, in milliseconds.
const MAX_COST_MS: i64 = 86_400_000;

/// Simple matrix type implementing pathfinding's Weights for i64.
struct I64Weights(Vec<Vec<i64>>);

impl Weights<i64> for I64Weights {
    fn rows(&self) -> usize {
        self.0.len()
    }

    fn columns(&self) -> usize {
        self.0.first().map_or(0, |r| r.len())
    }

    fn at(&self, row: usize, col: usize) -> i64 {
        self.0[row][col]
    }

    fn neg(&self) -> Self {
        I64Weights(
            self.0
                .iter()
                .map(|r| r.iter().map(|&x| x.saturating_neg()).collect())
                .collect(),
        )
    }
}

fn cost_to_ms(cost: f64) -> i64 {
    if cost.is_nan() || cost <= 0.0 {
        0
    } else {
        ((cost * 1000.0).round() as i64).min(MAX_COST_MS)
    }
}

/// Solve the assignment over `rows × cols` given sparse `(row, col, cost)` edges
/// (cost in seconds). Returns disjoint `(row, col)` pairs sorted by row.
pub fn solve(rows: usize, cols: usize, edges: &[(usize, usize, f64)]) -> Vec<(usize, usize)> {
    let edges: Vec<(usize, usize, i64)> = edges
        .iter()
        .filter(|(r, c, _)| *r < rows && *c < cols)
        .map(|&(r, c, cost)| (r, c, cost_to_ms(cost)))
        .collect();
    if edges.is_empty() {
        return Vec::new();
    }

    // Every feasible edge is worth more than any cost saving across the whole
    // assignment, so cardinality comes first.
    let pairs = rows.min(cols) as i64;
    let max_cost = edges.iter().map(|e| e.2).max().unwrap_or(0);
    let reward = (max_cost + 1).saturating_mul(pairs + 1);
    let infeasible = reward.saturating_mul(pairs + 1).saturating_neg();

    // Kuhn-Munkres requires rows <= columns. So we use the smaller set as rows.
    let transposed = rows > cols;
    let (n, m) = if transposed { (cols, rows) } else { (rows, cols) };
    let mut matrix = vec![vec![infeasible; m]; n];
    for &(r, c, cost) in &edges {
        let (i, j) = if transposed { (c, r) } else { (r, c) };
        matrix[i][j] = reward - cost;
    }
    let weights = I64Weights(matrix);

    let (_total, assignments) = kuhn_munkres(&weights);

    let mut result: Vec<(usize, usize)> = assignments
        .iter()
        .enumerate()
        .filter(|&(i, &j)| weights.at(i, j) > infeasible)
        .map(|(i, &j)| if transposed { (j, i) } else { (i, j) })
        .collect();
    result.sort_unstable();
    result
}
