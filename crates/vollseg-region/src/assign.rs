//! One-to-one assignment over a sparse bipartite graph
//!
//! The graph is split into connected components and each component is solved
//! with the Hungarian method. Within a component the number of matched pairs
//! is maximised first and the total score second.

use std::collections::{BTreeMap, BTreeSet};

/// A candidate pair `(left id, right id, score)` with a score in `[0, 1]`
pub(crate) type Edge = (u32, u32, f64);

fn find(parent: &mut [usize], mut x: usize) -> usize {
    while parent[x] != x {
        parent[x] = parent[parent[x]];
        x = parent[x];
    }
    x
}

/// Split edges into the connected components of their bipartite graph
fn components(edges: &[Edge]) -> Vec<Vec<Edge>> {
    let lefts: BTreeSet<u32> = edges.iter().map(|e| e.0).collect();
    let rights: BTreeSet<u32> = edges.iter().map(|e| e.1).collect();
    let left_index: BTreeMap<u32, usize> = lefts.iter().enumerate().map(|(i, &l)| (l, i)).collect();
    let right_index: BTreeMap<u32, usize> = rights
        .iter()
        .enumerate()
        .map(|(i, &r)| (r, lefts.len() + i))
        .collect();

    let mut parent: Vec<usize> = (0..lefts.len() + rights.len()).collect();
    for &(l, r, _) in edges {
        let a = find(&mut parent, left_index[&l]);
        let b = find(&mut parent, right_index[&r]);
        if a != b {
            parent[a.max(b)] = a.min(b);
        }
    }

    let mut groups: BTreeMap<usize, Vec<Edge>> = BTreeMap::new();
    for &edge in edges {
        let root = find(&mut parent, left_index[&edge.0]);
        groups.entry(root).or_default().push(edge);
    }
    groups.into_values().collect()
}

/// Minimum-cost perfect assignment of a square cost matrix
///
/// Returns `row_of[col]` for every column.
fn hungarian(cost: &[Vec<f64>]) -> Vec<usize> {
    let n = cost.len();
    let mut u = vec![0.0f64; n + 1];
    let mut v = vec![0.0f64; n + 1];
    let mut p = vec![0usize; n + 1];
    let mut way = vec![0usize; n + 1];

    for i in 1..=n {
        p[0] = i;
        let mut j0 = 0;
        let mut minv = vec![f64::INFINITY; n + 1];
        let mut used = vec![false; n + 1];
        loop {
            used[j0] = true;
            let i0 = p[j0];
            let mut delta = f64::INFINITY;
            let mut j1 = 0;
            for j in 1..=n {
                if used[j] {
                    continue;
                }
                let reduced = cost[i0 - 1][j - 1] - u[i0] - v[j];
                if reduced < minv[j] {
                    minv[j] = reduced;
                    way[j] = j0;
                }
                if minv[j] < delta {
                    delta = minv[j];
                    j1 = j;
                }
            }
            for j in 0..=n {
                if used[j] {
                    u[p[j]] += delta;
                    v[j] -= delta;
                } else {
                    minv[j] -= delta;
                }
            }
            j0 = j1;
            if p[j0] == 0 {
                break;
            }
        }
        loop {
            let j1 = way[j0];
            p[j0] = p[j1];
            j0 = j1;
            if j0 == 0 {
                break;
            }
        }
    }

    p.into_iter().skip(1).map(|row| row - 1).collect()
}

fn solve_component(edges: &[Edge]) -> Vec<(u32, u32)> {
    let rows: Vec<u32> = edges.iter().map(|e| e.0).collect::<BTreeSet<_>>().into_iter().collect();
    let cols: Vec<u32> = edges.iter().map(|e| e.1).collect::<BTreeSet<_>>().into_iter().collect();
    if rows.len() == 1 || cols.len() == 1 {
        // A star: the best single edge wins
        return edges
            .iter()
            .copied()
            .reduce(|best, e| if e.2 > best.2 { e } else { best })
            .map(|(l, r, _)| vec![(l, r)])
            .unwrap_or_default();
    }

    // Every pair is worth 1 plus at most 1/(2k) of score, so one more pair
    // always outweighs any gain in total score.
    let k = rows.len().min(cols.len()) as f64;
    let n = rows.len().max(cols.len());
    let mut cost = vec![vec![0.0f64; n]; n];
    let row_pos: BTreeMap<u32, usize> = rows.iter().enumerate().map(|(i, &r)| (r, i)).collect();
    let col_pos: BTreeMap<u32, usize> = cols.iter().enumerate().map(|(i, &c)| (c, i)).collect();
    for &(l, r, score) in edges {
        cost[row_pos[&l]][col_pos[&r]] = -(1.0 + score.clamp(0.0, 1.0) / (2.0 * k));
    }

    hungarian(&cost)
        .into_iter()
        .enumerate()
        .filter(|&(col, row)| row < rows.len() && col < cols.len() && cost[row][col] < 0.0)
        .map(|(col, row)| (rows[row], cols[col]))
        .collect()
}

/// Optimal one-to-one pairs among `edges`
///
/// Maximises the number of pairs, then the sum of their scores. The result
/// is sorted by left id.
pub(crate) fn assign(edges: &[Edge]) -> Vec<(u32, u32)> {
    let mut pairs: Vec<(u32, u32)> = components(edges)
        .iter()
        .flat_map(|component| solve_component(component))
        .collect();
    pairs.sort_unstable();
    pairs
}
