// A* search over the terrain walkability grid.
//
// Eight-directional movement: orthogonal steps cost 1, diagonal steps cost
// sqrt(2). The score pushed into the open set is
// `f = g + squared_distance(successor, goal)`. The squared distance is not an
// admissible heuristic (it overestimates beyond one cell), so routes are not
// guaranteed to be shortest; the search behaves close to greedy best-first.
//
// The open set is a `BinaryHeap` ordered by `(f, insertion sequence)`, so among
// equal scores the first inserted node is expanded first. A per-cell record
// keeps the best `f` seen; a successor whose cell already has a record with
// `f <=` its own is discarded. Superseded entries left in the heap are still
// expanded when popped.
//
// The search ends as soon as a generated successor is the goal. The goal must
// be walkable to be generated at all, so an obstacle goal always yields `None`.
//
// **Determinism.** Pure function of the terrain and endpoints; ordering uses
// `total_cmp` and dense `Vec` records, no hashing.

use crate::terrain::{GridCell, Terrain};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::f32::consts::SQRT_2;

/// Successor offsets in expansion order: orthogonal first, then diagonal.
const NEIGHBOURS: [(i32, i32); 8] = [
    (0, 1),
    (0, -1),
    (1, 0),
    (-1, 0),
    (1, -1),
    (-1, 1),
    (1, 1),
    (-1, -1),
];

/// A route found by [`find_path`].
#[derive(Clone, Debug, PartialEq)]
pub struct GridPath {
    /// Cells from start to goal, both inclusive.
    pub cells: Vec<GridCell>,
    /// Sum of step costs along `cells`.
    pub total_cost: f32,
}

impl GridPath {
    /// Number of moves (`cells.len() - 1`).
    pub fn steps(&self) -> usize {
        self.cells.len().saturating_sub(1)
    }

    pub fn start(&self) -> Option<GridCell> {
        self.cells.first().copied()
    }

    pub fn goal(&self) -> Option<GridCell> {
        self.cells.last().copied()
    }
}

struct SearchNode {
    cell: GridCell,
    g: f32,
    parent: Option<usize>,
}

/// Entry in the open set (min-heap via reversed ordering).
#[derive(Debug)]
struct OpenEntry {
    f: f32,
    /// Index into the node arena; doubles as insertion order.
    seq: usize,
}

impl PartialEq for OpenEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OpenEntry {}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed for min-heap: smallest f (then earliest insert) is "greatest".
        other
            .f
            .total_cmp(&self.f)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Find a walkable route from `start` to `goal`.
///
/// Returns `None` when the goal cannot be reached or either endpoint lies
/// outside the terrain.
pub fn find_path(terrain: &Terrain, start: GridCell, goal: GridCell) -> Option<GridPath> {
    find_path_bounded(terrain, start, goal, None)
}

/// Like [`find_path`], but gives up with `None` after `max_expansions`
/// nodes have been expanded.
pub fn find_path_bounded(
    terrain: &Terrain,
    start: GridCell,
    goal: GridCell,
    max_expansions: Option<usize>,
) -> Option<GridPath> {
    if !terrain.contains(start) || !terrain.contains(goal) {
        return None;
    }
    if start == goal {
        return Some(GridPath {
            cells: vec![start],
            total_cost: 0.0,
        });
    }

    let mut nodes = vec![SearchNode {
        cell: start,
        g: 0.0,
        parent: None,
    }];
    // best_f[tile] = lowest f recorded for that cell so far.
    let mut best_f = vec![f32::INFINITY; terrain.cell_count()];
    if let Some(i) = terrain.tile_index(start) {
        best_f[i] = 0.0;
    }

    let mut open = BinaryHeap::new();
    open.push(OpenEntry { f: 0.0, seq: 0 });
    let mut expansions = 0usize;

    while let Some(current) = open.pop() {
        if max_expansions.is_some_and(|limit| expansions >= limit) {
            log::debug!(
                "path search {:?} -> {:?} stopped after {} expansions",
                start,
                goal,
                expansions
            );
            return None;
        }
        expansions += 1;

        let (cell, g) = (nodes[current.seq].cell, nodes[current.seq].g);
        for (i, &(dx, dz)) in NEIGHBOURS.iter().enumerate() {
            let next = cell.offset(dx, dz);
            let Some(tile) = terrain.tile_index(next) else {
                continue;
            };
            if !terrain.is_walkable(next) {
                continue;
            }

            let step = if i < 4 { 1.0 } else { SQRT_2 };
            let next_g = g + step;

            if next == goal {
                nodes.push(SearchNode {
                    cell: next,
                    g: next_g,
                    parent: Some(current.seq),
                });
                return Some(reconstruct_path(&nodes, nodes.len() - 1));
            }

            let f = next_g + next.distance_sq(goal);
            if best_f[tile] <= f {
                continue;
            }
            best_f[tile] = f;
            let seq = nodes.len();
            nodes.push(SearchNode {
                cell: next,
                g: next_g,
                parent: Some(current.seq),
            });
            open.push(OpenEntry { f, seq });
        }
    }

    None
}

fn reconstruct_path(nodes: &[SearchNode], goal_index: usize) -> GridPath {
    let total_cost = nodes[goal_index].g;
    let mut cells = Vec::new();
    let mut cursor = Some(goal_index);
    while let Some(i) = cursor {
        cells.push(nodes[i].cell);
        cursor = nodes[i].parent;
    }
    cells.reverse();
    GridPath { cells, total_cost }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_contiguous(path: &GridPath, terrain: &Terrain) {
        for pair in path.cells.windows(2) {
            let dx = (pair[1].x - pair[0].x).abs();
            let dz = (pair[1].z - pair[0].z).abs();
            assert!(dx <= 1 && dz <= 1 && dx + dz > 0, "non-adjacent step {pair:?}");
        }
        for cell in &path.cells[1..] {
            assert!(terrain.is_walkable(*cell), "path crosses obstacle at {cell:?}");
        }
    }

    #[test]
    fn test_open_diagonal_uses_diagonal_steps() {
        let terrain = Terrain::flat(10, 10).unwrap();
        for n in 1..=8 {
            let path = find_path(&terrain, GridCell::new(0, 0), GridCell::new(n, n)).unwrap();
            assert_eq!(path.steps(), n as usize);
            assert_eq!(path.start(), Some(GridCell::new(0, 0)));
            assert_eq!(path.goal(), Some(GridCell::new(n, n)));
            assert!((path.total_cost - n as f32 * SQRT_2).abs() < 1e-4);
            for (k, cell) in path.cells.iter().enumerate() {
                assert_eq!(*cell, GridCell::new(k as i32, k as i32));
            }
        }
    }

    #[test]
    fn test_straight_line_orthogonal() {
        let terrain = Terrain::flat(10, 3).unwrap();
        let path = find_path(&terrain, GridCell::new(0, 1), GridCell::new(6, 1)).unwrap();
        assert_eq!(path.steps(), 6);
        assert!((path.total_cost - 6.0).abs() < 1e-5);
    }

    #[test]
    fn test_start_equals_goal() {
        let terrain = Terrain::flat(4, 4).unwrap();
        let path = find_path(&terrain, GridCell::new(2, 2), GridCell::new(2, 2)).unwrap();
        assert_eq!(path.cells, vec![GridCell::new(2, 2)]);
        assert_eq!(path.total_cost, 0.0);
    }

    #[test]
    fn test_unwalkable_goal_has_no_path() {
        let terrain = Terrain::flat(8, 8)
            .unwrap()
            .with_obstacles([GridCell::new(3, 3)])
            .unwrap();
        assert!(find_path(&terrain, GridCell::new(0, 0), GridCell::new(3, 3)).is_none());
    }

    #[test]
    fn test_enclosed_goal_has_no_path() {
        let ring: Vec<GridCell> = (-1..=1)
            .flat_map(|dx| (-1..=1).map(move |dz| (dx, dz)))
            .filter(|&(dx, dz)| (dx, dz) != (0, 0))
            .map(|(dx, dz)| GridCell::new(5 + dx, 5 + dz))
            .collect();
        let terrain = Terrain::flat(10, 10).unwrap().with_obstacles(ring).unwrap();
        assert!(find_path(&terrain, GridCell::new(0, 0), GridCell::new(5, 5)).is_none());
    }

    #[test]
    fn test_routes_around_wall() {
        let wall: Vec<GridCell> = (0..7).map(|z| GridCell::new(3, z)).collect();
        let terrain = Terrain::flat(10, 10).unwrap().with_obstacles(wall).unwrap();
        let path = find_path(&terrain, GridCell::new(0, 0), GridCell::new(6, 0)).unwrap();
        assert_eq!(path.goal(), Some(GridCell::new(6, 0)));
        assert_contiguous(&path, &terrain);
        assert!(path.cells.iter().any(|c| c.z >= 7), "route must pass the wall's end");
    }

    #[test]
    fn test_out_of_bounds_endpoints() {
        let terrain = Terrain::flat(4, 4).unwrap();
        assert!(find_path(&terrain, GridCell::new(-1, 0), GridCell::new(2, 2)).is_none());
        assert!(find_path(&terrain, GridCell::new(0, 0), GridCell::new(4, 2)).is_none());
    }

    #[test]
    fn test_expansion_limit_reports_not_found() {
        let wall: Vec<GridCell> = (0..19).map(|z| GridCell::new(10, z)).collect();
        let terrain = Terrain::flat(20, 20).unwrap().with_obstacles(wall).unwrap();
        let start = GridCell::new(0, 0);
        let goal = GridCell::new(19, 0);
        assert!(find_path(&terrain, start, goal).is_some());
        assert!(find_path_bounded(&terrain, start, goal, Some(5)).is_none());
    }

    #[test]
    fn test_open_set_breaks_ties_by_insertion() {
        let mut open = BinaryHeap::new();
        open.push(OpenEntry { f: 3.0, seq: 4 });
        open.push(OpenEntry { f: 2.0, seq: 7 });
        open.push(OpenEntry { f: 2.0, seq: 5 });
        open.push(OpenEntry { f: 2.0, seq: 6 });
        let order: Vec<usize> = std::iter::from_fn(|| open.pop().map(|e| e.seq)).collect();
        assert_eq!(order, vec![5, 6, 7, 4]);
    }
}
