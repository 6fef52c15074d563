//! A* pathfinding on a weighted 2D grid
//!
//! Entering a cell costs its weight. Weights never drop below one, which
//! keeps the Manhattan heuristic admissible.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use glam::Vec2;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

/// Cost of entering a cell unless set otherwise
pub const DEFAULT_WEIGHT: f32 = 1.0;

type Cell = (usize, usize);

/// A 2D navigation grid
#[derive(Debug, Clone)]
pub struct Grid {
    /// Width in cells
    pub width: usize,
    /// Height in cells
    pub height: usize,
    /// Cell size in world units
    pub cell_size: f32,
    /// World origin offset
    pub origin: Vec2,
    walkable: Vec<bool>,
    weights: Vec<f32>,
}

impl Grid {
    /// Create a new grid (all cells walkable, weight one)
    #[must_use]
    pub fn new(width: usize, height: usize, cell_size: f32) -> Self {
        Self {
            width,
            height,
            cell_size,
            origin: Vec2::ZERO,
            walkable: vec![true; width * height],
            weights: vec![DEFAULT_WEIGHT; width * height],
        }
    }

    /// Move the grid's top-left corner in world space
    #[must_use]
    pub fn with_origin(mut self, origin: Vec2) -> Self {
        self.origin = origin;
        self
    }

    fn index(&self, x: usize, y: usize) -> Option<usize> {
        (x < self.width && y < self.height).then(|| y * self.width + x)
    }

    /// Set a cell's walkability
    pub fn set_walkable(&mut self, x: usize, y: usize, walkable: bool) {
        if let Some(i) = self.index(x, y) {
            self.walkable[i] = walkable;
        }
    }

    /// Check if a cell is walkable. Cells outside the grid are not.
    #[must_use]
    pub fn is_walkable(&self, x: usize, y: usize) -> bool {
        self.index(x, y).is_some_and(|i| self.walkable[i])
    }

    /// Set the cost of entering a cell. Clamped to at least one.
    pub fn set_weight(&mut self, x: usize, y: usize, weight: f32) {
        if let Some(i) = self.index(x, y) {
            self.weights[i] = if weight.is_nan() { DEFAULT_WEIGHT } else { weight.max(DEFAULT_WEIGHT) };
        }
    }

    /// Cost of entering a cell
    #[must_use]
    pub fn weight(&self, x: usize, y: usize) -> f32 {
        self.index(x, y).map_or(DEFAULT_WEIGHT, |i| self.weights[i])
    }

    /// Convert world position to grid coordinates
    #[must_use]
    pub fn world_to_grid(&self, pos: Vec2) -> (i32, i32) {
        let local = pos - self.origin;
        (
            (local.x / self.cell_size).floor() as i32,
            (local.y / self.cell_size).floor() as i32,
        )
    }

    /// Convert grid coordinates to world position (center of cell)
    #[must_use]
    pub fn grid_to_world(&self, x: usize, y: usize) -> Vec2 {
        self.origin
            + Vec2::new(
                (x as f32 + 0.5) * self.cell_size,
                (y as f32 + 0.5) * self.cell_size,
            )
    }

    fn cell_at(&self, pos: Vec2) -> Option<Cell> {
        let (x, y) = self.world_to_grid(pos);
        let cell = (usize::try_from(x).ok()?, usize::try_from(y).ok()?);
        self.is_walkable(cell.0, cell.1).then_some(cell)
    }

    /// Walkable 4-neighbours
    fn neighbors(&self, x: usize, y: usize) -> SmallVec<[Cell; 4]> {
        let mut result = SmallVec::new();
        if y + 1 < self.height {
            result.push((x, y + 1));
        }
        if y > 0 {
            result.push((x, y - 1));
        }
        if x > 0 {
            result.push((x - 1, y));
        }
        if x + 1 < self.width {
            result.push((x + 1, y));
        }
        result.retain(|&mut (nx, ny)| self.is_walkable(nx, ny));
        result
    }
}

/// Result of pathfinding
#[derive(Debug, Clone, Default)]
pub struct PathResult {
    /// Waypoints in world coordinates, start and goal cells included
    pub waypoints: Vec<Vec2>,
    /// Total path length in world units
    pub length: f32,
    /// Sum of the weights of every entered cell
    pub cost: f32,
}

impl PathResult {
    /// Check if no path was found
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }
}

/// A* node for priority queue
#[derive(Debug, Clone, Copy)]
struct Node {
    cell: Cell,
    f_cost: f32,
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Node {}

impl Ord for Node {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse for min-heap
        other.f_cost.total_cmp(&self.f_cost)
    }
}

impl PartialOrd for Node {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Cheapest cell path from `start` to `goal`, both included.
///
/// Returns `None` when either end is blocked or unreachable.
#[must_use]
pub fn find_cell_path(grid: &Grid, start: Cell, goal: Cell) -> Option<(Vec<Cell>, f32)> {
    if !grid.is_walkable(start.0, start.1) || !grid.is_walkable(goal.0, goal.1) {
        return None;
    }

    let heuristic = |(x, y): Cell| x.abs_diff(goal.0) as f32 + y.abs_diff(goal.1) as f32;

    let mut open_set = BinaryHeap::new();
    let mut came_from: FxHashMap<Cell, Cell> = FxHashMap::default();
    let mut g_score: FxHashMap<Cell, f32> = FxHashMap::default();

    g_score.insert(start, 0.0);
    open_set.push(Node {
        cell: start,
        f_cost: heuristic(start),
    });

    while let Some(Node { cell, f_cost }) = open_set.pop() {
        let g = g_score.get(&cell).copied().unwrap_or(f32::MAX);
        if cell == goal {
            let mut path = vec![goal];
            let mut current = goal;
            while let Some(&prev) = came_from.get(&current) {
                path.push(prev);
                current = prev;
            }
            path.reverse();
            return Some((path, g));
        }
        // stale entry superseded by a cheaper one
        if f_cost > g + heuristic(cell) {
            continue;
        }

        for next in grid.neighbors(cell.0, cell.1) {
            let tentative = g + grid.weight(next.0, next.1);
            if tentative < g_score.get(&next).copied().unwrap_or(f32::MAX) {
                came_from.insert(next, cell);
                g_score.insert(next, tentative);
                open_set.push(Node {
                    cell: next,
                    f_cost: tentative + heuristic(next),
                });
            }
        }
    }

    None
}

/// Find a path between two world positions.
///
/// An empty result means no path exists.
#[must_use]
pub fn find_path(grid: &Grid, start: Vec2, goal: Vec2) -> PathResult {
    let (Some(start), Some(goal)) = (grid.cell_at(start), grid.cell_at(goal)) else {
        return PathResult::default();
    };
    let Some((cells, cost)) = find_cell_path(grid, start, goal) else {
        return PathResult::default();
    };

    let waypoints: Vec<Vec2> = cells
        .iter()
        .map(|&(x, y)| grid.grid_to_world(x, y))
        .collect();
    let length = waypoints.windows(2).map(|w| w[0].distance(w[1])).sum();

    PathResult {
        waypoints,
        length,
        cost,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_pathfinding() {
        let mut grid = Grid::new(10, 10, 1.0);

        // Create a wall
        for y in 2..8 {
            grid.set_walkable(5, y, false);
        }

        let path = find_path(&grid, Vec2::new(2.5, 5.5), Vec2::new(8.5, 5.5));

        assert!(!path.is_empty());
        assert!(path.waypoints.len() > 7); // Should go around the wall
    }

    #[test]
    fn test_direct_path() {
        let grid = Grid::new(10, 10, 1.0);

        let path = find_path(&grid, Vec2::new(0.5, 0.5), Vec2::new(3.5, 0.5));

        assert_eq!(path.waypoints.len(), 4); // 4 cells in a line
        assert_eq!(path.length, 3.0);
        assert_eq!(path.cost, 3.0);
    }

    #[test]
    fn test_no_path() {
        let mut grid = Grid::new(5, 5, 1.0);

        // Wall the goal in
        grid.set_walkable(3, 2, false);
        grid.set_walkable(3, 4, false);
        grid.set_walkable(2, 3, false);
        grid.set_walkable(4, 3, false);

        assert!(find_path(&grid, Vec2::new(0.5, 0.5), Vec2::new(3.5, 3.5)).is_empty());
        assert!(find_cell_path(&grid, (0, 0), (3, 3)).is_none());
    }

    #[test]
    fn test_blocked_or_outside_ends() {
        let mut grid = Grid::new(4, 4, 1.0);
        grid.set_walkable(0, 0, false);
        assert!(find_path(&grid, Vec2::new(0.5, 0.5), Vec2::new(2.5, 2.5)).is_empty());
        assert!(find_path(&grid, Vec2::new(-1.0, 0.5), Vec2::new(2.5, 2.5)).is_empty());
        assert!(find_path(&grid, Vec2::new(1.5, 1.5), Vec2::new(9.5, 2.5)).is_empty());
    }

    #[test]
    fn test_start_is_goal() {
        let grid = Grid::new(3, 3, 2.0);
        let path = find_path(&grid, Vec2::new(3.0, 3.0), Vec2::new(3.5, 3.5));
        assert_eq!(path.waypoints, vec![Vec2::new(3.0, 3.0)]);
        assert_eq!(path.cost, 0.0);
    }

    #[test]
    fn test_weights_steer_around_expensive_cells() {
        // 3x3, straight line through the middle row is expensive
        let mut grid = Grid::new(3, 3, 1.0);
        grid.set_weight(1, 1, 10.0);

        let (cells, cost) = find_cell_path(&grid, (0, 1), (2, 1)).unwrap();
        assert!(!cells.contains(&(1, 1)));
        assert_eq!(cost, 4.0);
    }

    #[test]
    fn test_cheap_detour_loses_to_short_path() {
        let mut grid = Grid::new(3, 3, 1.0);
        grid.set_weight(1, 1, 2.0);

        let (cells, cost) = find_cell_path(&grid, (0, 1), (2, 1)).unwrap();
        assert_eq!(cells, vec![(0, 1), (1, 1), (2, 1)]);
        assert_eq!(cost, 3.0);
    }

    #[test]
    fn test_weight_clamped_to_one() {
        let mut grid = Grid::new(2, 2, 1.0);
        grid.set_weight(1, 0, 0.1);
        grid.set_weight(0, 1, f32::NAN);
        assert_eq!(grid.weight(1, 0), 1.0);
        assert_eq!(grid.weight(0, 1), 1.0);
    }

    #[test]
    fn test_origin_offset() {
        let grid = Grid::new(4, 4, 10.0).with_origin(Vec2::new(100.0, 100.0));
        let path = find_path(&grid, Vec2::new(105.0, 105.0), Vec2::new(125.0, 105.0));
        assert_eq!(path.waypoints.first(), Some(&Vec2::new(105.0, 105.0)));
        assert_eq!(path.waypoints.last(), Some(&Vec2::new(125.0, 105.0)));
        assert_eq!(path.length, 20.0);
    }
}
