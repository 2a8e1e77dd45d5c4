//! Uniform spatial hash grid for the ball-ball broad phase
//!
//! Rebuilt from scratch every tick: balls move every frame and there are at
//! most ~100 of them, so incremental maintenance is not worth it.

use std::collections::HashMap;

use glam::Vec2;

/// Spatial hash over body indices
///
/// Cell size must be at least the largest interaction distance (ball
/// diameter, drafting window) so the 3x3 neighborhood is sufficient.
#[derive(Debug, Clone)]
pub struct SpatialGrid {
    cell_size: f32,
    inv_cell_size: f32,
    cells: HashMap<(i32, i32), Vec<usize>>,
    /// Inserted bodies in insertion order (keeps pair order stable)
    entries: Vec<(usize, (i32, i32))>,
}

impl SpatialGrid {
    pub fn new(cell_size: f32) -> Self {
        let cell_size = cell_size.max(1.0);
        Self {
            cell_size,
            inv_cell_size: 1.0 / cell_size,
            cells: HashMap::new(),
            entries: Vec::new(),
        }
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Cell coordinates `(floor(x / cell), floor(y / cell))`
    pub fn cell_key(&self, position: Vec2) -> (i32, i32) {
        (
            (position.x * self.inv_cell_size).floor() as i32,
            (position.y * self.inv_cell_size).floor() as i32,
        )
    }

    pub fn clear(&mut self) {
        self.cells.clear();
        self.entries.clear();
    }

    pub fn insert(&mut self, index: usize, position: Vec2) {
        let key = self.cell_key(position);
        self.cells.entry(key).or_default().push(index);
        self.entries.push((index, key));
    }

    /// Replace the grid contents with the given `(index, position)` pairs
    pub fn rebuild(&mut self, bodies: impl IntoIterator<Item = (usize, Vec2)>) {
        self.clear();
        for (index, position) in bodies {
            self.insert(index, position);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Indices in the cell `(cx, cy)` and its 8 neighbors
    fn neighborhood(&self, (cx, cy): (i32, i32)) -> impl Iterator<Item = usize> + '_ {
        (-1..=1)
            .flat_map(move |dx| (-1..=1).map(move |dy| (cx + dx, cy + dy)))
            .filter_map(|key| self.cells.get(&key))
            .flat_map(|cell| cell.iter().copied())
    }

    /// Candidate pairs `(a, b)` with `b > a`, each pair reported once
    pub fn candidate_pairs(&self) -> Vec<(usize, usize)> {
        let mut pairs = Vec::new();
        for &(index, key) in &self.entries {
            pairs.extend(
                self.neighborhood(key)
                    .filter(|&other| other > index)
                    .map(|other| (index, other)),
            );
        }
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_key_floors_negative_coordinates() {
        let grid = SpatialGrid::new(50.0);
        assert_eq!(grid.cell_key(Vec2::new(10.0, 10.0)), (0, 0));
        assert_eq!(grid.cell_key(Vec2::new(-1.0, 99.0)), (-1, 1));
    }

    #[test]
    fn test_pairs_reach_adjacent_cells_only() {
        let mut grid = SpatialGrid::new(50.0);
        grid.insert(0, Vec2::new(10.0, 10.0));
        grid.insert(1, Vec2::new(60.0, 10.0));
        grid.insert(2, Vec2::new(400.0, 400.0));
        grid.insert(3, Vec2::new(-10.0, -10.0));

        let pairs = grid.candidate_pairs();
        assert!(pairs.contains(&(0, 1)));
        assert!(pairs.contains(&(0, 3)));
        assert!(pairs.iter().all(|&(a, b)| a != 2 && b != 2));
    }

    #[test]
    fn test_candidate_pairs_are_unique_and_ordered() {
        let mut grid = SpatialGrid::new(50.0);
        grid.rebuild([
            (0, Vec2::new(10.0, 10.0)),
            (1, Vec2::new(20.0, 10.0)),
            (2, Vec2::new(55.0, 10.0)),
            (3, Vec2::new(500.0, 500.0)),
        ]);

        let pairs = grid.candidate_pairs();
        assert_eq!(pairs.len(), 3);
        for &(a, b) in &pairs {
            assert!(b > a);
        }
        assert!(pairs.contains(&(0, 1)));
        assert!(pairs.contains(&(0, 2)));
        assert!(pairs.contains(&(1, 2)));
    }

    #[test]
    fn test_rebuild_clears_previous_contents() {
        let mut grid = SpatialGrid::new(50.0);
        grid.insert(0, Vec2::ZERO);
        grid.insert(1, Vec2::ZERO);
        grid.rebuild([(5, Vec2::new(100.0, 100.0))]);
        assert_eq!(grid.len(), 1);
        assert!(grid.candidate_pairs().is_empty());
    }
}
