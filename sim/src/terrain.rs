//! Terrain - heightmap, walkability grid and height queries.
//!
//! Heights are sampled at grid vertices, so a `width x length` terrain has
//! `(width + 1) x (length + 1)` height samples and `width x length` tiles.
//! Cell `(i, j)` covers the world square `[i, i + 1] x [j, j + 1]`.
//!
//! The surface between samples is reconstructed by splitting every cell into
//! two triangles along the diagonal where `frac(x) + frac(z) = 1` and solving
//! the plane through the three corner heights of the triangle the query falls
//! in. Height queries outside the grid are an error; callers clamp first
//! (see [`Terrain::clamp_to_bounds`]).

use crate::error::TerrainError;
use bevy_ecs::prelude::*;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Resource wrapper sharing the immutable terrain with ECS systems.
#[derive(Resource, Clone)]
pub struct TerrainResource(pub Arc<Terrain>);

impl TerrainResource {
    pub fn new(terrain: Terrain) -> Self {
        Self(Arc::new(terrain))
    }
}

impl std::ops::Deref for TerrainResource {
    type Target = Terrain;

    fn deref(&self) -> &Terrain {
        &self.0
    }
}

/// Classification of a single tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TileKind {
    /// Passable ground.
    #[default]
    Clear,
    /// Impassable (trees, rocks, buildings).
    Obstacle,
}

impl TileKind {
    pub fn is_walkable(&self) -> bool {
        matches!(self, TileKind::Clear)
    }
}

/// Integer coordinate of one tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridCell {
    pub x: i32,
    pub z: i32,
}

impl GridCell {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    pub fn offset(&self, dx: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.z + dz)
    }

    /// World position of the cell centre.
    pub fn center(&self) -> (f32, f32) {
        (self.x as f32 + 0.5, self.z as f32 + 0.5)
    }

    /// Squared Euclidean distance in cell units.
    pub fn distance_sq(&self, other: GridCell) -> f32 {
        let dx = (self.x - other.x) as f32;
        let dz = (self.z - other.z) as f32;
        dx * dx + dz * dz
    }
}

/// Procedural height generation algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMethod {
    /// Every vertex sampled independently from `[min, max]`.
    Uniform { min: f32, max: f32 },
    /// Incremental random walk: each vertex averages its perturbed
    /// predecessors along x and z, floored at zero.
    #[serde(alias = "incremental_walk")]
    Brownian { volatility: f32 },
}

impl Default for GenerationMethod {
    fn default() -> Self {
        Self::Brownian { volatility: 0.5 }
    }
}

/// Heightmap plus walkability grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Terrain {
    width: u32,
    length: u32,
    /// Vertex heights, x-major: index `x * (length + 1) + z`.
    heights: Vec<f32>,
    /// Tile kinds, x-major: index `x * length + z`.
    tiles: Vec<TileKind>,
}

impl Terrain {
    /// Flat terrain at height zero with every tile clear.
    pub fn flat(width: u32, length: u32) -> Result<Self, TerrainError> {
        check_dimensions(width, length)?;
        let vertices = vertex_count(width, length);
        Self::from_heights(width, length, vec![0.0; vertices])
    }

    /// Build terrain from explicit vertex heights (x-major). All tiles are clear.
    pub fn from_heights(width: u32, length: u32, heights: Vec<f32>) -> Result<Self, TerrainError> {
        check_dimensions(width, length)?;
        let expected = vertex_count(width, length);
        if heights.len() != expected {
            return Err(TerrainError::GridMismatch {
                grid: "height",
                expected,
                actual: heights.len(),
            });
        }
        Ok(Self {
            width,
            length,
            heights,
            tiles: vec![TileKind::Clear; width as usize * length as usize],
        })
    }

    /// Generate a heightmap with the given algorithm.
    pub fn generate<R: Rng + ?Sized>(
        width: u32,
        length: u32,
        method: GenerationMethod,
        rng: &mut R,
    ) -> Result<Self, TerrainError> {
        check_dimensions(width, length)?;
        let heights = match method {
            GenerationMethod::Uniform { min, max } => {
                uniform_heights(width, length, min, max, rng)?
            }
            GenerationMethod::Brownian { volatility } => {
                brownian_heights(width, length, volatility, rng)?
            }
        };
        Self::from_heights(width, length, heights)
    }

    /// Mark each tile as an obstacle with probability `density`.
    pub fn scatter_obstacles<R: Rng + ?Sized>(
        &mut self,
        density: f32,
        rng: &mut R,
    ) -> Result<usize, TerrainError> {
        if !(0.0..=1.0).contains(&density) {
            return Err(TerrainError::InvalidDensity(density));
        }
        let mut placed = 0;
        for tile in &mut self.tiles {
            if rng.random_bool(density as f64) {
                *tile = TileKind::Obstacle;
                placed += 1;
            }
        }
        Ok(placed)
    }

    /// Builder-style helper marking the given cells as obstacles.
    pub fn with_obstacles<I>(mut self, cells: I) -> Result<Self, TerrainError>
    where
        I: IntoIterator<Item = GridCell>,
    {
        for cell in cells {
            self.set_tile(cell, TileKind::Obstacle)?;
        }
        Ok(self)
    }

    pub fn set_tile(&mut self, cell: GridCell, kind: TileKind) -> Result<(), TerrainError> {
        let index = self
            .tile_index(cell)
            .ok_or(TerrainError::CellOutOfBounds { x: cell.x, z: cell.z })?;
        self.tiles[index] = kind;
        Ok(())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn length(&self) -> u32 {
        self.length
    }

    /// Raw vertex heights (x-major).
    pub fn heights(&self) -> &[f32] {
        &self.heights
    }

    /// Raw tile grid (x-major).
    pub fn tiles(&self) -> &[TileKind] {
        &self.tiles
    }

    /// Number of tiles.
    pub fn cell_count(&self) -> usize {
        self.tiles.len()
    }

    pub fn contains(&self, cell: GridCell) -> bool {
        cell.x >= 0 && cell.z >= 0 && (cell.x as u32) < self.width && (cell.z as u32) < self.length
    }

    /// Dense index of a tile, `None` when out of bounds.
    pub fn tile_index(&self, cell: GridCell) -> Option<usize> {
        if self.contains(cell) {
            Some(cell.x as usize * self.length as usize + cell.z as usize)
        } else {
            None
        }
    }

    pub fn tile(&self, cell: GridCell) -> Option<TileKind> {
        self.tile_index(cell).map(|i| self.tiles[i])
    }

    /// True iff the cell is in bounds and clear.
    pub fn is_walkable(&self, cell: GridCell) -> bool {
        self.tile(cell).is_some_and(|t| t.is_walkable())
    }

    /// Height sample at vertex `(x, z)`, `None` outside the vertex grid.
    pub fn vertex_height(&self, x: u32, z: u32) -> Option<f32> {
        if x <= self.width && z <= self.length {
            Some(self.vertex(x, z))
        } else {
            None
        }
    }

    fn vertex(&self, x: u32, z: u32) -> f32 {
        self.heights[x as usize * (self.length as usize + 1) + z as usize]
    }

    /// Cell containing a world position (clamped to the grid).
    pub fn cell_at(&self, x: f32, z: f32) -> GridCell {
        let gx = (x.floor() as i64).clamp(0, self.width as i64 - 1);
        let gz = (z.floor() as i64).clamp(0, self.length as i64 - 1);
        GridCell::new(gx as i32, gz as i32)
    }

    /// Interpolated surface height at world position `(x, z)`.
    ///
    /// Requires `0 <= x <= width` and `0 <= z <= length`.
    pub fn height_at(&self, x: f32, z: f32) -> Result<f32, TerrainError> {
        if !x.is_finite()
            || !z.is_finite()
            || x < 0.0
            || z < 0.0
            || x > self.width as f32
            || z > self.length as f32
        {
            return Err(TerrainError::OutOfBounds { x, z });
        }

        // The far edges belong to the last cell.
        let x0 = (x.floor() as u32).min(self.width - 1);
        let z0 = (z.floor() as u32).min(self.length - 1);
        let (x0f, z0f) = (x0 as f32, z0 as f32);

        if (x - x0f) + (z - z0f) < 1.0 {
            let h00 = self.vertex(x0, z0);
            let h10 = self.vertex(x0 + 1, z0);
            let h01 = self.vertex(x0, z0 + 1);
            let normal = cross([1.0, h10 - h00, 0.0], [0.0, h01 - h00, 1.0]);
            Ok(solve_plane(normal, [x0f, h00, z0f], x, z))
        } else {
            let h11 = self.vertex(x0 + 1, z0 + 1);
            let h01 = self.vertex(x0, z0 + 1);
            let h10 = self.vertex(x0 + 1, z0);
            let normal = cross([-1.0, h01 - h11, 0.0], [0.0, h10 - h11, -1.0]);
            Ok(solve_plane(normal, [x0f + 1.0, h11, z0f + 1.0], x, z))
        }
    }

    /// Clamp a world position into the terrain, inset by `inset` on every side.
    ///
    /// When the inset leaves no room on an axis the position collapses to the
    /// centre of that axis.
    pub fn clamp_to_bounds(&self, x: f32, z: f32, inset: f32) -> (f32, f32) {
        (
            clamp_axis(x, inset, self.width as f32),
            clamp_axis(z, inset, self.length as f32),
        )
    }
}

fn check_dimensions(width: u32, length: u32) -> Result<(), TerrainError> {
    if width == 0 || length == 0 {
        Err(TerrainError::InvalidDimensions { width, length })
    } else {
        Ok(())
    }
}

fn vertex_count(width: u32, length: u32) -> usize {
    (width as usize + 1) * (length as usize + 1)
}

fn uniform_heights<R: Rng + ?Sized>(
    width: u32,
    length: u32,
    min: f32,
    max: f32,
    rng: &mut R,
) -> Result<Vec<f32>, TerrainError> {
    if !(min.is_finite() && max.is_finite()) || min > max {
        return Err(TerrainError::InvalidRange { min, max });
    }
    Ok((0..vertex_count(width, length))
        .map(|_| rng.random_range(min..=max))
        .collect())
}

fn brownian_heights<R: Rng + ?Sized>(
    width: u32,
    length: u32,
    volatility: f32,
    rng: &mut R,
) -> Result<Vec<f32>, TerrainError> {
    if !volatility.is_finite() || volatility < 0.0 {
        return Err(TerrainError::InvalidVolatility(volatility));
    }
    let stride = length as usize + 1;
    let mut heights = vec![0.0f32; vertex_count(width, length)];
    heights[0] = volatility * rng.random_range(0.0..=2.5);

    for x in 0..=width as usize {
        for z in 0..=length as usize {
            let mut sum = 0.0;
            let mut count = 0.0;
            if x > 0 {
                let prev = heights[(x - 1) * stride + z];
                sum += (prev + rng.random_range(-volatility..=volatility)).max(0.0);
                count += 1.0;
            }
            if z > 0 {
                let prev = heights[x * stride + z - 1];
                sum += (prev + rng.random_range(-volatility..=volatility)).max(0.0);
                count += 1.0;
            }
            if count > 0.0 {
                heights[x * stride + z] = sum / count;
            }
        }
    }
    Ok(heights)
}

fn clamp_axis(value: f32, inset: f32, extent: f32) -> f32 {
    let inset = inset.max(0.0);
    if inset * 2.0 >= extent {
        extent / 2.0
    } else {
        value.clamp(inset, extent - inset)
    }
}

fn cross(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

/// Solve `n . (q - p) = 0` for the y component of `q = (x, y, z)`.
fn solve_plane(normal: [f32; 3], point: [f32; 3], x: f32, z: f32) -> f32 {
    let d = normal[0] * point[0] + normal[1] * point[1] + normal[2] * point[2];
    (d - z * normal[2] - x * normal[0]) / normal[1]
}

/// Snapshot of terrain for presentation clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerrainSnapshot {
    pub width: u32,
    pub length: u32,
    /// Flattened vertex heights (x-major).
    pub heights: Vec<f32>,
    /// Flattened tile data (as u8, x-major).
    pub tiles: Vec<u8>,
}

impl TerrainSnapshot {
    pub fn from_terrain(terrain: &Terrain) -> Self {
        Self {
            width: terrain.width,
            length: terrain.length,
            heights: terrain.heights.clone(),
            tiles: terrain.tiles.iter().map(|t| *t as u8).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn sloped() -> Terrain {
        // 2x2 cells, h = x + 2z at every vertex.
        let mut heights = Vec::new();
        for x in 0..=2 {
            for z in 0..=2 {
                heights.push(x as f32 + 2.0 * z as f32);
            }
        }
        Terrain::from_heights(2, 2, heights).unwrap()
    }

    #[test]
    fn test_generated_grid_dimensions() {
        let mut rng = Pcg32::seed_from_u64(7);
        for method in [
            GenerationMethod::Uniform { min: -1.0, max: 3.0 },
            GenerationMethod::Brownian { volatility: 0.5 },
        ] {
            let terrain = Terrain::generate(12, 5, method, &mut rng).unwrap();
            assert_eq!(terrain.heights().len(), 13 * 6);
            assert_eq!(terrain.tiles().len(), 12 * 5);
            assert!(terrain.vertex_height(12, 5).is_some());
            assert!(terrain.vertex_height(13, 5).is_none());
        }
    }

    #[test]
    fn test_uniform_heights_within_range() {
        let mut rng = Pcg32::seed_from_u64(1);
        let terrain =
            Terrain::generate(20, 20, GenerationMethod::Uniform { min: 2.0, max: 4.0 }, &mut rng)
                .unwrap();
        assert!(terrain.heights().iter().all(|h| (2.0..=4.0).contains(h)));
    }

    #[test]
    fn test_brownian_zero_volatility_is_flat() {
        let mut rng = Pcg32::seed_from_u64(99);
        let terrain =
            Terrain::generate(8, 6, GenerationMethod::Brownian { volatility: 0.0 }, &mut rng)
                .unwrap();
        assert!(terrain.heights().iter().all(|&h| h == 0.0));
    }

    #[test]
    fn test_brownian_is_non_negative_and_seeded() {
        let a = Terrain::generate(
            16,
            16,
            GenerationMethod::Brownian { volatility: 0.5 },
            &mut Pcg32::seed_from_u64(3),
        )
        .unwrap();
        let b = Terrain::generate(
            16,
            16,
            GenerationMethod::Brownian { volatility: 0.5 },
            &mut Pcg32::seed_from_u64(3),
        )
        .unwrap();
        assert_eq!(a, b);
        assert!(a.heights().iter().all(|&h| h >= 0.0));
        assert!(a.vertex_height(0, 0).unwrap() <= 0.5 * 2.5);
    }

    #[test]
    fn test_invalid_generation_parameters() {
        let mut rng = Pcg32::seed_from_u64(0);
        assert!(matches!(
            Terrain::generate(0, 4, GenerationMethod::default(), &mut rng),
            Err(TerrainError::InvalidDimensions { .. })
        ));
        assert!(matches!(
            Terrain::generate(4, 4, GenerationMethod::Uniform { min: 2.0, max: 1.0 }, &mut rng),
            Err(TerrainError::InvalidRange { .. })
        ));
        assert!(matches!(
            Terrain::generate(4, 4, GenerationMethod::Brownian { volatility: -1.0 }, &mut rng),
            Err(TerrainError::InvalidVolatility(_))
        ));
        assert!(matches!(
            Terrain::from_heights(2, 2, vec![0.0; 4]),
            Err(TerrainError::GridMismatch { expected: 9, actual: 4, .. })
        ));
    }

    #[test]
    fn test_height_at_vertices_and_plane() {
        let terrain = sloped();
        assert!((terrain.height_at(0.0, 0.0).unwrap() - 0.0).abs() < 1e-5);
        assert!((terrain.height_at(1.0, 1.0).unwrap() - 3.0).abs() < 1e-5);
        assert!((terrain.height_at(2.0, 2.0).unwrap() - 6.0).abs() < 1e-5);
        // A planar surface is reproduced exactly by both triangles.
        assert!((terrain.height_at(0.25, 0.25).unwrap() - 0.75).abs() < 1e-5);
        assert!((terrain.height_at(0.75, 0.75).unwrap() - 2.25).abs() < 1e-5);
        assert!((terrain.height_at(1.5, 0.2).unwrap() - 1.9).abs() < 1e-5);
    }

    #[test]
    fn test_height_at_picks_triangle() {
        // Only the far corner is raised: the lower triangle stays flat.
        let mut heights = vec![0.0; 4];
        heights[3] = 4.0; // vertex (1, 1)
        let terrain = Terrain::from_heights(1, 1, heights).unwrap();
        assert_eq!(terrain.height_at(0.3, 0.3).unwrap(), 0.0);
        assert!((terrain.height_at(0.75, 0.75).unwrap() - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_height_at_out_of_bounds() {
        let terrain = sloped();
        assert!(matches!(terrain.height_at(-0.1, 1.0), Err(TerrainError::OutOfBounds { .. })));
        assert!(terrain.height_at(2.01, 1.0).is_err());
        assert!(terrain.height_at(1.0, f32::NAN).is_err());
    }

    #[test]
    fn test_diagonal_seam_is_continuous() {
        let mut rng = Pcg32::seed_from_u64(11);
        let terrain =
            Terrain::generate(4, 4, GenerationMethod::Uniform { min: 0.0, max: 10.0 }, &mut rng)
                .unwrap();
        for step in 1..10 {
            let t = step as f32 / 10.0;
            let eps = 5e-5;
            let below = terrain.height_at(1.0 + t - eps, 2.0 + (1.0 - t) - eps).unwrap();
            let above = terrain.height_at(1.0 + t + eps, 2.0 + (1.0 - t) + eps).unwrap();
            assert!((below - above).abs() < 1e-2, "seam jump {below} vs {above}");
        }
    }

    #[test]
    fn test_walkability() {
        let terrain = Terrain::flat(4, 3)
            .unwrap()
            .with_obstacles([GridCell::new(1, 1)])
            .unwrap();
        assert!(terrain.is_walkable(GridCell::new(0, 0)));
        assert!(!terrain.is_walkable(GridCell::new(1, 1)));
        assert!(!terrain.is_walkable(GridCell::new(4, 0)));
        assert!(!terrain.is_walkable(GridCell::new(0, -1)));
        assert!(Terrain::flat(2, 2)
            .unwrap()
            .with_obstacles([GridCell::new(2, 0)])
            .is_err());
    }

    #[test]
    fn test_scatter_obstacles_extremes() {
        let mut rng = Pcg32::seed_from_u64(5);
        let mut terrain = Terrain::flat(5, 5).unwrap();
        assert_eq!(terrain.scatter_obstacles(0.0, &mut rng).unwrap(), 0);
        assert_eq!(terrain.scatter_obstacles(1.0, &mut rng).unwrap(), 25);
        assert!(terrain.scatter_obstacles(1.5, &mut rng).is_err());
    }

    #[test]
    fn test_clamp_and_cell_lookup() {
        let terrain = Terrain::flat(10, 4).unwrap();
        assert_eq!(terrain.clamp_to_bounds(-3.0, 9.0, 0.25), (0.25, 3.75));
        assert_eq!(terrain.clamp_to_bounds(5.0, 1.0, 3.0), (5.0, 2.0));
        assert_eq!(terrain.cell_at(9.99, 4.0), GridCell::new(9, 3));
        assert_eq!(terrain.cell_at(-1.0, 0.5), GridCell::new(0, 0));
    }

    #[test]
    fn test_snapshot_flattens_grids() {
        let terrain = Terrain::flat(3, 2)
            .unwrap()
            .with_obstacles([GridCell::new(2, 1)])
            .unwrap();
        let snapshot = TerrainSnapshot::from_terrain(&terrain);
        assert_eq!(snapshot.heights.len(), 12);
        assert_eq!(snapshot.tiles.iter().filter(|&&t| t == 1).count(), 1);
    }

    proptest! {
        #[test]
        fn prop_height_stays_within_cell_corners(
            heights in proptest::collection::vec(0.0f32..50.0, 16),
            x in 0.0f32..=3.0,
            z in 0.0f32..=3.0,
        ) {
            let terrain = Terrain::from_heights(3, 3, heights).unwrap();
            let h = terrain.height_at(x, z).unwrap();
            let cell = terrain.cell_at(x.min(2.999), z.min(2.999));
            let (cx, cz) = (cell.x as u32, cell.z as u32);
            let corners = [
                terrain.vertex_height(cx, cz).unwrap(),
                terrain.vertex_height(cx + 1, cz).unwrap(),
                terrain.vertex_height(cx, cz + 1).unwrap(),
                terrain.vertex_height(cx + 1, cz + 1).unwrap(),
            ];
            let lo = corners.iter().cloned().fold(f32::INFINITY, f32::min);
            let hi = corners.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
            prop_assert!(h >= lo - 1e-3 && h <= hi + 1e-3);
        }

        #[test]
        fn prop_seam_continuity(
            heights in proptest::collection::vec(0.0f32..20.0, 9),
            t in 0.01f32..0.99,
        ) {
            let terrain = Terrain::from_heights(2, 2, heights).unwrap();
            let eps = 5e-5;
            let below = terrain.height_at(t - eps, 1.0 - t - eps).unwrap();
            let above = terrain.height_at(t + eps, 1.0 - t + eps).unwrap();
            prop_assert!((below - above).abs() < 1e-2);
        }
    }
}
