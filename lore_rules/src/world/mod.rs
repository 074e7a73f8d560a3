//! World primitives - tiles, ticks, and the explicit grid encoding.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Identifier of a tile in the world's adjacency graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TileId(pub u32);

impl TileId {
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    pub fn index(self) -> u32 {
        self.0
    }
}

impl From<u32> for TileId {
    fn from(index: u32) -> Self {
        Self(index)
    }
}

impl std::fmt::Display for TileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "tile#{}", self.0)
    }
}

/// Simulation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tick(pub u64);

impl Tick {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// The tick immediately after this one.
    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl std::fmt::Display for Tick {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "T{}", self.0)
    }
}

/// Ordered neighbor lists keyed by tile.
///
/// Neighbor order is significant: propagation evaluates neighbors in list order and
/// the first discovery of a tile wins.
pub type AdjacencyMap = HashMap<TileId, Vec<TileId>>;

/// A position on a rectangular world grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileCoordinate {
    pub x: u32,
    pub y: u32,
}

impl TileCoordinate {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// Rectangular grid dimensions defining the linear tile encoding `id = y * width + x`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldGrid {
    pub width: u32,
    pub height: u32,
}

impl WorldGrid {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Total number of tiles on the grid.
    pub fn tile_count(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Check whether a coordinate lies on the grid.
    pub fn contains(&self, coord: TileCoordinate) -> bool {
        coord.x < self.width && coord.y < self.height
    }

    /// Encode a coordinate into a tile id. Returns `None` off-grid or when the id
    /// would not fit in a `u32`.
    pub fn encode(&self, coord: TileCoordinate) -> Option<TileId> {
        if !self.contains(coord) {
            return None;
        }
        let id = u64::from(coord.y) * u64::from(self.width) + u64::from(coord.x);
        u32::try_from(id).ok().map(TileId)
    }

    /// Decode a tile id back into its coordinate. Returns `None` for ids past the grid.
    pub fn decode(&self, tile: TileId) -> Option<TileCoordinate> {
        if self.width == 0 || u64::from(tile.0) >= self.tile_count() {
            return None;
        }
        Some(TileCoordinate {
            x: tile.0 % self.width,
            y: tile.0 / self.width,
        })
    }

    /// Build a 4-neighborhood adjacency map for every tile on the grid.
    ///
    /// Neighbors are listed north, west, east, south so the ordering is stable
    /// across runs.
    pub fn four_neighbor_adjacency(&self) -> AdjacencyMap {
        let mut map = AdjacencyMap::new();
        for y in 0..self.height {
            for x in 0..self.width {
                let Some(tile) = self.encode(TileCoordinate::new(x, y)) else {
                    continue;
                };
                let mut neighbors = Vec::with_capacity(4);
                let candidates = [
                    y.checked_sub(1).map(|ny| TileCoordinate::new(x, ny)),
                    x.checked_sub(1).map(|nx| TileCoordinate::new(nx, y)),
                    x.checked_add(1).map(|nx| TileCoordinate::new(nx, y)),
                    y.checked_add(1).map(|ny| TileCoordinate::new(x, ny)),
                ];
                for coord in candidates.into_iter().flatten() {
                    if let Some(neighbor) = self.encode(coord) {
                        neighbors.push(neighbor);
                    }
                }
                map.insert(tile, neighbors);
            }
        }
        map
    }
}
