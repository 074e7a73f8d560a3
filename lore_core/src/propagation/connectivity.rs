//! Connectivity weighting between adjacent tiles.

use lore_rules::TileId;

/// Weights a hop between two adjacent tiles.
///
/// Values are expected in `[0.0, 1.0]`; the engine clamps anything outside and
/// treats non-finite values as `0.0`.
pub trait ConnectivityModel {
    fn factor(&self, from: TileId, to: TileId) -> f64;
}

/// Every hop is equally easy.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformConnectivity;

impl ConnectivityModel for UniformConnectivity {
    fn factor(&self, _from: TileId, _to: TileId) -> f64 {
        1.0
    }
}

impl<F> ConnectivityModel for F
where
    F: Fn(TileId, TileId) -> f64,
{
    fn factor(&self, from: TileId, to: TileId) -> f64 {
        self(from, to)
    }
}
