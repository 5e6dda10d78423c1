//! Canvas store — the authoritative pixel grid.
//!
//! DESIGN
//! ======
//! The grid is a `DashMap` keyed by cell coordinate. Writes to distinct
//! cells land on independent shards and never block each other; a write to
//! one cell goes through the entry API, so reading the previous record and
//! installing the new one is a single atomic unit per cell. The most
//! recently accepted write always wins.
//!
//! The store is the single source of truth. Caches and counters derive from
//! `snapshot()` and are never consulted for correctness.

use std::collections::{BTreeMap, HashMap};
use std::time::{SystemTime, UNIX_EPOCH};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// ERROR TYPE
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum CanvasError {
    #[error("coordinates out of bounds: ({x}, {y}) on {width}x{height} canvas")]
    InvalidCoordinate { x: i64, y: i64, width: u32, height: u32 },
    #[error("invalid color format: {0:?} (expected #RRGGBB)")]
    InvalidColor(String),
}

// =============================================================================
// VALUE TYPES
// =============================================================================

/// A validated cell address. Produced by [`CanvasStore::coord`], which proves
/// the bounds invariant once at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Coord {
    pub x: u32,
    pub y: u32,
}

impl Coord {
    /// Wire key form, `"x,y"`.
    #[must_use]
    pub fn key(self) -> String {
        format!("{},{}", self.x, self.y)
    }
}

/// A validated `#RRGGBB` color.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Color(String);

impl Color {
    /// Validate a hex color string.
    ///
    /// # Errors
    ///
    /// Returns `CanvasError::InvalidColor` unless the input is exactly
    /// `#` followed by six hex digits.
    pub fn parse(raw: &str) -> Result<Self, CanvasError> {
        let Some(digits) = raw.strip_prefix('#') else {
            return Err(CanvasError::InvalidColor(raw.to_string()));
        };
        if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(CanvasError::InvalidColor(raw.to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// The record occupying one cell. Replaced wholesale on every accepted
/// write; never partially updated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelRecord {
    pub color: Color,
    /// Milliseconds since Unix epoch.
    pub placed_at: i64,
    pub owner: Uuid,
}

/// Outcome of one accepted placement, computed atomically with the write.
#[derive(Debug, Clone)]
pub struct PlaceResult {
    pub coord: Coord,
    pub record: PixelRecord,
    /// True when the cell had no prior record.
    pub is_new_cell: bool,
    /// Owner of the record that was overwritten, if any.
    pub previous_owner: Option<Uuid>,
}

/// Current time as milliseconds since Unix epoch.
#[must_use]
pub fn now_ms() -> i64 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(dur.as_millis()).unwrap_or(0)
}

// =============================================================================
// SNAPSHOT
// =============================================================================

/// Wire form of one cell, as served to clients and cached as JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelWire {
    pub color: String,
    /// Milliseconds since Unix epoch.
    pub timestamp: i64,
    pub user_id: Uuid,
}

/// Wire form of the full canvas: `"x,y"` → cell. Ordered for stable JSON.
pub type CanvasWire = BTreeMap<String, PixelWire>;

/// A point-in-time copy of the grid.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub cells: HashMap<Coord, PixelRecord>,
}

impl Snapshot {
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Recount cells per owner. Used by counter reconciliation.
    #[must_use]
    pub fn count_by_owner(&self) -> HashMap<Uuid, i64> {
        let mut counts: HashMap<Uuid, i64> = HashMap::new();
        for record in self.cells.values() {
            *counts.entry(record.owner).or_default() += 1;
        }
        counts
    }

    #[must_use]
    pub fn to_wire(&self) -> CanvasWire {
        self.cells
            .iter()
            .map(|(coord, record)| {
                (
                    coord.key(),
                    PixelWire {
                        color: record.color.as_str().to_string(),
                        timestamp: record.placed_at,
                        user_id: record.owner,
                    },
                )
            })
            .collect()
    }
}

// =============================================================================
// STORE
// =============================================================================

/// Authoritative coordinate → record map for one canvas.
pub struct CanvasStore {
    width: u32,
    height: u32,
    cells: DashMap<Coord, PixelRecord>,
}

impl CanvasStore {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height, cells: DashMap::new() }
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Validate a raw coordinate pair against the canvas bounds.
    ///
    /// # Errors
    ///
    /// Returns `CanvasError::InvalidCoordinate` when either component falls
    /// outside `0..width` x `0..height`.
    pub fn coord(&self, x: i64, y: i64) -> Result<Coord, CanvasError> {
        let in_bounds = (0..i64::from(self.width)).contains(&x) && (0..i64::from(self.height)).contains(&y);
        if !in_bounds {
            return Err(CanvasError::InvalidCoordinate { x, y, width: self.width, height: self.height });
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let coord = Coord { x: x as u32, y: y as u32 };
        Ok(coord)
    }

    /// Install a record at `coord`, replacing any existing record.
    ///
    /// The previous owner and the new-cell flag are read under the same
    /// per-cell lock as the write, so concurrent placements on one cell
    /// serialize and each result reflects the record it actually replaced.
    pub fn place(&self, coord: Coord, color: Color, owner: Uuid, placed_at: i64) -> PlaceResult {
        let record = PixelRecord { color, placed_at, owner };
        match self.cells.entry(coord) {
            dashmap::Entry::Occupied(mut occupied) => {
                let previous_owner = occupied.get().owner;
                occupied.insert(record.clone());
                PlaceResult { coord, record, is_new_cell: false, previous_owner: Some(previous_owner) }
            }
            dashmap::Entry::Vacant(vacant) => {
                vacant.insert(record.clone());
                PlaceResult { coord, record, is_new_cell: true, previous_owner: None }
            }
        }
    }

    #[must_use]
    pub fn get(&self, coord: Coord) -> Option<PixelRecord> {
        self.cells.get(&coord).map(|entry| entry.value().clone())
    }

    /// Copy the entire grid. Called on every cache rebuild and every new
    /// viewer connection, so it stays allocation-plus-clone cheap.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        let cells = self
            .cells
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();
        Snapshot { cells }
    }
}

#[cfg(test)]
#[path = "canvas_test.rs"]
mod tests;
