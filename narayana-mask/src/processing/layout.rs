//! Grid layout of rendered masks

use crate::config::MaskConfig;
use crate::error::MaskError;
use crate::frame::RenderedMask;
use serde::{Deserialize, Serialize};

/// Destination rectangle of one mask on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PlacementRect {
    pub fn overlaps(&self, other: &PlacementRect) -> bool {
        let span = |start: u32, len: u32| (u64::from(start), u64::from(start) + u64::from(len));
        let (ax0, ax1) = span(self.x, self.width);
        let (bx0, bx1) = span(other.x, other.width);
        let (ay0, ay1) = span(self.y, self.height);
        let (by0, by1) = span(other.y, other.height);
        ax0 < bx1 && bx0 < ax1 && ay0 < by1 && by0 < ay1
    }
}

/// A rendered mask paired with its cell.
#[derive(Debug)]
pub struct GridPlacement {
    pub mask: RenderedMask,
    pub rect: PlacementRect,
}

/// Left-to-right, top-to-bottom grid of fixed-size cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridLayoutEngine {
    cell_size: u32,
    gap: u32,
    columns: u32,
}

impl GridLayoutEngine {
    /// Create a new layout engine. A zero column count is treated as one.
    pub fn new(cell_size: u32, gap: u32, columns: u32) -> Self {
        Self {
            cell_size,
            gap,
            columns: columns.max(1),
        }
    }

    /// Create a layout engine from the grid fields of `config`.
    pub fn from_config(config: &MaskConfig) -> Self {
        Self::new(config.cell_size, config.gap, config.columns)
    }

    /// Horizontal room for one row: `columns * (cell_size + gap)`.
    pub fn row_width_budget(&self) -> u64 {
        u64::from(self.columns) * self.stride()
    }

    fn stride(&self) -> u64 {
        u64::from(self.cell_size) + u64::from(self.gap)
    }

    /// Offset of the cell at `index` along one axis, if the whole cell fits
    /// in canvas coordinates.
    fn cell_origin(&self, index: u64) -> Option<u32> {
        let origin = index.checked_mul(self.stride())?.checked_add(u64::from(self.gap))?;
        let origin = u32::try_from(origin).ok()?;
        origin.checked_add(self.cell_size)?;
        Some(origin)
    }

    /// Cell rectangles for `count` images.
    ///
    /// The cursor starts at `(gap, gap)` and advances by `cell_size + gap`;
    /// once a row holds `columns` cells it wraps back to `x = gap`. The grid
    /// grows downward until a cell would leave the `u32` coordinate range,
    /// which is a `Resource` error.
    pub fn positions(&self, count: usize) -> Result<Vec<PlacementRect>, MaskError> {
        let columns = u64::from(self.columns);
        (0..count as u64)
            .map(|i| {
                let x = self.cell_origin(i % columns);
                let y = self.cell_origin(i / columns);
                match (x, y) {
                    (Some(x), Some(y)) => Ok(PlacementRect {
                        x,
                        y,
                        width: self.cell_size,
                        height: self.cell_size,
                    }),
                    _ => Err(MaskError::Resource(format!(
                        "grid cell {} lies outside the canvas coordinate range",
                        i
                    ))),
                }
            })
            .collect()
    }

    /// Place masks in order. An empty input yields an empty layout.
    ///
    /// On error the masks are dropped, which releases them.
    pub fn place(&self, images: Vec<RenderedMask>) -> Result<Vec<GridPlacement>, MaskError> {
        let rects = self.positions(images.len())?;
        Ok(images
            .into_iter()
            .zip(rects)
            .map(|(mask, rect)| GridPlacement { mask, rect })
            .collect())
    }
}
