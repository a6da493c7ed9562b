//! Configuration for narayana-mask

use crate::error::MaskError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Spatial resolution the saliency model expects (square).
pub const DEFAULT_INPUT_SIZE: usize = 224;
/// Mask size drawn on the canvas
pub const DEFAULT_CELL_SIZE: u32 = 100;
/// Gap between masks on the canvas
pub const DEFAULT_GAP: u32 = 10;
pub const DEFAULT_COLUMNS: u32 = 3;

const MAX_COLUMNS: u32 = 64;
const MAX_INPUT_SIZE: usize = 4096;
const MAX_CELL_SIZE: u32 = 4096;
const MAX_GAP: u32 = 4096;
const MAX_CANVAS_PIXELS: u64 = 100_000_000;

/// Mask pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaskConfig {
    /// Model input resolution, the input tensor is [1, 3, input_size, input_size]
    pub input_size: usize,
    /// Edge length of one grid cell in canvas pixels
    pub cell_size: u32,
    /// Gap between cells and around the grid border
    pub gap: u32,
    /// Cells per row before wrapping
    pub columns: u32,
    /// Height of the render canvas
    pub canvas_height: u32,
    /// Log preprocessing, inference and postprocessing times
    pub log_timings: bool,
    /// Path to the model file, used by the binaries
    pub model_path: Option<PathBuf>,
}

impl Default for MaskConfig {
    fn default() -> Self {
        Self {
            input_size: DEFAULT_INPUT_SIZE,
            cell_size: DEFAULT_CELL_SIZE,
            gap: DEFAULT_GAP,
            columns: DEFAULT_COLUMNS,
            canvas_height: 450,
            log_timings: true,
            model_path: None,
        }
    }
}

impl MaskConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.input_size == 0 {
            return Err("Input size must be non-zero".to_string());
        }

        if self.input_size > MAX_INPUT_SIZE {
            return Err(format!("Input size too large (max {})", MAX_INPUT_SIZE));
        }

        if self.cell_size == 0 {
            return Err("Cell size must be non-zero".to_string());
        }

        if self.cell_size > MAX_CELL_SIZE {
            return Err(format!("Cell size too large (max {})", MAX_CELL_SIZE));
        }

        if self.gap > MAX_GAP {
            return Err(format!("Gap too large (max {})", MAX_GAP));
        }

        if self.columns == 0 || self.columns > MAX_COLUMNS {
            return Err(format!("Columns must be between 1 and {}", MAX_COLUMNS));
        }

        if self.canvas_height == 0 {
            return Err("Canvas height must be non-zero".to_string());
        }

        let width = self
            .checked_canvas_width()
            .ok_or_else(|| "Canvas width would cause integer overflow".to_string())?;

        let total_pixels = (width as u64)
            .checked_mul(self.canvas_height as u64)
            .ok_or_else(|| "Canvas size would cause integer overflow".to_string())?;

        if total_pixels > MAX_CANVAS_PIXELS {
            return Err("Canvas too large (max 100M pixels)".to_string());
        }

        Ok(())
    }

    /// Width of the canvas that fits `columns` cells plus gaps.
    pub fn canvas_width(&self) -> Result<u32, MaskError> {
        self.checked_canvas_width().ok_or_else(|| {
            MaskError::Config(format!(
                "{} columns of {} px cells with {} px gaps overflow the canvas width",
                self.columns, self.cell_size, self.gap
            ))
        })
    }

    fn checked_canvas_width(&self) -> Option<u32> {
        self.cell_size
            .checked_add(self.gap)
            .and_then(|stride| stride.checked_mul(self.columns))
            .and_then(|row| row.checked_add(self.gap))
    }

    /// Parse a TOML document, filling missing fields with defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, MaskError> {
        let config: MaskConfig =
            toml::from_str(source).map_err(|e| MaskError::Config(e.to_string()))?;
        config.validate().map_err(MaskError::Config)?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, MaskError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }
}
