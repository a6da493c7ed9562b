//! Render surfaces for the mask grid

use crate::config::MaskConfig;
use crate::error::MaskError;
use crate::frame::RenderedMask;
use crate::processing::PlacementRect;
use async_trait::async_trait;
use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use std::path::Path;
use tracing::debug;

/// 2D drawing surface the pipeline paints masks onto.
///
/// Drawing goes to a back buffer; `invalidate` commits it for display.
#[async_trait]
pub trait RenderSurface: Send {
    fn clear(&mut self) -> Result<(), MaskError>;

    fn draw_image(&mut self, mask: &RenderedMask, rect: PlacementRect) -> Result<(), MaskError>;

    async fn invalidate(&mut self) -> Result<(), MaskError>;
}

/// In-memory surface backed by an RGB image.
pub struct ImageCanvas {
    frame: RgbImage,
    committed: RgbImage,
    commits: usize,
    draws: usize,
}

impl ImageCanvas {
    /// Create a new black canvas.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            frame: RgbImage::new(width, height),
            committed: RgbImage::new(width, height),
            commits: 0,
            draws: 0,
        }
    }

    /// Create a canvas sized for `columns` cells per row.
    ///
    /// The configuration is validated before any pixel buffer is allocated.
    pub fn from_config(config: &MaskConfig) -> Result<Self, MaskError> {
        config.validate().map_err(MaskError::Config)?;
        Ok(Self::new(config.canvas_width()?, config.canvas_height))
    }

    /// Width and height in pixels.
    pub fn dimensions(&self) -> (u32, u32) {
        self.frame.dimensions()
    }

    /// Number of `invalidate` calls so far
    pub fn commits(&self) -> usize {
        self.commits
    }

    /// Number of masks drawn since creation
    pub fn draws(&self) -> usize {
        self.draws
    }

    /// Last committed frame
    pub fn committed(&self) -> &RgbImage {
        &self.committed
    }

    /// Write the last committed frame to `path`.
    pub fn save(&self, path: &Path) -> Result<(), MaskError> {
        self.committed.save(path)?;
        debug!("Canvas saved to {:?}", path);
        Ok(())
    }
}

#[async_trait]
impl RenderSurface for ImageCanvas {
    fn clear(&mut self) -> Result<(), MaskError> {
        for pixel in self.frame.pixels_mut() {
            *pixel = Rgb([0, 0, 0]);
        }
        Ok(())
    }

    fn draw_image(&mut self, mask: &RenderedMask, rect: PlacementRect) -> Result<(), MaskError> {
        if rect.width == 0 || rect.height == 0 {
            return Err(MaskError::Resource(format!(
                "cannot draw into empty cell {:?}",
                rect
            )));
        }

        let image = mask.to_rgb_image()?;
        let cell = if image.dimensions() == (rect.width, rect.height) {
            image
        } else {
            imageops::resize(&image, rect.width, rect.height, FilterType::Triangle)
        };

        // replace clips at the canvas edges
        imageops::replace(&mut self.frame, &cell, rect.x as i64, rect.y as i64);
        self.draws += 1;
        Ok(())
    }

    async fn invalidate(&mut self) -> Result<(), MaskError> {
        self.committed.clone_from(&self.frame);
        self.commits += 1;
        Ok(())
    }
}
