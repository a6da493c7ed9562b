//! Camera frames and rendered masks
//!
//! Both are scarce native-backed resources in the camera/canvas world. Each
//! one may carry a [`Lease`] from a [`ResourceLedger`]; the lease is returned
//! exactly once when the owning value is dropped or explicitly released, so
//! every exit path of a pass gives its resources back.

use crate::error::MaskError;
use crate::tensor::Tensor;
use image::RgbImage;
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Counts acquisitions and releases of native-backed resources.
#[derive(Debug, Default)]
pub struct ResourceLedger {
    acquired: AtomicUsize,
    released: AtomicUsize,
}

impl ResourceLedger {
    /// Create a new, empty ledger.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Acquire a lease that is returned when dropped.
    pub fn lease(self: &Arc<Self>) -> Lease {
        self.acquired.fetch_add(1, Ordering::SeqCst);
        Lease {
            ledger: Arc::clone(self),
        }
    }

    /// Leases handed out so far.
    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    /// Resources acquired but not yet released.
    pub fn live(&self) -> usize {
        self.acquired().saturating_sub(self.released())
    }
}

/// RAII token for one native-backed resource.
pub struct Lease {
    ledger: Arc<ResourceLedger>,
}

impl Drop for Lease {
    fn drop(&mut self) {
        self.ledger.released.fetch_add(1, Ordering::SeqCst);
    }
}

impl fmt::Debug for Lease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lease").finish_non_exhaustive()
    }
}

/// Raw camera frame: 3 interleaved 8-bit color channels in HWC order.
#[derive(Debug)]
pub struct RawImage {
    height: usize,
    width: usize,
    data: Vec<u8>,
    lease: Option<Lease>,
}

impl RawImage {
    /// Wrap a raw buffer. The buffer length is checked when the frame is encoded.
    pub fn new(height: usize, width: usize, data: Vec<u8>) -> Self {
        Self {
            height,
            width,
            data,
            lease: None,
        }
    }

    /// Track this frame in `ledger` until it is released.
    pub fn with_ledger(mut self, ledger: &Arc<ResourceLedger>) -> Self {
        self.lease = Some(ledger.lease());
        self
    }

    pub fn from_rgb_image(image: RgbImage) -> Self {
        let (width, height) = image.dimensions();
        Self::new(height as usize, width as usize, image.into_raw())
    }

    /// Decode an image file of any format the `image` crate supports.
    pub fn open(path: &Path) -> Result<Self, MaskError> {
        let image = image::open(path)?.to_rgb8();
        debug!("Opened {:?} ({}x{})", path, image.width(), image.height());
        Ok(Self::from_rgb_image(image))
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Interleaved RGB bytes, row-major.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Release the frame. Dropping it has the same effect.
    pub fn release(self) {}
}

/// Display-ready RGB mask, `uint8` tensor of shape `[3, H, W]`.
#[derive(Debug)]
pub struct RenderedMask {
    pixels: Tensor<u8>,
    lease: Option<Lease>,
}

impl RenderedMask {
    /// Create a new untracked mask from `[3, H, W]` pixels.
    pub fn new(pixels: Tensor<u8>) -> Result<Self, MaskError> {
        if pixels.rank() != 3 || pixels.shape()[0] != 3 {
            return Err(MaskError::Shape(format!(
                "rendered mask must be [3, H, W], got {:?}",
                pixels.shape()
            )));
        }
        Ok(Self {
            pixels,
            lease: None,
        })
    }

    pub(crate) fn with_lease(mut self, lease: Option<Lease>) -> Self {
        self.lease = lease;
        self
    }

    pub fn pixels(&self) -> &Tensor<u8> {
        &self.pixels
    }

    pub fn height(&self) -> usize {
        self.pixels.shape()[1]
    }

    pub fn width(&self) -> usize {
        self.pixels.shape()[2]
    }

    /// Interleave the CHW planes into an RGB image.
    pub fn to_rgb_image(&self) -> Result<RgbImage, MaskError> {
        let (height, width) = (self.height(), self.width());
        let hwc = self
            .pixels
            .as_array()
            .view()
            .permuted_axes(ndarray::IxDyn(&[1, 2, 0]));
        let raw: Vec<u8> = hwc.iter().copied().collect();
        RgbImage::from_raw(width as u32, height as u32, raw).ok_or_else(|| {
            MaskError::Resource(format!("cannot build {}x{} RGB image", width, height))
        })
    }

    /// Release the mask. Dropping it has the same effect.
    pub fn release(self) {}
}
