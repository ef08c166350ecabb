//! Synthetic capture backend.
//!
//! Generates RGB frames in-memory for tests and dry runs. The scene changes
//! every `scene_period` frames, which the stub detector reports as an object
//! entering the view.

use std::collections::HashSet;

use crate::error::CaptureError;
use crate::frame::Frame;

use super::{CaptureBackend, CaptureDevice, CaptureProperty};

pub const SYNTHETIC_BACKEND: &str = "synthetic";

/// Synthetic backend. Every index opens unless marked unavailable.
#[derive(Clone, Debug)]
pub struct SyntheticBackend {
    id: String,
    width: u32,
    height: u32,
    scene_period: u64,
    unavailable: HashSet<u32>,
}

impl SyntheticBackend {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            id: SYNTHETIC_BACKEND.to_string(),
            width,
            height,
            scene_period: 50,
            unavailable: HashSet::new(),
        }
    }

    /// Register under a different identifier.
    pub fn with_id(mut self, id: &str) -> Self {
        self.id = id.to_string();
        self
    }

    /// Frames between scene changes (0 disables changes).
    pub fn with_scene_period(mut self, frames: u64) -> Self {
        self.scene_period = frames;
        self
    }

    /// Make `index` fail to open, as if no device were attached there.
    pub fn with_unavailable_index(mut self, index: u32) -> Self {
        self.unavailable.insert(index);
        self
    }
}

impl CaptureBackend for SyntheticBackend {
    fn id(&self) -> &str {
        &self.id
    }

    fn open(&self, index: u32) -> Result<Box<dyn CaptureDevice>, CaptureError> {
        if self.unavailable.contains(&index) {
            return Err(CaptureError::OpenFailed {
                backend: self.id.clone(),
                index,
                reason: "no synthetic device at this index".to_string(),
            });
        }
        log::info!(
            "SyntheticBackend: opened device {} ({}x{})",
            index,
            self.width,
            self.height
        );
        Ok(Box::new(SyntheticDevice {
            width: self.width,
            height: self.height,
            scene_period: self.scene_period,
            frame_count: 0,
            scene_state: 0,
            released: false,
        }))
    }
}

struct SyntheticDevice {
    width: u32,
    height: u32,
    scene_period: u64,
    frame_count: u64,
    scene_state: u8,
    released: bool,
}

impl SyntheticDevice {
    /// Static background that shifts whenever the scene state advances.
    fn generate_pixels(&mut self) -> Vec<u8> {
        let pixel_count = (self.width as usize) * (self.height as usize) * 3;

        if self.scene_period > 0 && self.frame_count % self.scene_period == 0 {
            self.scene_state = self.scene_state.wrapping_add(1);
        }

        let mut pixels = vec![0u8; pixel_count];
        for (i, pixel) in pixels.iter_mut().enumerate() {
            *pixel = ((i as u64 + self.scene_state as u64 * 37) % 256) as u8;
        }
        pixels
    }
}

impl CaptureDevice for SyntheticDevice {
    fn read(&mut self) -> Result<Frame, CaptureError> {
        if self.released {
            return Err(CaptureError::ReadFailure(
                "synthetic device released".to_string(),
            ));
        }
        self.frame_count += 1;
        let pixels = self.generate_pixels();
        Ok(Frame::new(
            pixels,
            self.width,
            self.height,
            3,
            self.frame_count,
        ))
    }

    fn set_property(&mut self, property: CaptureProperty) -> Result<(), CaptureError> {
        match property {
            CaptureProperty::FrameWidth(width) if width > 0 => self.width = width,
            CaptureProperty::FrameHeight(height) if height > 0 => self.height = height,
            CaptureProperty::Fps(_) => {}
            other => {
                return Err(CaptureError::UnsupportedProperty(format!("{:?}", other)))
            }
        }
        Ok(())
    }

    fn release(&mut self) {
        self.released = true;
    }
}
