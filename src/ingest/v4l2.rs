//! V4L2 capture backend.
//!
//! Opens `/dev/video<index>` through libv4l and streams frames via mmap
//! buffers. Requested properties are applied lazily: changing width, height
//! or frame rate tears down the stream, and the next `read` renegotiates the
//! format before capturing again.

use ouroboros::self_referencing;

use super::normalize::{normalize_to_rgb, PixelFormat};
use super::{CaptureBackend, CaptureDevice, CaptureProperty};
use crate::error::CaptureError;
use crate::frame::Frame;

pub const V4L2_BACKEND: &str = "v4l2";

/// V4L2 backend (Linux USB/UVC cameras).
#[derive(Clone, Debug, Default)]
pub struct V4l2Backend;

impl V4l2Backend {
    pub fn new() -> Self {
        Self
    }
}

impl CaptureBackend for V4l2Backend {
    fn id(&self) -> &str {
        V4L2_BACKEND
    }

    fn open(&self, index: u32) -> Result<Box<dyn CaptureDevice>, CaptureError> {
        let device = v4l::Device::new(index as usize).map_err(|err| CaptureError::OpenFailed {
            backend: V4L2_BACKEND.to_string(),
            index,
            reason: err.to_string(),
        })?;
        log::info!("V4l2Backend: opened /dev/video{}", index);
        Ok(Box::new(V4l2Device {
            index,
            device: Some(device),
            stream: None,
            requested: Requested::default(),
            active_width: 0,
            active_height: 0,
            format: PixelFormat::Rgb24,
            frame_count: 0,
        }))
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct Requested {
    width: Option<u32>,
    height: Option<u32>,
    fps: Option<u32>,
}

#[self_referencing]
struct V4l2Stream {
    device: v4l::Device,
    #[borrows(mut device)]
    #[covariant]
    stream: v4l::prelude::MmapStream<'this, v4l::Device>,
}

struct V4l2Device {
    index: u32,
    /// Present while no stream is running; moved into the stream otherwise.
    device: Option<v4l::Device>,
    stream: Option<V4l2Stream>,
    requested: Requested,
    active_width: u32,
    active_height: u32,
    format: PixelFormat,
    frame_count: u64,
}

impl V4l2Device {
    fn read_failure(&self, what: &str, err: impl std::fmt::Display) -> CaptureError {
        CaptureError::ReadFailure(format!("/dev/video{}: {}: {}", self.index, what, err))
    }

    /// Negotiate format and start streaming.
    fn start_stream(&mut self) -> Result<(), CaptureError> {
        use v4l::buffer::Type;
        use v4l::video::Capture;

        let device = self
            .device
            .take()
            .ok_or_else(|| CaptureError::ReadFailure("v4l2 device released".to_string()))?;

        let mut format = device
            .format()
            .map_err(|err| self.read_failure("read format", err))?;
        if let Some(width) = self.requested.width {
            format.width = width;
        }
        if let Some(height) = self.requested.height {
            format.height = height;
        }
        format.fourcc = v4l::FourCC::new(b"RGB3");

        let format = match device.set_format(&format) {
            Ok(format) => format,
            Err(err) => {
                log::warn!(
                    "V4l2Backend: failed to set format on /dev/video{}: {}",
                    self.index,
                    err
                );
                device
                    .format()
                    .map_err(|err| self.read_failure("read format after set failure", err))?
            }
        };

        self.format = PixelFormat::from_fourcc(&format.fourcc.repr).ok_or_else(|| {
            self.read_failure("unsupported pixel format", format.fourcc.to_string())
        })?;

        if let Some(fps) = self.requested.fps.filter(|fps| *fps > 0) {
            let params = v4l::video::capture::Parameters::with_fps(fps);
            if let Err(err) = device.set_params(&params) {
                log::warn!(
                    "V4l2Backend: failed to set fps on /dev/video{}: {}",
                    self.index,
                    err
                );
            }
        }

        self.active_width = format.width;
        self.active_height = format.height;

        let stream = V4l2StreamTryBuilder {
            device,
            stream_builder: |device| {
                v4l::prelude::MmapStream::with_buffers(device, Type::VideoCapture, 4)
            },
        }
        .try_build()
        .map_err(|err| self.read_failure("create buffer stream", err))?;
        self.stream = Some(stream);

        log::info!(
            "V4l2Backend: streaming /dev/video{} ({}x{} {:?})",
            self.index,
            self.active_width,
            self.active_height,
            self.format
        );
        Ok(())
    }

    /// Stop streaming and keep the device for renegotiation.
    fn stop_stream(&mut self) {
        if let Some(stream) = self.stream.take() {
            self.device = Some(stream.into_heads().device);
        }
    }
}

impl CaptureDevice for V4l2Device {
    fn read(&mut self) -> Result<Frame, CaptureError> {
        use v4l::io::traits::CaptureStream;

        if self.stream.is_none() {
            self.start_stream()?;
        }

        let (width, height, format) = (self.active_width, self.active_height, self.format);
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| CaptureError::ReadFailure("v4l2 stream not running".to_string()))?;
        let pixels = stream
            .with_mut(|fields| {
                fields
                    .stream
                    .next()
                    .map(|(buf, _meta)| normalize_to_rgb(buf, width, height, format))
            })
            .map_err(|err| self.read_failure("capture frame", err))?
            .map_err(|err| self.read_failure("convert frame", err))?;

        self.frame_count += 1;
        Ok(Frame::new(pixels, width, height, 3, self.frame_count))
    }

    fn set_property(&mut self, property: CaptureProperty) -> Result<(), CaptureError> {
        match property {
            CaptureProperty::FrameWidth(width) => self.requested.width = Some(width),
            CaptureProperty::FrameHeight(height) => self.requested.height = Some(height),
            CaptureProperty::Fps(fps) => self.requested.fps = Some(fps),
        }
        self.stop_stream();
        Ok(())
    }

    fn release(&mut self) {
        if self.stream.is_some() || self.device.is_some() {
            log::info!("V4l2Backend: released /dev/video{}", self.index);
        }
        self.stream = None;
        self.device = None;
    }
}
