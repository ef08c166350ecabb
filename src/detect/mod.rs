mod backend;
pub mod backends;
mod detector;
pub mod labels;
mod result;

pub use backend::{Model, RawDetection};
pub use backends::StubModel;
#[cfg(feature = "backend-tract")]
pub use backends::TractModel;
pub use detector::Detector;
pub use result::{BoundingBox, Detection};
