pub mod etl;
pub mod hwpx;
pub mod image_inserter;
pub mod invoice;
pub mod ocr;
pub mod preflight;
pub mod processor;
pub mod reference;
pub mod replacer;
pub mod terms;
pub mod text_source;

pub use crate::domain::ports::{ConfigProvider, OcrEngine, Pipeline, Storage};
pub use crate::utils::error::Result;
