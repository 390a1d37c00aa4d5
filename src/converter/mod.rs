pub mod driver;
pub mod output_manager;

pub use driver::{BatchDriver, BatchProgress, PageProgress, ProgressCallback, ProgressEvent};
pub use output_manager::{ConversionLog, OutputManager};
