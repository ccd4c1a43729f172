pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use app::pipelines::automation_pipeline::AutomationPipeline;
pub use config::{cli::LocalStorage, toml_config::TomlConfig};
pub use core::{etl::EtlEngine, hwpx::HwpxPackage, processor::HwpxProcessor};
pub use utils::error::{AutomationError, Result};
