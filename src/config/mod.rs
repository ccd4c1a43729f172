#[cfg(feature = "cli")]
mod args;
pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use args::{
    CliConfig, Command, DoctorArgs, ExtractArgs, InsertImageArgs, ReplaceArgs, SamplesArgs,
    TablesArgs, TermsArgs,
};
