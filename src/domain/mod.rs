// Domain layer: core models and ports (interfaces) shared by the core services and pipelines.

pub mod model;
pub mod ports;
