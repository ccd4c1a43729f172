pub mod automation_pipeline;
