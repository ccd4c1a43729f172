use crate::domain::ports::Pipeline;
use crate::utils::error::Result;
use crate::utils::monitor::ResourceMonitor;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
    monitor: ResourceMonitor,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: ResourceMonitor::new(monitor_enabled),
        }
    }

    pub async fn run(&self) -> Result<String> {
        tracing::info!("🚀 Starting document automation run");
        if self.monitor.is_enabled() {
            tracing::info!("📊 Resource monitoring enabled");
        }

        // Extract
        tracing::info!("📥 Extracting invoice and reference data...");
        let extracted = self.pipeline.extract().await?;
        self.monitor.mark_phase("extract");

        // Transform
        tracing::info!("🔄 Applying terms to template...");
        let transformed = self.pipeline.transform(extracted).await?;
        self.monitor.mark_phase("transform");

        // Load
        tracing::info!("💾 Writing outputs...");
        let output_path = self.pipeline.load(transformed).await?;
        self.monitor.mark_phase("load");

        self.monitor.log_final_stats();
        tracing::info!("📁 Output saved to: {}", output_path);
        Ok(output_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct RecordingPipeline {
        calls: Mutex<Vec<&'static str>>,
    }

    #[async_trait]
    impl Pipeline for RecordingPipeline {
        type Extracted = u32;
        type Transformed = String;

        async fn extract(&self) -> Result<u32> {
            self.calls.lock().unwrap().push("extract");
            Ok(2)
        }

        async fn transform(&self, data: u32) -> Result<String> {
            self.calls.lock().unwrap().push("transform");
            Ok(format!("value-{}", data * 2))
        }

        async fn load(&self, result: String) -> Result<String> {
            self.calls.lock().unwrap().push("load");
            Ok(format!("out/{}", result))
        }
    }

    #[tokio::test]
    async fn test_phases_run_in_order() {
        let engine = EtlEngine::new_with_monitoring(
            RecordingPipeline {
                calls: Mutex::new(Vec::new()),
            },
            true,
        );
        assert_eq!(engine.run().await.unwrap(), "out/value-4");
        assert_eq!(
            *engine.pipeline.calls.lock().unwrap(),
            vec!["extract", "transform", "load"]
        );
    }
}
