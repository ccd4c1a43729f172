use crate::domain::model::{CellPosition, ImageOptions, ReplaceOptions};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::path::Path;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    fn exists(&self, path: &str) -> impl std::future::Future<Output = bool> + Send;
}

/// 完整流程所需的設定來源
pub trait ConfigProvider: Send + Sync {
    fn invoice_path(&self) -> Option<&str>;
    fn template_path(&self) -> &str;
    /// 處理後文件的檔名，未設定時為 `<範本名稱>_processed.hwpx`
    fn output_name(&self) -> Option<&str>;
    fn reference_path(&self) -> Option<&str>;
    fn inline_terms(&self) -> Vec<(String, String)>;
    fn output_dir(&self) -> &str;
    fn replace_options(&self) -> ReplaceOptions;
    fn image_path(&self) -> Option<&str>;
    fn image_target(&self) -> CellPosition;
    fn image_options(&self) -> ImageOptions;
}

/// 影像文字辨識
pub trait OcrEngine: Send + Sync {
    fn name(&self) -> &str;
    fn is_available(&self) -> bool;
    fn recognize(&self, image_path: &Path) -> Result<String>;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    type Extracted: Send;
    type Transformed: Send;

    async fn extract(&self) -> Result<Self::Extracted>;
    async fn transform(&self, data: Self::Extracted) -> Result<Self::Transformed>;
    async fn load(&self, result: Self::Transformed) -> Result<String>;
}
