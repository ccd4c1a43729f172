//! 發票 → 詞彙 → 範本的完整自動化流程

use crate::core::hwpx::HwpxPackage;
use crate::core::image_inserter::ImageInserter;
use crate::core::invoice::InvoiceExtractor;
use crate::core::ocr::default_engine;
use crate::core::processor::{backup_path, HwpxProcessor};
use crate::core::reference::{load_reference_file, parse_reference, reference_to_json};
use crate::core::replacer::TermReplacer;
use crate::core::terms::generate_terms;
use crate::core::text_source::read_source_text;
use crate::core::{ConfigProvider, OcrEngine, Pipeline, Storage};
use crate::domain::model::{InvoiceReport, ReferenceTable, ReplaceSummary, TaxInvoice};
use crate::utils::error::{AutomationError, Result};
use std::path::Path;
use std::time::Instant;

pub const INVOICE_FILE: &str = "invoice.json";
pub const TERMS_FILE: &str = "terms.json";
pub const SUMMARY_FILE: &str = "replace_summary.json";

fn file_stem(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string())
}

/// 置換後文件的檔名：設定的名稱或 `<範本主檔名>_processed.hwpx`
pub fn processed_file_name(template_path: &str, output_name: Option<&str>) -> String {
    match output_name {
        Some(name) => name.to_string(),
        None => format!("{}_processed.hwpx", file_stem(template_path)),
    }
}

/// 插入圖片後的檔名，沿用置換後文件的主檔名
pub fn final_file_name(processed_name: &str) -> String {
    format!("{}_final.hwpx", file_stem(processed_name))
}

/// 擷取階段讀入的資料
pub struct AutomationInputs {
    pub invoice: Option<TaxInvoice>,
    pub reference: ReferenceTable,
    pub template: HwpxPackage,
}

/// 置換後的文件與相關紀錄
pub struct AutomationResult {
    pub invoice: Option<TaxInvoice>,
    pub terms: ReferenceTable,
    pub document: HwpxPackage,
    pub summary: ReplaceSummary,
}

pub struct AutomationPipeline<S: Storage, C: ConfigProvider> {
    pub(crate) storage: S,
    pub(crate) config: C,
    ocr: Box<dyn OcrEngine>,
    processor: HwpxProcessor,
}

impl<S: Storage, C: ConfigProvider> AutomationPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        Self::with_ocr(storage, config, default_engine())
    }

    pub fn with_ocr(storage: S, config: C, ocr: Box<dyn OcrEngine>) -> Self {
        Self {
            storage,
            config,
            ocr,
            processor: HwpxProcessor::new(false),
        }
    }

    fn output_path(&self, file_name: &str) -> String {
        Path::new(self.config.output_dir())
            .join(file_name)
            .display()
            .to_string()
    }

    fn processed_name(&self) -> String {
        processed_file_name(self.config.template_path(), self.config.output_name())
    }

    async fn read_required(&self, path: &str) -> Result<Vec<u8>> {
        if !self.storage.exists(path).await {
            return Err(AutomationError::FileNotFound {
                path: path.to_string(),
            });
        }
        self.storage.read_file(path).await
    }

    async fn load_user_terms(&self) -> Result<ReferenceTable> {
        let mut table = match self.config.reference_path() {
            Some(path) => {
                let extension = Path::new(path)
                    .extension()
                    .and_then(|e| e.to_str())
                    .map(|e| e.to_lowercase())
                    .unwrap_or_default();
                match extension.as_str() {
                    "xlsx" | "xls" => load_reference_file(Path::new(path))?,
                    _ => parse_reference(&self.read_required(path).await?, &extension)?,
                }
            }
            None => ReferenceTable::new(),
        };

        for (search, replacement) in self.config.inline_terms() {
            table.insert(search, replacement);
        }
        Ok(table)
    }

    async fn write_json(&self, file_name: &str, value: &impl serde::Serialize) -> Result<String> {
        let path = self.output_path(file_name);
        let json = serde_json::to_string_pretty(value)?;
        self.storage.write_file(&path, json.as_bytes()).await?;
        tracing::debug!("Wrote {}", path);
        Ok(path)
    }

    /// 既有輸出被覆寫前先留一份 `.backup`
    async fn backup_existing(&self, path: &str) -> Result<()> {
        let backup = backup_path(Path::new(path)).display().to_string();
        if self.storage.exists(path).await && !self.storage.exists(&backup).await {
            let data = self.storage.read_file(path).await?;
            self.storage.write_file(&backup, &data).await?;
            tracing::info!("💾 Backup created: {}", backup);
        }
        Ok(())
    }

    /// 在處理後的文件插入圖片；失敗只記錄警告
    async fn insert_image(&self, mut document: HwpxPackage, image_path: &str) -> Option<String> {
        let target = self.config.image_target();
        let inserted = ImageInserter::new().insert_into_package(
            &mut document,
            Path::new(image_path),
            target,
            &self.config.image_options(),
        );

        let written = match inserted {
            Ok(prepared) => {
                tracing::info!("🖼️ Inserted {} at {}", prepared.id, target);
                let path = self.output_path(&final_file_name(&self.processed_name()));
                match document.to_bytes() {
                    Ok(bytes) => self.storage.write_file(&path, &bytes).await.map(|_| path),
                    Err(e) => Err(e),
                }
            }
            Err(e) => Err(e),
        };

        match written {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::warn!("⚠️ Image insertion skipped: {}", e);
                tracing::warn!("💡 {}", e.recovery_suggestion());
                None
            }
        }
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for AutomationPipeline<S, C> {
    type Extracted = AutomationInputs;
    type Transformed = AutomationResult;

    async fn extract(&self) -> Result<AutomationInputs> {
        let invoice = match self.config.invoice_path() {
            Some(path) => {
                tracing::info!("🧾 Reading invoice {}", path);
                let text = read_source_text(Path::new(path), self.ocr.as_ref())?;
                let invoice = InvoiceExtractor::new()?.extract(&text)?;
                tracing::info!(
                    "✅ Invoice: {} → {} ({} items)",
                    invoice.supplier.company_name.as_deref().unwrap_or("-"),
                    invoice.buyer.company_name.as_deref().unwrap_or("-"),
                    invoice.items.len()
                );
                Some(invoice)
            }
            None => {
                tracing::info!("No invoice configured, skipping extraction");
                None
            }
        };

        let reference = self.load_user_terms().await?;
        tracing::info!("📋 {} user terms loaded", reference.len());

        let template_path = self.config.template_path();
        let template = HwpxPackage::from_bytes(&self.read_required(template_path).await?)?;
        tracing::info!("📄 Template loaded: {}", template_path);

        Ok(AutomationInputs {
            invoice,
            reference,
            template,
        })
    }

    async fn transform(&self, data: AutomationInputs) -> Result<AutomationResult> {
        let started = Instant::now();
        let AutomationInputs {
            invoice,
            reference,
            mut template,
        } = data;

        let mut terms = invoice.as_ref().map(generate_terms).unwrap_or_default();
        terms.merge(&reference, true);
        if terms.is_empty() {
            tracing::warn!("⚠️ No terms to apply, the template is copied unchanged");
        }

        let options = self.config.replace_options();
        let replacer = TermReplacer::new(&terms, options.clone())?;
        let replaced = self.processor.replace_in_package(&mut template, &replacer)?;

        let summary = ReplaceSummary {
            file_path: self.config.template_path().to_string(),
            total_terms_processed: terms.len(),
            total_replacements: replaced.outcome.total_replacements,
            replacements: replaced.outcome.records,
            preview_only: false,
            processing_time: started.elapsed().as_secs_f64(),
            options_used: Some(options),
            original_length: Some(replaced.original_text.chars().count()),
            modified_length: replaced.modified_text.as_ref().map(|t| t.chars().count()),
            success: true,
            ..Default::default()
        };
        tracing::info!(
            "📊 {} replacements from {} terms",
            summary.total_replacements,
            summary.total_terms_processed
        );

        Ok(AutomationResult {
            invoice,
            terms,
            document: template,
            summary,
        })
    }

    async fn load(&self, result: AutomationResult) -> Result<String> {
        let AutomationResult {
            invoice,
            terms,
            document,
            mut summary,
        } = result;

        let processed_path = self.output_path(&self.processed_name());

        if self.config.replace_options().backup_original {
            self.backup_existing(&processed_path).await?;
        }
        self.storage
            .write_file(&processed_path, &document.to_bytes()?)
            .await?;
        summary.output_file = Some(processed_path.clone());
        tracing::info!("📁 Processed document: {}", processed_path);

        let final_path = match self.config.image_path() {
            Some(image) => self.insert_image(document, image).await,
            None => None,
        };

        if let Some(invoice) = invoice {
            self.write_json(INVOICE_FILE, &InvoiceReport::success(invoice))
                .await?;
        }
        if !terms.is_empty() {
            self.write_json(TERMS_FILE, &reference_to_json(&terms)).await?;
        }
        self.write_json(SUMMARY_FILE, &summary).await?;

        Ok(final_path.unwrap_or(processed_path))
    }
}
