//! HWPX 文字讀取、搜尋置換與資料夾批次處理

use crate::core::hwpx::text::{extract_text, DocumentText, TextNodes};
use crate::core::hwpx::HwpxPackage;
use crate::core::reference::ReferenceSource;
use crate::core::replacer::{ReplaceOutcome, TermReplacer};
use crate::domain::model::{
    BatchSummary, ProcessingStats, ReferenceTable, ReplaceOptions, ReplaceSummary,
};
use crate::utils::error::{AutomationError, Result};
use crate::utils::progress::progress_bar;
use chrono::Local;
use std::path::{Path, PathBuf};
use std::time::Instant;

pub const BATCH_SUMMARY_FILE: &str = "batch_processing_summary.json";
pub const DEFAULT_BATCH_PATTERN: &str = "*.hwpx";

/// 套用到封裝後的結果
#[derive(Debug, Clone)]
pub struct PackageReplacement {
    pub outcome: ReplaceOutcome,
    pub original_text: String,
    /// 預覽模式時為 None
    pub modified_text: Option<String>,
}

pub fn backup_path(file: &Path) -> PathBuf {
    let mut name = file.as_os_str().to_os_string();
    name.push(".backup");
    PathBuf::from(name)
}

#[derive(Debug, Clone, Default)]
pub struct HwpxProcessor {
    show_progress: bool,
}

impl HwpxProcessor {
    pub fn new(show_progress: bool) -> Self {
        Self { show_progress }
    }

    pub fn read_hwpx(&self, path: &Path) -> Result<(HwpxPackage, DocumentText)> {
        let package = HwpxPackage::open(path)?;
        let text = extract_text(&package)?;
        tracing::info!(
            "📄 Read {} ({} sections, {} characters)",
            path.display(),
            text.sections.len(),
            text.char_count
        );
        Ok((package, text))
    }

    /// 在記憶體中的封裝上套用詞彙；非預覽模式會改寫各區段的文字節點
    pub fn replace_in_package(
        &self,
        package: &mut HwpxPackage,
        replacer: &TermReplacer,
    ) -> Result<PackageReplacement> {
        let original_text = extract_text(package)?.text;
        let progress = progress_bar(replacer.term_count() as u64, "terms", self.show_progress);

        let replacement = if replacer.options().preview_only {
            PackageReplacement {
                outcome: replacer.preview(&original_text, &progress),
                original_text,
                modified_text: None,
            }
        } else {
            let mut nodes = TextNodes::collect(package)?;
            let outcome = replacer.apply_nodes(&mut nodes.values, &progress);
            let sections = nodes.write_back(package)?;
            tracing::debug!("{} sections rewritten", sections);
            PackageReplacement {
                outcome,
                original_text,
                modified_text: Some(extract_text(package)?.text),
            }
        };
        progress.finish_and_clear();
        Ok(replacement)
    }

    /// 搜尋置換單一檔案；失敗時回傳 `success = false` 的摘要
    pub fn search_and_replace(
        &self,
        hwpx_file: &Path,
        source: &ReferenceSource,
        output_file: Option<&Path>,
        options: &ReplaceOptions,
    ) -> ReplaceSummary {
        let started = Instant::now();
        let result = source
            .load()
            .and_then(|table| self.replace_file(hwpx_file, &table, output_file, options, started));

        match result {
            Ok(summary) => summary,
            Err(e) => {
                tracing::error!("❌ Processing failed for {}: {}", hwpx_file.display(), e);
                ReplaceSummary::failed(
                    &hwpx_file.display().to_string(),
                    e.to_string(),
                    started.elapsed().as_secs_f64(),
                )
            }
        }
    }

    fn replace_file(
        &self,
        hwpx_file: &Path,
        table: &ReferenceTable,
        output_file: Option<&Path>,
        options: &ReplaceOptions,
        started: Instant,
    ) -> Result<ReplaceSummary> {
        tracing::info!("🚀 Processing {}", hwpx_file.display());
        let (mut package, _) = self.read_hwpx(hwpx_file)?;
        let replacer = TermReplacer::new(table, options.clone())?;

        if options.backup_original && !options.preview_only {
            let backup = backup_path(hwpx_file);
            if !backup.exists() {
                std::fs::copy(hwpx_file, &backup)?;
                tracing::info!("💾 Backup created: {}", backup.display());
            }
        }

        let replaced = self.replace_in_package(&mut package, &replacer)?;

        let mut summary = ReplaceSummary {
            file_path: hwpx_file.display().to_string(),
            total_terms_processed: table.len(),
            total_replacements: replaced.outcome.total_replacements,
            replacements: replaced.outcome.records,
            preview_only: options.preview_only,
            options_used: Some(options.clone()),
            success: true,
            ..Default::default()
        };

        if let Some(modified) = &replaced.modified_text {
            summary.original_length = Some(replaced.original_text.chars().count());
            summary.modified_length = Some(modified.chars().count());
        }
        summary.processing_time = started.elapsed().as_secs_f64();
        summary.modified_text = replaced.modified_text;

        if let Some(output) = output_file.filter(|_| !options.preview_only) {
            self.save_output(output, &mut summary, &package);
        }

        tracing::info!(
            "✅ {} replacements in {:.2}s",
            summary.total_replacements,
            summary.processing_time
        );
        Ok(summary)
    }

    /// 依副檔名寫出結果；寫出失敗記錄在摘要中
    fn save_output(&self, output: &Path, summary: &mut ReplaceSummary, package: &HwpxPackage) {
        let extension = output
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        let written = match extension.as_str() {
            "hwpx" => package.save(output),
            "txt" => write_file(output, summary.modified_text.as_deref().unwrap_or_default()),
            "json" => serde_json::to_string_pretty(&*summary)
                .map_err(AutomationError::from)
                .and_then(|json| write_file(output, &json)),
            other => Err(AutomationError::UnsupportedFormat {
                extension: other.to_string(),
            }),
        };

        match written {
            Ok(()) => {
                summary.output_file = Some(output.display().to_string());
                tracing::info!("📁 Output written: {}", output.display());
            }
            Err(e) => {
                tracing::error!("❌ Failed to write {}: {}", output.display(), e);
                summary.output_error = Some(e.to_string());
            }
        }
    }

    /// 處理資料夾中符合樣式的檔案，單一檔案失敗不會中斷批次
    pub fn batch_process_folder(
        &self,
        folder: &Path,
        source: &ReferenceSource,
        output_folder: Option<&Path>,
        pattern: &str,
        options: &ReplaceOptions,
    ) -> Result<BatchSummary> {
        if !folder.is_dir() {
            return Err(AutomationError::FileNotFound {
                path: folder.display().to_string(),
            });
        }
        let output_dir = output_folder
            .map(Path::to_path_buf)
            .unwrap_or_else(|| folder.join("processed"));
        std::fs::create_dir_all(&output_dir)?;

        let table = source.load()?;
        let search = folder.join(pattern);
        let files: Vec<PathBuf> = glob::glob(&search.to_string_lossy())
            .map_err(|e| AutomationError::validation(format!("invalid pattern '{}': {}", pattern, e)))?
            .filter_map(|entry| entry.ok())
            .filter(|p| p.is_file())
            .collect();

        let mut stats = ProcessingStats {
            start_time: Some(Local::now()),
            files_processed: files.len(),
            ..Default::default()
        };
        let started = Instant::now();
        tracing::info!("🚀 Batch processing {} files", files.len());

        let progress = progress_bar(files.len() as u64, "files", self.show_progress);
        let mut results = Vec::with_capacity(files.len());
        let source = ReferenceSource::Table(table);

        for file in &files {
            let stem = file
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            progress.set_message(stem.clone());
            let output = output_dir.join(format!("{}_processed.hwpx", stem));

            let mut summary = self.search_and_replace(file, &source, Some(&output), options);
            summary.source_file = Some(file.display().to_string());

            if summary.success {
                stats.files_successful += 1;
                stats.total_replacements += summary.total_replacements;
                tracing::info!("✅ {}: {} replacements", stem, summary.total_replacements);
            } else {
                stats.files_failed += 1;
                tracing::error!(
                    "❌ {}: {}",
                    stem,
                    summary.error.as_deref().unwrap_or("unknown error")
                );
            }
            results.push(summary);
            progress.inc(1);
        }
        progress.finish_and_clear();

        stats.end_time = Some(Local::now());
        stats.processing_time = started.elapsed().as_secs_f64();

        let batch = BatchSummary {
            processing_stats: stats,
            detailed_results: results,
        };
        let summary_path = output_dir.join(BATCH_SUMMARY_FILE);
        write_file(&summary_path, &serde_json::to_string_pretty(&batch)?)?;

        let stats = &batch.processing_stats;
        tracing::info!(
            "📊 Batch done: {}/{} succeeded, {} replacements, {:.2}s",
            stats.files_successful,
            stats.files_processed,
            stats.total_replacements,
            stats.processing_time
        );
        tracing::info!("📁 Summary written: {}", summary_path.display());
        Ok(batch)
    }
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, contents)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::hwpx::package::test_support::build_package;
    use tempfile::TempDir;

    const SECTION: &str = "<SECTION><P><TEXT>구용어 문서와 구용어</TEXT></P>\n<P><TEXT>HWPX</TEXT></P></SECTION>";

    fn write_doc(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, build_package(&[("BodyText/Section0.xml", SECTION)])).unwrap();
        path
    }

    fn terms() -> ReferenceSource {
        ReferenceSource::Table([("구용어", "신용어"), ("hwpx", "한글문서")].into_iter().collect())
    }

    #[test]
    fn test_backup_path_appends_suffix() {
        assert_eq!(backup_path(Path::new("a/doc.hwpx")), PathBuf::from("a/doc.hwpx.backup"));
    }

    #[test]
    fn test_replace_rewrites_document_and_creates_backup() {
        let dir = TempDir::new().unwrap();
        let doc = write_doc(dir.path(), "doc.hwpx");
        let output = dir.path().join("doc_out.hwpx");

        let summary = HwpxProcessor::default().search_and_replace(
            &doc,
            &terms(),
            Some(&output),
            &ReplaceOptions::default(),
        );
        assert!(summary.success, "{:?}", summary.error);
        assert_eq!(summary.total_replacements, 3);
        assert_eq!(summary.total_terms_processed, 2);
        assert_eq!(summary.modified_text.as_deref(), Some("신용어 문서와 신용어 한글문서"));
        assert_eq!(summary.output_file.as_deref(), Some(output.display().to_string().as_str()));
        assert!(backup_path(&doc).exists());

        let (_, text) = HwpxProcessor::default().read_hwpx(&output).unwrap();
        assert_eq!(text.text, "신용어 문서와 신용어 한글문서");
    }

    #[test]
    fn test_preview_changes_nothing() {
        let dir = TempDir::new().unwrap();
        let doc = write_doc(dir.path(), "doc.hwpx");
        let output = dir.path().join("out.txt");
        let options = ReplaceOptions {
            preview_only: true,
            ..Default::default()
        };

        let summary = HwpxProcessor::default().search_and_replace(&doc, &terms(), Some(&output), &options);
        assert!(summary.success);
        assert_eq!(summary.total_replacements, 0);
        assert_eq!(summary.replacements[0].matches, Some(2));
        assert_eq!(summary.replacements[0].positions, Some(vec![0, 8]));
        assert!(summary.modified_length.is_none());
        assert!(!output.exists());
        assert!(!backup_path(&doc).exists());
    }

    #[test]
    fn test_text_and_json_outputs() {
        let dir = TempDir::new().unwrap();
        let doc = write_doc(dir.path(), "doc.hwpx");
        let options = ReplaceOptions {
            backup_original: false,
            ..Default::default()
        };
        let processor = HwpxProcessor::default();

        let txt = dir.path().join("out.txt");
        processor.search_and_replace(&doc, &terms(), Some(&txt), &options);
        assert_eq!(std::fs::read_to_string(&txt).unwrap(), "신용어 문서와 신용어 한글문서");

        let json = dir.path().join("out.json");
        processor.search_and_replace(&doc, &terms(), Some(&json), &options);
        let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&json).unwrap()).unwrap();
        assert_eq!(value["total_replacements"], 3);
        assert!(value.get("modified_text").is_none());
    }

    #[test]
    fn test_missing_file_is_failed_summary() {
        let summary = HwpxProcessor::default().search_and_replace(
            Path::new("/nonexistent/doc.hwpx"),
            &terms(),
            None,
            &ReplaceOptions::default(),
        );
        assert!(!summary.success);
        assert!(summary.error.is_some());
    }

    #[test]
    fn test_batch_counts_failures_and_writes_summary() {
        let dir = TempDir::new().unwrap();
        write_doc(dir.path(), "a.hwpx");
        write_doc(dir.path(), "b.hwpx");
        std::fs::write(dir.path().join("broken.hwpx"), b"not a zip").unwrap();

        let batch = HwpxProcessor::default()
            .batch_process_folder(dir.path(), &terms(), None, DEFAULT_BATCH_PATTERN, &ReplaceOptions::default())
            .unwrap();

        let stats = &batch.processing_stats;
        assert_eq!(stats.files_processed, 3);
        assert_eq!(stats.files_successful, 2);
        assert_eq!(stats.files_failed, 1);
        assert_eq!(stats.total_replacements, 6);

        let processed = dir.path().join("processed");
        assert!(processed.join("a_processed.hwpx").exists());
        assert!(processed.join(BATCH_SUMMARY_FILE).exists());
        assert_eq!(
            batch.detailed_results[0].source_file.as_deref(),
            Some(dir.path().join("a.hwpx").display().to_string().as_str())
        );
    }
}
