//! 執行前的環境檢查
//!
//! OCR 引擎只是建議項目，除非明確要求 OCR。

use crate::domain::ports::OcrEngine;
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Ok,
    Warning,
    Failed,
}

impl CheckStatus {
    pub fn symbol(&self) -> &'static str {
        match self {
            CheckStatus::Ok => "✅",
            CheckStatus::Warning => "⚠️",
            CheckStatus::Failed => "❌",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Check {
    pub name: String,
    pub status: CheckStatus,
    pub detail: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PreflightReport {
    pub checks: Vec<Check>,
}

impl PreflightReport {
    fn push(&mut self, name: &str, status: CheckStatus, detail: impl Into<String>) {
        self.checks.push(Check {
            name: name.to_string(),
            status,
            detail: detail.into(),
        });
    }

    pub fn has_failures(&self) -> bool {
        self.checks.iter().any(|c| c.status == CheckStatus::Failed)
    }

    pub fn warnings(&self) -> usize {
        self.checks
            .iter()
            .filter(|c| c.status == CheckStatus::Warning)
            .count()
    }

    pub fn log(&self) {
        for check in &self.checks {
            match check.status {
                CheckStatus::Ok => tracing::info!("{} {}: {}", check.status.symbol(), check.name, check.detail),
                CheckStatus::Warning => tracing::warn!("{} {}: {}", check.status.symbol(), check.name, check.detail),
                CheckStatus::Failed => tracing::error!("{} {}: {}", check.status.symbol(), check.name, check.detail),
            }
        }
    }
}

/// 要檢查的項目
#[derive(Debug, Clone, Default)]
pub struct PreflightOptions {
    pub require_ocr: bool,
    pub reference: Option<PathBuf>,
    pub documents: Vec<PathBuf>,
    pub output_dir: Option<PathBuf>,
    /// 不建立目錄也不寫入測試檔
    pub dry_run: bool,
}

fn check_file(report: &mut PreflightReport, name: &str, path: &Path) {
    if path.is_file() {
        report.push(name, CheckStatus::Ok, path.display().to_string());
    } else {
        report.push(name, CheckStatus::Failed, format!("{} not found", path.display()));
    }
}

fn check_output_dir(report: &mut PreflightReport, dir: &Path) {
    let probe = dir.join(format!(".hwpx-preflight-{}", std::process::id()));
    let writable = std::fs::create_dir_all(dir)
        .and_then(|_| std::fs::write(&probe, b"ok"))
        .and_then(|_| std::fs::remove_file(&probe));
    match writable {
        Ok(()) => report.push("output directory", CheckStatus::Ok, dir.display().to_string()),
        Err(e) => report.push(
            "output directory",
            CheckStatus::Failed,
            format!("{} is not writable: {}", dir.display(), e),
        ),
    }
}

/// 只看權限，不動檔案系統；目錄不存在時檢查最近的既有上層目錄
fn check_output_dir_read_only(report: &mut PreflightReport, dir: &Path) {
    let existing = dir
        .ancestors()
        .map(|p| if p.as_os_str().is_empty() { Path::new(".") } else { p })
        .find(|p| p.exists());

    match existing.map(|p| (p, std::fs::metadata(p))) {
        Some((p, Ok(meta))) if meta.is_dir() && !meta.permissions().readonly() => {
            let detail = if p == dir {
                dir.display().to_string()
            } else {
                format!("{} (will be created)", dir.display())
            };
            report.push("output directory", CheckStatus::Ok, detail);
        }
        Some((p, _)) => report.push(
            "output directory",
            CheckStatus::Failed,
            format!("{} is not a writable directory", p.display()),
        ),
        None => report.push(
            "output directory",
            CheckStatus::Failed,
            format!("{} has no existing parent directory", dir.display()),
        ),
    }
}

pub fn run_preflight(options: &PreflightOptions, ocr: &dyn OcrEngine) -> PreflightReport {
    let mut report = PreflightReport::default();

    if ocr.is_available() {
        report.push("ocr engine", CheckStatus::Ok, ocr.name());
    } else {
        let status = if options.require_ocr {
            CheckStatus::Failed
        } else {
            CheckStatus::Warning
        };
        report.push(
            "ocr engine",
            status,
            format!("{} not found; image invoices cannot be read", ocr.name()),
        );
    }

    if let Some(reference) = &options.reference {
        check_file(&mut report, "reference file", reference);
    }
    for document in &options.documents {
        check_file(&mut report, "document", document);
    }
    if let Some(dir) = &options.output_dir {
        if options.dry_run {
            check_output_dir_read_only(&mut report, dir);
        } else {
            check_output_dir(&mut report, dir);
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::Result;
    use tempfile::TempDir;

    struct Ocr(bool);

    impl OcrEngine for Ocr {
        fn name(&self) -> &str {
            "test-ocr"
        }
        fn is_available(&self) -> bool {
            self.0
        }
        fn recognize(&self, _: &Path) -> Result<String> {
            Ok(String::new())
        }
    }

    #[test]
    fn test_missing_ocr_is_advisory() {
        let report = run_preflight(&PreflightOptions::default(), &Ocr(false));
        assert!(!report.has_failures());
        assert_eq!(report.warnings(), 1);
    }

    #[test]
    fn test_required_ocr_fails() {
        let options = PreflightOptions {
            require_ocr: true,
            ..Default::default()
        };
        assert!(run_preflight(&options, &Ocr(false)).has_failures());
        assert!(!run_preflight(&options, &Ocr(true)).has_failures());
    }

    #[test]
    fn test_files_and_output_dir() {
        let dir = TempDir::new().unwrap();
        let reference = dir.path().join("terms.csv");
        std::fs::write(&reference, "a,b").unwrap();

        let options = PreflightOptions {
            reference: Some(reference),
            documents: vec![dir.path().join("missing.hwpx")],
            output_dir: Some(dir.path().join("out")),
            ..Default::default()
        };
        let report = run_preflight(&options, &Ocr(true));
        let statuses: Vec<_> = report.checks.iter().map(|c| c.status).collect();
        assert_eq!(
            statuses,
            vec![CheckStatus::Ok, CheckStatus::Ok, CheckStatus::Failed, CheckStatus::Ok]
        );
        assert!(dir.path().join("out").is_dir());
    }

    #[test]
    fn test_dry_run_does_not_create_output_dir() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("out/nested");
        let options = PreflightOptions {
            output_dir: Some(output.clone()),
            dry_run: true,
            ..Default::default()
        };
        let report = run_preflight(&options, &Ocr(true));
        assert!(!report.has_failures());
        assert!(report.checks[1].detail.ends_with("(will be created)"));
        assert!(!dir.path().join("out").exists());

        let file = dir.path().join("plain.txt");
        std::fs::write(&file, "x").unwrap();
        let options = PreflightOptions {
            output_dir: Some(file.join("out")),
            dry_run: true,
            ..Default::default()
        };
        assert!(run_preflight(&options, &Ocr(true)).has_failures());
    }
}
