//! 發票原始文字的取得：PDF、純文字檔或影像 (OCR)

use crate::domain::ports::OcrEngine;
use crate::utils::encoding::decode_bytes;
use crate::utils::error::{AutomationError, Result};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Pdf,
    Text,
    Image,
}

impl SourceKind {
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();
        match extension.as_str() {
            "pdf" => Ok(SourceKind::Pdf),
            "txt" => Ok(SourceKind::Text),
            "png" | "jpg" | "jpeg" | "bmp" | "tif" | "tiff" => Ok(SourceKind::Image),
            _ => Err(AutomationError::UnsupportedFormat { extension }),
        }
    }
}

pub fn pdf_text(bytes: &[u8]) -> Result<String> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| AutomationError::PdfError {
        message: e.to_string(),
    })
}

/// 讀取檔案並轉成文字，影像交由 OCR 引擎處理
pub fn read_source_text(path: &Path, ocr: &dyn OcrEngine) -> Result<String> {
    let kind = SourceKind::from_path(path)?;
    if !path.exists() {
        return Err(AutomationError::FileNotFound {
            path: path.display().to_string(),
        });
    }

    let text = match kind {
        SourceKind::Pdf => pdf_text(&std::fs::read(path)?)?,
        SourceKind::Text => decode_bytes(&std::fs::read(path)?)?.text,
        SourceKind::Image => {
            if !ocr.is_available() {
                return Err(AutomationError::OcrError {
                    message: format!("{} is not available", ocr.name()),
                });
            }
            tracing::info!("🔍 Running OCR ({}) on {}", ocr.name(), path.display());
            ocr.recognize(path)?
        }
    };

    tracing::debug!("Read {} characters from {}", text.chars().count(), path.display());
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    struct FakeOcr;

    impl OcrEngine for FakeOcr {
        fn name(&self) -> &str {
            "fake"
        }
        fn is_available(&self) -> bool {
            true
        }
        fn recognize(&self, image_path: &Path) -> Result<String> {
            Ok(format!("ocr:{}", image_path.display()))
        }
    }

    #[test]
    fn test_kind_by_extension() {
        assert_eq!(SourceKind::from_path(Path::new("a.PDF")).unwrap(), SourceKind::Pdf);
        assert_eq!(SourceKind::from_path(Path::new("a.jpeg")).unwrap(), SourceKind::Image);
        assert!(matches!(
            SourceKind::from_path(Path::new("a.docx")),
            Err(AutomationError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn test_text_file_is_decoded() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("invoice.txt");
        let (encoded, _, _) = encoding_rs::EUC_KR.encode("공급자 상호");
        std::fs::write(&path, &encoded).unwrap();
        assert_eq!(read_source_text(&path, &FakeOcr).unwrap(), "공급자 상호");
    }

    #[test]
    fn test_image_goes_through_ocr() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scan.png");
        std::fs::write(&path, b"png").unwrap();
        let text = read_source_text(&path, &FakeOcr).unwrap();
        assert!(text.starts_with("ocr:"));
    }

    #[test]
    fn test_missing_file() {
        let err = read_source_text(&PathBuf::from("/nonexistent/a.txt"), &FakeOcr).unwrap_err();
        assert!(matches!(err, AutomationError::FileNotFound { .. }));
    }
}
