//! 影像文字辨識 (Tesseract)
//!
//! 預設呼叫 `tesseract` 執行檔；啟用 `ocr` feature 時改用 libtesseract 綁定。

use crate::domain::ports::OcrEngine;
use crate::utils::error::{AutomationError, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

pub const DEFAULT_LANGUAGE: &str = "kor+eng";

/// 常見的安裝目錄
const INSTALL_DIRS: [&str; 5] = [
    "C:\\Program Files\\Tesseract-OCR",
    "C:\\Program Files (x86)\\Tesseract-OCR",
    "/usr/bin",
    "/usr/local/bin",
    "/opt/homebrew/bin",
];

fn executable_name() -> &'static str {
    if cfg!(windows) {
        "tesseract.exe"
    } else {
        "tesseract"
    }
}

/// 在 PATH 與常見安裝目錄中尋找 tesseract
pub fn locate_tesseract() -> Option<PathBuf> {
    let name = executable_name();
    let from_path = std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).collect::<Vec<_>>())
        .unwrap_or_default();

    from_path
        .into_iter()
        .chain(INSTALL_DIRS.iter().map(PathBuf::from))
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}

pub struct TesseractCli {
    binary: Option<PathBuf>,
    language: String,
}

impl TesseractCli {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            binary: locate_tesseract(),
            language: language.into(),
        }
    }
}

impl OcrEngine for TesseractCli {
    fn name(&self) -> &str {
        "tesseract-cli"
    }

    fn is_available(&self) -> bool {
        self.binary.is_some()
    }

    fn recognize(&self, image_path: &Path) -> Result<String> {
        let binary = self.binary.as_ref().ok_or_else(|| AutomationError::OcrError {
            message: "tesseract executable not found".to_string(),
        })?;

        tracing::debug!("Running {} on {}", binary.display(), image_path.display());
        let output = Command::new(binary)
            .arg(image_path)
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .output()
            .map_err(|e| AutomationError::OcrError {
                message: format!("failed to run {}: {}", binary.display(), e),
            })?;

        if !output.status.success() {
            return Err(AutomationError::OcrError {
                message: format!(
                    "tesseract exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[cfg(feature = "ocr")]
pub struct LeptessEngine {
    language: String,
}

#[cfg(feature = "ocr")]
impl LeptessEngine {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
        }
    }
}

#[cfg(feature = "ocr")]
impl OcrEngine for LeptessEngine {
    fn name(&self) -> &str {
        "libtesseract"
    }

    fn is_available(&self) -> bool {
        leptess::LepTess::new(None, &self.language).is_ok()
    }

    fn recognize(&self, image_path: &Path) -> Result<String> {
        let ocr_error = |message: String| AutomationError::OcrError { message };

        let mut lt = leptess::LepTess::new(None, &self.language)
            .map_err(|e| ocr_error(format!("failed to initialize tesseract: {}", e)))?;
        lt.set_image(image_path)
            .map_err(|e| ocr_error(format!("failed to load {}: {}", image_path.display(), e)))?;
        lt.get_utf8_text()
            .map_err(|e| ocr_error(format!("recognized text is not UTF-8: {}", e)))
    }
}

/// 依編譯選項選擇 OCR 引擎
pub fn default_engine() -> Box<dyn OcrEngine> {
    #[cfg(feature = "ocr")]
    {
        Box::new(LeptessEngine::new(DEFAULT_LANGUAGE))
    }
    #[cfg(not(feature = "ocr"))]
    {
        Box::new(TesseractCli::new(DEFAULT_LANGUAGE))
    }
}
