use thiserror::Error;

#[derive(Error, Debug)]
pub enum AutomationError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("XML error: {0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("Image error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Invalid pattern: {0}")]
    PatternError(#[from] regex::Error),

    #[error("PDF extraction failed: {message}")]
    PdfError { message: String },

    #[error("OCR failed: {message}")]
    OcrError { message: String },

    #[error("Spreadsheet error: {message}")]
    SpreadsheetError { message: String },

    #[error("Encoding error: {message}")]
    EncodingError { message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration field: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value for {field} ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("Unsupported file format: {extension}")]
    UnsupportedFormat { extension: String },

    #[error("Required field not found in invoice: {field}")]
    FieldNotFound { field: String },

    #[error("Table {index} not found, document has {total} tables")]
    TableNotFound { index: usize, total: usize },

    #[error("Row {row} does not exist, table has {total} rows")]
    RowOutOfRange { row: usize, total: usize },

    #[error("Column {column} does not exist, row has {total} cells")]
    ColumnOutOfRange { column: usize, total: usize },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Input,
    Document,
    Extraction,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

impl AutomationError {
    pub fn processing(message: impl Into<String>) -> Self {
        Self::ProcessingError {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ConfigError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::ConfigValidationError { .. } => ErrorCategory::Configuration,
            Self::FileNotFound { .. }
            | Self::UnsupportedFormat { .. }
            | Self::CsvError(_)
            | Self::SpreadsheetError { .. }
            | Self::EncodingError { .. }
            | Self::SerializationError(_)
            | Self::ValidationError { .. } => ErrorCategory::Input,
            Self::ZipError(_)
            | Self::XmlError(_)
            | Self::TableNotFound { .. }
            | Self::RowOutOfRange { .. }
            | Self::ColumnOutOfRange { .. }
            | Self::ImageError(_)
            | Self::PatternError(_)
            | Self::ProcessingError { .. } => ErrorCategory::Document,
            Self::PdfError { .. } | Self::OcrError { .. } | Self::FieldNotFound { .. } => {
                ErrorCategory::Extraction
            }
            Self::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::FieldNotFound { .. } => ErrorSeverity::Medium,
            Self::OcrError { .. } => ErrorSeverity::Medium,
            Self::IoError(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::High,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::ConfigError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::ConfigValidationError { .. } => {
                "Check the configuration file or command-line arguments"
            }
            Self::FileNotFound { .. } => "Check that the path exists and is spelled correctly",
            Self::UnsupportedFormat { .. } => {
                "Use a supported format (reference: csv/json/xlsx, invoice: pdf/txt/png/jpg)"
            }
            Self::CsvError(_) | Self::EncodingError { .. } => {
                "Save the file as UTF-8 CSV with two columns: search term, replacement"
            }
            Self::SpreadsheetError { .. } => {
                "Make sure the first sheet has search terms in column A and replacements in column B"
            }
            Self::SerializationError(_) => "Check that the JSON file is a flat object of strings",
            Self::ZipError(_) | Self::XmlError(_) => {
                "The file is not a valid HWPX document; re-save it from the word processor"
            }
            Self::TableNotFound { .. } | Self::RowOutOfRange { .. } | Self::ColumnOutOfRange { .. } => {
                "Run the `tables` command to inspect the table layout"
            }
            Self::ImageError(_) => "Use a PNG, JPEG, BMP, GIF or TIFF image",
            Self::PatternError(_) => "Escape special characters or disable regex mode",
            Self::PdfError { .. } => "The PDF may be scanned; convert it to an image and use OCR",
            Self::OcrError { .. } => "Install Tesseract OCR with the Korean language pack",
            Self::FieldNotFound { .. } => {
                "The invoice layout was not recognised; check the extracted text"
            }
            Self::IoError(_) => "Check file permissions and free disk space",
            Self::ProcessingError { .. } | Self::ValidationError { .. } => {
                "Check the input data and try again"
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Invalid configuration: {}", self),
            ErrorCategory::Input => format!("Could not read input: {}", self),
            ErrorCategory::Document => format!("Document processing failed: {}", self),
            ErrorCategory::Extraction => format!("Invoice extraction failed: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }

    /// 依嚴重程度決定程序結束碼
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

pub type Result<T> = std::result::Result<T, AutomationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let err = AutomationError::TableNotFound { index: 3, total: 1 };
        assert_eq!(err.category(), ErrorCategory::Document);
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().contains("has 1 tables"));

        let err = AutomationError::FieldNotFound {
            field: "supplier.registration_number".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Extraction);
        assert_eq!(err.severity(), ErrorSeverity::Medium);

        let io = AutomationError::from(std::io::Error::other("disk"));
        assert_eq!(io.exit_code(), 3);
        assert!(io.user_friendly_message().starts_with("System error"));
    }
}
