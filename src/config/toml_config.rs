use crate::domain::model::{CellPosition, ImageOptions, ReplaceOptions};
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{AutomationError, Result};
use crate::utils::validation::{
    validate_file_extension, validate_non_empty_string, validate_path, validate_range, Validate,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub pipeline: PipelineConfig,
    pub invoice: Option<InvoiceConfig>,
    pub template: TemplateConfig,
    pub reference: Option<ReferenceConfig>,
    pub replace: Option<ReplaceOptions>,
    pub image: Option<ImageConfig>,
    pub output: OutputConfig,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub name: String,
    pub description: Option<String>,
    pub version: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceConfig {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateConfig {
    pub path: String,
    pub output_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TermConfig {
    pub search: String,
    pub replace: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReferenceConfig {
    pub path: Option<String>,
    #[serde(default)]
    pub terms: Vec<TermConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageConfig {
    pub path: String,
    #[serde(default)]
    pub table: usize,
    #[serde(default)]
    pub row: usize,
    #[serde(default)]
    pub column: usize,
    #[serde(flatten)]
    pub options: ImageOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(AutomationError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| AutomationError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${INVOICE_DIR})，未定義的變數保留原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}")?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        validate_non_empty_string("pipeline.name", &self.pipeline.name)?;

        validate_path("template.path", &self.template.path)?;
        validate_file_extension("template.path", &self.template.path, &["hwpx"])?;
        if let Some(name) = &self.template.output_name {
            validate_file_extension("template.output_name", name, &["hwpx"])?;
        }

        validate_path("output.path", &self.output.path)?;

        if let Some(invoice) = &self.invoice {
            validate_file_extension(
                "invoice.path",
                &invoice.path,
                &["pdf", "txt", "png", "jpg", "jpeg", "bmp", "tif", "tiff"],
            )?;
        }

        if let Some(path) = self.reference.as_ref().and_then(|r| r.path.as_deref()) {
            validate_file_extension("reference.path", path, &["csv", "json", "xlsx", "xls"])?;
        }

        if let Some(replace) = &self.replace {
            if replace.preview_only {
                return Err(AutomationError::InvalidConfigValueError {
                    field: "replace.preview_only".to_string(),
                    value: "true".to_string(),
                    reason: "Pipeline runs always write documents; use `hwpx-automation replace --preview`"
                        .to_string(),
                });
            }
        }

        if let Some(image) = &self.image {
            validate_path("image.path", &image.path)?;
            validate_range("image.width_mm", image.options.width_mm, 1.0, 1000.0)?;
            validate_range("image.height_mm", image.options.height_mm, 1.0, 1000.0)?;
        }

        Ok(())
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }
}

impl ConfigProvider for TomlConfig {
    fn invoice_path(&self) -> Option<&str> {
        self.invoice.as_ref().map(|i| i.path.as_str())
    }

    fn template_path(&self) -> &str {
        &self.template.path
    }

    fn output_name(&self) -> Option<&str> {
        self.template.output_name.as_deref()
    }

    fn reference_path(&self) -> Option<&str> {
        self.reference.as_ref().and_then(|r| r.path.as_deref())
    }

    fn inline_terms(&self) -> Vec<(String, String)> {
        self.reference
            .as_ref()
            .map(|r| {
                r.terms
                    .iter()
                    .map(|t| (t.search.clone(), t.replace.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn output_dir(&self) -> &str {
        &self.output.path
    }

    fn replace_options(&self) -> ReplaceOptions {
        self.replace.clone().unwrap_or_default()
    }

    fn image_path(&self) -> Option<&str> {
        self.image.as_ref().map(|i| i.path.as_str())
    }

    fn image_target(&self) -> CellPosition {
        self.image
            .as_ref()
            .map(|i| CellPosition {
                table: i.table,
                row: i.row,
                column: i.column,
            })
            .unwrap_or_default()
    }

    fn image_options(&self) -> ImageOptions {
        self.image
            .as_ref()
            .map(|i| i.options.clone())
            .unwrap_or_default()
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Alignment;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const FULL: &str = r#"
[pipeline]
name = "monthly-report"
description = "Invoice to report"
version = "1.0"

[invoice]
path = "invoice.pdf"

[template]
path = "report.hwpx"

[reference]
path = "terms.csv"

[[reference.terms]]
search = "[담당자]"
replace = "김철수"

[replace]
whole_word_only = true
max_replacements_per_term = 5

[image]
path = "logo.png"
table = 1
column = 2
width_mm = 50
alignment = "right"

[output]
path = "./out"

[monitoring]
enabled = true
"#;

    #[test]
    fn test_parse_full_config() {
        let config = TomlConfig::from_toml_str(FULL).unwrap();
        config.validate().unwrap();

        assert_eq!(config.invoice_path(), Some("invoice.pdf"));
        assert_eq!(config.reference_path(), Some("terms.csv"));
        assert_eq!(
            config.inline_terms(),
            vec![("[담당자]".to_string(), "김철수".to_string())]
        );

        let replace = config.replace_options();
        assert!(replace.whole_word_only);
        assert_eq!(replace.max_replacements_per_term, Some(5));
        assert!(replace.backup_original);

        assert_eq!(config.image_target(), CellPosition { table: 1, row: 0, column: 2 });
        let image = config.image_options();
        assert_eq!(image.width_mm, 50.0);
        assert_eq!(image.height_mm, 80.0);
        assert_eq!(image.alignment, Alignment::Right);
        assert!(config.monitoring_enabled());
    }

    #[test]
    fn test_minimal_config_defaults() {
        let config = TomlConfig::from_toml_str(
            r#"
[pipeline]
name = "min"

[template]
path = "t.hwpx"

[output]
path = "out"
"#,
        )
        .unwrap();
        config.validate().unwrap();
        assert_eq!(config.invoice_path(), None);
        assert!(config.inline_terms().is_empty());
        assert_eq!(config.replace_options(), ReplaceOptions::default());
        assert!(!config.monitoring_enabled());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("HWPX_TEST_TEMPLATE_DIR", "/data/templates");
        let config = TomlConfig::from_toml_str(
            r#"
[pipeline]
name = "env"

[template]
path = "${HWPX_TEST_TEMPLATE_DIR}/report.hwpx"

[output]
path = "${HWPX_TEST_UNSET_VAR}"
"#,
        )
        .unwrap();
        assert_eq!(config.template_path(), "/data/templates/report.hwpx");
        assert_eq!(config.output_dir(), "${HWPX_TEST_UNSET_VAR}");
        std::env::remove_var("HWPX_TEST_TEMPLATE_DIR");
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let wrong_template = FULL.replace("report.hwpx", "report.docx");
        assert!(TomlConfig::from_toml_str(&wrong_template).unwrap().validate().is_err());

        let preview = FULL.replace("whole_word_only = true", "preview_only = true");
        assert!(TomlConfig::from_toml_str(&preview).unwrap().validate().is_err());

        let reference = FULL.replace("terms.csv", "terms.txt");
        assert!(TomlConfig::from_toml_str(&reference).unwrap().validate().is_err());
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(FULL.as_bytes()).unwrap();
        let config = TomlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.pipeline.name, "monthly-report");
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        assert!(matches!(
            TomlConfig::from_toml_str("[pipeline"),
            Err(AutomationError::ConfigValidationError { .. })
        ));
    }
}
