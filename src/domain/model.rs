use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ---------------------------------------------------------------------------
// 稅務發票
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ceo_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub month: String,
    pub day: String,
    pub item_name: String,
    pub specification: String,
    pub quantity: u64,
    pub unit_price: u64,
    pub supply_amount: u64,
    pub tax_amount: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amounts {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supply_amount: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax_amount: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contacts {
    #[serde(default)]
    pub phones: Vec<String>,
    #[serde(default)]
    pub emails: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaxInvoice {
    pub supplier: Party,
    pub buyer: Party,
    pub items: Vec<LineItem>,
    pub document_info: DocumentInfo,
    pub amounts: Amounts,
    pub contacts: Contacts,
}

/// 發票擷取結果 (JSON 輸出格式)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvoiceReport {
    pub success: bool,
    #[serde(flatten)]
    pub invoice: TaxInvoice,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl InvoiceReport {
    pub fn success(invoice: TaxInvoice) -> Self {
        Self {
            success: true,
            invoice,
            error: None,
        }
    }

    /// 失敗時保留已擷取的部分欄位
    pub fn failure(partial: TaxInvoice, error: impl Into<String>) -> Self {
        Self {
            success: false,
            invoice: partial,
            error: Some(error.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// 參照資料
// ---------------------------------------------------------------------------

/// 保持插入順序的「搜尋詞 → 置換詞」表
///
/// 重複插入同一搜尋詞時更新值但保留原本位置。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceTable {
    entries: Vec<(String, String)>,
    index: HashMap<String, usize>,
}

impl ReferenceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, search: impl Into<String>, replacement: impl Into<String>) {
        let search = search.into();
        let replacement = replacement.into();
        match self.index.get(&search) {
            Some(&pos) => self.entries[pos].1 = replacement,
            None => {
                self.index.insert(search.clone(), self.entries.len());
                self.entries.push((search, replacement));
            }
        }
    }

    pub fn get(&self, search: &str) -> Option<&str> {
        self.index.get(search).map(|&pos| self.entries[pos].1.as_str())
    }

    pub fn contains(&self, search: &str) -> bool {
        self.index.contains_key(search)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(s, r)| (s.as_str(), r.as_str()))
    }

    /// 合併另一張表；`overwrite` 為 false 時既有項目優先
    pub fn merge(&mut self, other: &ReferenceTable, overwrite: bool) {
        for (search, replacement) in other.iter() {
            if overwrite || !self.contains(search) {
                self.insert(search, replacement);
            }
        }
    }
}

impl<S: Into<String>, R: Into<String>> FromIterator<(S, R)> for ReferenceTable {
    fn from_iter<I: IntoIterator<Item = (S, R)>>(iter: I) -> Self {
        let mut table = ReferenceTable::new();
        for (s, r) in iter {
            table.insert(s, r);
        }
        table
    }
}

// ---------------------------------------------------------------------------
// 文字置換
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplaceOptions {
    pub case_sensitive: bool,
    pub whole_word_only: bool,
    pub use_regex: bool,
    /// None 表示不限次數
    pub max_replacements_per_term: Option<usize>,
    pub preview_only: bool,
    pub backup_original: bool,
}

impl Default for ReplaceOptions {
    fn default() -> Self {
        Self {
            case_sensitive: false,
            whole_word_only: false,
            use_regex: false,
            max_replacements_per_term: None,
            preview_only: false,
            backup_original: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplacementRecord {
    pub search_term: String,
    pub replacement_term: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matches: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub positions: Option<Vec<usize>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReplaceSummary {
    pub file_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,
    pub total_terms_processed: usize,
    pub total_replacements: usize,
    pub replacements: Vec<ReplacementRecord>,
    pub preview_only: bool,
    pub processing_time: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options_used: Option<ReplaceOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_error: Option<String>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip)]
    pub modified_text: Option<String>,
}

impl ReplaceSummary {
    pub fn failed(file_path: &str, error: impl Into<String>, processing_time: f64) -> Self {
        Self {
            file_path: file_path.to_string(),
            success: false,
            error: Some(error.into()),
            processing_time,
            ..Default::default()
        }
    }
}

// ---------------------------------------------------------------------------
// 圖片插入
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum Alignment {
    Left,
    #[default]
    Center,
    Right,
}

impl Alignment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Alignment::Left => "left",
            Alignment::Center => "center",
            Alignment::Right => "right",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageOptions {
    pub width_mm: f64,
    pub height_mm: f64,
    pub maintain_ratio: bool,
    pub alignment: Alignment,
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self {
            width_mm: 100.0,
            height_mm: 80.0,
            maintain_ratio: true,
            alignment: Alignment::Center,
        }
    }
}

/// 表格儲存格座標 (皆從 0 開始)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellPosition {
    pub table: usize,
    pub row: usize,
    pub column: usize,
}

impl std::fmt::Display for CellPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "table {}, row {}, column {}", self.table, self.row, self.column)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableLayout {
    pub index: usize,
    pub section: String,
    /// 每一列的儲存格數
    pub rows: Vec<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsertResult {
    pub input_file: String,
    pub output_file: String,
    pub image_file: String,
    pub image_id: String,
    pub position: CellPosition,
    pub image_size: String,
    pub pixel_width: u32,
    pub pixel_height: u32,
}

// ---------------------------------------------------------------------------
// 批次處理
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessingStats {
    pub start_time: Option<DateTime<Local>>,
    pub end_time: Option<DateTime<Local>>,
    pub processing_time: f64,
    pub files_processed: usize,
    pub files_successful: usize,
    pub files_failed: usize,
    pub total_replacements: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchSummary {
    pub processing_stats: ProcessingStats,
    pub detailed_results: Vec<ReplaceSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_table_keeps_first_position() {
        let mut table = ReferenceTable::new();
        table.insert("a", "1");
        table.insert("b", "2");
        table.insert("a", "3");

        let entries: Vec<_> = table.iter().collect();
        assert_eq!(entries, vec![("a", "3"), ("b", "2")]);
    }

    #[test]
    fn test_merge_without_overwrite_keeps_existing() {
        let mut user: ReferenceTable = [("[공급자명]", "수동입력")].into_iter().collect();
        let generated: ReferenceTable =
            [("[공급자명]", "자동"), ("[세액]", "1,000원")].into_iter().collect();
        user.merge(&generated, false);
        assert_eq!(user.get("[공급자명]"), Some("수동입력"));
        assert_eq!(user.get("[세액]"), Some("1,000원"));
    }

    #[test]
    fn test_invoice_report_serializes_flat() {
        let mut invoice = TaxInvoice::default();
        invoice.supplier.company_name = Some("주식회사 가나".to_string());
        let json = serde_json::to_value(InvoiceReport::success(invoice)).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["supplier"]["company_name"], "주식회사 가나");
        assert!(json.get("error").is_none());
    }
}
