//! 參照資料 (搜尋詞 → 置換詞) 的載入與儲存
//!
//! 支援 CSV、JSON、XLSX/XLS 檔案，以及直接傳入的表格或詞彙配對。

use crate::domain::model::ReferenceTable;
use crate::utils::encoding::decode_bytes;
use crate::utils::error::{AutomationError, Result};
use std::path::{Path, PathBuf};

const HEADER_KEYWORDS: [&str; 8] = [
    "검색어",
    "원본",
    "search",
    "original",
    "치환어",
    "대체",
    "replace",
    "replacement",
];

const DELIMITERS: [u8; 4] = [b',', b'\t', b';', b'|'];
const SNIFF_BYTES: usize = 1024;

pub const SAMPLE_CSV_NAME: &str = "sample_terms.csv";
pub const SAMPLE_JSON_NAME: &str = "sample_terms.json";

const SAMPLE_CSV: &str = "검색어,치환어
HWPX,한글문서파일
변환,치환
검색,탐색
구용어,신용어
클라우드,구름컴퓨팅
빅데이터,대용량데이터
AI,인공지능
IoT,사물인터넷
머신러닝,기계학습
";

const SAMPLE_JSON: &str = r#"{
  "Old Brand": "New Brand",
  "구브랜드": "신브랜드",
  "legacy": "modern",
  "deprecated": "updated",
  "obsolete": "current"
}
"#;

/// 參照資料來源
#[derive(Debug, Clone)]
pub enum ReferenceSource {
    File(PathBuf),
    Table(ReferenceTable),
    Pairs(Vec<(String, String)>),
}

impl ReferenceSource {
    pub fn load(&self) -> Result<ReferenceTable> {
        match self {
            ReferenceSource::File(path) => load_reference_file(path),
            ReferenceSource::Table(table) => {
                tracing::info!("Loaded {} terms from table", table.len());
                Ok(table.clone())
            }
            ReferenceSource::Pairs(pairs) => {
                let table: ReferenceTable = pairs.iter().cloned().collect();
                tracing::info!("Loaded {} terms from pairs", table.len());
                Ok(table)
            }
        }
    }
}

impl From<ReferenceTable> for ReferenceSource {
    fn from(table: ReferenceTable) -> Self {
        ReferenceSource::Table(table)
    }
}

impl From<&Path> for ReferenceSource {
    fn from(path: &Path) -> Self {
        ReferenceSource::File(path.to_path_buf())
    }
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default()
}

pub fn load_reference_file(path: &Path) -> Result<ReferenceTable> {
    if !path.exists() {
        return Err(AutomationError::FileNotFound {
            path: path.display().to_string(),
        });
    }

    let extension = extension_of(path);
    let table = match extension.as_str() {
        "xlsx" | "xls" => load_spreadsheet(path)?,
        _ => parse_reference(&std::fs::read(path)?, &extension)?,
    };
    tracing::info!(
        "📁 Loaded {} reference terms from {}",
        table.len(),
        path.display()
    );
    Ok(table)
}

/// 由檔案內容解析 CSV 或 JSON 參照資料
pub fn parse_reference(bytes: &[u8], extension: &str) -> Result<ReferenceTable> {
    match extension.to_lowercase().as_str() {
        "csv" => parse_csv(bytes),
        "json" => parse_json(bytes),
        other => Err(AutomationError::UnsupportedFormat {
            extension: other.to_string(),
        }),
    }
}

fn is_header(first: &str, second: &str) -> bool {
    let first = first.to_lowercase();
    let second = second.to_lowercase();
    HEADER_KEYWORDS
        .iter()
        .any(|k| first.contains(k) || second.contains(k))
}

/// 以前 1 KiB 的內容判斷分隔字元，取每行出現次數最少值最大者
pub fn sniff_delimiter(text: &str) -> u8 {
    let mut end = text.len().min(SNIFF_BYTES);
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    let sample = &text[..end];

    let mut lines: Vec<&str> = sample.lines().filter(|l| !l.trim().is_empty()).collect();
    if end < text.len() && lines.len() > 1 {
        lines.pop();
    }

    let mut best = (b',', 0usize);
    for delimiter in DELIMITERS {
        let consistent = lines
            .iter()
            .map(|l| l.matches(delimiter as char).count())
            .min()
            .unwrap_or(0);
        if consistent > best.1 {
            best = (delimiter, consistent);
        }
    }
    best.0
}

fn insert_row(table: &mut ReferenceTable, search: &str, replacement: &str, row_number: usize) {
    let search = search.trim();
    let replacement = replacement.trim();
    if search.is_empty() {
        return;
    }
    if replacement.is_empty() {
        tracing::warn!("Row {}: empty replacement for '{}'", row_number, search);
    }
    table.insert(search, replacement);
}

fn parse_csv(bytes: &[u8]) -> Result<ReferenceTable> {
    let decoded = decode_bytes(bytes)?;
    let delimiter = sniff_delimiter(&decoded.text);
    tracing::debug!(
        "CSV decoded as {}, delimiter {:?}",
        decoded.encoding.name(),
        delimiter as char
    );

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(decoded.text.as_bytes());

    let mut table = ReferenceTable::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record?;
        if record.len() < 2 {
            continue;
        }
        if idx == 0 && is_header(&record[0], &record[1]) {
            continue;
        }
        insert_row(&mut table, &record[0], &record[1], idx + 1);
    }
    Ok(table)
}

fn parse_json(bytes: &[u8]) -> Result<ReferenceTable> {
    let decoded = decode_bytes(bytes)?;
    let value: serde_json::Value = serde_json::from_str(&decoded.text)?;
    let object = value
        .as_object()
        .ok_or_else(|| AutomationError::validation("JSON reference data must be an object"))?;

    let mut table = ReferenceTable::new();
    for (search, replacement) in object {
        let replacement = match replacement {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Number(n) => n.to_string(),
            serde_json::Value::Bool(b) => b.to_string(),
            other => {
                return Err(AutomationError::validation(format!(
                    "replacement for '{}' must be a string, got {}",
                    search, other
                )))
            }
        };
        table.insert(search.as_str(), replacement);
    }
    Ok(table)
}

fn load_spreadsheet(path: &Path) -> Result<ReferenceTable> {
    use calamine::{open_workbook_auto, Data, Reader};

    let spreadsheet_error = |e: calamine::Error| AutomationError::SpreadsheetError {
        message: format!("{}: {}", path.display(), e),
    };

    let mut workbook = open_workbook_auto(path).map_err(spreadsheet_error)?;
    let Some(sheet) = workbook.sheet_names().first().cloned() else {
        return Ok(ReferenceTable::new());
    };
    let range = workbook.worksheet_range(&sheet).map_err(spreadsheet_error)?;

    let cell_text = |cell: &Data| match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::Error(e) => format!("#ERR:{e:?}"),
        Data::DateTime(dt) => dt.to_string(),
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
    };

    let mut table = ReferenceTable::new();
    for (idx, row) in range.rows().enumerate() {
        if row.len() < 2 {
            continue;
        }
        let search = cell_text(&row[0]);
        let replacement = cell_text(&row[1]);
        if idx == 0 && is_header(&search, &replacement) {
            continue;
        }
        if search.trim().eq_ignore_ascii_case("nan") {
            continue;
        }
        insert_row(&mut table, &search, &replacement, idx + 1);
    }
    Ok(table)
}

/// 轉成保持順序的 JSON 物件
pub fn reference_to_json(table: &ReferenceTable) -> serde_json::Value {
    let object: serde_json::Map<String, serde_json::Value> = table
        .iter()
        .map(|(s, r)| (s.to_string(), serde_json::Value::String(r.to_string())))
        .collect();
    serde_json::Value::Object(object)
}

/// 依副檔名存成 `.json` 或 `.csv`
pub fn save_reference(table: &ReferenceTable, path: &Path) -> Result<()> {
    if table.is_empty() {
        return Err(AutomationError::validation("nothing to save: reference table is empty"));
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    match extension_of(path).as_str() {
        "json" => std::fs::write(path, serde_json::to_string_pretty(&reference_to_json(table))?)?,
        "csv" => {
            let mut writer = csv::Writer::from_path(path)?;
            writer.write_record(["원본텍스트", "치환텍스트"])?;
            for (search, replacement) in table.iter() {
                writer.write_record([search, replacement])?;
            }
            writer.flush()?;
        }
        other => {
            return Err(AutomationError::UnsupportedFormat {
                extension: other.to_string(),
            })
        }
    }

    tracing::info!("💾 Saved {} reference terms to {}", table.len(), path.display());
    Ok(())
}

/// 找不到參照檔時使用的預設詞彙
pub fn default_terms() -> ReferenceTable {
    [("예시용어", "변경된용어"), ("HWPX", "한글문서")]
        .into_iter()
        .collect()
}

/// 在目錄中建立範例 CSV 與 JSON 參照檔
pub fn create_sample_files(dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;

    let csv_path = dir.join(SAMPLE_CSV_NAME);
    std::fs::write(&csv_path, SAMPLE_CSV)?;
    let json_path = dir.join(SAMPLE_JSON_NAME);
    std::fs::write(&json_path, SAMPLE_JSON)?;

    tracing::info!("✅ Sample files created in {}", dir.display());
    Ok(vec![csv_path, json_path])
}
