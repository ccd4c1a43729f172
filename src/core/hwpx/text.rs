//! 本文文字擷取與文字節點改寫

use crate::core::hwpx::package::{HwpxPackage, DOC_INFO_ENTRY};
use crate::core::hwpx::xml::{attribute_value, local_name, read_events, write_events};
use crate::utils::error::Result;
use quick_xml::events::{BytesText, Event};
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

#[derive(Debug, Clone, Serialize)]
pub struct SectionText {
    pub section_index: usize,
    pub file_name: String,
    pub text: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub date: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentText {
    pub text: String,
    pub sections: Vec<SectionText>,
    pub metadata: DocumentMetadata,
    pub char_count: usize,
}

pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").trim().to_string()
}

pub fn extract_section_text(xml: &str) -> Result<String> {
    let mut raw = String::new();
    for event in read_events(xml)? {
        match event {
            Event::Text(t) => raw.push_str(&t.unescape()?),
            Event::CData(c) => raw.push_str(&String::from_utf8_lossy(&c)),
            _ => {}
        }
    }
    Ok(collapse_whitespace(&raw))
}

/// 讀取 `SUMMARYINFO` 的標題、作者與日期；失敗時僅記錄除錯訊息
pub fn read_metadata(package: &HwpxPackage) -> DocumentMetadata {
    let xml = match package.read_xml(DOC_INFO_ENTRY) {
        Ok(Some(xml)) => xml,
        Ok(None) => return DocumentMetadata::default(),
        Err(e) => {
            tracing::debug!("Document info parse error: {}", e);
            return DocumentMetadata::default();
        }
    };

    let events = match read_events(&xml) {
        Ok(events) => events,
        Err(e) => {
            tracing::debug!("Document info parse error: {}", e);
            return DocumentMetadata::default();
        }
    };

    for event in &events {
        if let Event::Start(e) | Event::Empty(e) = event {
            if local_name(e.name().as_ref()) == b"SUMMARYINFO" {
                return DocumentMetadata {
                    title: attribute_value(e, b"title").ok().flatten(),
                    author: attribute_value(e, b"author").ok().flatten(),
                    date: attribute_value(e, b"date").ok().flatten(),
                };
            }
        }
    }
    DocumentMetadata::default()
}

pub fn extract_text(package: &HwpxPackage) -> Result<DocumentText> {
    let mut sections = Vec::new();

    for (index, name) in package.section_names().iter().enumerate() {
        let Some(xml) = package.read_xml(name)? else {
            continue;
        };
        let text = extract_section_text(&xml)?;
        sections.push(SectionText {
            section_index: index,
            file_name: name.rsplit('/').next().unwrap_or(name).to_string(),
            text,
        });
    }

    let text = sections
        .iter()
        .filter(|s| !s.text.is_empty())
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    Ok(DocumentText {
        char_count: text.chars().count(),
        text,
        sections,
        metadata: read_metadata(package),
    })
}

/// 一個區段的事件序列與其中文字節點的位置
struct SectionEvents {
    name: String,
    events: Vec<Event<'static>>,
    text_slots: Vec<usize>,
}

/// 文件中可置換的文字節點，依出現順序排列
///
/// 只收集根元素內的文字，元素之間僅含空白的排版縮排不列入。
pub struct TextNodes {
    sections: Vec<SectionEvents>,
    pub values: Vec<String>,
    originals: Vec<String>,
}

impl TextNodes {
    pub fn collect(package: &HwpxPackage) -> Result<Self> {
        let mut sections = Vec::new();
        let mut values = Vec::new();

        for name in package.section_names() {
            let Some(xml) = package.read_xml(&name)? else {
                continue;
            };
            let events = read_events(&xml)?;
            let mut text_slots = Vec::new();
            let mut depth = 0usize;
            for (idx, event) in events.iter().enumerate() {
                match event {
                    Event::Start(_) => depth += 1,
                    Event::End(_) => depth = depth.saturating_sub(1),
                    Event::Text(t) if depth > 0 => {
                        let text = t.unescape()?;
                        if !text.trim().is_empty() {
                            text_slots.push(idx);
                            values.push(text.into_owned());
                        }
                    }
                    _ => {}
                }
            }
            sections.push(SectionEvents {
                name,
                events,
                text_slots,
            });
        }

        Ok(Self {
            sections,
            originals: values.clone(),
            values,
        })
    }

    /// 將變更過的文字節點寫回封裝，回傳改寫的區段數
    pub fn write_back(self, package: &mut HwpxPackage) -> Result<usize> {
        let mut offset = 0;
        let mut rewritten = 0;

        for mut section in self.sections {
            let count = section.text_slots.len();
            let mut changed = false;

            for (slot, &event_idx) in section.text_slots.iter().enumerate() {
                let node = offset + slot;
                if self.values[node] != self.originals[node] {
                    section.events[event_idx] =
                        Event::Text(BytesText::new(&self.values[node]).into_owned());
                    changed = true;
                }
            }
            offset += count;

            if changed {
                let xml = write_events(&section.events)?;
                package.set(&section.name, xml.into_bytes());
                rewritten += 1;
                tracing::debug!("Rewrote section {}", section.name);
            }
        }
        Ok(rewritten)
    }
}
