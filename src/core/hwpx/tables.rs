//! 表格定位與儲存格圖片插入
//!
//! 表格依出現順序跨區段編號，列與儲存格只歸屬於直接包含它們的 (最內層) 表格，
//! 巢狀表格的列不會被算進外層表格。

use crate::core::hwpx::package::HwpxPackage;
use crate::core::hwpx::xml::{end_element, local_name, read_events, start_element, write_events};
use crate::domain::model::{Alignment, CellPosition, TableLayout};
use crate::utils::error::{AutomationError, Result};
use quick_xml::events::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tag {
    Table,
    Row,
    Cell,
    Other,
}

fn classify(name: &[u8]) -> Tag {
    match local_name(name) {
        b"TABLE" | b"tbl" => Tag::Table,
        b"TR" | b"tr" => Tag::Row,
        b"TC" | b"tc" => Tag::Cell,
        _ => Tag::Other,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellSpot {
    /// `<TC/>` 的事件位置
    Empty(usize),
    /// 儲存格結束標籤的事件位置
    Closing(usize),
}

struct TableWalker<'a> {
    section: &'a str,
    next_index: usize,
    layouts: Vec<TableLayout>,
    open_tables: Vec<usize>,
    target: Option<CellPosition>,
    depth: usize,
    target_depth: Option<usize>,
    spot: Option<CellSpot>,
}

impl<'a> TableWalker<'a> {
    fn new(section: &'a str, first_index: usize, target: Option<CellPosition>) -> Self {
        Self {
            section,
            next_index: first_index,
            layouts: Vec::new(),
            open_tables: Vec::new(),
            target,
            depth: 0,
            target_depth: None,
            spot: None,
        }
    }

    fn walk(mut self, events: &[Event<'_>]) -> (Vec<TableLayout>, Option<CellSpot>) {
        for (idx, event) in events.iter().enumerate() {
            match event {
                Event::Start(e) => {
                    self.open(e.name().as_ref(), idx, false);
                    self.depth += 1;
                }
                Event::Empty(e) => self.open(e.name().as_ref(), idx, true),
                Event::End(e) => {
                    self.depth = self.depth.saturating_sub(1);
                    if self.target_depth == Some(self.depth) {
                        self.spot = Some(CellSpot::Closing(idx));
                        self.target_depth = None;
                    }
                    if classify(e.name().as_ref()) == Tag::Table {
                        self.open_tables.pop();
                    }
                }
                _ => {}
            }
        }
        (self.layouts, self.spot)
    }

    fn open(&mut self, name: &[u8], idx: usize, empty: bool) {
        match classify(name) {
            Tag::Table => {
                self.layouts.push(TableLayout {
                    index: self.next_index,
                    section: self.section.to_string(),
                    rows: Vec::new(),
                });
                self.next_index += 1;
                if !empty {
                    self.open_tables.push(self.layouts.len() - 1);
                }
            }
            Tag::Row => {
                if let Some(&table) = self.open_tables.last() {
                    self.layouts[table].rows.push(0);
                }
            }
            Tag::Cell => {
                let Some(&table) = self.open_tables.last() else {
                    return;
                };
                let layout = &mut self.layouts[table];
                let row = layout.rows.len().saturating_sub(1);
                let Some(count) = layout.rows.last_mut() else {
                    return;
                };
                let here = CellPosition {
                    table: layout.index,
                    row,
                    column: *count,
                };
                *count += 1;

                if self.spot.is_none() && self.target == Some(here) {
                    if empty {
                        self.spot = Some(CellSpot::Empty(idx));
                    } else {
                        self.target_depth = Some(self.depth);
                    }
                }
            }
            Tag::Other => {}
        }
    }
}

/// 列出文件中所有表格的結構
pub fn analyze_tables(package: &HwpxPackage) -> Result<Vec<TableLayout>> {
    let mut layouts = Vec::new();
    for section in package.section_names() {
        let Some(xml) = package.read_xml(&section)? else {
            continue;
        };
        let events = read_events(&xml)?;
        let (found, _) = TableWalker::new(&section, layouts.len(), None).walk(&events);
        layouts.extend(found);
    }
    Ok(layouts)
}

/// 要插入儲存格的圖片元素
#[derive(Debug, Clone)]
pub struct PictureElement {
    pub id: String,
    pub width_mm: f64,
    pub height_mm: f64,
    pub alignment: Alignment,
}

impl PictureElement {
    pub fn href(&self) -> String {
        format!("BinData/{}.jpg", self.id)
    }

    fn events(&self) -> Vec<Event<'static>> {
        // 尺寸單位為 1/100 mm
        let picture = start_element(
            "PICTURE",
            &[
                ("id", self.id.clone()),
                ("href", self.href()),
                ("width", ((self.width_mm * 100.0) as i64).to_string()),
                ("height", ((self.height_mm * 100.0) as i64).to_string()),
                ("textAlign", self.alignment.as_str().to_string()),
            ],
        );
        let reverse = start_element("REVERSE", &[("id", self.id.clone())]);
        vec![
            Event::Start(picture),
            Event::Empty(reverse),
            Event::End(end_element("PICTURE")),
        ]
    }
}

/// 檢查座標是否存在，回傳目標表格
pub fn locate_cell(layouts: &[TableLayout], position: CellPosition) -> Result<&TableLayout> {
    let layout = layouts
        .get(position.table)
        .ok_or(AutomationError::TableNotFound {
            index: position.table,
            total: layouts.len(),
        })?;
    let cells = *layout
        .rows
        .get(position.row)
        .ok_or(AutomationError::RowOutOfRange {
            row: position.row,
            total: layout.rows.len(),
        })?;
    if position.column >= cells {
        return Err(AutomationError::ColumnOutOfRange {
            column: position.column,
            total: cells,
        });
    }
    Ok(layout)
}

/// 在指定儲存格的內容最後加入圖片元素，回傳被改寫的區段名稱
pub fn insert_picture(
    package: &mut HwpxPackage,
    position: CellPosition,
    picture: &PictureElement,
) -> Result<String> {
    let layouts = analyze_tables(package)?;
    let section = locate_cell(&layouts, position)?.section.clone();
    let first_index = layouts
        .iter()
        .position(|l| l.section == section)
        .unwrap_or(0);

    let xml = package
        .read_xml(&section)?
        .ok_or_else(|| AutomationError::processing(format!("section {} disappeared", section)))?;
    let mut events = read_events(&xml)?;
    let (_, spot) = TableWalker::new(&section, first_index, Some(position)).walk(&events);

    match spot {
        Some(CellSpot::Closing(idx)) => {
            events.splice(idx..idx, picture.events());
        }
        Some(CellSpot::Empty(idx)) => {
            let Event::Empty(cell) = events[idx].clone() else {
                return Err(AutomationError::processing("cell event changed while rewriting"));
            };
            let name = String::from_utf8_lossy(cell.name().as_ref()).into_owned();
            let mut replacement = vec![Event::Start(cell)];
            replacement.extend(picture.events());
            replacement.push(Event::End(end_element(&name)));
            events.splice(idx..=idx, replacement);
        }
        None => {
            return Err(AutomationError::processing(format!(
                "could not locate {} in {}",
                position, section
            )))
        }
    }

    package.set(&section, write_events(&events)?.into_bytes());
    tracing::info!("📍 Inserted picture {} at {}", picture.id, position);
    Ok(section)
}
