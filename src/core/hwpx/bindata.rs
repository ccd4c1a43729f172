//! 二進位資料 (圖片) 的登錄
//!
//! 圖片寫入 `BinData/<id>.jpg`，並在 `DocInfo/BinData.xml` 的 `BINDATASTORAGE`
//! 之下加入對應的 `BINDATA` 項目。

use crate::core::hwpx::package::{HwpxPackage, BINDATA_DIR, BINDATA_XML_ENTRY};
use crate::core::hwpx::xml::{end_element, local_name, read_events, start_element, write_events};
use crate::utils::error::{AutomationError, Result};
use quick_xml::events::{BytesDecl, BytesText, Event};
use zip::CompressionMethod;

const STORAGE: &[u8] = b"BINDATASTORAGE";

fn empty_bindata_xml() -> Vec<Event<'static>> {
    vec![
        Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)),
        Event::Text(BytesText::new("\n")),
        Event::Empty(start_element("BINDATASTORAGE", &[])),
    ]
}

fn matching_end(events: &[Event<'_>], start: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (idx, event) in events.iter().enumerate().skip(start) {
        match event {
            Event::Start(_) => depth += 1,
            Event::End(_) => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }
    None
}

/// 把子元素加到 `container` 的內容最後；空元素會先展開
fn append_into(events: &mut Vec<Event<'static>>, container: usize, children: Vec<Event<'static>>) -> Result<()> {
    match events[container].clone() {
        Event::Empty(element) => {
            let name = String::from_utf8_lossy(element.name().as_ref()).into_owned();
            let mut replacement = vec![Event::Start(element)];
            replacement.extend(children);
            replacement.push(Event::End(end_element(&name)));
            events.splice(container..=container, replacement);
        }
        Event::Start(_) => {
            let end = matching_end(events, container)
                .ok_or_else(|| AutomationError::processing("BinData.xml has an unclosed element"))?;
            events.splice(end..end, children);
        }
        _ => return Err(AutomationError::processing("BinData.xml container is not an element")),
    }
    Ok(())
}

fn root_index(events: &[Event<'_>]) -> Option<usize> {
    events
        .iter()
        .position(|e| matches!(e, Event::Start(_) | Event::Empty(_)))
}

/// 根元素之下的第一個 `BINDATASTORAGE`
fn storage_child(events: &[Event<'_>], root: usize) -> Option<usize> {
    let mut depth = 1usize;
    for (idx, event) in events.iter().enumerate().skip(root + 1) {
        match event {
            Event::Start(e) | Event::Empty(e) if depth == 1 && local_name(e.name().as_ref()) == STORAGE => {
                return Some(idx)
            }
            Event::Start(_) => depth += 1,
            Event::End(_) => {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            _ => {}
        }
    }
    None
}

/// 登錄 JPEG 圖片，回傳其在封裝中的路徑
pub fn register_image(package: &mut HwpxPackage, id: &str, jpeg: Vec<u8>) -> Result<String> {
    let href = format!("{}/{}.jpg", BINDATA_DIR, id);
    let size = jpeg.len();
    package.set_with_compression(&href, jpeg, CompressionMethod::Stored);
    tracing::info!("📁 Added image part {}", href);

    let mut events = match package.read_xml(BINDATA_XML_ENTRY)? {
        Some(xml) => read_events(&xml)?,
        None => {
            tracing::debug!("{} missing, creating it", BINDATA_XML_ENTRY);
            empty_bindata_xml()
        }
    };

    let bindata = Event::Empty(start_element(
        "BINDATA",
        &[
            ("id", id.to_string()),
            ("href", href.clone()),
            ("type", "jpg".to_string()),
            ("size", size.to_string()),
        ],
    ));

    let root = root_index(&events)
        .ok_or_else(|| AutomationError::processing("BinData.xml has no root element"))?;
    let root_is_storage = match &events[root] {
        Event::Start(e) | Event::Empty(e) => local_name(e.name().as_ref()) == STORAGE,
        _ => false,
    };

    if root_is_storage {
        append_into(&mut events, root, vec![bindata])?;
    } else if let Some(storage) = storage_child(&events, root) {
        append_into(&mut events, storage, vec![bindata])?;
    } else {
        let storage = vec![
            Event::Start(start_element("BINDATASTORAGE", &[])),
            bindata,
            Event::End(end_element("BINDATASTORAGE")),
        ];
        append_into(&mut events, root, storage)?;
    }

    package.set(BINDATA_XML_ENTRY, write_events(&events)?.into_bytes());
    tracing::debug!("Updated {}", BINDATA_XML_ENTRY);
    Ok(href)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::hwpx::package::test_support::build_package;

    fn package_with(parts: &[(&str, &str)]) -> HwpxPackage {
        HwpxPackage::from_bytes(&build_package(parts)).unwrap()
    }

    #[test]
    fn test_creates_bindata_xml_when_missing() {
        let mut pkg = package_with(&[]);
        let href = register_image(&mut pkg, "image_1", vec![0xFF, 0xD8, 0xFF]).unwrap();
        assert_eq!(href, "BinData/image_1.jpg");
        assert_eq!(pkg.get("BinData/image_1.jpg"), Some(&[0xFF, 0xD8, 0xFF][..]));

        let xml = pkg.read_xml(BINDATA_XML_ENTRY).unwrap().unwrap();
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains(
            r#"<BINDATASTORAGE><BINDATA id="image_1" href="BinData/image_1.jpg" type="jpg" size="3"/></BINDATASTORAGE>"#
        ));
    }

    #[test]
    fn test_appends_to_existing_storage_child() {
        let mut pkg = package_with(&[(
            BINDATA_XML_ENTRY,
            r#"<BINDATALIST><BINDATASTORAGE><BINDATA id="old"/></BINDATASTORAGE><OTHER/></BINDATALIST>"#,
        )]);
        register_image(&mut pkg, "image_2", vec![1]).unwrap();
        let xml = pkg.read_xml(BINDATA_XML_ENTRY).unwrap().unwrap();
        assert!(xml.contains(r#"<BINDATA id="old"/><BINDATA id="image_2""#));
        assert!(xml.ends_with("</BINDATASTORAGE><OTHER/></BINDATALIST>"));
    }

    #[test]
    fn test_creates_storage_under_foreign_root() {
        let mut pkg = package_with(&[(BINDATA_XML_ENTRY, "<ROOT><X/></ROOT>")]);
        register_image(&mut pkg, "image_3", vec![1, 2]).unwrap();
        let xml = pkg.read_xml(BINDATA_XML_ENTRY).unwrap().unwrap();
        assert_eq!(
            xml,
            r#"<ROOT><X/><BINDATASTORAGE><BINDATA id="image_3" href="BinData/image_3.jpg" type="jpg" size="2"/></BINDATASTORAGE></ROOT>"#
        );
    }

    #[test]
    fn test_image_part_is_stored_uncompressed() {
        let mut pkg = package_with(&[]);
        register_image(&mut pkg, "image_4", vec![9; 64]).unwrap();
        let entry = pkg
            .entries()
            .iter()
            .find(|e| e.name == "BinData/image_4.jpg")
            .unwrap();
        assert_eq!(entry.compression, CompressionMethod::Stored);
    }
}
