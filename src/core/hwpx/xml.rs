use crate::utils::error::{AutomationError, Result};
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};

/// 去掉命名空間前綴後的元素名稱
pub fn local_name(qualified: &[u8]) -> &[u8] {
    match qualified.iter().rposition(|&b| b == b':') {
        Some(pos) => &qualified[pos + 1..],
        None => qualified,
    }
}

/// 讀取整份 XML 為事件序列，保留原始空白
pub fn read_events(xml: &str) -> Result<Vec<Event<'static>>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(false);

    let mut events = Vec::new();
    loop {
        match reader.read_event() {
            Ok(Event::Eof) => break,
            Ok(event) => events.push(event.into_owned()),
            Err(e) => {
                return Err(AutomationError::processing(format!(
                    "malformed XML at position {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
        }
    }
    Ok(events)
}

pub fn write_events(events: &[Event<'_>]) -> Result<String> {
    let mut writer = Writer::new(Vec::new());
    for event in events {
        writer.write_event(event.clone())?;
    }
    String::from_utf8(writer.into_inner()).map_err(|e| AutomationError::EncodingError {
        message: format!("serialized XML is not UTF-8: {}", e),
    })
}

pub fn attribute_value(element: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>> {
    for attr in element.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        if local_name(attr.key.as_ref()) == key {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

/// 建立帶屬性的元素開頭 (值會自動跳脫)
pub fn start_element(name: &str, attrs: &[(&str, String)]) -> BytesStart<'static> {
    let mut start = BytesStart::new(name.to_string());
    for (key, value) in attrs {
        start.push_attribute((*key, value.as_str()));
    }
    start
}

pub fn end_element(name: &str) -> BytesEnd<'static> {
    BytesEnd::new(name.to_string())
}
