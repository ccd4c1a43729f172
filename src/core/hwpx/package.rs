//! HWPX 封裝 (ZIP) 的讀寫
//!
//! 所有項目依原始順序保存在記憶體中，修改後再整包寫回。
//! `mimetype` 一律以不壓縮方式寫出，新增或改寫的 XML 以 Deflate 壓縮。

use crate::utils::error::{AutomationError, Result};
use regex::Regex;
use std::io::{Cursor, Read, Write};
use std::path::Path;
use std::sync::LazyLock;
use zip::write::{SimpleFileOptions, ZipWriter};
use zip::{CompressionMethod, ZipArchive};

pub const MIMETYPE_ENTRY: &str = "mimetype";
pub const DOC_INFO_ENTRY: &str = "DocInfo/document.xml";
pub const BINDATA_XML_ENTRY: &str = "DocInfo/BinData.xml";
pub const BINDATA_DIR: &str = "BinData";

static SECTION_ENTRY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:BodyText/Section|Contents/section)(\d+)\.xml$")
        .expect("section pattern is valid")
});

#[derive(Debug, Clone)]
pub struct PackageEntry {
    pub name: String,
    pub data: Vec<u8>,
    pub compression: CompressionMethod,
}

#[derive(Debug, Clone, Default)]
pub struct HwpxPackage {
    entries: Vec<PackageEntry>,
}

impl HwpxPackage {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(AutomationError::FileNotFound {
                path: path.display().to_string(),
            });
        }
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let mut entries = Vec::with_capacity(archive.len());

        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().to_string();
            let compression = file.compression();
            let mut data = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut data)?;
            entries.push(PackageEntry {
                name,
                data,
                compression,
            });
        }

        tracing::debug!("Opened HWPX package with {} entries", entries.len());
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[PackageEntry] {
        &self.entries
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.data.as_slice())
    }

    /// 讀取 XML 部件為 UTF-8 字串
    pub fn read_xml(&self, name: &str) -> Result<Option<String>> {
        match self.get(name) {
            Some(bytes) => {
                let text = String::from_utf8(bytes.to_vec()).map_err(|e| {
                    AutomationError::EncodingError {
                        message: format!("{} is not valid UTF-8: {}", name, e),
                    }
                })?;
                Ok(Some(text))
            }
            None => Ok(None),
        }
    }

    /// 新增或取代項目；新項目附加在最後
    pub fn set(&mut self, name: &str, data: Vec<u8>) {
        self.set_with_compression(name, data, CompressionMethod::Deflated);
    }

    pub fn set_with_compression(&mut self, name: &str, data: Vec<u8>, compression: CompressionMethod) {
        match self.entries.iter_mut().find(|e| e.name == name) {
            Some(entry) => entry.data = data,
            None => self.entries.push(PackageEntry {
                name: name.to_string(),
                data,
                compression,
            }),
        }
    }

    /// 本文區段，依區段編號排序
    ///
    /// 支援 `BodyText/Section0.xml` 與 `Contents/section0.xml` 兩種配置。
    pub fn section_names(&self) -> Vec<String> {
        let mut sections: Vec<(u32, String)> = self
            .entries
            .iter()
            .filter_map(|e| {
                let caps = SECTION_ENTRY.captures(&e.name)?;
                let number = caps[1].parse::<u32>().ok()?;
                Some((number, e.name.clone()))
            })
            .collect();
        sections.sort();
        sections.into_iter().map(|(_, name)| name).collect()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

        for entry in &self.entries {
            let method = if entry.name == MIMETYPE_ENTRY {
                CompressionMethod::Stored
            } else {
                match entry.compression {
                    CompressionMethod::Stored => CompressionMethod::Stored,
                    _ => CompressionMethod::Deflated,
                }
            };
            let options = SimpleFileOptions::default().compression_method(method);
            zip.start_file(entry.name.as_str(), options)?;
            zip.write_all(&entry.data)?;
        }

        let cursor = zip.finish()?;
        Ok(cursor.into_inner())
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let bytes = self.to_bytes()?;
        std::fs::write(path, bytes)?;
        tracing::debug!("Wrote HWPX package to {}", path.display());
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::build_package;
    use super::*;

    #[test]
    fn test_sections_sorted_numerically() {
        let bytes = build_package(&[
            ("BodyText/Section10.xml", "<s/>"),
            ("BodyText/Section2.xml", "<s/>"),
            ("BodyText/Section0.xml", "<s/>"),
            ("DocInfo/document.xml", "<d/>"),
        ]);
        let package = HwpxPackage::from_bytes(&bytes).unwrap();
        assert_eq!(
            package.section_names(),
            vec![
                "BodyText/Section0.xml",
                "BodyText/Section2.xml",
                "BodyText/Section10.xml"
            ]
        );
    }

    #[test]
    fn test_owpml_layout_is_recognised() {
        let bytes = build_package(&[("Contents/section0.xml", "<hs:sec/>")]);
        let package = HwpxPackage::from_bytes(&bytes).unwrap();
        assert_eq!(package.section_names(), vec!["Contents/section0.xml"]);
    }

    #[test]
    fn test_round_trip_keeps_order_and_mimetype_stored() {
        let bytes = build_package(&[("BodyText/Section0.xml", "<s>a</s>")]);
        let mut package = HwpxPackage::from_bytes(&bytes).unwrap();
        package.set("BodyText/Section0.xml", b"<s>b</s>".to_vec());
        package.set("BinData/image_1.jpg", vec![1, 2, 3]);

        let written = package.to_bytes().unwrap();
        let mut archive = ZipArchive::new(Cursor::new(written)).unwrap();
        assert_eq!(archive.by_index(0).unwrap().name(), MIMETYPE_ENTRY);
        assert_eq!(
            archive.by_index(0).unwrap().compression(),
            CompressionMethod::Stored
        );
        assert_eq!(archive.by_index(2).unwrap().name(), "BinData/image_1.jpg");

        let reopened = HwpxPackage::from_bytes(&package.to_bytes().unwrap()).unwrap();
        assert_eq!(reopened.get("BodyText/Section0.xml"), Some(&b"<s>b</s>"[..]));
    }

    #[test]
    fn test_not_a_zip_is_rejected() {
        assert!(matches!(
            HwpxPackage::from_bytes(b"plain text"),
            Err(AutomationError::ZipError(_))
        ));
    }
}
