#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// 以 (名稱, XML) 建立 HWPX 封裝
pub fn build_hwpx(parts: &[(&str, &str)]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    zip.start_file(
        "mimetype",
        SimpleFileOptions::default().compression_method(CompressionMethod::Stored),
    )
    .unwrap();
    zip.write_all(b"application/hwp+zip").unwrap();
    for (name, content) in parts {
        zip.start_file(*name, SimpleFileOptions::default()).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

pub fn write_hwpx(path: &Path, parts: &[(&str, &str)]) {
    std::fs::write(path, build_hwpx(parts)).unwrap();
}

pub fn write_png(path: &Path, width: u32, height: u32) {
    image::RgbImage::from_pixel(width, height, image::Rgb([10, 120, 200]))
        .save(path)
        .unwrap();
}

pub const HWPML_SECTION: &str = "<SECTION><P><TEXT>HWPX 문서의 구용어를 바꿉니다.</TEXT></P>\n<P><TEXT>구용어 목록과 AI 소개</TEXT></P>\n<TABLE><TR><TC><P/></TC><TC/></TR><TR><TC/><TC/></TR></TABLE></SECTION>";

pub const OWPML_SECTION: &str = r#"<hs:sec xmlns:hs="http://www.hancom.co.kr/hwpml/2011/section" xmlns:hp="http://www.hancom.co.kr/hwpml/2011/paragraph"><hp:p><hp:run><hp:t>첫 번째 표</hp:t></hp:run></hp:p>
<hp:tbl><hp:tr><hp:tc><hp:subList><hp:p/></hp:subList></hp:tc></hp:tr></hp:tbl>
<hp:tbl><hp:tr><hp:tc/><hp:tc><hp:subList><hp:p><hp:run><hp:t>사진</hp:t></hp:run></hp:p></hp:subList></hp:tc></hp:tr></hp:tbl></hs:sec>"#;
