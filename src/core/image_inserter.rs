//! 將圖片插入 HWPX 表格儲存格

use crate::core::hwpx::bindata::register_image;
use crate::core::hwpx::tables::{analyze_tables, insert_picture, locate_cell, PictureElement};
use crate::core::hwpx::HwpxPackage;
use crate::domain::model::{CellPosition, ImageOptions, InsertResult, TableLayout};
use crate::utils::error::{AutomationError, Result};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use std::path::Path;

const MM_PER_PIXEL: f64 = 0.264583;
const PIXELS_PER_MM: f64 = 3.77953;
const JPEG_QUALITY: u8 = 85;

/// 轉成 JPEG 的圖片
#[derive(Debug, Clone)]
pub struct PreparedImage {
    pub id: String,
    pub jpeg: Vec<u8>,
    pub pixel_width: u32,
    pub pixel_height: u32,
}

/// 依選項計算縮放後的像素尺寸 (至少 1)
pub fn target_pixels(width: u32, height: u32, options: &ImageOptions) -> (u32, u32) {
    let (w, h) = if options.maintain_ratio {
        let ratio = f64::min(
            options.width_mm / (width as f64 * MM_PER_PIXEL),
            options.height_mm / (height as f64 * MM_PER_PIXEL),
        );
        (width as f64 * ratio, height as f64 * ratio)
    } else {
        (options.width_mm * PIXELS_PER_MM, options.height_mm * PIXELS_PER_MM)
    };
    ((w.floor() as u32).max(1), (h.floor() as u32).max(1))
}

pub fn new_image_id() -> String {
    let hex = uuid::Uuid::new_v4().simple().to_string();
    format!("image_{}", &hex[..8])
}

pub fn prepare_image(path: &Path, options: &ImageOptions) -> Result<PreparedImage> {
    if !path.exists() {
        return Err(AutomationError::FileNotFound {
            path: path.display().to_string(),
        });
    }

    let rgb = image::open(path)?.to_rgb8();
    let (pixel_width, pixel_height) = target_pixels(rgb.width(), rgb.height(), options);
    let resized = image::imageops::resize(&rgb, pixel_width, pixel_height, FilterType::Lanczos3);

    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, JPEG_QUALITY).encode_image(&resized)?;

    tracing::debug!(
        "Prepared {} ({}x{} → {}x{}, {} bytes)",
        path.display(),
        rgb.width(),
        rgb.height(),
        pixel_width,
        pixel_height,
        jpeg.len()
    );

    Ok(PreparedImage {
        id: new_image_id(),
        jpeg,
        pixel_width,
        pixel_height,
    })
}

#[derive(Debug, Clone, Default)]
pub struct ImageInserter;

impl ImageInserter {
    pub fn new() -> Self {
        Self
    }

    /// 在記憶體中的封裝插入圖片；座標錯誤時封裝不會被修改
    pub fn insert_into_package(
        &self,
        package: &mut HwpxPackage,
        image_path: &Path,
        position: CellPosition,
        options: &ImageOptions,
    ) -> Result<PreparedImage> {
        let layouts = analyze_tables(package)?;
        locate_cell(&layouts, position)?;

        let prepared = prepare_image(image_path, options)?;
        register_image(package, &prepared.id, prepared.jpeg.clone())?;
        let picture = PictureElement {
            id: prepared.id.clone(),
            width_mm: options.width_mm,
            height_mm: options.height_mm,
            alignment: options.alignment,
        };
        insert_picture(package, position, &picture)?;
        Ok(prepared)
    }

    pub fn insert_image_to_table(
        &self,
        hwpx_file: &Path,
        image_file: &Path,
        output_file: &Path,
        position: CellPosition,
        options: &ImageOptions,
    ) -> Result<InsertResult> {
        tracing::info!("🖼️ Inserting {} into {} at {}", image_file.display(), hwpx_file.display(), position);

        let mut package = HwpxPackage::open(hwpx_file)?;
        let prepared = self.insert_into_package(&mut package, image_file, position, options)?;
        package.save(output_file)?;

        tracing::info!("✅ Image inserted: {}", output_file.display());
        Ok(InsertResult {
            input_file: hwpx_file.display().to_string(),
            output_file: output_file.display().to_string(),
            image_file: image_file.display().to_string(),
            image_id: prepared.id,
            position,
            image_size: format!("{}x{}mm", options.width_mm, options.height_mm),
            pixel_width: prepared.pixel_width,
            pixel_height: prepared.pixel_height,
        })
    }

    pub fn list_tables(&self, hwpx_file: &Path) -> Result<Vec<TableLayout>> {
        let package = HwpxPackage::open(hwpx_file)?;
        analyze_tables(&package)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::hwpx::package::test_support::build_package;
    use image::{Rgb, RgbImage};
    use tempfile::TempDir;

    fn write_png(dir: &Path, width: u32, height: u32) -> std::path::PathBuf {
        let path = dir.join("logo.png");
        RgbImage::from_pixel(width, height, Rgb([200, 30, 30]))
            .save(&path)
            .unwrap();
        path
    }

    #[test]
    fn test_target_pixels() {
        let options = ImageOptions::default();
        assert_eq!(target_pixels(200, 100, &options), (377, 188));

        let fixed = ImageOptions {
            maintain_ratio: false,
            width_mm: 10.0,
            height_mm: 0.1,
            ..Default::default()
        };
        assert_eq!(target_pixels(5000, 5000, &fixed), (37, 1));
    }

    #[test]
    fn test_image_id_format() {
        let id = new_image_id();
        assert_eq!(id.len(), "image_".len() + 8);
        assert!(id["image_".len()..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_prepare_image_encodes_jpeg() {
        let dir = TempDir::new().unwrap();
        let png = write_png(dir.path(), 200, 100);
        let prepared = prepare_image(&png, &ImageOptions::default()).unwrap();
        assert_eq!((prepared.pixel_width, prepared.pixel_height), (377, 188));
        assert_eq!(&prepared.jpeg[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn test_bad_coordinates_leave_package_untouched() {
        let dir = TempDir::new().unwrap();
        let png = write_png(dir.path(), 10, 10);
        let bytes = build_package(&[("BodyText/Section0.xml", "<S><TABLE><TR><TC/></TR></TABLE></S>")]);
        let mut package = HwpxPackage::from_bytes(&bytes).unwrap();
        let before = package.entries().len();

        let err = ImageInserter::new()
            .insert_into_package(
                &mut package,
                &png,
                CellPosition { table: 0, row: 0, column: 3 },
                &ImageOptions::default(),
            )
            .unwrap_err();
        assert!(matches!(err, AutomationError::ColumnOutOfRange { column: 3, total: 1 }));
        assert_eq!(package.entries().len(), before);
    }

    #[test]
    fn test_insert_image_to_table_writes_output() {
        let dir = TempDir::new().unwrap();
        let png = write_png(dir.path(), 40, 20);
        let input = dir.path().join("doc.hwpx");
        std::fs::write(
            &input,
            build_package(&[("BodyText/Section0.xml", "<S><TABLE><TR><TC><P/></TC></TR></TABLE></S>")]),
        )
        .unwrap();
        let output = dir.path().join("out/doc_image.hwpx");

        let result = ImageInserter::new()
            .insert_image_to_table(&input, &png, &output, CellPosition::default(), &ImageOptions::default())
            .unwrap();
        assert_eq!(result.image_size, "100x80mm");

        let package = HwpxPackage::open(&output).unwrap();
        assert!(package.contains(&format!("BinData/{}.jpg", result.image_id)));
        let xml = package.read_xml("BodyText/Section0.xml").unwrap().unwrap();
        assert!(xml.contains(&format!("<PICTURE id=\"{}\"", result.image_id)));
        assert!(package.contains("DocInfo/BinData.xml"));
    }
}
