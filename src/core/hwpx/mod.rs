//! HWPX 文件格式處理：ZIP 封裝、本文文字、表格與二進位資料

pub mod bindata;
pub mod package;
pub mod tables;
pub mod text;
pub mod xml;

pub use package::HwpxPackage;
