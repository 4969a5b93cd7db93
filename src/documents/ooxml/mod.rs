//! Office Open XML plumbing shared by the Word and Excel writers and the
//! template renderer: package serialization, image parts, drawing markup.

pub mod docx;
pub mod xlsx;

use std::io::{Cursor, Write};

use base64::Engine;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::DocumentError;

pub use docx::{Align, Block, Cell, DocxBuilder, PageSetup, Paragraph, Row, Run, RunStyle, Table};
pub use xlsx::{CellValue, Sheet, WorkbookBuilder};

pub const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

pub(crate) const REL_IMAGE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";

/// English Metric Units per centimetre.
pub const EMU_PER_CM: u64 = 360_000;

/// Raster formats that can be embedded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
}

impl ImageFormat {
    /// Detect the format from magic bytes.
    pub fn detect(data: &[u8]) -> Option<Self> {
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
            return Some(Self::Png);
        }
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(Self::Jpeg);
        }
        if data.starts_with(b"GIF8") {
            return Some(Self::Gif);
        }
        None
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
            Self::Gif => "gif",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Gif => "image/gif",
        }
    }
}

/// A decoded image ready to be embedded.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageData {
    pub bytes: Vec<u8>,
    pub format: ImageFormat,
}

impl ImageData {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, DocumentError> {
        let format = ImageFormat::detect(&bytes)
            .ok_or_else(|| DocumentError::Image("unsupported image format".to_string()))?;
        Ok(Self { bytes, format })
    }

    /// Decode a `data:image/...;base64,` URL.
    pub fn from_data_url(url: &str) -> Result<Self, DocumentError> {
        let (_, payload) = url
            .trim()
            .split_once("base64,")
            .ok_or_else(|| DocumentError::Image("not a base64 data URL".to_string()))?;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(payload.trim())
            .map_err(|e| DocumentError::Image(e.to_string()))?;
        Self::from_bytes(bytes)
    }
}

/// Inline picture run referencing an image relationship. The run declares
/// every prefix it uses besides `w`, so it stays well-formed inside user
/// templates whose root omits them.
pub(crate) fn drawing_run_xml(rel_id: &str, pic_id: u32, cx: u64, cy: u64) -> String {
    format!(
        concat!(
            "<w:r><w:drawing ",
            "xmlns:wp=\"http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing\" ",
            "xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\">",
            "<wp:inline distT=\"0\" distB=\"0\" distL=\"0\" distR=\"0\">",
            "<wp:extent cx=\"{cx}\" cy=\"{cy}\"/>",
            "<wp:docPr id=\"{id}\" name=\"Immagine {id}\"/>",
            "<a:graphic xmlns:a=\"http://schemas.openxmlformats.org/drawingml/2006/main\">",
            "<a:graphicData uri=\"http://schemas.openxmlformats.org/drawingml/2006/picture\">",
            "<pic:pic xmlns:pic=\"http://schemas.openxmlformats.org/drawingml/2006/picture\">",
            "<pic:nvPicPr><pic:cNvPr id=\"{id}\" name=\"immagine{id}\"/><pic:cNvPicPr/></pic:nvPicPr>",
            "<pic:blipFill><a:blip r:embed=\"{rel}\"/><a:stretch><a:fillRect/></a:stretch></pic:blipFill>",
            "<pic:spPr><a:xfrm><a:off x=\"0\" y=\"0\"/><a:ext cx=\"{cx}\" cy=\"{cy}\"/></a:xfrm>",
            "<a:prstGeom prst=\"rect\"><a:avLst/></a:prstGeom></pic:spPr>",
            "</pic:pic></a:graphicData></a:graphic></wp:inline></w:drawing></w:r>"
        ),
        cx = cx,
        cy = cy,
        id = pic_id,
        rel = rel_id,
    )
}

/// Serialize named parts into a deflated OOXML package.
pub fn write_package(parts: &[(String, Vec<u8>)]) -> Result<Vec<u8>, DocumentError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (name, data) in parts {
        writer
            .start_file(name.as_str(), options)
            .map_err(DocumentError::Write)?;
        writer.write_all(data)?;
    }

    let cursor = writer.finish().map_err(DocumentError::Write)?;
    Ok(cursor.into_inner())
}

pub(crate) fn core_properties_xml(title: &str) -> String {
    let now = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
    format!(
        concat!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>",
            "<cp:coreProperties xmlns:cp=\"http://schemas.openxmlformats.org/package/2006/metadata/core-properties\" ",
            "xmlns:dc=\"http://purl.org/dc/elements/1.1/\" xmlns:dcterms=\"http://purl.org/dc/terms/\" ",
            "xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\">",
            "<dc:title>{title}</dc:title><dc:creator>{creator}</dc:creator>",
            "<dcterms:created xsi:type=\"dcterms:W3CDTF\">{now}</dcterms:created>",
            "</cp:coreProperties>"
        ),
        title = super::common::escape_xml(title),
        creator = env!("CARGO_PKG_NAME"),
        now = now,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn test_detect_image_format() {
        assert_eq!(ImageFormat::detect(&[0x89, 0x50, 0x4E, 0x47, 0x0D]), Some(ImageFormat::Png));
        assert_eq!(ImageFormat::detect(&[0xFF, 0xD8, 0xFF, 0xE0]), Some(ImageFormat::Jpeg));
        assert_eq!(ImageFormat::detect(b"%PDF-1.7"), None);
        assert!(ImageData::from_bytes(b"nope".to_vec()).is_err());
    }

    #[test]
    fn test_write_package_round_trips_parts() {
        let parts = vec![
            ("a.xml".to_string(), b"<a/>".to_vec()),
            ("dir/b.xml".to_string(), b"<b/>".to_vec()),
        ];
        let bytes = write_package(&parts).unwrap();

        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 2);
        let mut content = String::new();
        archive.by_name("dir/b.xml").unwrap().read_to_string(&mut content).unwrap();
        assert_eq!(content, "<b/>");
    }
}
