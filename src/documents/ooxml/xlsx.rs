//! Minimal SpreadsheetML writer: inline strings, numbers, formulas and a
//! bold header style.

use super::{core_properties_xml, write_package};
use crate::documents::common::escape_xml;
use crate::documents::DocumentError;

const MAX_SHEET_NAME: usize = 31;

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    /// Formula without the leading `=`.
    Formula(String),
    /// Bold text on a grey fill.
    Header(String),
}

impl CellValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn header(value: impl Into<String>) -> Self {
        Self::Header(value.into())
    }

    pub fn formula(value: impl Into<String>) -> Self {
        Self::Formula(value.into())
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<u32> for CellValue {
    fn from(value: u32) -> Self {
        Self::Number(value as f64)
    }
}

/// Excel column letters for a 0-based index (`0 -> A`, `26 -> AA`).
pub fn column_letter(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// A1 reference for a 0-based column and 1-based row.
pub fn cell_ref(column: usize, row: usize) -> String {
    format!("{}{}", column_letter(column), row)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sheet {
    name: String,
    rows: Vec<Vec<CellValue>>,
    widths: Vec<f64>,
}

impl Sheet {
    /// Sheet names are cut to 31 characters and stripped of `[]:*?/\`.
    pub fn new(name: &str) -> Self {
        let cleaned: String = name
            .chars()
            .filter(|c| !matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\'))
            .take(MAX_SHEET_NAME)
            .collect();
        Self {
            name: if cleaned.trim().is_empty() {
                "Foglio".to_string()
            } else {
                cleaned
            },
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn push_row(&mut self, row: Vec<CellValue>) {
        self.rows.push(row);
    }

    /// 1-based row number the next pushed row will get.
    pub fn next_row(&self) -> usize {
        self.rows.len() + 1
    }

    /// Column widths in character units.
    pub fn column_widths(&mut self, widths: impl IntoIterator<Item = f64>) {
        self.widths = widths.into_iter().collect();
    }

    fn to_xml(&self) -> String {
        let mut xml = String::from(concat!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>",
            "<worksheet xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\" ",
            "xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\">"
        ));
        if !self.widths.is_empty() {
            xml.push_str("<cols>");
            for (idx, width) in self.widths.iter().enumerate() {
                xml.push_str(&format!(
                    "<col min=\"{0}\" max=\"{0}\" width=\"{1}\" customWidth=\"1\"/>",
                    idx + 1,
                    width
                ));
            }
            xml.push_str("</cols>");
        }
        xml.push_str("<sheetData>");
        for (r_idx, row) in self.rows.iter().enumerate() {
            let row_number = r_idx + 1;
            xml.push_str(&format!("<row r=\"{}\">", row_number));
            for (c_idx, cell) in row.iter().enumerate() {
                let reference = cell_ref(c_idx, row_number);
                match cell {
                    CellValue::Empty => {}
                    CellValue::Text(text) => xml.push_str(&format!(
                        "<c r=\"{}\" t=\"inlineStr\"><is><t xml:space=\"preserve\">{}</t></is></c>",
                        reference,
                        escape_xml(text)
                    )),
                    CellValue::Header(text) => xml.push_str(&format!(
                        "<c r=\"{}\" s=\"1\" t=\"inlineStr\"><is><t xml:space=\"preserve\">{}</t></is></c>",
                        reference,
                        escape_xml(text)
                    )),
                    CellValue::Number(value) => {
                        xml.push_str(&format!("<c r=\"{}\"><v>{}</v></c>", reference, value))
                    }
                    CellValue::Formula(formula) => xml.push_str(&format!(
                        "<c r=\"{}\"><f>{}</f></c>",
                        reference,
                        escape_xml(formula)
                    )),
                }
            }
            xml.push_str("</row>");
        }
        xml.push_str("</sheetData></worksheet>");
        xml
    }
}

/// Builder for a complete `.xlsx` package.
#[derive(Debug, Default)]
pub struct WorkbookBuilder {
    title: String,
    sheets: Vec<Sheet>,
}

impl WorkbookBuilder {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            sheets: Vec::new(),
        }
    }

    pub fn add_sheet(&mut self, sheet: Sheet) -> &mut Self {
        self.sheets.push(sheet);
        self
    }

    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }

    fn workbook_xml(&self) -> String {
        let mut xml = String::from(concat!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>",
            "<workbook xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\" ",
            "xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\"><sheets>"
        ));
        for (idx, sheet) in self.sheets.iter().enumerate() {
            xml.push_str(&format!(
                "<sheet name=\"{}\" sheetId=\"{}\" r:id=\"rId{}\"/>",
                escape_xml(&sheet.name),
                idx + 1,
                idx + 1
            ));
        }
        xml.push_str("</sheets><calcPr calcId=\"191029\" fullCalcOnLoad=\"1\"/></workbook>");
        xml
    }

    fn workbook_rels_xml(&self) -> String {
        let mut xml = String::from(concat!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>",
            "<Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">"
        ));
        for idx in 0..self.sheets.len() {
            xml.push_str(&format!(
                "<Relationship Id=\"rId{0}\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet\" Target=\"worksheets/sheet{0}.xml\"/>",
                idx + 1
            ));
        }
        xml.push_str("<Relationship Id=\"rIdStyles\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles\" Target=\"styles.xml\"/>");
        xml.push_str("</Relationships>");
        xml
    }

    fn content_types_xml(&self) -> String {
        let mut xml = String::from(concat!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>",
            "<Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">",
            "<Default Extension=\"rels\" ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>",
            "<Default Extension=\"xml\" ContentType=\"application/xml\"/>",
            "<Override PartName=\"/xl/workbook.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml\"/>",
            "<Override PartName=\"/xl/styles.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml\"/>",
            "<Override PartName=\"/docProps/core.xml\" ContentType=\"application/vnd.openxmlformats-package.core-properties+xml\"/>"
        ));
        for idx in 0..self.sheets.len() {
            xml.push_str(&format!(
                "<Override PartName=\"/xl/worksheets/sheet{}.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml\"/>",
                idx + 1
            ));
        }
        xml.push_str("</Types>");
        xml
    }

    /// Serialize the workbook into `.xlsx` bytes. A workbook needs at least
    /// one sheet; an empty one is added when none was pushed.
    pub fn build(&self) -> Result<Vec<u8>, DocumentError> {
        if self.sheets.is_empty() {
            let mut with_default = WorkbookBuilder::new(self.title.clone());
            with_default.add_sheet(Sheet::new("Foglio1"));
            return with_default.build();
        }

        let mut parts: Vec<(String, Vec<u8>)> = vec![
            ("[Content_Types].xml".to_string(), self.content_types_xml().into_bytes()),
            ("_rels/.rels".to_string(), ROOT_RELS.as_bytes().to_vec()),
            ("docProps/core.xml".to_string(), core_properties_xml(&self.title).into_bytes()),
            ("xl/workbook.xml".to_string(), self.workbook_xml().into_bytes()),
            ("xl/_rels/workbook.xml.rels".to_string(), self.workbook_rels_xml().into_bytes()),
            ("xl/styles.xml".to_string(), STYLES.as_bytes().to_vec()),
        ];
        for (idx, sheet) in self.sheets.iter().enumerate() {
            parts.push((format!("xl/worksheets/sheet{}.xml", idx + 1), sheet.to_xml().into_bytes()));
        }
        write_package(&parts)
    }
}

const ROOT_RELS: &str = concat!(
    "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>",
    "<Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">",
    "<Relationship Id=\"rId1\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument\" Target=\"xl/workbook.xml\"/>",
    "<Relationship Id=\"rId2\" Type=\"http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties\" Target=\"docProps/core.xml\"/>",
    "</Relationships>"
);

const STYLES: &str = concat!(
    "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>",
    "<styleSheet xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\">",
    "<fonts count=\"2\">",
    "<font><sz val=\"11\"/><name val=\"Calibri\"/></font>",
    "<font><b/><sz val=\"11\"/><name val=\"Calibri\"/></font>",
    "</fonts>",
    "<fills count=\"3\">",
    "<fill><patternFill patternType=\"none\"/></fill>",
    "<fill><patternFill patternType=\"gray125\"/></fill>",
    "<fill><patternFill patternType=\"solid\"><fgColor rgb=\"FFD9D9D9\"/><bgColor indexed=\"64\"/></patternFill></fill>",
    "</fills>",
    "<borders count=\"1\"><border><left/><right/><top/><bottom/><diagonal/></border></borders>",
    "<cellStyleXfs count=\"1\"><xf numFmtId=\"0\" fontId=\"0\" fillId=\"0\" borderId=\"0\"/></cellStyleXfs>",
    "<cellXfs count=\"2\">",
    "<xf numFmtId=\"0\" fontId=\"0\" fillId=\"0\" borderId=\"0\" xfId=\"0\"/>",
    "<xf numFmtId=\"0\" fontId=\"1\" fillId=\"2\" borderId=\"0\" xfId=\"0\" applyFont=\"1\" applyFill=\"1\"/>",
    "</cellXfs>",
    "<cellStyles count=\"1\"><cellStyle name=\"Normal\" xfId=\"0\" builtinId=\"0\"/></cellStyles>",
    "</styleSheet>"
);

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read};

    #[test]
    fn test_column_letters() {
        assert_eq!(column_letter(0), "A");
        assert_eq!(column_letter(25), "Z");
        assert_eq!(column_letter(26), "AA");
        assert_eq!(column_letter(27), "AB");
        assert_eq!(cell_ref(2, 5), "C5");
    }

    #[test]
    fn test_sheet_name_is_cleaned() {
        let sheet = Sheet::new("Registro [presenze]: modulo/1 con un nome troppo lungo");
        assert!(sheet.name().chars().count() <= 31);
        assert!(!sheet.name().contains(['[', ']', ':', '/']));
    }

    #[test]
    fn test_build_writes_cells() {
        let mut sheet = Sheet::new("Dati");
        sheet.push_row(vec![CellValue::header("Nome"), CellValue::header("Ore")]);
        sheet.push_row(vec!["Anna & Co".into(), CellValue::Number(4.0)]);
        sheet.push_row(vec![CellValue::Empty, CellValue::formula("SUM(B2:B2)")]);
        let mut workbook = WorkbookBuilder::new("Prova");
        workbook.add_sheet(sheet);
        let bytes = workbook.build().unwrap();

        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut xml = String::new();
        archive
            .by_name("xl/worksheets/sheet1.xml")
            .unwrap()
            .read_to_string(&mut xml)
            .unwrap();
        assert!(xml.contains("<c r=\"A1\" s=\"1\" t=\"inlineStr\">"));
        assert!(xml.contains("Anna &amp; Co"));
        assert!(xml.contains("<c r=\"B2\"><v>4</v></c>"));
        assert!(xml.contains("<c r=\"B3\"><f>SUM(B2:B2)</f></c>"));
    }
}
