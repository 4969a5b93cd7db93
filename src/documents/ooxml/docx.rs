//! Element-by-element construction of Word documents.
//!
//! Only the subset of WordprocessingML the fixed-layout registries need:
//! styled runs, shaded/boxed paragraphs, tables with spans and shading,
//! inline pictures, one default header and footer, and per-section page
//! orientation.

use super::{core_properties_xml, drawing_run_xml, write_package, ImageData, EMU_PER_CM, REL_IMAGE};
use crate::documents::common::escape_xml;
use crate::documents::DocumentError;

const NS_DECL: &str = concat!(
    "xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\" ",
    "xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\" ",
    "xmlns:wp=\"http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing\" ",
    "xmlns:a=\"http://schemas.openxmlformats.org/drawingml/2006/main\" ",
    "xmlns:pic=\"http://schemas.openxmlformats.org/drawingml/2006/picture\""
);

/// Usable text width of an A4 portrait page with 2 cm margins, in twips.
pub const PORTRAIT_TEXT_WIDTH: u32 = 9638;
/// Usable text width of an A4 landscape page with 2 cm margins, in twips.
pub const LANDSCAPE_TEXT_WIDTH: u32 = 14570;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

impl Align {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Center => "center",
            Self::Right => "right",
            Self::Justify => "both",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunStyle {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub superscript: bool,
    /// Font size in points.
    pub size: Option<u32>,
    /// Hex colour without `#`.
    pub color: Option<String>,
    /// Highlight name (`yellow`, `lightGray`...).
    pub highlight: Option<&'static str>,
}

impl RunStyle {
    fn to_xml(&self) -> String {
        let mut props = String::new();
        if self.bold {
            props.push_str("<w:b/>");
        }
        if self.italic {
            props.push_str("<w:i/>");
        }
        if self.underline {
            props.push_str("<w:u w:val=\"single\"/>");
        }
        if let Some(color) = &self.color {
            props.push_str(&format!("<w:color w:val=\"{}\"/>", escape_xml(color)));
        }
        if let Some(size) = self.size {
            props.push_str(&format!("<w:sz w:val=\"{0}\"/><w:szCs w:val=\"{0}\"/>", size * 2));
        }
        if let Some(highlight) = self.highlight {
            props.push_str(&format!("<w:highlight w:val=\"{}\"/>", highlight));
        }
        if self.superscript {
            props.push_str("<w:vertAlign w:val=\"superscript\"/>");
        }
        if props.is_empty() {
            props
        } else {
            format!("<w:rPr>{}</w:rPr>", props)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum RunKind {
    Text(String),
    LineBreak,
    PageNumber,
    /// Index into the builder's media list plus display size in EMU.
    Image { media: usize, cx: u64, cy: u64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    kind: RunKind,
    style: RunStyle,
}

impl Run {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: RunKind::Text(text.into()),
            style: RunStyle::default(),
        }
    }

    pub fn bold(text: impl Into<String>) -> Self {
        Self::text(text).styled(RunStyle {
            bold: true,
            ..Default::default()
        })
    }

    pub fn line_break() -> Self {
        Self {
            kind: RunKind::LineBreak,
            style: RunStyle::default(),
        }
    }

    pub fn page_number() -> Self {
        Self {
            kind: RunKind::PageNumber,
            style: RunStyle::default(),
        }
    }

    pub fn styled(mut self, style: RunStyle) -> Self {
        self.style = style;
        self
    }

    pub fn size(mut self, points: u32) -> Self {
        self.style.size = Some(points);
        self
    }

    pub fn highlight(mut self, name: &'static str) -> Self {
        self.style.highlight = Some(name);
        self
    }

    pub fn superscript(mut self) -> Self {
        self.style.superscript = true;
        self
    }

    pub fn italic(mut self) -> Self {
        self.style.italic = true;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Paragraph {
    runs: Vec<Run>,
    align: Align,
    spacing_after: Option<u32>,
    indent_left: Option<u32>,
    shading: Option<String>,
    boxed: bool,
    keep_next: bool,
}

impl Paragraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new().run(Run::text(text))
    }

    pub fn bold(text: impl Into<String>) -> Self {
        Self::new().run(Run::bold(text))
    }

    pub fn run(mut self, run: Run) -> Self {
        self.runs.push(run);
        self
    }

    pub fn runs(mut self, runs: impl IntoIterator<Item = Run>) -> Self {
        self.runs.extend(runs);
        self
    }

    pub fn align(mut self, align: Align) -> Self {
        self.align = align;
        self
    }

    /// Space after the paragraph, in points.
    pub fn spacing_after(mut self, points: u32) -> Self {
        self.spacing_after = Some(points);
        self
    }

    /// Left indentation in twips.
    pub fn indent(mut self, twips: u32) -> Self {
        self.indent_left = Some(twips);
        self
    }

    /// Background fill, hex colour without `#`.
    pub fn shading(mut self, fill: impl Into<String>) -> Self {
        self.shading = Some(fill.into());
        self
    }

    /// Draw a single-line border around the paragraph (banner box).
    pub fn boxed(mut self) -> Self {
        self.boxed = true;
        self
    }

    pub fn keep_with_next(mut self) -> Self {
        self.keep_next = true;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    fn properties_xml(&self, section: Option<&str>) -> String {
        let mut props = String::new();
        if self.keep_next {
            props.push_str("<w:keepNext/>");
        }
        if self.boxed {
            props.push_str(concat!(
                "<w:pBdr>",
                "<w:top w:val=\"single\" w:sz=\"8\" w:space=\"4\" w:color=\"000000\"/>",
                "<w:left w:val=\"single\" w:sz=\"8\" w:space=\"4\" w:color=\"000000\"/>",
                "<w:bottom w:val=\"single\" w:sz=\"8\" w:space=\"4\" w:color=\"000000\"/>",
                "<w:right w:val=\"single\" w:sz=\"8\" w:space=\"4\" w:color=\"000000\"/>",
                "</w:pBdr>"
            ));
        }
        if let Some(fill) = &self.shading {
            props.push_str(&format!(
                "<w:shd w:val=\"clear\" w:color=\"auto\" w:fill=\"{}\"/>",
                escape_xml(fill)
            ));
        }
        if let Some(after) = self.spacing_after {
            props.push_str(&format!("<w:spacing w:after=\"{}\"/>", after * 20));
        }
        if let Some(indent) = self.indent_left {
            props.push_str(&format!("<w:ind w:left=\"{}\"/>", indent));
        }
        if self.align != Align::Left {
            props.push_str(&format!("<w:jc w:val=\"{}\"/>", self.align.as_str()));
        }
        if let Some(section) = section {
            props.push_str(section);
        }
        if props.is_empty() {
            props
        } else {
            format!("<w:pPr>{}</w:pPr>", props)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cell {
    paragraphs: Vec<Paragraph>,
    shading: Option<String>,
    span: u32,
}

impl Cell {
    pub fn new(paragraph: Paragraph) -> Self {
        Self {
            paragraphs: vec![paragraph],
            shading: None,
            span: 1,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(Paragraph::text(text))
    }

    pub fn bold(text: impl Into<String>) -> Self {
        Self::new(Paragraph::bold(text))
    }

    pub fn empty() -> Self {
        Self::new(Paragraph::new())
    }

    pub fn paragraph(mut self, paragraph: Paragraph) -> Self {
        self.paragraphs.push(paragraph);
        self
    }

    pub fn shading(mut self, fill: impl Into<String>) -> Self {
        self.shading = Some(fill.into());
        self
    }

    pub fn span(mut self, columns: u32) -> Self {
        self.span = columns.max(1);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    cells: Vec<Cell>,
    header: bool,
}

impl Row {
    pub fn new(cells: impl IntoIterator<Item = Cell>) -> Self {
        Self {
            cells: cells.into_iter().collect(),
            header: false,
        }
    }

    /// A header row with bold text on a grey background, repeated on
    /// every page.
    pub fn header<S: Into<String>>(labels: impl IntoIterator<Item = S>) -> Self {
        Self {
            cells: labels
                .into_iter()
                .map(|l| Cell::bold(l).shading("D9D9D9"))
                .collect(),
            header: true,
        }
    }

    pub fn texts<S: Into<String>>(values: impl IntoIterator<Item = S>) -> Self {
        Self::new(values.into_iter().map(Cell::text))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    widths: Vec<u32>,
    rows: Vec<Row>,
}

impl Table {
    /// A bordered table with the given column widths in twips.
    pub fn new(widths: impl IntoIterator<Item = u32>) -> Self {
        Self {
            widths: widths.into_iter().collect(),
            rows: Vec::new(),
        }
    }

    pub fn row(mut self, row: Row) -> Self {
        self.rows.push(row);
        self
    }

    pub fn push(&mut self, row: Row) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Page orientation of a section.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageSetup {
    pub landscape: bool,
}

impl PageSetup {
    pub fn portrait() -> Self {
        Self { landscape: false }
    }

    pub fn landscape() -> Self {
        Self { landscape: true }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Paragraph(Paragraph),
    Table(Table),
    PageBreak,
    /// Ends the current section; the setup applies to the section that ends.
    SectionEnd(PageSetup),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Part {
    Document,
    Header,
}

#[derive(Debug, Clone)]
struct Media {
    image: ImageData,
    part: Part,
}

/// Builder for a complete `.docx` package.
#[derive(Debug, Default)]
pub struct DocxBuilder {
    title: String,
    blocks: Vec<Block>,
    header: Vec<Paragraph>,
    footer: Vec<Paragraph>,
    media: Vec<Media>,
    final_setup: PageSetup,
}

/// Handle to an embedded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageRef(usize);

impl ImageRef {
    /// Inline picture run at the given size in centimetres.
    pub fn run(&self, width_cm: f64, height_cm: f64) -> Run {
        Run {
            kind: RunKind::Image {
                media: self.0,
                cx: (width_cm * EMU_PER_CM as f64) as u64,
                cy: (height_cm * EMU_PER_CM as f64) as u64,
            },
            style: RunStyle::default(),
        }
    }
}

impl DocxBuilder {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn page_setup(&mut self, setup: PageSetup) -> &mut Self {
        self.final_setup = setup;
        self
    }

    pub fn paragraph(&mut self, paragraph: Paragraph) -> &mut Self {
        self.blocks.push(Block::Paragraph(paragraph));
        self
    }

    pub fn table(&mut self, table: Table) -> &mut Self {
        self.blocks.push(Block::Table(table));
        self
    }

    pub fn page_break(&mut self) -> &mut Self {
        self.blocks.push(Block::PageBreak);
        self
    }

    pub fn end_section(&mut self, setup: PageSetup) -> &mut Self {
        self.blocks.push(Block::SectionEnd(setup));
        self
    }

    pub fn header_paragraph(&mut self, paragraph: Paragraph) -> &mut Self {
        self.header.push(paragraph);
        self
    }

    pub fn footer_paragraph(&mut self, paragraph: Paragraph) -> &mut Self {
        self.footer.push(paragraph);
        self
    }

    /// Register an image for use in the document body.
    pub fn add_image(&mut self, image: ImageData) -> ImageRef {
        self.media.push(Media {
            image,
            part: Part::Document,
        });
        ImageRef(self.media.len() - 1)
    }

    /// Register an image for use in the page header.
    pub fn add_header_image(&mut self, image: ImageData) -> ImageRef {
        self.media.push(Media {
            image,
            part: Part::Header,
        });
        ImageRef(self.media.len() - 1)
    }

    #[cfg(test)]
    pub(crate) fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    #[cfg(test)]
    pub(crate) fn tables(&self) -> impl Iterator<Item = &Table> {
        self.blocks.iter().filter_map(|b| match b {
            Block::Table(t) => Some(t),
            _ => None,
        })
    }

    /// Number of embedded images across the body and the header.
    #[cfg(test)]
    pub(crate) fn media_count(&self) -> usize {
        self.media.len()
    }

    /// Plain text of every body paragraph and table cell, in order.
    #[cfg(test)]
    pub(crate) fn plain_text(&self) -> String {
        let mut out = String::new();
        for block in &self.blocks {
            match block {
                Block::Paragraph(p) => push_plain(&mut out, p),
                Block::Table(t) => {
                    for row in &t.rows {
                        for cell in &row.cells {
                            for p in &cell.paragraphs {
                                push_plain(&mut out, p);
                            }
                        }
                    }
                }
                _ => {}
            }
        }
        out
    }

    fn rel_id(&self, media: usize) -> String {
        format!("rIdImg{}", media + 1)
    }

    fn media_name(&self, media: usize) -> String {
        format!("image{}.{}", media + 1, self.media[media].image.format.extension())
    }

    fn run_xml(&self, run: &Run) -> String {
        let rpr = run.style.to_xml();
        match &run.kind {
            RunKind::Text(text) => format!(
                "<w:r>{}<w:t xml:space=\"preserve\">{}</w:t></w:r>",
                rpr,
                escape_xml(text)
            ),
            RunKind::LineBreak => "<w:r><w:br/></w:r>".to_string(),
            RunKind::PageNumber => format!(
                "<w:fldSimple w:instr=\"PAGE\"><w:r>{}<w:t>1</w:t></w:r></w:fldSimple>",
                rpr
            ),
            RunKind::Image { media, cx, cy } => {
                drawing_run_xml(&self.rel_id(*media), *media as u32 + 1, *cx, *cy)
            }
        }
    }

    fn paragraph_xml(&self, paragraph: &Paragraph, section: Option<&str>) -> String {
        let mut xml = String::from("<w:p>");
        xml.push_str(&paragraph.properties_xml(section));
        for run in &paragraph.runs {
            xml.push_str(&self.run_xml(run));
        }
        xml.push_str("</w:p>");
        xml
    }

    fn table_xml(&self, table: &Table) -> String {
        let mut xml = String::from("<w:tbl><w:tblPr><w:tblStyle w:val=\"TableGrid\"/>");
        let total: u32 = table.widths.iter().sum();
        xml.push_str(&format!("<w:tblW w:w=\"{}\" w:type=\"dxa\"/>", total));
        xml.push_str(concat!(
            "<w:tblBorders>",
            "<w:top w:val=\"single\" w:sz=\"4\" w:space=\"0\" w:color=\"000000\"/>",
            "<w:left w:val=\"single\" w:sz=\"4\" w:space=\"0\" w:color=\"000000\"/>",
            "<w:bottom w:val=\"single\" w:sz=\"4\" w:space=\"0\" w:color=\"000000\"/>",
            "<w:right w:val=\"single\" w:sz=\"4\" w:space=\"0\" w:color=\"000000\"/>",
            "<w:insideH w:val=\"single\" w:sz=\"4\" w:space=\"0\" w:color=\"000000\"/>",
            "<w:insideV w:val=\"single\" w:sz=\"4\" w:space=\"0\" w:color=\"000000\"/>",
            "</w:tblBorders><w:tblLayout w:type=\"fixed\"/></w:tblPr><w:tblGrid>"
        ));
        for width in &table.widths {
            xml.push_str(&format!("<w:gridCol w:w=\"{}\"/>", width));
        }
        xml.push_str("</w:tblGrid>");

        for row in &table.rows {
            xml.push_str("<w:tr>");
            if row.header {
                xml.push_str("<w:trPr><w:tblHeader/></w:trPr>");
            }
            let mut col = 0usize;
            for cell in &row.cells {
                let span = cell.span as usize;
                let width: u32 = table.widths.iter().skip(col).take(span).sum();
                col += span;
                xml.push_str("<w:tc><w:tcPr>");
                xml.push_str(&format!("<w:tcW w:w=\"{}\" w:type=\"dxa\"/>", width));
                if cell.span > 1 {
                    xml.push_str(&format!("<w:gridSpan w:val=\"{}\"/>", cell.span));
                }
                if let Some(fill) = &cell.shading {
                    xml.push_str(&format!(
                        "<w:shd w:val=\"clear\" w:color=\"auto\" w:fill=\"{}\"/>",
                        escape_xml(fill)
                    ));
                }
                xml.push_str("</w:tcPr>");
                if cell.paragraphs.is_empty() {
                    xml.push_str("<w:p/>");
                }
                for paragraph in &cell.paragraphs {
                    xml.push_str(&self.paragraph_xml(paragraph, None));
                }
                xml.push_str("</w:tc>");
            }
            xml.push_str("</w:tr>");
        }
        xml.push_str("</w:tbl>");
        xml
    }

    fn section_xml(&self, setup: PageSetup) -> String {
        let mut xml = String::from("<w:sectPr>");
        if !self.header.is_empty() {
            xml.push_str("<w:headerReference w:type=\"default\" r:id=\"rIdHeader1\"/>");
        }
        if !self.footer.is_empty() {
            xml.push_str("<w:footerReference w:type=\"default\" r:id=\"rIdFooter1\"/>");
        }
        if setup.landscape {
            xml.push_str("<w:pgSz w:w=\"16838\" w:h=\"11906\" w:orient=\"landscape\"/>");
        } else {
            xml.push_str("<w:pgSz w:w=\"11906\" w:h=\"16838\"/>");
        }
        xml.push_str(concat!(
            "<w:pgMar w:top=\"1134\" w:right=\"1134\" w:bottom=\"1134\" w:left=\"1134\" ",
            "w:header=\"567\" w:footer=\"567\" w:gutter=\"0\"/>",
            "</w:sectPr>"
        ));
        xml
    }

    fn document_xml(&self) -> String {
        let mut body = String::new();
        for block in &self.blocks {
            match block {
                Block::Paragraph(p) => body.push_str(&self.paragraph_xml(p, None)),
                Block::Table(t) => {
                    body.push_str(&self.table_xml(t));
                    // a table may not be the last element before a section break
                    body.push_str("<w:p/>");
                }
                Block::PageBreak => body.push_str("<w:p><w:r><w:br w:type=\"page\"/></w:r></w:p>"),
                Block::SectionEnd(setup) => {
                    let section = self.section_xml(*setup);
                    body.push_str(&self.paragraph_xml(&Paragraph::new(), Some(&section)));
                }
            }
        }
        body.push_str(&self.section_xml(self.final_setup));
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?><w:document {}><w:body>{}</w:body></w:document>",
            NS_DECL, body
        )
    }

    fn header_footer_xml(&self, root: &str, paragraphs: &[Paragraph]) -> String {
        let mut xml = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?><w:{} {}>",
            root, NS_DECL
        );
        for paragraph in paragraphs {
            xml.push_str(&self.paragraph_xml(paragraph, None));
        }
        xml.push_str(&format!("</w:{}>", root));
        xml
    }

    fn relationships_xml(&self, part: Part) -> String {
        let mut xml = String::from(concat!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>",
            "<Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">"
        ));
        if part == Part::Document {
            xml.push_str("<Relationship Id=\"rIdStyles\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles\" Target=\"styles.xml\"/>");
            if !self.header.is_empty() {
                xml.push_str("<Relationship Id=\"rIdHeader1\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/header\" Target=\"header1.xml\"/>");
            }
            if !self.footer.is_empty() {
                xml.push_str("<Relationship Id=\"rIdFooter1\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/footer\" Target=\"footer1.xml\"/>");
            }
        }
        for (idx, media) in self.media.iter().enumerate() {
            if media.part == part {
                xml.push_str(&format!(
                    "<Relationship Id=\"{}\" Type=\"{}\" Target=\"media/{}\"/>",
                    self.rel_id(idx),
                    REL_IMAGE,
                    self.media_name(idx)
                ));
            }
        }
        xml.push_str("</Relationships>");
        xml
    }

    fn content_types_xml(&self) -> String {
        let mut xml = String::from(concat!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>",
            "<Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">",
            "<Default Extension=\"rels\" ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>",
            "<Default Extension=\"xml\" ContentType=\"application/xml\"/>",
            "<Default Extension=\"png\" ContentType=\"image/png\"/>",
            "<Default Extension=\"jpeg\" ContentType=\"image/jpeg\"/>",
            "<Default Extension=\"gif\" ContentType=\"image/gif\"/>",
            "<Override PartName=\"/word/document.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml\"/>",
            "<Override PartName=\"/word/styles.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml\"/>",
            "<Override PartName=\"/docProps/core.xml\" ContentType=\"application/vnd.openxmlformats-package.core-properties+xml\"/>"
        ));
        if !self.header.is_empty() {
            xml.push_str("<Override PartName=\"/word/header1.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.wordprocessingml.header+xml\"/>");
        }
        if !self.footer.is_empty() {
            xml.push_str("<Override PartName=\"/word/footer1.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.wordprocessingml.footer+xml\"/>");
        }
        xml.push_str("</Types>");
        xml
    }

    /// Serialize the document into `.docx` bytes.
    pub fn build(&self) -> Result<Vec<u8>, DocumentError> {
        let mut parts: Vec<(String, Vec<u8>)> = vec![
            ("[Content_Types].xml".to_string(), self.content_types_xml().into_bytes()),
            ("_rels/.rels".to_string(), ROOT_RELS.as_bytes().to_vec()),
            ("docProps/core.xml".to_string(), core_properties_xml(&self.title).into_bytes()),
            ("word/document.xml".to_string(), self.document_xml().into_bytes()),
            ("word/styles.xml".to_string(), STYLES.as_bytes().to_vec()),
            (
                "word/_rels/document.xml.rels".to_string(),
                self.relationships_xml(Part::Document).into_bytes(),
            ),
        ];
        if !self.header.is_empty() {
            parts.push((
                "word/header1.xml".to_string(),
                self.header_footer_xml("hdr", &self.header).into_bytes(),
            ));
            parts.push((
                "word/_rels/header1.xml.rels".to_string(),
                self.relationships_xml(Part::Header).into_bytes(),
            ));
        }
        if !self.footer.is_empty() {
            parts.push((
                "word/footer1.xml".to_string(),
                self.header_footer_xml("ftr", &self.footer).into_bytes(),
            ));
        }
        for (idx, media) in self.media.iter().enumerate() {
            parts.push((format!("word/media/{}", self.media_name(idx)), media.image.bytes.clone()));
        }
        write_package(&parts)
    }
}

#[cfg(test)]
fn push_plain(out: &mut String, paragraph: &Paragraph) {
    for run in &paragraph.runs {
        if let RunKind::Text(text) = &run.kind {
            out.push_str(text);
        }
    }
    out.push('\n');
}

const ROOT_RELS: &str = concat!(
    "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>",
    "<Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">",
    "<Relationship Id=\"rId1\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument\" Target=\"word/document.xml\"/>",
    "<Relationship Id=\"rId2\" Type=\"http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties\" Target=\"docProps/core.xml\"/>",
    "</Relationships>"
);

const STYLES: &str = concat!(
    "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>",
    "<w:styles xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\">",
    "<w:docDefaults><w:rPrDefault><w:rPr>",
    "<w:rFonts w:ascii=\"Calibri\" w:hAnsi=\"Calibri\" w:cs=\"Calibri\"/>",
    "<w:sz w:val=\"20\"/><w:szCs w:val=\"20\"/><w:lang w:val=\"it-IT\"/>",
    "</w:rPr></w:rPrDefault><w:pPrDefault><w:pPr><w:spacing w:after=\"80\"/></w:pPr></w:pPrDefault></w:docDefaults>",
    "<w:style w:type=\"paragraph\" w:default=\"1\" w:styleId=\"Normal\"><w:name w:val=\"Normal\"/></w:style>",
    "<w:style w:type=\"table\" w:styleId=\"TableGrid\"><w:name w:val=\"Table Grid\"/>",
    "<w:tblPr><w:tblCellMar><w:left w:w=\"80\" w:type=\"dxa\"/><w:right w:w=\"80\" w:type=\"dxa\"/></w:tblCellMar></w:tblPr>",
    "</w:style>",
    "</w:styles>"
);
