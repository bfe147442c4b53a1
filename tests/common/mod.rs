// Minimal `.xlsx` and `.xls` writers for fixtures.
//
// Cell format 1 carries a solid red fill in both formats, so `red_number`
// cells are what the marker policy picks.

#![allow(dead_code)]

use std::fs::{self, File};
use std::io::{Cursor, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

enum FixtureValue {
    Text(String),
    Number(f64),
}

struct FixtureCell {
    row: u32,
    column: u32,
    value: FixtureValue,
    red: bool,
}

pub struct SheetFixture {
    name: String,
    cells: Vec<FixtureCell>,
}

impl SheetFixture {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            cells: Vec::new(),
        }
    }

    pub fn text(mut self, row: u32, column: u32, text: &str) -> Self {
        self.push(row, column, FixtureValue::Text(text.to_string()), false);
        self
    }

    pub fn number(mut self, row: u32, column: u32, value: f64) -> Self {
        self.push(row, column, FixtureValue::Number(value), false);
        self
    }

    pub fn red_number(mut self, row: u32, column: u32, value: f64) -> Self {
        self.push(row, column, FixtureValue::Number(value), true);
        self
    }

    fn push(&mut self, row: u32, column: u32, value: FixtureValue, red: bool) {
        self.cells.push(FixtureCell {
            row,
            column,
            value,
            red,
        });
    }

    fn sorted_cells(&self) -> Vec<&FixtureCell> {
        let mut cells: Vec<&FixtureCell> = self.cells.iter().collect();
        cells.sort_by_key(|cell| (cell.row, cell.column));
        cells
    }

    fn to_xml(&self) -> String {
        let mut rows = String::new();
        let mut current_row: Option<u32> = None;
        for cell in self.sorted_cells() {
            if current_row != Some(cell.row) {
                if current_row.is_some() {
                    rows.push_str("</row>");
                }
                rows.push_str(&format!(r#"<row r="{}">"#, cell.row + 1));
                current_row = Some(cell.row);
            }

            let reference = cell_ref(cell.row, cell.column);
            let style = if cell.red { r#" s="1""# } else { "" };
            match &cell.value {
                FixtureValue::Text(text) => rows.push_str(&format!(
                    r#"<c r="{}"{} t="inlineStr"><is><t>{}</t></is></c>"#,
                    reference,
                    style,
                    escape(text)
                )),
                FixtureValue::Number(value) => rows.push_str(&format!(
                    r#"<c r="{}"{}><v>{}</v></c>"#,
                    reference, style, value
                )),
            }
        }
        if current_row.is_some() {
            rows.push_str("</row>");
        }

        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>{}</sheetData></worksheet>"#,
            rows
        )
    }
}

/// Zero-based (row, column) to `A1` notation.
pub fn cell_ref(row: u32, column: u32) -> String {
    let mut letters = Vec::new();
    let mut n = column + 1;
    while n > 0 {
        let rem = ((n - 1) % 26) as u8;
        letters.push((b'A' + rem) as char);
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect::<String>() + &(row + 1).to_string()
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

const STYLES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<fonts count="1"><font><sz val="11"/><name val="Calibri"/></font></fonts>
<fills count="3">
<fill><patternFill patternType="none"/></fill>
<fill><patternFill patternType="gray125"/></fill>
<fill><patternFill patternType="solid"><fgColor rgb="FFFF0000"/><bgColor indexed="64"/></patternFill></fill>
</fills>
<borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders>
<cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs>
<cellXfs count="2">
<xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/>
<xf numFmtId="0" fontId="0" fillId="2" borderId="0" xfId="0" applyFill="1"/>
</cellXfs>
</styleSheet>"#;

pub fn write_xlsx(path: &Path, sheets: &[SheetFixture]) {
    let file = File::create(path).unwrap();
    let mut zip = ZipWriter::new(file);

    let mut content_types = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
<Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>"#,
    );
    for i in 1..=sheets.len() {
        content_types.push_str(&format!(
            r#"<Override PartName="/xl/worksheets/sheet{}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#,
            i
        ));
    }
    content_types.push_str("</Types>");

    let root_rels = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#;

    let mut workbook = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets>"#,
    );
    let mut workbook_rels = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    );
    for (i, sheet) in sheets.iter().enumerate() {
        let n = i + 1;
        workbook.push_str(&format!(
            r#"<sheet name="{}" sheetId="{}" r:id="rId{}"/>"#,
            escape(&sheet.name),
            n,
            n
        ));
        workbook_rels.push_str(&format!(
            r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{}.xml"/>"#,
            n, n
        ));
    }
    workbook.push_str("</sheets></workbook>");
    workbook_rels.push_str(&format!(
        r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#,
        sheets.len() + 1
    ));

    let mut write_part = |name: &str, content: &str| {
        zip.start_file(name, SimpleFileOptions::default()).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    };

    write_part("[Content_Types].xml", &content_types);
    write_part("_rels/.rels", root_rels);
    write_part("xl/workbook.xml", &workbook);
    write_part("xl/_rels/workbook.xml.rels", &workbook_rels);
    write_part("xl/styles.xml", STYLES_XML);
    for (i, sheet) in sheets.iter().enumerate() {
        write_part(&format!("xl/worksheets/sheet{}.xml", i + 1), &sheet.to_xml());
    }

    zip.finish().unwrap();
}

const BIFF_BOF: u16 = 0x0809;
const BIFF_EOF: u16 = 0x000A;
const BIFF_XF: u16 = 0x00E0;
const BIFF_BOUNDSHEET: u16 = 0x0085;
const BIFF_SST: u16 = 0x00FC;
const BIFF_LABELSST: u16 = 0x00FD;
const BIFF_NUMBER: u16 = 0x0203;

fn biff_record(kind: u16, data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + data.len());
    out.extend_from_slice(&kind.to_le_bytes());
    out.extend_from_slice(&(data.len() as u16).to_le_bytes());
    out.extend_from_slice(data);
    out
}

/// BIFF8 BOF; `substream` is 0x0005 for globals, 0x0010 for a worksheet.
fn biff_bof(substream: u16) -> Vec<u8> {
    let mut data = vec![0u8; 16];
    data[0..2].copy_from_slice(&0x0600u16.to_le_bytes());
    data[2..4].copy_from_slice(&substream.to_le_bytes());
    biff_record(BIFF_BOF, &data)
}

/// XF with general number format and, when given, a solid fill.
fn biff_xf(fill: Option<u16>) -> Vec<u8> {
    let mut data = vec![0u8; 20];
    if let Some(color) = fill {
        data[14..18].copy_from_slice(&(1u32 << 26).to_le_bytes());
        data[18..20].copy_from_slice(&color.to_le_bytes());
    }
    biff_record(BIFF_XF, &data)
}

fn biff_sheet_stream(sheet: &SheetFixture, strings: &mut Vec<String>) -> Vec<u8> {
    let mut stream = biff_bof(0x0010);
    for cell in sheet.sorted_cells() {
        let xf: u16 = if cell.red { 1 } else { 0 };
        let mut data = Vec::new();
        data.extend_from_slice(&(cell.row as u16).to_le_bytes());
        data.extend_from_slice(&(cell.column as u16).to_le_bytes());
        data.extend_from_slice(&xf.to_le_bytes());

        match &cell.value {
            FixtureValue::Text(text) => {
                let index = match strings.iter().position(|s| s == text) {
                    Some(index) => index,
                    None => {
                        strings.push(text.clone());
                        strings.len() - 1
                    }
                };
                data.extend_from_slice(&(index as u32).to_le_bytes());
                stream.extend(biff_record(BIFF_LABELSST, &data));
            }
            FixtureValue::Number(value) => {
                data.extend_from_slice(&value.to_le_bytes());
                stream.extend(biff_record(BIFF_NUMBER, &data));
            }
        }
    }
    stream.extend(biff_record(BIFF_EOF, &[]));
    stream
}

/// BIFF8 workbook stream: globals (BOF, XF 0 plain, XF 1 red palette
/// index 10, BOUNDSHEETs, SST, EOF) followed by one substream per sheet.
fn biff_workbook_stream(sheets: &[SheetFixture]) -> Vec<u8> {
    let mut strings = Vec::new();
    let substreams: Vec<Vec<u8>> = sheets
        .iter()
        .map(|sheet| biff_sheet_stream(sheet, &mut strings))
        .collect();

    let mut globals = biff_bof(0x0005);
    globals.extend(biff_xf(None));
    globals.extend(biff_xf(Some(10)));

    let mut offset_fields = Vec::new();
    for sheet in sheets {
        let mut data = vec![0u8; 6];
        data.push(sheet.name.len() as u8);
        data.push(0); // compressed 8-bit characters
        data.extend_from_slice(sheet.name.as_bytes());
        offset_fields.push(globals.len() + 4);
        globals.extend(biff_record(BIFF_BOUNDSHEET, &data));
    }

    let mut sst = Vec::new();
    sst.extend_from_slice(&(strings.len() as u32).to_le_bytes());
    sst.extend_from_slice(&(strings.len() as u32).to_le_bytes());
    for text in &strings {
        let units: Vec<u16> = text.encode_utf16().collect();
        sst.extend_from_slice(&(units.len() as u16).to_le_bytes());
        sst.push(0x01); // UTF-16LE characters
        for unit in units {
            sst.extend_from_slice(&unit.to_le_bytes());
        }
    }
    globals.extend(biff_record(BIFF_SST, &sst));
    globals.extend(biff_record(BIFF_EOF, &[]));

    let mut offset = globals.len();
    for (field, substream) in offset_fields.into_iter().zip(&substreams) {
        globals[field..field + 4].copy_from_slice(&(offset as u32).to_le_bytes());
        offset += substream.len();
    }

    substreams.into_iter().fold(globals, |mut stream, substream| {
        stream.extend(substream);
        stream
    })
}

pub fn write_xls(path: &Path, sheets: &[SheetFixture]) {
    let workbook = biff_workbook_stream(sheets);

    let mut compound =
        cfb::CompoundFile::create_with_version(cfb::Version::V3, Cursor::new(Vec::new()))
            .unwrap();
    {
        let mut stream = compound.create_stream("/Workbook").unwrap();
        stream.write_all(&workbook).unwrap();
    }
    compound.flush().unwrap();

    fs::write(path, compound.into_inner().into_inner()).unwrap();
}

/// Positive-layout sheet: post `A1`, `view`=1, `edit`=2.
pub fn positive_sheets() -> Vec<SheetFixture> {
    vec![SheetFixture::new("Sheet1")
        .text(1, 0, "岗位：A1")
        .text(3, 2, "view")
        .number(3, 3, 1.0)
        .text(4, 2, "edit")
        .number(4, 4, 2.0)]
}

pub fn positive_workbook(path: &Path) {
    write_xlsx(path, &positive_sheets());
}

/// Colored-layout sheets with two highlighted permissions and one plain.
pub fn colored_sheets() -> Vec<SheetFixture> {
    vec![
        SheetFixture::new("Cover").text(0, 0, "Post permissions"),
        SheetFixture::new("Matrix")
            .text(1, 0, "岗位：柜员 B2")
            .text(1, 3, "应用级别：3级")
            .text(3, 2, "approve")
            .red_number(3, 4, -1.0)
            .text(3, 9, "audit")
            .red_number(3, 12, 4.0)
            .text(4, 2, "export")
            .number(4, 3, 5.0),
    ]
}

pub fn colored_workbook(path: &Path) {
    write_xlsx(path, &colored_sheets());
}
