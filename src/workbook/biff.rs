use super::{CellFill, FillError, SheetFills};
use std::io::{Cursor, Read};

const RECORD_BOF: u16 = 0x0809;
const RECORD_EOF: u16 = 0x000A;
const RECORD_XF: u16 = 0x00E0;
const RECORD_BOUNDSHEET: u16 = 0x0085;
const RECORD_MULRK: u16 = 0x00BD;
const RECORD_MULBLANK: u16 = 0x00BE;

/// Records that carry a single `row, column, xf` triple.
const SINGLE_CELL_RECORDS: &[u16] = &[
    0x0006, // Formula
    0x00D6, // RString
    0x00FD, // LabelSst
    0x0201, // Blank
    0x0203, // Number
    0x0204, // Label
    0x0205, // BoolErr
    0x027E, // RK
];

/// Fills per BOUNDSHEET, resolved through each cell record's XF index.
pub fn read_fills(bytes: &[u8]) -> Result<Vec<SheetFills>, FillError> {
    let mut compound = cfb::CompoundFile::open(Cursor::new(bytes))?;
    let stream_path = if compound.is_stream("/Workbook") {
        "/Workbook"
    } else {
        "/Book"
    };

    let mut stream = Vec::new();
    compound.open_stream(stream_path)?.read_to_end(&mut stream)?;

    parse_workbook_stream(&stream)
}

struct Record<'a> {
    kind: u16,
    data: &'a [u8],
}

/// Sequential record reader; stops at the first truncated record.
struct Records<'a> {
    stream: &'a [u8],
    position: usize,
}

impl<'a> Records<'a> {
    fn new(stream: &'a [u8], position: usize) -> Self {
        Self { stream, position }
    }
}

impl<'a> Iterator for Records<'a> {
    type Item = Record<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let kind = read_u16(self.stream, self.position)?;
        let len = read_u16(self.stream, self.position + 2)? as usize;
        let start = self.position + 4;
        let data = self.stream.get(start..start + len)?;
        self.position = start + len;
        Some(Record { kind, data })
    }
}

fn read_u16(data: &[u8], at: usize) -> Option<u16> {
    let bytes = data.get(at..at + 2)?;
    Some(u16::from_le_bytes([bytes[0], bytes[1]]))
}

fn read_u32(data: &[u8], at: usize) -> Option<u32> {
    let bytes = data.get(at..at + 4)?;
    Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

fn parse_workbook_stream(stream: &[u8]) -> Result<Vec<SheetFills>, FillError> {
    let mut formats: Vec<Option<CellFill>> = Vec::new();
    let mut sheet_offsets: Vec<usize> = Vec::new();

    for record in Records::new(stream, 0).skip(1) {
        match record.kind {
            RECORD_XF => formats.push(parse_xf_fill(record.data)),
            RECORD_BOUNDSHEET => {
                let offset = read_u32(record.data, 0).ok_or_else(|| {
                    FillError::Malformed("truncated BOUNDSHEET record".to_string())
                })?;
                sheet_offsets.push(offset as usize);
            }
            RECORD_EOF => break,
            _ => {}
        }
    }

    sheet_offsets
        .into_iter()
        .map(|offset| parse_sheet_fills(stream, offset, &formats))
        .collect()
}

/// Foreground palette index of an XF with a visible fill pattern.
fn parse_xf_fill(data: &[u8]) -> Option<CellFill> {
    let pattern = (read_u32(data, 14)? >> 26) & 0x3F;
    let foreground = read_u16(data, 18)? & 0x007F;
    if pattern == 0 {
        None
    } else {
        Some(CellFill::Indexed(foreground))
    }
}

fn parse_sheet_fills(
    stream: &[u8],
    offset: usize,
    formats: &[Option<CellFill>],
) -> Result<SheetFills, FillError> {
    let mut fills = SheetFills::new();
    let mut records = Records::new(stream, offset);

    match records.next() {
        Some(record) if record.kind == RECORD_BOF => {}
        _ => {
            return Err(FillError::Malformed(format!(
                "no BOF record at sheet offset {}",
                offset
            )))
        }
    }

    let mut record_fill = |row: u16, column: u16, xf: u16| {
        if let Some(Some(fill)) = formats.get(xf as usize) {
            fills.insert((row as u32, column as u32), *fill);
        }
    };

    // Embedded charts open nested BOF/EOF substreams.
    let mut depth = 1usize;
    for record in records {
        match record.kind {
            RECORD_BOF => depth += 1,
            RECORD_EOF => {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            _ if depth > 1 => {}
            kind if SINGLE_CELL_RECORDS.contains(&kind) => {
                if let (Some(row), Some(column), Some(xf)) = (
                    read_u16(record.data, 0),
                    read_u16(record.data, 2),
                    read_u16(record.data, 4),
                ) {
                    record_fill(row, column, xf);
                }
            }
            RECORD_MULRK | RECORD_MULBLANK => {
                let stride = if record.kind == RECORD_MULRK { 6 } else { 2 };
                let (Some(row), Some(first_column)) =
                    (read_u16(record.data, 0), read_u16(record.data, 2))
                else {
                    continue;
                };
                // Trailing u16 is the last column.
                let body = record.data.len().saturating_sub(6);
                for (i, at) in (4..4 + body).step_by(stride).enumerate() {
                    if let Some(xf) = read_u16(record.data, at) {
                        record_fill(row, first_column + i as u16, xf);
                    }
                }
            }
            _ => {}
        }
    }

    Ok(fills)
}
