use super::{CellFill, FillError, SheetFills};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader as XmlReader;
use std::collections::HashMap;
use std::io::{Cursor, Read, Seek};
use zip::result::ZipError;
use zip::ZipArchive;

/// Fills per sheet in `xl/workbook.xml` order, keyed through the `s` format
/// index of each cell.
pub fn read_fills(bytes: &[u8]) -> Result<Vec<SheetFills>, FillError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;

    let workbook_xml = read_part(&mut archive, "xl/workbook.xml")?
        .ok_or_else(|| FillError::Malformed("missing xl/workbook.xml".to_string()))?;
    let sheet_ids = parse_sheet_ids(&workbook_xml)?;

    let format_fills = match read_part(&mut archive, "xl/styles.xml")? {
        Some(xml) => parse_format_fills(&xml)?,
        None => Vec::new(),
    };
    if format_fills.iter().all(Option::is_none) {
        return Ok(vec![SheetFills::new(); sheet_ids.len()]);
    }

    let targets = match read_part(&mut archive, "xl/_rels/workbook.xml.rels")? {
        Some(xml) => parse_relationships(&xml)?,
        None => HashMap::new(),
    };

    let mut fills = Vec::with_capacity(sheet_ids.len());
    for id in &sheet_ids {
        let sheet_xml = match targets.get(id) {
            Some(target) => read_part(&mut archive, &resolve_target(target))?,
            None => None,
        };
        let sheet_fills = match sheet_xml {
            Some(xml) => parse_sheet_fills(&xml, &format_fills)?,
            None => SheetFills::new(),
        };
        fills.push(sheet_fills);
    }

    Ok(fills)
}

fn read_part<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<Option<String>, FillError> {
    match archive.by_name(name) {
        Ok(mut file) => {
            let mut content = String::new();
            file.read_to_string(&mut content)?;
            Ok(Some(content))
        }
        Err(ZipError::FileNotFound) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn resolve_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{}", target),
    }
}

fn attr_value(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == key)
        .map(|a| String::from_utf8_lossy(&a.value).into_owned())
}

/// Relationship ids of `<sheet>` elements, in workbook order.
fn parse_sheet_ids(xml: &str) -> Result<Vec<String>, FillError> {
    let mut reader = XmlReader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut ids = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sheet" => {
                ids.push(attr_value(&e, b"id").unwrap_or_default());
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(ids)
}

fn parse_relationships(xml: &str) -> Result<HashMap<String, String>, FillError> {
    let mut reader = XmlReader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut targets = HashMap::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                if let (Some(id), Some(target)) = (attr_value(&e, b"Id"), attr_value(&e, b"Target")) {
                    targets.insert(id, target);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(targets)
}

/// Fill of every cell format, indexed like `cellXfs`.
fn parse_format_fills(xml: &str) -> Result<Vec<Option<CellFill>>, FillError> {
    let mut reader = XmlReader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut fills: Vec<Option<CellFill>> = Vec::new();
    let mut format_fill_ids: Vec<usize> = Vec::new();

    let mut in_fills = false;
    let mut in_cell_xfs = false;
    let mut in_fill = false;
    let mut patterned = false;
    let mut foreground: Option<CellFill> = None;

    loop {
        let event = reader.read_event()?;
        let is_empty = matches!(event, Event::Empty(_));
        match event {
            Event::Start(e) | Event::Empty(e) => match e.local_name().as_ref() {
                b"fills" if !is_empty => in_fills = true,
                b"cellXfs" if !is_empty => in_cell_xfs = true,
                b"fill" if in_fills => {
                    if is_empty {
                        fills.push(None);
                    } else {
                        in_fill = true;
                        patterned = false;
                        foreground = None;
                    }
                }
                b"patternFill" if in_fill => {
                    patterned = attr_value(&e, b"patternType").is_some_and(|p| p != "none");
                }
                b"fgColor" if in_fill => {
                    foreground = attr_value(&e, b"rgb")
                        .and_then(|rgb| CellFill::from_hex(&rgb))
                        .or_else(|| {
                            attr_value(&e, b"indexed")
                                .and_then(|i| i.parse::<u16>().ok())
                                .map(CellFill::Indexed)
                        });
                }
                b"xf" if in_cell_xfs => {
                    let fill_id = attr_value(&e, b"fillId")
                        .and_then(|id| id.parse::<usize>().ok())
                        .unwrap_or(0);
                    format_fill_ids.push(fill_id);
                }
                _ => {}
            },
            Event::End(e) => match e.local_name().as_ref() {
                b"fills" => in_fills = false,
                b"cellXfs" => in_cell_xfs = false,
                b"fill" if in_fill => {
                    fills.push(if patterned { foreground } else { None });
                    in_fill = false;
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(format_fill_ids
        .into_iter()
        .map(|id| fills.get(id).copied().flatten())
        .collect())
}

/// Converts an `A1` reference into zero-based (row, column).
fn parse_cell_ref(reference: &str) -> Option<(u32, u32)> {
    let split = reference.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = reference.split_at(split);
    if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }

    let column = letters
        .chars()
        .try_fold(0u32, |acc, c| {
            acc.checked_mul(26)?
                .checked_add(c.to_ascii_uppercase() as u32 - 'A' as u32 + 1)
        })?;
    let row: u32 = digits.parse().ok()?;

    if row == 0 {
        return None;
    }
    Some((row - 1, column - 1))
}

fn parse_sheet_fills(xml: &str, format_fills: &[Option<CellFill>]) -> Result<SheetFills, FillError> {
    let mut reader = XmlReader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut fills = SheetFills::new();

    let mut next_row: u32 = 0;
    let mut current_row: u32 = 0;
    let mut next_column: u32 = 0;

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) => match e.local_name().as_ref() {
                b"row" => {
                    current_row = attr_value(&e, b"r")
                        .and_then(|r| r.parse::<u32>().ok())
                        .and_then(|r| r.checked_sub(1))
                        .unwrap_or(next_row);
                    next_row = current_row + 1;
                    next_column = 0;
                }
                b"c" => {
                    let (row, column) = attr_value(&e, b"r")
                        .and_then(|r| parse_cell_ref(&r))
                        .unwrap_or((current_row, next_column));
                    next_column = column + 1;

                    let fill = attr_value(&e, b"s")
                        .and_then(|s| s.parse::<usize>().ok())
                        .and_then(|s| format_fills.get(s).copied().flatten());
                    if let Some(fill) = fill {
                        fills.insert((row, column), fill);
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(fills)
}
