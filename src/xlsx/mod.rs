// src/xlsx/mod.rs
//
// Minimal reader for the spreadsheet package format: an .xlsx file is a ZIP
// archive of XML parts. We resolve one sheet by name through the workbook
// manifest and its relationship table, decode the shared-string table, and
// return that sheet's cells as a dense row-major grid of text values. No
// general-purpose spreadsheet library involved.
use anyhow::{bail, Context, Result};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;
use tracing::debug;
use zip::ZipArchive;

const SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";
const WORKBOOK_PART: &str = "xl/workbook.xml";
const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";

/// Open `path` as a spreadsheet package and return the named sheet's cell
/// grid. Every row is dense: blank and unserialized cells come back as `""`,
/// indexed by zero-based column. Row order matches the source.
///
/// Missing package parts or an unknown sheet name are fatal; malformed cell
/// content degrades to `""` instead of failing the run.
#[tracing::instrument(level = "info", skip(path), fields(path = %path.as_ref().display()))]
pub fn load_sheet_rows<P: AsRef<Path>>(path: P, sheet_name: &str) -> Result<Vec<Vec<String>>> {
    let file = File::open(&path)
        .with_context(|| format!("opening spreadsheet package {:?}", path.as_ref()))?;
    let mut archive = ZipArchive::new(file)
        .with_context(|| format!("reading {:?} as a ZIP archive", path.as_ref()))?;

    // 1) shared strings, if the package has any
    let shared_strings = match read_part(&mut archive, SHARED_STRINGS_PART)? {
        Some(bytes) => parse_shared_strings(&bytes)?,
        None => Vec::new(),
    };
    debug!(count = shared_strings.len(), "shared strings loaded");

    // 2) workbook manifest + relationship table → worksheet part path
    let workbook = read_required_part(&mut archive, WORKBOOK_PART)?;
    let sheets = parse_workbook_sheets(&workbook)?;
    let rels = read_required_part(&mut archive, WORKBOOK_RELS_PART)?;
    let rel_targets = parse_relationships(&rels)?;

    let rel_id = sheets
        .iter()
        .find(|(name, _)| name == sheet_name)
        .map(|(_, rid)| rid.clone());
    let rel_id = match rel_id {
        Some(rid) => rid,
        None => bail!("sheet {:?} not found in workbook", sheet_name),
    };
    let target = rel_targets
        .get(&rel_id)
        .with_context(|| format!("relationship {:?} for sheet {:?} missing", rel_id, sheet_name))?;
    let part_path = resolve_part_path(target);

    // 3) worksheet part → dense grid
    let worksheet = read_required_part(&mut archive, &part_path)?;
    parse_worksheet(&worksheet, &shared_strings)
}

/// Read one ZIP entry fully into memory; `None` if the entry is absent.
fn read_part<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<Option<Vec<u8>>> {
    let mut entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e).with_context(|| format!("opening package part {}", name)),
    };
    let mut buf = Vec::with_capacity(entry.size() as usize);
    entry
        .read_to_end(&mut buf)
        .with_context(|| format!("reading package part {}", name))?;
    Ok(Some(buf))
}

fn read_required_part<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<Vec<u8>> {
    read_part(archive, name)?.with_context(|| format!("package part {} missing", name))
}

/// Relationship targets are package-relative to `xl/` unless they start at
/// the package root with a leading slash.
fn resolve_part_path(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{}", target),
    }
}

/// Decode a cell reference's letter prefix ("AB3" → 27) into a zero-based
/// column index, base-26 over A=1 … Z=26. A reference with no letters maps
/// to column 0.
fn column_index(cell_ref: &str) -> usize {
    let mut idx: usize = 0;
    for ch in cell_ref.chars() {
        if !ch.is_ascii_alphabetic() {
            break;
        }
        idx = idx * 26 + (ch.to_ascii_uppercase() as usize - 'A' as usize + 1);
    }
    idx.saturating_sub(1)
}

/// Each `<si>` entry is the concatenation of all its `<t>` text runs;
/// rich-text formatting is discarded, only text survives.
fn parse_shared_strings(bytes: &[u8]) -> Result<Vec<String>> {
    let mut reader = Reader::from_reader(bytes);
    let mut buf = Vec::new();
    let mut strings = Vec::new();
    let mut current = String::new();
    let mut in_text = false;

    loop {
        match reader
            .read_event_into(&mut buf)
            .context("parsing shared-string table")?
        {
            Event::Start(e) => match e.local_name().as_ref() {
                b"si" => current.clear(),
                b"t" => in_text = true,
                _ => {}
            },
            Event::Text(e) if in_text => {
                current.push_str(&e.unescape().unwrap_or_default());
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"si" => strings.push(std::mem::take(&mut current)),
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(strings)
}

/// Ordered `(sheet name, relationship id)` pairs from the workbook manifest.
fn parse_workbook_sheets(bytes: &[u8]) -> Result<Vec<(String, String)>> {
    let mut reader = Reader::from_reader(bytes);
    let mut buf = Vec::new();
    let mut sheets = Vec::new();

    loop {
        match reader
            .read_event_into(&mut buf)
            .context("parsing workbook manifest")?
        {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sheet" => {
                let mut name = String::new();
                let mut rel_id = String::new();
                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"name" => name = String::from_utf8_lossy(&attr.value).into_owned(),
                        b"r:id" => rel_id = String::from_utf8_lossy(&attr.value).into_owned(),
                        _ => {}
                    }
                }
                sheets.push((name, rel_id));
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(sheets)
}

/// Relationship id → package-relative part path.
fn parse_relationships(bytes: &[u8]) -> Result<HashMap<String, String>> {
    let mut reader = Reader::from_reader(bytes);
    let mut buf = Vec::new();
    let mut targets = HashMap::new();

    loop {
        match reader
            .read_event_into(&mut buf)
            .context("parsing workbook relationships")?
        {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                let mut id = String::new();
                let mut target = String::new();
                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"Id" => id = String::from_utf8_lossy(&attr.value).into_owned(),
                        b"Target" => target = String::from_utf8_lossy(&attr.value).into_owned(),
                        _ => {}
                    }
                }
                targets.insert(id, target);
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(targets)
}

#[derive(Clone, Copy, PartialEq)]
enum CellKind {
    /// `t="s"`: the value is an index into the shared-string table.
    Shared,
    /// `t="inlineStr"`: text runs live inside the cell's `<is>` element.
    Inline,
    /// Everything else: numeric or string text, taken as-is.
    Literal,
}

/// Walk `<row>`/`<c>` elements into a dense grid. A worksheet only
/// serializes non-empty cells, so each row is rebuilt out to the highest
/// column it references, blanks filled with `""`.
fn parse_worksheet(bytes: &[u8], shared_strings: &[String]) -> Result<Vec<Vec<String>>> {
    let mut reader = Reader::from_reader(bytes);
    let mut buf = Vec::new();

    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut cells: Vec<(usize, String)> = Vec::new();
    let mut cell_col = 0usize;
    let mut cell_kind = CellKind::Literal;
    let mut text = String::new();
    let mut in_value = false;
    let mut in_inline = false;
    let mut in_inline_text = false;

    loop {
        match reader
            .read_event_into(&mut buf)
            .context("parsing worksheet part")?
        {
            Event::Start(e) => match e.local_name().as_ref() {
                b"row" => cells.clear(),
                b"c" => {
                    let (col, kind) = read_cell_attrs(&e);
                    cell_col = col;
                    cell_kind = kind;
                    text.clear();
                }
                b"v" => in_value = true,
                b"is" => in_inline = true,
                b"t" if in_inline => in_inline_text = true,
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                // a self-closing row serializes no cells at all
                b"row" => rows.push(Vec::new()),
                // a self-closing cell carries no value
                b"c" => {
                    let (col, _) = read_cell_attrs(&e);
                    cells.push((col, String::new()));
                }
                _ => {}
            },
            Event::Text(e) if in_value || in_inline_text => {
                text.push_str(&e.unescape().unwrap_or_default());
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"v" => in_value = false,
                b"t" => in_inline_text = false,
                b"is" => in_inline = false,
                b"c" => {
                    let value = decode_cell(cell_kind, &text, shared_strings);
                    cells.push((cell_col, value));
                    text.clear();
                }
                b"row" => {
                    let width = cells.iter().map(|(col, _)| col + 1).max().unwrap_or(0);
                    let mut dense = vec![String::new(); width];
                    for (col, value) in cells.drain(..) {
                        dense[col] = value;
                    }
                    rows.push(dense);
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(rows)
}

fn read_cell_attrs(e: &quick_xml::events::BytesStart<'_>) -> (usize, CellKind) {
    let mut col = 0usize;
    let mut kind = CellKind::Literal;
    for attr in e.attributes().flatten() {
        match attr.key.as_ref() {
            b"r" => col = column_index(&String::from_utf8_lossy(&attr.value)),
            b"t" => {
                kind = match attr.value.as_ref() {
                    b"s" => CellKind::Shared,
                    b"inlineStr" => CellKind::Inline,
                    _ => CellKind::Literal,
                }
            }
            _ => {}
        }
    }
    (col, kind)
}

fn decode_cell(kind: CellKind, text: &str, shared_strings: &[String]) -> String {
    match kind {
        CellKind::Shared => text
            .trim()
            .parse::<usize>()
            .ok()
            .and_then(|idx| shared_strings.get(idx))
            .cloned()
            .unwrap_or_default(),
        CellKind::Inline | CellKind::Literal => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use tempfile::NamedTempFile;
    use zip::write::FileOptions;
    use zip::CompressionMethod;

    const WORKBOOK_XML: &str = r#"<?xml version="1.0"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"
          xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <sheets>
    <sheet name="BD" sheetId="1" r:id="rId1"/>
    <sheet name="Notas" sheetId="2" r:id="rId2"/>
  </sheets>
</workbook>"#;

    const RELS_XML: &str = r#"<?xml version="1.0"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet2.xml"/>
</Relationships>"#;

    const SHARED_XML: &str = r#"<?xml version="1.0"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="3" uniqueCount="3">
  <si><t>Ap2020</t></si>
  <si><r><t>Ali</t></r><r><t>ce</t></r></si>
  <si><t xml:space="preserve">El Bar</t></si>
</sst>"#;

    const SHEET1_XML: &str = r#"<?xml version="1.0"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <sheetData>
    <row r="1">
      <c r="A1" t="s"><v>0</v></c>
      <c r="C1"><v>43904</v></c>
      <c r="D1" t="inlineStr"><is><t>Fecha 1</t></is></c>
    </row>
    <row r="2"/>
    <row r="3">
      <c r="B3" t="s"><v>1</v></c>
      <c r="AB3" t="s"><v>2</v></c>
    </row>
  </sheetData>
</worksheet>"#;

    fn build_package(parts: &[(&str, &str)]) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(Cursor::new(&mut buf));
            let options: FileOptions<'_, ()> =
                FileOptions::default().compression_method(CompressionMethod::Stored);
            for (name, xml) in parts {
                zip.start_file(*name, options.clone()).unwrap();
                zip.write_all(xml.as_bytes()).unwrap();
            }
            zip.finish().unwrap();
        }
        buf
    }

    fn standard_package() -> Vec<u8> {
        build_package(&[
            ("xl/workbook.xml", WORKBOOK_XML),
            ("xl/_rels/workbook.xml.rels", RELS_XML),
            ("xl/sharedStrings.xml", SHARED_XML),
            ("xl/worksheets/sheet1.xml", SHEET1_XML),
            ("xl/worksheets/sheet2.xml", "<worksheet><sheetData/></worksheet>"),
        ])
    }

    fn write_tmp(bytes: &[u8]) -> NamedTempFile {
        let mut tmp = NamedTempFile::new().unwrap();
        tmp.write_all(bytes).unwrap();
        tmp
    }

    #[test]
    fn column_index_decodes_base26() {
        assert_eq!(column_index("A1"), 0);
        assert_eq!(column_index("Z9"), 25);
        assert_eq!(column_index("AA1"), 26);
        assert_eq!(column_index("AB3"), 27);
    }

    #[test]
    fn loads_dense_grid_with_shared_and_inline_strings() {
        let tmp = write_tmp(&standard_package());
        let rows = load_sheet_rows(tmp.path(), "BD").unwrap();

        assert_eq!(rows.len(), 3);
        // sparse B1 reconstructed as blank, literal number kept as text
        assert_eq!(rows[0], vec!["Ap2020", "", "43904", "Fecha 1"]);
        // row with no cells becomes an empty array
        assert!(rows[1].is_empty());
        // rich-text shared string concatenated; AB resolves to column 27
        assert_eq!(rows[2].len(), 28);
        assert_eq!(rows[2][1], "Alice");
        assert_eq!(rows[2][27], "El Bar");
    }

    #[test]
    fn unknown_sheet_name_is_fatal() {
        let tmp = write_tmp(&standard_package());
        let err = load_sheet_rows(tmp.path(), "NoExiste").unwrap_err();
        assert!(err.to_string().contains("not found in workbook"));
    }

    #[test]
    fn missing_workbook_part_is_fatal() {
        let bytes = build_package(&[("xl/worksheets/sheet1.xml", SHEET1_XML)]);
        let tmp = write_tmp(&bytes);
        assert!(load_sheet_rows(tmp.path(), "BD").is_err());
    }

    #[test]
    fn package_without_shared_strings_still_loads() {
        let bytes = build_package(&[
            ("xl/workbook.xml", WORKBOOK_XML),
            ("xl/_rels/workbook.xml.rels", RELS_XML),
            (
                "xl/worksheets/sheet1.xml",
                r#"<worksheet><sheetData><row r="1"><c r="A1"><v>7</v></c></row></sheetData></worksheet>"#,
            ),
            ("xl/worksheets/sheet2.xml", "<worksheet/>"),
        ]);
        let tmp = write_tmp(&bytes);
        let rows = load_sheet_rows(tmp.path(), "BD").unwrap();
        assert_eq!(rows, vec![vec!["7".to_string()]]);
    }

    #[test]
    fn out_of_range_shared_index_degrades_to_blank() {
        let sheet = r#"<worksheet><sheetData><row r="1"><c r="A1" t="s"><v>99</v></c></row></sheetData></worksheet>"#;
        let bytes = build_package(&[
            ("xl/workbook.xml", WORKBOOK_XML),
            ("xl/_rels/workbook.xml.rels", RELS_XML),
            ("xl/sharedStrings.xml", SHARED_XML),
            ("xl/worksheets/sheet1.xml", sheet),
            ("xl/worksheets/sheet2.xml", "<worksheet/>"),
        ]);
        let tmp = write_tmp(&bytes);
        let rows = load_sheet_rows(tmp.path(), "BD").unwrap();
        assert_eq!(rows, vec![vec!["".to_string()]]);
    }
}
