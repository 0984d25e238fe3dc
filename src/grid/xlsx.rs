use crate::error::RustyRulesError;
use crate::grid::CellValue;
use crate::grid::CodecError;
use crate::grid::Grid;
use crate::helpers::reference::reference_to_index;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::xml::XmlReader;
use crate::helpers::xml::XmlTextContextHelper;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use crate::table::FormatError;
use quick_xml::events::Event;
use quick_xml::name::QName;
use std::borrow::Cow;
use std::collections::HashMap;
use std::io::BufRead;
use std::io::Cursor;
use tracing::debug;
use zip::ZipArchive;

// XML tag names for parsing SpreadsheetML parts
const TAG_RELATIONSHIP: &[u8] = b"Relationship";     // Package relationship
const TAG_SHARED_STRING_ITEM: QName = QName(b"si");   // Shared string table item
const TAG_PHONETIC_TEXT: QName = QName(b"rPh");       // Phonetic text for Asian languages
const TAG_TEXT: QName = QName(b"t");                  // Text content within strings
const TAG_SHEET: QName = QName(b"sheet");             // Worksheet definition
const TAG_ROW: QName = QName(b"row");                 // Row in worksheet
const TAG_CELL: QName = QName(b"c");                  // Cell in worksheet
const TAG_INLINE_STRING: QName = QName(b"is");        // Inline string value
const TAG_VALUE: QName = QName(b"v");                 // Cell value content

const WORKBOOK_PATH: &str = "xl/workbook.xml";
const WORKBOOK_RELATIONSHIPS_PATH: &str = "xl/_rels/workbook.xml.rels";
const SHARED_STRINGS_PATH: &str = "xl/sharedStrings.xml";

// Worksheet size limits of the format
const MAX_ROWS: usize = 1_048_576;
const MAX_COLUMNS: usize = 16_384;

/// How a `<c>` element's value must be interpreted, from its `t` attribute.
#[derive(Copy, Clone, Debug, PartialEq)]
enum CellKind {
    Number,
    SharedString,
    InlineString,
    Boolean,
    /// Error codes and ISO dates are kept verbatim
    Literal,
}

impl CellKind {
    fn parse(kind: Option<&str>) -> Self {
        match kind {
            Some("s") => CellKind::SharedString,
            Some("inlineStr") | Some("str") => CellKind::InlineString,
            Some("b") => CellKind::Boolean,
            Some("e") | Some("d") => CellKind::Literal,
            _ => CellKind::Number,
        }
    }
}

/// Reads the first worksheet of an `.xlsx` package into a [`Grid`].
///
/// # Errors
///
/// * [`FormatError::WorksheetNotFound`] when the workbook declares no worksheet
/// * [`CodecError`] when the bytes are not a readable SpreadsheetML package
pub fn read_first_sheet(bytes: &[u8]) -> Result<Grid, RustyRulesError> {
    read_first_sheet_inner(bytes).map_err(RustyRulesError::into_codec)
}

fn read_first_sheet_inner(bytes: &[u8]) -> Result<Grid, RustyRulesError> {
    let mut zip = ZipArchive::new(Cursor::new(bytes))?;
    let sheets = load_workbook(&mut zip)?;
    let (sheet_name, zip_path) = sheets.into_iter().next().ok_or(FormatError::WorksheetNotFound)?;
    let shared_strings = load_shared_strings(&mut zip)?;
    debug!(sheet = %sheet_name, shared_strings = shared_strings.len(), "Reading worksheet");

    let mut grid = Grid::new(&sheet_name);
    let mut reader = zip.xml_reader(&zip_path)?
        .ok_or_else(|| CodecError::MissingPart(zip_path.to_owned()))?;
    let mut row_count = 0usize;
    let mut col_count = 0usize;
    let mut row = 0usize;
    let mut col = 0usize;
    let mut kind = CellKind::Number;
    let mut value = None::<String>;
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_ROW => {
            row_count = event.get_attribute_value("r")?
                .and_then(|number| number.parse::<usize>().ok())
                .unwrap_or(row_count + 1);
            col_count = 0;
        }
        Event::Start(event) if event.name() == TAG_CELL => {
            col_count += 1;
            (row, col) = event.get_attribute_value("r")?
                .and_then(|reference| reference_to_index(&reference))
                .unwrap_or((row_count, col_count));
            col_count = col;
            kind = CellKind::parse(event.get_attribute_value("t")?.as_deref());
            value = None;
        }
        Event::Start(event) if event.name() == TAG_INLINE_STRING => {
            value = Some(read_string_value(&mut reader, TAG_INLINE_STRING, false)?);
        }
        Event::Start(event) if event.name() == TAG_VALUE => {
            value = Some(read_string_value(&mut reader, TAG_VALUE, true)?);
        }
        Event::End(event) if event.name() == TAG_CELL => {
            if let Some(raw) = value.take() {
                if row > MAX_ROWS || col > MAX_COLUMNS {
                    return Err(CodecError::Xml(format!("cell at row {} column {} is outside the worksheet", row, col)).into());
                }
                grid.set(row, col, to_cell_value(kind, raw, &shared_strings)?);
            }
        }
    });
    Ok(grid)
}

/// Converts a raw `<v>`/`<is>` payload into a typed value
fn to_cell_value(kind: CellKind, raw: String, shared_strings: &[String]) -> Result<CellValue, RustyRulesError> {
    let value = match kind {
        CellKind::SharedString => {
            let index = raw.trim().parse::<usize>()?;
            let text = shared_strings.get(index)
                .ok_or_else(|| CodecError::Xml(format!("shared string {} out of range", index)))?;
            CellValue::Text(text.to_owned())
        }
        CellKind::InlineString | CellKind::Literal => CellValue::Text(raw),
        CellKind::Boolean => CellValue::Boolean(raw.trim() == "1"),
        CellKind::Number => match raw.trim().parse::<f64>() {
            Ok(number) if number.is_finite() => CellValue::Number(number),
            _ => CellValue::Text(raw),
        },
    };
    Ok(value)
}

/// Loads worksheet names and their part paths, in workbook order
fn load_workbook(zip: &mut ZipArchive<Cursor<&[u8]>>) -> Result<Vec<(String, String)>, RustyRulesError> {
    let relationships = load_relationships(zip, WORKBOOK_RELATIONSHIPS_PATH)?;
    let mut reader = zip.xml_reader(WORKBOOK_PATH)?
        .ok_or_else(|| CodecError::MissingPart(WORKBOOK_PATH.to_string()))?;
    let mut sheets: Vec<(String, String)> = Vec::new();
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_SHEET => {
            let mut name = None::<Cow<str>>;
            let mut id = None::<Cow<str>>;
            for result in event.attributes() {
                let attribute = result?;
                let key = attribute.key.local_name();
                if key.as_ref() == b"name" {
                    name = Some(attribute.unescape_value()?);
                } else if key.as_ref() == b"id" {
                    id = Some(attribute.unescape_value()?);
                }
            }
            if let Some((name, id)) = name.zip(id) {
                if let Some(path) = relationships.get(id.as_ref()) {
                    sheets.push((name.to_string(), path.to_owned()));
                }
            }
        }
    });
    Ok(sheets)
}

/// Maps relationship ids to worksheet part paths
fn load_relationships(zip: &mut ZipArchive<Cursor<&[u8]>>, path: &str) -> Result<HashMap<String, String>, RustyRulesError> {
    let mut reader = zip.xml_reader(path)?
        .ok_or_else(|| CodecError::MissingPart(path.to_string()))?;
    let mut relationships: HashMap<String, String> = HashMap::new();
    match_xml_events!(reader => {
        Event::Start(event) if event.local_name().as_ref() == TAG_RELATIONSHIP => {
            let id = event.get_attribute_value("Id")?;
            let kind = event.get_attribute_value("Type")?;
            let target = event.get_attribute_value("Target")?;
            // Only worksheet relationships matter
            if kind.map(|it| it.ends_with("/worksheet")).unwrap_or(true) {
                if let Some((id, target)) = id.zip(target) {
                    relationships.insert(id.to_string(), to_zip_path(&target));
                }
            }
        }
    });
    Ok(relationships)
}

/// Loads the shared string table; a package without one simply has no shared strings
fn load_shared_strings(zip: &mut ZipArchive<Cursor<&[u8]>>) -> Result<Vec<String>, RustyRulesError> {
    let mut shared_strings = Vec::<String>::new();
    let mut reader = match zip.xml_reader(SHARED_STRINGS_PATH)? {
        Some(reader) => reader,
        None => return Ok(shared_strings),
    };
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_SHARED_STRING_ITEM => {
            let string = read_string_value(&mut reader, TAG_SHARED_STRING_ITEM, false)?;
            shared_strings.push(string);
        }
    });
    Ok(shared_strings)
}

/// Normalizes a relationship target to a path inside the package
fn to_zip_path(path: &str) -> String {
    if let Some(stripped) = path.strip_prefix('/') {
        stripped.to_string()
    } else if path.starts_with("xl/") {
        path.to_string()
    } else {
        format!("xl/{path}")
    }
}

/// Reads string content up to `end_tag`, skipping phonetic runs.
///
/// `is_text_content` marks elements (`<v>`) whose character data is the value itself rather
/// than being wrapped in `<t>` runs.
fn read_string_value<R: BufRead>(
    reader: &mut XmlReader<R>,
    end_tag: QName,
    is_text_content: bool,
) -> Result<String, RustyRulesError> {
    let mut is_phonetic_text = false;
    let mut is_text = is_text_content;
    let mut text = String::new();
    match_xml_events!(reader => {
        Event::End(event) if event.name() == end_tag => break,
        Event::Start(event) if event.name() == TAG_PHONETIC_TEXT => is_phonetic_text = true,
        Event::End(event) if event.name() == TAG_PHONETIC_TEXT => is_phonetic_text = false,
        Event::Start(event) if !is_phonetic_text && event.name() == TAG_TEXT => is_text = true,
        Event::End(event) if is_text && event.name() == TAG_TEXT => is_text = false,
        Event::Text(event) if is_text => text.push_str(&event.xml_content()?),
        Event::CData(event) if is_text => text.push_str(&event.xml_content()?),
        Event::GeneralRef(event) if is_text => text.push_bytes_ref(&event)?,
    });
    Ok(text)
}
