//! Serializes a [`Grid`] as a fresh single-worksheet `.xlsx` package.
//!
//! Only values are written: every cell becomes an inline string or a number, with no shared
//! strings, formulas or styling beyond the mandatory default style.

use crate::error::RustyRulesError;
use crate::grid::CellValue;
use crate::grid::Grid;
use crate::helpers::reference::index_to_reference;
use crate::helpers::xml::XmlWriter;
use crate::helpers::zip::PackageWriter;
use std::io::Cursor;

const NS_MAIN: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const NS_RELATIONSHIPS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="xml" ContentType="application/xml"/>
  <Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
  <Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>
  <Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>
</Types>
"#;

const PACKAGE_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>
"#;

const WORKBOOK_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
</Relationships>
"#;

const STYLES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <fonts count="1"><font><sz val="11"/><name val="Calibri"/></font></fonts>
  <fills count="1"><fill><patternFill patternType="none"/></fill></fills>
  <borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders>
  <cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs>
  <cellXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/></cellXfs>
  <cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles>
</styleSheet>
"#;

/// Excel rejects sheet names longer than 31 characters or containing `[]:*?/\`.
fn sheet_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\'))
        .take(31)
        .collect();
    if cleaned.trim().is_empty() {
        "Sheet1".to_owned()
    } else {
        cleaned
    }
}

/// Writes the grid as an `.xlsx` package and returns its bytes.
///
/// Identical grids always produce byte-identical packages.
pub fn write_xlsx(grid: &Grid) -> Result<Vec<u8>, RustyRulesError> {
    let mut package = PackageWriter::new(Cursor::new(Vec::new()));
    package.part("[Content_Types].xml", CONTENT_TYPES_XML.as_bytes())?;
    package.part("_rels/.rels", PACKAGE_RELS_XML.as_bytes())?;
    package.part("xl/workbook.xml", &workbook_xml(&sheet_name(&grid.name))?)?;
    package.part("xl/_rels/workbook.xml.rels", WORKBOOK_RELS_XML.as_bytes())?;
    package.part("xl/styles.xml", STYLES_XML.as_bytes())?;
    package.part("xl/worksheets/sheet1.xml", &worksheet_xml(grid)?)?;
    Ok(package.finish()?.into_inner())
}

fn workbook_xml(sheet_name: &str) -> Result<Vec<u8>, RustyRulesError> {
    let mut xml = XmlWriter::new()?;
    xml.start("workbook", &[("xmlns", NS_MAIN), ("xmlns:r", NS_RELATIONSHIPS)])?;
    xml.start("sheets", &[])?;
    xml.empty("sheet", &[("name", sheet_name), ("sheetId", "1"), ("r:id", "rId1")])?;
    xml.end("sheets")?;
    xml.end("workbook")?;
    Ok(xml.finish())
}

fn worksheet_xml(grid: &Grid) -> Result<Vec<u8>, RustyRulesError> {
    let mut xml = XmlWriter::new()?;
    xml.start("worksheet", &[("xmlns", NS_MAIN), ("xmlns:r", NS_RELATIONSHIPS)])?;
    if grid.row_count() > 0 {
        let dimension = format!("A1:{}", index_to_reference(grid.row_count(), grid.column_count()));
        xml.empty("dimension", &[("ref", dimension.as_str())])?;
    }
    xml.start("sheetData", &[])?;
    let mut open_row = None::<usize>;
    for (row, col, value) in grid.cells() {
        if open_row != Some(row) {
            if open_row.is_some() {
                xml.end("row")?;
            }
            xml.start("row", &[("r", row.to_string().as_str())])?;
            open_row = Some(row);
        }
        write_cell(&mut xml, &index_to_reference(row, col), value)?;
    }
    if open_row.is_some() {
        xml.end("row")?;
    }
    xml.end("sheetData")?;
    xml.end("worksheet")?;
    Ok(xml.finish())
}

fn write_cell(xml: &mut XmlWriter, reference: &str, value: &CellValue) -> Result<(), RustyRulesError> {
    match value {
        CellValue::Empty => {}
        CellValue::Number(_) => {
            xml.start("c", &[("r", reference)])?;
            xml.start("v", &[])?;
            xml.text(&value.to_string())?;
            xml.end("v")?;
            xml.end("c")?;
        }
        CellValue::Boolean(flag) => {
            xml.start("c", &[("r", reference), ("t", "b")])?;
            xml.start("v", &[])?;
            xml.text(if *flag { "1" } else { "0" })?;
            xml.end("v")?;
            xml.end("c")?;
        }
        CellValue::Text(text) => {
            xml.start("c", &[("r", reference), ("t", "inlineStr")])?;
            xml.start("is", &[])?;
            if text.trim() != text {
                xml.start("t", &[("xml:space", "preserve")])?;
            } else {
                xml.start("t", &[])?;
            }
            xml.text(text)?;
            xml.end("t")?;
            xml.end("is")?;
            xml.end("c")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::xlsx::read_first_sheet;

    #[test]
    fn written_grid_reads_back() {
        let mut grid = Grid::new("Offers");
        grid.set(1, 1, "RuleSet");
        grid.set(1, 2, "com.example <rules> & more");
        grid.set(11, 2, 30.0);
        grid.set(11, 3, CellValue::Boolean(false));
        grid.set(12, 28, "  padded  ");

        let bytes = write_xlsx(&grid).unwrap();
        let read = read_first_sheet(&bytes).unwrap();
        assert_eq!(read, grid);
    }

    #[test]
    fn empty_grid_is_still_a_workbook() {
        let bytes = write_xlsx(&Grid::new("")).unwrap();
        let read = read_first_sheet(&bytes).unwrap();
        assert_eq!(read.name, "Sheet1");
        assert!(read.is_empty());
    }

    #[test]
    fn sheet_names_are_sanitized() {
        assert_eq!(sheet_name("Rules"), "Rules");
        assert_eq!(sheet_name("a/b:c"), "abc");
        assert_eq!(sheet_name(&"x".repeat(40)).len(), 31);
        assert_eq!(sheet_name("[]"), "Sheet1");
    }
}
