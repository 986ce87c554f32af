//! Module providing reading and writing of SBtab documents
//!
//! An SBtab document is a tab-separated text file made of named tables:
//! ```text
//! !!!SBtab Document='pathway' SBtabVersion='1.0'
//! !!SBtab TableID='Reaction' TableType='Reaction'
//! !ID	!ReactionFormula
//! R1	A <=> B
//! ```
use std::fmt::Write as _;
use std::fs;
use std::io::Read;
use std::path::Path;

use indexmap::IndexMap;
use thiserror::Error;

const DOCUMENT_PREFIX: &str = "!!!SBtab";
const TABLE_PREFIX: &str = "!!SBtab";

// region SBtab Table
/// A single table of an SBtab document
#[derive(Debug, Clone, PartialEq)]
pub struct SbtabTable {
    /// Table attributes from the `!!SBtab` header line, such as TableID, TableType and Unit
    attributes: IndexMap<String, String>,
    /// Column names, without the leading `!`
    columns: Vec<String>,
    /// Rows of cells, each row has exactly one cell per column
    rows: Vec<Vec<String>>,
}

impl SbtabTable {
    /// Create a new empty table
    ///
    /// # Examples
    /// ```rust
    /// use pathway_core::io::sbtab::SbtabTable;
    /// let mut table = SbtabTable::new("Reaction", "Reaction", &["ID", "ReactionFormula"]);
    /// table.add_row(&["R1", "A <=> B"]);
    /// assert_eq!(table.get(0, "ReactionFormula"), Some("A <=> B"));
    /// ```
    pub fn new(table_id: &str, table_type: &str, columns: &[&str]) -> Self {
        let mut attributes = IndexMap::new();
        attributes.insert("TableID".to_string(), table_id.to_string());
        attributes.insert("TableType".to_string(), table_type.to_string());
        SbtabTable {
            attributes,
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    /// Identifier of the table (the TableID attribute)
    pub fn id(&self) -> &str {
        self.attribute("TableID").unwrap_or_default()
    }

    /// Type of the table (the TableType attribute)
    pub fn table_type(&self) -> Option<&str> {
        self.attribute("TableType")
    }

    /// Get an attribute from the table header
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(|v| v.as_str())
    }

    /// Set an attribute on the table header
    pub fn set_attribute(&mut self, key: &str, value: &str) {
        self.attributes.insert(key.to_string(), value.to_string());
    }

    /// Column names of the table
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Position of a column, None if the table doesn't have it
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Whether the table has a column with this name
    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Rows of the table
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Number of rows in the table
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Append a row, missing trailing cells are filled with empty strings and extra cells are
    /// dropped
    pub fn add_row<S: AsRef<str>>(&mut self, cells: &[S]) {
        let mut row: Vec<String> = cells
            .iter()
            .take(self.columns.len())
            .map(|c| c.as_ref().to_string())
            .collect();
        row.resize(self.columns.len(), String::new());
        self.rows.push(row);
    }

    /// Get the cell at `row` in the named column
    pub fn get(&self, row: usize, column: &str) -> Option<&str> {
        let col = self.column_index(column)?;
        self.rows.get(row).map(|r| r[col].as_str())
    }

    /// All values of a column, in row order
    pub fn column_values(&self, column: &str) -> Option<Vec<&str>> {
        let col = self.column_index(column)?;
        Some(self.rows.iter().map(|r| r[col].as_str()).collect())
    }

    fn header_line(&self) -> String {
        let mut line = String::from(TABLE_PREFIX);
        for (key, value) in &self.attributes {
            // Writing to a String can't fail
            let _ = write!(line, " {}='{}'", key, value);
        }
        line
    }
}
// endregion SBtab Table

// region SBtab Document
/// A parsed SBtab document, holding its tables in file order
#[derive(Debug, Clone, PartialEq)]
pub struct SbtabDocument {
    /// Internal name of the document
    pub name: String,
    /// Filename the document was read from (or will be written to)
    pub filename: String,
    /// Attributes of the `!!!SBtab` document header line
    attributes: IndexMap<String, String>,
    /// Tables keyed by TableID
    tables: IndexMap<String, SbtabTable>,
}

impl SbtabDocument {
    /// Create an empty document
    pub fn new(name: &str, filename: &str) -> Self {
        let mut attributes = IndexMap::new();
        attributes.insert("Document".to_string(), name.to_string());
        attributes.insert("SBtabVersion".to_string(), "1.0".to_string());
        SbtabDocument {
            name: name.to_string(),
            filename: filename.to_string(),
            attributes,
            tables: IndexMap::new(),
        }
    }

    /// Parse the text of an SBtab document
    ///
    /// # Parameters
    /// - `name`: internal identifier for the document
    /// - `content`: the tab-separated document text
    /// - `filename`: filename hint, only used for reporting
    pub fn from_str(name: &str, content: &str, filename: &str) -> Result<Self, SbtabError> {
        let mut document = SbtabDocument::new(name, filename);
        let mut current: Option<SbtabTable> = None;
        let mut awaiting_columns = false;

        for (index, raw_line) in content.lines().enumerate() {
            let line_number = index + 1;
            let line = raw_line.trim_end_matches(['\r', '\n']);
            if line.trim().is_empty() || line.starts_with('%') {
                continue;
            }
            if line.starts_with(DOCUMENT_PREFIX) {
                let attributes = parse_attributes(&line[DOCUMENT_PREFIX.len()..], line_number)?;
                document.attributes.extend(attributes);
                continue;
            }
            if line.starts_with(TABLE_PREFIX) {
                if let Some(table) = current.take() {
                    document.finish_table(table, awaiting_columns, line_number)?;
                }
                let attributes = parse_attributes(&line[TABLE_PREFIX.len()..], line_number)?;
                if !attributes.contains_key("TableID") {
                    return Err(SbtabError::MissingTableId { line: line_number });
                }
                current = Some(SbtabTable {
                    attributes,
                    columns: Vec::new(),
                    rows: Vec::new(),
                });
                awaiting_columns = true;
                continue;
            }
            let table = match current.as_mut() {
                Some(table) => table,
                None => return Err(SbtabError::RowOutsideTable { line: line_number }),
            };
            let mut cells: Vec<&str> = line.split('\t').collect();
            if awaiting_columns {
                if !line.starts_with('!') {
                    return Err(SbtabError::MissingColumns {
                        table: table.id().to_string(),
                        line: line_number,
                    });
                }
                while cells.last().is_some_and(|c| c.trim().is_empty()) {
                    cells.pop();
                }
                table.columns = cells
                    .iter()
                    .map(|c| c.trim().trim_start_matches('!').to_string())
                    .collect();
                awaiting_columns = false;
                continue;
            }
            while cells.len() > table.columns.len() && cells.last().is_some_and(|c| c.trim().is_empty()) {
                cells.pop();
            }
            if cells.len() > table.columns.len() {
                return Err(SbtabError::TooManyCells {
                    table: table.id().to_string(),
                    line: line_number,
                });
            }
            let cells: Vec<&str> = cells.iter().map(|c| c.trim()).collect();
            table.add_row(&cells);
        }
        if let Some(table) = current.take() {
            document.finish_table(table, awaiting_columns, content.lines().count())?;
        }
        Ok(document)
    }

    /// Read an SBtab document from a reader
    pub fn from_reader<R: Read>(name: &str, mut reader: R, filename: &str) -> Result<Self, SbtabError> {
        let mut content = String::new();
        reader.read_to_string(&mut content)?;
        SbtabDocument::from_str(name, &content, filename)
    }

    /// Read an SBtab document from a file, the file name is used as the document name
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self, SbtabError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let filename = path
            .file_name()
            .map(|f| f.to_string_lossy().to_string())
            .unwrap_or_default();
        let name = path
            .file_stem()
            .map(|f| f.to_string_lossy().to_string())
            .unwrap_or_default();
        SbtabDocument::from_str(&name, &content, &filename)
    }

    /// Write the document to a file
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<(), SbtabError> {
        fs::write(path, self.to_sbtab_string())?;
        Ok(())
    }

    /// Serialize the document to SBtab text
    pub fn to_sbtab_string(&self) -> String {
        let mut out = String::from(DOCUMENT_PREFIX);
        for (key, value) in &self.attributes {
            let _ = write!(out, " {}='{}'", key, value);
        }
        out.push('\n');
        for table in self.tables.values() {
            out.push_str(&table.header_line());
            out.push('\n');
            let columns: Vec<String> = table.columns.iter().map(|c| format!("!{}", c)).collect();
            out.push_str(&columns.join("\t"));
            out.push('\n');
            for row in &table.rows {
                out.push_str(&row.join("\t"));
                out.push('\n');
            }
            out.push('\n');
        }
        out
    }

    /// Get a table by its TableID
    pub fn get_table(&self, table_id: &str) -> Option<&SbtabTable> {
        self.tables.get(table_id)
    }

    /// Get a table by its TableID, or an error naming the missing table
    pub fn require_table(&self, table_id: &str) -> Result<&SbtabTable, SbtabError> {
        self.get_table(table_id)
            .ok_or_else(|| SbtabError::MissingTable(table_id.to_string()))
    }

    /// Add a table, replacing any existing table with the same id
    pub fn add_table(&mut self, table: SbtabTable) {
        self.tables.insert(table.id().to_string(), table);
    }

    /// Iterate over the tables in document order
    pub fn tables(&self) -> impl Iterator<Item = &SbtabTable> {
        self.tables.values()
    }

    /// Get a document header attribute
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(|v| v.as_str())
    }

    fn finish_table(
        &mut self,
        table: SbtabTable,
        awaiting_columns: bool,
        line: usize,
    ) -> Result<(), SbtabError> {
        if awaiting_columns {
            return Err(SbtabError::MissingColumns {
                table: table.id().to_string(),
                line,
            });
        }
        if self.tables.contains_key(table.id()) {
            return Err(SbtabError::DuplicateTable(table.id().to_string()));
        }
        self.add_table(table);
        Ok(())
    }
}
// endregion SBtab Document

/// Parse `key='value'` pairs from the remainder of a header line
fn parse_attributes(source: &str, line: usize) -> Result<IndexMap<String, String>, SbtabError> {
    let mut attributes = IndexMap::new();
    let chars: Vec<char> = source.chars().collect();
    let mut current = 0;
    while current < chars.len() {
        if chars[current].is_whitespace() {
            current += 1;
            continue;
        }
        let start = current;
        while current < chars.len() && chars[current] != '=' && !chars[current].is_whitespace() {
            current += 1;
        }
        let key: String = chars[start..current].iter().collect();
        if current >= chars.len() || chars[current] != '=' {
            return Err(SbtabError::MalformedHeader {
                line,
                reason: format!("attribute {} has no value", key),
            });
        }
        current += 1;
        let quote = match chars.get(current) {
            Some(q @ ('\'' | '"')) => *q,
            _ => {
                return Err(SbtabError::MalformedHeader {
                    line,
                    reason: format!("value of attribute {} is not quoted", key),
                })
            }
        };
        current += 1;
        let value_start = current;
        while current < chars.len() && chars[current] != quote {
            current += 1;
        }
        if current >= chars.len() {
            return Err(SbtabError::MalformedHeader {
                line,
                reason: format!("unterminated value for attribute {}", key),
            });
        }
        let value: String = chars[value_start..current].iter().collect();
        attributes.insert(key, value);
        current += 1;
    }
    Ok(attributes)
}

/// Errors from reading or writing SBtab documents
#[derive(Error, Debug)]
pub enum SbtabError {
    /// Unable to read or write the document
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// A data line appeared before any table header
    #[error("line {line}: data found before any !!SBtab table header")]
    RowOutsideTable { line: usize },
    /// A table header was not followed by a column line
    #[error("line {line}: table {table} has no !column header line")]
    MissingColumns { table: String, line: usize },
    /// A table header has no TableID attribute
    #[error("line {line}: table header has no TableID attribute")]
    MissingTableId { line: usize },
    /// A header line could not be parsed
    #[error("line {line}: malformed header, {reason}")]
    MalformedHeader { line: usize, reason: String },
    /// A row has more cells than the table has columns
    #[error("line {line}: row in table {table} has more cells than columns")]
    TooManyCells { table: String, line: usize },
    /// Two tables share the same TableID
    #[error("duplicate table id {0}")]
    DuplicateTable(String),
    /// A required table is missing from the document
    #[error("document has no table with TableID '{0}'")]
    MissingTable(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCUMENT: &str = "!!!SBtab Document='example' SBtabVersion='1.0'
!!SBtab TableID='Configuration' TableType='Config'
!Option\t!Value\t!Comment
algorithm\tMDF\tECM, or MDF
p_h\t7

% reactions of the pathway
!!SBtab TableID=\"Reaction\" TableType=\"Reaction\"
!ID\t!ReactionFormula
R1\tA <=> B
R2\tB <=> C\t
";

    #[test]
    fn parse_document() {
        let doc = SbtabDocument::from_str("pathway", DOCUMENT, "pathway.tsv").unwrap();
        assert_eq!(doc.name, "pathway");
        assert_eq!(doc.filename, "pathway.tsv");
        assert_eq!(doc.attribute("SBtabVersion"), Some("1.0"));
        assert_eq!(doc.tables().count(), 2);

        let config = doc.get_table("Configuration").unwrap();
        assert_eq!(config.table_type(), Some("Config"));
        assert_eq!(config.columns(), &["Option", "Value", "Comment"]);
        assert_eq!(config.len(), 2);
        // Short rows are padded
        assert_eq!(config.get(1, "Comment"), Some(""));

        let reactions = doc.get_table("Reaction").unwrap();
        assert_eq!(
            reactions.column_values("ReactionFormula").unwrap(),
            vec!["A <=> B", "B <=> C"]
        );
    }

    #[test]
    fn write_and_reparse() {
        let doc = SbtabDocument::from_str("pathway", DOCUMENT, "pathway.tsv").unwrap();
        let text = doc.to_sbtab_string();
        let reparsed = SbtabDocument::from_str("pathway", &text, "pathway.tsv").unwrap();
        assert_eq!(doc.tables, reparsed.tables);
    }

    #[test]
    fn write_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.tsv");
        let mut doc = SbtabDocument::new("out", "out.tsv");
        let mut table = SbtabTable::new("Flux", "Quantity", &["QuantityType", "Reaction", "Value"]);
        table.set_attribute("Unit", "mM/s");
        table.add_row(&["rate of reaction", "R1", "1"]);
        doc.add_table(table);
        doc.write(&path).unwrap();

        let read_back = SbtabDocument::read(&path).unwrap();
        let flux = read_back.require_table("Flux").unwrap();
        assert_eq!(flux.attribute("Unit"), Some("mM/s"));
        assert_eq!(flux.get(0, "Reaction"), Some("R1"));
        assert!(read_back.require_table("Compound").is_err());
    }

    #[test]
    fn errors() {
        match SbtabDocument::from_str("x", "R1\tA <=> B\n", "x.tsv") {
            Err(SbtabError::RowOutsideTable { line }) => assert_eq!(line, 1),
            _ => panic!("Row outside of table not caught"),
        }
        match SbtabDocument::from_str("x", "!!SBtab TableID='Reaction'\nR1\tA\n", "x.tsv") {
            Err(SbtabError::MissingColumns { table, line }) => {
                assert_eq!(table, "Reaction");
                assert_eq!(line, 2);
            }
            _ => panic!("Missing column line not caught"),
        }
        match SbtabDocument::from_str("x", "!!SBtab TableType='Reaction'\n!ID\n", "x.tsv") {
            Err(SbtabError::MissingTableId { .. }) => {}
            _ => panic!("Missing TableID not caught"),
        }
        match SbtabDocument::from_str("x", "!!SBtab TableID='Reaction\n!ID\n", "x.tsv") {
            Err(SbtabError::MalformedHeader { .. }) => {}
            _ => panic!("Unterminated attribute not caught"),
        }
        match SbtabDocument::from_str("x", "!!SBtab TableID='R'\n!ID\nR1\textra\n", "x.tsv") {
            Err(SbtabError::TooManyCells { .. }) => {}
            _ => panic!("Extra cells not caught"),
        }
        let duplicated = "!!SBtab TableID='R'\n!ID\n!!SBtab TableID='R'\n!ID\n";
        match SbtabDocument::from_str("x", duplicated, "x.tsv") {
            Err(SbtabError::DuplicateTable(id)) => assert_eq!(id, "R"),
            _ => panic!("Duplicate table not caught"),
        }
    }
}
