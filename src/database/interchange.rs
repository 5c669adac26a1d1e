//! Bulk interchange files
//!
//! Two layouts exist, one per backend family:
//!
//! | layout    | delimiter | nodes header         | edges header                              |
//! |-----------|-----------|----------------------|-------------------------------------------|
//! | `Labeled` | `,`       | `labels,properties`  | `start_name,end_name,type,properties`     |
//! | `Table`   | `\|`      | `name`               | `start_name\|end_name`                    |
//!
//! In the labeled layout `labels` holds a literal list (`['Node']`) and
//! `properties` a literal mapping (`{'name': 'Alice'}`). The table layout keeps
//! names only.

use crate::database::{DatabaseError, DatabaseResult};
use crate::graph::property::{
    parse_label_list, parse_property_map, render_label_list, render_property_map,
};
use crate::graph::{EdgeType, Label, PropertyMap, PropertyValue};
use std::path::Path;

/// A node as it appears in a backend or an interchange file
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodeRecord {
    pub labels: Vec<Label>,
    pub properties: PropertyMap,
}

impl NodeRecord {
    pub fn new(labels: Vec<Label>, properties: PropertyMap) -> Self {
        Self { labels, properties }
    }

    /// Record carrying only a `name` property
    pub fn named(name: impl Into<String>) -> Self {
        let mut properties = PropertyMap::new();
        properties.insert("name".to_string(), PropertyValue::String(name.into()));
        Self {
            labels: Vec::new(),
            properties,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.properties.get("name").and_then(PropertyValue::as_string)
    }
}

/// A relationship as it appears in a backend or an interchange file
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeRecord {
    pub start_name: String,
    pub end_name: String,
    /// `None` when the source does not keep relationship types
    pub relationship_type: Option<EdgeType>,
    pub properties: PropertyMap,
}

impl EdgeRecord {
    pub fn new(
        start_name: impl Into<String>,
        end_name: impl Into<String>,
        relationship_type: Option<EdgeType>,
    ) -> Self {
        Self {
            start_name: start_name.into(),
            end_name: end_name.into(),
            relationship_type,
            properties: PropertyMap::new(),
        }
    }
}

/// File layout of an interchange file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    Labeled,
    Table,
}

impl Layout {
    pub fn delimiter(self) -> u8 {
        match self {
            Layout::Labeled => b',',
            Layout::Table => b'|',
        }
    }

    pub fn node_header(self) -> &'static [&'static str] {
        match self {
            Layout::Labeled => &["labels", "properties"],
            Layout::Table => &["name"],
        }
    }

    pub fn edge_header(self) -> &'static [&'static str] {
        match self {
            Layout::Labeled => &["start_name", "end_name", "type", "properties"],
            Layout::Table => &["start_name", "end_name"],
        }
    }
}

fn interchange_error(path: &Path, message: impl Into<String>) -> DatabaseError {
    DatabaseError::Interchange {
        file: path.display().to_string(),
        message: message.into(),
    }
}

fn writer(path: &Path, layout: Layout) -> DatabaseResult<csv::Writer<std::fs::File>> {
    Ok(csv::WriterBuilder::new()
        .delimiter(layout.delimiter())
        .from_path(path)?)
}

fn reader(path: &Path, layout: Layout) -> DatabaseResult<csv::Reader<std::fs::File>> {
    Ok(csv::ReaderBuilder::new()
        .delimiter(layout.delimiter())
        .has_headers(true)
        .from_path(path)?)
}

fn column(headers: &csv::StringRecord, name: &str, path: &Path) -> DatabaseResult<usize> {
    headers
        .iter()
        .position(|h| h.trim() == name)
        .ok_or_else(|| interchange_error(path, format!("missing column '{}'", name)))
}

fn optional_column(headers: &csv::StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h.trim() == name)
}

fn required_cell<'r>(
    row: &'r csv::StringRecord,
    index: usize,
    column: &str,
    line: usize,
    path: &Path,
) -> DatabaseResult<&'r str> {
    match row.get(index) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(interchange_error(path, format!("line {}: empty '{}'", line, column))),
    }
}

/// Write node records, returning the number of data rows
pub fn write_nodes(path: &Path, layout: Layout, records: &[NodeRecord]) -> DatabaseResult<usize> {
    let mut wtr = writer(path, layout)?;
    wtr.write_record(layout.node_header())?;
    for record in records {
        match layout {
            Layout::Labeled => wtr.write_record([
                render_label_list(&record.labels),
                render_property_map(&record.properties),
            ])?,
            Layout::Table => {
                let name = record
                    .name()
                    .ok_or_else(|| DatabaseError::MissingProperty("name".to_string()))?;
                wtr.write_record([name])?;
            }
        }
    }
    wtr.flush()?;
    Ok(records.len())
}

/// Write edge records, returning the number of data rows
pub fn write_edges(path: &Path, layout: Layout, records: &[EdgeRecord]) -> DatabaseResult<usize> {
    let mut wtr = writer(path, layout)?;
    wtr.write_record(layout.edge_header())?;
    for record in records {
        match layout {
            Layout::Labeled => wtr.write_record([
                record.start_name.clone(),
                record.end_name.clone(),
                record
                    .relationship_type
                    .as_ref()
                    .map(|t| t.as_str().to_string())
                    .unwrap_or_default(),
                render_property_map(&record.properties),
            ])?,
            Layout::Table => {
                wtr.write_record([record.start_name.as_str(), record.end_name.as_str()])?
            }
        }
    }
    wtr.flush()?;
    Ok(records.len())
}

/// Read node records
pub fn read_nodes(path: &Path, layout: Layout) -> DatabaseResult<Vec<NodeRecord>> {
    let mut rdr = reader(path, layout)?;
    let headers = rdr.headers()?.clone();
    let mut records = Vec::new();

    match layout {
        Layout::Labeled => {
            let labels_col = column(&headers, "labels", path)?;
            let props_col = column(&headers, "properties", path)?;
            for (i, row) in rdr.records().enumerate() {
                let row = row?;
                let line = i + 2;
                let labels = parse_label_list(row.get(labels_col).unwrap_or_default())
                    .map_err(|e| interchange_error(path, format!("line {}: labels: {}", line, e)))?;
                let properties = parse_property_map(row.get(props_col).unwrap_or_default())
                    .map_err(|e| {
                        interchange_error(path, format!("line {}: properties: {}", line, e))
                    })?;
                records.push(NodeRecord::new(labels, properties));
            }
        }
        Layout::Table => {
            let name_col = column(&headers, "name", path)?;
            for (i, row) in rdr.records().enumerate() {
                let row = row?;
                let name = required_cell(&row, name_col, "name", i + 2, path)?;
                records.push(NodeRecord::named(name));
            }
        }
    }

    Ok(records)
}

/// Read edge records
pub fn read_edges(path: &Path, layout: Layout) -> DatabaseResult<Vec<EdgeRecord>> {
    let mut rdr = reader(path, layout)?;
    let headers = rdr.headers()?.clone();
    let start_col = column(&headers, "start_name", path)?;
    let end_col = column(&headers, "end_name", path)?;
    let (type_col, props_col) = match layout {
        Layout::Labeled => (
            Some(column(&headers, "type", path)?),
            optional_column(&headers, "properties"),
        ),
        Layout::Table => (None, None),
    };

    let mut records = Vec::new();
    for (i, row) in rdr.records().enumerate() {
        let row = row?;
        let line = i + 2;
        let start = required_cell(&row, start_col, "start_name", line, path)?;
        let end = required_cell(&row, end_col, "end_name", line, path)?;
        let relationship_type = type_col
            .and_then(|col| row.get(col))
            .filter(|t| !t.is_empty())
            .map(EdgeType::new);
        let properties = match props_col.and_then(|col| row.get(col)) {
            Some(text) => parse_property_map(text).map_err(|e| {
                interchange_error(path, format!("line {}: properties: {}", line, e))
            })?,
            None => PropertyMap::new(),
        };

        let mut record = EdgeRecord::new(start, end, relationship_type);
        record.properties = properties;
        records.push(record);
    }

    Ok(records)
}
