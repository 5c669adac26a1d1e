//! Parsers for the interactive prompts
//!
//! Items are separated by `;`. Edges and hyperedges are written as
//! parenthesized, comma-separated tuples: `(KNOWS,Alice,Bob); (LIKES,Bob,Carol)`.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("'{0}' is not wrapped in parentheses")]
    NotATuple(String),

    #[error("'{input}' must have the form (relationship,start,end), found {found} field(s)")]
    EdgeArity { input: String, found: usize },

    #[error("'{0}' has an empty field")]
    EmptyField(String),
}

/// An edge as typed by the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeSpec {
    pub relationship: String,
    pub start: String,
    pub end: String,
}

/// `a; b ;; c` → `[a, b, c]`, first occurrence order, no duplicates
pub fn parse_nodes(input: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for name in input.split(';').map(str::trim).filter(|n| !n.is_empty()) {
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

/// `(rel,start,end); ...` → edge triples
pub fn parse_edges(input: &str) -> Result<Vec<EdgeSpec>, ParseError> {
    tuples(input)?
        .into_iter()
        .map(|(raw, fields)| match fields.as_slice() {
            [relationship, start, end] => Ok(EdgeSpec {
                relationship: relationship.clone(),
                start: start.clone(),
                end: end.clone(),
            }),
            _ => Err(ParseError::EdgeArity {
                input: raw,
                found: fields.len(),
            }),
        })
        .collect()
}

/// `(a,b,c); ...` → member name lists
pub fn parse_hyper_edges(input: &str) -> Result<Vec<Vec<String>>, ParseError> {
    Ok(tuples(input)?.into_iter().map(|(_, fields)| fields).collect())
}

fn tuples(input: &str) -> Result<Vec<(String, Vec<String>)>, ParseError> {
    input
        .split(';')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            let inner = item
                .strip_prefix('(')
                .and_then(|rest| rest.strip_suffix(')'))
                .ok_or_else(|| ParseError::NotATuple(item.to_string()))?;
            let fields: Vec<String> = inner.split(',').map(|f| f.trim().to_string()).collect();
            if fields.iter().any(String::is_empty) {
                return Err(ParseError::EmptyField(item.to_string()));
            }
            Ok((item.to_string(), fields))
        })
        .collect()
}
