//! Reading and writing attribute-sorted result lists
//!
//! The wire format is one item per line, tab-separated:
//!
//! ```text
//! <id>\t<attribute>\t<relevance>\n
//! ```
//!
//! When a list arrives on a stream shared with other lists (stdin), it is
//! preceded by a line holding its item count; a list read from its own
//! file is consumed until EOF instead. Items with relevance <= 0 carry no
//! gain and are dropped at the door. If the attributes are not already
//! ascending, the list is stably re-sorted with one permutation applied to
//! ids, attributes, and relevances alike.

use std::io::{BufRead, Write};

use crate::errors::{FilteringError, Result};
use crate::types::Relevance;

/// A parsed result list: three parallel columns in attribute order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultsList {
    /// Item identifiers, opaque to the core
    pub ids: Vec<String>,
    /// The attribute the list is sorted by
    pub attributes: Vec<f64>,
    /// Non-negative relevance estimates
    pub relevances: Vec<Relevance>,
}

impl ResultsList {
    /// Assemble a list from its columns, which must have equal lengths
    pub fn new(ids: Vec<String>, attributes: Vec<f64>, relevances: Vec<Relevance>) -> Result<Self> {
        if ids.len() != attributes.len() || attributes.len() != relevances.len() {
            return Err(FilteringError::input_format(
                "ids, attributes and relevances must have the same size",
            ));
        }
        Ok(Self {
            ids,
            attributes,
            relevances,
        })
    }

    /// Number of items in the list
    pub fn len(&self) -> usize {
        self.relevances.len()
    }

    /// Check whether the list has no items
    pub fn is_empty(&self) -> bool {
        self.relevances.is_empty()
    }
}

/// Compute the permutation that stably sorts `values` by `compare`.
pub fn sort_permutation<T, F>(values: &[T], compare: F) -> Vec<usize>
where
    F: Fn(&T, &T) -> std::cmp::Ordering,
{
    let mut permutation: Vec<usize> = (0..values.len()).collect();
    permutation.sort_by(|&a, &b| compare(&values[a], &values[b]));
    permutation
}

/// Apply a permutation in place by walking its cycles, so no second
/// buffer of the element type is needed.
pub fn apply_permutation_in_place<T>(values: &mut [T], permutation: &[usize]) {
    let mut done = vec![false; values.len()];
    for i in 0..values.len() {
        if done[i] {
            continue;
        }
        done[i] = true;
        let mut prev = i;
        let mut j = permutation[i];
        while i != j {
            values.swap(prev, j);
            done[j] = true;
            prev = j;
            j = permutation[j];
        }
    }
}

/// Read one result list.
///
/// With `counted` set, the first line must hold the number of items and
/// exactly that many lines follow; otherwise the reader consumes lines
/// until EOF. Items with relevance <= 0 are discarded, and the list is
/// re-sorted by attribute if needed.
pub fn read_results_list<R: BufRead>(reader: &mut R, counted: bool) -> Result<ResultsList> {
    let expected = if counted {
        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 {
            return Err(FilteringError::input_format(
                "unable to extract the number of rows",
            ));
        }
        let count: usize = line.trim().parse().map_err(|_| {
            FilteringError::input_format(format!(
                "unable to extract the number of rows from '{}'",
                line.trim()
            ))
        })?;
        Some(count)
    } else {
        None
    };

    let mut ids = Vec::new();
    let mut attributes: Vec<f64> = Vec::new();
    let mut relevances: Vec<Relevance> = Vec::new();
    if let Some(count) = expected {
        ids.reserve(count);
        attributes.reserve(count);
        relevances.reserve(count);
    }

    let mut is_sorted = true;
    let mut last_attribute = f64::MIN;
    let mut row = 0usize;
    let mut line = String::new();
    loop {
        if let Some(count) = expected {
            if row == count {
                break;
            }
        }
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            match expected {
                // A file list simply ends.
                None => break,
                Some(count) => {
                    return Err(FilteringError::input_format(format!(
                        "expected {count} rows but the input ended after {row}"
                    )));
                }
            }
        }
        row += 1;

        let trimmed = line.trim_end_matches(['\n', '\r']);
        if trimmed.is_empty() && expected.is_none() {
            continue;
        }
        let mut fields = trimmed.split('\t');
        let (id, attribute_field, relevance_field) =
            match (fields.next(), fields.next(), fields.next(), fields.next()) {
                (Some(id), Some(attribute), Some(relevance), None) => (id, attribute, relevance),
                _ => {
                    return Err(FilteringError::input_format(format!(
                        "row {row}: expected id, attribute and relevance separated by tabs, got '{trimmed}'"
                    )));
                }
            };
        let attribute: f64 = attribute_field.parse().map_err(|_| {
            FilteringError::input_format(format!(
                "row {row}: unable to extract the attribute value from '{attribute_field}'"
            ))
        })?;
        let relevance: Relevance = relevance_field.parse().map_err(|_| {
            FilteringError::input_format(format!(
                "row {row}: unable to extract the relevance value from '{relevance_field}'"
            ))
        })?;

        if attribute < last_attribute {
            is_sorted = false;
        }
        last_attribute = attribute;

        if relevance > 0.0 {
            ids.push(id.to_string());
            attributes.push(attribute);
            relevances.push(relevance);
        }
    }

    if !is_sorted {
        let permutation = sort_permutation(&attributes, |a, b| {
            a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal)
        });
        apply_permutation_in_place(&mut ids, &permutation);
        apply_permutation_in_place(&mut attributes, &permutation);
        apply_permutation_in_place(&mut relevances, &permutation);
    }

    ResultsList::new(ids, attributes, relevances)
}

/// Write a result list in the wire format, optionally preceded by its
/// item count.
pub fn write_results_list<W: Write>(
    writer: &mut W,
    list: &ResultsList,
    with_count: bool,
) -> Result<()> {
    if with_count {
        writeln!(writer, "{}", list.len())?;
    }
    for i in 0..list.len() {
        writeln!(
            writer,
            "{}\t{}\t{}",
            list.ids[i], list.attributes[i], list.relevances[i]
        )?;
    }
    Ok(())
}
