use std::collections::HashMap;
use crate::filter::FilteredRecords;
use crate::record::{Metric, PoolRecord, NOT_APPLICABLE};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Layout { Rows, Columns }

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Table {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

pub fn layout_for(filtered: &FilteredRecords) -> Layout {
    if filtered.pool_filter.is_some() { Layout::Columns } else { Layout::Rows }
}

pub fn project(filtered: &FilteredRecords) -> Table {
    match layout_for(filtered) {
        Layout::Rows => project_rows(&filtered.records),
        Layout::Columns => project_columns(&filtered.records, &filtered.metrics),
    }
}

pub fn project_rows(records: &[PoolRecord]) -> Table {
    let mut header = vec!["timestamp".to_string(), "pool_name".to_string()];
    header.extend(Metric::ROW_MODE.iter().map(|m| m.column_key()));
    let rows = records
        .iter()
        .map(|r| {
            let mut row = vec![r.timestamp.clone(), r.pool_name.clone()];
            row.extend(Metric::ROW_MODE.iter().map(|m| r.value(*m)));
            row
        })
        .collect();
    Table { header, rows }
}

/// One row per distinct timestamp. A pool seen twice under the same timestamp keeps its first sample.
pub fn project_columns(records: &[PoolRecord], metrics: &[Metric]) -> Table {
    let mut pools: Vec<&str> = Vec::new();
    let mut timestamps: Vec<&str> = Vec::new();
    let mut cells: HashMap<(&str, &str), &PoolRecord> = HashMap::new();
    for r in records {
        if !pools.contains(&r.pool_name.as_str()) { pools.push(&r.pool_name); }
        if !timestamps.contains(&r.timestamp.as_str()) { timestamps.push(&r.timestamp); }
        let key = (r.timestamp.as_str(), r.pool_name.as_str());
        if cells.contains_key(&key) {
            log::debug!("duplicate sample for {} at '{}', keeping the first", r.pool_name, r.timestamp);
        } else {
            cells.insert(key, r);
        }
    }
    let mut header = vec!["timestamp".to_string()];
    for p in &pools {
        header.extend(metrics.iter().map(|m| format!("{}-{}", p, m.name())));
    }
    let rows = timestamps
        .iter()
        .map(|ts| {
            let mut row = vec![ts.to_string()];
            for p in &pools {
                match cells.get(&(*ts, *p)) {
                    Some(r) => row.extend(metrics.iter().map(|m| r.value(*m))),
                    None => row.extend(metrics.iter().map(|_| NOT_APPLICABLE.to_string())),
                }
            }
            row
        })
        .collect();
    Table { header, rows }
}
