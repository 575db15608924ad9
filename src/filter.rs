use crate::record::{LogBlock, Metric, PoolRecord};

// TPC/0/READ, TPC/all/WRITE, ...
pub const DEFAULT_PREFIX_FAMILIES: [&str; 1] = ["TPC"];

#[derive(Clone, Debug)]
pub struct PoolFilter {
    entries: Vec<String>,
    prefix_families: Vec<String>,
}

impl PoolFilter {
    pub fn new(entries: &[String], prefix_families: &[String]) -> Self {
        Self {
            entries: entries.iter().map(|e| e.trim().to_string()).filter(|e| !e.is_empty()).collect(),
            prefix_families: prefix_families.to_vec(),
        }
    }

    pub fn entries(&self) -> &[String] { &self.entries }

    fn is_family(&self, entry: &str) -> bool { self.prefix_families.iter().any(|f| f.eq_ignore_ascii_case(entry)) }

    fn entry_matches(&self, entry: &str, pool: &str) -> bool {
        entry.eq_ignore_ascii_case(pool) || (self.is_family(entry) && pool.to_lowercase().starts_with(&entry.to_lowercase()))
    }

    /// Indices of every allow-list entry matching `pool`.
    pub fn matching_entries(&self, pool: &str) -> Vec<usize> {
        self.entries.iter().enumerate().filter(|(_, e)| self.entry_matches(e, pool)).map(|(i, _)| i).collect()
    }
}

#[derive(Clone, Debug)]
pub struct FilteredRecords {
    pub records: Vec<PoolRecord>,
    pub pool_filter: Option<PoolFilter>,
    pub metrics: Vec<Metric>,
    pub unmatched: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct RecordFilter {
    pools: Option<PoolFilter>,
    metrics: Vec<Metric>,
}

impl RecordFilter {
    pub fn new(pools: &[String], prefix_families: &[String], metrics: &[Metric]) -> Self {
        let pf = PoolFilter::new(pools, prefix_families);
        let pools = if pf.entries().is_empty() { None } else { Some(pf) };
        let mut selected: Vec<Metric> = Vec::new();
        for m in metrics { if !selected.contains(m) { selected.push(*m); } }
        if selected.is_empty() { selected = Metric::ALL.to_vec(); }
        Self { pools, metrics: selected }
    }

    pub fn apply<I: IntoIterator<Item = LogBlock>>(&self, blocks: I) -> FilteredRecords {
        let mut hits = vec![0usize; self.pools.as_ref().map_or(0, |p| p.entries().len())];
        let mut records = Vec::new();
        for block in blocks {
            for rec in block.records {
                match self.pools.as_ref() {
                    None => records.push(rec),
                    Some(pf) => {
                        let matched = pf.matching_entries(&rec.pool_name);
                        for i in &matched { hits[*i] += 1; }
                        if !matched.is_empty() { records.push(rec); }
                    }
                }
            }
        }
        let mut unmatched = Vec::new();
        if let Some(pf) = self.pools.as_ref() {
            for (e, n) in pf.entries().iter().zip(&hits) {
                if *n == 0 { unmatched.push(e.clone()); }
            }
        }
        FilteredRecords { records, pool_filter: self.pools.clone(), metrics: self.metrics.clone(), unmatched }
    }
}
