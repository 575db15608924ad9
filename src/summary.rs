use comfy_table::{ContentArrangement, Table};
use crate::record::{LogBlock, PoolRecord};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PoolSummary {
    pub pool_name: String,
    pub samples: usize,
    pub first_seen: String,
    pub last_seen: String,
    pub max_pending: Option<u64>,
    pub max_blocked: Option<u64>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunStats {
    pub files: usize,
    pub blocks: usize,
    pub empty_blocks: usize,
    pub records: usize,
}

impl RunStats {
    pub fn observe(&mut self, block: &LogBlock) {
        self.blocks += 1;
        if block.is_empty() { self.empty_blocks += 1; }
        self.records += block.records.len();
    }
}

fn max_opt(a: Option<u64>, b: Option<u64>) -> Option<u64> {
    match (a, b) { (Some(x), Some(y)) => Some(x.max(y)), (x, None) => x, (None, y) => y }
}

pub fn summarize(records: &[PoolRecord]) -> Vec<PoolSummary> {
    let mut out: Vec<PoolSummary> = Vec::new();
    for r in records {
        let idx = match out.iter().position(|s| s.pool_name == r.pool_name) {
            Some(i) => i,
            None => {
                out.push(PoolSummary { pool_name: r.pool_name.clone(), first_seen: r.timestamp.clone(), ..Default::default() });
                out.len() - 1
            }
        };
        let s = &mut out[idx];
        s.samples += 1;
        s.last_seen = r.timestamp.clone();
        s.max_pending = max_opt(s.max_pending, r.pending);
        s.max_blocked = max_opt(s.max_blocked, r.blocked);
    }
    out
}

pub fn render(stats: &RunStats, pools: &[PoolSummary]) -> String {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Pool", "Samples", "First", "Last", "Max Pending", "Max Blocked"]);
    let na = |v: Option<u64>| v.map(|n| n.to_string()).unwrap_or_else(|| "N/A".to_string());
    for p in pools {
        table.add_row(vec![p.pool_name.clone(), p.samples.to_string(), p.first_seen.clone(), p.last_seen.clone(), na(p.max_pending), na(p.max_blocked)]);
    }
    format!(
        "Files: {}  Blocks: {} ({} empty)  Records: {}\n{}",
        stats.files, stats.blocks, stats.empty_blocks, stats.records, table
    )
}
