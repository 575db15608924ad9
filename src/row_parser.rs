use crate::record::{PoolRecord, SourceOrder, NOT_APPLICABLE};

const STATUS_MAX_LEN: usize = 16;

fn is_na(tok: &str) -> bool { tok.eq_ignore_ascii_case(NOT_APPLICABLE) }

// None: not a data row. Some(None): N/A.
fn count(tok: &str) -> Option<Option<u64>> {
    if is_na(tok) { return Some(None); }
    if !tok.bytes().all(|b| b.is_ascii_digit()) { return None; }
    tok.parse::<u64>().ok().map(Some)
}

fn status(tok: &str) -> Option<Option<String>> {
    if is_na(tok) { return Some(None); }
    let ok = !tok.is_empty() && tok.len() <= STATUS_MAX_LEN && tok.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_');
    if ok { Some(Some(tok.to_string())) } else { None }
}

/// `<pool> <9 values>`; timestamp and source order are left for the scanner.
pub fn parse_row(line: &str) -> Option<PoolRecord> {
    let toks: Vec<&str> = line.split_whitespace().collect();
    let [name, active, pending, backpressure, delayed, shared, stolen, completed, blocked, all_time_blocked] = toks.as_slice() else { return None };
    // a pool name never starts like a value; this keeps a shifted row from parsing
    if count(name).is_some() { return None; }
    Some(PoolRecord {
        pool_name: name.to_string(),
        active: count(active)?,
        pending: count(pending)?,
        backpressure: status(backpressure)?,
        delayed: count(delayed)?,
        shared: count(shared)?,
        stolen: count(stolen)?,
        completed: count(completed)?,
        blocked: count(blocked)?,
        all_time_blocked: count(all_time_blocked)?,
        timestamp: String::new(),
        source_order: SourceOrder::default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_row_with_na_fields() {
        let r = parse_row("CompactionExecutor                                0         0            N/A       N/A         N/A         N/A            311         0                 0").unwrap();
        assert_eq!(r.pool_name, "CompactionExecutor");
        assert_eq!(r.active, Some(0));
        assert_eq!(r.pending, Some(0));
        assert_eq!(r.backpressure, None);
        assert_eq!(r.delayed, None);
        assert_eq!(r.shared, None);
        assert_eq!(r.stolen, None);
        assert_eq!(r.completed, Some(311));
        assert_eq!(r.blocked, Some(0));
        assert_eq!(r.all_time_blocked, Some(0));
    }

    #[test]
    fn all_na_row_is_a_record() {
        let r = parse_row("TPC/all/READ_LOCAL N/A N/A N/A N/A N/A N/A N/A N/A n/a").unwrap();
        assert_eq!(r.pool_name, "TPC/all/READ_LOCAL");
        assert!(r.active.is_none() && r.pending.is_none() && r.backpressure.is_none());
        assert!(r.delayed.is_none() && r.shared.is_none() && r.stolen.is_none());
        assert!(r.completed.is_none() && r.blocked.is_none() && r.all_time_blocked.is_none());
    }

    #[test]
    fn backpressure_accepts_status_token() {
        let r = parse_row("TPC/0 1 2 false 0 5 6 700 0 0").unwrap();
        assert_eq!(r.backpressure.as_deref(), Some("false"));
        let r = parse_row("TPC/0 1 2 3 0 5 6 700 0 0").unwrap();
        assert_eq!(r.backpressure.as_deref(), Some("3"));
    }

    #[test]
    fn wrong_token_count_is_not_a_row() {
        assert!(parse_row("CompactionExecutor 0 0 311 0 0").is_none());
        assert!(parse_row("CompactionExecutor 0 0 N/A N/A N/A N/A 311 0 0 9").is_none());
        assert!(parse_row("").is_none());
    }

    #[test]
    fn non_numeric_metric_is_not_a_row() {
        assert!(parse_row("CompactionExecutor 0 0 N/A N/A N/A N/A abc 0 0").is_none());
        assert!(parse_row("CompactionExecutor -1 0 N/A N/A N/A N/A 3 0 0").is_none());
        assert!(parse_row("INFO [main] 2025-10-03 10:08:32,368 Foo.java:1 - started x y").is_none());
    }

    #[test]
    fn numeric_name_is_not_a_row() {
        assert!(parse_row("0 0 0 N/A N/A N/A N/A 311 0 0").is_none());
    }
}
