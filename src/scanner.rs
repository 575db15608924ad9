use regex::Regex;
use crate::input::SourceLine;
use crate::record::{LogBlock, PoolRecord, SourceOrder};
use crate::row_parser::parse_row;

const HEADER_LABELS: [&str; 13] = [
    "Pool", "Name", "Active", "Pending", "Backpressure", "Delayed", "Shared", "Stolen", "Completed", "Blocked", "All", "Time", "Blocked",
];

pub const CASSANDRA_TIMESTAMP: &str = r"(\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2},\d{3})";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LineKind {
    Header,
    Data(PoolRecord),
    Blank,
    Other,
}

// a log prefix before "Pool Name" is allowed
pub fn is_header(line: &str) -> bool {
    let toks: Vec<&str> = line.split_whitespace().collect();
    toks.len() >= HEADER_LABELS.len() && toks[toks.len() - HEADER_LABELS.len()..] == HEADER_LABELS
}

pub fn classify(line: &str) -> LineKind {
    if line.trim().is_empty() { return LineKind::Blank; }
    if is_header(line) { return LineKind::Header; }
    match parse_row(line) { Some(r) => LineKind::Data(r), None => LineKind::Other }
}

// lookback: last non-header line seen, timestamp of the next block
#[derive(Clone, Debug, Default)]
pub enum ScanState {
    #[default]
    Start,
    Idle { lookback: String },
    InBlock { block: LogBlock, lookback: String },
}

#[derive(Clone, Debug, Default)]
pub struct ScanContext {
    pub file_index: usize,
    pub timestamp_pattern: Option<Regex>,
}

impl ScanContext {
    fn timestamp(&self, lookback: Option<&str>) -> String {
        let line = lookback.unwrap_or("");
        if let Some(re) = self.timestamp_pattern.as_ref()
            && let Some(caps) = re.captures(line) {
            let m = caps.get(1).or_else(|| caps.get(0));
            if let Some(m) = m { return m.as_str().to_string(); }
        }
        line.to_string()
    }
}

/// One scan step: next state, plus the block that this line closed, if any.
pub fn step(ctx: &ScanContext, state: ScanState, line: &SourceLine, occurrence: &mut usize) -> (ScanState, Option<LogBlock>) {
    let kind = classify(&line.text);
    let (lookback, open) = match state {
        ScanState::Start => (None, None),
        ScanState::Idle { lookback } => (Some(lookback), None),
        ScanState::InBlock { block, lookback } => (Some(lookback), Some(block)),
    };
    match (kind, open) {
        (LineKind::Header, open) => {
            let block = LogBlock { timestamp: ctx.timestamp(lookback.as_deref()), file_index: ctx.file_index, header_line: line.line_no, records: Vec::new() };
            log::trace!("header at line {} opens block '{}'", line.line_no, block.timestamp);
            let lookback = lookback.unwrap_or_default();
            (ScanState::InBlock { block, lookback }, open)
        }
        (LineKind::Data(mut rec), Some(mut block)) => {
            rec.timestamp = block.timestamp.clone();
            rec.source_order = SourceOrder { file: ctx.file_index, occurrence: *occurrence };
            *occurrence += 1;
            block.records.push(rec);
            (ScanState::InBlock { block, lookback: line.text.clone() }, None)
        }
        (LineKind::Other, Some(block)) => {
            log::trace!("file #{} line {} is not a pool row, closing block at line {}", line.file_index, line.line_no, block.header_line);
            (ScanState::Idle { lookback: line.text.clone() }, Some(block))
        }
        (_, open) => (ScanState::Idle { lookback: line.text.clone() }, open),
    }
}

pub struct BlockScanner<I> {
    lines: I,
    ctx: ScanContext,
    state: Option<ScanState>,
    occurrence: usize,
}

impl<I: Iterator<Item = SourceLine>> BlockScanner<I> {
    pub fn new(lines: I, ctx: ScanContext) -> Self {
        Self { lines, ctx, state: Some(ScanState::Start), occurrence: 0 }
    }
}

impl<I: Iterator<Item = SourceLine>> Iterator for BlockScanner<I> {
    type Item = LogBlock;

    fn next(&mut self) -> Option<LogBlock> {
        loop {
            let state = self.state.take()?;
            match self.lines.next() {
                Some(line) => {
                    let (next, emitted) = step(&self.ctx, state, &line, &mut self.occurrence);
                    self.state = Some(next);
                    if let Some(b) = emitted {
                        log::debug!("block '{}' (line {}) with {} pools", b.timestamp, b.header_line, b.records.len());
                        return Some(b);
                    }
                }
                None => {
                    if let ScanState::InBlock { block, .. } = state {
                        log::debug!("block '{}' (line {}) with {} pools at end of input", block.timestamp, block.header_line, block.records.len());
                        return Some(block);
                    }
                    return None;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "Pool Name                                       Active        Pending   Backpressure   Delayed      Shared      Stolen      Completed   Blocked  All Time Blocked";
    const TS1: &str = "2025-10-03 10:08:32,368";
    const TS2: &str = "2025-10-03 10:13:32,369";

    fn lines(text: &str) -> Vec<SourceLine> {
        text.lines().enumerate().map(|(i, t)| SourceLine { file_index: 0, line_no: i as u64 + 1, text: t.to_string() }).collect()
    }

    fn scan(text: &str) -> Vec<LogBlock> {
        BlockScanner::new(lines(text).into_iter(), ScanContext::default()).collect()
    }

    #[test]
    fn header_match_ignores_column_widths_and_prefix() {
        assert!(is_header(HEADER));
        assert!(is_header("Pool Name Active Pending Backpressure Delayed Shared Stolen Completed Blocked All Time Blocked"));
        assert!(is_header("INFO  [ScheduledTasks:1] 2025-10-03 10:08:32,368 StatusLogger.java:51 - Pool Name Active Pending Backpressure Delayed Shared Stolen Completed Blocked All Time Blocked"));
        assert!(!is_header("Pool Name Active Pending Completed Blocked All Time Blocked"));
        assert!(!is_header("Pool Name Active Pending Backpressure Delayed Shared Stolen Completed Blocked All Time Blocked extra"));
    }

    #[test]
    fn classify_tags_each_line() {
        assert_eq!(classify("   "), LineKind::Blank);
        assert_eq!(classify(HEADER), LineKind::Header);
        assert!(matches!(classify("GossipStage 0 0 N/A N/A N/A N/A 12 0 0"), LineKind::Data(_)));
        assert_eq!(classify("INFO  [main] something happened"), LineKind::Other);
    }

    #[test]
    fn block_takes_preceding_line_as_timestamp() {
        let text = format!("{TS1}\n{HEADER}\nCompactionExecutor 0 0 N/A N/A N/A N/A 311 0 0\nGossipStage 0 0 N/A N/A N/A N/A 12 0 0\n");
        let blocks = scan(&text);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].timestamp, TS1);
        assert_eq!(blocks[0].header_line, 2);
        assert_eq!(blocks[0].records.len(), 2);
        assert!(blocks[0].records.iter().all(|r| r.timestamp == TS1));
        assert_eq!(blocks[0].records[1].source_order, SourceOrder { file: 0, occurrence: 1 });
    }

    #[test]
    fn header_on_first_line_has_empty_timestamp() {
        let blocks = scan(&format!("{HEADER}\nGossipStage 0 0 N/A N/A N/A N/A 12 0 0"));
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].timestamp, "");
    }

    #[test]
    fn blank_line_separates_blocks() {
        let text = format!("{TS1}\n{HEADER}\nA 1 0 N/A N/A N/A N/A 1 0 0\n\n{TS2}\n{HEADER}\nB 2 0 N/A N/A N/A N/A 2 0 0\n");
        let blocks = scan(&text);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].records.len(), 1);
        assert_eq!(blocks[0].records[0].pool_name, "A");
        assert_eq!(blocks[1].timestamp, TS2);
        assert_eq!(blocks[1].records[0].pool_name, "B");
        assert_eq!(blocks[1].records[0].timestamp, TS2);
    }

    #[test]
    fn non_row_line_closes_block() {
        let text = format!("{TS1}\n{HEADER}\nA 1 0 N/A N/A N/A N/A 1 0 0\nINFO  [main] 2025-10-03 10:09:00,001 Foo.java:1 - next entry\nB 2 0 N/A N/A N/A N/A 2 0 0\n");
        let blocks = scan(&text);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].records.len(), 1);
    }

    #[test]
    fn truncated_row_closes_block() {
        let text = format!("{TS1}\n{HEADER}\nA 1 0 N/A N/A N/A N/A 1 0 0\nB 2 0 N/A\nC 3 0 N/A N/A N/A N/A 3 0 0\n");
        let blocks = scan(&text);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].records.iter().map(|r| r.pool_name.as_str()).collect::<Vec<_>>(), vec!["A"]);
    }

    #[test]
    fn consecutive_headers_emit_empty_block() {
        let text = format!("{TS1}\n{HEADER}\n{HEADER}\nA 1 0 N/A N/A N/A N/A 1 0 0\n");
        let blocks = scan(&text);
        assert_eq!(blocks.len(), 2);
        assert!(blocks[0].is_empty());
        assert_eq!(blocks[1].records.len(), 1);
        // the second header's nearest non-header line is still the timestamp line
        assert_eq!(blocks[0].timestamp, TS1);
        assert_eq!(blocks[1].timestamp, TS1);
    }

    #[test]
    fn header_closes_filled_block_and_opens_next() {
        let text = format!("{TS1}\n{HEADER}\nA 1 0 N/A N/A N/A N/A 1 0 0\n{HEADER}\nB 2 0 N/A N/A N/A N/A 2 0 0\n");
        let blocks = scan(&text);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].timestamp, TS1);
        assert_eq!(blocks[0].records.iter().map(|r| r.pool_name.as_str()).collect::<Vec<_>>(), vec!["A"]);
        assert_eq!(blocks[1].header_line, 4);
        assert_eq!(blocks[1].records.iter().map(|r| r.pool_name.as_str()).collect::<Vec<_>>(), vec!["B"]);
        // no blank line in between: the nearest non-header line is the last row of the previous table
        assert_eq!(blocks[1].timestamp, "A 1 0 N/A N/A N/A N/A 1 0 0");
        assert_eq!(blocks[1].records[0].timestamp, blocks[1].timestamp);
        assert_eq!(blocks[1].records[0].source_order.occurrence, 1);
    }

    #[test]
    fn header_followed_by_blank_is_empty_block() {
        let blocks = scan(&format!("{TS1}\n{HEADER}\n\nA 1 0 N/A N/A N/A N/A 1 0 0\n"));
        assert_eq!(blocks.len(), 1);
        assert!(blocks[0].is_empty());
    }

    #[test]
    fn rows_outside_a_block_are_ignored() {
        let blocks = scan("A 1 0 N/A N/A N/A N/A 1 0 0\nsome text\n");
        assert!(blocks.is_empty());
    }

    #[test]
    fn timestamp_pattern_extracts_group() {
        let ctx = ScanContext { file_index: 3, timestamp_pattern: Some(Regex::new(CASSANDRA_TIMESTAMP).unwrap()) };
        let text = format!("INFO  [ScheduledTasks:1] {TS1} StatusLogger.java:65 - Pool stats\n{HEADER}\nA 1 0 N/A N/A N/A N/A 1 0 0\n\nno timestamp here\n{HEADER}\n");
        let blocks: Vec<LogBlock> = BlockScanner::new(lines(&text).into_iter(), ctx).collect();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].timestamp, TS1);
        assert_eq!(blocks[0].file_index, 3);
        assert_eq!(blocks[0].records[0].source_order.file, 3);
        assert_eq!(blocks[1].timestamp, "no timestamp here");
    }
}
