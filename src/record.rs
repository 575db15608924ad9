use std::fmt;
use std::str::FromStr;

pub const NOT_APPLICABLE: &str = "N/A";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Metric { Active, Pending, Backpressure, Delayed, Shared, Stolen, Completed, Blocked, AllTimeBlocked }

impl Metric {
    pub const ALL: [Metric; 9] = [
        Metric::Active,
        Metric::Pending,
        Metric::Backpressure,
        Metric::Delayed,
        Metric::Shared,
        Metric::Stolen,
        Metric::Completed,
        Metric::Blocked,
        Metric::AllTimeBlocked,
    ];

    // row mode ignores --metrics
    pub const ROW_MODE: [Metric; 5] = [Metric::Shared, Metric::Stolen, Metric::Completed, Metric::Blocked, Metric::AllTimeBlocked];

    pub fn name(self) -> &'static str {
        match self {
            Metric::Active => "Active",
            Metric::Pending => "Pending",
            Metric::Backpressure => "Backpressure",
            Metric::Delayed => "Delayed",
            Metric::Shared => "Shared",
            Metric::Stolen => "Stolen",
            Metric::Completed => "Completed",
            Metric::Blocked => "Blocked",
            Metric::AllTimeBlocked => "All_Time_Blocked",
        }
    }

    pub fn column_key(self) -> String { self.name().to_lowercase() }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.name()) }
}

impl FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s.trim().split(|c: char| c.is_whitespace() || c == '_' || c == '-').filter(|p| !p.is_empty()).collect::<Vec<_>>().join("_").to_lowercase();
        Metric::ALL
            .into_iter()
            .find(|m| m.column_key() == key)
            .ok_or_else(|| format!("unknown metric '{}' (valid: {})", s.trim(), Metric::ALL.map(|m| m.name()).join(", ")))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SourceOrder {
    pub file: usize,
    pub occurrence: usize,
}

// None: the log printed N/A
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolRecord {
    pub pool_name: String,
    pub active: Option<u64>,
    pub pending: Option<u64>,
    pub backpressure: Option<String>,
    pub delayed: Option<u64>,
    pub shared: Option<u64>,
    pub stolen: Option<u64>,
    pub completed: Option<u64>,
    pub blocked: Option<u64>,
    pub all_time_blocked: Option<u64>,
    pub timestamp: String,
    pub source_order: SourceOrder,
}

impl PoolRecord {
    pub fn value(&self, metric: Metric) -> String {
        let n = match metric {
            Metric::Backpressure => return self.backpressure.clone().unwrap_or_else(|| NOT_APPLICABLE.to_string()),
            Metric::Active => self.active,
            Metric::Pending => self.pending,
            Metric::Delayed => self.delayed,
            Metric::Shared => self.shared,
            Metric::Stolen => self.stolen,
            Metric::Completed => self.completed,
            Metric::Blocked => self.blocked,
            Metric::AllTimeBlocked => self.all_time_blocked,
        };
        n.map(|v| v.to_string()).unwrap_or_else(|| NOT_APPLICABLE.to_string())
    }
}

/// One occurrence of the pool table in a log file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogBlock {
    pub timestamp: String,
    pub file_index: usize,
    pub header_line: u64,
    pub records: Vec<PoolRecord>,
}

impl LogBlock {
    pub fn is_empty(&self) -> bool { self.records.is_empty() }
}
