use std::fmt::{Display, Formatter};

/// One of the per-domain databases written by the indexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatabaseKind {
    Blocks,
    Transactions,
    Logs,
    Withdrawals,
}

impl DatabaseKind {
    /// Stable lowercase name used in logs and reports.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Blocks => "blocks",
            Self::Transactions => "transactions",
            Self::Logs => "logs",
            Self::Withdrawals => "withdrawals",
        }
    }
}

impl Display for DatabaseKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
