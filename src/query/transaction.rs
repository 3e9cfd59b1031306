use std::fmt;

use serde::Serialize;

use crate::error::QueryManagerError;
use crate::pool::PoolConnection;

/// Lifecycle of a transaction-bound [`Query`](super::Query).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TransactionState {
    Open,
    Committed,
    RolledBack,
}

impl TransactionState {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, TransactionState::Open)
    }
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TransactionState::Open => "open",
            TransactionState::Committed => "committed",
            TransactionState::RolledBack => "rolled back",
        };
        f.write_str(label)
    }
}

/// The connection a transaction holds exclusively, plus its state tag.
///
/// `conn` is `Some` exactly while the state is `Open`.
#[derive(Debug)]
pub(crate) struct TxConnection {
    pub(crate) conn: Option<PoolConnection>,
    pub(crate) state: TransactionState,
}

impl TxConnection {
    pub(crate) fn open(conn: PoolConnection) -> Self {
        Self {
            conn: Some(conn),
            state: TransactionState::Open,
        }
    }

    /// The live connection, or `TransactionState` naming `operation` once terminal.
    pub(crate) fn live(
        &mut self,
        operation: &str,
    ) -> Result<&mut PoolConnection, QueryManagerError> {
        match (self.state, self.conn.as_mut()) {
            (TransactionState::Open, Some(conn)) => Ok(conn),
            (state, _) => Err(QueryManagerError::TransactionState(format!(
                "cannot {operation}: transaction already {state}"
            ))),
        }
    }

    /// Enter a terminal state and hand back the connection for release.
    pub(crate) fn finish(&mut self, state: TransactionState) -> Option<PoolConnection> {
        self.state = state;
        self.conn.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_open_is_live() {
        assert!(!TransactionState::Open.is_terminal());
        assert!(TransactionState::Committed.is_terminal());
        assert!(TransactionState::RolledBack.is_terminal());
    }

    #[test]
    fn finished_transactions_reject_work() {
        let mut tx = TxConnection {
            conn: None,
            state: TransactionState::Committed,
        };
        let err = tx.live("execute").unwrap_err();
        assert!(matches!(
            err,
            QueryManagerError::TransactionState(msg)
                if msg == "cannot execute: transaction already committed"
        ));
        assert!(tx.finish(TransactionState::RolledBack).is_none());
    }
}
