//! Error types for the transaction executor.

use core::fmt::{self, Debug};

use crate::controller::ControllerStatus;

/// A transaction that still failed after the whole retry budget was spent.
///
/// The payload describes the last attempt only.
pub enum TransportError<E> {
    /// The controller refused to start the transfer.
    Issue(E),
    /// The transfer ran but ended with a fault flag set, did not complete
    /// within the poll budget, or wrote fewer bytes than requested.
    ///
    /// A short write carries a status with no fault flag set.
    Fault(ControllerStatus),
}

impl<E: Debug> Debug for TransportError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Issue(err) => write!(f, "Issue({err:?})"),
            Self::Fault(status) => write!(f, "Fault({status:?})"),
        }
    }
}

impl<E: PartialEq> PartialEq for TransportError<E> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Issue(a), Self::Issue(b)) => a == b,
            (Self::Fault(a), Self::Fault(b)) => a == b,
            _ => false,
        }
    }
}

impl<E> TransportError<E> {
    /// The status of the last attempt, if the transfer was started at all.
    pub fn status(&self) -> Option<ControllerStatus> {
        match self {
            Self::Issue(_) => None,
            Self::Fault(status) => Some(*status),
        }
    }
}
