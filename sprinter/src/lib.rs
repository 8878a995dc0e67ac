//! Synchronized multi-request bursts for HTTP race-condition testing.
//!
//! Given one captured request, a [`Session`] builds an ordered set of
//! byte-identical copies, releases them toward the target with minimal
//! inter-request skew, and classifies how each response differs from the
//! first one (the baseline). Two dispatch strategies sit behind one
//! interface: a single batched submission when the [`Transport`] can
//! multiplex the whole set itself, and a rendezvous-barrier fan-out of
//! independent workers when it can only send one request at a time.
//!
//! The crate is transport-agnostic: the actual HTTP client is supplied by
//! the host through the [`Transport`] trait. Per-request failures never
//! escape a cycle; they are folded into error-valued [`ResponseOutcome`]s
//! so one dead request cannot abort its siblings.
//!
//! Diff classification is a pure function over two outcomes:
//!
//! ```
//! use sprinter::{DiffField, ResponseOutcome, differs};
//!
//! let mut baseline = ResponseOutcome::placeholder();
//! baseline.status = 200;
//! let mut candidate = ResponseOutcome::placeholder();
//! candidate.status = 429;
//!
//! assert!(differs(&baseline, &candidate, DiffField::Status));
//! assert!(!differs(&baseline, &candidate, DiffField::Body));
//! ```

mod diff;
mod dispatch;
mod error;
mod outcome;
mod report;
mod session;
mod template;
mod transport;

#[cfg(test)]
mod testing;

pub use diff::{DiffField, differs};
pub use dispatch::{BurstConfig, BurstDispatcher};
pub use error::SessionError;
pub use outcome::{NO_RESPONSE, RawResponse, ResponseOutcome};
pub use report::CycleReport;
pub use session::Session;
pub use template::{Destination, RequestTemplate, Scheme};
pub use transport::{BatchItem, Transport, TransportError};
