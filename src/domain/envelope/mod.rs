//! Envelope domain
//!
//! The envelope carries one request through the pipeline: the immutable
//! request, append-only stage outputs and errors, the evolving artifact and
//! its validation report.

mod entity;
mod request;
mod snapshot;
mod stage;

pub use entity::{Envelope, EnvelopeError, StageTiming, ValidationReport};
pub use request::{Priority, RawRequest, RequestId};
pub use snapshot::{SnapshotOutcome, TerminalSnapshot};
pub use stage::{ErrorKind, StageError, StageName};
