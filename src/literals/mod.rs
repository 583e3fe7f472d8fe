//! The literal store: a process-wide, content-addressed record set holding
//! every distinct string and number a program mentions (spec.md section 3.1).

pub mod cpointer;
pub mod magic;
pub mod record;
pub mod store;

pub use cpointer::CompressedPointer;
pub use record::{Record, RecordKind, RecordPayload};
pub use store::LiteralStore;
