pub mod api;
pub mod config;
pub mod error;
pub mod include;
pub mod walk;

pub use api::*;
pub use config::{VarDesc, WalkConfig};
pub use error::{ErrorKind, Result, WalkError};
pub use crate::include::walk_include::*;
pub use walk::chunking::Slice;
pub use walk::context::{Memory, TransferContext, TransferSummary};
pub use walk::source::ChunkSource;
