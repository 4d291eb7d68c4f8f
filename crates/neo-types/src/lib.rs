//! Shared contract between the NEO robot execution core and its UI collaborator.
//!
//! The UI submits [`ExecutionRequest`]s and renders the ordered stream of
//! [`CoreEvent`]s that comes back. Keeping these types in their own crate lets
//! the hardware layer, the execution core and any front end agree on them
//! without depending on each other.

pub mod error;
pub mod events;
pub mod sink;
pub mod types;

pub use error::*;
pub use events::*;
pub use sink::*;
pub use types::*;
