#![deny(missing_docs)]
#![doc = "Core error taxonomy, parameter schema and cancellation primitives shared by the gridsweep crates."]

mod cancel;
pub mod errors;
pub mod params;
pub mod provenance;

pub use cancel::CancelToken;
pub use errors::{ErrorInfo, GswError, ALREADY_EXISTS_CODE};
pub use params::{Field, ParamEntry, ParameterSet, Schema};
pub use provenance::RunProvenance;
