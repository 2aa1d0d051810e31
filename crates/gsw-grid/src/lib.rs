#![deny(missing_docs)]
//! Parameter-space enumeration for gridsweep campaigns.
//!
//! A [`ParameterGrid`] expands a [`Space`] declaration into an ordered, lazy
//! sequence of [`gsw_core::ParameterSet`]s and formats each one as a
//! [`JobId`] of the form `<short><value>` joined by `_`.

mod grid;
mod id;
mod space;

pub use grid::{GridIter, ParameterGrid};
pub use id::JobId;
pub use space::{infer_decimals, Axis, ScenarioParameter, Space, MAX_INFERRED_DECIMALS};
