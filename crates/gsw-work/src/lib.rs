#![deny(missing_docs)]
//! Workspace provisioning: one isolated directory per job, seeded with
//! template copies and a `params.csv` manifest.

mod copy;
mod manifest;
mod provision;
mod slots;

pub use copy::copy_tree;
pub use manifest::{read_manifest, write_manifest, MANIFEST_FILE};
pub use provision::{Provisioner, Workspace};
pub use slots::SlotLayout;
