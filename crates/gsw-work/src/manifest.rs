use std::fs::File;
use std::path::Path;

use csv::{ReaderBuilder, WriterBuilder};
use gsw_core::errors::{ErrorInfo, GswError};
use gsw_core::params::ParameterSet;

/// File name of the per-job parameter manifest.
pub const MANIFEST_FILE: &str = "params.csv";

fn wrap_csv(code: &str, path: &Path, err: impl ToString) -> GswError {
    GswError::Provisioning(
        ErrorInfo::new(code, "failed to access parameter manifest")
            .with_context("path", path.display().to_string())
            .with_hint(err.to_string()),
    )
}

/// Writes the two-row manifest: names in schema order, then canonical values.
pub fn write_manifest(path: &Path, params: &ParameterSet) -> Result<(), GswError> {
    let file = File::create(path).map_err(|err| wrap_csv("gsw_work.manifest_open", path, err))?;
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
    writer
        .write_record(params.schema().names())
        .map_err(|err| wrap_csv("gsw_work.manifest_write", path, err))?;
    writer
        .write_record(params.formatted_values())
        .map_err(|err| wrap_csv("gsw_work.manifest_write", path, err))?;
    writer
        .flush()
        .map_err(|err| wrap_csv("gsw_work.manifest_flush", path, err))?;
    Ok(())
}

/// Reads a manifest back as `(header, values)` string rows.
pub fn read_manifest(path: &Path) -> Result<(Vec<String>, Vec<String>), GswError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(|err| wrap_csv("gsw_work.manifest_read", path, err))?;
    let mut rows = Vec::with_capacity(2);
    for record in reader.records() {
        let record = record.map_err(|err| wrap_csv("gsw_work.manifest_read", path, err))?;
        rows.push(record.iter().map(str::to_string).collect::<Vec<_>>());
    }
    match <[Vec<String>; 2]>::try_from(rows) {
        Ok([header, values]) => Ok((header, values)),
        Err(rows) => Err(GswError::Provisioning(
            ErrorInfo::new("gsw_work.manifest_shape", "manifest must hold exactly two rows")
                .with_context("path", path.display().to_string())
                .with_context("rows", rows.len().to_string()),
        )),
    }
}
