use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use gsw_core::errors::{ErrorInfo, GswError, ALREADY_EXISTS_CODE};
use gsw_core::params::ParameterSet;
use gsw_grid::JobId;

use crate::copy::copy_tree;
use crate::manifest::{write_manifest, MANIFEST_FILE};
use crate::slots::SlotLayout;

/// Directory tree created for one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    /// Job identifier.
    pub id: JobId,
    /// `<root>/<id>`.
    pub dir: PathBuf,
    /// `(slot name, slot directory)` in execution order.
    pub slots: Vec<(String, PathBuf)>,
}

impl Workspace {
    /// Location of the job's `params.csv`.
    pub fn manifest_path(&self) -> PathBuf {
        self.dir.join(MANIFEST_FILE)
    }

    /// True once the manifest, which is written last, is present.
    pub fn is_provisioned(&self) -> bool {
        self.manifest_path().is_file()
    }
}

/// Materialises job directories under a campaign root.
#[derive(Debug, Clone)]
pub struct Provisioner {
    root: PathBuf,
    template: PathBuf,
    layout: SlotLayout,
}

impl Provisioner {
    /// Checks that the template is a directory and that the layout is usable.
    pub fn new(
        root: impl Into<PathBuf>,
        template: impl Into<PathBuf>,
        layout: SlotLayout,
    ) -> Result<Self, GswError> {
        let template = template.into();
        if !template.is_dir() {
            return Err(GswError::Configuration(
                ErrorInfo::new("gsw_work.template_missing", "template is not a directory")
                    .with_context("template", template.display().to_string()),
            ));
        }
        if layout.count == 0 {
            return Err(GswError::config(
                "gsw_work.no_slots",
                "a job needs at least one sub-slot",
            ));
        }
        if layout.prefix.is_empty() || layout.prefix.contains(['/', '\\']) {
            return Err(GswError::Configuration(
                ErrorInfo::new("gsw_work.slot_prefix", "slot prefix is not a valid file name")
                    .with_context("prefix", layout.prefix.clone()),
            ));
        }
        let root = root.into();
        if let (Ok(template_abs), Ok(root_abs)) = (template.canonicalize(), root.canonicalize()) {
            if root_abs.starts_with(&template_abs) {
                return Err(GswError::Configuration(
                    ErrorInfo::new(
                        "gsw_work.root_in_template",
                        "campaign root must not live inside the template",
                    )
                    .with_context("root", root.display().to_string()),
                ));
            }
        }
        Ok(Self {
            root,
            template,
            layout,
        })
    }

    /// Campaign root holding the job directories.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Sub-slot naming applied to every job.
    pub fn layout(&self) -> &SlotLayout {
        &self.layout
    }

    /// Directory a job would occupy, without touching the filesystem.
    pub fn job_dir(&self, id: &JobId) -> PathBuf {
        self.root.join(id.as_str())
    }

    /// Creates `<root>/<id>/`, one template copy per slot and the manifest.
    ///
    /// Fails with the `already_exists` provisioning code when the job
    /// directory is present. A partial tree left behind by a failed copy has
    /// no manifest and is therefore never mistaken for a provisioned job.
    pub fn provision(&self, id: &JobId, params: &ParameterSet) -> Result<Workspace, GswError> {
        let dir = self.job_dir(id);
        fs::create_dir(&dir).map_err(|err| {
            let info = ErrorInfo::new(
                if err.kind() == ErrorKind::AlreadyExists {
                    ALREADY_EXISTS_CODE
                } else {
                    "gsw_work.job_dir"
                },
                format!("cannot create job directory: {err}"),
            )
            .with_context("job", id.to_string())
            .with_context("path", dir.display().to_string());
            GswError::Provisioning(info)
        })?;

        let mut slots = Vec::with_capacity(self.layout.count);
        for name in self.layout.names() {
            let slot_dir = dir.join(&name);
            let files = copy_tree(&self.template, &slot_dir).map_err(|err| match err {
                GswError::Provisioning(info) => {
                    GswError::Provisioning(info.with_context("job", id.to_string()))
                }
                other => other,
            })?;
            tracing::debug!(job = %id, slot = %name, files, "copied template");
            slots.push((name, slot_dir));
        }

        write_manifest(&dir.join(MANIFEST_FILE), params)?;
        Ok(Workspace {
            id: id.clone(),
            dir,
            slots,
        })
    }
}
