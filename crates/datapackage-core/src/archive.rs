//! Packing a package and its data into a single zip archive.
//!
//! The archive holds `datapackage.json` at its root followed by every data
//! stream of every resource, named the way [`Resource::save`] names them:
//! `resource-<i>.<ext>` for a resource with one stream, `resource-<i>-data-<j>`
//! for several. The packed descriptor points each resource's `path` at the
//! members written from its file and URL sources. Inline `data` stays in the
//! descriptor; its saved copy travels in the archive unreferenced.
//!
//! [`Resource::save`]: crate::Resource::save

use crate::factory::Factory;
use crate::{CoreError, Package};
use serde_json::Value;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

pub const DESCRIPTOR_FILE: &str = "datapackage.json";

fn archive_err(archive: &Path, e: impl std::fmt::Display) -> CoreError {
    CoreError::Archive(format!("{}: {e}", archive.display()))
}

/// Write `package` and the data of all its streams to `target`.
/// The package itself is not modified.
pub fn save_archive(package: &Package, target: &Path) -> Result<(), CoreError> {
    let workdir = tempfile::tempdir()?;
    let mut descriptor = package.descriptor().clone();
    let mut members = Vec::new();

    for (i, resource) in package.iter().enumerate() {
        let resource = resource?;
        let written = resource.save(&workdir.path().join(format!("resource-{i}")))?;
        let names: Vec<String> = written
            .iter()
            .filter_map(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .collect();
        // inline data is always the last stream
        let file_members = names.len() - usize::from(resource.descriptor().data().is_some());

        if let Some(Value::Object(entry)) = descriptor.resources_mut().get_mut(i) {
            match &names[..file_members] {
                [] => {
                    entry.remove("path");
                }
                [single] => {
                    entry.insert("path".to_owned(), Value::String(single.clone()));
                }
                many => {
                    let paths = many.iter().cloned().map(Value::String).collect();
                    entry.insert("path".to_owned(), Value::Array(paths));
                }
            }
        }
        members.extend(written.into_iter().zip(names));
    }

    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(File::create(target)?);
    zip.start_file(DESCRIPTOR_FILE, options)
        .map_err(|e| archive_err(target, e))?;
    zip.write_all(&serde_json::to_vec_pretty(&descriptor)?)?;
    for (path, name) in &members {
        debug!("packing {name}");
        zip.start_file(name.as_str(), options)
            .map_err(|e| archive_err(target, e))?;
        io::copy(&mut File::open(path)?, &mut zip)?;
    }
    zip.finish().map_err(|e| archive_err(target, e))?;

    info!(
        "saved package '{}' to {} ({} data files)",
        package.name().unwrap_or_default(),
        target.display(),
        members.len()
    );
    Ok(())
}

/// Extract an archive written by [`save_archive`] into `dir`.
pub fn unpack_archive(archive: &Path, dir: &Path) -> Result<(), CoreError> {
    let mut zip = ZipArchive::new(File::open(archive)?).map_err(|e| archive_err(archive, e))?;
    if zip.index_for_name(DESCRIPTOR_FILE).is_none() {
        return Err(archive_err(archive, format!("missing {DESCRIPTOR_FILE}")));
    }
    std::fs::create_dir_all(dir)?;
    zip.extract(dir).map_err(|e| archive_err(archive, e))?;
    debug!("unpacked {} into {}", archive.display(), dir.display());
    Ok(())
}

/// Load a package from an archive with the built-in profiles and handlers.
pub fn load_archive(archive: &Path) -> Result<Package, CoreError> {
    Factory::default().load_archive(archive)
}

impl Factory {
    /// Extract `archive` to a temporary directory that lives as long as the
    /// returned package (or any resource built from it) and load the package
    /// from there.
    pub fn load_archive(&self, archive: &Path) -> Result<Package, CoreError> {
        let workdir = tempfile::tempdir()?;
        unpack_archive(archive, workdir.path())?;
        let package = self.load_package(workdir.path().join(DESCRIPTOR_FILE), Some(workdir.path()))?;
        Ok(package.with_workdir(Arc::new(workdir)))
    }
}
