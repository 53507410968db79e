//! Jar archive merging and rewriting
//!
//! Every entry written here carries a pinned modification time so that
//! repeated installs produce byte-identical archives.

use crate::descriptor::{MANIFEST_ENTRY, MODULE_INFO_ENTRY};
use crate::error::{BuildError, BuildResult};
use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use zip::write::FileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

const SERVICES_PREFIX: &str = "META-INF/services/";
const VERSIONS_PREFIX: &str = "META-INF/versions/";

/// 1980-02-01 08:00:00
fn pinned_time() -> DateTime {
    DateTime::from_date_and_time(1980, 2, 1, 8, 0, 0).unwrap_or_default()
}

fn entry_options() -> FileOptions {
    FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(pinned_time())
}

/// Two contributors providing the same non-service entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeConflict {
    pub entry: String,
    /// Contributor whose entry was kept
    pub kept: PathBuf,
    /// Contributor whose entry was dropped
    pub skipped: PathBuf,
}

/// Result of merging contributor archives
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeSummary {
    /// Entries written, service registrations included
    pub entries: usize,
    /// Service registration files written
    pub services: usize,
    pub conflicts: Vec<MergeConflict>,
}

/// Whether an entry is a module descriptor, including versioned ones
fn is_descriptor_entry(name: &str) -> bool {
    name == MODULE_INFO_ENTRY
        || name
            .strip_prefix(VERSIONS_PREFIX)
            .and_then(|rest| rest.split_once('/'))
            .is_some_and(|(_, entry)| entry == MODULE_INFO_ENTRY)
}

/// Service name of a `META-INF/services/<name>` entry
fn service_name(name: &str) -> Option<&str> {
    name.strip_prefix(SERVICES_PREFIX)
        .filter(|service| !service.is_empty() && !service.contains('/'))
}

fn open_archive(path: &Path) -> BuildResult<ZipArchive<File>> {
    let file = File::open(path).map_err(|e| BuildError::io(path, e))?;
    ZipArchive::new(file).map_err(|e| BuildError::archive(path, e))
}

fn create_writer(path: &Path) -> BuildResult<ZipWriter<File>> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| BuildError::io(parent, e))?;
    }
    let file = File::create(path).map_err(|e| BuildError::io(path, e))?;
    Ok(ZipWriter::new(file))
}

fn write_entry(writer: &mut ZipWriter<File>, target: &Path, name: &str, bytes: &[u8]) -> BuildResult<()> {
    writer
        .start_file(name, entry_options())
        .map_err(|e| BuildError::archive(target, e))?;
    writer
        .write_all(bytes)
        .map_err(|e| BuildError::io(target, e))
}

/// Merge contributor archives into one
///
/// Contributors are taken in the given order. Descriptors and manifests are
/// dropped, service registrations are concatenated per service, and any
/// other entry is taken from the first contributor providing it.
pub fn merge_archives<P: AsRef<Path>>(contributors: &[P], target: &Path) -> BuildResult<MergeSummary> {
    let mut writer = create_writer(target)?;
    let mut summary = MergeSummary::default();
    let mut owners: HashMap<String, PathBuf> = HashMap::new();
    let mut services: BTreeMap<String, Vec<u8>> = BTreeMap::new();

    for contributor in contributors {
        let contributor = contributor.as_ref();
        let mut archive = open_archive(contributor)?;

        for i in 0..archive.len() {
            let mut entry = archive
                .by_index(i)
                .map_err(|e| BuildError::archive(contributor, e))?;
            let name = entry.name().to_string();

            if is_descriptor_entry(&name) || name == MANIFEST_ENTRY {
                continue;
            }

            if entry.is_dir() {
                if !owners.contains_key(&name) {
                    writer
                        .add_directory(name.as_str(), entry_options())
                        .map_err(|e| BuildError::archive(target, e))?;
                    owners.insert(name, contributor.to_path_buf());
                }
                continue;
            }

            let mut bytes = Vec::with_capacity(entry.size() as usize);
            entry
                .read_to_end(&mut bytes)
                .map_err(|e| BuildError::io(contributor, e))?;

            if let Some(service) = service_name(&name) {
                let registrations = services.entry(service.to_string()).or_default();
                if !registrations.is_empty() && !registrations.ends_with(b"\n") {
                    registrations.push(b'\n');
                }
                registrations.extend_from_slice(&bytes);
                continue;
            }

            if let Some(kept) = owners.get(&name) {
                summary.conflicts.push(MergeConflict {
                    entry: name,
                    kept: kept.clone(),
                    skipped: contributor.to_path_buf(),
                });
                continue;
            }

            write_entry(&mut writer, target, &name, &bytes)?;
            owners.insert(name, contributor.to_path_buf());
            summary.entries += 1;
        }
    }

    for (service, registrations) in &services {
        let name = format!("{}{}", SERVICES_PREFIX, service);
        write_entry(&mut writer, target, &name, registrations)?;
        summary.entries += 1;
        summary.services += 1;
    }

    writer.finish().map_err(|e| BuildError::archive(target, e))?;
    Ok(summary)
}

/// Copy an archive, replacing its root module descriptor
pub fn splice_descriptor(source: &Path, target: &Path, descriptor: &[u8]) -> BuildResult<()> {
    let mut archive = open_archive(source)?;
    let mut writer = create_writer(target)?;

    write_entry(&mut writer, target, MODULE_INFO_ENTRY, descriptor)?;
    for i in 0..archive.len() {
        let entry = archive
            .by_index_raw(i)
            .map_err(|e| BuildError::archive(source, e))?;
        if entry.name() == MODULE_INFO_ENTRY {
            continue;
        }
        writer
            .raw_copy_file(entry)
            .map_err(|e| BuildError::archive(target, e))?;
    }

    writer.finish().map_err(|e| BuildError::archive(target, e))?;
    Ok(())
}

/// Write an archive holding only a module descriptor
pub fn descriptor_archive(target: &Path, descriptor: &[u8]) -> BuildResult<()> {
    let mut writer = create_writer(target)?;
    write_entry(&mut writer, target, MODULE_INFO_ENTRY, descriptor)?;
    writer.finish().map_err(|e| BuildError::archive(target, e))?;
    Ok(())
}

/// Packages holding at least one class, sorted
///
/// Versioned and descriptor entries are ignored.
pub fn class_packages(path: &Path) -> BuildResult<Vec<String>> {
    let archive = open_archive(path)?;
    let mut packages: Vec<String> = archive
        .file_names()
        .filter(|name| name.ends_with(".class") && !name.starts_with("META-INF/"))
        .filter_map(|name| name.rsplit_once('/').map(|(package, _)| package.replace('/', ".")))
        .collect();
    packages.sort();
    packages.dedup();
    Ok(packages)
}

/// Entry names in archive order
pub fn entry_names(path: &Path) -> BuildResult<Vec<String>> {
    let archive = open_archive(path)?;
    Ok(archive.file_names().map(str::to_string).collect())
}

/// Contents of a single entry, `None` when absent
pub fn read_entry(path: &Path, name: &str) -> BuildResult<Option<Vec<u8>>> {
    let mut archive = open_archive(path)?;
    let mut entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(BuildError::archive(path, e)),
    };
    let mut bytes = Vec::new();
    entry
        .read_to_end(&mut bytes)
        .map_err(|e| BuildError::io(path, e))?;
    Ok(Some(bytes))
}
