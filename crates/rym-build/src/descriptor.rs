//! Module descriptor discovery for jar archives
//!
//! Reads `module-info.class` (parsing just enough of the class file to reach
//! the `Module` attribute), falls back to the `Automatic-Module-Name`
//! manifest attribute, and finally to a name derived from the archive file
//! name the same way the JDK module finder does.

use crate::error::{BuildError, BuildResult};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use zip::ZipArchive;

/// Archive entry holding a compiled module descriptor
pub const MODULE_INFO_ENTRY: &str = "module-info.class";

/// Archive entry holding the jar manifest
pub const MANIFEST_ENTRY: &str = "META-INF/MANIFEST.MF";

const VERSIONS_PREFIX: &str = "META-INF/versions/";

const CLASS_MAGIC: u32 = 0xCAFE_BABE;
const ACC_MODULE: u16 = 0x8000;
const ACC_OPEN: u16 = 0x0020;

const JAVA_KEYWORDS: &[&str] = &[
    "abstract", "assert", "boolean", "break", "byte", "case", "catch", "char", "class", "const",
    "continue", "default", "do", "double", "else", "enum", "extends", "false", "final",
    "finally", "float", "for", "goto", "if", "implements", "import", "instanceof", "int",
    "interface", "long", "native", "new", "null", "package", "private", "protected", "public",
    "return", "short", "static", "strictfp", "super", "switch", "synchronized", "this", "throw",
    "throws", "transient", "true", "try", "void", "volatile", "while", "_",
];

/// Module identity of an archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleDescriptor {
    pub name: String,
    /// `open module`
    pub open: bool,
    /// Name inferred from the manifest or file name; no declared edges
    pub automatic: bool,
    /// Declared `requires` edges, empty for automatic modules
    pub requires: Vec<String>,
}

impl ModuleDescriptor {
    /// Automatic module with an inferred name
    pub fn automatic(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            open: false,
            automatic: true,
            requires: Vec::new(),
        }
    }
}

/// Describe the module an archive provides, `None` when it has no usable name
pub fn describe_archive(path: &Path) -> BuildResult<Option<ModuleDescriptor>> {
    let file = File::open(path).map_err(|e| BuildError::io(path, e))?;
    let mut archive = ZipArchive::new(file).map_err(|e| BuildError::archive(path, e))?;

    let manifest = read_entry(&mut archive, MANIFEST_ENTRY, path)?
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned());

    let descriptor_entry = if archive.by_name(MODULE_INFO_ENTRY).is_ok() {
        Some(MODULE_INFO_ENTRY.to_string())
    } else if manifest
        .as_deref()
        .and_then(|m| manifest_attribute(m, "Multi-Release"))
        .is_some_and(|v| v.eq_ignore_ascii_case("true"))
    {
        versioned_descriptor(&archive)
    } else {
        None
    };

    if let Some(entry) = descriptor_entry {
        if let Some(bytes) = read_entry(&mut archive, &entry, path)? {
            let descriptor = parse_module_info(&bytes)
                .map_err(|reason| BuildError::descriptor(path, reason))?;
            return Ok(Some(descriptor));
        }
    }

    if let Some(name) = manifest
        .as_deref()
        .and_then(|m| manifest_attribute(m, "Automatic-Module-Name"))
    {
        if is_valid_module_name(&name) {
            return Ok(Some(ModuleDescriptor::automatic(name)));
        }
        return Err(BuildError::descriptor(
            path,
            format!("Automatic-Module-Name '{}' is not a legal module name", name),
        ));
    }

    let derived = path
        .file_name()
        .and_then(|n| n.to_str())
        .and_then(derive_automatic_name);

    Ok(derived.map(ModuleDescriptor::automatic))
}

/// Highest `META-INF/versions/<n>/module-info.class` entry
fn versioned_descriptor(archive: &ZipArchive<File>) -> Option<String> {
    archive
        .file_names()
        .filter_map(|name| {
            let rest = name.strip_prefix(VERSIONS_PREFIX)?;
            let (version, entry) = rest.split_once('/')?;
            if entry != MODULE_INFO_ENTRY {
                return None;
            }
            version.parse::<u32>().ok().map(|v| (v, name.to_string()))
        })
        .max_by_key(|(version, _)| *version)
        .map(|(_, name)| name)
}

fn read_entry(
    archive: &mut ZipArchive<File>,
    name: &str,
    path: &Path,
) -> BuildResult<Option<Vec<u8>>> {
    let mut entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(BuildError::archive(path, e)),
    };

    let mut bytes = Vec::with_capacity(entry.size() as usize);
    entry
        .read_to_end(&mut bytes)
        .map_err(|e| BuildError::io(path, e))?;
    Ok(Some(bytes))
}

/// Value of a main-section manifest attribute
///
/// Handles continuation lines (a leading single space).
pub fn manifest_attribute(manifest: &str, key: &str) -> Option<String> {
    let mut attributes: Vec<(String, String)> = Vec::new();

    for line in manifest.lines() {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            // Main section ends at the first blank line
            break;
        }
        if let Some(continuation) = line.strip_prefix(' ') {
            if let Some((_, value)) = attributes.last_mut() {
                value.push_str(continuation);
            }
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            attributes.push((name.trim().to_string(), value.trim_start().to_string()));
        }
    }

    attributes
        .into_iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(key))
        .map(|(_, value)| value.trim().to_string())
}

/// Derive an automatic module name from an archive file name
///
/// Strips `.jar` and any version suffix, maps non-alphanumerics to dots,
/// collapses repeated dots and trims leading/trailing ones. Returns `None`
/// when the result is not a legal module name.
pub fn derive_automatic_name(file_name: &str) -> Option<String> {
    let stem = file_name.strip_suffix(".jar").unwrap_or(file_name);
    let stem = &stem[..version_start(stem).unwrap_or(stem.len())];

    let mut name = String::with_capacity(stem.len());
    for c in stem.chars() {
        let c = if c.is_ascii_alphanumeric() { c } else { '.' };
        if c == '.' && (name.is_empty() || name.ends_with('.')) {
            continue;
        }
        name.push(c);
    }
    while name.ends_with('.') {
        name.pop();
    }

    is_valid_module_name(&name).then_some(name)
}

/// Start of a `-<digits>(.|end)` version suffix
fn version_start(stem: &str) -> Option<usize> {
    let bytes = stem.as_bytes();
    (0..bytes.len()).find(|&i| {
        if bytes[i] != b'-' {
            return false;
        }
        let digits = bytes[i + 1..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count();
        if digits == 0 {
            return false;
        }
        let next = i + 1 + digits;
        next == bytes.len() || bytes[next] == b'.'
    })
}

/// Whether a name is a legal dotted module name
pub fn is_valid_module_name(name: &str) -> bool {
    !name.is_empty() && name.split('.').all(is_java_identifier)
}

fn is_java_identifier(segment: &str) -> bool {
    let mut chars = segment.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_alphabetic() || first == '_' || first == '$')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
        && !JAVA_KEYWORDS.contains(&segment)
}

/// Constant pool entries the descriptor reader cares about
#[derive(Debug, Clone)]
enum Constant {
    Utf8(String),
    Module(u16),
    Other,
}

struct ClassReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ClassReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], String> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.bytes.len())
            .ok_or_else(|| format!("truncated class file at offset {}", self.pos))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u1(&mut self) -> Result<u8, String> {
        Ok(self.take(1)?[0])
    }

    fn u2(&mut self) -> Result<u16, String> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u4(&mut self) -> Result<u32, String> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn skip(&mut self, n: usize) -> Result<(), String> {
        self.take(n).map(|_| ())
    }

    /// Skip the members table of fields or methods
    fn skip_members(&mut self) -> Result<(), String> {
        let count = self.u2()?;
        for _ in 0..count {
            self.skip(6)?;
            self.skip_attributes()?;
        }
        Ok(())
    }

    fn skip_attributes(&mut self) -> Result<(), String> {
        let count = self.u2()?;
        for _ in 0..count {
            self.skip(2)?;
            let length = self.u4()? as usize;
            self.skip(length)?;
        }
        Ok(())
    }
}

/// Parse a compiled `module-info.class`
pub fn parse_module_info(bytes: &[u8]) -> Result<ModuleDescriptor, String> {
    let mut reader = ClassReader::new(bytes);

    if reader.u4()? != CLASS_MAGIC {
        return Err("not a class file".to_string());
    }
    reader.skip(4)?;

    let pool = read_constant_pool(&mut reader)?;

    let access_flags = reader.u2()?;
    if access_flags & ACC_MODULE == 0 {
        return Err("class is not a module descriptor".to_string());
    }
    reader.skip(4)?;
    let interfaces = reader.u2()? as usize;
    reader.skip(interfaces * 2)?;
    reader.skip_members()?;
    reader.skip_members()?;

    let attributes = reader.u2()?;
    for _ in 0..attributes {
        let name_index = reader.u2()?;
        let length = reader.u4()? as usize;
        let body = reader.take(length)?;
        if utf8(&pool, name_index)? == "Module" {
            return parse_module_attribute(&pool, body);
        }
    }

    Err("missing Module attribute".to_string())
}

fn read_constant_pool(reader: &mut ClassReader<'_>) -> Result<Vec<Constant>, String> {
    let count = reader.u2()? as usize;
    let mut pool = vec![Constant::Other; count.max(1)];

    let mut index = 1;
    while index < count {
        let tag = reader.u1()?;
        let constant = match tag {
            1 => {
                let length = reader.u2()? as usize;
                Constant::Utf8(String::from_utf8_lossy(reader.take(length)?).into_owned())
            }
            3 | 4 => {
                reader.skip(4)?;
                Constant::Other
            }
            5 | 6 => {
                reader.skip(8)?;
                pool[index] = Constant::Other;
                // Long and double occupy two slots
                index += 2;
                continue;
            }
            7 | 8 | 16 | 20 => {
                reader.skip(2)?;
                Constant::Other
            }
            9 | 10 | 11 | 12 | 17 | 18 => {
                reader.skip(4)?;
                Constant::Other
            }
            15 => {
                reader.skip(3)?;
                Constant::Other
            }
            19 => Constant::Module(reader.u2()?),
            other => return Err(format!("unknown constant pool tag {}", other)),
        };
        pool[index] = constant;
        index += 1;
    }

    Ok(pool)
}

fn utf8(pool: &[Constant], index: u16) -> Result<&str, String> {
    match pool.get(index as usize) {
        Some(Constant::Utf8(value)) => Ok(value),
        _ => Err(format!("constant #{} is not a UTF-8 entry", index)),
    }
}

fn module_name(pool: &[Constant], index: u16) -> Result<String, String> {
    match pool.get(index as usize) {
        Some(Constant::Module(name_index)) => Ok(utf8(pool, *name_index)?.replace('/', ".")),
        _ => Err(format!("constant #{} is not a module entry", index)),
    }
}

fn parse_module_attribute(pool: &[Constant], body: &[u8]) -> Result<ModuleDescriptor, String> {
    let mut reader = ClassReader::new(body);

    let name = module_name(pool, reader.u2()?)?;
    let flags = reader.u2()?;
    reader.skip(2)?;

    let requires_count = reader.u2()?;
    let mut requires = Vec::with_capacity(requires_count as usize);
    for _ in 0..requires_count {
        requires.push(module_name(pool, reader.u2()?)?);
        reader.skip(4)?;
    }

    Ok(ModuleDescriptor {
        name,
        open: flags & ACC_OPEN != 0,
        automatic: false,
        requires,
    })
}
