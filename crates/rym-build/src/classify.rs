//! Module classification
//!
//! Decides per resolved artifact whether it carries a complete module
//! descriptor, only an automatic name, or no module identity at all.

use crate::descriptor::{describe_archive, ModuleDescriptor};
use crate::error::BuildResult;
use crate::report::Reporter;
use rym_package::{Artifact, ArtifactId};
use std::collections::HashMap;

/// Module identity of an artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Declares a complete `module-info.class`
    Named(ModuleDescriptor),
    /// Inferred name, no declared requirements
    Automatic(ModuleDescriptor),
    /// No derivable name; merged straight into the delegate
    Unnamed,
}

impl Classification {
    pub fn module_name(&self) -> Option<&str> {
        match self {
            Self::Named(d) | Self::Automatic(d) => Some(&d.name),
            Self::Unnamed => None,
        }
    }

    pub fn is_automatic(&self) -> bool {
        matches!(self, Self::Automatic(_))
    }
}

/// Artifact paired with its classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedArtifact {
    pub artifact: Artifact,
    pub classification: Classification,
}

/// Classify a single artifact by inspecting its archive
pub fn classify_artifact(artifact: &Artifact) -> BuildResult<Classification> {
    Ok(match describe_archive(&artifact.path)? {
        Some(descriptor) if descriptor.automatic => Classification::Automatic(descriptor),
        Some(descriptor) => Classification::Named(descriptor),
        None => Classification::Unnamed,
    })
}

/// Classify every artifact, preserving resolver listing order
///
/// Two artifacts claiming the same module name are both kept and reported.
pub fn classify(artifacts: &[Artifact], reporter: &mut Reporter) -> BuildResult<Vec<ClassifiedArtifact>> {
    let mut claimed: HashMap<String, ArtifactId> = HashMap::new();
    let mut classified = Vec::with_capacity(artifacts.len());

    for artifact in artifacts {
        let classification = classify_artifact(artifact)?;

        if let Some(name) = classification.module_name() {
            if let Some(previous) = claimed.get(name) {
                reporter.warn(format!(
                    "module name '{}' is provided by both {} and {}",
                    name, previous, artifact.id
                ));
            } else {
                claimed.insert(name.to_string(), artifact.id.clone());
            }
        }

        classified.push(ClassifiedArtifact {
            artifact: artifact.clone(),
            classification,
        });
    }

    let automatic = classified
        .iter()
        .filter(|c| c.classification.is_automatic())
        .count();
    let unnamed = classified
        .iter()
        .filter(|c| c.classification == Classification::Unnamed)
        .count();
    reporter.info(format!(
        "classified {} artifacts ({} automatic, {} unnamed)",
        classified.len(),
        automatic,
        unnamed
    ));

    Ok(classified)
}
