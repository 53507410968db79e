//! Dependency coordinates and resolved artifact identities

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::PackageError;

/// Group assumed when a coordinate names only the artifact
pub const DEFAULT_GROUP: &str = "org.reaktivity";

/// Declared dependency: `[group:]artifact[:version]`
///
/// The version may be absent, in which case it is filled from managed
/// versions supplied by imports.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Coordinate {
    pub group: String,
    pub artifact: String,
    pub version: Option<String>,
}

/// Version-less identity of a coordinate
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CoordinateKey {
    pub group: String,
    pub artifact: String,
}

/// Identity of a resolved artifact
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArtifactId {
    pub group: String,
    pub artifact: String,
    pub version: String,
}

impl Coordinate {
    pub fn new(
        group: impl Into<String>,
        artifact: impl Into<String>,
        version: Option<impl Into<String>>,
    ) -> Self {
        Self {
            group: group.into(),
            artifact: artifact.into(),
            version: version.map(Into::into),
        }
    }

    /// Parse a coordinate string
    ///
    /// Accepted forms are `artifact`, `group:artifact` and
    /// `group:artifact:version`.
    pub fn parse(s: &str) -> crate::Result<Self> {
        let parts: Vec<&str> = s.trim().split(':').collect();
        if parts.iter().any(|p| p.trim().is_empty()) {
            return Err(PackageError::InvalidCoordinate(s.to_string()));
        }

        match parts.as_slice() {
            [artifact] => Ok(Self::new(DEFAULT_GROUP, *artifact, None::<String>)),
            [group, artifact] => Ok(Self::new(*group, *artifact, None::<String>)),
            [group, artifact, version] => Ok(Self::new(*group, *artifact, Some(*version))),
            _ => Err(PackageError::InvalidCoordinate(s.to_string())),
        }
    }

    /// Version-less identity used when comparing across versions
    pub fn key(&self) -> CoordinateKey {
        CoordinateKey {
            group: self.group.clone(),
            artifact: self.artifact.clone(),
        }
    }

    /// Whether a concrete version is present
    pub fn is_pinned(&self) -> bool {
        self.version.is_some()
    }

    /// Same coordinate with the given version
    pub fn with_version(&self, version: impl Into<String>) -> Self {
        Self {
            group: self.group.clone(),
            artifact: self.artifact.clone(),
            version: Some(version.into()),
        }
    }

    /// Artifact identity, if the coordinate is pinned
    pub fn to_artifact_id(&self) -> Option<ArtifactId> {
        self.version
            .as_ref()
            .map(|version| ArtifactId::new(&self.group, &self.artifact, version))
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{}:{}:{}", self.group, self.artifact, version),
            None => write!(f, "{}:{}", self.group, self.artifact),
        }
    }
}

impl FromStr for Coordinate {
    type Err = PackageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Coordinate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Coordinate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

impl CoordinateKey {
    pub fn new(group: impl Into<String>, artifact: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            artifact: artifact.into(),
        }
    }
}

impl fmt::Display for CoordinateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group, self.artifact)
    }
}

impl Serialize for CoordinateKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CoordinateKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        match s.split_once(':') {
            Some((group, artifact)) if !group.is_empty() && !artifact.is_empty() => {
                Ok(Self::new(group, artifact))
            }
            _ => Err(serde::de::Error::custom(format!(
                "invalid managed coordinate '{}'",
                s
            ))),
        }
    }
}

impl ArtifactId {
    pub fn new(
        group: impl Into<String>,
        artifact: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            artifact: artifact.into(),
            version: version.into(),
        }
    }

    pub fn key(&self) -> CoordinateKey {
        CoordinateKey::new(&self.group, &self.artifact)
    }

    pub fn to_coordinate(&self) -> Coordinate {
        Coordinate::new(&self.group, &self.artifact, Some(&self.version))
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group, self.artifact, self.version)
    }
}

impl FromStr for ArtifactId {
    type Err = PackageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split(':').collect::<Vec<_>>().as_slice() {
            [group, artifact, version]
                if !group.is_empty() && !artifact.is_empty() && !version.is_empty() =>
            {
                Ok(Self::new(*group, *artifact, *version))
            }
            _ => Err(PackageError::InvalidCoordinate(s.to_string())),
        }
    }
}

impl Serialize for ArtifactId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ArtifactId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
