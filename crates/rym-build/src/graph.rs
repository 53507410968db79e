//! Module graph and delegation
//!
//! Modules live in an arena addressed by [`ArtifactId`]. Every automatic
//! module, and everything it transitively depends on, is folded into a
//! single [`Delegate`] whose archive aggregates their content.

use crate::classify::{Classification, ClassifiedArtifact};
use crate::descriptor::ModuleDescriptor;
use rym_package::ArtifactId;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};

/// Lifecycle state of a module
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleState {
    /// Complete descriptor, staged as-is
    Named,
    /// Automatic, not yet folded into the delegate
    AutomaticPending,
    /// Automatic module given a synthesized descriptor
    AutomaticPromoted,
    /// Content moved into the delegate; staged as a forwarder
    Delegated {
        /// Whether the module was automatic when delegated
        automatic: bool,
    },
}

/// Module arena record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    pub id: ArtifactId,
    pub name: String,
    /// Position in the resolver listing
    pub ordinal: usize,
    /// Module archive, `None` once delegated
    pub archive: Option<PathBuf>,
    pub depends_on: BTreeSet<ArtifactId>,
    pub descriptor: ModuleDescriptor,
    state: ModuleState,
}

impl Module {
    pub fn state(&self) -> ModuleState {
        self.state
    }

    /// Automatic and never promoted
    pub fn is_automatic(&self) -> bool {
        matches!(
            self.state,
            ModuleState::AutomaticPending | ModuleState::Delegated { automatic: true }
        )
    }

    pub fn is_delegating(&self) -> bool {
        matches!(self.state, ModuleState::Delegated { .. })
    }

    /// Leaf automatic module eligible for descriptor synthesis
    pub fn is_leaf_automatic(&self) -> bool {
        self.state == ModuleState::AutomaticPending && self.depends_on.is_empty()
    }
}

/// Aggregate module absorbing unconstrained content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delegate {
    pub name: String,
    /// Contributed archives keyed by resolver listing position
    contents: BTreeMap<usize, PathBuf>,
}

impl Delegate {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            contents: BTreeMap::new(),
        }
    }

    fn absorb(&mut self, ordinal: usize, archive: PathBuf) {
        self.contents.insert(ordinal, archive);
    }

    /// Contributed archives in resolver listing order
    pub fn contents(&self) -> impl Iterator<Item = &Path> {
        self.contents.values().map(PathBuf::as_path)
    }

    /// Listing positions of every contribution
    pub fn ordinals(&self) -> impl Iterator<Item = usize> + '_ {
        self.contents.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.contents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }
}

/// Classified module set with its delegate
#[derive(Debug, Clone)]
pub struct ModuleGraph {
    modules: Vec<Module>,
    index: HashMap<ArtifactId, usize>,
    delegate: Delegate,
    unnamed: Vec<ArtifactId>,
}

impl ModuleGraph {
    /// Create an empty graph
    pub fn new(delegate_name: impl Into<String>) -> Self {
        Self {
            modules: Vec::new(),
            index: HashMap::new(),
            delegate: Delegate::new(delegate_name),
            unnamed: Vec::new(),
        }
    }

    /// Build the graph from classified artifacts in listing order
    ///
    /// Unnamed artifacts go straight into the delegate.
    pub fn build(classified: Vec<ClassifiedArtifact>, delegate_name: impl Into<String>) -> Self {
        let mut graph = Self::new(delegate_name);

        for (ordinal, entry) in classified.into_iter().enumerate() {
            let artifact = entry.artifact;
            let (descriptor, state) = match entry.classification {
                Classification::Named(d) => (d, ModuleState::Named),
                Classification::Automatic(d) => (d, ModuleState::AutomaticPending),
                Classification::Unnamed => {
                    graph.delegate.absorb(ordinal, artifact.path);
                    graph.unnamed.push(artifact.id);
                    continue;
                }
            };

            graph.insert(Module {
                id: artifact.id,
                name: descriptor.name.clone(),
                ordinal,
                archive: Some(artifact.path),
                depends_on: artifact.depends_on,
                descriptor,
                state,
            });
        }

        graph
    }

    fn insert(&mut self, module: Module) {
        self.index.insert(module.id.clone(), self.modules.len());
        self.modules.push(module);
    }

    pub fn get(&self, id: &ArtifactId) -> Option<&Module> {
        self.index.get(id).map(|&i| &self.modules[i])
    }

    /// Modules in listing order
    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    /// Artifacts without module identity
    pub fn unnamed(&self) -> &[ArtifactId] {
        &self.unnamed
    }

    pub fn delegate(&self) -> &Delegate {
        &self.delegate
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Leaf automatic modules, in listing order
    pub fn leaf_automatic(&self) -> Vec<ArtifactId> {
        self.modules
            .iter()
            .filter(|m| m.is_leaf_automatic())
            .map(|m| m.id.clone())
            .collect()
    }

    /// Modules staged with their own archive
    pub fn standalone(&self) -> impl Iterator<Item = &Module> {
        self.modules.iter().filter(|m| !m.is_delegating())
    }

    /// Modules staged as forwarders to the delegate
    pub fn delegating(&self) -> impl Iterator<Item = &Module> {
        self.modules.iter().filter(|m| m.is_delegating())
    }

    /// Replace a pending automatic module with a synthesized one
    ///
    /// Returns `false` when the module is unknown or not pending.
    pub fn promote(&mut self, id: &ArtifactId, archive: PathBuf, descriptor: ModuleDescriptor) -> bool {
        let Some(&i) = self.index.get(id) else {
            return false;
        };
        let module = &mut self.modules[i];
        if module.state != ModuleState::AutomaticPending {
            return false;
        }

        module.name = descriptor.name.clone();
        module.descriptor = descriptor;
        module.archive = Some(archive);
        module.state = ModuleState::AutomaticPromoted;
        true
    }

    /// Fold every pending automatic module and its transitive dependencies
    /// into the delegate
    ///
    /// Returns the newly delegated ids in visit order.
    pub fn delegate_automatic(&mut self) -> Vec<ArtifactId> {
        let mut delegated = Vec::new();

        for root in 0..self.modules.len() {
            if self.modules[root].state == ModuleState::AutomaticPending {
                self.delegate_from(root, &mut delegated);
            }
        }

        delegated
    }

    fn delegate_from(&mut self, root: usize, delegated: &mut Vec<ArtifactId>) {
        let mut stack = vec![root];

        while let Some(i) = stack.pop() {
            let module = &mut self.modules[i];
            if module.is_delegating() {
                continue;
            }

            let automatic = module.state == ModuleState::AutomaticPending;
            module.state = ModuleState::Delegated { automatic };
            if let Some(archive) = module.archive.take() {
                self.delegate.absorb(module.ordinal, archive);
            }
            delegated.push(module.id.clone());

            let targets: Vec<usize> = self.modules[i]
                .depends_on
                .iter()
                .filter_map(|id| self.index.get(id).copied())
                .collect();
            stack.extend(targets.into_iter().rev());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rym_package::Artifact;

    fn entry(id: &str, name: Option<&str>, automatic: bool, deps: &[&str]) -> ClassifiedArtifact {
        let artifact = Artifact {
            id: id.parse().unwrap(),
            path: PathBuf::from(format!("{}.jar", id.replace(':', "-"))),
            depends_on: deps.iter().map(|d| d.parse().unwrap()).collect(),
        };
        let classification = match name {
            Some(n) if automatic => Classification::Automatic(ModuleDescriptor::automatic(n)),
            Some(n) => Classification::Named(ModuleDescriptor {
                name: n.to_string(),
                open: false,
                automatic: false,
                requires: Vec::new(),
            }),
            None => Classification::Unnamed,
        };
        ClassifiedArtifact {
            artifact,
            classification,
        }
    }

    fn id(s: &str) -> ArtifactId {
        s.parse().unwrap()
    }

    #[test]
    fn test_unnamed_goes_straight_to_delegate() {
        let graph = ModuleGraph::build(
            vec![
                entry("g:a:1", Some("a"), false, &[]),
                entry("g:legacy:1", None, false, &[]),
            ],
            "rym.delegate",
        );

        assert_eq!(graph.len(), 1);
        assert_eq!(graph.unnamed(), [id("g:legacy:1")]);
        assert_eq!(graph.delegate().ordinals().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn test_cycle_through_automatic_module_terminates() {
        let mut graph = ModuleGraph::build(
            vec![
                entry("g:a:1", Some("a"), true, &["g:b:1"]),
                entry("g:b:1", Some("b"), false, &["g:a:1"]),
            ],
            "rym.delegate",
        );

        let delegated = graph.delegate_automatic();
        assert_eq!(delegated, vec![id("g:a:1"), id("g:b:1")]);
        assert_eq!(graph.delegate().len(), 2);
        assert!(graph.standalone().next().is_none());
    }

    #[test]
    fn test_promoted_module_is_not_pending() {
        let mut graph = ModuleGraph::build(
            vec![
                entry("g:leaf:1", Some("leaf"), true, &[]),
                entry("g:user:1", Some("user"), false, &[]),
            ],
            "rym.delegate",
        );
        assert_eq!(graph.leaf_automatic(), vec![id("g:leaf:1")]);

        let descriptor = ModuleDescriptor {
            name: "leaf".to_string(),
            open: false,
            automatic: false,
            requires: vec!["java.base".to_string()],
        };
        assert!(graph.promote(&id("g:leaf:1"), PathBuf::from("leaf.jar"), descriptor.clone()));
        assert!(!graph.promote(&id("g:leaf:1"), PathBuf::from("leaf.jar"), descriptor));
        assert!(!graph.promote(&id("g:user:1"), PathBuf::from("user.jar"), ModuleDescriptor::automatic("user")));

        assert!(graph.delegate_automatic().is_empty());
        let leaf = graph.get(&id("g:leaf:1")).unwrap();
        assert_eq!(leaf.state(), ModuleState::AutomaticPromoted);
        assert!(!leaf.is_automatic());
        assert!(graph.delegate().is_empty());
    }
}
