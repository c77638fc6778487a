//! Component registry contract and island eligibility.
//!
//! The registry is owned by the host build system. The transform only reads
//! it, and re-reads it on every call because components can be added or
//! removed between two invocations (e.g. during dev server HMR).

use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;

use crate::options::normalize_path;

/// How a component is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentMode {
    Server,
    Client,
    All,
}

impl ComponentMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Server => "server",
            Self::Client => "client",
            Self::All => "all",
        }
    }
}

/// A component known to the host build system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentDescriptor {
    /// Display name, e.g. `"ProductCard"`. Shared by the client and server
    /// halves of a paired component.
    pub name: String,
    /// Absolute path of the component source file.
    pub file_path: String,
    pub mode: ComponentMode,
    /// Explicitly declared as an island.
    pub island: bool,
}

impl ComponentDescriptor {
    pub fn new(
        name: impl Into<String>,
        file_path: impl Into<String>,
        mode: ComponentMode,
        island: bool,
    ) -> Self {
        Self {
            name: name.into(),
            file_path: file_path.into(),
            mode,
            island,
        }
    }
}

/// A registry that is inconsistent is a caller error; it is reported, never repaired.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("component '{name}' is registered twice in {} mode", .mode.as_str())]
    DuplicateDescriptor { name: String, mode: ComponentMode },

    #[error("component '{name}' has no file path")]
    MissingFilePath { name: String },
}

/// Read-only provider of the current component list.
///
/// Implemented for closures so that a host can hand over a callback, and
/// for plain vectors/slices when the caller already holds a snapshot.
pub trait ComponentRegistry {
    fn components(&self) -> Vec<ComponentDescriptor>;
}

impl<F> ComponentRegistry for F
where
    F: Fn() -> Vec<ComponentDescriptor>,
{
    fn components(&self) -> Vec<ComponentDescriptor> {
        self()
    }
}

impl ComponentRegistry for Vec<ComponentDescriptor> {
    fn components(&self) -> Vec<ComponentDescriptor> {
        self.clone()
    }
}

impl ComponentRegistry for [ComponentDescriptor] {
    fn components(&self) -> Vec<ComponentDescriptor> {
        self.to_vec()
    }
}

/// Whether `id` names a whole single-file component.
///
/// Bundler ids may carry a query; a `type=` query is a request for one block
/// of the component, not the component itself.
pub fn is_component_source(id: &str) -> bool {
    let (path, query) = id.split_once('?').unwrap_or((id, ""));
    if query.split('&').any(|param| param.starts_with("type=")) {
        return false;
    }
    path.ends_with(".vue")
}

/// The canonical path part of a bundler id.
pub(crate) fn canonical_id_path(id: &str) -> String {
    let path = id.split_once('?').map_or(id, |(path, _)| path);
    normalize_path(path)
}

/// Validate a registry snapshot.
pub(crate) fn validate(descriptors: &[ComponentDescriptor]) -> Result<(), RegistryError> {
    let mut seen = FxHashSet::default();
    for descriptor in descriptors {
        if descriptor.file_path.trim().is_empty() {
            return Err(RegistryError::MissingFilePath {
                name: descriptor.name.clone(),
            });
        }
        if !seen.insert((descriptor.name.as_str(), descriptor.mode)) {
            return Err(RegistryError::DuplicateDescriptor {
                name: descriptor.name.clone(),
                mode: descriptor.mode,
            });
        }
    }
    Ok(())
}

/// Compute the island-like descriptors of a registry snapshot.
///
/// Explicit islands, plus server components that have no client counterpart
/// of the same name (those render only on the server, so their slots must be
/// fillable remotely).
pub fn island_like_components(
    descriptors: &[ComponentDescriptor],
) -> Result<Vec<&ComponentDescriptor>, RegistryError> {
    validate(descriptors)?;

    let mut modes_by_name: FxHashMap<&str, Vec<ComponentMode>> = FxHashMap::default();
    for descriptor in descriptors {
        modes_by_name
            .entry(descriptor.name.as_str())
            .or_default()
            .push(descriptor.mode);
    }

    Ok(descriptors
        .iter()
        .filter(|descriptor| {
            descriptor.island
                || (descriptor.mode == ComponentMode::Server
                    && !modes_by_name
                        .get(descriptor.name.as_str())
                        .is_some_and(|modes| modes.contains(&ComponentMode::Client)))
        })
        .collect())
}

/// Decide whether the transform should run for `id`.
///
/// Pure predicate over the registry snapshot taken for this call.
pub fn is_eligible(
    id: &str,
    registry: &(impl ComponentRegistry + ?Sized),
) -> Result<bool, RegistryError> {
    if !is_component_source(id) {
        return Ok(false);
    }
    let descriptors = registry.components();
    let islands = island_like_components(&descriptors)?;
    let path = canonical_id_path(id);
    Ok(islands
        .iter()
        .any(|descriptor| normalize_path(&descriptor.file_path) == path))
}
