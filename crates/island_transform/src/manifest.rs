//! Client chunk manifest.
//!
//! After the client build has emitted one chunk per client component, the
//! manifest maps each component name to the URL of its chunk. It is written
//! once, as a JavaScript module, into the build output directory.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::registry::{self, ComponentDescriptor, ComponentMode, RegistryError, canonical_id_path};

/// File name of the manifest module inside the output directory.
pub const MANIFEST_FILE_NAME: &str = "components.islands.mjs";

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to write the chunk manifest: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode the chunk manifest: {0}")]
    Json(#[from] serde_json::Error),
}

/// Collects the chunks of client components while a build is running.
///
/// [`finish`](Self::finish) consumes the builder, so the manifest can only be
/// produced once every chunk has been recorded.
#[derive(Debug)]
pub struct ChunkManifestBuilder {
    /// `(canonical file path, component name)` of every client component.
    clients: Vec<(String, String)>,
    base_url: String,
    entries: BTreeMap<String, String>,
}

impl ChunkManifestBuilder {
    /// # Errors
    ///
    /// Returns an error when the registry snapshot is inconsistent.
    pub fn new(
        descriptors: &[ComponentDescriptor],
        base_url: impl Into<String>,
    ) -> Result<Self, RegistryError> {
        registry::validate(descriptors)?;
        let clients = descriptors
            .iter()
            .filter(|descriptor| descriptor.mode == ComponentMode::Client)
            .map(|descriptor| {
                (
                    canonical_id_path(&descriptor.file_path),
                    descriptor.name.clone(),
                )
            })
            .collect();
        Ok(Self {
            clients,
            base_url: base_url.into(),
            entries: BTreeMap::new(),
        })
    }

    /// Record an emitted chunk.
    ///
    /// `facade_module_id` is the module the chunk was built from. Returns
    /// `false` (and records nothing) when it is not a client component.
    pub fn record_chunk(&mut self, facade_module_id: &str, file_name: &str) -> bool {
        let path = canonical_id_path(facade_module_id);
        let Some((_, name)) = self.clients.iter().find(|(client, _)| *client == path) else {
            return false;
        };
        let url = join_url(&self.base_url, file_name);
        debug!(component = %name, %url, "recorded client chunk");
        self.entries.insert(name.clone(), url);
        true
    }

    pub fn finish(self) -> ChunkManifest {
        ChunkManifest {
            entries: self.entries,
        }
    }
}

fn join_url(base_url: &str, file_name: &str) -> String {
    if base_url.is_empty() {
        return file_name.to_string();
    }
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        file_name.trim_start_matches('/')
    )
}

/// Component name → chunk URL, ordered by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkManifest {
    entries: BTreeMap<String, String>,
}

impl ChunkManifest {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render the manifest module source.
    ///
    /// # Errors
    ///
    /// Returns an error if the entries cannot be encoded.
    pub fn to_module(&self) -> Result<String, ManifestError> {
        let object = serde_json::to_string_pretty(&self.entries)?;
        Ok(format!("export const islandComponents = {object};\n"))
    }

    /// Write the manifest module into `dir` and return the written path.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the file cannot be written.
    pub fn write_to(&self, dir: impl AsRef<Path>) -> Result<PathBuf, ManifestError> {
        let dir = dir.as_ref();
        let module = self.to_module()?;
        std::fs::create_dir_all(dir)?;
        let path = dir.join(MANIFEST_FILE_NAME);
        std::fs::write(&path, module)?;
        debug!(path = %path.display(), entries = self.entries.len(), "wrote chunk manifest");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptors() -> Vec<ComponentDescriptor> {
        vec![
            ComponentDescriptor::new(
                "Counter",
                "/app/components/Counter.client.vue",
                ComponentMode::Client,
                false,
            ),
            ComponentDescriptor::new(
                "Counter",
                "/app/components/Counter.server.vue",
                ComponentMode::Server,
                false,
            ),
            ComponentDescriptor::new(
                "Chart",
                "/app/components/Chart.client.vue",
                ComponentMode::Client,
                false,
            ),
        ]
    }

    #[test]
    fn test_records_client_chunks_only() {
        let mut builder = ChunkManifestBuilder::new(&descriptors(), "/_islands/").unwrap();
        assert!(builder.record_chunk("/app/components/Counter.client.vue", "Counter.a1b2.js"));
        assert!(builder.record_chunk(
            "/app/pages/../components/Chart.client.vue?vue&type=script",
            "/Chart.c3d4.js"
        ));
        assert!(!builder.record_chunk("/app/components/Counter.server.vue", "server.js"));
        assert!(!builder.record_chunk("/app/main.ts", "main.js"));

        let manifest = builder.finish();
        assert_eq!(manifest.len(), 2);
        assert_eq!(manifest.get("Counter"), Some("/_islands/Counter.a1b2.js"));
        assert_eq!(manifest.get("Chart"), Some("/_islands/Chart.c3d4.js"));
    }

    #[test]
    fn test_module_is_ordered_by_name() {
        let mut builder = ChunkManifestBuilder::new(&descriptors(), "").unwrap();
        builder.record_chunk("/app/components/Counter.client.vue", "counter.js");
        builder.record_chunk("/app/components/Chart.client.vue", "chart.js");
        let module = builder.finish().to_module().unwrap();
        assert_eq!(
            module,
            "export const islandComponents = {\n  \"Chart\": \"chart.js\",\n  \"Counter\": \"counter.js\"\n};\n"
        );
    }

    #[test]
    fn test_empty_manifest() {
        let manifest = ChunkManifestBuilder::new(&[], "/").unwrap().finish();
        assert!(manifest.is_empty());
        assert_eq!(
            manifest.to_module().unwrap(),
            "export const islandComponents = {};\n"
        );
    }

    #[test]
    fn test_names_are_escaped() {
        let descriptors = vec![ComponentDescriptor::new(
            "Odd\"Name",
            "/a.vue",
            ComponentMode::Client,
            false,
        )];
        let mut builder = ChunkManifestBuilder::new(&descriptors, "").unwrap();
        builder.record_chunk("/a.vue", "a.js");
        let module = builder.finish().to_module().unwrap();
        assert!(module.contains(r#""Odd\"Name": "a.js""#));
    }

    #[test]
    fn test_inconsistent_registry_is_an_error() {
        let mut descriptors = descriptors();
        descriptors.push(descriptors[0].clone());
        assert!(matches!(
            ChunkManifestBuilder::new(&descriptors, ""),
            Err(RegistryError::DuplicateDescriptor { .. })
        ));
    }

    #[test]
    fn test_write_to() {
        let dir = std::env::temp_dir().join(format!(
            "island-manifest-test-{}",
            std::process::id()
        ));
        let mut builder = ChunkManifestBuilder::new(&descriptors(), "/c").unwrap();
        builder.record_chunk("/app/components/Chart.client.vue", "chart.js");
        let path = builder.finish().write_to(&dir).unwrap();

        assert_eq!(path, dir.join(MANIFEST_FILE_NAME));
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("\"Chart\": \"/c/chart.js\""));
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
