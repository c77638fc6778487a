//! Island Transform
//!
//! Rewrites the templates of single-file components that render on the
//! server so that parts of them can be filled or hydrated independently.
//!
//! ## Rewrites
//!
//! A `<slot>` becomes a remotely fillable region that keeps its children as
//! a fallback:
//!
//! ```html
//! <slot name="header" :user="user">Welcome</slot>
//! <!-- becomes -->
//! <IslandSlot name="header" :props="[{ user: user }]"><template #fallback>Welcome</template></IslandSlot>
//! ```
//!
//! An element marked with `island-client` becomes an addressable client
//! boundary (when enabled with [`TransformOptions::with_client_boundaries`]):
//!
//! ```html
//! <Counter island-client :start="1" />
//! <!-- becomes -->
//! <IslandBoundary to="Counter-<id>" :island-client="true"><Counter :start="1" /></IslandBoundary>
//! ```
//!
//! Everything else in the file is left byte-for-byte intact, and the rewritten
//! file comes with a source map back to the original.
//!
//! ```
//! use island_transform::{ComponentDescriptor, ComponentMode, IslandTransform, TransformOptions};
//!
//! let registry = vec![ComponentDescriptor::new(
//!     "Card",
//!     "/app/components/Card.vue",
//!     ComponentMode::Server,
//!     false,
//! )];
//! let transform = IslandTransform::new(registry, TransformOptions::new());
//! let result = transform
//!     .transform("/app/components/Card.vue", "<template><slot /></template>")
//!     .unwrap();
//! assert!(result.code.unwrap().contains("<IslandSlot name=\"default\""));
//! ```

mod diagnostic;
pub mod edits;
pub mod manifest;
pub mod markup;
mod options;
mod registry;
mod rewrite;
pub mod scanner;
pub mod sfc;

pub use diagnostic::{Diagnostic, DiagnosticLabel, DiagnosticSeverity};
pub use manifest::{ChunkManifest, ChunkManifestBuilder, MANIFEST_FILE_NAME, ManifestError};
pub use options::{Bundler, SourcemapOption, TransformOptions};
pub use registry::{
    ComponentDescriptor, ComponentMode, ComponentRegistry, RegistryError, is_component_source,
    is_eligible, island_like_components,
};
pub use rewrite::{
    IslandTransform, RewriteError, TransformResult, bindings, stable_id, transform_component,
};
