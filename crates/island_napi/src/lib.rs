//! Island transform binding for Node.js build tools.

mod error;

#[cfg(all(
    feature = "allocator",
    not(any(
        target_arch = "arm",
        target_os = "freebsd",
        target_os = "windows",
        target_family = "wasm"
    ))
))]
#[global_allocator]
static ALLOC: mimalloc_safe::MiMalloc = mimalloc_safe::MiMalloc;

use std::mem;

use napi::{Status, Task, bindgen_prelude::AsyncTask};
use napi_derive::napi;

use island_transform::{ChunkManifestBuilder, ComponentDescriptor, IslandTransform};

use crate::error::TransformDiagnostic;

/// Controls whether and how source maps are emitted.
#[napi(string_enum)]
pub enum SourcemapOption {
    /// Generate a source map in the `map` field of the result.
    #[napi(value = "external")]
    External,
    /// Append an inline `//# sourceMappingURL=data:...` comment to the code.
    /// The `map` field will be empty.
    #[napi(value = "inline")]
    Inline,
    /// Both: append the inline comment **and** populate the `map` field.
    #[napi(value = "both")]
    Both,
}

/// The bundler producing the final output.
#[napi(string_enum)]
pub enum Bundler {
    #[napi(value = "vite")]
    Vite,
    #[napi(value = "webpack")]
    Webpack,
    #[napi(value = "rspack")]
    Rspack,
}

/// How a component is rendered.
#[napi(string_enum)]
pub enum ComponentMode {
    #[napi(value = "server")]
    Server,
    #[napi(value = "client")]
    Client,
    #[napi(value = "all")]
    All,
}

/// A component known to the host build system.
#[napi(object)]
pub struct Component {
    /// Display name, shared by the client and server halves of a component.
    pub name: String,
    /// Absolute path of the component source file.
    pub file_path: String,
    #[napi(ts_type = "'server' | 'client' | 'all'")]
    pub mode: ComponentMode,
    /// Explicitly declared as an island.
    ///
    /// @default false
    pub island: Option<bool>,
}

impl From<Component> for ComponentDescriptor {
    fn from(component: Component) -> Self {
        let mode = match component.mode {
            ComponentMode::Server => island_transform::ComponentMode::Server,
            ComponentMode::Client => island_transform::ComponentMode::Client,
            ComponentMode::All => island_transform::ComponentMode::All,
        };
        Self::new(
            component.name,
            component.file_path,
            mode,
            component.island.unwrap_or(false),
        )
    }
}

fn descriptors(components: Vec<Component>) -> Vec<ComponentDescriptor> {
    components.into_iter().map(ComponentDescriptor::from).collect()
}

/// Options for transforming island components.
#[napi(object)]
#[derive(Default)]
pub struct TransformOptions {
    /// Rewrite elements marked with `island-client` into client boundaries.
    ///
    /// @default false
    pub client_boundaries: Option<bool>,

    /// Whether the build runs in development mode.
    ///
    /// @default false
    pub dev: Option<bool>,

    /// Project root, emitted as `root-dir` on client boundaries in development mode.
    pub root_dir: Option<String>,

    /// The bundler producing the output.
    ///
    /// @default "vite"
    #[napi(ts_type = "'vite' | 'webpack' | 'rspack'")]
    pub bundler: Option<Bundler>,

    /// Source map generation mode.
    ///
    /// - `"external"`: populate the `map` field with a JSON source map.
    /// - `"inline"`: append an inline `//# sourceMappingURL=data:...` comment; `map` will be empty.
    /// - `"both"`: append the inline comment **and** populate `map`.
    /// - `undefined`: no source map (default).
    #[napi(ts_type = "'external' | 'inline' | 'both'")]
    pub sourcemap: Option<SourcemapOption>,

    /// The import prefix for the island runtime components.
    /// Defaults to `"#islands"`.
    #[napi(js_name = "runtimeURL")]
    pub runtime_url: Option<String>,
}

impl From<TransformOptions> for island_transform::TransformOptions {
    fn from(options: TransformOptions) -> Self {
        let bundler = match options.bundler {
            Some(Bundler::Webpack) => island_transform::Bundler::Webpack,
            Some(Bundler::Rspack) => island_transform::Bundler::Rspack,
            Some(Bundler::Vite) | None => island_transform::Bundler::Vite,
        };
        let sourcemap = match options.sourcemap {
            Some(SourcemapOption::External) => island_transform::SourcemapOption::External,
            Some(SourcemapOption::Inline) => island_transform::SourcemapOption::Inline,
            Some(SourcemapOption::Both) => island_transform::SourcemapOption::Both,
            None => island_transform::SourcemapOption::None,
        };
        let mut converted = Self::new()
            .with_client_boundaries(options.client_boundaries.unwrap_or(false))
            .with_development_mode(options.dev.unwrap_or(false))
            .with_bundler(bundler)
            .with_sourcemap(sourcemap);
        if let Some(root_dir) = options.root_dir {
            converted = converted.with_root_directory(root_dir);
        }
        if let Some(runtime_url) = options.runtime_url {
            converted = converted.with_runtime_url(runtime_url);
        }
        converted
    }
}

/// Result of transforming a component.
#[napi(object, use_nullable = true)]
pub struct TransformResult {
    /// The rewritten component source, or `null` when nothing changed.
    pub code: Option<String>,
    /// Source map JSON string. Empty when no external map was requested or
    /// nothing changed.
    pub map: String,
    /// Parse errors and transform warnings.
    pub diagnostics: Vec<TransformDiagnostic>,
    /// Names of the rewritten slots. Dynamic names appear as their expression.
    pub slots: Vec<String>,
    /// `to` targets of the rewritten client boundaries.
    pub client_boundaries: Vec<String>,
}

impl From<island_transform::TransformResult> for TransformResult {
    fn from(result: island_transform::TransformResult) -> Self {
        Self {
            code: result.code,
            map: result.map,
            diagnostics: TransformDiagnostic::from_diagnostics(result.diagnostics),
            slots: result.slots,
            client_boundaries: result.client_boundaries,
        }
    }
}

fn transform_impl(
    id: &str,
    source_text: &str,
    components: Vec<ComponentDescriptor>,
    options: island_transform::TransformOptions,
) -> napi::Result<TransformResult> {
    let transform = IslandTransform::new(components, options);
    transform
        .transform(id, source_text)
        .map(TransformResult::from)
        .map_err(|err| napi::Error::new(Status::InvalidArg, err.to_string()))
}

/// Whether `id` is an island component of the given registry.
///
/// Throws when the registry is inconsistent.
#[napi]
pub fn is_island_component(id: String, components: Vec<Component>) -> napi::Result<bool> {
    island_transform::is_eligible(&id, &descriptors(components))
        .map_err(|err| napi::Error::new(Status::InvalidArg, err.to_string()))
}

/// Transform a component synchronously on the current thread.
///
/// Files that are not island components of `components` come back with
/// `code: null`. Throws when the registry is inconsistent.
///
/// @example
/// ```javascript
/// import { transformSync } from '@islands/transform-binding';
///
/// const result = transformSync(
///   '/app/components/Card.vue',
///   `<template><slot name="body">Loading</slot></template>`,
///   [{ name: 'Card', filePath: '/app/components/Card.vue', mode: 'server' }],
/// );
///
/// console.log(result.code); // <template><IslandSlot name="body" ...
/// ```
#[napi]
pub fn transform_sync(
    id: String,
    source_text: String,
    components: Vec<Component>,
    options: Option<TransformOptions>,
) -> napi::Result<TransformResult> {
    let options = options.unwrap_or_default();
    transform_impl(&id, &source_text, descriptors(components), options.into())
}

pub struct TransformTask {
    id: String,
    source_text: String,
    components: Vec<ComponentDescriptor>,
    options: island_transform::TransformOptions,
}

#[napi]
impl Task for TransformTask {
    type JsValue = TransformResult;
    type Output = TransformResult;

    fn compute(&mut self) -> napi::Result<Self::Output> {
        let source_text = mem::take(&mut self.source_text);
        let components = mem::take(&mut self.components);
        transform_impl(&self.id, &source_text, components, self.options.clone())
    }

    fn resolve(&mut self, _: napi::Env, result: Self::Output) -> napi::Result<Self::JsValue> {
        Ok(result)
    }
}

/// Transform a component asynchronously on a separate thread.
///
/// Generally `transformSync` is preferable to use as it does not have the overhead
/// of spawning a thread. If you need to parallelize transforms of multiple files,
/// it is recommended to use worker threads.
#[napi]
pub fn transform(
    id: String,
    source_text: String,
    components: Vec<Component>,
    options: Option<TransformOptions>,
) -> AsyncTask<TransformTask> {
    let options = options.unwrap_or_default();
    AsyncTask::new(TransformTask {
        id,
        source_text,
        components: descriptors(components),
        options: options.into(),
    })
}

/// A chunk emitted by the client build.
#[napi(object)]
pub struct Chunk {
    /// The module the chunk was built from, if it has one.
    pub facade_module_id: Option<String>,
    /// The chunk's file name relative to the output directory.
    pub file_name: String,
}

/// Write the client chunk manifest into `outDir` and return its path.
///
/// Only chunks built from client components are recorded. Throws when the
/// registry is inconsistent or the file cannot be written.
#[napi]
pub fn write_chunk_manifest(
    out_dir: String,
    components: Vec<Component>,
    chunks: Vec<Chunk>,
    base_url: Option<String>,
) -> napi::Result<String> {
    let mut builder =
        ChunkManifestBuilder::new(&descriptors(components), base_url.unwrap_or_default())
            .map_err(|err| napi::Error::new(Status::InvalidArg, err.to_string()))?;
    for chunk in &chunks {
        if let Some(facade_module_id) = &chunk.facade_module_id {
            builder.record_chunk(facade_module_id, &chunk.file_name);
        }
    }
    let path = builder
        .finish()
        .write_to(&out_dir)
        .map_err(|err| napi::Error::from_reason(err.to_string()))?;
    Ok(path.to_string_lossy().into_owned())
}
