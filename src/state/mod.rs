// Runtime state module
//
// Process-wide resources that later pipeline stages share: the native indexing
// extension, the template environment and a source of unique ids. Each one is
// initialized by its first caller and reused by every caller after that.

use crate::models::{GlobalConfig, TreeConfig};
use anyhow::{Context, Result};
use camino::Utf8Path;
use std::fs;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Folder under the global temp folder where compiled templates are cached.
pub const TEMPLATE_CACHE_DIR: &str = "template_cache";

/// Statements run on every new database connection.
pub const CONNECTION_PRAGMAS: &[&str] = &["PRAGMA synchronous=off", "PRAGMA page_size=32768"];

/// Database bootstrap used by the indexing stages.
pub trait DatabaseBackend: Send + Sync {
    type Connection;

    /// Load the native indexing extension into the database engine.
    fn load_extension(&self) -> Result<()>;

    /// Open the database at `path` and run `pragmas` on it.
    fn open(&self, path: &Utf8Path, pragmas: &[String]) -> Result<Self::Connection>;
}

/// Template rendering engine used for generated pages.
pub trait TemplateEngine: Send + Sync {
    type Environment: Send + Sync;

    /// Build an environment loading templates from `template_folder`,
    /// caching compiled templates in `cache_folder`.
    fn environment(&self, template_folder: &Utf8Path, cache_folder: &Utf8Path) -> Result<Self::Environment>;
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // The guarded values are only written after a successful init.
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A latch that runs a load step once.
///
/// Concurrent callers wait for the first one. A failed load leaves the latch
/// open, so the next caller tries again.
#[derive(Debug, Default)]
pub struct ExtensionLatch {
    loaded: Mutex<bool>,
}

impl ExtensionLatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ensure<F>(&self, load: F) -> Result<()>
    where
        F: FnOnce() -> Result<()>,
    {
        let mut loaded = lock(&self.loaded);
        if *loaded {
            return Ok(());
        }
        load()?;
        *loaded = true;
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        *lock(&self.loaded)
    }
}

/// A handle built on first use and shared afterwards.
#[derive(Debug)]
pub struct LazyHandle<H> {
    handle: Mutex<Option<Arc<H>>>,
}

impl<H> Default for LazyHandle<H> {
    fn default() -> Self {
        Self {
            handle: Mutex::new(None),
        }
    }
}

impl<H> LazyHandle<H> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_try_init<F>(&self, init: F) -> Result<Arc<H>>
    where
        F: FnOnce() -> Result<H>,
    {
        let mut handle = lock(&self.handle);
        if let Some(existing) = handle.as_ref() {
            return Ok(Arc::clone(existing));
        }
        let created = Arc::new(init()?);
        *handle = Some(Arc::clone(&created));
        Ok(created)
    }

    pub fn get(&self) -> Option<Arc<H>> {
        lock(&self.handle).clone()
    }
}

/// Source of unique ids, starting at 1.
#[derive(Debug)]
pub struct IdGenerator {
    next: AtomicU64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    pub fn next_id(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared resources of one indexing run.
///
/// Built once from the loaded [`GlobalConfig`] and passed by reference to the
/// stages that need it. `Runtime` is `Sync`, so worker threads can share it.
///
/// # Usage
/// ```ignore
/// let runtime = Runtime::new(&config, database, templates);
/// for tree in config.trees() {
///     let conn = runtime.connect_database(&tree)?;
///     let env = runtime.template_env()?;
/// }
/// ```
pub struct Runtime<'cfg, D: DatabaseBackend, T: TemplateEngine> {
    config: &'cfg GlobalConfig,
    database: D,
    templates: T,
    extension: ExtensionLatch,
    template_env: LazyHandle<T::Environment>,
    ids: IdGenerator,
}

impl<'cfg, D: DatabaseBackend, T: TemplateEngine> Runtime<'cfg, D, T> {
    pub fn new(config: &'cfg GlobalConfig, database: D, templates: T) -> Self {
        Self {
            config,
            database,
            templates,
            extension: ExtensionLatch::new(),
            template_env: LazyHandle::new(),
            ids: IdGenerator::new(),
        }
    }

    pub fn config(&self) -> &'cfg GlobalConfig {
        self.config
    }

    pub fn database(&self) -> &D {
        &self.database
    }

    pub fn templates(&self) -> &T {
        &self.templates
    }

    /// Load the native extension unless an earlier call already did.
    pub fn load_extension(&self) -> Result<()> {
        self.extension.ensure(|| {
            tracing::info!("Loading native indexing extension");
            self.database
                .load_extension()
                .context("Failed to load native indexing extension")
        })
    }

    /// Open the tree's cross-reference database, loading the extension first.
    pub fn connect_database(&self, tree: &TreeConfig) -> Result<D::Connection> {
        self.load_extension()?;

        let path = tree.database_path();
        let pragmas: Vec<String> = CONNECTION_PRAGMAS.iter().map(|p| p.to_string()).collect();
        let connection = self
            .database
            .open(&path, &pragmas)
            .with_context(|| format!("Failed to open database: {}", path))?;

        tracing::debug!("Connected to {} for tree '{}'", path, tree.name);
        Ok(connection)
    }

    /// The template environment, created on first use.
    pub fn template_env(&self) -> Result<Arc<T::Environment>> {
        self.template_env.get_or_try_init(|| {
            let cache_folder = self.config.temp_folder.join(TEMPLATE_CACHE_DIR);
            if !cache_folder.is_dir() {
                fs::create_dir_all(&cache_folder).with_context(|| {
                    format!("Failed to create template cache: {}", cache_folder)
                })?;
            }

            tracing::info!(
                "Creating template environment for {} (cache: {})",
                self.config.template_folder,
                cache_folder
            );
            self.templates
                .environment(&self.config.template_folder, &cache_folder)
                .context("Failed to create template environment")
        })
    }

    pub fn next_id(&self) -> u64 {
        self.ids.next_id()
    }
}
