//! Name → scene factory registry with a per-catalog resolution cache.

use std::{
    collections::{BTreeMap, HashMap},
    fmt,
    sync::{Arc, Mutex, MutexGuard},
};

use futures::future::{self, BoxFuture, FutureExt};

use crate::{
    scene::{is_empty_scene, SceneConfig, SurfaceSize, VisualScene},
    Result, SlotDeckError,
};

/// Builds scene instances once a scene's resources have been resolved.
pub trait SceneFactory: Send + Sync {
    fn create(&self, size: SurfaceSize, config: &SceneConfig) -> Result<Box<dyn VisualScene>>;
}

impl<F> SceneFactory for F
where
    F: Fn(SurfaceSize, &SceneConfig) -> Result<Box<dyn VisualScene>> + Send + Sync,
{
    fn create(&self, size: SurfaceSize, config: &SceneConfig) -> Result<Box<dyn VisualScene>> {
        self(size, config)
    }
}

/// Pending resolution of a scene's factory.
pub type SceneFuture = BoxFuture<'static, Result<Arc<dyn SceneFactory>>>;

/// Produces a fresh [`SceneFuture`] each time a scene must be resolved.
pub type SceneLoader = Arc<dyn Fn() -> SceneFuture + Send + Sync>;

/// Pending construction of a scene instance. Resolves to `None` on failure.
pub type InstanceFuture = BoxFuture<'static, Option<Box<dyn VisualScene>>>;

/// Maps scene names to asynchronous loaders.
///
/// A successfully resolved factory is cached for the lifetime of the catalog,
/// so a scene's loader runs at most once per catalog unless it fails. Failed
/// resolutions are not cached and may be retried.
#[derive(Default)]
pub struct SceneCatalog {
    loaders: BTreeMap<String, SceneLoader>,
    cache: Mutex<HashMap<String, Arc<dyn SceneFactory>>>,
}

impl SceneCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `loader` under `name`. Returns `false` and leaves the
    /// catalog untouched when the name is reserved or already taken.
    pub fn register<L>(&mut self, name: impl Into<String>, loader: L) -> bool
    where
        L: Fn() -> SceneFuture + Send + Sync + 'static,
    {
        let name = name.into();
        if is_empty_scene(&name) {
            tracing::warn!(scene = %name, "refusing to register reserved scene name");
            return false;
        }
        if self.loaders.contains_key(&name) {
            return false;
        }
        self.loaders.insert(name, Arc::new(loader));
        true
    }

    /// Registers a factory that is available without any loading work.
    pub fn register_factory<F>(&mut self, name: impl Into<String>, factory: F) -> bool
    where
        F: SceneFactory + 'static,
    {
        let factory: Arc<dyn SceneFactory> = Arc::new(factory);
        self.register(name, move || future::ready(Ok(factory.clone())).boxed())
    }

    /// Registered scene names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.loaders.keys().map(String::as_str)
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.loaders.contains_key(name)
    }

    pub fn is_cached(&self, name: &str) -> bool {
        self.lock_cache()
            .map(|cache| cache.contains_key(name))
            .unwrap_or(false)
    }

    /// Returns the factory for `name`, running its loader on first use.
    pub async fn resolve(&self, name: &str) -> Result<Arc<dyn SceneFactory>> {
        let cached = self.lock_cache()?.get(name).cloned();
        if let Some(factory) = cached {
            tracing::trace!(scene = name, "scene factory cache hit");
            return Ok(factory);
        }

        let loader = self
            .loaders
            .get(name)
            .cloned()
            .ok_or_else(|| SlotDeckError::UnknownScene(name.to_string()))?;

        let factory = loader().await?;

        // Two concurrent resolutions may both finish; the first one cached wins.
        let mut cache = self.lock_cache()?;
        let factory = cache.entry(name.to_string()).or_insert(factory).clone();
        tracing::debug!(scene = name, "scene factory resolved");
        Ok(factory)
    }

    /// Resolves and constructs an instance of `name`.
    ///
    /// Never fails: load or construction errors are logged and reported as
    /// `None`, as is the reserved empty-slot name (without any loading).
    pub async fn instantiate(
        &self,
        name: &str,
        size: SurfaceSize,
        config: &SceneConfig,
    ) -> Option<Box<dyn VisualScene>> {
        if is_empty_scene(name) {
            return None;
        }

        let factory = match self.resolve(name).await {
            Ok(factory) => factory,
            Err(err) => {
                tracing::warn!(scene = name, %err, "scene failed to load");
                return None;
            }
        };

        match factory.create(size, config) {
            Ok(scene) => Some(scene),
            Err(err) => {
                tracing::warn!(scene = name, %err, "scene failed to construct");
                None
            }
        }
    }

    /// Owned variant of [`Self::instantiate`] for callers that poll the load
    /// across frames.
    pub fn instantiate_task(
        self: &Arc<Self>,
        name: String,
        size: SurfaceSize,
        config: SceneConfig,
    ) -> InstanceFuture {
        let catalog = Arc::clone(self);
        async move { catalog.instantiate(&name, size, &config).await }.boxed()
    }

    fn lock_cache(&self) -> Result<MutexGuard<'_, HashMap<String, Arc<dyn SceneFactory>>>> {
        self.cache
            .lock()
            .map_err(|_| SlotDeckError::msg("scene catalog cache has been poisoned"))
    }
}

impl fmt::Debug for SceneCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SceneCatalog")
            .field("scenes", &self.loaders.keys().collect::<Vec<_>>())
            .finish()
    }
}
