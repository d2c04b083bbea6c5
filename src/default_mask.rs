//! Process-wide default mask.
//!
//! The first use spawns one background thread that loads the mask from the disk cache or,
//! on a miss, generates it. The result is published once into a [`OnceBroadcast`] and lives
//! until the process exits. Readers that arrive earlier block until it is published. A freshly
//! generated mask is written to the cache after publishing, so waiters never wait on disk I/O.

use std::path::PathBuf;
use std::sync::{Arc, LazyLock, Mutex, OnceLock, PoisonError};
use std::thread::JoinHandle;

use crate::cache::DiskCache;
use crate::descriptor::{Descriptor, ValidDescriptor};
use crate::foundation::broadcast::OnceBroadcast;
use crate::foundation::core::Rgba8;
use crate::foundation::error::SpoilerResult;
use crate::generate::generate_valid;
use crate::mask::SpoilerMask;

/// Alpha of the black fill under the image spoiler variant.
pub const IMAGE_SPOILER_DARKEN_ALPHA: u8 = 32;

pub const ENV_CACHE_DIR: &str = "SPOILER_MASK_CACHE_DIR";
pub const ENV_SCALE: &str = "SPOILER_MASK_SCALE";

/// Configuration of the process-wide default mask.
#[derive(Clone, Debug, PartialEq)]
pub struct DefaultMaskOpts {
    /// UI scale times device pixel ratio.
    pub scale: f64,
    /// Base cache directory; the mask lives in `<base>/spoiler/mask`. `None` disables caching.
    pub cache_base: Option<PathBuf>,
}

impl Default for DefaultMaskOpts {
    fn default() -> Self {
        Self {
            scale: 1.0,
            cache_base: None,
        }
    }
}

impl DefaultMaskOpts {
    /// Defaults overridden by `SPOILER_MASK_SCALE` and `SPOILER_MASK_CACHE_DIR`.
    pub fn from_env() -> Self {
        let scale = std::env::var(ENV_SCALE)
            .ok()
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|s| s.is_finite() && *s > 0.0)
            .unwrap_or(1.0);
        let cache_base = std::env::var_os(ENV_CACHE_DIR)
            .map(PathBuf::from)
            .filter(|p| !p.as_os_str().is_empty());
        Self { scale, cache_base }
    }

    pub fn descriptor(&self) -> Descriptor {
        Descriptor::for_scale(self.scale)
    }
}

/// Where a published mask came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MaskSource {
    Cache,
    Generated,
}

type Generator = Arc<dyn Fn(&ValidDescriptor) -> SpoilerMask + Send + Sync>;

struct MaskTask {
    descriptor: ValidDescriptor,
    cache: DiskCache,
    generator: Generator,
}

impl MaskTask {
    fn run(self, slot: &OnceBroadcast<SpoilerMask>, source: &OnceLock<MaskSource>) {
        let validator = self.descriptor.validator();
        let (mask, from) = match self.cache.read(Some(&validator)) {
            Some(mask) => (mask, MaskSource::Cache),
            None => ((self.generator)(&self.descriptor), MaskSource::Generated),
        };
        let _ = source.set(from);
        slot.publish(mask);
        tracing::debug!(source = ?from, "published spoiler mask");

        if from == MaskSource::Generated
            && let Some(mask) = slot.get()
        {
            self.cache.write(mask);
        }
    }
}

/// A mask computed once on a background thread and shared by reference afterwards.
pub struct LazyMask {
    slot: Arc<OnceBroadcast<SpoilerMask>>,
    source: Arc<OnceLock<MaskSource>>,
    task: Mutex<Option<MaskTask>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl LazyMask {
    pub fn new(descriptor: ValidDescriptor, cache: DiskCache) -> Self {
        Self::with_generator(descriptor, cache, generate_valid)
    }

    /// Like [`LazyMask::new`] with a custom generator for cache misses.
    pub fn with_generator<G>(descriptor: ValidDescriptor, cache: DiskCache, generator: G) -> Self
    where
        G: Fn(&ValidDescriptor) -> SpoilerMask + Send + Sync + 'static,
    {
        Self {
            slot: Arc::new(OnceBroadcast::new()),
            source: Arc::new(OnceLock::new()),
            task: Mutex::new(Some(MaskTask {
                descriptor,
                cache,
                generator: Arc::new(generator),
            })),
            worker: Mutex::new(None),
        }
    }

    /// Spawn the background computation. Only the first call does anything.
    pub fn start(&self) {
        // Held until the handle is stored, so `join` never misses a running worker.
        let mut pending = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(task) = pending.take() else {
            return;
        };
        let slot = Arc::clone(&self.slot);
        let source = Arc::clone(&self.source);
        let mut worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
        *worker = Some(std::thread::spawn(move || task.run(&slot, &source)));
    }

    /// The mask if it is already published. Never blocks and never starts the computation.
    pub fn get(&self) -> Option<&SpoilerMask> {
        self.slot.get()
    }

    /// The mask, starting the computation if needed and blocking until it is published.
    pub fn wait(&self) -> &SpoilerMask {
        if let Some(mask) = self.slot.get() {
            return mask;
        }
        self.start();
        self.slot.wait()
    }

    pub fn source(&self) -> Option<MaskSource> {
        self.source.get().copied()
    }

    /// Wait for the background thread to finish, including the cache write after publishing.
    ///
    /// Concurrent callers all block until the worker is done.
    pub fn join(&self) {
        let mut worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = worker.take()
            && handle.join().is_err()
        {
            tracing::error!("spoiler mask worker panicked");
        }
    }
}

static DEFAULT_MASK: OnceLock<LazyMask> = OnceLock::new();

static IMAGE_SPOILER: LazyLock<SpoilerMask> = LazyLock::new(|| {
    default_mask().over_backdrop(Rgba8::new(0, 0, 0, IMAGE_SPOILER_DARKEN_ALPHA))
});

fn default_lazy(opts: DefaultMaskOpts) -> LazyMask {
    let descriptor = opts.descriptor().validated().unwrap_or_else(|err| {
        tracing::warn!(%err, scale = opts.scale, "falling back to unscaled spoiler mask");
        ValidDescriptor::default()
    });
    LazyMask::new(descriptor, DiskCache::new(opts.cache_base))
}

/// Start computing the default mask with `opts`.
///
/// Only the first preparation configures the mask; later calls (and [`default_mask`] calls made
/// before any preparation) keep whatever configuration won.
pub fn prepare_default_mask(opts: DefaultMaskOpts) -> SpoilerResult<()> {
    opts.descriptor().validate()?;
    DEFAULT_MASK.get_or_init(|| default_lazy(opts)).start();
    Ok(())
}

/// The process-wide default mask, blocking until it is ready.
///
/// Prepares it from [`DefaultMaskOpts::from_env`] if nothing prepared it yet.
pub fn default_mask() -> &'static SpoilerMask {
    DEFAULT_MASK
        .get_or_init(|| default_lazy(DefaultMaskOpts::from_env()))
        .wait()
}

/// The default mask if it is already published.
pub fn try_default_mask() -> Option<&'static SpoilerMask> {
    DEFAULT_MASK.get().and_then(LazyMask::get)
}

/// The default mask drawn over a translucent black fill, for covering images.
pub fn default_image_spoiler() -> &'static SpoilerMask {
    &IMAGE_SPOILER
}

/// Wait for the default mask's background work, including its cache write.
pub fn finish_default_mask() {
    if let Some(lazy) = DEFAULT_MASK.get() {
        lazy.join();
    }
}
