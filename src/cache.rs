use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::codec::{deserialize, serialize};
use crate::descriptor::Validator;
use crate::foundation::error::SpoilerResult;
use crate::mask::SpoilerMask;

/// Files above this size are never read or written.
pub const MAX_CACHE_SIZE: u64 = 5 * 1024 * 1024;
pub const CACHE_FOLDER: &str = "spoiler";
pub const CACHE_FILE: &str = "mask";

/// Best-effort on-disk cache for one mask, at `<base>/spoiler/mask`.
///
/// Every failure is a miss on read and a no-op on write; the mask can always be regenerated.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DiskCache {
    folder: Option<PathBuf>,
}

impl DiskCache {
    /// Cache under `base`, or a disabled cache when there is no base directory.
    pub fn new(base: Option<PathBuf>) -> Self {
        Self {
            folder: base
                .filter(|b| !b.as_os_str().is_empty())
                .map(|b| b.join(CACHE_FOLDER)),
        }
    }

    pub fn disabled() -> Self {
        Self { folder: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.folder.is_some()
    }

    pub fn folder(&self) -> Option<&Path> {
        self.folder.as_deref()
    }

    pub fn path(&self) -> Option<PathBuf> {
        self.folder.as_ref().map(|f| f.join(CACHE_FILE))
    }

    pub fn read(&self, validator: Option<&Validator>) -> Option<SpoilerMask> {
        let path = self.path()?;
        let bytes = match read_bounded(&path) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                tracing::debug!(path = %path.display(), "spoiler mask cache file too large");
                return None;
            }
            Err(err) => {
                tracing::debug!(path = %path.display(), %err, "spoiler mask cache miss");
                return None;
            }
        };
        let mask = deserialize(&bytes, validator)?;
        tracing::debug!(path = %path.display(), "spoiler mask cache hit");
        Some(mask)
    }

    /// Persist `mask`. Returns whether the file was written.
    pub fn write(&self, mask: &SpoilerMask) -> bool {
        let Some(path) = self.path() else {
            return false;
        };
        match self.try_write(&path, mask) {
            Ok(written) => written,
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "failed to write spoiler mask cache");
                false
            }
        }
    }

    fn try_write(&self, path: &Path, mask: &SpoilerMask) -> SpoilerResult<bool> {
        if let Some(folder) = &self.folder {
            std::fs::create_dir_all(folder)?;
        }
        let bytes = serialize(mask)?;
        if bytes.len() as u64 > MAX_CACHE_SIZE {
            tracing::debug!(len = bytes.len(), "encoded spoiler mask exceeds cache ceiling");
            return Ok(false);
        }
        std::fs::write(path, &bytes)?;
        Ok(true)
    }
}

/// Whole file contents, or `None` when it is larger than [`MAX_CACHE_SIZE`].
fn read_bounded(path: &Path) -> std::io::Result<Option<Vec<u8>>> {
    let file = File::open(path)?;
    if file.metadata()?.len() > MAX_CACHE_SIZE {
        return Ok(None);
    }
    let mut bytes = Vec::new();
    file.take(MAX_CACHE_SIZE + 1).read_to_end(&mut bytes)?;
    if bytes.len() as u64 > MAX_CACHE_SIZE {
        return Ok(None);
    }
    Ok(Some(bytes))
}
