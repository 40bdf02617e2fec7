/// Pipeline cache persistence
///
/// Cache blobs are stored one file per pipeline name:
///
/// ```text
/// magic "FPCB" | version u32 LE | payload length u64 LE | payload
/// ```
///
/// Loading never fails: a missing, unreadable or corrupt file yields an empty
/// blob and the pipeline is simply built without a warm cache.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::{engine_debug, engine_err, engine_warn};

const SOURCE: &str = "flint3d::PipelineCacheStore";

const MAGIC: &[u8; 4] = b"FPCB";
const VERSION: u32 = 1;
const HEADER_LEN: usize = 16;
const EXTENSION: &str = "pcache";

/// Directory holding pipeline cache blobs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineCacheStore {
    directory: Option<PathBuf>,
}

impl PipelineCacheStore {
    /// Store blobs in `directory` (created on first save)
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self { directory: Some(directory.into()) }
    }

    /// No persistence: `load` returns nothing, `save` does nothing
    pub fn disabled() -> Self {
        Self { directory: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.directory.is_some()
    }

    pub fn directory(&self) -> Option<&Path> {
        self.directory.as_deref()
    }

    /// File a pipeline's blob is stored in
    pub fn path_for(&self, name: &str) -> Option<PathBuf> {
        self.directory
            .as_ref()
            .map(|directory| directory.join(format!("{}.{}", sanitize_name(name), EXTENSION)))
    }

    /// Stored blob for `name`, or empty
    pub fn load(&self, name: &str) -> Vec<u8> {
        let Some(path) = self.path_for(name) else {
            return Vec::new();
        };

        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) => {
                engine_debug!(SOURCE, "No pipeline cache for '{}' at {}: {}", name, path.display(), e);
                return Vec::new();
            }
        };

        match decode_blob(&bytes) {
            Ok(payload) => {
                engine_debug!(SOURCE, "Loaded pipeline cache '{}' ({} bytes)", name, payload.len());
                payload.to_vec()
            }
            Err(reason) => {
                engine_warn!(SOURCE, "Ignoring pipeline cache {}: {}", path.display(), reason);
                Vec::new()
            }
        }
    }

    /// Write the blob for `name` atomically (temporary file, then rename)
    ///
    /// # Errors
    ///
    /// `Error::BackendError` if the directory or file cannot be written.
    pub fn save(&self, name: &str, data: &[u8]) -> Result<()> {
        let (Some(directory), Some(path)) = (self.directory.as_ref(), self.path_for(name)) else {
            return Ok(());
        };
        if data.is_empty() {
            return Ok(());
        }

        fs::create_dir_all(directory)
            .map_err(|e| engine_err!(SOURCE, "Cannot create cache directory {}: {}", directory.display(), e))?;

        let temporary = path.with_extension(format!("{}.tmp", EXTENSION));
        fs::write(&temporary, encode_blob(data))
            .map_err(|e| engine_err!(SOURCE, "Cannot write {}: {}", temporary.display(), e))?;
        fs::rename(&temporary, &path)
            .map_err(|e| engine_err!(SOURCE, "Cannot move {} into place: {}", path.display(), e))?;

        engine_debug!(SOURCE, "Saved pipeline cache '{}' ({} bytes)", name, data.len());
        Ok(())
    }
}

/// Keep `[A-Za-z0-9_-]`, replace everything else with `_`
pub fn sanitize_name(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect();
    if sanitized.is_empty() {
        "pipeline".to_string()
    } else {
        sanitized
    }
}

fn encode_blob(data: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(HEADER_LEN + data.len());
    bytes.extend_from_slice(MAGIC);
    bytes.extend_from_slice(&VERSION.to_le_bytes());
    bytes.extend_from_slice(&(data.len() as u64).to_le_bytes());
    bytes.extend_from_slice(data);
    bytes
}

fn decode_blob(bytes: &[u8]) -> std::result::Result<&[u8], String> {
    if bytes.len() < HEADER_LEN {
        return Err(format!("truncated header ({} bytes)", bytes.len()));
    }
    let (header, payload) = bytes.split_at(HEADER_LEN);

    if &header[0..4] != MAGIC {
        return Err("bad magic".to_string());
    }

    let mut version = [0u8; 4];
    version.copy_from_slice(&header[4..8]);
    let version = u32::from_le_bytes(version);
    if version != VERSION {
        return Err(format!("version {} (expected {})", version, VERSION));
    }

    let mut length = [0u8; 8];
    length.copy_from_slice(&header[8..16]);
    let length = u64::from_le_bytes(length);
    if length != payload.len() as u64 {
        return Err(format!("length {} but {} payload bytes", length, payload.len()));
    }

    Ok(payload)
}

#[cfg(test)]
#[path = "pipeline_cache_tests.rs"]
mod tests;
