// ─────────────────────────────────────────────────────────────────────
// MagNet — Laplacian Cache
// ─────────────────────────────────────────────────────────────────────
//! Reuse of built Laplacians across runs and splits.
//!
//! Keyed by `(graph fingerprint, q, normalization)`. Entries live in an
//! in-process map and, when a directory is configured, as JSON files that
//! later runs pick up.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use magnet_types::config::validate_q;
use magnet_types::{LaplacianNorm, MagNetResult};

use crate::graph::DirectedGraph;
use crate::laplacian::MagneticLaplacian;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    fingerprint: String,
    q_bits: u64,
    norm: LaplacianNorm,
}

impl CacheKey {
    fn file_name(&self) -> String {
        let norm = match self.norm {
            LaplacianNorm::Unnormalized => "unnorm",
            LaplacianNorm::Symmetric => "sym",
        };
        format!(
            "laplacian_{}_q{:016x}_{norm}.json",
            &self.fingerprint[..16],
            self.q_bits
        )
    }
}

/// Thread-safe Laplacian cache.
///
/// Thread-safe: the entry map is guarded by a `parking_lot::Mutex`; the
/// lock is not held while a Laplacian is being built.
pub struct LaplacianCache {
    dir: Option<PathBuf>,
    entries: Mutex<HashMap<CacheKey, Arc<MagneticLaplacian>>>,
}

impl LaplacianCache {
    /// Cache without disk persistence.
    pub fn in_memory() -> Self {
        Self {
            dir: None,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Cache persisted under `dir` (created if missing).
    pub fn with_dir(dir: impl AsRef<Path>) -> MagNetResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir: Some(dir),
            entries: Mutex::new(HashMap::new()),
        })
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cached Laplacian for `(graph, q, norm)`, building it on a miss.
    pub fn get_or_build(
        &self,
        graph: &DirectedGraph,
        q: f64,
        norm: LaplacianNorm,
    ) -> MagNetResult<Arc<MagneticLaplacian>> {
        validate_q(q)?;
        let key = CacheKey {
            fingerprint: graph.fingerprint(),
            q_bits: q.to_bits(),
            norm,
        };

        if let Some(hit) = self.entries.lock().get(&key) {
            return Ok(Arc::clone(hit));
        }

        let lap = match self.load_from_disk(&key, graph.num_nodes()) {
            Some(lap) => lap,
            None => {
                let lap = MagneticLaplacian::build(graph, q, norm)?;
                self.store_to_disk(&key, &lap);
                lap
            }
        };

        let mut entries = self.entries.lock();
        let entry = entries.entry(key).or_insert_with(|| Arc::new(lap));
        Ok(Arc::clone(entry))
    }

    fn load_from_disk(&self, key: &CacheKey, num_nodes: usize) -> Option<MagneticLaplacian> {
        let path = self.dir.as_ref()?.join(key.file_name());
        let text = fs::read_to_string(&path).ok()?;
        match serde_json::from_str::<MagneticLaplacian>(&text) {
            Ok(lap) if lap.num_nodes() == num_nodes => {
                log::debug!("Laplacian cache hit: {}", path.display());
                Some(lap)
            }
            Ok(_) => {
                log::warn!("Laplacian cache entry {} has the wrong size, rebuilding", path.display());
                None
            }
            Err(e) => {
                log::warn!("Laplacian cache entry {} unreadable ({e}), rebuilding", path.display());
                None
            }
        }
    }

    fn store_to_disk(&self, key: &CacheKey, lap: &MagneticLaplacian) {
        let Some(dir) = self.dir.as_ref() else {
            return;
        };
        let path = dir.join(key.file_name());
        let written = serde_json::to_string(lap)
            .map_err(|e| e.to_string())
            .and_then(|json| fs::write(&path, json).map_err(|e| e.to_string()));
        if let Err(e) = written {
            log::warn!("could not write Laplacian cache {}: {e}", path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_hit_shares_instance() {
        let cache = LaplacianCache::in_memory();
        let g = DirectedGraph::cycle(5).unwrap();
        let a = cache.get_or_build(&g, 0.1, LaplacianNorm::Unnormalized).unwrap();
        let b = cache.get_or_build(&g, 0.1, LaplacianNorm::Unnormalized).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_distinct_keys() {
        let cache = LaplacianCache::in_memory();
        let g = DirectedGraph::cycle(5).unwrap();
        cache.get_or_build(&g, 0.1, LaplacianNorm::Unnormalized).unwrap();
        cache.get_or_build(&g, 0.2, LaplacianNorm::Unnormalized).unwrap();
        cache.get_or_build(&g, 0.1, LaplacianNorm::Symmetric).unwrap();
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_disk_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let g = DirectedGraph::cycle(6).unwrap();
        let first = LaplacianCache::with_dir(dir.path()).unwrap();
        let built = first.get_or_build(&g, 0.25, LaplacianNorm::Unnormalized).unwrap();
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);

        let second = LaplacianCache::with_dir(dir.path()).unwrap();
        let loaded = second.get_or_build(&g, 0.25, LaplacianNorm::Unnormalized).unwrap();
        assert_eq!(*built, *loaded);
    }

    #[test]
    fn test_invalid_q_not_cached() {
        let cache = LaplacianCache::in_memory();
        let g = DirectedGraph::cycle(3).unwrap();
        assert!(cache.get_or_build(&g, 0.7, LaplacianNorm::Unnormalized).is_err());
        assert!(cache.is_empty());
    }
}
