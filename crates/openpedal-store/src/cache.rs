//! Freshness cache for per-pedal curve listings.
//!
//! Listing curves means scanning a directory and parsing every file in it.
//! The cache remembers, per pedal, which files were found and their size and
//! modification time, so most listings are answered without a scan.
//!
//! A pedal's entry is trusted while it is younger than the TTL, the directory
//! has not been modified since the entry was last touched, and the recorded
//! metadata of each file still matches; a changed file forces a rescan. During the startup grace period only
//! the (tripled) TTL is checked, so boot does not pay for file stats.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use openpedal_calibration::Pedal;
use serde::{Deserialize, Serialize};
use tokio::fs as async_fs;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::curves::parse_curve_file;
use crate::fs::{read_json, write_json};

/// Longer TTL multiplier while the process is starting up.
const STARTUP_TTL_FACTOR: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    pub ttl: Duration,
    pub startup_grace: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(3600),
            startup_grace: Duration::from_secs(60),
        }
    }
}

/// Size and modification time of one curve file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurveFileMeta {
    pub path: PathBuf,
    pub modified: SystemTime,
    pub size: u64,
}

impl CurveFileMeta {
    /// Stat `path`.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the file cannot be stat'ed.
    pub async fn read(path: &Path) -> std::io::Result<Self> {
        let metadata = async_fs::metadata(path).await?;
        Ok(Self {
            path: path.to_path_buf(),
            modified: metadata.modified()?,
            size: metadata.len(),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedCurve {
    meta: CurveFileMeta,
    cached_at: SystemTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PedalEntry {
    scanned_at: SystemTime,
    curves: BTreeMap<String, CachedCurve>,
}

impl PedalEntry {
    fn oldest(&self) -> SystemTime {
        self.curves
            .values()
            .map(|c| c.cached_at)
            .min()
            .unwrap_or(self.scanned_at)
    }

    fn newest(&self) -> SystemTime {
        self.curves
            .values()
            .map(|c| c.cached_at)
            .chain(std::iter::once(self.scanned_at))
            .max()
            .unwrap_or(self.scanned_at)
    }

    fn names(&self) -> Vec<String> {
        self.curves.keys().cloned().collect()
    }
}

/// Result of a cache lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup {
    Hit(Vec<String>),
    /// Entry missing or stale; the directory must be rescanned
    Miss,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub scans: u64,
}

pub struct CurveCache {
    config: CacheConfig,
    clock: Arc<dyn Clock>,
    started_at: SystemTime,
    file: Option<PathBuf>,
    pedals: BTreeMap<Pedal, PedalEntry>,
    stats: CacheStats,
}

impl CurveCache {
    /// Empty in-memory cache.
    pub fn new(config: CacheConfig, clock: Arc<dyn Clock>, started_at: SystemTime) -> Self {
        Self {
            config,
            clock,
            started_at,
            file: None,
            pedals: BTreeMap::new(),
            stats: CacheStats::default(),
        }
    }

    /// Cache backed by `file`, reloading whatever it holds.
    ///
    /// A missing or corrupt file starts an empty cache.
    pub async fn load(
        file: PathBuf,
        config: CacheConfig,
        clock: Arc<dyn Clock>,
        started_at: SystemTime,
    ) -> Self {
        let mut cache = Self::new(config, clock, started_at);
        match read_json::<BTreeMap<Pedal, PedalEntry>>(&file).await {
            Ok(Some(pedals)) => {
                let entries: usize = pedals.values().map(|p| p.curves.len()).sum();
                info!(path = ?file, entries, "Loaded curve cache");
                cache.pedals = pedals;
            }
            Ok(None) => debug!(path = ?file, "No curve cache on disk"),
            Err(e) => warn!(path = ?file, error = %format!("{e:#}"), "Ignoring unreadable curve cache"),
        }
        cache.file = Some(file);
        cache
    }

    pub fn in_startup_grace(&self) -> bool {
        match self.clock.now().duration_since(self.started_at) {
            Ok(elapsed) => elapsed < self.config.startup_grace,
            Err(_) => true,
        }
    }

    /// Check the cached listing for `pedal` against the state of `dir`.
    ///
    /// Any cached file whose size or modification time changed makes the
    /// lookup miss. Files that are gone are dropped from the listing as long
    /// as they are at most 30% of the pedal's entries; beyond that the lookup
    /// misses too.
    pub async fn lookup(&mut self, pedal: Pedal, dir: &Path) -> CacheLookup {
        let Some(entry) = self.pedals.get(&pedal) else {
            debug!(pedal = %pedal, "No curve cache entry");
            return self.miss();
        };

        let now = self.clock.now();
        let grace = self.in_startup_grace();
        let ttl = if grace {
            self.config.ttl.saturating_mul(STARTUP_TTL_FACTOR)
        } else {
            self.config.ttl
        };
        let age = now.duration_since(entry.oldest()).unwrap_or(Duration::ZERO);

        if age > ttl {
            debug!(pedal = %pedal, age_secs = age.as_secs(), "Curve cache expired");
            return self.miss();
        }

        if grace {
            let names = entry.names();
            self.stats.hits = self.stats.hits.saturating_add(1);
            debug!(pedal = %pedal, curves = names.len(), "Startup curve cache hit, validation skipped");
            return CacheLookup::Hit(names);
        }

        let newest = entry.newest();
        let cached: Vec<(String, CurveFileMeta)> = entry
            .curves
            .iter()
            .map(|(name, c)| (name.clone(), c.meta.clone()))
            .collect();

        match async_fs::metadata(dir).await.and_then(|m| m.modified()) {
            Ok(dir_modified) if dir_modified > newest => {
                debug!(pedal = %pedal, "Curve directory modified after caching");
                return self.miss();
            }
            Ok(_) => {}
            Err(e) => {
                debug!(pedal = %pedal, error = %e, "Cannot stat curve directory");
                return self.miss();
            }
        }

        let mut valid = Vec::with_capacity(cached.len());
        let mut gone = Vec::new();
        for (name, meta) in &cached {
            match CurveFileMeta::read(&meta.path).await {
                Ok(current) if current.modified == meta.modified && current.size == meta.size => {
                    valid.push(name.clone());
                }
                Ok(_) => {
                    debug!(pedal = %pedal, name = %name, "Cached curve file changed");
                    return self.miss();
                }
                Err(_) => gone.push(name.clone()),
            }
        }

        // More than 30% gone
        if gone.len().saturating_mul(10) > cached.len().saturating_mul(3) {
            debug!(pedal = %pedal, gone = gone.len(), total = cached.len(), "Too many curve files gone");
            return self.miss();
        }

        if !gone.is_empty() {
            if let Some(entry) = self.pedals.get_mut(&pedal) {
                for name in &gone {
                    entry.curves.remove(name);
                }
            }
            self.persist().await;
        }

        self.stats.hits = self.stats.hits.saturating_add(1);
        CacheLookup::Hit(valid)
    }

    fn miss(&mut self) -> CacheLookup {
        self.stats.misses = self.stats.misses.saturating_add(1);
        CacheLookup::Miss
    }

    /// Scan `dir` and rebuild the entry for `pedal`.
    ///
    /// Unreadable or invalid curve files are skipped.
    pub async fn rescan(&mut self, pedal: Pedal, dir: &Path) -> Vec<String> {
        self.stats.scans = self.stats.scans.saturating_add(1);
        let now = self.clock.now();
        let mut curves = BTreeMap::new();

        match async_fs::read_dir(dir).await {
            Ok(mut entries) => loop {
                let entry = match entries.next_entry().await {
                    Ok(Some(entry)) => entry,
                    Ok(None) => break,
                    Err(e) => {
                        warn!(pedal = %pedal, error = %e, "Curve directory scan interrupted");
                        break;
                    }
                };
                let path = entry.path();
                if path.extension().and_then(|s| s.to_str()) != Some("json") {
                    continue;
                }
                let Some(name) = path.file_stem().and_then(|s| s.to_str()).map(str::to_owned) else {
                    continue;
                };
                if let Err(e) = parse_curve_file(&path, &name).await {
                    warn!(pedal = %pedal, error = %e, "Skipping curve file");
                    continue;
                }
                match CurveFileMeta::read(&path).await {
                    Ok(meta) => {
                        curves.insert(name, CachedCurve { meta, cached_at: now });
                    }
                    Err(e) => warn!(path = ?path, error = %e, "Cannot stat curve file"),
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(pedal = %pedal, dir = ?dir, "Curve directory does not exist");
            }
            Err(e) => warn!(pedal = %pedal, dir = ?dir, error = %e, "Cannot read curve directory"),
        }

        let entry = PedalEntry { scanned_at: now, curves };
        let names = entry.names();
        info!(pedal = %pedal, curves = names.len(), "Scanned curve directory");
        self.pedals.insert(pedal, entry);
        self.persist().await;
        names
    }

    /// Cached listing if fresh, otherwise a rescan.
    pub async fn list(&mut self, pedal: Pedal, dir: &Path) -> Vec<String> {
        match self.lookup(pedal, dir).await {
            CacheLookup::Hit(names) => names,
            CacheLookup::Miss => self.rescan(pedal, dir).await,
        }
    }

    /// Update one curve in place after it was written.
    ///
    /// Does nothing for a pedal that has no entry yet; its first listing scans.
    pub async fn record(&mut self, pedal: Pedal, name: &str, meta: CurveFileMeta) {
        let now = self.clock.now();
        let Some(entry) = self.pedals.get_mut(&pedal) else {
            return;
        };
        entry.curves.insert(name.to_owned(), CachedCurve { meta, cached_at: now });
        self.persist().await;
    }

    /// Forget one curve after it was deleted.
    pub async fn forget(&mut self, pedal: Pedal, name: &str) {
        let now = self.clock.now();
        let Some(entry) = self.pedals.get_mut(&pedal) else {
            return;
        };
        if entry.curves.remove(name).is_some() {
            // Deleting touched the directory; move the entry past that.
            entry.scanned_at = now;
            self.persist().await;
        }
    }

    pub async fn invalidate_pedal(&mut self, pedal: Pedal) {
        if self.pedals.remove(&pedal).is_some() {
            info!(pedal = %pedal, "Invalidated curve cache");
            self.persist().await;
        }
    }

    pub async fn invalidate_all(&mut self) {
        self.pedals.clear();
        info!("Invalidated curve cache");
        self.persist().await;
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Whether `pedal` currently has an entry.
    pub fn contains(&self, pedal: Pedal) -> bool {
        self.pedals.contains_key(&pedal)
    }

    async fn persist(&self) {
        let Some(file) = &self.file else {
            return;
        };
        if let Err(e) = write_json(file, &self.pedals).await {
            warn!(path = ?file, error = %format!("{e:#}"), "Failed to save curve cache");
        }
    }
}
