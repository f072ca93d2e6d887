//! Canned media sources and key-value stores for photoshelf tests.

use async_trait::async_trait;
use media::{AlbumInfo, AssetPage, AssetQuery, MediaError, MediaSource, Photo};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use store::{KvStore, StoreError};

/// Photo fixture with a deterministic uri.
pub fn photo(id: &str, creation_time: i64) -> Photo {
    Photo {
        id: id.to_string(),
        uri: format!("file:///photos/{}.jpg", id),
        creation_time,
    }
}

pub fn album(id: &str, title: &str) -> AlbumInfo {
    AlbumInfo {
        id: id.to_string(),
        title: title.to_string(),
    }
}

/// Scripted in-memory media source.
///
/// Albums are returned in registration order. Asset fetches can be failed
/// per album, delayed, or denied entirely; every fetch is counted.
#[derive(Default)]
pub struct MockMediaSource {
    albums: Vec<AlbumInfo>,
    by_album: HashMap<String, Vec<Photo>>,
    library: Vec<Photo>,
    failing_albums: HashSet<String>,
    deny_permission: bool,
    delay: Option<Duration>,
    fetches: AtomicUsize,
}

impl MockMediaSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an album and its photos, newest first.
    pub fn with_album(mut self, info: AlbumInfo, mut photos: Vec<Photo>) -> Self {
        sort_newest_first(&mut photos);
        self.library.extend(photos.iter().cloned());
        sort_newest_first(&mut self.library);
        self.by_album.insert(info.id.clone(), photos);
        self.albums.push(info);
        self
    }

    /// Register an album whose asset fetches fail.
    pub fn with_failing_album(mut self, info: AlbumInfo) -> Self {
        self.failing_albums.insert(info.id.clone());
        self.albums.push(info);
        self
    }

    /// Photos visible only in library-wide queries.
    pub fn with_library_photos(mut self, photos: Vec<Photo>) -> Self {
        self.library.extend(photos);
        sort_newest_first(&mut self.library);
        self
    }

    pub fn with_denied_permission(mut self) -> Self {
        self.deny_permission = true;
        self
    }

    /// Delay every asset fetch, to widen race windows in tests.
    pub fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

fn sort_newest_first(photos: &mut [Photo]) {
    photos.sort_by(|a, b| {
        b.creation_time
            .cmp(&a.creation_time)
            .then_with(|| a.id.cmp(&b.id))
    });
}

#[async_trait]
impl MediaSource for MockMediaSource {
    async fn list_albums(&self) -> Result<Vec<AlbumInfo>, MediaError> {
        if self.deny_permission {
            return Err(MediaError::PermissionDenied("media access not granted".into()));
        }
        Ok(self.albums.clone())
    }

    async fn get_assets(&self, query: &AssetQuery) -> Result<AssetPage, MediaError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let photos = match &query.album_id {
            Some(album_id) => {
                if self.failing_albums.contains(album_id) {
                    return Err(MediaError::Fetch(format!("album {} unavailable", album_id)));
                }
                self.by_album
                    .get(album_id)
                    .ok_or_else(|| MediaError::Fetch(format!("no such album {}", album_id)))?
            }
            None => &self.library,
        };
        let offset = query.page.saturating_mul(query.first);
        let assets = photos
            .iter()
            .skip(offset)
            .take(query.first)
            .cloned()
            .collect();
        Ok(AssetPage {
            assets,
            total_count: photos.len(),
        })
    }
}

/// Hashmap-backed key-value store with switchable failure injection.
#[derive(Default)]
pub struct MemoryKvStore {
    map: Mutex<HashMap<String, String>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seeded(key: &str, value: &str) -> Self {
        let store = Self::default();
        store
            .map
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        store
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.map.lock().unwrap().get(key).cloned()
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Database("injected read failure".into()));
        }
        Ok(self.map.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Database("injected write failure".into()));
        }
        self.map
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}
