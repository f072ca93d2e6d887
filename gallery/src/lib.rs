//! Browsing logic for a photo library: album aggregation, paginated photo
//! loading, and the day-bucketed timeline.

use chrono::{Local, TimeZone};
use futures::future::join_all;
use media::{AssetQuery, MediaError, MediaSource, Photo};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::Mutex;

pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Album summary for the gallery grid: an album plus the uri of its most
/// recent photo. Albums without photos are never emitted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Album {
    pub id: String,
    pub title: String,
    pub thumbnail_uri: Option<String>,
}

/// Build the album-with-thumbnail list.
///
/// Thumbnail fetches for all albums are issued concurrently and joined
/// before the list is produced; the result keeps the media source's album
/// enumeration order, not completion order. A denied media permission
/// degrades to an empty list. A failed fetch for one album is isolated:
/// that album is skipped, the rest of the aggregation proceeds.
pub async fn aggregate_albums<S: MediaSource>(source: &S) -> Result<Vec<Album>, MediaError> {
    let albums = match source.list_albums().await {
        Ok(albums) => albums,
        Err(MediaError::PermissionDenied(msg)) => {
            tracing::warn!(%msg, "Media access denied, listing no albums");
            return Ok(Vec::new());
        }
        Err(e) => return Err(e),
    };

    let fetches = albums.into_iter().map(|album| async move {
        // The query sort order is pinned to descending creation time, so
        // index 0 is the album's most recent photo.
        let query = AssetQuery::album(album.id.clone(), 1, 0);
        match source.get_assets(&query).await {
            Ok(page) => page.assets.into_iter().next().map(|latest| Album {
                id: album.id,
                title: album.title,
                thumbnail_uri: Some(latest.uri),
            }),
            Err(e) => {
                tracing::warn!(album = %album.id, error = %e, "Album fetch failed, skipping");
                None
            }
        }
    });

    Ok(join_all(fetches).await.into_iter().flatten().collect())
}

/// Result of one `load_more` attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// A page was appended; carries the number of photos it held.
    Loaded(usize),
    /// Another load for this pager is already in flight.
    Busy,
    /// The source is exhausted; no fetch was issued.
    Exhausted,
    /// The pager was reset while the fetch was in flight; the late
    /// response was discarded.
    Stale,
}

struct PagerState {
    page: usize,
    has_more: bool,
    items: Vec<Photo>,
}

impl PagerState {
    fn initial() -> Self {
        PagerState {
            page: 0,
            has_more: true,
            items: Vec::new(),
        }
    }
}

/// Incremental page loader for one album view (or the whole library when
/// `album_id` is `None`).
///
/// Owns its pagination state exclusively; nothing is shared across views.
/// Duplicate `load_more` calls are suppressed by an in-flight flag, and a
/// `reset` issued mid-fetch bumps the generation counter so the stale
/// response is dropped instead of being appended.
pub struct PhotoPager<S: MediaSource> {
    source: S,
    album_id: Option<String>,
    page_size: usize,
    state: Mutex<PagerState>,
    loading: AtomicBool,
    generation: AtomicU64,
}

impl<S: MediaSource> PhotoPager<S> {
    pub fn new(source: S, album_id: Option<String>, page_size: usize) -> Self {
        PhotoPager {
            source,
            album_id,
            page_size,
            state: Mutex::new(PagerState::initial()),
            loading: AtomicBool::new(false),
            generation: AtomicU64::new(0),
        }
    }

    pub async fn load_more(&self) -> Result<LoadOutcome, MediaError> {
        if self
            .loading
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(LoadOutcome::Busy);
        }
        let result = self.load_page().await;
        self.loading.store(false, Ordering::Release);
        result
    }

    async fn load_page(&self) -> Result<LoadOutcome, MediaError> {
        let page = {
            let state = self.state.lock().await;
            if !state.has_more {
                return Ok(LoadOutcome::Exhausted);
            }
            state.page
        };
        let generation = self.generation.load(Ordering::Acquire);
        let query = AssetQuery {
            album_id: self.album_id.clone(),
            first: self.page_size,
            page,
        };
        // On error `has_more` is left untouched so the caller may retry.
        let batch = self.source.get_assets(&query).await?;
        if self.generation.load(Ordering::Acquire) != generation {
            return Ok(LoadOutcome::Stale);
        }

        let mut state = self.state.lock().await;
        let fetched = batch.assets.len();
        state.items.extend(batch.assets);
        state.page += 1;
        if fetched == 0
            || fetched < self.page_size
            || state.page * self.page_size >= batch.total_count
        {
            state.has_more = false;
        }
        Ok(LoadOutcome::Loaded(fetched))
    }

    /// Drop all loaded state and invalidate any in-flight fetch.
    pub async fn reset(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        let mut state = self.state.lock().await;
        *state = PagerState::initial();
    }

    pub async fn items(&self) -> Vec<Photo> {
        self.state.lock().await.items.clone()
    }

    pub async fn has_more(&self) -> bool {
        self.state.lock().await.has_more
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::Acquire)
    }
}

/// One calendar day of the timeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Section {
    pub title: String,
    pub photos: Vec<Photo>,
}

/// Bucket photos by local calendar day.
///
/// Pure single pass; each date key gets a section at its first occurrence
/// and later photos of the same day are appended to it. Chronologically
/// ordered sections require the input to be sorted by descending creation
/// time; that ordering is a precondition, not something this function
/// establishes.
pub fn group_by_day(photos: &[Photo]) -> Vec<Section> {
    let mut sections: Vec<Section> = Vec::new();
    let mut by_title: HashMap<String, usize> = HashMap::new();
    for photo in photos {
        let title = day_title(photo.creation_time);
        match by_title.get(&title) {
            Some(&idx) => sections[idx].photos.push(photo.clone()),
            None => {
                by_title.insert(title.clone(), sections.len());
                sections.push(Section {
                    title,
                    photos: vec![photo.clone()],
                });
            }
        }
    }
    sections
}

fn day_title(creation_time: i64) -> String {
    Local
        .timestamp_millis_opt(creation_time)
        .earliest()
        .map(|dt| dt.format("%a %b %d %Y").to_string())
        .unwrap_or_else(|| "Unknown date".to_string())
}
