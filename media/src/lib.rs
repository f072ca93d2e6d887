//! Media source abstraction for local photo libraries.
//!
//! The [`MediaSource`] trait is the seam the browsing logic is written
//! against; [`FsMediaSource`] is the shipping implementation, backed by a
//! directory tree where every immediate subdirectory is an album.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Permission Denied: {0}")]
    PermissionDenied(String),
    #[error("Fetch Error: {0}")]
    Fetch(String),
    #[error("Other Error: {0}")]
    Other(String),
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Photo {
    pub id: String,
    pub uri: String,
    /// Epoch milliseconds.
    pub creation_time: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AlbumInfo {
    pub id: String,
    pub title: String,
}

/// One page worth of an asset listing.
#[derive(Debug, Clone)]
pub struct AssetPage {
    pub assets: Vec<Photo>,
    pub total_count: usize,
}

/// Query for a batch of photo assets.
///
/// Results are always sorted by descending creation time with ascending id
/// as the tie-break, so `page * first` offsets are stable for an unchanged
/// library.
#[derive(Debug, Clone)]
pub struct AssetQuery {
    /// Restrict to one album; `None` queries the whole library.
    pub album_id: Option<String>,
    /// Batch size.
    pub first: usize,
    /// Zero-based page number.
    pub page: usize,
}

impl AssetQuery {
    pub fn album(album_id: impl Into<String>, first: usize, page: usize) -> Self {
        AssetQuery {
            album_id: Some(album_id.into()),
            first,
            page,
        }
    }

    pub fn library(first: usize, page: usize) -> Self {
        AssetQuery {
            album_id: None,
            first,
            page,
        }
    }
}

#[async_trait]
pub trait MediaSource: Send + Sync {
    async fn list_albums(&self) -> Result<Vec<AlbumInfo>, MediaError>;
    async fn get_assets(&self, query: &AssetQuery) -> Result<AssetPage, MediaError>;
}

const IMAGE_EXTENSIONS: [&str; 9] = [
    "jpg", "jpeg", "png", "gif", "webp", "bmp", "tif", "tiff", "heic",
];

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            IMAGE_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

fn map_io_error(e: &io::Error, context: &str) -> MediaError {
    if e.kind() == io::ErrorKind::PermissionDenied {
        MediaError::PermissionDenied(format!("{}: {}", context, e))
    } else {
        MediaError::Fetch(format!("{}: {}", context, e))
    }
}

/// Filesystem-backed media source.
///
/// Albums are the immediate subdirectories of the library root; photo assets
/// are files with a recognized image extension. Creation time is the file
/// modification time.
#[derive(Debug, Clone)]
pub struct FsMediaSource {
    root: PathBuf,
}

impl FsMediaSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FsMediaSource { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn photo_from_path(root: &Path, path: &Path) -> Photo {
        // Unreadable metadata degrades to creation time 0 instead of
        // failing the whole scan.
        let creation_time = path
            .metadata()
            .and_then(|m| m.modified())
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0);
        let id = path
            .strip_prefix(root)
            .unwrap_or(path)
            .to_string_lossy()
            .into_owned();
        Photo {
            id,
            uri: format!("file://{}", path.display()),
            creation_time,
        }
    }

    fn scan_album(root: &Path, album_id: &str) -> Result<Vec<Photo>, MediaError> {
        let dir = root.join(album_id);
        let entries = std::fs::read_dir(&dir)
            .map_err(|e| map_io_error(&e, &format!("Failed to read album {:?}", dir)))?;
        let mut photos = Vec::new();
        for entry in entries {
            let entry =
                entry.map_err(|e| map_io_error(&e, &format!("Failed to read album {:?}", dir)))?;
            let path = entry.path();
            if path.is_file() && is_image(&path) {
                photos.push(Self::photo_from_path(root, &path));
            }
        }
        Ok(photos)
    }

    fn scan_library(root: &Path) -> Result<Vec<Photo>, MediaError> {
        let mut photos = Vec::new();
        for entry in WalkDir::new(root).min_depth(1) {
            let entry = entry.map_err(|e| match e.io_error() {
                Some(io_err) => map_io_error(io_err, &format!("Failed to scan library {:?}", root)),
                None => MediaError::Fetch(format!("Failed to scan library {:?}: {}", root, e)),
            })?;
            let path = entry.path();
            if entry.file_type().is_file() && is_image(path) {
                photos.push(Self::photo_from_path(root, path));
            }
        }
        Ok(photos)
    }

    fn list_albums_blocking(root: &Path) -> Result<Vec<AlbumInfo>, MediaError> {
        let entries = std::fs::read_dir(root)
            .map_err(|e| map_io_error(&e, &format!("Failed to read library {:?}", root)))?;
        let mut albums = Vec::new();
        for entry in entries {
            let entry =
                entry.map_err(|e| map_io_error(&e, &format!("Failed to read library {:?}", root)))?;
            if entry.path().is_dir() {
                let name = entry.file_name().to_string_lossy().into_owned();
                albums.push(AlbumInfo {
                    id: name.clone(),
                    title: name,
                });
            }
        }
        albums.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(albums)
    }

    fn get_assets_blocking(root: &Path, query: &AssetQuery) -> Result<AssetPage, MediaError> {
        let start = std::time::Instant::now();
        let mut photos = match &query.album_id {
            Some(album_id) => Self::scan_album(root, album_id)?,
            None => Self::scan_library(root)?,
        };
        // Pinned sort order: newest first, id breaks ties so offset
        // pagination stays stable.
        photos.sort_by(|a, b| {
            b.creation_time
                .cmp(&a.creation_time)
                .then_with(|| a.id.cmp(&b.id))
        });
        let total_count = photos.len();
        let offset = query.page.saturating_mul(query.first);
        let assets = if offset >= photos.len() {
            Vec::new()
        } else {
            let end = photos.len().min(offset.saturating_add(query.first));
            photos.drain(offset..end).collect()
        };
        tracing::debug!("scan_time_ms" = %start.elapsed().as_millis(), "total" = total_count);
        Ok(AssetPage {
            assets,
            total_count,
        })
    }
}

#[async_trait]
impl MediaSource for FsMediaSource {
    async fn list_albums(&self) -> Result<Vec<AlbumInfo>, MediaError> {
        let root = self.root.clone();
        tokio::task::spawn_blocking(move || Self::list_albums_blocking(&root))
            .await
            .map_err(|e| MediaError::Other(e.to_string()))?
    }

    async fn get_assets(&self, query: &AssetQuery) -> Result<AssetPage, MediaError> {
        let root = self.root.clone();
        let query = query.clone();
        tokio::task::spawn_blocking(move || Self::get_assets_blocking(&root, &query))
            .await
            .map_err(|e| MediaError::Other(e.to_string()))?
    }
}
