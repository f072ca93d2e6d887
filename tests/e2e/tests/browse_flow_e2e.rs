use gallery::{aggregate_albums, group_by_day, LoadOutcome, PhotoPager};
use media::FsMediaSource;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::time::{Duration, UNIX_EPOCH};
use store::{FavoritesStore, SqliteKvStore};
use tempfile::TempDir;

fn touch(path: &Path, millis: u64) {
    let mut file = File::create(path).expect("create file");
    file.write_all(b"img").expect("write file");
    file.set_modified(UNIX_EPOCH + Duration::from_millis(millis))
        .expect("set mtime");
}

#[tokio::main]
async fn main() {
    let library = TempDir::new().expect("library dir");
    let album = library.path().join("Holiday");
    std::fs::create_dir(&album).expect("album dir");
    touch(&album.join("one.jpg"), 1_000);
    touch(&album.join("two.jpg"), 2_000);
    touch(&album.join("three.jpg"), 3_000);
    std::fs::create_dir(library.path().join("Empty")).expect("empty dir");

    let source = FsMediaSource::new(library.path());

    // Album grid: the empty album is filtered, the thumbnail is the most
    // recent photo.
    let albums = aggregate_albums(&source).await.expect("aggregate");
    assert_eq!(albums.len(), 1);
    assert_eq!(albums[0].id, "Holiday");
    assert!(albums[0]
        .thumbnail_uri
        .as_deref()
        .expect("thumbnail")
        .ends_with("three.jpg"));

    // Album view: two pages of two, then exhaustion.
    let pager = PhotoPager::new(source.clone(), Some("Holiday".to_string()), 2);
    assert_eq!(
        pager.load_more().await.expect("page 1"),
        LoadOutcome::Loaded(2)
    );
    assert_eq!(
        pager.load_more().await.expect("page 2"),
        LoadOutcome::Loaded(1)
    );
    assert!(!pager.has_more().await);
    let items = pager.items().await;
    assert_eq!(items.len(), 3);
    assert!(items[0].uri.ends_with("three.jpg"));

    // Timeline over the whole library.
    let timeline = PhotoPager::new(source, None, 100);
    timeline.load_more().await.expect("timeline page");
    let sections = group_by_day(&timeline.items().await);
    assert!(!sections.is_empty());
    let total: usize = sections.iter().map(|s| s.photos.len()).sum();
    assert_eq!(total, 3);

    // Favorite round trip against the on-disk store.
    let data = TempDir::new().expect("data dir");
    let kv = SqliteKvStore::new(&data.path().join("favorites.sqlite")).expect("kv store");
    let favorites = FavoritesStore::new(kv);
    let uri = items[0].uri.clone();
    assert!(favorites.toggle(&uri).await);
    assert_eq!(favorites.get().await, vec![uri.clone()]);
    assert!(!favorites.toggle(&uri).await);
    assert!(favorites.get().await.is_empty());
}
