use mocks::MemoryKvStore;
use store::{FavoritesStore, FAVORITES_KEY};

#[tokio::main]
async fn main() {
    // Corrupted persisted data degrades to the empty list.
    let favorites = FavoritesStore::new(MemoryKvStore::seeded(FAVORITES_KEY, "{broken"));
    assert!(favorites.get().await.is_empty());

    // A failing read degrades to empty instead of surfacing an error.
    let store = MemoryKvStore::seeded(FAVORITES_KEY, r#"["a"]"#);
    store.fail_reads(true);
    let favorites = FavoritesStore::new(store);
    assert!(favorites.get().await.is_empty());

    // A failing write leaves membership unchanged and reports the state
    // that is actually persisted.
    let store = MemoryKvStore::new();
    store.fail_writes(true);
    let favorites = FavoritesStore::new(store);
    assert!(!favorites.toggle("file:///photos/a.jpg").await);
    assert!(favorites.get().await.is_empty());

    // Once the store recovers, toggling works again.
    let store = MemoryKvStore::new();
    store.fail_writes(true);
    let favorites = FavoritesStore::new(store);
    favorites.add("file:///photos/a.jpg").await;
    assert!(favorites.get().await.is_empty());
    // Recover by rebuilding with a healthy store.
    let favorites = FavoritesStore::new(MemoryKvStore::new());
    assert!(favorites.toggle("file:///photos/a.jpg").await);
    assert_eq!(favorites.get().await, vec!["file:///photos/a.jpg"]);
}
