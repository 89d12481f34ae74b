//! Rotators driven by a real, watched directory index.

use std::fs::{self, File};
use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use slideshow_directory_index::{DirectoryIndex, IndexConfig, SnapshotSource};
use slideshow_rotator::{Rotator, RotatorConfig, RotatorRegistry};
use tempfile::TempDir;

fn image_tree() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    fs::create_dir(temp_dir.path().join("foo")).unwrap();
    fs::create_dir(temp_dir.path().join("default")).unwrap();
    File::create(temp_dir.path().join("foo/1.png")).unwrap();
    File::create(temp_dir.path().join("default/2.png")).unwrap();
    temp_dir
}

fn path_of(item: Option<String>) -> Option<String> {
    item.and_then(|uri| uri.split_once('?').map(|(path, _)| path.to_string()))
}

async fn wait_for_item(rotator: &Rotator, expected: &str) {
    for _ in 0..500 {
        if path_of(rotator.current_item()).as_deref() == Some(expected) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!(
        "rotator for {} never showed {expected}; showing {:?}",
        rotator.group(),
        rotator.current_item()
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_groups_follow_the_index() {
    let temp_dir = image_tree();
    let index = DirectoryIndex::open(IndexConfig::new(temp_dir.path())).unwrap();
    let registry = Arc::new(RotatorRegistry::new(
        Arc::clone(&index) as Arc<dyn SnapshotSource>,
        RotatorConfig::default(),
    ));

    let foo = registry.lease("foo").unwrap();
    let bar = registry.lease("bar").unwrap();
    assert_eq!(path_of(foo.current_item()).as_deref(), Some("foo/1.png"));
    assert_eq!(path_of(bar.current_item()).as_deref(), Some("default/2.png"));

    // A new first file restarts the rotation on it.
    File::create(temp_dir.path().join("foo/0.png")).unwrap();
    wait_for_item(&foo, "foo/0.png").await;
    assert_eq!(foo.candidates().len(), 2);

    // Once bar has files of its own it stops falling back.
    fs::create_dir(temp_dir.path().join("bar")).unwrap();
    File::create(temp_dir.path().join("bar/x.svg")).unwrap();
    wait_for_item(&bar, "bar/x.svg").await;

    drop(foo);
    drop(bar);
    assert!(registry.is_empty());
    index.shutdown();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_released_rotators_unsubscribe_from_index() {
    let temp_dir = image_tree();
    let index = DirectoryIndex::open(IndexConfig::new(temp_dir.path())).unwrap();
    let registry = RotatorRegistry::new(
        Arc::clone(&index) as Arc<dyn SnapshotSource>,
        RotatorConfig::default(),
    );

    let rotator = registry.acquire("foo").unwrap();
    let notified = Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let counter = Arc::clone(&notified);
    rotator.subscribe(move |_| {
        counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    });
    assert!(registry.release("foo"));

    File::create(temp_dir.path().join("foo/3.png")).unwrap();
    for _ in 0..500 {
        if index.snapshot().iter().any(|e| e.path == "foo/3.png") {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(index.len(), 3);

    assert!(rotator.is_disposed());
    assert_eq!(notified.load(std::sync::atomic::Ordering::SeqCst), 0);
    registry.dispose();
}
