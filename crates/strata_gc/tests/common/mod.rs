//! In-memory collaborators and the five-revision test repository.

#![allow(dead_code)]

use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use strata_gc::{
    Branch, Catalog, GcConfig, History, Manifest, ObjectFetcher, ObjectHash, Reflog, ReflogEntry,
    Result, Suffix, Tag, Uploader,
};

/// Revision publication times, oldest to newest.
pub const T1: i64 = 564_969_600; // 1987-11-27
pub const T2: i64 = 952_041_600; // 2000-03-03
pub const T3: i64 = 1_103_842_800; // 2004-12-24
pub const T4: i64 = T3 + 86_400; // 2004-12-25
pub const T5: i64 = T4 + 86_400; // 2004-12-26

/// Reflog registration time of every root; far newer than any revision.
pub const REGISTERED_AT: i64 = 2_000_000_000;

/// Pads a 40-character digest to the full width; plain file object.
pub fn file_hash(hex40: &str) -> ObjectHash {
    ObjectHash::from_hex(&format!("{hex40:0<64}")).expect("valid file hash")
}

/// Pads a 40-character digest to the full width; partial chunk object.
pub fn chunk_hash(hex40: &str) -> ObjectHash {
    ObjectHash::from_hex(&format!("{hex40:0<64}P")).expect("valid chunk hash")
}

/// Deterministic, distinct catalog hash for a (revision, index) pair.
pub fn catalog_hash(revision: u32, index: &str) -> ObjectHash {
    let mut digest = [0u8; 32];
    digest[0] = 0xc1;
    digest[1] = revision as u8;
    for (i, b) in index.bytes().enumerate().take(8) {
        digest[2 + i] = b;
    }
    digest[31] = 0x0c;
    ObjectHash::new(digest, Suffix::Catalog)
}

/// Deterministic history database hash.
pub fn history_db_hash(n: u8) -> ObjectHash {
    let mut digest = [0u8; 32];
    digest[0] = 0xdb;
    digest[1] = n;
    digest[31] = 0x0d;
    ObjectHash::new(digest, Suffix::History)
}

/// Object store holding catalogs, history databases and the manifest.
#[derive(Default)]
pub struct MemoryStore {
    catalogs: RwLock<HashMap<ObjectHash, Catalog>>,
    histories: RwLock<HashMap<ObjectHash, History>>,
    manifest: RwLock<Option<Manifest>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_catalog(&self, catalog: Catalog) {
        self.catalogs.write().insert(catalog.hash, catalog);
    }

    pub fn remove_catalog(&self, hash: &ObjectHash) {
        self.catalogs.write().remove(hash);
    }

    pub fn contains_catalog(&self, hash: &ObjectHash) -> bool {
        self.catalogs.read().contains_key(hash)
    }

    pub fn insert_history(&self, hash: ObjectHash, history: History) {
        self.histories.write().insert(hash, history);
    }

    pub fn history_snapshot(&self, hash: &ObjectHash) -> Option<History> {
        self.histories.read().get(hash).cloned()
    }

    pub fn update_history(&self, hash: &ObjectHash, mutate: impl FnOnce(&mut History)) {
        let mut histories = self.histories.write();
        mutate(histories.get_mut(hash).expect("history registered"));
    }

    pub fn set_manifest(&self, root_catalog: ObjectHash, history: ObjectHash) {
        *self.manifest.write() = Some(Manifest {
            root_catalog,
            history,
        });
    }
}

impl ObjectFetcher for MemoryStore {
    fn head(&self) -> Result<Manifest> {
        Ok(self.manifest.read().expect("manifest set"))
    }

    fn catalog(&self, hash: &ObjectHash, _path_hint: &str) -> Result<Option<Catalog>> {
        Ok(self.catalogs.read().get(hash).cloned())
    }

    fn history(&self, hash: &ObjectHash) -> Result<Option<History>> {
        Ok(self.histories.read().get(hash).cloned())
    }
}

/// Reflog over a plain map.
#[derive(Default)]
pub struct MemoryReflog {
    entries: RwLock<HashMap<ObjectHash, i64>>,
}

impl MemoryReflog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, hash: ObjectHash, registered_at: i64) {
        self.entries.write().insert(hash, registered_at);
    }

    pub fn contains(&self, hash: &ObjectHash) -> bool {
        self.entries.read().contains_key(hash)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }
}

impl Reflog for MemoryReflog {
    fn catalogs(&self) -> Result<Vec<ReflogEntry>> {
        Ok(self
            .entries
            .read()
            .iter()
            .map(|(&hash, &registered_at)| ReflogEntry {
                hash,
                registered_at,
            })
            .collect())
    }

    fn remove(&self, hash: &ObjectHash) -> Result<()> {
        self.entries.write().remove(hash);
        Ok(())
    }

    fn timestamp(&self, hash: &ObjectHash) -> Result<Option<i64>> {
        Ok(self.entries.read().get(hash).copied())
    }
}

/// Delete sink that records every request; optionally wired back into a
/// store so deletions take effect while the sweep is still running.
#[derive(Default)]
pub struct RecordingUploader {
    deleted: Mutex<HashSet<ObjectHash>>,
    store: Mutex<Option<Arc<MemoryStore>>>,
}

impl RecordingUploader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn wire_store(&self, store: Arc<MemoryStore>) {
        *self.store.lock() = Some(store);
    }

    pub fn has_deleted(&self, hash: &ObjectHash) -> bool {
        self.deleted.lock().contains(hash)
    }

    pub fn deleted_count(&self) -> usize {
        self.deleted.lock().len()
    }
}

impl Uploader for RecordingUploader {
    fn remove_async(&self, path: &str) {
        let hash = ObjectHash::from_storage_path(path).expect("valid storage path");
        self.deleted.lock().insert(hash);
        if let Some(store) = self.store.lock().as_ref() {
            store.remove_catalog(&hash);
        }
    }

    fn flush(&self) {}

    fn error_count(&self) -> u64 {
        0
    }
}

/// The canonical five-revision repository.
///
/// Sixteen catalogs over five revisions (catalog `1-11` is reused as
/// `2-11`), a file from revision 1 re-appearing in `4-20`, named snapshots
/// `Revision2`, `Revision4` (on `other-branch`) and `Revision5`, and a
/// reflog holding the five root catalogs.
pub struct Fixture {
    pub store: Arc<MemoryStore>,
    pub reflog: Arc<MemoryReflog>,
    pub uploader: Arc<RecordingUploader>,
    pub history_hash: ObjectHash,
    catalogs: HashMap<(u32, &'static str), ObjectHash>,
}

impl Fixture {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let reflog = Arc::new(MemoryReflog::new());
        let uploader = Arc::new(RecordingUploader::new());

        let mut cats: HashMap<(u32, &'static str), Catalog> = HashMap::new();

        // revision 1: the initial file set; some of it disappears in
        // revision 2 already
        new_catalog(&mut cats, (1, "00"), "", T1, None, None);
        new_catalog(&mut cats, (1, "10"), "/00/10", T1 + 50, Some((1, "00")), None);
        new_catalog(&mut cats, (1, "11"), "/00/11", T1 + 100, Some((1, "00")), None);

        add_file(&mut cats, (1, "00"), "c05b6c2319608d2dd03c0d19dba586682772b953", 1337);
        add_file(&mut cats, (1, "00"), "2d8f9f90d6914eb52fed7a0548dd1fbcbea281f1", 42);
        add_file(&mut cats, (1, "00"), "20c2e6328f943003254693a66434ff01ebba26f0", 32000);
        add_file(&mut cats, (1, "00"), "219d1ca4c958bd615822f8c125701e73ce379428", 1232);
        add_chunk(&mut cats, (1, "00"), "8d02b1f7ca8e6f925e308994da4248b6309293ba", 3462);
        add_chunk(&mut cats, (1, "00"), "6eebfa4eb98dfa5657afeb0e15361f31288ad339", 3462);

        add_file(&mut cats, (1, "10"), "213bec88ed6729219d94fc9281893ba93fca2a02", 13424);
        add_file(&mut cats, (1, "10"), "1e94ba5dfe746a7e4e55b62bad21666bc9770ce9", 6374);
        add_file(&mut cats, (1, "10"), "8031b9ad81b52cd772db9b1b12d38994fdd9dbe4", 89765);

        add_file(&mut cats, (1, "11"), "915614a7871a0ffc50abde2885a35545023a6a64", 99);
        add_file(&mut cats, (1, "11"), "59b63e8478fb7fc02c54a85767c7116573907364", 1240);
        add_file(&mut cats, (1, "11"), "c4cbd93ce625b1829a99eeef415f7237ea5d1f02", 0);

        // revision 2: drops part of revision 1 and reuses catalog 1-11
        new_catalog(&mut cats, (2, "00"), "", T2, None, Some((1, "00")));
        new_catalog(&mut cats, (2, "10"), "/00/10", T2 + 20, Some((2, "00")), Some((1, "10")));
        reuse_catalog(&mut cats, (1, "11"), (2, "00"));

        add_file(&mut cats, (2, "00"), "c05b6c2319608d2dd03c0d19dba586682772b953", 1337);
        add_file(&mut cats, (2, "00"), "2d8f9f90d6914eb52fed7a0548dd1fbcbea281f1", 42);
        add_chunk(&mut cats, (2, "00"), "8d02b1f7ca8e6f925e308994da4248b6309293ba", 3462);
        add_chunk(&mut cats, (2, "00"), "6eebfa4eb98dfa5657afeb0e15361f31288ad339", 3462);

        add_file(&mut cats, (2, "10"), "213bec88ed6729219d94fc9281893ba93fca2a02", 13424);
        add_file(&mut cats, (2, "10"), "09fd3486d370013d859651eb164ec71a3a09f5cb", 87541);
        add_file(&mut cats, (2, "10"), "380fe86b4cc68164afd5578eb21a32ab397e6d13", 96);
        add_file(&mut cats, (2, "10"), "59b63e8478fb7fc02c54a85767c7116573907364", 1240);
        add_file(&mut cats, (2, "10"), "09fd3486d370013d859651eb164ec71a3a09f5cb", 87541);
        add_file(&mut cats, (2, "10"), "1a9ef17ae3597bf61d8229dc2bf6ec12ebb42d44", 9865);

        // revision 3: adds new files, deletes nothing
        new_catalog(&mut cats, (3, "00"), "", T3, None, Some((2, "00")));
        new_catalog(&mut cats, (3, "10"), "/00/10", T3 + 1, Some((3, "00")), Some((2, "10")));
        new_catalog(&mut cats, (3, "11"), "/00/11", T3 + 30, Some((3, "00")), Some((1, "11")));

        add_file(&mut cats, (3, "00"), "c05b6c2319608d2dd03c0d19dba586682772b953", 1337);
        add_file(&mut cats, (3, "00"), "2d8f9f90d6914eb52fed7a0548dd1fbcbea281f1", 42);
        add_file(&mut cats, (3, "00"), "d2068490d25c1bd4ef2f3d3a0568a76046466860", 123);
        add_file(&mut cats, (3, "00"), "283144632474a0e553e3b61c1f272257942e7a61", 3457);
        add_file(&mut cats, (3, "00"), "2e87adef242bc67cb66fcd61238ad808a7b44aab", 8761);

        add_file(&mut cats, (3, "10"), "213bec88ed6729219d94fc9281893ba93fca2a02", 13424);
        add_file(&mut cats, (3, "10"), "09fd3486d370013d859651eb164ec71a3a09f5cb", 87541);
        add_file(&mut cats, (3, "10"), "380fe86b4cc68164afd5578eb21a32ab397e6d13", 96);
        add_file(&mut cats, (3, "10"), "7d4d0ec225ebe13839d71c0dc0982567cc810402", 213);
        add_file(&mut cats, (3, "10"), "3bf4854891899670727fc8e9c6e454f7e4058454", 1439);
        add_file(&mut cats, (3, "10"), "12ea064b069d98cb9da09219568ff2f8dd7d0a7e", 2);
        add_file(&mut cats, (3, "10"), "bb5a7bbe8410f0268a9b12285b6f1fd26e038023", 415);
        add_chunk(&mut cats, (3, "10"), "8d02b1f7ca8e6f925e308994da4248b6309293ba", 3462);
        add_chunk(&mut cats, (3, "10"), "6eebfa4eb98dfa5657afeb0e15361f31288ad339", 3462);

        add_file(&mut cats, (3, "11"), "59b63e8478fb7fc02c54a85767c7116573907364", 1240);
        add_file(&mut cats, (3, "11"), "09fd3486d370013d859651eb164ec71a3a09f5cb", 87541);
        add_file(&mut cats, (3, "11"), "1a9ef17ae3597bf61d8229dc2bf6ec12ebb42d44", 9865);
        add_file(&mut cats, (3, "11"), "e0862f1d936037eb0c2be7ccf289f5dbf469244b", 152);

        // revision 4: removes old files, one file from revision 1
        // re-appears, and a new nested catalog shows up
        new_catalog(&mut cats, (4, "00"), "", T4, None, Some((3, "00")));
        new_catalog(&mut cats, (4, "10"), "/00/10", T4 + 12, Some((4, "00")), Some((3, "10")));
        new_catalog(&mut cats, (4, "11"), "/00/11", T4 + 24, Some((4, "00")), Some((3, "11")));
        new_catalog(&mut cats, (4, "20"), "/00/10/20", T4 + 36, Some((4, "10")), None);

        add_file(&mut cats, (4, "00"), "c05b6c2319608d2dd03c0d19dba586682772b953", 1337);
        add_file(&mut cats, (4, "00"), "d2068490d25c1bd4ef2f3d3a0568a76046466860", 123);
        add_file(&mut cats, (4, "00"), "283144632474a0e553e3b61c1f272257942e7a61", 3457);

        add_file(&mut cats, (4, "10"), "213bec88ed6729219d94fc9281893ba93fca2a02", 13424);
        add_file(&mut cats, (4, "10"), "09fd3486d370013d859651eb164ec71a3a09f5cb", 87541);
        add_file(&mut cats, (4, "10"), "7d4d0ec225ebe13839d71c0dc0982567cc810402", 213);
        add_file(&mut cats, (4, "10"), "bb5a7bbe8410f0268a9b12285b6f1fd26e038023", 415);

        add_file(&mut cats, (4, "11"), "59b63e8478fb7fc02c54a85767c7116573907364", 1240);
        add_file(&mut cats, (4, "11"), "09fd3486d370013d859651eb164ec71a3a09f5cb", 87541);
        add_file(&mut cats, (4, "11"), "e0862f1d936037eb0c2be7ccf289f5dbf469244b", 152);
        add_chunk(&mut cats, (4, "11"), "defae1853b929bbbdbc7c6d4e75531273f1ae4cb", 9999);
        add_chunk(&mut cats, (4, "11"), "24bf4276fcdbe57e648b82af4e8fece5bd3581c7", 9991);
        add_chunk(&mut cats, (4, "11"), "acc4c10cf875861ec8d6744a9ab81cb2abe433b4", 9992);
        add_chunk(&mut cats, (4, "11"), "654be8b6938b3fb30be3e9476f3ed26db74e0a9e", 9993);
        add_chunk(&mut cats, (4, "11"), "1a17be523120c7d3a7be745ada1658cc74e8507b", 9994);

        add_file(&mut cats, (4, "20"), "8031b9ad81b52cd772db9b1b12d38994fdd9dbe4", 89765);
        add_file(&mut cats, (4, "20"), "18588c597700a7e2d3b4ce91bdf5a947a4ad13fc", 13254);
        add_file(&mut cats, (4, "20"), "fea3b5156ebbeddb89c85bc14c8e9caa185c10c7", 4112);
        add_file(&mut cats, (4, "20"), "0aceb47a362df1522a69217736617493bef07d5a", 1422);

        // revision 5: replaces everything with a fresh file set; one hash
        // is listed twice
        new_catalog(&mut cats, (5, "00"), "", T5, None, Some((4, "00")));
        new_catalog(&mut cats, (5, "10"), "/00/10", T5 + 10, Some((5, "00")), Some((4, "10")));
        new_catalog(&mut cats, (5, "11"), "/00/11", T5 + 20, Some((5, "00")), Some((4, "11")));
        new_catalog(&mut cats, (5, "20"), "/00/10/20", T5 + 30, Some((5, "10")), Some((4, "20")));

        add_file(&mut cats, (5, "00"), "b52945d780f8cc16711d4e670d82499dad99032d", 1331);
        add_file(&mut cats, (5, "00"), "d650d325d59ea9ca754f9b37293cd08d0b12584c", 513);

        add_file(&mut cats, (5, "10"), "4083d30ba1f72e1dfad4cdbfc60ea3c38bfa600d", 5123);
        add_file(&mut cats, (5, "10"), "c308c87d518c86130d9b9d34723b2a7d4e232ce9", 124);
        add_file(&mut cats, (5, "10"), "8967a86ddf51d89aaad5ad0b7f29bdfc7f7aef2a", 1453);
        add_chunk(&mut cats, (5, "10"), "372e393bb9f5c33440f842b47b8f6aa3ed4f2943", 8813);

        add_file(&mut cats, (5, "11"), "50c44954ab4348a6a3772ee5bd30ab7a1494c692", 76125);
        add_file(&mut cats, (5, "11"), "c308c87d518c86130d9b9d34723b2a7d4e232ce9", 124);

        add_file(&mut cats, (5, "20"), "2dc2b87b8ac840e4fb1cad25c806395c931f7b31", 9816);
        add_chunk(&mut cats, (5, "20"), "a727b47d99fba5fe196400a3c7bc1738172dff71", 8811);
        add_chunk(&mut cats, (5, "20"), "80b59550342b6f5141b42e5b2d58ce453f12d710", 8812);
        add_chunk(&mut cats, (5, "20"), "372e393bb9f5c33440f842b47b8f6aa3ed4f2943", 8813);

        let mut catalogs: HashMap<(u32, &'static str), ObjectHash> = cats
            .iter()
            .map(|(&key, catalog)| (key, catalog.hash))
            .collect();
        catalogs.insert((2, "11"), catalogs[&(1, "11")]);

        for catalog in cats.into_values() {
            if catalog.is_root {
                reflog.add(catalog.hash, REGISTERED_AT);
            }
            store.insert_catalog(catalog);
        }

        // revisions 2, 4 and 5 become named snapshots
        let mut history = History::new();
        history.insert_branch(Branch {
            name: "other-branch".to_string(),
            parent: String::new(),
            initial_revision: 4,
        });
        history.insert_tag(Tag {
            name: "Revision2".to_string(),
            root_hash: catalogs[&(2, "00")],
            size: 1337,
            revision: 2,
            timestamp: T1,
            description: "this is rev 2".to_string(),
            branch: String::new(),
        });
        history.insert_tag(Tag {
            name: "Revision4".to_string(),
            root_hash: catalogs[&(4, "00")],
            size: 42,
            revision: 4,
            timestamp: 1_000_246_400,
            description: "this is revision 4".to_string(),
            branch: "other-branch".to_string(),
        });
        history.insert_tag(Tag {
            name: "Revision5".to_string(),
            root_hash: catalogs[&(5, "00")],
            size: 7,
            revision: 5,
            timestamp: 1_404_986_400,
            description: "this is revision 5 - the newest!".to_string(),
            branch: String::new(),
        });

        let history_hash = history_db_hash(1);
        store.insert_history(history_hash, history);
        store.set_manifest(catalogs[&(5, "00")], history_hash);

        Self {
            store,
            reflog,
            uploader,
            history_hash,
            catalogs,
        }
    }

    /// Hash of the catalog registered under (revision, index).
    pub fn hash(&self, revision: u32, index: &'static str) -> ObjectHash {
        self.catalogs[&(revision, index)]
    }

    /// Fresh config around this fixture's collaborators (default policy:
    /// keep one historic revision, serial traversal).
    pub fn config(&self) -> GcConfig {
        GcConfig::new(
            self.store.clone(),
            self.uploader.clone(),
            self.reflog.clone(),
        )
    }

    /// Makes uploader deletes take effect in the store immediately.
    pub fn wire_deletion(&self) {
        self.uploader.wire_store(self.store.clone());
    }

    /// Removes a named snapshot from the current history database.
    pub fn remove_tag(&self, name: &str) {
        self.store.update_history(&self.history_hash, |history| {
            history.remove_tag(name);
        });
    }

    /// Drops a catalog from the store, simulating prior external deletion.
    pub fn delete_catalog(&self, revision: u32, index: &'static str) {
        self.store.remove_catalog(&self.hash(revision, index));
    }
}

fn new_catalog(
    cats: &mut HashMap<(u32, &'static str), Catalog>,
    key: (u32, &'static str),
    path: &str,
    timestamp: i64,
    parent: Option<(u32, &'static str)>,
    previous: Option<(u32, &'static str)>,
) {
    let hash = catalog_hash(key.0, key.1);
    let parent_hash = parent.map(|k| cats[&k].hash);
    let previous_hash = previous.map(|k| cats[&k].hash);
    let catalog = Catalog::new(hash, path, key.0 as u64, timestamp, parent_hash, previous_hash);
    if let Some(k) = parent {
        cats.get_mut(&k).expect("parent registered").register_nested(hash);
    }
    cats.insert(key, catalog);
}

fn reuse_catalog(
    cats: &mut HashMap<(u32, &'static str), Catalog>,
    legacy: (u32, &'static str),
    parent: (u32, &'static str),
) {
    let hash = cats[&legacy].hash;
    cats.get_mut(&parent).expect("parent registered").register_nested(hash);
}

fn add_file(
    cats: &mut HashMap<(u32, &'static str), Catalog>,
    key: (u32, &'static str),
    hex40: &str,
    size: u64,
) {
    cats.get_mut(&key).expect("catalog registered").add_object(file_hash(hex40), size);
}

fn add_chunk(
    cats: &mut HashMap<(u32, &'static str), Catalog>,
    key: (u32, &'static str),
    hex40: &str,
    size: u64,
) {
    cats.get_mut(&key).expect("catalog registered").add_object(chunk_hash(hex40), size);
}
