use std::fs;

use docvec_core::{BuildError, DocId, LoadError, SearchError, VectorIndexer, VectorSnapshot};
use docvec_vector::StoreDir;
use tempfile::TempDir;

fn id(s: &str) -> DocId {
    DocId::new(s).unwrap()
}

fn corpus() -> (Vec<String>, Vec<Vec<f32>>) {
    let chunks = vec![
        "the fire burns in the hearth".to_string(),
        "water the garden at dawn".to_string(),
        "store grain in a dry cellar".to_string(),
    ];
    let vectors = vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0], vec![0.0, 0.6, 0.8]];
    (chunks, vectors)
}

#[test]
fn build_load_search_full_flow() {
    let tmp = TempDir::new().expect("tmp");
    let dir = StoreDir::open(tmp.path().join("stores")).expect("open");
    let (chunks, vectors) = corpus();

    let built = dir.build(&id("homestead"), chunks.clone(), vectors).expect("build");
    assert_eq!(built.meta().chunk_count, 3);
    assert!(dir.contains(&id("homestead")));

    let loaded = dir.load(&id("homestead")).expect("load");
    assert_eq!(loaded.meta(), built.meta());
    assert_eq!(loaded.texts(), &chunks[..]);

    let hits = loaded.search(&[0.0, 1.0, 0.1], 2).expect("search");
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].index, 1);
    assert_eq!(hits[0].text, chunks[1]);
    assert_eq!(hits[0].rank, 0);
    assert_eq!(hits[1].index, 2);
    assert!(hits[0].score <= hits[1].score);
    assert!(hits[0].similarity >= hits[1].similarity);

    // k beyond the chunk count returns everything
    assert_eq!(loaded.search(&[1.0, 0.0, 0.0], 50).unwrap().len(), 3);
    assert!(loaded.search(&[1.0, 0.0, 0.0], 0).unwrap().is_empty());
}

#[test]
fn identical_vectors_rank_by_lower_index() {
    let tmp = TempDir::new().unwrap();
    let dir = StoreDir::open(tmp.path()).unwrap();
    let chunks: Vec<String> = (0..5).map(|i| format!("dup {i}")).collect();
    let vectors = vec![vec![0.5, 0.5]; 5];
    dir.build(&id("dups"), chunks, vectors).unwrap();
    let hits = dir.load(&id("dups")).unwrap().search(&[1.0, 1.0], 5).unwrap();
    assert_eq!(hits.iter().map(|h| h.index).collect::<Vec<_>>(), vec![0, 1, 2, 3, 4]);
}

#[test]
fn rebuild_replaces_previous_store() {
    let tmp = TempDir::new().unwrap();
    let dir = StoreDir::open(tmp.path()).unwrap();
    let (chunks, vectors) = corpus();
    dir.build(&id("doc"), chunks, vectors).unwrap();
    dir.build(&id("doc"), vec!["only chunk".into()], vec![vec![0.0, 0.0, 2.0]]).unwrap();

    let store = dir.load(&id("doc")).unwrap();
    assert_eq!(store.meta().chunk_count, 1);
    assert_eq!(store.texts(), &["only chunk".to_string()]);
}

#[test]
fn failed_build_leaves_existing_store_untouched() {
    let tmp = TempDir::new().unwrap();
    let dir = StoreDir::open(tmp.path()).unwrap();
    let (chunks, vectors) = corpus();
    dir.build(&id("doc"), chunks, vectors).unwrap();
    let before = fs::read(dir.path_for(&id("doc"))).unwrap();

    let err = dir.build(&id("doc"), vec!["a".into(), "b".into()], vec![vec![1.0]]).unwrap_err();
    assert!(matches!(err, BuildError::LengthMismatch { chunks: 2, vectors: 1 }));
    let err = dir.build(&id("doc"), vec![], vec![]).unwrap_err();
    assert!(matches!(err, BuildError::EmptyInput { .. }));

    assert_eq!(fs::read(dir.path_for(&id("doc"))).unwrap(), before);
}

#[test]
fn no_temp_files_remain_after_build() {
    let tmp = TempDir::new().unwrap();
    let dir = StoreDir::open(tmp.path()).unwrap();
    let (chunks, vectors) = corpus();
    dir.build(&id("doc"), chunks, vectors).unwrap();

    let names: Vec<String> = fs::read_dir(tmp.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["doc.dvs".to_string()]);
}

#[test]
fn missing_and_removed_stores_are_not_found() {
    let tmp = TempDir::new().unwrap();
    let dir = StoreDir::open(tmp.path()).unwrap();
    assert!(matches!(dir.load(&id("ghost")), Err(LoadError::NotFound { .. })));
    assert!(matches!(dir.remove(&id("ghost")), Err(LoadError::NotFound { .. })));

    let (chunks, vectors) = corpus();
    dir.build(&id("doc"), chunks, vectors).unwrap();
    dir.remove(&id("doc")).unwrap();
    assert!(!dir.contains(&id("doc")));
    assert!(matches!(dir.load(&id("doc")), Err(LoadError::NotFound { .. })));
}

#[test]
fn corrupted_truncated_and_renamed_files_fail_to_load() {
    let tmp = TempDir::new().unwrap();
    let dir = StoreDir::open(tmp.path()).unwrap();
    let (chunks, vectors) = corpus();
    dir.build(&id("doc"), chunks, vectors).unwrap();
    let path = dir.path_for(&id("doc"));
    let good = fs::read(&path).unwrap();

    let mut flipped = good.clone();
    let mid = flipped.len() / 2;
    flipped[mid] ^= 0xff;
    fs::write(&path, &flipped).unwrap();
    assert!(matches!(dir.load(&id("doc")), Err(LoadError::CorruptStore { .. })));

    fs::write(&path, &good[..good.len() - 3]).unwrap();
    assert!(matches!(dir.load(&id("doc")), Err(LoadError::CorruptStore { .. })));

    let mut appended = good.clone();
    appended.extend_from_slice(b"junk");
    fs::write(&path, &appended).unwrap();
    assert!(matches!(dir.load(&id("doc")), Err(LoadError::CorruptStore { .. })));

    fs::write(dir.path_for(&id("other")), &good).unwrap();
    match dir.load(&id("other")) {
        Err(LoadError::CorruptStore { doc_id, reason }) => {
            assert_eq!(doc_id, id("other"));
            assert!(reason.contains("doc"), "reason: {reason}");
        }
        other => panic!("expected CorruptStore, got {other:?}"),
    }
}

#[test]
fn doc_ids_lists_persisted_stores_sorted() {
    let tmp = TempDir::new().unwrap();
    let dir = StoreDir::open(tmp.path()).unwrap();
    for name in ["zeta", "alpha", "mid"] {
        dir.build(&id(name), vec![format!("{name} text")], vec![vec![1.0, 2.0]]).unwrap();
    }
    fs::write(tmp.path().join("notes.txt"), "ignored").unwrap();
    let ids: Vec<String> = dir.doc_ids().unwrap().into_iter().map(String::from).collect();
    assert_eq!(ids, vec!["alpha", "mid", "zeta"]);

    let meta = dir.meta(&id("mid")).unwrap();
    assert_eq!(meta.dimension, 2);
    assert!(meta.normalized);
}

#[test]
fn unnormalized_store_keeps_raw_vectors_and_accepts_zero_query() {
    let tmp = TempDir::new().unwrap();
    let dir = StoreDir::open(tmp.path()).unwrap().with_normalize(false);
    dir.build(&id("raw"), vec!["near".into(), "far".into()], vec![vec![1.0, 1.0], vec![10.0, 10.0]])
        .unwrap();
    let store = dir.load(&id("raw")).unwrap();
    assert!(!store.meta().normalized);

    let hits = store.search(&[0.0, 0.0], 2).unwrap();
    assert_eq!(hits[0].index, 0);
    assert_eq!(hits[0].score, 2.0);
    assert_eq!(hits[0].similarity, 0.0);
    assert_eq!(hits[1].score, 200.0);
}

#[test]
fn search_errors_and_trait_access() {
    let tmp = TempDir::new().unwrap();
    let dir = StoreDir::open(tmp.path()).unwrap();
    let (chunks, vectors) = corpus();
    VectorIndexer::build(&dir, &id("doc"), chunks, vectors).unwrap();
    let snap = VectorIndexer::load(&dir, &id("doc")).unwrap();
    assert_eq!(VectorSnapshot::meta(&snap).dimension, 3);
    assert!(matches!(
        VectorSnapshot::search(&snap, &[1.0, 0.0], 1),
        Err(SearchError::DimensionMismatch { expected: 3, actual: 2 })
    ));
    assert!(matches!(snap.search(&[0.0; 3], 1), Err(SearchError::ZeroNormQuery)));
}

#[test]
fn every_stored_vector_finds_itself_first() {
    let tmp = TempDir::new().unwrap();
    let dir = StoreDir::open(tmp.path()).unwrap().with_normalize(false);
    let vectors: Vec<Vec<f32>> = (0..8).map(|i| vec![i as f32, (i * i) as f32 * 0.1, 1.0 - i as f32]).collect();
    let chunks: Vec<String> = (0..8).map(|i| format!("chunk {i}")).collect();
    dir.build(&id("self"), chunks, vectors.clone()).unwrap();
    let store = dir.load(&id("self")).unwrap();
    for (i, v) in vectors.iter().enumerate() {
        let hits = store.search(v, 1).unwrap();
        assert_eq!(hits[0].index as usize, i);
        assert_eq!(hits[0].score, 0.0);
    }
}

#[test]
fn equal_vectors_at_two_and_five_keep_index_order() {
    let tmp = TempDir::new().unwrap();
    let dir = StoreDir::open(tmp.path()).unwrap();
    let mut vectors: Vec<Vec<f32>> = (0..7).map(|i| vec![1.0, i as f32 + 10.0]).collect();
    vectors[2] = vec![1.0, 0.0];
    vectors[5] = vec![1.0, 0.0];
    let chunks: Vec<String> = (0..7).map(|i| format!("chunk {i}")).collect();
    dir.build(&id("tie"), chunks, vectors).unwrap();
    let hits = dir.load(&id("tie")).unwrap().search(&[1.0, 0.0], 2).unwrap();
    assert_eq!((hits[0].index, hits[1].index), (2, 5));
}

#[test]
fn normalized_store_ranks_scaled_queries_identically() {
    let tmp = TempDir::new().unwrap();
    let dir = StoreDir::open(tmp.path()).unwrap();
    let (chunks, vectors) = corpus();
    dir.build(&id("doc"), chunks, vectors).unwrap();
    let store = dir.load(&id("doc")).unwrap();

    let raw = [0.3, 2.0, 1.1];
    let norm = raw.iter().map(|x| x * x).sum::<f32>().sqrt();
    let unit: Vec<f32> = raw.iter().map(|x| x / norm).collect();
    let a: Vec<u32> = store.search(&raw, 3).unwrap().iter().map(|h| h.index).collect();
    let b: Vec<u32> = store.search(&unit, 3).unwrap().iter().map(|h| h.index).collect();
    assert_eq!(a, b);
}

#[test]
fn concurrent_rebuild_and_load_see_whole_stores() {
    let tmp = TempDir::new().unwrap();
    let dir = StoreDir::open(tmp.path()).unwrap();
    let doc = id("busy");
    let first: Vec<String> = (0..40).map(|i| format!("first batch chunk {i}")).collect();
    let second: Vec<String> = (0..7).map(|i| format!("second batch chunk {i}")).collect();
    let vectors = |n: usize, dim: usize| -> Vec<Vec<f32>> {
        (0..n).map(|i| (0..dim).map(|d| (i * dim + d) as f32 + 1.0).collect()).collect()
    };
    dir.build(&doc, first.clone(), vectors(first.len(), 16)).unwrap();

    std::thread::scope(|s| {
        s.spawn(|| {
            for round in 0..50 {
                let (chunks, dim) = if round % 2 == 0 { (&second, 8) } else { (&first, 16) };
                dir.build(&doc, chunks.clone(), vectors(chunks.len(), dim)).unwrap();
            }
        });
        s.spawn(|| {
            for _ in 0..200 {
                let store = dir.load(&doc).expect("reader must never see a partial store");
                let texts = store.texts();
                assert!(texts == &first[..] || texts == &second[..], "mixed store with {} chunks", texts.len());
                let expected_dim = if texts.len() == first.len() { 16 } else { 8 };
                assert_eq!(store.meta().dimension, expected_dim);
            }
        });
    });
}
