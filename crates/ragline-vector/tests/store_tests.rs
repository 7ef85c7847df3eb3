use ragline_core::config::DistanceMetric;
use ragline_core::traits::{Embedder, VectorStore};
use ragline_core::types::NewSegment;
use ragline_core::ErrorKind;
use ragline_embed::HashEmbedder;
use ragline_vector::LanceVectorStore;
use tempfile::TempDir;

const DIM: usize = 64;

async fn open(tmp: &TempDir, metric: DistanceMetric) -> LanceVectorStore {
    let uri = tmp.path().to_string_lossy().to_string();
    LanceVectorStore::open_with(&uri, "rag_documents", DIM, metric).await.expect("open store")
}

fn segments(embedder: &HashEmbedder, texts: &[&str]) -> Vec<NewSegment> {
    texts.iter().map(|t| NewSegment { text: t.to_string(), vector: embedder.embed(t).unwrap() }).collect()
}

fn unit(i: usize) -> Vec<f32> {
    let mut v = vec![0.0; DIM];
    v[i] = 1.0;
    v
}

const CORPUS: &[&str] = &[
    "Java threads share heap memory",
    "Rust ownership prevents data races",
    "Bread needs flour water and yeast",
    "The Nile flows north into the Mediterranean",
    "Lance stores columnar vectors",
];

#[tokio::test]
async fn round_trip_returns_every_inserted_segment() {
    let tmp = TempDir::new().unwrap();
    let store = open(&tmp, DistanceMetric::Cosine).await;
    let embedder = HashEmbedder::new(DIM);
    assert_eq!(store.insert_batch(segments(&embedder, CORPUS)).await.unwrap(), CORPUS.len());
    assert_eq!(store.count().await.unwrap(), CORPUS.len());

    let q = embedder.embed(CORPUS[0]).unwrap();
    let result = store.query_nearest(&q, CORPUS.len(), f32::INFINITY).await.unwrap();
    assert_eq!(result.len(), CORPUS.len());
    let mut texts = result.texts();
    texts.sort();
    let mut expected: Vec<String> = CORPUS.iter().map(|s| s.to_string()).collect();
    expected.sort();
    assert_eq!(texts, expected);

    let distances: Vec<f32> = result.iter().map(|s| s.distance.unwrap()).collect();
    assert!(distances.windows(2).all(|w| w[0] <= w[1]), "non-decreasing: {distances:?}");
}

#[tokio::test]
async fn exact_text_is_the_top_hit() {
    let tmp = TempDir::new().unwrap();
    let store = open(&tmp, DistanceMetric::Cosine).await;
    let embedder = HashEmbedder::new(DIM);
    store.insert_batch(segments(&embedder, &["Rust ownership", "Java threads", "Bread baking"])).await.unwrap();

    let q = embedder.embed("Java threads").unwrap();
    let result = store.query_nearest(&q, 1, 0.5).await.unwrap();
    assert_eq!(result.len(), 1);
    let top = &result.segments()[0];
    assert_eq!(top.text, "Java threads");
    assert!(top.distance.unwrap().abs() < 1e-4);
}

#[tokio::test]
async fn threshold_excludes_distant_rows() {
    let tmp = TempDir::new().unwrap();
    let store = open(&tmp, DistanceMetric::Cosine).await;
    let embedder = HashEmbedder::new(DIM);
    store.insert_batch(segments(&embedder, CORPUS)).await.unwrap();

    let q = embedder.embed(CORPUS[1]).unwrap();
    for threshold in [0.05f32, 0.5, 0.9, 1.0] {
        let result = store.query_nearest(&q, CORPUS.len(), threshold).await.unwrap();
        assert!(result.iter().all(|s| s.distance.unwrap() < threshold), "threshold {threshold}");
    }
    let tight = store.query_nearest(&q, CORPUS.len(), 0.05).await.unwrap();
    assert_eq!(tight.texts(), vec![CORPUS[1].to_string()]);
}

#[tokio::test]
async fn empty_store_yields_empty_result() {
    let tmp = TempDir::new().unwrap();
    let store = open(&tmp, DistanceMetric::Cosine).await;
    let result = store.query_nearest(&unit(0), 3, 0.5).await.unwrap();
    assert!(result.is_empty());
}

#[tokio::test]
async fn ties_resolve_by_insertion_order() {
    let tmp = TempDir::new().unwrap();
    let store = open(&tmp, DistanceMetric::Cosine).await;
    let batch: Vec<NewSegment> = (0..4).map(|i| NewSegment { text: format!("copy {i}"), vector: unit(3) }).collect();
    store.insert_batch(batch).await.unwrap();

    let result = store.query_nearest(&unit(3), 2, 0.5).await.unwrap();
    let ids: Vec<u64> = result.iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![0, 1]);
}

#[tokio::test]
async fn wrong_dimension_is_invalid_input() {
    let tmp = TempDir::new().unwrap();
    let store = open(&tmp, DistanceMetric::Cosine).await;

    let err = store.query_nearest(&[0.1, 0.2], 3, 0.5).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    let batch = vec![
        NewSegment { text: "fine".to_string(), vector: unit(0) },
        NewSegment { text: "short".to_string(), vector: vec![1.0; DIM - 1] },
    ];
    let err = store.insert_batch(batch).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert_eq!(store.count().await.unwrap(), 0, "rejected batch leaves no partial write");
}

#[tokio::test]
async fn l2_metric_reports_euclidean_distance() {
    let tmp = TempDir::new().unwrap();
    let store = open(&tmp, DistanceMetric::L2).await;
    store
        .insert_batch(vec![
            NewSegment { text: "x axis".to_string(), vector: unit(0) },
            NewSegment { text: "y axis".to_string(), vector: unit(1) },
        ])
        .await
        .unwrap();

    let near = store.query_nearest(&unit(0), 2, 1.0).await.unwrap();
    assert_eq!(near.texts(), vec!["x axis".to_string()]);

    let both = store.query_nearest(&unit(0), 2, 1.5).await.unwrap();
    assert_eq!(both.len(), 2);
    let d = both.segments()[1].distance.unwrap();
    assert!((d - 2f32.sqrt()).abs() < 1e-4, "got {d}");
}

#[tokio::test]
async fn reopening_keeps_rows_and_pins_metric_and_dimension() {
    let tmp = TempDir::new().unwrap();
    let uri = tmp.path().to_string_lossy().to_string();
    {
        let store = open(&tmp, DistanceMetric::Cosine).await;
        store.insert_batch(vec![NewSegment { text: "kept".to_string(), vector: unit(2) }]).await.unwrap();
    }

    let again = open(&tmp, DistanceMetric::Cosine).await;
    assert_eq!(again.count().await.unwrap(), 1);
    let next = again.insert_batch(vec![NewSegment { text: "next".to_string(), vector: unit(5) }]).await.unwrap();
    assert_eq!(next, 1);
    let hit = again.query_nearest(&unit(5), 1, 0.5).await.unwrap();
    assert_eq!(hit.segments()[0].id, 1);

    let err = LanceVectorStore::open_with(&uri, "rag_documents", DIM, DistanceMetric::L2).await.err().unwrap();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    let err = LanceVectorStore::open_with(&uri, "rag_documents", DIM * 2, DistanceMetric::Cosine).await.err().unwrap();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
}

#[tokio::test]
async fn zero_top_n_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let store = open(&tmp, DistanceMetric::Cosine).await;
    let err = store.query_nearest(&unit(0), 0, 0.5).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValidationError);
}

#[tokio::test]
async fn non_positive_threshold_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let store = open(&tmp, DistanceMetric::Cosine).await;
    store.insert_batch(vec![NewSegment { text: "alpha".to_string(), vector: unit(0) }]).await.unwrap();
    for threshold in [0.0f32, -0.25] {
        let err = store.query_nearest(&unit(0), 3, threshold).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError, "threshold {threshold}");
    }
}
