use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use ctxrot_core::config::{EmbeddingProviderKind, Settings};
use ctxrot_core::traits::Embedder;
use ctxrot_embed::{get_default_embedder, hash_content, CachedEmbedder, FakeEmbedder};

fn l2(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

fn dist(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

#[tokio::test]
async fn fake_embedder_shapes_and_determinism() {
    let mut settings = Settings::default();
    settings.embedding.provider = EmbeddingProviderKind::Fake;
    settings.embedding.cache = false;

    let embedder = get_default_embedder(&settings).expect("embedder");
    assert_eq!(embedder.dim(), 384);
    let texts = vec!["hello world".to_string(), "hello world".to_string()];
    let embs = embedder.embed_batch(&texts).await.expect("embed_batch");
    assert_eq!(embs.len(), 2);
    assert_eq!(embs[0].len(), 384, "embedding dim is 384");

    let norm = l2(&embs[0]);
    assert!((norm - 1.0).abs() <= 1e-3, "vector is L2-normalized (norm={norm})");
    for (a, b) in embs[0].iter().zip(embs[1].iter()) {
        assert!((a - b).abs() <= 1e-6);
    }
}

#[tokio::test]
async fn fake_embedder_puts_shared_words_closer() {
    let e = FakeEmbedder::new(256);
    let q = e.embed_one("solar panel maintenance");
    let near = e.embed_one("maintenance of the solar panel array");
    let far = e.embed_one("sourdough bread recipe");
    assert!(dist(&q, &near) < dist(&q, &far));
}

struct CountingEmbedder {
    inner: FakeEmbedder,
    calls: Arc<AtomicUsize>,
    texts_seen: Arc<AtomicUsize>,
}

#[async_trait]
impl Embedder for CountingEmbedder {
    fn model_id(&self) -> &str {
        self.inner.model_id()
    }
    fn dim(&self) -> usize {
        self.inner.dim()
    }
    fn max_len(&self) -> usize {
        self.inner.max_len()
    }
    async fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.texts_seen.fetch_add(texts.len(), Ordering::SeqCst);
        self.inner.embed_batch(texts).await
    }
}

#[tokio::test]
async fn cache_serves_repeats_without_calling_inner() {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::new(AtomicUsize::new(0));
    let cached = CachedEmbedder::new(CountingEmbedder {
        inner: FakeEmbedder::new(32),
        calls: calls.clone(),
        texts_seen: seen.clone(),
    });

    let batch = vec!["a b".to_string(), "c d".to_string(), "a b".to_string()];
    let first = cached.embed_batch(&batch).await.unwrap();
    assert_eq!(first.len(), 3);
    assert_eq!(first[0], first[2]);
    assert_eq!(seen.load(Ordering::SeqCst), 2, "duplicate text embedded once");

    let second = cached.embed_batch(&batch).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(calls.load(Ordering::SeqCst), 1, "second batch fully cached");
    assert_eq!(cached.len(), 2);
    assert_eq!(cached.hits(), 3);
}

#[tokio::test]
async fn cache_evicts_oldest_past_capacity() {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::new(AtomicUsize::new(0));
    let cached = CachedEmbedder::with_capacity(
        CountingEmbedder { inner: FakeEmbedder::new(16), calls: calls.clone(), texts_seen: seen.clone() },
        2,
    );

    for text in ["one", "two", "three"] {
        cached.embed_batch(&[text.to_string()]).await.unwrap();
    }
    assert_eq!(cached.len(), 2);
    assert_eq!(cached.capacity(), 2);

    // "three" is still cached, "one" was evicted first
    cached.embed_batch(&["three".to_string()]).await.unwrap();
    assert_eq!(seen.load(Ordering::SeqCst), 3);
    cached.embed_batch(&["one".to_string()]).await.unwrap();
    assert_eq!(seen.load(Ordering::SeqCst), 4);
    assert_eq!(cached.len(), 2);
}

#[test]
fn content_hash_depends_on_model() {
    assert_eq!(hash_content("m", "text"), hash_content("m", "text"));
    assert_ne!(hash_content("m1", "text"), hash_content("m2", "text"));
    assert_ne!(hash_content("m", "text"), hash_content("m", "text "));
}
