use std::sync::Arc;
use std::thread;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use ctxrot_core::error::Error;
use ctxrot_core::traits::VectorIndexer;
use ctxrot_core::types::{IndexEntry, Segment};
use ctxrot_vector::VectorIndex;

fn entry(id: u64, text: &str, embedding: Vec<f32>) -> IndexEntry {
    IndexEntry {
        segment: Segment {
            id,
            text: text.to_string(),
            source: "test".to_string(),
            ordinal: id as usize,
            char_start: 0,
            char_end: text.chars().count(),
        },
        embedding,
    }
}

fn texts(hits: &ctxrot_core::types::RetrievalResult) -> Vec<String> {
    hits.iter().map(|h| h.entry.segment.text.clone()).collect()
}

#[test]
fn two_dimensional_nearest_neighbours() {
    let index = VectorIndex::new(2);
    index
        .insert(vec![
            entry(0, "A", vec![0.0, 0.0]),
            entry(1, "B", vec![10.0, 0.0]),
            entry(2, "C", vec![0.0, 10.0]),
        ])
        .unwrap();

    let hits = index.search(&[1.0, 0.0], 2).unwrap();
    assert_eq!(texts(&hits), vec!["A", "B"]);
    assert_eq!(hits[0].distance, 1.0);
    assert_eq!(hits[1].distance, 81.0);
}

#[test]
fn returns_everything_when_k_exceeds_size() {
    let index = VectorIndex::new(2);
    index.insert(vec![entry(0, "far", vec![5.0, 5.0]), entry(1, "near", vec![1.0, 1.0])]).unwrap();
    let hits = index.search(&[0.0, 0.0], 10).unwrap();
    assert_eq!(texts(&hits), vec!["near", "far"]);
    assert!(index.search(&[0.0, 0.0], 0).unwrap().is_empty());
}

#[test]
fn empty_index_returns_empty() {
    let index = VectorIndex::new(3);
    assert_eq!(index.size(), 0);
    assert!(index.search(&[0.0, 0.0, 0.0], 3).unwrap().is_empty());
}

#[test]
fn ties_break_by_insertion_order() {
    let index = VectorIndex::new(2);
    index
        .insert(vec![
            entry(0, "left", vec![-1.0, 0.0]),
            entry(1, "right", vec![1.0, 0.0]),
            entry(2, "up", vec![0.0, 1.0]),
            entry(3, "down", vec![0.0, -1.0]),
        ])
        .unwrap();
    let hits = index.search(&[0.0, 0.0], 3).unwrap();
    assert_eq!(texts(&hits), vec!["left", "right", "up"]);
    let handles: Vec<usize> = hits.iter().map(|h| h.handle).collect();
    assert_eq!(handles, vec![0, 1, 2]);
}

#[test]
fn repeated_searches_are_identical() {
    let mut rng = StdRng::seed_from_u64(7);
    let index = VectorIndex::new(16);
    let batch = (0..200)
        .map(|i| entry(i, &format!("s{i}"), (0..16).map(|_| rng.gen_range(-1.0..1.0)).collect()))
        .collect();
    index.insert(batch).unwrap();
    let q: Vec<f32> = (0..16).map(|_| rng.gen_range(-1.0..1.0)).collect();
    let first = index.search(&q, 5).unwrap();
    for _ in 0..5 {
        assert_eq!(index.search(&q, 5).unwrap(), first);
    }
}

#[test]
fn agrees_with_full_sort_reference() {
    let mut rng = StdRng::seed_from_u64(42);
    let dim = 24;
    let vectors: Vec<Vec<f32>> = (0..500).map(|_| (0..dim).map(|_| rng.gen_range(-1.0..1.0)).collect()).collect();
    let index = VectorIndex::new(dim);
    index
        .insert(vectors.iter().enumerate().map(|(i, v)| entry(i as u64, &i.to_string(), v.clone())).collect())
        .unwrap();

    for _ in 0..10 {
        let q: Vec<f32> = (0..dim).map(|_| rng.gen_range(-1.0..1.0)).collect();
        let mut reference: Vec<(f64, usize)> = vectors
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let mut d = 0f64;
                for (a, b) in q.iter().zip(v) {
                    let diff = f64::from(*a) - f64::from(*b);
                    d += diff * diff;
                }
                (d, i)
            })
            .collect();
        reference.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        let expected: Vec<usize> = reference.iter().take(7).map(|(_, i)| *i).collect();

        let hits = index.search(&q, 7).unwrap();
        let got: Vec<usize> = hits.iter().map(|h| h.handle).collect();
        assert_eq!(got, expected);
        for (hit, (d, _)) in hits.iter().zip(&reference) {
            assert!((hit.distance - d).abs() < 1e-9, "distance {} vs reference {}", hit.distance, d);
        }
    }
}

#[test]
fn rejects_wrong_dimension() {
    let index = VectorIndex::new(3);
    let err = index.insert(vec![entry(0, "ok", vec![0.0; 3]), entry(1, "bad", vec![0.0; 2])]).unwrap_err();
    assert!(matches!(err, Error::DimensionMismatch { expected: 3, actual: 2 }));
    assert_eq!(index.size(), 0, "failed batch inserts nothing");

    let err = index.search(&[0.0; 4], 1).unwrap_err();
    assert!(matches!(err, Error::DimensionMismatch { expected: 3, actual: 4 }));
}

#[test]
fn concurrent_inserts_keep_batches_contiguous() {
    let index = Arc::new(VectorIndex::new(2));
    let workers: Vec<_> = (0..8u64)
        .map(|w| {
            let index = Arc::clone(&index);
            thread::spawn(move || {
                let batch = (0..50u64).map(|i| entry(w * 1000 + i, &format!("w{w}-{i}"), vec![w as f32, i as f32])).collect();
                index.insert(batch).unwrap()
            })
        })
        .collect();
    let mut ranges: Vec<_> = workers.into_iter().map(|h| h.join().unwrap()).collect();
    ranges.sort_by_key(|r| r.start);

    assert_eq!(index.size(), 400);
    let mut next = 0;
    for r in &ranges {
        assert_eq!(r.start, next);
        assert_eq!(r.len(), 50);
        // every handle in the range belongs to the same worker, in order
        let first = index.segment(r.start).unwrap();
        let worker = first.id / 1000;
        for (offset, handle) in r.clone().enumerate() {
            let seg = index.segment(handle).unwrap();
            assert_eq!(seg.id, worker * 1000 + offset as u64);
        }
        next = r.end;
    }
}
