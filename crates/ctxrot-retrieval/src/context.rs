use ctxrot_core::types::{Retrieval, RetrievalResult};

/// Separator placed between consecutive segments in an assembled context.
pub const DELIMITER: &str = "\n\n";

/// Join hit texts closest-first, stopping before the first segment that would
/// push the context past `max_chars` characters (delimiters included).
///
/// Segments are never split: if the closest one alone exceeds the budget the
/// context is empty.
pub fn assemble_context(hits: RetrievalResult, max_chars: usize) -> Retrieval {
    let delimiter_len = DELIMITER.chars().count();
    let mut context = String::new();
    let mut used = 0usize;
    let mut cited_segments = Vec::with_capacity(hits.len());

    for hit in hits {
        let segment = hit.entry.segment;
        let len = segment.text.chars().count();
        let cost = if cited_segments.is_empty() { len } else { len + delimiter_len };
        if used + cost > max_chars {
            break;
        }
        if !cited_segments.is_empty() {
            context.push_str(DELIMITER);
        }
        context.push_str(&segment.text);
        used += cost;
        cited_segments.push(segment);
    }
    Retrieval { context, cited_segments }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctxrot_core::types::{IndexEntry, SearchHit, Segment};

    fn hit(handle: usize, text: &str) -> SearchHit {
        SearchHit {
            handle,
            entry: IndexEntry {
                segment: Segment {
                    id: handle as u64,
                    text: text.to_string(),
                    source: "s".into(),
                    ordinal: handle,
                    char_start: 0,
                    char_end: text.chars().count(),
                },
                embedding: vec![0.0],
            },
            distance: handle as f64,
        }
    }

    #[test]
    fn joins_in_order_within_budget() {
        let r = assemble_context(vec![hit(0, "alpha"), hit(1, "beta")], 100);
        assert_eq!(r.context, "alpha\n\nbeta");
        assert_eq!(r.cited_segments.len(), 2);
    }

    #[test]
    fn drops_whole_segments_from_the_end() {
        // "aaaa" + "\n\n" + "bbbb" = 10 chars; third would need 16
        let hits = vec![hit(0, "aaaa"), hit(1, "bbbb"), hit(2, "cccc")];
        let r = assemble_context(hits.clone(), 10);
        assert_eq!(r.context, "aaaa\n\nbbbb");
        assert_eq!(r.cited_segments.iter().map(|s| s.id).collect::<Vec<_>>(), vec![0, 1]);

        let r = assemble_context(hits, 15);
        assert_eq!(r.cited_segments.len(), 2, "15 chars is one short of the third segment");
    }

    #[test]
    fn stops_at_first_overflow_even_if_later_segment_fits() {
        let r = assemble_context(vec![hit(0, "aa"), hit(1, "bbbbbbbbbb"), hit(2, "c")], 8);
        assert_eq!(r.context, "aa");
    }

    #[test]
    fn oversized_first_segment_gives_empty_context() {
        let r = assemble_context(vec![hit(0, "too long for budget")], 5);
        assert!(r.is_empty());
        assert_eq!(r.context, "");
    }

    #[test]
    fn budget_counts_characters() {
        let r = assemble_context(vec![hit(0, "ééé"), hit(1, "ü")], 6);
        assert_eq!(r.context, "ééé\n\nü");
    }
}
