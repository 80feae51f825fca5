use std::fs;

use tempfile::TempDir;

use ctxrot_core::chunker::{Chunker, ChunkingConfig};
use ctxrot_core::config::{Config, EmbeddingProviderKind, LlmProviderKind};
use ctxrot_core::extract::{extract_text, list_documents, read_document, DocumentFormat};
use ctxrot_core::Error;

#[test]
fn chunk_1050_chars_default_window() {
    let text: String = (0..1050).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
    let chunker = Chunker::new(ChunkingConfig::default()).unwrap();
    let segs = chunker.chunk(&text, "doc.txt", 0);

    let ranges: Vec<(usize, usize)> = segs.iter().map(|s| (s.char_start, s.char_end)).collect();
    assert_eq!(ranges, vec![(0, 512), (462, 974), (924, 1050)]);
    assert_eq!(segs.iter().map(|s| s.id).collect::<Vec<_>>(), vec![0, 1, 2]);
    assert_eq!(segs.iter().map(|s| s.ordinal).collect::<Vec<_>>(), vec![0, 1, 2]);
}

#[test]
fn consecutive_segments_share_overlap_and_cover_input() {
    let ascii = "The quick brown fox jumps over the lazy dog. ";
    let wide = "héllo wörld ✓ 日本語のテキスト ";
    // (size, overlap, repeats of the base text)
    let cases = [(97, 13, 40), (10, 0, 7), (8, 7, 3), (1, 0, 2), (50, 49, 2), (300, 10, 1)];

    for base in [ascii, wide] {
        for (size, overlap, repeats) in cases {
            let text = base.repeat(repeats);
            let chars: Vec<char> = text.chars().collect();
            let chunker = Chunker::new(ChunkingConfig::new(size, overlap).unwrap()).unwrap();
            let segs = chunker.chunk(&text, "t", 100);
            let label = format!("size={size} overlap={overlap} len={}", chars.len());

            assert!(!segs.is_empty(), "{label}");
            assert_eq!(segs.first().unwrap().char_start, 0, "{label}");
            assert_eq!(segs.last().unwrap().char_end, chars.len(), "{label}");
            for pair in segs.windows(2) {
                let (a, b) = (&pair[0], &pair[1]);
                assert_eq!(a.char_end - b.char_start, overlap, "{label}");
                let tail: String = a.text.chars().skip(a.char_len() - overlap).collect();
                let head: String = b.text.chars().take(overlap).collect();
                assert_eq!(tail, head, "{label}");
                assert_eq!(b.id, a.id + 1, "{label}");
            }
            for s in &segs {
                let expected: String = chars[s.char_start..s.char_end].iter().collect();
                assert_eq!(s.text, expected, "{label}");
                assert!(s.char_len() <= size && s.char_len() > 0, "{label}");
            }
        }
    }
}

#[test]
fn zero_overlap_windows_are_disjoint() {
    let chunker = Chunker::new(ChunkingConfig::new(4, 0).unwrap()).unwrap();
    let segs = chunker.chunk("abcdefghij", "t", 0);
    let texts: Vec<&str> = segs.iter().map(|s| s.text.as_str()).collect();
    assert_eq!(texts, vec!["abcd", "efgh", "ij"]);
}

#[test]
fn extract_plain_text_and_markdown() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("notes.md");
    fs::write(&path, "# Title\n\nBody text").unwrap();

    let (text, label) = read_document(&path).expect("read");
    assert_eq!(text, "# Title\n\nBody text");
    assert_eq!(label, "notes.md");
}

#[test]
fn extract_invalid_utf8_is_lossy() {
    let text = extract_text(&[b'o', b'k', 0xff, b'!'], DocumentFormat::Txt).unwrap();
    assert!(text.starts_with("ok"));
    assert!(text.ends_with('!'));
}

#[test]
fn docx_is_rejected() {
    assert!(matches!(extract_text(b"PK", DocumentFormat::Docx), Err(Error::UnsupportedFormat(_))));
    assert_eq!(DocumentFormat::from_extension("DOCX"), Some(DocumentFormat::Docx));
}

#[test]
fn list_documents_filters_and_sorts() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    fs::create_dir(dir.join("nested")).unwrap();
    fs::write(dir.join("b.txt"), "b").unwrap();
    fs::write(dir.join("a.md"), "a").unwrap();
    fs::write(dir.join("nested/c.txt"), "c").unwrap();
    fs::write(dir.join("image.png"), [0u8; 4]).unwrap();
    fs::write(dir.join("report.docx"), "PK").unwrap();

    let files = list_documents(dir);
    let names: Vec<String> = files
        .iter()
        .map(|p| p.strip_prefix(dir).unwrap().to_string_lossy().replace('\\', "/"))
        .collect();
    assert_eq!(names, vec!["a.md", "b.txt", "nested/c.txt"]);

    let single = dir.join("image.png");
    assert_eq!(list_documents(&single), vec![single]);
}

#[test]
fn config_layers_file_and_env() {
    figment::Jail::expect_with(|jail| {
        jail.clear_env();
        jail.create_file(
            "config.toml",
            r#"
                chunk_size = 256
                chunk_overlap = 32
                llm_provider = "claude"

                [embedding]
                provider = "fake"
                dimension = 64
            "#,
        )?;
        jail.set_env("APP_TOP_K", "5");
        jail.set_env("APP_LLM__TEMPERATURE", "0.2");

        let config = Config::load().map_err(|e| e.to_string())?;
        let settings = config.settings().map_err(|e| e.to_string())?;
        assert_eq!(settings.chunk_size, 256);
        assert_eq!(settings.chunk_overlap, 32);
        assert_eq!(settings.top_k, 5);
        assert_eq!(settings.max_context_chars, 4000);
        assert_eq!(settings.llm_provider, LlmProviderKind::Anthropic);
        assert_eq!(settings.embedding.provider, EmbeddingProviderKind::Fake);
        assert_eq!(settings.embedding.dimension, 64);
        assert!((settings.llm.temperature - 0.2).abs() < 1e-6);

        let size: usize = config.get("chunk_size").map_err(|e| e.to_string())?;
        assert_eq!(size, 256);
        Ok(())
    });
}

#[test]
fn config_rejects_overlap_not_below_size() {
    figment::Jail::expect_with(|jail| {
        jail.clear_env();
        jail.create_file("config.toml", "chunk_size = 10\nchunk_overlap = 10\n")?;
        assert!(Config::load().is_err());
        Ok(())
    });
}

#[test]
fn prod_env_refuses_fake_embeddings() {
    figment::Jail::expect_with(|jail| {
        jail.clear_env();
        jail.set_env("RUST_ENV", "prod");
        jail.set_env("APP_EMBEDDING__PROVIDER", "fake");
        assert!(Config::load().is_err());
        Ok(())
    });
}
