use crate::models::{Chunk, ChunkingOptions, PageDocument};

/// Split boundaries in priority order: paragraph break, line break,
/// code-construct markers, sentence end.
pub const SEPARATORS: [&str; 6] = ["\n\n", "\n", "class ", "def ", "public void", ". "];

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Last `tail` characters of `text`, on a char boundary.
fn char_tail(text: &str, tail: usize) -> &str {
    if tail == 0 {
        return "";
    }
    match text.char_indices().rev().nth(tail - 1) {
        Some((index, _)) => &text[index..],
        None => text,
    }
}

/// Last-resort split when no separator applies: fixed-size character windows
/// that already carry the configured overlap.
fn char_windows(text: &str, options: &ChunkingOptions) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let stride = options
        .chunk_size
        .saturating_sub(options.chunk_overlap)
        .max(1);

    let mut windows = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let end = (start + options.chunk_size).min(chars.len());
        windows.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += stride;
    }
    windows
}

/// Recursively reduce `text` to pieces no longer than `chunk_size`, trying
/// each separator in priority order before falling back to raw windows.
/// Pieces keep their trailing separator so merged chunks read naturally.
fn bounded_pieces(text: &str, separators: &[&str], options: &ChunkingOptions) -> Vec<String> {
    if char_len(text) <= options.chunk_size {
        return vec![text.to_string()];
    }

    let Some((separator, rest)) = separators.split_first() else {
        return char_windows(text, options);
    };

    if !text.contains(separator) {
        return bounded_pieces(text, rest, options);
    }

    let mut pieces = Vec::new();
    for piece in text.split_inclusive(separator) {
        if char_len(piece) <= options.chunk_size {
            pieces.push(piece.to_string());
        } else {
            pieces.extend(bounded_pieces(piece, rest, options));
        }
    }
    pieces
}

/// Greedily pack bounded pieces into chunks up to `chunk_size`, seeding each
/// new chunk with the tail of the previous one. The tail is skipped when the
/// next piece already starts with it (raw windows) or when prepending it
/// would break the size bound.
fn merge_with_overlap(pieces: Vec<String>, options: &ChunkingOptions) -> Vec<String> {
    let mut chunks: Vec<String> = Vec::new();
    let mut current = String::new();

    for piece in pieces {
        if current.is_empty() {
            current = piece;
            continue;
        }

        if char_len(&current) + char_len(&piece) <= options.chunk_size {
            current.push_str(&piece);
            continue;
        }

        let tail = char_tail(&current, options.chunk_overlap).to_string();
        chunks.push(std::mem::take(&mut current));

        let fits_with_tail = char_len(&tail) + char_len(&piece) <= options.chunk_size;
        current = if !tail.is_empty() && fits_with_tail && !piece.starts_with(tail.as_str()) {
            format!("{tail}{piece}")
        } else {
            piece
        };
    }

    if !current.trim().is_empty() {
        chunks.push(current);
    }

    chunks
}

pub fn split_text(text: &str, options: &ChunkingOptions) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    if char_len(text) <= options.chunk_size {
        return vec![text.to_string()];
    }

    let pieces = bounded_pieces(text, &SEPARATORS, options);
    merge_with_overlap(pieces, options)
}

/// Chunk a batch of documents, numbering chunks 0-based across the whole
/// output sequence. `text_length` is inherited from the parent when present
/// and filled with the chunk's own character count otherwise.
pub fn split_documents(documents: &[PageDocument], options: &ChunkingOptions) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut cursor = 0u64;

    for document in documents {
        for piece in split_text(&document.text, options) {
            let mut metadata = document.metadata.clone();
            metadata.chunk_index = Some(cursor);
            if metadata.text_length.is_none() {
                metadata.text_length = Some(char_len(&piece));
            }

            chunks.push(Chunk {
                text: piece,
                metadata,
            });
            cursor = cursor.saturating_add(1);
        }
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChunkMetadata;

    fn page(source: &str, text: &str) -> PageDocument {
        PageDocument {
            text: text.to_string(),
            metadata: ChunkMetadata {
                source: source.to_string(),
                page: Some(1),
                ..Default::default()
            },
        }
    }

    #[test]
    fn short_document_passes_through_unchanged() {
        let options = ChunkingOptions::default();
        let chunks = split_documents(&[page("a.txt", "hello")], &options);

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "hello");
        assert_eq!(chunks[0].metadata.chunk_index, Some(0));
        assert_eq!(chunks[0].metadata.text_length, Some(5));
    }

    #[test]
    fn chunks_respect_the_size_bound() {
        let options = ChunkingOptions::new(50, 10);
        let text = "one two three four. ".repeat(30);

        for chunk in split_text(&text, &options) {
            assert!(chunk.chars().count() <= 50, "oversized chunk: {chunk:?}");
        }
    }

    #[test]
    fn paragraph_boundary_wins_over_sentence_boundary() {
        let options = ChunkingOptions::new(40, 10);
        let text = "first paragraph. still first.\n\nsecond paragraph. still second.";

        let chunks = split_text(&text, &options);
        assert!(chunks[0].contains("first paragraph"));
        assert!(!chunks[0].contains("second paragraph"));
    }

    #[test]
    fn raw_window_fallback_overlaps_neighbors() {
        let options = ChunkingOptions::new(40, 10);
        let text = "a".repeat(35) + &"b".repeat(35) + &"c".repeat(30);

        let chunks = split_text(&text, &options);
        assert!(chunks.len() > 1);
        for pair in chunks.windows(2) {
            let tail: String = pair[0].chars().rev().take(10).collect::<Vec<_>>().iter().rev().collect();
            let head: String = pair[1].chars().take(10).collect();
            assert_eq!(tail, head);
        }
    }

    #[test]
    fn merged_sentences_carry_overlap_prefix() {
        let options = ChunkingOptions::new(50, 10);
        let text = "alpha beta. ".repeat(12);

        let chunks = split_text(&text, &options);
        assert!(chunks.len() > 1);
        for pair in chunks.windows(2) {
            let tail: String = pair[0]
                .chars()
                .rev()
                .take(10)
                .collect::<Vec<_>>()
                .iter()
                .rev()
                .collect();
            assert!(
                pair[1].starts_with(&tail),
                "expected {:?} to start with {tail:?}",
                pair[1]
            );
        }
    }

    #[test]
    fn chunk_index_is_global_across_documents() {
        let options = ChunkingOptions::default();
        let chunks = split_documents(&[page("a.txt", "first"), page("b.txt", "second")], &options);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].metadata.chunk_index, Some(0));
        assert_eq!(chunks[1].metadata.chunk_index, Some(1));
        assert_eq!(chunks[1].metadata.source, "b.txt");
    }

    #[test]
    fn inherited_text_length_is_not_overwritten() {
        let options = ChunkingOptions::default();
        let mut document = page("a.pdf", "short page text");
        document.metadata.text_length = Some(4_000);

        let chunks = split_documents(&[document], &options);
        assert_eq!(chunks[0].metadata.text_length, Some(4_000));
    }

    #[test]
    fn both_known_presets_are_constructible() {
        let default = ChunkingOptions::default();
        assert_eq!((default.chunk_size, default.chunk_overlap), (800, 160));

        let coarse = ChunkingOptions::coarse();
        assert_eq!((coarse.chunk_size, coarse.chunk_overlap), (1_000, 200));
    }
}
