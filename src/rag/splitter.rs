//! Recursive character text splitting.
//!
//! Text is cut on the coarsest separator present (paragraphs, then lines,
//! then words, then characters) and the pieces are merged back into chunks
//! of at most `chunk_size` characters, each sharing up to `chunk_overlap`
//! characters with its predecessor.

use std::collections::VecDeque;

use super::document::Document;

const DEFAULT_SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

#[derive(Debug, Clone)]
pub struct RecursiveCharacterSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl RecursiveCharacterSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size - 1),
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_with(text, &self.separators)
    }

    /// Split each document, copying its metadata onto every chunk.
    pub fn split_documents(&self, documents: &[Document]) -> Vec<Document> {
        documents
            .iter()
            .flat_map(|doc| {
                self.split_text(&doc.content)
                    .into_iter()
                    .map(move |chunk| Document::new(chunk, doc.metadata.clone()))
            })
            .collect()
    }

    fn split_with(&self, text: &str, separators: &[String]) -> Vec<String> {
        let mut separator = separators.last().cloned().unwrap_or_default();
        let mut remaining: &[String] = &[];
        for (i, candidate) in separators.iter().enumerate() {
            if candidate.is_empty() {
                separator = String::new();
                break;
            }
            if text.contains(candidate.as_str()) {
                separator = candidate.clone();
                remaining = &separators[i + 1..];
                break;
            }
        }

        let splits: Vec<String> = if separator.is_empty() {
            text.chars().map(String::from).collect()
        } else {
            text.split(separator.as_str())
                .filter(|piece| !piece.is_empty())
                .map(String::from)
                .collect()
        };

        let mut final_chunks = Vec::new();
        let mut fitting: Vec<String> = Vec::new();

        for piece in splits {
            if char_len(&piece) < self.chunk_size {
                fitting.push(piece);
                continue;
            }

            if !fitting.is_empty() {
                final_chunks.extend(self.merge_splits(&fitting, &separator));
                fitting.clear();
            }

            if remaining.is_empty() {
                final_chunks.push(piece);
            } else {
                final_chunks.extend(self.split_with(&piece, remaining));
            }
        }

        if !fitting.is_empty() {
            final_chunks.extend(self.merge_splits(&fitting, &separator));
        }

        final_chunks
    }

    fn merge_splits(&self, splits: &[String], separator: &str) -> Vec<String> {
        let separator_len = char_len(separator);
        let mut docs = Vec::new();
        let mut current: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for piece in splits {
            let len = char_len(piece);
            let joined_len = |current: &VecDeque<&str>| {
                if current.is_empty() {
                    0
                } else {
                    separator_len
                }
            };

            if total + len + joined_len(&current) > self.chunk_size {
                if total > self.chunk_size {
                    tracing::warn!(
                        "Created a chunk of size {}, which is longer than the specified {}",
                        total,
                        self.chunk_size
                    );
                }
                if !current.is_empty() {
                    if let Some(doc) = join_chunk(&current, separator) {
                        docs.push(doc);
                    }
                    while total > self.chunk_overlap
                        || (total > 0 && total + len + joined_len(&current) > self.chunk_size)
                    {
                        let Some(first) = current.pop_front() else {
                            break;
                        };
                        let dropped = char_len(first) + joined_len(&current);
                        total = total.saturating_sub(dropped);
                    }
                }
            }

            current.push_back(piece);
            total += len + if current.len() > 1 { separator_len } else { 0 };
        }

        if let Some(doc) = join_chunk(&current, separator) {
            docs.push(doc);
        }

        docs
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn join_chunk(pieces: &VecDeque<&str>, separator: &str) -> Option<String> {
    let joined = pieces.iter().copied().collect::<Vec<_>>().join(separator);
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn words_are_merged_up_to_chunk_size() {
        let splitter = RecursiveCharacterSplitter::new(10, 0);
        assert_eq!(
            splitter.split_text("aaaa bbbb cccc"),
            vec!["aaaa bbbb", "cccc"]
        );
    }

    #[test]
    fn overlap_repeats_trailing_words() {
        let splitter = RecursiveCharacterSplitter::new(10, 4);
        assert_eq!(
            splitter.split_text("aaaa bbbb cccc"),
            vec!["aaaa bbbb", "bbbb cccc"]
        );
    }

    #[test]
    fn paragraphs_are_preferred_over_words() {
        let splitter = RecursiveCharacterSplitter::new(15, 0);
        assert_eq!(
            splitter.split_text("para one.\n\npara two."),
            vec!["para one.", "para two."]
        );
    }

    #[test]
    fn unbroken_text_falls_back_to_characters() {
        let splitter = RecursiveCharacterSplitter::new(10, 0);
        assert_eq!(
            splitter.split_text("abcdefghijklmnopqrstuvwxy"),
            vec!["abcdefghij", "klmnopqrst", "uvwxy"]
        );
    }

    #[test]
    fn chunks_never_exceed_size_for_prose() {
        let splitter = RecursiveCharacterSplitter::new(1000, 100);
        let text = "Climate change refers to long-term shifts in temperatures. ".repeat(60);
        let chunks = splitter.split_text(&text);

        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.chars().count() <= 1000));
    }

    #[test]
    fn multibyte_text_is_measured_in_characters() {
        let splitter = RecursiveCharacterSplitter::new(4, 0);
        let chunks = splitter.split_text("°C°C°C");
        assert_eq!(chunks, vec!["°C°C", "°C"]);
    }

    #[test]
    fn empty_text_produces_no_chunks() {
        let splitter = RecursiveCharacterSplitter::new(100, 10);
        assert!(splitter.split_text("").is_empty());
        assert!(splitter.split_text("   \n\n  ").is_empty());
    }

    #[test]
    fn split_documents_keeps_metadata() {
        let splitter = RecursiveCharacterSplitter::new(10, 0);
        let doc = Document::with_source("aaaa bbbb cccc", "notes.txt");

        let chunks = splitter.split_documents(&[doc]);

        assert_eq!(chunks.len(), 2);
        assert!(chunks.iter().all(|c| c.source() == "notes.txt"));
    }

    #[test]
    fn overlap_is_clamped_below_chunk_size() {
        let splitter = RecursiveCharacterSplitter::new(10, 50);
        assert_eq!(splitter.chunk_overlap(), 9);
    }
}
