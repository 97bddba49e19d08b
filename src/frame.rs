//! Reassembles `<item>…</item>` records from arbitrarily fragmented bytes.
//!
//! The pipe delivers records split across reads at any boundary, and a
//! single read may also carry several records. Each `</item>` closes the
//! record that began at the last `<item` before it, so the output does not
//! depend on how the input was chunked. Text conversion happens once per
//! record, after reassembly.

use crate::error::StreamError;

pub const ITEM_START_TAG: &[u8] = b"<item";
pub const ITEM_END_TAG: &[u8] = b"</item>";

/// Upper bound for a single buffered record (cover art can be large).
pub const DEFAULT_MAX_RECORD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A complete record, ready to parse
    Record(String),
    /// An unfinished item that was cut short by the start of the next one
    Interrupted { bytes: usize },
}

#[derive(Debug)]
pub struct FrameReader {
    buffer: Vec<u8>,
    // Offset before which the buffer is known not to contain an end tag
    scanned: usize,
    max_record_bytes: usize,
}

impl FrameReader {
    pub fn new(max_record_bytes: usize) -> Self {
        Self {
            buffer: Vec::new(),
            scanned: 0,
            max_record_bytes,
        }
    }

    /// Append a chunk and return every frame it completed, in order.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<Frame>, StreamError> {
        self.buffer.extend_from_slice(chunk);

        let mut frames = Vec::new();
        while let Some(found) = find(&self.buffer[self.scanned..], ITEM_END_TAG) {
            let tag = self.scanned + found;
            let end = tag + ITEM_END_TAG.len();
            let start = item_start(&self.buffer[..tag]).unwrap_or(0);
            if end - start > self.max_record_bytes {
                return Err(self.overflow());
            }

            let rest = self.buffer.split_off(end);
            let unit = std::mem::replace(&mut self.buffer, rest);
            self.scanned = 0;

            let (prefix, record) = unit.split_at(start);
            if !prefix.iter().all(u8::is_ascii_whitespace) {
                frames.push(Frame::Interrupted {
                    bytes: prefix.len(),
                });
            }
            frames.push(Frame::Record(String::from_utf8_lossy(record).into_owned()));
        }

        if self.buffer.len() > self.max_record_bytes {
            return Err(self.overflow());
        }

        // A partial end tag may straddle the next chunk
        self.scanned = self.buffer.len().saturating_sub(ITEM_END_TAG.len() - 1);

        Ok(frames)
    }

    /// Bytes buffered towards the next record.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Drop any partially accumulated record, returning how many bytes were lost.
    pub fn discard(&mut self) -> usize {
        let dropped = self.buffer.len();
        self.buffer.clear();
        self.scanned = 0;
        dropped
    }

    fn overflow(&mut self) -> StreamError {
        self.discard();
        StreamError::RecordTooLarge {
            limit: self.max_record_bytes,
        }
    }
}

impl Default for FrameReader {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RECORD_BYTES)
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Offset of the last `<item` start tag, not counting `<items` and the like.
fn item_start(bytes: &[u8]) -> Option<usize> {
    let width = ITEM_START_TAG.len() + 1;
    bytes.windows(width).rposition(|window| {
        window.starts_with(ITEM_START_TAG)
            && matches!(window[width - 1], b'>' | b'/' | b' ' | b'\t' | b'\r' | b'\n')
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_ITEMS: &str = "<item><type>73736e63</type><code>6d647374</code><length>0</length></item>\n\
        <item><type>636f7265</type><code>6173616c</code><length>10</length>\
        <data encoding=\"base64\">QWJiZXkgUm9hZA==</data></item>\n";

    fn record(text: &str) -> Frame {
        Frame::Record(text.to_string())
    }

    fn collect(chunks: &[&[u8]]) -> Vec<Frame> {
        let mut reader = FrameReader::default();
        let mut out = Vec::new();
        for chunk in chunks {
            out.extend(reader.push(chunk).expect("push"));
        }
        out
    }

    #[test]
    fn emits_record_when_end_tag_arrives() {
        let mut reader = FrameReader::default();
        assert!(reader.push(b"<item><code>6d647374</code>").unwrap().is_empty());
        assert!(reader.pending() > 0);

        let frames = reader.push(b"</item>").unwrap();
        assert_eq!(frames, vec![record("<item><code>6d647374</code></item>")]);
        assert_eq!(reader.pending(), 0);
    }

    #[test]
    fn output_does_not_depend_on_chunking() {
        let whole = collect(&[TWO_ITEMS.as_bytes()]);
        assert_eq!(whole.len(), 2);

        for size in [1, 2, 3, 5, 7, 13, 64] {
            let chunks: Vec<&[u8]> = TWO_ITEMS.as_bytes().chunks(size).collect();
            assert_eq!(collect(&chunks), whole, "chunk size {size}");
        }
    }

    #[test]
    fn end_tag_split_across_chunks_is_found() {
        let frames = collect(&[b"<item><code>61</code></it", b"em>"]);
        assert_eq!(frames, vec![record("<item><code>61</code></item>")]);
    }

    #[test]
    fn truncated_item_is_not_stitched_to_the_next() {
        let truncated = "<item><type>636f7265</type><code>6173616c</code><length>10</length>\n";
        let complete = "<item><type>636f7265</type><code>6d696e6d</code>\
            <data encoding=\"base64\">Q29tZSBUb2dldGhlcg==</data></item>";
        let input = format!("{truncated}{complete}");

        for size in [1, 4, 9, input.len()] {
            let chunks: Vec<&[u8]> = input.as_bytes().chunks(size).collect();
            assert_eq!(
                collect(&chunks),
                vec![
                    Frame::Interrupted {
                        bytes: truncated.len()
                    },
                    record(complete),
                ],
                "chunk size {size}"
            );
        }
    }

    #[test]
    fn whitespace_between_items_is_not_reported() {
        let frames = collect(&[b"\n\r\n<item></item>\n  <item >\n</item>"]);
        assert_eq!(frames, vec![record("<item></item>"), record("<item >\n</item>")]);
    }

    #[test]
    fn similar_tag_names_do_not_start_a_record() {
        let frames = collect(&[b"<item><items>x</items></item>"]);
        assert_eq!(frames, vec![record("<item><items>x</items></item>")]);
    }

    #[test]
    fn record_without_start_tag_is_passed_through() {
        let frames = collect(&[b"garbage</item>"]);
        assert_eq!(frames, vec![record("garbage</item>")]);
    }

    #[test]
    fn oversized_record_is_fatal() {
        let mut reader = FrameReader::new(16);
        let err = reader.push(b"<item><data>QUJDREVGR0g=").unwrap_err();
        assert!(matches!(err, StreamError::RecordTooLarge { limit: 16 }));
        assert_eq!(reader.pending(), 0);
    }

    #[test]
    fn oversized_complete_record_is_fatal() {
        let mut reader = FrameReader::new(16);
        let err = reader.push(b"<item><code>6d647374</code></item>").unwrap_err();
        assert!(matches!(err, StreamError::RecordTooLarge { .. }));
    }

    #[test]
    fn discard_drops_partial_record() {
        let mut reader = FrameReader::default();
        reader.push(b"<item><type>73736e63</type>").unwrap();
        assert_eq!(reader.discard(), "<item><type>73736e63</type>".len());
        assert_eq!(reader.pending(), 0);

        let frames = reader.push(b"<item></item>").unwrap();
        assert_eq!(frames, vec![record("<item></item>")]);
    }

    #[test]
    fn multibyte_text_split_across_chunks_survives() {
        let text = "<item><data>éü</data></item>".as_bytes();
        // Cut inside the two-byte 'é'
        let cut = "<item><data>".len() + 1;
        let frames = collect(&[&text[..cut], &text[cut..]]);
        assert_eq!(frames, vec![record("<item><data>éü</data></item>")]);
    }
}
