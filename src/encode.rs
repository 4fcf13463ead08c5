//! History document encoder.
//!
//! Walks the buffer's toggle boundaries once and emits the minimal
//! `<span>` edit at each one: tags that stay active across a boundary
//! are never closed and reopened.

use std::fmt::{self, Write};

use quick_xml::escape::partial_escape;
use smallvec::SmallVec;

use crate::buffer::StyledBuffer;
use crate::css::write_stylesheet;
use crate::style::{StyleConfig, TagId, TagTable};

/// `name` of the meta element identifying a history document.
pub const FORMAT_META_NAME: &str = "DreamPie Format";
/// The only format version currently written and accepted.
pub const FORMAT_VERSION: &str = "1";

const DOCUMENT_HEAD: &str = "<!DOCTYPE HTML PUBLIC \"-//W3C//DTD HTML 4.01//EN\">\n\
<html><head>\n\
<meta http-equiv=\"Content-Type\" content=\"text/html; charset=utf-8\">\n\
<meta name=\"DreamPie Format\" content=\"1\">\n\
<title>DreamPie History</title>\n\
<style>\n";
const DOCUMENT_BODY_OPEN: &str = "</style>\n</head>\n<body>";
const DOCUMENT_TAIL: &str = "</body>\n</html>\n";

/// Tags active over a run, ordered outermost to innermost.
///
/// Lower priority nests outside higher priority; equal priorities are
/// ordered by name. Values are rebuilt at every boundary, never edited
/// in place.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ActiveTagSet {
    tags: SmallVec<[TagId; 8]>,
}

impl ActiveTagSet {
    /// The empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Tags in nesting order, outermost first.
    pub fn as_slice(&self) -> &[TagId] {
        &self.tags
    }

    /// Number of active tags.
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// Whether no tag is active.
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Set after a boundary: drop `turned_off`, add `turned_on`, re-sort.
    ///
    /// Ids unknown to `table` are dropped so every open span can be closed.
    pub fn next(&self, turned_off: &[TagId], turned_on: &[TagId], table: &TagTable) -> Self {
        let mut tags: SmallVec<[TagId; 8]> = self
            .tags
            .iter()
            .copied()
            .filter(|tag| !turned_off.contains(tag))
            .collect();
        for &tag in turned_on {
            if table.get(tag).is_none() {
                log::warn!("skipping tag id {} missing from the tag table", tag.index());
                continue;
            }
            if !tags.contains(&tag) {
                tags.push(tag);
            }
        }
        tags.sort_by(|a, b| table.nesting_cmp(*a, *b));
        Self { tags }
    }

    /// Length of the common leading run of identical tags.
    pub fn shared_prefix(&self, other: &Self) -> usize {
        self.tags
            .iter()
            .zip(other.tags.iter())
            .take_while(|(a, b)| a == b)
            .count()
    }
}

/// Encode `document` as a complete history file.
pub fn encode(document: &StyledBuffer, config: &StyleConfig) -> Vec<u8> {
    let mut out = String::with_capacity(
        DOCUMENT_HEAD.len() + DOCUMENT_TAIL.len() + document.len() + document.run_count() * 32 + 256,
    );
    // Writing into a String cannot fail.
    let _ = encode_into(document, config, &mut out);
    log::debug!(
        "encoded history: {} runs, {} text bytes, {} output bytes",
        document.run_count(),
        document.len(),
        out.len()
    );
    out.into_bytes()
}

/// Encode `document` into any text sink.
pub fn encode_into<W: Write>(document: &StyledBuffer, config: &StyleConfig, out: &mut W) -> fmt::Result {
    out.write_str(DOCUMENT_HEAD)?;
    write_stylesheet(out, &config.base, &config.tags)?;
    out.write_str(DOCUMENT_BODY_OPEN)?;

    let table = &config.tags;
    let mut cur_tags = ActiveTagSet::new();
    for boundary in document.toggles() {
        let new_tags = cur_tags.next(&boundary.turned_off, &boundary.turned_on, table);
        let shared = cur_tags.shared_prefix(&new_tags);
        for _ in shared..cur_tags.len() {
            out.write_str("</span>")?;
        }
        for tag in new_tags.as_slice()[shared..].iter().filter_map(|&id| table.get(id)) {
            write!(out, "<span class=\"{}\">", tag.name())?;
        }
        let Some(text) = boundary.text else {
            break;
        };
        out.write_str(&partial_escape(text))?;
        cur_tags = new_tags;
    }

    out.write_str(DOCUMENT_TAIL)
}
