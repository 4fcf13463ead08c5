//! Styled text buffer: UTF-8 text plus run-length tag assignment.
//!
//! Every byte of text belongs to exactly one run, adjacent runs always
//! carry different tag sets, and no run is empty. Offsets are byte
//! offsets; ranges that split a character are snapped down to the
//! previous character boundary.

use std::ops::Range;

use smallvec::SmallVec;

use crate::style::TagId;

/// Set of tags over a run, kept sorted by [`TagId`].
pub type TagSet = SmallVec<[TagId; 4]>;

#[derive(Clone, Debug, PartialEq, Eq)]
struct Run {
    end: usize,
    tags: TagSet,
}

/// Borrowed view of one run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunRef<'a> {
    /// Byte range covered by the run.
    pub start: usize,
    /// Exclusive end of the run.
    pub end: usize,
    /// Run text.
    pub text: &'a str,
    /// Tags active over the run, sorted by id.
    pub tags: &'a [TagId],
}

/// A position where the active tag set changes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToggleBoundary<'a> {
    /// Byte offset of the boundary.
    pub offset: usize,
    /// Tags that become active here.
    pub turned_on: TagSet,
    /// Tags that stop being active here.
    pub turned_off: TagSet,
    /// Text up to the next boundary; `None` at the end of the buffer.
    pub text: Option<&'a str>,
}

impl ToggleBoundary<'_> {
    /// Whether this is the end-of-buffer boundary.
    pub fn is_end(&self) -> bool {
        self.text.is_none()
    }
}

/// Append-oriented styled text buffer.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StyledBuffer {
    text: String,
    runs: Vec<Run>,
}

impl StyledBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Full text content.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// Whether the buffer holds no text.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Number of runs.
    pub fn run_count(&self) -> usize {
        self.runs.len()
    }

    /// Append untagged text and return its range.
    ///
    /// New text never inherits tags from the run before it.
    pub fn append(&mut self, text: &str) -> Range<usize> {
        let start = self.text.len();
        if text.is_empty() {
            return start..start;
        }
        self.text.push_str(text);
        let end = self.text.len();
        match self.runs.last_mut() {
            Some(last) if last.tags.is_empty() => last.end = end,
            _ => self.runs.push(Run {
                end,
                tags: TagSet::new(),
            }),
        }
        start..end
    }

    /// Append text carrying exactly `tags`.
    pub fn push_tagged(&mut self, text: &str, tags: &[TagId]) -> Range<usize> {
        let range = self.append(text);
        for &tag in tags {
            self.apply_tag(tag, range.clone());
        }
        range
    }

    /// Add `tag` over `range`.
    pub fn apply_tag(&mut self, tag: TagId, range: Range<usize>) {
        self.modify_range(range, |tags| {
            if let Err(pos) = tags.binary_search(&tag) {
                tags.insert(pos, tag);
            }
        });
    }

    /// Remove `tag` from `range`.
    pub fn remove_tag(&mut self, tag: TagId, range: Range<usize>) {
        self.modify_range(range, |tags| {
            if let Ok(pos) = tags.binary_search(&tag) {
                tags.remove(pos);
            }
        });
    }

    /// Clear every tag over `range`.
    pub fn remove_all_tags(&mut self, range: Range<usize>) {
        self.modify_range(range, |tags| tags.clear());
    }

    /// Tags active at `offset` (empty at or past the end).
    pub fn tags_at(&self, offset: usize) -> &[TagId] {
        let idx = self.runs.partition_point(|run| run.end <= offset);
        self.runs.get(idx).map(|run| run.tags.as_slice()).unwrap_or(&[])
    }

    /// Iterate maximal runs in order.
    pub fn runs(&self) -> impl Iterator<Item = RunRef<'_>> {
        let mut start = 0usize;
        self.runs.iter().map(move |run| {
            let item = RunRef {
                start,
                end: run.end,
                text: &self.text[start..run.end],
                tags: &run.tags,
            };
            start = run.end;
            item
        })
    }

    /// Iterate toggle boundaries, ending with exactly one end boundary.
    pub fn toggles(&self) -> Toggles<'_> {
        Toggles {
            buffer: self,
            next_run: 0,
            prev_tags: &[],
            done: false,
        }
    }

    fn snap(&self, offset: usize) -> usize {
        let mut offset = offset.min(self.text.len());
        while !self.text.is_char_boundary(offset) {
            offset -= 1;
        }
        offset
    }

    fn run_start(&self, idx: usize) -> usize {
        if idx == 0 {
            0
        } else {
            self.runs[idx - 1].end
        }
    }

    /// Ensure a run starts at `offset` and return that run's index.
    fn split_at(&mut self, offset: usize) -> usize {
        let idx = self.runs.partition_point(|run| run.end <= offset);
        if idx == self.runs.len() || self.run_start(idx) == offset {
            return idx;
        }
        let tags = self.runs[idx].tags.clone();
        self.runs.insert(idx, Run { end: offset, tags });
        idx + 1
    }

    fn modify_range<F>(&mut self, range: Range<usize>, mut edit: F)
    where
        F: FnMut(&mut TagSet),
    {
        let start = self.snap(range.start);
        let end = self.snap(range.end);
        if start >= end {
            return;
        }
        let first = self.split_at(start);
        let last = self.split_at(end);
        for run in &mut self.runs[first..last] {
            edit(&mut run.tags);
        }
        self.coalesce(first, last);
    }

    /// Merge equal neighbours across the boundaries `first..=last`.
    fn coalesce(&mut self, first: usize, last: usize) {
        let mut idx = first.max(1);
        let mut last = last.min(self.runs.len().saturating_sub(1));
        while idx <= last {
            if self.runs[idx - 1].tags == self.runs[idx].tags {
                self.runs[idx - 1].end = self.runs[idx].end;
                self.runs.remove(idx);
                last -= 1;
            } else {
                idx += 1;
            }
        }
    }
}

/// Iterator over [`ToggleBoundary`] values.
#[derive(Clone, Debug)]
pub struct Toggles<'a> {
    buffer: &'a StyledBuffer,
    next_run: usize,
    prev_tags: &'a [TagId],
    done: bool,
}

impl<'a> Iterator for Toggles<'a> {
    type Item = ToggleBoundary<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let buffer = self.buffer;
        let offset = buffer.run_start(self.next_run);
        let (tags, text): (&'a [TagId], _) = match buffer.runs.get(self.next_run) {
            Some(run) => (run.tags.as_slice(), Some(&buffer.text[offset..run.end])),
            None => {
                self.done = true;
                (&[][..], None)
            }
        };
        let turned_on = tags
            .iter()
            .copied()
            .filter(|tag| !self.prev_tags.contains(tag))
            .collect();
        let turned_off = self
            .prev_tags
            .iter()
            .copied()
            .filter(|tag| !tags.contains(tag))
            .collect();
        self.prev_tags = tags;
        self.next_run += 1;
        Some(ToggleBoundary {
            offset,
            turned_on,
            turned_off,
            text,
        })
    }
}
