//! Tag definitions and the base style of a history buffer.
//!
//! Tags are owned by the host application's style configuration, not by
//! the history file: the file only carries tag names (as span classes),
//! and every attribute is re-derived from the [`TagTable`] on load.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{StyleError, StyleErrorKind};

/// 24-bit RGB color.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Color {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Color {
    /// Create a color from 8-bit channels.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Create a color from 16-bit toolkit channels, keeping the high byte.
    pub const fn from_rgb16(r: u16, g: u16, b: u16) -> Self {
        Self {
            r: (r >> 8) as u8,
            g: (g >> 8) as u8,
            b: (b >> 8) as u8,
        }
    }

    /// Parse `#rrggbb` (hex digits in either case).
    pub fn parse_hex(text: &str) -> Result<Self, StyleError> {
        let invalid = || {
            StyleError::new(
                StyleErrorKind::InvalidColor,
                format!("expected #rrggbb, got {:?}", text),
            )
        };
        let digits = text.strip_prefix('#').ok_or_else(invalid)?;
        if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let channel = |idx: usize| u8::from_str_radix(&digits[idx..idx + 2], 16);
        match (channel(0), channel(2), channel(4)) {
            (Ok(r), Ok(g), Ok(b)) => Ok(Self { r, g, b }),
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// A named style attribute bundle applicable to ranges of text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tag {
    name: String,
    /// Higher priority nests deeper (innermost) and wins CSS conflicts.
    pub priority: i32,
    /// Text color.
    pub foreground: Option<Color>,
    /// Background color.
    pub background: Option<Color>,
    /// Hidden text (`display: none`).
    pub invisible: bool,
}

impl Tag {
    /// Create a tag with no visual attributes.
    pub fn new(name: impl Into<String>, priority: i32) -> Self {
        Self {
            name: name.into(),
            priority,
            foreground: None,
            background: None,
            invisible: false,
        }
    }

    /// Set the text color.
    pub fn with_foreground(mut self, color: Color) -> Self {
        self.foreground = Some(color);
        self
    }

    /// Set the background color.
    pub fn with_background(mut self, color: Color) -> Self {
        self.background = Some(color);
        self
    }

    /// Mark text carrying this tag as hidden.
    pub fn with_invisible(mut self, invisible: bool) -> Self {
        self.invisible = invisible;
        self
    }

    /// Unique tag name, also used as the span class.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Dense handle of a tag inside a [`TagTable`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TagId(u16);

impl TagId {
    /// Position of the tag in definition order.
    pub fn index(self) -> usize {
        usize::from(self.0)
    }
}

/// Fixed set of tags known to the host.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TagTable {
    tags: Vec<Tag>,
    by_name: BTreeMap<String, TagId>,
}

impl TagTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from tags in definition order.
    pub fn from_tags(tags: impl IntoIterator<Item = Tag>) -> Result<Self, StyleError> {
        let mut table = Self::new();
        for tag in tags {
            table.insert(tag)?;
        }
        Ok(table)
    }

    /// Register a tag and return its handle.
    pub fn insert(&mut self, tag: Tag) -> Result<TagId, StyleError> {
        validate_tag_name(tag.name())?;
        if self.by_name.contains_key(tag.name()) {
            return Err(StyleError::new(
                StyleErrorKind::DuplicateTag,
                format!("tag {:?} is defined twice", tag.name()),
            ));
        }
        let id = u16::try_from(self.tags.len())
            .map(TagId)
            .map_err(|_| {
                StyleError::new(
                    StyleErrorKind::InvalidTagName,
                    format!("too many tags (limit {})", u16::MAX),
                )
            })?;
        self.by_name.insert(tag.name().to_string(), id);
        self.tags.push(tag);
        Ok(id)
    }

    /// Look up a tag by handle.
    pub fn get(&self, id: TagId) -> Option<&Tag> {
        self.tags.get(id.index())
    }

    /// Look up a handle by tag name.
    pub fn id_of(&self, name: &str) -> Option<TagId> {
        self.by_name.get(name).copied()
    }

    /// Number of tags.
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// Whether no tags are defined.
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Iterate tags in definition order.
    pub fn iter(&self) -> impl Iterator<Item = (TagId, &Tag)> {
        self.tags
            .iter()
            .enumerate()
            .map(|(idx, tag)| (TagId(idx as u16), tag))
    }

    /// Nesting order: lower priority first (outer), ties by name.
    ///
    /// Unknown ids sort last so the order stays total.
    pub fn nesting_cmp(&self, a: TagId, b: TagId) -> Ordering {
        match (self.get(a), self.get(b)) {
            (Some(ta), Some(tb)) => ta
                .priority
                .cmp(&tb.priority)
                .then_with(|| ta.name.cmp(&tb.name)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => a.cmp(&b),
        }
    }

    /// All tags by descending priority, ties by name.
    pub fn by_descending_priority(&self) -> Vec<&Tag> {
        let mut sorted: Vec<&Tag> = self.tags.iter().collect();
        sorted.sort_by(|a, b| b.priority.cmp(&a.priority).then_with(|| a.name.cmp(&b.name)));
        sorted
    }
}

fn validate_tag_name(name: &str) -> Result<(), StyleError> {
    let bad_char = name
        .chars()
        .find(|c| c.is_ascii_whitespace() || matches!(c, '"' | '\'' | '<' | '>' | '&'));
    if name.is_empty() || bad_char.is_some() {
        return Err(StyleError::new(
            StyleErrorKind::InvalidTagName,
            format!("{:?} cannot be used as a span class", name),
        ));
    }
    Ok(())
}

/// Base font and colors of the history view.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BaseStyle {
    font_family: String,
    /// Font size in points.
    pub font_size_pt: u16,
    /// Default text color.
    pub foreground: Color,
    /// Default background color.
    pub background: Color,
}

impl BaseStyle {
    /// Create a base style, rejecting font families that cannot be
    /// embedded verbatim in a stylesheet.
    pub fn new(
        font_family: impl Into<String>,
        font_size_pt: u16,
        foreground: Color,
        background: Color,
    ) -> Result<Self, StyleError> {
        let font_family = font_family.into();
        if font_family.trim().is_empty()
            || font_family
                .chars()
                .any(|c| matches!(c, '<' | '>' | '&' | ';' | '{' | '}' | '"'))
        {
            return Err(StyleError::new(
                StyleErrorKind::InvalidFontFamily,
                format!("font family {:?} cannot be embedded in CSS", font_family),
            ));
        }
        Ok(Self {
            font_family,
            font_size_pt,
            foreground,
            background,
        })
    }

    /// Font family as written into the stylesheet.
    pub fn font_family(&self) -> &str {
        &self.font_family
    }
}

impl Default for BaseStyle {
    fn default() -> Self {
        Self {
            font_family: "monospace".to_string(),
            font_size_pt: 10,
            foreground: Color::rgb(0xff, 0xff, 0xff),
            background: Color::rgb(0x00, 0x00, 0x00),
        }
    }
}

/// Style configuration consumed by the encoder and decoder.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StyleConfig {
    /// Base font and colors.
    pub base: BaseStyle,
    /// Known tags.
    pub tags: TagTable,
}

impl StyleConfig {
    /// Bundle a base style with a tag table.
    pub fn new(base: BaseStyle, tags: TagTable) -> Self {
        Self { base, tags }
    }
}
