//! Stylesheet projection of the base style and tag table.

use std::fmt::{self, Write};

use crate::style::{BaseStyle, StyleConfig, Tag, TagTable};

/// Render the stylesheet embedded in a history document's `<style>`.
pub fn stylesheet(config: &StyleConfig) -> String {
    let mut out = String::with_capacity(128 + config.tags.len() * 48);
    // Writing into a String cannot fail.
    let _ = write_stylesheet(&mut out, &config.base, &config.tags);
    out
}

/// Write the `body` rule followed by one `span.<name>` rule per tag,
/// highest priority first.
pub fn write_stylesheet<W: Write>(out: &mut W, base: &BaseStyle, tags: &TagTable) -> fmt::Result {
    writeln!(
        out,
        "body {{ white-space: pre-wrap; font-family: {}; font-size: {}pt; color: {}; background-color: {}; }}",
        base.font_family(),
        base.font_size_pt,
        base.foreground,
        base.background
    )?;
    for tag in tags.by_descending_priority() {
        write_tag_rule(out, tag)?;
    }
    Ok(())
}

fn write_tag_rule<W: Write>(out: &mut W, tag: &Tag) -> fmt::Result {
    write!(out, "span.{} {{ ", tag.name())?;
    if let Some(color) = tag.foreground {
        write!(out, "color: {}; ", color)?;
    }
    if let Some(color) = tag.background {
        write!(out, "background-color: {}; ", color)?;
    }
    if tag.invisible {
        out.write_str("display: none; ")?;
    }
    out.write_str("}\n")
}
