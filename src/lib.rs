//! Save and restore interactive session transcripts as self-describing
//! HTML history files.
//!
//! A transcript is a [`StyledBuffer`]: UTF-8 text whose runs carry sets
//! of named tags (stdout, stderr, prompt, ...). [`encode`] writes it as
//! a single HTML document with one `<span class="tag">` per active tag
//! and an embedded stylesheet derived from the host's [`StyleConfig`];
//! [`decode`] rebuilds the exact tag assignment for every character and
//! rejects files that were not produced in this format.
//!
//! # Usage
//!
//! ```rust
//! use dreampie_history::{decode, encode, Color, StyleConfig, StyledBuffer, Tag, TagTable};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let tags = TagTable::from_tags([
//!     Tag::new("stdout", 1),
//!     Tag::new("stderr", 2).with_foreground(Color::rgb(0xff, 0x00, 0x00)),
//! ])?;
//! let stdout = tags.id_of("stdout").ok_or("missing tag")?;
//! let config = StyleConfig { tags, ..StyleConfig::default() };
//!
//! let mut transcript = StyledBuffer::new();
//! transcript.append(">>> ");
//! transcript.push_tagged("1 < 2\n", &[stdout]);
//!
//! let html = encode(&transcript, &config);
//! let restored = decode(&html, &config.tags)?;
//! assert_eq!(restored, transcript);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![cfg_attr(
    not(test),
    deny(
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::todo,
        clippy::unimplemented
    )
)]

pub mod buffer;
pub mod css;
pub mod decode;
pub mod encode;
pub mod error;
#[cfg(feature = "std")]
#[cfg_attr(docsrs, doc(cfg(feature = "std")))]
pub mod persist;
pub mod style;

pub use buffer::{RunRef, StyledBuffer, TagSet, ToggleBoundary, Toggles};
pub use css::{stylesheet, write_stylesheet};
pub use decode::{
    decode, decode_with_limits, read_events, Action, DecodeLimits, DecodePhase, DocumentBuilder,
    ParseEvent, ParserState, StartTag,
};
pub use encode::{encode, encode_into, ActiveTagSet, FORMAT_META_NAME, FORMAT_VERSION};
pub use error::{
    DecodeError, DecodeErrorKind, ErrorLimitContext, HistoryError, StyleError, StyleErrorKind,
};
#[cfg(feature = "std")]
pub use persist::{load_history, save_history, HistoryFile, SaveMode, DEFAULT_FILE_NAME};
#[cfg(feature = "async")]
pub use persist::{load_history_async, save_history_async};
pub use style::{BaseStyle, Color, StyleConfig, Tag, TagId, TagTable};
