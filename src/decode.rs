//! History document decoder.
//!
//! The tokenizer turns the file into [`ParseEvent`]s; [`ParserState`]
//! maps each event to an [`Action`] or a [`DecodeError`]; and
//! [`DocumentBuilder`] applies insertions to a fresh buffer. Only the
//! markup subset written by [`crate::encode`] is accepted: anything
//! structurally inconsistent with it is rejected rather than repaired.

use std::borrow::Cow;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use smallvec::SmallVec;

use crate::buffer::StyledBuffer;
use crate::encode::{FORMAT_META_NAME, FORMAT_VERSION};
use crate::error::{DecodeError, DecodeErrorKind};
use crate::style::{TagId, TagTable};

/// Hard limits applied while decoding untrusted files.
///
/// [`decode`] applies none; pass [`DecodeLimits::default`] or
/// [`DecodeLimits::embedded`] to [`decode_with_limits`] to cap input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecodeLimits {
    /// Maximum size of the whole input.
    pub max_input_bytes: usize,
    /// Maximum number of simultaneously open spans.
    pub max_span_depth: usize,
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self {
            max_input_bytes: 16 * 1024 * 1024,
            max_span_depth: 64,
        }
    }
}

impl DecodeLimits {
    /// No ceilings: every document [`crate::encode`] produces decodes.
    pub fn unbounded() -> Self {
        Self {
            max_input_bytes: usize::MAX,
            max_span_depth: usize::MAX,
        }
    }

    /// Small-footprint preset.
    pub fn embedded() -> Self {
        Self {
            max_input_bytes: 1024 * 1024,
            max_span_depth: 16,
        }
    }
}

/// Start tag with lower-cased name and attribute keys.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StartTag {
    /// Element name.
    pub name: String,
    /// Attributes in document order.
    pub attributes: Vec<(String, String)>,
    /// Written as `<name ... />`.
    pub self_closing: bool,
}

impl StartTag {
    /// Create a start tag without attributes.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Add an attribute.
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    /// First value of attribute `key`.
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Structural event fed to the state machine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParseEvent<'a> {
    /// `<name ...>` or `<name .../>`.
    StartTag(StartTag),
    /// `</name>`.
    EndTag(String),
    /// Raw character data between markup.
    CharacterData(Cow<'a, str>),
    /// Named entity reference, without `&` and `;`.
    EntityRef(Cow<'a, str>),
    /// Numeric character reference, without `&` and `;`.
    CharRef(Cow<'a, str>),
    /// Content-bearing markup the encoder never writes (`"cdata"`,
    /// `"processing instruction"`).
    Foreign(&'static str),
    /// Input exhausted.
    EndOfInput,
}

/// Position of the decoder in the document structure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecodePhase {
    /// No format meta validated yet.
    BeforeFormatMeta,
    /// Format meta validated, waiting for `<body>`.
    AwaitingBody,
    /// Inside `<body>`.
    InBody,
    /// After `</body>`; remaining content is ignored.
    AfterBody,
    /// End of input accepted.
    Done,
}

/// What the caller must do after an event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action<'a> {
    /// Nothing to insert.
    None,
    /// Insert text tagged with the current span stack.
    Insert(Cow<'a, str>),
}

/// Decoder state machine.
#[derive(Clone, Debug)]
pub struct ParserState<'t> {
    table: &'t TagTable,
    limits: DecodeLimits,
    phase: DecodePhase,
    format_version: Option<u32>,
    tag_stack: SmallVec<[TagId; 8]>,
}

impl<'t> ParserState<'t> {
    /// Fresh state resolving span classes against `table`.
    pub fn new(table: &'t TagTable, limits: DecodeLimits) -> Self {
        Self {
            table,
            limits,
            phase: DecodePhase::BeforeFormatMeta,
            format_version: None,
            tag_stack: SmallVec::new(),
        }
    }

    /// Current phase.
    pub fn phase(&self) -> DecodePhase {
        self.phase
    }

    /// Validated format version, once seen.
    pub fn format_version(&self) -> Option<u32> {
        self.format_version
    }

    /// Open spans, outermost first.
    pub fn tag_stack(&self) -> &[TagId] {
        &self.tag_stack
    }

    /// Advance by one event.
    pub fn handle<'a>(&mut self, event: ParseEvent<'a>) -> Result<Action<'a>, DecodeError> {
        use DecodePhase::*;

        match (self.phase, event) {
            (_, ParseEvent::CharRef(name)) => Err(DecodeError::new(
                DecodeErrorKind::UnexpectedCharacterReference,
                format!("Got a charref &{}; and not expecting it", name),
            )),
            (_, ParseEvent::EndOfInput) => self.finish().map(|()| Action::None),
            (BeforeFormatMeta | AwaitingBody, ParseEvent::StartTag(tag)) => {
                self.start_before_body(&tag).map(|()| Action::None)
            }
            (BeforeFormatMeta | AwaitingBody, _) => Ok(Action::None),
            (InBody, ParseEvent::StartTag(tag)) => {
                if tag.name == "span" {
                    self.open_span(&tag)?;
                } else {
                    log::debug!("ignoring <{}> inside history body", tag.name);
                }
                Ok(Action::None)
            }
            (InBody, ParseEvent::EndTag(name)) => {
                match name.as_str() {
                    "span" => self.close_span()?,
                    "body" => self.close_body()?,
                    _ => log::debug!("ignoring </{}> inside history body", name),
                }
                Ok(Action::None)
            }
            (InBody, ParseEvent::CharacterData(text)) => Ok(Action::Insert(text)),
            (InBody, ParseEvent::Foreign(what)) => Err(DecodeError::new(
                DecodeErrorKind::Malformed,
                format!("unexpected {} inside history body", what),
            )),
            (InBody, ParseEvent::EntityRef(name)) => resolve_entity(&name)
                .map(|text| Action::Insert(Cow::Borrowed(text)))
                .ok_or_else(|| {
                    DecodeError::new(
                        DecodeErrorKind::UnknownEntity,
                        format!("unknown entity reference &{};", name),
                    )
                }),
            (AfterBody | Done, _) => Ok(Action::None),
        }
    }

    fn start_before_body(&mut self, tag: &StartTag) -> Result<(), DecodeError> {
        match tag.name.as_str() {
            "meta" if self.format_version.is_none() && tag.attr("name") == Some(FORMAT_META_NAME) => {
                match tag.attr("content") {
                    Some(FORMAT_VERSION) => {
                        self.format_version = Some(1);
                        self.phase = DecodePhase::AwaitingBody;
                        Ok(())
                    }
                    Some(other) => Err(DecodeError::new(
                        DecodeErrorKind::UnrecognizedFormatVersion,
                        format!("Unrecognized DreamPie Format {:?}", other),
                    )),
                    None => Err(DecodeError::new(
                        DecodeErrorKind::UnrecognizedFormatVersion,
                        "DreamPie Format meta has no content",
                    )),
                }
            }
            "body" => {
                if self.format_version.is_none() {
                    return Err(DecodeError::new(
                        DecodeErrorKind::NotARecognizedDocument,
                        "File is not a DreamPie history file",
                    ));
                }
                if !tag.self_closing {
                    self.phase = DecodePhase::InBody;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn open_span(&mut self, tag: &StartTag) -> Result<(), DecodeError> {
        let class = tag.attr("class").ok_or_else(|| {
            DecodeError::new(
                DecodeErrorKind::SpanMissingClass,
                "<span> without a 'class' attribute",
            )
        })?;
        let class = class.trim();
        let id = self.table.id_of(class).ok_or_else(|| {
            DecodeError::new(
                DecodeErrorKind::UnknownTag,
                format!("span class {:?} is not a known tag", class),
            )
        })?;
        if tag.self_closing {
            return Ok(());
        }
        if self.tag_stack.len() >= self.limits.max_span_depth {
            return Err(DecodeError::new(
                DecodeErrorKind::LimitExceeded,
                format!(
                    "span nesting exceeds max_span_depth ({})",
                    self.limits.max_span_depth
                ),
            )
            .with_limit(
                "max_span_depth",
                self.tag_stack.len() + 1,
                self.limits.max_span_depth,
            ));
        }
        self.tag_stack.push(id);
        Ok(())
    }

    fn close_span(&mut self) -> Result<(), DecodeError> {
        self.tag_stack.pop().map(|_| ()).ok_or_else(|| {
            DecodeError::new(DecodeErrorKind::UnbalancedClosingSpan, "Too many </span> tags")
        })
    }

    fn close_body(&mut self) -> Result<(), DecodeError> {
        if !self.tag_stack.is_empty() {
            return Err(DecodeError::new(
                DecodeErrorKind::TruncatedDocument,
                format!("</body> with {} unclosed <span> tags", self.tag_stack.len()),
            ));
        }
        self.phase = DecodePhase::AfterBody;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), DecodeError> {
        match self.phase {
            DecodePhase::BeforeFormatMeta | DecodePhase::AwaitingBody => Err(DecodeError::new(
                DecodeErrorKind::TruncatedDocument,
                "input ended before <body>",
            )),
            DecodePhase::InBody if !self.tag_stack.is_empty() => Err(DecodeError::new(
                DecodeErrorKind::TruncatedDocument,
                format!("input ended with {} unclosed <span> tags", self.tag_stack.len()),
            )),
            _ => {
                self.phase = DecodePhase::Done;
                Ok(())
            }
        }
    }
}

fn resolve_entity(name: &str) -> Option<&'static str> {
    quick_xml::escape::resolve_html5_entity(name)
}

/// Decode target: a buffer plus the two marks delimiting the text
/// inserted last.
///
/// Text always goes in at the left mark and the right mark follows the
/// end of the insertion, so `left..right` is exactly the new text. Its
/// tags are cleared and set explicitly before both marks collapse to
/// the new end.
#[derive(Clone, Debug, Default)]
pub struct DocumentBuilder {
    buffer: StyledBuffer,
    left_mark: usize,
    right_mark: usize,
}

impl DocumentBuilder {
    /// Empty document with both marks at the start.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `text` carrying exactly `tags`.
    pub fn insert(&mut self, text: &str, tags: &[TagId]) {
        let inserted = self.buffer.append(text);
        self.right_mark = inserted.end;
        let range = self.left_mark..self.right_mark;
        self.buffer.remove_all_tags(range.clone());
        for &tag in tags {
            self.buffer.apply_tag(tag, range.clone());
        }
        self.left_mark = self.right_mark;
    }

    /// Current `(left, right)` marks.
    pub fn marks(&self) -> (usize, usize) {
        (self.left_mark, self.right_mark)
    }

    /// Drop the marks and hand out the buffer.
    pub fn finish(self) -> StyledBuffer {
        self.buffer
    }
}

/// Decode a history file without size or depth limits.
pub fn decode(bytes: &[u8], table: &TagTable) -> Result<StyledBuffer, DecodeError> {
    decode_with_limits(bytes, table, DecodeLimits::unbounded())
}

/// Decode a history file.
///
/// On failure nothing of the partially built document survives.
pub fn decode_with_limits(
    bytes: &[u8],
    table: &TagTable,
    limits: DecodeLimits,
) -> Result<StyledBuffer, DecodeError> {
    if bytes.len() > limits.max_input_bytes {
        return Err(DecodeError::new(
            DecodeErrorKind::LimitExceeded,
            format!(
                "input exceeds max_input_bytes ({} > {})",
                bytes.len(),
                limits.max_input_bytes
            ),
        )
        .with_limit("max_input_bytes", bytes.len(), limits.max_input_bytes));
    }

    let mut state = ParserState::new(table, limits);
    let mut document = DocumentBuilder::new();
    read_events(bytes, |event| {
        if let Action::Insert(text) = state.handle(event)? {
            document.insert(&text, state.tag_stack());
        }
        Ok(())
    })?;

    let buffer = document.finish();
    log::debug!(
        "decoded history: {} runs, {} text bytes from {} input bytes",
        buffer.run_count(),
        buffer.len(),
        bytes.len()
    );
    Ok(buffer)
}

/// Tokenize `bytes` and feed every structural event to `on_event`,
/// finishing with [`ParseEvent::EndOfInput`].
///
/// Errors returned by `on_event` stop tokenizing and are tagged with the
/// current byte offset.
pub fn read_events<F>(bytes: &[u8], mut on_event: F) -> Result<(), DecodeError>
where
    F: FnMut(ParseEvent<'_>) -> Result<(), DecodeError>,
{
    let mut reader = Reader::from_reader(bytes);
    {
        let config = reader.config_mut();
        config.trim_text(false);
        // HTML leaves <meta> open; span balance is checked by the state machine.
        config.check_end_names = false;
        config.allow_unmatched_ends = true;
    }
    let mut buf = Vec::with_capacity(256);

    loop {
        let result = match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                start_tag_from(&reader, &e, false).and_then(|tag| on_event(ParseEvent::StartTag(tag)))
            }
            Ok(Event::Empty(e)) => {
                start_tag_from(&reader, &e, true).and_then(|tag| on_event(ParseEvent::StartTag(tag)))
            }
            Ok(Event::End(e)) => decode_tag_name(&reader, e.name().as_ref())
                .and_then(|name| on_event(ParseEvent::EndTag(name))),
            Ok(Event::Text(e)) => match e.decode() {
                Ok(text) => on_event(ParseEvent::CharacterData(text)),
                Err(err) => Err(malformed("text decode", format!("Decode error: {:?}", err))),
            },
            Ok(Event::GeneralRef(e)) => match e.decode() {
                Ok(name) if e.is_char_ref() => on_event(ParseEvent::CharRef(name)),
                Ok(name) => on_event(ParseEvent::EntityRef(name)),
                Err(err) => Err(malformed("entity decode", format!("Decode error: {:?}", err))),
            },
            Ok(Event::CData(_)) => on_event(ParseEvent::Foreign("cdata")),
            Ok(Event::PI(_)) => on_event(ParseEvent::Foreign("processing instruction")),
            Ok(Event::Eof) => {
                return on_event(ParseEvent::EndOfInput)
                    .map_err(|err| with_offset(err, reader_token_offset(&reader)));
            }
            Ok(_) => Ok(()),
            Err(err) => Err(malformed("html tokenizer", format!("HTML error: {:?}", err))),
        };
        result.map_err(|err| with_offset(err, reader_token_offset(&reader)))?;
        buf.clear();
    }
}

fn malformed(source: &str, message: String) -> DecodeError {
    DecodeError::new(DecodeErrorKind::Malformed, format!("{} ({})", message, source))
}

fn with_offset(err: DecodeError, offset: usize) -> DecodeError {
    if err.token_offset.is_some() {
        err
    } else {
        err.with_token_offset(offset)
    }
}

fn reader_token_offset(reader: &Reader<&[u8]>) -> usize {
    usize::try_from(reader.buffer_position()).unwrap_or(usize::MAX)
}

fn decode_tag_name(reader: &Reader<&[u8]>, raw: &[u8]) -> Result<String, DecodeError> {
    let decoded = reader
        .decoder()
        .decode(raw)
        .map_err(|err| malformed("tag name decode", format!("Decode error: {:?}", err)))?;
    Ok(decoded.to_ascii_lowercase())
}

fn start_tag_from(
    reader: &Reader<&[u8]>,
    e: &BytesStart<'_>,
    self_closing: bool,
) -> Result<StartTag, DecodeError> {
    let name = decode_tag_name(reader, e.name().as_ref())?;
    let mut attributes = Vec::with_capacity(4);
    for attr in e.attributes() {
        let attr = attr.map_err(|err| {
            malformed("attribute", format!("Attribute error in <{}>: {:?}", name, err))
        })?;
        let key = reader
            .decoder()
            .decode(attr.key.as_ref())
            .map_err(|err| malformed("attribute decode", format!("Decode error: {:?}", err)))?
            .to_ascii_lowercase();
        let value = reader
            .decoder()
            .decode(&attr.value)
            .map_err(|err| malformed("attribute decode", format!("Decode error: {:?}", err)))?
            .into_owned();
        if attributes.iter().any(|(k, _)| *k == key) {
            return Err(malformed(
                "attribute",
                format!("duplicate attribute {:?} in <{}>", key, name),
            ));
        }
        attributes.push((key, value));
    }
    Ok(StartTag {
        name,
        attributes,
        self_closing,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::Tag;

    const HEAD: &str = "<!DOCTYPE HTML PUBLIC \"-//W3C//DTD HTML 4.01//EN\">\n<html><head>\n\
<meta http-equiv=\"Content-Type\" content=\"text/html; charset=utf-8\">\n\
<meta name=\"DreamPie Format\" content=\"1\">\n<title>DreamPie History</title>\n\
<style>\nbody { white-space: pre-wrap; }\n</style>\n</head>\n";

    fn table() -> TagTable {
        TagTable::from_tags([Tag::new("msg", 1), Tag::new("err", 2)]).expect("tags")
    }

    fn doc(body: &str) -> String {
        format!("{}{}\n</html>\n", HEAD, body)
    }

    fn runs(buffer: &StyledBuffer, table: &TagTable) -> Vec<(String, Vec<String>)> {
        buffer
            .runs()
            .map(|run| {
                let names = run
                    .tags
                    .iter()
                    .map(|&id| table.get(id).expect("known tag").name().to_string())
                    .collect();
                (run.text.to_string(), names)
            })
            .collect()
    }

    fn kind_of(input: &str) -> DecodeErrorKind {
        decode(input.as_bytes(), &table()).expect_err("decode should fail").kind
    }

    #[test]
    fn state_machine_walks_the_happy_path() {
        let table = table();
        let msg = table.id_of("msg").expect("msg");
        let mut state = ParserState::new(&table, DecodeLimits::default());
        assert_eq!(state.phase(), DecodePhase::BeforeFormatMeta);

        let meta = StartTag::new("meta")
            .with_attr("name", "DreamPie Format")
            .with_attr("content", "1");
        assert_eq!(state.handle(ParseEvent::StartTag(meta)), Ok(Action::None));
        assert_eq!(state.phase(), DecodePhase::AwaitingBody);
        assert_eq!(state.format_version(), Some(1));

        state
            .handle(ParseEvent::StartTag(StartTag::new("body")))
            .expect("body");
        assert_eq!(state.phase(), DecodePhase::InBody);

        state
            .handle(ParseEvent::StartTag(StartTag::new("span").with_attr("class", "msg")))
            .expect("span");
        assert_eq!(state.tag_stack(), &[msg]);
        assert_eq!(
            state.handle(ParseEvent::CharacterData(Cow::Borrowed("hi"))),
            Ok(Action::Insert(Cow::Borrowed("hi")))
        );
        assert_eq!(
            state.handle(ParseEvent::EntityRef(Cow::Borrowed("lt"))),
            Ok(Action::Insert(Cow::Borrowed("<")))
        );
        state
            .handle(ParseEvent::EndTag("span".to_string()))
            .expect("close span");
        state
            .handle(ParseEvent::EndTag("body".to_string()))
            .expect("close body");
        assert_eq!(state.phase(), DecodePhase::AfterBody);
        assert_eq!(
            state.handle(ParseEvent::CharacterData(Cow::Borrowed("\n"))),
            Ok(Action::None)
        );
        state.handle(ParseEvent::EndOfInput).expect("eof");
        assert_eq!(state.phase(), DecodePhase::Done);
    }

    #[test]
    fn text_before_body_is_ignored() {
        let table = table();
        let mut state = ParserState::new(&table, DecodeLimits::default());
        assert_eq!(
            state.handle(ParseEvent::CharacterData(Cow::Borrowed("title"))),
            Ok(Action::None)
        );
        assert_eq!(
            state.handle(ParseEvent::EntityRef(Cow::Borrowed("amp"))),
            Ok(Action::None)
        );
    }

    #[test]
    fn char_refs_fail_in_every_phase() {
        let table = table();
        let mut state = ParserState::new(&table, DecodeLimits::default());
        let err = state
            .handle(ParseEvent::CharRef(Cow::Borrowed("#65")))
            .expect_err("charref");
        assert_eq!(err.kind, DecodeErrorKind::UnexpectedCharacterReference);
    }

    #[test]
    fn missing_format_meta_is_not_a_history_document() {
        assert_eq!(
            kind_of("<html><body>hi</body></html>"),
            DecodeErrorKind::NotARecognizedDocument
        );
    }

    #[test]
    fn unsupported_format_version_is_rejected() {
        assert_eq!(
            kind_of("<html><head><meta name=\"DreamPie Format\" content=\"2\"></head><body></body></html>"),
            DecodeErrorKind::UnrecognizedFormatVersion
        );
        assert_eq!(
            kind_of("<html><head><meta name=\"DreamPie Format\"></head><body></body></html>"),
            DecodeErrorKind::UnrecognizedFormatVersion
        );
    }

    #[test]
    fn span_without_class_is_rejected() {
        assert_eq!(
            kind_of(&doc("<body><span>hi</span></body>")),
            DecodeErrorKind::SpanMissingClass
        );
    }

    #[test]
    fn stray_closing_span_is_rejected() {
        assert_eq!(
            kind_of(&doc("<body>hi</span></body>")),
            DecodeErrorKind::UnbalancedClosingSpan
        );
    }

    #[test]
    fn numeric_character_reference_is_rejected() {
        let err = decode(doc("<body>&#65;</body>").as_bytes(), &table()).expect_err("charref");
        assert_eq!(err.kind, DecodeErrorKind::UnexpectedCharacterReference);
        assert!(err.token_offset.is_some());
    }

    #[test]
    fn unknown_class_and_entity_are_rejected() {
        assert_eq!(
            kind_of(&doc("<body><span class=\"nope\">x</span></body>")),
            DecodeErrorKind::UnknownTag
        );
        assert_eq!(
            kind_of(&doc("<body>&bogusentity;</body>")),
            DecodeErrorKind::UnknownEntity
        );
    }

    #[test]
    fn bare_ampersand_is_malformed() {
        assert_eq!(kind_of(&doc("<body>a & b</body>")), DecodeErrorKind::Malformed);
    }

    #[test]
    fn cdata_and_processing_instructions_in_body_are_malformed() {
        assert_eq!(
            kind_of(&doc("<body>a<![CDATA[hidden]]>b</body>")),
            DecodeErrorKind::Malformed
        );
        assert_eq!(
            kind_of(&doc("<body>a<?php echo 1 ?>b</body>")),
            DecodeErrorKind::Malformed
        );
    }

    #[test]
    fn cdata_outside_body_is_ignored() {
        let table = table();
        let input = format!("{}<![CDATA[x]]>\n<body>ok</body>\n</html>\n", HEAD);
        let buffer = decode(input.as_bytes(), &table).expect("decode");
        assert_eq!(buffer.text(), "ok");
    }

    #[test]
    fn bad_attributes_are_malformed() {
        assert_eq!(
            kind_of(&doc("<body><span class=\"msg\" class=\"err\">x</span></body>")),
            DecodeErrorKind::Malformed
        );
        assert_eq!(
            kind_of(&doc("<body><span class=\"msg\" CLASS=\"err\">x</span></body>")),
            DecodeErrorKind::Malformed
        );
        assert_eq!(
            kind_of(&doc("<body><span class=\"msg\" junk>x</span></body>")),
            DecodeErrorKind::Malformed
        );
    }

    #[test]
    fn decode_has_no_depth_limit() {
        let tags: Vec<Tag> = (0..65).map(|i| Tag::new(format!("t{}", i), i)).collect();
        let config = crate::style::StyleConfig {
            tags: TagTable::from_tags(tags).expect("tags"),
            ..crate::style::StyleConfig::default()
        };
        let all: Vec<TagId> = config.tags.iter().map(|(id, _)| id).collect();
        let mut transcript = StyledBuffer::new();
        transcript.push_tagged("x", &all);
        let html = crate::encode::encode(&transcript, &config);

        let restored = decode(&html, &config.tags).expect("65 nested spans");
        assert_eq!(restored, transcript);
        let err = decode_with_limits(&html, &config.tags, DecodeLimits::default())
            .expect_err("default preset caps depth");
        assert_eq!(err.kind, DecodeErrorKind::LimitExceeded);
    }

    #[test]
    fn decode_has_no_input_size_limit() {
        let config = crate::style::StyleConfig::default();
        let line = "0123456789abcdef".repeat(64);
        let mut transcript = StyledBuffer::new();
        while transcript.len() <= DecodeLimits::default().max_input_bytes {
            transcript.append(&line);
        }
        let html = crate::encode::encode(&transcript, &config);
        assert!(html.len() > DecodeLimits::default().max_input_bytes);

        let restored = decode(&html, &config.tags).expect("17 MiB transcript");
        assert_eq!(restored.len(), transcript.len());
        assert_eq!(restored.run_count(), 1);
        let err = decode_with_limits(&html, &config.tags, DecodeLimits::default())
            .expect_err("default preset caps input");
        assert_eq!(err.kind, DecodeErrorKind::LimitExceeded);
    }

    #[test]
    fn incomplete_documents_are_truncated() {
        assert_eq!(kind_of(HEAD), DecodeErrorKind::TruncatedDocument);
        assert_eq!(
            kind_of(&format!("{}<body><span class=\"msg\">x", HEAD)),
            DecodeErrorKind::TruncatedDocument
        );
        assert_eq!(
            kind_of(&doc("<body><span class=\"msg\">x</body>")),
            DecodeErrorKind::TruncatedDocument
        );
    }

    #[test]
    fn missing_body_close_is_accepted_when_balanced() {
        let table = table();
        let buffer = decode(format!("{}<body>tail", HEAD).as_bytes(), &table).expect("decode");
        assert_eq!(buffer.text(), "tail");
    }

    #[test]
    fn overlapping_spans_rebuild_both_tags() {
        let table = table();
        let input = doc(
            "<body>a<span class=\"msg\">b<span class=\"err\">c&amp;d</span></span><span class=\"err\">e</span></body>",
        );
        let buffer = decode(input.as_bytes(), &table).expect("decode");
        assert_eq!(buffer.text(), "abc&de");
        assert_eq!(
            runs(&buffer, &table),
            vec![
                ("a".to_string(), vec![]),
                ("b".to_string(), vec!["msg".to_string()]),
                ("c&d".to_string(), vec!["msg".to_string(), "err".to_string()]),
                ("e".to_string(), vec!["err".to_string()]),
            ]
        );
    }

    #[test]
    fn stray_tags_and_self_closed_spans_have_no_effect() {
        let table = table();
        let input = doc("<body>a<br/><b>b</b><span class=\"msg\"/>c<!-- note --></body>");
        let buffer = decode(input.as_bytes(), &table).expect("decode");
        assert_eq!(buffer.text(), "abc");
        assert_eq!(buffer.run_count(), 1);
    }

    #[test]
    fn uppercase_markup_is_accepted() {
        let table = table();
        let input = "<HTML><HEAD><META NAME=\"DreamPie Format\" CONTENT=\"1\"></HEAD>\
<BODY><SPAN CLASS=\"msg\">x</SPAN></BODY></HTML>";
        let buffer = decode(input.as_bytes(), &table).expect("decode");
        assert_eq!(runs(&buffer, &table), vec![("x".to_string(), vec!["msg".to_string()])]);
    }

    #[test]
    fn limits_are_enforced() {
        let table = table();
        let limits = DecodeLimits {
            max_input_bytes: 16,
            ..DecodeLimits::default()
        };
        let err = decode_with_limits(doc("<body></body>").as_bytes(), &table, limits)
            .expect_err("too large");
        assert_eq!(err.kind, DecodeErrorKind::LimitExceeded);

        let limits = DecodeLimits {
            max_span_depth: 1,
            ..DecodeLimits::default()
        };
        let err = decode_with_limits(
            doc("<body><span class=\"msg\"><span class=\"err\">x</span></span></body>").as_bytes(),
            &table,
            limits,
        )
        .expect_err("too deep");
        assert_eq!(err.kind, DecodeErrorKind::LimitExceeded);
        assert_eq!(err.limit.as_deref().map(|l| l.limit), Some(1));
    }

    #[test]
    fn builder_marks_collapse_after_each_insert() {
        let table = table();
        let msg = table.id_of("msg").expect("msg");
        let mut builder = DocumentBuilder::new();
        builder.insert("ab", &[msg]);
        assert_eq!(builder.marks(), (2, 2));
        builder.insert("cd", &[]);
        assert_eq!(builder.marks(), (4, 4));
        let buffer = builder.finish();
        assert_eq!(buffer.tags_at(1), &[msg]);
        assert!(buffer.tags_at(2).is_empty());
    }
}
