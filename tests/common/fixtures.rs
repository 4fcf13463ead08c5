use dreampie_history::{BaseStyle, Color, StyleConfig, StyledBuffer, Tag, TagId, TagTable};

pub const SESSION_FIXTURE: &str = "tests/fixtures/session.html";

/// Style configuration the session fixture was written with.
pub fn session_config() -> StyleConfig {
    let base = BaseStyle::new(
        "DejaVu Sans Mono",
        10,
        Color::rgb(0x00, 0x00, 0x00),
        Color::rgb(0xff, 0xff, 0xff),
    )
    .expect("base style");
    let tags = TagTable::from_tags([
        Tag::new("message", 0).with_foreground(Color::rgb(0x00, 0x80, 0x00)),
        Tag::new("stdout", 1),
        Tag::new("stdin", 2).with_foreground(Color::rgb(0x00, 0x00, 0xff)),
        Tag::new("stderr", 3).with_foreground(Color::rgb(0xff, 0x00, 0x00)),
        Tag::new("folded", 4).with_invisible(true),
    ])
    .expect("tag table");
    StyleConfig::new(base, tags)
}

pub fn tag(config: &StyleConfig, name: &str) -> TagId {
    config
        .tags
        .id_of(name)
        .unwrap_or_else(|| panic!("unknown tag {}", name))
}

/// `(text, tag names)` per run, tag names in id order.
pub fn named_runs(buffer: &StyledBuffer, table: &TagTable) -> Vec<(String, Vec<String>)> {
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

/// Deterministic generator for synthetic transcripts.
pub struct Lcg(u64);

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Self(seed)
    }

    pub fn next_u32(&mut self) -> u32 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.0 >> 33) as u32
    }

    pub fn below(&mut self, n: u32) -> u32 {
        self.next_u32() % n
    }
}

/// Random transcript over every tag in `table`, including awkward text.
pub fn random_transcript(rng: &mut Lcg, table: &TagTable, segments: usize) -> StyledBuffer {
    const PIECES: &[&str] = &["a", "<", ">", "&", "&amp;", "é", "\n", " ", ">>> ", "\"q\"", "日本"];
    let ids: Vec<TagId> = table.iter().map(|(id, _)| id).collect();
    let mut buffer = StyledBuffer::new();
    for _ in 0..segments {
        let mut text = String::new();
        for _ in 0..=rng.below(4) {
            text.push_str(PIECES[rng.below(PIECES.len() as u32) as usize]);
        }
        let mask = rng.below(1 << ids.len());
        let tags: Vec<TagId> = ids
            .iter()
            .enumerate()
            .filter(|(bit, _)| mask & (1 << bit) != 0)
            .map(|(_, &id)| id)
            .collect();
        buffer.push_tagged(&text, &tags);
    }
    buffer
}
