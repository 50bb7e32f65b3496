//! Poem corpus: sections of equal-length lines, with a built-in fallback.

use std::path::Path;

/// CJK punctuation stripped from corpus lines before the length check.
const PUNCTUATION: &[char] = &[
    '，', '。', '、', '！', '？', '：', '；', '《', '》', '（', '）',
    '\u{201C}', '\u{201D}', '\u{2018}', '\u{2019}', '\u{3000}',
];

/// One line of a poem: fixed-length sequence of characters, immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoemLine {
    text: String,
    chars: Vec<char>,
}

impl PoemLine {
    pub fn new(text: &str) -> Self {
        let chars: Vec<char> = text.chars().collect();
        Self {
            text: text.to_string(),
            chars,
        }
    }

    /// Full line text (pronunciation context for the resolver).
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Length in characters, not bytes.
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// Character at position `col`. Panics only on out-of-grid access,
    /// which the generator's position grid rules out.
    pub fn char_at(&self, col: usize) -> char {
        self.chars[col]
    }
}

/// Ordered lines of one poem. Always ≥ 2 lines, all of the corpus line length.
#[derive(Debug, Clone)]
pub struct Section {
    lines: Vec<PoemLine>,
}

impl Section {
    pub fn lines(&self) -> &[PoemLine] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Non-empty set of sections. Falls back to the built-in poems on any load
/// failure so the game is always playable.
#[derive(Debug, Clone)]
pub struct Corpus {
    sections: Vec<Section>,
}

impl Corpus {
    /// Load a corpus file, or the built-in default when `path` is None,
    /// unreadable, or yields no usable section. Never fails.
    pub fn load(path: Option<&Path>, line_len: usize) -> Self {
        let from_file = path
            .and_then(|p| std::fs::read_to_string(p).ok())
            .and_then(|s| Self::parse(&s, line_len));
        from_file.unwrap_or_else(|| Self::builtin(line_len))
    }

    /// Parse corpus text: `#` lines are comments, blank lines split sections,
    /// lines of the wrong length are dropped, sections with < 2 surviving
    /// lines are dropped. Returns None if nothing usable remains.
    pub fn parse(text: &str, line_len: usize) -> Option<Self> {
        let mut sections = Vec::new();
        let mut current: Vec<PoemLine> = Vec::new();
        for raw in text.lines().chain(std::iter::once("")) {
            let line = raw.trim();
            if line.starts_with('#') {
                continue;
            }
            if line.is_empty() {
                if current.len() >= 2 {
                    sections.push(Section {
                        lines: std::mem::take(&mut current),
                    });
                } else {
                    current.clear();
                }
                continue;
            }
            let cleaned: String = line.chars().filter(|c| !PUNCTUATION.contains(c)).collect();
            let poem_line = PoemLine::new(&cleaned);
            if poem_line.len() == line_len {
                current.push(poem_line);
            }
        }
        if sections.is_empty() {
            None
        } else {
            Some(Self { sections })
        }
    }

    /// Compiled-in default: classic five-character children's poems.
    /// Guaranteed non-empty for `line_len == 5`; for other lengths the
    /// filter may reject everything, so we keep a last-resort pair of lines.
    pub fn builtin(line_len: usize) -> Self {
        if let Some(c) = Self::parse(BUILTIN, line_len) {
            return c;
        }
        // Last resort: two synthetic lines of the requested length.
        let filler: String = std::iter::repeat('一').take(line_len.max(1)).collect();
        let lines = vec![PoemLine::new(&filler), PoemLine::new(&filler)];
        Self {
            sections: vec![Section { lines }],
        }
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }
}

/// Built-in poems. 鹅鹅鹅 is deliberately three characters: the length filter
/// drops it and 咏鹅 still survives with its three five-character lines.
const BUILTIN: &str = "\
# 上学歌（改编）
太阳哈哈笑，
背上小书包。
小鸟喳喳叫，
一起上学校。

# 咏鹅　骆宾王
鹅鹅鹅，
曲项向天歌。
白毛浮绿水，
红掌拨清波。

# 静夜思　李白
床前明月光，
疑是地上霜。
举头望明月，
低头思故乡。

# 春晓　孟浩然
春眠不觉晓，
处处闻啼鸟。
夜来风雨声，
花落知多少。

# 悯农　李绅
锄禾日当午，
汗滴禾下土。
谁知盘中餐，
粒粒皆辛苦。

# 登鹳雀楼　王之涣
白日依山尽，
黄河入海流。
欲穷千里目，
更上一层楼。

# 过故人庄　孟浩然
故人具鸡黍，
邀我至田家。
绿树村边合，
青山郭外斜。
开轩面场圃，
把酒话桑麻。
待到重阳日，
还来就菊花。
";
