//! Multi-pronunciation lookup and the speech-output seam.

/// Heteronym exceptions: (full line text, written character, spoken stand-in).
/// The stand-in is a homophone of the reading the line requires, so a naive
/// text-to-speech collaborator says the right thing.
const EXCEPTIONS: &[(&str, char, char)] = &[
    ("曲项向天歌", '曲', '区'), // qū, not qǔ
    ("背上小书包", '背', '杯'), // bēi (to carry), not bèi
    ("待到重阳日", '重', '虫'), // chóng, not zhòng
    ("还来就菊花", '还', '环'), // huán, not hái
];

/// Character actually spoken for `ch` in the context of `line_text`.
/// Identity unless the pair is a known heteronym exception.
pub fn resolve(line_text: &str, ch: char) -> char {
    EXCEPTIONS
        .iter()
        .find(|&&(line, written, _)| line == line_text && written == ch)
        .map_or(ch, |&(_, _, spoken)| spoken)
}

/// Speech collaborator. The core hands it the resolved utterance and never
/// produces audio itself.
pub trait Speaker {
    fn say(&mut self, text: &str);
}

/// Records the last utterance for the status line; the terminal front end
/// has no audio path, a real TTS backend would implement [`Speaker`] instead.
#[derive(Debug, Default)]
pub struct StatusSpeaker {
    last: Option<String>,
}

impl StatusSpeaker {
    pub fn last_utterance(&self) -> Option<&str> {
        self.last.as_deref()
    }
}

impl Speaker for StatusSpeaker {
    fn say(&mut self, text: &str) {
        self.last = Some(text.to_string());
    }
}
