use lindera_core::mode::Mode;
use lindera_dictionary::{DictionaryConfig, DictionaryKind};
use lindera_tokenizer::tokenizer::{Tokenizer, TokenizerConfig};
use notegrab_common::{NotegrabError, Result};

/// Splits a run of plain text into the words the chain counts over.
pub trait Segmenter {
    fn segment(&self, text: &str) -> Result<Vec<String>>;
}

/// Morphological segmentation with the IPADIC dictionary compiled into the
/// binary. Particles and auxiliaries come out as their own words.
pub struct LinderaSegmenter {
    tokenizer: Tokenizer,
}

impl LinderaSegmenter {
    pub fn new() -> Result<Self> {
        let config = TokenizerConfig {
            dictionary: DictionaryConfig {
                kind: Some(DictionaryKind::IPADIC),
                path: None,
            },
            user_dictionary: None,
            mode: Mode::Normal,
        };
        let tokenizer = Tokenizer::from_config(config)
            .map_err(|e| NotegrabError::Markov(format!("ipadic tokenizer: {e}")))?;
        Ok(Self { tokenizer })
    }
}

impl Segmenter for LinderaSegmenter {
    fn segment(&self, text: &str) -> Result<Vec<String>> {
        let tokens = self
            .tokenizer
            .tokenize(text)
            .map_err(|e| NotegrabError::Markov(format!("tokenize: {e}")))?;
        Ok(tokens.into_iter().map(|t| t.text.to_string()).collect())
    }
}

/// Dictionary-free fallback: consecutive characters of the same script stay
/// together, so `"今日はいい天気"` splits into kanji, kana, and kanji runs
/// and `"hello, world"` into words, punctuation, and spaces. Much coarser
/// than [`LinderaSegmenter`] for Japanese.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptSegmenter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Script {
    Han,
    Hiragana,
    Katakana,
    Word,
    Letter,
    Space,
    /// Never grouped: punctuation, symbols, emoji.
    Other,
}

fn classify(c: char) -> Script {
    match c {
        '\u{3400}'..='\u{4DBF}'
        | '\u{4E00}'..='\u{9FFF}'
        | '\u{F900}'..='\u{FAFF}'
        | '\u{20000}'..='\u{2FA1F}'
        | '々'
        | '〆' => Script::Han,
        '\u{3041}'..='\u{309F}' => Script::Hiragana,
        '\u{30A0}'..='\u{30FF}' | '\u{31F0}'..='\u{31FF}' | '\u{FF66}'..='\u{FF9F}' => {
            Script::Katakana
        }
        c if c.is_ascii_alphanumeric() || c == '_' => Script::Word,
        c if c.is_whitespace() => Script::Space,
        c if c.is_alphanumeric() => Script::Letter,
        _ => Script::Other,
    }
}

impl ScriptSegmenter {
    fn runs<'a>(&self, text: &'a str) -> Vec<&'a str> {
        let mut out = Vec::new();
        let mut start = 0;
        let mut current: Option<Script> = None;
        for (i, c) in text.char_indices() {
            let script = classify(c);
            if let Some(prev) = current {
                if prev != script || script == Script::Other {
                    out.push(&text[start..i]);
                    start = i;
                }
            }
            current = Some(script);
        }
        if start < text.len() {
            out.push(&text[start..]);
        }
        out
    }
}

impl Segmenter for ScriptSegmenter {
    fn segment(&self, text: &str) -> Result<Vec<String>> {
        Ok(self.runs(text).into_iter().map(str::to_string).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(text: &str) -> Vec<String> {
        ScriptSegmenter.segment(text).unwrap()
    }

    #[test]
    fn ipadic_splits_particles_and_auxiliaries() {
        let words = LinderaSegmenter::new().unwrap().segment("今日はいい天気です").unwrap();
        assert_eq!(words, vec!["今日", "は", "いい", "天気", "です"]);
    }

    #[test]
    fn ipadic_segments_cover_the_input() {
        let input = "猫が好きです";
        let words = LinderaSegmenter::new().unwrap().segment(input).unwrap();
        assert_eq!(words.concat(), input);
        assert!(words.len() > 1, "{words:?}");
    }

    #[test]
    fn latin_words_and_spaces() {
        assert_eq!(seg("hello, world"), vec!["hello", ",", " ", "world"]);
    }

    #[test]
    fn script_runs_group_by_character_class() {
        // coarse: the particle stays glued to the following kana
        assert_eq!(seg("今日はいい天気"), vec!["今日", "はいい", "天気"]);
        assert_eq!(seg("コーヒー飲む"), vec!["コーヒー", "飲", "む"]);
    }

    #[test]
    fn punctuation_is_never_grouped() {
        assert_eq!(seg("!!"), vec!["!", "!"]);
    }

    #[test]
    fn segments_concatenate_to_input() {
        let input = "mixed 日本語 text\nwith ✨ emoji ✨!";
        assert_eq!(seg(input).concat(), input);
    }

    #[test]
    fn empty_input() {
        assert!(seg("").is_empty());
    }
}
