use crate::mfm::{MfmLexer, MfmToken};
use crate::model::{FunctionParamValue, MarkovData, MarkovToken};
use crate::segment::{LinderaSegmenter, Segmenter};
use notegrab_common::Result;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

#[derive(Deserialize)]
struct NoteText {
    #[serde(default)]
    text: Option<String>,
}

/// Texts of the notes in a collected notes file. Notes without text
/// (renotes, file-only posts) are skipped.
pub fn load_note_texts(path: &Path) -> Result<Vec<String>> {
    let bytes = std::fs::read(path)?;
    let notes: Vec<NoteText> = serde_json::from_slice(&bytes)?;
    Ok(notes.into_iter().filter_map(|n| n.text).collect())
}

type FunctionCall = (String, Vec<(String, Option<String>)>);

/// Accumulates transition and parameter counts note by note.
pub struct Trainer<G = LinderaSegmenter> {
    lexer: MfmLexer,
    segmenter: G,
    transitions: HashMap<(MarkovToken, MarkovToken), usize>,
    calls: Vec<FunctionCall>,
    notes: usize,
}

impl Trainer<LinderaSegmenter> {
    pub fn new() -> Result<Self> {
        Self::with_segmenter(LinderaSegmenter::new()?)
    }
}

impl<G: Segmenter> Trainer<G> {
    pub fn with_segmenter(segmenter: G) -> Result<Self> {
        Ok(Self {
            lexer: MfmLexer::new()?,
            segmenter,
            transitions: HashMap::new(),
            calls: Vec::new(),
            notes: 0,
        })
    }

    pub fn feed(&mut self, text: &str) -> Result<()> {
        let mut prev = MarkovToken::Start;
        let mut stack: Vec<String> = Vec::new();

        for token in self.lexer.tokenize(text) {
            match token {
                MfmToken::Emoji(emoji) => {
                    let next = MarkovToken::String(emoji);
                    self.count(&prev, &next);
                    prev = next;
                }
                MfmToken::FunctionOpen { name, args, .. } => {
                    self.count(&prev, &MarkovToken::Function(name.clone()));
                    prev = MarkovToken::FunctionStart(name.clone());
                    stack.push(name.clone());
                    self.calls.push((name, args));
                }
                MfmToken::FunctionClose => {
                    // balanced by the lexer
                    let Some(name) = stack.pop() else { continue };
                    self.count(&prev, &MarkovToken::End);
                    prev = MarkovToken::Function(name);
                }
                MfmToken::Text(text) => {
                    for word in self.segmenter.segment(&text)? {
                        let next = MarkovToken::String(word);
                        self.count(&prev, &next);
                        prev = next;
                    }
                }
            }
        }
        self.count(&prev, &MarkovToken::End);
        self.notes += 1;
        Ok(())
    }

    fn count(&mut self, prev: &MarkovToken, next: &MarkovToken) {
        *self
            .transitions
            .entry((prev.clone(), next.clone()))
            .or_default() += 1;
    }

    pub fn notes_seen(&self) -> usize {
        self.notes
    }

    /// Entries come out sorted so the same corpus always yields the same file.
    pub fn finish(self) -> MarkovData {
        let mut token_map: Vec<_> = self
            .transitions
            .into_iter()
            .map(|((prev, next), n)| (prev, next, n))
            .collect();
        token_map.sort();

        let mut uses: HashMap<String, usize> = HashMap::new();
        for (name, _) in &self.calls {
            *uses.entry(name.clone()).or_default() += 1;
        }

        let mut params: HashMap<(String, String, FunctionParamValue), usize> = HashMap::new();
        for (name, args) in self.calls {
            let used = uses.get(&name).copied().unwrap_or_default();
            for (key, value) in args {
                let absent = params
                    .entry((name.clone(), key.clone(), FunctionParamValue::None))
                    .or_insert(used);
                *absent = absent.saturating_sub(1);

                let value = match value {
                    Some(v) => FunctionParamValue::Value(v),
                    None => FunctionParamValue::ValueIsNull,
                };
                *params.entry((name.clone(), key, value)).or_default() += 1;
            }
        }
        let mut function_param_map: Vec<_> = params
            .into_iter()
            .map(|((name, key, value), n)| (name, key, value, n))
            .collect();
        function_param_map.sort();

        tracing::info!(
            target: "markov",
            notes = self.notes,
            transitions = token_map.len(),
            params = function_param_map.len(),
            "markov.trained"
        );
        MarkovData {
            token_map,
            function_param_map,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::ScriptSegmenter;
    use MarkovToken::*;

    fn script_trainer() -> Trainer<ScriptSegmenter> {
        Trainer::with_segmenter(ScriptSegmenter).unwrap()
    }

    fn s(v: &str) -> MarkovToken {
        String(v.into())
    }

    fn count(data: &MarkovData, prev: &MarkovToken, next: &MarkovToken) -> usize {
        data.token_map
            .iter()
            .find(|(p, n, _)| p == prev && n == next)
            .map_or(0, |(_, _, c)| *c)
    }

    #[test]
    fn plain_notes_share_prefix_counts() {
        let mut t = script_trainer();
        t.feed("a b").unwrap();
        t.feed("a c").unwrap();
        let data = t.finish();

        assert_eq!(count(&data, &Start, &s("a")), 2);
        assert_eq!(count(&data, &s("a"), &s(" ")), 2);
        assert_eq!(count(&data, &s(" "), &s("b")), 1);
        assert_eq!(count(&data, &s(" "), &s("c")), 1);
        assert_eq!(count(&data, &s("b"), &End), 1);
        assert_eq!(count(&data, &s("c"), &End), 1);
        assert_eq!(data.token_map.len(), 5);
    }

    #[test]
    fn function_blocks_enter_and_leave() {
        let mut t = script_trainer();
        t.feed("$[x2 big] end").unwrap();
        let data = t.finish();

        assert_eq!(count(&data, &Start, &Function("x2".into())), 1);
        assert_eq!(count(&data, &FunctionStart("x2".into()), &s("big")), 1);
        assert_eq!(count(&data, &s("big"), &End), 1);
        assert_eq!(count(&data, &Function("x2".into()), &s(" ")), 1);
        assert_eq!(count(&data, &s("end"), &End), 1);
    }

    #[test]
    fn emoji_is_one_token() {
        let mut t = script_trainer();
        t.feed(":blobcat:").unwrap();
        let data = t.finish();
        assert_eq!(count(&data, &Start, &s(":blobcat:")), 1);
        assert_eq!(count(&data, &s(":blobcat:"), &End), 1);
    }

    #[test]
    fn empty_note_counts_start_to_end() {
        let mut t = script_trainer();
        t.feed("").unwrap();
        assert_eq!(t.notes_seen(), 1);
        assert_eq!(count(&t.finish(), &Start, &End), 1);
    }

    #[test]
    fn parameter_counts_track_absence() {
        let mut t = script_trainer();
        t.feed("$[spin.speed=2s,left a]").unwrap();
        t.feed("$[spin.speed=2s b]").unwrap();
        t.feed("$[spin c]").unwrap();
        let params = t.finish().function_param_map;

        let get = |key: &str, value: FunctionParamValue| {
            params
                .iter()
                .find(|(n, k, v, _)| n == "spin" && k == key && *v == value)
                .map(|(_, _, _, c)| *c)
        };
        // three uses; speed given twice, left once
        assert_eq!(get("speed", FunctionParamValue::None), Some(1));
        assert_eq!(get("speed", FunctionParamValue::Value("2s".into())), Some(2));
        assert_eq!(get("left", FunctionParamValue::None), Some(2));
        assert_eq!(get("left", FunctionParamValue::ValueIsNull), Some(1));
        assert_eq!(params.len(), 4);
    }

    #[test]
    fn japanese_notes_are_counted_per_morpheme() {
        let mut t = Trainer::new().unwrap();
        t.feed("今日はいい天気です").unwrap();
        let data = t.finish();

        assert_eq!(count(&data, &Start, &s("今日")), 1);
        assert_eq!(count(&data, &s("今日"), &s("は")), 1);
        assert_eq!(count(&data, &s("は"), &s("いい")), 1);
        assert_eq!(count(&data, &s("いい"), &s("天気")), 1);
        assert_eq!(count(&data, &s("天気"), &s("です")), 1);
        assert_eq!(count(&data, &s("です"), &End), 1);
        assert_eq!(data.token_map.len(), 6);
    }

    #[test]
    fn load_skips_notes_without_text() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("all_notes.json");
        std::fs::write(
            &path,
            r#"[{"id":"1","text":"hi"},{"id":"2","text":null},{"id":"3"},{"id":"4","text":"yo"}]"#,
        )
        .unwrap();
        assert_eq!(load_note_texts(&path).unwrap(), vec!["hi", "yo"]);
    }
}
