//! Just enough of MFM to keep custom emoji and `$[fn ...]` blocks intact.
//!
//! Everything else (bold, links, mentions) is treated as plain text.

use notegrab_common::{NotegrabError, Result};
use regex::Regex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MfmToken {
    /// `:name:` including the colons.
    Emoji(String),
    FunctionOpen {
        /// Exact matched text, e.g. `"$[spin.speed=2s "`.
        source: String,
        name: String,
        args: Vec<(String, Option<String>)>,
    },
    FunctionClose,
    Text(String),
}

pub struct MfmLexer {
    emoji: Regex,
    function_open: Regex,
    param: Regex,
}

impl MfmLexer {
    pub fn new() -> Result<Self> {
        Ok(Self {
            emoji: compile(r"^:[a-zA-Z0-9_]+:")?,
            function_open: compile(
                r"^\$\[(?P<name>[a-zA-Z0-9]+)(?:\.(?P<params>[a-zA-Z0-9]+(?:=[a-zA-Z0-9\-.]+)?(?:,[a-zA-Z0-9]+(?:=[a-zA-Z0-9\-.]+)?)*))?\s",
            )?,
            param: compile(r"(?P<key>[a-zA-Z0-9]+)(?:=(?P<value>[a-zA-Z0-9\-.]+))?")?,
        })
    }

    /// Lex, drop unbalanced brackets back to text, and merge text runs.
    pub fn tokenize(&self, text: &str) -> Vec<MfmToken> {
        let mut tokens = self.scan(text);
        demote_unmatched_closes(&mut tokens);
        demote_unmatched_opens(&mut tokens);
        merge_text(tokens)
    }

    /// Raw scan. Every `]` becomes a close and every opener an open,
    /// whether or not they pair up.
    fn scan(&self, text: &str) -> Vec<MfmToken> {
        let mut out = Vec::new();
        let mut pos = 0;
        while let Some(ch) = text[pos..].chars().next() {
            let rest = &text[pos..];
            if let Some(m) = self.emoji.find(rest) {
                out.push(MfmToken::Emoji(m.as_str().to_string()));
                pos += m.end();
                continue;
            }
            if let Some(caps) = self.function_open.captures(rest) {
                let whole = &caps[0];
                let args = caps
                    .name("params")
                    .map(|p| {
                        self.param
                            .captures_iter(p.as_str())
                            .map(|c| {
                                (
                                    c["key"].to_string(),
                                    c.name("value").map(|v| v.as_str().to_string()),
                                )
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                out.push(MfmToken::FunctionOpen {
                    source: whole.to_string(),
                    name: caps["name"].to_string(),
                    args,
                });
                pos += whole.len();
                continue;
            }
            out.push(if ch == ']' {
                MfmToken::FunctionClose
            } else {
                MfmToken::Text(ch.to_string())
            });
            pos += ch.len_utf8();
        }
        out
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| NotegrabError::Markov(format!("mfm pattern: {e}")))
}

fn demote_unmatched_closes(tokens: &mut [MfmToken]) {
    let mut open = 0usize;
    for token in tokens.iter_mut() {
        match token {
            MfmToken::FunctionOpen { .. } => open += 1,
            MfmToken::FunctionClose if open == 0 => *token = MfmToken::Text("]".into()),
            MfmToken::FunctionClose => open -= 1,
            _ => {}
        }
    }
}

fn demote_unmatched_opens(tokens: &mut [MfmToken]) {
    let mut close = 0usize;
    for token in tokens.iter_mut().rev() {
        match token {
            MfmToken::FunctionClose => close += 1,
            MfmToken::FunctionOpen { source, .. } if close == 0 => {
                *token = MfmToken::Text(std::mem::take(source));
            }
            MfmToken::FunctionOpen { .. } => close -= 1,
            _ => {}
        }
    }
}

fn merge_text(tokens: Vec<MfmToken>) -> Vec<MfmToken> {
    let mut out: Vec<MfmToken> = Vec::with_capacity(tokens.len());
    for token in tokens {
        if let (Some(MfmToken::Text(prev)), MfmToken::Text(next)) = (out.last_mut(), &token) {
            prev.push_str(next);
            continue;
        }
        out.push(token);
    }
    out
}
