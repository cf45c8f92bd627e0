use crate::model::{FunctionParamValue, MarkovData, MarkovToken};
use rand::Rng;
use rand::seq::SliceRandom;
use std::collections::BTreeMap;

type ParamTable = BTreeMap<String, BTreeMap<String, Vec<(FunctionParamValue, usize)>>>;

/// Weighted walk over a trained model.
pub struct Simulator {
    transitions: BTreeMap<(MarkovToken, MarkovToken), usize>,
    params: ParamTable,
}

impl Simulator {
    pub fn new(data: MarkovData) -> Self {
        let mut transitions = BTreeMap::new();
        for (prev, next, n) in data.token_map {
            *transitions.entry((prev, next)).or_default() += n;
        }
        let mut params: ParamTable = BTreeMap::new();
        for (name, key, value, n) in data.function_param_map {
            params
                .entry(name)
                .or_default()
                .entry(key)
                .or_default()
                .push((value, n));
        }
        Self {
            transitions,
            params,
        }
    }

    /// One note. `max_depth` bounds `$[...]` nesting.
    pub fn generate<R: Rng + ?Sized>(&self, max_depth: usize, rng: &mut R) -> String {
        self.walk(MarkovToken::Start, max_depth, rng)
    }

    fn walk<R: Rng + ?Sized>(&self, first: MarkovToken, depth: usize, rng: &mut R) -> String {
        let mut out = String::new();
        let mut current = first;
        loop {
            let candidates: Vec<(&MarkovToken, usize)> = self
                .transitions
                .range((current.clone(), MarkovToken::Start)..)
                .take_while(|((prev, _), _)| *prev == current)
                .map(|((_, next), n)| (next, *n))
                .filter(|(next, _)| depth > 0 || !matches!(next, MarkovToken::Function(_)))
                .collect();
            let Ok(&(next, _)) = candidates.choose_weighted(rng, |(_, n)| *n) else {
                return out;
            };
            tracing::trace!(target: "markov", ?current, ?next, "markov.step");

            match next {
                MarkovToken::String(s) => out.push_str(s),
                MarkovToken::Function(name) => {
                    out.push_str("$[");
                    out.push_str(name);
                    let params = self.render_params(name, rng);
                    if !params.is_empty() {
                        out.push('.');
                        out.push_str(&params);
                    }
                    out.push(' ');
                    out.push_str(&self.walk(
                        MarkovToken::FunctionStart(name.clone()),
                        depth - 1,
                        rng,
                    ));
                    out.push(']');
                }
                MarkovToken::End => return out,
                // never recorded as a successor
                MarkovToken::Start | MarkovToken::FunctionStart(_) => return out,
            }
            current = next.clone();
        }
    }

    fn render_params<R: Rng + ?Sized>(&self, function: &str, rng: &mut R) -> String {
        let Some(keys) = self.params.get(function) else {
            return String::new();
        };
        keys.iter()
            .filter_map(|(key, values)| {
                let (value, _) = values.choose_weighted(rng, |(_, n)| *n).ok()?;
                match value {
                    FunctionParamValue::None => None,
                    FunctionParamValue::ValueIsNull => Some(key.clone()),
                    FunctionParamValue::Value(v) => Some(format!("{key}={v}")),
                }
            })
            .collect::<Vec<_>>()
            .join(",")
    }
}
