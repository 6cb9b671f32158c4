//! Streaming chat response parsing.
//!
//! The chat endpoint streams many `wrb.fr` frames for one question. Some are
//! intermediate "thinking" steps, some are partial or complete answers; all
//! share one shape and are told apart only by a marker at
//! `payload[0][4][-1]` (1 = answer, anything else = thinking).

use serde_json::Value;

use crate::nav::{self, Step};
use crate::rpc::framing;

/// Candidates must be strictly longer than this (in characters) to qualify.
pub const MIN_CANDIDATE_CHARS: usize = 20;

/// Marker value identifying a final-answer frame.
const ANSWER_MARKER: i64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateKind {
    Answer,
    Thinking,
}

/// One text extracted from a streamed frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub text: String,
    pub kind: CandidateKind,
    /// Order of appearance within the body.
    pub position: usize,
}

impl Candidate {
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Policy for choosing among candidates of one kind.
pub trait AnswerSelector: Send + Sync {
    /// Pick one of `pool`, which is in order of appearance and never empty.
    fn pick<'a>(&self, pool: &[&'a Candidate]) -> Option<&'a Candidate>;
}

/// Longest text wins; ties go to the first seen.
#[derive(Debug, Clone, Copy, Default)]
pub struct LongestWins;

impl AnswerSelector for LongestWins {
    fn pick<'a>(&self, pool: &[&'a Candidate]) -> Option<&'a Candidate> {
        pool.iter().copied().fold(None, |best, c| match best {
            Some(b) if b.char_len() >= c.char_len() => Some(b),
            _ => Some(c),
        })
    }
}

/// The most recently streamed text wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct LatestWins;

impl AnswerSelector for LatestWins {
    fn pick<'a>(&self, pool: &[&'a Candidate]) -> Option<&'a Candidate> {
        pool.last().copied()
    }
}

/// Classify one decoded inner payload.
pub fn candidate_from_payload(payload: &Value) -> Option<(String, CandidateKind)> {
    match nav::get(payload, &[0])? {
        Value::String(text) => Some((text.clone(), CandidateKind::Thinking)),
        first @ Value::Array(_) => {
            let text = nav::str_at(first, &[0])?;
            let marker = nav::get_steps(first, &[Step::At(4), Step::Last]).and_then(Value::as_i64);
            let kind = if marker == Some(ANSWER_MARKER) {
                CandidateKind::Answer
            } else {
                CandidateKind::Thinking
            };
            Some((text.to_string(), kind))
        }
        _ => None,
    }
}

/// Every candidate in a raw chat body, regardless of length.
pub fn collect_candidates(body: &str) -> Vec<Candidate> {
    framing::parse_frames(body)
        .into_iter()
        .filter(|f| f.is_result())
        .filter_map(|f| candidate_from_payload(&f.decoded_payload()))
        .enumerate()
        .map(|(position, (text, kind))| Candidate {
            text,
            kind,
            position,
        })
        .collect()
}

/// Chat body parser with a pluggable selection policy.
pub struct ChatParser {
    selector: Box<dyn AnswerSelector>,
    min_chars: usize,
}

impl Default for ChatParser {
    fn default() -> Self {
        Self::new(Box::new(LongestWins))
    }
}

impl std::fmt::Debug for ChatParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatParser")
            .field("min_chars", &self.min_chars)
            .finish_non_exhaustive()
    }
}

impl ChatParser {
    pub fn new(selector: Box<dyn AnswerSelector>) -> Self {
        Self {
            selector,
            min_chars: MIN_CANDIDATE_CHARS,
        }
    }

    /// Select from already collected candidates.
    ///
    /// Answers beat thinking. When no candidate passes the length threshold
    /// the same rule is applied to all of them, so a short final answer is
    /// still returned. `None` only when there are no candidates at all.
    pub fn select<'a>(&self, candidates: &'a [Candidate]) -> Option<&'a Candidate> {
        let qualifying: Vec<&Candidate> = candidates
            .iter()
            .filter(|c| c.char_len() > self.min_chars)
            .collect();
        if !qualifying.is_empty() {
            return self.by_kind(&qualifying);
        }
        let all: Vec<&Candidate> = candidates.iter().collect();
        self.by_kind(&all)
    }

    fn by_kind<'a>(&self, pool: &[&'a Candidate]) -> Option<&'a Candidate> {
        for kind in [CandidateKind::Answer, CandidateKind::Thinking] {
            let of_kind: Vec<&Candidate> = pool.iter().copied().filter(|c| c.kind == kind).collect();
            if !of_kind.is_empty() {
                return self.selector.pick(&of_kind);
            }
        }
        None
    }

    /// Answer text for a raw chat body; empty when nothing was streamed.
    pub fn parse(&self, body: &str) -> String {
        let candidates = collect_candidates(body);
        self.select(&candidates)
            .map(|c| c.text.clone())
            .unwrap_or_default()
    }
}

/// Parse with the default longest-answer-wins policy.
pub fn parse_answer(body: &str) -> String {
    ChatParser::default().parse(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn frame(text: &str, marker: i64) -> String {
        let inner = json!([[text, null, [], null, [[], null, marker]]]).to_string();
        let chunk = json!([["wrb.fr", null, inner]]).to_string();
        format!("{}\n{}\n", chunk.len(), chunk)
    }

    fn body(frames: &[(&str, i64)]) -> String {
        let mut out = String::from(")]}'\n");
        for (text, marker) in frames {
            out.push_str(&frame(text, *marker));
        }
        out
    }

    #[test]
    fn short_answer_beats_thinking_in_any_order() {
        let items = [("abc", 2), ("hello world", 1), ("abcdefgh", 2)];
        let orders = [[0, 1, 2], [2, 1, 0], [1, 0, 2], [0, 2, 1]];
        for order in orders {
            let frames: Vec<(&str, i64)> = order.iter().map(|&i| items[i]).collect();
            assert_eq!(parse_answer(&body(&frames)), "hello world");
        }
    }

    #[test]
    fn longest_answer_wins_ties_first_seen() {
        let a = "The answer is forty-two, clearly.";
        let b = "The answer is forty-two, surely!!";
        assert_eq!(a.len(), b.len());
        let raw = body(&[(a, 1), ("thinking about the question deeply", 2), (b, 1)]);
        assert_eq!(parse_answer(&raw), a);
    }

    #[test]
    fn thinking_when_no_answer_qualifies() {
        let raw = body(&[
            ("Considering the sources provided...", 2),
            ("Considering the sources provided in detail", 2),
        ]);
        assert_eq!(parse_answer(&raw), "Considering the sources provided in detail");
    }

    #[test]
    fn latest_wins_policy() {
        let raw = body(&[
            ("A much longer complete answer text here", 1),
            ("A shorter final answer text", 1),
        ]);
        let parser = ChatParser::new(Box::new(LatestWins));
        assert_eq!(parser.parse(&raw), "A shorter final answer text");
    }

    #[test]
    fn bare_string_payload_is_thinking() {
        let inner = json!(["just a bare string streamed as thinking"]).to_string();
        let chunk = json!([["wrb.fr", null, inner]]).to_string();
        let candidates = collect_candidates(&chunk);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].kind, CandidateKind::Thinking);
    }

    #[test]
    fn empty_and_garbage_bodies() {
        assert_eq!(parse_answer(""), "");
        assert_eq!(parse_answer(")]}'\n12\nnope\n"), "");
    }
}
