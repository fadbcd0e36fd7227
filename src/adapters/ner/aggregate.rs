//! Token-to-entity aggregation
//!
//! Turns per-token class probabilities into spans. Tokens sharing a word
//! index are sub-words of the same word; word-level strategies (`first`,
//! `average`, `max`) pick one label per word before grouping.

use super::traits::RawSpan;
use crate::config::Aggregation;

/// Outside label, never reported
const OUTSIDE: &str = "O";

/// Class probabilities for one (non-special) token
#[derive(Debug, Clone)]
pub struct TokenScores {
    /// Character offsets into the analyzed text
    pub start: usize,
    pub end: usize,
    /// Word index the token belongs to
    pub word: Option<u32>,
    /// Softmax probabilities, indexed by label id
    pub probs: Vec<f32>,
}

/// A labelled unit (token or word) before grouping
#[derive(Debug, Clone)]
struct Labelled<'a> {
    label: &'a str,
    score: f32,
    start: usize,
    end: usize,
}

/// Aggregates token scores into spans, dropping the outside label
pub fn aggregate(tokens: &[TokenScores], labels: &[String], strategy: Aggregation) -> Vec<RawSpan> {
    match strategy {
        Aggregation::None => label_tokens(tokens, labels)
            .into_iter()
            .filter(|t| t.label != OUTSIDE)
            .map(|t| RawSpan::token(t.start, t.end, t.label, t.score))
            .collect(),
        Aggregation::Simple => group(label_tokens(tokens, labels)),
        Aggregation::First | Aggregation::Average | Aggregation::Max => {
            group(label_words(tokens, labels, strategy))
        }
    }
}

/// Index and value of the largest probability
fn argmax(probs: &[f32]) -> Option<(usize, f32)> {
    probs
        .iter()
        .copied()
        .enumerate()
        .fold(None, |best, (idx, p)| match best {
            Some((_, bp)) if bp >= p => best,
            _ => Some((idx, p)),
        })
}

fn label_of<'a>(labels: &'a [String], probs: &[f32]) -> Option<(&'a str, f32)> {
    let (idx, score) = argmax(probs)?;
    labels.get(idx).map(|label| (label.as_str(), score))
}

fn label_tokens<'a>(tokens: &[TokenScores], labels: &'a [String]) -> Vec<Labelled<'a>> {
    tokens
        .iter()
        .filter_map(|t| {
            label_of(labels, &t.probs).map(|(label, score)| Labelled {
                label,
                score,
                start: t.start,
                end: t.end,
            })
        })
        .collect()
}

/// Splits tokens into runs sharing the same word index
fn words(tokens: &[TokenScores]) -> Vec<&[TokenScores]> {
    let mut out = Vec::new();
    let mut begin = 0;
    for idx in 1..=tokens.len() {
        let boundary = idx == tokens.len()
            || tokens[idx].word.is_none()
            || tokens[idx].word != tokens[idx - 1].word;
        if boundary {
            out.push(&tokens[begin..idx]);
            begin = idx;
        }
    }
    out
}

fn label_words<'a>(
    tokens: &[TokenScores],
    labels: &'a [String],
    strategy: Aggregation,
) -> Vec<Labelled<'a>> {
    words(tokens)
        .into_iter()
        .filter_map(|word| {
            let first = word.first()?;
            let last = word.last()?;
            let (label, score) = match strategy {
                Aggregation::First => label_of(labels, &first.probs)?,
                Aggregation::Average => {
                    let width = first.probs.len();
                    let mut mean = vec![0.0f32; width];
                    for token in word {
                        for (acc, p) in mean.iter_mut().zip(&token.probs) {
                            *acc += p;
                        }
                    }
                    let n = word.len() as f32;
                    mean.iter_mut().for_each(|acc| *acc /= n);
                    label_of(labels, &mean)?
                }
                _ => {
                    let best = word.iter().max_by(|a, b| {
                        let pa = argmax(&a.probs).map(|(_, p)| p).unwrap_or(0.0);
                        let pb = argmax(&b.probs).map(|(_, p)| p).unwrap_or(0.0);
                        pa.total_cmp(&pb)
                    })?;
                    label_of(labels, &best.probs)?
                }
            };
            Some(Labelled {
                label,
                score,
                start: first.start,
                end: last.end,
            })
        })
        .collect()
}

/// Splits a label into its BIO prefix and entity tag
fn split_tag(label: &str) -> (&str, &str) {
    if let Some(tag) = label.strip_prefix("B-") {
        ("B", tag)
    } else if let Some(tag) = label.strip_prefix("I-") {
        ("I", tag)
    } else {
        ("I", label)
    }
}

/// Merges consecutive units sharing a tag, a `B-` prefix opening a new group
fn group(units: Vec<Labelled<'_>>) -> Vec<RawSpan> {
    let mut spans = Vec::new();
    let mut current: Vec<Labelled<'_>> = Vec::new();

    for unit in units {
        if let Some(prev) = current.last() {
            let (bi, tag) = split_tag(unit.label);
            let (_, prev_tag) = split_tag(prev.label);
            if tag != prev_tag || bi == "B" {
                spans.extend(close_group(&current));
                current.clear();
            }
        }
        current.push(unit);
    }
    spans.extend(close_group(&current));
    spans
}

fn close_group(units: &[Labelled<'_>]) -> Option<RawSpan> {
    let first = units.first()?;
    let last = units.last()?;
    let (_, tag) = split_tag(first.label);
    if tag == OUTSIDE {
        return None;
    }
    let score = units.iter().map(|u| u.score).sum::<f32>() / units.len() as f32;
    Some(RawSpan::grouped(first.start, last.end, tag, score))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels() -> Vec<String> {
        ["O", "B-PER", "I-PER", "B-LOC", "I-LOC"]
            .into_iter()
            .map(String::from)
            .collect()
    }

    fn token(start: usize, end: usize, word: u32, hot: usize, p: f32) -> TokenScores {
        let mut probs = vec![(1.0 - p) / 4.0; 5];
        probs[hot] = p;
        TokenScores {
            start,
            end,
            word: Some(word),
            probs,
        }
    }

    // "Alan Turing was born in Maida Vale", "Turing" split as "Tur" + "##ing"
    fn sentence() -> Vec<TokenScores> {
        vec![
            token(0, 4, 0, 1, 0.99),
            token(5, 8, 1, 2, 0.98),
            token(8, 11, 1, 0, 0.60),
            token(12, 15, 2, 0, 0.99),
            token(16, 20, 3, 0, 0.99),
            token(21, 23, 4, 0, 0.99),
            token(24, 29, 5, 3, 0.97),
            token(30, 34, 6, 4, 0.95),
        ]
    }

    #[test]
    fn test_no_aggregation_reports_tokens() {
        let spans = aggregate(&sentence(), &labels(), Aggregation::None);
        assert_eq!(spans.len(), 4);
        assert!(spans.iter().all(|s| s.entity_group.is_none()));
        assert_eq!(spans[0].entity.as_deref(), Some("B-PER"));
    }

    #[test]
    fn test_simple_breaks_on_outside_subword() {
        let spans = aggregate(&sentence(), &labels(), Aggregation::Simple);
        let groups: Vec<_> = spans
            .iter()
            .map(|s| (s.entity_group.as_deref().unwrap(), s.start, s.end))
            .collect();
        assert_eq!(groups, vec![("PER", 0, 8), ("LOC", 24, 34)]);
    }

    #[test]
    fn test_max_uses_best_subword() {
        let spans = aggregate(&sentence(), &labels(), Aggregation::Max);
        let groups: Vec<_> = spans
            .iter()
            .map(|s| (s.entity_group.as_deref().unwrap(), s.start, s.end))
            .collect();
        assert_eq!(groups, vec![("PER", 0, 11), ("LOC", 24, 34)]);
        assert!((spans[0].score - 0.985).abs() < 1e-4);
    }

    #[test]
    fn test_first_uses_leading_subword() {
        let spans = aggregate(&sentence(), &labels(), Aggregation::First);
        assert_eq!(spans[0].start, 0);
        assert_eq!(spans[0].end, 11);
    }

    #[test]
    fn test_average_can_flip_word_label() {
        let tokens = vec![
            token(0, 3, 0, 3, 0.55),
            token(3, 6, 0, 0, 0.90),
        ];
        let spans = aggregate(&tokens, &labels(), Aggregation::Average);
        assert!(spans.is_empty());
    }

    #[test]
    fn test_begin_tag_opens_new_group() {
        let tokens = vec![token(0, 4, 0, 1, 0.9), token(5, 9, 1, 1, 0.9)];
        let spans = aggregate(&tokens, &labels(), Aggregation::Simple);
        assert_eq!(spans.len(), 2);
    }

    #[test]
    fn test_empty_input() {
        assert!(aggregate(&[], &labels(), Aggregation::Max).is_empty());
    }
}
