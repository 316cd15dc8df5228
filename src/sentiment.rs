// Lexicon-based sentiment classification for scraped comments
//
// Compact rule-based scorer in the VADER family: valence lexicon plus
// negation flipping and booster scaling, with the slang overrides tuned for
// comment-section language ("mid", "goated", "fire" carry more signal here
// than dictionary words do). Pure function of the text, no model files.

use std::collections::HashMap;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl std::fmt::Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Positive => write!(f, "Positive"),
            Self::Negative => write!(f, "Negative"),
            Self::Neutral => write!(f, "Neutral"),
        }
    }
}

lazy_static! {
    static ref LEXICON: HashMap<&'static str, f32> = {
        let mut lex = HashMap::new();
        // Core valence words
        for (word, score) in [
            ("good", 1.9),
            ("great", 3.1),
            ("love", 3.2),
            ("loved", 2.9),
            ("awesome", 3.1),
            ("amazing", 2.8),
            ("best", 3.2),
            ("beautiful", 2.9),
            ("perfect", 2.7),
            ("nice", 1.8),
            ("win", 2.8),
            ("congrats", 2.4),
            ("congratulations", 2.9),
            ("happy", 2.7),
            ("wow", 2.8),
            ("insane", 1.7),
            ("bad", -2.5),
            ("awful", -2.0),
            ("terrible", -2.1),
            ("hate", -2.7),
            ("worst", -3.1),
            ("horrible", -2.5),
            ("ugly", -2.6),
            ("boring", -1.3),
            ("disappointing", -2.2),
            ("disgusting", -2.9),
            ("pathetic", -2.6),
            ("lost", -1.3),
            ("lose", -1.6),
        ] {
            lex.insert(word, score);
        }
        // Modern slang overrides - dictionary scoring inverts several of
        // these ("fire", "mid", "w")
        for (word, score) in [
            ("fire", 3.5),
            ("lit", 3.0),
            ("based", 3.0),
            ("goated", 3.5),
            ("w", 2.0),
            ("banger", 3.0),
            ("peak", 3.0),
            ("heart", 2.5),
            ("robbery", -3.0),
            ("scam", -3.5),
            ("trash", -3.0),
            ("mid", -2.0),
            ("l", -2.0),
            ("cringe", -2.5),
            ("clown", -2.0),
            ("fraud", -3.0),
            ("rip", -1.5),
        ] {
            lex.insert(word, score);
        }
        lex
    };
}

const NEGATORS: [&str; 8] = [
    "not", "no", "never", "isnt", "dont", "cant", "wont", "aint",
];

const BOOSTERS: [&str; 6] = ["very", "so", "really", "extremely", "totally", "absolutely"];

const BOOST_FACTOR: f32 = 1.3;
const NEGATION_FACTOR: f32 = -0.74;
const THRESHOLD: f32 = 0.05;

fn normalize_token(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_alphanumeric())
        .collect::<String>()
        .to_lowercase()
}

/// Classify one comment.
///
/// Compound score is the normalized sum of hit valences,
/// `s / sqrt(s^2 + 15)`, thresholded at +/-0.05 like the reference
/// analyzer.
pub fn classify(text: &str) -> Sentiment {
    let tokens: Vec<String> = text.split_whitespace().map(normalize_token).collect();

    let mut sum = 0.0f32;
    for (i, token) in tokens.iter().enumerate() {
        let Some(&valence) = LEXICON.get(token.as_str()) else {
            continue;
        };
        let mut valence = valence;

        // One-token lookback for negation and boosting.
        if i > 0 {
            let prev = tokens[i - 1].as_str();
            if NEGATORS.contains(&prev) {
                valence *= NEGATION_FACTOR;
            } else if BOOSTERS.contains(&prev) {
                valence *= BOOST_FACTOR;
            }
        }
        sum += valence;
    }

    let compound = sum / (sum * sum + 15.0).sqrt();
    if compound >= THRESHOLD {
        Sentiment::Positive
    } else if compound <= -THRESHOLD {
        Sentiment::Negative
    } else {
        Sentiment::Neutral
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positive_dictionary_words() {
        assert_eq!(classify("This is a great post, love it"), Sentiment::Positive);
    }

    #[test]
    fn test_negative_dictionary_words() {
        assert_eq!(classify("the worst thing I have ever seen"), Sentiment::Negative);
    }

    #[test]
    fn test_slang_overrides() {
        assert_eq!(classify("this edit is FIRE"), Sentiment::Positive);
        assert_eq!(classify("nah that album was mid"), Sentiment::Negative);
        assert_eq!(classify("what a scam"), Sentiment::Negative);
        assert_eq!(classify("goated performance"), Sentiment::Positive);
    }

    #[test]
    fn test_negation_flips_valence() {
        assert_eq!(classify("not good at all"), Sentiment::Negative);
        assert_eq!(classify("never boring"), Sentiment::Positive);
    }

    #[test]
    fn test_booster_amplifies() {
        // Both positive; the boosted one must not flip anything.
        assert_eq!(classify("so good"), Sentiment::Positive);
    }

    #[test]
    fn test_neutral_text() {
        assert_eq!(classify("posted on tuesday"), Sentiment::Neutral);
        assert_eq!(classify(""), Sentiment::Neutral);
    }

    #[test]
    fn test_punctuation_stripped() {
        assert_eq!(classify("fire!!!"), Sentiment::Positive);
        assert_eq!(classify("trash."), Sentiment::Negative);
    }
}
