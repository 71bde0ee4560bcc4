// Text preprocessing for feedback records
// Lowercasing, URL/HTML/punctuation removal and optional stemming

use once_cell::sync::Lazy;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use unicode_segmentation::UnicodeSegmentation;

use crate::error::{AnalyzerError, Result};

// Constants for validation
const MAX_INPUT_LENGTH: usize = 1_048_576; // 1MB

static URL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"http\S+|www\.\S+").expect("valid URL pattern"));

static HTML_TAG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid HTML tag pattern"));

static HTML_ENTITIES: &[(&str, &str)] = &[
    ("&nbsp;", " "),
    ("&amp;", "&"),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&#39;", "'"),
];

/// Normalizes raw feedback into clean text
#[derive(Debug, Clone, Copy, Default)]
pub struct TextPreprocessor {
    lemmatize: bool,
}

impl TextPreprocessor {
    pub fn new(lemmatize: bool) -> Self {
        Self { lemmatize }
    }

    pub fn lemmatize(&self) -> bool {
        self.lemmatize
    }

    /// Clean one raw entry
    ///
    /// Returns a `Validation` error when nothing is left after cleaning.
    pub fn clean(&self, raw: &str) -> Result<String> {
        if raw.len() > MAX_INPUT_LENGTH {
            return Err(AnalyzerError::validation(format!(
                "feedback exceeds {} bytes",
                MAX_INPUT_LENGTH
            )));
        }

        let text = raw.to_lowercase();
        let text = URL_PATTERN.replace_all(&text, " ");
        let text = strip_html(&text);
        let text = remove_punctuation(&text);
        // Punctuation removal can glue a new URL-looking token together
        let text = drop_url_tokens(&text);

        let text = if self.lemmatize {
            stem_words(&text)
        } else {
            text
        };

        if text.is_empty() {
            return Err(AnalyzerError::validation(
                "feedback is empty after cleaning",
            ));
        }
        Ok(text)
    }
}

/// Clean with default options
pub fn clean_text(raw: &str) -> Result<String> {
    TextPreprocessor::default().clean(raw)
}

fn strip_html(text: &str) -> String {
    let mut stripped = HTML_TAG_PATTERN.replace_all(text, " ").into_owned();
    for (entity, replacement) in HTML_ENTITIES {
        stripped = stripped.replace(entity, replacement);
    }
    stripped
}

/// Keep alphanumerics and whitespace, collapsing runs of whitespace
///
/// Uppercase letters that survived lowercasing (no lowercase form, e.g.
/// U+03D2) are dropped as well.
fn remove_punctuation(text: &str) -> String {
    text.chars()
        .filter(|c| (c.is_alphanumeric() && !c.is_uppercase()) || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn drop_url_tokens(text: &str) -> String {
    text.split(' ')
        .filter(|token| !token.is_empty() && !URL_PATTERN.is_match(token))
        .collect::<Vec<_>>()
        .join(" ")
}

fn stem_words(text: &str) -> String {
    let stemmer = Stemmer::create(Algorithm::English);
    text.unicode_words()
        .map(|word| stemmer.stem(word).into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}
