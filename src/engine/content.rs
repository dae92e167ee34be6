//! Content helpers
//!
//! PM redaction and @-mention extraction for posts.

use crate::config::Config;

/// Redacts configured substrings from private messages
#[derive(Debug, Clone)]
pub struct WordFilter {
    words: Vec<String>,
    placeholder: String,
}

impl WordFilter {
    pub fn new<I, S>(words: I, placeholder: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            words: words
                .into_iter()
                .map(Into::into)
                .filter(|w: &String| !w.is_empty())
                .collect(),
            placeholder: placeholder.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.filtered_words.iter().cloned(), config.filter_placeholder.clone())
    }

    /// Replace every occurrence of every filtered word, in list order
    pub fn apply(&self, content: &str) -> String {
        self.words
            .iter()
            .fold(content.to_string(), |text, word| text.replace(word.as_str(), &self.placeholder))
    }
}

impl Default for WordFilter {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Usernames tagged with `@` in a post, first occurrence order, no duplicates
///
/// Content is split on spaces; in each word containing `@`, everything after
/// the first `@` is the tagged name.
pub fn mentions(content: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for word in content.split(' ') {
        if let Some(index) = word.find('@') {
            let name = &word[index + 1..];
            if !name.is_empty() && !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
    }
    names
}
