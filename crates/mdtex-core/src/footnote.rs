use std::cell::Cell;
use std::collections::HashMap;

use crate::inline::InlineText;

/// A `#[^label]: text` definition.
#[derive(Clone, Debug, PartialEq)]
pub struct Footnote {
    pub label: String,
    /// 0-based line of the definition.
    pub line: usize,
    pub source: String,
    pub text: InlineText,
    used: Cell<bool>,
}

impl Footnote {
    pub fn new(label: impl Into<String>, line: usize, source: impl Into<String>, text: InlineText) -> Self {
        Self {
            label: label.into(),
            line,
            source: source.into(),
            text,
            used: Cell::new(false),
        }
    }

    pub fn is_used(&self) -> bool {
        self.used.get()
    }

    /// Renderers call this when the footnote body is emitted.
    pub fn mark_used(&self) {
        self.used.set(true);
    }
}

/// Footnote definitions in the order they were inserted, which is source
/// order since the segmenter inserts them as it reads.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FootnoteTable {
    entries: Vec<Footnote>,
    by_label: HashMap<String, usize>,
}

impl FootnoteTable {
    pub fn get(&self, label: &str) -> Option<&Footnote> {
        self.by_label.get(label).map(|&idx| &self.entries[idx])
    }

    pub fn contains(&self, label: &str) -> bool {
        self.by_label.contains_key(label)
    }

    /// Inserts a definition, handing it back if the label is taken.
    pub fn insert(&mut self, footnote: Footnote) -> Result<(), Footnote> {
        if self.by_label.contains_key(&footnote.label) {
            return Err(footnote);
        }
        self.by_label
            .insert(footnote.label.clone(), self.entries.len());
        self.entries.push(footnote);
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Footnote> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn reset_usage(&self) {
        for footnote in &self.entries {
            footnote.used.set(false);
        }
    }

    /// Footnotes never rendered, in source-line order.
    pub fn unused(&self) -> Vec<&Footnote> {
        self.entries
            .iter()
            .filter(|footnote| !footnote.is_used())
            .collect()
    }

    #[cfg(test)]
    pub(crate) fn insert_for_test(&mut self, label: &str) {
        let text = InlineText {
            context: crate::inline::TextContext::Footnote,
            tokens: vec![crate::inline::InlineToken::Normal(label.to_string())],
        };
        let line = self.entries.len();
        let _ = self.insert(Footnote::new(label, line, format!("#[^{}]: {}", label, label), text));
    }
}
