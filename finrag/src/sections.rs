//! Structural section detection.
//!
//! A [`SectionSplitter`] partitions a document's text into ordered,
//! non-overlapping [`Section`]s whose concatenation is the original text.
//! Two strategies are provided:
//!
//! - [`ItemHeaderSplitter`]: numbered `ITEM` / `PART` headers as used in SEC filings
//! - [`WholeTextSplitter`]: no structure; the whole text is one unnamed section

use std::sync::LazyLock;

use regex::Regex;

/// Matches a numbered filing header at the start of a line, e.g. `ITEM 1A.` or `Part II:`.
///
/// Roman numerals are not matched; filings number parts with digits often enough
/// that the digit form is the one that carries the item structure.
static ITEM_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^(?:ITEM|PART)\s+\d+[A-Z]?[.:\s-]+")
        .expect("unreachable error: failed to compile ITEM header pattern")
});

/// A contiguous slice of a document, named after the header that opens it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section<'a> {
    /// Normalized header text (e.g. `ITEM 1A`), or empty for unstructured text.
    pub name: String,
    /// The section text, starting with its header line.
    pub text: &'a str,
}

/// A strategy for detecting section boundaries.
pub trait SectionSplitter: Send + Sync {
    /// Partition `text` into ordered sections.
    ///
    /// Never returns an empty `Vec`; text without structure comes back as a
    /// single unnamed section.
    fn split<'a>(&self, text: &'a str) -> Vec<Section<'a>>;
}

/// Splits on numbered `ITEM` / `PART` headers (case-insensitive, line-anchored).
#[derive(Debug, Clone, Copy, Default)]
pub struct ItemHeaderSplitter;

impl SectionSplitter for ItemHeaderSplitter {
    fn split<'a>(&self, text: &'a str) -> Vec<Section<'a>> {
        let headers: Vec<_> = ITEM_HEADER.find_iter(text).collect();
        let Some(first) = headers.first() else {
            return vec![Section { name: String::new(), text }];
        };

        let mut sections = Vec::with_capacity(headers.len() + 1);
        if first.start() > 0 {
            sections.push(Section { name: String::new(), text: &text[..first.start()] });
        }

        for (i, header) in headers.iter().enumerate() {
            let end = headers.get(i + 1).map_or(text.len(), |next| next.start());
            sections.push(Section {
                name: normalize_header(header.as_str()),
                text: &text[header.start()..end],
            });
        }

        sections
    }
}

/// Treats the whole text as one unnamed section.
#[derive(Debug, Clone, Copy, Default)]
pub struct WholeTextSplitter;

impl SectionSplitter for WholeTextSplitter {
    fn split<'a>(&self, text: &'a str) -> Vec<Section<'a>> {
        vec![Section { name: String::new(), text }]
    }
}

fn normalize_header(raw: &str) -> String {
    raw.trim().trim_end_matches(['.', ':', '-', ' ']).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn concat(sections: &[Section<'_>]) -> String {
        sections.iter().map(|s| s.text).collect()
    }

    #[test]
    fn splits_numbered_items() {
        let text = "ITEM 1. Business\nWe make phones.\nITEM 2. Properties\nWe own buildings.\n";
        let sections = ItemHeaderSplitter.split(text);

        let names: Vec<_> = sections.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["ITEM 1", "ITEM 2"]);
        assert_eq!(sections[0].text, "ITEM 1. Business\nWe make phones.\n");
        assert_eq!(concat(&sections), text);
    }

    #[test]
    fn captures_leading_text_as_unnamed_section() {
        let text = "Cover page\n\nPART 1 - FINANCIAL INFORMATION\nItem 1a: Risk Factors\nRisky.";
        let sections = ItemHeaderSplitter.split(text);

        assert_eq!(sections.len(), 3);
        assert_eq!(sections[0].name, "");
        assert_eq!(sections[0].text, "Cover page\n\n");
        assert_eq!(sections[1].name, "PART 1");
        assert_eq!(sections[2].name, "Item 1a");
        assert_eq!(concat(&sections), text);
    }

    #[test]
    fn header_must_begin_a_line() {
        let text = "See ITEM 7. for details.";
        let sections = ItemHeaderSplitter.split(text);
        assert_eq!(sections, vec![Section { name: String::new(), text }]);
    }

    #[test]
    fn unstructured_text_is_one_section() {
        let sections = ItemHeaderSplitter.split("Just a transcript.");
        assert_eq!(sections.len(), 1);
        assert!(sections[0].name.is_empty());
    }

    #[test]
    fn whole_text_splitter_ignores_headers() {
        let text = "ITEM 1. Business\nITEM 2. Properties";
        assert_eq!(WholeTextSplitter.split(text).len(), 1);
    }
}
