//! Discovered links and their relevance partition.

use serde::{Deserialize, Serialize};

/// A same-origin hyperlink found on a seed page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinkRecord {
    /// Visible anchor text, entity-decoded (may be empty)
    pub label: String,

    /// Absolute URL
    pub url: String,
}

impl LinkRecord {
    /// Create a new link record.
    pub fn new(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            url: url.into(),
        }
    }

    /// Label for display, falling back to the URL when the anchor had no text.
    pub fn display_label(&self) -> &str {
        if self.label.is_empty() {
            &self.url
        } else {
            &self.label
        }
    }
}

/// Relevance bucket assigned by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relevance {
    /// High confidence match for the user's goal
    High,

    /// Possibly relevant
    Mid,

    /// Not ranked by the engine
    Unranked,
}

impl Relevance {
    /// Whether links in this bucket start out selected for extraction.
    pub fn preselected(self) -> bool {
        matches!(self, Self::High)
    }

    /// Short tag for terminal output.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Mid => "mid",
            Self::Unranked => "-",
        }
    }
}

/// Three-way relevance partition of the discovered links.
///
/// `high` and `mid` keep the engine's ranking (most relevant first);
/// `remaining` keeps discovery order. Every discovered link lands in
/// exactly one bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedLinks {
    pub high: Vec<LinkRecord>,
    pub mid: Vec<LinkRecord>,
    pub remaining: Vec<LinkRecord>,
}

impl ClassifiedLinks {
    /// Total number of links across all buckets.
    pub fn len(&self) -> usize {
        self.high.len() + self.mid.len() + self.remaining.len()
    }

    /// True when no links were discovered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All links in display order (high, mid, remaining) with their bucket.
    pub fn ranked(&self) -> impl Iterator<Item = (Relevance, &LinkRecord)> {
        self.high
            .iter()
            .map(|l| (Relevance::High, l))
            .chain(self.mid.iter().map(|l| (Relevance::Mid, l)))
            .chain(self.remaining.iter().map(|l| (Relevance::Unranked, l)))
    }

    /// Links that start out selected, in ranking order.
    pub fn preselected(&self) -> Vec<LinkRecord> {
        self.ranked()
            .filter(|(relevance, _)| relevance.preselected())
            .map(|(_, link)| link.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(n: usize) -> LinkRecord {
        LinkRecord::new(format!("L{n}"), format!("https://a.com/{n}"))
    }

    #[test]
    fn test_ranked_order() {
        let classified = ClassifiedLinks {
            high: vec![link(2)],
            mid: vec![link(0)],
            remaining: vec![link(1), link(3)],
        };

        let order: Vec<_> = classified
            .ranked()
            .map(|(r, l)| (r, l.label.as_str()))
            .collect();

        assert_eq!(
            order,
            vec![
                (Relevance::High, "L2"),
                (Relevance::Mid, "L0"),
                (Relevance::Unranked, "L1"),
                (Relevance::Unranked, "L3"),
            ]
        );
        assert_eq!(classified.len(), 4);
    }

    #[test]
    fn test_only_high_is_preselected() {
        let classified = ClassifiedLinks {
            high: vec![link(5), link(1)],
            mid: vec![link(2)],
            remaining: vec![link(0)],
        };

        let selected = classified.preselected();
        assert_eq!(selected, vec![link(5), link(1)]);
    }

    #[test]
    fn test_display_label_falls_back_to_url() {
        assert_eq!(
            LinkRecord::new("", "https://a.com/x").display_label(),
            "https://a.com/x"
        );
        assert_eq!(
            LinkRecord::new("About", "https://a.com/x").display_label(),
            "About"
        );
    }
}
