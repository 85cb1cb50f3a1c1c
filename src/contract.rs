//! The report contract: which sections a report must carry and what shape
//! each one takes.
//!
//! The same contract drives two things. The prompt builder turns it into the
//! output constraints block shown to the model, and the validator checks the
//! model's answer against it. Renaming a heading here therefore changes what
//! is asked for and what is accepted in one move.

/// Shape requirements for one report section.
#[derive(Debug, Clone, PartialEq)]
pub struct HeadingSpec {
    /// Exact heading text, matched verbatim against `## ` lines.
    pub title: String,
    /// Whether a pipe table with at least one data row must appear under it.
    pub requires_table: bool,
    /// Whether this section's first paragraph becomes the report lead.
    pub is_summary: bool,
    /// Expected table columns, in order. Empty unless `requires_table`.
    pub table_columns: Vec<String>,
}

impl HeadingSpec {
    /// A prose-only section.
    pub fn plain(title: &str) -> Self {
        Self {
            title: title.to_string(),
            requires_table: false,
            is_summary: false,
            table_columns: Vec::new(),
        }
    }

    /// The summary section the lead paragraph is lifted from.
    pub fn summary(title: &str) -> Self {
        Self {
            is_summary: true,
            ..Self::plain(title)
        }
    }

    /// A section that must carry a table with the given columns.
    pub fn with_table(title: &str, columns: &[&str]) -> Self {
        Self {
            requires_table: true,
            table_columns: columns.iter().map(|c| c.to_string()).collect(),
            ..Self::plain(title)
        }
    }
}

/// The ordered set of sections a conforming report must contain, each exactly
/// once. Headings may arrive in any order; output is always rendered in this
/// order.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportContract {
    pub headings: Vec<HeadingSpec>,
}

impl ReportContract {
    /// The weekly space-industry report layout.
    pub fn standard() -> Self {
        Self {
            headings: vec![
                HeadingSpec::summary("Executive Summary"),
                HeadingSpec::plain("Policy & Regulation"),
                HeadingSpec::plain("Research Highlights"),
                HeadingSpec::plain("Business & Markets"),
                HeadingSpec::with_table(
                    "Funding Rounds",
                    &["Company", "Round", "Amount", "Lead Investor"],
                ),
                HeadingSpec::with_table("Key Events", &["Date", "Event", "Why It Matters"]),
                HeadingSpec::plain("Outlook"),
            ],
        }
    }

    /// The section whose first paragraph becomes the report lead, if the
    /// contract has one.
    pub fn summary_heading(&self) -> Option<&HeadingSpec> {
        self.headings.iter().find(|h| h.is_summary)
    }

    /// Look up a heading spec by its exact title.
    pub fn find(&self, title: &str) -> Option<&HeadingSpec> {
        self.headings.iter().find(|h| h.title == title)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_contract_has_seven_sections() {
        let contract = ReportContract::standard();
        assert_eq!(contract.headings.len(), 7);
    }

    #[test]
    fn test_standard_contract_has_one_summary_first() {
        let contract = ReportContract::standard();
        let summaries: Vec<_> = contract.headings.iter().filter(|h| h.is_summary).collect();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].title, "Executive Summary");
        assert!(contract.headings[0].is_summary);
    }

    #[test]
    fn test_table_sections_declare_their_columns() {
        let contract = ReportContract::standard();
        for heading in &contract.headings {
            if heading.requires_table {
                assert!(
                    !heading.table_columns.is_empty(),
                    "{} requires a table but names no columns",
                    heading.title
                );
            } else {
                assert!(heading.table_columns.is_empty());
            }
        }
    }

    #[test]
    fn test_find_is_exact_match() {
        let contract = ReportContract::standard();
        assert!(contract.find("Key Events").is_some());
        assert!(contract.find("Events").is_none());
        assert!(contract.find("key events").is_none());
    }
}
