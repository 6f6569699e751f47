//! Resource designations and categories

use serde::{Deserialize, Serialize};

/// Recognised resource designations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Designation {
    Partner,
    Director,
    SeniorManager,
    Manager,
    SeniorConsultant,
    Consultant,
    Analyst,
    Architect,
    Developer,
    Tester,
}

impl Designation {
    /// Get all designations, most senior first
    pub fn all() -> &'static [Designation] {
        &[
            Designation::Partner,
            Designation::Director,
            Designation::SeniorManager,
            Designation::Manager,
            Designation::SeniorConsultant,
            Designation::Consultant,
            Designation::Analyst,
            Designation::Architect,
            Designation::Developer,
            Designation::Tester,
        ]
    }

    /// Human-readable label, as it appears in spreadsheets
    pub fn label(&self) -> &'static str {
        match self {
            Designation::Partner => "Partner",
            Designation::Director => "Director",
            Designation::SeniorManager => "Senior Manager",
            Designation::Manager => "Manager",
            Designation::SeniorConsultant => "Senior Consultant",
            Designation::Consultant => "Consultant",
            Designation::Analyst => "Analyst",
            Designation::Architect => "Architect",
            Designation::Developer => "Developer",
            Designation::Tester => "Tester",
        }
    }

    /// Category every holder of this designation belongs to
    pub fn category(&self) -> Category {
        match self {
            Designation::Partner | Designation::Director => Category::Leadership,
            Designation::SeniorManager | Designation::Manager => Category::Management,
            Designation::SeniorConsultant | Designation::Consultant | Designation::Analyst => {
                Category::Functional
            }
            Designation::Architect | Designation::Developer => Category::Technical,
            Designation::Tester => Category::Quality,
        }
    }

    /// Classify a raw designation cell
    ///
    /// Matching ignores case and treats spaces, hyphens and underscores alike,
    /// so "senior-manager" and "SENIOR_MANAGER" both resolve.
    pub fn classify(raw: &str) -> DeclaredDesignation {
        let key = normalize_key(raw);
        Self::all()
            .iter()
            .find(|d| normalize_key(d.label()) == key)
            .map(|d| DeclaredDesignation::Known(*d))
            .unwrap_or_else(|| DeclaredDesignation::Unknown(raw.trim().to_string()))
    }
}

impl std::fmt::Display for Designation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl std::str::FromStr for Designation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match Designation::classify(s) {
            DeclaredDesignation::Known(d) => Ok(d),
            DeclaredDesignation::Unknown(_) => Err(format!(
                "Unknown designation: '{}' (valid: {})",
                s,
                Designation::all()
                    .iter()
                    .map(|d| d.label())
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
        }
    }
}

/// A designation cell as read from input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclaredDesignation {
    Known(Designation),
    /// Not a recognised designation; carries the original text
    Unknown(String),
}

/// Resource categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Leadership,
    Management,
    Functional,
    Technical,
    Quality,
}

impl Category {
    pub fn all() -> &'static [Category] {
        &[
            Category::Leadership,
            Category::Management,
            Category::Functional,
            Category::Technical,
            Category::Quality,
        ]
    }

    pub fn label(&self) -> &'static str {
        match self {
            Category::Leadership => "Leadership",
            Category::Management => "Management",
            Category::Functional => "Functional",
            Category::Technical => "Technical",
            Category::Quality => "Quality",
        }
    }

    fn keywords(&self) -> &'static [&'static str] {
        match self {
            Category::Leadership => &["leadership", "lead", "head", "partner", "director"],
            Category::Management => &["management", "manager", "pm", "pmo"],
            Category::Functional => &["functional", "consultant", "analyst", "business"],
            Category::Technical => &["technical", "developer", "engineer", "architect", "basis"],
            Category::Quality => &["quality", "qa", "test", "tester"],
        }
    }

    /// Suggest a category for an unrecognised designation.
    ///
    /// Only whole-word keyword hits count, and the first category in
    /// declaration order wins. Returns `None` when nothing matches.
    pub fn suggest(raw: &str) -> Option<Category> {
        let words: Vec<String> = raw
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(|w| w.to_lowercase())
            .collect();

        Self::all()
            .iter()
            .find(|category| {
                category
                    .keywords()
                    .iter()
                    .any(|kw| words.iter().any(|w| w == kw))
            })
            .copied()
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = normalize_key(s);
        Category::all()
            .iter()
            .find(|c| normalize_key(c.label()) == key)
            .copied()
            .ok_or_else(|| format!("Unknown category: '{}'", s))
    }
}

fn normalize_key(s: &str) -> String {
    s.trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '_'))
        .flat_map(|c| c.to_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_known_designations() {
        assert_eq!(
            Designation::classify("Manager"),
            DeclaredDesignation::Known(Designation::Manager)
        );
        assert_eq!(
            Designation::classify("  senior-manager "),
            DeclaredDesignation::Known(Designation::SeniorManager)
        );
        assert_eq!(
            Designation::classify("SENIOR_CONSULTANT"),
            DeclaredDesignation::Known(Designation::SeniorConsultant)
        );
    }

    #[test]
    fn test_classify_unknown_keeps_original_text() {
        assert_eq!(
            Designation::classify(" Solution Architect Lead "),
            DeclaredDesignation::Unknown("Solution Architect Lead".to_string())
        );
    }

    #[test]
    fn test_designation_implies_category() {
        assert_eq!(Designation::Manager.category(), Category::Management);
        assert_eq!(Designation::Developer.category(), Category::Technical);
        assert_eq!(Designation::Tester.category(), Category::Quality);
        assert_eq!(Designation::Partner.category(), Category::Leadership);
    }

    #[test]
    fn test_suggest_category_whole_words_only() {
        assert_eq!(Category::suggest("QA Engineer"), Some(Category::Technical));
        assert_eq!(Category::suggest("Test Lead"), Some(Category::Leadership));
        assert_eq!(Category::suggest("Basis Specialist"), Some(Category::Technical));
        // "pmo" must match as a word, not as a substring of another word
        assert_eq!(Category::suggest("Spmox Specialist"), None);
        assert_eq!(Category::suggest("Change Champion"), None);
    }

    #[test]
    fn test_parse_designation_and_category() {
        assert_eq!("senior manager".parse::<Designation>(), Ok(Designation::SeniorManager));
        assert!("wizard".parse::<Designation>().is_err());
        assert_eq!("technical".parse::<Category>(), Ok(Category::Technical));
        assert!("misc".parse::<Category>().is_err());
    }
}
