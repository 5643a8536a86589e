//! Service catalog — the fixed set of directions a lead can choose from.

/// One catalog entry. The label is what the user sees on the button; the
/// code is the opaque selection key stored in the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub label: String,
    pub code: String,
}

impl Category {
    pub fn new(label: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            code: code.into(),
        }
    }
}

/// Ordered, immutable catalog configured at process start. Codes are unique
/// within the catalog; duplicates panic in debug builds.
#[derive(Debug, Clone)]
pub struct Catalog {
    entries: Vec<Category>,
}

impl Catalog {
    pub fn new(entries: Vec<Category>) -> Self {
        #[cfg(debug_assertions)]
        {
            let mut seen = std::collections::HashSet::new();
            for category in &entries {
                debug_assert!(
                    seen.insert(category.code.as_str()),
                    "duplicate catalog code: {}",
                    category.code
                );
            }
        }
        Self { entries }
    }

    /// Look up an entry by its selection code.
    pub fn get(&self, code: &str) -> Option<&Category> {
        self.entries.iter().find(|c| c.code == code)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.get(code).is_some()
    }

    /// All entries, in display order.
    pub fn entries(&self) -> &[Category] {
        &self.entries
    }
}

impl Default for Catalog {
    /// The Academy's current set of directions.
    fn default() -> Self {
        Self::new(vec![
            Category::new("🎓 ВУЗ", "ВУЗ"),
            Category::new("📚 Колледж", "Колледж"),
            Category::new("🏛 Академия", "Академия"),
        ])
    }
}
