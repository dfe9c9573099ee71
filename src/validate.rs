//! Input validation for CLI arguments.
//!
//! Category names accept the canonical CLI name, the backend's wire name,
//! the storage code, or a common synonym. Three-tier resolution: exact
//! match → synonym lookup → error with suggestion.

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::model::ProjectCategory;

// ── Accepted names ───────────────────────────────────────────

/// Canonical CLI name for a category.
#[must_use]
pub const fn category_cli_name(category: ProjectCategory) -> &'static str {
    match category {
        ProjectCategory::Software => "software",
        ProjectCategory::Power => "power",
        ProjectCategory::Telecom => "telecom",
        ProjectCategory::ElectronicsControl => "electronics-control",
    }
}

pub static CATEGORY_NAMES: LazyLock<HashMap<&str, ProjectCategory>> = LazyLock::new(|| {
    ProjectCategory::ALL
        .into_iter()
        .flat_map(|c| [(category_cli_name(c), c), (c.wire_name(), c)])
        .chain([("electronics_control", ProjectCategory::ElectronicsControl)])
        .collect()
});

// ── Synonym maps ─────────────────────────────────────────────

pub static CATEGORY_SYNONYMS: LazyLock<HashMap<&str, ProjectCategory>> = LazyLock::new(|| {
    [
        ("sw", ProjectCategory::Software),
        ("cs", ProjectCategory::Software),
        ("computer", ProjectCategory::Software),
        ("computing", ProjectCategory::Software),
        ("programming", ProjectCategory::Software),
        ("pwr", ProjectCategory::Power),
        ("energy", ProjectCategory::Power),
        ("electrical", ProjectCategory::Power),
        ("comms", ProjectCategory::Telecom),
        ("communications", ProjectCategory::Telecom),
        ("telecommunications", ProjectCategory::Telecom),
        ("tel", ProjectCategory::Telecom),
        ("ec", ProjectCategory::ElectronicsControl),
        ("e&c", ProjectCategory::ElectronicsControl),
        ("control", ProjectCategory::ElectronicsControl),
        ("electronics", ProjectCategory::ElectronicsControl),
        ("automation", ProjectCategory::ElectronicsControl),
    ]
    .into_iter()
    .collect()
});

/// Normalize a category argument.
///
/// Returns the category, or an error with the original input and an
/// optional suggestion.
pub fn normalize_category(input: &str) -> Result<ProjectCategory, (String, Option<String>)> {
    let lower = input.trim().to_lowercase();

    // Tier 1: exact match (names and storage codes)
    if let Some(&category) = CATEGORY_NAMES.get(lower.as_str()) {
        return Ok(category);
    }
    if let Some(category) = lower.parse::<i64>().ok().and_then(ProjectCategory::from_code) {
        return Ok(category);
    }

    // Tier 2: synonym lookup
    if let Some(&category) = CATEGORY_SYNONYMS.get(lower.as_str()) {
        return Ok(category);
    }

    // Tier 3: find closest suggestion
    let suggestion = find_closest_category(&lower).map(|c| category_cli_name(c).to_string());
    Err((input.to_string(), suggestion))
}

/// Find the category whose name or synonym is closest to `input`.
fn find_closest_category(input: &str) -> Option<ProjectCategory> {
    CATEGORY_NAMES
        .iter()
        .chain(CATEGORY_SYNONYMS.iter())
        .map(|(&name, &category)| (levenshtein_distance(input, name), name, category))
        .filter(|(dist, _, _)| *dist <= 3)
        .min_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(b.1)))
        .map(|(_, _, category)| category)
}

// ── Levenshtein distance ─────────────────────────────────────

/// Compute the Levenshtein edit distance between two strings.
#[must_use]
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let a_len = a.len();
    let b_len = b.len();

    if a_len == 0 {
        return b_len;
    }
    if b_len == 0 {
        return a_len;
    }

    // Use single-row optimization (O(min(m,n)) space)
    let mut prev: Vec<usize> = (0..=b_len).collect();
    let mut curr = vec![0; b_len + 1];

    for i in 1..=a_len {
        curr[0] = i;
        for j in 1..=b_len {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            curr[j] = (prev[j] + 1) // deletion
                .min(curr[j - 1] + 1) // insertion
                .min(prev[j - 1] + cost); // substitution
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_len]
}

/// Find existing IDs similar to the searched ID.
///
/// Returns up to `max` suggestions with edit distance ≤ 3,
/// sorted by distance then alphabetically.
#[must_use]
pub fn find_similar_ids(searched: &str, existing: &[String], max: usize) -> Vec<String> {
    let mut candidates: Vec<(usize, &str)> = existing
        .iter()
        .map(|id| (levenshtein_distance(searched, id), id.as_str()))
        .filter(|(dist, _)| *dist <= 3)
        .collect();

    candidates.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(b.1)));

    candidates
        .into_iter()
        .take(max)
        .map(|(_, id)| id.to_string())
        .collect()
}
