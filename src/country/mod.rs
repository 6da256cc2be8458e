use serde::{Deserialize, Serialize};

/// A single country record as served by the countries API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Country {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub abbr: String,  // Used as the card key, not checked for uniqueness
    #[serde(default)]
    pub flag: String,  // URL to the flag image
}

impl Country {
    /// Alt text shown in place of the flag image
    pub fn alt_text(&self) -> String {
        format!("{} flag", self.name)
    }
}

/// Filter countries by a case-insensitive substring of the name.
///
/// A blank (empty or whitespace-only) term returns the full list. Otherwise
/// the untrimmed term is matched, and the original order is kept.
pub fn filter_countries(countries: &[Country], term: &str) -> Vec<Country> {
    let term = term.to_lowercase();

    if term.trim().is_empty() {
        return countries.to_vec();
    }

    countries
        .iter()
        .filter(|c| c.name.to_lowercase().contains(&term))
        .cloned()
        .collect()
}

#[cfg(test)]
pub(crate) fn sample(name: &str, abbr: &str) -> Country {
    Country {
        name: name.to_string(),
        abbr: abbr.to_string(),
        flag: format!("https://flags.example/{}.png", abbr.to_lowercase()),
    }
}
