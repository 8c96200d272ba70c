// src/routing.rs
//
// Which department owns a report, decided from the damage labels alone.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Department {
    #[default]
    Roads,
    Drainage,
    Traffic,
    Utility,
}

impl Department {
    pub fn as_str(&self) -> &'static str {
        match self {
            Department::Roads => "ROADS",
            Department::Drainage => "DRAINAGE",
            Department::Traffic => "TRAFFIC",
            Department::Utility => "UTILITY",
        }
    }
}

impl std::fmt::Display for Department {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Checked top to bottom, first hit wins.
const RULES: &[(&[&str], Department)] = &[
    (&["water", "flood", "drainage"], Department::Drainage),
    (&["accident", "collision", "traffic"], Department::Traffic),
    (&["tree", "fallen"], Department::Drainage),
    (&["utility", "pole", "wire"], Department::Utility),
];

/// Route a set of labels. Matching is exact on the lower-cased label, not a
/// substring search: "waterlogged" does not count as "water".
pub fn route<I, S>(labels: I) -> Department
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let lowered: Vec<String> = labels
        .into_iter()
        .map(|l| l.as_ref().to_lowercase())
        .collect();

    RULES
        .iter()
        .find(|(keywords, _)| lowered.iter().any(|l| keywords.contains(&l.as_str())))
        .map(|(_, dept)| *dept)
        .unwrap_or_default()
}
