// src/severity.rs
//
// Severity levels:
//   0  no damage / low confidence
//   1  minor wear
//   2  moderate damage
//   3  severe damage
//   4  critical infrastructure risk

pub const MAX_SEVERITY: u8 = 4;

/// Score one region from detector confidence and covered area fraction.
///
/// Rules are evaluated in order and the first match wins. A later rule only
/// sees regions whose confidence already failed the earlier bound, so a
/// mid-confidence region that is too large for level 2 lands on level 3
/// rather than being capped. Do not rewrite this as a lookup table.
pub fn score(confidence: f32, area_ratio: f32) -> u8 {
    if confidence < 0.5 {
        0
    } else if confidence < 0.6 && area_ratio < 0.05 {
        1
    } else if confidence < 0.75 && area_ratio < 0.15 {
        2
    } else if confidence < 0.85 && area_ratio < 0.3 {
        3
    } else {
        4
    }
}

pub fn describe(severity: u8) -> &'static str {
    match severity {
        0 => "No damage detected",
        1 => "Minor wear detected",
        2 => "Moderate damage detected",
        3 => "Severe damage detected",
        4 => "Critical infrastructure risk",
        _ => "Analysis complete",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_points() {
        assert_eq!(score(0.4, 0.9), 0);
        assert_eq!(score(0.55, 0.03), 1);
        assert_eq!(score(0.9, 0.9), 4);
    }

    #[test]
    fn test_fall_through_skips_level_two() {
        // Fails rule 2 on area, fails rule 3 on area, rule 4 accepts.
        assert_eq!(score(0.55, 0.2), 3);
        // Too large even for rule 4.
        assert_eq!(score(0.55, 0.5), 4);
    }

    #[test]
    fn test_bounds_are_exclusive() {
        assert_eq!(score(0.5, 0.0), 1);
        assert_eq!(score(0.6, 0.0), 2);
        assert_eq!(score(0.75, 0.0), 3);
        assert_eq!(score(0.85, 0.0), 4);
        assert_eq!(score(0.7, 0.15), 3);
    }

    #[test]
    fn test_describe() {
        assert_eq!(describe(0), "No damage detected");
        assert_eq!(describe(MAX_SEVERITY), "Critical infrastructure risk");
        assert_eq!(describe(9), "Analysis complete");
    }
}
