//! Code-violation filtering and severity tiering.
//!
//! Only complaint types that describe physical decay are kept. Each kept
//! violation is tiered by keyword detection on its violation text
//! (code section numbers and plain-language descriptions). Administrative
//! violations such as registration or permit paperwork are excluded.

use decay_map_decay_models::ViolationTier;

/// Complaint types that describe physical decay.
const DECAY_COMPLAINT_TYPES: &[&str] = &[
    "property maintenance-int",
    "property maintenance-ext",
    "vacant house",
    "overgrowth: private, occ",
    "trash/debris-private, occ",
    "fire safety",
    "vacant lot",
];

const EXCLUDE_KEYWORDS: &[&str] = &[
    "27-133 registration",
    "27-43",
    "certification",
    "105.2",
    "building permit",
];

const STRUCTURAL_KEYWORDS: &[&str] = &[
    "107.1.3",
    "unfit for human",
    "structural members",
    "304.10",
    "stairways",
    "305.4",
    "stairs and walking",
    "304.2",
    "protective treatment",
    "27-32 (b)",
    "stairs, porches",
];

const SYSTEMS_KEYWORDS: &[&str] = &[
    "305.3",
    "interior surfaces",
    "504.1",
    "plumbing",
    "304.13",
    "window",
    "skylight",
    "605.1",
    "installation",
    "603.1",
    "mechanical",
    "appliances",
    "309.1",
    "infestation",
    "705.1",
    "carbon monoxide",
    "304.15",
    "doors",
    "305.6",
    "interior doors",
    "lead abatement",
    "27-57",
    "receptacle",
    "27-32 (d)",
    "protective coating",
    "27-31",
    "structural",
];

/// Whether a complaint type belongs to the physical-decay set.
#[must_use]
pub fn is_decay_complaint(complaint_type: &str) -> bool {
    let lower = complaint_type.trim().to_lowercase();
    DECAY_COMPLAINT_TYPES.contains(&lower.as_str())
}

/// Tiers a violation by its text. Returns `None` for administrative
/// violations that should be excluded. Missing text and text matching no
/// keyword default to [`ViolationTier::EnvironmentalNeglect`].
#[must_use]
pub fn assign_tier(violation_text: Option<&str>) -> Option<ViolationTier> {
    let Some(text) = violation_text else {
        return Some(ViolationTier::EnvironmentalNeglect);
    };
    let lower = text.to_lowercase();

    if contains_any(&lower, EXCLUDE_KEYWORDS) {
        return None;
    }
    if contains_any(&lower, STRUCTURAL_KEYWORDS) {
        return Some(ViolationTier::Structural);
    }
    if contains_any(&lower, SYSTEMS_KEYWORDS) {
        return Some(ViolationTier::SystemsFailure);
    }
    // Overgrowth, trash, debris and anything unmatched.
    Some(ViolationTier::EnvironmentalNeglect)
}

/// Checks if `haystack` contains any of the given `needles`.
fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_decay_complaints_only() {
        assert!(is_decay_complaint("Property Maintenance-Int"));
        assert!(is_decay_complaint(" Vacant Lot "));
        assert!(!is_decay_complaint("Noise Complaint"));
    }

    #[test]
    fn tiers_by_keyword() {
        assert_eq!(
            assign_tier(Some("SPMC 107.1.3 - Unfit for human occupancy")),
            Some(ViolationTier::Structural)
        );
        assert_eq!(
            assign_tier(Some("504.1 General - Plumbing systems")),
            Some(ViolationTier::SystemsFailure)
        );
        assert_eq!(
            assign_tier(Some("27-72 (e) Overgrowth")),
            Some(ViolationTier::EnvironmentalNeglect)
        );
    }

    #[test]
    fn structural_wins_over_systems() {
        // "stairways" is structural even though "doors" also appears.
        assert_eq!(
            assign_tier(Some("Stairways and doors in disrepair")),
            Some(ViolationTier::Structural)
        );
    }

    #[test]
    fn excludes_administrative() {
        assert_eq!(assign_tier(Some("27-133 Registration required")), None);
        assert_eq!(assign_tier(Some("105.2 Building permit missing")), None);
    }

    #[test]
    fn missing_or_unmatched_text_defaults_to_neglect() {
        assert_eq!(assign_tier(None), Some(ViolationTier::EnvironmentalNeglect));
        assert_eq!(
            assign_tier(Some("something else")),
            Some(ViolationTier::EnvironmentalNeglect)
        );
    }
}
