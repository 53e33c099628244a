//! Category relevance of detected labels against a listing's declared
//! marketplace category.

/// Keyword sets per declared marketplace category. Matching is
/// case-insensitive substring containment.
const CATEGORY_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "electronics",
        &[
            "laptop", "phone", "computer", "tablet", "monitor", "keyboard", "headphone",
            "camera", "charger", "cable", "console", "speaker", "electronic",
        ],
    ),
    (
        "textbooks",
        &["book", "textbook", "notebook", "paper", "page", "cover", "binder", "manual"],
    ),
    (
        "furniture",
        &["chair", "desk", "table", "sofa", "couch", "shelf", "bed", "lamp", "drawer", "furniture"],
    ),
    (
        "clothing",
        &["shirt", "jacket", "dress", "shoe", "sneaker", "pants", "jeans", "hoodie", "clothing", "apparel"],
    ),
    (
        "sports",
        &["ball", "racket", "bicycle", "bike", "helmet", "skateboard", "weights", "gym", "sport"],
    ),
    (
        "appliances",
        &["fridge", "refrigerator", "microwave", "kettle", "toaster", "blender", "fan", "heater", "appliance"],
    ),
];

/// Relevance of a matched keyword count, saturating at three matches.
const SATURATION_MATCHES: usize = 3;

/// Overlap between detected labels and the declared category's keyword
/// set, on a 0..1 scale. Three or more keyword matches saturate at 1.0.
/// An unknown declared category yields a neutral 0.5.
///
/// The moderation pipeline itself does not call this: the declared
/// category lives on the listing, not on the image record, so the
/// listing and review routes score relevance from a record's stored
/// detection labels when presenting flagged items.
pub fn category_relevance(labels: &[String], declared_category: &str) -> f64 {
    let category = declared_category.to_lowercase();
    let Some((_, keywords)) = CATEGORY_KEYWORDS.iter().find(|(name, _)| *name == category) else {
        return 0.5;
    };

    let matches = labels
        .iter()
        .filter(|label| {
            let label = label.to_lowercase();
            keywords.iter().any(|kw| label.contains(kw))
        })
        .count();

    if matches >= SATURATION_MATCHES {
        1.0
    } else {
        matches as f64 / SATURATION_MATCHES as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_three_matches_saturate() {
        let relevance = category_relevance(
            &labels(&["Laptop", "Computer keyboard", "HDMI cable", "Desk"]),
            "electronics",
        );
        assert_eq!(relevance, 1.0);
    }

    #[test]
    fn test_partial_match() {
        let relevance = category_relevance(&labels(&["Office chair", "Plant"]), "furniture");
        assert!((relevance - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_match_is_zero() {
        assert_eq!(category_relevance(&labels(&["Dog", "Grass"]), "textbooks"), 0.0);
    }

    #[test]
    fn test_unknown_category_is_neutral() {
        assert_eq!(category_relevance(&labels(&["Anything"]), "antiques"), 0.5);
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        let relevance = category_relevance(&labels(&["LAPTOP"]), "Electronics");
        assert!(relevance > 0.0);
    }
}
