// Rubric sent to the vision model alongside the two screenshots

/// Keys of the six 0-10 ratings the model is asked for, in rubric order.
pub const RATING_KEYS: [&str; 6] = [
    "layout_similarity",
    "visual_hierarchy",
    "color_scheme",
    "typography",
    "spacing",
    "component_placement",
];

/// Upper bound of every rating on the rubric scale.
pub const RATING_SCALE: f64 = 10.0;

/// Build the comparison rubric. The first attached image is the original
/// site, the second the migrated one.
pub fn build_rubric() -> String {
    let mut prompt = String::new();
    prompt.push_str("Compare these two website screenshots and evaluate their similarity.\n\n");
    prompt.push_str(
        "The first image is the ORIGINAL website, and the second is the MIGRATED version.\n\n",
    );
    prompt.push_str("Evaluate similarity in these areas (scale 0-10 for each):\n");
    prompt.push_str("1. Layout Similarity: Are sections arranged similarly?\n");
    prompt.push_str("2. Visual Hierarchy: Is the importance of elements preserved?\n");
    prompt.push_str("3. Color Scheme: Do colors match?\n");
    prompt.push_str("4. Typography: Are fonts and text styles similar?\n");
    prompt.push_str("5. Spacing: Is whitespace and padding similar?\n");
    prompt.push_str(
        "6. Component Placement: Are key components (nav, hero, footer, etc.) in similar positions?\n\n",
    );
    prompt.push_str("Respond with a single JSON object in exactly this shape:\n");
    prompt.push_str("{\n");
    for key in RATING_KEYS {
        prompt.push_str(&format!("  \"{}\": <integer 0-10>,\n", key));
    }
    prompt.push_str("  \"overall_impression\": \"brief description\",\n");
    prompt.push_str("  \"notable_differences\": [\"difference 1\", \"difference 2\"]\n");
    prompt.push_str("}\n");
    prompt
}
