//! Structural ranking of search candidates before the semantic pick

use morsel_core::NutritionCandidate;

const PREPARATION_QUALIFIERS: &[&str] = &["with", "recipe", "prepared", "cooked"];
const SHORT_DESCRIPTION: usize = 50;

/// Preference score for a candidate; higher is better.
///
/// Foundation data beats SR Legacy beats Survey (FNDDS). Plain descriptions
/// without preparation qualifiers, descriptions containing the search term,
/// and short descriptions each add a bonus.
pub fn candidate_score(candidate: &NutritionCandidate, search_term: &str) -> u32 {
    let description = candidate.description.to_lowercase();
    let data_type = candidate.data_type.to_lowercase();
    let term = search_term.trim().to_lowercase();

    let mut score = if data_type.contains("foundation") {
        100
    } else if data_type.contains("sr legacy") {
        80
    } else if data_type.contains("survey") {
        60
    } else {
        0
    };

    if !PREPARATION_QUALIFIERS.iter().any(|q| description.contains(q)) {
        score += 50;
    }
    if !term.is_empty() && description.contains(&term) {
        score += 30;
    }
    if description.chars().count() < SHORT_DESCRIPTION {
        score += 20;
    }
    score
}

/// Order candidates best first. The sort is stable, so equally scored
/// candidates keep the order the database returned them in.
pub fn rank_candidates(candidates: &mut [NutritionCandidate], search_term: &str) {
    candidates.sort_by_cached_key(|c| std::cmp::Reverse(candidate_score(c, search_term)));
}
