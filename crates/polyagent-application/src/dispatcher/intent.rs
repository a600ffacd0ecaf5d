/// Whether `input` asks to buy a course.
///
/// Matches English and Chinese phrasings, case-insensitively.
pub fn is_course_purchase(input: &str) -> bool {
    let lowered = input.to_lowercase();
    let wants_to_buy = ["buy", "purchase", "购买", "买"]
        .iter()
        .any(|verb| lowered.contains(verb));
    let mentions_course = ["course", "课程", "课"]
        .iter()
        .any(|noun| lowered.contains(noun));
    wants_to_buy && mentions_course
}
