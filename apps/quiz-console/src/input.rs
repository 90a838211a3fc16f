//! Parsing of typed player input.

/// 1-based positions from a comma-separated list.
///
/// Entries that are not integers in `1..=count` are dropped.
pub fn parse_category_selection(input: &str, count: usize) -> Vec<usize> {
    input
        .split(',')
        .filter_map(|part| part.trim().parse::<usize>().ok())
        .filter(|index| (1..=count).contains(index))
        .collect()
}

/// Question count within `min..=max`; `None` for anything else.
pub fn parse_question_count(input: &str, min: usize, max: usize) -> Option<usize> {
    input
        .trim()
        .parse::<usize>()
        .ok()
        .filter(|n| (min..=max).contains(n))
}

/// Exactly two non-empty, comma-separated wrong answers.
pub fn parse_incorrect_answers(input: &str) -> Option<[String; 2]> {
    let parts: Vec<String> = input.split(',').map(|p| p.trim().to_string()).collect();
    match <[String; 2]>::try_from(parts) {
        Ok(answers) if answers.iter().all(|a| !a.is_empty()) => Some(answers),
        _ => None,
    }
}
