/// Search relevance scoring
///
/// Scores a row name against the finder text. Higher is better and 0 means
/// no match:
///
/// - exact match (case-insensitive): `EXACT_SCORE`
/// - name starts with the text: `PREFIX_SCORE`
/// - name contains the text: `SUBSTRING_SCORE`
/// - text letters appear in order: up to `FUZZY_MAX_SCORE`, higher when the
///   matched letters sit closer together
///
/// An empty query scores everything 0, since no search is active.

pub const EXACT_SCORE: u32 = 100;
pub const PREFIX_SCORE: u32 = 75;
pub const SUBSTRING_SCORE: u32 = 50;
pub const FUZZY_MAX_SCORE: u32 = 25;

/// Finder text as typed: spaces are ignored and case folded
pub fn normalize_query(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect::<String>().to_lowercase()
}

pub fn score(query: &str, name: &str) -> u32 {
    let query = normalize_query(query);
    if query.is_empty() {
        return 0;
    }
    let name = name.to_lowercase();

    if name == query {
        EXACT_SCORE
    } else if name.starts_with(&query) {
        PREFIX_SCORE
    } else if name.contains(&query) {
        SUBSTRING_SCORE
    } else {
        fuzzy_score(&query, &name)
    }
}

fn fuzzy_score(query: &str, name: &str) -> u32 {
    let name: Vec<char> = name.chars().collect();
    let mut first = None;
    let mut last = 0;
    let mut pos = 0;

    for q in query.chars() {
        match name[pos..].iter().position(|&c| c == q) {
            Some(offset) => {
                let at = pos + offset;
                first.get_or_insert(at);
                last = at;
                pos = at + 1;
            }
            None => return 0,
        }
    }

    let Some(first) = first else { return 0 };
    let span = (last - first + 1) as u32;
    let matched = query.chars().count() as u32;
    (FUZZY_MAX_SCORE * matched / span).clamp(1, FUZZY_MAX_SCORE)
}
