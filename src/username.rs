//! Username normalization and candidate generation.

use rand::Rng;

pub const MAX_USERNAME_LEN: usize = 50;
pub const MAX_NUMERIC_ATTEMPTS: u32 = 100;
const FALLBACK_BASE: &str = "member";

pub fn normalize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.trim().chars().flat_map(char::to_lowercase) {
        let mapped = match ch {
            'a'..='z' | '0'..='9' | '_' => Some(ch),
            '-' | '.' => Some('_'),
            c if c.is_whitespace() => Some('_'),
            _ => None,
        };
        if let Some(c) = mapped {
            if c == '_' && out.ends_with('_') {
                continue;
            }
            out.push(c);
        }
    }

    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        return FALLBACK_BASE.to_string();
    }
    let mut truncated: String = trimmed.chars().take(MAX_USERNAME_LEN).collect();
    while truncated.ends_with('_') && truncated.len() > 1 {
        truncated.pop();
    }
    truncated
}

pub fn is_valid(username: &str) -> bool {
    !username.is_empty()
        && username.len() <= MAX_USERNAME_LEN
        && username
            .chars()
            .all(|c| matches!(c, 'a'..='z' | '0'..='9' | '_'))
}

/// `base` joined with `suffix`, shortening `base` so the result stays within
/// the length limit.
pub fn with_suffix(base: &str, suffix: &str) -> String {
    let room = MAX_USERNAME_LEN.saturating_sub(suffix.len());
    let mut name: String = base.chars().take(room).collect();
    name.push_str(suffix);
    name
}

/// The normalized base followed by `base1`, `base2`, ... up to the attempt
/// limit.
pub fn candidates(raw: &str) -> impl Iterator<Item = String> {
    let base = normalize(raw);
    std::iter::once(base.clone())
        .chain((1..=MAX_NUMERIC_ATTEMPTS).map(move |n| with_suffix(&base, &n.to_string())))
}

pub fn random_fallback(raw: &str) -> String {
    let suffix: u32 = rand::thread_rng().gen_range(100_000..1_000_000);
    with_suffix(&normalize(raw), &suffix.to_string())
}
