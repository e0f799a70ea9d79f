//! Case-style conversion, memoised (pure function of input, same cache key
//! mirrors `@cache`-decorated converters in the system this crate reworks).

use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaseStyle {
    Snake,
    Kebab,
    Camel,
    Pascal,
}

type Cache = Mutex<HashMap<(String, CaseStyle), String>>;

fn cache() -> &'static Cache {
    static CACHE: OnceLock<Cache> = OnceLock::new();
    CACHE.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Converts `s` to the requested case style. Results are cached since the
/// conversion is a pure function of `(s, style)`.
pub fn case_style(s: &str, style: CaseStyle) -> String {
    let key = (s.to_string(), style);
    if let Some(hit) = cache().lock().unwrap().get(&key) {
        return hit.clone();
    }

    let words = split_to_words(s);
    let result = match style {
        CaseStyle::Snake => words.join("_"),
        CaseStyle::Kebab => words.join("-"),
        CaseStyle::Camel => join_camel_like(&words, false),
        CaseStyle::Pascal => join_camel_like(&words, true),
    };

    cache().lock().unwrap().insert(key, result.clone());
    result
}

/// (1) insert a separator before every uppercase letter preceded by a letter
/// or digit, (2) collapse runs of `-`/`_` to a single separator, (3) trim
/// edge separators, (4) split on the separator, lowercasing each word.
fn split_to_words(s: &str) -> Vec<String> {
    let mut spaced = String::with_capacity(s.len() + 4);
    let mut prev: Option<char> = None;
    for ch in s.chars() {
        if ch.is_uppercase() {
            if let Some(p) = prev {
                if p.is_alphanumeric() && !p.is_uppercase() || p.is_ascii_digit() {
                    spaced.push('_');
                } else if p.is_uppercase() {
                    // keep runs of uppercase together (acronyms), no separator
                } else {
                    spaced.push('_');
                }
            }
        }
        spaced.push(ch);
        prev = Some(ch);
    }

    let normalized: String = spaced
        .chars()
        .map(|c| if c == '-' || c == '_' { '_' } else { c })
        .collect();

    let mut collapsed = String::with_capacity(normalized.len());
    let mut last_was_sep = false;
    for ch in normalized.chars() {
        if ch == '_' {
            if !last_was_sep {
                collapsed.push('_');
            }
            last_was_sep = true;
        } else {
            collapsed.push(ch);
            last_was_sep = false;
        }
    }

    collapsed
        .trim_matches('_')
        .split('_')
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect()
}

fn join_camel_like(words: &[String], capitalize_first: bool) -> String {
    let mut out = String::new();
    for (i, word) in words.iter().enumerate() {
        let mut chars = word.chars();
        match chars.next() {
            Some(first) => {
                if i == 0 && !capitalize_first {
                    out.push(first);
                } else {
                    out.extend(first.to_uppercase());
                }
                out.push_str(chars.as_str());
            }
            None => {}
        }
    }
    out
}

pub fn to_snake_case(s: &str) -> String {
    case_style(s, CaseStyle::Snake)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_pascal_to_snake() {
        assert_eq!(to_snake_case("UserCommand"), "user_command");
    }

    #[test]
    fn converts_mixed_separators() {
        assert_eq!(case_style("user--command_name", CaseStyle::Snake), "user_command_name");
    }

    #[test]
    fn converts_to_kebab_and_camel_and_pascal() {
        assert_eq!(case_style("user_command", CaseStyle::Kebab), "user-command");
        assert_eq!(case_style("user_command", CaseStyle::Camel), "userCommand");
        assert_eq!(case_style("user_command", CaseStyle::Pascal), "UserCommand");
    }

    #[test]
    fn conversion_is_idempotent_within_style() {
        let once = case_style("HTTPServerHandler", CaseStyle::Snake);
        let twice = case_style(&once, CaseStyle::Snake);
        assert_eq!(once, twice);
    }
}
