use crate::core::{Result, StoreError};
use lru::LruCache;
use regex::Regex;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

lazy_static::lazy_static! {
    static ref LIKE_REGEX_CACHE: Mutex<LruCache<String, Arc<Regex>>> =
        Mutex::new(LruCache::new(NonZeroUsize::new(128).unwrap_or(NonZeroUsize::MIN)));
}

/// Translates a LIKE pattern (`%` any run, `_` one char, `\` escape) into an anchored regex.
fn like_to_regex(pattern: &str) -> String {
    let mut regex = String::with_capacity(pattern.len() + 2);
    regex.push('^');

    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '%' => regex.push_str(".*"),
            '_' => regex.push('.'),
            '\\' => match chars.next() {
                Some(escaped) => regex.push_str(&regex::escape(&escaped.to_string())),
                None => regex.push_str(r"\\"),
            },
            c => regex.push_str(&regex::escape(&c.to_string())),
        }
    }

    regex.push('$');
    regex
}

/// Prefix, suffix, substring and exact patterns never touch the regex engine.
fn fast_path_like(text: &str, pattern: &str, case_sensitive: bool) -> Option<bool> {
    if pattern.contains('_') || pattern.contains('\\') {
        return None;
    }

    let (text, pattern) = if case_sensitive {
        (text.to_string(), pattern.to_string())
    } else {
        (text.to_lowercase(), pattern.to_lowercase())
    };

    let wildcards = pattern.matches('%').count();
    match wildcards {
        0 => Some(text == pattern),
        1 if pattern.ends_with('%') => Some(text.starts_with(&pattern[..pattern.len() - 1])),
        1 if pattern.starts_with('%') => Some(text.ends_with(&pattern[1..])),
        2 if pattern.len() >= 2 && pattern.starts_with('%') && pattern.ends_with('%') => {
            Some(text.contains(&pattern[1..pattern.len() - 1]))
        }
        _ => None,
    }
}

fn cached_regex(pattern: &str, case_sensitive: bool) -> Result<Arc<Regex>> {
    let cache_key = if case_sensitive {
        format!("s:{pattern}")
    } else {
        format!("i:{pattern}")
    };

    if let Some(regex) = LIKE_REGEX_CACHE.lock()?.get(&cache_key) {
        return Ok(Arc::clone(regex));
    }

    let compiled = regex::RegexBuilder::new(&like_to_regex(pattern))
        .case_insensitive(!case_sensitive)
        .build()
        .map_err(|e| StoreError::Execution(format!("Invalid LIKE pattern: {e}")))?;
    let compiled = Arc::new(compiled);

    LIKE_REGEX_CACHE
        .lock()?
        .put(cache_key, Arc::clone(&compiled));

    Ok(compiled)
}

pub fn eval_like(text: &str, pattern: &str, case_sensitive: bool) -> Result<bool> {
    if let Some(result) = fast_path_like(text, pattern, case_sensitive) {
        return Ok(result);
    }

    let regex = cached_regex(pattern, case_sensitive)?;
    Ok(regex.is_match(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fast_paths_cover_common_shapes() {
        assert!(eval_like("Test Testsson", "Test%", true).unwrap());
        assert!(eval_like("Test Testsson", "%sson", true).unwrap());
        assert!(eval_like("Test Testsson", "%st Te%", true).unwrap());
        assert!(!eval_like("Test Testsson", "test%", true).unwrap());
        assert!(eval_like("Test Testsson", "test%", false).unwrap());
    }

    #[test]
    fn underscore_and_inner_wildcards_use_regex() {
        assert!(eval_like("abc", "a_c", true).unwrap());
        assert!(eval_like("a.b.c", "a%b%c", true).unwrap());
        assert!(!eval_like("abd", "a_c", true).unwrap());
    }

    #[test]
    fn escapes_match_literals() {
        assert!(eval_like("100%", r"100\%", true).unwrap());
        assert!(!eval_like("1000", r"100\%", true).unwrap());
        assert!(eval_like("(x)", "(_)", true).unwrap());
    }
}
