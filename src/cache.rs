//! Thread-local compilation cache for structural patterns.
//!
//! Rule tables are rebuilt for every `check`/`apply` and for every validation
//! pass, so the same pattern sources get compiled repeatedly. Cache is capped
//! at 256 entries; when full it is cleared and rebuilt on demand.

use regex::{Regex, RegexBuilder};
use std::cell::RefCell;
use std::collections::HashMap;

const MAX_CACHE_ENTRIES: usize = 256;

// Minified bundles produce large DFAs for the `[^}]*` style anchors
const REGEX_SIZE_LIMIT: usize = 64 * (1 << 20);

thread_local! {
    // Key is "<i|s>:<pattern>" so the same source compiled with different
    // case sensitivity never collides.
    static PATTERN_CACHE: RefCell<HashMap<String, Regex>> =
        RefCell::new(HashMap::new());
}

/// Get a compiled pattern from cache, or compile and cache it.
pub fn get_or_compile_pattern(
    pattern_str: &str,
    case_insensitive: bool,
) -> Result<Regex, regex::Error> {
    let flag = if case_insensitive { 'i' } else { 's' };
    let cache_key = format!("{flag}:{pattern_str}");

    PATTERN_CACHE.with(|cache| {
        let mut cache = cache.borrow_mut();

        if let Some(re) = cache.get(&cache_key) {
            return Ok(re.clone());
        }

        if cache.len() >= MAX_CACHE_ENTRIES {
            cache.clear();
        }

        let compiled = RegexBuilder::new(pattern_str)
            .case_insensitive(case_insensitive)
            .size_limit(REGEX_SIZE_LIMIT)
            .build()?;
        cache.insert(cache_key, compiled.clone());
        Ok(compiled)
    })
}

/// Clear the pattern cache (mainly for testing).
pub fn clear_cache() {
    PATTERN_CACHE.with(|cache| {
        cache.borrow_mut().clear();
    });
}

pub fn cache_size() -> usize {
    PATTERN_CACHE.with(|cache| cache.borrow().len())
}
