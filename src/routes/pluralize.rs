//! English noun pluralization for resource collection paths
//!
//! Two stages: an irregular-word table, then suffix rules. Both preserve the
//! capitalisation of the input.

/// Nouns whose plural no suffix rule produces
static IRREGULAR: &[(&str, &str)] = &[
    ("person", "people"),
    ("man", "men"),
    ("woman", "women"),
    ("child", "children"),
    ("tooth", "teeth"),
    ("foot", "feet"),
    ("mouse", "mice"),
    ("goose", "geese"),
    ("ox", "oxen"),
    ("datum", "data"),
    ("index", "indices"),
    ("matrix", "matrices"),
    ("vertex", "vertices"),
    ("criterion", "criteria"),
    ("phenomenon", "phenomena"),
    ("analysis", "analyses"),
    ("crisis", "crises"),
    ("thesis", "theses"),
    ("cactus", "cacti"),
    ("focus", "foci"),
    ("fungus", "fungi"),
    ("radius", "radii"),
    ("quiz", "quizzes"),
    ("sheep", "sheep"),
    ("fish", "fish"),
    ("deer", "deer"),
    ("series", "series"),
    ("species", "species"),
    ("news", "news"),
    ("equipment", "equipment"),
    ("information", "information"),
];

/// Words ending in `f`/`fe` that take a plain `s`; `-ff` and `-ffe` words
/// always do
static F_EXCEPTIONS: &[&str] = &[
    "roof", "chief", "belief", "chef", "proof", "reef", "gulf", "brief", "safe", "cafe",
];

/// Consonant + `o` words that take `es`; every other `o` word takes `s`
static O_ES: &[&str] = &["hero", "potato", "tomato", "echo", "veto", "torpedo", "embargo"];

/// Irregular-table lookup, `None` when the word is regular
pub fn irregular_plural(word: &str) -> Option<String> {
    let lower = word.to_lowercase();
    IRREGULAR
        .iter()
        .find(|(singular, plural)| *singular == lower || *plural == lower)
        .map(|(_, plural)| match_case(word, plural))
}

/// Suffix rules applied to a regular noun
pub fn apply_suffix_rules(word: &str) -> String {
    let lower = word.to_lowercase();
    let chars: Vec<char> = lower.chars().collect();
    let n = chars.len();
    if n == 0 {
        return String::new();
    }

    let last = chars[n - 1];
    let before_last = if n >= 2 { Some(chars[n - 2]) } else { None };

    if last == 'y' && before_last.map_or(false, |c| !is_vowel(c)) {
        return format!("{}{}", strip_chars(word, 1), match_suffix(word, "ies"));
    }

    if matches!(last, 's' | 'x' | 'z') || lower.ends_with("ch") || lower.ends_with("sh") {
        return format!("{}{}", word, match_suffix(word, "es"));
    }

    if !F_EXCEPTIONS.contains(&lower.as_str()) {
        if lower.ends_with("fe") && !lower.ends_with("ffe") {
            return format!("{}{}", strip_chars(word, 2), match_suffix(word, "ves"));
        }
        if last == 'f' && before_last != Some('f') {
            return format!("{}{}", strip_chars(word, 1), match_suffix(word, "ves"));
        }
    }

    if last == 'o' && O_ES.contains(&lower.as_str()) {
        return format!("{}{}", word, match_suffix(word, "es"));
    }

    format!("{}{}", word, match_suffix(word, "s"))
}

/// Irregular table first, then suffix rules
pub fn pluralize(word: &str) -> String {
    irregular_plural(word).unwrap_or_else(|| apply_suffix_rules(word))
}

fn is_vowel(c: char) -> bool {
    matches!(c, 'a' | 'e' | 'i' | 'o' | 'u')
}

fn strip_chars(word: &str, count: usize) -> &str {
    match word.char_indices().rev().nth(count - 1) {
        Some((idx, _)) => &word[..idx],
        None => "",
    }
}

fn is_shouting(word: &str) -> bool {
    word.chars().any(char::is_alphabetic) && !word.chars().any(char::is_lowercase)
}

fn match_suffix(word: &str, suffix: &str) -> String {
    if is_shouting(word) && word.chars().count() > 1 {
        suffix.to_uppercase()
    } else {
        suffix.to_string()
    }
}

fn match_case(original: &str, plural: &str) -> String {
    if is_shouting(original) && original.chars().count() > 1 {
        return plural.to_uppercase();
    }
    let mut chars = plural.chars();
    match (original.chars().next(), chars.next()) {
        (Some(first), Some(p)) if first.is_uppercase() => p.to_uppercase().chain(chars).collect(),
        _ => plural.to_string(),
    }
}
