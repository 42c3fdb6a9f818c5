//! String synthesis for `pattern` constraints
//!
//! Supports the practical regex subset seen in API schemas: literals,
//! `.`, escapes (`\d \w \s \D \W \S`), character classes with ranges and
//! negation, groups with alternation, and the `? * + {n} {n,} {n,m}`
//! quantifiers. Anchors are accepted and ignored. Candidates are checked
//! with the real regex engine and regenerated a bounded number of times.

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use rand::Rng;
use regex::Regex;
use std::collections::HashMap;
use std::iter::Peekable;
use std::ops::RangeInclusive;
use std::str::Chars;

/// Extra repetitions allowed for unbounded quantifiers (`*`, `+`, `{n,}`)
const UNBOUNDED_EXTRA: u32 = 4;

/// Upper limit on any single repetition count
const MAX_REPETITION: u32 = 1024;

/// Attempts before the last candidate is returned unchecked
const MAX_PATTERN_ATTEMPTS: usize = 8;

static REGEX_CACHE: Lazy<RwLock<HashMap<String, Option<Regex>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

#[derive(Debug, Clone)]
enum Atom {
    Literal(char),
    Class(Vec<char>),
    Group(Vec<Vec<Piece>>),
}

#[derive(Debug, Clone)]
struct Piece {
    atom: Atom,
    min: u32,
    max: u32,
    unbounded: bool,
}

/// Generate a string intended to match `pattern` with a character count
/// inside `length`
pub fn generate_from_pattern<R: Rng + ?Sized>(
    pattern: &str,
    length: RangeInclusive<usize>,
    rng: &mut R,
) -> String {
    let alternatives = parse_alternatives(&mut pattern.chars().peekable(), false);
    let mut candidate = render_sized(&alternatives, &length, rng);

    for _ in 1..MAX_PATTERN_ATTEMPTS {
        let matches = pattern_matches(pattern, &candidate) != Some(false);
        if matches && length.contains(&candidate.chars().count()) {
            break;
        }
        candidate = render_sized(&alternatives, &length, rng);
    }

    candidate
}

/// Check `value` against `pattern`; `None` when the pattern does not compile
pub fn pattern_matches(pattern: &str, value: &str) -> Option<bool> {
    if let Some(compiled) = REGEX_CACHE.read().get(pattern) {
        return compiled.as_ref().map(|re| re.is_match(value));
    }

    let compiled = Regex::new(pattern).ok();
    let result = compiled.as_ref().map(|re| re.is_match(value));
    REGEX_CACHE.write().insert(pattern.to_string(), compiled);
    result
}

fn parse_alternatives(chars: &mut Peekable<Chars<'_>>, in_group: bool) -> Vec<Vec<Piece>> {
    let mut alternatives = vec![Vec::new()];

    while let Some(&c) = chars.peek() {
        if in_group && c == ')' {
            chars.next();
            break;
        }
        chars.next();

        let atom = match c {
            '|' => {
                alternatives.push(Vec::new());
                continue;
            }
            '^' | '$' => continue,
            '\\' => match chars.next() {
                Some(escaped) => escape_atom(escaped),
                None => Atom::Literal('\\'),
            },
            '[' => Atom::Class(parse_class(chars)),
            '(' => {
                if chars.peek() == Some(&'?') {
                    chars.next();
                    if chars.peek() == Some(&':') {
                        chars.next();
                    }
                }
                Atom::Group(parse_alternatives(chars, true))
            }
            '.' => Atom::Class(word_chars()),
            other => Atom::Literal(other),
        };

        let (min, max, unbounded) = parse_quantifier(chars);
        if let Some(current) = alternatives.last_mut() {
            current.push(Piece {
                atom,
                min,
                max,
                unbounded,
            });
        }
    }

    alternatives
}

fn parse_quantifier(chars: &mut Peekable<Chars<'_>>) -> (u32, u32, bool) {
    let bounds = match chars.peek() {
        Some('?') => {
            chars.next();
            (0, 1, false)
        }
        Some('*') => {
            chars.next();
            (0, UNBOUNDED_EXTRA, true)
        }
        Some('+') => {
            chars.next();
            (1, 1 + UNBOUNDED_EXTRA, true)
        }
        Some('{') => {
            let mut lookahead = chars.clone();
            lookahead.next();
            let inner: String = lookahead.by_ref().take_while(|c| *c != '}').collect();
            match parse_repetition(&inner) {
                Some(bounds) => {
                    *chars = lookahead;
                    bounds
                }
                None => (1, 1, false),
            }
        }
        _ => (1, 1, false),
    };

    // Lazy/possessive suffixes do not change what can be generated
    if bounds != (1, 1, false) && matches!(chars.peek(), Some('?') | Some('+')) {
        chars.next();
    }
    bounds
}

fn parse_repetition(text: &str) -> Option<(u32, u32, bool)> {
    match text.split_once(',') {
        None => {
            let n = text.trim().parse::<u32>().ok()?.min(MAX_REPETITION);
            Some((n, n, false))
        }
        Some((lo, hi)) => {
            let lo = lo.trim().parse::<u32>().ok()?.min(MAX_REPETITION);
            if hi.trim().is_empty() {
                return Some((lo, lo.saturating_add(UNBOUNDED_EXTRA), true));
            }
            let hi = hi.trim().parse::<u32>().ok()?.min(MAX_REPETITION);
            Some((lo, hi.max(lo), false))
        }
    }
}

fn parse_class(chars: &mut Peekable<Chars<'_>>) -> Vec<char> {
    let negated = chars.peek() == Some(&'^');
    if negated {
        chars.next();
    }

    let mut members = Vec::new();
    let mut first = true;
    while let Some(c) = chars.next() {
        if c == ']' && !first {
            break;
        }
        first = false;

        if c == '\\' {
            match chars.next() {
                Some(escaped) => match escape_atom(escaped) {
                    Atom::Class(set) => members.extend(set),
                    Atom::Literal(l) => members.push(l),
                    Atom::Group(_) => {}
                },
                None => members.push('\\'),
            }
            continue;
        }

        if chars.peek() == Some(&'-') {
            let mut lookahead = chars.clone();
            lookahead.next();
            match lookahead.peek() {
                Some(&end) if end != ']' => {
                    chars.next();
                    chars.next();
                    if c <= end {
                        members.extend(c..=end);
                    }
                    continue;
                }
                _ => {}
            }
        }
        members.push(c);
    }

    if negated {
        (0x21u8..=0x7e)
            .map(char::from)
            .filter(|c| !members.contains(c))
            .collect()
    } else {
        members
    }
}

fn escape_atom(escaped: char) -> Atom {
    match escaped {
        'd' => Atom::Class(('0'..='9').collect()),
        'D' => Atom::Class(('a'..='z').collect()),
        'w' => Atom::Class(word_chars()),
        'W' => Atom::Class(vec!['-', '!', '@', '#', '%', '&', '*']),
        's' => Atom::Class(vec![' ']),
        'S' => Atom::Class(('a'..='z').collect()),
        'n' => Atom::Literal('\n'),
        't' => Atom::Literal('\t'),
        // Zero-width assertions
        'b' | 'B' | 'A' | 'z' | 'Z' => Atom::Group(vec![Vec::new()]),
        other => Atom::Literal(other),
    }
}

fn word_chars() -> Vec<char> {
    ('a'..='z')
        .chain('A'..='Z')
        .chain('0'..='9')
        .chain(std::iter::once('_'))
        .collect()
}

/// Render one top-level branch, then grow the last unbounded piece or drop
/// optional repetitions from the end to steer the length into `length`
fn render_sized<R: Rng + ?Sized>(
    alternatives: &[Vec<Piece>],
    length: &RangeInclusive<usize>,
    rng: &mut R,
) -> String {
    if alternatives.is_empty() {
        return String::new();
    }
    let branch = &alternatives[rng.gen_range(0..alternatives.len())];

    let mut reps: Vec<Vec<String>> = branch
        .iter()
        .map(|piece| {
            let count = rng.gen_range(piece.min..=piece.max);
            (0..count).map(|_| render_atom(&piece.atom, rng)).collect()
        })
        .collect();
    let mut total: usize = reps.iter().flatten().map(|s| s.chars().count()).sum();

    let (min, max) = (*length.start(), *length.end());
    if total < min {
        let ceiling = max.max(min).min(min.saturating_add(UNBOUNDED_EXTRA as usize));
        let target = rng.gen_range(min..=ceiling);
        if let Some(idx) = branch.iter().rposition(|piece| piece.unbounded) {
            while total < target {
                let extra = render_atom(&branch[idx].atom, rng);
                let added = extra.chars().count();
                if added == 0 {
                    break;
                }
                total += added;
                reps[idx].push(extra);
            }
        }
    }

    for (piece, piece_reps) in branch.iter().zip(reps.iter_mut()).rev() {
        while total > max && piece_reps.len() > piece.min as usize {
            if let Some(dropped) = piece_reps.pop() {
                total -= dropped.chars().count();
            }
        }
    }

    reps.into_iter().flatten().collect()
}

fn render_alternatives<R: Rng + ?Sized>(alternatives: &[Vec<Piece>], rng: &mut R) -> String {
    let mut out = String::new();
    if alternatives.is_empty() {
        return out;
    }
    let branch = &alternatives[rng.gen_range(0..alternatives.len())];
    for piece in branch {
        let count = rng.gen_range(piece.min..=piece.max);
        for _ in 0..count {
            out.push_str(&render_atom(&piece.atom, rng));
        }
    }
    out
}

fn render_atom<R: Rng + ?Sized>(atom: &Atom, rng: &mut R) -> String {
    match atom {
        Atom::Literal(c) => c.to_string(),
        Atom::Class(set) if !set.is_empty() => set[rng.gen_range(0..set.len())].to_string(),
        Atom::Class(_) => String::new(),
        Atom::Group(inner) => render_alternatives(inner, rng),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn assert_generates(pattern: &str) {
        let mut rng = StdRng::seed_from_u64(11);
        let re = Regex::new(pattern).unwrap();
        for _ in 0..50 {
            let value = generate_from_pattern(pattern, 0..=usize::MAX, &mut rng);
            assert!(re.is_match(&value), "{:?} does not match {}", value, pattern);
        }
    }

    #[test]
    fn test_digit_and_repetition() {
        assert_generates(r"^\d{3}-\d{4}$");
    }

    #[test]
    fn test_character_classes() {
        assert_generates(r"^[A-Z][a-z0-9_]{2,6}$");
        assert_generates(r"^[^0-9]+$");
    }

    #[test]
    fn test_groups_and_alternation() {
        assert_generates(r"^(cat|dog|bird)s?$");
        assert_generates(r"^(?:[a-f0-9]{2}:){2}[a-f0-9]{2}$");
    }

    #[test]
    fn test_escaped_literals() {
        assert_generates(r"^v\d+\.\d+\.\d+$");
    }

    #[test]
    fn test_length_range_steers_unbounded_pieces() {
        let mut rng = StdRng::seed_from_u64(12);
        for _ in 0..50 {
            let long = generate_from_pattern("^[a-z]+$", 8..=12, &mut rng);
            assert!((8..=12).contains(&long.len()), "{:?}", long);
            assert!(long.chars().all(|c| c.is_ascii_lowercase()));

            let short = generate_from_pattern(r"^x\d*$", 1..=2, &mut rng);
            assert!((1..=2).contains(&short.len()), "{:?}", short);
            assert!(short.starts_with('x'));
        }
    }

    #[test]
    fn test_huge_open_repetition_is_capped() {
        assert_eq!(
            parse_repetition("4294967295,"),
            Some((MAX_REPETITION, MAX_REPETITION + UNBOUNDED_EXTRA, true))
        );
        assert_eq!(parse_repetition("2,5"), Some((2, 5, false)));
        assert_eq!(parse_repetition("x"), None);
    }

    #[test]
    fn test_pattern_matches() {
        assert_eq!(pattern_matches("^a+$", "aaa"), Some(true));
        assert_eq!(pattern_matches("^a+$", "b"), Some(false));
        assert_eq!(pattern_matches("(unclosed", "x"), None);
    }
}
