//! Version ordering for registry version strings.
//!
//! Parsing never fails. Anything that cannot be understood sorts as the
//! lowest possible value for the position it appears in, so a garbage
//! installed version is never considered to contain a fix.

use std::cmp::Ordering;

/// Compares two version strings.
///
/// Handles an optional `v` prefix, `N!` epochs, numeric release segments
/// with implicit zero padding, pre-releases (`a`, `b`, `rc` and their
/// spelled-out aliases), post-releases, dev-releases and local labels
/// (ignored).
pub fn compare(a: &str, b: &str) -> Ordering {
    ParsedVersion::parse(a).cmp(&ParsedVersion::parse(b))
}

/// True when `candidate` is the same release as `baseline` or newer.
pub fn is_at_least(candidate: &str, baseline: &str) -> bool {
    compare(candidate, baseline) != Ordering::Less
}

/// True when `candidate` is strictly newer than `baseline`.
pub fn is_newer(candidate: &str, baseline: &str) -> bool {
    compare(candidate, baseline) == Ordering::Greater
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Part {
    Malformed,
    Number(u64),
}

impl Part {
    fn from_digits(digits: &str) -> Self {
        // Overlong digit runs saturate rather than becoming malformed.
        Part::Number(digits.parse().unwrap_or(u64::MAX))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum PreKind {
    Unknown,
    Alpha,
    Beta,
    ReleaseCandidate,
}

/// Position of a version relative to its final release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Phase {
    /// `1.0.dev1` sorts before every pre-release of 1.0
    DevOnly,
    PreRelease(PreKind, u64),
    Final,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum DevMarker {
    Dev(u64),
    None,
}

#[derive(Debug, Clone)]
struct ParsedVersion {
    epoch: Part,
    release: Vec<Part>,
    pre: Option<(PreKind, u64)>,
    post: Option<u64>,
    dev: Option<u64>,
}

#[derive(Debug, PartialEq)]
enum Token {
    Word(String),
    Number(u64),
}

fn keyword(word: &str) -> Option<Keyword> {
    match word {
        "a" | "alpha" => Some(Keyword::Pre(PreKind::Alpha)),
        "b" | "beta" => Some(Keyword::Pre(PreKind::Beta)),
        "c" | "rc" | "pre" | "preview" => Some(Keyword::Pre(PreKind::ReleaseCandidate)),
        "post" | "rev" | "r" => Some(Keyword::Post),
        "dev" => Some(Keyword::Dev),
        _ => None,
    }
}

enum Keyword {
    Pre(PreKind),
    Post,
    Dev,
}

impl ParsedVersion {
    fn parse(raw: &str) -> Self {
        let lowered = raw.trim().to_ascii_lowercase();
        let without_local = lowered.split('+').next().unwrap_or_default();
        let stripped = without_local
            .strip_prefix('v')
            .unwrap_or(without_local);

        let (epoch, rest) = match stripped.split_once('!') {
            Some((epoch, rest)) if !epoch.is_empty() && epoch.chars().all(|c| c.is_ascii_digit()) => {
                (Part::from_digits(epoch), rest)
            }
            Some((_, rest)) => (Part::Malformed, rest),
            None => (Part::Number(0), stripped),
        };

        let (release, suffix) = Self::parse_release(rest);
        let mut parsed = ParsedVersion {
            epoch,
            release,
            pre: None,
            post: None,
            dev: None,
        };
        parsed.apply_suffix(suffix);
        parsed
    }

    /// Reads `N(.N)*`, recording non-numeric dot segments as malformed.
    /// Returns the release parts and the unread suffix.
    fn parse_release(input: &str) -> (Vec<Part>, &str) {
        let mut release = Vec::new();
        let mut rest = input;

        loop {
            let digits_len = rest.bytes().take_while(u8::is_ascii_digit).count();
            if digits_len > 0 {
                release.push(Part::from_digits(&rest[..digits_len]));
                rest = &rest[digits_len..];
            } else {
                let segment = next_segment(rest);
                let reached_suffix = starts_with_keyword(segment);
                if reached_suffix && !release.is_empty() {
                    break;
                }
                release.push(Part::Malformed);
                if reached_suffix || segment.is_empty() {
                    break;
                }
                rest = &rest[segment.len()..];
            }

            match rest.strip_prefix('.') {
                Some(next) if !next.is_empty() && !starts_with_keyword(next_segment(next)) => {
                    rest = next
                }
                _ => break,
            }
        }

        (release, rest)
    }

    fn apply_suffix(&mut self, suffix: &str) {
        let tokens = tokenize(suffix);
        let mut iter = tokens.into_iter().peekable();

        while let Some(token) = iter.next() {
            match token {
                Token::Number(n) => {
                    // `1.0-1` is an implicit post release
                    if self.post.is_none() {
                        self.post = Some(n);
                    }
                }
                Token::Word(word) => {
                    let number = match iter.peek() {
                        Some(Token::Number(n)) => {
                            let n = *n;
                            iter.next();
                            n
                        }
                        _ => 0,
                    };
                    match keyword(&word) {
                        Some(Keyword::Pre(kind)) => {
                            if self.pre.is_none() {
                                self.pre = Some((kind, number));
                            }
                        }
                        Some(Keyword::Post) => self.post = Some(number),
                        Some(Keyword::Dev) => self.dev = Some(number),
                        None => {
                            if self.pre.is_none() {
                                self.pre = Some((PreKind::Unknown, number));
                            }
                        }
                    }
                }
            }
        }
    }

    fn phase(&self) -> Phase {
        match (self.pre, self.post, self.dev) {
            (Some((kind, n)), _, _) => Phase::PreRelease(kind, n),
            (None, None, Some(_)) => Phase::DevOnly,
            _ => Phase::Final,
        }
    }

    fn dev_marker(&self) -> DevMarker {
        match self.dev {
            Some(n) => DevMarker::Dev(n),
            None => DevMarker::None,
        }
    }
}

fn next_segment(input: &str) -> &str {
    let len = input.find(['.', '-', '_']).unwrap_or(input.len());
    &input[..len]
}

fn starts_with_keyword(segment: &str) -> bool {
    let word_len = segment
        .bytes()
        .take_while(u8::is_ascii_alphabetic)
        .count();
    keyword(&segment[..word_len]).is_some()
}

fn tokenize(suffix: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = suffix.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_ascii_digit() {
            let mut digits = String::new();
            while let Some(&d) = chars.peek() {
                if !d.is_ascii_digit() {
                    break;
                }
                digits.push(d);
                chars.next();
            }
            tokens.push(Token::Number(digits.parse().unwrap_or(u64::MAX)));
        } else if c.is_ascii_alphabetic() {
            let mut word = String::new();
            while let Some(&w) = chars.peek() {
                if !w.is_ascii_alphabetic() {
                    break;
                }
                word.push(w);
                chars.next();
            }
            tokens.push(Token::Word(word));
        } else {
            chars.next();
        }
    }

    tokens
}

impl Ord for ParsedVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.epoch
            .cmp(&other.epoch)
            .then_with(|| compare_release(&self.release, &other.release))
            .then_with(|| self.phase().cmp(&other.phase()))
            .then_with(|| self.post.cmp(&other.post))
            .then_with(|| self.dev_marker().cmp(&other.dev_marker()))
    }
}

impl PartialOrd for ParsedVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ParsedVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ParsedVersion {}

fn compare_release(a: &[Part], b: &[Part]) -> Ordering {
    let len = a.len().max(b.len());
    (0..len)
        .map(|i| {
            let left = a.get(i).copied().unwrap_or(Part::Number(0));
            let right = b.get(i).copied().unwrap_or(Part::Number(0));
            left.cmp(&right)
        })
        .find(|ordering| *ordering != Ordering::Equal)
        .unwrap_or(Ordering::Equal)
}
