use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Result, TbxError};

/// Matches every version; used for "newest version" lookups.
pub const ALL_VERSIONS: &str = "[0,)";

/// One parsed element of a version. `-` and digit/letter transitions open a
/// nested list, so `1-1` and `1.1` stay distinct.
#[derive(Debug, Clone)]
enum Item {
    Int(String),
    Str(String),
    List(Vec<Item>),
}

/// Known qualifiers in ascending order; the empty string is the release.
const QUALIFIERS: [&str; 7] = ["alpha", "beta", "milestone", "rc", "snapshot", "", "sp"];

impl Item {
    fn int(digits: &str) -> Self {
        let trimmed = digits.trim_start_matches('0');
        Item::Int(if trimmed.is_empty() { "0" } else { trimmed }.to_string())
    }

    fn qualifier(value: &str, followed_by_digit: bool) -> Self {
        let value = match value {
            "a" if followed_by_digit => "alpha",
            "b" if followed_by_digit => "beta",
            "m" if followed_by_digit => "milestone",
            "ga" | "final" | "release" => "",
            "cr" => "rc",
            other => other,
        };
        Item::Str(value.to_string())
    }

    fn token(is_digit: bool, token: &str) -> Self {
        if is_digit {
            Self::int(token)
        } else {
            Self::qualifier(token, false)
        }
    }

    fn is_null(&self) -> bool {
        match self {
            Item::Int(n) => n == "0",
            Item::Str(q) => q.is_empty(),
            Item::List(items) => items.is_empty(),
        }
    }
}

/// A repository version with Maven ordering semantics.
///
/// Numeric segments compare numerically, qualifiers by their well-known
/// rank (`alpha < beta < milestone < rc < snapshot < release < sp`), and
/// trailing zero or release segments are dropped, so `1.0 == 1` and
/// `1.0.0-SNAPSHOT == 1-SNAPSHOT`. A `-` starts a sub-list that sorts below
/// a plain numeric segment: `1-1 < 1.1`.
#[derive(Debug, Clone)]
pub struct Version {
    raw: String,
    items: Vec<Item>,
}

impl Version {
    pub fn parse(s: &str) -> Self {
        Self {
            raw: s.to_string(),
            items: parse_items(s),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn is_snapshot(&self) -> bool {
        self.raw.ends_with("SNAPSHOT")
    }
}

/// Strips null items from the end of a list, looking past nested lists.
fn normalize(items: &mut Vec<Item>) {
    let mut idx = items.len();
    while idx > 0 {
        idx -= 1;
        if items[idx].is_null() {
            items.remove(idx);
        } else if !matches!(items[idx], Item::List(_)) {
            break;
        }
    }
}

fn parse_items(version: &str) -> Vec<Item> {
    let version = version.to_ascii_lowercase();
    let mut current: Vec<Item> = Vec::new();
    let mut parents: Vec<Vec<Item>> = Vec::new();
    let mut is_digit = false;
    let mut start = 0;

    for (i, c) in version.char_indices() {
        match c {
            '.' | '-' => {
                if i == start {
                    current.push(Item::int("0"));
                } else {
                    current.push(Item::token(is_digit, &version[start..i]));
                }
                start = i + 1;
                if c == '-' {
                    parents.push(std::mem::take(&mut current));
                }
            }
            c if c.is_ascii_digit() => {
                if !is_digit && i > start {
                    current.push(Item::qualifier(&version[start..i], true));
                    start = i;
                    parents.push(std::mem::take(&mut current));
                }
                is_digit = true;
            }
            _ => {
                if is_digit && i > start {
                    current.push(Item::int(&version[start..i]));
                    start = i;
                    parents.push(std::mem::take(&mut current));
                }
                is_digit = false;
            }
        }
    }
    if version.len() > start {
        // a trailing `.qualifier` sorts like `-qualifier`
        if !is_digit && !current.is_empty() {
            parents.push(std::mem::take(&mut current));
        }
        current.push(Item::token(is_digit, &version[start..]));
    }

    loop {
        normalize(&mut current);
        match parents.pop() {
            Some(mut parent) => {
                parent.push(Item::List(current));
                current = parent;
            }
            None => return current,
        }
    }
}

fn compare_numbers(a: &str, b: &str) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn compare_qualifiers(a: &str, b: &str) -> Ordering {
    let rank = |q: &str| QUALIFIERS.iter().position(|k| *k == q);
    match (rank(a), rank(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

/// Compares an item against a missing one at the same position.
fn compare_to_missing(item: &Item) -> Ordering {
    match item {
        Item::Int(n) if n == "0" => Ordering::Equal,
        Item::Int(_) => Ordering::Greater,
        Item::Str(q) => compare_qualifiers(q, ""),
        Item::List(items) => items.first().map_or(Ordering::Equal, compare_to_missing),
    }
}

fn compare_items(a: &Item, b: &Item) -> Ordering {
    match (a, b) {
        (Item::Int(x), Item::Int(y)) => compare_numbers(x, y),
        (Item::Int(_), _) => Ordering::Greater,
        (Item::Str(_), Item::Int(_)) => Ordering::Less,
        (Item::Str(x), Item::Str(y)) => compare_qualifiers(x, y),
        (Item::Str(_), Item::List(_)) => Ordering::Less,
        (Item::List(_), Item::Int(_)) => Ordering::Less,
        (Item::List(_), Item::Str(_)) => Ordering::Greater,
        (Item::List(x), Item::List(y)) => compare_lists(x, y),
    }
}

fn compare_lists(a: &[Item], b: &[Item]) -> Ordering {
    for idx in 0..a.len().max(b.len()) {
        let ord = match (a.get(idx), b.get(idx)) {
            (Some(x), Some(y)) => compare_items(x, y),
            (Some(x), None) => compare_to_missing(x),
            (None, Some(y)) => compare_to_missing(y).reverse(),
            (None, None) => Ordering::Equal,
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_lists(&self.items, &other.items)
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl FromStr for Version {
    type Err = TbxError;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Version::parse(s))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Serialize for Version {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Version::parse(&s))
    }
}

#[derive(Debug, Clone)]
struct Bound {
    version: Version,
    inclusive: bool,
}

#[derive(Debug, Clone)]
struct Interval {
    lower: Option<Bound>,
    upper: Option<Bound>,
}

impl Interval {
    fn contains(&self, v: &Version) -> bool {
        let above = match &self.lower {
            None => true,
            Some(b) if b.inclusive => v >= &b.version,
            Some(b) => v > &b.version,
        };
        let below = match &self.upper {
            None => true,
            Some(b) if b.inclusive => v <= &b.version,
            Some(b) => v < &b.version,
        };
        above && below
    }
}

/// A version range such as `[1.0,2.0)`, `(,1.5]`, `[1.2]` or a union of
/// them. A bare version is treated as an exact match.
#[derive(Debug, Clone)]
pub struct VersionRange {
    intervals: Vec<Interval>,
}

impl VersionRange {
    /// Whether `spec` is written as a range rather than a plain version.
    pub fn is_range(spec: &str) -> bool {
        let spec = spec.trim_start();
        spec.starts_with('[') || spec.starts_with('(')
    }

    pub fn parse(spec: &str) -> Result<Self> {
        let invalid = |reason: &str| TbxError::VersionRange {
            coordinate: spec.to_string(),
            reason: reason.to_string(),
        };
        let spec = spec.trim();
        if spec.is_empty() {
            return Err(invalid("empty version range"));
        }
        if !spec.starts_with('[') && !spec.starts_with('(') {
            let exact = Version::parse(spec);
            return Ok(Self {
                intervals: vec![Interval {
                    lower: Some(Bound {
                        version: exact.clone(),
                        inclusive: true,
                    }),
                    upper: Some(Bound {
                        version: exact,
                        inclusive: true,
                    }),
                }],
            });
        }

        let mut intervals = Vec::new();
        let mut rest = spec;
        while !rest.is_empty() {
            let lower_inclusive = match rest.chars().next() {
                Some('[') => true,
                Some('(') => false,
                _ => return Err(invalid("expected '[' or '('")),
            };
            let close = rest
                .find([']', ')'])
                .ok_or_else(|| invalid("unterminated range"))?;
            let upper_inclusive = rest[close..].starts_with(']');
            let body = &rest[1..close];

            let interval = match body.split_once(',') {
                None => {
                    if !(lower_inclusive && upper_inclusive) || body.trim().is_empty() {
                        return Err(invalid("single-version ranges must use [x]"));
                    }
                    let exact = Version::parse(body.trim());
                    Interval {
                        lower: Some(Bound {
                            version: exact.clone(),
                            inclusive: true,
                        }),
                        upper: Some(Bound {
                            version: exact,
                            inclusive: true,
                        }),
                    }
                }
                Some((lo, hi)) => {
                    let bound = |s: &str, inclusive: bool| {
                        let s = s.trim();
                        (!s.is_empty()).then(|| Bound {
                            version: Version::parse(s),
                            inclusive,
                        })
                    };
                    Interval {
                        lower: bound(lo, lower_inclusive),
                        upper: bound(hi, upper_inclusive),
                    }
                }
            };
            intervals.push(interval);

            rest = rest[close + 1..].trim_start();
            if let Some(stripped) = rest.strip_prefix(',') {
                rest = stripped.trim_start();
            } else if !rest.is_empty() {
                return Err(invalid("ranges must be separated by ','"));
            }
        }
        Ok(Self { intervals })
    }

    pub fn contains(&self, version: &Version) -> bool {
        self.intervals.iter().any(|i| i.contains(version))
    }
}
