//! The fixed table of expansion operators.
//!
//! An operator is looked up by the comma-joined text of an interpolation's
//! expressions, e.g. `${X/a/b}` has the spelling `/,/`. Arguments reach the
//! operator as lazy thunks: an argument is evaluated only when (and each
//! time) the operator asks for it.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use super::pattern::{self, End, Extent};
use crate::error::{Error, Result};

/// A resolved value: `None` means unset, which is distinct from empty.
pub type Value = Option<String>;

/// A deferred argument evaluation.
pub type Thunk<'a> = Box<dyn Fn() -> Result<Value> + 'a>;

/// Lazily evaluated operator arguments.
pub struct Args<'a> {
    thunks: Vec<Thunk<'a>>,
}

impl<'a> Args<'a> {
    pub fn new(thunks: Vec<Thunk<'a>>) -> Self {
        Self { thunks }
    }

    /// Evaluate argument `index`; a missing argument is unset.
    pub fn eval(&self, index: usize) -> Result<Value> {
        match self.thunks.get(index) {
            Some(thunk) => thunk(),
            None => Ok(None),
        }
    }
}

/// Operator semantics: the variable's value plus the lazy arguments.
pub type Apply = fn(Value, &Args<'_>) -> Result<Value>;

/// One table entry.
pub struct Operator {
    /// Equivalent spellings, e.g. `[":-", "||"]`.
    pub symbols: &'static [&'static str],
    /// Number of arguments the operator takes.
    pub arity: usize,
    apply: Apply,
}

impl Operator {
    pub fn new(symbols: &'static [&'static str], apply: Apply) -> Self {
        let arity = symbols.first().map_or(0, |s| arity_of(s));
        Self {
            symbols,
            arity,
            apply,
        }
    }

    pub fn apply(&self, value: Value, args: &Args<'_>) -> Result<Value> {
        (self.apply)(value, args)
    }
}

impl std::fmt::Debug for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Operator")
            .field("symbols", &self.symbols)
            .field("arity", &self.arity)
            .finish()
    }
}

fn arity_of(spelling: &str) -> usize {
    if spelling.is_empty() {
        0
    } else {
        spelling.split(',').count()
    }
}

static BUILTIN: Lazy<OperatorTable> = Lazy::new(|| {
    OperatorTable::new(builtin_operators()).expect("builtin operator spellings must be unique")
});

/// Registry of operators keyed by spelling.
#[derive(Debug)]
pub struct OperatorTable {
    operators: Vec<Operator>,
    by_spelling: HashMap<&'static str, usize>,
}

impl OperatorTable {
    /// Build a table, rejecting spellings claimed by more than one entry.
    pub fn new(operators: Vec<Operator>) -> Result<Self> {
        let mut by_spelling = HashMap::new();
        for (index, operator) in operators.iter().enumerate() {
            for &spelling in operator.symbols {
                if by_spelling.insert(spelling, index).is_some() {
                    return Err(Error::DuplicateOperator {
                        spelling: spelling.to_string(),
                    });
                }
            }
        }
        Ok(Self {
            operators,
            by_spelling,
        })
    }

    /// The process-wide table of shell-style operators.
    pub fn builtin() -> &'static OperatorTable {
        &BUILTIN
    }

    pub fn find(&self, spelling: &str) -> Option<&Operator> {
        self.by_spelling
            .get(spelling)
            .map(|&index| &self.operators[index])
    }

    /// Whether some spelling starts with the segments `prior` followed by `next`.
    ///
    /// The tokenizer uses this to decide if operator characters inside an
    /// argument begin the next segment or are literal text.
    pub fn continues(&self, prior: &[String], next: &str) -> bool {
        self.by_spelling.keys().any(|spelling| {
            let mut segments = spelling.split(',');
            prior.iter().all(|p| segments.next() == Some(p.as_str()))
                && segments.next() == Some(next)
        })
    }
}

fn is_non_empty(value: &Value) -> bool {
    value.as_deref().is_some_and(|v| !v.is_empty())
}

fn empty() -> Value {
    Some(String::new())
}

fn builtin_operators() -> Vec<Operator> {
    vec![
        // plain interpolation
        Operator::new(&[""], |x, _| Ok(x)),
        // conditionals
        Operator::new(&[":-", "||"], |x, args| {
            if is_non_empty(&x) { Ok(x) } else { args.eval(0) }
        }),
        Operator::new(&["-", "??"], |x, args| {
            if x.is_some() { Ok(x) } else { args.eval(0) }
        }),
        Operator::new(&[":+", "&&"], |x, args| {
            if is_non_empty(&x) { args.eval(0) } else { Ok(empty()) }
        }),
        Operator::new(&["+"], |x, args| {
            if x.is_some() { args.eval(0) } else { Ok(empty()) }
        }),
        Operator::new(&["?,:"], |x, args| {
            if is_non_empty(&x) { args.eval(0) } else { args.eval(1) }
        }),
        // substrings
        Operator::new(&[":"], |x, args| {
            let start = offset(args.eval(0)?);
            Ok(Some(x.map(|x| slice(&x, start, None)).unwrap_or_default()))
        }),
        Operator::new(&[":,:"], |x, args| {
            let start = offset(args.eval(0)?);
            let length = match args.eval(1)? {
                Some(text) if !text.is_empty() => Some(parse_int(&text).unwrap_or(0)),
                _ => None,
            };
            Ok(Some(x.map(|x| slice(&x, start, length)).unwrap_or_default()))
        }),
        // prefix/suffix removal
        Operator::new(&["#"], |x, args| trim(x, args, End::Prefix, Extent::Shortest)),
        Operator::new(&["##"], |x, args| trim(x, args, End::Prefix, Extent::Longest)),
        Operator::new(&["%"], |x, args| trim(x, args, End::Suffix, Extent::Shortest)),
        Operator::new(&["%%"], |x, args| trim(x, args, End::Suffix, Extent::Longest)),
        // replacement
        Operator::new(&["/,/"], |x, args| substitute(x, args, false)),
        Operator::new(&["//,/"], |x, args| substitute(x, args, true)),
    ]
}

fn trim(x: Value, args: &Args<'_>, end: End, extent: Extent) -> Result<Value> {
    let Some(x) = x.filter(|x| !x.is_empty()) else {
        return Ok(empty());
    };
    match args.eval(0)? {
        Some(pattern) if !pattern.is_empty() => pattern::strip(&x, &pattern, end, extent).map(Some),
        _ => Ok(Some(x)),
    }
}

fn substitute(x: Value, args: &Args<'_>, all: bool) -> Result<Value> {
    let Some(x) = x.filter(|x| !x.is_empty()) else {
        return Ok(empty());
    };
    let pattern = match args.eval(0)? {
        Some(pattern) if !pattern.is_empty() => pattern,
        _ => return Ok(Some(x)),
    };
    let replacement = args.eval(1)?.unwrap_or_default();
    pattern::replace(&x, &pattern, &replacement, all).map(Some)
}

fn offset(arg: Value) -> i64 {
    arg.as_deref().and_then(parse_int).unwrap_or(0)
}

/// Leading integer of `text`: optional whitespace and sign, then digits.
///
/// Out-of-range values saturate.
fn parse_int(text: &str) -> Option<i64> {
    let text = text.trim_start();
    let (sign, digits) = match text.as_bytes().first() {
        Some(b'-') => (-1, &text[1..]),
        Some(b'+') => (1, &text[1..]),
        _ => (1, text),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    let magnitude = digits[..end].bytes().fold(0i64, |n, d| {
        n.saturating_mul(10).saturating_add(i64::from(d - b'0'))
    });
    Some(sign * magnitude)
}

/// Character slice from `start` (negative counts from the end), keeping
/// `length` characters (negative drops that many from the end).
fn slice(value: &str, start: i64, length: Option<i64>) -> String {
    let chars: Vec<char> = value.chars().collect();
    let len = chars.len() as i64;
    let from = if start < 0 { (len + start).max(0) } else { start.min(len) };
    let rest = &chars[from as usize..];
    let rest_len = rest.len() as i64;
    let to = match length {
        None => rest_len,
        Some(l) if l < 0 => (rest_len + l).max(0),
        Some(l) => l.min(rest_len),
    };
    rest[..to as usize].iter().collect()
}
