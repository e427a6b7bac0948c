//! Generates strings conforming to a regular expression (component B's
//! pattern branch). Walks the parsed HIR rather than the source pattern
//! directly, so alternation, character classes, and bounded repetition are
//! handled uniformly.

use rand::Rng;
use regex_syntax::hir::{Class, Hir, HirKind};
use regex_syntax::Parser;

use crate::error::{MeqaError, Result};

/// Generates a string matching `pattern`. `target_len` bounds how far
/// unbounded repetitions (`*`, `+`, `{n,}`) are allowed to grow.
pub fn generate(pattern: &str, target_len: usize, rng: &mut impl Rng) -> Result<String> {
    let hir = Parser::new()
        .parse(pattern)
        .map_err(|err| MeqaError::invalid(format!("invalid pattern {pattern:?}: {err}")))?;
    let mut out = String::new();
    render(&hir, target_len, rng, &mut out);
    Ok(out)
}

fn render(hir: &Hir, target_len: usize, rng: &mut impl Rng, out: &mut String) {
    match hir.kind() {
        HirKind::Empty | HirKind::Look(_) => {}
        HirKind::Literal(literal) => {
            out.push_str(&String::from_utf8_lossy(&literal.0));
        }
        HirKind::Class(class) => out.push(random_char(class, rng)),
        HirKind::Repetition(repetition) => {
            let max = repetition
                .max
                .unwrap_or_else(|| repetition.min + target_len as u32);
            let upper = max.max(repetition.min);
            let count = if upper > repetition.min {
                rng.gen_range(repetition.min..=upper)
            } else {
                repetition.min
            };
            for _ in 0..count {
                render(&repetition.sub, target_len, rng, out);
            }
        }
        HirKind::Capture(capture) => render(&capture.sub, target_len, rng, out),
        HirKind::Concat(parts) => {
            for part in parts {
                render(part, target_len, rng, out);
            }
        }
        HirKind::Alternation(branches) => {
            let index = rng.gen_range(0..branches.len());
            render(&branches[index], target_len, rng, out);
        }
    }
}

fn random_char(class: &Class, rng: &mut impl Rng) -> char {
    match class {
        Class::Unicode(class) => {
            let ranges = class.ranges();
            let total: u32 = ranges
                .iter()
                .map(|r| r.end() as u32 - r.start() as u32 + 1)
                .sum();
            let mut pick = rng.gen_range(0..total.max(1));
            for range in ranges {
                let span = range.end() as u32 - range.start() as u32 + 1;
                if pick < span {
                    return char::from_u32(range.start() as u32 + pick).unwrap_or('a');
                }
                pick -= span;
            }
            'a'
        }
        Class::Bytes(class) => {
            let ranges = class.ranges();
            let total: u32 = ranges
                .iter()
                .map(|r| r.end() as u32 - r.start() as u32 + 1)
                .sum();
            let mut pick = rng.gen_range(0..total.max(1));
            for range in ranges {
                let span = range.end() as u32 - range.start() as u32 + 1;
                if pick < span {
                    return (range.start() as u32 + pick) as u8 as char;
                }
                pick -= span;
            }
            'a'
        }
    }
}
