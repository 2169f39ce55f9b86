//! Line-oriented include rewriting.
//!
//! `rewrite_source` is a pure function of (text, rule set, mapping): no
//! hidden state, no dependency on traversal order. Canonical bare-name
//! references match no rule shape, so a second pass over rewritten text is
//! always a no-op.

use crate::rules::RuleSet;
use includefix_registry::{HeaderRegistry, Resolution};
use includefix_types::report::UnresolvedReason;
use regex::Regex;
use std::sync::LazyLock;
use tracing::trace;

/// Quoted include directive, shape-anchored: indentation and anything after
/// the closing quote (comments) are preserved verbatim. Angle-bracket system
/// includes never match.
static INCLUDE_DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^(?P<head>\s*#\s*include\s*)"(?P<path>[^"]+)"(?P<rest>.*)$"#).unwrap()
});

/// One include-style reference occurrence and what became of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceRecord {
    /// 1-based line number.
    pub line: u64,
    /// The reference path exactly as written in the source.
    pub reference: String,
    pub outcome: ReferenceOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceOutcome {
    /// A legacy shape was recognized and rewritten to the canonical spelling.
    Rewritten { canonical: String },
    /// The reference already uses the canonical bare-name spelling.
    AlreadyCanonical,
    /// Left byte-identical; the reason lands in the report.
    Unresolved { reason: UnresolvedReason },
}

#[derive(Debug, Clone)]
pub struct RewriteOutcome {
    pub text: String,
    pub changed: bool,
    pub records: Vec<ReferenceRecord>,
}

impl RewriteOutcome {
    pub fn unresolved(&self) -> impl Iterator<Item = (&ReferenceRecord, UnresolvedReason)> {
        self.records.iter().filter_map(|record| match record.outcome {
            ReferenceOutcome::Unresolved { reason } => Some((record, reason)),
            _ => None,
        })
    }
}

/// Rewrite every recognized include reference in `text` to its canonical
/// spelling. References that resolve to ambiguous or undiscovered names are
/// left byte-identical and recorded.
pub fn rewrite_source(text: &str, rules: &RuleSet, registry: &HeaderRegistry) -> RewriteOutcome {
    let mut records = Vec::new();
    let mut changed = false;

    let rewritten: Vec<String> = text
        .split('\n')
        .enumerate()
        .map(|(index, line)| {
            let line_no = index as u64 + 1;
            let Some(caps) = INCLUDE_DIRECTIVE.captures(line) else {
                return line.to_string();
            };
            let path = &caps["path"];

            let outcome = classify(path, rules, registry);
            if let ReferenceOutcome::Rewritten { canonical } = &outcome {
                trace!(reference = path, canonical = %canonical, "rewriting include");
                changed = true;
                let new_line = format!("{}\"{}\"{}", &caps["head"], canonical, &caps["rest"]);
                records.push(ReferenceRecord {
                    line: line_no,
                    reference: path.to_string(),
                    outcome,
                });
                return new_line;
            }
            records.push(ReferenceRecord {
                line: line_no,
                reference: path.to_string(),
                outcome,
            });
            line.to_string()
        })
        .collect();

    RewriteOutcome {
        text: rewritten.join("\n"),
        changed,
        records,
    }
}

fn classify(path: &str, rules: &RuleSet, registry: &HeaderRegistry) -> ReferenceOutcome {
    if !path.contains('/') && !path.contains('\\') {
        // Bare name: canonical spelling, or a reference to a header that was
        // never discovered.
        return match registry.resolve(path) {
            Resolution::Canonical(_) => ReferenceOutcome::AlreadyCanonical,
            Resolution::Ambiguous => ReferenceOutcome::Unresolved {
                reason: UnresolvedReason::AmbiguousHeader,
            },
            Resolution::Unknown => ReferenceOutcome::Unresolved {
                reason: UnresolvedReason::MissingHeader,
            },
        };
    }

    let Some((_rule, name)) = rules.recognize(path) else {
        return ReferenceOutcome::Unresolved {
            reason: UnresolvedReason::UnrecognizedShape,
        };
    };

    match registry.resolve(name) {
        Resolution::Canonical(entry) => ReferenceOutcome::Rewritten {
            canonical: entry.name.clone(),
        },
        Resolution::Ambiguous => ReferenceOutcome::Unresolved {
            reason: UnresolvedReason::AmbiguousHeader,
        },
        Resolution::Unknown => ReferenceOutcome::Unresolved {
            reason: UnresolvedReason::MissingHeader,
        },
    }
}
