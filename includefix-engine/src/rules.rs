//! Rewrite rules: each rule recognizes one legacy shape of include path.
//!
//! Rules are data, not code. The set is ordered, first match wins, and a new
//! legacy convention is supported by appending a rule — never by branching
//! elsewhere. Every rule resolves to the same canonical bare-name spelling,
//! so two different legacy spellings of one header converge byte-identically.

/// The path shape a rule recognizes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleShape {
    /// One or more `../` segments, then optional directories, then the name
    /// (`"../Graphics.h"`, `"../../src/Graphics.h"`).
    ParentRelative,
    /// A known tree prefix, then optional directories, then the name
    /// (`"src/Entity/UFO.h"`, `"include/Game.h"`).
    RootPrefixed { prefixes: Vec<String> },
    /// One or more plain directory components, then the name
    /// (`"Entity/Graphics.h"`).
    Subfolder,
}

#[derive(Debug, Clone)]
pub struct RewriteRule {
    /// Stable identifier used in logs and `list-rules` output.
    pub id: &'static str,
    pub shape: RuleShape,
}

impl RewriteRule {
    /// If `path` has this rule's shape, return the header base name.
    pub fn recognize<'a>(&self, path: &'a str) -> Option<&'a str> {
        let segments: Vec<&str> = path.split('/').collect();
        match &self.shape {
            RuleShape::ParentRelative => {
                let ascents = segments.iter().take_while(|s| **s == "..").count();
                if ascents == 0 {
                    return None;
                }
                base_name(&segments[ascents..])
            }
            RuleShape::RootPrefixed { prefixes } => {
                let first = segments.first()?;
                if !prefixes.iter().any(|p| p == first) {
                    return None;
                }
                base_name(&segments[1..])
            }
            RuleShape::Subfolder => {
                if segments.len() < 2 {
                    return None;
                }
                base_name(&segments[1..])
            }
        }
    }
}

/// The remaining segments must all be plain; the last one is the name.
fn base_name<'a>(segments: &[&'a str]) -> Option<&'a str> {
    if segments.is_empty() || !segments.iter().all(|s| is_plain(s)) {
        return None;
    }
    segments.last().copied()
}

fn is_plain(segment: &str) -> bool {
    !segment.is_empty() && segment != "." && segment != ".." && !segment.contains('\\')
}

/// Ordered, immutable collection of rewrite rules.
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<RewriteRule>,
}

pub fn default_root_prefixes() -> Vec<String> {
    vec!["src".to_string(), "include".to_string()]
}

impl RuleSet {
    /// The built-in rules, in priority order.
    pub fn builtin(root_prefixes: Vec<String>) -> Self {
        Self {
            rules: vec![
                RewriteRule {
                    id: "parent-relative",
                    shape: RuleShape::ParentRelative,
                },
                RewriteRule {
                    id: "root-prefixed",
                    shape: RuleShape::RootPrefixed {
                        prefixes: root_prefixes,
                    },
                },
                RewriteRule {
                    id: "subfolder",
                    shape: RuleShape::Subfolder,
                },
            ],
        }
    }

    pub fn rules(&self) -> &[RewriteRule] {
        &self.rules
    }

    /// First rule recognizing `path`, with the extracted header name.
    pub fn recognize<'a>(&self, path: &'a str) -> Option<(&RewriteRule, &'a str)> {
        self.rules
            .iter()
            .find_map(|rule| rule.recognize(path).map(|name| (rule, name)))
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::builtin(default_root_prefixes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recognized(path: &str) -> Option<(&'static str, String)> {
        RuleSet::default()
            .recognize(path)
            .map(|(rule, name)| (rule.id, name.to_string()))
    }

    #[test]
    fn parent_relative_shapes() {
        assert_eq!(
            recognized("../Graphics.h"),
            Some(("parent-relative", "Graphics.h".to_string()))
        );
        assert_eq!(
            recognized("../../src/Graphics.h"),
            Some(("parent-relative", "Graphics.h".to_string()))
        );
        assert_eq!(
            recognized("../Entity/UFO.h"),
            Some(("parent-relative", "UFO.h".to_string()))
        );
    }

    #[test]
    fn root_prefixed_shapes() {
        assert_eq!(
            recognized("src/Graphics.h"),
            Some(("root-prefixed", "Graphics.h".to_string()))
        );
        assert_eq!(
            recognized("include/Entity/Enemy.h"),
            Some(("root-prefixed", "Enemy.h".to_string()))
        );
    }

    #[test]
    fn subfolder_shapes() {
        assert_eq!(
            recognized("Entity/Graphics.h"),
            Some(("subfolder", "Graphics.h".to_string()))
        );
        assert_eq!(
            recognized("Core/Audio/Mixer.h"),
            Some(("subfolder", "Mixer.h".to_string()))
        );
    }

    #[test]
    fn bare_names_match_no_rule() {
        assert_eq!(recognized("Graphics.h"), None);
    }

    #[test]
    fn malformed_paths_match_no_rule() {
        assert_eq!(recognized("Entity\\Graphics.h"), None);
        assert_eq!(recognized("./Graphics.h"), None);
        assert_eq!(recognized("Entity//Graphics.h"), None);
        assert_eq!(recognized("a/../Graphics.h"), None);
        assert_eq!(recognized("../"), None);
        assert_eq!(recognized(".."), None);
    }

    #[test]
    fn rule_order_is_stable() {
        let ids: Vec<&str> = RuleSet::default().rules().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["parent-relative", "root-prefixed", "subfolder"]);
    }

    #[test]
    fn custom_root_prefixes_are_honored() {
        let rules = RuleSet::builtin(vec!["engine".to_string()]);
        let (rule, name) = rules.recognize("engine/Core.h").expect("recognized");
        assert_eq!(rule.id, "root-prefixed");
        assert_eq!(name, "Core.h");

        // Without the prefix the same path falls through to the subfolder rule.
        let (rule, _) = rules.recognize("src/Core.h").expect("recognized");
        assert_eq!(rule.id, "subfolder");
    }
}
