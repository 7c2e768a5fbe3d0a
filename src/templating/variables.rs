//! Report of the top-level variables a Tera template reads.
//!
//! This is a lexical scan, not a parse. It finds the root name of every
//! variable reference inside `{{ ... }}` expressions and inside `if`, `elif`,
//! `for` and `set` tags. Names bound by `for` loops or `set` are removed from
//! the result, as are filter names, test names, function calls, keyword
//! arguments and string literals. `{% raw %}` blocks and comments are skipped.
//!
//! ```
//! use memofill::templating::variables::referenced_variables;
//!
//! let template = "{{ cover.property_name }}\n\
//!                 {% for row in sources_list %}{{ row.label | upper }}{% endfor %}";
//! let names: Vec<String> = referenced_variables(template).into_iter().collect();
//! assert_eq!(names, vec!["cover", "sources_list"]);
//! ```

use regex::Regex;
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::sync::LazyLock;

/// Words that are never variable names.
const KEYWORDS: &[&str] =
    &["and", "or", "not", "in", "is", "if", "else", "true", "false", "True", "False", "none", "None"];

/// Top-level names a template reads, sorted.
pub fn referenced_variables(template: &str) -> BTreeSet<String> {
    static TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?s)\{\{-?(.*?)-?\}\}|\{%-?(.*?)-?%\}|\{#.*?#\}").expect("valid regex")
    });

    let mut referenced = BTreeSet::new();
    let mut bound = BTreeSet::new();
    let mut in_raw = false;

    for caps in TAG_RE.captures_iter(template) {
        if let Some(expression) = caps.get(1) {
            if !in_raw {
                root_names(expression.as_str(), &mut referenced);
            }
            continue;
        }
        let Some(tag) = caps.get(2) else {
            continue;
        };
        let tag = tag.as_str().trim();
        let (keyword, rest) = tag.split_once(char::is_whitespace).unwrap_or((tag, ""));

        if in_raw {
            in_raw = keyword != "endraw";
            continue;
        }
        match keyword {
            "raw" => in_raw = true,
            "if" | "elif" => root_names(rest, &mut referenced),
            "for" => {
                if let Some((targets, iterable)) = rest.split_once(" in ") {
                    for target in targets.split(',') {
                        bound.insert(target.trim().to_string());
                    }
                    bound.insert("loop".to_string());
                    root_names(iterable, &mut referenced);
                }
            }
            "set" | "set_global" => {
                if let Some((target, value)) = rest.split_once('=') {
                    bound.insert(target.trim().to_string());
                    root_names(value, &mut referenced);
                }
            }
            _ => {}
        }
    }

    referenced.retain(|name| !bound.contains(name));
    referenced
}

/// Referenced names absent from a context's top level, sorted.
pub fn missing_variables(template: &str, context: &Map<String, Value>) -> Vec<String> {
    referenced_variables(template).into_iter().filter(|name| !context.contains_key(name)).collect()
}

/// Collect the root identifiers of one expression.
fn root_names(expression: &str, out: &mut BTreeSet<String>) {
    let chars: Vec<char> = expression.chars().collect();
    let mut i = 0;
    // Last significant punctuation, or 'i' after the `is` keyword
    let mut previous: Option<char> = None;

    while i < chars.len() {
        let ch = chars[i];
        if ch == '\'' || ch == '"' || ch == '`' {
            i += 1;
            while i < chars.len() && chars[i] != ch {
                i += 1;
            }
            i += 1;
            previous = Some('s');
            continue;
        }
        if ch.is_ascii_digit() {
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '.') {
                i += 1;
            }
            previous = Some('0');
            continue;
        }
        if ch.is_alphabetic() || ch == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            let word: String = chars[start..i].iter().collect();
            let next = chars[i..].iter().position(|c| !c.is_whitespace()).map(|offset| i + offset);
            let next_char = next.map(|index| chars[index]);
            let is_call = next_char == Some('(');
            let is_kwarg =
                next_char == Some('=') && next.and_then(|index| chars.get(index + 1)) != Some(&'=');

            if word == "is" {
                previous = Some('i');
                continue;
            }
            if word == "not" && previous == Some('i') {
                continue;
            }
            let skip = matches!(previous, Some('.' | '|' | 'i'))
                || is_call
                || is_kwarg
                || KEYWORDS.contains(&word.as_str());
            if !skip {
                out.insert(word);
            }
            previous = Some('w');
            continue;
        }
        if !ch.is_whitespace() {
            previous = Some(ch);
        }
        i += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn names(template: &str) -> Vec<String> {
        referenced_variables(template).into_iter().collect()
    }

    #[test]
    fn test_expression_heads_and_attributes() {
        assert_eq!(
            names("{{ cover.property_name }} {{ sections.market['narrative'] }} {{- LTV -}}"),
            vec!["LTV", "cover", "sections"]
        );
    }

    #[test]
    fn test_filters_tests_and_literals_are_skipped() {
        let template = r#"{{ loan_amount | currency(style="deal") }}
{% if narrative is defined and narrative is not starting_with("See") %}{{ "literal text" }}{% endif %}
{{ range(end=3) }}"#;
        assert_eq!(names(template), vec!["loan_amount", "narrative"]);
    }

    #[test]
    fn test_loop_and_set_bindings_are_excluded() {
        let template = "{% for k, v in deal_facts %}{{ k }}: {{ v }} {{ loop.index }}{% endfor %}\n\
                        {% set total = sources_total %}{{ total }}\n\
                        {% elif risk_items %}";
        assert_eq!(names(template), vec!["deal_facts", "risk_items", "sources_total"]);
    }

    #[test]
    fn test_raw_blocks_and_comments_are_skipped() {
        let template = "{# {{ hidden }} #}{% raw %}{{ literal }}{% endraw %}{{ shown }}";
        assert_eq!(names(template), vec!["shown"]);
    }

    #[test]
    fn test_missing_variables() {
        let context = json!({"cover": {}, "LTV": "62.50%"});
        let missing = missing_variables(
            "{{ cover.memo_title }} {{ LTV }} {{ LTC }} {% for s in sponsors %}{% endfor %}",
            context.as_object().unwrap(),
        );
        assert_eq!(missing, vec!["LTC", "sponsors"]);
    }
}
