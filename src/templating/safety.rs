//! Template-safety pass over a flattened context.
//!
//! Three rules, applied in this order by [`make_template_safe`]:
//!
//! 1. **Escaping**: every string value has its Tera delimiter pairs
//!    (`{{ }}`, `{% %}`, `{# #}`) broken up with a space, so generated
//!    narrative text can never be parsed as live template syntax.
//! 2. **List guards**: paths the template loops over are forced to lists.
//! 3. **`items` synthesis**: every nested mapping gets a list-valued `items`
//!    member holding its own `[key, value]` pairs, so `{% for pair in x.items %}`
//!    works on any mapping down to [`MAX_ITEMS_DEPTH`].
//!
//! [`MappingView`] reads the result back without the synthesized member.

use serde_json::{Map, Value};
use std::borrow::Cow;
use tracing::debug;

/// Name of the synthesized pair-list member.
pub const ITEMS_KEY: &str = "items";

/// Dotted paths that must hold lists.
pub const LIST_GUARDS: &[&str] = &[
    "sponsors",
    "loan_issues.income_producing",
    "loan_issues.development",
    "loan_issues_income_producing",
    "loan_issues_development",
    "collaborative_ventures_list",
    "sponsor_table",
    "sources_list",
    "uses_list",
    "capital_stack_sources",
    "capital_stack_uses",
    "disbursement_rows",
    "images",
];

/// Run escaping, list guards and `items` synthesis over a context.
pub fn make_template_safe(context: &mut Map<String, Value>) {
    for value in context.values_mut() {
        escape_value(value);
    }
    apply_list_guards(context);
    synthesize_items(context);
    debug!(keys = context.len(), "Context made template-safe");
}

/// Whether `a` followed by `b` forms a Tera delimiter.
fn is_delimiter_pair(a: char, b: char) -> bool {
    matches!((a, b), ('{', '{') | ('}', '}') | ('{', '%') | ('%', '}') | ('{', '#') | ('#', '}'))
}

/// Break up every Tera delimiter pair by inserting a space.
///
/// Runs such as `{{{` become `{ { {`. Text without delimiters is returned
/// borrowed, and already-escaped text comes back unchanged.
///
/// ```
/// use memofill::templating::safety::escape_delimiters;
///
/// assert_eq!(escape_delimiters("{{ rate }}"), "{ { rate } }");
/// assert_eq!(escape_delimiters("{% if x %}"), "{ % if x % }");
/// assert_eq!(escape_delimiters("plain text"), "plain text");
/// ```
pub fn escape_delimiters(text: &str) -> Cow<'_, str> {
    let has_pair = text.chars().zip(text.chars().skip(1)).any(|(a, b)| is_delimiter_pair(a, b));
    if !has_pair {
        return Cow::Borrowed(text);
    }

    let mut escaped = String::with_capacity(text.len() + 8);
    let mut previous: Option<char> = None;
    for ch in text.chars() {
        if previous.is_some_and(|prev| is_delimiter_pair(prev, ch)) {
            escaped.push(' ');
        }
        escaped.push(ch);
        previous = Some(ch);
    }
    Cow::Owned(escaped)
}

/// Escape every string inside a value. Mapping keys are left alone.
pub fn escape_value(value: &mut Value) {
    match value {
        Value::String(text) => {
            if let Cow::Owned(escaped) = escape_delimiters(text) {
                *text = escaped;
            }
        }
        Value::Array(items) => items.iter_mut().for_each(escape_value),
        Value::Object(fields) => fields.values_mut().for_each(escape_value),
        _ => {}
    }
}

/// Force every [`LIST_GUARDS`] path to a list.
///
/// A missing top-level path becomes `[]`. A nested path is only guarded when
/// its parent mapping exists. `sponsors` given as a mapping becomes its values;
/// any other non-list becomes `[]`.
pub fn apply_list_guards(context: &mut Map<String, Value>) {
    for path in LIST_GUARDS {
        let (parent, key) = match path.rsplit_once('.') {
            Some((parent, key)) => match context.get_mut(parent) {
                Some(Value::Object(parent)) => (parent, key),
                _ => continue,
            },
            None => (&mut *context, *path),
        };

        let replacement = match parent.get(key) {
            Some(Value::Array(_)) => continue,
            Some(Value::Object(fields)) if key == "sponsors" => {
                Value::Array(fields.values().cloned().collect())
            }
            Some(other) => {
                debug!(path = *path, found = ?other, "Replacing non-list value with an empty list");
                Value::Array(Vec::new())
            }
            None => Value::Array(Vec::new()),
        };
        parent.insert(key.to_string(), replacement);
    }
}

/// Deepest nesting level that receives a synthesized `items` member.
///
/// Top-level context values are level 1, and every list or mapping below
/// adds a level. Each synthesized pair list copies its mapping's members
/// once, so a value is copied at most once per mapping above it down to this
/// level, and the safe context stays within a constant factor of its input.
pub const MAX_ITEMS_DEPTH: usize = 8;

/// Give every nested mapping down to [`MAX_ITEMS_DEPTH`] a list-valued `items` member.
///
/// Pairs are taken from a mapping's original members before its children are
/// completed, so a pair value never carries a synthesized `items` of its own.
/// The root itself is skipped. A list-valued `items` is kept as is.
pub fn synthesize_items(context: &mut Map<String, Value>) {
    for value in context.values_mut() {
        ensure_items(value, 1);
    }
}

fn ensure_items(value: &mut Value, depth: usize) {
    if depth > MAX_ITEMS_DEPTH {
        return;
    }
    match value {
        Value::Array(items) => items.iter_mut().for_each(|item| ensure_items(item, depth + 1)),
        Value::Object(fields) => {
            let pairs = if fields.get(ITEMS_KEY).is_some_and(Value::is_array) {
                None
            } else {
                Some(
                    fields
                        .iter()
                        .filter(|(key, _)| key.as_str() != ITEMS_KEY)
                        .map(|(key, value)| Value::Array(vec![Value::String(key.clone()), value.clone()]))
                        .collect::<Vec<_>>(),
                )
            };
            for child in fields.values_mut() {
                ensure_items(child, depth + 1);
            }
            if let Some(pairs) = pairs {
                fields.insert(ITEMS_KEY.to_string(), Value::Array(pairs));
            }
        }
        _ => {}
    }
}

/// Borrowed read-only view over a template-safe mapping.
///
/// Key lookup sees every member. [`MappingView::items`] yields the original
/// key/value pairs, leaving out a synthesized `items` member.
#[derive(Debug, Clone, Copy)]
pub struct MappingView<'a> {
    map: &'a Map<String, Value>,
}

impl<'a> MappingView<'a> {
    pub fn new(map: &'a Map<String, Value>) -> Self {
        Self {
            map,
        }
    }

    /// View over a value, `None` unless it is a mapping.
    pub fn of(value: &'a Value) -> Option<Self> {
        value.as_object().map(Self::new)
    }

    pub fn get(&self, key: &str) -> Option<&'a Value> {
        self.map.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    /// Nested mapping under `key`.
    pub fn view(&self, key: &str) -> Option<MappingView<'a>> {
        self.map.get(key).and_then(Self::of)
    }

    /// Original key/value pairs in insertion order.
    pub fn items(&self) -> impl Iterator<Item = (&'a str, &'a Value)> + 'a {
        let skip_items = self.has_synthesized_items();
        self.map
            .iter()
            .filter(move |(key, _)| !(skip_items && key.as_str() == ITEMS_KEY))
            .map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.items().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `items` pairs up the other members' keys, in order.
    ///
    /// Keys only: a pair value is the member as it was before its own
    /// `items` was added.
    fn has_synthesized_items(&self) -> bool {
        let Some(Value::Array(pairs)) = self.map.get(ITEMS_KEY) else {
            return false;
        };
        let mut keys = self.map.keys().filter(|key| key.as_str() != ITEMS_KEY);
        pairs.len() + 1 == self.map.len()
            && pairs.iter().all(|pair| match pair.as_array().map(Vec::as_slice) {
                Some([Value::String(key), _]) => keys.next() == Some(key),
                _ => false,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("fixture must be an object"),
        }
    }

    #[test]
    fn test_escapes_every_delimiter_pair() {
        assert_eq!(escape_delimiters("{{ a }} {% b %} {# c #}"), "{ { a } } { % b % } { # c # }");
        assert_eq!(escape_delimiters("{{{x}}}"), "{ { {x} } }");
    }

    #[test]
    fn test_escaping_is_stable_and_lossless() {
        let text = "Rate {{ SOFR }} + 450, see {% note %}";
        let once = escape_delimiters(text).into_owned();
        let twice = escape_delimiters(&once).into_owned();
        assert_eq!(once, twice);
        assert!(!once.contains("{{") && !once.contains("}}") && !once.contains("{%"));
        assert_eq!(once.replace(' ', ""), text.replace(' ', ""));
    }

    #[test]
    fn test_text_without_delimiters_is_borrowed() {
        assert!(matches!(escape_delimiters("100% of {cost}"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_escape_value_leaves_keys() {
        let mut value = json!({"{{key}}": ["{{ a }}", {"b": "{% c %}"}], "n": 4});
        escape_value(&mut value);
        assert_eq!(value, json!({"{{key}}": ["{ { a } }", {"b": "{ % c % }"}], "n": 4}));
    }

    #[test]
    fn test_list_guards() {
        let mut context = object(json!({
            "sponsors": {"a": {"name": "Steve Hudson"}, "b": {"name": "Ana Mendez"}},
            "loan_issues": {"income_producing": "none", "development": ["Entitlement"]},
            "sources_list": null,
            "uses_list": [{"label": "Payoff"}]
        }));
        apply_list_guards(&mut context);

        assert_eq!(context["sponsors"], json!([{"name": "Steve Hudson"}, {"name": "Ana Mendez"}]));
        assert_eq!(context["loan_issues"]["income_producing"], json!([]));
        assert_eq!(context["loan_issues"]["development"], json!(["Entitlement"]));
        assert_eq!(context["sources_list"], json!([]));
        assert_eq!(context["uses_list"], json!([{"label": "Payoff"}]));
        assert_eq!(context["images"], json!([]));
        assert_eq!(context["disbursement_rows"], json!([]));
    }

    #[test]
    fn test_nested_guard_needs_parent() {
        let mut context = Map::new();
        apply_list_guards(&mut context);
        assert!(!context.contains_key("loan_issues"));
        assert_eq!(context["loan_issues_development"], json!([]));
    }

    #[test]
    fn test_items_pairs_carry_original_members() {
        let mut context = object(json!({
            "deal_facts": {"property_type": "Retail", "address": {"city": "Tampa"}},
            "deal_highlights": {"items": [{"highlight": "Anchored"}]},
            "label": "root scalar"
        }));
        synthesize_items(&mut context);

        assert!(!context.contains_key(ITEMS_KEY));
        let facts = &context["deal_facts"];
        assert_eq!(facts["address"]["items"], json!([["city", "Tampa"]]));
        assert_eq!(facts["items"][0], json!(["property_type", "Retail"]));
        assert_eq!(facts["items"][1], json!(["address", {"city": "Tampa"}]));
        // Existing list-valued items are kept, their elements still completed
        assert_eq!(context["deal_highlights"]["items"][0]["highlight"], "Anchored");
        assert_eq!(
            context["deal_highlights"]["items"][0]["items"],
            json!([["highlight", "Anchored"]])
        );
    }

    fn nested_chain(depth: usize) -> Value {
        (0..depth).fold(json!({"x": 1}), |inner, level| json!({format!("k{level}"): inner, "x": 1}))
    }

    #[test]
    fn test_deep_nesting_stays_linear() {
        for depth in [10, 20, 40] {
            let chain = nested_chain(depth);
            let input_bytes = chain.to_string().len();
            let mut context = object(json!({"rent_roll": chain}));
            make_template_safe(&mut context);

            let safe_bytes = context["rent_roll"].to_string().len();
            assert!(
                safe_bytes <= input_bytes * (MAX_ITEMS_DEPTH + 2),
                "depth {depth}: {input_bytes} input bytes grew to {safe_bytes}"
            );
        }
    }

    #[test]
    fn test_items_stop_below_max_depth() {
        let mut context = object(json!({"rent_roll": nested_chain(MAX_ITEMS_DEPTH + 2)}));
        synthesize_items(&mut context);

        let mut node = &context["rent_roll"];
        for level in 1..=MAX_ITEMS_DEPTH + 2 {
            assert_eq!(node.get(ITEMS_KEY).is_some(), level <= MAX_ITEMS_DEPTH, "level {level}");
            let view = MappingView::of(node).unwrap();
            let keys: Vec<&str> = view.items().map(|(key, _)| key).collect();
            assert_eq!(keys.len(), 2, "level {level}");
            assert!(keys.contains(&"x"));
            node = view.items().find(|(key, _)| key.starts_with('k')).unwrap().1;
        }
    }

    #[test]
    fn test_non_list_items_member_is_replaced() {
        let mut context = object(json!({"box": {"items": 3, "color": "red"}}));
        synthesize_items(&mut context);
        assert_eq!(context["box"]["items"], json!([["color", "red"]]));
    }

    #[test]
    fn test_mapping_view_yields_original_pairs() {
        let mut context = object(json!({
            "deal_facts": {"property_type": "Retail", "year_built": 1998},
            "deal_highlights": {"items": [{"highlight": "Anchored"}]}
        }));
        make_template_safe(&mut context);

        let root = MappingView::new(&context);
        let facts = root.view("deal_facts").unwrap();
        let pairs: Vec<(&str, &Value)> = facts.items().collect();
        assert_eq!(pairs, vec![("property_type", &json!("Retail")), ("year_built", &json!(1998))]);
        assert!(facts.contains_key(ITEMS_KEY));
        assert_eq!(facts.len(), 2);

        // A genuine items list is an original pair
        let highlights = root.view("deal_highlights").unwrap();
        assert_eq!(highlights.items().map(|(key, _)| key).collect::<Vec<_>>(), vec!["items"]);
    }
}
