use super::ast::{CompareOp, Connector, FilterTree, Predicate};
use super::operand::Operand;
use serde_yaml::Value as YamlValue;
use std::cmp::Ordering;

impl FilterTree {
    pub fn matches(&self, record: &YamlValue) -> bool {
        self.all.iter().all(|p| evaluate(p, record))
            && (self.any.is_empty() || self.any.iter().any(|p| evaluate(p, record)))
    }
}

/// Evaluates a predicate against one record the way a SQL engine would:
/// a missing or null field fails every clause except `IS NULL`.
pub fn evaluate(predicate: &Predicate, record: &YamlValue) -> bool {
    match predicate {
        Predicate::Compare { field, op, value } => {
            any_value(record, field, |v| eval_compare(v, *op, value))
        }
        Predicate::Pattern {
            field,
            negated,
            pattern,
        } => any_value(record, field, |v| {
            yaml_to_string(v).map(|s| like_match(&s, pattern) != *negated)
        }),
        Predicate::Membership {
            field,
            negated,
            values,
        } => any_value(record, field, |v| {
            let found = values
                .iter()
                .any(|candidate| compare_values(v, candidate) == Some(Ordering::Equal));
            Some(found != *negated)
        }),
        Predicate::Range {
            field,
            negated,
            low,
            high,
        } => any_value(record, field, |v| {
            let above = compare_values(v, low)?.is_ge();
            let below = compare_values(v, high)?.is_le();
            Some((above && below) != *negated)
        }),
        Predicate::NullCheck { field, negated } => {
            let is_null = get_field(record, field).map_or(true, YamlValue::is_null);
            is_null != *negated
        }
        Predicate::Relation { path, predicate } => related(record, path)
            .into_iter()
            .any(|r| evaluate(predicate, r)),
        Predicate::Group {
            connector: Connector::And,
            children,
        } => children.iter().all(|p| evaluate(p, record)),
        Predicate::Group {
            connector: Connector::Or,
            children,
        } => children.is_empty() || children.iter().any(|p| evaluate(p, record)),
    }
}

fn get_field<'a>(record: &'a YamlValue, field: &str) -> Option<&'a YamlValue> {
    let mapping = record.as_mapping()?;
    if let Some(value) = mapping.get(field) {
        return Some(value);
    }
    for (key, value) in mapping {
        if let Some(key_str) = key.as_str() {
            if key_str.eq_ignore_ascii_case(field) {
                return Some(value);
            }
        }
    }
    None
}

/// Applies `check` to the field, or to each element when the field holds a list.
fn any_value<F>(record: &YamlValue, field: &str, check: F) -> bool
where
    F: Fn(&YamlValue) -> Option<bool>,
{
    match get_field(record, field) {
        None | Some(YamlValue::Null) => false,
        Some(YamlValue::Sequence(items)) => items.iter().any(|item| check(item).unwrap_or(false)),
        Some(value) => check(value).unwrap_or(false),
    }
}

/// Records reached by following `path`; lists fan out, non-mappings are dropped.
fn related<'a>(record: &'a YamlValue, path: &str) -> Vec<&'a YamlValue> {
    let mut current = vec![record];
    for segment in path.split('.') {
        current = current
            .into_iter()
            .filter_map(|r| get_field(r, segment))
            .flat_map(|v| match v {
                YamlValue::Sequence(items) => items.iter().collect::<Vec<_>>(),
                other => vec![other],
            })
            .filter(|v| v.is_mapping())
            .collect();
    }
    current
}

fn eval_compare(value: &YamlValue, op: CompareOp, operand: &Operand) -> Option<bool> {
    let ord = compare_values(value, operand)?;
    Some(match op {
        CompareOp::Eq => ord.is_eq(),
        CompareOp::Ne => ord.is_ne(),
        CompareOp::Gt => ord.is_gt(),
        CompareOp::Lt => ord.is_lt(),
        CompareOp::Ge => ord.is_ge(),
        CompareOp::Le => ord.is_le(),
    })
}

fn compare_values(value: &YamlValue, operand: &Operand) -> Option<Ordering> {
    if matches!(operand, Operand::Null | Operand::List(_)) {
        return None;
    }

    if let (Some(a), Some(b)) = (yaml_to_bool(value), operand_to_bool(operand)) {
        if value.is_bool() || matches!(operand, Operand::Bool(_)) {
            return Some(a.cmp(&b));
        }
    }

    if let (Some(a), Some(b)) = (yaml_to_number(value), operand_to_number(operand)) {
        return a.partial_cmp(&b);
    }

    let a = yaml_to_string(value)?.to_lowercase();
    let b = operand.pattern_text()?.to_lowercase();
    Some(a.cmp(&b))
}

fn yaml_to_string(v: &YamlValue) -> Option<String> {
    match v {
        YamlValue::String(s) => Some(s.clone()),
        YamlValue::Number(n) => Some(n.to_string()),
        YamlValue::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn yaml_to_number(v: &YamlValue) -> Option<f64> {
    match v {
        YamlValue::Number(n) => n.as_f64(),
        YamlValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn yaml_to_bool(v: &YamlValue) -> Option<bool> {
    match v {
        YamlValue::Bool(b) => Some(*b),
        YamlValue::String(s) => parse_bool(s),
        YamlValue::Number(n) => match n.as_i64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        _ => None,
    }
}

fn operand_to_number(op: &Operand) -> Option<f64> {
    match op {
        Operand::Int(i) => Some(*i as f64),
        Operand::Float(f) => Some(*f),
        Operand::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn operand_to_bool(op: &Operand) -> Option<bool> {
    match op {
        Operand::Bool(b) => Some(*b),
        Operand::Int(0) => Some(false),
        Operand::Int(1) => Some(true),
        Operand::String(s) => parse_bool(s),
        _ => None,
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

enum LikeToken {
    AnyRun,
    AnyChar,
    Literal(char),
}

fn tokenize_like(pattern: &str) -> Vec<LikeToken> {
    let mut tokens = Vec::new();
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        tokens.push(match c {
            '%' => LikeToken::AnyRun,
            '_' => LikeToken::AnyChar,
            '\\' => LikeToken::Literal(chars.next().unwrap_or('\\')),
            other => LikeToken::Literal(other),
        });
    }
    tokens
}

/// Case-insensitive SQL `LIKE`: `%` matches any run, `_` one character, `\` escapes.
pub fn like_match(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.to_lowercase().chars().collect();
    let tokens = tokenize_like(&pattern.to_lowercase());

    let (mut t, mut p) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        match tokens.get(p) {
            Some(LikeToken::AnyRun) => {
                backtrack = Some((p, t));
                p += 1;
            }
            Some(LikeToken::AnyChar) => {
                t += 1;
                p += 1;
            }
            Some(LikeToken::Literal(c)) if *c == text[t] => {
                t += 1;
                p += 1;
            }
            _ => {
                let Some((run_p, run_t)) = backtrack else {
                    return false;
                };
                p = run_p + 1;
                t = run_t + 1;
                backtrack = Some((run_p, run_t + 1));
            }
        }
    }

    tokens[p..].iter().all(|tok| matches!(tok, LikeToken::AnyRun))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{AllowList, Compiler};
    use crate::request::{FilterKeys, FilterSpec};
    use serde_yaml::from_str;

    fn tree(request: &str) -> FilterTree {
        let req: YamlValue = from_str(request).unwrap();
        let compiler = Compiler::new(AllowList::new(
            ["status", "age", "name", "tags", "deleted_at", "active"],
            ["author", "comments"],
        ));
        compiler.compile(&FilterSpec::from_request(&req, &FilterKeys::default()))
    }

    fn record(yaml: &str) -> YamlValue {
        from_str(yaml).unwrap()
    }

    #[test]
    fn test_like_match() {
        assert!(like_match("Hello World", "%world%"));
        assert!(like_match("hello", "h_llo"));
        assert!(like_match("abc", "abc"));
        assert!(like_match("", "%"));
        assert!(like_match("aXbXc", "a%b%c"));
        assert!(!like_match("abc", "ab"));
        assert!(!like_match("abc", "%d%"));
        assert!(like_match("100%", "100\\%"));
        assert!(!like_match("1000", "100\\%"));
    }

    #[test]
    fn test_membership_and_numeric_comparison() {
        let t = tree(r#"filter: {status: {in: [active, pending]}, age: {gte: "18"}}"#);
        assert!(t.matches(&record("{status: Active, age: 30}")));
        assert!(!t.matches(&record("{status: done, age: 30}")));
        assert!(!t.matches(&record("{status: active, age: 9}")));
        assert!(!t.matches(&record("{status: active}")));
    }

    #[test]
    fn test_case_insensitive_field() {
        let t = tree("filter: {name: {equal: bob}}");
        assert!(t.matches(&record("{Name: BOB}")));
    }

    #[test]
    fn test_relation_existence() {
        let t = tree("filter: {author.country: US}");
        assert!(t.matches(&record("{author: {country: USA}}")));
        assert!(!t.matches(&record("{author: {country: FR}}")));
        assert!(!t.matches(&record("{author: ~}")));
        assert!(!t.matches(&record("{title: x}")));
    }

    #[test]
    fn test_nested_relation_fans_out() {
        let t = tree("filter: {comments.author.name: {startswith: al}}");
        let r = record(
            r#"
comments:
  - {author: {name: bob}}
  - {author: [{name: carol}, {name: Alice}]}
"#,
        );
        assert!(t.matches(&r));
        assert!(!t.matches(&record("{comments: [{author: {name: bob}}]}")));
    }

    #[test]
    fn test_or_group() {
        let t = tree("filter_any: {name: ann, age: {lt: 10}}");
        assert!(t.matches(&record("{name: joanna, age: 50}")));
        assert!(t.matches(&record("{name: zed, age: 5}")));
        assert!(!t.matches(&record("{name: zed, age: 50}")));
    }

    #[test]
    fn test_key_clauses_stay_and_in_or_group() {
        let t = tree("filter_any: {age: {gt: 10, lt: 20}, name: zed}");
        assert!(t.matches(&record("{age: 15, name: x}")));
        assert!(!t.matches(&record("{age: 25, name: x}")));
        assert!(t.matches(&record("{age: 25, name: zed}")));
    }

    #[test]
    fn test_null_semantics() {
        let t = tree("filter: {deleted_at: {null: 1}}");
        assert!(t.matches(&record("{deleted_at: ~}")));
        assert!(t.matches(&record("{name: x}")));
        assert!(!t.matches(&record("{deleted_at: 2024-01-01}")));

        let t = tree("filter: {name: {notequal: x}}");
        assert!(!t.matches(&record("{age: 1}")));
        assert!(t.matches(&record("{name: y}")));
    }

    #[test]
    fn test_between_and_not_between() {
        let t = tree("filter: {age: {between: [18, 65]}}");
        assert!(t.matches(&record("{age: 18}")));
        assert!(t.matches(&record("{age: '40'}")));
        assert!(!t.matches(&record("{age: 70}")));

        let t = tree("filter: {age: {notbetween: [18, 65]}}");
        assert!(t.matches(&record("{age: 70}")));
        assert!(!t.matches(&record("{age: 30}")));
    }

    #[test]
    fn test_list_fields() {
        let t = tree("filter: {tags: {in: [rust]}}");
        assert!(t.matches(&record("{tags: [go, Rust]}")));
        assert!(!t.matches(&record("{tags: [go]}")));
    }

    #[test]
    fn test_bool_fields() {
        let t = tree("filter: {active: {equal: 'true'}}");
        assert!(t.matches(&record("{active: true}")));
        assert!(!t.matches(&record("{active: false}")));

        let t = tree("filter: {active: {equal: 0}}");
        assert!(t.matches(&record("{active: false}")));
    }

    #[test]
    fn test_empty_tree_matches_everything() {
        let t = tree("filter: {secret: x}");
        assert!(t.matches(&record("{anything: 1}")));
    }
}
