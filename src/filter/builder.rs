use super::ast::{CompareOp, Connector, FilterTree, Predicate};
use super::operand::Operand;
use std::convert::Infallible;

/// Sink a compiled filter is replayed into, typically a storage query builder.
///
/// Every call carries the connector joining it to its previous sibling.
/// Errors raised by an implementation are returned unchanged from [`FilterTree::apply`].
pub trait QueryBuilder {
    type Error;

    fn group<F>(&mut self, connector: Connector, build: F) -> Result<(), Self::Error>
    where
        F: FnOnce(&mut Self) -> Result<(), Self::Error>;

    /// Existence check: some record reached through `path` satisfies what `build` adds.
    fn relation<F>(
        &mut self,
        connector: Connector,
        path: &str,
        build: F,
    ) -> Result<(), Self::Error>
    where
        F: FnOnce(&mut Self) -> Result<(), Self::Error>;

    fn compare(
        &mut self,
        connector: Connector,
        field: &str,
        op: CompareOp,
        value: &Operand,
    ) -> Result<(), Self::Error>;

    fn pattern(
        &mut self,
        connector: Connector,
        field: &str,
        negated: bool,
        pattern: &str,
    ) -> Result<(), Self::Error>;

    fn membership(
        &mut self,
        connector: Connector,
        field: &str,
        negated: bool,
        values: &[Operand],
    ) -> Result<(), Self::Error>;

    fn range(
        &mut self,
        connector: Connector,
        field: &str,
        negated: bool,
        low: &Operand,
        high: &Operand,
    ) -> Result<(), Self::Error>;

    fn null_check(
        &mut self,
        connector: Connector,
        field: &str,
        negated: bool,
    ) -> Result<(), Self::Error>;
}

impl FilterTree {
    /// Replays the tree into `builder` in request order.
    ///
    /// Each non-empty group is opened with AND on the root; its keys are joined
    /// with AND for `all` and OR for `any`.
    pub fn apply<B: QueryBuilder>(&self, builder: &mut B) -> Result<(), B::Error> {
        for (predicates, connector) in [(&self.all, Connector::And), (&self.any, Connector::Or)] {
            if predicates.is_empty() {
                continue;
            }
            builder.group(Connector::And, |b| {
                for predicate in predicates {
                    predicate.apply(b, connector)?;
                }
                Ok(())
            })?;
        }
        Ok(())
    }
}

impl Predicate {
    pub fn apply<B: QueryBuilder>(
        &self,
        builder: &mut B,
        connector: Connector,
    ) -> Result<(), B::Error> {
        match self {
            Predicate::Compare { field, op, value } => {
                builder.compare(connector, field, *op, value)
            }
            Predicate::Pattern {
                field,
                negated,
                pattern,
            } => builder.pattern(connector, field, *negated, pattern),
            Predicate::Membership {
                field,
                negated,
                values,
            } => builder.membership(connector, field, *negated, values),
            Predicate::Range {
                field,
                negated,
                low,
                high,
            } => builder.range(connector, field, *negated, low, high),
            Predicate::NullCheck { field, negated } => {
                builder.null_check(connector, field, *negated)
            }
            Predicate::Relation { path, predicate } => {
                builder.relation(connector, path, |b| match predicate.as_ref() {
                    // bare existence check
                    Predicate::Group { children, .. } if children.is_empty() => Ok(()),
                    inner => inner.apply(b, Connector::And),
                })
            }
            Predicate::Group {
                connector: inner,
                children,
            } => builder.group(connector, |b| {
                for child in children {
                    child.apply(b, *inner)?;
                }
                Ok(())
            }),
        }
    }
}

/// Records builder calls as an indented plan, one line per call.
#[derive(Debug, Default)]
pub struct Explain {
    lines: Vec<String>,
    depth: usize,
}

impl Explain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn into_string(self) -> String {
        self.lines.join("\n")
    }

    fn push(&mut self, connector: Connector, text: impl std::fmt::Display) {
        let verb = match connector {
            Connector::And => "where",
            Connector::Or => "or where",
        };
        self.lines
            .push(format!("{}{} {}", "  ".repeat(self.depth), verb, text));
    }

    fn nested<F>(&mut self, build: F) -> Result<(), Infallible>
    where
        F: FnOnce(&mut Self) -> Result<(), Infallible>,
    {
        self.depth += 1;
        let result = build(self);
        self.depth -= 1;
        self.lines.push(format!("{})", "  ".repeat(self.depth)));
        result
    }
}

impl QueryBuilder for Explain {
    type Error = Infallible;

    fn group<F>(&mut self, connector: Connector, build: F) -> Result<(), Infallible>
    where
        F: FnOnce(&mut Self) -> Result<(), Infallible>,
    {
        self.push(connector, "(");
        self.nested(build)
    }

    fn relation<F>(&mut self, connector: Connector, path: &str, build: F) -> Result<(), Infallible>
    where
        F: FnOnce(&mut Self) -> Result<(), Infallible>,
    {
        self.push(connector, format_args!("has {} (", path));
        self.nested(build)
    }

    fn compare(
        &mut self,
        connector: Connector,
        field: &str,
        op: CompareOp,
        value: &Operand,
    ) -> Result<(), Infallible> {
        self.push(connector, format_args!("{} {} {}", field, op.symbol(), value));
        Ok(())
    }

    fn pattern(
        &mut self,
        connector: Connector,
        field: &str,
        negated: bool,
        pattern: &str,
    ) -> Result<(), Infallible> {
        let op = if negated { "not like" } else { "like" };
        self.push(connector, format_args!("{} {} {:?}", field, op, pattern));
        Ok(())
    }

    fn membership(
        &mut self,
        connector: Connector,
        field: &str,
        negated: bool,
        values: &[Operand],
    ) -> Result<(), Infallible> {
        let op = if negated { "not in" } else { "in" };
        let list = Operand::List(values.to_vec());
        self.push(connector, format_args!("{} {} {}", field, op, list));
        Ok(())
    }

    fn range(
        &mut self,
        connector: Connector,
        field: &str,
        negated: bool,
        low: &Operand,
        high: &Operand,
    ) -> Result<(), Infallible> {
        let op = if negated { "not between" } else { "between" };
        self.push(connector, format_args!("{} {} {} and {}", field, op, low, high));
        Ok(())
    }

    fn null_check(
        &mut self,
        connector: Connector,
        field: &str,
        negated: bool,
    ) -> Result<(), Infallible> {
        let op = if negated { "is not null" } else { "is null" };
        self.push(connector, format_args!("{} {}", field, op));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{AllowList, Compiler};
    use crate::request::{FilterKeys, FilterSpec};
    use serde_yaml::{from_str, Value as YamlValue};

    fn compile(yaml: &str) -> FilterTree {
        let req: YamlValue = from_str(yaml).unwrap();
        let compiler = Compiler::new(AllowList::new(["status", "age", "name"], ["author", "a"]));
        compiler.compile(&FilterSpec::from_request(&req, &FilterKeys::default()))
    }

    fn explain(tree: &FilterTree) -> String {
        let mut builder = Explain::new();
        tree.apply(&mut builder).unwrap_or_else(|never| match never {});
        builder.into_string()
    }

    #[test]
    fn test_explain_plan() {
        let tree = compile(
            r#"
filter:
  status: {in: [active, pending]}
  age: {gte: "18", lt: 65}
filter_any:
  name: bob
  author.country: {notbetween: [a, c]}
"#,
        );
        let expected = r#"where (
  where status in ["active", "pending"]
  where (
    where age >= "18"
    where age < 65
  )
)
where (
  or where name like "%bob%"
  or where has author (
    where country not between "a" and "c"
  )
)"#;
        assert_eq!(explain(&tree), expected);
    }

    #[test]
    fn test_empty_tree_makes_no_calls() {
        let tree = compile("filter: {secret: 1}\nfilter_any: {}");
        assert!(explain(&tree).is_empty());
    }

    #[test]
    fn test_relation_without_clauses_still_checks_existence() {
        let tree = compile("filter: {author.name: {regex: x}, status: {regex: y}}");
        assert_eq!(explain(&tree), "where (\n  where has author (\n  )\n)");
    }

    #[test]
    fn test_relation_nested_under_path() {
        let tree = compile("filter: {a.b.c: {null: 1}}");
        assert_eq!(
            explain(&tree),
            "where (\n  where has a.b (\n    where c is null\n  )\n)"
        );
    }

    /// Counts calls and refuses one field, like a storage layer that does not know it.
    #[derive(Default)]
    struct Strict {
        calls: usize,
    }

    impl Strict {
        fn check(&mut self, field: &str) -> Result<(), String> {
            self.calls += 1;
            if field == "age" {
                return Err(format!("unknown column {}", field));
            }
            Ok(())
        }
    }

    impl QueryBuilder for Strict {
        type Error = String;

        fn group<F>(&mut self, _: Connector, build: F) -> Result<(), String>
        where
            F: FnOnce(&mut Self) -> Result<(), String>,
        {
            build(self)
        }

        fn relation<F>(&mut self, _: Connector, _: &str, build: F) -> Result<(), String>
        where
            F: FnOnce(&mut Self) -> Result<(), String>,
        {
            build(self)
        }

        fn compare(
            &mut self,
            _: Connector,
            field: &str,
            _: CompareOp,
            _: &Operand,
        ) -> Result<(), String> {
            self.check(field)
        }

        fn pattern(&mut self, _: Connector, field: &str, _: bool, _: &str) -> Result<(), String> {
            self.check(field)
        }

        fn membership(
            &mut self,
            _: Connector,
            field: &str,
            _: bool,
            _: &[Operand],
        ) -> Result<(), String> {
            self.check(field)
        }

        fn range(
            &mut self,
            _: Connector,
            field: &str,
            _: bool,
            _: &Operand,
            _: &Operand,
        ) -> Result<(), String> {
            self.check(field)
        }

        fn null_check(&mut self, _: Connector, field: &str, _: bool) -> Result<(), String> {
            self.check(field)
        }
    }

    #[test]
    fn test_builder_error_propagates() {
        let tree = compile("filter: {status: x, age: {gt: 1}, name: y}");
        let mut builder = Strict::default();
        assert_eq!(tree.apply(&mut builder), Err("unknown column age".to_string()));
        assert_eq!(builder.calls, 2);
    }
}
