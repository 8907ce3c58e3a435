use super::operand::Operand;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Predicate {
    Compare {
        field: String,
        op: CompareOp,
        value: Operand,
    },
    /// SQL `LIKE` pattern with `%` wildcards already in place.
    Pattern {
        field: String,
        negated: bool,
        pattern: String,
    },
    Membership {
        field: String,
        negated: bool,
        values: Vec<Operand>,
    },
    Range {
        field: String,
        negated: bool,
        low: Operand,
        high: Operand,
    },
    NullCheck {
        field: String,
        negated: bool,
    },
    /// Holds when some record reached through `path` satisfies `predicate`.
    Relation {
        path: String,
        predicate: Box<Predicate>,
    },
    Group {
        connector: Connector,
        children: Vec<Predicate>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CompareOp {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<=")]
    Le,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Connector {
    And,
    Or,
}

/// Compiled filter: the `all` group and the `any` group, joined with AND.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FilterTree {
    pub all: Vec<Predicate>,
    pub any: Vec<Predicate>,
}

impl Predicate {
    pub fn and(children: Vec<Predicate>) -> Self {
        Predicate::Group {
            connector: Connector::And,
            children,
        }
    }

    pub fn or(children: Vec<Predicate>) -> Self {
        Predicate::Group {
            connector: Connector::Or,
            children,
        }
    }
}

impl FilterTree {
    pub fn is_empty(&self) -> bool {
        self.all.is_empty() && self.any.is_empty()
    }

    /// Single predicate equivalent to the whole tree.
    pub fn root(&self) -> Predicate {
        let mut children = self.all.clone();
        if !self.any.is_empty() {
            children.push(Predicate::or(self.any.clone()));
        }
        Predicate::and(children)
    }
}

impl CompareOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "!=",
            CompareOp::Gt => ">",
            CompareOp::Lt => "<",
            CompareOp::Ge => ">=",
            CompareOp::Le => "<=",
        }
    }
}

impl fmt::Display for Connector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Connector::And => write!(f, "AND"),
            Connector::Or => write!(f, "OR"),
        }
    }
}

fn not(negated: bool) -> &'static str {
    if negated {
        "NOT "
    } else {
        ""
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Compare { field, op, value } => {
                write!(f, "{} {} {}", field, op.symbol(), value)
            }
            Predicate::Pattern {
                field,
                negated,
                pattern,
            } => write!(f, "{} {}LIKE {:?}", field, not(*negated), pattern),
            Predicate::Membership {
                field,
                negated,
                values,
            } => write!(
                f,
                "{} {}IN {}",
                field,
                not(*negated),
                Operand::List(values.clone())
            ),
            Predicate::Range {
                field,
                negated,
                low,
                high,
            } => write!(f, "{} {}BETWEEN {} AND {}", field, not(*negated), low, high),
            Predicate::NullCheck { field, negated } => {
                write!(f, "{} IS {}NULL", field, not(*negated))
            }
            Predicate::Relation { path, predicate } => write!(f, "HAS {}( {} )", path, predicate),
            Predicate::Group {
                connector,
                children,
            } => {
                if children.is_empty() {
                    return write!(f, "{}()", connector);
                }
                write!(f, "{}( ", connector)?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", child)?;
                }
                write!(f, " )")
            }
        }
    }
}

impl fmt::Display for FilterTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.root())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_empty_tree() {
        assert_eq!(FilterTree::default().to_string(), "AND()");
    }

    #[test]
    fn test_display_groups() {
        let tree = FilterTree {
            all: vec![Predicate::Membership {
                field: "status".to_string(),
                negated: false,
                values: vec!["active".into(), "pending".into()],
            }],
            any: vec![
                Predicate::NullCheck {
                    field: "deleted_at".to_string(),
                    negated: false,
                },
                Predicate::Relation {
                    path: "author".to_string(),
                    predicate: Box::new(Predicate::Pattern {
                        field: "country".to_string(),
                        negated: true,
                        pattern: "%US%".to_string(),
                    }),
                },
            ],
        };
        assert_eq!(
            tree.to_string(),
            concat!(
                r#"AND( status IN ["active", "pending"], "#,
                r#"OR( deleted_at IS NULL, HAS author( country NOT LIKE "%US%" ) ) )"#
            )
        );
    }

    #[test]
    fn test_serialize_tagged() {
        let p = Predicate::Compare {
            field: "age".to_string(),
            op: CompareOp::Ge,
            value: "18".into(),
        };
        let yaml = serde_yaml::to_string(&p).unwrap();
        let back: serde_yaml::Value = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back["kind"], "compare");
        assert_eq!(back["field"], "age");
        assert_eq!(back["op"], ">=");
        assert_eq!(back["value"], "18");
    }
}
