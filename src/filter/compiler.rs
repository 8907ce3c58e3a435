use super::ast::{CompareOp, FilterTree, Predicate};
use super::key::{AllowList, ResolvedKey};
use super::operand::Operand;
use super::operator::Operator;
use crate::request::{FilterEntry, FilterSpec, FilterValue};
use tracing::debug;

/// Turns untrusted filter requests into predicate trees.
///
/// Anything malformed or not allowed contributes nothing; compilation never fails.
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    allow: AllowList,
}

impl Compiler {
    pub fn new(allow: AllowList) -> Self {
        Self { allow }
    }

    pub fn allow_list(&self) -> &AllowList {
        &self.allow
    }

    pub fn compile(&self, spec: &FilterSpec) -> FilterTree {
        FilterTree {
            all: self.compile_group(&spec.all),
            any: self.compile_group(&spec.any),
        }
    }

    fn compile_group(&self, entries: &[FilterEntry]) -> Vec<Predicate> {
        entries
            .iter()
            .filter_map(|entry| self.compile_entry(entry))
            .collect()
    }

    fn compile_entry(&self, entry: &FilterEntry) -> Option<Predicate> {
        if let FilterValue::Scalar(value) = &entry.value {
            if value.is_blank() {
                return None;
            }
        }

        match self.allow.resolve(&entry.key)? {
            ResolvedKey::Direct { field } => compile_field(field, &entry.value),
            // the existence check stays even when every clause is dropped
            ResolvedKey::Relation { path, field } => {
                let predicate = compile_field(field, &entry.value)
                    .unwrap_or_else(|| Predicate::and(Vec::new()));
                Some(Predicate::Relation {
                    path: path.to_string(),
                    predicate: Box::new(predicate),
                })
            }
        }
    }
}

/// Clauses of one key, AND-ed together whatever group the key sits in.
fn compile_field(field: &str, value: &FilterValue) -> Option<Predicate> {
    match value {
        FilterValue::Scalar(operand) => {
            let text = operand.clone().decode().pattern_text()?;
            Some(Predicate::Pattern {
                field: field.to_string(),
                negated: false,
                pattern: format!("%{}%", text),
            })
        }
        FilterValue::Operators(pairs) => {
            let mut clauses: Vec<Predicate> = pairs
                .iter()
                .filter_map(|(keyword, operand)| {
                    compile_clause(field, keyword, operand.clone().decode())
                })
                .collect();

            match clauses.len() {
                0 => None,
                1 => clauses.pop(),
                _ => Some(Predicate::and(clauses)),
            }
        }
    }
}

fn compile_clause(field: &str, keyword: &str, operand: Operand) -> Option<Predicate> {
    let Some(op) = Operator::from_keyword(keyword) else {
        debug!(field, keyword, "unknown filter operator");
        return None;
    };

    let field = field.to_string();
    let clause = match op {
        Operator::Equal => compare(field, CompareOp::Eq, operand),
        Operator::NotEqual => compare(field, CompareOp::Ne, operand),
        Operator::Gt => compare(field, CompareOp::Gt, operand),
        Operator::Gte => compare(field, CompareOp::Ge, operand),
        Operator::Lt => compare(field, CompareOp::Lt, operand),
        Operator::Lte => compare(field, CompareOp::Le, operand),
        Operator::Like => pattern(field, false, "%", &operand, "%")?,
        Operator::NotLike => pattern(field, true, "%", &operand, "%")?,
        Operator::StartsWith => pattern(field, false, "", &operand, "%")?,
        Operator::EndsWith => pattern(field, false, "%", &operand, "")?,
        Operator::In => Predicate::Membership {
            field,
            negated: false,
            values: operand.into_list(),
        },
        Operator::NotIn => Predicate::Membership {
            field,
            negated: true,
            values: operand.into_list(),
        },
        Operator::Between => range(field, false, operand)?,
        Operator::NotBetween => range(field, true, operand)?,
        Operator::Null => Predicate::NullCheck {
            field,
            negated: false,
        },
        Operator::NotNull => Predicate::NullCheck {
            field,
            negated: true,
        },
    };
    Some(clause)
}

fn compare(field: String, op: CompareOp, value: Operand) -> Predicate {
    Predicate::Compare { field, op, value }
}

fn pattern(
    field: String,
    negated: bool,
    prefix: &str,
    operand: &Operand,
    suffix: &str,
) -> Option<Predicate> {
    let Some(text) = operand.pattern_text() else {
        debug!(field = %field, "list operand cannot form a like pattern");
        return None;
    };
    Some(Predicate::Pattern {
        field,
        negated,
        pattern: format!("{}{}{}", prefix, text, suffix),
    })
}

fn range(field: String, negated: bool, operand: Operand) -> Option<Predicate> {
    let Operand::List(bounds) = operand else {
        debug!(field = %field, "between operand is not a list");
        return None;
    };
    let Ok([low, high]) = <[Operand; 2]>::try_from(bounds) else {
        debug!(field = %field, "between operand needs exactly two bounds");
        return None;
    };
    Some(Predicate::Range {
        field,
        negated,
        low,
        high,
    })
}
