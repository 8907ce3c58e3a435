#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Equal,
    NotEqual,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    NotLike,
    StartsWith,
    EndsWith,
    In,
    NotIn,
    Between,
    NotBetween,
    Null,
    NotNull,
}

const KEYWORDS: &[(&str, Operator)] = &[
    ("equal", Operator::Equal),
    ("=", Operator::Equal),
    ("notequal", Operator::NotEqual),
    ("!=", Operator::NotEqual),
    ("<>", Operator::NotEqual),
    ("gt", Operator::Gt),
    (">", Operator::Gt),
    ("gte", Operator::Gte),
    (">=", Operator::Gte),
    ("lt", Operator::Lt),
    ("<", Operator::Lt),
    ("lte", Operator::Lte),
    ("<=", Operator::Lte),
    ("like", Operator::Like),
    ("notlike", Operator::NotLike),
    ("startswith", Operator::StartsWith),
    ("endswith", Operator::EndsWith),
    ("in", Operator::In),
    ("notin", Operator::NotIn),
    ("between", Operator::Between),
    ("notbetween", Operator::NotBetween),
    ("null", Operator::Null),
    ("notnull", Operator::NotNull),
];

impl Operator {
    /// Looks up a request keyword, ignoring ASCII case. Unknown keywords yield `None`.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        KEYWORDS
            .iter()
            .find(|(kw, _)| kw.eq_ignore_ascii_case(keyword))
            .map(|(_, op)| *op)
    }
}
