pub mod ast;
pub mod builder;
pub mod compiler;
pub mod eval;
pub mod key;
pub mod operand;
pub mod operator;

pub use ast::{CompareOp, Connector, FilterTree, Predicate};
pub use builder::{Explain, QueryBuilder};
pub use compiler::Compiler;
pub use eval::evaluate;
pub use key::{AllowList, ResolvedKey};
pub use operand::Operand;
pub use operator::Operator;
