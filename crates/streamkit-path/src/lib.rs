//! Small expression language for addressing into streamkit messages.
//!
//! Rules carry path expressions as plain strings (for example `data.url`).
//! A block compiles the string once with [`compile`] and evaluates the
//! resulting [`Expr`] against every inbound message.
//!
//! Supported forms: dot paths with index access (`items[0].name`), string,
//! number, bool and null literals, comparison (`==`, `!=`, `<`, `<=`, `>`,
//! `>=`), logic (`&&`, `||`, `!`) and numeric arithmetic (`+`, `-`, `*`,
//! `/`). A path that walks off the message (missing key, index out of
//! bounds, wrong container) evaluates to `null` rather than failing, so
//! callers can distinguish "absent" from a genuine evaluation error.
//!
//! ```
//! use serde_json::json;
//!
//! let expr = streamkit_path::compile("data.url").unwrap();
//! let msg = json!({ "data": { "url": "http://example.test/ok" } });
//! assert_eq!(expr.eval(&msg).unwrap(), json!("http://example.test/ok"));
//! ```

pub mod eval;
pub mod lexer;
pub mod parser;

pub use parser::{BinaryOp, Expr, Segment, UnaryOp};

/// Errors from this crate keep the compile phase (lex/parse) and the
/// evaluation phase (operator type mismatches) distinct.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("compile error: {0}")]
    Compile(String),
    #[error("eval error: {0}")]
    Eval(String),
}

impl PathError {
    pub(crate) fn compile(message: impl Into<String>) -> Self {
        Self::Compile(message.into())
    }

    pub(crate) fn eval(message: impl Into<String>) -> Self {
        Self::Eval(message.into())
    }
}

/// Compiles an expression source string into an evaluable [`Expr`].
pub fn compile(src: &str) -> Result<Expr, PathError> {
    let tokens = lexer::lex(src)?;
    parser::parse(&tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn compile_and_eval_simple_path() {
        let expr = compile("data.url").unwrap();
        let msg = json!({ "data": { "url": "http://example.test" } });
        assert_eq!(expr.eval(&msg).unwrap(), json!("http://example.test"));
    }

    #[test]
    fn missing_key_evaluates_to_null() {
        let expr = compile("missing.field").unwrap();
        let msg = json!({ "data": 1 });
        assert_eq!(expr.eval(&msg).unwrap(), serde_json::Value::Null);
    }

    #[test]
    fn compile_failure_is_compile_kind() {
        let err = compile("data..url").unwrap_err();
        assert!(matches!(err, PathError::Compile(_)));
    }

    #[test]
    fn type_mismatch_is_eval_kind() {
        let expr = compile("count < 'abc'").unwrap();
        let err = expr.eval(&json!({ "count": 3 })).unwrap_err();
        assert!(matches!(err, PathError::Eval(_)));
    }
}
