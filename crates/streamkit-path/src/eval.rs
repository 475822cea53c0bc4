//! Evaluation of compiled expressions against a message.

use serde_json::Value;

use crate::PathError;
use crate::parser::{BinaryOp, Expr, Segment, UnaryOp};

impl Expr {
    /// Evaluates this expression against `msg`.
    ///
    /// Path traversal that leaves the message (missing key, out-of-bounds
    /// index, scalar where a container was expected) yields `Value::Null`.
    /// Operator type mismatches return [`PathError::Eval`].
    pub fn eval(&self, msg: &Value) -> Result<Value, PathError> {
        match self {
            Expr::Root => Ok(msg.clone()),
            Expr::Path(segments) => Ok(lookup(msg, segments).cloned().unwrap_or(Value::Null)),
            Expr::Str(s) => Ok(Value::String(s.clone())),
            Expr::Number(n) => Ok(number_value(*n)),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Null => Ok(Value::Null),
            Expr::Unary { op, rhs } => {
                let value = rhs.eval(msg)?;
                match op {
                    UnaryOp::Not => match value {
                        Value::Bool(b) => Ok(Value::Bool(!b)),
                        other => Err(PathError::eval(format!(
                            "'!' expects a boolean, got {}",
                            kind_name(&other)
                        ))),
                    },
                    UnaryOp::Neg => match value.as_f64() {
                        Some(n) => Ok(number_value(-n)),
                        None => Err(PathError::eval(format!(
                            "'-' expects a number, got {}",
                            kind_name(&value)
                        ))),
                    },
                }
            }
            Expr::Binary { op, lhs, rhs } => self.eval_binary(*op, lhs, rhs, msg),
        }
    }

    fn eval_binary(
        &self,
        op: BinaryOp,
        lhs: &Expr,
        rhs: &Expr,
        msg: &Value,
    ) -> Result<Value, PathError> {
        // logic short-circuits; both operands must be booleans
        if matches!(op, BinaryOp::And | BinaryOp::Or) {
            let left = expect_bool(lhs.eval(msg)?, "logic operator")?;
            let decided = match op {
                BinaryOp::And => !left,
                _ => left,
            };
            if decided {
                return Ok(Value::Bool(left));
            }
            let right = expect_bool(rhs.eval(msg)?, "logic operator")?;
            return Ok(Value::Bool(right));
        }

        let left = lhs.eval(msg)?;
        let right = rhs.eval(msg)?;
        match op {
            BinaryOp::Eq => Ok(Value::Bool(values_equal(&left, &right))),
            BinaryOp::Ne => Ok(Value::Bool(!values_equal(&left, &right))),
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                let (a, b) = expect_numbers(&left, &right, "comparison")?;
                Ok(Value::Bool(match op {
                    BinaryOp::Lt => a < b,
                    BinaryOp::Le => a <= b,
                    BinaryOp::Gt => a > b,
                    _ => a >= b,
                }))
            }
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => {
                let (a, b) = expect_numbers(&left, &right, "arithmetic")?;
                if matches!(op, BinaryOp::Div) && b == 0.0 {
                    return Err(PathError::eval("division by zero"));
                }
                Ok(number_value(match op {
                    BinaryOp::Add => a + b,
                    BinaryOp::Sub => a - b,
                    BinaryOp::Mul => a * b,
                    _ => a / b,
                }))
            }
            BinaryOp::And | BinaryOp::Or => unreachable!("handled above"),
        }
    }
}

fn lookup<'a>(root: &'a Value, segments: &[Segment]) -> Option<&'a Value> {
    let mut current = root;
    for segment in segments {
        current = match segment {
            Segment::Key(key) => current.get(key.as_str())?,
            Segment::Index(index) => current.get(*index)?,
        };
    }
    Some(current)
}

fn number_value(n: f64) -> Value {
    serde_json::Number::from_f64(n)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

fn values_equal(a: &Value, b: &Value) -> bool {
    // numbers compare by value so 1 == 1.0
    if let (Some(x), Some(y)) = (a.as_f64(), b.as_f64()) {
        return x == y;
    }
    a == b
}

fn expect_bool(value: Value, context: &str) -> Result<bool, PathError> {
    match value {
        Value::Bool(b) => Ok(b),
        other => Err(PathError::eval(format!(
            "{context} expects booleans, got {}",
            kind_name(&other)
        ))),
    }
}

fn expect_numbers(a: &Value, b: &Value, context: &str) -> Result<(f64, f64), PathError> {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => Ok((x, y)),
        _ => Err(PathError::eval(format!(
            "{context} expects numbers, got {} and {}",
            kind_name(a),
            kind_name(b)
        ))),
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use crate::{PathError, compile};
    use serde_json::{Value, json};

    fn eval(src: &str, msg: Value) -> Result<Value, PathError> {
        compile(src).unwrap().eval(&msg)
    }

    #[test]
    fn root_returns_whole_message() {
        let msg = json!({ "a": 1 });
        assert_eq!(eval(".", msg.clone()).unwrap(), msg);
    }

    #[test]
    fn nested_path_with_index() {
        let msg = json!({ "items": [{ "name": "first" }, { "name": "second" }] });
        assert_eq!(eval("items[1].name", msg).unwrap(), json!("second"));
    }

    #[test]
    fn absent_paths_yield_null() {
        let msg = json!({ "data": { "url": "u" } });
        assert_eq!(eval("data.missing", msg.clone()).unwrap(), Value::Null);
        assert_eq!(eval("data.url.deeper", msg.clone()).unwrap(), Value::Null);
        assert_eq!(eval("data[3]", msg).unwrap(), Value::Null);
    }

    #[test]
    fn equality_is_value_based_for_numbers() {
        assert_eq!(eval("n == 1", json!({ "n": 1.0 })).unwrap(), json!(true));
        assert_eq!(eval("n != 2", json!({ "n": 1 })).unwrap(), json!(true));
    }

    #[test]
    fn comparison_and_arithmetic() {
        let msg = json!({ "count": 4 });
        assert_eq!(eval("count > 3", msg.clone()).unwrap(), json!(true));
        assert_eq!(eval("count + 1 == 5", msg.clone()).unwrap(), json!(true));
        assert_eq!(eval("count / 2", msg).unwrap(), json!(2.0));
    }

    #[test]
    fn logic_short_circuits() {
        // rhs would be a type error, but lhs decides the result first
        let msg = json!({ "flag": false, "n": 1 });
        assert_eq!(eval("flag && n", msg.clone()).unwrap(), json!(false));
        assert!(eval("n && flag", msg).is_err());
    }

    #[test]
    fn not_and_negate() {
        let msg = json!({ "flag": true, "n": 2 });
        assert_eq!(eval("!flag", msg.clone()).unwrap(), json!(false));
        assert_eq!(eval("-n == 0 - 2", msg).unwrap(), json!(true));
    }

    #[test]
    fn division_by_zero_is_eval_error() {
        assert!(matches!(
            eval("1 / n", json!({ "n": 0 })),
            Err(PathError::Eval(_))
        ));
    }

    #[test]
    fn comparing_non_numbers_is_eval_error() {
        assert!(matches!(
            eval("name < 3", json!({ "name": "x" })),
            Err(PathError::Eval(_))
        ));
    }
}
