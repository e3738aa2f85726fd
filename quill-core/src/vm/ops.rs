//! Binary/unary operator dispatch. `==`/`!=` go through `Value::equal`
//! directly (every type defines them); everything else here requires
//! numeric or string operands and raises `OperandTypeError`/
//! `InvalidOperator` for anything else.

use crate::error::VmError;
use crate::instr::{bin_op, un_op};
use crate::value::{Decimal, Value};

fn operand_error(op: &str, left: &Value, right: &Value) -> VmError {
    VmError::OperandTypeError {
        op: op.to_string(),
        left: left.kind(),
        right: right.kind(),
    }
}

fn op_name(op: u8) -> &'static str {
    match op {
        bin_op::ADD => "+",
        bin_op::SUB => "-",
        bin_op::MUL => "*",
        bin_op::DIV => "/",
        bin_op::MOD => "%",
        bin_op::LT => "<",
        bin_op::GT => ">",
        bin_op::LT_EQ => "<=",
        bin_op::GT_EQ => ">=",
        _ => "?",
    }
}

/// Promotes a pair of numeric-ish operands to a common representation for
/// arithmetic, in int < uint < float < decimal widening order.
enum Numeric {
    Int(i64, i64),
    Uint(u64, u64),
    Float(f64, f64),
    Decimal(Decimal, Decimal),
}

fn promote(op: u8, left: &Value, right: &Value) -> Result<Numeric, VmError> {
    use Value::*;
    Ok(match (left, right) {
        (Int(a), Int(b)) => Numeric::Int(*a, *b),
        (Uint(a), Uint(b)) => Numeric::Uint(*a, *b),
        (Float(a), Float(b)) => Numeric::Float(*a, *b),
        (Int(a), Uint(b)) => Numeric::Float(*a as f64, *b as f64),
        (Uint(a), Int(b)) => Numeric::Float(*a as f64, *b as f64),
        (Int(a), Float(b)) => Numeric::Float(*a as f64, *b),
        (Float(a), Int(b)) => Numeric::Float(*a, *b as f64),
        (Uint(a), Float(b)) => Numeric::Float(*a as f64, *b),
        (Float(a), Uint(b)) => Numeric::Float(*a, *b as f64),
        (Decimal(a), Decimal(b)) => Numeric::Decimal((**a).clone(), (**b).clone()),
        (Decimal(a), Int(b)) => Numeric::Decimal((**a).clone(), crate::value::Decimal::from_i64(*b)),
        (Int(a), Decimal(b)) => Numeric::Decimal(crate::value::Decimal::from_i64(*a), (**b).clone()),
        _ => return Err(operand_error(op_name(op), left, right)),
    })
}

pub fn binary_op(op: u8, left: Value, right: Value) -> Result<Value, VmError> {
    // String/array/dict concatenation and repetition are handled before
    // falling into pure numeric promotion.
    match (op, &left, &right) {
        (bin_op::ADD, Value::String(a), Value::String(b)) => {
            return Ok(Value::string(format!("{a}{b}")));
        }
        (bin_op::ADD, Value::String(a), b) => return Ok(Value::string(format!("{a}{b}"))),
        (bin_op::ADD, Value::Array(a), Value::Array(b)) => {
            let mut items = a.borrow().clone();
            items.extend(b.borrow().iter().cloned());
            return Ok(Value::array(items));
        }
        _ => {}
    }

    match promote(op, &left, &right)? {
        Numeric::Int(a, b) => int_op(op, a, b),
        Numeric::Uint(a, b) => uint_op(op, a, b),
        Numeric::Float(a, b) => float_op(op, a, b),
        Numeric::Decimal(a, b) => decimal_op(op, a, b),
    }
}

fn int_op(op: u8, a: i64, b: i64) -> Result<Value, VmError> {
    Ok(match op {
        bin_op::ADD => Value::Int(a.wrapping_add(b)),
        bin_op::SUB => Value::Int(a.wrapping_sub(b)),
        bin_op::MUL => Value::Int(a.wrapping_mul(b)),
        bin_op::DIV => {
            if b == 0 {
                return Err(VmError::ZeroDivision);
            }
            Value::Int(a.wrapping_div(b))
        }
        bin_op::MOD => {
            if b == 0 {
                return Err(VmError::ZeroDivision);
            }
            Value::Int(a.wrapping_rem(b))
        }
        bin_op::LT => Value::Bool(a < b),
        bin_op::GT => Value::Bool(a > b),
        bin_op::LT_EQ => Value::Bool(a <= b),
        bin_op::GT_EQ => Value::Bool(a >= b),
        _ => return Err(VmError::InvalidOperator { op: op_name(op).to_string(), kind: crate::value::ValueKind::Int }),
    })
}

fn uint_op(op: u8, a: u64, b: u64) -> Result<Value, VmError> {
    Ok(match op {
        bin_op::ADD => Value::Uint(a.wrapping_add(b)),
        bin_op::SUB => Value::Uint(a.wrapping_sub(b)),
        bin_op::MUL => Value::Uint(a.wrapping_mul(b)),
        bin_op::DIV => {
            if b == 0 {
                return Err(VmError::ZeroDivision);
            }
            Value::Uint(a / b)
        }
        bin_op::MOD => {
            if b == 0 {
                return Err(VmError::ZeroDivision);
            }
            Value::Uint(a % b)
        }
        bin_op::LT => Value::Bool(a < b),
        bin_op::GT => Value::Bool(a > b),
        bin_op::LT_EQ => Value::Bool(a <= b),
        bin_op::GT_EQ => Value::Bool(a >= b),
        _ => return Err(VmError::InvalidOperator { op: op_name(op).to_string(), kind: crate::value::ValueKind::Uint }),
    })
}

fn float_op(op: u8, a: f64, b: f64) -> Result<Value, VmError> {
    Ok(match op {
        bin_op::ADD => Value::Float(a + b),
        bin_op::SUB => Value::Float(a - b),
        bin_op::MUL => Value::Float(a * b),
        bin_op::DIV => Value::Float(a / b),
        bin_op::MOD => Value::Float(a % b),
        bin_op::LT => Value::Bool(a < b),
        bin_op::GT => Value::Bool(a > b),
        bin_op::LT_EQ => Value::Bool(a <= b),
        bin_op::GT_EQ => Value::Bool(a >= b),
        _ => return Err(VmError::InvalidOperator { op: op_name(op).to_string(), kind: crate::value::ValueKind::Float }),
    })
}

fn decimal_op(op: u8, a: Decimal, b: Decimal) -> Result<Value, VmError> {
    Ok(match op {
        bin_op::ADD => Value::Decimal(std::rc::Rc::new(a.add(&b))),
        bin_op::SUB => Value::Decimal(std::rc::Rc::new(a.sub(&b))),
        bin_op::MUL => Value::Decimal(std::rc::Rc::new(a.mul(&b))),
        bin_op::LT => Value::Bool(a < b),
        bin_op::GT => Value::Bool(a > b),
        bin_op::LT_EQ => Value::Bool(a <= b),
        bin_op::GT_EQ => Value::Bool(a >= b),
        bin_op::DIV | bin_op::MOD => {
            return Err(VmError::NotImplemented {
                what: "decimal division".to_string(),
            })
        }
        _ => return Err(VmError::InvalidOperator { op: op_name(op).to_string(), kind: crate::value::ValueKind::Decimal }),
    })
}

pub fn unary_op(op: u8, operand: Value) -> Result<Value, VmError> {
    match (op, operand) {
        (un_op::NEG, Value::Int(v)) => Ok(Value::Int(-v)),
        (un_op::NEG, Value::Float(v)) => Ok(Value::Float(-v)),
        (un_op::NEG, Value::Decimal(v)) => Ok(Value::Decimal(std::rc::Rc::new(v.neg()))),
        (un_op::NEG, other) => Err(VmError::InvalidOperator { op: "-".to_string(), kind: other.kind() }),
        (un_op::NOT, other) => Ok(Value::Bool(other.is_falsy())),
        _ => Err(VmError::NotImplemented { what: "unary operator".to_string() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_mixed_int_float_promotes() {
        let v = binary_op(bin_op::ADD, Value::Int(1), Value::Float(2.5)).unwrap();
        assert_eq!(v, Value::Float(3.5));
    }

    #[test]
    fn div_by_zero_int() {
        assert_eq!(binary_op(bin_op::DIV, Value::Int(1), Value::Int(0)), Err(VmError::ZeroDivision));
    }

    #[test]
    fn string_concat() {
        let v = binary_op(bin_op::ADD, Value::string("a"), Value::string("b")).unwrap();
        assert_eq!(v, Value::string("ab"));
    }

    #[test]
    fn unary_not_is_falsy_based() {
        assert_eq!(unary_op(un_op::NOT, Value::Int(0)).unwrap(), Value::Bool(true));
        assert_eq!(unary_op(un_op::NOT, Value::Int(1)).unwrap(), Value::Bool(false));
    }
}
