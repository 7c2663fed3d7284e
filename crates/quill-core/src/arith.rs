//! Compile-time arithmetic over AST fragments.

use crate::ast::Node;
use crate::decimal::Decimal;
use num_bigint::BigUint;
use num_traits::{One, Zero};

const ARITHMETIC_OPS: &[&str] = &["add", "sub", "mul", "div", "mod", "exp", "and", "or", "xor"];

/// True when `node` is a numeric literal or an arithmetic operation whose
/// operands are all themselves pure arithmetic.
pub fn is_pure_arithmetic(node: &Node) -> bool {
    match node {
        Node::Token { text, .. } => Decimal::is_number_like(text),
        Node::Operation { tag, children, .. } => {
            ARITHMETIC_OPS.contains(&tag.as_str())
                && !children.is_empty()
                && children.iter().all(is_pure_arithmetic)
        }
    }
}

/// Folds a pure-arithmetic fragment with 256-bit wrapping semantics.
///
/// Returns `None` when the fragment is not pure arithmetic. Binary operators
/// fold left to right over any number of operands.
pub fn const_eval(node: &Node) -> Option<Decimal> {
    eval(node).map(Decimal::from)
}

fn eval(node: &Node) -> Option<BigUint> {
    match node {
        Node::Token { text, .. } => Decimal::parse(text)
            .ok()
            .map(|d| d.as_biguint() % modulus()),
        Node::Operation { tag, children, .. } => {
            if !ARITHMETIC_OPS.contains(&tag.as_str()) {
                return None;
            }
            let mut operands = children.iter().map(eval);
            let first = operands.next()??;
            operands.try_fold(first, |acc, next| Some(apply(tag, acc, next?)))
        }
    }
}

fn apply(op: &str, a: BigUint, b: BigUint) -> BigUint {
    let m = modulus();
    match op {
        "add" => (a + b) % m,
        "sub" => (a + &m - b) % m,
        "mul" => (a * b) % m,
        "div" if b.is_zero() => BigUint::zero(),
        "div" => a / b,
        "mod" if b.is_zero() => BigUint::zero(),
        "mod" => a % b,
        "exp" => a.modpow(&b, &m),
        "and" => a & b,
        "or" => a | b,
        "xor" => a ^ b,
        _ => unreachable!("operator filtered by ARITHMETIC_OPS"),
    }
}

fn modulus() -> BigUint {
    BigUint::one() << 256u32
}
