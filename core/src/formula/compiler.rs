//! Lowering of parsed expressions into slot-addressed evaluation trees.

use super::parser::{BinaryOperator, Expr, UnaryOperator};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    #[error("Unknown variable: {0}")]
    UnknownVariable(String),
    #[error("Unknown function: {0}")]
    UnknownFunction(String),
    #[error("Unknown constant: {0}")]
    UnknownConstant(String),
    #[error("Function {name} expects {expected} argument(s), got {got}")]
    Arity {
        name: String,
        expected: usize,
        got: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("Division by zero")]
    DivisionByZero,
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Expected {expected} input value(s), got {got}")]
    InputCount { expected: usize, got: usize },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Function {
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Sqrt,
    Abs,
    Ln,
    Log10,
    Exp,
    Floor,
    Ceil,
    Round,
    Pow,
    Atan2,
    Min,
    Max,
}

impl Function {
    fn lookup(name: &str) -> Option<Self> {
        let f = match name {
            "sin" => Self::Sin,
            "cos" => Self::Cos,
            "tan" => Self::Tan,
            "asin" => Self::Asin,
            "acos" => Self::Acos,
            "atan" => Self::Atan,
            "sqrt" => Self::Sqrt,
            "abs" => Self::Abs,
            "ln" | "log" => Self::Ln,
            "log10" => Self::Log10,
            "exp" => Self::Exp,
            "floor" => Self::Floor,
            "ceil" => Self::Ceil,
            "round" => Self::Round,
            "pow" => Self::Pow,
            "atan2" => Self::Atan2,
            "min" => Self::Min,
            "max" => Self::Max,
            _ => return None,
        };
        Some(f)
    }

    fn arity(self) -> usize {
        match self {
            Self::Pow | Self::Atan2 | Self::Min | Self::Max => 2,
            _ => 1,
        }
    }

    fn apply(self, args: &[f64]) -> Result<f64, EvalError> {
        let x = args[0];
        match self {
            Self::Sin => Ok(x.sin()),
            Self::Cos => Ok(x.cos()),
            Self::Tan => Ok(x.tan()),
            Self::Asin | Self::Acos if !(-1.0..=1.0).contains(&x) => Err(EvalError::InvalidArgument(
                "asin/acos argument must be in [-1, 1]".to_string(),
            )),
            Self::Asin => Ok(x.asin()),
            Self::Acos => Ok(x.acos()),
            Self::Atan => Ok(x.atan()),
            Self::Sqrt if x < 0.0 => Err(EvalError::InvalidArgument("sqrt of negative number".to_string())),
            Self::Sqrt => Ok(x.sqrt()),
            Self::Abs => Ok(x.abs()),
            Self::Ln | Self::Log10 if x <= 0.0 => {
                Err(EvalError::InvalidArgument("logarithm of non-positive number".to_string()))
            }
            Self::Ln => Ok(x.ln()),
            Self::Log10 => Ok(x.log10()),
            Self::Exp => Ok(x.exp()),
            Self::Floor => Ok(x.floor()),
            Self::Ceil => Ok(x.ceil()),
            Self::Round => Ok(x.round()),
            Self::Pow => Ok(x.powf(args[1])),
            Self::Atan2 => Ok(x.atan2(args[1])),
            Self::Min => Ok(x.min(args[1])),
            Self::Max => Ok(x.max(args[1])),
        }
    }
}

/// Evaluation tree whose variable references are indices into the input slice.
#[derive(Debug, Clone, PartialEq)]
pub enum Compiled {
    Const(f64),
    Slot(usize),
    Neg(Box<Compiled>),
    Binary {
        op: BinaryOperator,
        left: Box<Compiled>,
        right: Box<Compiled>,
    },
    Call {
        func: Function,
        args: Vec<Compiled>,
    },
}

/// Lower `expr`, resolving each variable name through `slot_of`.
pub fn lower<F>(expr: &Expr, slot_of: &F) -> Result<Compiled, CompileError>
where
    F: Fn(&str) -> Option<usize>,
{
    match expr {
        Expr::Number(n) => Ok(Compiled::Const(*n)),
        Expr::VarRef(name) => slot_of(name)
            .map(Compiled::Slot)
            .ok_or_else(|| CompileError::UnknownVariable(name.clone())),
        Expr::Constant(name) => match name.as_str() {
            "PI" => Ok(Compiled::Const(std::f64::consts::PI)),
            "E" => Ok(Compiled::Const(std::f64::consts::E)),
            _ => Err(CompileError::UnknownConstant(name.clone())),
        },
        Expr::UnaryOp { op: UnaryOperator::Neg, operand } => Ok(Compiled::Neg(Box::new(lower(operand, slot_of)?))),
        Expr::BinaryOp { op, left, right } => Ok(Compiled::Binary {
            op: *op,
            left: Box::new(lower(left, slot_of)?),
            right: Box::new(lower(right, slot_of)?),
        }),
        Expr::FnCall { name, args } => {
            let func = Function::lookup(name).ok_or_else(|| CompileError::UnknownFunction(name.clone()))?;
            if args.len() != func.arity() {
                return Err(CompileError::Arity {
                    name: name.clone(),
                    expected: func.arity(),
                    got: args.len(),
                });
            }
            let args = args
                .iter()
                .map(|a| lower(a, slot_of))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Compiled::Call { func, args })
        }
    }
}

impl Compiled {
    pub fn eval(&self, inputs: &[f64]) -> Result<f64, EvalError> {
        match self {
            Compiled::Const(n) => Ok(*n),
            Compiled::Slot(i) => inputs.get(*i).copied().ok_or(EvalError::InputCount {
                expected: *i + 1,
                got: inputs.len(),
            }),
            Compiled::Neg(operand) => Ok(-operand.eval(inputs)?),
            Compiled::Binary { op, left, right } => {
                let l = left.eval(inputs)?;
                let r = right.eval(inputs)?;
                match op {
                    BinaryOperator::Add => Ok(l + r),
                    BinaryOperator::Sub => Ok(l - r),
                    BinaryOperator::Mul => Ok(l * r),
                    BinaryOperator::Div if r == 0.0 => Err(EvalError::DivisionByZero),
                    BinaryOperator::Div => Ok(l / r),
                    BinaryOperator::Pow => Ok(l.powf(r)),
                }
            }
            Compiled::Call { func, args } => {
                let values = args
                    .iter()
                    .map(|a| a.eval(inputs))
                    .collect::<Result<Vec<_>, _>>()?;
                func.apply(&values)
            }
        }
    }
}
