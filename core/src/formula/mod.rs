//! Formula engine used by [`FormulaNode`](crate::real::FormulaNode).
//!
//! Provides:
//! - Parsing of expression text into an AST
//! - Compilation against a set of offered dependent variables
//! - Evaluation from the dependents' current values
//! - Replacement of dependents by name when the graph rewires servers

pub mod parser;
pub mod compiler;


pub use compiler::{CompileError, Compiled, EvalError};
pub use parser::{parse_expression, Expr, ParseError};

use crate::graph::NodeId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A named variable a formula may read from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dependent {
    pub id: NodeId,
    pub name: String,
}

impl Dependent {
    pub fn new(id: NodeId, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormulaError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error("No replacement offered for dependent '{0}'")]
    MissingReplacement(String),
}

/// A compiled expression over a set of named dependents.
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    text: String,
    /// Every variable the formula was allowed to reference.
    offered: Vec<Dependent>,
    /// The subset of `offered` the expression actually references;
    /// slot `i` of the compiled tree reads `actual[i]`.
    actual: Vec<Dependent>,
    compiled: Compiled,
}

impl Formula {
    /// Compile `text`, resolving its variables against `offered`.
    pub fn compile(text: &str, offered: &[Dependent]) -> Result<Self, FormulaError> {
        let (actual, compiled) = Self::build(text, offered)?;
        Ok(Self {
            text: text.to_string(),
            offered: offered.to_vec(),
            actual,
            compiled,
        })
    }

    fn build(text: &str, offered: &[Dependent]) -> Result<(Vec<Dependent>, Compiled), FormulaError> {
        let expr = parse_expression(text)?;
        let mut actual = Vec::new();
        for name in expr.variables() {
            let dep = offered
                .iter()
                .find(|d| d.name == name)
                .ok_or_else(|| CompileError::UnknownVariable(name.clone()))?;
            actual.push(dep.clone());
        }
        let compiled = compiler::lower(&expr, &|name: &str| actual.iter().position(|d| d.name == name))?;
        Ok((actual, compiled))
    }

    /// Replace the expression. On failure the formula is left untouched.
    pub fn recompile(&mut self, text: &str) -> Result<(), FormulaError> {
        let (actual, compiled) = Self::build(text, &self.offered)?;
        self.text = text.to_string();
        self.actual = actual;
        self.compiled = compiled;
        Ok(())
    }

    /// Swap dependents for same-named entries of `new_set`.
    ///
    /// With `must_replace_all`, every referenced dependent needs a
    /// replacement; otherwise unmatched dependents are kept. Either the whole
    /// change applies or nothing does.
    pub fn change_dependents(&mut self, new_set: &[Dependent], must_replace_all: bool) -> Result<(), FormulaError> {
        let replace = |deps: &[Dependent], strict: bool| -> Result<Vec<Dependent>, FormulaError> {
            deps.iter()
                .map(|dep| match new_set.iter().find(|n| n.name == dep.name) {
                    Some(n) => Ok(n.clone()),
                    None if strict => Err(FormulaError::MissingReplacement(dep.name.clone())),
                    None => Ok(dep.clone()),
                })
                .collect()
        };

        let actual = replace(&self.actual, must_replace_all)?;
        let offered = replace(&self.offered, false)?;
        self.actual = actual;
        self.offered = offered;
        Ok(())
    }

    pub fn eval(&self, inputs: &[f64]) -> Result<f64, EvalError> {
        if inputs.len() != self.actual.len() {
            return Err(EvalError::InputCount {
                expected: self.actual.len(),
                got: inputs.len(),
            });
        }
        self.compiled.eval(inputs)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn actual_dependents(&self) -> &[Dependent] {
        &self.actual
    }

    pub fn offered_dependents(&self) -> &[Dependent] {
        &self.offered
    }
}
