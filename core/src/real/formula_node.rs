//! Real-valued node computed from an expression over dependent scalars.

use super::{RealCore, RealValued};
use crate::formula::{Dependent, EvalError, Formula, FormulaError};
use serde::{Deserialize, Serialize};

/// Node whose value is the result of a compiled [`Formula`]. The title always
/// mirrors the expression text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "FormulaNodeRepr", into = "FormulaNodeRepr")]
pub struct FormulaNode {
    core: RealCore,
    formula: Formula,
}

/// Persisted form: the source text and the offered dependents. The compiled
/// expression is rebuilt on load.
#[derive(Serialize, Deserialize)]
struct FormulaNodeRepr {
    #[serde(flatten)]
    core: RealCore,
    expression: String,
    dependents: Vec<Dependent>,
}

impl TryFrom<FormulaNodeRepr> for FormulaNode {
    type Error = FormulaError;

    fn try_from(repr: FormulaNodeRepr) -> Result<Self, Self::Error> {
        let formula = Formula::compile(&repr.expression, &repr.dependents)?;
        Ok(Self {
            core: repr.core,
            formula,
        })
    }
}

impl From<FormulaNode> for FormulaNodeRepr {
    fn from(node: FormulaNode) -> Self {
        Self {
            expression: node.formula.text().to_string(),
            dependents: node.formula.offered_dependents().to_vec(),
            core: node.core,
        }
    }
}

impl FormulaNode {
    /// Compile `expression` against the offered `dependents`. Only the
    /// dependents the expression references become servers.
    pub fn new(name: &str, expression: &str, dependents: &[Dependent]) -> Result<Self, FormulaError> {
        let formula = Formula::compile(expression, dependents)?;
        Ok(Self {
            core: RealCore::new(name, expression, ""),
            formula,
        })
    }

    pub fn expression(&self) -> &str {
        self.formula.text()
    }

    /// The variables the compiled expression reads, in input order.
    pub fn dependents(&self) -> &[Dependent] {
        self.formula.actual_dependents()
    }

    /// Evaluate with one input per entry of [`dependents`](Self::dependents).
    pub fn evaluate(&self, inputs: &[f64]) -> Result<f64, EvalError> {
        self.formula.eval(inputs)
    }

    /// Replace the expression; nothing changes if it does not compile.
    pub fn recompile(&mut self, expression: &str) -> Result<(), FormulaError> {
        self.formula.recompile(expression)?;
        self.core.title = expression.to_string();
        self.mark_value_dirty();
        Ok(())
    }

    /// Hook for the owning graph when the server set is rewired: swap the
    /// dependents for the same-named entries of `new_set`.
    pub fn on_dependency_set_changed(
        &mut self,
        new_set: &[Dependent],
        must_replace_all: bool,
    ) -> Result<(), FormulaError> {
        self.formula.change_dependents(new_set, must_replace_all)?;
        self.mark_value_dirty();
        Ok(())
    }

    pub fn print(&self, value: f64) -> String {
        let mut text = format!(
            "FormulaNode: {} = {} = {}",
            self.core.name, self.core.title, value
        );
        if !self.core.unit.is_empty() {
            text.push(' ');
            text.push_str(&self.core.unit);
        }
        text
    }
}

impl RealValued for FormulaNode {
    fn core(&self) -> &RealCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut RealCore {
        &mut self.core
    }

    /// Any computed value is acceptable.
    fn is_valid(&self) -> bool {
        true
    }
}
