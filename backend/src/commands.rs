//! Text commands of the websocket protocol.
//!
//! Every request is `COMMAND:<json>` (or a bare `GRAPH`); every reply is
//! `KIND:<payload>`. Handling is synchronous on a locked graph so the socket
//! loop only has to forward the replies.

use fit_core::graph::{DependencyGraph, GraphError};
use fit_core::real::{BoundedScalar, FormatOptions, PrintStyle, UNBOUNDED};
use fit_core::stream::Mode;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

/// Format a graph error as a JSON message for the frontend
pub fn format_error(code: &str, message: &str, severity: &str) -> String {
    format!(
        "ERROR_UPDATE:{}",
        json!({
            "code": code,
            "message": message,
            "severity": severity
        })
    )
}

fn error_code(e: &GraphError) -> &'static str {
    match e {
        GraphError::UnknownNode(_) | GraphError::UnknownName(_) => "UNKNOWN_NODE",
        GraphError::DuplicateName(_) => "DUPLICATE_NAME",
        GraphError::NotAScalar(_) => "NOT_A_SCALAR",
        GraphError::Cycle(_) => "CYCLE",
        GraphError::InUse { .. } => "IN_USE",
        GraphError::Formula(_) => "FORMULA_INVALID",
        GraphError::Eval(_) => "EVAL_FAILED",
        GraphError::Read(_) => "READ_FAILED",
        GraphError::Write(_) => "WRITE_FAILED",
    }
}

#[derive(Deserialize)]
struct ScalarAddCmd {
    name: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    value: Option<f64>,
    #[serde(default)]
    min: Option<f64>,
    #[serde(default)]
    max: Option<f64>,
    #[serde(default)]
    unit: String,
}

impl ScalarAddCmd {
    fn into_scalar(self) -> BoundedScalar {
        let title = self.title.as_deref().unwrap_or(&self.name);
        match (self.value, self.min, self.max) {
            (Some(value), None, None) => BoundedScalar::constant(&self.name, title, value, &self.unit),
            (None, min, max) => BoundedScalar::with_range(
                &self.name,
                title,
                min.unwrap_or(-UNBOUNDED),
                max.unwrap_or(UNBOUNDED),
                &self.unit,
            ),
            (Some(value), min, max) => BoundedScalar::new(
                &self.name,
                title,
                value,
                min.unwrap_or(-UNBOUNDED),
                max.unwrap_or(UNBOUNDED),
                &self.unit,
            ),
        }
    }
}

#[derive(Deserialize)]
struct FormulaAddCmd {
    name: String,
    expression: String,
    #[serde(default)]
    dependents: Vec<String>,
}

#[derive(Deserialize)]
struct SetValueCmd {
    name: String,
    value: f64,
}

#[derive(Deserialize)]
struct SetRangeCmd {
    name: String,
    min: f64,
    max: f64,
}

#[derive(Deserialize)]
struct ReadCmd {
    name: String,
    line: String,
    #[serde(default)]
    compact: bool,
}

#[derive(Deserialize)]
struct NameCmd {
    name: String,
    #[serde(default)]
    compact: bool,
}

#[derive(Deserialize)]
struct FormatCmd {
    name: String,
    #[serde(default = "default_digits")]
    digits: i32,
    /// Letter codes, see [`FormatOptions::parse`].
    #[serde(default)]
    options: String,
}

fn default_digits() -> i32 {
    3
}

#[derive(Deserialize)]
struct PrintCmd {
    name: String,
    #[serde(default)]
    style: PrintStyle,
}

fn mode(compact: bool) -> Mode {
    if compact {
        Mode::Compact
    } else {
        Mode::Extended
    }
}

/// Why a request produced no regular reply.
#[derive(Debug)]
pub enum CommandError {
    /// Unknown command word or malformed payload.
    Malformed(String),
    Graph(GraphError),
}

impl From<GraphError> for CommandError {
    fn from(e: GraphError) -> Self {
        CommandError::Graph(e)
    }
}

impl CommandError {
    pub fn to_message(&self) -> String {
        match self {
            CommandError::Malformed(text) => format_error("BAD_COMMAND", text, "warning"),
            CommandError::Graph(e) => format_error(error_code(e), &e.to_string(), "error"),
        }
    }
}

fn payload<'a, T: Deserialize<'a>>(command: &str, json_str: &'a str) -> Result<T, CommandError> {
    serde_json::from_str(json_str).map_err(|e| {
        warn!("Failed to parse {} command: {}", command, json_str);
        CommandError::Malformed(format!("{}: {}", command, e))
    })
}

fn graph_update(graph: &DependencyGraph) -> String {
    let json = serde_json::to_string(graph).unwrap_or_else(|_| "{}".to_string());
    format!("GRAPH_UPDATE:{}", json)
}

/// Apply one text message to the graph and return the replies to send back.
pub fn handle_command(graph: &mut DependencyGraph, text: &str) -> Result<Vec<String>, CommandError> {
    let (command, json_str) = match text.split_once(':') {
        Some((command, rest)) => (command, rest),
        None => (text, ""),
    };

    match command {
        "GRAPH" => Ok(vec![graph_update(graph)]),
        "SCALAR_ADD" => {
            let cmd: ScalarAddCmd = payload(command, json_str)?;
            let id = graph.add_scalar(cmd.into_scalar())?;
            info!("Added scalar {}", id);
            Ok(vec![graph_update(graph)])
        }
        "FORMULA_ADD" => {
            let cmd: FormulaAddCmd = payload(command, json_str)?;
            let servers = cmd
                .dependents
                .iter()
                .map(|name| graph.lookup(name))
                .collect::<Result<Vec<_>, _>>()?;
            let id = graph.add_formula(&cmd.name, &cmd.expression, &servers)?;
            info!("Added formula {} = {}", cmd.name, cmd.expression);
            let value = graph.value(id)?;
            Ok(vec![value_update(&cmd.name, value), graph_update(graph)])
        }
        "SET_VALUE" => {
            let cmd: SetValueCmd = payload(command, json_str)?;
            let id = graph.lookup(&cmd.name)?;
            graph.set_value(id, cmd.value)?;
            let value = graph.value(id)?;
            Ok(vec![value_update(&cmd.name, value), graph_update(graph)])
        }
        "SET_RANGE" => {
            let cmd: SetRangeCmd = payload(command, json_str)?;
            let id = graph.lookup(&cmd.name)?;
            graph.set_fit_range(id, cmd.min, cmd.max)?;
            Ok(vec![graph_update(graph)])
        }
        "READ" => {
            let cmd: ReadCmd = payload(command, json_str)?;
            let id = graph.lookup(&cmd.name)?;
            graph.read_line(id, &cmd.line, mode(cmd.compact))?;
            Ok(vec![graph_update(graph)])
        }
        "WRITE" => {
            let cmd: NameCmd = payload(command, json_str)?;
            let id = graph.lookup(&cmd.name)?;
            let line = graph.write(id, mode(cmd.compact))?;
            Ok(vec![format!("WRITE_RESULT:{}", line)])
        }
        "FORMAT" => {
            let cmd: FormatCmd = payload(command, json_str)?;
            let id = graph.lookup(&cmd.name)?;
            let text = graph.format(id, cmd.digits, FormatOptions::parse(&cmd.options))?;
            Ok(vec![format!("FORMAT_RESULT:{}", text)])
        }
        "PRINT" => {
            let cmd: PrintCmd = payload(command, json_str)?;
            let id = graph.lookup(&cmd.name)?;
            let text = graph.print(id, cmd.style)?;
            Ok(vec![format!("PRINT_RESULT:{}", text)])
        }
        "EVAL" => {
            let cmd: NameCmd = payload(command, json_str)?;
            let id = graph.lookup(&cmd.name)?;
            let value = graph.value(id)?;
            Ok(vec![value_update(&cmd.name, value)])
        }
        "REMOVE" => {
            let cmd: NameCmd = payload(command, json_str)?;
            let id = graph.lookup(&cmd.name)?;
            graph.remove(id)?;
            info!("Removed {}", cmd.name);
            Ok(vec![graph_update(graph)])
        }
        _ => Err(CommandError::Malformed(format!("Unknown command '{}'", command))),
    }
}

fn value_update(name: &str, value: f64) -> String {
    format!("VALUE_UPDATE:{}", json!({ "name": name, "value": value }))
}
