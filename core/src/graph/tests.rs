//! Integration tests for the dependency graph.

use super::*;
use crate::real::BoundedScalar;

fn graph_xy() -> (DependencyGraph, NodeId, NodeId) {
    let mut graph = DependencyGraph::new();
    let x = graph.add_scalar(BoundedScalar::new("x", "x", 2.0, 0.0, 10.0, "")).unwrap();
    let y = graph.add_scalar(BoundedScalar::new("y", "y", 3.0, 0.0, 10.0, "")).unwrap();
    (graph, x, y)
}

#[test]
fn test_add_and_lookup() {
    let (graph, x, _) = graph_xy();
    assert_eq!(graph.find("x"), Some(x));
    assert_eq!(graph.len(), 2);
    assert!(graph.scalar(x).is_some());
    assert!(graph.formula(x).is_none());
    assert!(matches!(graph.lookup("nope"), Err(GraphError::UnknownName(_))));
}

#[test]
fn test_duplicate_name_error() {
    let (mut graph, _, _) = graph_xy();
    let result = graph.add_scalar(BoundedScalar::constant("x", "again", 1.0, ""));
    assert_eq!(result, Err(GraphError::DuplicateName("x".to_string())));
}

#[test]
fn test_formula_registers_only_referenced_servers() {
    let (mut graph, x, y) = graph_xy();
    let f = graph.add_formula("twice", "2 * x", &[x, y]).unwrap();
    assert_eq!(graph.servers(f).unwrap(), &[x]);
    assert_eq!(graph.clients(x), vec![f]);
    assert!(graph.clients(y).is_empty());
}

#[test]
fn test_formula_value_is_cached_until_invalidated() {
    let (mut graph, x, y) = graph_xy();
    let f = graph.add_formula("prod", "x * y", &[x, y]).unwrap();

    assert!((graph.value(f).unwrap() - 6.0).abs() < 1e-10);
    assert!(!graph.get(f).unwrap().as_real().dirty().value);

    graph.set_value(x, 4.0).unwrap();
    assert!(graph.get(f).unwrap().as_real().dirty().value);
    assert!((graph.value(f).unwrap() - 12.0).abs() < 1e-10);
}

#[test]
fn test_set_value_clamps_through_graph() {
    let (mut graph, x, y) = graph_xy();
    let f = graph.add_formula("copy", "x", &[x, y]).unwrap();
    graph.set_value(x, 50.0).unwrap();
    assert_eq!(graph.value(f).unwrap(), 10.0);
}

#[test]
fn test_set_value_on_formula_fails() {
    let (mut graph, x, _) = graph_xy();
    let f = graph.add_formula("copy", "x", &[x]).unwrap();
    assert_eq!(graph.set_value(f, 1.0), Err(GraphError::NotAScalar("copy".to_string())));
}

#[test]
fn test_chained_formulas_propagate() {
    let (mut graph, x, y) = graph_xy();
    let sum = graph.add_formula("sum", "x + y", &[x, y]).unwrap();
    let sq = graph.add_formula("sq", "sum ^ 2", &[sum]).unwrap();
    assert!((graph.value(sq).unwrap() - 25.0).abs() < 1e-10);

    graph.set_fit_range(y, 0.0, 1.0).unwrap();
    let sq_node = graph.get(sq).unwrap().as_real();
    assert!(sq_node.dirty().value && sq_node.dirty().shape);
    assert!((graph.value(sq).unwrap() - 9.0).abs() < 1e-10);
}

#[test]
fn test_redirect_servers() {
    let (mut graph, x, y) = graph_xy();
    let f = graph.add_formula("f", "x + y", &[x, y]).unwrap();

    // no same-named replacement for y
    let result = graph.redirect_servers(f, &[x], true);
    assert!(matches!(result, Err(GraphError::Formula(_))));
    assert_eq!(graph.servers(f).unwrap(), &[x, y]);

    graph.rename(x, "x_old").unwrap();
    let x_new = graph.add_scalar(BoundedScalar::constant("x", "x", 100.0, "")).unwrap();
    assert!((graph.value(f).unwrap() - 5.0).abs() < 1e-10);

    graph.redirect_servers(f, &[x_new], false).unwrap();
    assert_eq!(graph.servers(f).unwrap(), &[x_new, y]);
    assert!((graph.value(f).unwrap() - 103.0).abs() < 1e-10);
    assert!(graph.clients(x).is_empty());
    graph.remove(x).unwrap();
}

#[test]
fn test_rename_rejects_taken_name() {
    let (mut graph, x, _) = graph_xy();
    assert_eq!(graph.rename(x, "y"), Err(GraphError::DuplicateName("y".to_string())));
    graph.rename(x, "x").unwrap();
    graph.rename(x, "z").unwrap();
    assert_eq!(graph.find("z"), Some(x));
    assert!(graph.find("x").is_none());
}

#[test]
fn test_read_line_updates_formula_servers() {
    let (mut graph, x, y) = graph_xy();
    let f = graph.add_formula("f", "x", &[x, y]).unwrap();
    assert!((graph.value(f).unwrap() - 2.0).abs() < 1e-10);

    graph.read_line(f, "x - y", Mode::Extended).unwrap();
    assert_eq!(graph.servers(f).unwrap(), &[x, y]);
    assert_eq!(graph.clients(y), vec![f]);
    assert!((graph.value(f).unwrap() + 1.0).abs() < 1e-10);

    assert!(graph.read_line(f, "x", Mode::Compact).is_err());
    assert_eq!(graph.write(f, Mode::Extended).unwrap(), "x - y");
}

#[test]
fn test_read_line_scalar_invalidates_clients() {
    let (mut graph, x, y) = graph_xy();
    let f = graph.add_formula("f", "x * y", &[x, y]).unwrap();
    graph.value(f).unwrap();

    graph.read_line(x, "5 +/- 0.5", Mode::Extended).unwrap();
    assert!((graph.value(f).unwrap() - 15.0).abs() < 1e-10);
    assert_eq!(graph.scalar(x).unwrap().error(), 0.5);
}

#[test]
fn test_format_and_print() {
    let (mut graph, x, y) = graph_xy();
    let f = graph.add_formula("ratio", "x / y", &[x, y]).unwrap();
    assert_eq!(graph.format(f, 3, FormatOptions::new().with_name()).unwrap(), "ratio = 0.667");
    assert_eq!(graph.print(f, PrintStyle::Standard).unwrap(), "FormulaNode: ratio = x / y = 0.6666666666666666");
    assert_eq!(graph.format(x, 2, FormatOptions::new()).unwrap(), "2.0");
}

#[test]
fn test_eval_error_surfaces() {
    let (mut graph, x, y) = graph_xy();
    let f = graph.add_formula("inv", "1 / (x - 2)", &[x, y]).unwrap();
    assert_eq!(graph.value(f), Err(GraphError::Eval(EvalError::DivisionByZero)));
}

#[test]
fn test_remove_in_use() {
    let (mut graph, x, y) = graph_xy();
    let f = graph.add_formula("f", "x", &[x, y]).unwrap();
    assert!(matches!(graph.remove(x), Err(GraphError::InUse { .. })));
    graph.remove(f).unwrap();
    graph.remove(x).unwrap();
    assert!(graph.find("x").is_none());
    assert_eq!(graph.ordered_nodes().len(), 1);
}

#[test]
fn test_topological_order() {
    let (mut graph, x, y) = graph_xy();
    let sum = graph.add_formula("sum", "x + y", &[x, y]).unwrap();
    let twice = graph.add_formula("twice", "2 * sum", &[sum]).unwrap();

    let order = graph.topological_order().unwrap();
    let pos = |id| order.iter().position(|o| *o == id).unwrap();
    assert!(pos(x) < pos(sum));
    assert!(pos(y) < pos(sum));
    assert!(pos(sum) < pos(twice));
}

#[test]
fn test_redirect_refuses_cycle() {
    let (mut graph, x, _) = graph_xy();
    let f = graph.add_formula("f", "x + 1", &[x]).unwrap();
    graph.rename(x, "x_old").unwrap();
    let looped = graph.add_formula("x", "f * 2", &[f]).unwrap();

    let result = graph.redirect_servers(f, &[looped], true);
    assert!(matches!(result, Err(GraphError::Cycle(_))));
    assert_eq!(graph.servers(f).unwrap(), &[x]);
    assert!(graph.depends_on(looped, x));
    assert!(!graph.depends_on(x, looped));
}

#[test]
fn test_cycle_detection() {
    let mut graph = DependencyGraph::new();
    let a = graph.add_scalar(BoundedScalar::constant("a", "a", 1.0, "")).unwrap();
    let f = graph.add_formula("f", "a + 1", &[a]).unwrap();
    let g = graph.add_formula("g", "f * 2", &[f]).unwrap();
    assert!(graph.topological_order().is_ok());

    graph.nodes.get_mut(&f).unwrap().servers = vec![g];
    assert!(matches!(graph.topological_order(), Err(GraphError::Cycle(_))));
    assert!(matches!(graph.value(f), Err(GraphError::Cycle(_))));
}

#[test]
fn test_json_round_trip() {
    let (mut graph, x, y) = graph_xy();
    let f = graph.add_formula("f", "x * y", &[x, y]).unwrap();

    let json = serde_json::to_string(&graph).unwrap();
    let mut restored: DependencyGraph = serde_json::from_str(&json).unwrap();
    restored.rebuild_index();

    assert_eq!(restored.find("f"), Some(f));
    assert_eq!(restored.servers(f).unwrap(), &[x, y]);
    assert!((restored.value(f).unwrap() - 6.0).abs() < 1e-10);
}
