use fit_core::graph::DependencyGraph;
use fit_core::real::{BoundedScalar, FormatOptions, RealValued, UNBOUNDED};
use fit_core::stream::Mode;
use fit_core::table::{Attachment, Table};

fn build_model() -> DependencyGraph {
    let mut graph = DependencyGraph::new();
    let mut mass = BoundedScalar::new("mass", "m_B", 5.28, 5.2, 5.3, "GeV");
    mass.set_error(0.01);
    let mass = graph.add_scalar(mass).unwrap();
    let width = graph.add_scalar(BoundedScalar::new("width", "#Gamma", 0.02, 0.0, 0.1, "GeV")).unwrap();
    let scale = graph.add_scalar(BoundedScalar::constant("scale", "k", 2.0, "")).unwrap();
    graph
        .add_formula("upper", "mass + scale * width", &[mass, width, scale])
        .unwrap();
    graph
}

/// Write every node as an extended line and read the lines into a model
/// whose scalars start out with different values and ranges.
#[test]
fn test_text_round_trip_of_model() {
    let mut source = build_model();
    let lines: Vec<(String, String)> = source
        .ordered_nodes()
        .into_iter()
        .map(|(id, node)| (node.name().to_string(), source.write(id, Mode::Extended).unwrap()))
        .collect();
    assert_eq!(lines[0].1, "5.28 +/- 0.01 P(5.2 - 5.3 : 100) F(5.2 - 5.3) // [GeV]");
    assert_eq!(lines[3].1, "mass + scale * width");

    let mut target = DependencyGraph::new();
    let mass = target
        .add_scalar(BoundedScalar::with_range("mass", "m_B", 0.0, 100.0, "GeV"))
        .unwrap();
    let width = target.add_scalar(BoundedScalar::with_range("width", "#Gamma", 0.0, 1.0, "GeV")).unwrap();
    let scale = target.add_scalar(BoundedScalar::with_range("scale", "k", -UNBOUNDED, UNBOUNDED, "")).unwrap();
    let upper = target
        .add_formula("upper", "mass", &[mass, width, scale])
        .unwrap();

    for (name, line) in &lines {
        let id = target.lookup(name).unwrap();
        target.read_line(id, line, Mode::Extended).unwrap();
    }

    let mass_node = target.scalar(mass).unwrap();
    assert_eq!(mass_node.value(), 5.28);
    assert_eq!(mass_node.error(), 0.01);
    assert_eq!(mass_node.fit_range().min, 5.2);
    assert_eq!(mass_node.fit_range().max, 5.3);
    assert_eq!(mass_node.plot_range().bins, 100);
    assert!(target.scalar(scale).unwrap().is_constant());
    assert_eq!(target.servers(upper).unwrap(), &[mass, scale, width]);

    let expected = source.value(source.lookup("upper").unwrap()).unwrap();
    assert!((target.value(upper).unwrap() - expected).abs() < 1e-10);
    assert!((expected - 5.32).abs() < 1e-10);
}

#[test]
fn test_model_json_snapshot() {
    let mut graph = build_model();
    let upper = graph.lookup("upper").unwrap();
    let json = serde_json::to_string(&graph).unwrap();

    let mut restored: DependencyGraph = serde_json::from_str(&json).unwrap();
    restored.rebuild_index();
    assert_eq!(restored.len(), 4);
    assert_eq!(restored.lookup("upper").unwrap(), upper);
    assert!((restored.value(upper).unwrap() - graph.value(upper).unwrap()).abs() < 1e-10);
    assert_eq!(
        restored.format(upper, 3, FormatOptions::new().with_name()).unwrap(),
        "upper = 5.32"
    );
}

#[test]
fn test_scalars_through_table() {
    let graph = build_model();
    let mass = graph.scalar(graph.lookup("mass").unwrap()).unwrap().clone();
    let mut width = graph.scalar(graph.lookup("width").unwrap()).unwrap().clone();

    let mut table = Table::new("fit_results");
    assert_eq!(mass.attach_to_table(&mut table, Table::DEFAULT_BUFFER_SIZE), Ok(Attachment::Created));
    assert_eq!(width.attach_to_table(&mut table, Table::DEFAULT_BUFFER_SIZE), Ok(Attachment::Created));
    assert_eq!(mass.attach_to_table(&mut table, Table::DEFAULT_BUFFER_SIZE), Ok(Attachment::Bound));

    for w in [0.01, 0.03, 0.05] {
        width.set_value(w);
        table.fill(&[&mass, &width]).unwrap();
    }
    assert_eq!(table.rows(), 3);

    width.load_from(&table, 1).unwrap();
    assert_eq!(width.value(), 0.03);
    assert!(width.load_from(&table, 3).is_err());
}
