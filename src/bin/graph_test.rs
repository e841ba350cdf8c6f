use mathpad::entity::{Entity, EntityKind, Trace};
use mathpad::notebook::Notebook;
use serde_json::json;

fn trace_of(notebook: &Notebook, id: u32) -> Trace {
    match notebook.entity(id).map(|e| &e.kind) {
        Some(EntityKind::Graph(g)) => g.trace.clone(),
        _ => panic!("#{} is not a graph", id),
    }
}

fn test_series_partition() {
    println!("\n====== Real/complex series partition ======");
    let mut notebook = Notebook::new();
    notebook.create_entity(Entity::function("r", "\\sqrt{x}"));
    let graph_id =
        notebook.create_entity(Entity::graph("x", "r", [-10.0, 10.0], [-10.0, 10.0]));

    let trace = trace_of(&notebook, graph_id);
    assert_eq!(trace.real.len() + trace.complex.len(), 101);
    println!("✓ 101 samples over a nonempty range, none lost");

    assert!(trace.complex.x.iter().all(|&x| x < 0.0));
    assert!(trace.real.x.iter().all(|&x| x >= 0.0));
    println!("✓ negative samples on the complex series, the rest on the real one");

    // sqrt of a negative is purely imaginary: the plotted real part is 0.
    assert!(trace.complex.y.iter().all(|&y| y == 0.0));
    println!("✓ complex series plots the real part");

    assert_eq!(trace.real.x.len(), trace.real.y.len());
    assert_eq!(trace.complex.x.len(), trace.complex.y.len());
    println!("✓ series stay parallel");
}

fn test_zero_width_range() {
    println!("\n====== Zero-width range ======");
    let mut notebook = Notebook::new();
    notebook.create_entity(Entity::function("r", "\\sqrt{x}"));
    let graph_id = notebook.create_entity(Entity::graph("x", "r", [5.0, 5.0], [-1.0, 1.0]));

    let trace = trace_of(&notebook, graph_id);
    assert_eq!(trace.real.len(), 1);
    assert!(trace.complex.is_empty());
    assert_eq!(trace.real.x[0], 5.0);
    assert!((trace.real.y[0] - 5f64.sqrt()).abs() < 1e-12);
    println!("✓ xrange [5, 5] produces exactly one sample");
}

fn test_missing_function() {
    println!("\n====== Missing function ======");
    let mut notebook = Notebook::new();
    let graph_id =
        notebook.create_entity(Entity::graph("x", "nope", [0.0, 1.0], [-1.0, 1.0]));

    let trace = trace_of(&notebook, graph_id);
    assert!(trace.real.is_empty() && trace.complex.is_empty());
    println!("✓ unresolvable yaxis yields two empty series, no error");
}

fn test_failed_samples_skipped() {
    println!("\n====== Failed samples ======");
    let mut notebook = Notebook::new();
    notebook.create_entity(Entity::function("inv", "\\frac{1}{x}"));

    // The single sample of a zero-width range at the pole fails and is
    // skipped; the trace simply ends up empty.
    let graph_id = notebook.create_entity(Entity::graph("x", "inv", [0.0, 0.0], [-1.0, 1.0]));
    let trace = trace_of(&notebook, graph_id);
    assert!(trace.real.is_empty() && trace.complex.is_empty());
    println!("✓ division by zero skips the sample instead of failing the sweep");

    // Away from the pole the same function samples normally.
    notebook.update_field(graph_id, "xrange", json!([5.0, 5.0])).unwrap();
    let trace = trace_of(&notebook, graph_id);
    assert_eq!(trace.real.len(), 1);
    assert!((trace.real.y[0] - 0.2).abs() < 1e-12);
    println!("✓ the sweep continues to work after failures");
}

fn test_propagation_into_graph() {
    println!("\n====== Propagation into a graph ======");
    let mut notebook = Notebook::new();
    notebook.create_entity(Entity::variable("a", 1.0));
    notebook.create_entity(Entity::function("f", "a\\cdot x"));
    let graph_id = notebook.create_entity(Entity::graph("x", "f", [0.0, 1.0], [-2.0, 2.0]));

    let trace = trace_of(&notebook, graph_id);
    let last = trace.real.len() - 1;
    assert!((trace.real.y[last] - trace.real.x[last]).abs() < 1e-9);

    notebook.set_symbol("a", 2.0);
    let trace = trace_of(&notebook, graph_id);
    assert!((trace.real.y[last] - 2.0 * trace.real.x[last]).abs() < 1e-9);
    println!("✓ a variable change re-samples the dependent graph synchronously");

    // The global scope is never polluted by the sampling binding.
    assert!(notebook.scope.get("x").is_none());
    println!("✓ sampling never mutates the shared scope");
}

fn test_idempotent_update() {
    println!("\n====== Idempotent update ======");
    let mut notebook = Notebook::new();
    notebook.create_entity(Entity::function("r", "\\sqrt{x}"));
    let graph_id = notebook.create_entity(Entity::graph("x", "r", [-1.0, 1.0], [-1.0, 1.0]));

    let before = trace_of(&notebook, graph_id);
    notebook.update_graph(graph_id);
    assert_eq!(before, trace_of(&notebook, graph_id));
    println!("✓ re-sampling with unchanged inputs reproduces the trace");
}

fn main() {
    test_series_partition();
    test_zero_width_range();
    test_missing_function();
    test_failed_samples_skipped();
    test_propagation_into_graph();
    test_idempotent_update();
    println!("\nAll graph tests passed.");
}
