use mathpad::entity::{Entity, EntityKind};
use mathpad::notebook::Notebook;
use mathpad::saving::{export_records, import_records, load_notebook, save_notebook};
use serde_json::json;

fn build_scene() -> Notebook {
    let mut notebook = Notebook::new();
    notebook.create_entity(Entity::variable("a", 2.0).at(10.0, 20.0));
    notebook.create_entity(Entity::function("f", "a\\cdot x^{2}").at(30.0, 40.0));
    let table_id = notebook.create_entity(Entity::table(
        vec!["x".to_string()],
        vec!["f".to_string()],
    ));
    notebook
        .update_field(table_id, "inputTable", json!([[1.0], [2.0]]))
        .unwrap();
    notebook.create_entity(Entity::graph("x", "f", [0.0, 1.0], [-5.0, 5.0]));
    notebook.create_entity(Entity::text("hello"));
    notebook.create_entity(Entity::form("a+1", Some(0)));
    notebook
}

fn kind_counts(notebook: &Notebook) -> Vec<(&'static str, usize)> {
    let mut counts: Vec<(&'static str, usize)> = Vec::new();
    for &id in notebook.live_ids() {
        let name = notebook.entity(id).unwrap().kind_name();
        match counts.iter_mut().find(|(k, _)| *k == name) {
            Some((_, n)) => *n += 1,
            None => counts.push((name, 1)),
        }
    }
    counts
}

fn test_record_shape() {
    println!("\n====== Record shape ======");
    let notebook = build_scene();
    let records = serde_json::to_value(notebook.to_records()).unwrap();

    let variable = &records[0];
    assert_eq!(variable["type"], "variable");
    assert_eq!(variable["id"], 0);
    assert_eq!(variable["name"], "a");
    assert_eq!(variable["value"], 2.0);
    assert_eq!(variable["valueType"], "number");
    assert_eq!(variable["x"], 10.0);
    println!("✓ variable record carries type, id, position, and payload flat");

    let table = &records[2];
    assert_eq!(table["type"], "table");
    assert!(table["inputHeaders"].is_array());
    assert!(table["outputTable"].is_array());
    println!("✓ table record uses the boundary field names");

    let function = &records[1];
    assert_eq!(function["latex"], "a\\cdot x^{2}");
    assert_eq!(function["expression"], "a*x^(2)");
    println!("✓ function record keeps both markup and derived expression");
}

fn test_json_round_trip() {
    println!("\n====== JSON record round trip ======");
    let original = build_scene();
    let json = serde_json::to_string(&original.to_records()).unwrap();

    let mut restored = Notebook::new();
    let count = restored.load_records(&json).unwrap();
    assert_eq!(count, original.len());
    assert_eq!(kind_counts(&original), kind_counts(&restored));
    println!("✓ entity counts per type survive the round trip");

    assert_eq!(restored.scope.get("a"), Some(&2.0));
    assert_eq!(
        restored.function_expression("f"),
        original.function_expression("f")
    );
    println!("✓ registry and expression cache rebuilt on import");

    // The restored table recomputed to the same outputs.
    let table_outputs = |notebook: &Notebook| {
        notebook
            .live_ids()
            .iter()
            .find_map(|&id| match notebook.entity(id).map(|e| &e.kind) {
                Some(EntityKind::Table(t)) => Some(t.output_table.clone()),
                _ => None,
            })
            .unwrap()
    };
    assert_eq!(table_outputs(&original), table_outputs(&restored));
    println!("✓ table outputs identical after reconstruction");

    let graph_trace = |notebook: &Notebook| {
        notebook
            .live_ids()
            .iter()
            .find_map(|&id| match notebook.entity(id).map(|e| &e.kind) {
                Some(EntityKind::Graph(g)) => Some(g.trace.clone()),
                _ => None,
            })
            .unwrap()
    };
    assert_eq!(graph_trace(&original), graph_trace(&restored));
    println!("✓ graph trace identical after reconstruction");
}

fn test_malformed_import() {
    println!("\n====== Malformed import ======");
    let mut notebook = build_scene();
    let before = notebook.len();

    assert!(notebook.load_records("this is not json").is_err());
    assert_eq!(notebook.len(), before);
    println!("✓ malformed JSON rejected without touching the scene");

    assert!(notebook.load_records("[{\"type\": \"mystery\"}]").is_err());
    assert_eq!(notebook.len(), before);
    println!("✓ unknown entity type rejected without touching the scene");
}

fn test_file_round_trips() -> std::io::Result<()> {
    println!("\n====== File round trips ======");
    let dir = tempfile::tempdir()?;
    let notebook = build_scene();

    // JSON records on disk.
    let records_path = dir.path().join("scene.json");
    let records_path = records_path.to_str().unwrap();
    export_records(&notebook, records_path).unwrap();
    let mut imported = Notebook::new();
    let count = import_records(&mut imported, records_path).unwrap();
    assert_eq!(count, notebook.len());
    assert_eq!(kind_counts(&notebook), kind_counts(&imported));
    println!("✓ exported records import into an equivalent scene");

    // Compressed whole-session snapshot.
    let snapshot_path = dir.path().join("session.json.gz");
    let snapshot_path = snapshot_path.to_str().unwrap();
    save_notebook(&notebook, snapshot_path)?;
    let loaded = load_notebook(snapshot_path)?;
    assert_eq!(loaded.len(), notebook.len());
    assert_eq!(loaded.live_ids(), notebook.live_ids());
    assert_eq!(loaded.scope, notebook.scope);
    println!("✓ snapshot save/load preserves the session");

    // A missing import file surfaces as an error, not a panic.
    let missing = dir.path().join("nope.json");
    let mut untouched = build_scene();
    assert!(import_records(&mut untouched, missing.to_str().unwrap()).is_err());
    println!("✓ missing file reported as an error");
    Ok(())
}

fn main() -> std::io::Result<()> {
    test_record_shape();
    test_json_round_trip();
    test_malformed_import();
    test_file_round_trips()?;
    println!("\nAll saving tests passed.");
    Ok(())
}
