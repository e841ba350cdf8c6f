use mathpad::entity::{CellValue, Entity, EntityKind};
use mathpad::notebook::Notebook;
use mathpad::saving;
use serde_json::json;
use std::io::{self, Write};

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    let mut notebook = Notebook::new();

    // Optional session file to resume from.
    if args.len() >= 2 {
        match saving::load_notebook(&args[1]) {
            Ok(loaded) => {
                println!("loaded session from {}", args[1]);
                notebook = loaded;
            }
            Err(e) => {
                eprintln!("could not load {}: {}", args[1], e);
            }
        }
    }

    let mut status = String::from("ok");
    loop {
        print!("({}) > ", status);
        io::stdout().flush().unwrap();

        let mut line = String::new();
        if io::stdin().read_line(&mut line).is_err() {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "q" || line == "quit" {
            break;
        }

        status = run_command(&mut notebook, line);
    }
}

fn run_command(notebook: &mut Notebook, line: &str) -> String {
    let mut parts = line.splitn(2, ' ');
    let command = parts.next().unwrap_or("");
    let rest = parts.next().unwrap_or("").trim();

    match command {
        "help" => {
            println!("Commands:");
            println!("  var <name> <value>              create a variable");
            println!("  fn <name> <markup>              create a function from formula markup");
            println!("  table <in1,in2> <out1,out2>     create a table");
            println!("  row <id> <v1,v2,...>            append an input row to a table");
            println!("  graph <xaxis> <yaxis> <lo> <hi> create a graph");
            println!("  note <text>                     create a text note");
            println!("  set <name> <value>              change a variable's value");
            println!("  rename <id> <new-name>          rename a variable or function");
            println!("  del <id>                        delete an entity");
            println!("  show                            list the scene");
            println!("  json                            print the scene as entity records");
            println!("  export <file> / import <file>   entity records as JSON");
            #[cfg(feature = "render")]
            println!("  plot <id> <file>                render a graph to PNG");
            println!("  save <file> / load <file>       whole-session snapshot");
            println!("  clear                           delete everything");
            println!("  q                               quit");
            "ok".to_string()
        }
        "var" => {
            let mut args = rest.split_whitespace();
            match (args.next(), args.next().and_then(|v| v.parse::<f64>().ok())) {
                (Some(name), Some(value)) => {
                    let id = notebook.create_entity(Entity::variable(name, value));
                    format!("variable #{}", id)
                }
                _ => "usage: var <name> <value>".to_string(),
            }
        }
        "fn" => {
            let mut args = rest.splitn(2, ' ');
            match (args.next(), args.next()) {
                (Some(name), Some(markup)) if !name.is_empty() && !markup.trim().is_empty() => {
                    let id = notebook.create_entity(Entity::function(name, markup.trim()));
                    match notebook.function_expression(name) {
                        Some(expr) => format!("function #{}: {}", id, expr),
                        None => format!("function #{}: markup did not transpile", id),
                    }
                }
                _ => "usage: fn <name> <markup>".to_string(),
            }
        }
        "table" => {
            let mut args = rest.split_whitespace();
            match (args.next(), args.next()) {
                (Some(inputs), Some(outputs)) => {
                    let input_headers = inputs.split(',').map(str::to_string).collect();
                    let output_headers = outputs.split(',').map(str::to_string).collect();
                    let id = notebook.create_entity(Entity::table(input_headers, output_headers));
                    format!("table #{}", id)
                }
                _ => "usage: table <in1,in2> <out1,out2>".to_string(),
            }
        }
        "row" => {
            let mut args = rest.split_whitespace();
            let id = args.next().and_then(|v| v.parse::<u32>().ok());
            let values: Option<Vec<f64>> = args
                .next()
                .map(|vs| vs.split(',').map(|v| v.parse::<f64>()).collect::<Result<_, _>>())
                .and_then(Result::ok);
            match (id, values) {
                (Some(id), Some(values)) => {
                    let rows = match notebook.entity(id).map(|e| &e.kind) {
                        Some(EntityKind::Table(t)) => {
                            let mut rows = t.input_table.clone();
                            rows.push(values);
                            rows
                        }
                        _ => return format!("#{} is not a table", id),
                    };
                    match notebook.update_field(id, "inputTable", json!(rows)) {
                        Ok(()) => "ok".to_string(),
                        Err(e) => e.to_string(),
                    }
                }
                _ => "usage: row <id> <v1,v2,...>".to_string(),
            }
        }
        "graph" => {
            let mut args = rest.split_whitespace();
            let xaxis = args.next();
            let yaxis = args.next();
            let lo = args.next().and_then(|v| v.parse::<f64>().ok());
            let hi = args.next().and_then(|v| v.parse::<f64>().ok());
            match (xaxis, yaxis, lo, hi) {
                (Some(xaxis), Some(yaxis), Some(lo), Some(hi)) => {
                    let id = notebook
                        .create_entity(Entity::graph(xaxis, yaxis, [lo, hi], [-10.0, 10.0]));
                    format!("graph #{}", id)
                }
                _ => "usage: graph <xaxis> <yaxis> <lo> <hi>".to_string(),
            }
        }
        "note" => {
            let id = notebook.create_entity(Entity::text(rest));
            format!("note #{}", id)
        }
        "set" => {
            let mut args = rest.split_whitespace();
            match (args.next(), args.next().and_then(|v| v.parse::<f64>().ok())) {
                (Some(name), Some(value)) => {
                    // Prefer updating the owning variable entity so the scene
                    // and the registry stay in step.
                    let owner = notebook
                        .live_ids()
                        .iter()
                        .copied()
                        .find(|&id| match notebook.entity(id).map(|e| &e.kind) {
                            Some(EntityKind::Variable(v)) => v.name == name,
                            _ => false,
                        });
                    match owner {
                        Some(id) => match notebook.update_field(id, "value", json!(value)) {
                            Ok(()) => "ok".to_string(),
                            Err(e) => e.to_string(),
                        },
                        None => {
                            notebook.set_symbol(name, value);
                            "ok (unowned symbol)".to_string()
                        }
                    }
                }
                _ => "usage: set <name> <value>".to_string(),
            }
        }
        "rename" => {
            let mut args = rest.split_whitespace();
            match (args.next().and_then(|v| v.parse::<u32>().ok()), args.next()) {
                (Some(id), Some(new_name)) => match notebook.request_rename(id, new_name) {
                    Ok(()) => "ok".to_string(),
                    Err(e) => e.to_string(),
                },
                _ => "usage: rename <id> <new-name>".to_string(),
            }
        }
        "del" => match rest.parse::<u32>() {
            Ok(id) if notebook.delete_entity(id) => "ok".to_string(),
            Ok(id) => format!("no entity #{}", id),
            Err(_) => "usage: del <id>".to_string(),
        },
        "show" => {
            show_scene(notebook);
            "ok".to_string()
        }
        "json" => match serde_json::to_string_pretty(&notebook.to_records()) {
            Ok(json) => {
                println!("{}", json);
                "ok".to_string()
            }
            Err(e) => e.to_string(),
        },
        "export" => match saving::export_records(notebook, rest) {
            Ok(()) => "ok".to_string(),
            Err(e) => e.to_string(),
        },
        "import" => match saving::import_records(notebook, rest) {
            Ok(n) => format!("{} entities imported", n),
            Err(e) => e.to_string(),
        },
        "save" => match saving::save_notebook(notebook, rest) {
            Ok(()) => "ok".to_string(),
            Err(e) => e.to_string(),
        },
        "load" => match saving::load_notebook(rest) {
            Ok(loaded) => {
                *notebook = loaded;
                "ok".to_string()
            }
            Err(e) => e.to_string(),
        },
        #[cfg(feature = "render")]
        "plot" => {
            let mut args = rest.split_whitespace();
            match (args.next().and_then(|v| v.parse::<u32>().ok()), args.next()) {
                (Some(id), Some(path)) => match notebook.entity(id).map(|e| &e.kind) {
                    Some(EntityKind::Graph(g)) => {
                        let options = mathpad::render::PlotOptions {
                            title: format!("{}({})", g.yaxis, g.xaxis),
                            x_label: g.xaxis.clone(),
                            y_label: g.yaxis.clone(),
                            y_bounds: Some(g.yrange),
                            ..Default::default()
                        };
                        match mathpad::render::render_graph(&g.trace, &options, path) {
                            Ok(()) => "ok".to_string(),
                            Err(e) => e.to_string(),
                        }
                    }
                    _ => format!("#{} is not a graph", id),
                },
                _ => "usage: plot <id> <file>".to_string(),
            }
        }
        "clear" => {
            notebook.delete_all();
            "ok".to_string()
        }
        _ => "invalid command (try `help`)".to_string(),
    }
}

fn show_scene(notebook: &Notebook) {
    if notebook.is_empty() {
        println!("(empty scene)");
        return;
    }
    for &id in notebook.live_ids() {
        let entity = match notebook.entity(id) {
            Some(entity) => entity,
            None => continue,
        };
        match &entity.kind {
            EntityKind::Variable(v) => println!("#{} variable {} = {}", id, v.name, v.value),
            EntityKind::Function(f) => match &f.expression {
                Some(expr) => println!("#{} function {} = {}", id, f.name, expr),
                None => println!("#{} function {} (invalid markup)", id, f.name),
            },
            EntityKind::Table(t) => {
                println!(
                    "#{} table [{}] -> [{}]",
                    id,
                    t.input_headers.join(", "),
                    t.output_headers.join(", ")
                );
                for (inputs, outputs) in t.input_table.iter().zip(t.output_table.iter()) {
                    let outputs: Vec<String> = outputs
                        .iter()
                        .map(|cell| match cell {
                            CellValue::Number(x) => x.to_string(),
                            CellValue::Marker(m) => m.clone(),
                        })
                        .collect();
                    println!(
                        "      {} | {}",
                        inputs
                            .iter()
                            .map(f64::to_string)
                            .collect::<Vec<_>>()
                            .join("\t"),
                        outputs.join("\t")
                    );
                }
            }
            EntityKind::Graph(g) => println!(
                "#{} graph {}({}) over [{}, {}]: {} real / {} complex samples",
                id,
                g.yaxis,
                g.xaxis,
                g.xrange[0],
                g.xrange[1],
                g.trace.real.len(),
                g.trace.complex.len()
            ),
            EntityKind::Text(t) => println!("#{} text \"{}\"", id, t.value),
            EntityKind::Form(f) => println!("#{} form \"{}\"", id, f.value),
        }
    }
}
