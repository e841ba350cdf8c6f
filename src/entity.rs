use serde::{Deserialize, Serialize};

/// One scene object: a draggable card on the notebook canvas.
///
/// The `id` is unique among live entities and is recycled through the
/// notebook's free-list after deletion. `x`/`y` are the canvas position in
/// pixels; the engine stores them for the view layer but never reads them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: u32,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(flatten)]
    pub kind: EntityKind,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EntityKind {
    Variable(Variable),
    Function(Function),
    Table(Table),
    Graph(Graph),
    Text(TextNote),
    Form(Form),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variable {
    pub name: String,
    pub value: f64,
    #[serde(default = "Variable::default_value_type")]
    pub value_type: String,
}

impl Variable {
    fn default_value_type() -> String {
        "number".to_string()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    /// The markup source as typed in the formula editor.
    pub latex: String,
    /// Cached transpiler output. `None` when `latex` failed to transpile;
    /// recomputed whenever `latex` changes.
    #[serde(default)]
    pub expression: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    pub input_headers: Vec<String>,
    pub input_table: Vec<Vec<f64>>,
    pub output_headers: Vec<String>,
    #[serde(default)]
    pub output_table: Vec<Vec<CellValue>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    pub xaxis: String,
    pub yaxis: String,
    pub xrange: [f64; 2],
    pub yrange: [f64; 2],
    #[serde(default)]
    pub trace: Trace,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TextNote {
    pub value: String,
    pub width: f64,
    pub height: f64,
}

/// A pending edit form: the draft markup being typed, and the entity it
/// edits (if it is bound to one).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Form {
    pub value: String,
    #[serde(default)]
    pub target: Option<u32>,
}

/// One table output cell: a number, or the explicit `'?'` marker standing in
/// for a failed or unresolvable computation. The marker is stored, never
/// silently dropped, so a recompute always overwrites stale cells.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Number(f64),
    Marker(String),
}

impl CellValue {
    pub const UNDEFINED: &'static str = "?";

    pub fn undefined() -> CellValue {
        CellValue::Marker(CellValue::UNDEFINED.to_string())
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, CellValue::Marker(_))
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(x) => Some(*x),
            CellValue::Marker(_) => None,
        }
    }
}

/// A plottable series: parallel x/y sequences, always equal length.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl Series {
    pub fn push(&mut self, x: f64, y: f64) {
        self.x.push(x);
        self.y.push(y);
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

/// A graph's derived plot data: real-valued samples and samples whose result
/// carried a nonzero imaginary component (plotted by their real part). Both
/// series are rebuilt together so a half-updated trace is never observable.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    pub real: Series,
    pub complex: Series,
}

impl Entity {
    pub fn variable(name: &str, value: f64) -> Entity {
        Entity {
            id: 0,
            x: 0.0,
            y: 0.0,
            kind: EntityKind::Variable(Variable {
                name: name.to_string(),
                value,
                value_type: Variable::default_value_type(),
            }),
        }
    }

    pub fn function(name: &str, latex: &str) -> Entity {
        Entity {
            id: 0,
            x: 0.0,
            y: 0.0,
            kind: EntityKind::Function(Function {
                name: name.to_string(),
                latex: latex.to_string(),
                expression: None,
            }),
        }
    }

    pub fn table(input_headers: Vec<String>, output_headers: Vec<String>) -> Entity {
        Entity {
            id: 0,
            x: 0.0,
            y: 0.0,
            kind: EntityKind::Table(Table {
                input_headers,
                input_table: Vec::new(),
                output_headers,
                output_table: Vec::new(),
            }),
        }
    }

    pub fn graph(xaxis: &str, yaxis: &str, xrange: [f64; 2], yrange: [f64; 2]) -> Entity {
        Entity {
            id: 0,
            x: 0.0,
            y: 0.0,
            kind: EntityKind::Graph(Graph {
                xaxis: xaxis.to_string(),
                yaxis: yaxis.to_string(),
                xrange,
                yrange,
                trace: Trace::default(),
            }),
        }
    }

    pub fn text(value: &str) -> Entity {
        Entity {
            id: 0,
            x: 0.0,
            y: 0.0,
            kind: EntityKind::Text(TextNote {
                value: value.to_string(),
                width: 200.0,
                height: 100.0,
            }),
        }
    }

    pub fn form(value: &str, target: Option<u32>) -> Entity {
        Entity {
            id: 0,
            x: 0.0,
            y: 0.0,
            kind: EntityKind::Form(Form {
                value: value.to_string(),
                target,
            }),
        }
    }

    pub fn at(mut self, x: f64, y: f64) -> Entity {
        self.x = x;
        self.y = y;
        self
    }

    /// The symbol this entity owns in the registry, if it owns one.
    pub fn symbol_name(&self) -> Option<&str> {
        match &self.kind {
            EntityKind::Variable(v) => Some(&v.name),
            EntityKind::Function(f) => Some(&f.name),
            _ => None,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            EntityKind::Variable(_) => "variable",
            EntityKind::Function(_) => "function",
            EntityKind::Table(_) => "table",
            EntityKind::Graph(_) => "graph",
            EntityKind::Text(_) => "text",
            EntityKind::Form(_) => "form",
        }
    }
}
