use crate::entity::{CellValue, EntityKind};
use crate::expr::{self, Value};
use crate::notebook::Notebook;
use crate::scope;
use log::debug;

/// Significant digits kept when a table cell is stored for display.
pub const CELL_PRECISION: i32 = 4;

/// Rounds to `digits` significant digits. Presentation only — the rounded
/// value is stored for display and never fed back into computation.
pub fn round_sig(x: f64, digits: i32) -> f64 {
    if x == 0.0 || !x.is_finite() {
        return x;
    }
    let magnitude = x.abs().log10().floor() as i32;
    let factor = 10f64.powi(digits - 1 - magnitude);
    (x * factor).round() / factor
}

impl Notebook {
    /// Recomputes a table's `outputTable` in full from its `inputTable`,
    /// headers, and the current registry.
    ///
    /// Each row evaluates against the global scope overlaid with that row's
    /// input bindings (row-local bindings shadow globals of the same name).
    /// Each output header resolves to the live Function of that name; a
    /// missing function, a broken expression cache, an evaluation failure,
    /// or a complex result all store the `'?'` marker for that one cell and
    /// leave the rest of the sweep untouched. The whole `outputTable` is
    /// rebuilt, so no cell is ever left stale; with unchanged inputs the
    /// operation is idempotent, and zero input rows produce an empty output.
    pub fn evaluate_all_rows(&mut self, id: u32) {
        let (input_headers, input_table, output_headers) = match self.entity(id).map(|e| &e.kind) {
            Some(EntityKind::Table(t)) => (
                t.input_headers.clone(),
                t.input_table.clone(),
                t.output_headers.clone(),
            ),
            _ => return,
        };

        // Resolve and compile each referenced function once per sweep.
        let compiled: Vec<_> = output_headers
            .iter()
            .map(|name| {
                self.function_expression(name)
                    .and_then(|src| expr::compile(&src).ok())
            })
            .collect();

        let mut output = Vec::with_capacity(input_table.len());
        for row in &input_table {
            let row_scope = scope::with_row(&self.scope, &input_headers, row);
            let mut out_row = Vec::with_capacity(compiled.len());
            for function in &compiled {
                let cell = match function {
                    Some(compiled_expr) => match compiled_expr.eval(&row_scope) {
                        Ok(Value::Real(v)) => CellValue::Number(round_sig(v, CELL_PRECISION)),
                        Ok(Value::Complex(_)) | Err(_) => CellValue::undefined(),
                    },
                    None => CellValue::undefined(),
                };
                out_row.push(cell);
            }
            output.push(out_row);
        }

        debug!("table #{}: {} rows evaluated", id, output.len());
        if let Some(entity) = self.entity_mut(id) {
            if let EntityKind::Table(t) = &mut entity.kind {
                t.output_table = output;
            }
        }
    }
}
