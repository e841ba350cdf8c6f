use std::collections::HashMap;

/// The symbol registry: every declared variable's name mapped to its current
/// value. Keys are unique, the last writer wins, and there is no versioning —
/// an update overwrites in place. Entries live and die with the entity that
/// owns them (see `Notebook::create_entity` / `delete_entity`).
pub type Scope = HashMap<String, f64>;

/// A copy of `global` with one extra binding, shadowing any global entry of
/// the same name. Used by the graph engine to bind the running sample value
/// without ever mutating the shared scope.
pub fn with_binding(global: &Scope, name: &str, value: f64) -> Scope {
    let mut local = global.clone();
    local.insert(name.to_string(), value);
    local
}

/// A copy of `global` overlaid with one table row: `headers[i]` bound to
/// `row[i]`. Row-local bindings shadow globals of the same name; a ragged
/// row simply binds as many pairs as both sides have.
pub fn with_row(global: &Scope, headers: &[String], row: &[f64]) -> Scope {
    let mut local = global.clone();
    for (name, value) in headers.iter().zip(row.iter()) {
        local.insert(name.clone(), *value);
    }
    local
}
