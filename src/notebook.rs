use crate::entity::{Entity, EntityKind};
use crate::scope::Scope;
use crate::transpile::transpile;
use log::{debug, warn};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotebookError {
    #[error("no entity with id {0}")]
    NoSuchEntity(u32),
    #[error("entity {0} has no name to rename")]
    NotNamed(u32),
    #[error("unknown field `{key}` for this entity kind")]
    UnknownField { key: String },
    #[error("invalid value for field `{key}`")]
    InvalidValue { key: String },
    #[error("could not parse records: {0}")]
    Load(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// One open notebook session: the named-entity store and the symbol
/// registry, mutated only through the operations below. Entities live in a
/// slot vector indexed by id; deleted ids go to a free-list and are handed
/// out again first. `order` lists live ids in creation order, which is the
/// deterministic order every scan and every serialization uses.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Notebook {
    pub entities: Vec<Option<Entity>>,
    pub order: Vec<u32>,
    pub free_ids: Vec<u32>,
    pub scope: Scope,
}

impl Notebook {
    pub fn new() -> Notebook {
        Notebook::default()
    }

    pub fn entity(&self, id: u32) -> Option<&Entity> {
        self.entities.get(id as usize).and_then(|slot| slot.as_ref())
    }

    pub fn entity_mut(&mut self, id: u32) -> Option<&mut Entity> {
        self.entities.get_mut(id as usize).and_then(|slot| slot.as_mut())
    }

    /// Live ids in creation order.
    pub fn live_ids(&self) -> &[u32] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    fn alloc_id(&mut self) -> u32 {
        if let Some(id) = self.free_ids.pop() {
            id
        } else {
            self.entities.push(None);
            (self.entities.len() - 1) as u32
        }
    }

    /// Inserts an entity, assigning it a fresh id (recycled from the
    /// free-list when one is available). A Variable registers its symbol, a
    /// Function gets its markup transpiled into the expression cache, and a
    /// Table or Graph is evaluated immediately; in every case dependents of
    /// the new name are propagated so previously unresolvable references
    /// pick it up.
    pub fn create_entity(&mut self, mut entity: Entity) -> u32 {
        if let EntityKind::Function(f) = &mut entity.kind {
            f.expression = match transpile(&f.latex) {
                Ok(expr) => Some(expr),
                Err(e) => {
                    warn!("function `{}`: {}", f.name, e);
                    None
                }
            };
        }

        let id = self.alloc_id();
        entity.id = id;
        debug!("create {} #{}", entity.kind_name(), id);

        let followup = match &entity.kind {
            EntityKind::Variable(v) => Some((v.name.clone(), Some(v.value))),
            EntityKind::Function(f) => Some((f.name.clone(), None)),
            _ => None,
        };

        self.entities[id as usize] = Some(entity);
        self.order.push(id);

        match followup {
            Some((name, Some(value))) => self.set_symbol(&name, value),
            Some((name, None)) => self.propagate(&name),
            None => match self.entity(id).map(|e| e.kind_name()) {
                Some("table") => self.evaluate_all_rows(id),
                Some("graph") => self.update_graph(id),
                _ => {}
            },
        }

        id
    }

    /// Removes an entity and recycles its id. A Variable's or Function's
    /// registry entry is removed with it (scope entries are bound to the
    /// owning entity's lifetime), and dependents are propagated so their
    /// cells and traces degrade to the undefined marker rather than holding
    /// stale values.
    pub fn delete_entity(&mut self, id: u32) -> bool {
        let entity = match self.entities.get_mut(id as usize).and_then(|slot| slot.take()) {
            Some(entity) => entity,
            None => return false,
        };
        self.order.retain(|&live| live != id);
        self.free_ids.push(id);
        debug!("delete {} #{}", entity.kind_name(), id);

        if let Some(name) = entity.symbol_name() {
            let name = name.to_string();
            self.scope.remove(&name);
            self.propagate(&name);
        }
        true
    }

    /// Clears the whole session: entities, free-list, and registry. The next
    /// created entity gets id 0 again.
    pub fn delete_all(&mut self) {
        self.entities.clear();
        self.order.clear();
        self.free_ids.clear();
        self.scope.clear();
    }

    /// Overwrites the registry entry and re-runs every dependent table and
    /// graph.
    pub fn set_symbol(&mut self, name: &str, value: f64) {
        self.scope.insert(name.to_string(), value);
        self.propagate(name);
    }

    /// First live Function of that name, in creation order; `None` both when
    /// no such function exists and when its markup failed to transpile (the
    /// two cases degrade identically downstream).
    pub fn function_expression(&self, name: &str) -> Option<String> {
        for &id in &self.order {
            if let Some(EntityKind::Function(f)) = self.entity(id).map(|e| &e.kind) {
                if f.name == name {
                    return f.expression.clone();
                }
            }
        }
        None
    }

    /// Re-evaluates every live entity whose configuration references the
    /// changed symbol.
    ///
    /// The dependency graph is implicit — entities reference each other by
    /// name, not by id — so this is a full scan of all live entities per
    /// change, O(entities), deterministic in creation order. The affected
    /// set is the changed name plus every function whose expression mentions
    /// it as a whole identifier: tables and graphs list *function* names, so
    /// a variable edit reaches them through that one-level closure.
    pub fn propagate(&mut self, name: &str) {
        let mut affected: Vec<String> = vec![name.to_string()];
        if let Ok(reference) = Regex::new(&format!(r"\b{}\b", regex::escape(name))) {
            for &id in &self.order {
                if let Some(EntityKind::Function(f)) = self.entity(id).map(|e| &e.kind) {
                    if let Some(expr) = &f.expression {
                        if reference.is_match(expr) && !affected.contains(&f.name) {
                            affected.push(f.name.clone());
                        }
                    }
                }
            }
        }

        enum Recompute {
            Table,
            Graph,
        }

        let order = self.order.clone();
        let mut touched = 0usize;
        for id in order {
            let recompute = match self.entity(id).map(|e| &e.kind) {
                Some(EntityKind::Table(t))
                    if t.output_headers.iter().any(|h| affected.contains(h)) =>
                {
                    Some(Recompute::Table)
                }
                Some(EntityKind::Graph(g)) if affected.contains(&g.yaxis) => {
                    Some(Recompute::Graph)
                }
                _ => None,
            };
            match recompute {
                Some(Recompute::Table) => {
                    self.evaluate_all_rows(id);
                    touched += 1;
                }
                Some(Recompute::Graph) => {
                    self.update_graph(id);
                    touched += 1;
                }
                None => {}
            }
        }
        debug!("propagate `{}`: {} entities recomputed", name, touched);
    }

    /// Generic field setter, the single entry point for every edit
    /// interaction: drag (`x`/`y`), rename (`name`), value and
    /// configuration changes. Edits that touch a registered symbol or an
    /// evaluated configuration trigger the corresponding recomputation
    /// before returning.
    pub fn update_field(&mut self, id: u32, key: &str, value: JsonValue) -> Result<(), NotebookError> {
        fn typed<T: serde::de::DeserializeOwned>(key: &str, value: JsonValue) -> Result<T, NotebookError> {
            serde_json::from_value(value).map_err(|_| NotebookError::InvalidValue { key: key.to_string() })
        }

        // Position moves apply to every kind and trigger nothing.
        if key == "x" || key == "y" {
            let v: f64 = typed(key, value)?;
            let entity = self.entity_mut(id).ok_or(NotebookError::NoSuchEntity(id))?;
            if key == "x" {
                entity.x = v;
            } else {
                entity.y = v;
            }
            return Ok(());
        }

        if key == "name" {
            let new_name: String = typed(key, value)?;
            return self.request_rename(id, &new_name);
        }

        let kind = match self.entity(id) {
            Some(entity) => entity.kind_name(),
            None => return Err(NotebookError::NoSuchEntity(id)),
        };

        match (kind, key) {
            ("variable", "value") => {
                let v: f64 = typed(key, value)?;
                let name = match &mut self.entity_mut(id).unwrap().kind {
                    EntityKind::Variable(var) => {
                        var.value = v;
                        var.name.clone()
                    }
                    _ => unreachable!(),
                };
                self.set_symbol(&name, v);
            }
            ("variable", "valueType") => {
                let v: String = typed(key, value)?;
                if let EntityKind::Variable(var) = &mut self.entity_mut(id).unwrap().kind {
                    var.value_type = v;
                }
            }
            ("function", "latex") => {
                let markup: String = typed(key, value)?;
                let expression = match transpile(&markup) {
                    Ok(expr) => Some(expr),
                    Err(e) => {
                        warn!("entity #{}: {}", id, e);
                        None
                    }
                };
                let name = match &mut self.entity_mut(id).unwrap().kind {
                    EntityKind::Function(f) => {
                        f.latex = markup;
                        f.expression = expression;
                        f.name.clone()
                    }
                    _ => unreachable!(),
                };
                self.propagate(&name);
            }
            ("table", "inputHeaders") => {
                let v: Vec<String> = typed(key, value)?;
                if let EntityKind::Table(t) = &mut self.entity_mut(id).unwrap().kind {
                    t.input_headers = v;
                }
                self.evaluate_all_rows(id);
            }
            ("table", "inputTable") => {
                let v: Vec<Vec<f64>> = typed(key, value)?;
                if let EntityKind::Table(t) = &mut self.entity_mut(id).unwrap().kind {
                    t.input_table = v;
                }
                self.evaluate_all_rows(id);
            }
            ("table", "outputHeaders") => {
                let v: Vec<String> = typed(key, value)?;
                if let EntityKind::Table(t) = &mut self.entity_mut(id).unwrap().kind {
                    t.output_headers = v;
                }
                self.evaluate_all_rows(id);
            }
            ("graph", "xaxis") | ("graph", "yaxis") => {
                let v: String = typed(key, value)?;
                if let EntityKind::Graph(g) = &mut self.entity_mut(id).unwrap().kind {
                    if key == "xaxis" {
                        g.xaxis = v;
                    } else {
                        g.yaxis = v;
                    }
                }
                self.update_graph(id);
            }
            ("graph", "xrange") | ("graph", "yrange") => {
                let v: [f64; 2] = typed(key, value)?;
                if let EntityKind::Graph(g) = &mut self.entity_mut(id).unwrap().kind {
                    if key == "xrange" {
                        g.xrange = v;
                    } else {
                        g.yrange = v;
                    }
                }
                self.update_graph(id);
            }
            ("text", "value") => {
                let v: String = typed(key, value)?;
                if let EntityKind::Text(t) = &mut self.entity_mut(id).unwrap().kind {
                    t.value = v;
                }
            }
            ("text", "width") | ("text", "height") => {
                let v: f64 = typed(key, value)?;
                if let EntityKind::Text(t) = &mut self.entity_mut(id).unwrap().kind {
                    if key == "width" {
                        t.width = v;
                    } else {
                        t.height = v;
                    }
                }
            }
            ("form", "value") => {
                let v: String = typed(key, value)?;
                if let EntityKind::Form(form) = &mut self.entity_mut(id).unwrap().kind {
                    form.value = v;
                }
            }
            ("form", "target") => {
                let v: Option<u32> = typed(key, value)?;
                if let EntityKind::Form(form) = &mut self.entity_mut(id).unwrap().kind {
                    form.target = v;
                }
            }
            _ => {
                return Err(NotebookError::UnknownField { key: key.to_string() });
            }
        }
        Ok(())
    }

    /// Explicit rename command (the engine-side replacement for the UI's
    /// rename prompt). For a Variable the registry entry moves to the new
    /// name; in every case both the old and the new name are propagated, so
    /// stale references degrade and resolvable ones pick the entity up.
    pub fn request_rename(&mut self, id: u32, new_name: &str) -> Result<(), NotebookError> {
        let entity = self.entity(id).ok_or(NotebookError::NoSuchEntity(id))?;
        let (old_name, variable_value) = match &entity.kind {
            EntityKind::Variable(v) => (v.name.clone(), Some(v.value)),
            EntityKind::Function(f) => (f.name.clone(), None),
            _ => return Err(NotebookError::NotNamed(id)),
        };

        match &mut self.entity_mut(id).unwrap().kind {
            EntityKind::Variable(v) => v.name = new_name.to_string(),
            EntityKind::Function(f) => f.name = new_name.to_string(),
            _ => unreachable!(),
        }

        if let Some(value) = variable_value {
            self.scope.remove(&old_name);
            self.scope.insert(new_name.to_string(), value);
        }

        self.propagate(&old_name);
        self.propagate(new_name);
        Ok(())
    }

    /// Live entities in creation order, each in its persisted record shape.
    /// Feeding the output back through `create_entity` reconstructs an
    /// equivalent scene (ids may be renumbered).
    pub fn to_records(&self) -> Vec<Entity> {
        self.order
            .iter()
            .filter_map(|&id| self.entity(id).cloned())
            .collect()
    }

    /// Parses a JSON array of entity records and creates each one.
    /// Parse-then-apply: the whole array is deserialized before the first
    /// entity is created, so malformed input leaves the live scene
    /// untouched. Returns the number of entities created.
    pub fn load_records(&mut self, json: &str) -> Result<usize, NotebookError> {
        let records: Vec<Entity> = serde_json::from_str(json).map_err(|e| {
            warn!("rejecting records: {}", e);
            e
        })?;
        let count = records.len();
        for record in records {
            self.create_entity(record);
        }
        Ok(count)
    }
}
