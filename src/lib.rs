/*!
# Mathpad

The recalculation engine behind a freeform "math notebook": a canvas of
named objects — variables, functions entered as formula markup, data
tables, 2-D plots, text notes — with live recalculation whenever a
variable or function changes.

## Overview

Entities reference each other by *name*, not by object reference: a table
column names the function it tabulates, a graph names the function it
samples and the variable it varies. The dependency graph is therefore
implicit, and recalculation works by exhaustively re-scanning the live
scene on every symbol change — simple, deterministic, and fast at
notebook scale (tens to low hundreds of objects).

## Core Components

- **Expression Transpiler** - Rewrites the formula editor's brace-delimited
  markup (fractions, exponents, roots, trig, logs) into a linear
  expression string
- **Expression Evaluator** - Compiles linear expressions and evaluates
  them against the symbol registry, promoting into the complex domain
  where an operation demands it
- **Symbol Registry** - The name-to-value scope all evaluation runs
  against
- **Notebook Store** - Slot-indexed entity storage with free-list id
  recycling and creation-order scans
- **Recalculation Propagator** - Finds every table and graph affected by
  a changed symbol and re-evaluates it before the mutating call returns
- **Table Engine** - Recomputes every output cell from every input row,
  isolating per-cell failures behind the `'?'` marker
- **Graph Generator** - Samples a function over a range and splits the
  results into real and complex series
- **Persistence** - JSON entity records (round-trippable) and gzipped
  whole-session snapshots
- **Rendering** (feature `render`) - Draws computed traces to PNG via
  plotters

## Error Philosophy

Nothing in the scene is allowed to take down anything else: malformed
markup disables one function, an unresolvable name blanks one cell or one
trace, a bad import file changes nothing at all.

## Modules

- **transpile**: markup-to-linear expression rewriting
- **expr**: the math backend (lexer, parser, complex-capable evaluator)
- **scope**: the symbol registry and its overlay helpers
- **entity**: the scene entity data model and boundary record shapes
- **notebook**: the entity store, registry writes, and propagation
- **table**: table evaluation
- **graph**: graph series generation
- **render**: plotters-based chart output (feature `render`)
- **saving**: snapshots and record import/export
*/

pub mod entity;
pub mod expr;
pub mod graph;
pub mod notebook;
pub mod render;
pub mod saving;
pub mod scope;
pub mod table;
pub mod transpile;

pub use entity::*;
pub use expr::{CompiledExpr, EvalError, Value, compile, evaluate};
pub use notebook::{Notebook, NotebookError};
pub use scope::Scope;
pub use transpile::{TranspileError, transpile};
