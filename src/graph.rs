use crate::entity::{EntityKind, Trace};
use crate::expr::{self, Value};
use crate::notebook::Notebook;
use crate::scope;
use log::debug;

/// Number of steps a graph's x-range is divided into (101 samples for a
/// nonempty range).
pub const SAMPLE_STEPS: usize = 100;

impl Notebook {
    /// Regenerates a graph's `trace` from its range and axis names.
    ///
    /// The sample sequence runs from the low bound in steps of
    /// `|hi - lo| / 100`, inclusive of the upper bound (half-open against
    /// `hi + delta`); a zero-width range yields the single sample `lo`. Each
    /// sample is bound to `xaxis` in a copy of the global scope — the shared
    /// scope is never mutated — and the `yaxis` function is evaluated at it.
    /// A result with a nonzero imaginary part lands on the complex series as
    /// (sample, re); a real result lands on the real series; a failed sample
    /// is skipped and the sweep continues. The trace is replaced atomically
    /// once both series are complete, and becomes two empty series when
    /// `yaxis` resolves to no usable function.
    pub fn update_graph(&mut self, id: u32) {
        let (xaxis, yaxis, xrange) = match self.entity(id).map(|e| &e.kind) {
            Some(EntityKind::Graph(g)) => (g.xaxis.clone(), g.yaxis.clone(), g.xrange),
            _ => return,
        };

        let mut trace = Trace::default();
        let compiled = self
            .function_expression(&yaxis)
            .and_then(|src| expr::compile(&src).ok());

        if let Some(function) = compiled {
            let [lo, hi] = xrange;
            let delta = (hi - lo).abs() / SAMPLE_STEPS as f64;
            let mut samples = Vec::with_capacity(SAMPLE_STEPS + 1);
            if delta == 0.0 {
                samples.push(lo);
            } else {
                for i in 0..=SAMPLE_STEPS + 1 {
                    let x = lo + i as f64 * delta;
                    if x >= hi + delta {
                        break;
                    }
                    samples.push(x);
                }
            }

            for x in samples {
                let sample_scope = scope::with_binding(&self.scope, &xaxis, x);
                match function.eval(&sample_scope) {
                    Ok(Value::Real(y)) => trace.real.push(x, y),
                    Ok(Value::Complex(c)) => {
                        if c.im != 0.0 {
                            trace.complex.push(x, c.re);
                        } else {
                            trace.real.push(x, c.re);
                        }
                    }
                    Err(_) => {}
                }
            }
        }

        debug!(
            "graph #{}: {} real / {} complex samples",
            id,
            trace.real.len(),
            trace.complex.len()
        );
        if let Some(entity) = self.entity_mut(id) {
            if let EntityKind::Graph(g) = &mut entity.kind {
                g.trace = trace;
            }
        }
    }
}
