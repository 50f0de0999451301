//! Optional extensions that let a node borrow evidence from other nodes.
//!
//! - **Generalised rows**: edge weights scored against a blend of the raw
//!   association row and a row pooled from elsewhere.
//! - **Dynamic propagation**: secondary id/row vectors updated alongside
//!   every bump, so nodes sharing neighbours drift together.
//! - **Composition prior**: new chunks start from a similarity-weighted
//!   sum of existing chunks' rows.
//!
//! None of these is needed for baseline chunking, and they are not tuned to
//! be combined. Every result is checked for finiteness.

use super::model::Graph;
use super::node::{geometric_mean, Node, NodeId, Role};
use super::params::Generalize;
use crate::error::{ChunkError, Result};
use crate::vectors::{normalize, Vector};

fn ensure_finite_vector(v: &Vector, what: &str) -> Result<()> {
    if v.iter().all(|x| x.is_finite()) {
        Ok(())
    } else {
        Err(ChunkError::NumericDegeneracy(format!(
            "{} has non-finite entries",
            what
        )))
    }
}

impl Graph {
    /// Row to score `node`'s edges in `role` with, when generalisation is on.
    ///
    /// `None` means the raw association row is used unchanged.
    pub(super) fn generalized_row(&self, node: &Node, role: Role) -> Result<Option<Vector>> {
        let factor = self.params.generalize.factor();
        let pooled = match self.params.generalize {
            Generalize::Off => return Ok(None),
            Generalize::Dynamic(_) => match &node.dynamic {
                Some(trace) => trace.rows[node.row_index(role)].clone(),
                None => return Ok(None),
            },
            Generalize::Similarity(_) => self.similarity_row(node, role),
        };

        let mut row = normalize(node.association(role)) * (1.0 - factor);
        row.scaled_add(factor, &normalize(&pooled));
        ensure_finite_vector(&row, "generalized row")?;
        Ok(Some(row))
    }

    /// Sum of every other registered node's normalised row, weighted by its
    /// similarity to `node`.
    fn similarity_row(&self, node: &Node, role: Role) -> Vector {
        let mut pooled = self.vectors.zeros();
        for other in self.nodes.iter() {
            if std::ptr::eq(other, node) {
                continue;
            }
            let weight = node.similarity(other);
            if weight > 0.0 {
                pooled.scaled_add(weight, &normalize(other.association(role)));
            }
        }
        pooled
    }

    /// Seed a fresh chunk of `a` and `b` from the rows of comparable chunks.
    ///
    /// A chunk `[x y]` contributes in proportion to how similar `a` is to `x`
    /// and `b` is to `y`. With no comparable chunks the node is unchanged.
    pub(super) fn apply_composition_prior(
        &self,
        chunk: &mut Node,
        a: NodeId,
        b: NodeId,
    ) -> Result<()> {
        let left = self.node(a)?;
        let right = self.node(b)?;
        let blend = self.params.composition_blend;

        let mut prior: Vec<Vector> = chunk.associations().iter().map(|_| self.vectors.zeros()).collect();
        let mut total = 0.0;
        for other in self.nodes.iter() {
            let [x, y] = match other.children() {
                Some(children) => children,
                None => continue,
            };
            let weight = geometric_mean(&[
                left.similarity(self.node(x)?),
                right.similarity(self.node(y)?),
            ]);
            if weight <= 0.0 {
                continue;
            }
            total += weight;
            for (acc, row) in prior.iter_mut().zip(other.associations()) {
                acc.scaled_add(blend * weight, &normalize(row));
            }
        }

        if total == 0.0 {
            return Ok(());
        }
        for (row, value) in chunk.associations_mut().iter_mut().zip(prior) {
            ensure_finite_vector(&value, "composition prior")?;
            *row = value;
        }
        Ok(())
    }

    /// Update the dynamic traces for `b` in `role` relative to `a`.
    ///
    /// `a`'s dynamic row takes in `b`'s normalised dynamic id, and `b`'s
    /// dynamic id takes in `a`'s association row. Unlike a plain bump this
    /// touches both nodes. A no-op unless dynamic propagation is enabled.
    pub(crate) fn propagate(&mut self, a: NodeId, b: NodeId, role: Role, amount: f32) -> Result<()> {
        if !self.params.dynamic_propagation {
            return Ok(());
        }

        let (b_id, a_row) = {
            let na = self.node(a)?;
            let nb = self.node(b)?;
            let b_id = match &nb.dynamic {
                Some(trace) => normalize(&trace.ids[nb.row_index(role)]),
                None => return Ok(()),
            };
            (b_id, na.association(role).clone())
        };

        let na = self.node_mut(a)?;
        let row = na.row_index(role);
        if let Some(trace) = na.dynamic.as_mut() {
            trace.rows[row].scaled_add(amount, &b_id);
            ensure_finite_vector(&trace.rows[row], "dynamic row")?;
        }

        let nb = self.node_mut(b)?;
        let row = nb.row_index(role);
        if let Some(trace) = nb.dynamic.as_mut() {
            trace.ids[row].scaled_add(amount, &a_row);
            ensure_finite_vector(&trace.ids[row], "dynamic id")?;
        }
        Ok(())
    }
}
