//! Binary Reinforcement Hierarchy (BRH, spec §4.8)
//!
//! A complete binary tree of [`Pbrrn`] instances built from one
//! [`BrhLevelOptions`] per depth. Non-root nodes exchange fixed-size bit
//! strips with their parent along its right/left edges; on every step a
//! node reads its own central cell to pick a "favoured" child, which is
//! stepped with `reward = 1.0` while its sibling gets `0.0`.
//!
//! Children are owned strictly top-down (`Option<(Box<BrhNode>,
//! Box<BrhNode>)>`) — no back-reference to the parent is stored. The
//! per-node algorithm ("pull from parent, step, push to parent, then
//! recurse into children") is realised as one top-down recursive call
//! per step that threads the parent's model through by argument,
//! without `Rc<RefCell<_>>` or any cyclic ownership — see `DESIGN.md`.

use crate::engine::{Pbrrn, PbrrnOptions};
use crate::error::{PbrrnError, Result};

/// Per-level construction options (spec §6: BRH adds `parentInputBits`/
/// `parentOutputBits` per level). `levels[0]` describes the root; it is
/// the only level whose `parent_input_bits`/`parent_output_bits` are
/// ignored (the root has no parent edge).
#[derive(Debug, Clone, Copy)]
pub struct BrhLevelOptions {
    pub pbrrn: PbrrnOptions,
    pub parent_input_bits: u32,
    pub parent_output_bits: u32,
}

impl Default for BrhLevelOptions {
    fn default() -> Self {
        Self { pbrrn: PbrrnOptions::default(), parent_input_bits: 0, parent_output_bits: 0 }
    }
}

struct BrhNode {
    model: Pbrrn,
    parent_input_bits: u32,
    parent_output_bits: u32,
    children: Option<(Box<BrhNode>, Box<BrhNode>)>,
}

/// A tree of PBRRN instances exchanging bit strips through fixed edge
/// regions (spec §4.8). Each node owns an independent [`Pbrrn`] — and
/// hence an independent GPU device (spec §5: "BRH nodes each have their
/// own context/canvas").
pub struct Brh {
    root: BrhNode,
}

impl Brh {
    /// Builds a complete binary tree `levels.len()` deep. `levels[i]`
    /// is applied to every node at depth `i`.
    ///
    /// # Errors
    ///
    /// Returns [`PbrrnError::InvalidOption`] if `levels` is empty, a
    /// level's `Pbrrn` options are invalid, or a node's dimensions are
    /// too small to hold its declared edge strips.
    pub fn new(levels: &[BrhLevelOptions]) -> Result<Self> {
        if levels.is_empty() {
            return Err(PbrrnError::InvalidOption("Brh needs at least one level".into()));
        }
        let root = Self::build(levels, 0)?;
        Ok(Self { root })
    }

    fn build(levels: &[BrhLevelOptions], depth: usize) -> Result<BrhNode> {
        let level = levels[depth];
        let model = Pbrrn::new(level.pbrrn)?;

        let (parent_input_bits, parent_output_bits) =
            if depth == 0 { (0, 0) } else { (level.parent_input_bits, level.parent_output_bits) };

        // This node's own top/bottom strips must fit within its width
        // (they are horizontal, centred on the top/bottom edge).
        if 2 * parent_input_bits > model.width() {
            return Err(PbrrnError::InvalidOption(format!(
                "level {depth}: parent_input_bits {parent_input_bits} needs width >= {}, got {}",
                2 * parent_input_bits,
                model.width()
            )));
        }
        if 2 * parent_output_bits > model.width() {
            return Err(PbrrnError::InvalidOption(format!(
                "level {depth}: parent_output_bits {parent_output_bits} needs width >= {}, got {}",
                2 * parent_output_bits,
                model.width()
            )));
        }

        let children = if depth + 1 < levels.len() {
            let child_level = levels[depth + 1];
            // The parent-side column strips are vertical, so they must
            // fit within *this* node's height, not the child's.
            if 2 * child_level.parent_input_bits > model.height() {
                return Err(PbrrnError::InvalidOption(format!(
                    "level {depth}: child parent_input_bits {} needs height >= {}, got {}",
                    child_level.parent_input_bits,
                    2 * child_level.parent_input_bits,
                    model.height()
                )));
            }
            if 2 * child_level.parent_output_bits > model.height() {
                return Err(PbrrnError::InvalidOption(format!(
                    "level {depth}: child parent_output_bits {} needs height >= {}, got {}",
                    child_level.parent_output_bits,
                    2 * child_level.parent_output_bits,
                    model.height()
                )));
            }
            let c0 = Self::build(levels, depth + 1)?;
            let c1 = Self::build(levels, depth + 1)?;
            Some((Box::new(c0), Box::new(c1)))
        } else {
            None
        };

        Ok(BrhNode { model, parent_input_bits, parent_output_bits, children })
    }

    /// Runs one step of the whole tree: the root is stepped with
    /// `reward`, then recursively at every level the favoured child (the
    /// one matching its parent's central-cell state) is stepped with
    /// `1.0` and its sibling with `0.0` (spec §4.8).
    ///
    /// # Errors
    ///
    /// Propagates any [`PbrrnError`] from an underlying node's `step`.
    pub fn step(&mut self, reward: f32) -> Result<()> {
        step_node(&mut self.root, None, 0, reward)
    }

    #[must_use]
    pub fn root(&self) -> &Pbrrn {
        &self.root.model
    }

    pub fn root_mut(&mut self) -> &mut Pbrrn {
        &mut self.root.model
    }

    /// Returns slot `0` or `1`'s model, if the root has children.
    #[must_use]
    pub fn child(&self, slot: u8) -> Option<&Pbrrn> {
        self.root.children.as_ref().map(|(c0, c1)| if slot == 0 { &c0.model } else { &c1.model })
    }

    /// Releases every node's GPU resources, depth-first (the natural
    /// drop order of the nested `Box<(BrhNode, BrhNode)>` ownership
    /// tree — spec §4.8: "Dispose cascades depth-first").
    pub fn dispose(self) {
        drop(self);
    }
}

/// Reads the `1x(2*bits)` column at `x` on `model`'s right (or left)
/// edge starting at `y`.
fn read_column(model: &Pbrrn, x: u32, y: u32, bits: u32) -> Result<Vec<u8>> {
    let height = 2 * bits;
    let mut buf = vec![0u8; (height * 4) as usize];
    model.get_states(x, y, 1, height, &mut buf)?;
    Ok(buf)
}

fn write_column(model: &mut Pbrrn, x: u32, y: u32, bits: u32, buf: &[u8]) -> Result<()> {
    model.set_states(x, y, 1, 2 * bits, buf)
}

/// Reads the centred `(2*bits)x1` horizontal strip on `model`'s top (or
/// bottom) edge at row `y`.
fn read_row(model: &Pbrrn, y: u32, bits: u32) -> Result<Vec<u8>> {
    let width = 2 * bits;
    let x0 = (model.width() - width) / 2;
    let mut buf = vec![0u8; (width * 4) as usize];
    model.get_states(x0, y, width, 1, &mut buf)?;
    Ok(buf)
}

fn write_row(model: &mut Pbrrn, y: u32, bits: u32, buf: &[u8]) -> Result<()> {
    let width = 2 * bits;
    let x0 = (model.width() - width) / 2;
    model.set_states(x0, y, width, 1, buf)
}

/// `slot` is this node's position among its siblings (`0` or `1`),
/// determining which half of the parent's edge it talks to. Root is
/// called with `parent = None`; `slot` is then unused.
fn step_node(node: &mut BrhNode, mut parent: Option<&mut Pbrrn>, slot: u8, reward: f32) -> Result<()> {
    if let Some(parent_model) = parent.as_deref_mut() {
        if node.parent_input_bits > 0 {
            let strip = 2 * node.parent_input_bits;
            let y0 = if slot == 0 { 0 } else { parent_model.height() - strip };
            let column = read_column(parent_model, parent_model.width() - 1, y0, node.parent_input_bits)?;
            write_row(&mut node.model, 0, node.parent_input_bits, &column)?;
        }
    }

    node.model.step(reward)?;

    if let Some(parent_model) = parent.as_deref_mut() {
        if node.parent_output_bits > 0 {
            let strip = 2 * node.parent_output_bits;
            let row = read_row(&node.model, node.model.height() - 1, node.parent_output_bits)?;
            let y0 = if slot == 0 { 0 } else { parent_model.height() - strip };
            write_column(parent_model, 0, y0, node.parent_output_bits, &row)?;
        }
    }

    if let Some((c0, c1)) = node.children.as_mut() {
        let (cx, cy) = (node.model.width() / 2, node.model.height() / 2);
        let favoured = u8::from(node.model.get_state(cx, cy)?);
        step_node(c0, Some(&mut node.model), 0, if favoured == 0 { 1.0 } else { 0.0 })?;
        step_node(c1, Some(&mut node.model), 1, if favoured == 1 { 1.0 } else { 0.0 })?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_level(bits: u32) -> BrhLevelOptions {
        BrhLevelOptions {
            pbrrn: PbrrnOptions { width: 8, height: 8, ..PbrrnOptions::default() },
            parent_input_bits: bits,
            parent_output_bits: bits,
        }
    }

    #[test]
    fn rejects_empty_levels() {
        assert!(Brh::new(&[]).is_err());
    }

    #[test]
    fn rejects_strips_too_wide_for_model() {
        // width=8 can hold at most 2*bits=8 => bits<=4; bits=5 must fail.
        let levels = [tiny_level(0), tiny_level(5)];
        assert!(Brh::new(&levels).is_err());
    }
}
