//! Control flow graph representation.
//!
//! The graph itself is provided by the front end that lowered the
//! procedure: blocks are ordered lists of [`OpId`]s and edges carry a
//! structural [`Branch`] label. [`CfgBuilder`] is the entry point for
//! assembling one.

use crate::body::OpId;
use crate::errors::{AnalysisError, AnalysisResult};
use petgraph::dot::{Config, Dot};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::BTreeMap;
use std::fmt;
use std::fmt::Write;

/// Identifier of a basic block, in insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct BlockId(usize);

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "bb{}", self.0)
    }
}

#[derive(Debug)]
pub struct Block {
    id: BlockId,
    ops: Vec<OpId>,
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.ops.is_empty() {
            write!(f, "{}: <empty>", self.id)?;
            return Ok(());
        }
        writeln!(f, "{}:", self.id)?;
        for op in &self.ops {
            writeln!(f, "  {op}")?;
        }
        Ok(())
    }
}

impl Block {
    #[must_use]
    pub fn id(&self) -> BlockId {
        self.id
    }

    #[inline]
    pub fn operations(&self) -> impl Iterator<Item = &OpId> {
        self.ops.iter()
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Branch {
    IfTrue,
    IfFalse,
    Switch(i32),
    SwitchDefault,
    Jmp,
    Sequence,
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::IfTrue => write!(f, "<true>"),
            Self::IfFalse => write!(f, "<false>"),
            Self::Switch(key) => write!(f, "<switch {key}>"),
            Self::SwitchDefault => write!(f, "<switch _>"),
            Self::Jmp => write!(f, "<jmp>"),
            Self::Sequence => write!(f, "<seq>"),
        }
    }
}

#[derive(Debug)]
pub struct Cfg {
    pub(crate) inner: DiGraph<Block, Branch>,
    node_ids: BTreeMap<BlockId, NodeIndex>,
    entry: BlockId,
    exit: Option<BlockId>,
}

impl Cfg {
    pub(crate) fn start_index(&self) -> NodeIndex {
        *self.node_ids.get(&self.entry).unwrap()
    }

    /// The block the procedure enters through (the first block added).
    #[must_use]
    pub fn entry_block(&self) -> BlockId {
        self.entry
    }

    /// The unique successor-less block, when exactly one exists.
    #[must_use]
    pub fn exit_block(&self) -> Option<BlockId> {
        self.exit
    }

    #[must_use]
    pub fn block(&self, id: BlockId) -> Option<&Block> {
        self.node_ids.get(&id).map(|idx| &self.inner[*idx])
    }

    pub fn iter_ordered_blocks(&self) -> impl Iterator<Item = &Block> {
        self.node_ids.values().map(move |id| &self.inner[*id])
    }

    #[must_use]
    pub fn to_dot(&self) -> String {
        let mut res = String::new();
        res.push_str("digraph {\n");
        res.push_str("  splines=ortho;\n");
        res.push_str("  nodesep=2;\n");
        write!(
            res,
            "{}",
            Dot::with_attr_getters(
                &self.inner,
                &[Config::GraphContentOnly, Config::EdgeNoLabel],
                &|_, edge| {
                    let color = match edge.weight() {
                        Branch::IfTrue => "green",
                        Branch::IfFalse => "red",
                        Branch::Switch(_) | Branch::SwitchDefault => "purple",
                        Branch::Jmp => "blue",
                        Branch::Sequence => "black",
                    };
                    format!("color={},xlabel=\"{}\"", color, edge.weight())
                },
                &|_, _| String::from("shape=box,color=black")
            )
        )
        .unwrap();
        res.push('}');
        res
    }
}

/// Incremental [`Cfg`] construction.
///
/// The first block added is the entry block.
#[derive(Debug, Default)]
pub struct CfgBuilder {
    blocks: Vec<Vec<OpId>>,
    edges: Vec<(BlockId, BlockId, Branch)>,
}

impl CfgBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_block(&mut self, ops: Vec<OpId>) -> BlockId {
        let id = BlockId(self.blocks.len());
        self.blocks.push(ops);
        id
    }

    pub fn add_edge(&mut self, from: BlockId, to: BlockId, branch: Branch) {
        self.edges.push((from, to, branch));
    }

    /// Assembles the graph.
    ///
    /// # Errors
    ///
    /// Returns an error if no block was added, or if an edge references an
    /// unknown block.
    pub fn build(self) -> AnalysisResult<Cfg> {
        if self.blocks.is_empty() {
            return Err(AnalysisError::EmptyControlFlowGraph);
        }

        let mut cfgraph = DiGraph::new();
        let mut node_ids = BTreeMap::new();
        for (i, ops) in self.blocks.into_iter().enumerate() {
            let id = BlockId(i);
            node_ids.insert(id, cfgraph.add_node(Block { id, ops }));
        }

        for (from, to, branch) in self.edges {
            let src = *node_ids.get(&from).ok_or(AnalysisError::BlockNotFound(from))?;
            let dst = *node_ids.get(&to).ok_or(AnalysisError::BlockNotFound(to))?;
            cfgraph.add_edge(src, dst, branch);
        }

        let mut sinks = cfgraph
            .node_indices()
            .filter(|id| cfgraph.edges_directed(*id, Direction::Outgoing).count() == 0);
        let exit = match (sinks.next(), sinks.next()) {
            (Some(id), None) => Some(cfgraph[id].id),
            _ => None,
        };

        Ok(Cfg {
            inner: cfgraph,
            node_ids,
            entry: BlockId(0),
            exit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_sink_is_the_exit_block() {
        let mut builder = CfgBuilder::new();
        let b0 = builder.add_block(vec![]);
        let b1 = builder.add_block(vec![]);
        let b2 = builder.add_block(vec![]);
        builder.add_edge(b0, b1, Branch::IfTrue);
        builder.add_edge(b0, b2, Branch::IfFalse);
        builder.add_edge(b1, b2, Branch::Sequence);
        let cfg = builder.build().unwrap();

        assert_eq!(b0, cfg.entry_block());
        assert_eq!(Some(b2), cfg.exit_block());
    }

    #[test]
    fn looping_graph_has_no_exit_block() {
        let mut builder = CfgBuilder::new();
        let b0 = builder.add_block(vec![]);
        builder.add_edge(b0, b0, Branch::Jmp);
        let cfg = builder.build().unwrap();

        assert_eq!(None, cfg.exit_block());
    }

    #[test]
    fn empty_graph_is_rejected() {
        assert!(matches!(
            CfgBuilder::new().build(),
            Err(AnalysisError::EmptyControlFlowGraph)
        ));
    }

    #[test]
    fn edge_to_unknown_block_is_rejected() {
        let mut builder = CfgBuilder::new();
        let b0 = builder.add_block(vec![]);
        builder.add_edge(b0, BlockId(7), Branch::Jmp);
        assert!(matches!(
            builder.build(),
            Err(AnalysisError::BlockNotFound(_))
        ));
    }

    #[test]
    fn dot_output_mentions_every_edge_label() {
        let mut builder = CfgBuilder::new();
        let b0 = builder.add_block(vec![]);
        let b1 = builder.add_block(vec![]);
        builder.add_edge(b0, b1, Branch::Jmp);
        let dot = builder.build().unwrap().to_dot();

        assert!(dot.starts_with("digraph {"));
        assert!(dot.contains("<jmp>"));
    }
}
