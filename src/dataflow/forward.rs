use crate::body::{Body, OpId};
use crate::controlflow::Cfg;
use crate::dataflow::{CancelToken, Dataflow};
use crate::errors::{AnalysisError, AnalysisResult};
use petgraph::graph::NodeIndex;
use petgraph::visit::{DfsPostOrder, EdgeRef};
use petgraph::Direction;
use std::collections::{BTreeMap, VecDeque};
use std::fmt;

/// The abstract state that is carried along the control flow graph
/// during forward dataflow analysis.
pub trait AbstractForwardState<'a>: Eq + Sized {
    type Context<'c>;
    type Error;

    /// The state initialization function, evaluated at the procedure
    /// entry block.
    ///
    /// # Errors
    ///
    /// This method should return a `Self::Error` if the given graph does
    /// not allow a proper state initialization.
    fn init(cfg: &Cfg, context: &Self::Context<'a>) -> Result<Self, Self::Error>;

    /// The state join operation function.
    ///
    /// # Errors
    ///
    /// This method should return a `Self::Error` if the given states
    /// cannot be joined properly with respect to the context.
    fn join(&mut self, other: &Self, context: &Self::Context<'a>) -> Result<(), Self::Error>;

    /// Widens every tracked entry to the top of its lattice, preserving
    /// the key set. Invoked when an entry state is recomposed from a
    /// partial set of predecessors.
    fn reset_to_unknown(&mut self);

    /// The operation transfer function.
    ///
    /// # Errors
    ///
    /// This method should return a `Self::Error` if the given operation
    /// cannot be passed with the current state with respect to the
    /// context.
    fn transfer_op(
        &mut self,
        id: OpId,
        body: &Body,
        context: &Self::Context<'a>,
    ) -> Result<(), Self::Error>;
}

/// Performs a forward dataflow analysis.
///
/// The analysis parameters are given by the `AbstractForwardState` trait
/// methods passed as a type parameter.
///
/// # Errors
///
/// This function may generate errors resulting of an underlying abstract
/// state error (at initialization, join or transfer operation), and
/// returns [`AnalysisError::Cancelled`] when the given token is cancelled.
pub fn forward<'a, S>(
    cfg: &Cfg,
    body: &Body,
    context: &S::Context<'a>,
    cancel: &CancelToken,
) -> AnalysisResult<Dataflow<S>>
where
    S: AbstractForwardState<'a> + Clone + fmt::Display,
    S::Error: Into<AnalysisError>,
{
    let cfgraph = &cfg.inner;

    let mut block_exits: BTreeMap<NodeIndex, S> = BTreeMap::new();
    let mut entries = BTreeMap::new();
    let mut exits = BTreeMap::new();

    // For forward dataflow, optimal order is reverse postorder.
    // The postorder here is reversed when we pop_back from the deque.
    let mut worklist: VecDeque<NodeIndex> = VecDeque::new();
    let mut postorder = DfsPostOrder::new(cfgraph, cfg.start_index());
    while let Some(id) = postorder.next(cfgraph) {
        worklist.push_back(id);
    }

    while let Some(id) = worklist.pop_back() {
        if cancel.is_cancelled() {
            return Err(AnalysisError::Cancelled);
        }

        let block = &cfgraph[id];
        log::debug!("    ---- block {}", block.id());

        // retrieve list of already computed predecessors
        let nb_preds = cfgraph.edges_directed(id, Direction::Incoming).count();
        let computed: Vec<_> = cfgraph
            .edges_directed(id, Direction::Incoming)
            .filter(|edge| block_exits.contains_key(&edge.source()))
            .collect();

        // recompose new_state from exit states of predecessor blocks,
        let mut new_state = if computed.is_empty() {
            // when no predecessor is available:
            // entry = initial state
            S::init(cfg, context).map_err(S::Error::into)?
        } else {
            // otherwise:
            // entry = join of predecessors exits
            let mut entry: S = block_exits.get(&computed[0].source()).unwrap().clone();
            for edge in computed.iter().skip(1) {
                let previous = block_exits.get(&edge.source()).unwrap();
                entry.join(previous, context).map_err(S::Error::into)?;
            }
            if computed.len() < nb_preds {
                // some predecessors have not been computed yet: widen the
                // recomposed entry so that a later recomputation can only
                // refine it
                entry.reset_to_unknown();
            }
            entry
        };

        log::debug!("    -- ENTRY STATE:");
        for line in format!("{new_state}").split('\n') {
            log::debug!("      {line}");
        }
        entries.insert(block.id(), new_state.clone());

        // then apply transfer function for each operation of the block
        for op in block.operations() {
            if let Some(operation) = body.op(*op) {
                log::trace!("transfer_op( {op}: {operation} )");
            }
            log::trace!("    before: {new_state}");
            new_state
                .transfer_op(*op, body, context)
                .map_err(S::Error::into)?;
            log::trace!("    after:  {new_state}");
        }
        log::debug!("    -- EXIT STATE:");
        for line in format!("{new_state}").split('\n') {
            log::debug!("      {line}");
        }
        log::debug!("");

        // checking if need to treat again successors:
        // - on the first computation, successors must see this exit state;
        // - on recomputation, only a changed state is worth propagating.
        let changed = match block_exits.get(&id) {
            Some(old_state) => &new_state != old_state,
            None => true,
        };
        if changed {
            cfgraph
                .edges_directed(id, Direction::Outgoing)
                .for_each(|edge| {
                    if !worklist.contains(&edge.target()) {
                        worklist.push_front(edge.target());
                    }
                });
        }

        exits.insert(block.id(), new_state.clone());
        block_exits.insert(id, new_state);
    }

    Ok(Dataflow { entries, exits })
}

#[cfg(test)]
mod tests {
    use crate::body::{Body, InvocationKind, Operation};
    use crate::controlflow::{Branch, CfgBuilder};
    use crate::dataflow::CancelToken;
    use crate::dispose::{DisposeContext, DisposeFlows, DisposeKind};
    use crate::pointsto::PointsToResult;
    use crate::repo::{MethodDecl, Repo, TypeKind};
    use std::collections::BTreeSet;

    #[test]
    fn looping_graph_reaches_a_fixpoint() {
        let mut repo = Repo::new();
        let disposable = repo.add_type("IDisposable", TypeKind::Interface);
        let iface_dispose = repo
            .add_method(
                disposable,
                MethodDecl {
                    name: "Dispose".to_string(),
                    ..MethodDecl::default()
                },
            )
            .unwrap();
        let collection = repo.add_type("ICollection", TypeKind::Interface);
        let generic_collection = repo.add_type("ICollection`1", TypeKind::Interface);
        let enclosing = repo.add_type("Analyzed", TypeKind::Class);
        let d_ty = repo.add_type("D", TypeKind::Class);
        repo.add_implements(d_ty, disposable).unwrap();
        let d_dispose = repo
            .add_method(
                d_ty,
                MethodDecl {
                    name: "Dispose".to_string(),
                    implements: Some(iface_dispose),
                    ..MethodDecl::default()
                },
            )
            .unwrap();
        let ctor = repo
            .add_method(
                d_ty,
                MethodDecl {
                    name: ".ctor".to_string(),
                    ..MethodDecl::default()
                },
            )
            .unwrap();

        let mut body = Body::new();
        let create = body.push(Operation::InstanceCreation {
            ctor,
            arguments: vec![],
        });
        let local = body.push(Operation::LocalReference { index: 0 });
        let call = body.push(Operation::Invocation {
            target: d_dispose,
            instance: Some(local),
            arguments: vec![],
            kind: InvocationKind::Method,
        });

        let mut points_to = PointsToResult::new();
        let loc = points_to.fresh_location(d_ty);
        points_to.record_location(create, loc);
        points_to.record_location(local, loc);

        // b0 -> b1 (loop head) -> b2 (disposing body) -> b1; b1 -> b3
        let mut builder = CfgBuilder::new();
        let b0 = builder.add_block(vec![create]);
        let b1 = builder.add_block(vec![]);
        let b2 = builder.add_block(vec![local, call]);
        let b3 = builder.add_block(vec![]);
        builder.add_edge(b0, b1, Branch::Sequence);
        builder.add_edge(b1, b2, Branch::IfTrue);
        builder.add_edge(b2, b1, Branch::Jmp);
        builder.add_edge(b1, b3, Branch::IfFalse);
        let cfg = builder.build().unwrap();

        let context = DisposeContext::new(
            &repo,
            disposable,
            collection,
            generic_collection,
            BTreeSet::new(),
            enclosing,
            &points_to,
            None,
        )
        .unwrap();
        let flows = DisposeFlows::compute(&cfg, &body, &context, &CancelToken::new()).unwrap();

        for block in [b0, b1, b2, b3] {
            assert!(flows.entry(block).is_some());
            assert!(flows.exit(block).is_some());
        }

        // the loop may dispose zero or more times
        let value = flows.exit(b3).unwrap().value(&loc).unwrap();
        assert_eq!(DisposeKind::MaybeDisposed, value.kind());
        assert_eq!(&BTreeSet::from([call]), value.disposing_ops());
    }
}
