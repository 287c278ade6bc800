use crate::body::{AssignmentTarget, Body, InvocationKind, OpId, Operation};
use crate::controlflow::Cfg;
use crate::dataflow::AbstractForwardState;
use crate::dispose::value::NOT_DISPOSED;
use crate::dispose::{DisposeContext, DisposeMethodKind, State};
use crate::errors::{AnalysisError, AnalysisResult};
use crate::nullness::NullState;
use crate::repo::RefKind;

impl<'a> AbstractForwardState<'a> for State {
    type Context<'c> = DisposeContext<'c>;
    type Error = AnalysisError;

    fn init(_cfg: &Cfg, _context: &DisposeContext) -> AnalysisResult<Self> {
        // every location starts at bottom, i.e. absent
        Ok(Self::default())
    }

    fn join(&mut self, other: &Self, _context: &DisposeContext) -> AnalysisResult<()> {
        self.join_with(other);
        Ok(())
    }

    fn reset_to_unknown(&mut self) {
        self.widen_to_unknown();
    }

    fn transfer_op(
        &mut self,
        id: OpId,
        body: &Body,
        context: &DisposeContext,
    ) -> AnalysisResult<()> {
        let Some(operation) = body.op(id) else {
            log::warn!("skipping unresolved operation {id}");
            return Ok(());
        };

        match operation {
            Operation::InstanceCreation { ctor, arguments } => {
                let Some(ctor_def) = context.repo().method(*ctor) else {
                    log::warn!("skipping creation with unresolved constructor {ctor}");
                    return Ok(());
                };
                let params = ctor_def.params();
                for (i, argument) in arguments.iter().enumerate() {
                    let Some(param) = params.get(i) else {
                        continue;
                    };
                    // an argument passed by reference escapes; a single
                    // constructor parameter of an ownership-transfer type
                    // is assumed to take the dispose obligation with it
                    let escapes = param.ref_kind() != RefKind::Value
                        || (params.len() == 1 && context.owns_by_construction(param.ty()));
                    if escapes {
                        self.escape(*argument, id, context);
                    }
                }
                if context.is_disposable(ctor_def.containing()) {
                    self.mark_created(id, context);
                }
            }

            Operation::Invocation {
                target,
                instance,
                arguments,
                kind,
            } => {
                if *kind != InvocationKind::Method {
                    return Ok(());
                }
                let Some(method) = context.repo().method(*target) else {
                    log::warn!("skipping invocation of unresolved method {target}");
                    return Ok(());
                };
                match context.dispose_method_kind(method) {
                    DisposeMethodKind::Dispose | DisposeMethodKind::DisposeBool => {
                        if let Some(receiver) = instance {
                            self.mark_disposed(*receiver, id, context);
                        }
                    }
                    DisposeMethodKind::Close => {
                        if let Some(receiver) = instance {
                            // a type's own Close invoked on `this` (typically
                            // from within its Dispose) does not dispose the
                            // current instance; only a literal `this` receiver
                            // is recognized, a local aliasing it is not
                            let receiver_is_this =
                                matches!(body.op(*receiver), Some(Operation::InstanceReference));
                            if !receiver_is_this {
                                self.mark_disposed(*receiver, id, context);
                            }
                        }
                    }
                    DisposeMethodKind::None => {
                        if method.is_static()
                            && has_factory_name(method.name())
                            && method.returns().is_some_and(|ty| context.is_disposable(ty))
                        {
                            // static Create*/Open* returning a disposable:
                            // treated as an instance creation
                            self.mark_created(id, context);
                        }
                        if context.is_collection_add(method) {
                            if let Some(last) = arguments.last() {
                                self.escape(*last, id, context);
                            }
                        }
                    }
                }
            }

            Operation::Assignment { target, value } => match target {
                AssignmentTarget::FieldReference
                | AssignmentTarget::PropertyReference
                | AssignmentTarget::ArrayElementReference => {
                    self.escape(*value, id, context);
                }
                AssignmentTarget::Local | AssignmentTarget::Parameter => {}
            },

            Operation::Return { value: Some(value) } => {
                self.escape(*value, id, context);
            }

            Operation::ScopedAcquisition { resources } => {
                for resource in resources {
                    self.mark_disposed(*resource, id, context);
                }
            }

            Operation::Conversion {
                operand,
                user_defined: true,
            } => {
                // a user-defined conversion may capture its operand
                self.escape(*operand, id, context);
            }

            Operation::ElementInitializer { instance, value } => {
                self.escape(*value, *instance, context);
            }

            Operation::Return { value: None }
            | Operation::Conversion {
                user_defined: false,
                ..
            }
            | Operation::InstanceReference
            | Operation::LocalReference { .. }
            | Operation::ParameterReference { .. }
            | Operation::Literal
            | Operation::Other => {}
        }

        Ok(())
    }
}

impl State {
    /// Tracks every location of a freshly created disposable instance as
    /// `NotDisposed`.
    fn mark_created(&mut self, created: OpId, context: &DisposeContext) {
        for location in context.points_to().locations(created) {
            if context.is_disposable(location.ty()) {
                self.set(context, location, NOT_DISPOSED.clone());
            }
        }
    }

    /// Records a disposing operation on every disposable location the
    /// value may point to.
    fn mark_disposed(&mut self, value: OpId, via: OpId, context: &DisposeContext) {
        if context.null_state(value) == NullState::Null {
            // disposing a null reference releases nothing
            return;
        }
        for location in context.points_to().locations(value) {
            if context.is_disposable(location.ty()) {
                let next = self.current(&location).with_new_disposing_operation(via);
                self.set(context, location, next);
            }
        }
    }

    /// Records an escaping operation on every disposable location the
    /// value may point to: the procedure may no longer own the dispose
    /// obligation.
    fn escape(&mut self, value: OpId, via: OpId, context: &DisposeContext) {
        for location in context.points_to().locations(value) {
            if context.is_disposable(location.ty()) {
                let next = self.current(&location).with_new_escaping_operation(via);
                self.set(context, location, next);
            }
        }
    }
}

fn has_factory_name(name: &str) -> bool {
    ["create", "open"].iter().any(|prefix| {
        name.get(..prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
    })
}
