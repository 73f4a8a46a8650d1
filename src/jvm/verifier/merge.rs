use super::{StackMapEntry, VerificationType, VerifierFrame};
use crate::jvm::class_graph::ClassHierarchy;
use crate::jvm::{BinaryName, VerifierErrorKind};

/// How the live frame is reconciled with the stack map entry of a jump target
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum MergeMode {
    /// The live frame must already be assignable to the stack map entry
    Check,

    /// The live frame becomes exactly the stack map entry (first visit of the target)
    Merge,
}

impl<'m> VerifierFrame<'m> {
    /// Reconcile the frame with the stack map entry recorded for `bci`
    ///
    /// Every jump target, backward branch target, and exception handler must have an entry.
    pub fn check_or_merge_at<H: ClassHierarchy + ?Sized>(
        &mut self,
        bci: u16,
        mode: MergeMode,
        hierarchy: &H,
    ) -> Result<(), VerifierErrorKind> {
        let stackmaps = self.stackmaps;
        self.tracked(|frame| {
            let entry = stackmaps
                .get(bci)
                .ok_or(VerifierErrorKind::MissingStackmap)?;
            log::trace!(
                "{:?} at {}: live stack = {:?}, declared stack = {:?}",
                mode,
                bci,
                frame.stack(),
                entry.stack()
            );
            match mode {
                MergeMode::Check => frame.check_against(entry, hierarchy),
                MergeMode::Merge => frame.merge_from(entry),
            }
        })
    }

    fn check_against<H: ClassHierarchy + ?Sized>(
        &self,
        entry: &StackMapEntry,
        hierarchy: &H,
    ) -> Result<(), VerifierErrorKind> {
        // Initialized and uninitialized `this` regions may not flow into each other
        if self.needs_initialization != entry.mentions_uninitialized_this() {
            return Err(VerifierErrorKind::InvalidInitialization);
        }

        if entry.stack().len() != self.stack_pointer {
            return Err(VerifierErrorKind::StackBadType);
        }
        if entry.locals().len() > self.max_locals() {
            return Err(VerifierErrorKind::LocalsOverflow);
        }

        for (live, declared) in self.locals.iter().zip(entry.locals()) {
            if !self.is_assignable(live, declared, hierarchy)? {
                log::trace!("Local {:?} is not assignable to {:?}", live, declared);
                return Err(VerifierErrorKind::LocalsBadType);
            }
        }
        for (live, declared) in self.stack().iter().zip(entry.stack()) {
            if !self.is_assignable(live, declared, hierarchy)? {
                log::trace!("Stack value {:?} is not assignable to {:?}", live, declared);
                return Err(VerifierErrorKind::StackBadType);
            }
        }

        Ok(())
    }

    fn merge_from(&mut self, entry: &StackMapEntry) -> Result<(), VerifierErrorKind> {
        if entry.stack().len() > self.max_stack() {
            return Err(VerifierErrorKind::StackOverflow);
        }
        if entry.locals().len() > self.max_locals() {
            return Err(VerifierErrorKind::LocalsOverflow);
        }

        let declared_locals = entry.locals().len();
        self.locals[..declared_locals].clone_from_slice(entry.locals());
        for local in &mut self.locals[declared_locals..] {
            *local = VerificationType::Bogus;
        }

        let declared_stack = entry.stack().len();
        self.stack[..declared_stack].clone_from_slice(entry.stack());
        self.stack_pointer = declared_stack;

        self.needs_initialization = entry.mentions_uninitialized_this();
        Ok(())
    }

    /// Check that an exception handler can be entered from the current instruction
    ///
    /// The handler starts with only the caught exception on the stack (`java/lang/Throwable` for
    /// a catch-all handler) and the current locals. The live stack is put back afterwards,
    /// whether or not the check passed.
    pub fn check_handler_entry<H: ClassHierarchy + ?Sized>(
        &mut self,
        handler_bci: u16,
        catch_type: Option<&BinaryName>,
        hierarchy: &H,
    ) -> Result<(), VerifierErrorKind> {
        let exception = catch_type.cloned().unwrap_or(BinaryName::THROWABLE);
        log::trace!("Entering handler at {} for {:?}", handler_bci, exception);

        self.save_and_clear_stack();
        let result = self
            .push_category1(VerificationType::object(exception))
            .and_then(|()| self.check_or_merge_at(handler_bci, MergeMode::Check, hierarchy));
        self.restore_stack();
        result
    }
}
