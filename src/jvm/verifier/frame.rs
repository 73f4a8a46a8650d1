use super::{FrameBuffers, StackMapTable, VerificationType, VerifierSettings};
use crate::jvm::class_graph::{is_ref_assignable, ClassHierarchy};
use crate::jvm::{BinaryName, FieldType, RefType, VerifierErrorKind};
use crate::util::Width;

/// Live verification state of one method
///
/// The frame holds the types of the operand stack and locals at the instruction currently being
/// simulated. A bytecode walker drives it one instruction at a time, and reconciles it against the
/// method's stack map table at every control flow join (see [`Self::check_or_merge_at`]).
///
/// The stack and locals are fixed-size slot arrays sized from the method's declared maximums.
/// Every operation either succeeds or returns a [`VerifierErrorKind`]; failed pushes and pops
/// leave the frame untouched. The first failure is also remembered (see
/// [`Self::is_verification_failed`]).
#[derive(Debug)]
pub struct VerifierFrame<'m> {
    /// Stack slots (only `..stack_pointer` are live)
    pub(super) stack: Vec<VerificationType>,

    /// Number of live stack slots
    pub(super) stack_pointer: usize,

    /// Local variable slots
    pub(super) locals: Vec<VerificationType>,

    /// Stack map table of the method being verified
    pub(super) stackmaps: &'m StackMapTable,

    /// Is `this` still waiting for a superclass constructor call?
    pub(super) needs_initialization: bool,

    /// Stack state stashed while checking an exception handler entry
    pub(super) saved_stack: Option<SavedStack>,

    /// First failure recorded on this frame
    pub(super) failure: Option<VerifierErrorKind>,

    pub(super) inline_capacity: usize,
    pub(super) interfaces_as_object: bool,
}

/// Exception handlers start with just the exception on the stack, so only the bottom slot is
/// clobbered while checking one.
#[derive(Debug)]
pub(super) struct SavedStack {
    stack_pointer: usize,
    bottom: Option<VerificationType>,
}

impl<'m> VerifierFrame<'m> {
    /// New frame with an empty stack and all locals `Bogus`
    pub fn new(
        max_stack: u16,
        max_locals: u16,
        stackmaps: &'m StackMapTable,
        settings: &VerifierSettings,
    ) -> VerifierFrame<'m> {
        Self::with_buffers(
            FrameBuffers::new(settings),
            max_stack,
            max_locals,
            stackmaps,
            settings,
        )
    }

    /// New frame whose stack and locals reuse previously allocated storage
    pub fn with_buffers(
        mut buffers: FrameBuffers,
        max_stack: u16,
        max_locals: u16,
        stackmaps: &'m StackMapTable,
        settings: &VerifierSettings,
    ) -> VerifierFrame<'m> {
        buffers.reset(max_stack as usize, max_locals as usize);
        log::trace!(
            "New verifier frame (max_stack = {}, max_locals = {}, {} stack maps)",
            max_stack,
            max_locals,
            stackmaps.len()
        );
        VerifierFrame {
            stack: buffers.stack,
            stack_pointer: 0,
            locals: buffers.locals,
            stackmaps,
            needs_initialization: false,
            saved_stack: None,
            failure: None,
            inline_capacity: settings.inline_capacity,
            interfaces_as_object: settings.interfaces_as_object,
        }
    }

    /// Discard the frame, keeping its storage around for the next method
    pub fn into_buffers(self) -> FrameBuffers {
        let mut buffers = FrameBuffers {
            stack: self.stack,
            locals: self.locals,
        };
        buffers.recycle(self.inline_capacity);
        buffers
    }

    /// Run an operation, remembering the first failure
    pub(super) fn tracked<T>(
        &mut self,
        operation: impl FnOnce(&mut Self) -> Result<T, VerifierErrorKind>,
    ) -> Result<T, VerifierErrorKind> {
        let result = operation(self);
        if let Err(kind) = &result {
            if self.failure.is_none() {
                log::debug!("Verification failed: {:?} (stack = {:?})", kind, self.stack());
                self.failure = Some(*kind);
            }
        }
        result
    }

    /// First failure encountered by any operation on this frame
    pub fn is_verification_failed(&self) -> Option<VerifierErrorKind> {
        self.failure
    }

    pub fn max_stack(&self) -> usize {
        self.stack.len()
    }

    pub fn max_locals(&self) -> usize {
        self.locals.len()
    }

    pub fn stack_pointer(&self) -> usize {
        self.stack_pointer
    }

    /// Live stack slots, bottom of the stack first
    pub fn stack(&self) -> &[VerificationType] {
        &self.stack[..self.stack_pointer]
    }

    /// Top stack slot (the second-half marker, if a `long` or `double` is on top)
    pub fn top_of_stack(&self) -> Option<&VerificationType> {
        self.stack().last()
    }

    pub fn locals(&self) -> &[VerificationType] {
        &self.locals
    }

    pub fn local(&self, index: u16) -> Option<&VerificationType> {
        self.locals.get(index as usize)
    }

    pub fn needs_initialization(&self) -> bool {
        self.needs_initialization
    }

    pub fn set_needs_initialization(&mut self, needs_initialization: bool) {
        self.needs_initialization = needs_initialization;
    }

    /// Assignability, under this frame's settings
    pub(super) fn is_assignable<H: ClassHierarchy + ?Sized>(
        &self,
        from: &VerificationType,
        to: &VerificationType,
        hierarchy: &H,
    ) -> Result<bool, VerifierErrorKind> {
        VerificationType::is_assignable(from, to, hierarchy, self.interfaces_as_object)
    }

    /// Push a one-slot value
    pub fn push_category1(&mut self, value: VerificationType) -> Result<(), VerifierErrorKind> {
        self.tracked(|frame| {
            if value.width() != 1 || value.is_second_half() {
                return Err(VerifierErrorKind::StackBadType);
            }
            if frame.stack_pointer >= frame.max_stack() {
                return Err(VerifierErrorKind::StackOverflow);
            }
            frame.stack[frame.stack_pointer] = value;
            frame.stack_pointer += 1;
            Ok(())
        })
    }

    /// Push a `long` or `double`, along with its second half
    pub fn push_category2(&mut self, value: VerificationType) -> Result<(), VerifierErrorKind> {
        self.tracked(|frame| {
            let second_half = value.second_half().ok_or(VerifierErrorKind::StackBadType)?;
            if frame.stack_pointer + 2 > frame.max_stack() {
                return Err(VerifierErrorKind::StackOverflow);
            }
            frame.stack[frame.stack_pointer] = value;
            frame.stack[frame.stack_pointer + 1] = second_half;
            frame.stack_pointer += 2;
            Ok(())
        })
    }

    /// Push a value of either category
    pub fn push_value(&mut self, value: VerificationType) -> Result<(), VerifierErrorKind> {
        if value.width() == 2 {
            self.push_category2(value)
        } else {
            self.push_category1(value)
        }
    }

    /// Push a value of a declared type (eg. the result of a method call or field load)
    pub fn push_field_type(
        &mut self,
        field_type: &FieldType<BinaryName>,
    ) -> Result<(), VerifierErrorKind> {
        self.push_value(VerificationType::from(field_type))
    }

    fn peek_category1(&self) -> Result<&VerificationType, VerifierErrorKind> {
        let top = self
            .stack_pointer
            .checked_sub(1)
            .ok_or(VerifierErrorKind::StackUnderflow)?;
        let value = &self.stack[top];
        if value.is_second_half() {
            Err(VerifierErrorKind::StackBadType)
        } else {
            Ok(value)
        }
    }

    fn peek_category2(&self) -> Result<&VerificationType, VerifierErrorKind> {
        if self.stack_pointer < 2 {
            return Err(VerifierErrorKind::StackUnderflow);
        }
        let first = &self.stack[self.stack_pointer - 2];
        let second = &self.stack[self.stack_pointer - 1];
        match first.second_half() {
            Some(expected) if *second == expected => Ok(first),
            _ => Err(VerifierErrorKind::StackBadType),
        }
    }

    /// Pop a one-slot value
    pub fn pop_category1(&mut self) -> Result<VerificationType, VerifierErrorKind> {
        self.tracked(|frame| {
            let value = frame.peek_category1()?.clone();
            frame.stack_pointer -= 1;
            Ok(value)
        })
    }

    /// Pop a `long` or `double` (both of its slots)
    pub fn pop_category2(&mut self) -> Result<VerificationType, VerifierErrorKind> {
        self.tracked(|frame| {
            let value = frame.peek_category2()?.clone();
            frame.stack_pointer -= 2;
            Ok(value)
        })
    }

    /// Pop a value that must be assignable to the expected type
    pub fn pop_value<H: ClassHierarchy + ?Sized>(
        &mut self,
        expected: &VerificationType,
        hierarchy: &H,
    ) -> Result<VerificationType, VerifierErrorKind> {
        self.tracked(|frame| {
            if expected.width() == 2 {
                let value = frame.peek_category2()?.clone();
                if value != *expected {
                    return Err(VerifierErrorKind::StackBadType);
                }
                frame.stack_pointer -= 2;
                Ok(value)
            } else {
                let value = frame.peek_category1()?.clone();
                if !frame.is_assignable(&value, expected, hierarchy)? {
                    return Err(VerifierErrorKind::StackBadType);
                }
                frame.stack_pointer -= 1;
                Ok(value)
            }
        })
    }

    /// Pop any reference (including `null` and uninitialized objects)
    pub fn pop_reference(&mut self) -> Result<VerificationType, VerifierErrorKind> {
        self.tracked(|frame| {
            let value = frame.peek_category1()?.clone();
            if !value.is_reference() {
                return Err(VerifierErrorKind::StackBadType);
            }
            frame.stack_pointer -= 1;
            Ok(value)
        })
    }

    /// Pop `null` or an initialized object assignable to the expected type
    pub fn pop_object_of_type<H: ClassHierarchy + ?Sized>(
        &mut self,
        expected: &RefType<BinaryName>,
        hierarchy: &H,
    ) -> Result<VerificationType, VerifierErrorKind> {
        self.tracked(|frame| {
            let value = frame.peek_category1()?.clone();
            let compatible = match &value {
                VerificationType::Null => true,
                VerificationType::Object(found) => {
                    is_ref_assignable(hierarchy, found, expected, frame.interfaces_as_object)?
                }
                _ => false,
            };
            if !compatible {
                return Err(VerifierErrorKind::StackBadType);
            }
            frame.stack_pointer -= 1;
            Ok(value)
        })
    }

    /// Invalidate whatever wide value shares the slot at `index` with something else
    ///
    /// Writing over either half of a `long` or `double` leaves the other half meaningless.
    fn bogify_overlapping(&mut self, index: usize) {
        let current = &self.locals[index];
        if current.is_second_half() {
            if let Some(previous) = index.checked_sub(1) {
                if self.locals[previous].width() == 2 {
                    self.locals[previous] = VerificationType::Bogus;
                }
            }
        } else if current.width() == 2 {
            if let Some(next) = self.locals.get_mut(index + 1) {
                if next.is_second_half() {
                    *next = VerificationType::Bogus;
                }
            }
        }
    }

    /// Store a one-slot value into a local
    pub fn set_local(
        &mut self,
        index: u16,
        value: VerificationType,
    ) -> Result<(), VerifierErrorKind> {
        self.tracked(|frame| {
            let index = index as usize;
            if value.width() != 1 || value.is_second_half() {
                return Err(VerifierErrorKind::LocalsBadType);
            }
            if index >= frame.max_locals() {
                return Err(VerifierErrorKind::LocalsOverflow);
            }
            frame.bogify_overlapping(index);
            frame.locals[index] = value;
            Ok(())
        })
    }

    /// Store a `long` or `double` into a pair of locals
    pub fn set_local_wide(
        &mut self,
        index: u16,
        value: VerificationType,
    ) -> Result<(), VerifierErrorKind> {
        self.tracked(|frame| {
            let index = index as usize;
            let second_half = value.second_half().ok_or(VerifierErrorKind::LocalsBadType)?;
            if index + 1 >= frame.max_locals() {
                return Err(VerifierErrorKind::LocalsOverflow);
            }
            frame.bogify_overlapping(index);
            frame.bogify_overlapping(index + 1);
            frame.locals[index] = value;
            frame.locals[index + 1] = second_half;
            Ok(())
        })
    }

    /// Store a value of either category into the locals
    pub fn store_local(
        &mut self,
        index: u16,
        value: VerificationType,
    ) -> Result<(), VerifierErrorKind> {
        if value.width() == 2 {
            self.set_local_wide(index, value)
        } else {
            self.set_local(index, value)
        }
    }

    /// Check that a local holds exactly the expected (primitive) type
    pub fn get_local_checked(
        &mut self,
        index: u16,
        expected: &VerificationType,
    ) -> Result<(), VerifierErrorKind> {
        self.tracked(|frame| {
            let index = index as usize;
            let found = frame
                .locals
                .get(index)
                .ok_or(VerifierErrorKind::LocalsOverflow)?;
            if found != expected {
                return Err(VerifierErrorKind::LocalsBadType);
            }
            if let Some(second_half) = expected.second_half() {
                match frame.locals.get(index + 1) {
                    None => return Err(VerifierErrorKind::LocalsOverflow),
                    Some(found) if *found != second_half => {
                        return Err(VerifierErrorKind::LocalsBadType)
                    }
                    Some(_) => (),
                }
            }
            Ok(())
        })
    }

    /// Read a local that must hold a reference (possibly `null` or uninitialized)
    pub fn get_local_ref_checked(
        &mut self,
        index: u16,
    ) -> Result<VerificationType, VerifierErrorKind> {
        self.tracked(|frame| {
            let found = frame
                .locals
                .get(index as usize)
                .ok_or(VerifierErrorKind::LocalsOverflow)?;
            if found.is_reference() {
                Ok(found.clone())
            } else {
                Err(VerifierErrorKind::LocalsBadType)
            }
        })
    }

    /// Empty the stack, remembering enough to put it back with [`Self::restore_stack`]
    pub fn save_and_clear_stack(&mut self) {
        self.saved_stack = Some(SavedStack {
            stack_pointer: self.stack_pointer,
            bottom: self.stack.first().cloned(),
        });
        self.stack_pointer = 0;
    }

    /// Undo [`Self::save_and_clear_stack`]
    pub fn restore_stack(&mut self) {
        if let Some(saved) = self.saved_stack.take() {
            self.stack_pointer = saved.stack_pointer;
            if let (Some(slot), Some(bottom)) = (self.stack.first_mut(), saved.bottom) {
                *slot = bottom;
            }
        } else {
            log::warn!("Restoring a stack that was never saved");
        }
    }

    /// Replace every occurrence of an uninitialized object with its initialized class
    ///
    /// This is the effect of calling `<init>` on the object. Initializing `UninitializedThis`
    /// also means the constructor has now called its superclass constructor.
    pub fn mark_initialized(
        &mut self,
        uninitialized: &VerificationType,
        class: BinaryName,
    ) -> Result<(), VerifierErrorKind> {
        self.tracked(|frame| {
            if !uninitialized.is_uninitialized() {
                return Err(VerifierErrorKind::StackBadType);
            }
            let initialized = VerificationType::object(class);
            let stack_pointer = frame.stack_pointer;
            let live_slots = frame.stack[..stack_pointer]
                .iter_mut()
                .chain(frame.locals.iter_mut());
            for slot in live_slots {
                if slot == uninitialized {
                    *slot = initialized.clone();
                }
            }
            if *uninitialized == VerificationType::UninitializedThis {
                frame.needs_initialization = false;
            }
            Ok(())
        })
    }

    /// Check the top of the stack against the method's declared return type
    ///
    /// Constructors may not return before `this` has been initialized.
    pub fn verify_return<H: ClassHierarchy + ?Sized>(
        &mut self,
        return_type: Option<&FieldType<BinaryName>>,
        hierarchy: &H,
    ) -> Result<(), VerifierErrorKind> {
        if self.needs_initialization {
            return self.tracked(|_| Err(VerifierErrorKind::InvalidInitialization));
        }
        match return_type {
            None => Ok(()),
            Some(return_type) => self
                .pop_value(&VerificationType::from(return_type), hierarchy)
                .map(|_| ()),
        }
    }
}
