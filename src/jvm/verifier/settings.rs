use super::VerificationType;

/// Knobs for the verifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifierSettings {
    /// Number of slots of stack and locals storage kept around between methods
    ///
    /// Most methods have tiny stacks and few locals, so [`FrameBuffers`] handed back after a
    /// method is verified keep this much capacity for the next one. Methods needing more slots
    /// still work: they allocate, and the excess is released once their buffers are recycled.
    pub inline_capacity: usize,

    /// Treat every reference as assignable to any interface type
    ///
    /// This is the classic CLDC simplification: interface types are checked again at run time by
    /// `invokeinterface`, so the verifier can skip walking interface tables.
    pub interfaces_as_object: bool,
}

impl VerifierSettings {
    pub const DEFAULT_INLINE_CAPACITY: usize = 16;
}

impl Default for VerifierSettings {
    fn default() -> Self {
        VerifierSettings {
            inline_capacity: Self::DEFAULT_INLINE_CAPACITY,
            interfaces_as_object: false,
        }
    }
}

/// Reusable backing storage for the stack and locals of a [`super::VerifierFrame`]
///
/// Verifying a class means verifying many methods in a row: threading one `FrameBuffers` through
/// all of them avoids allocating fresh arrays for every method.
#[derive(Debug, Default)]
pub struct FrameBuffers {
    pub(super) stack: Vec<VerificationType>,
    pub(super) locals: Vec<VerificationType>,
}

impl FrameBuffers {
    pub fn new(settings: &VerifierSettings) -> FrameBuffers {
        FrameBuffers {
            stack: Vec::with_capacity(settings.inline_capacity),
            locals: Vec::with_capacity(settings.inline_capacity),
        }
    }

    /// Size the buffers for a method, filling every slot with `Bogus`
    pub(super) fn reset(&mut self, max_stack: usize, max_locals: usize) {
        self.stack.clear();
        self.stack.resize(max_stack, VerificationType::Bogus);
        self.locals.clear();
        self.locals.resize(max_locals, VerificationType::Bogus);
    }

    /// Empty the buffers, releasing capacity beyond `inline_capacity`
    pub(super) fn recycle(&mut self, inline_capacity: usize) {
        self.stack.clear();
        self.stack.shrink_to(inline_capacity);
        self.locals.clear();
        self.locals.shrink_to(inline_capacity);
    }

    /// Number of slots of capacity currently held by the stack and locals
    pub fn capacity(&self) -> (usize, usize) {
        (self.stack.capacity(), self.locals.capacity())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_inline_capacity() {
        let settings = VerifierSettings::default();
        assert_eq!(
            settings.inline_capacity,
            VerifierSettings::DEFAULT_INLINE_CAPACITY
        );
        assert!(!settings.interfaces_as_object);

        let (stack, locals) = FrameBuffers::new(&settings).capacity();
        assert!(stack >= VerifierSettings::DEFAULT_INLINE_CAPACITY);
        assert!(locals >= VerifierSettings::DEFAULT_INLINE_CAPACITY);
    }
}
