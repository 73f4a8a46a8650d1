use super::{VerificationType, VerifierFrame};
use crate::jvm::class_graph::ClassHierarchy;
use crate::jvm::{BinaryName, MethodDescriptor, RefType, RenderDescriptor, VerifierErrorKind};
use crate::util::Width;

impl<'m> VerifierFrame<'m> {
    /// Pop the arguments of a call off the stack (not including any receiver)
    ///
    /// Arguments are checked in declaration order, so the first parameter is matched against the
    /// deepest argument slot. On success, the number of stack slots popped is returned. On
    /// failure, the stack is left untouched.
    pub fn pop_invoke_arguments<H: ClassHierarchy + ?Sized>(
        &mut self,
        descriptor: &MethodDescriptor<BinaryName>,
        hierarchy: &H,
    ) -> Result<usize, VerifierErrorKind> {
        self.tracked(|frame| {
            let required_depth = descriptor.parameter_length(false);
            if required_depth > frame.stack_pointer {
                return Err(VerifierErrorKind::InsufficientArguments);
            }

            let mut position = frame.stack_pointer - required_depth;
            for parameter in &descriptor.parameters {
                let expected = VerificationType::from(parameter);
                let found = &frame.stack[position];

                let compatible = match expected.second_half() {
                    Some(second_half) => {
                        *found == expected && frame.stack[position + 1] == second_half
                    }
                    None => {
                        !found.is_second_half()
                            && frame.is_assignable(found, &expected, hierarchy)?
                    }
                };
                if !compatible {
                    log::error!(
                        "Incompatible argument types: found {:?} but expected {:?} (for {})",
                        found,
                        expected,
                        descriptor.render(),
                    );
                    return Err(VerifierErrorKind::StackBadType);
                }
                position += expected.width();
            }

            frame.stack_pointer -= required_depth;
            Ok(required_depth)
        })
    }

    /// Pop the receiver of an instance method call
    ///
    /// The receiver must be `null` or an initialized object of the method's class.
    pub fn pop_receiver<H: ClassHierarchy + ?Sized>(
        &mut self,
        class: &BinaryName,
        hierarchy: &H,
    ) -> Result<VerificationType, VerifierErrorKind> {
        let expected = RefType::Object(class.clone());
        let found = self.top_of_stack().cloned();
        let result = self.pop_object_of_type(&expected, hierarchy);
        if let (Err(VerifierErrorKind::StackBadType), Some(found)) = (&result, found) {
            log::error!(
                "Incompatible receiver: found {:?} but expected {:?}",
                found,
                expected
            );
        }
        result
    }
}
