use super::{StackMapTable, VerificationType, VerifierFrame, VerifierSettings};
use crate::jvm::{
    BinaryName, MethodAccessFlags, MethodDescriptor, UnqualifiedName, VerifierErrorKind,
};

/// What the verifier needs to know about the method whose code it is checking
#[derive(Debug, Clone)]
pub struct MethodData {
    /// Class in which the method is defined
    pub class: BinaryName,

    /// Name of the method
    pub name: UnqualifiedName,

    /// Method type
    pub descriptor: MethodDescriptor<BinaryName>,

    /// Method access flags
    pub access_flags: MethodAccessFlags,

    /// Declared maximum depth of the operand stack
    pub max_stack: u16,

    /// Declared number of local variable slots
    pub max_locals: u16,
}

impl MethodData {
    pub fn is_static(&self) -> bool {
        self.access_flags.contains(MethodAccessFlags::STATIC)
    }

    pub fn is_instance_initializer(&self) -> bool {
        self.name.is_init() && !self.is_static()
    }

    /// Must this method call a superclass constructor before it can use `this`?
    ///
    /// `java/lang/Object` is the one class whose constructor has no superclass to call.
    pub fn needs_initialization(&self) -> bool {
        self.is_instance_initializer() && self.class != BinaryName::OBJECT
    }
}

impl<'m> VerifierFrame<'m> {
    /// Frame as it is on entry to a method
    ///
    /// The locals start with the receiver (for instance methods) followed by the parameters.
    pub fn for_method(
        method: &MethodData,
        stackmaps: &'m StackMapTable,
        settings: &VerifierSettings,
    ) -> Result<VerifierFrame<'m>, VerifierErrorKind> {
        let mut frame =
            VerifierFrame::new(method.max_stack, method.max_locals, stackmaps, settings);
        frame.enter_method(method)?;
        Ok(frame)
    }

    /// Reset the locals and stack to what they are on entry to a method
    pub fn enter_method(&mut self, method: &MethodData) -> Result<(), VerifierErrorKind> {
        log::trace!(
            "Entering {:?}.{:?} with descriptor {:?}",
            method.class,
            method.name,
            method.descriptor
        );

        self.stack_pointer = 0;
        self.saved_stack = None;
        for local in &mut self.locals {
            *local = VerificationType::Bogus;
        }

        let needs_initialization = method.needs_initialization();
        let mut index: u16 = 0;
        if !method.is_static() {
            let this = if needs_initialization {
                VerificationType::UninitializedThis
            } else {
                VerificationType::object(method.class.clone())
            };
            self.set_local(index, this)?;
            index += 1;
        }
        for parameter in &method.descriptor.parameters {
            let parameter = VerificationType::from(parameter);
            let width = if parameter.second_half().is_some() { 2 } else { 1 };
            self.store_local(index, parameter)?;
            index += width;
        }

        self.needs_initialization = needs_initialization;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::{FieldType, Name, ParseDescriptor, RefType};
    use VerificationType::*;

    fn method(class: &str, name: &str, desc: &str, is_static: bool, max_locals: u16) -> MethodData {
        let access_flags = if is_static {
            MethodAccessFlags::PUBLIC | MethodAccessFlags::STATIC
        } else {
            MethodAccessFlags::PUBLIC
        };
        MethodData {
            class: BinaryName::from_str(class).unwrap(),
            name: UnqualifiedName::from_str(name).unwrap(),
            descriptor: MethodDescriptor::parse(desc).unwrap(),
            access_flags,
            max_stack: 2,
            max_locals,
        }
    }

    #[test]
    fn static_method_entry() {
        let stackmaps = StackMapTable::empty();
        let settings = VerifierSettings::default();
        let method = method("app/Main", "sum", "(IJ[Ljava/lang/String;)D", true, 5);

        let frame = VerifierFrame::for_method(&method, &stackmaps, &settings).unwrap();
        let strings =
            VerificationType::Object(RefType::array(FieldType::object(BinaryName::STRING)));
        assert_eq!(
            frame.locals(),
            &[Integer, Long, LongSecondHalf, strings, Bogus]
        );
        assert_eq!(frame.stack_pointer(), 0);
        assert!(!frame.needs_initialization());
    }

    #[test]
    fn instance_method_entry() {
        let stackmaps = StackMapTable::empty();
        let settings = VerifierSettings::default();
        let method = method("app/Main", "run", "(F)V", false, 2);
        let main = BinaryName::from_str("app/Main").unwrap();

        let frame = VerifierFrame::for_method(&method, &stackmaps, &settings).unwrap();
        assert_eq!(frame.locals(), &[VerificationType::object(main), Float]);
        assert!(!frame.needs_initialization());
    }

    #[test]
    fn constructor_entry() {
        let stackmaps = StackMapTable::empty();
        let settings = VerifierSettings::default();

        let init = method("app/Main", "<init>", "(D)V", false, 3);
        assert!(init.needs_initialization());
        let frame = VerifierFrame::for_method(&init, &stackmaps, &settings).unwrap();
        assert_eq!(frame.locals(), &[UninitializedThis, Double, DoubleSecondHalf]);
        assert!(frame.needs_initialization());

        let object_init = method("java/lang/Object", "<init>", "()V", false, 1);
        assert!(object_init.is_instance_initializer());
        assert!(!object_init.needs_initialization());
        let frame = VerifierFrame::for_method(&object_init, &stackmaps, &settings).unwrap();
        assert_eq!(frame.locals(), &[VerificationType::object(BinaryName::OBJECT)]);
        assert!(!frame.needs_initialization());
    }

    #[test]
    fn parameters_do_not_fit() {
        let stackmaps = StackMapTable::empty();
        let settings = VerifierSettings::default();

        let too_many = method("app/Main", "run", "(II)V", false, 2);
        assert_eq!(
            VerifierFrame::for_method(&too_many, &stackmaps, &settings).unwrap_err(),
            VerifierErrorKind::LocalsOverflow
        );

        let split_wide = method("app/Main", "run", "(IJ)V", true, 2);
        assert_eq!(
            VerifierFrame::for_method(&split_wide, &stackmaps, &settings).unwrap_err(),
            VerifierErrorKind::LocalsOverflow
        );
    }
}
