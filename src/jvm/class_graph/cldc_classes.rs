use super::{BinaryName, ClassAccessFlags, ClassData, ClassGraph};
use elsa::FrozenVec;

/// Core classes every CLDC configuration provides
///
/// Unlike Java SE, boxed numbers extend `java/lang/Object` directly (there is no
/// `java/lang/Number`).
pub struct CldcClasses<'g> {
    pub object: &'g ClassData<'g>,
    pub string: &'g ClassData<'g>,
    pub class: &'g ClassData<'g>,
    pub runnable: &'g ClassData<'g>,
    pub thread: &'g ClassData<'g>,
    pub boolean: &'g ClassData<'g>,
    pub integer: &'g ClassData<'g>,
    pub long: &'g ClassData<'g>,
    pub float: &'g ClassData<'g>,
    pub double: &'g ClassData<'g>,
    pub throwable: &'g ClassData<'g>,
    pub error: &'g ClassData<'g>,
    pub exception: &'g ClassData<'g>,
    pub runtime_exception: &'g ClassData<'g>,
    pub arithmetic_exception: &'g ClassData<'g>,
    pub null_pointer_exception: &'g ClassData<'g>,
}

impl<'g> CldcClasses<'g> {
    pub fn add_to_graph(class_graph: &ClassGraph<'g>) -> CldcClasses<'g> {
        let object = class_graph.add_class(ClassData {
            name: BinaryName::OBJECT,
            superclass: None,
            interfaces: FrozenVec::new(),
            access_flags: ClassAccessFlags::PUBLIC | ClassAccessFlags::SUPER,
        });

        let open_class = ClassAccessFlags::PUBLIC | ClassAccessFlags::SUPER;
        let final_class = open_class | ClassAccessFlags::FINAL;
        let interface =
            ClassAccessFlags::PUBLIC | ClassAccessFlags::INTERFACE | ClassAccessFlags::ABSTRACT;
        let add = |name: BinaryName, superclass: &'g ClassData<'g>, flags: ClassAccessFlags| {
            class_graph.add_class(ClassData::new(name, superclass, flags))
        };

        let string = add(BinaryName::STRING, object, final_class);
        let class = add(BinaryName::CLASS, object, final_class);
        let runnable = add(BinaryName::RUNNABLE, object, interface);
        let thread = add(BinaryName::THREAD, object, open_class);
        thread.add_interface(runnable);

        let boolean = add(BinaryName::BOOLEAN, object, final_class);
        let integer = add(BinaryName::INTEGER, object, final_class);
        let long = add(BinaryName::LONG, object, final_class);
        let float = add(BinaryName::FLOAT, object, final_class);
        let double = add(BinaryName::DOUBLE, object, final_class);

        let throwable = add(BinaryName::THROWABLE, object, open_class);
        let error = add(BinaryName::ERROR, throwable, open_class);
        let exception = add(BinaryName::EXCEPTION, throwable, open_class);
        let runtime_exception = add(BinaryName::RUNTIMEEXCEPTION, exception, open_class);
        let arithmetic_exception =
            add(BinaryName::ARITHMETICEXCEPTION, runtime_exception, open_class);
        let null_pointer_exception =
            add(BinaryName::NULLPOINTEREXCEPTION, runtime_exception, open_class);

        CldcClasses {
            object,
            string,
            class,
            runnable,
            thread,
            boolean,
            integer,
            long,
            float,
            double,
            throwable,
            error,
            exception,
            runtime_exception,
            arithmetic_exception,
            null_pointer_exception,
        }
    }
}
