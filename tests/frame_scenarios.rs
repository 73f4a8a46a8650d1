use cldc_verifier::jvm::class_graph::{ClassData, ClassGraph, ClassGraphArenas};
use cldc_verifier::jvm::verifier::*;
use cldc_verifier::jvm::*;

fn name(name: &str) -> BinaryName {
    BinaryName::from_string(String::from(name)).unwrap()
}

fn descriptor(desc: &str) -> MethodDescriptor<BinaryName> {
    MethodDescriptor::parse(desc).unwrap()
}

fn method(
    class: &str,
    method_name: &str,
    desc: &str,
    access_flags: MethodAccessFlags,
    max_stack: u16,
    max_locals: u16,
) -> MethodData {
    MethodData {
        class: name(class),
        name: UnqualifiedName::from_string(String::from(method_name)).unwrap(),
        descriptor: descriptor(desc),
        access_flags,
        max_stack,
        max_locals,
    }
}

#[test]
fn simple_arithmetic() {
    let arenas = ClassGraphArenas::new();
    let class_graph = ClassGraph::new(&arenas);
    class_graph.insert_cldc_library_types();

    // iload_0; iconst_1; iadd
    let stackmaps = StackMapTable::empty();
    let mut frame = VerifierFrame::new(2, 1, &stackmaps, &VerifierSettings::default());
    frame.set_local(0, VerificationType::Integer).unwrap();

    frame.get_local_checked(0, &VerificationType::Integer).unwrap();
    assert_eq!(frame.push_category1(VerificationType::Integer), Ok(()));
    assert_eq!(frame.push_category1(VerificationType::Integer), Ok(()));
    assert_eq!(frame.stack_pointer(), 2);

    assert_eq!(frame.pop_category1(), Ok(VerificationType::Integer));
    assert_eq!(frame.pop_category1(), Ok(VerificationType::Integer));
    assert_eq!(frame.push_category1(VerificationType::Integer), Ok(()));
    assert_eq!(frame.stack_pointer(), 1);
    assert_eq!(frame.top_of_stack(), Some(&VerificationType::Integer));
    assert_eq!(frame.is_verification_failed(), None);
}

#[test]
fn bad_return_type() {
    let arenas = ClassGraphArenas::new();
    let class_graph = ClassGraph::new(&arenas);
    class_graph.insert_cldc_library_types();

    let method = method(
        "app/Main",
        "size",
        "()I",
        MethodAccessFlags::PUBLIC | MethodAccessFlags::STATIC,
        1,
        0,
    );
    let stackmaps = StackMapTable::empty();
    let mut frame =
        VerifierFrame::for_method(&method, &stackmaps, &VerifierSettings::default()).unwrap();

    frame
        .push_category1(VerificationType::object(BinaryName::STRING))
        .unwrap();
    assert_eq!(
        frame.verify_return(method.descriptor.return_type.as_ref(), &class_graph),
        Err(VerifierErrorKind::StackBadType)
    );
    assert_eq!(
        frame.is_verification_failed(),
        Some(VerifierErrorKind::StackBadType)
    );
}

#[test]
fn argument_count_mismatch() {
    let arenas = ClassGraphArenas::new();
    let class_graph = ClassGraph::new(&arenas);
    class_graph.insert_cldc_library_types();

    let stackmaps = StackMapTable::empty();
    let mut frame = VerifierFrame::new(2, 0, &stackmaps, &VerifierSettings::default());
    frame.push_category1(VerificationType::Integer).unwrap();

    assert_eq!(
        frame.pop_invoke_arguments(&descriptor("(II)V"), &class_graph),
        Err(VerifierErrorKind::InsufficientArguments)
    );
    assert_eq!(frame.stack_pointer(), 1);
    assert_eq!(frame.stack(), &[VerificationType::Integer]);
}

#[test]
fn local_overwrite_bogifies_pair() {
    let stackmaps = StackMapTable::empty();
    let mut frame = VerifierFrame::new(0, 2, &stackmaps, &VerifierSettings::default());

    frame.set_local_wide(0, VerificationType::Long).unwrap();
    frame.set_local(1, VerificationType::Integer).unwrap();
    assert_eq!(frame.local(0), Some(&VerificationType::Bogus));
    assert_eq!(
        frame.get_local_checked(0, &VerificationType::Long),
        Err(VerifierErrorKind::LocalsBadType)
    );
}

#[test]
fn wide_values_pop_whole() {
    let stackmaps = StackMapTable::empty();
    let mut frame = VerifierFrame::new(2, 0, &stackmaps, &VerifierSettings::default());

    for wide in [VerificationType::Long, VerificationType::Double] {
        frame.push_category2(wide).unwrap();
        assert_eq!(frame.pop_category1(), Err(VerifierErrorKind::StackBadType));
        frame.pop_category2().unwrap();
    }
}

#[test]
fn merge_then_check_is_idempotent() {
    let arenas = ClassGraphArenas::new();
    let class_graph = ClassGraph::new(&arenas);
    let cldc = class_graph.insert_cldc_library_types();
    class_graph.add_class(ClassData::new(
        name("app/Node"),
        cldc.object,
        ClassAccessFlags::PUBLIC | ClassAccessFlags::SUPER,
    ));

    let node = VerificationType::object(name("app/Node"));
    let int_array = VerificationType::Object(RefType::array(FieldType::int()));
    let entries = vec![
        StackMapEntry::new(0, vec![], vec![]).unwrap(),
        StackMapEntry::new(4, vec![node.clone(), VerificationType::Double], vec![]).unwrap(),
        StackMapEntry::new(
            9,
            vec![VerificationType::Bogus, VerificationType::Integer],
            vec![int_array, VerificationType::Null, VerificationType::Long],
        )
        .unwrap(),
        StackMapEntry::new(15, vec![VerificationType::UninitializedThis], vec![node]).unwrap(),
        StackMapEntry::new(20, vec![], vec![VerificationType::UninitializedNew(17)]).unwrap(),
    ];
    let stackmaps = StackMapTable::new(entries).unwrap();

    let mut frame = VerifierFrame::new(4, 4, &stackmaps, &VerifierSettings::default());
    for entry in stackmaps.iter() {
        let bci = entry.offset();
        frame
            .check_or_merge_at(bci, MergeMode::Merge, &class_graph)
            .unwrap();
        assert_eq!(
            frame.check_or_merge_at(bci, MergeMode::Check, &class_graph),
            Ok(()),
            "merge then check at {}",
            bci
        );
    }
    assert_eq!(frame.is_verification_failed(), None);
}

#[test]
fn uninitialized_this_gate() {
    let arenas = ClassGraphArenas::new();
    let class_graph = ClassGraph::new(&arenas);
    let cldc = class_graph.insert_cldc_library_types();
    class_graph.add_class(ClassData::new(
        name("app/Point"),
        cldc.object,
        ClassAccessFlags::PUBLIC | ClassAccessFlags::SUPER,
    ));

    let init = method("app/Point", "<init>", "()V", MethodAccessFlags::PUBLIC, 1, 1);
    let stackmaps = StackMapTable::new(vec![StackMapEntry::new(
        6,
        vec![VerificationType::object(name("app/Point"))],
        vec![],
    )
    .unwrap()])
    .unwrap();
    let mut frame =
        VerifierFrame::for_method(&init, &stackmaps, &VerifierSettings::default()).unwrap();
    assert!(frame.needs_initialization());

    // Jumping to a region where `this` is initialized, without having called `super()`
    assert_eq!(
        frame.check_or_merge_at(6, MergeMode::Check, &class_graph),
        Err(VerifierErrorKind::InvalidInitialization)
    );
    assert_eq!(
        frame.verify_return(None, &class_graph),
        Err(VerifierErrorKind::InvalidInitialization)
    );

    // aload_0; invokespecial java/lang/Object.<init>()V
    let this = frame.get_local_ref_checked(0).unwrap();
    frame.push_category1(this.clone()).unwrap();
    frame.pop_invoke_arguments(&descriptor("()V"), &class_graph).unwrap();
    assert_eq!(frame.pop_reference(), Ok(VerificationType::UninitializedThis));
    frame.mark_initialized(&this, name("app/Point")).unwrap();

    assert_eq!(frame.check_or_merge_at(6, MergeMode::Check, &class_graph), Ok(()));
    assert_eq!(frame.verify_return(None, &class_graph), Ok(()));
}

#[test]
fn object_allocation() {
    let arenas = ClassGraphArenas::new();
    let class_graph = ClassGraph::new(&arenas);
    class_graph.insert_cldc_library_types();

    // new java/lang/Thread (at offset 3); dup; invokespecial <init>()V; astore_1
    let stackmaps = StackMapTable::empty();
    let mut frame = VerifierFrame::new(2, 2, &stackmaps, &VerifierSettings::default());
    let thread = VerificationType::object(BinaryName::THREAD);

    frame.push_category1(VerificationType::UninitializedNew(3)).unwrap();
    frame.push_category1(VerificationType::UninitializedNew(3)).unwrap();
    frame.pop_invoke_arguments(&descriptor("()V"), &class_graph).unwrap();
    let receiver = frame.pop_reference().unwrap();
    frame.mark_initialized(&receiver, BinaryName::THREAD).unwrap();
    assert_eq!(frame.stack(), &[thread.clone()]);

    let value = frame
        .pop_value(&VerificationType::object(BinaryName::RUNNABLE), &class_graph)
        .unwrap();
    frame.set_local(1, value).unwrap();
    assert_eq!(frame.local(1), Some(&thread));
}

#[test]
fn exception_handler() {
    let arenas = ClassGraphArenas::new();
    let class_graph = ClassGraph::new(&arenas);
    class_graph.insert_cldc_library_types();

    let stackmaps = StackMapTable::new(vec![StackMapEntry::new(
        30,
        vec![VerificationType::Float],
        vec![VerificationType::object(BinaryName::RUNTIMEEXCEPTION)],
    )
    .unwrap()])
    .unwrap();
    let mut frame = VerifierFrame::new(2, 1, &stackmaps, &VerifierSettings::default());
    frame.set_local(0, VerificationType::Float).unwrap();
    frame.push_category1(VerificationType::Integer).unwrap();
    frame.push_category1(VerificationType::Null).unwrap();

    let npe = BinaryName::NULLPOINTEREXCEPTION;
    assert_eq!(frame.check_handler_entry(30, Some(&npe), &class_graph), Ok(()));
    assert_eq!(
        frame.stack(),
        &[VerificationType::Integer, VerificationType::Null]
    );

    let error = BinaryName::ERROR;
    assert_eq!(
        frame.check_handler_entry(30, Some(&error), &class_graph),
        Err(VerifierErrorKind::StackBadType)
    );
    assert_eq!(
        frame.stack(),
        &[VerificationType::Integer, VerificationType::Null]
    );
}

#[test]
fn buffers_across_methods() {
    let arenas = ClassGraphArenas::new();
    let class_graph = ClassGraph::new(&arenas);
    class_graph.insert_cldc_library_types();

    let settings = VerifierSettings::default();
    let stackmaps = StackMapTable::empty();
    let methods = [
        method("app/A", "a", "(JJ)J", MethodAccessFlags::STATIC, 4, 4),
        method("app/A", "b", "()V", MethodAccessFlags::PUBLIC, 1, 1),
        method("app/A", "c", "(Ljava/lang/String;I)I", MethodAccessFlags::PUBLIC, 2, 40),
    ];

    let mut buffers = FrameBuffers::new(&settings);
    for method in &methods {
        let mut frame = VerifierFrame::with_buffers(
            buffers,
            method.max_stack,
            method.max_locals,
            &stackmaps,
            &settings,
        );
        frame.enter_method(method).unwrap();
        if let Some(return_type) = &method.descriptor.return_type {
            frame.push_field_type(return_type).unwrap();
        }
        frame
            .verify_return(method.descriptor.return_type.as_ref(), &class_graph)
            .unwrap();
        assert_eq!(frame.stack_pointer(), 0);
        assert_eq!(frame.max_locals(), method.max_locals as usize);
        buffers = frame.into_buffers();
    }
}
