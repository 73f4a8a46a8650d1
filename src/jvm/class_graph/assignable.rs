use super::{ClassData, ClassGraph};
use crate::jvm::{BinaryName, RefType, VerifierErrorKind};
use std::cmp::Ordering;
use std::collections::HashSet;

/// Read-only view of a class hierarchy, as needed by the verifier
///
/// Implementations must be safe to query from several verifiers at once if methods are verified
/// concurrently; the verifier itself never mutates the hierarchy.
pub trait ClassHierarchy {
    /// Handle to a resolved class
    type Class: Copy;

    /// Look up a class by name
    fn resolve_class(&self, name: &BinaryName) -> Option<Self::Class>;

    /// Is the first class the same as, or a subclass/subinterface/implementor of, the second?
    fn is_subtype_of(&self, sub_type: Self::Class, super_type: Self::Class) -> bool;

    /// Is the class an interface?
    fn is_interface(&self, class: Self::Class) -> bool;
}

/// This does a traversal of super types in the class graph to determine assignability
impl<'g> ClassHierarchy for ClassGraph<'g> {
    type Class = &'g ClassData<'g>;

    fn resolve_class(&self, name: &BinaryName) -> Option<&'g ClassData<'g>> {
        self.lookup_class(name)
    }

    fn is_subtype_of(&self, sub_type: &'g ClassData<'g>, super_type: &'g ClassData<'g>) -> bool {
        let mut supertypes_to_visit: Vec<&'g ClassData<'g>> = vec![sub_type];
        let mut dont_revisit: HashSet<&'g BinaryName> = HashSet::new();
        dont_revisit.insert(&sub_type.name);

        // Optimization: if the super type is a class, then skip visiting interfaces
        let super_is_class: bool = !super_type.is_interface();

        while let Some(class_data) = supertypes_to_visit.pop() {
            if class_data == super_type {
                return true;
            }

            // Enqueue next types to visit
            if let Some(superclass) = class_data.superclass {
                if dont_revisit.insert(&superclass.name) {
                    supertypes_to_visit.push(superclass);
                }
            }
            if !super_is_class {
                for interface in class_data.interfaces.iter() {
                    if dont_revisit.insert(&interface.name) {
                        supertypes_to_visit.push(interface);
                    }
                }
            }
        }

        false
    }

    fn is_interface(&self, class: &'g ClassData<'g>) -> bool {
        class.is_interface()
    }
}

/// Check whether a value of one reference type can be stored where the other is expected
///
/// This matches the semantics of the prolog predicate `isJavaAssignable(sub_type, super_type)` in
/// JVMS §4.10.1.2. Identical names are assignable without resolving anything, so
/// a frame only ever needs to resolve classes when two different names meet.
///
/// When `interfaces_as_object` is set, every reference is assignable to an interface type.
pub fn is_ref_assignable<H: ClassHierarchy + ?Sized>(
    hierarchy: &H,
    sub_type: &RefType<BinaryName>,
    super_type: &RefType<BinaryName>,
    interfaces_as_object: bool,
) -> Result<bool, VerifierErrorKind> {
    match (sub_type, super_type) {
        // Special superclass of all arrays
        (RefType::PrimitiveArray(_) | RefType::ObjectArray(_), RefType::Object(object_type)) => {
            is_array_super_type(hierarchy, object_type, interfaces_as_object)
        }

        // Primitive arrays must match in dimension and type
        (RefType::PrimitiveArray(arr1), RefType::PrimitiveArray(arr2)) => Ok(arr1 == arr2),

        // Higher dimensional primitive arrays can be subtypes of object arrays
        (RefType::PrimitiveArray(arr1), RefType::ObjectArray(arr2)) => {
            match arr1.additional_dimensions.cmp(&arr2.additional_dimensions) {
                Ordering::Less | Ordering::Equal => Ok(false),
                Ordering::Greater => {
                    is_array_super_type(hierarchy, &arr2.element_type, interfaces_as_object)
                }
            }
        }

        // Covariance of arrays
        (RefType::ObjectArray(arr1), RefType::ObjectArray(arr2)) => {
            match arr1.additional_dimensions.cmp(&arr2.additional_dimensions) {
                Ordering::Less => Ok(false),
                Ordering::Equal => is_class_assignable(
                    hierarchy,
                    &arr1.element_type,
                    &arr2.element_type,
                    interfaces_as_object,
                ),
                Ordering::Greater => {
                    is_array_super_type(hierarchy, &arr2.element_type, interfaces_as_object)
                }
            }
        }

        // Object-to-object assignability holds if there is a path through super type edges
        (RefType::Object(cls1), RefType::Object(cls2)) => {
            is_class_assignable(hierarchy, cls1, cls2, interfaces_as_object)
        }

        _ => Ok(false),
    }
}

/// Class-to-class assignability
fn is_class_assignable<H: ClassHierarchy + ?Sized>(
    hierarchy: &H,
    sub_type: &BinaryName,
    super_type: &BinaryName,
    interfaces_as_object: bool,
) -> Result<bool, VerifierErrorKind> {
    if sub_type == super_type || super_type == &BinaryName::OBJECT {
        return Ok(true);
    }
    let super_class = resolve(hierarchy, super_type)?;
    if interfaces_as_object && hierarchy.is_interface(super_class) {
        return Ok(true);
    }
    let sub_class = resolve(hierarchy, sub_type)?;
    Ok(hierarchy.is_subtype_of(sub_class, super_class))
}

/// Check if arrays can be assigned to a class type
///
/// In CLDC the only class-typed super type of an array is `java/lang/Object`.
fn is_array_super_type<H: ClassHierarchy + ?Sized>(
    hierarchy: &H,
    super_type: &BinaryName,
    interfaces_as_object: bool,
) -> Result<bool, VerifierErrorKind> {
    if super_type == &BinaryName::OBJECT {
        return Ok(true);
    }
    if interfaces_as_object {
        let super_class = resolve(hierarchy, super_type)?;
        return Ok(hierarchy.is_interface(super_class));
    }
    Ok(false)
}

fn resolve<H: ClassHierarchy + ?Sized>(
    hierarchy: &H,
    name: &BinaryName,
) -> Result<H::Class, VerifierErrorKind> {
    hierarchy.resolve_class(name).ok_or_else(|| {
        log::debug!("Failed to resolve class {:?}", name);
        VerifierErrorKind::InvalidConstantOrClass
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::class_graph::{ClassGraph, ClassGraphArenas};
    use crate::jvm::{ClassAccessFlags, FieldType, Name};

    fn object(name: &BinaryName) -> RefType<BinaryName> {
        RefType::Object(name.clone())
    }

    #[test]
    fn simple_classes() {
        let arenas = ClassGraphArenas::new();
        let class_graph = ClassGraph::new(&arenas);
        let cldc = class_graph.insert_cldc_library_types();

        assert!(class_graph.is_subtype_of(cldc.object, cldc.object));
        assert!(class_graph.is_subtype_of(cldc.string, cldc.object));
        assert!(!class_graph.is_subtype_of(cldc.object, cldc.string));
    }

    #[test]
    fn transitive_classes() {
        let arenas = ClassGraphArenas::new();
        let class_graph = ClassGraph::new(&arenas);
        let cldc = class_graph.insert_cldc_library_types();

        assert!(
            class_graph.is_subtype_of(cldc.runtime_exception, cldc.throwable),
            "java.lang.RuntimeException <: java.lang.Throwable"
        );
        assert!(
            class_graph.is_subtype_of(cldc.null_pointer_exception, cldc.exception),
            "java.lang.NullPointerException <: java.lang.Exception"
        );
        assert!(
            !class_graph.is_subtype_of(cldc.exception, cldc.runtime_exception),
            "java.lang.Exception </: java.lang.RuntimeException"
        );
        assert!(
            !class_graph.is_subtype_of(cldc.error, cldc.exception),
            "java.lang.Error </: java.lang.Exception"
        );
    }

    #[test]
    fn interfaces() {
        let arenas = ClassGraphArenas::new();
        let class_graph = ClassGraph::new(&arenas);
        let cldc = class_graph.insert_cldc_library_types();

        let task = class_graph.add_class(ClassData::new(
            BinaryName::from_str("app/Task").unwrap(),
            cldc.object,
            ClassAccessFlags::PUBLIC,
        ));
        let slow_task = class_graph.add_class(ClassData::new(
            BinaryName::from_str("app/SlowTask").unwrap(),
            task,
            ClassAccessFlags::PUBLIC,
        ));
        task.add_interface(cldc.runnable);

        assert!(class_graph.is_subtype_of(cldc.thread, cldc.runnable));
        assert!(class_graph.is_subtype_of(slow_task, cldc.runnable));
        assert!(!class_graph.is_subtype_of(cldc.string, cldc.runnable));
        assert!(!class_graph.is_subtype_of(cldc.runnable, task));
    }

    #[test]
    fn reference_types() {
        let arenas = ClassGraphArenas::new();
        let class_graph = ClassGraph::new(&arenas);
        class_graph.insert_cldc_library_types();

        let object_ref = object(&BinaryName::OBJECT);
        let string_ref = object(&BinaryName::STRING);
        let int_array = RefType::array(FieldType::<BinaryName>::int());
        let long_array = RefType::array(FieldType::<BinaryName>::long());
        let string_array = RefType::array(FieldType::object(BinaryName::STRING));
        let object_array = RefType::array(FieldType::object(BinaryName::OBJECT));
        let nested_int_array = RefType::array(FieldType::array(FieldType::<BinaryName>::int()));

        let check = |a: &RefType<BinaryName>, b: &RefType<BinaryName>| {
            is_ref_assignable(&class_graph, a, b, false).unwrap()
        };

        assert!(check(&string_ref, &object_ref));
        assert!(!check(&object_ref, &string_ref));
        assert!(check(&int_array, &object_ref));
        assert!(check(&int_array, &int_array));
        assert!(!check(&int_array, &long_array));
        assert!(check(&string_array, &object_array));
        assert!(!check(&object_array, &string_array));
        assert!(check(&nested_int_array, &object_array));
        assert!(!check(&int_array, &object_array));
        assert!(!check(&object_ref, &int_array));
    }

    #[test]
    fn unresolved_classes() {
        let arenas = ClassGraphArenas::new();
        let class_graph = ClassGraph::new(&arenas);
        class_graph.insert_cldc_library_types();

        let missing = object(&BinaryName::from_str("app/Missing").unwrap());
        let string_ref = object(&BinaryName::STRING);

        // Identical names and `Object` never need resolution
        assert_eq!(is_ref_assignable(&class_graph, &missing, &missing, false), Ok(true));
        assert_eq!(
            is_ref_assignable(&class_graph, &missing, &object(&BinaryName::OBJECT), false),
            Ok(true)
        );
        assert_eq!(
            is_ref_assignable(&class_graph, &missing, &string_ref, false),
            Err(VerifierErrorKind::InvalidConstantOrClass)
        );
    }

    #[test]
    fn interfaces_as_object() {
        let arenas = ClassGraphArenas::new();
        let class_graph = ClassGraph::new(&arenas);
        class_graph.insert_cldc_library_types();

        let runnable = object(&BinaryName::RUNNABLE);
        let string_ref = object(&BinaryName::STRING);
        let int_array = RefType::array(FieldType::<BinaryName>::int());

        assert_eq!(is_ref_assignable(&class_graph, &string_ref, &runnable, false), Ok(false));
        assert_eq!(is_ref_assignable(&class_graph, &string_ref, &runnable, true), Ok(true));
        assert_eq!(is_ref_assignable(&class_graph, &int_array, &runnable, true), Ok(true));
    }
}
