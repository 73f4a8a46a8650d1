use crate::jvm::class_graph::{is_ref_assignable, ClassHierarchy};
use crate::jvm::{BaseType, BinaryName, FieldType, RefType, VerifierErrorKind};
use crate::util::Width;
use std::mem;

/// Types tracked in the stack and locals during verification
///
/// These are the types from [this hierarchy][0], adjusted to the slot-oriented view of a CLDC
/// verifier: `long` and `double` occupy two slots, with the second one holding an explicit
/// second-half marker.
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se7/html/jvms-4.html#jvms-4.10.1.2
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub enum VerificationType {
    /// Nothing meaningful in this slot (`top` in the JVM specification)
    Bogus,

    Integer,
    Float,
    Long,
    LongSecondHalf,
    Double,
    DoubleSecondHalf,
    Null,

    /// In the constructor, the `this` parameter starts with this type then turns into an object
    /// type after the superclass `<init>` is called
    UninitializedThis,

    /// State of an object after `new` has been called but `<init>` has not been called
    ///
    /// The payload is the bytecode offset of the `new` instruction which created it.
    UninitializedNew(u16),

    /// Object type (including arrays)
    Object(RefType<BinaryName>),
}

impl VerificationType {
    /// Object type for a class name
    pub fn object(class_name: BinaryName) -> VerificationType {
        VerificationType::Object(RefType::Object(class_name))
    }

    /// Is this type a reference type (possibly not yet initialized)?
    pub fn is_reference(&self) -> bool {
        matches!(
            self,
            VerificationType::Null
                | VerificationType::UninitializedThis
                | VerificationType::UninitializedNew(_)
                | VerificationType::Object(_)
        )
    }

    /// Is this the marker stored in the slot after a `long` or `double`?
    pub fn is_second_half(&self) -> bool {
        matches!(
            self,
            VerificationType::LongSecondHalf | VerificationType::DoubleSecondHalf
        )
    }

    /// Second-half marker that must follow this type, if it is a category 2 type
    pub fn second_half(&self) -> Option<VerificationType> {
        match self {
            VerificationType::Long => Some(VerificationType::LongSecondHalf),
            VerificationType::Double => Some(VerificationType::DoubleSecondHalf),
            _ => None,
        }
    }

    /// Is this an uninitialized object (either `this` or the result of `new`)?
    pub fn is_uninitialized(&self) -> bool {
        matches!(
            self,
            VerificationType::UninitializedThis | VerificationType::UninitializedNew(_)
        )
    }

    /// Structural equality of the tags alone
    ///
    /// Class names and `new` offsets are ignored.
    pub fn is_identical(&self, other: &VerificationType) -> bool {
        mem::discriminant(self) == mem::discriminant(other)
    }

    /// Check if one verification type is assignable to another
    ///
    /// Only object-to-object queries consult the class hierarchy, and only when the class names
    /// differ. A failure to resolve a class name is reported as an error rather than as "not
    /// assignable".
    pub fn is_assignable<H: ClassHierarchy + ?Sized>(
        from: &VerificationType,
        to: &VerificationType,
        hierarchy: &H,
        interfaces_as_object: bool,
    ) -> Result<bool, VerifierErrorKind> {
        match (from, to) {
            (_, VerificationType::Bogus) => Ok(true),
            (VerificationType::Object(sub_type), VerificationType::Object(super_type)) => {
                is_ref_assignable(hierarchy, sub_type, super_type, interfaces_as_object)
            }
            (VerificationType::Null, VerificationType::Object(_)) => Ok(true),
            _ => Ok(from == to),
        }
    }
}

impl Width for VerificationType {
    fn width(&self) -> usize {
        match self {
            VerificationType::Double | VerificationType::Long => 2,
            _ => 1,
        }
    }
}

impl From<FieldType<BinaryName>> for VerificationType {
    fn from(field_type: FieldType<BinaryName>) -> Self {
        match field_type {
            FieldType::Base(BaseType::Int)
            | FieldType::Base(BaseType::Char)
            | FieldType::Base(BaseType::Short)
            | FieldType::Base(BaseType::Byte)
            | FieldType::Base(BaseType::Boolean) => VerificationType::Integer,
            FieldType::Base(BaseType::Float) => VerificationType::Float,
            FieldType::Base(BaseType::Long) => VerificationType::Long,
            FieldType::Base(BaseType::Double) => VerificationType::Double,
            FieldType::Ref(ref_type) => VerificationType::Object(ref_type),
        }
    }
}

impl From<&FieldType<BinaryName>> for VerificationType {
    fn from(field_type: &FieldType<BinaryName>) -> Self {
        VerificationType::from(field_type.clone())
    }
}
