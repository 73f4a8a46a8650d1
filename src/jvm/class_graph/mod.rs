use super::{BinaryName, ClassAccessFlags};
use elsa::map::FrozenMap;
use elsa::FrozenVec;
use std::fmt;
use std::fmt::Debug;
use typed_arena::Arena;

mod assignable;
mod cldc_classes;

pub use assignable::*;
pub use cldc_classes::*;

pub struct ClassGraphArenas<'g> {
    class_arena: Arena<ClassData<'g>>,
}

impl<'g> ClassGraphArenas<'g> {
    pub fn new() -> Self {
        ClassGraphArenas {
            class_arena: Arena::new(),
        }
    }
}

impl<'g> Default for ClassGraphArenas<'g> {
    fn default() -> Self {
        Self::new()
    }
}

/// Tracks the super type relationships between loaded classes and interfaces
///
/// This is the class hierarchy the verifier consults when it needs to know whether a value of one
/// class can flow into a slot declared with another class. The graph is append-only: classes are
/// allocated into an arena and never removed, so handles to them stay valid for `'g`.
pub struct ClassGraph<'g> {
    arenas: &'g ClassGraphArenas<'g>,
    classes: FrozenMap<BinaryName, &'g ClassData<'g>>,
}

impl<'g> ClassGraph<'g> {
    /// Graph with no classes in it yet
    pub fn new(arenas: &'g ClassGraphArenas<'g>) -> Self {
        ClassGraph {
            arenas,
            classes: FrozenMap::new(),
        }
    }

    /// Find a class by name
    pub fn lookup_class(&self, name: &BinaryName) -> Option<&'g ClassData<'g>> {
        self.classes.map_get(name, |class| *class)
    }

    /// Allocate a class and register it under its name
    ///
    /// Re-adding a class with a name that is already known returns the existing class.
    pub fn add_class(&self, data: ClassData<'g>) -> &'g ClassData<'g> {
        if let Some(existing) = self.lookup_class(&data.name) {
            log::trace!("Class {:?} is already in the class graph", existing);
            return existing;
        }
        let data = &*self.arenas.class_arena.alloc(data);
        self.classes.insert(data.name.clone(), data);
        data
    }

    /// Add standard CLDC types to the class graph
    pub fn insert_cldc_library_types(&self) -> CldcClasses<'g> {
        CldcClasses::add_to_graph(self)
    }
}

pub struct ClassData<'g> {
    /// Fully qualified name, used as the lookup key
    pub name: BinaryName,

    /// `None` only for `java/lang/Object`
    pub superclass: Option<&'g ClassData<'g>>,

    /// Direct super-interfaces, which may grow after the class is added
    pub interfaces: FrozenVec<&'g ClassData<'g>>,

    /// Only `INTERFACE` matters to the verifier
    pub access_flags: ClassAccessFlags,
}

impl<'g> ClassData<'g> {
    pub fn new(
        name: BinaryName,
        superclass: &'g ClassData<'g>,
        access_flags: ClassAccessFlags,
    ) -> ClassData<'g> {
        ClassData {
            name,
            superclass: Some(superclass),
            interfaces: FrozenVec::new(),
            access_flags,
        }
    }

    /// Whether the `INTERFACE` flag is set
    pub fn is_interface(&self) -> bool {
        self.access_flags.contains(ClassAccessFlags::INTERFACE)
    }

    /// Record that this class implements (or this interface extends) another interface
    pub fn add_interface(&self, interface: &'g ClassData<'g>) {
        self.interfaces.push(interface);
    }
}

impl<'g> PartialEq for ClassData<'g> {
    fn eq(&self, other: &ClassData<'g>) -> bool {
        self.name == other.name
    }
}

impl<'g> Eq for ClassData<'g> {}

impl<'g> Debug for ClassData<'g> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.name.fmt(f)
    }
}
