use bitflags::bitflags;

bitflags! {
    /// Class access flags the class graph cares about
    ///
    /// Only `INTERFACE` changes how assignability is decided.
    pub struct ClassAccessFlags: u16 {
        const PUBLIC = 0x0001;
        const FINAL = 0x0010;
        const SUPER = 0x0020;
        const INTERFACE = 0x0200;
        const ABSTRACT = 0x0400;
    }
}

bitflags! {
    /// Method access flags
    ///
    /// `STATIC` decides whether the locals start with a receiver.
    pub struct MethodAccessFlags: u16 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const PROTECTED = 0x0004;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
        const SYNCHRONIZED = 0x0020;
        const NATIVE = 0x0100;
        const ABSTRACT = 0x0400;
    }
}
