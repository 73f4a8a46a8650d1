use std::borrow::Cow;
use std::fmt;

/// Method (and field) names
///
/// See <https://docs.oracle.com/javase/specs/jvms/se16/html/jvms-4.html#jvms-4.2.2>
#[derive(Clone, Hash, Eq, PartialEq)]
pub struct UnqualifiedName(Cow<'static, str>);

/// Class and interface names, with `/` separating packages (eg. `java/lang/Object`)
///
/// See <https://docs.oracle.com/javase/specs/jvms/se16/html/jvms-4.html#jvms-4.2.1>
#[derive(Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct BinaryName(Cow<'static, str>);

/// Validated names
pub trait Name: Sized {
    /// Validate and wrap an owned string
    fn from_string(name: String) -> Result<Self, String>;

    /// Validate and wrap a string slice
    fn from_str(name: &str) -> Result<Self, String> {
        Self::from_string(name.to_owned())
    }

    fn as_str(&self) -> &str;
}

/// One `/`-separated segment of a name
fn check_segment(kind: &str, name: &str, segment: &str) -> Result<(), String> {
    if segment.is_empty() {
        Err(format!("{} '{}' has an empty segment", kind, name))
    } else if let Some(c) = segment.chars().find(|&c| matches!(c, '.' | ';' | '[' | '/')) {
        Err(format!("{} '{}' contains illegal character '{}'", kind, name, c))
    } else {
        Ok(())
    }
}

impl Name for UnqualifiedName {
    fn from_string(name: String) -> Result<Self, String> {
        check_segment("Unqualified name", &name, &name)?;
        Ok(UnqualifiedName(Cow::Owned(name)))
    }

    fn as_str(&self) -> &str {
        &self.0
    }
}

impl Name for BinaryName {
    fn from_string(name: String) -> Result<Self, String> {
        for segment in name.split('/') {
            check_segment("Binary name", &name, segment)?;
        }
        Ok(BinaryName(Cow::Owned(name)))
    }

    fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for UnqualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for BinaryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl UnqualifiedName {
    const fn known(name: &'static str) -> UnqualifiedName {
        UnqualifiedName(Cow::Borrowed(name))
    }

    /// Is this the name of an instance initializer?
    pub fn is_init(&self) -> bool {
        *self == Self::INIT
    }

    pub const INIT: Self = Self::known("<init>");
    pub const CLINIT: Self = Self::known("<clinit>");
}

impl BinaryName {
    const fn known(name: &'static str) -> BinaryName {
        BinaryName(Cow::Borrowed(name))
    }

    pub const ARITHMETICEXCEPTION: Self = Self::known("java/lang/ArithmeticException");
    pub const BOOLEAN: Self = Self::known("java/lang/Boolean");
    pub const CLASS: Self = Self::known("java/lang/Class");
    pub const DOUBLE: Self = Self::known("java/lang/Double");
    pub const ERROR: Self = Self::known("java/lang/Error");
    pub const EXCEPTION: Self = Self::known("java/lang/Exception");
    pub const FLOAT: Self = Self::known("java/lang/Float");
    pub const INTEGER: Self = Self::known("java/lang/Integer");
    pub const LONG: Self = Self::known("java/lang/Long");
    pub const NULLPOINTEREXCEPTION: Self = Self::known("java/lang/NullPointerException");
    pub const OBJECT: Self = Self::known("java/lang/Object");
    pub const RUNNABLE: Self = Self::known("java/lang/Runnable");
    pub const RUNTIMEEXCEPTION: Self = Self::known("java/lang/RuntimeException");
    pub const STRING: Self = Self::known("java/lang/String");
    pub const THREAD: Self = Self::known("java/lang/Thread");
    pub const THROWABLE: Self = Self::known("java/lang/Throwable");
}
