use super::{BinaryName, Error, Name};
use crate::util::Width;
use std::iter::Peekable;
use std::str::Chars;

/// Types that have a textual descriptor form (eg. `[Ljava/lang/String;` or `(IJ)V`)
pub trait RenderDescriptor {
    /// Descriptor as a fresh string
    fn render(&self) -> String {
        let mut rendered = String::new();
        self.render_to(&mut rendered);
        rendered
    }

    fn render_to(&self, out: &mut String);
}

/// Types that can be read back from their descriptor form
pub trait ParseDescriptor: Sized {
    /// Parse a full descriptor, rejecting trailing characters
    fn parse(descriptor: &str) -> Result<Self, Error> {
        let mut reader = DescriptorReader {
            chars: descriptor.chars().peekable(),
            descriptor,
        };
        let parsed = Self::read(&mut reader)?;
        match reader.chars.next() {
            None => Ok(parsed),
            Some(c) => Err(reader.error(format!("trailing '{}'", c))),
        }
    }

    fn read(reader: &mut DescriptorReader) -> Result<Self, Error>;
}

/// Array types in class files have at most this many dimensions
pub const MAX_ARRAY_DIMENSIONS: usize = 255;

/// Cursor into a descriptor being parsed
pub struct DescriptorReader<'a> {
    chars: Peekable<Chars<'a>>,
    descriptor: &'a str,
}

impl<'a> DescriptorReader<'a> {
    fn error(&self, problem: impl AsRef<str>) -> Error {
        Error::BadDescriptor(format!("{} in `{}`", problem.as_ref(), self.descriptor))
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn expect(&mut self, expected: char) -> Result<(), Error> {
        match self.chars.next() {
            Some(c) if c == expected => Ok(()),
            Some(c) => Err(self.error(format!("expected '{}' but found '{}'", expected, c))),
            None => Err(self.error(format!("expected '{}'", expected))),
        }
    }
}

/// Primitive value types
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum BaseType {
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Float,
    Long,
    Double,
}

impl BaseType {
    fn from_char(c: char) -> Option<BaseType> {
        let base_type = match c {
            'Z' => BaseType::Boolean,
            'B' => BaseType::Byte,
            'C' => BaseType::Char,
            'S' => BaseType::Short,
            'I' => BaseType::Int,
            'F' => BaseType::Float,
            'J' => BaseType::Long,
            'D' => BaseType::Double,
            _ => return None,
        };
        Some(base_type)
    }

    fn to_char(self) -> char {
        match self {
            BaseType::Boolean => 'Z',
            BaseType::Byte => 'B',
            BaseType::Char => 'C',
            BaseType::Short => 'S',
            BaseType::Int => 'I',
            BaseType::Float => 'F',
            BaseType::Long => 'J',
            BaseType::Double => 'D',
        }
    }
}

impl Width for BaseType {
    fn width(&self) -> usize {
        match self {
            BaseType::Long | BaseType::Double => 2,
            _ => 1,
        }
    }
}

/// Reference type
///
/// Class names inside the verifier are always symbolic: `Class` is usually a [`BinaryName`].
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum RefType<Class> {
    Object(Class),
    ObjectArray(ArrayType<Class>),
    PrimitiveArray(ArrayType<BaseType>),
}

/// Array type, flattened to its innermost element type
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct ArrayType<T> {
    /// Dimensions beyond the first (`A[]` has 0, `A[][][]` has 2)
    pub additional_dimensions: usize,

    /// Innermost non-array type
    pub element_type: T,
}

impl<T> ArrayType<T> {
    pub const fn dimensions(&self) -> usize {
        self.additional_dimensions + 1
    }
}

impl<C> RefType<C> {
    /// Array whose elements have the given type
    pub fn array(element: FieldType<C>) -> RefType<C> {
        match element {
            FieldType::Base(element_type) => RefType::PrimitiveArray(ArrayType {
                additional_dimensions: 0,
                element_type,
            }),
            FieldType::Ref(RefType::Object(element_type)) => RefType::ObjectArray(ArrayType {
                additional_dimensions: 0,
                element_type,
            }),
            FieldType::Ref(RefType::PrimitiveArray(inner)) => {
                RefType::PrimitiveArray(ArrayType {
                    additional_dimensions: inner.dimensions(),
                    element_type: inner.element_type,
                })
            }
            FieldType::Ref(RefType::ObjectArray(inner)) => RefType::ObjectArray(ArrayType {
                additional_dimensions: inner.dimensions(),
                element_type: inner.element_type,
            }),
        }
    }
}

/// Type of a field, parameter, return value, or local variable
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum FieldType<Class> {
    Base(BaseType),
    Ref(RefType<Class>),
}

impl<C> Width for FieldType<C> {
    fn width(&self) -> usize {
        match self {
            FieldType::Base(base_type) => base_type.width(),
            FieldType::Ref(_) => 1,
        }
    }
}

impl<C> FieldType<C> {
    pub fn array(element: FieldType<C>) -> FieldType<C> {
        FieldType::Ref(RefType::array(element))
    }

    pub const fn object(class_name: C) -> FieldType<C> {
        FieldType::Ref(RefType::Object(class_name))
    }

    pub const fn int() -> FieldType<C> {
        FieldType::Base(BaseType::Int)
    }

    pub const fn long() -> FieldType<C> {
        FieldType::Base(BaseType::Long)
    }

    pub const fn float() -> FieldType<C> {
        FieldType::Base(BaseType::Float)
    }

    pub const fn boolean() -> FieldType<C> {
        FieldType::Base(BaseType::Boolean)
    }
}

/// Signature of a method
#[derive(PartialEq, Eq, Hash, Debug, Clone)]
pub struct MethodDescriptor<Class> {
    pub parameters: Vec<FieldType<Class>>,

    /// `None` for `void`
    pub return_type: Option<FieldType<Class>>,
}

impl<C> MethodDescriptor<C> {
    /// Number of local slots taken up by the parameters
    pub fn parameter_length(&self, has_this_param: bool) -> usize {
        let parameters: usize = self.parameters.iter().map(Width::width).sum();
        parameters + usize::from(has_this_param)
    }
}

impl RenderDescriptor for BinaryName {
    fn render_to(&self, out: &mut String) {
        out.push('L');
        out.push_str(self.as_str());
        out.push(';');
    }
}

impl RenderDescriptor for BaseType {
    fn render_to(&self, out: &mut String) {
        out.push(self.to_char());
    }
}

impl<T: RenderDescriptor> RenderDescriptor for ArrayType<T> {
    fn render_to(&self, out: &mut String) {
        out.extend(std::iter::repeat('[').take(self.dimensions()));
        self.element_type.render_to(out);
    }
}

impl<C: RenderDescriptor> RenderDescriptor for RefType<C> {
    fn render_to(&self, out: &mut String) {
        match self {
            RefType::Object(class) => class.render_to(out),
            RefType::ObjectArray(array) => array.render_to(out),
            RefType::PrimitiveArray(array) => array.render_to(out),
        }
    }
}

impl<C: RenderDescriptor> RenderDescriptor for FieldType<C> {
    fn render_to(&self, out: &mut String) {
        match self {
            FieldType::Base(base_type) => base_type.render_to(out),
            FieldType::Ref(ref_type) => ref_type.render_to(out),
        }
    }
}

impl<C: RenderDescriptor> RenderDescriptor for MethodDescriptor<C> {
    fn render_to(&self, out: &mut String) {
        out.push('(');
        for parameter in &self.parameters {
            parameter.render_to(out);
        }
        out.push(')');
        match &self.return_type {
            None => out.push('V'),
            Some(return_type) => return_type.render_to(out),
        }
    }
}

impl ParseDescriptor for BinaryName {
    /// Reads `L<name>;`
    fn read(reader: &mut DescriptorReader) -> Result<Self, Error> {
        reader.expect('L')?;
        let mut name = String::new();
        loop {
            match reader.chars.next() {
                Some(';') => break,
                Some(c) => name.push(c),
                None => return Err(reader.error("unterminated class name")),
            }
        }
        BinaryName::from_string(name).map_err(|msg| reader.error(msg))
    }
}

impl ParseDescriptor for FieldType<BinaryName> {
    fn read(reader: &mut DescriptorReader) -> Result<Self, Error> {
        match reader.peek() {
            Some('L') | Some('[') => RefType::read(reader).map(FieldType::Ref),
            Some(c) => match BaseType::from_char(c) {
                Some(base_type) => {
                    reader.chars.next();
                    Ok(FieldType::Base(base_type))
                }
                None => Err(reader.error(format!("unexpected '{}'", c))),
            },
            None => Err(reader.error("missing field type")),
        }
    }
}

impl ParseDescriptor for RefType<BinaryName> {
    fn read(reader: &mut DescriptorReader) -> Result<Self, Error> {
        match reader.peek() {
            Some('[') => {
                let mut dimensions = 0;
                while reader.chars.next_if_eq(&'[').is_some() {
                    dimensions += 1;
                }
                if dimensions > MAX_ARRAY_DIMENSIONS {
                    let msg = format!("{} array dimensions (at most 255)", dimensions);
                    return Err(reader.error(msg));
                }
                let additional_dimensions = dimensions - 1;
                match reader.peek() {
                    Some('L') => Ok(RefType::ObjectArray(ArrayType {
                        additional_dimensions,
                        element_type: BinaryName::read(reader)?,
                    })),
                    Some(c) => match BaseType::from_char(c) {
                        Some(element_type) => {
                            reader.chars.next();
                            Ok(RefType::PrimitiveArray(ArrayType {
                                additional_dimensions,
                                element_type,
                            }))
                        }
                        None => Err(reader.error(format!("unexpected array element '{}'", c))),
                    },
                    None => Err(reader.error("missing array element type")),
                }
            }
            Some('L') => BinaryName::read(reader).map(RefType::Object),
            Some(c) => Err(reader.error(format!("'{}' does not start a reference type", c))),
            None => Err(reader.error("missing reference type")),
        }
    }
}

impl ParseDescriptor for MethodDescriptor<BinaryName> {
    fn read(reader: &mut DescriptorReader) -> Result<Self, Error> {
        reader.expect('(')?;
        let mut parameters = vec![];
        loop {
            match reader.peek() {
                Some(')') => break,
                None => return Err(reader.error("unterminated parameter list")),
                Some(_) => parameters.push(FieldType::read(reader)?),
            }
        }
        reader.expect(')')?;

        let return_type = if reader.peek() == Some('V') {
            reader.chars.next();
            None
        } else {
            Some(FieldType::read(reader)?)
        };

        Ok(MethodDescriptor {
            parameters,
            return_type,
        })
    }
}
