//! Verifier trace scripts
//!
//! A trace script stands in for a bytecode walker: it declares the classes and the method being
//! verified, the method's stack map table, and then lists the verifier operations that the walker
//! would have performed, one per line. This makes it possible to exercise (and debug) stack map
//! tables without assembling class files.
//!
//! ```text
//! # Constructor of a class extending `java/lang/Object`
//! class app/Point
//! method app/Point <init> (II)V stack=3 locals=3
//! stackmap 12 locals Lapp/Point; I I
//!
//! loadref 0
//! init this app/Point
//! merge 12
//! return
//! ```
//!
//! Blank lines and everything after a `#` are ignored. Types are written as `I`, `F`, `J`, `D`,
//! `null`, `top`, `this` (uninitialized `this`), `new@<offset>` (object created by the `new` at
//! that offset), or as a reference type descriptor such as `Ljava/lang/String;` or `[I`.

use crate::jvm::class_graph::{ClassData, ClassGraph, ClassGraphArenas};
use crate::jvm::verifier::{
    MergeMode, MethodData, StackMapEntry, StackMapTable, VerificationType, VerifierFrame,
    VerifierSettings,
};
use crate::jvm::{
    BinaryName, ClassAccessFlags, Error, MethodAccessFlags, MethodDescriptor, Name,
    ParseDescriptor, RefType, UnqualifiedName, VerifierErrorKind,
};
use std::str::SplitWhitespace;

/// Class or interface declared by a script
#[derive(Debug, Clone)]
pub struct ClassDeclaration {
    pub line: usize,
    pub name: BinaryName,
    pub is_interface: bool,

    /// Always `None` for interfaces
    pub superclass: Option<BinaryName>,

    /// Implemented interfaces (or extended interfaces, for an interface)
    pub interfaces: Vec<BinaryName>,
}

/// One verifier operation
#[derive(Debug, Clone)]
pub enum Operation {
    /// `push <type>`
    Push(VerificationType),

    /// `pop <type>`
    Pop(VerificationType),

    /// `pop1`
    PopCategory1,

    /// `pop2`
    PopCategory2,

    /// `popref`
    PopReference,

    /// `store <idx> <type>`: pop a value and store it in a local
    Store(u16, VerificationType),

    /// `load <idx> <type>`: check a local and push its value
    Load(u16, VerificationType),

    /// `loadref <idx>`: push whatever reference is in a local
    LoadReference(u16),

    /// `invoke <descriptor>`: pop call arguments
    Invoke(MethodDescriptor<BinaryName>),

    /// `receiver <class>`: pop the receiver of an instance call
    Receiver(BinaryName),

    /// `result <descriptor>`: push the return value of a call
    Result(MethodDescriptor<BinaryName>),

    /// `return`
    Return,

    /// `check <bci>`
    Check(u16),

    /// `merge <bci>`
    Merge(u16),

    /// `handler <bci> [<class>]`
    Handler(u16, Option<BinaryName>),

    /// `init <this|new@site> <class>`
    Initialize(VerificationType, BinaryName),
}

/// Parsed verifier trace
#[derive(Debug, Clone)]
pub struct Script {
    classes: Vec<ClassDeclaration>,
    method: MethodData,
    method_line: usize,
    stackmaps: Vec<StackMapEntry>,
    operations: Vec<(usize, Operation)>,
}

impl Script {
    /// Parse a script from its source text
    pub fn parse(source: &str) -> Result<Script, Error> {
        let mut classes = vec![];
        let mut method: Option<(usize, MethodData)> = None;
        let mut stackmaps = vec![];
        let mut operations = vec![];
        let mut last_line = 0;

        for (idx, text) in source.lines().enumerate() {
            let line = idx + 1;
            last_line = line;
            let text = match text.find('#') {
                Some(comment_start) => &text[..comment_start],
                None => text,
            };
            let mut parser = LineParser {
                line,
                tokens: text.split_whitespace(),
            };
            let keyword = match parser.tokens.next() {
                None => continue,
                Some(keyword) => keyword,
            };

            match keyword {
                "class" => classes.push(parser.class_declaration()?),
                "interface" => classes.push(parser.interface_declaration()?),
                "method" => {
                    if method.is_some() {
                        return Err(parser.error("only one method can be verified per script"));
                    }
                    method = Some((line, parser.method_declaration()?));
                }
                "stackmap" => stackmaps.push(parser.stack_map_entry()?),
                _ => {
                    if method.is_none() {
                        return Err(parser.error("operations must follow a `method` declaration"));
                    }
                    operations.push((line, parser.operation(keyword)?));
                }
            }
            parser.finish()?;
        }

        let (method_line, method) = method.ok_or_else(|| Error::Script {
            line: last_line,
            message: String::from("missing `method` declaration"),
        })?;
        Ok(Script {
            classes,
            method,
            method_line,
            stackmaps,
            operations,
        })
    }

    /// Method being verified
    pub fn method(&self) -> &MethodData {
        &self.method
    }

    pub fn classes(&self) -> &[ClassDeclaration] {
        &self.classes
    }

    /// Operations, along with their line numbers
    pub fn operations(&self) -> &[(usize, Operation)] {
        &self.operations
    }

    /// Replay the script, stopping at the first verification failure
    pub fn run(&self, settings: &VerifierSettings) -> Result<(), Error> {
        let class_graph_arenas = ClassGraphArenas::new();
        let class_graph = ClassGraph::new(&class_graph_arenas);
        class_graph.insert_cldc_library_types();
        self.declare_classes(&class_graph)?;

        let stackmaps = StackMapTable::new(self.stackmaps.clone())?;
        let mut frame = VerifierFrame::for_method(&self.method, &stackmaps, settings).map_err(
            |kind| Error::Verifier {
                at: self.method_line,
                kind,
            },
        )?;

        for (line, operation) in &self.operations {
            log::trace!("Line {}: {:?}", line, operation);
            self.apply(&mut frame, operation, &class_graph)
                .map_err(|kind| Error::Verifier { at: *line, kind })?;
        }

        Ok(())
    }

    fn declare_classes<'g>(&self, class_graph: &ClassGraph<'g>) -> Result<(), Error> {
        let lookup = |line: usize, name: &BinaryName| -> Result<&'g ClassData<'g>, Error> {
            class_graph.lookup_class(name).ok_or_else(|| Error::Script {
                line,
                message: format!("unknown class {:?}", name),
            })
        };

        for declaration in &self.classes {
            let line = declaration.line;
            if class_graph.lookup_class(&declaration.name).is_some() {
                return Err(Error::Script {
                    line,
                    message: format!("class {:?} is already declared", declaration.name),
                });
            }

            let superclass = match &declaration.superclass {
                Some(superclass) => lookup(line, superclass)?,
                None => lookup(line, &BinaryName::OBJECT)?,
            };
            let access_flags = if declaration.is_interface {
                ClassAccessFlags::PUBLIC | ClassAccessFlags::INTERFACE | ClassAccessFlags::ABSTRACT
            } else {
                ClassAccessFlags::PUBLIC | ClassAccessFlags::SUPER
            };
            let class = class_graph.add_class(ClassData::new(
                declaration.name.clone(),
                superclass,
                access_flags,
            ));

            for interface_name in &declaration.interfaces {
                let interface = lookup(line, interface_name)?;
                if !interface.is_interface() {
                    return Err(Error::Script {
                        line,
                        message: format!("{:?} is not an interface", interface_name),
                    });
                }
                class.add_interface(interface);
            }
        }

        Ok(())
    }

    fn apply(
        &self,
        frame: &mut VerifierFrame,
        operation: &Operation,
        class_graph: &ClassGraph,
    ) -> Result<(), VerifierErrorKind> {
        match operation {
            Operation::Push(vtype) => frame.push_value(vtype.clone()),
            Operation::Pop(vtype) => frame.pop_value(vtype, class_graph).map(|_| ()),
            Operation::PopCategory1 => frame.pop_category1().map(|_| ()),
            Operation::PopCategory2 => frame.pop_category2().map(|_| ()),
            Operation::PopReference => frame.pop_reference().map(|_| ()),
            Operation::Store(index, vtype) => {
                let value = frame.pop_value(vtype, class_graph)?;
                frame.store_local(*index, value)
            }
            Operation::Load(index, vtype) => {
                frame.get_local_checked(*index, vtype)?;
                frame.push_value(vtype.clone())
            }
            Operation::LoadReference(index) => {
                let value = frame.get_local_ref_checked(*index)?;
                frame.push_category1(value)
            }
            Operation::Invoke(descriptor) => frame
                .pop_invoke_arguments(descriptor, class_graph)
                .map(|_| ()),
            Operation::Receiver(class) => frame.pop_receiver(class, class_graph).map(|_| ()),
            Operation::Result(descriptor) => match &descriptor.return_type {
                None => Ok(()),
                Some(return_type) => frame.push_field_type(return_type),
            },
            Operation::Return => {
                frame.verify_return(self.method.descriptor.return_type.as_ref(), class_graph)
            }
            Operation::Check(bci) => frame.check_or_merge_at(*bci, MergeMode::Check, class_graph),
            Operation::Merge(bci) => frame.check_or_merge_at(*bci, MergeMode::Merge, class_graph),
            Operation::Handler(bci, catch_type) => {
                frame.check_handler_entry(*bci, catch_type.as_ref(), class_graph)
            }
            Operation::Initialize(uninitialized, class) => {
                frame.mark_initialized(uninitialized, class.clone())
            }
        }
    }
}

/// Tokens of one line of a script
struct LineParser<'a> {
    line: usize,
    tokens: SplitWhitespace<'a>,
}

impl<'a> LineParser<'a> {
    fn error(&self, message: impl Into<String>) -> Error {
        Error::Script {
            line: self.line,
            message: message.into(),
        }
    }

    fn next_token(&mut self, expected: &str) -> Result<&'a str, Error> {
        match self.tokens.next() {
            Some(token) => Ok(token),
            None => Err(self.error(format!("expected {}", expected))),
        }
    }

    /// Every token on the line should have been consumed
    fn finish(&mut self) -> Result<(), Error> {
        match self.tokens.next() {
            None => Ok(()),
            Some(token) => Err(self.error(format!("unexpected token `{}`", token))),
        }
    }

    fn offset(&mut self, expected: &str) -> Result<u16, Error> {
        let token = self.next_token(expected)?;
        token
            .parse::<u16>()
            .map_err(|_| self.error(format!("expected {} but found `{}`", expected, token)))
    }

    fn binary_name(&mut self) -> Result<BinaryName, Error> {
        let token = self.next_token("class name")?;
        BinaryName::from_str(token).map_err(|msg| self.error(msg))
    }

    fn method_descriptor(&mut self) -> Result<MethodDescriptor<BinaryName>, Error> {
        let token = self.next_token("method descriptor")?;
        MethodDescriptor::parse(token).map_err(|err| self.error(format!("`{}`: {}", token, err)))
    }

    fn verification_type(&mut self) -> Result<VerificationType, Error> {
        let token = self.next_token("type")?;
        self.parse_type(token)
    }

    fn parse_type(&self, token: &str) -> Result<VerificationType, Error> {
        let vtype = match token {
            "I" => VerificationType::Integer,
            "F" => VerificationType::Float,
            "J" => VerificationType::Long,
            "D" => VerificationType::Double,
            "null" => VerificationType::Null,
            "top" => VerificationType::Bogus,
            "this" => VerificationType::UninitializedThis,
            _ => {
                if let Some(site) = token.strip_prefix("new@") {
                    let site = site
                        .parse::<u16>()
                        .map_err(|_| self.error(format!("bad allocation site `{}`", token)))?;
                    VerificationType::UninitializedNew(site)
                } else {
                    let ref_type = RefType::parse(token)
                        .map_err(|err| self.error(format!("`{}`: {}", token, err)))?;
                    VerificationType::Object(ref_type)
                }
            }
        };
        Ok(vtype)
    }

    /// `class <name> [extends <super>] [implements <i>...]`
    fn class_declaration(&mut self) -> Result<ClassDeclaration, Error> {
        let name = self.binary_name()?;
        let mut superclass = None;
        let mut interfaces = vec![];
        while let Some(keyword) = self.tokens.next() {
            match keyword {
                "extends" if superclass.is_none() && interfaces.is_empty() => {
                    superclass = Some(self.binary_name()?);
                }
                "implements" if interfaces.is_empty() => {
                    interfaces.push(self.binary_name()?);
                    while let Some(token) = self.tokens.next() {
                        let interface =
                            BinaryName::from_str(token).map_err(|msg| self.error(msg))?;
                        interfaces.push(interface);
                    }
                }
                other => return Err(self.error(format!("unexpected token `{}`", other))),
            }
        }
        Ok(ClassDeclaration {
            line: self.line,
            name,
            is_interface: false,
            superclass,
            interfaces,
        })
    }

    /// `interface <name> [extends <i>...]`
    fn interface_declaration(&mut self) -> Result<ClassDeclaration, Error> {
        let name = self.binary_name()?;
        let mut interfaces = vec![];
        if let Some(keyword) = self.tokens.next() {
            if keyword != "extends" {
                return Err(self.error(format!("unexpected token `{}`", keyword)));
            }
            interfaces.push(self.binary_name()?);
            while let Some(token) = self.tokens.next() {
                interfaces.push(BinaryName::from_str(token).map_err(|msg| self.error(msg))?);
            }
        }
        Ok(ClassDeclaration {
            line: self.line,
            name,
            is_interface: true,
            superclass: None,
            interfaces,
        })
    }

    /// `method <class> <name> <descriptor> [static] stack=<n> locals=<n>`
    fn method_declaration(&mut self) -> Result<MethodData, Error> {
        let class = self.binary_name()?;
        let name_token = self.next_token("method name")?;
        let name = UnqualifiedName::from_str(name_token).map_err(|msg| self.error(msg))?;
        let descriptor = self.method_descriptor()?;

        let mut access_flags = MethodAccessFlags::PUBLIC;
        let mut max_stack = None;
        let mut max_locals = None;
        while let Some(token) = self.tokens.next() {
            if token == "static" {
                access_flags |= MethodAccessFlags::STATIC;
            } else if let Some(value) = token.strip_prefix("stack=") {
                max_stack = Some(self.count(value)?);
            } else if let Some(value) = token.strip_prefix("locals=") {
                max_locals = Some(self.count(value)?);
            } else {
                return Err(self.error(format!("unexpected token `{}`", token)));
            }
        }

        Ok(MethodData {
            class,
            name,
            descriptor,
            access_flags,
            max_stack: max_stack.ok_or_else(|| self.error("missing `stack=<n>`"))?,
            max_locals: max_locals.ok_or_else(|| self.error("missing `locals=<n>`"))?,
        })
    }

    fn count(&self, value: &str) -> Result<u16, Error> {
        value
            .parse::<u16>()
            .map_err(|_| self.error(format!("bad count `{}`", value)))
    }

    /// `stackmap <bci> locals <types...> [stack <types...>]`
    fn stack_map_entry(&mut self) -> Result<StackMapEntry, Error> {
        let offset = self.offset("bytecode offset")?;
        let keyword = self.next_token("`locals`")?;
        if keyword != "locals" {
            return Err(self.error(format!("expected `locals` but found `{}`", keyword)));
        }

        let mut locals = vec![];
        let mut stack = vec![];
        let mut in_stack = false;
        while let Some(token) = self.tokens.next() {
            if token == "stack" && !in_stack {
                in_stack = true;
            } else if in_stack {
                stack.push(self.parse_type(token)?);
            } else {
                locals.push(self.parse_type(token)?);
            }
        }

        StackMapEntry::new(offset, locals, stack)
    }

    fn operation(&mut self, keyword: &str) -> Result<Operation, Error> {
        let operation = match keyword {
            "push" => Operation::Push(self.verification_type()?),
            "pop" => Operation::Pop(self.verification_type()?),
            "pop1" => Operation::PopCategory1,
            "pop2" => Operation::PopCategory2,
            "popref" => Operation::PopReference,
            "store" => {
                let index = self.offset("local index")?;
                Operation::Store(index, self.verification_type()?)
            }
            "load" => {
                let index = self.offset("local index")?;
                Operation::Load(index, self.verification_type()?)
            }
            "loadref" => Operation::LoadReference(self.offset("local index")?),
            "invoke" => Operation::Invoke(self.method_descriptor()?),
            "receiver" => Operation::Receiver(self.binary_name()?),
            "result" => Operation::Result(self.method_descriptor()?),
            "return" => Operation::Return,
            "check" => Operation::Check(self.offset("bytecode offset")?),
            "merge" => Operation::Merge(self.offset("bytecode offset")?),
            "handler" => {
                let offset = self.offset("bytecode offset")?;
                let catch_type = match self.tokens.next() {
                    None => None,
                    Some(token) => {
                        Some(BinaryName::from_str(token).map_err(|msg| self.error(msg))?)
                    }
                };
                Operation::Handler(offset, catch_type)
            }
            "init" => {
                let uninitialized = self.verification_type()?;
                if !uninitialized.is_uninitialized() {
                    return Err(self.error("only `this` or `new@<offset>` can be initialized"));
                }
                Operation::Initialize(uninitialized, self.binary_name()?)
            }
            other => return Err(self.error(format!("unknown operation `{}`", other))),
        };
        Ok(operation)
    }
}
