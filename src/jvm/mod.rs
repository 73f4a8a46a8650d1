//! Verify JVM method bodies the way a CLDC virtual machine does
//!
//! ### Simple example
//!
//! Consider the following simple Java method:
//!
//! ```java,ignore,no_run
//! public class Counter {
//!     public static int next(int x) {
//!         return x + 1;
//!     }
//! }
//! ```
//!
//! Its body compiles to `iload_0; iconst_1; iadd; ireturn`. Checking it can be done as follows:
//!
//! ```
//! use cldc_verifier::jvm::class_graph::*;
//! use cldc_verifier::jvm::verifier::*;
//! use cldc_verifier::jvm::*;
//!
//! # fn verify_method() -> Result<(), VerifierErrorKind> {
//! // Setup the class graph, add in CLDC library types
//! let class_graph_arenas = ClassGraphArenas::new();
//! let class_graph = ClassGraph::new(&class_graph_arenas);
//! class_graph.insert_cldc_library_types();
//!
//! // Describe the method being verified
//! let method = MethodData {
//!     class: BinaryName::from_string(String::from("me/alec/Counter")).unwrap(),
//!     name: UnqualifiedName::from_string(String::from("next")).unwrap(),
//!     descriptor: MethodDescriptor {
//!         parameters: vec![FieldType::int()],
//!         return_type: Some(FieldType::int()),
//!     },
//!     access_flags: MethodAccessFlags::PUBLIC | MethodAccessFlags::STATIC,
//!     max_stack: 2,
//!     max_locals: 1,
//! };
//!
//! // Straight-line code has no jump targets, so no stack maps are needed
//! let stackmaps = StackMapTable::empty();
//! let settings = VerifierSettings::default();
//! let mut frame = VerifierFrame::for_method(&method, &stackmaps, &settings)?;
//!
//! // iload_0
//! frame.get_local_checked(0, &VerificationType::Integer)?;
//! frame.push_category1(VerificationType::Integer)?;
//!
//! // iconst_1
//! frame.push_category1(VerificationType::Integer)?;
//!
//! // iadd
//! frame.pop_value(&VerificationType::Integer, &class_graph)?;
//! frame.pop_value(&VerificationType::Integer, &class_graph)?;
//! frame.push_category1(VerificationType::Integer)?;
//!
//! // ireturn
//! frame.verify_return(method.descriptor.return_type.as_ref(), &class_graph)?;
//! assert_eq!(frame.is_verification_failed(), None);
//! # Ok(())
//! # }
//! # verify_method().unwrap();
//! ```

mod access_flags;
pub mod class_graph;
mod descriptors;
mod errors;
mod names;
pub mod verifier;

pub use access_flags::*;
pub use descriptors::*;
pub use errors::*;
pub use names::*;
