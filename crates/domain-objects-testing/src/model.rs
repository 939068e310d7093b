//! A small task model with a nominal type hierarchy:
//!
//! ```text
//! Task
//! ├── Compile
//! │   └── JavaCompile
//! └── Test
//! ```

use domain_objects_core::{TypeTag, Typed};
use std::fmt;

pub static TASK: TypeTag = TypeTag::root("Task");
pub static COMPILE: TypeTag = TypeTag::extends("Compile", &TASK);
pub static JAVA_COMPILE: TypeTag = TypeTag::extends("JavaCompile", &COMPILE);
pub static TEST: TypeTag = TypeTag::extends("Test", &TASK);

#[derive(Clone, Debug, PartialEq)]
pub struct Task {
    pub name: String,
    pub kind: &'static TypeTag,
}

impl Task {
    pub fn new(name: impl Into<String>, kind: &'static TypeTag) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn compile(name: impl Into<String>) -> Self {
        Self::new(name, &COMPILE)
    }

    pub fn java_compile(name: impl Into<String>) -> Self {
        Self::new(name, &JAVA_COMPILE)
    }

    pub fn test(name: impl Into<String>) -> Self {
        Self::new(name, &TEST)
    }
}

impl Typed for Task {
    fn type_tag(&self) -> &'static TypeTag {
        self.kind
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
