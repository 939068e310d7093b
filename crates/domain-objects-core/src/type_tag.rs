//! Nominal type descriptors used by type-filtered views.
//!
//! Rust values carry no runtime subtype relation, so elements describe
//! themselves with a `'static` [`TypeTag`] that may name a supertype. Providers
//! declare the tag of the value they will produce, which lets a view rule a
//! pending entry out without materializing it.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

/// A named node in a single-inheritance type hierarchy.
///
/// Tags are compared by identity, not by name, so each type must be declared
/// once as a `static` (a `const` would be a fresh value at every use):
///
/// ```
/// use domain_objects_core::TypeTag;
///
/// static TASK: TypeTag = TypeTag::root("Task");
/// static COMPILE: TypeTag = TypeTag::extends("Compile", &TASK);
///
/// assert!(COMPILE.is_subtype_of(&TASK));
/// assert!(!TASK.is_subtype_of(&COMPILE));
/// ```
#[derive(Debug)]
pub struct TypeTag {
    name: &'static str,
    parent: Option<&'static TypeTag>,
}

impl TypeTag {
    /// A tag with no supertype.
    pub const fn root(name: &'static str) -> Self {
        Self { name, parent: None }
    }

    /// A tag whose direct supertype is `parent`.
    pub const fn extends(name: &'static str, parent: &'static TypeTag) -> Self {
        Self {
            name,
            parent: Some(parent),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn supertype(&self) -> Option<&'static TypeTag> {
        self.parent
    }

    /// Returns true when `self` is `other` or one of its descendants.
    pub fn is_subtype_of(&self, other: &TypeTag) -> bool {
        let mut current = Some(self);
        while let Some(tag) = current {
            if tag == other {
                return true;
            }
            current = tag.parent;
        }
        false
    }

    /// Returns true when a value declared as `self` may turn out to be an
    /// instance of `other` once produced.
    ///
    /// A declared supertype stays compatible with a narrower target because
    /// the runtime value can still be the narrower type.
    pub fn is_compatible_with(&self, other: &TypeTag) -> bool {
        self.is_subtype_of(other) || other.is_subtype_of(self)
    }
}

impl PartialEq for TypeTag {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other)
    }
}

impl Eq for TypeTag {}

impl Hash for TypeTag {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(self, state);
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Elements that report their runtime type, enabling `with_type` views.
pub trait Typed {
    fn type_tag(&self) -> &'static TypeTag;
}

impl<T: Typed + ?Sized> Typed for Rc<T> {
    fn type_tag(&self) -> &'static TypeTag {
        (**self).type_tag()
    }
}

impl<T: Typed + ?Sized> Typed for Box<T> {
    fn type_tag(&self) -> &'static TypeTag {
        (**self).type_tag()
    }
}
