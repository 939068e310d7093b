//! The deferred value contract consumed by collections.

use crate::error::ProviderError;
use crate::type_tag::TypeTag;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// A deferred, single-shot source of a collection element.
///
/// `declared_type` must be answerable without computing anything. `get` may
/// be expensive; implementations memoize a successful result so repeated
/// calls return it again. Collections call `get` at most once per provider
/// after it has succeeded.
pub trait Provider<T> {
    /// The type the produced value is known to have, if any.
    fn declared_type(&self) -> Option<&'static TypeTag> {
        None
    }

    fn get(&self) -> Result<T, ProviderError>;
}

/// Shared handle to a provider. Identity of the allocation is the identity of
/// the provider.
pub type ProviderRef<T> = Rc<dyn Provider<T>>;

/// Identity of a provider allocation.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub struct ProviderId(usize);

impl ProviderId {
    pub fn of<T>(provider: &ProviderRef<T>) -> Self {
        Self(Rc::as_ptr(provider) as *const () as usize)
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:x}", self.0)
    }
}

type Compute<T> = Box<dyn FnMut() -> Result<T, ProviderError>>;

/// Closure-backed [`Provider`] that memoizes its first successful value.
///
/// Failures are not memoized; a later `get` runs the closure again.
pub struct Deferred<T> {
    declared: Option<&'static TypeTag>,
    compute: RefCell<Compute<T>>,
    value: RefCell<Option<T>>,
    computations: Cell<usize>,
}

impl<T: Clone + 'static> Deferred<T> {
    pub fn new(compute: impl FnMut() -> Result<T, ProviderError> + 'static) -> Self {
        Self {
            declared: None,
            compute: RefCell::new(Box::new(compute)),
            value: RefCell::new(None),
            computations: Cell::new(0),
        }
    }

    /// A provider that declares the type of the value it will produce.
    pub fn typed(
        declared: &'static TypeTag,
        compute: impl FnMut() -> Result<T, ProviderError> + 'static,
    ) -> Self {
        let mut provider = Self::new(compute);
        provider.declared = Some(declared);
        provider
    }

    /// A provider for a value that is already known.
    pub fn of(value: T) -> Self {
        Self::new(move || Ok(value.clone()))
    }

    /// How many times the closure has run, failures included.
    pub fn computations(&self) -> usize {
        self.computations.get()
    }

    pub fn into_ref(self) -> ProviderRef<T> {
        Rc::new(self)
    }
}

impl<T: Clone + 'static> Provider<T> for Deferred<T> {
    fn declared_type(&self) -> Option<&'static TypeTag> {
        self.declared
    }

    fn get(&self) -> Result<T, ProviderError> {
        if let Some(value) = self.value.borrow().as_ref() {
            return Ok(value.clone());
        }
        let mut guard = self
            .compute
            .try_borrow_mut()
            .map_err(|_| ProviderError::new("provider re-entered while computing its value"))?;
        self.computations.set(self.computations.get() + 1);
        let compute = &mut **guard;
        let value = compute()?;
        drop(guard);
        self.value.replace(Some(value.clone()));
        Ok(value)
    }
}

impl<T> fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferred")
            .field("declared", &self.declared.map(TypeTag::name))
            .field("computations", &self.computations.get())
            .finish()
    }
}
