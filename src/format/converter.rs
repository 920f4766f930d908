// SPDX-License-Identifier: MIT
//! Converter registry between format types.
//!
//! Converters are looked up by source and destination type, or by the name
//! they were registered under. Failures distinguish a missing converter, a
//! value of the wrong type and a converter that could not be constructed.

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::error::{ConversionError, Result, StreamError};

/// Conversion from `Src` into `Dst`
pub trait Converter<Src, Dst>: Send + Sync {
    fn convert(&self, source: Src) -> Result<Dst>;
}

impl<Src, Dst, F> Converter<Src, Dst> for F
where
    F: Fn(Src) -> Result<Dst> + Send + Sync,
{
    fn convert(&self, source: Src) -> Result<Dst> {
        self(source)
    }
}

/// Runtime name and identity of a type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeDescriptor {
    pub id: TypeId,
    pub name: &'static str,
}

impl TypeDescriptor {
    pub fn of<T: 'static + ?Sized>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }
}

type AnyValue = Box<dyn Any + Send>;

trait ErasedConverter: Send + Sync {
    fn convert_any(&self, name: &'static str, source: AnyValue) -> Result<AnyValue>;
}

struct Typed<C, Src, Dst> {
    converter: C,
    _types: PhantomData<fn(Src) -> Dst>,
}

impl<C, Src, Dst> ErasedConverter for Typed<C, Src, Dst>
where
    C: Converter<Src, Dst>,
    Src: Send + 'static,
    Dst: Send + 'static,
{
    fn convert_any(&self, name: &'static str, source: AnyValue) -> Result<AnyValue> {
        let source = source
            .downcast::<Src>()
            .map_err(|_| ConversionError::TypeMismatch {
                converter: name,
                expected: type_name::<Src>(),
                actual: "a value of another type",
            })?;

        let value = self
            .converter
            .convert(*source)
            .map_err(|e| wrap_failure(name, e))?;
        Ok(Box::new(value))
    }
}

type Factory = dyn Fn() -> std::result::Result<Arc<dyn ErasedConverter>, String> + Send + Sync;

struct Registration {
    name: &'static str,
    source: TypeDescriptor,
    destination: TypeDescriptor,
    factory: Box<Factory>,
}

impl Registration {
    fn instantiate(&self) -> Result<Arc<dyn ErasedConverter>> {
        (self.factory)().map_err(|message| {
            ConversionError::Construction {
                converter: self.name,
                message,
            }
            .into()
        })
    }
}

fn wrap_failure(name: &'static str, err: StreamError) -> StreamError {
    match err {
        StreamError::Conversion(_) => err,
        other => ConversionError::Failed {
            converter: name,
            source: Box::new(other),
        }
        .into(),
    }
}

/// Set of converters available to [`BinaryFormat`](crate::format::BinaryFormat)
/// and [`DataStream::read_format`](crate::stream::DataStream::read_format)
#[derive(Default)]
pub struct ConverterRegistry {
    by_types: HashMap<(TypeId, TypeId), usize>,
    by_name: HashMap<&'static str, usize>,
    registrations: Vec<Registration>,
}

impl ConverterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `registration`, replacing any entry with the same name or the
    /// same source and destination types
    fn add(&mut self, registration: Registration) {
        let key = (registration.source.id, registration.destination.id);
        let before = self.registrations.len();
        self.registrations.retain(|existing| {
            existing.name != registration.name
                && (existing.source.id, existing.destination.id) != key
        });
        if self.registrations.len() != before {
            debug!(
                converter = registration.name,
                replaced = before - self.registrations.len(),
                "Replacing converter registration"
            );
        }

        self.registrations.push(registration);
        self.reindex();
    }

    fn reindex(&mut self) {
        self.by_types.clear();
        self.by_name.clear();
        for (index, registration) in self.registrations.iter().enumerate() {
            self.by_types.insert(
                (registration.source.id, registration.destination.id),
                index,
            );
            self.by_name.insert(registration.name, index);
        }
    }

    /// Register a converter instance under `name`
    pub fn register<Src, Dst, C>(&mut self, name: &'static str, converter: C)
    where
        C: Converter<Src, Dst> + 'static,
        Src: Send + 'static,
        Dst: Send + 'static,
    {
        let shared: Arc<dyn ErasedConverter> = Arc::new(Typed {
            converter,
            _types: PhantomData::<fn(Src) -> Dst>,
        });
        self.add(Registration {
            name,
            source: TypeDescriptor::of::<Src>(),
            destination: TypeDescriptor::of::<Dst>(),
            factory: Box::new(move || Ok::<_, String>(Arc::clone(&shared))),
        });
    }

    /// Register a converter built by `factory` for each conversion
    pub fn register_factory<Src, Dst, C, F>(&mut self, name: &'static str, factory: F)
    where
        C: Converter<Src, Dst> + 'static,
        F: Fn() -> std::result::Result<C, String> + Send + Sync + 'static,
        Src: Send + 'static,
        Dst: Send + 'static,
    {
        self.add(Registration {
            name,
            source: TypeDescriptor::of::<Src>(),
            destination: TypeDescriptor::of::<Dst>(),
            factory: Box::new(move || -> std::result::Result<Arc<dyn ErasedConverter>, String> {
                let converter = factory()?;
                let erased: Arc<dyn ErasedConverter> = Arc::new(Typed {
                    converter,
                    _types: PhantomData::<fn(Src) -> Dst>,
                });
                Ok(erased)
            }),
        });
    }

    /// Whether a converter from `Src` to `Dst` is registered
    pub fn contains<Src: 'static, Dst: 'static>(&self) -> bool {
        self.by_types
            .contains_key(&(TypeId::of::<Src>(), TypeId::of::<Dst>()))
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Convert with the converter registered for `Src` to `Dst`
    pub fn convert<Src, Dst>(&self, source: Src) -> Result<Dst>
    where
        Src: Send + 'static,
        Dst: Send + 'static,
    {
        let value = self.convert_dynamic(
            Box::new(source),
            TypeDescriptor::of::<Src>(),
            TypeDescriptor::of::<Dst>(),
        )?;
        downcast_result::<Dst>("registry", value)
    }

    /// Convert with the converter registered under `name`
    pub fn convert_with<Src, Dst>(&self, name: &str, source: Src) -> Result<Dst>
    where
        Src: Send + 'static,
        Dst: Send + 'static,
    {
        let registration = self
            .by_name
            .get(name)
            .map(|&index| &self.registrations[index])
            .ok_or(ConversionError::NoImplementation {
                source_type: type_name::<Src>(),
                destination_type: type_name::<Dst>(),
            })?;

        if registration.source.id != TypeId::of::<Src>() {
            return Err(ConversionError::TypeMismatch {
                converter: registration.name,
                expected: registration.source.name,
                actual: type_name::<Src>(),
            }
            .into());
        }
        if registration.destination.id != TypeId::of::<Dst>() {
            return Err(ConversionError::TypeMismatch {
                converter: registration.name,
                expected: registration.destination.name,
                actual: type_name::<Dst>(),
            }
            .into());
        }

        trace!(converter = registration.name, "Converting by name");
        let converter = registration.instantiate()?;
        let value = converter.convert_any(registration.name, Box::new(source))?;
        downcast_result::<Dst>(registration.name, value)
    }

    /// Convert a type-erased value.
    ///
    /// `source_type` names the type inside `source`; a value of any other
    /// type fails with [`ConversionError::TypeMismatch`].
    pub fn convert_dynamic(
        &self,
        source: Box<dyn Any + Send>,
        source_type: TypeDescriptor,
        destination_type: TypeDescriptor,
    ) -> Result<Box<dyn Any + Send>> {
        let registration = self
            .by_types
            .get(&(source_type.id, destination_type.id))
            .map(|&index| &self.registrations[index])
            .ok_or(ConversionError::NoImplementation {
                source_type: source_type.name,
                destination_type: destination_type.name,
            })?;

        trace!(
            converter = registration.name,
            from = source_type.name,
            to = destination_type.name,
            "Converting"
        );
        let converter = registration.instantiate()?;
        converter.convert_any(registration.name, source)
    }
}

fn downcast_result<Dst: 'static>(converter: &'static str, value: AnyValue) -> Result<Dst> {
    value
        .downcast::<Dst>()
        .map(|value| *value)
        .map_err(|_| {
            ConversionError::TypeMismatch {
                converter,
                expected: type_name::<Dst>(),
                actual: "a value of another type",
            }
            .into()
        })
}

impl std::fmt::Debug for ConverterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.registrations.iter().map(|r| {
                format!("{}: {} -> {}", r.name, r.source.name, r.destination.name)
            }))
            .finish()
    }
}
