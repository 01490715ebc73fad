//! Opaque element, context, and callback shapes. The engine never
//! inspects an element's concrete type; it only moves `Arc` handles
//! around, so an element is transferred by reference between partitions,
//! never copied.

use std::any::Any;
use std::sync::Arc;

/// An opaque value produced, consumed, or passed through by user
/// callbacks. Cloning an `Element` clones the `Arc`, never the payload.
pub type Element = Arc<dyn Any + Send + Sync>;

/// Opaque context passed to filter/join/partition-by callbacks.
pub type Context = Arc<dyn Any + Send + Sync>;

/// An already-opened input stream bound to one source partition. Mutable
/// state (e.g. a cursor into a file) lives behind the lock so the mapper
/// closure can be invoked repeatedly.
pub type SourceHandle = Arc<parking_lot::Mutex<dyn Any + Send>>;

/// Input to a mapper: either the single source handle for a partition
/// built directly over a `SOURCE` dependency, or one element for every
/// other dependency kind. A tagged variant in place of the original's
/// untagged `(E_or_handle)` callback argument.
pub enum MapInput {
    Source(SourceHandle),
    Element(Element),
}

pub type MapperFn = Arc<dyn Fn(MapInput) -> Option<Element> + Send + Sync>;
pub type FilterFn = Arc<dyn Fn(&Element, &Context) -> bool + Send + Sync>;
pub type JoinerFn = Arc<dyn Fn(&Element, &Element, &Context) -> Option<Element> + Send + Sync>;
pub type PartitionerFn = Arc<dyn Fn(&Element, usize, &Context) -> i64 + Send + Sync>;
pub type PrinterFn = Arc<dyn Fn(&Element) + Send + Sync>;

/// Convenience constructor: wrap a plain value as an [`Element`].
pub fn element<T: Any + Send + Sync>(value: T) -> Element {
    Arc::new(value)
}

/// Convenience constructor: wrap a plain value as a [`Context`].
pub fn context<T: Any + Send + Sync>(value: T) -> Context {
    Arc::new(value)
}

/// Downcast a reference to an [`Element`]'s concrete type. Returns `None`
/// if the element isn't of type `T` — never panics.
pub fn downcast_ref<T: Any>(e: &Element) -> Option<&T> {
    e.downcast_ref::<T>()
}
