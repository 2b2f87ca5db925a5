//! Field and type name mapping
//!
//! The translator never decides how a document member or type is named on
//! the wire; it asks a [`Mapping`]. [`TrivialMapping`] is a convenience
//! default that camel-cases names and pluralizes type names.

mod trivial;

pub use trivial::TrivialMapping;

use crate::query::Member;
use std::fmt::Debug;

/// Resolves document members and types to wire names
pub trait Mapping: Send + Sync + Debug {
    /// Wire field name of a document member
    fn get_field_name(&self, member: &Member) -> String;

    /// Collection name of a document type
    fn get_type_name(&self, type_name: &str) -> String;
}

impl<M: Mapping + ?Sized> Mapping for &M {
    fn get_field_name(&self, member: &Member) -> String {
        (**self).get_field_name(member)
    }

    fn get_type_name(&self, type_name: &str) -> String {
        (**self).get_type_name(type_name)
    }
}

impl<M: Mapping + ?Sized> Mapping for Box<M> {
    fn get_field_name(&self, member: &Member) -> String {
        (**self).get_field_name(member)
    }

    fn get_type_name(&self, type_name: &str) -> String {
        (**self).get_type_name(type_name)
    }
}
