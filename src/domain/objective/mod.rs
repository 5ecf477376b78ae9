//! Objective hierarchy and value domains.
//!
//! The hierarchy is a tree of [`Objective`] nodes: abstract objectives group
//! children, primitive objectives are the leaves that alternatives are measured
//! on. Each primitive owns a [`Domain`].

mod domain;
#[allow(clippy::module_inception)]
mod objective;

pub use domain::{
    CategoricalDomain, ContinuousDomain, Domain, DomainKind, DomainValue, IntervalDomain,
};
pub use objective::{AbstractObjective, Objective, PrimitiveObjective};
