//! Marker types.

/// Marker type describing an entity creation.
#[derive(Clone, Copy, Debug)]
pub struct Creation;

/// Marker type describing an entity modification.
#[derive(Clone, Copy, Debug)]
pub struct Modification;

/// Marker type describing the beginning of a time window.
#[derive(Clone, Copy, Debug)]
pub struct Start;

/// Marker type describing the end of a time window.
#[derive(Clone, Copy, Debug)]
pub struct End;
