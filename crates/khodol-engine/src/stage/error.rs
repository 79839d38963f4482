use thiserror::Error;

use super::io::{Interpolation, IoType};

/// Problem inside a single stage interface.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InterfaceError {
    #[error("location {location} is used by both `{first}` and `{second}`")]
    DuplicateLocation {
        location: u32,
        first: &'static str,
        second: &'static str,
    },

    #[error("slot name `{name}` is declared twice")]
    DuplicateName { name: &'static str },

    #[error("integer slot `{name}` ({ty}) must use flat interpolation")]
    IntegerNotFlat { name: &'static str, ty: IoType },
}

/// One disagreement between a vertex output and the fragment input that reads it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SlotMismatch {
    #[error("`{name}` (location {location}) is read but never written")]
    Missing { name: &'static str, location: u32 },

    #[error("`{name}` is written at location {written} but read at location {read}")]
    Location {
        name: &'static str,
        written: u32,
        read: u32,
    },

    #[error("`{name}` is written as {written} but read as {read}")]
    Type {
        name: &'static str,
        written: IoType,
        read: IoType,
    },

    #[error("`{name}` is written {written} but read {read}")]
    Interpolation {
        name: &'static str,
        written: Interpolation,
        read: Interpolation,
    },
}

/// Failure to assemble a pipeline from a vertex and a fragment stage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    #[error("interface `{stage}` is malformed: {}", join(.problems))]
    Interface {
        stage: &'static str,
        problems: Vec<InterfaceError>,
    },

    #[error("cannot link `{vertex}` to `{fragment}`: {}", join(.mismatches))]
    Mismatch {
        vertex: &'static str,
        fragment: &'static str,
        mismatches: Vec<SlotMismatch>,
    },
}

impl LinkError {
    /// Slot mismatches carried by this error (empty for interface errors).
    pub fn mismatches(&self) -> &[SlotMismatch] {
        match self {
            LinkError::Mismatch { mismatches, .. } => mismatches,
            LinkError::Interface { .. } => &[],
        }
    }
}

/// Image construction / texture table failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TextureError {
    #[error("image has zero size ({width}x{height})")]
    Empty { width: u32, height: u32 },

    #[error("{width}x{height} image needs {expected} elements, got {actual}")]
    SizeMismatch {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    #[error("texture table is full ({capacity} slots)")]
    TableFull { capacity: u32 },
}

/// A draw rejected before any invocation runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DrawError {
    #[error("instance {instance} uses texture id {id} but the bound table holds {len} textures")]
    TextureOutOfRange { instance: usize, id: u32, len: usize },

    #[error("index {index} at position {position} exceeds vertex count {vertex_count}")]
    IndexOutOfRange {
        position: usize,
        index: u32,
        vertex_count: usize,
    },

    #[error("index count {0} is not a multiple of 3")]
    IncompleteTriangle(usize),

    #[error("`{stage}` wrote {written} values but declares {expected} slots")]
    OutputCount {
        stage: &'static str,
        expected: usize,
        written: usize,
    },

    #[error("`{stage}` wrote {written} into `{slot}`, declared as {declared}")]
    OutputType {
        stage: &'static str,
        slot: &'static str,
        declared: IoType,
        written: IoType,
    },

    #[error("`{stage}` could not read its interpolated inputs")]
    UnreadableInputs { stage: &'static str },
}

fn join<T: std::fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
