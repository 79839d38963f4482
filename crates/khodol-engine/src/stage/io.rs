//! Named, typed stage interconnect.
//!
//! A vertex stage writes an ordered set of outputs and its paired fragment
//! stage reads an ordered set of inputs. Both sides are described by a
//! [`StageInterface`]; [`link`] matches them by name and rejects any slot whose
//! location, type or interpolation mode disagrees. The WGSL IO structs are
//! generated from the same descriptors so shader locations are never numbered
//! by hand.

use std::fmt;
use std::fmt::Write as _;

use glam::{Vec2, Vec3, Vec4};

use super::error::{DrawError, InterfaceError, LinkError, SlotMismatch};

// ── types ─────────────────────────────────────────────────────────────────

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum IoType {
    F32,
    Vec2,
    Vec3,
    Vec4,
    U32,
}

impl IoType {
    pub const fn wgsl(self) -> &'static str {
        match self {
            IoType::F32 => "f32",
            IoType::Vec2 => "vec2<f32>",
            IoType::Vec3 => "vec3<f32>",
            IoType::Vec4 => "vec4<f32>",
            IoType::U32 => "u32",
        }
    }

    /// Integer slots cannot be interpolated.
    pub const fn is_integer(self) -> bool {
        matches!(self, IoType::U32)
    }
}

impl fmt::Display for IoType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wgsl())
    }
}

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum Interpolation {
    /// Perspective-correct interpolation across the primitive.
    #[default]
    Perspective,
    /// Value of the provoking vertex, uninterpolated.
    Flat,
}

impl Interpolation {
    /// Attribute prefix for a WGSL struct member.
    const fn wgsl_attribute(self) -> &'static str {
        match self {
            Interpolation::Perspective => "",
            Interpolation::Flat => "@interpolate(flat) ",
        }
    }
}

impl fmt::Display for Interpolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Interpolation::Perspective => "perspective-interpolated",
            Interpolation::Flat => "flat",
        })
    }
}

/// One user-defined value passed from the vertex to the fragment stage.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct IoSlot {
    pub location: u32,
    pub name: &'static str,
    pub ty: IoType,
    pub interpolation: Interpolation,
}

impl IoSlot {
    pub const fn perspective(location: u32, name: &'static str, ty: IoType) -> Self {
        Self { location, name, ty, interpolation: Interpolation::Perspective }
    }

    pub const fn flat(location: u32, name: &'static str, ty: IoType) -> Self {
        Self { location, name, ty, interpolation: Interpolation::Flat }
    }
}

/// Ordered slot list of one side of an interconnect.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct StageInterface {
    pub name: &'static str,
    pub slots: &'static [IoSlot],
}

impl StageInterface {
    pub const fn new(name: &'static str, slots: &'static [IoSlot]) -> Self {
        Self { name, slots }
    }

    pub fn slot(&self, name: &str) -> Option<&IoSlot> {
        self.slots.iter().find(|s| s.name == name)
    }

    /// Every structural problem in declaration order.
    pub fn problems(&self) -> Vec<InterfaceError> {
        let mut problems = Vec::new();
        for (i, slot) in self.slots.iter().enumerate() {
            let earlier = &self.slots[..i];

            if let Some(first) = earlier.iter().find(|s| s.location == slot.location) {
                problems.push(InterfaceError::DuplicateLocation {
                    location: slot.location,
                    first: first.name,
                    second: slot.name,
                });
            }
            if earlier.iter().any(|s| s.name == slot.name) {
                problems.push(InterfaceError::DuplicateName { name: slot.name });
            }
            if slot.ty.is_integer() && slot.interpolation != Interpolation::Flat {
                problems.push(InterfaceError::IntegerNotFlat { name: slot.name, ty: slot.ty });
            }
        }
        problems
    }

    /// Checks values written by [`Varyings::write_slots`] against the slot list.
    pub fn check_values(&self, values: &[IoValue]) -> Result<(), DrawError> {
        if values.len() != self.slots.len() {
            return Err(DrawError::OutputCount {
                stage: self.name,
                expected: self.slots.len(),
                written: values.len(),
            });
        }
        match self.slots.iter().zip(values).find(|(slot, value)| slot.ty != value.ty()) {
            Some((slot, value)) => Err(DrawError::OutputType {
                stage: self.name,
                slot: slot.name,
                declared: slot.ty,
                written: value.ty(),
            }),
            None => Ok(()),
        }
    }

    pub fn check(&self) -> Result<(), LinkError> {
        let problems = self.problems();
        if problems.is_empty() {
            Ok(())
        } else {
            Err(LinkError::Interface { stage: self.name, problems })
        }
    }

    /// WGSL struct declaration for this interface.
    ///
    /// With `with_position` the struct gets a leading
    /// `@builtin(position) clip_position: vec4<f32>` member, which is what a
    /// vertex entry point returns.
    pub fn wgsl_struct(&self, struct_name: &str, with_position: bool) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "struct {struct_name} {{");
        if with_position {
            out.push_str("    @builtin(position) clip_position: vec4<f32>,\n");
        }
        for slot in self.slots {
            let _ = writeln!(
                out,
                "    @location({}) {}{}: {},",
                slot.location,
                slot.interpolation.wgsl_attribute(),
                slot.name,
                slot.ty.wgsl(),
            );
        }
        out.push_str("}\n");
        out
    }
}

// ── values ────────────────────────────────────────────────────────────────

/// A slot value produced by one vertex invocation.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum IoValue {
    F32(f32),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    U32(u32),
}

impl IoValue {
    pub const fn ty(&self) -> IoType {
        match self {
            IoValue::F32(_) => IoType::F32,
            IoValue::Vec2(_) => IoType::Vec2,
            IoValue::Vec3(_) => IoType::Vec3,
            IoValue::Vec4(_) => IoType::Vec4,
            IoValue::U32(_) => IoType::U32,
        }
    }

    /// Weighted sum of three corner values.
    ///
    /// Integers and mixed variants resolve to the first corner.
    fn weighted(a: IoValue, b: IoValue, c: IoValue, w: [f32; 3]) -> IoValue {
        match (a, b, c) {
            (IoValue::F32(a), IoValue::F32(b), IoValue::F32(c)) => {
                IoValue::F32(a * w[0] + b * w[1] + c * w[2])
            }
            (IoValue::Vec2(a), IoValue::Vec2(b), IoValue::Vec2(c)) => {
                IoValue::Vec2(a * w[0] + b * w[1] + c * w[2])
            }
            (IoValue::Vec3(a), IoValue::Vec3(b), IoValue::Vec3(c)) => {
                IoValue::Vec3(a * w[0] + b * w[1] + c * w[2])
            }
            (IoValue::Vec4(a), IoValue::Vec4(b), IoValue::Vec4(c)) => {
                IoValue::Vec4(a * w[0] + b * w[1] + c * w[2])
            }
            _ => a,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match *self {
            IoValue::F32(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_vec2(&self) -> Option<Vec2> {
        match *self {
            IoValue::Vec2(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_vec3(&self) -> Option<Vec3> {
        match *self {
            IoValue::Vec3(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_vec4(&self) -> Option<Vec4> {
        match *self {
            IoValue::Vec4(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        match *self {
            IoValue::U32(v) => Some(v),
            _ => None,
        }
    }
}

/// A Rust struct that mirrors a [`StageInterface`].
///
/// `write_slots` appends one value per slot of `INTERFACE`, in slot order.
/// `read_slots` receives values in the same order and returns `None` when a
/// value has the wrong type or is missing.
pub trait Varyings: Sized {
    const INTERFACE: StageInterface;

    fn write_slots(&self, out: &mut Vec<IoValue>);

    fn read_slots(slots: &[IoValue]) -> Option<Self>;
}

// ── linking ───────────────────────────────────────────────────────────────

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
struct Route {
    source: usize,
    interpolation: Interpolation,
}

/// Result of a successful [`link`]: for each fragment input, which vertex
/// output feeds it and how.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Linkage {
    vertex: &'static str,
    fragment: &'static str,
    routes: Vec<Route>,
}

impl Linkage {
    pub fn vertex_stage(&self) -> &'static str {
        self.vertex
    }

    pub fn fragment_stage(&self) -> &'static str {
        self.fragment
    }

    /// Number of fragment inputs.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Index of the vertex output feeding fragment input `input`.
    pub fn source_of(&self, input: usize) -> Option<usize> {
        self.routes.get(input).map(|r| r.source)
    }

    /// Builds fragment inputs from three vertex outputs.
    ///
    /// `corners[0]` is the provoking vertex. `weights` are perspective-correct
    /// barycentrics summing to one.
    pub fn interpolate(&self, corners: [&[IoValue]; 3], weights: [f32; 3], out: &mut Vec<IoValue>) {
        out.clear();
        for route in &self.routes {
            let [a, b, c] = corners.map(|values| values.get(route.source).copied());
            let Some(a) = a else {
                continue;
            };
            let value = match (route.interpolation, b, c) {
                (Interpolation::Perspective, Some(b), Some(c)) => IoValue::weighted(a, b, c, weights),
                _ => a,
            };
            out.push(value);
        }
    }
}

/// Matches fragment inputs to vertex outputs by name.
///
/// Unconsumed vertex outputs are allowed. Every mismatch is collected before
/// failing.
pub fn link(vertex: &StageInterface, fragment: &StageInterface) -> Result<Linkage, LinkError> {
    vertex.check()?;
    fragment.check()?;

    let mut mismatches = Vec::new();
    let mut routes = Vec::with_capacity(fragment.slots.len());

    for input in fragment.slots {
        let Some(source) = vertex.slots.iter().position(|s| s.name == input.name) else {
            mismatches.push(SlotMismatch::Missing { name: input.name, location: input.location });
            continue;
        };
        let output = &vertex.slots[source];

        if output.location != input.location {
            mismatches.push(SlotMismatch::Location {
                name: input.name,
                written: output.location,
                read: input.location,
            });
        }
        if output.ty != input.ty {
            mismatches.push(SlotMismatch::Type { name: input.name, written: output.ty, read: input.ty });
        }
        if output.interpolation != input.interpolation {
            mismatches.push(SlotMismatch::Interpolation {
                name: input.name,
                written: output.interpolation,
                read: input.interpolation,
            });
        }

        routes.push(Route { source, interpolation: input.interpolation });
    }

    if !mismatches.is_empty() {
        return Err(LinkError::Mismatch {
            vertex: vertex.name,
            fragment: fragment.name,
            mismatches,
        });
    }

    Ok(Linkage { vertex: vertex.name, fragment: fragment.name, routes })
}

#[cfg(test)]
mod tests {
    use super::*;

    const OUT: StageInterface = StageInterface::new(
        "test vertex",
        &[
            IoSlot::perspective(0, "uv", IoType::Vec2),
            IoSlot::perspective(1, "normal", IoType::Vec3),
            IoSlot::flat(2, "texture_id", IoType::U32),
        ],
    );

    #[test]
    fn identical_interfaces_link() {
        let linkage = link(&OUT, &OUT).unwrap();
        assert_eq!(linkage.len(), 3);
        assert_eq!(linkage.source_of(2), Some(2));
    }

    #[test]
    fn unread_outputs_are_allowed() {
        const IN: StageInterface =
            StageInterface::new("uv only", &[IoSlot::perspective(0, "uv", IoType::Vec2)]);
        let linkage = link(&OUT, &IN).unwrap();
        assert_eq!(linkage.len(), 1);
    }

    #[test]
    fn inputs_match_by_name_not_order() {
        const IN: StageInterface = StageInterface::new(
            "reordered",
            &[
                IoSlot::flat(2, "texture_id", IoType::U32),
                IoSlot::perspective(0, "uv", IoType::Vec2),
            ],
        );
        let linkage = link(&OUT, &IN).unwrap();
        assert_eq!(linkage.source_of(0), Some(2));
        assert_eq!(linkage.source_of(1), Some(0));
    }

    #[test]
    fn missing_slot_is_reported() {
        const IN: StageInterface =
            StageInterface::new("wants color", &[IoSlot::perspective(3, "color", IoType::Vec4)]);
        let err = link(&OUT, &IN).unwrap_err();
        assert_eq!(err.mismatches(), &[SlotMismatch::Missing { name: "color", location: 3 }]);
    }

    #[test]
    fn every_mismatch_is_collected() {
        const IN: StageInterface = StageInterface::new(
            "bad reader",
            &[
                IoSlot::perspective(0, "uv", IoType::Vec3),
                IoSlot::perspective(4, "normal", IoType::Vec3),
                IoSlot::flat(1, "texture_id", IoType::U32),
            ],
        );
        let err = link(&OUT, &IN).unwrap_err();
        assert_eq!(
            err.mismatches(),
            &[
                SlotMismatch::Type { name: "uv", written: IoType::Vec2, read: IoType::Vec3 },
                SlotMismatch::Location { name: "normal", written: 1, read: 4 },
                SlotMismatch::Location { name: "texture_id", written: 2, read: 1 },
            ]
        );
        let msg = err.to_string();
        assert!(msg.contains("bad reader"), "{msg}");
        assert!(msg.contains("vec3<f32>"), "{msg}");
    }

    #[test]
    fn interpolation_mode_must_agree() {
        const OUT_F: StageInterface =
            StageInterface::new("flat color", &[IoSlot::flat(0, "color", IoType::Vec4)]);
        const IN_P: StageInterface =
            StageInterface::new("smooth color", &[IoSlot::perspective(0, "color", IoType::Vec4)]);
        let err = link(&OUT_F, &IN_P).unwrap_err();
        assert_eq!(
            err.mismatches(),
            &[SlotMismatch::Interpolation {
                name: "color",
                written: Interpolation::Flat,
                read: Interpolation::Perspective,
            }]
        );
    }

    #[test]
    fn integer_slot_must_be_flat() {
        const BAD: StageInterface =
            StageInterface::new("smooth id", &[IoSlot::perspective(0, "texture_id", IoType::U32)]);
        assert_eq!(
            BAD.check(),
            Err(LinkError::Interface {
                stage: "smooth id",
                problems: vec![InterfaceError::IntegerNotFlat { name: "texture_id", ty: IoType::U32 }],
            })
        );
        assert!(link(&BAD, &BAD).is_err());
    }

    #[test]
    fn duplicate_location_and_name_are_reported() {
        const BAD: StageInterface = StageInterface::new(
            "crowded",
            &[
                IoSlot::perspective(0, "uv", IoType::Vec2),
                IoSlot::perspective(0, "normal", IoType::Vec3),
                IoSlot::perspective(1, "uv", IoType::Vec2),
            ],
        );
        assert_eq!(
            BAD.problems(),
            vec![
                InterfaceError::DuplicateLocation { location: 0, first: "uv", second: "normal" },
                InterfaceError::DuplicateName { name: "uv" },
            ]
        );
    }

    #[test]
    fn wgsl_struct_carries_locations_and_flat() {
        let src = OUT.wgsl_struct("VsOut", true);
        assert_eq!(
            src,
            "struct VsOut {\n\
             \x20   @builtin(position) clip_position: vec4<f32>,\n\
             \x20   @location(0) uv: vec2<f32>,\n\
             \x20   @location(1) normal: vec3<f32>,\n\
             \x20   @location(2) @interpolate(flat) texture_id: u32,\n\
             }\n"
        );
        assert!(!OUT.wgsl_struct("FsIn", false).contains("builtin"));
    }

    #[test]
    fn flat_routes_take_provoking_vertex() {
        let linkage = link(&OUT, &OUT).unwrap();
        let a = [IoValue::Vec2(Vec2::ZERO), IoValue::Vec3(Vec3::X), IoValue::U32(4)];
        let b = [IoValue::Vec2(Vec2::ONE), IoValue::Vec3(Vec3::Y), IoValue::U32(5)];
        let c = [IoValue::Vec2(Vec2::ONE), IoValue::Vec3(Vec3::Z), IoValue::U32(6)];
        let mut out = Vec::new();
        linkage.interpolate([&a, &b, &c], [0.0, 0.5, 0.5], &mut out);
        assert_eq!(out[0], IoValue::Vec2(Vec2::ONE));
        assert_eq!(out[1], IoValue::Vec3(Vec3::new(0.0, 0.5, 0.5)));
        assert_eq!(out[2], IoValue::U32(4));
    }

    #[test]
    fn written_values_are_checked_against_slots() {
        let good = [IoValue::Vec2(Vec2::ZERO), IoValue::Vec3(Vec3::X), IoValue::U32(1)];
        assert_eq!(OUT.check_values(&good), Ok(()));
        assert_eq!(
            OUT.check_values(&good[..2]),
            Err(DrawError::OutputCount { stage: "test vertex", expected: 3, written: 2 })
        );
        let swapped = [IoValue::Vec2(Vec2::ZERO), IoValue::Vec3(Vec3::X), IoValue::F32(1.0)];
        assert_eq!(
            OUT.check_values(&swapped),
            Err(DrawError::OutputType {
                stage: "test vertex",
                slot: "texture_id",
                declared: IoType::U32,
                written: IoType::F32,
            })
        );
    }
}
