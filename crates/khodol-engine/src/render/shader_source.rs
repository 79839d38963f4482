//! WGSL source composition.
//!
//! Every pipeline's source is `common.wgsl` + the IO structs generated from
//! its stage interfaces + the hand-written body. The interfaces are linked
//! first, so a mismatched pair never reaches shader compilation.

use crate::stage::{
    AMBIENT_FLOOR, FlatColorVaryings, FlatTexturedVaryings, LIGHT_DIRECTION, LinkError, MeshVaryings, Varyings,
    link,
};

const COMMON: &str = include_str!("shaders/common.wgsl");
const INSTANCED: &str = include_str!("shaders/instanced.wgsl");
const FLAT_COLOR: &str = include_str!("shaders/flat_color.wgsl");
const FLAT_TEXTURED: &str = include_str!("shaders/flat_textured.wgsl");

/// Instanced mesh pipeline (`vs_main`, `fs_lit`, `fs_unlit`).
pub fn instanced() -> Result<String, LinkError> {
    let mut body = lighting_constants();
    body.push_str(INSTANCED);
    compose::<MeshVaryings, MeshVaryings>(&body)
}

/// Flat vertex-color pipeline (`vs_main`, `fs_main`).
pub fn flat_color() -> Result<String, LinkError> {
    compose::<FlatColorVaryings, FlatColorVaryings>(FLAT_COLOR)
}

/// Flat single-texture pipeline (`vs_main`, `fs_main`).
pub fn flat_textured() -> Result<String, LinkError> {
    compose::<FlatTexturedVaryings, FlatTexturedVaryings>(FLAT_TEXTURED)
}

fn compose<O: Varyings, I: Varyings>(body: &str) -> Result<String, LinkError> {
    link(&O::INTERFACE, &I::INTERFACE)?;

    let mut src = String::with_capacity(COMMON.len() + body.len() + 512);
    src.push_str(COMMON);
    src.push('\n');
    src.push_str(&O::INTERFACE.wgsl_struct("VertexOutput", true));
    src.push('\n');
    src.push_str(&I::INTERFACE.wgsl_struct("FragmentInput", false));
    src.push('\n');
    src.push_str(body);
    Ok(src)
}

fn lighting_constants() -> String {
    let l = LIGHT_DIRECTION;
    format!(
        "const LIGHT_DIRECTION: vec3<f32> = vec3<f32>({:?}, {:?}, {:?});\n\
         const AMBIENT_FLOOR: f32 = {:?};\n\n",
        l.x, l.y, l.z, AMBIENT_FLOOR
    )
}
