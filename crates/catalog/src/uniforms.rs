//! Names of the uniforms every effect body may reference.
//!
//! Effect sources are written against these identifiers; the renderer and the
//! exporter each declare them in their own shader dialect before the body.

/// Number of palette colors, one per `u_colorN` uniform.
pub const PALETTE_SIZE: usize = 5;

pub const RESOLUTION: &str = "u_resolution";
pub const TIME: &str = "u_time";
pub const ZOOM: &str = "u_zoom";
pub const COMPLEXITY: &str = "u_complexity";
pub const SPEED: &str = "u_speed";
pub const DISTORTION: &str = "u_distortion";

pub const PALETTE: [&str; PALETTE_SIZE] = ["u_color1", "u_color2", "u_color3", "u_color4", "u_color5"];

/// Every uniform name owned by the shared interface, in declaration order.
pub const BUILTIN: [&str; 11] = [
    RESOLUTION,
    TIME,
    ZOOM,
    COMPLEXITY,
    SPEED,
    DISTORTION,
    PALETTE[0],
    PALETTE[1],
    PALETTE[2],
    PALETTE[3],
    PALETTE[4],
];

pub fn is_builtin(name: &str) -> bool {
    BUILTIN.contains(&name)
}
