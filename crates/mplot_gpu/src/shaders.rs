//! WGSL shaders for instanced plot primitives
//!
//! These shaders render:
//! - Rectangles (filled, stroked, rounded) and point markers via distance functions
//! - Anti-aliased, optionally dashed line segments
//! - Flat lit/unlit triangles
//! - Textured quads for text and images

/// Instanced primitive shader
///
/// Every instance expands to six vertices. Rectangles, markers and lines
/// become a screen-aligned (or line-aligned) quad with one pixel of margin
/// for anti-aliasing; triangles use vertices 0..3 and collapse the rest.
/// Slot usage matches [`crate::instance`].
pub const PRIMITIVE_SHADER: &str = r#"
// ============================================================================
// mplot Primitive Shader
// ============================================================================

struct Uniforms {
    view_proj: mat4x4<f32>,
    screen_size: vec2<f32>,
    _padding: vec2<f32>,
    camera_pos: vec4<f32>,
}

@group(0) @binding(0) var<uniform> uniforms: Uniforms;

// Primitive tags
const TAG_RECT: u32 = 0u;
const TAG_CIRCLE: u32 = 1u;
const TAG_LINE: u32 = 2u;
const TAG_TRI_LIT: u32 = 30u;
const TAG_TRI_UNLIT: u32 = 31u;

// Marker shapes are matched by code in marker_distance:
// 0 circle, 1 square, 2 diamond, 3 plus, 4 cross, 5/6 triangle up/down, 7 star, 8 point
const SHAPE_TRIANGLE_DOWN: u32 = 6u;

const LIGHT_DIR: vec3<f32> = vec3<f32>(0.26726124, 0.5345225, 0.8017837);
const AMBIENT: f32 = 0.3;
const INV_SQRT_2: f32 = 0.70710678;
const AA_MARGIN: f32 = 1.0;

struct InstanceInput {
    @location(0) pos_a_radius: vec4<f32>,
    @location(1) pos_b_width: vec4<f32>,
    @location(2) color: vec4<f32>,
    @location(3) params: vec4<f32>,
    @location(4) pos_c_pad: vec4<f32>,
}

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) color: vec4<f32>,
    // Pixel offset from the primitive's reference point
    @location(1) local: vec2<f32>,
    @location(2) @interpolate(flat) shape: vec4<f32>,
    @location(3) @interpolate(flat) params: vec4<f32>,
}

fn quad_corner(vertex_index: u32) -> vec2<f32> {
    var corners = array<vec2<f32>, 6>(
        vec2<f32>(0.0, 0.0),
        vec2<f32>(1.0, 0.0),
        vec2<f32>(0.0, 1.0),
        vec2<f32>(0.0, 1.0),
        vec2<f32>(1.0, 0.0),
        vec2<f32>(1.0, 1.0),
    );
    return corners[vertex_index];
}

fn decode_tag(raw: f32) -> u32 {
    return u32(raw + 0.5);
}

// ============================================================================
// Vertex Shader
// ============================================================================

@vertex
fn vs_main(
    @builtin(vertex_index) vertex_index: u32,
    instance: InstanceInput,
) -> VertexOutput {
    var out: VertexOutput;
    let tag = decode_tag(instance.params.x);
    let corner = quad_corner(vertex_index);

    var pixel = instance.pos_a_radius.xyz;
    out.color = instance.color;
    out.local = vec2<f32>(0.0);
    out.shape = vec4<f32>(0.0);
    out.params = instance.params;

    if tag == TAG_RECT {
        let half_size = instance.pos_b_width.xy * 0.5;
        let center = instance.pos_a_radius.xy + half_size;
        let offset = (corner * 2.0 - 1.0) * (half_size + vec2<f32>(AA_MARGIN));
        pixel = vec3<f32>(center + offset, instance.pos_a_radius.z);
        out.local = offset;
        out.shape = vec4<f32>(half_size, instance.pos_a_radius.w, instance.pos_b_width.w);
    } else if tag == TAG_CIRCLE {
        let radius = instance.pos_a_radius.w;
        let stroke = instance.pos_b_width.w;
        let offset = (corner * 2.0 - 1.0) * (radius + stroke + AA_MARGIN);
        pixel = vec3<f32>(instance.pos_a_radius.xy + offset, instance.pos_a_radius.z);
        out.local = offset;
        out.shape = vec4<f32>(radius, stroke, 0.0, 0.0);
    } else if tag == TAG_LINE {
        let a = instance.pos_a_radius.xyz;
        let b = instance.pos_b_width.xyz;
        let delta = b.xy - a.xy;
        let len = length(delta);
        var dir = vec2<f32>(1.0, 0.0);
        if len > 0.0 {
            dir = delta / len;
        }
        let normal = vec2<f32>(-dir.y, dir.x);
        let half_width = instance.pos_a_radius.w;
        let along = mix(-AA_MARGIN, len + AA_MARGIN, corner.x);
        let across = mix(-(half_width + AA_MARGIN), half_width + AA_MARGIN, corner.y);
        var t = 0.0;
        if len > 0.0 {
            t = clamp(along / len, 0.0, 1.0);
        }
        pixel = vec3<f32>(a.xy + dir * along + normal * across, mix(a.z, b.z, t));
        out.local = vec2<f32>(along, across);
        out.shape = vec4<f32>(len, half_width, 0.0, 0.0);
    } else if tag == TAG_TRI_LIT || tag == TAG_TRI_UNLIT {
        if vertex_index == 1u {
            pixel = instance.pos_b_width.xyz;
        } else if vertex_index >= 2u {
            pixel = instance.pos_c_pad.xyz;
        }
        if tag == TAG_TRI_LIT {
            let n = vec3<f32>(instance.pos_a_radius.w, instance.pos_b_width.w, instance.pos_c_pad.w);
            let shade = AMBIENT + (1.0 - AMBIENT) * abs(dot(n, LIGHT_DIR));
            out.color = vec4<f32>(instance.color.rgb * shade, instance.color.a);
        }
    }

    out.position = uniforms.view_proj * vec4<f32>(pixel, 1.0);
    return out;
}

// ============================================================================
// Coverage
// ============================================================================

fn sd_round_box(p: vec2<f32>, half_size: vec2<f32>, radius: f32) -> f32 {
    let r = min(radius, min(half_size.x, half_size.y));
    let q = abs(p) - half_size + vec2<f32>(r);
    return length(max(q, vec2<f32>(0.0))) + min(max(q.x, q.y), 0.0) - r;
}

fn rect_coverage(p: vec2<f32>, shape: vec4<f32>) -> f32 {
    let d = sd_round_box(p, shape.xy, shape.z);
    let stroke = shape.w;
    if stroke > 0.0 {
        // Stroke sits inside the edge
        return clamp(0.5 - (abs(d + stroke * 0.5) - stroke * 0.5), 0.0, 1.0);
    }
    return clamp(0.5 - d, 0.0, 1.0);
}

fn marker_distance(shape: u32, p: vec2<f32>, r: f32) -> f32 {
    let arm = max(r * 0.25, 1.0);
    let a = abs(p);
    var d = length(p) - r;
    switch shape {
        case 1u: {
            d = max(a.x, a.y) - r;
        }
        case 2u: {
            d = (a.x + a.y) * INV_SQRT_2 - r * 0.75;
        }
        case 3u: {
            d = min(max(a.x - r, a.y - arm), max(a.x - arm, a.y - r));
        }
        case 4u: {
            let u = abs((p.x + p.y) * INV_SQRT_2);
            let v = abs((p.x - p.y) * INV_SQRT_2);
            d = min(max(u - r, v - arm), max(u - arm, v - r));
        }
        case 5u, 6u: {
            // Device y grows downward; an upward triangle has its apex at -r
            var dy = p.y;
            if shape == SHAPE_TRIANGLE_DOWN {
                dy = -p.y;
            }
            let k = sqrt(3.0);
            d = max(max(max(dy, 0.0) - r * 0.5, (k * a.x - dy) * 0.5 - r * 0.5), -dy - r);
        }
        case 8u: {
            d = length(p) - r * 0.5;
        }
        default: {}
    }
    return d;
}

fn marker_coverage(shape: u32, p: vec2<f32>, radius: f32, stroke: f32) -> f32 {
    let d = marker_distance(shape, p, radius);
    if stroke > 0.0 {
        return clamp(stroke * 0.5 + 0.5 - abs(d), 0.0, 1.0);
    }
    return clamp(0.5 - d, 0.0, 1.0);
}

fn line_coverage(p: vec2<f32>, shape: vec4<f32>, params: vec4<f32>) -> f32 {
    let len = shape.x;
    let half_width = shape.y;
    let across = clamp(half_width + 0.5 - abs(p.y), 0.0, 1.0);
    let ends = clamp(min(p.x, len - p.x) + 0.5, 0.0, 1.0);
    var coverage = across * ends;

    let dash = params.y;
    if dash > 0.0 {
        let period = dash + params.z;
        let distance = p.x + params.w;
        let phase = distance - floor(distance / period) * period;
        if phase >= dash {
            coverage = 0.0;
        }
    }
    return coverage;
}

// ============================================================================
// Fragment Shader
// ============================================================================

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let tag = decode_tag(in.params.x);
    var coverage = 1.0;

    if tag == TAG_RECT {
        coverage = rect_coverage(in.local, in.shape);
    } else if tag == TAG_CIRCLE {
        coverage = marker_coverage(decode_tag(in.params.y), in.local, in.shape.x, in.shape.y);
    } else if tag == TAG_LINE {
        coverage = line_coverage(in.local, in.shape, in.params);
    }

    if coverage <= 0.0 {
        discard;
    }
    return vec4<f32>(in.color.rgb, in.color.a * coverage);
}
"#;

/// Textured quad shader (text and images)
///
/// Bind group 0 holds the shared uniforms, group 1 the quad's texture and
/// sampler. The output is the sampled texel multiplied by the tint.
pub const TEXTURED_QUAD_SHADER: &str = r#"
// ============================================================================
// mplot Textured Quad Shader
// ============================================================================

struct Uniforms {
    view_proj: mat4x4<f32>,
    screen_size: vec2<f32>,
    _padding: vec2<f32>,
    camera_pos: vec4<f32>,
}

@group(0) @binding(0) var<uniform> uniforms: Uniforms;
@group(1) @binding(0) var quad_texture: texture_2d<f32>;
@group(1) @binding(1) var quad_sampler: sampler;

struct InstanceInput {
    @location(0) pos_a_radius: vec4<f32>,
    @location(1) pos_b_width: vec4<f32>,
    @location(2) color: vec4<f32>,
    @location(3) params: vec4<f32>,
    @location(4) pos_c_pad: vec4<f32>,
}

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
    @location(1) tint: vec4<f32>,
}

@vertex
fn vs_main(
    @builtin(vertex_index) vertex_index: u32,
    instance: InstanceInput,
) -> VertexOutput {
    var corners = array<vec2<f32>, 6>(
        vec2<f32>(0.0, 0.0),
        vec2<f32>(1.0, 0.0),
        vec2<f32>(0.0, 1.0),
        vec2<f32>(0.0, 1.0),
        vec2<f32>(1.0, 0.0),
        vec2<f32>(1.0, 1.0),
    );
    let corner = corners[vertex_index];
    let local = corner * instance.pos_b_width.xy;

    // Counter-clockwise on screen, where y points down
    let angle = instance.pos_a_radius.w;
    let s = sin(angle);
    let c = cos(angle);
    let rotated = vec2<f32>(local.x * c + local.y * s, -local.x * s + local.y * c);
    let pixel = instance.pos_a_radius.xy + rotated;

    var out: VertexOutput;
    out.position = uniforms.view_proj * vec4<f32>(pixel, instance.pos_a_radius.z, 1.0);
    out.uv = mix(instance.pos_c_pad.xy, instance.pos_c_pad.zw, corner);
    out.tint = instance.color;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    return textureSample(quad_texture, quad_sampler, in.uv) * in.tint;
}
"#;
