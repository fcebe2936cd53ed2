/// WGSL shader code for the GPU preview compositor
///
/// One full-screen triangle. Each fragment maps its surface pixel back
/// through the inverse center-pivot transform into the source region,
/// samples the (preview-scaled) source texture and runs the display filter
/// chain: brightness, contrast, saturate, then an approximate blur.

/// Preview compositing shader
pub const PREVIEW_SHADER: &str = r#"
// ========== Vertex Shader ==========
// Full-screen triangle (no vertex buffers needed)

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
}

@vertex
fn vs_main(@builtin(vertex_index) vertex_index: u32) -> VertexOutput {
    var output: VertexOutput;

    // Vertex 0: (-1, -1), vertex 1: (3, -1), vertex 2: (-1, 3)
    let x = f32(i32(vertex_index & 1u) * 4 - 1);
    let y = f32(i32(vertex_index >> 1u) * 4 - 1);

    output.clip_position = vec4<f32>(x, -y, 0.0, 1.0);
    return output;
}

// ========== Fragment Shader ==========

struct PreviewParams {
    inverse_row0: vec4<f32>,  // frame -> region-local affine, row 0 (xyz)
    inverse_row1: vec4<f32>,  // row 1 (xyz)
    region: vec4<f32>,        // source region x, y, width, height (source px)
    sizes: vec4<f32>,         // texture width, height, surface scale, unused
    tone: vec4<f32>,          // brightness, contrast, saturate (1.0 = identity), blur sigma
}

@group(0) @binding(0)
var source_texture: texture_2d<f32>;

@group(0) @binding(1)
var source_sampler: sampler;

@group(0) @binding(2)
var<uniform> params: PreviewParams;

fn apply_tone(c: vec4<f32>) -> vec4<f32> {
    var rgb = clamp(c.rgb * params.tone.x, vec3<f32>(0.0), vec3<f32>(1.0));
    rgb = clamp((rgb - vec3<f32>(0.5)) * params.tone.y + vec3<f32>(0.5), vec3<f32>(0.0), vec3<f32>(1.0));

    let s = params.tone.z;
    let saturate = mat3x3<f32>(
        vec3<f32>(0.213 + 0.787 * s, 0.213 - 0.213 * s, 0.213 - 0.213 * s),
        vec3<f32>(0.715 - 0.715 * s, 0.715 + 0.285 * s, 0.715 - 0.715 * s),
        vec3<f32>(0.072 - 0.072 * s, 0.072 - 0.072 * s, 0.072 + 0.928 * s),
    );
    rgb = clamp(saturate * rgb, vec3<f32>(0.0), vec3<f32>(1.0));
    return vec4<f32>(rgb, c.a);
}

// Toned sample at a region-local position; transparent outside the region
fn sample_region(local: vec2<f32>) -> vec4<f32> {
    if (local.x < 0.0 || local.y < 0.0 || local.x >= params.region.z || local.y >= params.region.w) {
        return vec4<f32>(0.0);
    }
    let uv = (params.region.xy + local) * params.sizes.z / params.sizes.xy;
    return apply_tone(textureSampleLevel(source_texture, source_sampler, uv, 0.0));
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    // Fragment positions are surface pixel centres
    let frame_pos = vec3<f32>(in.clip_position.xy / params.sizes.z, 1.0);
    let local = vec2<f32>(
        dot(params.inverse_row0.xyz, frame_pos),
        dot(params.inverse_row1.xyz, frame_pos),
    );

    let sigma = params.tone.w;
    if (sigma <= 0.0) {
        return sample_region(local);
    }

    // 9x9 Gaussian taps spread over +-2 sigma
    var color = vec4<f32>(0.0);
    var total = 0.0;
    for (var i = -4; i <= 4; i = i + 1) {
        for (var j = -4; j <= 4; j = j + 1) {
            let offset = vec2<f32>(f32(i), f32(j)) * (sigma * 0.5);
            let w = exp(-dot(offset, offset) / (2.0 * sigma * sigma));
            color = color + sample_region(local + offset) * w;
            total = total + w;
        }
    }
    return color / total;
}
"#;

/// Get the shader source
pub fn get_shader() -> &'static str {
    PREVIEW_SHADER
}
