/// Position-only program. Without a fragment stage it fills the shadow
/// map; with `fs_main` it draws flat-colored lines.
pub(crate) const FLAT_SHADER: &str = r#"
struct FlatGlobals {
    view_projection: mat4x4<f32>,
}

struct FlatObject {
    world: mat4x4<f32>,
    color: vec4<f32>,
}

@group(0) @binding(0)
var<uniform> globals: FlatGlobals;

@group(1) @binding(0)
var<uniform> object: FlatObject;

@vertex
fn vs_main(@location(0) position: vec3<f32>) -> @builtin(position) vec4<f32> {
    return globals.view_projection * object.world * vec4<f32>(position, 1.0);
}

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return object.color;
}
"#;

/// Textured Blinn-Phong with a 3x3 percentage-closer shadow lookup.
pub(crate) const LIT_SHADER: &str = r#"
struct LitGlobals {
    view_projection: mat4x4<f32>,
    texture_matrix: mat4x4<f32>,
    light_position: vec4<f32>,
    view_position: vec4<f32>,
    light_color: vec4<f32>,
    // bias, shininess, ambient, shadow map size
    params: vec4<f32>,
}

struct LitObject {
    world: mat4x4<f32>,
    color_mult: vec4<f32>,
}

@group(0) @binding(0)
var<uniform> globals: LitGlobals;
@group(0) @binding(1)
var base_texture: texture_2d<f32>;
@group(0) @binding(2)
var base_sampler: sampler;
@group(0) @binding(3)
var shadow_map: texture_depth_2d;

@group(1) @binding(0)
var<uniform> object: LitObject;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) texcoord: vec2<f32>,
}

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) texcoord: vec2<f32>,
    @location(1) projected: vec4<f32>,
    @location(2) normal: vec3<f32>,
    @location(3) surface_to_light: vec3<f32>,
    @location(4) surface_to_view: vec3<f32>,
}

@vertex
fn vs_main(input: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    let world_position = object.world * vec4<f32>(input.position, 1.0);
    out.clip_position = globals.view_projection * world_position;
    out.texcoord = input.texcoord;
    out.projected = globals.texture_matrix * world_position;
    out.normal = (object.world * vec4<f32>(input.normal, 0.0)).xyz;
    out.surface_to_light = globals.light_position.xyz - world_position.xyz;
    out.surface_to_view = globals.view_position.xyz - world_position.xyz;
    return out;
}

// Texture space has v pointing up, texel rows run top down.
fn shadow_depth(uv: vec2<f32>) -> f32 {
    let size = i32(globals.params.w);
    let flipped = vec2<f32>(uv.x, 1.0 - uv.y);
    let texel = clamp(
        vec2<i32>(floor(flipped * globals.params.w)),
        vec2<i32>(0, 0),
        vec2<i32>(size - 1, size - 1),
    );
    return textureLoad(shadow_map, texel, 0);
}

fn shadow_factor(projected: vec3<f32>) -> f32 {
    let in_range = projected.x >= 0.0 && projected.x <= 1.0
        && projected.y >= 0.0 && projected.y <= 1.0;
    if (!in_range) {
        return 1.0;
    }
    let reference = projected.z + globals.params.x;
    let texel_size = 1.0 / globals.params.w;
    var lit = 0.0;
    for (var x = -1; x <= 1; x++) {
        for (var y = -1; y <= 1; y++) {
            let offset = vec2<f32>(f32(x), f32(y)) * texel_size;
            lit += step(reference, shadow_depth(projected.xy + offset));
        }
    }
    return lit / 9.0;
}

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    let base = vec4<f32>(vec3<f32>(textureSample(base_texture, base_sampler, input.texcoord).r), 1.0)
        * object.color_mult;

    let normal = normalize(input.normal);
    let to_light = normalize(input.surface_to_light);
    let to_view = normalize(input.surface_to_view);
    let half_vector = normalize(to_light + to_view);

    let light = dot(normal, to_light);
    var specular = 0.0;
    if (light > 0.0) {
        specular = pow(max(dot(normal, half_vector), 0.0), globals.params.y);
    }

    let shadow_light = shadow_factor(input.projected.xyz / input.projected.w);
    let light_color = globals.light_color.rgb;
    let ambient = base.rgb * globals.params.z;
    let diffuse = base.rgb * light * light_color;
    let color = ambient + (diffuse + specular * light_color) * shadow_light;
    return vec4<f32>(clamp(color, vec3<f32>(0.0), vec3<f32>(1.0)), base.a);
}
"#;
