use std::borrow::Cow;

use overlay::{
    declared_scalar_uniforms, Appearance, CompileError, ProgramRequest, UniformLocation,
    RESOLUTION_UNIFORM, TIME_UNIFORM,
};
use wgpu::naga::ShaderStage;

/// Number of scalar slots in the `_custom` array of the uniform block.
pub(crate) const MAX_CUSTOM_UNIFORMS: usize = 64;

const RESOLUTION_LOCATION: u32 = 0;
const TIME_LOCATION: u32 = 1;
const FIRST_CUSTOM_LOCATION: u32 = 2;

/// Where a resolved uniform lives inside [`crate::uniforms::RegionUniforms`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UniformSlot {
    Resolution,
    Time,
    Custom(usize),
}

impl UniformSlot {
    pub(crate) fn from_location(location: UniformLocation) -> Option<Self> {
        match location.0 {
            RESOLUTION_LOCATION => Some(UniformSlot::Resolution),
            TIME_LOCATION => Some(UniformSlot::Time),
            index => {
                let custom = (index - FIRST_CUSTOM_LOCATION) as usize;
                (custom < MAX_CUSTOM_UNIFORMS).then_some(UniformSlot::Custom(custom))
            }
        }
    }
}

/// Uniform names a program can resolve, in slot order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct UniformTable {
    custom: Vec<String>,
}

impl UniformTable {
    pub(crate) fn location(&self, name: &str) -> Option<UniformLocation> {
        match name {
            RESOLUTION_UNIFORM => Some(UniformLocation(RESOLUTION_LOCATION)),
            TIME_UNIFORM => Some(UniformLocation(TIME_LOCATION)),
            _ => self
                .custom
                .iter()
                .position(|known| known == name)
                .map(|index| UniformLocation(FIRST_CUSTOM_LOCATION + index as u32)),
        }
    }
}

/// Fragment source ready for the GLSL frontend plus its uniform table.
#[derive(Debug, Clone)]
pub(crate) struct AssembledProgram {
    pub fragment: String,
    pub uniforms: UniformTable,
}

/// Builds the fragment program for `request`: header, library, main and the
/// footer selected by its appearance.
///
/// Loose `uniform` declarations are removed. Each declared scalar becomes a
/// private global that the generated `main` loads from the shared uniform
/// block before calling `mainImage`.
pub(crate) fn assemble_fragment(request: &ProgramRequest) -> Result<AssembledProgram, CompileError> {
    let custom: Vec<String> = request
        .custom_uniforms()
        .into_iter()
        .filter(|name| name != RESOLUTION_UNIFORM && name != TIME_UNIFORM)
        .collect();
    if custom.len() > MAX_CUSTOM_UNIFORMS {
        return Err(CompileError::Link(format!(
            "{} declares {} scalar uniforms; at most {MAX_CUSTOM_UNIFORMS} are supported",
            request.label,
            custom.len()
        )));
    }

    let mut fragment = String::from(FRAGMENT_HEADER);
    fragment.push_str(&format!("vec2 {RESOLUTION_UNIFORM};\nfloat {TIME_UNIFORM};\n"));
    for name in &custom {
        fragment.push_str(&format!("float {name};\n"));
    }
    fragment.push_str("#line 1\n");
    fragment.push_str(&sanitize(&request.library));
    fragment.push_str(&sanitize(&request.main));

    let body = match request.appearance {
        Appearance::Plain => PLAIN_BODY,
        Appearance::PauseOverlay => {
            fragment.push_str(PAUSE_HELPERS);
            PAUSE_BODY
        }
    };
    fragment.push_str("\nvoid main() {\n");
    fragment.push_str(&format!("    {RESOLUTION_UNIFORM} = ubo._iResolution;\n"));
    fragment.push_str(&format!("    {TIME_UNIFORM} = ubo._iTime;\n"));
    for (index, name) in custom.iter().enumerate() {
        let component = ["x", "y", "z", "w"][index % 4];
        fragment.push_str(&format!("    {name} = ubo._custom[{}].{component};\n", index / 4));
    }
    fragment.push_str(body);
    fragment.push_str("}\n");

    Ok(AssembledProgram {
        fragment,
        uniforms: UniformTable { custom },
    })
}

/// Blanks `#version` and `precision` lines and drops every `uniform ...;`
/// statement, even one spread over several lines. Line breaks and comments
/// are kept so compiler logs still match the author's source.
fn sanitize(source: &str) -> String {
    let mut kept = String::with_capacity(source.len());
    let mut dropping: Option<String> = None;
    for line in source.lines() {
        let trimmed = line.trim_start();
        if dropping.is_none()
            && (trimmed.starts_with("#version") || trimmed.starts_with("precision "))
        {
            kept.push('\n');
            continue;
        }
        let (code, comment) = match line.find("//") {
            Some(index) => line.split_at(index),
            None => (line, ""),
        };
        for segment in code.split_inclusive(is_statement_end) {
            if dropping.is_none() && segment.split_whitespace().next() == Some("uniform") {
                dropping = Some(String::new());
            }
            let Some(statement) = dropping.as_mut() else {
                kept.push_str(segment);
                continue;
            };
            statement.push_str(segment);
            statement.push(' ');
            if segment.ends_with(is_statement_end) {
                if let Some(statement) = dropping.take() {
                    warn_if_unsupported(&statement);
                }
            }
        }
        kept.push_str(comment);
        kept.push('\n');
    }
    kept
}

fn is_statement_end(c: char) -> bool {
    matches!(c, ';' | '{' | '}')
}

fn warn_if_unsupported(statement: &str) {
    let statement = statement.split_whitespace().collect::<Vec<_>>().join(" ");
    let builtin = statement.contains(RESOLUTION_UNIFORM) || statement.contains(TIME_UNIFORM);
    if !builtin && declared_scalar_uniforms(&statement).is_empty() {
        tracing::warn!(
            %statement,
            "only scalar float uniforms are supported; dropping declaration"
        );
    }
}

pub(crate) fn vertex_module_descriptor() -> wgpu::ShaderModuleDescriptor<'static> {
    wgpu::ShaderModuleDescriptor {
        label: Some("region vertex"),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Borrowed(VERTEX_SHADER_GLSL),
            stage: ShaderStage::Vertex,
            defines: &[],
        },
    }
}

pub(crate) fn fragment_module_descriptor<'a>(
    label: &'a str,
    program: &AssembledProgram,
) -> wgpu::ShaderModuleDescriptor<'a> {
    wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Owned(program.fragment.clone()),
            stage: ShaderStage::Fragment,
            defines: &[],
        },
    }
}

/// Uniform block shared by both stages. Layout must match
/// [`crate::uniforms::RegionUniforms`].
const UNIFORM_BLOCK: &str = r"layout(std140, set = 0, binding = 0) uniform RegionParams {
    vec4 _viewport;
    vec2 _iResolution;
    float _iTime;
    float _padding0;
    vec4 _custom[16];
} ubo;
";

const FRAGMENT_HEADER: &str = concat!(
    "#version 450\n",
    "layout(location = 0) in vec2 v_FragPos;\n",
    "layout(location = 0) out vec4 pageshade_FragColor;\n\n",
    r"layout(std140, set = 0, binding = 0) uniform RegionParams {
    vec4 _viewport;
    vec2 _iResolution;
    float _iTime;
    float _padding0;
    vec4 _custom[16];
} ubo;
",
    "\n",
    "#define gl_FragColor pageshade_FragColor\n",
);

const PLAIN_BODY: &str = r"    vec4 pageshade_color = vec4(0.0);
    mainImage(pageshade_color, v_FragPos.xy);
    pageshade_FragColor = pageshade_color;
";

const PAUSE_HELPERS: &str = r"
float pageshade_antialias(float pageshade_line, float pageshade_pos) {
    return smoothstep(pageshade_line + 2.0, pageshade_line, pageshade_pos);
}

vec4 pageshade_playTriangle(vec2 pageshade_pos, float pageshade_radius) {
    float pageshade_width = pageshade_radius * 0.75;
    float pageshade_height = pageshade_radius;
    float pageshade_x = (pageshade_pos.x / (pageshade_width * 2.0)) + 0.5;
    float pageshade_topLine = mix(pageshade_height, 0.0, pageshade_x);
    return vec4(
        pageshade_antialias(pageshade_topLine, pageshade_pos.y) *
        pageshade_antialias(pageshade_topLine, -pageshade_pos.y) *
        pageshade_antialias(pageshade_width, -pageshade_pos.x)
    );
}
";

/// Dims the image to a quarter and composites a play triangle over it.
const PAUSE_BODY: &str = r"    vec4 pageshade_color = vec4(0.0);
    mainImage(pageshade_color, v_FragPos.xy);
    vec4 pageshade_dimmed = vec4(pageshade_color.rgb * 0.25, 1.0);
    vec4 pageshade_overlay = 0.75 * pageshade_playTriangle(v_FragPos.xy, 80.0);
    pageshade_FragColor = pageshade_dimmed * (1.0 - pageshade_overlay.a) + pageshade_overlay;
";

/// Fullscreen-triangle vertex shader. `_viewport` maps the triangle onto the
/// current region in normalized device coordinates; `v_FragPos` is centred on
/// the region and measured in document pixels.
const VERTEX_SHADER_GLSL: &str = concat!(
    "#version 450\n",
    "layout(location = 0) in vec2 position;\n",
    "layout(location = 0) out vec2 v_FragPos;\n\n",
    r"layout(std140, set = 0, binding = 0) uniform RegionParams {
    vec4 _viewport;
    vec2 _iResolution;
    float _iTime;
    float _padding0;
    vec4 _custom[16];
} ubo;
",
    r"
void main() {
    gl_Position = vec4(position * ubo._viewport.xy + ubo._viewport.zw, 0.0, 1.0);
    v_FragPos = (position * 0.5) * ubo._iResolution;
}
",
);

#[cfg(test)]
mod tests {
    use super::*;
    use wgpu::naga::front::glsl::{Frontend, Options};
    use wgpu::naga::valid::{Capabilities, ValidationFlags, Validator};

    fn request(library: &str, main: &str, appearance: Appearance) -> ProgramRequest {
        ProgramRequest::new("demo", library, main, appearance)
    }

    fn validate(stage: ShaderStage, source: &str) {
        let module = Frontend::default()
            .parse(&Options::from(stage), source)
            .unwrap_or_else(|error| panic!("parse failed: {error:?}\n{source}"));
        Validator::new(ValidationFlags::all(), Capabilities::all())
            .validate(&module)
            .unwrap_or_else(|error| panic!("validation failed: {error:?}\n{source}"));
    }

    fn validate_both(library: &str, main: &str) {
        for appearance in [Appearance::Plain, Appearance::PauseOverlay] {
            let program = assemble_fragment(&request(library, main, appearance)).expect("assemble");
            validate(ShaderStage::Fragment, &program.fragment);
        }
    }

    #[test]
    fn header_blocks_stay_in_sync() {
        assert!(FRAGMENT_HEADER.contains(UNIFORM_BLOCK));
        assert!(VERTEX_SHADER_GLSL.contains(UNIFORM_BLOCK));
    }

    #[test]
    fn custom_uniforms_load_from_block() {
        let program = assemble_fragment(&request(
            "uniform float speed;",
            "uniform float amp; // strength\nvoid mainImage(out vec4 c, in vec2 p) { c = vec4(amp * speed); }",
            Appearance::Plain,
        ))
        .expect("assemble");

        assert!(program.fragment.contains("float speed;\n"));
        assert!(program.fragment.contains("    speed = ubo._custom[0].x;\n"));
        assert!(program.fragment.contains("    amp = ubo._custom[0].y;\n"));
        assert!(!program.fragment.contains("#define amp"));
        assert!(!program.fragment.contains("uniform float amp"));
        assert!(program.fragment.contains("// strength"));
        assert_eq!(program.uniforms.location("speed"), Some(UniformLocation(2)));
        assert_eq!(program.uniforms.location("amp"), Some(UniformLocation(3)));
        assert_eq!(program.uniforms.location("iTime"), Some(UniformLocation(1)));
        assert_eq!(program.uniforms.location("missing"), None);
    }

    #[test]
    fn redeclared_builtins_are_not_custom() {
        let program = assemble_fragment(&request(
            "",
            "uniform float iTime;\nuniform float amp;\nvoid mainImage(out vec4 c, in vec2 p) { c = vec4(iTime * amp); }",
            Appearance::Plain,
        ))
        .expect("assemble");
        assert_eq!(program.uniforms.location("amp"), Some(UniformLocation(2)));
        assert_eq!(program.fragment.matches("float iTime;").count(), 1);
        validate(ShaderStage::Fragment, &program.fragment);
    }

    #[test]
    fn webgl_preamble_is_removed() {
        let program = assemble_fragment(&request(
            "",
            "#version 100\nprecision highp float;\nuniform vec2 iResolution;\nvoid mainImage(out vec4 c, in vec2 p) {}",
            Appearance::Plain,
        ))
        .expect("assemble");
        let body = program.fragment.split("#line 1\n").nth(1).expect("body");
        assert!(!body.contains("#version"));
        assert!(!body.contains("precision"));
        assert!(!body.contains("uniform vec2 iResolution"));
        assert_eq!(body.lines().nth(3), Some("void mainImage(out vec4 c, in vec2 p) {}"));
    }

    #[test]
    fn uniform_statements_spanning_lines_are_dropped() {
        let main = "uniform float\n    amp;\nvoid mainImage(out vec4 c, in vec2 p) { c = vec4(amp); }";
        let program = assemble_fragment(&request("", main, Appearance::Plain)).expect("assemble");
        let body = program.fragment.split("#line 1\n").nth(1).expect("body");
        assert_eq!(body.lines().next(), Some(""));
        assert_eq!(body.lines().nth(1), Some(""));
        assert_eq!(
            body.lines().nth(2),
            Some("void mainImage(out vec4 c, in vec2 p) { c = vec4(amp); }")
        );
        assert_eq!(program.uniforms.location("amp"), Some(UniformLocation(2)));
        validate(ShaderStage::Fragment, &program.fragment);
    }

    #[test]
    fn code_after_a_uniform_on_the_same_line_is_kept() {
        assert_eq!(
            sanitize("uniform float a; float b = 1.0; // note\n"),
            " float b = 1.0; // note\n"
        );
        assert_eq!(sanitize("float f() { return 1.0; } uniform float a;"), "float f() { return 1.0; }\n");
        assert_eq!(sanitize("float uniformScale = 2.0;"), "float uniformScale = 2.0;\n");
    }

    #[test]
    fn appearance_selects_footer() {
        let main = "void mainImage(out vec4 c, in vec2 p) {}";
        let plain = assemble_fragment(&request("", main, Appearance::Plain)).expect("plain");
        let paused =
            assemble_fragment(&request("", main, Appearance::PauseOverlay)).expect("paused");
        assert!(!plain.fragment.contains("pageshade_playTriangle"));
        assert!(paused.fragment.contains("pageshade_playTriangle(v_FragPos.xy, 80.0)"));
        assert!(paused.fragment.contains("pageshade_color.rgb * 0.25"));
    }

    #[test]
    fn assembled_programs_validate() {
        validate_both("", "void mainImage(out vec4 c, in vec2 p) { c = vec4(p / iResolution, sin(iTime), 1.0); }");
    }

    #[test]
    fn uniforms_named_like_footer_locals_validate() {
        for name in [
            "color", "overlay", "dimmed", "pos", "radius", "width", "height", "line", "x", "topLine",
        ] {
            let main = format!(
                "uniform float {name};\nvoid mainImage(out vec4 c, in vec2 p) {{ c = vec4({name}); }}"
            );
            validate_both("", &main);
        }
    }

    #[test]
    fn parameters_may_shadow_uniforms() {
        validate_both(
            "uniform float amp;\nfloat scale(float amp) { return amp * 2.0; }",
            "void mainImage(out vec4 c, in vec2 p) { c = vec4(scale(amp)); }",
        );
    }

    #[test]
    fn demo_shaders_validate() {
        validate_both(
            include_str!("../../../demos/shaders/sdf.glsl"),
            include_str!("../../../demos/shaders/ripple.glsl"),
        );
        validate_both(
            include_str!("../../../demos/shaders/sdf.glsl"),
            "uniform float radius;\nvoid mainImage(out vec4 c, in vec2 p) {\n    c = vec4(distanceColor(sdCircle(p, radius)), 1.0);\n}",
        );
    }

    #[test]
    fn vertex_shader_validates() {
        validate(ShaderStage::Vertex, VERTEX_SHADER_GLSL);
    }

    #[test]
    fn too_many_uniforms_fail_to_link() {
        let library = (0..=MAX_CUSTOM_UNIFORMS)
            .map(|index| format!("uniform float u{index};"))
            .collect::<Vec<_>>()
            .join("\n");
        let error = assemble_fragment(&request(&library, "", Appearance::Plain))
            .expect_err("too many uniforms");
        assert!(matches!(error, CompileError::Link(_)));
    }

    #[test]
    fn slots_round_trip_through_locations() {
        assert_eq!(
            UniformSlot::from_location(UniformLocation(0)),
            Some(UniformSlot::Resolution)
        );
        assert_eq!(
            UniformSlot::from_location(UniformLocation(5)),
            Some(UniformSlot::Custom(3))
        );
        assert_eq!(UniformSlot::from_location(UniformLocation(200)), None);
    }
}
