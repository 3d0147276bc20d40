//! Shader source handed to the graphics device at instance creation,
//! parameterized by the compiled buffer sizes. The device owns compilation
//! and linking; this module only produces text.

use crate::compile::PreparedPuppet;

#[derive(Clone, Debug)]
pub struct ShaderSet {
    pub vertex: String,
    pub fragment: String,
}

pub fn shader_set(prepared: &PreparedPuppet) -> ShaderSet {
    ShaderSet {
        vertex: vertex_shader(prepared),
        fragment: fragment_shader(),
    }
}

fn vertex_shader(prepared: &PreparedPuppet) -> String {
    // GLSL rejects zero-length arrays, so every size is at least 1.
    let mutators = prepared.mutators.len.max(1);
    let controls = prepared.controls.len().max(1);
    let pool = prepared.control_mutation_values.len.max(1);
    let triples = prepared.mutation_value_indices.len.max(1);
    let max_iteration = prepared.max_iteration.max(1);

    format!(
        r#"
  uniform vec2 viewport;
  uniform vec3 basePosition;
  uniform vec3 translate;
  uniform float mutation;
  uniform vec4 scale;

  attribute vec2 coordinates;
  attribute vec2 aTextureCoord;

  varying lowp vec2 vTextureCoord;
  varying lowp float vOpacity;

  mat4 viewportScale = mat4(
    2.0 / viewport.x, 0, 0, 0,
    0, -2.0 / viewport.y, 0, 0,
    0, 0, 1, 0,
    -1, +1, 0, 1
  );

  uniform vec2 uControlMutationValues[{pool}];
  uniform vec3 uMutationValueIndices[{triples}];
  uniform vec2 uControlMutationIndices[{mutators}];
  uniform float uControlValues[{controls}];
  uniform vec2 uMutationValues[{mutators}];

  vec2 getMutationValue(int mutationIndex, int mutationType) {{
    vec2 result = uMutationValues[mutationIndex];
    vec2 controlMutations = uControlMutationIndices[mutationIndex];
    int start = int(controlMutations.x);
    int steps = int(controlMutations.y);
    if (steps == 0) {{
      return result;
    }}
    for (int i = 0; i < {max_iteration}; i++) {{
      if (i < steps) {{
        vec3 valueIndices = uMutationValueIndices[start + i];
        float controlValue = uControlValues[int(valueIndices.y)];

        int startIndex = int(floor(valueIndices.x + controlValue));
        int endIndex = int(ceil(valueIndices.x + controlValue));
        float mixFactor = controlValue - floor(controlValue);

        vec2 mutValue = mix(
          uControlMutationValues[startIndex],
          uControlMutationValues[endIndex],
          mixFactor
        );

        if (mutationType == 2 || mutationType == 5) {{
          result *= mutValue;
        }} else {{
          result += mutValue;
        }}
      }} else {{
        return result;
      }}
    }}

    return result;
  }}

  #define PI_FRAC 0.017453292519943295

  uniform vec4 uMutationVectors[{mutators}];
  uniform float uMutationParent[{mutators}];

  vec3 mutateOnce(vec3 startValue, int mutationIndex) {{
    vec4 mutation = uMutationVectors[mutationIndex];
    int mutationType = int(mutation.x);

    vec2 mutationValue = getMutationValue(mutationIndex, mutationType);
    vec2 origin = mutation.yz;
    vec3 result = startValue;

    if (mutationType == 1) {{
      float effect = 1.0;
      if (mutation.a > 0.0 && distance(startValue.xy, origin) > mutation.a) {{
        effect = 0.0;
      }}
      result = vec3(startValue.xy + mutationValue * effect, startValue.z);
    }}

    if (mutationType == 2) {{
      result = vec3(origin.xy + vec2(
        (startValue.x - origin.x) * mutationValue.x,
        (startValue.y - origin.y) * mutationValue.y
      ), startValue.z);
    }}

    if (mutationType == 3) {{
      float rotation = mutationValue.x * PI_FRAC;
      mat2 entityRotationMatrix = mat2(cos(rotation), sin(rotation), -sin(rotation), cos(rotation));
      result = vec3((startValue.xy - origin) * entityRotationMatrix + origin, startValue.z);
    }}

    if (mutationType == 4) {{
      float effect = 1.0 - clamp(distance(startValue.xy, origin), 0.0, mutation.a) / mutation.a;
      result = vec3(startValue.xy + mutationValue * effect, startValue.z);
    }}

    if (mutationType == 5) {{
      result = vec3(startValue.xy, startValue.z * mutationValue.x);
    }}

    return result;
  }}

  vec3 mutatePoint(vec3 startValue, int mutationIndex) {{
    int currentNode = mutationIndex;
    vec3 result = startValue;

    for (int i = 0; i < {mutators}; i++) {{
      if (currentNode == -1) {{
        return result;
      }}
      result = mutateOnce(result, currentNode);
      currentNode = int(uMutationParent[currentNode]);
    }}
    return result;
  }}

  void main() {{
    vec3 deform = mutatePoint(vec3(coordinates + translate.xy, 1.0), int(mutation));

    vec4 pos = viewportScale * vec4((deform.xy + basePosition.xy) * scale.x, translate.z, 1.0);
    gl_Position = vec4((pos.xy + scale.ba) * scale.y, pos.z, 1.0);
    vTextureCoord = aTextureCoord.xy;
    vOpacity = deform.z;
  }}
"#
    )
}

fn fragment_shader() -> String {
    r#"
  precision mediump float;

  uniform sampler2D uSampler;
  uniform vec2 uTextureDimensions;

  varying lowp vec2 vTextureCoord;
  varying lowp float vOpacity;

  void main() {
    vec2 coord = vTextureCoord / uTextureDimensions;
    vec4 color = texture2D(uSampler, coord);
    gl_FragColor = vec4(color.rgb * color.a * vOpacity, color.a * vOpacity);
  }
"#
    .to_string()
}
