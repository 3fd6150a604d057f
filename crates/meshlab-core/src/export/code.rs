//! Portable code export.
//!
//! A [`CodeBundle`] is a standalone web page that redraws the scene with
//! three.js: markup, a stylesheet carrying the CSS-only fallback, and an ES
//! module holding the scene document plus a GLSL port of the field evaluator
//! and a JS port of the drift function.

use super::{Artifact, ExportError, ExportRequest};
use crate::drift::{DRIFT_AMPLITUDE, DRIFT_FREQ_X, DRIFT_FREQ_Y};
use crate::field::warp::WARP_TIME_SCALE;
use crate::field::WARP_EPSILON;
use crate::model::{WarpShape, POINT_CAPACITY};
use crate::snapshot::SceneSnapshot;

pub const THREE_MODULE_URL: &str = "https://unpkg.com/three@0.160.0/build/three.module.js";

/// Element the generated program mounts its canvas into.
pub const CONTAINER_ID: &str = "mesh-canvas-container";

const HTML_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>Mesh gradient</title>
  <link rel="stylesheet" href="{{STEM}}.css">
</head>
<body>
  <div id="{{CONTAINER}}" class="mesh-gradient"></div>
  <script type="module" src="{{STEM}}.js"></script>
</body>
</html>
"#;

const CONTAINER_CSS: &str = r#"html, body {
  margin: 0;
  height: 100%;
}

#{{CONTAINER}} {
  position: fixed;
  inset: 0;
}

#{{CONTAINER}} canvas {
  display: block;
  width: 100%;
  height: 100%;
}
"#;

const FRAGMENT_SHADER: &str = r#"precision highp float;

#define MAX_POINTS {{CAPACITY}}

uniform float uTime;
uniform float uNoiseStrength;
uniform float uWarp;
uniform float uWarpSize;
uniform int uWarpShape;
uniform vec3 uBackgroundColor;
uniform int uNumPoints;
uniform vec2 uPointPos[MAX_POINTS];
uniform vec3 uPointColor[MAX_POINTS];
uniform float uPointRadius[MAX_POINTS];
uniform float uPointIntensity[MAX_POINTS];

varying vec2 vUv;

float hash(vec2 p) {
  vec2 q = fract(p * vec2(123.34, 456.21));
  q += dot(q, q + 45.32);
  return fract(q.x * q.y);
}

float noise(vec2 p) {
  vec2 i = floor(p);
  vec2 f = fract(p);
  f = f * f * (3.0 - 2.0 * f);
  float a = hash(i);
  float b = hash(i + vec2(1.0, 0.0));
  float c = hash(i + vec2(0.0, 1.0));
  float d = hash(i + vec2(1.0, 1.0));
  return mix(mix(a, b, f.x), mix(c, d, f.x), f.y);
}

float fbm(vec2 p) {
  float v = 0.0;
  float a = 0.5;
  mat2 rot = mat2(0.8, 0.6, -0.6, 0.8);
  for (int i = 0; i < 4; i++) {
    v += a * noise(p);
    p = rot * p * 2.02;
    a *= 0.5;
  }
  return v;
}

vec2 warpFlow(vec2 p, float t, float size) {
  vec2 ps = p * size;
  vec2 q = vec2(fbm(ps + t), fbm(ps + 1.0 + t));
  vec2 r = vec2(fbm(ps + q + 0.17 * t), fbm(ps + q + 0.12 * t));
  return vec2(fbm(ps + r), fbm(ps + r + 1.5));
}

vec2 warpLiquid(vec2 p, float t, float size) {
  float f = fbm(p * size + t);
  float angle = f * 12.56;
  return vec2(cos(angle), sin(angle)) * f;
}

vec2 warpRows(vec2 p, float t, float size) {
  float bands = max(floor(size * 4.0), 1.0);
  float iy = floor(p.y * bands);
  float shift = fbm(vec2(iy * 1.5, t)) * 2.0 - 1.0;
  float jitter = noise(vec2(p.x * 10.0, iy)) * 0.05;
  return vec2(shift + jitter, 0.0);
}

vec2 warpColumns(vec2 p, float t, float size) {
  float bands = max(floor(size * 4.0), 1.0);
  float ix = floor(p.x * bands);
  float shift = fbm(vec2(ix * 1.5, t)) * 2.0 - 1.0;
  float jitter = noise(vec2(ix, p.y * 10.0)) * 0.05;
  return vec2(0.0, shift + jitter);
}

vec2 warpOffset(vec2 p) {
  float t = uTime * {{WARP_TIME_SCALE}};
  if (uWarpShape == 1) return warpLiquid(p, t, uWarpSize);
  if (uWarpShape == 2) return warpRows(p, t, uWarpSize);
  if (uWarpShape == 3) return warpColumns(p, t, uWarpSize);
  return warpFlow(p, t, uWarpSize);
}

float warpGain() {
  return (uWarpShape == 2 || uWarpShape == 3) ? 2.5 : 1.5;
}

vec3 screen(vec3 base, vec3 layer) {
  return 1.0 - (1.0 - base) * (1.0 - layer);
}

void main() {
  vec3 color = uBackgroundColor;
  bool warped = uWarp > {{WARP_EPSILON}};
  vec2 distortion = warped ? warpOffset(vUv) : vec2(0.0);
  float power = uWarp * warpGain();

  for (int i = 0; i < MAX_POINTS; i++) {
    if (i >= uNumPoints) break;
    vec2 sampleUv = vUv;
    if (warped) sampleUv += distortion * power * uPointRadius[i];
    float dist = distance(sampleUv, uPointPos[i]);
    float falloff = 1.0 - smoothstep(0.0, uPointRadius[i], dist);
    float influence = falloff * falloff * falloff * uPointIntensity[i];
    color = screen(color, uPointColor[i] * influence);
  }

  float staticGrain = hash(vUv);
  float animatedGrain = hash(vUv + fract(uTime * 1.37));
  float grain = mix(staticGrain, animatedGrain, 0.5) * uNoiseStrength - 0.5 * uNoiseStrength;

  gl_FragColor = vec4(clamp(color + grain, 0.0, 1.0), 1.0);
}
"#;

const VERTEX_SHADER: &str = r#"varying vec2 vUv;

void main() {
  vUv = uv;
  gl_Position = vec4(position, 1.0);
}
"#;

const PROGRAM_TEMPLATE: &str = r#"import * as THREE from '{{THREE}}';

const SCENE = {{SCENE}};
const CONFIG = SCENE.config;
const POINTS = SCENE.points;

const MAX_POINTS = {{CAPACITY}};
const DRIFT = { amplitude: {{DRIFT_AMPLITUDE}}, freqX: {{DRIFT_FREQ_X}}, freqY: {{DRIFT_FREQ_Y}} };

const vertexShader = `{{VERTEX}}`;

const fragmentShader = `{{FRAGMENT}}`;

function hexToVec3(hex) {
  const v = [1, 3, 5].map((i) => parseInt(hex.slice(i, i + 2), 16) / 255);
  return new THREE.Vector3(v[0], v[1], v[2]);
}

// Point i after `elapsed` seconds; matches the editor's drift exactly.
function drifted(point, i, elapsed) {
  const [x, y] = point.position;
  if (!CONFIG.isDrifting || CONFIG.animationSpeed <= 0) return [x, y];
  const t = elapsed * CONFIG.animationSpeed;
  const k = i + 1;
  return [
    x + Math.sin(t * k * DRIFT.freqX) * DRIFT.amplitude,
    y + (Math.cos(t * k * DRIFT.freqY) - 1) * DRIFT.amplitude,
  ];
}

const container = document.getElementById('{{CONTAINER}}');
const renderer = new THREE.WebGLRenderer({ antialias: false });
renderer.setPixelRatio(window.devicePixelRatio);
container.appendChild(renderer.domElement);

const scene = new THREE.Scene();
const camera = new THREE.OrthographicCamera(-1, 1, 1, -1, 0, 1);

const active = POINTS.slice(0, MAX_POINTS);
const pad = (list, fill) => list.concat(Array.from({ length: MAX_POINTS - list.length }, fill));

const uniforms = {
  uTime: { value: 0 },
  uNoiseStrength: { value: CONFIG.noiseStrength },
  uWarp: { value: CONFIG.warp },
  uWarpSize: { value: CONFIG.warpSize },
  uWarpShape: { value: CONFIG.warpShape },
  uBackgroundColor: { value: hexToVec3(CONFIG.backgroundColor) },
  uNumPoints: { value: active.length },
  uPointPos: { value: pad(active.map((p) => new THREE.Vector2(p.position[0], p.position[1])), () => new THREE.Vector2()) },
  uPointColor: { value: pad(active.map((p) => hexToVec3(p.color)), () => new THREE.Vector3()) },
  uPointRadius: { value: pad(active.map((p) => p.radius), () => 0) },
  uPointIntensity: { value: pad(active.map((p) => p.intensity), () => 0) },
};

const material = new THREE.ShaderMaterial({ uniforms, vertexShader, fragmentShader });
scene.add(new THREE.Mesh(new THREE.PlaneGeometry(2, 2), material));

function resize() {
  renderer.setSize(container.clientWidth, container.clientHeight, false);
}
window.addEventListener('resize', resize);
resize();

const start = performance.now();

function frame(now) {
  const elapsed = (now - start) / 1000;
  if (CONFIG.isAnimated) uniforms.uTime.value = elapsed;
  active.forEach((p, i) => {
    const [x, y] = drifted(p, i, elapsed);
    uniforms.uPointPos.value[i].set(x, y);
  });
  renderer.render(scene, camera);
  requestAnimationFrame(frame);
}
requestAnimationFrame(frame);
"#;

/// f32 constants printed so GLSL always sees a float literal.
fn glsl_float(v: f32) -> String {
    let s = v.to_string();
    if s.contains('.') || s.contains('e') {
        s
    } else {
        format!("{s}.0")
    }
}

/// CSS-only approximation of the scene.
///
/// One radial gradient per point, stacked with the `screen` blend mode over
/// the background color. Falloff, warp, grain and drift are not reproduced;
/// this is a static stand-in for contexts that cannot run shaders, not a
/// pixel match. CSS measures y from the top, so positions are flipped.
pub fn css_fallback(scene: &SceneSnapshot) -> String {
    let layers: Vec<String> = scene
        .points
        .iter()
        .map(|p| {
            let x = p.position.x * 100.0;
            let y = (1.0 - p.position.y) * 100.0;
            let reach = (p.radius * 50.0).clamp(1.0, 100.0);
            format!(
                "    radial-gradient(at {x:.1}% {y:.1}%, rgba({}, {}, {}, {:.2}) 0%, transparent {reach:.0}%)",
                p.color.r, p.color.g, p.color.b, p.intensity
            )
        })
        .collect();
    let blend = vec!["screen"; layers.len()].join(", ");

    format!(
        "/* Approximate fallback for contexts without WebGL; not pixel-exact. */\n\
         .mesh-gradient {{\n  \
           background-color: {};\n  \
           background-image:\n{};\n  \
           background-blend-mode: {blend};\n\
         }}\n",
        scene.config.background_color,
        layers.join(",\n"),
    )
}

/// The three files of a portable-code export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBundle {
    /// Shared file stem; the markup references `<stem>.css` and `<stem>.js`.
    pub stem: String,
    pub html: String,
    pub css: String,
    pub js: String,
}

impl CodeBundle {
    pub fn generate(req: &ExportRequest) -> Result<Self, ExportError> {
        let stem = format!("meshlab-code-{}", req.stamp);
        let document = req.scene.to_json()?;

        let html = HTML_TEMPLATE
            .replace("{{STEM}}", &stem)
            .replace("{{CONTAINER}}", CONTAINER_ID);

        let css = format!(
            "{}\n{}",
            CONTAINER_CSS.replace("{{CONTAINER}}", CONTAINER_ID),
            css_fallback(&req.scene)
        );

        let fragment = FRAGMENT_SHADER
            .replace("{{CAPACITY}}", &POINT_CAPACITY.to_string())
            .replace("{{WARP_TIME_SCALE}}", &glsl_float(WARP_TIME_SCALE))
            .replace("{{WARP_EPSILON}}", &glsl_float(WARP_EPSILON));

        let js = PROGRAM_TEMPLATE
            .replace("{{THREE}}", THREE_MODULE_URL)
            .replace("{{CAPACITY}}", &POINT_CAPACITY.to_string())
            .replace("{{DRIFT_AMPLITUDE}}", &DRIFT_AMPLITUDE.to_string())
            .replace("{{DRIFT_FREQ_X}}", &DRIFT_FREQ_X.to_string())
            .replace("{{DRIFT_FREQ_Y}}", &DRIFT_FREQ_Y.to_string())
            .replace("{{VERTEX}}", VERTEX_SHADER)
            .replace("{{FRAGMENT}}", &fragment)
            .replace("{{CONTAINER}}", CONTAINER_ID)
            // Scene text is user data; it goes in last so no later pass rescans it.
            .replace("{{SCENE}}", &document);

        Ok(Self {
            stem,
            html,
            css,
            js,
        })
    }

    /// All three files as one text, for the clipboard.
    pub fn concatenated(&self) -> String {
        format!(
            "<!-- {stem}.html -->\n{}\n/* {stem}.css */\n{}\n// {stem}.js\n{}",
            self.html,
            self.css,
            self.js,
            stem = self.stem
        )
    }

    pub fn artifacts(&self) -> Vec<Artifact> {
        vec![
            Artifact::new(format!("{}.html", self.stem), self.html.as_str()),
            Artifact::new(format!("{}.css", self.stem), self.css.as_str()),
            Artifact::new(format!("{}.js", self.stem), self.js.as_str()),
        ]
    }
}

/// GLSL function implementing each warp shape, in table order.
pub fn glsl_warp_function(shape: WarpShape) -> &'static str {
    match shape {
        WarpShape::Flow => "warpFlow",
        WarpShape::Liquid => "warpLiquid",
        WarpShape::Rows => "warpRows",
        WarpShape::Columns => "warpColumns",
    }
}
