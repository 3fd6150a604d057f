//! Lottie-style motion document.
//!
//! One solid layer for the background and one shape layer per point. Points
//! are drawn as radially filled ellipses whose position track samples the
//! drift function once per frame.

use serde_json::{json, Value};

use super::video::VIDEO_FPS;
use super::ExportRequest;
use crate::coords::HexColor;
use crate::drift::drifted;
use crate::model::GradientPoint;

pub const LOTTIE_VERSION: &str = "5.7.4";

const LAYER_SOLID: u8 = 1;
const LAYER_SHAPE: u8 = 4;
const GRADIENT_RADIAL: u8 = 2;

fn unit_rgb(c: HexColor) -> [f64; 3] {
    [c.r, c.g, c.b].map(|v| f64::from(v) / 255.0)
}

fn static_value(k: Value) -> Value {
    json!({ "a": 0, "k": k })
}

/// Position keyframes for `t = 0..=frames`, in pixels with y pointing down.
fn position_track(point: &GradientPoint, index: usize, req: &ExportRequest, w: f64, h: f64, frames: u32) -> Value {
    let config = &req.scene.config;
    let keys: Vec<Value> = (0..=frames)
        .map(|t| {
            let elapsed = f64::from(t) / f64::from(VIDEO_FPS);
            let [x, y] = drifted(point.position, index, elapsed, config, false);
            json!({ "t": t, "s": [x * w, (1.0 - y) * h] })
        })
        .collect();
    json!({ "a": 1, "k": keys })
}

fn point_layer(point: &GradientPoint, index: usize, req: &ExportRequest, w: f64, h: f64, frames: u32) -> Value {
    let diameter = 2.0 * f64::from(point.radius) * w.min(h);
    let [r, g, b] = unit_rgb(point.color);
    // Two color stops, then two opacity stops: solid at the centre, clear at the rim.
    let stops = json!([0, r, g, b, 1, r, g, b, 0, 1, 1, 0]);

    json!({
        "ddd": 0,
        "ind": index + 2,
        "ty": LAYER_SHAPE,
        "nm": format!("P{}", index + 1),
        "sr": 1,
        "ks": {
            "o": static_value(json!(f64::from(point.intensity) * 100.0)),
            "r": static_value(json!(0)),
            "p": position_track(point, index, req, w, h, frames),
            "a": static_value(json!([0, 0])),
            "s": static_value(json!([100, 100])),
        },
        "ao": 0,
        "shapes": [{
            "ty": "gr",
            "nm": "blob",
            "it": [
                {
                    "ty": "el",
                    "d": 1,
                    "p": static_value(json!([0, 0])),
                    "s": static_value(json!([diameter, diameter])),
                },
                {
                    "ty": "gf",
                    "t": GRADIENT_RADIAL,
                    "o": static_value(json!(100)),
                    "r": 1,
                    "bm": 0,
                    "g": { "p": 2, "k": static_value(stops) },
                    "s": static_value(json!([0, 0])),
                    "e": static_value(json!([diameter / 2.0, 0])),
                },
                {
                    "ty": "tr",
                    "p": static_value(json!([0, 0])),
                    "a": static_value(json!([0, 0])),
                    "s": static_value(json!([100, 100])),
                    "r": static_value(json!(0)),
                    "o": static_value(json!(100)),
                }
            ],
        }],
        "ip": 0,
        "op": frames,
        "st": 0,
        "bm": 0,
    })
}

/// Builds the motion document for the request's format, multiplier and
/// duration.
pub fn motion_document(req: &ExportRequest) -> Value {
    let (w, h) = req.settings.target_size();
    let frames = VIDEO_FPS * req.settings.duration.seconds();
    let (wf, hf) = (f64::from(w), f64::from(h));

    let mut layers: Vec<Value> = req
        .scene
        .points
        .iter()
        .enumerate()
        .map(|(i, p)| point_layer(p, i, req, wf, hf, frames))
        .collect();
    layers.push(json!({
        "ddd": 0,
        "ind": 1,
        "ty": LAYER_SOLID,
        "nm": "background",
        "sc": req.scene.config.background_color.to_string(),
        "sw": w,
        "sh": h,
        "ks": {
            "o": static_value(json!(100)),
            "r": static_value(json!(0)),
            "p": static_value(json!([wf / 2.0, hf / 2.0])),
            "a": static_value(json!([wf / 2.0, hf / 2.0])),
            "s": static_value(json!([100, 100])),
        },
        "ip": 0,
        "op": frames,
        "st": 0,
        "bm": 0,
    }));

    json!({
        "v": LOTTIE_VERSION,
        "fr": VIDEO_FPS,
        "ip": 0,
        "op": frames,
        "w": w,
        "h": h,
        "nm": format!("meshlab-{}", req.settings.format.name()),
        "ddd": 0,
        "assets": [],
        "layers": layers,
    })
}

/// `meshlab-<format>-<mult>x-<stamp>.json`
pub fn motion_filename(req: &ExportRequest) -> String {
    req.media_filename("json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::Vec2;
    use crate::export::testing::request;
    use crate::model::{ExportDuration, ExportFormat, ExportPatch};

    fn track(doc: &Value, layer: usize) -> &Vec<Value> {
        doc["layers"][layer]["ks"]["p"]["k"].as_array().unwrap()
    }

    #[test]
    fn header_follows_export_settings() {
        let mut req = request();
        req.settings.apply(&ExportPatch {
            format: Some(ExportFormat::Portrait),
            multiplier: Some(2),
            duration: Some(ExportDuration::Fifteen),
        });
        let doc = motion_document(&req);
        assert_eq!(doc["v"], "5.7.4");
        assert_eq!(doc["fr"], 30);
        assert_eq!(doc["ip"], 0);
        assert_eq!(doc["op"], 450);
        assert_eq!((doc["w"].as_u64(), doc["h"].as_u64()), (Some(2160), Some(3840)));
    }

    #[test]
    fn one_layer_per_point_plus_background() {
        let req = request();
        let doc = motion_document(&req);
        let layers = doc["layers"].as_array().unwrap();
        assert_eq!(layers.len(), req.scene.points.len() + 1);
        let bg = layers.last().unwrap();
        assert_eq!(bg["ty"], 1);
        assert_eq!(bg["sc"], "#171717");
    }

    #[test]
    fn keyframe_count_is_frame_count_plus_one() {
        let req = request();
        let doc = motion_document(&req);
        for i in 0..req.scene.points.len() {
            let keys = track(&doc, i);
            assert_eq!(keys.len(), 151);
            assert_eq!(keys[0]["t"], 0);
            assert_eq!(keys[150]["t"], 150);
        }
    }

    #[test]
    fn first_key_is_base_position_with_y_flipped() {
        let req = request();
        let doc = motion_document(&req);
        let s = &track(&doc, 0)[0]["s"];
        let base = req.scene.points[0].position;
        let (x, y) = (s[0].as_f64().unwrap(), s[1].as_f64().unwrap());
        assert!((x - f64::from(base.x) * 1920.0).abs() < 1e-6);
        assert!((y - (1.0 - f64::from(base.y)) * 1080.0).abs() < 1e-6);
    }

    #[test]
    fn keys_follow_the_shared_drift_function() {
        let req = request();
        let doc = motion_document(&req);
        let p = &req.scene.points[1];
        for (t, key) in track(&doc, 1).iter().enumerate() {
            let [x, y] = drifted(p.position, 1, t as f64 / 30.0, &req.scene.config, false);
            let s = &key["s"];
            assert!((s[0].as_f64().unwrap() - x * 1920.0).abs() < 1e-9 * 1920.0);
            assert!((s[1].as_f64().unwrap() - (1.0 - y) * 1080.0).abs() < 1e-9 * 1080.0);
        }
    }

    #[test]
    fn ellipse_diameter_scales_with_short_side() {
        let mut req = request();
        req.scene.points[0].position = Vec2::new(0.5, 0.5);
        let doc = motion_document(&req);
        let el = &doc["layers"][0]["shapes"][0]["it"][0];
        assert_eq!(el["ty"], "el");
        let d = el["s"]["k"][0].as_f64().unwrap();
        let expected = 2.0 * f64::from(req.scene.points[0].radius) * 1080.0;
        assert!((d - expected).abs() < 1e-6);
    }

    #[test]
    fn still_scene_has_flat_track() {
        let mut req = request();
        req.scene.config.is_drifting = false;
        let doc = motion_document(&req);
        let keys = track(&doc, 2);
        assert!(keys.iter().all(|k| k["s"] == keys[0]["s"]));
    }

    #[test]
    fn document_is_deterministic() {
        let req = request();
        assert_eq!(motion_document(&req), motion_document(&req));
    }
}
