//! Frame decoding and classification.
//!
//! Turns the raw JSON text read from a feed into a [`ClassifiedEvent`]. Every
//! function here is pure: no I/O, no shared state, same output for the same
//! input.

use crate::core::{
    ClassifiedEvent, EarthquakeReport, EewAlert, Feed, IgnoreReason, ObservationPoint,
    ReportKind, TsunamiAdvisory, TsunamiArea,
};
use crate::scales::{Depth, DomesticTsunami, Intensity, Magnitude, TsunamiGrade};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Quake-feed discriminator for earthquake information.
pub const CODE_EARTHQUAKE: i64 = 551;
/// Quake-feed discriminator for tsunami forecasts.
pub const CODE_TSUNAMI: i64 = 552;

/// Placeholder for EEW template fields the upstream left out.
const MISSING_FIELD: &str = "不明";

#[derive(Debug, Error)]
pub enum FrameError {
    /// The frame text is not JSON at all.
    #[error("frame is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),

    /// A code 551 frame without its `earthquake` object.
    #[error("code 551 frame has no earthquake data")]
    MissingEarthquake,

    /// A live (not cancelled) code 552 frame that names no areas.
    #[error("code 552 frame has no tsunami areas")]
    NoTsunamiAreas,

    /// A recognized frame whose substructure has the wrong shape.
    #[error("code {code} frame is malformed: {source}")]
    Malformed {
        code: i64,
        #[source]
        source: serde_json::Error,
    },
}

/// Decodes one text frame into a JSON value.
pub fn decode_frame(text: &str) -> Result<Value, FrameError> {
    Ok(serde_json::from_str(text)?)
}

/// Classifies a decoded frame according to the feed it arrived on.
pub fn classify(feed: Feed, frame: &Value) -> Result<ClassifiedEvent, FrameError> {
    match feed {
        Feed::Quake => classify_quake(frame),
        Feed::Eew => Ok(classify_eew(frame)),
    }
}

/// Classifies a frame from the general quake/tsunami feed by its `code`.
pub fn classify_quake(frame: &Value) -> Result<ClassifiedEvent, FrameError> {
    let Some(code) = frame.get("code").and_then(Value::as_i64) else {
        return Ok(ClassifiedEvent::Ignored(IgnoreReason::MissingCode));
    };

    match code {
        CODE_EARTHQUAKE => earthquake_report(frame).map(ClassifiedEvent::EarthquakeReport),
        CODE_TSUNAMI => tsunami_advisory(frame).map(ClassifiedEvent::TsunamiAdvisory),
        other => Ok(ClassifiedEvent::Ignored(IgnoreReason::UnhandledCode(other))),
    }
}

/// Classifies a frame from the EEW feed. Anything lacking both a title and
/// an alert type (heartbeats, status frames) is ignored.
pub fn classify_eew(frame: &Value) -> ClassifiedEvent {
    let title = display_text(frame.get("Title")).filter(|s| !s.is_empty());
    let code_type = display_text(frame.get("CodeType")).filter(|s| !s.is_empty());

    let (Some(title), Some(code_type)) = (title, code_type) else {
        return ClassifiedEvent::Ignored(IgnoreReason::NotAnAlert);
    };

    let field = |name: &str| display_text(frame.get(name)).unwrap_or_else(|| MISSING_FIELD.to_string());

    ClassifiedEvent::EewAlert(EewAlert {
        title,
        code_type,
        cancelled: truthy(frame.get("isCancel")),
        assumption: truthy(frame.get("isAssumption")),
        serial: field("Serial"),
        hypocenter: field("Hypocenter"),
        origin_time: field("OriginTime"),
        max_intensity: field("MaxIntensity"),
        // Upstream spells it this way.
        magnitude: field("Magunitude"),
        depth: field("Depth"),
    })
}

fn earthquake_report(frame: &Value) -> Result<EarthquakeReport, FrameError> {
    // Temporary structs mirroring the P2PQuake JSON layout
    #[derive(Deserialize)]
    struct EarthquakeFrame {
        earthquake: EarthquakeData,
        #[serde(default)]
        points: Vec<PointData>,
        #[serde(default)]
        issue: Option<IssueData>,
        #[serde(default)]
        comments: Option<CommentsData>,
    }

    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct EarthquakeData {
        #[serde(default)]
        time: String,
        #[serde(default)]
        hypocenter: Option<HypocenterData>,
        #[serde(default)]
        max_scale: Option<i64>,
        #[serde(default)]
        domestic_tsunami: Option<String>,
    }

    #[derive(Deserialize)]
    struct HypocenterData {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        magnitude: Option<f64>,
        #[serde(default)]
        depth: Option<i64>,
    }

    #[derive(Deserialize)]
    struct PointData {
        #[serde(default)]
        scale: Option<i64>,
        #[serde(default)]
        addr: String,
        #[serde(default)]
        pref: String,
    }

    #[derive(Deserialize)]
    struct IssueData {
        #[serde(rename = "type", default)]
        kind: Option<String>,
    }

    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct CommentsData {
        #[serde(default)]
        free_form_comment: Option<String>,
    }

    if frame.get("earthquake").map_or(true, Value::is_null) {
        return Err(FrameError::MissingEarthquake);
    }

    let data = EarthquakeFrame::deserialize(frame).map_err(|source| FrameError::Malformed {
        code: CODE_EARTHQUAKE,
        source,
    })?;

    let kind = match data.issue.and_then(|issue| issue.kind).as_deref() {
        Some("ScalePrompt") => ReportKind::ScalePrompt,
        _ => ReportKind::Full,
    };

    let hypocenter = data.earthquake.hypocenter;
    let (name, magnitude, depth) = match hypocenter {
        Some(h) => (
            h.name.unwrap_or_default(),
            h.magnitude.unwrap_or(-1.0),
            h.depth.unwrap_or(-1),
        ),
        None => (String::new(), -1.0, -1),
    };

    let points = data
        .points
        .into_iter()
        .map(|p| ObservationPoint {
            intensity: Intensity::from_code(p.scale.unwrap_or_default()),
            addr: p.addr,
            pref: p.pref,
        })
        .collect();

    Ok(EarthquakeReport {
        kind,
        time: data.earthquake.time,
        hypocenter: name,
        magnitude: Magnitude::from_raw(magnitude),
        depth: Depth::from_km(depth),
        max_intensity: Intensity::from_code(data.earthquake.max_scale.unwrap_or_default()),
        domestic_tsunami: DomesticTsunami::from_code(
            data.earthquake.domestic_tsunami.as_deref().unwrap_or_default(),
        ),
        points,
        free_form_comment: data
            .comments
            .and_then(|c| c.free_form_comment)
            .filter(|c| !c.is_empty()),
    })
}

fn tsunami_advisory(frame: &Value) -> Result<TsunamiAdvisory, FrameError> {
    #[derive(Deserialize)]
    struct TsunamiFrame {
        #[serde(default)]
        cancelled: Option<bool>,
        #[serde(default)]
        areas: Option<Vec<AreaData>>,
    }

    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct AreaData {
        #[serde(default)]
        name: String,
        #[serde(default)]
        grade: Option<String>,
        #[serde(default)]
        max_height: Option<MaxHeightData>,
    }

    #[derive(Deserialize)]
    struct MaxHeightData {
        #[serde(default)]
        description: String,
    }

    let data = TsunamiFrame::deserialize(frame).map_err(|source| FrameError::Malformed {
        code: CODE_TSUNAMI,
        source,
    })?;

    let cancelled = data.cancelled.unwrap_or(false);
    let areas: Vec<TsunamiArea> = data
        .areas
        .unwrap_or_default()
        .into_iter()
        .map(|a| TsunamiArea {
            name: a.name,
            grade: TsunamiGrade::from_code(a.grade.as_deref().unwrap_or_default()),
            max_height: a.max_height.map(|h| h.description).unwrap_or_default(),
        })
        .collect();

    if !cancelled && areas.is_empty() {
        return Err(FrameError::NoTsunamiAreas);
    }

    Ok(TsunamiAdvisory { cancelled, areas })
}

/// Renders a JSON scalar the way it would appear interpolated into text:
/// strings verbatim, integral numbers without a fractional part.
fn display_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => i.to_string(),
            (None, Some(f)) => f.to_string(),
            (None, None) => n.to_string(),
        }),
        other => Some(other.to_string()),
    }
}

fn truthy(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
        Some(Value::Null) | None => false,
    }
}
