//! Renders classified events into the Japanese notification text sent to
//! subscribers.

use crate::core::{
    ClassifiedEvent, EarthquakeReport, EewAlert, NotificationMessage, ObservationPoint,
    ReportKind, TsunamiAdvisory,
};
use crate::scales::Intensity;
use chrono::NaiveDateTime;
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;

/// Sent instead of the advisory body when a tsunami advisory is lifted.
pub const TSUNAMI_CANCELLED: &str =
    "津波警報等（大津波警報・津波警報あるいは津波注意報）は解除されました。";

/// Sent instead of the template when an EEW is withdrawn.
pub const EEW_CANCELLED: &str = "先程の緊急地震速報は取り消されました。";

/// Appended to EEW messages estimated from a low-quality assumption.
pub const EEW_LOW_CONFIDENCE: &str = "※この緊急地震速報は精度が低い可能性があります※";

const TSUNAMI_SAFETY: &str = "津波は１mでも人や物を押し倒します！";

/// Matches the municipality prefix of an address (`…市`, `…区`, `…町`, `…村`).
static CITY_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([^市区町村]+[市区町村])").expect("static regex is valid"));

/// Renders a classified event into a notification. Returns `None` only for
/// ignored events, which callers are expected to filter out beforehand.
pub fn format_event(event: &ClassifiedEvent, title: &str) -> Option<NotificationMessage> {
    let kind = event.kind()?;
    let body = match event {
        ClassifiedEvent::EarthquakeReport(report) => format_earthquake_report(report),
        ClassifiedEvent::TsunamiAdvisory(advisory) => format_tsunami_advisory(advisory),
        ClassifiedEvent::EewAlert(alert) => format_eew_alert(alert),
        ClassifiedEvent::Ignored(_) => return None,
    };
    Some(NotificationMessage::new(kind, title, body))
}

pub fn format_earthquake_report(report: &EarthquakeReport) -> String {
    match report.kind {
        ReportKind::ScalePrompt => format_scale_prompt(report),
        ReportKind::Full => format_full_report(report),
    }
}

/// Intensity-only bulletin: one block per observed intensity, raw addresses.
fn format_scale_prompt(report: &EarthquakeReport) -> String {
    let (date, time) = split_origin_time(&report.time);
    let mut text = format!(
        "[震度速報]\n{} {}ころ、地震による強い揺れを感じました。震度３以上が観測された地域をお知らせします。\n",
        date, time
    );

    for (intensity, prefectures) in group_points(&report.points) {
        text.push_str(&format!("\n《震度{}》", intensity));
        for (pref, addrs) in prefectures {
            text.push_str(&format!("\n【{}】{}", pref, addrs.join("  ")));
        }
    }

    text
}

fn format_full_report(report: &EarthquakeReport) -> String {
    let (date, time) = split_origin_time(&report.time);
    let mut text = format!(
        "[地震情報]\n{} {}頃\n震源地：{}\n最大震度：{}\n深さ：{}\n規模：M{}\n{}\n\n［各地の震度］",
        date,
        time,
        report.hypocenter,
        report.max_intensity,
        report.depth,
        report.magnitude,
        report.domestic_tsunami.phrase(),
    );

    for (intensity, prefectures) in group_points(&report.points) {
        text.push_str(&format!("\n《震度{}》", intensity));
        for (pref, addrs) in prefectures {
            let cities = addrs.iter().map(|addr| city_of(addr)).unique().join("  ");
            text.push_str(&format!("\n【{}】{}", pref, cities));
        }
    }

    if let Some(comment) = &report.free_form_comment {
        text.push_str(&format!("\n\n【情報】\n{}", comment));
    }

    text
}

pub fn format_tsunami_advisory(advisory: &TsunamiAdvisory) -> String {
    if advisory.cancelled {
        return TSUNAMI_CANCELLED.to_string();
    }

    let grade = advisory.headline_grade();
    let areas = advisory
        .areas
        .iter()
        .map(|area| format!("［{}］{}", area.name, area.max_height))
        .join("\n");

    let mut text = format!("{}\n{}\n{}", grade.header(), areas, TSUNAMI_SAFETY);
    if let Some(emphasis) = grade.emphasis() {
        text.push('\n');
        text.push_str(emphasis);
    }
    text
}

pub fn format_eew_alert(alert: &EewAlert) -> String {
    if alert.cancelled {
        return EEW_CANCELLED.to_string();
    }

    let time_of_day = alert
        .origin_time
        .split_once(' ')
        .map_or(alert.origin_time.as_str(), |(_, time)| time);

    let mut text = format!(
        "【{title} 推定最大震度{max}】\n(第{serial}報)\n{time}頃、{hypo}を震源とする地震がありました。地震の規模はM{mag}程度、震源の深さは約{depth}km、最大震度{max}程度と推定されています。",
        title = alert.title,
        max = alert.max_intensity,
        serial = alert.serial,
        time = time_of_day,
        hypo = alert.hypocenter,
        mag = alert.magnitude,
        depth = alert.depth,
    );

    if alert.assumption {
        text.push('\n');
        text.push_str(EEW_LOW_CONFIDENCE);
    }
    text
}

/// Groups points by intensity (most severe first), then by prefecture in
/// first-seen order, keeping addresses in arrival order.
fn group_points(points: &[ObservationPoint]) -> Vec<(Intensity, Vec<(&str, Vec<&str>)>)> {
    let mut groups: Vec<(Intensity, Vec<(&str, Vec<&str>)>)> = Vec::new();

    for point in points {
        let index = match groups.iter().position(|(i, _)| *i == point.intensity) {
            Some(index) => index,
            None => {
                groups.push((point.intensity, Vec::new()));
                groups.len() - 1
            }
        };
        let prefectures = &mut groups[index].1;
        match prefectures.iter_mut().find(|(pref, _)| *pref == point.pref) {
            Some((_, addrs)) => addrs.push(point.addr.as_str()),
            None => prefectures.push((point.pref.as_str(), vec![point.addr.as_str()])),
        }
    }

    groups.sort_by_key(|(intensity, _)| intensity.severity_rank());
    groups
}

/// The municipality an address belongs to, or the whole address when it
/// carries no municipality suffix.
fn city_of(addr: &str) -> &str {
    CITY_PATTERN
        .captures(addr)
        .and_then(|c| c.get(1))
        .map_or(addr, |m| m.as_str())
}

/// Splits an upstream `YYYY/MM/DD HH:MM:SS` time into `MM/DD` and `HH:MM`.
/// Unparseable input is returned verbatim as the date with an empty time.
fn split_origin_time(raw: &str) -> (String, String) {
    match NaiveDateTime::parse_from_str(raw, "%Y/%m/%d %H:%M:%S") {
        Ok(t) => (t.format("%m/%d").to_string(), t.format("%H:%M").to_string()),
        Err(_) => (raw.to_string(), String::new()),
    }
}
