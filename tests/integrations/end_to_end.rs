//! End-to-end tests: upstream frames in, rendered notifications out.

#[path = "../helpers/mod.rs"]
mod helpers;

use helpers::fixtures;
use helpers::mock_sinks::{subscription, RecordingBroadcast, RecordingPushSender};
use helpers::mock_ws::{Attempt, GatedConnector, RoutingConnector, ScriptedConnection, ScriptedConnector};
use helpers::{test_config, wait_until};
use quakewatch::app::App;
use quakewatch::core::{Feed, FrameHandler};
use quakewatch::dispatcher::Dispatcher;
use quakewatch::formatting::{EEW_LOW_CONFIDENCE, TSUNAMI_CANCELLED};
use quakewatch::internal_metrics::Metrics;
use quakewatch::pipeline::Pipeline;
use quakewatch::registry::SubscriberRegistry;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

const TIMEOUT: Duration = Duration::from_secs(5);

struct Harness {
    pipeline: Pipeline,
    sender: Arc<RecordingPushSender>,
    broadcast: Arc<RecordingBroadcast>,
}

fn harness() -> Harness {
    let registry = Arc::new(SubscriberRegistry::new());
    registry.register(subscription("https://push.test/only"));
    let sender = Arc::new(RecordingPushSender::new());
    let broadcast = Arc::new(RecordingBroadcast::new());
    let dispatcher = Dispatcher::new(
        registry,
        Some(sender.clone()),
        Some(broadcast.clone()),
        4,
        Metrics::disabled(),
    );
    Harness {
        pipeline: Pipeline::new(dispatcher, "地震情報".to_string(), Metrics::disabled()),
        sender,
        broadcast,
    }
}

impl Harness {
    async fn body_for(&self, feed: Feed, frame: serde_json::Value) -> String {
        self.pipeline.handle_frame(feed, &frame.to_string());
        wait_until(TIMEOUT, || !self.sender.sent().is_empty()).await;
        let (_, payload) = self.sender.sent().remove(0);
        assert_eq!(payload["title"], "地震情報");
        payload["body"].as_str().unwrap().to_string()
    }
}

#[tokio::test]
async fn test_earthquake_report_end_to_end() {
    let h = harness();
    let body = h
        .body_for(Feed::Quake, fixtures::earthquake_report(60, 5.2, "None", (60, "Tokyo", "Kanto")))
        .await;

    assert!(body.starts_with("[地震情報]\n01/01 16:10頃\n震源地：石川県能登地方\n"), "{}", body);
    assert!(body.contains("最大震度：6強"));
    assert!(body.contains("深さ：約10km"));
    assert!(body.contains("規模：M5.2"));
    assert!(body.contains("この地震による津波の心配はありません。"));
    assert!(body.ends_with("［各地の震度］\n《震度6強》\n【Kanto】Tokyo"), "{}", body);
    assert!(h.broadcast.attempts().is_empty());
}

#[tokio::test]
async fn test_scale_prompt_end_to_end() {
    let h = harness();
    let body = h.body_for(Feed::Quake, fixtures::scale_prompt()).await;

    assert_eq!(
        body,
        "[震度速報]\n01/01 16:10ころ、地震による強い揺れを感じました。震度３以上が観測された地域をお知らせします。\n\
         \n《震度7》\n【石川県】石川県能登\
         \n《震度6強》\n【石川県】石川県加賀"
    );
}

#[tokio::test]
async fn test_cancelled_tsunami_end_to_end() {
    let h = harness();
    let body = h.body_for(Feed::Quake, fixtures::tsunami_cancelled()).await;

    assert_eq!(body, TSUNAMI_CANCELLED);
    wait_until(TIMEOUT, || !h.broadcast.attempts().is_empty()).await;
    assert_eq!(h.broadcast.attempts(), vec![TSUNAMI_CANCELLED]);
}

#[tokio::test]
async fn test_major_tsunami_warning_end_to_end() {
    let h = harness();
    let body = h
        .body_for(
            Feed::Quake,
            fixtures::tsunami_advisory("MajorWarning", &[("石川県能登", "５ｍ"), ("新潟県上中下越", "３ｍ")]),
        )
        .await;

    assert!(body.starts_with("【大津波警報🟪】"));
    assert!(body.contains("［石川県能登］５ｍ\n［新潟県上中下越］３ｍ"));
    assert!(body.ends_with("津波は１mでも人や物を押し倒します！\n⚠️絶対に避難⚠️"));
}

#[tokio::test]
async fn test_low_confidence_eew_end_to_end() {
    let h = harness();
    let body = h.body_for(Feed::Eew, fixtures::eew(false, true)).await;

    assert_eq!(
        body,
        format!(
            "【緊急地震速報（予報） 推定最大震度5弱】\n(第3報)\n16:10:09頃、石川県能登地方を震源とする地震がありました。地震の規模はM5.9程度、震源の深さは約10km、最大震度5弱程度と推定されています。\n{}",
            EEW_LOW_CONFIDENCE
        )
    );
}

#[tokio::test]
async fn test_ignored_frames_produce_nothing() {
    let h = harness();
    h.pipeline.handle_frame(Feed::Quake, &fixtures::user_quake_report().to_string());
    h.pipeline.handle_frame(Feed::Eew, &fixtures::eew_heartbeat().to_string());
    h.pipeline.handle_frame(Feed::Quake, "garbage");
    h.pipeline.handle_frame(Feed::Quake, &json!({ "code": 551 }).to_string());

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(h.sender.sent().is_empty());
}

#[tokio::test]
async fn test_live_tsunami_without_areas_is_dropped() {
    let h = harness();
    h.pipeline
        .handle_frame(Feed::Quake, &fixtures::tsunami_advisory("Warning", &[]).to_string());

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(h.sender.sent().is_empty());
    assert!(h.broadcast.attempts().is_empty());
}

#[tokio::test]
async fn test_unrecognized_tsunami_grade_end_to_end() {
    let h = harness();
    let body = h
        .body_for(Feed::Quake, fixtures::tsunami_advisory("Forecast", &[("A", "0.2m")]))
        .await;

    assert!(body.starts_with("【津波情報】\n津波の状況が不明です。\n【対象地域】\n［A］0.2m\n"), "{}", body);
    assert!(!body.contains("プログラムエラー"));
    wait_until(TIMEOUT, || !h.broadcast.attempts().is_empty()).await;
}

#[tokio::test]
async fn test_app_relays_both_feeds_to_http_subscriber() {
    let config = test_config();
    let quake_url = config.feeds.quake_url.clone();
    let eew_url = config.feeds.eew_url.clone();

    let routes = Arc::new(RoutingConnector::new(vec![
        (
            quake_url.as_str(),
            ScriptedConnector::new(vec![Attempt::Accept(
                ScriptedConnection::new()
                    .text(fixtures::earthquake_report(60, 5.2, "None", (60, "Tokyo", "Kanto")).to_string())
                    .text(fixtures::tsunami_cancelled().to_string())
                    .hold_open(),
            )]),
        ),
        (
            eew_url.as_str(),
            ScriptedConnector::new(vec![Attempt::Accept(
                ScriptedConnection::new()
                    .text(fixtures::eew_heartbeat().to_string())
                    .text(fixtures::eew(false, true).to_string())
                    .hold_open(),
            )]),
        ),
    ]));
    let gate = Arc::new(GatedConnector::new(routes));
    let sender = Arc::new(RecordingPushSender::new());
    let broadcast = Arc::new(RecordingBroadcast::new());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let app = App::builder(config)
        .connector_override(gate.clone())
        .push_sender_override(sender.clone())
        .broadcast_override(broadcast.clone())
        .metrics_override(Metrics::disabled())
        .build(shutdown_rx)
        .await
        .unwrap();

    let response = reqwest::Client::new()
        .post(format!("http://{}/subscribe", app.api_addr()))
        .json(&subscription("https://push.test/browser"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::CREATED);
    assert_eq!(app.registry().len(), 1);

    gate.open();
    wait_until(TIMEOUT, || sender.sent().len() == 3).await;

    let bodies = sender.bodies();
    assert!(bodies.iter().any(|b| b.contains("【Kanto】Tokyo")));
    assert!(bodies.iter().any(|b| b == TSUNAMI_CANCELLED));
    assert!(bodies.iter().any(|b| b.ends_with(EEW_LOW_CONFIDENCE)));
    wait_until(TIMEOUT, || broadcast.attempts().len() == 1).await;

    shutdown_tx.send(true).unwrap();
    tokio::time::timeout(TIMEOUT, app.run()).await.unwrap().unwrap();
}
