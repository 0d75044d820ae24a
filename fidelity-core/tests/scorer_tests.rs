use async_trait::async_trait;
use fidelity_core::aggregate::TARGET_MET;
use fidelity_core::{
    AssetKind, AssetRef, ConfigError, FidelityScorer, Modality, Node, NodeKind, Page,
    ScoreError, ScorerConfig, SemanticJudge, SiteSnapshot, VisualConfig,
};
use fidelity_judge::{JudgeError, VisionModel};
use image::{ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

const PERFECT_REPLY: &str = r#"{"layout_similarity": 10, "visual_hierarchy": 10,
    "color_scheme": 10, "typography": 10, "spacing": 10, "component_placement": 10,
    "overall_impression": "Indistinguishable", "notable_differences": []}"#;

struct CannedJudge {
    reply: &'static str,
    calls: AtomicUsize,
}

impl CannedJudge {
    fn new(reply: &'static str) -> Self {
        Self {
            reply,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl VisionModel for CannedJudge {
    async fn complete(
        &self,
        _prompt: &str,
        images: &[&[u8]],
    ) -> fidelity_judge::error::Result<String> {
        assert_eq!(images.len(), 2);
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.reply.to_string())
    }
}

struct SlowJudge;

#[async_trait]
impl VisionModel for SlowJudge {
    async fn complete(
        &self,
        _prompt: &str,
        _images: &[&[u8]],
    ) -> fidelity_judge::error::Result<String> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Err(JudgeError::EmptyResponse)
    }
}

struct PanickingJudge;

#[async_trait]
impl VisionModel for PanickingJudge {
    async fn complete(
        &self,
        _prompt: &str,
        _images: &[&[u8]],
    ) -> fidelity_judge::error::Result<String> {
        panic!("judge exploded");
    }
}

fn png(image: &RgbImage) -> Vec<u8> {
    let mut bytes = Cursor::new(Vec::new());
    image.write_to(&mut bytes, ImageFormat::Png).unwrap();
    bytes.into_inner()
}

fn screenshot() -> Vec<u8> {
    png(&RgbImage::from_fn(32, 48, |x, y| {
        Rgb([(x * 7 % 256) as u8, (y * 5 % 256) as u8, 200])
    }))
}

/// One page, ten elements, two of them carrying image assets.
fn site(screenshot: Vec<u8>) -> Arc<SiteSnapshot> {
    let mut elements = vec![
        Node::new(NodeKind::Header).with_child(Node::new(NodeKind::Navigation)),
        Node::new(NodeKind::Hero).with_text("Handmade furniture"),
        Node::new(NodeKind::Image).with_asset(AssetRef::new(AssetKind::Image, "chair.jpg")),
        Node::new(NodeKind::Image).with_asset(AssetRef::new(AssetKind::Image, "table.jpg")),
    ];
    elements.extend(
        ["Oak", "Walnut", "Cherry"]
            .iter()
            .map(|t| Node::new(NodeKind::Paragraph).with_text(*t)),
    );
    elements.push(Node::new(NodeKind::Button).with_text("Order now"));
    elements.push(Node::new(NodeKind::Footer));
    Arc::new(SiteSnapshot::new(screenshot, vec![Page::new(elements)]))
}

fn config() -> ScorerConfig {
    ScorerConfig {
        visual: VisualConfig { canvas_width: 32 },
        judge_timeout_ms: 2_000,
        ..ScorerConfig::default()
    }
}

#[test]
fn test_scorer_rejects_invalid_config() {
    let bad = ScorerConfig {
        visual: VisualConfig { canvas_width: 0 },
        ..ScorerConfig::default()
    };
    assert!(matches!(
        FidelityScorer::new(bad, SemanticJudge::disabled()),
        Err(ConfigError::ZeroCanvasWidth)
    ));

    let bad = ScorerConfig {
        judge_timeout_ms: 0,
        ..ScorerConfig::default()
    };
    assert!(matches!(
        FidelityScorer::new(bad, SemanticJudge::disabled()),
        Err(ConfigError::ZeroJudgeTimeout)
    ));
}

#[tokio::test]
async fn test_identical_sites_score_one() {
    let judge = Arc::new(CannedJudge::new(PERFECT_REPLY));
    let scorer = FidelityScorer::new(config(), SemanticJudge::new(judge.clone())).unwrap();

    let source = site(screenshot());
    let target = site(screenshot());
    let report = scorer.score(source, target).await;

    assert!((report.overall_score() - 1.0).abs() < 1e-9);
    assert!(report.meets_target());
    assert_eq!(report.recommendations(), &[TARGET_MET.to_string()]);
    for modality in Modality::ALL {
        let result = report.sub_score(modality).unwrap();
        assert!((result.score() - 1.0).abs() < 1e-9, "{} was {}", modality, result.score());
    }
    assert_eq!(judge.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_without_judge_semantic_is_neutral() {
    let scorer = FidelityScorer::new(config(), SemanticJudge::disabled()).unwrap();
    let report = scorer.score(site(screenshot()), site(screenshot())).await;

    let semantic = report.sub_score(Modality::Semantic).unwrap();
    assert_eq!(semantic.score(), 0.5);
    assert_eq!(semantic.error(), Some("semantic judge not configured"));

    // 0.85 from the local modalities plus 0.15 * 0.5
    assert!((report.overall_score() - 0.925).abs() < 1e-9);
    assert!(report.meets_target());
}

#[tokio::test]
async fn test_slow_judge_times_out_to_neutral() {
    let config = ScorerConfig {
        judge_timeout_ms: 50,
        ..config()
    };
    let timeout = config.judge_timeout();
    let scorer = FidelityScorer::new(config, SemanticJudge::new(Arc::new(SlowJudge))).unwrap();

    let started = Instant::now();
    let report = scorer.score(site(screenshot()), site(screenshot())).await;
    let elapsed = started.elapsed();

    // The judge sleeps for 30s; the run must not wait for it.
    assert!(
        elapsed < timeout + Duration::from_secs(5),
        "scoring took {:?}",
        elapsed
    );

    let semantic = report.sub_score(Modality::Semantic).unwrap();
    assert_eq!(semantic.score(), 0.5);
    assert!(semantic.error().unwrap().contains("timed out"));
    assert!((report.sub_score(Modality::Visual).unwrap().score() - 1.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_panicking_judge_degrades_semantic_only() {
    let scorer =
        FidelityScorer::new(config(), SemanticJudge::new(Arc::new(PanickingJudge))).unwrap();
    let report = scorer.score(site(screenshot()), site(screenshot())).await;

    let semantic = report.sub_score(Modality::Semantic).unwrap();
    assert_eq!(semantic.score(), 0.5);
    assert!(semantic.error().is_some());
    assert!((report.sub_score(Modality::Content).unwrap().score() - 1.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_undecodable_target_screenshot_still_completes() {
    let judge = Arc::new(CannedJudge::new(PERFECT_REPLY));
    let scorer = FidelityScorer::new(config(), SemanticJudge::new(judge)).unwrap();
    let report = scorer
        .score(site(screenshot()), site(b"not a png".to_vec()))
        .await;

    let visual = report.sub_score(Modality::Visual).unwrap();
    assert_eq!(visual.score(), 0.0);
    assert!(visual.error().is_some());
    assert!((report.sub_score(Modality::Structural).unwrap().score() - 1.0).abs() < 1e-9);
    assert!((report.overall_score() - 0.65).abs() < 1e-9);
    assert!(!report.meets_target());
}

#[tokio::test]
async fn test_cancellation_returns_cancelled() {
    let scorer = FidelityScorer::new(
        ScorerConfig {
            judge_timeout_ms: 60_000,
            ..config()
        },
        SemanticJudge::new(Arc::new(SlowJudge)),
    )
    .unwrap();

    let result = scorer
        .score_until(
            site(screenshot()),
            site(screenshot()),
            tokio::time::sleep(Duration::from_millis(50)),
        )
        .await;

    assert!(matches!(result, Err(ScoreError::Cancelled)));
}

#[tokio::test]
async fn test_score_until_completes_when_not_cancelled() {
    let scorer = FidelityScorer::new(config(), SemanticJudge::disabled()).unwrap();
    let result = scorer
        .score_until(
            site(screenshot()),
            site(screenshot()),
            std::future::pending::<()>(),
        )
        .await;

    assert!(result.is_ok());
}

#[tokio::test]
async fn test_runs_are_independent() {
    let judge = Arc::new(CannedJudge::new(PERFECT_REPLY));
    let scorer = Arc::new(FidelityScorer::new(config(), SemanticJudge::new(judge.clone())).unwrap());

    let mut handles = Vec::new();
    for _ in 0..4 {
        let scorer = Arc::clone(&scorer);
        handles.push(tokio::spawn(async move {
            scorer.score(site(screenshot()), site(screenshot())).await
        }));
    }
    for handle in handles {
        let report = handle.await.unwrap();
        assert!(report.meets_target());
    }
    assert_eq!(judge.calls.load(Ordering::SeqCst), 4);
}
