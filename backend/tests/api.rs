use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use actix_web::http::{header, StatusCode};
use actix_web::{test, web, App};
use serde_json::{json, Map, Value};

use mindcare_backend::features::AnswerPolicy;
use mindcare_backend::handlers;
use mindcare_backend::inference::RiskModel;
use mindcare_backend::journal::JournalAnalyzer;
use mindcare_backend::AppState;
use mindcare_inferences::error::Result as InferenceResult;
use mindcare_inferences::ndarray::{ArrayD, IxDyn};
use mindcare_inferences::{
    Classifier, ClassifierOutput, EmotionClassifier, FaceEmotionAnalyzer, Frame, InferenceError,
    LabelScore, MediaDecoder, StandardScaler, Transcriber,
};

struct FixedClassifier {
    cols: usize,
}

impl Classifier for FixedClassifier {
    fn run(&self, _row: &[f32]) -> InferenceResult<ClassifierOutput> {
        let probs: Vec<f32> = (0..self.cols).map(|i| i as f32 / 20.0).collect();
        Ok(ClassifierOutput {
            probabilities: Some(ArrayD::from_shape_vec(IxDyn(&[1, self.cols]), probs).unwrap()),
            prediction: ArrayD::from_shape_vec(IxDyn(&[1]), vec![0.0]).unwrap(),
        })
    }
}

/// Keeps the rows it was given.
#[derive(Default)]
struct RecordingClassifier {
    rows: Mutex<Vec<Vec<f32>>>,
}

impl Classifier for RecordingClassifier {
    fn run(&self, row: &[f32]) -> InferenceResult<ClassifierOutput> {
        self.rows.lock().unwrap().push(row.to_vec());
        FixedClassifier { cols: 10 }.run(row)
    }
}

struct BrokenClassifier;

impl Classifier for BrokenClassifier {
    fn run(&self, _row: &[f32]) -> InferenceResult<ClassifierOutput> {
        Err(InferenceError::EmptyOutput)
    }
}

struct FakeEmotions;

impl EmotionClassifier for FakeEmotions {
    fn classify(&self, text: &str) -> InferenceResult<Vec<LabelScore>> {
        let joy = if text.contains("happy") { 0.93 } else { 0.02 };
        Ok(vec![
            LabelScore::new("anger", 0.01),
            LabelScore::new("joy", joy),
            LabelScore::new("sadness", 0.04),
            LabelScore::new("neutral", 0.02),
        ])
    }
}

struct FakeDecoder;

impl MediaDecoder for FakeDecoder {
    fn extract_audio(&self, video: &Path, out_dir: &Path) -> InferenceResult<PathBuf> {
        let bytes = std::fs::read(video)?;
        assert_eq!(bytes, b"fake-webm-bytes");
        Ok(out_dir.join("audio.wav"))
    }

    fn sample_frames(&self, _video: &Path, every: usize) -> InferenceResult<Vec<Frame>> {
        Ok((0..3)
            .map(|i| Frame {
                index: i * every,
                width: 1,
                height: 1,
                pixels: vec![0],
            })
            .collect())
    }
}

struct FakeTranscriber;

impl Transcriber for FakeTranscriber {
    fn transcribe(&self, _audio: &Path) -> InferenceResult<String> {
        Ok("I feel good about today".to_string())
    }
}

struct AlwaysHappy;

impl FaceEmotionAnalyzer for AlwaysHappy {
    fn dominant_emotion(&self, _frame: &Frame) -> InferenceResult<String> {
        Ok("happy".to_string())
    }
}

fn risk_model(width: usize, classifier: Arc<dyn Classifier>) -> RiskModel {
    let scaler = StandardScaler::new(vec![0.0; width], vec![1.0; width]).unwrap();
    RiskModel::new(Arc::new(scaler), classifier)
}

fn full_state() -> AppState {
    AppState::new(AnswerPolicy::Strict)
        .with_risk(risk_model(17, Arc::new(FixedClassifier { cols: 10 })))
        .with_emotion(Arc::new(FakeEmotions))
        .with_journal(JournalAnalyzer::new(
            Arc::new(FakeDecoder),
            Arc::new(FakeTranscriber),
            Arc::new(AlwaysHappy),
            10,
        ))
}

macro_rules! app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($state))
                .configure(handlers::configure)
                .default_service(web::route().to(handlers::not_found)),
        )
        .await
    };
}

fn questionnaire() -> Map<String, Value> {
    let mut answers = Map::new();
    for n in 1..=42 {
        let value = match n {
            1 => json!(30),
            2 => json!("Male"),
            _ => json!(0),
        };
        answers.insert(format!("q{n}"), value);
    }
    answers
}

#[actix_web::test]
async fn predict_returns_all_disorders() {
    let app = app!(full_state());
    let req = test::TestRequest::post()
        .uri("/predict")
        .set_json(questionnaire())
        .to_request();
    let resp: Value = test::call_and_read_body_json(&app, req).await;

    let probabilities = resp["probabilities"].as_object().unwrap();
    assert_eq!(probabilities.len(), 10);
    assert_eq!(probabilities["Depression"], json!(0.0));
    assert_eq!(probabilities["Anxiety"], json!(0.05));
    assert!(probabilities.contains_key("Eating Disorder"));
}

#[actix_web::test]
async fn predict_names_missing_key() {
    let app = app!(full_state());
    let mut answers = questionnaire();
    answers.remove("q23");
    let req = test::TestRequest::post()
        .uri("/predict")
        .set_json(answers)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Missing answer for q23");
}

#[actix_web::test]
async fn lenient_predict_fills_defaults() {
    let classifier = Arc::new(RecordingClassifier::default());
    let state = AppState::new(AnswerPolicy::Lenient).with_risk(risk_model(14, classifier.clone()));
    let app = app!(state);
    let req = test::TestRequest::post()
        .uri("/predict")
        .set_json(json!({"q2": "Female", "q9": 4}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let rows = classifier.rows.lock().unwrap();
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    // age 30, Female, 8 hours of sleep, 3 active days
    assert_eq!(row[0], 30.0);
    assert_eq!(row[1], 0.0);
    assert!((row[2] - 25.0).abs() < 1e-5);
    assert!((row[3] - 3.0 / 7.0 * 25.0).abs() < 1e-5);
    assert!((row[4] - 4.0 / 40.0 * 25.0).abs() < 1e-5);
    assert!(row[5..].iter().all(|v| *v == 0.0));
}

#[actix_web::test]
async fn predict_rejects_non_json_body() {
    let app = app!(full_state());
    for body in ["", "{}", "answers please"] {
        let req = test::TestRequest::post()
            .uri("/predict")
            .insert_header((header::CONTENT_TYPE, "application/json"))
            .set_payload(body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "body {body:?}");

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "No JSON data received");
    }
}

#[actix_web::test]
async fn predict_without_model_is_unavailable() {
    let app = app!(AppState::new(AnswerPolicy::Strict));
    let req = test::TestRequest::post()
        .uri("/predict")
        .set_json(questionnaire())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Model or scaler not loaded");
}

#[actix_web::test]
async fn predict_reports_shape_mismatch() {
    let state = AppState::new(AnswerPolicy::Strict)
        .with_risk(risk_model(14, Arc::new(FixedClassifier { cols: 3 })));
    let app = app!(state);
    let req = test::TestRequest::post()
        .uri("/predict")
        .set_json(questionnaire())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Prediction output shape mismatch");
}

#[actix_web::test]
async fn predict_reports_inference_failure() {
    let state =
        AppState::new(AnswerPolicy::Strict).with_risk(risk_model(14, Arc::new(BrokenClassifier)));
    let app = app!(state);
    let req = test::TestRequest::post()
        .uri("/predict")
        .set_json(questionnaire())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Prediction failed");
    assert!(body["details"].as_str().unwrap().contains("no output"));
}

#[actix_web::test]
async fn detect_emotion_returns_top_label() {
    let app = app!(full_state());
    let req = test::TestRequest::post()
        .uri("/detect_emotion")
        .set_json(json!({"text": "I am so happy today!"}))
        .to_request();
    let resp: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(resp["emotion"], "joy");
    let confidence = resp["confidence"].as_f64().unwrap();
    assert!((confidence - 0.93).abs() < 1e-6);
}

#[actix_web::test]
async fn detect_emotion_validates_text() {
    let app = app!(full_state());
    let cases = [
        (json!({}), "Missing 'text' in request body"),
        (json!({"text": 5}), "Missing 'text' in request body"),
        (json!({"text": "   \n"}), "Empty text provided"),
    ];
    for (payload, message) in cases {
        let req = test::TestRequest::post()
            .uri("/detect_emotion")
            .set_json(payload)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], message);
    }
}

const BOUNDARY: &str = "----mindcare-test-boundary";

fn multipart(field: &str, filename: &str, content: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: video/webm\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn upload(body: Vec<u8>) -> test::TestRequest {
    test::TestRequest::post()
        .uri("/analyze-journal")
        .insert_header((
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        ))
        .set_payload(body)
}

#[actix_web::test]
async fn analyze_journal_returns_timeline_and_advice() {
    let app = app!(full_state());
    let req = upload(multipart("video", "entry.webm", b"fake-webm-bytes")).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["transcript"], "I feel good about today");
    assert_eq!(body["top_emotion"], "happy");
    assert_eq!(
        body["expression_timeline"],
        json!([
            {"frame": 0, "emotion": "happy"},
            {"frame": 10, "emotion": "happy"},
            {"frame": 20, "emotion": "happy"},
        ])
    );
    assert_eq!(
        body["advice"],
        "You're in a great mood! Keep reflecting on positive thoughts."
    );
}

#[actix_web::test]
async fn analyze_journal_requires_video_field() {
    let app = app!(full_state());
    let req = upload(multipart("audio", "entry.webm", b"fake-webm-bytes")).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "No video uploaded");
}

#[actix_web::test]
async fn analyze_journal_rejects_empty_video() {
    let app = app!(full_state());
    let req = upload(multipart("video", "entry.webm", b"")).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "No video uploaded");
}

#[actix_web::test]
async fn analyze_journal_rejects_non_multipart_body() {
    let app = app!(full_state());
    let req = test::TestRequest::post()
        .uri("/analyze-journal")
        .set_json(json!({"video": "fake-webm-bytes"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("No video uploaded"));
}

#[actix_web::test]
async fn health_and_stats_reflect_state() {
    let app = app!(AppState::new(AnswerPolicy::Strict).with_emotion(Arc::new(FakeEmotions)));

    let req = test::TestRequest::post()
        .uri("/detect_emotion")
        .set_json(json!({"text": ""}))
        .to_request();
    test::call_service(&app, req).await;

    let req = test::TestRequest::get().uri("/health").to_request();
    let health: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(health["status"], "ok");
    assert_eq!(health["models"], json!({"emotion": true, "journal": false, "risk": false}));

    let req = test::TestRequest::get().uri("/stats").to_request();
    let stats: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(
        stats["endpoints"]["detect_emotion"],
        json!({"requests": 1, "succeeded": 0, "failed": 1})
    );
}

#[actix_web::test]
async fn model_info_lists_layout() {
    let app = app!(full_state());
    let req = test::TestRequest::get().uri("/model-info").to_request();
    let info: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(info["features"].as_array().unwrap().len(), 14);
    assert_eq!(info["scaler_width"], 17);
    assert_eq!(info["disorders"][9], "BPD");
    assert_eq!(info["answer_policy"], "strict");
}

#[actix_web::test]
async fn unknown_route_is_json_404() {
    let app = app!(full_state());
    let req = test::TestRequest::get().uri("/nope").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Endpoint not found");
}
