use fake_news_detector::{
    ConfidenceLevel, ErrorKind, FakeNewsError, Label, LoadedModel, PredictRequest, PredictResponse,
    Predictor,
    dataset::LabeledDocument,
    pipeline,
    train::{TrainOutcome, Trainer, TrainingParams, TrainingReport},
};
use fake_news_preprocessing::{ArtifactError, pre_processor::VectorizerParams};

const SCENARIO_FAKE: &str =
    "BREAKING: Scientists discover drinking coffee makes you live forever! Click here!";
const SCENARIO_REAL: &str = "Stanford researchers published a peer-reviewed study in a medical \
     journal following 10,000 participants over 15 years.";

const TOPICS: [&str; 15] = [
    "coffee", "garlic", "lemons", "vinegar", "bananas", "honey", "onions", "chocolate", "turmeric",
    "ginger", "water", "carrots", "apples", "tea", "spinach",
];

const INSTITUTIONS: [&str; 15] = [
    "Harvard", "Oxford", "Stanford", "Yale", "Princeton", "Cambridge", "Columbia", "Cornell",
    "Duke", "Johns Hopkins", "Berkeley", "Imperial College", "Toronto", "Edinburgh", "Karolinska",
];

fn corpus() -> Vec<LabeledDocument> {
    let fake = TOPICS.iter().map(|topic| {
        LabeledDocument::new(
            format!(
                "BREAKING!!! Shocking secret: {topic} makes you live forever! Doctors hate \
                 this miracle trick. Click here to discover what they hide!"
            ),
            Label::Fake,
        )
    });
    let real = INSTITUTIONS.iter().enumerate().map(|(i, institution)| {
        LabeledDocument::new(
            format!(
                "{institution} researchers published a peer-reviewed study in a medical journal \
                 following {} participants over {} years, according to the report.",
                (i + 1) * 1_000,
                i + 5
            ),
            Label::Real,
        )
    });
    fake.chain(real).collect()
}

fn train() -> TrainOutcome {
    Trainer::new()
        .with_vectorizer_params(
            VectorizerParams::default().with_document_frequency_bounds(1.0, 1.0),
        )
        .with_params(TrainingParams {
            regularization: 10.0,
            ..TrainingParams::default()
        })
        .train(&corpus())
        .expect("training should succeed")
}

#[test]
fn test_sensational_text_is_fake() {
    let predictor = Predictor::from_model(train().model);
    let result = predictor.predict(SCENARIO_FAKE).unwrap();
    assert_eq!(result.prediction, Label::Fake);
    assert!(result.confidence_level >= ConfidenceLevel::Medium);
    assert!(result.fake_probability >= 0.6);
}

#[test]
fn test_research_report_is_real() {
    let predictor = Predictor::from_model(train().model);
    let result = predictor.predict(SCENARIO_REAL).unwrap();
    assert_eq!(result.prediction, Label::Real);
    assert!(result.real_probability > 0.5);
    assert_eq!(result.text_stats.sentence_count, 1);
}

#[test]
fn test_text_without_tokens_still_predicts() {
    let predictor = Predictor::from_model(train().model);
    let result = predictor.predict("1234567890").unwrap();
    assert!((0.0..=1.0).contains(&result.fake_probability));
    assert!(result.confidence >= 0.5);
    assert_eq!(result.text_stats.word_count, 1);
    assert_eq!(result.text_stats.sentence_count, 1);
}

#[test]
fn test_training_report() {
    let report = train().report;
    assert_eq!(report.num_documents, 30);
    assert_eq!(report.dropped_documents, 0);
    assert_eq!(report.class_counts.fake, 15);
    assert_eq!(report.class_counts.real, 15);
    assert_eq!(report.num_train + report.num_validation, 30);
    assert_eq!(report.train_accuracy, 1.0);
    let validation = report.validation.expect("a validation split");
    assert_eq!(validation.accuracy, 1.0);
    assert_eq!(validation.confusion.total(), report.num_validation);
}

#[test]
fn test_training_is_deterministic() {
    let first = train();
    let second = train();
    assert_eq!(
        first.model.vectorizer().terms(),
        second.model.vectorizer().terms()
    );
    assert_eq!(first.report.num_validation, second.report.num_validation);
    // Parallel gradient sums may associate differently between runs.
    let a = pipeline::predict(&first.model, SCENARIO_FAKE).unwrap();
    let b = pipeline::predict(&second.model, SCENARIO_FAKE).unwrap();
    assert!((a.fake_probability() - b.fake_probability()).abs() < 1e-9);
}

#[test]
fn test_saved_model_predicts_identically() {
    let dir = tempfile::tempdir().unwrap();
    let outcome = train();
    outcome.save(dir.path()).unwrap();

    let report: TrainingReport = serde_json::from_slice(
        &std::fs::read(dir.path().join("training_report.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(report.vocabulary_size, outcome.report.vocabulary_size);

    let in_memory = Predictor::from_model(outcome.model);
    let on_disk = Predictor::from_dir(dir.path());
    for text in [SCENARIO_FAKE, SCENARIO_REAL, "1234567890"] {
        let expected = in_memory.predict(text).unwrap();
        let actual = on_disk.predict(text).unwrap();
        assert_eq!(actual.prediction, expected.prediction);
        assert_eq!(actual.fake_probability, expected.fake_probability);
    }
    let info = on_disk.info().unwrap();
    assert_eq!(info.vocabulary_size, report.vocabulary_size);
    assert_eq!(info.ngram_range, (1, 2));
}

#[test]
fn test_tampered_artifact_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    train().save(dir.path()).unwrap();

    let path = dir.path().join("tfidf_vectorizer.bin");
    let mut bytes = std::fs::read(&path).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xff;
    std::fs::write(&path, bytes).unwrap();

    let err = LoadedModel::load(dir.path()).unwrap_err();
    assert!(matches!(
        err,
        FakeNewsError::Artifact(ArtifactError::ChecksumMismatch { .. })
    ));
    assert_eq!(err.kind(), ErrorKind::ModelUnavailable);
}

#[test]
fn test_request_contract() {
    let predictor = Predictor::from_model(train().model);

    let response = predictor.handle(&PredictRequest {
        text: SCENARIO_FAKE.to_string(),
    });
    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["prediction"], "fake");
    assert!(json.get("error").is_none());
    let percentage = json["confidence_percentage"].as_f64().unwrap();
    assert!((percentage - (percentage * 100.0).round() / 100.0).abs() < 1e-9);

    let response = predictor.handle(&PredictRequest {
        text: "too short".to_string(),
    });
    assert!(response.is_error());
    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["kind"], "invalid_input");
    assert!(json.get("prediction").is_none());

    let parsed: PredictResponse = serde_json::from_value(json).unwrap();
    assert!(parsed.is_error());
}

#[test]
fn test_missing_model_reports_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let predictor = Predictor::from_dir(dir.path().join("not-trained"));
    let err = predictor.predict(SCENARIO_REAL).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ModelUnavailable);
    assert!(!predictor.health().model_loaded);
}
