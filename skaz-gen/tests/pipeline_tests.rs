//! Pipeline orchestration tests
//!
//! Exercise `StoryPipeline::run` directly with stubbed collaborators.

mod helpers;

use helpers::{
    stub_pipeline, test_config, StubModel, StubSource, StubSynthesizer, StubTranslator,
};
use skaz_common::config::TranslationMode;
use skaz_common::Language;
use skaz_gen::facts::{FactAggregator, FactSource};
use skaz_gen::{PipelineError, StoryPipeline, StoryRequest};
use std::sync::Arc;
use tempfile::TempDir;

#[tokio::test]
async fn test_all_fact_sources_failing_still_succeeds() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let model = StubModel::replying("story");
    let sources: Vec<Arc<dyn FactSource>> = vec![
        StubSource::failing("wikipedia"),
        StubSource::failing("wikivoyage"),
        StubSource::failing("geocoding"),
    ];
    let pipeline = StoryPipeline::new(
        &config,
        FactAggregator::new(sources),
        model.clone(),
        StubTranslator::new(),
        StubSynthesizer::writing(),
    );

    let outcome = pipeline
        .run(&StoryRequest::new("Nowhere").with_lang(Language::En))
        .await
        .unwrap();

    assert!(outcome.fact_excerpt.is_none());
    assert!(outcome.markdown_path.exists());
    let prompts = model.prompts.lock().unwrap();
    assert!(prompts[0].contains("No reference facts were found"));
}

#[tokio::test]
async fn test_repeated_requests_get_distinct_ids() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let pipeline = stub_pipeline(
        &config,
        StubModel::replying("story"),
        StubTranslator::new(),
        StubSynthesizer::writing(),
    );
    let request = StoryRequest::new("Kazan").with_lang(Language::En);

    let first = pipeline.run(&request).await.unwrap();
    let second = pipeline.run(&request).await.unwrap();

    assert_ne!(first.story_id, second.story_id);
    assert_ne!(first.markdown_path, second.markdown_path);
}

#[tokio::test]
async fn test_output_paths_are_derived_from_id() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let pipeline = stub_pipeline(
        &config,
        StubModel::replying("story"),
        StubTranslator::new(),
        StubSynthesizer::writing(),
    );

    let outcome = pipeline
        .run(&StoryRequest::new("Kazan").with_lang(Language::En))
        .await
        .unwrap();

    let id = outcome.story_id.to_string();
    assert_eq!(outcome.markdown_path, dir.path().join(format!("{}.md", id)));
    assert_eq!(outcome.audio_path, dir.path().join(format!("{}.wav", id)));
    assert_eq!(std::fs::read(&outcome.audio_path).unwrap(), b"RIFF");
}

#[tokio::test]
async fn test_byte_returning_backend_is_persisted_as_mp3() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let pipeline = stub_pipeline(
        &config,
        StubModel::replying("story"),
        StubTranslator::new(),
        StubSynthesizer::returning_bytes(),
    );

    let outcome = pipeline
        .run(&StoryRequest::new("Kazan").with_lang(Language::En))
        .await
        .unwrap();

    assert!(outcome.audio_path.to_string_lossy().ends_with(".mp3"));
    assert_eq!(std::fs::read(&outcome.audio_path).unwrap(), b"ID3");
}

#[tokio::test]
async fn test_markdown_survives_audio_failure() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let pipeline = stub_pipeline(
        &config,
        StubModel::replying("story"),
        StubTranslator::new(),
        StubSynthesizer::failing_with_stderr("boom"),
    );

    let err = pipeline
        .run(&StoryRequest::new("Kazan").with_lang(Language::En))
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Synthesis(_)));
    let files: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].extension().unwrap(), "md");
}

#[tokio::test]
async fn test_russian_translation_replaces_story() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let synthesizer = StubSynthesizer::writing();
    let pipeline = stub_pipeline(
        &config,
        StubModel::replying("story"),
        StubTranslator::new(),
        synthesizer.clone(),
    );

    let outcome = pipeline
        .run(&StoryRequest::new("Kazan").with_lang(Language::Ru).with_voice("irina.onnx"))
        .await
        .unwrap();

    assert_eq!(std::fs::read_to_string(outcome.markdown_path).unwrap(), "[ru] story");
    let calls = synthesizer.calls.lock().unwrap();
    assert_eq!(calls[0], (Language::Ru, Some("irina.onnx".to_string())));
}

#[tokio::test]
async fn test_russian_translation_appended() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(dir.path());
    config.translation_mode = TranslationMode::Append;
    let pipeline = stub_pipeline(
        &config,
        StubModel::replying("story"),
        StubTranslator::new(),
        StubSynthesizer::writing(),
    );

    let outcome = pipeline
        .run(&StoryRequest::new("Kazan").with_lang(Language::Ru))
        .await
        .unwrap();

    assert_eq!(
        std::fs::read_to_string(outcome.markdown_path).unwrap(),
        "story\n\n---\n\n[ru] story"
    );
}

#[tokio::test]
async fn test_translation_failure_is_fatal() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let pipeline = stub_pipeline(
        &config,
        StubModel::replying("story"),
        StubTranslator::failing(),
        StubSynthesizer::writing(),
    );

    let err = pipeline
        .run(&StoryRequest::new("Kazan").with_lang(Language::Ru))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "Translation failed");
    assert_eq!(std::fs::read_dir(dir.path()).map(|d| d.count()).unwrap_or(0), 0);
}

#[tokio::test]
async fn test_undetectable_topic_uses_default_language() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(dir.path());
    config.default_lang = Language::Ru;
    let synthesizer = StubSynthesizer::writing();
    let pipeline = stub_pipeline(
        &config,
        StubModel::replying("story"),
        StubTranslator::new(),
        synthesizer.clone(),
    );

    pipeline.run(&StoryRequest::new("42")).await.unwrap();

    assert_eq!(synthesizer.calls.lock().unwrap()[0].0, Language::Ru);
}

#[tokio::test]
async fn test_excerpts_can_be_disabled() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(dir.path());
    config.include_excerpts = false;
    let pipeline = stub_pipeline(
        &config,
        StubModel::replying("story"),
        StubTranslator::new(),
        StubSynthesizer::writing(),
    );

    let outcome = pipeline
        .run(&StoryRequest::new("Kazan").with_lang(Language::En))
        .await
        .unwrap();

    assert!(outcome.plan.is_none());
    assert!(outcome.fact_excerpt.is_none());
}

#[tokio::test]
async fn test_style_and_source_links_reach_prompts() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let model = StubModel::replying("story");
    let sources: Vec<Arc<dyn FactSource>> = vec![
        StubSource::linked("wikipedia", "wiki", "https://en.wikipedia.org/wiki/Kazan"),
        StubSource::failing("wikivoyage"),
    ];
    let pipeline = StoryPipeline::new(
        &config,
        FactAggregator::new(sources),
        model.clone(),
        StubTranslator::new(),
        StubSynthesizer::writing(),
    );

    pipeline
        .run(
            &StoryRequest::new("Kazan")
                .with_style("humorous")
                .with_lang(Language::En),
        )
        .await
        .unwrap();

    let prompts = model.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 2);
    assert!(prompts.iter().all(|p| p.contains("humorous")));
    assert!(!prompts[0].contains("https://en.wikipedia.org/wiki/Kazan"));
    assert!(prompts[1].contains("https://en.wikipedia.org/wiki/Kazan"));
}
