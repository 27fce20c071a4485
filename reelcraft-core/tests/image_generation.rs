mod common;

use common::{init_tracing, strings, FakeBackend, ImageReply};
use reelcraft_core::{
    ErrorKind, EventKind, GenerationStatus, ImageGenerationConfig, ImageGenerationStage, PipelineContext,
    ProviderError,
};
use tempfile::TempDir;

fn stage_in(dir: &TempDir) -> ImageGenerationStage {
    ImageGenerationStage::default().with_output_dir(dir.path().join("images"))
}

fn context_with_prompts(prompts: &[&str]) -> PipelineContext {
    let mut ctx = PipelineContext::new("a reel about geometry");
    ctx.state.set_image_prompts(strings(prompts));
    ctx
}

#[tokio::test]
async fn test_every_prompt_becomes_an_image() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let stage = stage_in(&dir);
    let backend = FakeBackend::new();
    let mut ctx = context_with_prompts(&["a red cube", "a blue sphere", "a green cone"]);

    let report = stage.run(&backend, &mut ctx).await;

    assert!(report.success());
    assert_eq!(report.requested, 3);
    assert!(report.failures.is_empty());
    assert_eq!(
        *backend.image_prompts.lock().unwrap(),
        strings(&["a red cube", "a blue sphere", "a green cone"])
    );

    let images = dir.path().join("images");
    let expected = vec![
        images.join("image_1.jpg"),
        images.join("image_2.jpg"),
        images.join("image_3.jpg"),
    ];
    assert_eq!(ctx.state.generated_images().unwrap(), expected.as_slice());
    for path in &expected {
        let decoded = image::open(path).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (4, 8));
    }

    let progress: Vec<_> = ctx
        .events()
        .iter()
        .filter(|e| e.text.starts_with("Generating image"))
        .map(|e| e.text.as_str())
        .collect();
    assert_eq!(
        progress,
        vec!["Generating image 1/3...", "Generating image 2/3...", "Generating image 3/3..."]
    );

    let last = ctx.events().last().unwrap();
    assert_eq!(last.kind, EventKind::Status);
    assert_eq!(
        last.text,
        format!("Successfully generated 3 images in '{}'", images.display())
    );
}

#[tokio::test]
async fn test_json_text_prompts_match_native_list() {
    let dir = TempDir::new().unwrap();
    let stage = stage_in(&dir);
    let prompts = ["a red cube", "a blue sphere"];

    let native_backend = FakeBackend::new();
    let mut native = context_with_prompts(&prompts);
    stage.run(&native_backend, &mut native).await;

    let text_backend = FakeBackend::new();
    let mut text = PipelineContext::new("a reel about geometry");
    text.state
        .set_image_prompts("```json\n{\"prompts\": [\"a red cube\", \"a blue sphere\"]}\n```");
    stage.run(&text_backend, &mut text).await;

    assert_eq!(
        *native_backend.image_prompts.lock().unwrap(),
        *text_backend.image_prompts.lock().unwrap()
    );
    assert_eq!(native.state.generated_images(), text.state.generated_images());
}

#[tokio::test]
async fn test_missing_prompts_write_nothing() {
    let dir = TempDir::new().unwrap();
    let stage = stage_in(&dir);
    let backend = FakeBackend::new();

    let mut absent = PipelineContext::new("topic");
    let report = stage.run(&backend, &mut absent).await;
    assert_eq!(report.status, GenerationStatus::NoInput);
    assert_eq!(report.error_kind(), Some(ErrorKind::InputMissing));
    assert_eq!(absent.events().len(), 1);
    assert_eq!(absent.events()[0].kind, EventKind::Error);
    assert_eq!(absent.events()[0].text, "No image prompts found in session state.");
    assert!(absent.state.generated_images().is_none());

    let mut empty = context_with_prompts(&[]);
    let report = stage.run(&backend, &mut empty).await;
    assert_eq!(report.status, GenerationStatus::NoInput);
    assert_eq!(empty.events().iter().filter(|e| e.is_error()).count(), 1);
    assert!(empty.state.generated_images().is_none());

    let mut empty_json = PipelineContext::new("topic");
    empty_json.state.set_image_prompts(r#"{"prompts": []}"#);
    let report = stage.run(&backend, &mut empty_json).await;
    assert_eq!(report.status, GenerationStatus::NoInput);
    assert_eq!(report.error_kind(), Some(ErrorKind::InputMissing));
    assert_eq!(empty_json.events().len(), 1);

    assert_eq!(backend.image_calls(), 0);
}

#[tokio::test]
async fn test_item_without_image_is_skipped() {
    let dir = TempDir::new().unwrap();
    let stage = stage_in(&dir);
    let backend = FakeBackend::new().with_images(vec![
        ImageReply::Image,
        ImageReply::Empty,
        ImageReply::Image,
        ImageReply::Image,
    ]);
    let mut ctx = context_with_prompts(&["p1", "p2", "p3", "p4"]);

    let report = stage.run(&backend, &mut ctx).await;

    assert!(report.success());
    assert_eq!(backend.image_calls(), 4);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].index, 2);
    assert_eq!(report.failures[0].prompt, "p2");

    let images = dir.path().join("images");
    assert_eq!(
        ctx.state.generated_images().unwrap(),
        &[images.join("image_1.jpg"), images.join("image_3.jpg"), images.join("image_4.jpg")]
    );
    assert!(!images.join("image_2.jpg").exists());

    let errors: Vec<_> = ctx.events().iter().filter(|e| e.is_error()).collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].text, "Failed to generate image 2: no image returned");
    assert_eq!(
        ctx.events().last().unwrap().text,
        format!("Successfully generated 3 images in '{}'", images.display())
    );
}

#[tokio::test]
async fn test_unexpected_error_keeps_partial_progress() {
    let dir = TempDir::new().unwrap();
    let stage = stage_in(&dir);
    let backend = FakeBackend::new().with_images(vec![
        ImageReply::Image,
        ImageReply::Image,
        ImageReply::Fail(ProviderError::Network("connection reset".into())),
        ImageReply::Image,
    ]);
    let mut ctx = context_with_prompts(&["p1", "p2", "p3", "p4"]);

    let report = stage.run(&backend, &mut ctx).await;

    assert_eq!(report.status, GenerationStatus::Aborted);
    assert!(!report.success());
    assert_eq!(report.error_kind(), Some(ErrorKind::NetworkFailed));
    assert_eq!(backend.image_calls(), 3);

    let images = dir.path().join("images");
    assert_eq!(
        ctx.state.generated_images().unwrap(),
        &[images.join("image_1.jpg"), images.join("image_2.jpg")]
    );
    assert_eq!(ctx.events().iter().filter(|e| e.is_error()).count(), 1);
    assert!(!ctx.events().iter().any(|e| e.text.starts_with("Successfully")));
}

#[tokio::test]
async fn test_error_on_first_item_publishes_nothing() {
    let dir = TempDir::new().unwrap();
    let stage = stage_in(&dir);
    let backend = FakeBackend::new()
        .with_images(vec![ImageReply::Fail(ProviderError::AuthenticationFailed)]);
    let mut ctx = context_with_prompts(&["p1", "p2"]);

    let report = stage.run(&backend, &mut ctx).await;

    assert_eq!(report.status, GenerationStatus::Aborted);
    assert!(ctx.state.generated_images().is_none());
    assert_eq!(backend.image_calls(), 1);
}

#[tokio::test]
async fn test_png_output_config() {
    let dir = TempDir::new().unwrap();
    let stage = stage_in(&dir)
        .with_config(ImageGenerationConfig::default().with_output_mime_type("image/png"));
    let backend = FakeBackend::new();
    let mut ctx = context_with_prompts(&["p1"]);

    stage.run(&backend, &mut ctx).await;

    let path = dir.path().join("images").join("image_1.png");
    assert_eq!(ctx.state.generated_images().unwrap(), &[path.clone()]);
    assert_eq!(image::ImageFormat::from_path(&path).unwrap(), image::ImageFormat::Png);
    assert!(path.exists());
}
