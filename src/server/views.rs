use handlebars::Handlebars;
use once_cell::sync::Lazy;
use serde::Serialize;

use crate::{
    error::{Result, StudioError},
    models::{
        AspectRatio, Choice, GenerationEntry, Mode, OutputFormat, SdModel, DEFAULT_STRENGTH,
        MAX_SEED,
    },
    server::form::GenerateForm,
    session::GenerationBatch,
    stability::{MAX_OUTPUTS, MIN_OUTPUTS},
};

pub const OUTPUTS_ROUTE: &str = "/outputs";

static TEMPLATES: Lazy<Handlebars<'static>> = Lazy::new(|| {
    let mut handlebars = Handlebars::new();
    handlebars.set_strict_mode(true);
    handlebars
});

const PAGE_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>SD3 Image Generator</title>
<style>
body { font-family: system-ui, sans-serif; max-width: 1100px; margin: 2rem auto; padding: 0 1rem; color: #222; }
form { display: grid; grid-template-columns: 12rem 1fr; gap: .6rem 1rem; align-items: center; }
form button { grid-column: 2; justify-self: start; padding: .5rem 1.5rem; }
.error { background: #fdecea; color: #b71c1c; padding: .6rem 1rem; border-radius: 4px; margin: .4rem 0; }
.gallery { display: grid; grid-template-columns: repeat(3, 1fr); gap: 1rem; margin-top: 1rem; }
.gallery figure { margin: 0; }
.gallery img { width: 100%; border-radius: 4px; }
.gallery figcaption { font-size: .85rem; color: #555; }
form.clear { display: block; margin-top: 1rem; }
</style>
</head>
<body>
<h1>SD3 Image Generator App ⚡️</h1>
<form method="post" action="/generate" enctype="multipart/form-data">
<label for="prompt">Enter your prompt:</label>
<input id="prompt" name="prompt" type="text" value="{{prompt}}">
<label for="negative_prompt">Enter your negative prompt (optional):</label>
<input id="negative_prompt" name="negative_prompt" type="text" value="{{negative_prompt}}">
<label for="mode">Select the mode:</label>
<select id="mode" name="mode">{{#each modes}}<option value="{{value}}"{{#if selected}} selected{{/if}}>{{value}}</option>{{/each}}</select>
<label for="aspect_ratio">Select aspect ratio:</label>
<select id="aspect_ratio" name="aspect_ratio">{{#each aspect_ratios}}<option value="{{value}}"{{#if selected}} selected{{/if}}>{{value}}</option>{{/each}}</select>
<label for="output_format">Select output format:</label>
<select id="output_format" name="output_format">{{#each output_formats}}<option value="{{value}}"{{#if selected}} selected{{/if}}>{{value}}</option>{{/each}}</select>
<label for="seed">Enter seed (optional):</label>
<input id="seed" name="seed" type="number" min="0" max="{{max_seed}}" step="1" value="{{seed}}">
<label for="model">Select model:</label>
<select id="model" name="model">{{#each models}}<option value="{{value}}"{{#if selected}} selected{{/if}}>{{value}}</option>{{/each}}</select>
<label for="num_outputs">Number of outputs:</label>
<input id="num_outputs" name="num_outputs" type="number" min="{{min_outputs}}" max="{{max_outputs}}" step="1" value="{{num_outputs}}">
<label for="image">Upload your image (image-to-image):</label>
<input id="image" name="image" type="file" accept=".png,.jpg,.jpeg">
<label for="strength">Select strength (0.0 to 1.0, image-to-image):</label>
<input id="strength" name="strength" type="range" min="0" max="1" step="0.01" value="{{strength}}">
<button type="submit">Generate Image</button>
</form>
{{#each errors}}<div class="error">{{this}}</div>
{{/each}}
{{#if images}}<section class="gallery">{{#each images}}<figure><img src="{{src}}" alt="{{alt}}"><figcaption>{{caption}}</figcaption></figure>{{/each}}</section>{{/if}}
{{#if has_batches}}<form class="clear" method="post" action="/clear"><button type="submit">Clear results</button></form>{{/if}}
</body>
</html>
"#;

#[derive(Serialize)]
struct OptionView {
    value: &'static str,
    selected: bool,
}

#[derive(Serialize)]
struct ImageView {
    src: String,
    alt: String,
    caption: String,
}

#[derive(Serialize)]
struct PageView<'a> {
    prompt: &'a str,
    negative_prompt: &'a str,
    modes: Vec<OptionView>,
    aspect_ratios: Vec<OptionView>,
    output_formats: Vec<OptionView>,
    models: Vec<OptionView>,
    seed: String,
    max_seed: u64,
    num_outputs: usize,
    min_outputs: usize,
    max_outputs: usize,
    strength: String,
    errors: Vec<String>,
    images: Vec<ImageView>,
    has_batches: bool,
}

fn options<T: Choice>(selected: T) -> Vec<OptionView> {
    T::ALL
        .iter()
        .map(|choice| OptionView {
            value: choice.as_str(),
            selected: *choice == selected,
        })
        .collect()
}

fn image_view(entry: &GenerationEntry) -> Option<ImageView> {
    let saved = entry.saved()?;
    let file_name = saved.file_name()?;
    let seed = saved
        .seed
        .map(|seed| format!(" (seed {})", seed))
        .unwrap_or_default();

    Some(ImageView {
        src: format!("{}/{}", OUTPUTS_ROUTE, file_name),
        alt: entry.prompt.clone(),
        caption: format!("Generated with {}{}", entry.model, seed),
    })
}

/// The form, then `notices` and the latest batch's errors, then every saved image.
pub fn render_page(
    form: &GenerateForm,
    batches: &[GenerationBatch],
    notices: &[String],
) -> Result<String> {
    let request = &form.request;

    let mut errors = notices.to_vec();
    if let Some(latest) = batches.first() {
        errors.extend(latest.errors());
    }

    let view = PageView {
        prompt: &request.prompt,
        negative_prompt: request.negative_prompt.as_deref().unwrap_or_default(),
        modes: options::<Mode>(request.mode),
        aspect_ratios: options::<AspectRatio>(request.aspect_ratio),
        output_formats: options::<OutputFormat>(request.output_format),
        models: options::<SdModel>(request.model),
        seed: request.seed.map(|seed| seed.to_string()).unwrap_or_default(),
        max_seed: MAX_SEED,
        num_outputs: form.num_outputs,
        min_outputs: MIN_OUTPUTS,
        max_outputs: MAX_OUTPUTS,
        strength: request.strength.unwrap_or(DEFAULT_STRENGTH).to_string(),
        errors,
        images: batches
            .iter()
            .flat_map(|batch| batch.entries.iter())
            .filter_map(image_view)
            .collect(),
        has_batches: !batches.is_empty(),
    };

    TEMPLATES
        .render_template(PAGE_TEMPLATE, &view)
        .map_err(|e| StudioError::TemplateError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EntryOutcome, GenerationFailure, SavedImage};
    use std::path::PathBuf;

    fn batch() -> GenerationBatch {
        GenerationBatch::new(
            SdModel::Sd3,
            vec![
                GenerationEntry {
                    index: 0,
                    prompt: "<b>fox</b>".to_string(),
                    model: SdModel::Sd3,
                    outcome: EntryOutcome::Saved(SavedImage {
                        image_path: PathBuf::from("outputs/sd3_output_20240101_000000.png"),
                        metadata_path: PathBuf::from("outputs/sd3_output_20240101_000000.png.json"),
                        seed: Some(77),
                        overwrote: false,
                    }),
                },
                GenerationEntry {
                    index: 1,
                    prompt: "<b>fox</b>".to_string(),
                    model: SdModel::Sd3,
                    outcome: EntryOutcome::Failed(GenerationFailure::Http {
                        status: 403,
                        body: "<forbidden>".into(),
                    }),
                },
            ],
        )
    }

    #[test]
    fn test_form_keeps_selections() {
        let mut form = GenerateForm::default();
        form.request.model = SdModel::Sd3Turbo;
        form.request.prompt = "say \"cheese\"".into();
        form.request.seed = Some(12);

        let html = render_page(&form, &[], &[]).unwrap();
        assert!(html.contains("<option value=\"sd3-turbo\" selected>"));
        assert!(html.contains("<option value=\"sd3\">"));
        assert!(html.contains("<option value=\"1:1\" selected>"));
        assert!(html.contains("value=\"say &quot;cheese&quot;\""));
        assert!(html.contains("value=\"4\""));
        assert!(html.contains("value=\"12\""));
        assert!(html.contains("value=\"0.5\""));
        assert!(!html.contains("Clear results"));
    }

    #[test]
    fn test_page_renders_gallery_and_errors() {
        let html = render_page(&GenerateForm::default(), &[batch()], &[]).unwrap();

        assert!(html.contains("src=\"/outputs/sd3_output_20240101_000000.png\""));
        assert!(html.contains("Generated with sd3 (seed 77)"));
        assert!(html.contains("alt=\"&lt;b&gt;fox&lt;/b&gt;\""));
        assert!(html.contains("Failed to generate with sd3: 403 - &lt;forbidden&gt;"));
        assert!(html.contains("Clear results"));
    }

    #[test]
    fn test_notices_are_shown() {
        let notices = vec![
            "Please enter a prompt.".to_string(),
            "Validation error: Invalid seed: 'abc'".to_string(),
        ];
        let html = render_page(&GenerateForm::default(), &[], &notices).unwrap();
        assert!(html.contains("<div class=\"error\">Please enter a prompt.</div>"));
        assert!(html.contains("Validation error: Invalid seed: "));
        assert!(!html.contains("class=\"gallery\""));
    }
}
