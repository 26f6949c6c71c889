use actix_multipart::Multipart;
use bytes::BytesMut;
use futures::StreamExt;

use crate::{
    error::{Result, StudioError},
    models::{
        AspectRatio, GenerationRequest, Mode, OutputFormat, SdModel, SourceImage, DEFAULT_STRENGTH,
    },
    multipart::FormField,
    server::MAX_FORM_BYTES,
    stability::DEFAULT_OUTPUTS,
};

/// What the user submitted on the generation form.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateForm {
    pub request: GenerationRequest,
    pub num_outputs: usize,
}

impl Default for GenerateForm {
    fn default() -> Self {
        Self {
            request: GenerationRequest::new("").with_strength(DEFAULT_STRENGTH),
            num_outputs: DEFAULT_OUTPUTS,
        }
    }
}

impl GenerateForm {
    /// Builds the form from submitted fields. Every field that parses is kept,
    /// so the form can be shown again next to the errors of the ones that did
    /// not. Unknown fields are ignored; range checks are left to dispatch.
    pub fn from_fields(fields: Vec<FormField>) -> (Self, Vec<StudioError>) {
        let mut form = Self::default();
        let mut strength = DEFAULT_STRENGTH;
        let mut errors = Vec::new();

        for field in fields {
            if field.name == "image" {
                let file_name = field.file_name.clone().unwrap_or_default();
                if !file_name.is_empty() && !field.data.is_empty() {
                    let mut image = SourceImage::new(file_name, field.data);
                    if let Some(content_type) = field.content_type.filter(|ct| ct.starts_with("image/")) {
                        image = image.with_content_type(content_type);
                    }
                    form.request.source_image = Some(image);
                }
                continue;
            }

            let Some(value) = field.as_text().map(str::to_string) else {
                errors.push(StudioError::ValidationError(format!(
                    "Field '{}' is not valid UTF-8",
                    field.name
                )));
                continue;
            };
            let request = &mut form.request;

            let applied: Result<()> = match field.name.as_str() {
                "prompt" => {
                    request.prompt = value;
                    Ok(())
                }
                "negative_prompt" => {
                    request.negative_prompt = Some(value).filter(|v| !v.trim().is_empty());
                    Ok(())
                }
                "mode" => value.parse::<Mode>().map(|mode| request.mode = mode),
                "aspect_ratio" => value.parse::<AspectRatio>().map(|ratio| request.aspect_ratio = ratio),
                "output_format" => value.parse::<OutputFormat>().map(|format| request.output_format = format),
                "model" => value.parse::<SdModel>().map(|model| request.model = model),
                "seed" => parse_optional(&value, "seed").map(|seed| request.seed = seed),
                "strength" => parse_optional(&value, "strength")
                    .map(|parsed| strength = parsed.unwrap_or(DEFAULT_STRENGTH)),
                "num_outputs" => parse_optional(&value, "number of outputs")
                    .map(|parsed| form.num_outputs = parsed.unwrap_or(DEFAULT_OUTPUTS)),
                _ => Ok(()),
            };
            if let Err(e) = applied {
                errors.push(e);
            }
        }

        match form.request.mode {
            Mode::TextToImage => {
                form.request.source_image = None;
                form.request.strength = None;
            }
            Mode::ImageToImage => form.request.strength = Some(strength),
        }

        (form, errors)
    }
}

/// Drains a browser submission into fields, refusing more than
/// [`MAX_FORM_BYTES`] in total.
pub async fn read_fields(mut payload: Multipart) -> Result<Vec<FormField>> {
    let mut fields = Vec::new();
    let mut total = 0usize;

    while let Some(item) = payload.next().await {
        let mut field = item.map_err(|e| StudioError::MultipartError(e.to_string()))?;
        let name = field.name().map(str::to_string);
        let file_name = field
            .content_disposition()
            .and_then(|disposition| disposition.get_filename())
            .map(str::to_string);
        let content_type = field.content_type().map(|mime| mime.to_string());

        let mut data = BytesMut::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(|e| StudioError::MultipartError(e.to_string()))?;
            total += chunk.len();
            if total > MAX_FORM_BYTES {
                return Err(StudioError::MultipartError(format!(
                    "form submission is larger than {} bytes",
                    MAX_FORM_BYTES
                )));
            }
            data.extend_from_slice(&chunk);
        }

        if let Some(name) = name {
            fields.push(FormField {
                name,
                file_name,
                content_type,
                data: data.freeze(),
            });
        }
    }

    Ok(fields)
}

fn parse_optional<T: std::str::FromStr>(value: &str, label: &str) -> Result<Option<T>> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse()
        .map(Some)
        .map_err(|_| StudioError::ValidationError(format!("Invalid {}: '{}'", label, value)))
}
