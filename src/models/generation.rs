use std::fmt;
use std::path::Path;
use std::str::FromStr;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::{
    error::{Result, StudioError},
    models::common::{parse_choice, Choice},
    multipart::FormField,
};

pub const MAX_SEED: u64 = 4_294_967_294;
pub const DEFAULT_STRENGTH: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Mode {
    #[default]
    #[serde(rename = "text-to-image")]
    TextToImage,
    #[serde(rename = "image-to-image")]
    ImageToImage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    #[serde(rename = "16:9")]
    Ratio16x9,
    #[default]
    #[serde(rename = "1:1")]
    Ratio1x1,
    #[serde(rename = "21:9")]
    Ratio21x9,
    #[serde(rename = "2:3")]
    Ratio2x3,
    #[serde(rename = "3:2")]
    Ratio3x2,
    #[serde(rename = "4:5")]
    Ratio4x5,
    #[serde(rename = "5:4")]
    Ratio5x4,
    #[serde(rename = "9:16")]
    Ratio9x16,
    #[serde(rename = "9:21")]
    Ratio9x21,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Png,
    Jpeg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SdModel {
    #[default]
    #[serde(rename = "sd3")]
    Sd3,
    #[serde(rename = "sd3-turbo")]
    Sd3Turbo,
}

impl Choice for Mode {
    const LABEL: &'static str = "mode";
    const ALL: &'static [Self] = &[Mode::TextToImage, Mode::ImageToImage];

    fn as_str(&self) -> &'static str {
        match self {
            Mode::TextToImage => "text-to-image",
            Mode::ImageToImage => "image-to-image",
        }
    }
}

impl Choice for AspectRatio {
    const LABEL: &'static str = "aspect ratio";
    const ALL: &'static [Self] = &[
        AspectRatio::Ratio16x9,
        AspectRatio::Ratio1x1,
        AspectRatio::Ratio21x9,
        AspectRatio::Ratio2x3,
        AspectRatio::Ratio3x2,
        AspectRatio::Ratio4x5,
        AspectRatio::Ratio5x4,
        AspectRatio::Ratio9x16,
        AspectRatio::Ratio9x21,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Ratio16x9 => "16:9",
            AspectRatio::Ratio1x1 => "1:1",
            AspectRatio::Ratio21x9 => "21:9",
            AspectRatio::Ratio2x3 => "2:3",
            AspectRatio::Ratio3x2 => "3:2",
            AspectRatio::Ratio4x5 => "4:5",
            AspectRatio::Ratio5x4 => "5:4",
            AspectRatio::Ratio9x16 => "9:16",
            AspectRatio::Ratio9x21 => "9:21",
        }
    }
}

impl Choice for OutputFormat {
    const LABEL: &'static str = "output format";
    const ALL: &'static [Self] = &[OutputFormat::Png, OutputFormat::Jpeg];

    fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpeg",
        }
    }
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        self.as_str()
    }
}

impl Choice for SdModel {
    const LABEL: &'static str = "model";
    const ALL: &'static [Self] = &[SdModel::Sd3, SdModel::Sd3Turbo];

    fn as_str(&self) -> &'static str {
        match self {
            SdModel::Sd3 => "sd3",
            SdModel::Sd3Turbo => "sd3-turbo",
        }
    }
}

impl SdModel {
    /// Prefix for output file names; keeps "sd3" and "sd3-turbo" apart.
    pub fn file_prefix(&self) -> &'static str {
        match self {
            SdModel::Sd3 => "sd3",
            SdModel::Sd3Turbo => "sd3_turbo",
        }
    }
}

macro_rules! choice_text_impls {
    ($($ty:ty),*) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.as_str())
                }
            }

            impl FromStr for $ty {
                type Err = StudioError;

                fn from_str(s: &str) -> Result<Self> {
                    parse_choice(s)
                }
            }
        )*
    };
}

choice_text_impls!(Mode, AspectRatio, OutputFormat, SdModel);

/// Uploaded image used as the starting point in image-to-image mode.
#[derive(Clone, PartialEq)]
pub struct SourceImage {
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

impl SourceImage {
    pub fn new(file_name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        let file_name = file_name.into();
        let content_type = guess_image_type(&file_name);
        Self {
            file_name,
            content_type,
            data: data.into(),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image.png".to_string());
        Ok(Self::new(file_name, data))
    }
}

impl fmt::Debug for SourceImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceImage")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.data.len())
            .finish()
    }
}

fn guess_image_type(file_name: &str) -> String {
    let extension = Path::new(file_name)
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase());
    match extension.as_deref() {
        Some("jpg") | Some("jpeg") => mime::IMAGE_JPEG.to_string(),
        _ => mime::IMAGE_PNG.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub negative_prompt: Option<String>,
    pub mode: Mode,
    pub aspect_ratio: AspectRatio,
    pub output_format: OutputFormat,
    pub model: SdModel,
    pub seed: Option<u64>,
    pub source_image: Option<SourceImage>,
    pub strength: Option<f32>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            negative_prompt: None,
            mode: Mode::TextToImage,
            aspect_ratio: AspectRatio::default(),
            output_format: OutputFormat::default(),
            model: SdModel::default(),
            seed: None,
            source_image: None,
            strength: None,
        }
    }

    pub fn image_to_image(prompt: impl Into<String>, image: SourceImage, strength: f32) -> Self {
        Self::new(prompt)
            .with_mode(Mode::ImageToImage)
            .with_source_image(image)
            .with_strength(strength)
    }

    pub fn with_negative_prompt(mut self, negative_prompt: impl Into<String>) -> Self {
        self.negative_prompt = Some(negative_prompt.into());
        self
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_aspect_ratio(mut self, aspect_ratio: AspectRatio) -> Self {
        self.aspect_ratio = aspect_ratio;
        self
    }

    pub fn with_output_format(mut self, output_format: OutputFormat) -> Self {
        self.output_format = output_format;
        self
    }

    pub fn with_model(mut self, model: SdModel) -> Self {
        self.model = model;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_source_image(mut self, image: SourceImage) -> Self {
        self.source_image = Some(image);
        self
    }

    pub fn with_strength(mut self, strength: f32) -> Self {
        self.strength = Some(strength);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.prompt.trim().is_empty() {
            return Err(StudioError::ValidationError(
                "Please enter a prompt.".to_string(),
            ));
        }

        if let Some(strength) = self.strength {
            if !(0.0..=1.0).contains(&strength) {
                return Err(StudioError::ValidationError(format!(
                    "Strength must be between 0.0 and 1.0, got {}",
                    strength
                )));
            }
        }

        if let Some(seed) = self.seed {
            if seed > MAX_SEED {
                return Err(StudioError::ValidationError(format!(
                    "Seed must be at most {}, got {}",
                    MAX_SEED, seed
                )));
            }
        }

        Ok(())
    }

    /// The multipart fields sent for this request. Only fields that apply to
    /// the selected mode are present.
    pub fn form_fields(&self) -> Vec<FormField> {
        let mut fields = vec![
            FormField::text("prompt", &self.prompt),
            FormField::text("model", self.model.as_str()),
            FormField::text("mode", self.mode.as_str()),
            FormField::text("output_format", self.output_format.as_str()),
        ];

        match self.mode {
            Mode::TextToImage => {
                fields.push(FormField::text("aspect_ratio", self.aspect_ratio.as_str()));
            }
            Mode::ImageToImage => {
                if let Some(image) = &self.source_image {
                    fields.push(FormField::file(
                        "image",
                        &image.file_name,
                        &image.content_type,
                        image.data.clone(),
                    ));
                }
                if let Some(strength) = self.strength {
                    fields.push(FormField::text("strength", strength.to_string()));
                }
            }
        }

        if let Some(negative_prompt) = self.negative_prompt.as_deref() {
            if !negative_prompt.is_empty() {
                fields.push(FormField::text("negative_prompt", negative_prompt));
            }
        }

        if let Some(seed) = self.seed {
            fields.push(FormField::text("seed", seed.to_string()));
        }

        fields
    }
}
