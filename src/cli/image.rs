//! Image command implementation

use anyhow::{Context, Result};
use clap::Args;
use std::fs;
use std::path::{Path, PathBuf};

use super::utils::spinner;
use super::GlobalArgs;
use crate::config::CliOverrides;
use crate::domain::Config;
use crate::llm::image::sniff_extension;
use crate::llm::ImageClient;

#[derive(Args)]
pub struct ImageArgs {
    /// Description of the image to generate
    #[arg(value_name = "PROMPT", required = true, num_args = 1..)]
    pub prompt: Vec<String>,

    /// Write the image to FILE [default: generated.<ext> in the current directory]
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

pub fn run(args: ImageArgs, global: &GlobalArgs) -> Result<()> {
    let config = global.settings(&CliOverrides::default())?;
    let path = generate_image(&config, &args.prompt.join(" "), args.output.as_deref())?;
    println!("Saved image to {}", path.display());
    Ok(())
}

/// Generate an image for `prompt` and write it to `output` (or `generated.<ext>`).
pub fn generate_image(config: &Config, prompt: &str, output: Option<&Path>) -> Result<PathBuf> {
    let prompt = prompt.trim();
    if prompt.is_empty() {
        anyhow::bail!("Image prompt is empty");
    }
    let client = ImageClient::from_config(config)?;
    let progress = spinner("Generating image");
    let generated = client.generate(prompt);
    progress.finish_and_clear();
    let bytes = generated.context("Image generation failed")?;
    write_image(&bytes, output)
}

fn write_image(bytes: &[u8], output: Option<&Path>) -> Result<PathBuf> {
    let path = match output {
        Some(path) => path.to_path_buf(),
        None => PathBuf::from(format!("generated.{}", sniff_extension(bytes).unwrap_or("png"))),
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed creating {}", parent.display()))?;
    }
    fs::write(&path, bytes).with_context(|| format!("Failed writing {}", path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LlmError;
    use tempfile::TempDir;

    #[test]
    fn explicit_output_is_created_with_parents() {
        let tmp = TempDir::new().expect("tmp");
        let target = tmp.path().join("art/cat.jpg");
        let path = write_image(&[0xff, 0xd8, 0xff, 0xe0], Some(&target)).expect("write");
        assert_eq!(path, target);
        assert_eq!(fs::read(&path).expect("read"), vec![0xff, 0xd8, 0xff, 0xe0]);
    }

    #[test]
    fn missing_token_is_reported() {
        let config = Config { image_api_token: None, ..Config::default() };
        let err = generate_image(&config, "a lighthouse", None).expect_err("no token");
        assert!(matches!(err.downcast_ref::<LlmError>(), Some(LlmError::MissingImageToken)));
    }

    #[test]
    fn empty_prompt_is_rejected() {
        assert!(generate_image(&Config::default(), "   ", None).is_err());
    }
}
