use anyhow::{anyhow, Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::xlm_roberta::{Config as XLMRobertaConfig, XLMRobertaModel};
use tokenizers::Tokenizer;

use docvec_core::Embedder;

use crate::device::select_device;
use crate::pool::masked_mean_l2;
use crate::tokenize::tokenize_batch;

/// XLM-RoBERTa pad token.
const PAD_ID: u32 = 1;

/// BGE-M3 dense embedder running on candle. Expects `tokenizer.json`,
/// `config.json` and `pytorch_model.bin` in the model directory.
pub struct BgeM3Embedder {
    model: XLMRobertaModel,
    tokenizer: Tokenizer,
    device: Device,
    dimension: usize,
    max_len: usize,
    batch_size: usize,
    id: String,
}

impl BgeM3Embedder {
    pub fn load(model_dir: &Path, max_len: usize, batch_size: usize) -> Result<Self> {
        let device = select_device();
        let model_dir = resolve_model_dir(model_dir)?;
        tracing::info!(dir = %model_dir.display(), "loading BGE-M3 model");

        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;

        let config_path = model_dir.join("config.json");
        let raw: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(&config_path)
                .with_context(|| format!("reading {}", config_path.display()))?,
        )?;
        let dimension = raw
            .get("hidden_size")
            .and_then(serde_json::Value::as_u64)
            .ok_or_else(|| anyhow!("{} has no hidden_size", config_path.display()))? as usize;
        let config: XLMRobertaConfig = serde_json::from_value(raw)?;

        let weights_path = model_dir.join("pytorch_model.bin");
        let weights: HashMap<String, Tensor> = candle_core::pickle::read_all(&weights_path)
            .with_context(|| format!("reading {}", weights_path.display()))?
            .into_iter()
            .collect();
        let vb = VarBuilder::from_tensors(weights, DType::F32, &device);
        let model = XLMRobertaModel::new(&config, vb)?;
        tracing::info!(dimension, "BGE-M3 model loaded");

        Ok(Self {
            model,
            tokenizer,
            device,
            dimension,
            max_len: max_len.max(1),
            batch_size: batch_size.max(1),
            id: format!("bge-m3:d{dimension}"),
        })
    }

    fn embed_group(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let (input_ids, attention_mask) =
            tokenize_batch(&self.tokenizer, texts, self.max_len, PAD_ID, &self.device)?;
        let token_type_ids = input_ids.zeros_like()?;
        let hidden = self
            .model
            .forward(&input_ids, &attention_mask, &token_type_ids, None, None, None)?;
        let pooled = masked_mean_l2(&hidden, &attention_mask)?;
        let rows: Vec<Vec<f32>> = pooled.to_device(&Device::Cpu)?.to_vec2()?;
        Ok(rows)
    }
}

impl Embedder for BgeM3Embedder {
    fn id(&self) -> &str {
        &self.id
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let start = Instant::now();
        let mut out = Vec::with_capacity(texts.len());
        for group in texts.chunks(self.batch_size) {
            out.extend(self.embed_group(group)?);
        }
        tracing::debug!(
            texts = texts.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "embedded batch"
        );
        Ok(out)
    }
}

/// `APP_MODEL_DIR` overrides the configured directory when it exists.
fn resolve_model_dir(configured: &Path) -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("APP_MODEL_DIR") {
        let p = PathBuf::from(dir);
        if p.exists() {
            return Ok(p);
        }
        tracing::warn!(dir = %p.display(), "APP_MODEL_DIR does not exist, ignoring");
    }
    if configured.exists() {
        return Ok(configured.to_path_buf());
    }
    Err(anyhow!("Could not locate BGE-M3 model directory at {}", configured.display()))
}
