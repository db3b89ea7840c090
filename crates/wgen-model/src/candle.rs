//! Candle backend for DeepSeek-Coder instruct models.
//!
//! Weights, config and tokenizer come from the Hugging Face hub (cached
//! locally by `hf-hub`). The model runs on CUDA device 0 in F16 when
//! available, otherwise on CPU in F32.

use std::path::PathBuf;

use candle_core::{Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::generation::LogitsProcessor;
use candle_transformers::models::llama::{Cache, Config, Llama, LlamaConfig};
use hf_hub::api::sync::{Api, ApiRepo};
use hf_hub::{Repo, RepoType};
use tokenizers::Tokenizer;
use tracing::{debug, info, warn};

use crate::backend::{BackendInfo, LoadedModel, ModelBackend, SamplingParams};
use crate::chat_template::{format_instruction, END_OF_SEQUENCE, END_OF_TURN};
use crate::config::{ModelConfig, Precision};
use crate::error::ModelError;

/// Local inference with Candle.
pub struct CandleBackend {
    config: ModelConfig,
    device: Device,
    precision: Precision,
}

impl CandleBackend {
    /// Pick the device and precision for `config`. Nothing is loaded yet.
    pub fn new(config: ModelConfig) -> Self {
        let device = select_device(config.use_gpu);
        let precision = Precision::for_device(device.is_cuda());
        Self { config, device, precision }
    }

    fn repo(&self) -> Result<ApiRepo, ModelError> {
        let api = Api::new()?;
        Ok(api.repo(Repo::with_revision(
            self.config.model_id(),
            RepoType::Model,
            self.config.revision.clone(),
        )))
    }
}

fn select_device(use_gpu: bool) -> Device {
    if use_gpu && candle_core::utils::cuda_is_available() {
        match Device::new_cuda(0) {
            Ok(device) => return device,
            Err(e) => warn!(error = %e, "CUDA reported available but device 0 failed, using CPU"),
        }
    }
    Device::Cpu
}

fn device_name(device: &Device) -> &'static str {
    if device.is_cuda() {
        "cuda:0"
    } else if device.is_metal() {
        "metal"
    } else {
        "cpu"
    }
}

impl ModelBackend for CandleBackend {
    fn info(&self) -> BackendInfo {
        BackendInfo {
            model_id: self.config.model_id(),
            device: device_name(&self.device).to_string(),
            precision: format!("{:?}", self.precision).to_lowercase(),
        }
    }

    fn load(&self) -> Result<Box<dyn LoadedModel>, ModelError> {
        let repo = self.repo()?;

        let tokenizer_path = repo.get("tokenizer.json")?;
        let tokenizer = Tokenizer::from_file(tokenizer_path)?;
        let eos_token = tokenizer
            .token_to_id(END_OF_TURN)
            .or_else(|| tokenizer.token_to_id(END_OF_SEQUENCE));
        if eos_token.is_none() {
            warn!("tokenizer has no end-of-turn token, generation will run to max tokens");
        }

        let config_path = repo.get("config.json")?;
        let config = parse_llama_config(&std::fs::read(config_path)?)?;

        let weights = weight_files(&repo)?;
        debug!(files = weights.len(), "loading safetensors");

        // SAFETY: the files are memory-mapped read-only from the hub cache and
        // are not modified while mapped.
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&weights, self.precision.dtype(), &self.device)
        }
        .map_err(|e| ModelError::Load(e.to_string()))?;
        let model = Llama::load(vb, &config).map_err(|e| ModelError::Load(e.to_string()))?;

        info!(
            vocab = tokenizer.get_vocab_size(true),
            max_positions = config.max_position_embeddings,
            "weights loaded"
        );

        Ok(Box::new(CandleModel {
            model,
            tokenizer,
            config,
            eos_token,
            device: self.device.clone(),
            precision: self.precision,
        }))
    }
}

/// Parse `config.json` into a Candle llama config.
///
/// DeepSeek-Coder configs carry `"rope_scaling": {"type": "linear", ...}`,
/// which the Candle llama config cannot represent. It is dropped with a
/// warning.
fn parse_llama_config(raw: &[u8]) -> Result<Config, ModelError> {
    let mut value: serde_json::Value =
        serde_json::from_slice(raw).map_err(|e| ModelError::Load(format!("config.json: {}", e)))?;

    if let Some(object) = value.as_object_mut() {
        let linear = object
            .get("rope_scaling")
            .and_then(|s| s.get("type").or_else(|| s.get("rope_type")))
            .and_then(|t| t.as_str())
            == Some("linear");
        if linear {
            warn!("linear rope scaling is not supported by the llama implementation, ignoring it");
            object.remove("rope_scaling");
        }
    }

    let config: LlamaConfig =
        serde_json::from_value(value).map_err(|e| ModelError::Load(format!("config.json: {}", e)))?;
    Ok(config.into_config(false))
}

/// Resolve every safetensors shard of the repository.
fn weight_files(repo: &ApiRepo) -> Result<Vec<PathBuf>, ModelError> {
    match repo.get("model.safetensors.index.json") {
        Ok(index_path) => {
            let index: serde_json::Value = serde_json::from_slice(&std::fs::read(index_path)?)
                .map_err(|e| ModelError::Load(format!("safetensors index: {}", e)))?;
            shard_names(&index)?
                .iter()
                .map(|name| repo.get(name).map_err(ModelError::from))
                .collect()
        }
        Err(_) => Ok(vec![repo.get("model.safetensors")?]),
    }
}

/// Unique shard file names from a safetensors index, sorted.
fn shard_names(index: &serde_json::Value) -> Result<Vec<String>, ModelError> {
    let weight_map = index
        .get("weight_map")
        .and_then(|m| m.as_object())
        .ok_or_else(|| ModelError::Load("safetensors index has no weight_map".to_string()))?;

    let mut names: Vec<String> = weight_map
        .values()
        .filter_map(|v| v.as_str())
        .map(str::to_string)
        .collect();
    names.sort();
    names.dedup();
    Ok(names)
}

struct CandleModel {
    model: Llama,
    tokenizer: Tokenizer,
    config: Config,
    eos_token: Option<u32>,
    device: Device,
    precision: Precision,
}

impl LoadedModel for CandleModel {
    fn generate(&self, prompt: &str, params: &SamplingParams) -> Result<String, ModelError> {
        let formatted = format_instruction(prompt);
        let mut tokens = self.tokenizer.encode(formatted, true)?.get_ids().to_vec();
        let prompt_len = tokens.len();

        let max_positions = self.config.max_position_embeddings;
        if prompt_len >= max_positions {
            return Err(ModelError::Inference(format!(
                "prompt is {} tokens, model context is {}",
                prompt_len, max_positions
            )));
        }
        let max_new_tokens = params.max_new_tokens.min(max_positions - prompt_len);

        // The cache lives for this call only; dropping it frees the KV memory.
        let mut cache = Cache::new(true, self.precision.dtype(), &self.config, &self.device)?;
        let (temperature, top_p) = if params.do_sample {
            (Some(params.temperature), Some(params.top_p))
        } else {
            (None, None)
        };
        let mut logits_processor = LogitsProcessor::new(params.seed, temperature, top_p);

        let mut generated: Vec<u32> = Vec::with_capacity(max_new_tokens);
        let mut index_pos = 0;
        for step in 0..max_new_tokens {
            let context_size = if step > 0 { 1 } else { tokens.len() };
            let context = &tokens[tokens.len().saturating_sub(context_size)..];
            let input = Tensor::new(context, &self.device)?.unsqueeze(0)?;
            let logits = self.model.forward(&input, index_pos, &mut cache)?;
            let logits = logits.squeeze(0)?;
            index_pos += context.len();

            let next_token = logits_processor.sample(&logits)?;
            if Some(next_token) == self.eos_token {
                break;
            }
            tokens.push(next_token);
            generated.push(next_token);
        }

        debug!(prompt_tokens = prompt_len, new_tokens = generated.len(), "decoding");
        Ok(self.tokenizer.decode(&generated, true)?)
    }

    fn release_transient(&self) {
        if self.device.is_cuda() {
            if let Err(e) = self.device.synchronize() {
                warn!(error = %e, "device synchronize failed after generation");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpu_when_gpu_disabled() {
        let backend = CandleBackend::new(ModelConfig { use_gpu: false, ..Default::default() });
        let info = backend.info();
        assert_eq!(info.device, "cpu");
        assert_eq!(info.precision, "f32");
        assert_eq!(info.model_id, "deepseek-ai/deepseek-coder-1.3b-instruct");
    }

    #[test]
    fn test_shard_names_are_unique_and_sorted() {
        let index = serde_json::json!({
            "metadata": {"total_size": 1},
            "weight_map": {
                "lm_head.weight": "model-00002-of-00002.safetensors",
                "model.embed_tokens.weight": "model-00001-of-00002.safetensors",
                "model.norm.weight": "model-00002-of-00002.safetensors"
            }
        });
        let names = shard_names(&index).unwrap();
        assert_eq!(
            names,
            vec!["model-00001-of-00002.safetensors", "model-00002-of-00002.safetensors"]
        );
    }

    #[test]
    fn test_shard_names_requires_weight_map() {
        let err = shard_names(&serde_json::json!({"metadata": {}})).unwrap_err();
        assert!(matches!(err, ModelError::Load(_)));
    }

    #[test]
    fn test_parse_config_drops_linear_rope_scaling() {
        let raw = serde_json::json!({
            "hidden_size": 64,
            "intermediate_size": 128,
            "vocab_size": 100,
            "num_hidden_layers": 2,
            "num_attention_heads": 4,
            "num_key_value_heads": 4,
            "rms_norm_eps": 1e-6,
            "rope_theta": 100000.0,
            "max_position_embeddings": 16384,
            "bos_token_id": 0,
            "eos_token_id": 1,
            "rope_scaling": {"type": "linear", "factor": 4.0}
        });
        let config = parse_llama_config(raw.to_string().as_bytes()).unwrap();
        assert_eq!(config.max_position_embeddings, 16384);
        assert_eq!(config.hidden_size, 64);
    }

    #[test]
    fn test_parse_config_rejects_garbage() {
        assert!(matches!(parse_llama_config(b"not json"), Err(ModelError::Load(_))));
    }
}
