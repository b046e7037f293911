use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ort::session::{Session, builder::GraphOptimizationLevel};
use ort::value::Tensor;
use tokenizers::Tokenizer;
use tokenizers::{PaddingParams, PaddingStrategy, TruncationParams, TruncationStrategy};

use super::{Embedder, normalize};
use crate::error::EmbeddingError;
use crate::models::EmbeddingConfig;

/// Synchronous inference over one bounded batch of texts.
trait BatchInference: Send + Sync + 'static {
    fn infer(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

/// Run `model` over `batch_size` slices of `texts` on the blocking pool, keeping input order.
async fn embed_in_batches<M: BatchInference>(
    model: &Arc<M>,
    texts: &[String],
    batch_size: usize,
) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    let mut all_embeddings = Vec::with_capacity(texts.len());

    for batch in texts.chunks(batch_size.max(1)) {
        let model = Arc::clone(model);
        let batch = batch.to_vec();
        let embeddings = tokio::task::spawn_blocking(move || model.infer(&batch))
            .await
            .map_err(|e| {
                EmbeddingError::InferenceError(format!("inference task failed: {e}"))
            })??;
        all_embeddings.extend(embeddings);
    }

    Ok(all_embeddings)
}

struct OnnxModel {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    dimension: usize,
    uses_token_type_ids: bool,
}

/// Local sentence-transformer running on ONNX Runtime.
///
/// Token embeddings are mean-pooled over the attention mask and L2-normalized,
/// matching the sentence-transformers pooling of MiniLM-style models. Inputs are
/// run `batch_size` texts at a time off the async worker threads.
pub struct OnnxEmbedder {
    model: Arc<OnnxModel>,
    model_id: String,
    dimension: usize,
    batch_size: usize,
}

impl OnnxEmbedder {
    pub fn load(config: &EmbeddingConfig, model_dir: &Path) -> Result<Self, EmbeddingError> {
        let model_path = model_dir.join("model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");
        let max_tokens = config.max_tokens as usize;

        if !model_path.exists() {
            return Err(EmbeddingError::ModelNotFound(format!(
                "model not found: {}",
                model_path.display()
            )));
        }

        let session = Session::builder()
            .map_err(|e: ort::Error| EmbeddingError::LoadError(e.to_string()))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e: ort::Error| EmbeddingError::LoadError(e.to_string()))?
            .with_intra_threads(num_cpus())
            .map_err(|e: ort::Error| EmbeddingError::LoadError(e.to_string()))?
            .commit_from_file(&model_path)
            .map_err(|e: ort::Error| EmbeddingError::LoadError(e.to_string()))?;

        let uses_token_type_ids = session
            .inputs
            .iter()
            .any(|input| input.name == "token_type_ids");

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| EmbeddingError::TokenizerError(e.to_string()))?;

        // Truncate long chunks instead of failing on them
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: max_tokens,
                strategy: TruncationStrategy::LongestFirst,
                ..Default::default()
            }))
            .map_err(|e| EmbeddingError::TokenizerError(e.to_string()))?;

        tokenizer.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::BatchLongest,
            ..Default::default()
        }));

        let dimension = config.dimension as usize;
        Ok(Self {
            model: Arc::new(OnnxModel {
                session: Mutex::new(session),
                tokenizer,
                dimension,
                uses_token_type_ids,
            }),
            model_id: config.model_id.clone(),
            dimension,
            batch_size: (config.batch_size as usize).max(1),
        })
    }
}

impl BatchInference for OnnxModel {
    fn infer(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| EmbeddingError::TokenizerError(e.to_string()))?;

        let max_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0);
        let batch_size = encodings.len();

        let mut input_ids = vec![0i64; batch_size * max_len];
        let mut attention_mask = vec![0i64; batch_size * max_len];
        let mut token_type_ids = vec![0i64; batch_size * max_len];

        for (i, encoding) in encodings.iter().enumerate() {
            let ids = encoding.get_ids();
            let mask = encoding.get_attention_mask();
            let types = encoding.get_type_ids();
            for j in 0..ids.len() {
                input_ids[i * max_len + j] = i64::from(ids[j]);
                attention_mask[i * max_len + j] = i64::from(mask[j]);
                token_type_ids[i * max_len + j] = types.get(j).map_or(0, |&t| i64::from(t));
            }
        }

        let input_ids_tensor = Tensor::from_array(([batch_size, max_len], input_ids))
            .map_err(|e: ort::Error| EmbeddingError::InferenceError(e.to_string()))?;
        let attention_mask_tensor =
            Tensor::from_array(([batch_size, max_len], attention_mask.clone()))
                .map_err(|e: ort::Error| EmbeddingError::InferenceError(e.to_string()))?;
        let token_type_ids_tensor = Tensor::from_array(([batch_size, max_len], token_type_ids))
            .map_err(|e: ort::Error| EmbeddingError::InferenceError(e.to_string()))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| EmbeddingError::InferenceError("session lock poisoned".to_string()))?;

        let outputs = if self.uses_token_type_ids {
            session.run(ort::inputs![
                "input_ids" => input_ids_tensor,
                "attention_mask" => attention_mask_tensor,
                "token_type_ids" => token_type_ids_tensor
            ])
        } else {
            session.run(ort::inputs![
                "input_ids" => input_ids_tensor,
                "attention_mask" => attention_mask_tensor
            ])
        }
        .map_err(|e: ort::Error| EmbeddingError::InferenceError(e.to_string()))?;

        let output_array = outputs[0]
            .try_extract_array::<f32>()
            .map_err(|e: ort::Error| EmbeddingError::InferenceError(e.to_string()))?;

        let shape = output_array.shape().to_vec();
        let hidden = *shape.last().unwrap_or(&0);
        if hidden != self.dimension {
            return Err(EmbeddingError::InferenceError(format!(
                "model produced {hidden}-dimensional vectors, configured dimension is {}",
                self.dimension
            )));
        }

        let embeddings: Vec<Vec<f32>> = match shape.len() {
            // Token embeddings: mean-pool over unmasked positions
            3 => (0..batch_size)
                .map(|i| {
                    let mut pooled = vec![0.0f32; hidden];
                    let mut count = 0.0f32;
                    for j in 0..max_len {
                        if attention_mask[i * max_len + j] == 0 {
                            continue;
                        }
                        count += 1.0;
                        for (d, value) in pooled.iter_mut().enumerate() {
                            *value += output_array[[i, j, d]];
                        }
                    }
                    if count > 0.0 {
                        pooled.iter_mut().for_each(|v| *v /= count);
                    }
                    normalize(&pooled)
                })
                .collect(),
            // Already pooled sentence embeddings
            2 => (0..batch_size)
                .map(|i| {
                    let embedding: Vec<f32> = (0..hidden).map(|d| output_array[[i, d]]).collect();
                    normalize(&embedding)
                })
                .collect(),
            _ => {
                return Err(EmbeddingError::InferenceError(format!(
                    "unexpected output shape: {:?}",
                    shape
                )));
            }
        };

        Ok(embeddings)
    }
}

#[async_trait]
impl Embedder for OnnxEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        embed_in_batches(&self.model, texts, self.batch_size).await
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Embeds each text as its parsed number and records batch sizes.
    #[derive(Default)]
    struct CountingModel {
        batches: Mutex<Vec<usize>>,
    }

    impl BatchInference for CountingModel {
        fn infer(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            self.batches.lock().unwrap().push(texts.len());
            texts
                .iter()
                .map(|t| {
                    t.parse::<f32>()
                        .map(|v| vec![v])
                        .map_err(|e| EmbeddingError::InferenceError(e.to_string()))
                })
                .collect()
        }
    }

    fn numbers(n: usize) -> Vec<String> {
        (0..n).map(|i| i.to_string()).collect()
    }

    #[tokio::test]
    async fn test_large_input_is_split_and_keeps_order() {
        let model = Arc::new(CountingModel::default());

        let embeddings = embed_in_batches(&model, &numbers(7), 3).await.unwrap();

        let expected: Vec<Vec<f32>> = (0..7).map(|i| vec![i as f32]).collect();
        assert_eq!(embeddings, expected);
        assert_eq!(*model.batches.lock().unwrap(), vec![3, 3, 1]);
    }

    #[tokio::test]
    async fn test_batch_error_stops_embedding() {
        let model = Arc::new(CountingModel::default());
        let mut texts = numbers(4);
        texts[1] = "not a number".to_string();

        let err = embed_in_batches(&model, &texts, 2).await.unwrap_err();

        assert!(matches!(err, EmbeddingError::InferenceError(_)));
        assert_eq!(*model.batches.lock().unwrap(), vec![2]);
    }

    #[tokio::test]
    async fn test_empty_input_runs_no_batches() {
        let model = Arc::new(CountingModel::default());
        assert!(embed_in_batches(&model, &[], 4).await.unwrap().is_empty());
        assert!(model.batches.lock().unwrap().is_empty());
    }
}
