//! Subword tokenizer integration.

use std::path::Path;
use tensorprep_core::{Result, TensorPrepError};
use tokenizers::decoders::DecoderWrapper;
use tokenizers::models::bpe::{BpeTrainerBuilder, BPE};
use tokenizers::normalizers::NormalizerWrapper;
use tokenizers::pre_tokenizers::whitespace::Whitespace;
use tokenizers::pre_tokenizers::PreTokenizerWrapper;
use tokenizers::processors::PostProcessorWrapper;
use tokenizers::TokenizerBuilder;

/// Wrapper around the tokenizers library.
///
/// Models are BPE over whitespace-split words. Decoding without a decoder
/// component joins tokens with single spaces, which is exactly the
/// granularity the pipelines need.
pub struct SubwordTokenizer {
    inner: tokenizers::Tokenizer,
}

impl SubwordTokenizer {
    /// Train a BPE model on a plain-text file, one sample per line.
    ///
    /// The trained model is saved to `model_path` and then loaded back,
    /// so the returned tokenizer is exactly what a later
    /// [`SubwordTokenizer::from_file`] would produce.
    pub fn train(tokens_file: &Path, model_path: &Path, vocab_size: usize) -> Result<Self> {
        let mut trainer = BpeTrainerBuilder::new()
            .vocab_size(vocab_size)
            .show_progress(false)
            .build();

        let mut tokenizer = TokenizerBuilder::<
            BPE,
            NormalizerWrapper,
            PreTokenizerWrapper,
            PostProcessorWrapper,
            DecoderWrapper,
        >::new()
        .with_model(BPE::default())
        .with_normalizer(None)
        .with_pre_tokenizer(Some(PreTokenizerWrapper::Whitespace(Whitespace {})))
        .with_post_processor(None)
        .with_decoder(None)
        .build()
        .map_err(|e| TensorPrepError::Tokenizer(e.to_string()))?;

        tracing::info!(
            "Training tokenizer (vocab_size={}) on {}",
            vocab_size,
            tokens_file.display()
        );

        tokenizer
            .train_from_files(
                &mut trainer,
                vec![tokens_file.to_string_lossy().into_owned()],
            )
            .map_err(|e| TensorPrepError::Tokenizer(e.to_string()))?
            .save(model_path, false)
            .map_err(|e| TensorPrepError::Tokenizer(e.to_string()))?;

        Self::from_file(model_path)
    }

    /// Load a tokenizer from a saved model file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let inner = tokenizers::Tokenizer::from_file(path)
            .map_err(|e| TensorPrepError::Tokenizer(e.to_string()))?;
        Ok(Self { inner })
    }

    /// Encode text to token IDs.
    pub fn encode(&self, text: &str) -> Result<Vec<u32>> {
        let encoding = self
            .inner
            .encode(text, false)
            .map_err(|e| TensorPrepError::Tokenizer(e.to_string()))?;
        Ok(encoding.get_ids().to_vec())
    }

    /// Encode a batch of texts to token IDs.
    pub fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<u32>>> {
        let inputs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let encodings = self
            .inner
            .encode_batch(inputs, false)
            .map_err(|e| TensorPrepError::Tokenizer(e.to_string()))?;
        Ok(encodings
            .into_iter()
            .map(|e| e.get_ids().to_vec())
            .collect())
    }

    /// Decode token IDs to text.
    pub fn decode(&self, ids: &[u32]) -> Result<String> {
        self.inner
            .decode(ids, true)
            .map_err(|e| TensorPrepError::Tokenizer(e.to_string()))
    }

    /// Number of entries in the trained vocabulary.
    ///
    /// May be smaller than the requested size when the training corpus
    /// does not support that many merges.
    pub fn vocab_size(&self) -> usize {
        self.inner.get_vocab_size(true)
    }
}
