//! Text corpus pipeline.
//!
//! Construction runs the whole preparation eagerly: fetch each declared
//! split, extract parallel (input, target) text, train a subword
//! tokenizer on the combined text of every split, then encode, trim, and
//! pad each split to fixed lengths. The materialized splits are then
//! immutable; batch loaders are created fresh on each
//! [`TextDataset::loaders`] call.

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::io::BufRead;
use std::path::PathBuf;
use tensorprep_core::{AccessToken, Result, TensorPrepError, TextConfig};

use crate::dataloader::LoaderConfig;
use crate::policy::{text_policy, TextPolicy};
use crate::text_loader::TextLoader;
use crate::tokenizer::SubwordTokenizer;

/// Encoded, trimmed, and padded id sequences of one split.
#[derive(Debug, Clone)]
pub struct EncodedSplit {
    /// Input id sequences, all padded to the dataset's input length.
    pub x: Vec<Vec<u32>>,
    /// Target id sequences, all padded to the dataset's target length.
    pub target: Vec<Vec<u32>>,
}

/// A fully materialized text dataset, encoded and ready for batching.
pub struct TextDataset {
    policy: Box<dyn TextPolicy>,
    config: TextConfig,
    tokenizer: SubwordTokenizer,
    sp_vocab_size: usize,
    pad_token: u32,
    start_token: u32,
    stop_token: u32,
    x_length: usize,
    target_length: usize,
    splits: Vec<(String, EncodedSplit)>,
}

impl TextDataset {
    /// Build the corpus named in the configuration.
    pub fn new(config: TextConfig) -> Result<Self> {
        let policy = text_policy(&config.name)?;
        Self::with_policy(config, policy)
    }

    /// Build a dataset with an explicit policy.
    pub fn with_policy(config: TextConfig, policy: Box<dyn TextPolicy>) -> Result<Self> {
        let sp_vocab_size = config.vocab_size;
        let pad_token = sp_vocab_size as u32;
        let start_token = pad_token + 1;
        let stop_token = pad_token + 2;

        let token = config.hub_token.clone().map(AccessToken::from);

        // Extract every split's text pairs up front; the tokenizer is
        // trained on all of it, validation and test included.
        let mut split_text = Vec::new();
        let mut tokenizer_lines = String::new();
        for (i, split) in policy.splits().iter().enumerate() {
            let mut records =
                Self::load_split_records(&config, policy.as_ref(), split, token.as_ref())?;
            if let Some(cap) = policy.split_caps().and_then(|caps| caps.get(i).copied().flatten()) {
                records.truncate(cap);
            }

            let (x, target) = policy.split_x_target(&records)?;
            tracing::info!("Split '{}' of '{}': {} pairs", split, policy.name(), x.len());

            for text in x.iter().chain(target.iter()) {
                tokenizer_lines.push_str(text);
                tokenizer_lines.push('\n');
            }
            split_text.push((split.to_string(), x, target));
        }

        let data_dir = tensorprep_hub::ensure_data_dir(config.data_dir.as_deref())?;
        let tokens_path = data_dir.join(format!("{}_tokens.txt", policy.name()));
        let model_path = data_dir.join(format!("{}.json", policy.name()));
        std::fs::write(&tokens_path, &tokenizer_lines)?;
        let tokenizer = SubwordTokenizer::train(&tokens_path, &model_path, sp_vocab_size)?;

        // Encode, trim, and pad each split. Whichever split is processed
        // first fixes the padding lengths for the rest of the run.
        let mut x_length = policy.x_length();
        let mut target_length = policy.target_length();
        let mut splits = Vec::new();
        for (name, x_text, target_text) in split_text {
            let x = tokenizer.encode_batch(&x_text)?;
            let target = tokenizer.encode_batch(&target_text)?;

            let x_limit = policy.x_length().unwrap_or_else(|| max_len(&x));
            let target_limit = policy.target_length().unwrap_or_else(|| max_len(&target));
            let (x, target) = policy.trim(x, target, x_limit, target_limit);

            let x_len = *x_length.get_or_insert_with(|| max_len(&x));
            let target_len = *target_length.get_or_insert_with(|| max_len(&target));

            let x = pad_sequences(x, x_len, pad_token);
            let target = pad_sequences(target, target_len, pad_token);
            splits.push((name, EncodedSplit { x, target }));
        }

        Ok(Self {
            policy,
            config,
            tokenizer,
            sp_vocab_size,
            pad_token,
            start_token,
            stop_token,
            x_length: x_length.unwrap_or(0),
            target_length: target_length.unwrap_or(0),
            splits,
        })
    }

    /// Load one split's records, from the local directory when configured,
    /// otherwise from the hub. Applies the policy's subset field.
    fn load_split_records(
        config: &TextConfig,
        policy: &dyn TextPolicy,
        split: &str,
        token: Option<&AccessToken>,
    ) -> Result<Vec<serde_json::Value>> {
        let path = match &config.local_dir {
            Some(dir) => {
                let path = PathBuf::from(dir).join(format!("{split}.jsonl"));
                if !path.exists() {
                    return Err(TensorPrepError::Corpus(format!(
                        "no local split file at {}",
                        path.display()
                    )));
                }
                path
            }
            None => tensorprep_hub::fetch_corpus_split(
                policy.corpus_id(),
                policy.version(),
                split,
                token,
            )?,
        };

        let file = std::fs::File::open(&path)?;
        let reader = std::io::BufReader::new(file);

        let mut records = Vec::new();
        for (line_num, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let value: serde_json::Value = serde_json::from_str(&line).map_err(|e| {
                TensorPrepError::Serialization(format!(
                    "{}:{}: {}",
                    path.display(),
                    line_num + 1,
                    e
                ))
            })?;
            let value = match policy.subset() {
                Some(field) => value.get(field).cloned().ok_or_else(|| {
                    TensorPrepError::Corpus(format!(
                        "{}:{}: record is missing the '{}' field",
                        path.display(),
                        line_num + 1,
                        field
                    ))
                })?,
                None => value,
            };
            records.push(value);
        }
        Ok(records)
    }

    /// The policy this dataset was prepared with.
    pub fn policy(&self) -> &dyn TextPolicy {
        self.policy.as_ref()
    }

    /// The tokenizer trained during construction.
    pub fn tokenizer(&self) -> &SubwordTokenizer {
        &self.tokenizer
    }

    /// Configured subword vocabulary size (excludes sentinels).
    pub fn sp_vocab_size(&self) -> usize {
        self.sp_vocab_size
    }

    /// One-hot width: subword vocabulary plus the three sentinels.
    pub fn vocab_size(&self) -> usize {
        self.sp_vocab_size + 3
    }

    /// Padding sentinel id.
    pub fn pad_token(&self) -> u32 {
        self.pad_token
    }

    /// Start-of-sequence sentinel id.
    pub fn start_token(&self) -> u32 {
        self.start_token
    }

    /// End-of-sequence sentinel id.
    pub fn stop_token(&self) -> u32 {
        self.stop_token
    }

    /// Padded input sequence length.
    pub fn x_length(&self) -> usize {
        self.x_length
    }

    /// Padded target sequence length.
    pub fn target_length(&self) -> usize {
        self.target_length
    }

    /// Split names in processing order.
    pub fn split_names(&self) -> Vec<&str> {
        self.splits.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Encoded sequences of one split.
    pub fn split(&self, name: &str) -> Option<&EncodedSplit> {
        self.splits
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, split)| split)
    }

    /// Decode one id sequence, stripping sentinel ids first.
    pub fn decode_ids(&self, ids: &[i64]) -> Result<String> {
        let real: Vec<u32> = ids
            .iter()
            .filter(|&&id| id >= 0 && (id as usize) < self.sp_vocab_size)
            .map(|&id| id as u32)
            .collect();
        self.tokenizer.decode(&real)
    }

    /// Decode each row of a batch of ids.
    pub fn decode_batch(&self, ids: ndarray::ArrayView2<'_, i64>) -> Result<Vec<String>> {
        ids.rows()
            .into_iter()
            .map(|row| {
                let ids: Vec<i64> = row.iter().copied().collect();
                self.decode_ids(&ids)
            })
            .collect()
    }

    /// Create one batch loader per split, in declared split order.
    ///
    /// A single shuffle stream seeded from `config.seed` drives every
    /// loader unless `config.reseed_per_split` is set.
    pub fn loaders(&self, config: &LoaderConfig) -> Vec<(String, TextLoader)> {
        let mut rng = StdRng::seed_from_u64(config.seed);
        self.splits
            .iter()
            .map(|(name, split)| {
                if config.reseed_per_split {
                    rng = StdRng::seed_from_u64(config.seed);
                }
                let loader = TextLoader::new(
                    split.x.clone(),
                    split.target.clone(),
                    self.start_token,
                    self.vocab_size(),
                    config.clone(),
                    self.config.device,
                    &mut rng,
                );
                (name.clone(), loader)
            })
            .collect()
    }
}

fn max_len(seqs: &[Vec<u32>]) -> usize {
    seqs.iter().map(Vec::len).max().unwrap_or(0)
}

/// Right-pad every sequence to `length`. Longer sequences pass through
/// untouched; the trim stage is responsible for bounding them.
fn pad_sequences(mut seqs: Vec<Vec<u32>>, length: usize, pad_token: u32) -> Vec<Vec<u32>> {
    for seq in &mut seqs {
        while seq.len() < length {
            seq.push(pad_token);
        }
    }
    seqs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::OpusBooksPolicy;
    use std::io::Write;

    struct EchoPolicy;

    impl TextPolicy for EchoPolicy {
        fn name(&self) -> &str {
            "echo"
        }
        fn corpus_id(&self) -> &str {
            "echo"
        }
        fn splits(&self) -> &[&str] {
            &["train", "validation"]
        }
        fn split_x_target(
            &self,
            records: &[serde_json::Value],
        ) -> Result<(Vec<String>, Vec<String>)> {
            let mut x = Vec::new();
            let mut target = Vec::new();
            for record in records {
                x.push(record["x"].as_str().unwrap().to_string());
                target.push(record["y"].as_str().unwrap().to_string());
            }
            Ok((x, target))
        }
    }

    struct CappedPolicy;

    impl TextPolicy for CappedPolicy {
        fn name(&self) -> &str {
            "capped"
        }
        fn corpus_id(&self) -> &str {
            "capped"
        }
        fn splits(&self) -> &[&str] {
            &["train"]
        }
        fn split_caps(&self) -> Option<&[Option<usize>]> {
            Some(&[Some(2)])
        }
        fn split_x_target(
            &self,
            records: &[serde_json::Value],
        ) -> Result<(Vec<String>, Vec<String>)> {
            EchoPolicy.split_x_target(records)
        }
    }

    fn write_split(dir: &std::path::Path, name: &str, pairs: &[(&str, &str)]) {
        let mut file = std::fs::File::create(dir.join(format!("{name}.jsonl"))).unwrap();
        for (x, y) in pairs {
            writeln!(file, r#"{{"x": "{}", "y": "{}"}}"#, x, y).unwrap();
        }
    }

    fn echo_config(dir: &std::path::Path) -> TextConfig {
        TextConfig {
            vocab_size: 100,
            data_dir: Some(dir.to_string_lossy().into_owned()),
            local_dir: Some(dir.to_string_lossy().into_owned()),
            ..TextConfig::named("echo")
        }
    }

    /// Two splits over a tiny repeated vocabulary. Train carries the
    /// longest texts so it fixes the padding lengths.
    fn echo_dataset() -> (tempfile::TempDir, TextDataset) {
        let tmp = tempfile::tempdir().unwrap();
        let mut train: Vec<(&str, &str)> = Vec::new();
        for _ in 0..20 {
            train.push(("the cat sat on the mat", "the mat"));
            train.push(("the cat ran", "the cat sat"));
        }
        write_split(tmp.path(), "train", &train);
        write_split(
            tmp.path(),
            "validation",
            &[("the mat", "the cat"), ("the cat sat", "the mat sat")],
        );

        let dataset =
            TextDataset::with_policy(echo_config(tmp.path()), Box::new(EchoPolicy)).unwrap();
        (tmp, dataset)
    }

    #[test]
    fn test_sentinels_sit_above_the_vocabulary() {
        let (_tmp, dataset) = echo_dataset();
        assert_eq!(dataset.pad_token(), 100);
        assert_eq!(dataset.start_token(), 101);
        assert_eq!(dataset.stop_token(), 102);
        assert_eq!(dataset.vocab_size(), 103);
        assert!(dataset.tokenizer().vocab_size() <= dataset.sp_vocab_size());
    }

    #[test]
    fn test_all_sequences_padded_to_split_wide_lengths() {
        let (_tmp, dataset) = echo_dataset();
        let x_len = dataset.x_length();
        let target_len = dataset.target_length();
        assert!(x_len > 0);

        for name in ["train", "validation"] {
            let split = dataset.split(name).unwrap();
            for seq in &split.x {
                assert_eq!(seq.len(), x_len);
            }
            for seq in &split.target {
                assert_eq!(seq.len(), target_len);
            }
        }
    }

    #[test]
    fn test_right_padding_only() {
        let (_tmp, dataset) = echo_dataset();
        let split = dataset.split("train").unwrap();
        for seq in split.x.iter().chain(split.target.iter()) {
            let mut seen_pad = false;
            for &id in seq {
                if id == dataset.pad_token() {
                    seen_pad = true;
                } else {
                    assert!(!seen_pad, "real token after padding in {:?}", seq);
                }
            }
        }
    }

    #[test]
    fn test_first_split_fixes_padding_length() {
        let (_tmp, dataset) = echo_dataset();
        // Validation texts are all shorter than train's longest, yet its
        // sequences are padded out to the train-derived length.
        let val = dataset.split("validation").unwrap();
        for seq in &val.x {
            assert_eq!(seq.len(), dataset.x_length());
        }
    }

    #[test]
    fn test_decode_strips_sentinels() {
        let (_tmp, dataset) = echo_dataset();
        let ids = dataset.tokenizer().encode("the cat sat").unwrap();
        let mut padded: Vec<i64> = ids.iter().map(|&i| i as i64).collect();
        padded.push(dataset.pad_token() as i64);
        padded.push(dataset.pad_token() as i64);

        assert_eq!(dataset.decode_ids(&padded).unwrap(), "the cat sat");
    }

    #[test]
    fn test_loaders_in_declared_order_with_one_hot_shapes() {
        let (_tmp, dataset) = echo_dataset();
        let config = LoaderConfig {
            batch_size: 8,
            shuffle: false,
            ..Default::default()
        };
        let mut loaders = dataset.loaders(&config);
        assert_eq!(loaders[0].0, "train");
        assert_eq!(loaders[1].0, "validation");

        let batch = loaders[0].1.next_batch().unwrap();
        assert_eq!(batch.x.shape(), &[8, dataset.x_length()]);
        assert_eq!(
            batch.y.shape(),
            &[8, dataset.target_length(), dataset.vocab_size()]
        );
        assert_eq!(batch.y.shape(), batch.prev_y.shape());
    }

    #[test]
    fn test_split_cap_limits_records() {
        let tmp = tempfile::tempdir().unwrap();
        write_split(
            tmp.path(),
            "train",
            &[
                ("the cat", "the mat"),
                ("the mat", "the cat"),
                ("the cat sat", "the mat sat"),
            ],
        );
        let config = TextConfig {
            local_dir: Some(tmp.path().to_string_lossy().into_owned()),
            ..echo_config(tmp.path())
        };
        let dataset = TextDataset::with_policy(config, Box::new(CappedPolicy)).unwrap();
        assert_eq!(dataset.split("train").unwrap().x.len(), 2);
    }

    #[test]
    fn test_missing_local_split_is_corpus_error() {
        let tmp = tempfile::tempdir().unwrap();
        let result = TextDataset::with_policy(echo_config(tmp.path()), Box::new(EchoPolicy));
        assert!(matches!(result, Err(TensorPrepError::Corpus(_))));
    }

    #[test]
    fn test_translation_trim_drops_longest_pairs() {
        let tmp = tempfile::tempdir().unwrap();
        let mut file = std::fs::File::create(tmp.path().join("train.jsonl")).unwrap();
        for _ in 0..10 {
            writeln!(
                file,
                r#"{{"translation": {{"es": "uno dos", "en": "one two"}}}}"#
            )
            .unwrap();
        }
        writeln!(
            file,
            r#"{{"translation": {{"es": "uno dos tres cuatro", "en": "one two three four"}}}}"#
        )
        .unwrap();

        let config = TextConfig {
            vocab_size: 100,
            data_dir: Some(tmp.path().to_string_lossy().into_owned()),
            local_dir: Some(tmp.path().to_string_lossy().into_owned()),
            ..TextConfig::named("opus_books")
        };
        let dataset =
            TextDataset::with_policy(config, Box::new(OpusBooksPolicy)).unwrap();

        // The four-word pair ties the observed maxima on both sides and
        // is dropped; the surviving pairs fix the padded length at two.
        let train = dataset.split("train").unwrap();
        assert_eq!(train.x.len(), 10);
        assert_eq!(dataset.x_length(), 2);
        assert_eq!(dataset.target_length(), 2);
    }
}
