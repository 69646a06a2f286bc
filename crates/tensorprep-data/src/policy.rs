//! Per-dataset preparation policies.
//!
//! Each named dataset varies in how it is fetched, cleaned, and trimmed.
//! Rather than subclassing, that variation lives behind two small traits,
//! selected by dataset name at construction time.

use crate::frame::RawFrame;
use crate::scaler::StandardScaler;
use tensorprep_core::{Result, TensorPrepError};

/// A file to fetch from a remote dataset repository.
#[derive(Debug, Clone)]
pub struct RemoteFile {
    /// Dataset repository identifier.
    pub dataset_id: String,
    /// File name inside the repository.
    pub filename: String,
    /// Optional revision or branch.
    pub revision: Option<String>,
}

/// How a tabular dataset is fetched, cleaned, and windowed.
pub trait TabularPolicy {
    /// Policy name, used for registry lookup and file naming.
    fn name(&self) -> &str;

    /// CSV file name inside the data directory.
    fn file_name(&self) -> &str;

    /// Remote location to fetch from when the local file is absent.
    fn download(&self) -> Option<RemoteFile> {
        None
    }

    /// Predictor column names, in selection order.
    fn predictors(&self) -> &[&str];

    /// Target column name.
    fn target(&self) -> &str;

    /// Window length for time-series sampling, if this dataset uses it.
    fn window_length(&self) -> Option<usize> {
        None
    }

    /// Clean the parsed frame in place.
    ///
    /// The default does nothing. Policies that standardize return the
    /// fitted scaler so callers can invert the transform later.
    fn clean(&self, frame: &mut RawFrame) -> Result<Option<StandardScaler>> {
        let _ = frame;
        Ok(None)
    }
}

/// How a text corpus is fetched and turned into (input, target) pairs.
pub trait TextPolicy {
    /// Policy name, used for registry lookup and tokenizer file naming.
    fn name(&self) -> &str;

    /// Corpus repository identifier.
    fn corpus_id(&self) -> &str;

    /// Corpus version, used as the repository revision.
    fn version(&self) -> Option<&str> {
        None
    }

    /// Field to select from each record before pair extraction.
    fn subset(&self) -> Option<&str> {
        None
    }

    /// Split names in processing order. The first split processed fixes
    /// the padding lengths for the whole run.
    fn splits(&self) -> &[&str];

    /// Optional per-split record caps, parallel to [`TextPolicy::splits`].
    fn split_caps(&self) -> Option<&[Option<usize>]> {
        None
    }

    /// Configured input length, if fixed ahead of time.
    fn x_length(&self) -> Option<usize> {
        None
    }

    /// Configured target length, if fixed ahead of time.
    fn target_length(&self) -> Option<usize> {
        None
    }

    /// Extract parallel input and target text from one split's records.
    fn split_x_target(&self, records: &[serde_json::Value])
        -> Result<(Vec<String>, Vec<String>)>;

    /// Enforce a maximum id-sequence length per example.
    ///
    /// `x_limit` and `target_limit` are the configured lengths when the
    /// policy fixes them, otherwise the maxima observed in the split.
    /// The default keeps everything.
    fn trim(
        &self,
        x: Vec<Vec<u32>>,
        target: Vec<Vec<u32>>,
        x_limit: usize,
        target_limit: usize,
    ) -> (Vec<Vec<u32>>, Vec<Vec<u32>>) {
        let _ = (x_limit, target_limit);
        (x, target)
    }
}

/// Daily weather observations with a next-day temperature target.
pub struct WeatherPolicy;

impl TabularPolicy for WeatherPolicy {
    fn name(&self) -> &str {
        "weather"
    }

    fn file_name(&self) -> &str {
        "clean_weather.csv"
    }

    fn download(&self) -> Option<RemoteFile> {
        Some(RemoteFile {
            dataset_id: "vstepanenko/clean-weather".to_string(),
            filename: "clean_weather.csv".to_string(),
            revision: None,
        })
    }

    fn predictors(&self) -> &[&str] {
        &["tmax", "tmin", "rain"]
    }

    fn target(&self) -> &str {
        "tmax_tomorrow"
    }

    fn window_length(&self) -> Option<usize> {
        Some(7)
    }

    fn clean(&self, frame: &mut RawFrame) -> Result<Option<StandardScaler>> {
        frame.forward_fill();

        let mut rows = frame.select(self.predictors())?;
        let scaler = StandardScaler::fit_transform(&mut rows)?;
        for (col, name) in self.predictors().iter().enumerate() {
            let values = rows.iter().map(|row| row[col]).collect();
            frame.set_column(name, values)?;
        }
        Ok(Some(scaler))
    }
}

/// English-Spanish book translations. Input is the Spanish sentence,
/// target is the English sentence.
pub struct OpusBooksPolicy;

impl TextPolicy for OpusBooksPolicy {
    fn name(&self) -> &str {
        "opus_books"
    }

    fn corpus_id(&self) -> &str {
        "opus_books"
    }

    fn version(&self) -> Option<&str> {
        Some("en-es")
    }

    fn subset(&self) -> Option<&str> {
        Some("translation")
    }

    fn splits(&self) -> &[&str] {
        &["train"]
    }

    fn split_x_target(
        &self,
        records: &[serde_json::Value],
    ) -> Result<(Vec<String>, Vec<String>)> {
        let mut x = Vec::with_capacity(records.len());
        let mut target = Vec::with_capacity(records.len());
        for (i, record) in records.iter().enumerate() {
            let es = record
                .get("es")
                .and_then(|v| v.as_str())
                .ok_or_else(|| missing_field("es", i))?;
            let en = record
                .get("en")
                .and_then(|v| v.as_str())
                .ok_or_else(|| missing_field("en", i))?;
            x.push(es.to_string());
            target.push(en.to_string());
        }
        Ok((x, target))
    }

    /// Drop any pair where either side ties or exceeds its limit.
    fn trim(
        &self,
        x: Vec<Vec<u32>>,
        target: Vec<Vec<u32>>,
        x_limit: usize,
        target_limit: usize,
    ) -> (Vec<Vec<u32>>, Vec<Vec<u32>>) {
        let mut new_x = Vec::new();
        let mut new_target = Vec::new();
        for (xi, ti) in x.into_iter().zip(target) {
            if xi.len() < x_limit && ti.len() < target_limit {
                new_x.push(xi);
                new_target.push(ti);
            }
        }
        (new_x, new_target)
    }
}

/// News article highlights chunked into fixed-length word windows.
/// Input is the first 15 words, target is the next 15.
pub struct CnnDailyMailPolicy;

impl CnnDailyMailPolicy {
    const X_LENGTH: usize = 15;
    const TARGET_LENGTH: usize = 15;
}

impl TextPolicy for CnnDailyMailPolicy {
    fn name(&self) -> &str {
        "cnn_dailymail"
    }

    fn corpus_id(&self) -> &str {
        "cnn_dailymail"
    }

    fn version(&self) -> Option<&str> {
        Some("3.0.0")
    }

    fn subset(&self) -> Option<&str> {
        Some("highlights")
    }

    fn splits(&self) -> &[&str] {
        &["train", "test", "validation"]
    }

    fn x_length(&self) -> Option<usize> {
        Some(Self::X_LENGTH)
    }

    fn target_length(&self) -> Option<usize> {
        Some(Self::TARGET_LENGTH)
    }

    fn split_x_target(
        &self,
        records: &[serde_json::Value],
    ) -> Result<(Vec<String>, Vec<String>)> {
        let mut x = Vec::new();
        let mut target = Vec::new();
        for (i, record) in records.iter().enumerate() {
            let text = record
                .as_str()
                .ok_or_else(|| missing_field("highlights", i))?;
            let words: Vec<&str> = text.split(' ').collect();
            // Documents must overflow the combined window to contribute.
            if words.len() <= Self::X_LENGTH + Self::TARGET_LENGTH {
                continue;
            }
            x.push(words[..Self::X_LENGTH].join(" "));
            target.push(
                words[Self::X_LENGTH..Self::X_LENGTH + Self::TARGET_LENGTH].join(" "),
            );
        }
        Ok((x, target))
    }

    /// Truncate inputs to the input limit. Targets prefer the input's
    /// overflow tail, topping up from the original target on shortfall,
    /// and fall back to the original target when there is no tail.
    fn trim(
        &self,
        x: Vec<Vec<u32>>,
        target: Vec<Vec<u32>>,
        x_limit: usize,
        target_limit: usize,
    ) -> (Vec<Vec<u32>>, Vec<Vec<u32>>) {
        let mut new_x = Vec::new();
        let mut new_target = Vec::new();
        for (xi, ti) in x.into_iter().zip(target) {
            if xi.len() < x_limit {
                continue;
            }

            new_x.push(xi[..x_limit].to_vec());
            let tail = &xi[x_limit..];

            if tail.len() >= target_limit {
                new_target.push(tail[..target_limit].to_vec());
            } else if !tail.is_empty() {
                let mut t = tail.to_vec();
                let shortfall = target_limit - tail.len();
                t.extend(ti.iter().take(shortfall).copied());
                new_target.push(t);
            } else {
                new_target.push(ti.into_iter().take(target_limit).collect());
            }
        }
        (new_x, new_target)
    }
}

fn missing_field(field: &str, record: usize) -> TensorPrepError {
    TensorPrepError::Corpus(format!(
        "record {} is missing the '{}' field",
        record, field
    ))
}

/// Look up the tabular policy for a dataset name.
pub fn tabular_policy(name: &str) -> Result<Box<dyn TabularPolicy>> {
    match name {
        "weather" => Ok(Box::new(WeatherPolicy)),
        other => Err(TensorPrepError::UnknownDataset(other.to_string())),
    }
}

/// Look up the text policy for a corpus name.
pub fn text_policy(name: &str) -> Result<Box<dyn TextPolicy>> {
    match name {
        "opus_books" => Ok(Box::new(OpusBooksPolicy)),
        "cnn_dailymail" => Ok(Box::new(CnnDailyMailPolicy)),
        other => Err(TensorPrepError::UnknownDataset(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_registry_lookup() {
        assert_eq!(tabular_policy("weather").unwrap().name(), "weather");
        assert_eq!(text_policy("opus_books").unwrap().name(), "opus_books");
        assert!(matches!(
            tabular_policy("nope"),
            Err(TensorPrepError::UnknownDataset(_))
        ));
    }

    #[test]
    fn test_opus_split_x_target() {
        let records = vec![
            json!({"es": "hola mundo", "en": "hello world"}),
            json!({"es": "adios", "en": "goodbye"}),
        ];
        let (x, target) = OpusBooksPolicy.split_x_target(&records).unwrap();
        assert_eq!(x, vec!["hola mundo", "adios"]);
        assert_eq!(target, vec!["hello world", "goodbye"]);
    }

    #[test]
    fn test_opus_trim_drops_ties() {
        let x = vec![vec![1, 2], vec![1, 2, 3], vec![1]];
        let target = vec![vec![5], vec![5], vec![5, 6, 7]];
        // Limits equal the observed maxima: 3 for x, 3 for target.
        let (x, target) = OpusBooksPolicy.trim(x, target, 3, 3);

        // Only the first pair survives: the second ties the x limit, the
        // third ties the target limit.
        assert_eq!(x, vec![vec![1, 2]]);
        assert_eq!(target, vec![vec![5]]);
    }

    #[test]
    fn test_cnn_chunks_forty_words() {
        let words: Vec<String> = (1..=40).map(|i| format!("w{}", i)).collect();
        let records = vec![json!(words.join(" "))];

        let (x, target) = CnnDailyMailPolicy.split_x_target(&records).unwrap();
        assert_eq!(x.len(), 1);
        assert_eq!(x[0], words[..15].join(" "));
        assert_eq!(target[0], words[15..30].join(" "));
    }

    #[test]
    fn test_cnn_skips_short_documents() {
        // Exactly 30 words does not exceed the combined window.
        let words: Vec<String> = (1..=30).map(|i| format!("w{}", i)).collect();
        let records = vec![json!(words.join(" "))];

        let (x, _) = CnnDailyMailPolicy.split_x_target(&records).unwrap();
        assert!(x.is_empty());
    }

    #[test]
    fn test_cnn_trim_prefers_input_tail() {
        // 8 input ids with a limit of 4: tail has 4 ids, enough for the
        // target limit of 4 on its own.
        let x = vec![(0..8).collect::<Vec<u32>>()];
        let target = vec![vec![100, 101, 102, 103]];
        let (x, target) = CnnDailyMailPolicy.trim(x, target, 4, 4);

        assert_eq!(x, vec![vec![0, 1, 2, 3]]);
        assert_eq!(target, vec![vec![4, 5, 6, 7]]);
    }

    #[test]
    fn test_cnn_trim_tops_up_short_tail() {
        // Tail has 2 ids, target limit is 4: top up from the original.
        let x = vec![(0..6).collect::<Vec<u32>>()];
        let target = vec![vec![100, 101, 102, 103]];
        let (x, target) = CnnDailyMailPolicy.trim(x, target, 4, 4);

        assert_eq!(x, vec![vec![0, 1, 2, 3]]);
        assert_eq!(target, vec![vec![4, 5, 100, 101]]);
    }

    #[test]
    fn test_cnn_trim_falls_back_without_tail() {
        let x = vec![vec![0, 1, 2, 3]];
        let target = vec![vec![100, 101, 102, 103, 104]];
        let (x, target) = CnnDailyMailPolicy.trim(x, target, 4, 4);

        assert_eq!(x, vec![vec![0, 1, 2, 3]]);
        assert_eq!(target, vec![vec![100, 101, 102, 103]]);
    }

    #[test]
    fn test_cnn_trim_skips_short_inputs() {
        let x = vec![vec![0, 1]];
        let target = vec![vec![100]];
        let (x, target) = CnnDailyMailPolicy.trim(x, target, 4, 4);
        assert!(x.is_empty());
        assert!(target.is_empty());
    }
}
