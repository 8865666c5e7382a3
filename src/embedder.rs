use std::path::PathBuf;

use parking_lot::Mutex;
use rust_bert::pipelines::sentence_embeddings::{
    SentenceEmbeddingsBuilder, SentenceEmbeddingsModel, SentenceEmbeddingsModelType,
};
use rust_bert::RustBertError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmbedderError {
    #[error(transparent)]
    Model(#[from] RustBertError),
    #[error("model directory {} does not exist", .0.display())]
    MissingModel(PathBuf),
}

/// The model collaborator behind `/embed`.
///
/// `encode` is synchronous and may take a while; async callers run it on the
/// blocking pool. Implementations return one raw vector per input, in order.
pub trait Embedder: Send + Sync {
    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedderError>;
}

const PUBLISHED_MODELS: &[(&str, fn() -> SentenceEmbeddingsModelType)] = &[
    (
        "distiluse-base-multilingual-cased",
        || SentenceEmbeddingsModelType::DistiluseBaseMultilingualCased,
    ),
    ("all-minilm-l12-v2", || SentenceEmbeddingsModelType::AllMiniLmL12V2),
    ("all-minilm-l6-v2", || SentenceEmbeddingsModelType::AllMiniLmL6V2),
    ("all-distilroberta-v1", || SentenceEmbeddingsModelType::AllDistilrobertaV1),
    (
        "bert-base-nli-mean-tokens",
        || SentenceEmbeddingsModelType::BertBaseNliMeanTokens,
    ),
    (
        "paraphrase-albert-small-v2",
        || SentenceEmbeddingsModelType::ParaphraseAlbertSmallV2,
    ),
    ("sentence-t5-base", || SentenceEmbeddingsModelType::SentenceT5Base),
];

/// Where the weights for a model identifier come from.
pub enum ModelSource {
    /// A published model, fetched and cached by rust-bert.
    Remote(SentenceEmbeddingsModelType),
    /// A local directory in rust-bert's sentence-embeddings layout.
    Local(PathBuf),
}

impl ModelSource {
    pub fn resolve(model_name: &str) -> Self {
        let name = model_name.trim();
        let short = name.strip_prefix("sentence-transformers/").unwrap_or(name);
        PUBLISHED_MODELS
            .iter()
            .find(|(published, _)| published.eq_ignore_ascii_case(short))
            .map(|(_, model_type)| ModelSource::Remote(model_type()))
            .unwrap_or_else(|| ModelSource::Local(PathBuf::from(name)))
    }
}

/// The slice of rust-bert's sentence-embeddings pipeline the service calls.
pub trait SentenceModel: Send {
    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RustBertError>;
}

impl SentenceModel for SentenceEmbeddingsModel {
    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RustBertError> {
        SentenceEmbeddingsModel::encode(self, texts)
    }
}

/// One model instance, one inference at a time. The lock does not poison, so
/// a panic inside inference only fails the request that hit it.
pub struct RustBertEmbedder<M = SentenceEmbeddingsModel> {
    model: Mutex<M>,
}

impl<M: SentenceModel> RustBertEmbedder<M> {
    pub fn from_model(model: M) -> Self {
        RustBertEmbedder {
            model: Mutex::new(model),
        }
    }
}

impl RustBertEmbedder {
    /// Blocks until the weights are downloaded (if needed) and loaded.
    pub fn load(model_name: &str) -> Result<Self, EmbedderError> {
        let model = match ModelSource::resolve(model_name) {
            ModelSource::Remote(model_type) => {
                SentenceEmbeddingsBuilder::remote(model_type).create_model()?
            }
            ModelSource::Local(path) => {
                if !path.is_dir() {
                    return Err(EmbedderError::MissingModel(path));
                }
                SentenceEmbeddingsBuilder::local(path).create_model()?
            }
        };

        Ok(Self::from_model(model))
    }
}

impl<M: SentenceModel> Embedder for RustBertEmbedder<M> {
    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedderError> {
        Ok(self.model.lock().encode(texts)?)
    }
}

/// Scales `vector` to unit Euclidean length.
///
/// Returns `false`, leaving `vector` untouched, when it has no direction:
/// all zeros, or any NaN or infinite component.
pub fn l2_normalize(vector: &mut [f32]) -> bool {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if !norm.is_finite() || norm == 0.0 {
        return false;
    }
    vector.iter_mut().for_each(|x| *x /= norm);
    true
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::mpsc::{Receiver, Sender};

    use super::*;

    /// Deterministic pseudo-embedding of `text`. Never all zeros.
    pub fn fake_vector(text: &str, dim: usize) -> Vec<f32> {
        let seed = text
            .bytes()
            .fold(17u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
        (0..dim as u64)
            .map(|i| {
                let mixed = seed.wrapping_add(i.wrapping_mul(2_654_435_761)) % 1000;
                mixed as f32 / 100.0 + 0.5
            })
            .collect()
    }

    pub struct CountingEmbedder {
        dim: usize,
        calls: AtomicUsize,
    }

    impl CountingEmbedder {
        pub fn new(dim: usize) -> Self {
            CountingEmbedder {
                dim,
                calls: AtomicUsize::new(0),
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Embedder for CountingEmbedder {
        fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(texts.iter().map(|t| fake_vector(t, self.dim)).collect())
        }
    }

    pub struct FailingEmbedder;

    impl Embedder for FailingEmbedder {
        fn encode(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedderError> {
            Err(RustBertError::ValueError("out of memory".to_owned()).into())
        }
    }

    /// Returns the same canned output regardless of input.
    pub struct CannedEmbedder(pub Vec<Vec<f32>>);

    impl Embedder for CannedEmbedder {
        fn encode(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedderError> {
            Ok(self.0.clone())
        }
    }

    /// Panics inside inference the first time it is called.
    #[derive(Default)]
    pub struct PanicOnceModel {
        panicked: AtomicBool,
    }

    impl SentenceModel for PanicOnceModel {
        fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RustBertError> {
            if !self.panicked.swap(true, Ordering::SeqCst) {
                panic!("inference blew up");
            }
            Ok(texts.iter().map(|t| fake_vector(t, 4)).collect())
        }
    }

    /// Signals on `entered` when inference starts, then waits for `release`.
    pub struct GatedEmbedder {
        pub entered: Mutex<Sender<()>>,
        pub release: Mutex<Receiver<()>>,
        pub calls: AtomicUsize,
    }

    impl Embedder for GatedEmbedder {
        fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let _ = self.entered.lock().send(());
            let _ = self.release.lock().recv();
            Ok(texts.iter().map(|t| fake_vector(t, 4)).collect())
        }
    }
}
