use async_trait::async_trait;
use log2::{debug, info};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use super::{cosine_similarity, Similarity};
use crate::error::SimilarityError;

/// Static word embeddings loaded from a word2vec/GloVe text file.
///
/// A title's vector is the mean of its tokens' vectors, the same way document
/// vectors are built from word vectors in most NLP toolkits.
pub struct WordVectors {
    name: String,
    dimension: usize,
    vectors: HashMap<String, Vec<f32>>,
}

impl WordVectors {
    pub fn load(path: &Path) -> Result<Self, SimilarityError> {
        let file = File::open(path)
            .map_err(|e| SimilarityError::ModelLoad(format!("{}: {}", path.display(), e)))?;
        let mut model = Self::from_reader(BufReader::new(file))?;
        model.name = path.display().to_string();
        info!(
            "Loaded {} word vectors of dimension {} from {}",
            model.len(),
            model.dimension,
            path.display()
        );
        Ok(model)
    }

    /// Reads `word v1 .. vn` lines. A leading `count dim` header is optional.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, SimilarityError> {
        let mut vectors = HashMap::new();
        let mut dimension: Option<usize> = None;

        for (index, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| SimilarityError::ModelLoad(e.to_string()))?;
            let mut fields = line.split_whitespace();
            let Some(word) = fields.next() else {
                continue;
            };
            let rest: Vec<&str> = fields.collect();

            if index == 0 && rest.len() == 1 {
                if let (Ok(_count), Ok(dim)) = (word.parse::<usize>(), rest[0].parse::<usize>()) {
                    dimension = Some(dim);
                    continue;
                }
            }

            let vector = rest
                .iter()
                .map(|v| v.parse::<f32>())
                .collect::<Result<Vec<f32>, _>>()
                .map_err(|e| {
                    SimilarityError::ModelLoad(format!("line {}: {}", index + 1, e))
                })?;

            match dimension {
                None => dimension = Some(vector.len()),
                Some(dim) if dim != vector.len() => {
                    return Err(SimilarityError::ModelLoad(format!(
                        "line {}: expected {} components, found {}",
                        index + 1,
                        dim,
                        vector.len()
                    )));
                }
                Some(_) => {}
            }

            vectors.entry(word.to_string()).or_insert(vector);
        }

        let dimension = dimension.unwrap_or(0);
        if vectors.is_empty() || dimension == 0 {
            return Err(SimilarityError::ModelLoad("model contains no vectors".to_string()));
        }

        Ok(Self {
            name: "word-vectors".to_string(),
            dimension,
            vectors,
        })
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    fn lookup(&self, token: &str) -> Option<&Vec<f32>> {
        self.vectors
            .get(token)
            .or_else(|| self.vectors.get(&token.to_lowercase()))
    }

    /// Mean vector over the known tokens of `text`
    pub fn text_vector(&self, text: &str) -> Result<Vec<f32>, SimilarityError> {
        let mut sum = vec![0.0f32; self.dimension];
        let mut known = 0usize;

        for token in text.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()) {
            match self.lookup(token) {
                Some(vector) => {
                    for (acc, v) in sum.iter_mut().zip(vector) {
                        *acc += v;
                    }
                    known += 1;
                }
                None => debug!("Token `{}` of `{}` is out of vocabulary", token, text),
            }
        }

        if known == 0 {
            return Err(SimilarityError::OutOfVocabulary(text.to_string()));
        }
        for acc in sum.iter_mut() {
            *acc /= known as f32;
        }
        Ok(sum)
    }
}

#[async_trait]
impl Similarity for WordVectors {
    async fn similarity(&self, a: &str, b: &str) -> Result<f64, SimilarityError> {
        let va = self.text_vector(a)?;
        let vb = self.text_vector(b)?;
        Ok(cosine_similarity(&va, &vb))
    }

    fn model_name(&self) -> &str {
        &self.name
    }
}
