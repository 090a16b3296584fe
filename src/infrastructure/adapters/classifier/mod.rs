//! Classifier Adapter - 情绪分类客户端实现

mod http_mood_classifier;

pub use http_mood_classifier::{HttpMoodClassifier, HttpMoodClassifierConfig};
