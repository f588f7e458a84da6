#![allow(dead_code)]

use std::path::{Path, PathBuf};

use optigrade::model::ForestSettings;
use optigrade::training::Trainer;
use optigrade::TrainedModel;

pub fn sample_csv() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("data/training_data.csv")
}

pub fn quick_trainer(seed: u64) -> Trainer {
    Trainer::new(ForestSettings { n_trees: 20, seed })
}

pub fn trained_model() -> TrainedModel {
    quick_trainer(42).train_from_csv(sample_csv()).expect("sample data trains")
}
