use std::path::Path;

use chrono::Utc;
use linfa::prelude::*;
use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::data::{load_training_data, TrainingSet};
use crate::error::{OptiGradeError, Result};
use crate::features::{default_feature_names, AliasTable};
use crate::model::{CgpaRegressor, ForestSettings, TrainedModel, TrainingMetrics};

pub const MIN_TRAINING_ROWS: usize = 10;

pub struct Trainer {
    feature_names: Vec<String>,
    aliases: AliasTable,
    settings: ForestSettings,
    train_ratio: f32,
}

impl Default for Trainer {
    fn default() -> Self {
        Self::new(ForestSettings::default())
    }
}

impl Trainer {
    pub fn new(settings: ForestSettings) -> Self {
        Self {
            feature_names: default_feature_names(),
            aliases: AliasTable::standard(),
            settings,
            train_ratio: 0.8,
        }
    }

    pub fn with_feature_names(mut self, feature_names: Vec<String>) -> Self {
        self.feature_names = feature_names;
        self
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn train_from_csv(&self, path: impl AsRef<Path>) -> Result<TrainedModel> {
        let set = load_training_data(path, &self.feature_names, &self.aliases)?;
        self.train(&set)
    }

    /// Scores a forest on a seeded hold-out split, then refits on every row
    /// so the saved model sees all the data.
    pub fn train(&self, set: &TrainingSet) -> Result<TrainedModel> {
        if set.feature_names != self.feature_names {
            return Err(OptiGradeError::TrainingData(format!(
                "training columns {:?} differ from the configured features {:?}",
                set.feature_names, self.feature_names
            )));
        }
        if set.len() < MIN_TRAINING_ROWS {
            return Err(OptiGradeError::TrainingData(format!(
                "need at least {} records, found {}",
                MIN_TRAINING_ROWS,
                set.len()
            )));
        }

        let mut rng = StdRng::seed_from_u64(self.settings.seed);
        let dataset = Dataset::new(set.records.clone(), set.targets.clone()).shuffle(&mut rng);
        let (train, valid) = dataset.split_with_ratio(self.train_ratio);

        info!(
            "Training random forest ({} trees, seed {}) on {} records",
            self.settings.n_trees,
            self.settings.seed,
            train.nsamples()
        );
        let holdout = CgpaRegressor::fit(train.records(), train.targets(), self.settings)?;
        let predicted = holdout.predict_rows(valid.records())?;
        let r2 = predicted.r2(&valid)?;
        let mean_absolute_error = predicted.mean_absolute_error(&valid)?;
        info!("Hold-out R2 {:.3}, MAE {:.3}", r2, mean_absolute_error);

        let regressor = CgpaRegressor::fit(&set.records, &set.targets, self.settings)?;
        let metrics = TrainingMetrics {
            r2,
            mean_absolute_error,
            train_rows: train.nsamples(),
            validation_rows: valid.nsamples(),
            trained_at: Utc::now(),
        };

        TrainedModel::new(
            regressor,
            self.feature_names.clone(),
            Some(set.feature_means()),
            Some(metrics),
        )
    }
}
