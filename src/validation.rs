// src/validation.rs
//! Bounds applied to poll forms before they reach the store.
//!
//! The create and edit paths share one [`PollLimits`] so both enforce the
//! same numbers. The store itself only checks structure (non-empty title, at
//! least two options on creation); these bounds are a form-layer concern.

use serde::{Deserialize, Serialize};

use crate::error::ValidationErrors;
use crate::models::PollOption;

pub const TITLE_MIN_LEN: usize = 10;
pub const TITLE_MAX_LEN: usize = 100;
pub const DESCRIPTION_MAX_LEN: usize = 250;
pub const OPTION_MIN_LEN: usize = 3;
pub const OPTION_MAX_LEN: usize = 50;
pub const MIN_OPTIONS: usize = 2;
pub const MAX_OPTIONS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollLimits {
    pub title_min: usize,
    pub title_max: usize,
    pub description_max: usize,
    pub option_min: usize,
    pub option_max: usize,
    pub min_options: usize,
    pub max_options: usize,
}

impl Default for PollLimits {
    fn default() -> Self {
        Self {
            title_min: TITLE_MIN_LEN,
            title_max: TITLE_MAX_LEN,
            description_max: DESCRIPTION_MAX_LEN,
            option_min: OPTION_MIN_LEN,
            option_max: OPTION_MAX_LEN,
            min_options: MIN_OPTIONS,
            max_options: MAX_OPTIONS,
        }
    }
}

impl PollLimits {
    /// Create form: blank options are dropped before counting.
    pub fn check_new_poll(
        &self,
        title: &str,
        description: &str,
        option_texts: &[String],
    ) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        self.check_title(title, &mut errors);
        self.check_description(description, &mut errors);

        let kept: Vec<&str> = option_texts
            .iter()
            .map(String::as_str)
            .filter(|text| !text.trim().is_empty())
            .collect();
        for (idx, text) in kept.iter().enumerate() {
            self.check_option(idx, text, &mut errors);
        }
        self.check_option_count(kept.len(), &mut errors);

        finish(errors)
    }

    /// Edit form: every option is checked as submitted.
    pub fn check_edit(
        &self,
        title: &str,
        description: &str,
        options: &[PollOption],
    ) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        self.check_title(title, &mut errors);
        self.check_description(description, &mut errors);
        for (idx, opt) in options.iter().enumerate() {
            self.check_option(idx, &opt.text, &mut errors);
        }
        self.check_option_count(options.len(), &mut errors);

        finish(errors)
    }

    fn check_title(&self, title: &str, errors: &mut ValidationErrors) {
        let len = title.chars().count();
        if title.trim().is_empty() {
            errors.add("title", "Title is required");
        } else if len < self.title_min {
            errors.add(
                "title",
                format!("Title must be at least {} characters", self.title_min),
            );
        } else if len > self.title_max {
            errors.add(
                "title",
                format!("Title must be at most {} characters", self.title_max),
            );
        }
    }

    fn check_description(&self, description: &str, errors: &mut ValidationErrors) {
        if description.chars().count() > self.description_max {
            errors.add(
                "description",
                format!(
                    "Description must be at most {} characters",
                    self.description_max
                ),
            );
        }
    }

    fn check_option(&self, idx: usize, text: &str, errors: &mut ValidationErrors) {
        let field = format!("options[{idx}]");
        let len = text.chars().count();
        if text.trim().is_empty() {
            errors.add(field, "Option text is required");
        } else if len < self.option_min {
            errors.add(
                field,
                format!("Option must be at least {} characters", self.option_min),
            );
        } else if len > self.option_max {
            errors.add(
                field,
                format!("Option must be at most {} characters", self.option_max),
            );
        }
    }

    fn check_option_count(&self, count: usize, errors: &mut ValidationErrors) {
        if count < self.min_options {
            errors.add(
                "options",
                format!("A poll needs at least {} options", self.min_options),
            );
        } else if count > self.max_options {
            errors.add(
                "options",
                format!("A poll can have at most {} options", self.max_options),
            );
        }
    }
}

fn finish(errors: ValidationErrors) -> Result<(), ValidationErrors> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
