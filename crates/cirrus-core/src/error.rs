//! Error types for amounts, time spans and configuration.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    #[error("empty amount")] Empty,
    #[error("negative amount: {0}")] Negative(String),
    #[error("malformed amount: {0}")] Malformed(String),
    #[error("more than 8 decimal places: {0}")] TooPrecise(String),
    #[error("amount overflow: {0}")] Overflow(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimeSpanError {
    #[error("malformed time span: {0}")] Malformed(String),
    #[error("time span component out of range: {0}")] OutOfRange(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")] Load(String),
    #[error("invalid configuration: {0}")] Invalid(String),
    #[error(transparent)] Amount(#[from] AmountError),
}
