mod concurrency;
mod config;
mod scenarios;
mod substitution;
