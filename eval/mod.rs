//! Collection and comparison of fitted-model scores.
//!
//! `tables` downloads the per-run `scores.json` / `runtime.json` artifacts and
//! flattens them into four CSV tables; `plot` renders the three test tables as a
//! faceted bar chart in the terminal.

pub mod plot;
pub mod tables;
