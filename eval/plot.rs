//! Terminal bar charts comparing models across phenotypes and test partitions.
//!
//! The grid has one row per phenotype and one column per test partition. Inside each
//! panel, bars are grouped by `model_desc` and coloured by the `white_british` value
//! of the model's training samples. Panels in the same row share their y-scale.

use crate::eval::tables::{TableError, float_column, load_table_frame, string_column};
use crossterm::event::{self, Event, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode};
use ratatui::backend::TestBackend;
use ratatui::prelude::*;
use ratatui::widgets::{Bar, BarChart, BarGroup, Block, Paragraph};
use std::io::{self, IsTerminal};
use std::path::Path;
use thiserror::Error;

/// Bar heights are integers; metric values are scaled by this before rounding.
const VALUE_SCALE: f64 = 10_000.0;

const HUE_COLORS: [Color; 4] = [Color::Cyan, Color::Yellow, Color::Magenta, Color::Green];

#[derive(Debug, Error)]
pub enum PlotError {
    #[error(transparent)]
    Table(#[from] TableError),
    #[error("Terminal error: {0}")]
    Terminal(#[from] io::Error),
    #[error("Interactive display needs a terminal. Use --print to render to stdout.")]
    NotATerminal,
}

/// The test partitions shown as grid columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Partition {
    All,
    WhiteBritish,
    NotWhiteBritish,
}

impl Partition {
    pub const ALL: [Partition; 3] = [
        Partition::All,
        Partition::WhiteBritish,
        Partition::NotWhiteBritish,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Partition::All => "All",
            Partition::WhiteBritish => "White British",
            Partition::NotWhiteBritish => "Not White British",
        }
    }

    pub fn table_file(&self) -> &'static str {
        match self {
            Partition::All => "test_all_scores.csv",
            Partition::WhiteBritish => "test_wb_scores.csv",
            Partition::NotWhiteBritish => "test_nwb_scores.csv",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlotRow {
    pub pheno: String,
    pub partition: Partition,
    pub model_desc: String,
    /// `True` or `False`.
    pub white_british: String,
    pub value: f64,
}

/// Loads the three test tables from `scores_dir`. Rows with an empty metric cell
/// are dropped.
pub fn load_plot_rows(scores_dir: &Path, metric: &str) -> Result<Vec<PlotRow>, PlotError> {
    let mut rows = Vec::new();
    for partition in Partition::ALL {
        let path = scores_dir.join(partition.table_file());
        let df = load_table_frame(&path)?;
        let values = float_column(&df, &path, metric)?;
        let phenos = string_column(&df, &path, "pheno")?;
        let models = string_column(&df, &path, "model_desc")?;
        let white_british = string_column(&df, &path, "white_british")?;

        for (((value, pheno), model_desc), white_british) in
            values.into_iter().zip(phenos).zip(models).zip(white_british)
        {
            if let Some(value) = value {
                rows.push(PlotRow {
                    pheno,
                    partition,
                    model_desc,
                    white_british,
                    value,
                });
            }
        }
    }
    Ok(rows)
}

/// Plot rows indexed by facet.
#[derive(Debug, Clone)]
pub struct FacetGrid {
    phenos: Vec<String>,
    models: Vec<String>,
    hues: Vec<String>,
    rows: Vec<PlotRow>,
}

fn push_unique(values: &mut Vec<String>, value: &str) {
    if !values.iter().any(|existing| existing == value) {
        values.push(value.to_string());
    }
}

impl FacetGrid {
    pub fn new(rows: Vec<PlotRow>) -> Self {
        let mut phenos = Vec::new();
        let mut models = Vec::new();
        let mut hues = Vec::new();
        for row in &rows {
            push_unique(&mut phenos, &row.pheno);
            push_unique(&mut models, &row.model_desc);
            push_unique(&mut hues, &row.white_british);
        }
        Self {
            phenos,
            models,
            hues,
            rows,
        }
    }

    pub fn phenotypes(&self) -> &[String] {
        &self.phenos
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    pub fn hues(&self) -> &[String] {
        &self.hues
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Mean of the matching rows, or `None` if there are none.
    pub fn value(&self, pheno: &str, partition: Partition, model: &str, hue: &str) -> Option<f64> {
        let (sum, count) = self
            .rows
            .iter()
            .filter(|row| {
                row.pheno == pheno
                    && row.partition == partition
                    && row.model_desc == model
                    && row.white_british == hue
            })
            .fold((0.0, 0usize), |(sum, count), row| (sum + row.value, count + 1));
        (count > 0).then(|| sum / count as f64)
    }

    /// Upper end of the y-scale shared by every panel of a phenotype's row.
    pub fn row_max(&self, pheno: &str) -> f64 {
        self.rows
            .iter()
            .filter(|row| row.pheno == pheno)
            .map(|row| row.value)
            .fold(0.0, f64::max)
    }
}

fn scaled(value: f64) -> u64 {
    (value.max(0.0) * VALUE_SCALE).round() as u64
}

fn hue_color(index: usize) -> Color {
    HUE_COLORS[index % HUE_COLORS.len()]
}

fn panel<'a>(grid: &'a FacetGrid, pheno: &'a str, partition: Partition, width: u16) -> BarChart<'a> {
    let hues = grid.hues();
    let bars_per_group = hues.len().max(1) as u16;
    let groups = grid.models().len().max(1) as u16;
    let inner = width.saturating_sub(2);
    let bar_width = (inner.saturating_sub(groups) / (groups * bars_per_group)).max(1);

    let mut chart = BarChart::default()
        .block(Block::bordered().title(format!("{pheno} | {}", partition.label())))
        .bar_width(bar_width)
        .bar_gap(0)
        .group_gap(1)
        .max(scaled(grid.row_max(pheno)).max(1));

    for model in grid.models() {
        let bars: Vec<Bar> = hues
            .iter()
            .enumerate()
            .map(|(index, hue)| {
                let value = grid.value(pheno, partition, model, hue);
                Bar::default()
                    .value(value.map(scaled).unwrap_or(0))
                    .text_value(value.map(|v| format!("{v:.3}")).unwrap_or_default())
                    .style(Style::default().fg(hue_color(index)))
                    .value_style(Style::default().fg(Color::Black).bg(hue_color(index)))
            })
            .collect();
        chart = chart.data(BarGroup::default().label(Line::from(model.clone())).bars(&bars));
    }
    chart
}

/// Draws the full grid into `frame`.
pub fn draw(frame: &mut Frame, grid: &FacetGrid, metric: &str) {
    let [title_area, body, legend_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    frame.render_widget(
        Paragraph::new(format!("{metric} by model (rows: phenotype, columns: test set)")).bold(),
        title_area,
    );

    if grid.is_empty() {
        frame.render_widget(Paragraph::new("No scores to plot."), body);
        return;
    }

    let row_count = grid.phenotypes().len() as u32;
    let row_areas = Layout::vertical(
        (0..row_count).map(|_| Constraint::Ratio(1, row_count)),
    )
    .split(body);
    for (pheno, row_area) in grid.phenotypes().iter().zip(row_areas.iter()) {
        let column_areas =
            Layout::horizontal(Partition::ALL.map(|_| Constraint::Ratio(1, 3))).split(*row_area);
        for (partition, cell) in Partition::ALL.into_iter().zip(column_areas.iter()) {
            frame.render_widget(panel(grid, pheno, partition, cell.width), *cell);
        }
    }

    let mut legend = vec![Span::raw("white_british: ")];
    for (index, hue) in grid.hues().iter().enumerate() {
        legend.push(Span::styled("■ ", Style::default().fg(hue_color(index))));
        legend.push(Span::raw(format!("{hue}  ")));
    }
    legend.push(Span::raw("  (press any key to exit)"));
    frame.render_widget(Paragraph::new(Line::from(legend)), legend_area);
}

struct TerminalGuard;

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

/// Shows the grid full-screen until a key is pressed.
pub fn show(grid: &FacetGrid, metric: &str) -> Result<(), PlotError> {
    if !io::stdout().is_terminal() {
        return Err(PlotError::NotATerminal);
    }
    enable_raw_mode()?;
    let _guard = TerminalGuard;
    execute!(io::stdout(), EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;
    loop {
        terminal.draw(|f| draw(f, grid, metric))?;
        if let Event::Key(key) = event::read()? {
            if key.kind == KeyEventKind::Press {
                break;
            }
        }
    }
    Ok(())
}

/// Renders the grid into a `width` x `height` character buffer.
pub fn render_to_text(
    grid: &FacetGrid,
    metric: &str,
    width: u16,
    height: u16,
) -> Result<String, PlotError> {
    let mut terminal = Terminal::new(TestBackend::new(width, height))?;
    terminal.draw(|f| draw(f, grid, metric))?;
    let buffer = terminal.backend().buffer();
    let mut text = String::new();
    for y in 0..height {
        let line: String = (0..width)
            .filter_map(|x| buffer.cell((x, y)).map(|cell| cell.symbol()))
            .collect();
        text.push_str(line.trim_end());
        text.push('\n');
    }
    Ok(text)
}
