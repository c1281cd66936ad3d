
use indexmap::IndexMap;
use std::path::Path;
use svg::node::element::{Circle, Group, Line, Rectangle, Text};
use svg::Document;

use crate::data_types::indel_class::IndelClass;
use crate::data_types::records::{split_condition, AggregatedRecord};

const PANEL_WIDTH: f64 = 320.0;
const PANEL_HEIGHT: f64 = 220.0;
const PANEL_GAP: f64 = 40.0;
const MARGIN_LEFT: f64 = 70.0;
const MARGIN_TOP: f64 = 40.0;
const MARGIN_BOTTOM: f64 = 50.0;
const MARGIN_RIGHT: f64 = 20.0;
const BAR_FRACTION: f64 = 0.7;
const POINT_RADIUS: f64 = 6.0;
const FONT_FAMILY: &str = "sans-serif";

/// How records are split into panels
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PlotLayout {
    /// One panel per condition, in a single row
    ByCondition,
    /// Rows are condition groups, columns are timepoints (see `split_condition`)
    GroupByTimepoint
}

/// Styling for one figure
#[derive(Clone, Debug)]
pub struct PlotOptions {
    /// Panel arrangement
    pub layout: PlotLayout,
    /// Y-axis label
    pub y_label: String,
    /// Fixed y-axis maximum; if None it is derived from the data
    pub y_max: Option<f64>,
    /// Tick spacing on the y-axis; if None it is derived from the data
    pub y_step: Option<f64>,
    /// Draws a dashed horizontal line at this value
    pub reference_line: Option<f64>
}

impl PlotOptions {
    /// Summed percentages, one panel per condition
    pub fn summed() -> Self {
        Self {
            layout: PlotLayout::ByCondition,
            y_label: "% of sequences".to_string(),
            y_max: None,
            y_step: None,
            reference_line: None
        }
    }

    /// Relative percentages on a group × timepoint grid with a 50% reference
    pub fn relative() -> Self {
        Self {
            layout: PlotLayout::GroupByTimepoint,
            y_label: "relative % of sequences".to_string(),
            y_max: Some(100.0),
            y_step: Some(20.0),
            reference_line: Some(50.0)
        }
    }
}

/// One panel of the figure
struct Facet<'a> {
    title: String,
    row: usize,
    column: usize,
    records: Vec<&'a AggregatedRecord>
}

/// Splits records into panels.
/// Conditions define the panel order; conditions without records still get an empty panel.
fn build_facets<'a>(records: &'a [AggregatedRecord], conditions: &[String], layout: PlotLayout) -> Vec<Facet<'a>> {
    let mut facets = vec![];
    match layout {
        PlotLayout::ByCondition => {
            for (column, condition) in conditions.iter().enumerate() {
                facets.push(Facet {
                    title: condition.clone(),
                    row: 0,
                    column,
                    records: records.iter().filter(|r| &r.condition == condition).collect()
                });
            }
        },
        PlotLayout::GroupByTimepoint => {
            let mut groups: IndexMap<&str, ()> = IndexMap::new();
            let mut timepoints: IndexMap<&str, ()> = IndexMap::new();
            for condition in conditions.iter() {
                let (group, timepoint) = split_condition(condition);
                groups.insert(group, ());
                timepoints.insert(timepoint.unwrap_or_default(), ());
            }

            for condition in conditions.iter() {
                let (group, timepoint) = split_condition(condition);
                let timepoint = timepoint.unwrap_or_default();
                let row = groups.get_index_of(group).unwrap_or_default();
                let column = timepoints.get_index_of(timepoint).unwrap_or_default();
                let title = if timepoint.is_empty() {
                    group.to_string()
                } else {
                    format!("{group} | {timepoint}")
                };
                facets.push(Facet {
                    title,
                    row,
                    column,
                    records: records.iter().filter(|r| &r.condition == condition).collect()
                });
            }
        }
    }
    facets
}

/// Chooses a 1/2/5 × 10^k step that gives roughly five ticks up to `max_value`
fn nice_step(max_value: f64) -> f64 {
    if max_value <= 0.0 {
        return 1.0;
    }
    let raw = max_value / 5.0;
    let magnitude = 10f64.powf(raw.log10().floor());
    let scaled = raw / magnitude;
    let factor = if scaled <= 1.0 {
        1.0
    } else if scaled <= 2.0 {
        2.0
    } else if scaled <= 5.0 {
        5.0
    } else {
        10.0
    };
    factor * magnitude
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Renders a faceted bar chart with one strip point per replicate.
/// Bars show the mean across replicates of each class; points show each replicate.
/// # Arguments
/// * `records` - the rows to draw; `plot_value` is used for the height
/// * `conditions` - panel order
/// * `classes` - x-axis categories, drawn in the given order
/// * `options` - layout and axis styling
pub fn render_pathway_plot(
    records: &[AggregatedRecord], conditions: &[String], classes: &[IndelClass], options: &PlotOptions
) -> Document {
    let facets = build_facets(records, conditions, options.layout);
    let rows = facets.iter().map(|f| f.row + 1).max().unwrap_or(1);
    let columns = facets.iter().map(|f| f.column + 1).max().unwrap_or(1);

    let data_max = records.iter().map(|r| r.plot_value()).fold(0.0, f64::max);
    let y_step = options.y_step.unwrap_or_else(|| nice_step(data_max));
    let y_max = options.y_max.unwrap_or_else(|| ((data_max / y_step).ceil() * y_step).max(y_step));

    let cell_width = PANEL_WIDTH + MARGIN_LEFT;
    let cell_height = PANEL_HEIGHT + MARGIN_TOP + MARGIN_BOTTOM;
    let width = columns as f64 * cell_width + (columns - 1) as f64 * PANEL_GAP + MARGIN_RIGHT;
    let height = rows as f64 * cell_height + (rows - 1) as f64 * PANEL_GAP;

    let mut doc = Document::new()
        .set("viewBox", (0, 0, width, height))
        .set("width", width)
        .set("height", height)
        .add(
            Rectangle::new()
                .set("x", 0)
                .set("y", 0)
                .set("width", width)
                .set("height", height)
                .set("fill", "#ffffff"),
        );

    for facet in facets.iter() {
        let origin_x = facet.column as f64 * (cell_width + PANEL_GAP) + MARGIN_LEFT;
        let origin_y = facet.row as f64 * (cell_height + PANEL_GAP) + MARGIN_TOP;
        let panel = render_facet(facet, classes, options, y_max, y_step)
            .set("transform", format!("translate({origin_x},{origin_y})"));
        doc = doc.add(panel);
    }

    doc
}

/// Draws one panel with its origin at the top-left of the plotting area
fn render_facet(facet: &Facet<'_>, classes: &[IndelClass], options: &PlotOptions, y_max: f64, y_step: f64) -> Group {
    let y_of = |value: f64| PANEL_HEIGHT - (value / y_max).clamp(0.0, 1.0) * PANEL_HEIGHT;
    let slot_width = PANEL_WIDTH / classes.len().max(1) as f64;
    let bar_width = slot_width * BAR_FRACTION;

    let mut group = Group::new()
        .add(
            Text::new(facet.title.clone())
                .set("x", PANEL_WIDTH / 2.0)
                .set("y", -14.0)
                .set("text-anchor", "middle")
                .set("font-family", FONT_FAMILY)
                .set("font-size", 15),
        )
        .add(
            Text::new(options.y_label.clone())
                .set("x", 0)
                .set("y", 0)
                .set("transform", format!("translate({},{}) rotate(-90)", -48.0, PANEL_HEIGHT / 2.0))
                .set("text-anchor", "middle")
                .set("font-family", FONT_FAMILY)
                .set("font-size", 12),
        );

    // y-axis with ticks
    let tick_count = (y_max / y_step).round() as usize;
    for i in 0..=tick_count {
        let value = i as f64 * y_step;
        let y = y_of(value);
        group = group
            .add(
                Line::new()
                    .set("x1", -5)
                    .set("y1", y)
                    .set("x2", 0)
                    .set("y2", y)
                    .set("stroke", "#000000")
                    .set("stroke-width", 1),
            )
            .add(
                Text::new(format!("{value}"))
                    .set("x", -8)
                    .set("y", y + 4.0)
                    .set("text-anchor", "end")
                    .set("font-family", FONT_FAMILY)
                    .set("font-size", 11),
            );
    }
    group = group
        .add(
            Line::new()
                .set("x1", 0)
                .set("y1", 0)
                .set("x2", 0)
                .set("y2", PANEL_HEIGHT)
                .set("stroke", "#000000")
                .set("stroke-width", 1),
        )
        .add(
            Line::new()
                .set("x1", 0)
                .set("y1", PANEL_HEIGHT)
                .set("x2", PANEL_WIDTH)
                .set("y2", PANEL_HEIGHT)
                .set("stroke", "#000000")
                .set("stroke-width", 1),
        );

    for (slot, class) in classes.iter().enumerate() {
        let center = slot_width * (slot as f64 + 0.5);
        let values: Vec<f64> = facet.records.iter()
            .filter(|r| r.class == *class)
            .map(|r| r.plot_value())
            .collect();

        if !values.is_empty() {
            let bar_top = y_of(mean(&values));
            group = group.add(
                Rectangle::new()
                    .set("x", center - bar_width / 2.0)
                    .set("y", bar_top)
                    .set("width", bar_width)
                    .set("height", PANEL_HEIGHT - bar_top)
                    .set("fill", class.color())
                    .set("fill-opacity", 0.9),
            );

            // spread the replicate points evenly over the middle of the bar
            let spread = bar_width * 0.5;
            for (i, value) in values.iter().enumerate() {
                let offset = if values.len() > 1 {
                    spread * (i as f64 / (values.len() - 1) as f64 - 0.5)
                } else {
                    0.0
                };
                group = group.add(
                    Circle::new()
                        .set("cx", center + offset)
                        .set("cy", y_of(*value))
                        .set("r", POINT_RADIUS)
                        .set("fill", "#ffffff")
                        .set("fill-opacity", 0.8)
                        .set("stroke", "#000000")
                        .set("stroke-width", 0.5),
                );
            }
        }

        group = group.add(
            Text::new(class.to_string())
                .set("x", center)
                .set("y", PANEL_HEIGHT + 20.0)
                .set("text-anchor", "middle")
                .set("font-family", FONT_FAMILY)
                .set("font-size", 12),
        );
    }

    if let Some(reference) = options.reference_line {
        let y = y_of(reference);
        group = group.add(
            Line::new()
                .set("x1", 0)
                .set("y1", y)
                .set("x2", PANEL_WIDTH)
                .set("y2", y)
                .set("stroke", "#808080")
                .set("stroke-width", 1)
                .set("stroke-dasharray", "6,4"),
        );
    }

    group
}

/// Saves a rendered figure
/// # Arguments
/// * `filename` - output path, expected to end with .svg
/// * `document` - the rendered figure
pub fn save_pathway_plot(filename: &Path, document: &Document) -> std::io::Result<()> {
    svg::save(filename, document)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(condition: &str, replicate: &str, class: IndelClass, summed: f64) -> AggregatedRecord {
        AggregatedRecord::new(condition.to_string(), replicate.to_string(), class, summed)
    }

    fn conditions(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_nice_step() {
        assert_eq!(nice_step(100.0), 20.0);
        assert_eq!(nice_step(63.5), 20.0);
        assert_eq!(nice_step(9.0), 2.0);
        assert_eq!(nice_step(0.0), 1.0);
    }

    #[test]
    fn test_facets_by_condition() {
        let records = vec![
            row("sgLAD_6hr", "R1", IndelClass::Uncut, 60.0),
            row("sgLAD_24hr", "R1", IndelClass::Uncut, 50.0),
        ];
        let facets = build_facets(&records, &conditions(&["sgLAD_6hr", "sgLAD_24hr", "sgLAD_48hr"]), PlotLayout::ByCondition);
        assert_eq!(facets.len(), 3);
        assert_eq!(facets[1].title, "sgLAD_24hr");
        assert_eq!((facets[1].row, facets[1].column), (0, 1));
        assert_eq!(facets[1].records.len(), 1);
        assert!(facets[2].records.is_empty());
    }

    #[test]
    fn test_facets_grid() {
        let records = vec![];
        let names = conditions(&["siSCR_6hr", "siSCR_24hr", "siH2AX_6hr", "siH2AX_24hr"]);
        let facets = build_facets(&records, &names, PlotLayout::GroupByTimepoint);
        let positions: Vec<(usize, usize)> = facets.iter().map(|f| (f.row, f.column)).collect();
        assert_eq!(positions, vec![(0, 0), (0, 1), (1, 0), (1, 1)]);
        assert_eq!(facets[2].title, "siH2AX | 6hr");
    }

    #[test]
    fn test_render_summed() {
        let records = vec![
            row("sgLAD_6hr", "R1", IndelClass::Mmej, 10.0),
            row("sgLAD_6hr", "R2", IndelClass::Mmej, 12.0),
            row("sgLAD_6hr", "R1", IndelClass::Uncut, 60.0),
        ];
        let classes = [IndelClass::Mmej, IndelClass::Nhej, IndelClass::Uncut];
        let doc = render_pathway_plot(&records, &conditions(&["sgLAD_6hr"]), &classes, &PlotOptions::summed()).to_string();

        // background plus two bars, and one point per record
        assert_eq!(doc.matches("<rect").count(), 3);
        assert_eq!(doc.matches("<circle").count(), 3);
        assert!(doc.contains("#D33873"));
        assert!(doc.contains("#EFB54F"));
        assert!(!doc.contains("#575757"));
        assert!(doc.contains("% of sequences"));
        assert!(!doc.contains("stroke-dasharray"));
    }

    #[test]
    fn test_render_relative() {
        let mut nhej = row("siSCR_6hr", "R1", IndelClass::Nhej, 20.0);
        nhej.relative_percentage = Some(25.0);
        let mut uncut = row("siSCR_6hr", "R1", IndelClass::Uncut, 60.0);
        uncut.relative_percentage = Some(75.0);
        let classes = [IndelClass::Nhej, IndelClass::Uncut];
        let doc = render_pathway_plot(&[nhej, uncut], &conditions(&["siSCR_6hr", "siH2AX_6hr"]), &classes, &PlotOptions::relative()).to_string();

        // one reference line per panel
        assert_eq!(doc.matches("stroke-dasharray").count(), 2);
        assert!(doc.contains("siSCR | 6hr"));
        assert!(doc.contains("siH2AX | 6hr"));
        assert!(doc.contains("relative % of sequences"));
    }
}
