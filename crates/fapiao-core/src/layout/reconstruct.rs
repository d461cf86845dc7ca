//! Line and spacing inference over positioned runs.

use std::cmp::Ordering;

use tracing::{debug, trace};

use super::{PageText, TextRun};
use crate::models::config::LayoutConfig;

/// Orders glyph runs into reading order and rebuilds the page text.
///
/// All decisions are threshold comparisons driven by [`LayoutConfig`]; the
/// reconstructor holds no other state and never fails.
#[derive(Debug, Clone, Default)]
pub struct LayoutReconstructor {
    config: LayoutConfig,
}

impl LayoutReconstructor {
    pub fn new(config: LayoutConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Order runs top-to-bottom, then left-to-right within a baseline band.
    ///
    /// A band starts at its highest run and takes every following run whose
    /// baseline is within `sort_y_tolerance` of that top. Runs further apart
    /// never share a band, however they are chained.
    pub fn order(&self, runs: &[TextRun]) -> Vec<TextRun> {
        let mut sorted = runs.to_vec();
        sorted.sort_by(|a, b| b.y.total_cmp(&a.y).then_with(|| by_x(a, b)));

        let mut ordered = Vec::with_capacity(sorted.len());
        let mut band: Vec<TextRun> = Vec::new();
        let mut band_top = f32::INFINITY;

        for run in sorted {
            if !band.is_empty() && band_top - run.y > self.config.sort_y_tolerance {
                flush_band(&mut band, &mut ordered);
            }
            if band.is_empty() {
                band_top = run.y;
            }
            band.push(run);
        }
        flush_band(&mut band, &mut ordered);

        ordered
    }

    /// Join ordered runs into text, inferring line breaks and word spaces.
    pub fn join(&self, ordered: &[TextRun]) -> String {
        let mut text = String::new();
        let mut prev: Option<&TextRun> = None;

        for run in ordered {
            if let Some(p) = prev {
                if (run.y - p.y).abs() > self.config.line_break_y_tolerance {
                    text.push('\n');
                } else if run.x - p.right() > self.config.space_gap_threshold {
                    text.push(' ');
                }
            }
            text.push_str(&run.text);
            prev = Some(run);
        }

        text
    }

    /// Reconstruct the text of one page.
    pub fn reconstruct(&self, runs: &[TextRun]) -> PageText {
        let ordered = self.order(runs);
        let text = self.join(&ordered);

        debug!(
            "Reconstructed {} runs into {} lines",
            ordered.len(),
            text.lines().count()
        );
        trace!("Reconstructed text:\n{}", text);

        PageText {
            text,
            runs: ordered,
        }
    }
}

fn by_x(a: &TextRun, b: &TextRun) -> Ordering {
    a.x.total_cmp(&b.x)
        .then_with(|| b.y.total_cmp(&a.y))
        .then_with(|| a.text.cmp(&b.text))
}

fn flush_band(band: &mut Vec<TextRun>, ordered: &mut Vec<TextRun>) {
    band.sort_by(by_x);
    ordered.append(band);
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn run(text: &str, x: f32, y: f32, width: f32) -> TextRun {
        TextRun::new(text, x, y, width, 9.0)
    }

    fn reconstruct(runs: &[TextRun]) -> String {
        LayoutReconstructor::default().reconstruct(runs).text
    }

    #[test]
    fn test_empty_page() {
        let page = LayoutReconstructor::default().reconstruct(&[]);
        assert_eq!(page.text, "");
        assert!(page.is_empty());
    }

    #[test]
    fn test_baseline_jitter_stays_on_one_line() {
        let runs = vec![run("World", 50.0, 100.0, 20.0), run("Hello", 10.0, 103.0, 20.0)];
        assert_eq!(reconstruct(&runs), "Hello World");
    }

    #[test]
    fn test_large_y_gap_breaks_line() {
        let runs = vec![run("second", 10.0, 90.0, 30.0), run("first", 10.0, 100.0, 30.0)];
        assert_eq!(reconstruct(&runs), "first\nsecond");
    }

    #[test]
    fn test_gap_between_thresholds_joins_without_break() {
        // 6 units apart: separate bands, but not a new line.
        let runs = vec![run("a", 10.0, 100.0, 5.0), run("b", 30.0, 94.0, 5.0)];
        assert_eq!(reconstruct(&runs), "a b");
    }

    #[test]
    fn test_spacing_threshold() {
        let touching = vec![run("价税", 10.0, 50.0, 20.0), run("合计", 32.0, 50.0, 20.0)];
        assert_eq!(reconstruct(&touching), "价税合计");

        let spaced = vec![run("价税", 10.0, 50.0, 20.0), run("合计", 32.5, 50.0, 20.0)];
        assert_eq!(reconstruct(&spaced), "价税 合计");

        let wide = vec![run("a", 0.0, 50.0, 5.0), run("b", 100.0, 50.0, 5.0)];
        assert_eq!(reconstruct(&wide), "a b");
    }

    #[test]
    fn test_no_leading_space_after_line_break() {
        let runs = vec![
            run("top", 10.0, 200.0, 10.0),
            run("bottom", 300.0, 100.0, 10.0),
        ];
        assert_eq!(reconstruct(&runs), "top\nbottom");
    }

    #[test]
    fn test_bands_do_not_chain() {
        let reconstructor = LayoutReconstructor::default();
        let runs = vec![
            run("c", 0.0, 92.0, 5.0),
            run("b", 20.0, 96.0, 5.0),
            run("a", 40.0, 100.0, 5.0),
        ];
        let ordered: Vec<String> = reconstructor
            .order(&runs)
            .into_iter()
            .map(|r| r.text)
            .collect();
        // "c" is 8 units below the band top and must not be pulled left of "a".
        assert_eq!(ordered, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_order_independent_of_input_order() {
        let runs = vec![
            run("*日用杂品*清洗剂", 30.0, 400.0, 80.0),
            run("瓶", 200.0, 401.5, 10.0),
            run("2", 260.0, 399.0, 5.0),
            run("开票日期：2025年12月12日", 400.0, 700.0, 120.0),
            run("17.19", 300.0, 400.0, 25.0),
        ];
        let expected = reconstruct(&runs);

        let mut reversed = runs.clone();
        reversed.reverse();
        assert_eq!(reconstruct(&reversed), expected);

        let mut rotated = runs.clone();
        rotated.rotate_left(2);
        assert_eq!(reconstruct(&rotated), expected);

        assert_eq!(
            expected,
            "开票日期：2025年12月12日\n*日用杂品*清洗剂 瓶 2 17.19"
        );
    }

    #[test]
    fn test_custom_thresholds() {
        let reconstructor = LayoutReconstructor::new(LayoutConfig {
            space_gap_threshold: 50.0,
            ..LayoutConfig::default()
        });
        let runs = vec![run("a", 0.0, 50.0, 5.0), run("b", 20.0, 50.0, 5.0)];
        assert_eq!(reconstructor.reconstruct(&runs).text, "ab");
    }
}
