//! Command-line arguments and initial box parsing

use crate::error::{Result, TrackingError};
use clap::Parser;
use siamtrack::CornerBox;
use std::path::PathBuf;

/// Track objects through a video with SiamRPN and write an annotated copy
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the SiamRPN ONNX model file
    pub model: PathBuf,

    /// Path to the input video file
    pub video: PathBuf,

    /// Initial object boxes as a list of [left, top, right, bottom] lists,
    /// e.g. "[[10, 10, 50, 50], [60, 20, 90, 70]]"
    pub init_boxes: String,

    /// Directory the res_<video name> output is written to
    #[arg(short, long, default_value = ".")]
    pub output_dir: PathBuf,

    /// JSON tracker configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Skip the GPU backend and run on the CPU
    #[arg(long, default_value_t = false)]
    pub cpu: bool,
}

/// Drop commas that directly precede a closing bracket (`[1, 2,]` -> `[1, 2]`)
fn strip_trailing_commas(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    for (i, &ch) in chars.iter().enumerate() {
        if ch == ',' {
            let next = chars[i + 1..].iter().find(|c| !c.is_whitespace());
            if next == Some(&']') {
                continue;
            }
        }
        out.push(ch);
    }
    out
}

/// Parse the initial box literal
///
/// Accepts nested lists of four numbers; tuples in parentheses are treated
/// as lists and a single flat box is accepted as one object.
pub fn parse_init_boxes(text: &str) -> Result<Vec<CornerBox>> {
    let normalized = strip_trailing_commas(&text.replace('(', "[").replace(')', "]"));

    let raw: Vec<[f64; 4]> = match serde_json::from_str::<Vec<[f64; 4]>>(&normalized) {
        Ok(boxes) => boxes,
        Err(nested_err) => match serde_json::from_str::<[f64; 4]>(&normalized) {
            Ok(single) => vec![single],
            Err(_) => {
                return Err(TrackingError::invalid_boxes(format!(
                    "expected a list of [left, top, right, bottom] boxes, got {:?}: {}",
                    text, nested_err
                )))
            }
        },
    };

    raw.iter()
        .enumerate()
        .map(|(i, b)| {
            if b.iter().any(|v| !v.is_finite()) {
                return Err(TrackingError::invalid_boxes(format!(
                    "box {} has a non-finite coordinate: {:?}",
                    i, b
                )));
            }
            let [left, top, right, bottom] = *b;
            if left > right || top > bottom {
                return Err(TrackingError::invalid_boxes(format!(
                    "box {} must satisfy left <= right and top <= bottom, got {:?}",
                    i, b
                )));
            }
            Ok(CornerBox::new(left as f32, top as f32, right as f32, bottom as f32))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested_lists() {
        let boxes = parse_init_boxes("[[10, 10, 50, 50], [60, 20.5, 90, 70]]").unwrap();
        assert_eq!(
            boxes,
            vec![
                CornerBox::new(10.0, 10.0, 50.0, 50.0),
                CornerBox::new(60.0, 20.5, 90.0, 70.0),
            ]
        );
    }

    #[test]
    fn test_parse_tuples() {
        let boxes = parse_init_boxes("((1, 2, 3, 4), (5, 6, 7, 8),)").unwrap();
        assert_eq!(boxes.len(), 2);
        assert_eq!(boxes[1], CornerBox::new(5.0, 6.0, 7.0, 8.0));

        let boxes = parse_init_boxes("[(1, 2, 3, 4)]").unwrap();
        assert_eq!(boxes, vec![CornerBox::new(1.0, 2.0, 3.0, 4.0)]);
    }

    #[test]
    fn test_parse_single_flat_box() {
        let boxes = parse_init_boxes("[10, 10, 50, 50]").unwrap();
        assert_eq!(boxes, vec![CornerBox::new(10.0, 10.0, 50.0, 50.0)]);
    }

    #[test]
    fn test_parse_empty_list() {
        assert!(parse_init_boxes("[]").unwrap().is_empty());
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for text in ["", "[[1, 2, 3]]", "[[1, 2, 3, 4, 5]]", "boxes", "[[a, b, c, d]]"] {
            assert!(
                matches!(parse_init_boxes(text), Err(TrackingError::InvalidBoxes(_))),
                "{text:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_parse_rejects_inverted_box() {
        let err = parse_init_boxes("[[50, 10, 10, 50]]").unwrap_err();
        assert!(matches!(err, TrackingError::InvalidBoxes(ref msg) if msg.contains("box 0")));
        assert!(parse_init_boxes("[[10, 50, 50, 10]]").is_err());
    }

    #[test]
    fn test_strip_trailing_commas() {
        assert_eq!(strip_trailing_commas("[1, 2, ]"), "[1, 2 ]");
        assert_eq!(strip_trailing_commas("[[1,2],]"), "[[1,2]]");
    }

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from([
            "siamrpn-track",
            "model.onnx",
            "clip.avi",
            "[[10, 10, 50, 50]]",
            "--cpu",
            "--output-dir",
            "/tmp",
        ])
        .unwrap();
        assert_eq!(args.model, PathBuf::from("model.onnx"));
        assert_eq!(args.video, PathBuf::from("clip.avi"));
        assert!(args.cpu);
        assert_eq!(args.output_dir, PathBuf::from("/tmp"));
        assert!(args.config.is_none());
    }
}
